//! Background eviction task owned by a [`ConversationContext`](super::ConversationContext).

use std::sync::{Arc, PoisonError, Weak};

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Inner;

pub(super) enum SweeperState {
    Idle,
    Running {
        cancel: CancellationToken,
        handle: JoinHandle<()>,
    },
    Stopped,
}

/// Spawn the sweep on the current runtime, once.
pub(super) fn ensure_started(inner: &Arc<Inner>) {
    let mut state = inner.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
    if !matches!(*state, SweeperState::Idle) {
        return;
    }
    if inner.settings.cleanup_interval.is_zero() {
        debug!("Zero cleanup interval; conversation sweep disabled");
        *state = SweeperState::Stopped;
        return;
    }
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        debug!("No tokio runtime; conversation sweep not started");
        return;
    };

    let cancel = CancellationToken::new();
    let handle = runtime.spawn(run(
        Arc::downgrade(inner),
        inner.settings.cleanup_interval,
        cancel.clone(),
    ));
    debug!(interval = ?inner.settings.cleanup_interval, "Conversation sweep started");
    *state = SweeperState::Running { cancel, handle };
}

pub(super) fn is_running(inner: &Inner) -> bool {
    let state = inner.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
    matches!(&*state, SweeperState::Running { handle, .. } if !handle.is_finished())
}

pub(super) async fn stop(inner: &Inner) {
    let previous = {
        let mut state = inner.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *state, SweeperState::Stopped)
    };
    if let SweeperState::Running { cancel, handle } = previous {
        cancel.cancel();
        if let Err(e) = handle.await {
            debug!(error = %e, "Conversation sweep ended abnormally");
        }
    }
}

pub(super) fn cancel(state: &mut SweeperState) {
    if let SweeperState::Running { cancel, .. } = state {
        cancel.cancel();
    }
    *state = SweeperState::Stopped;
}

async fn run(inner: Weak<Inner>, period: std::time::Duration, cancel: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                inner.sweep_expired();
            }
        }
    }
    debug!("Conversation sweep stopped");
}
