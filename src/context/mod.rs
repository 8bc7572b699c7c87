//! Multi-turn conversation memory with TTL eviction.
//!
//! Purely in-memory: a restart forgets every thread. History is best-effort
//! context for the next call, not a record.

mod sweeper;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::info;

use crate::types::Message;
use sweeper::SweeperState;

/// Threads are removed in batches of this size, re-taking the lock per batch.
const SWEEP_BATCH: usize = 64;

/// Limits for the conversation cache.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSettings {
    /// Idle time after which a thread is evicted.
    pub ttl: Duration,
    /// Messages kept per thread; the oldest are dropped first.
    pub max_messages: usize,
    /// How often the background sweep runs.
    pub cleanup_interval: Duration,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_messages: 10,
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

/// History of one caller-defined thread.
#[derive(Debug, Clone)]
pub struct ConversationThread {
    pub messages: Vec<Message>,
    pub created_at: Instant,
    pub last_used_at: Instant,
}

impl ConversationThread {
    fn new(now: Instant) -> Self {
        Self {
            messages: Vec::new(),
            created_at: now,
            last_used_at: now,
        }
    }

    fn push(&mut self, message: Message, max_messages: usize, now: Instant) {
        self.messages.push(message);
        self.last_used_at = now;
        if self.messages.len() > max_messages {
            let excess = self.messages.len() - max_messages;
            self.messages.drain(..excess);
        }
    }
}

/// Snapshot counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextStats {
    pub active_threads: usize,
    pub total_messages: usize,
}

/// Thread-safe map from thread id to [`ConversationThread`].
///
/// Cloning is cheap and shares the same cache. A background sweep is spawned
/// on the first write when a tokio runtime is available; it stops when
/// [`shutdown`](Self::shutdown) is called or the last handle is dropped.
///
/// Concurrent calls for the same thread id are not serialized beyond each
/// single operation; callers needing per-thread exclusivity arrange it.
#[derive(Clone)]
pub struct ConversationContext {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    settings: ContextSettings,
    threads: RwLock<HashMap<String, ConversationThread>>,
    sweeper: Mutex<SweeperState>,
}

impl fmt::Debug for ConversationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationContext")
            .field("settings", &self.inner.settings)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new(ContextSettings::default())
    }
}

impl ConversationContext {
    pub fn new(settings: ContextSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                threads: RwLock::new(HashMap::new()),
                sweeper: Mutex::new(SweeperState::Idle),
            }),
        }
    }

    pub fn settings(&self) -> &ContextSettings {
        &self.inner.settings
    }

    /// Messages for a thread, oldest first. Unknown ids yield an empty list.
    pub fn get_history(&self, thread_id: &str) -> Vec<Message> {
        let mut threads = self.inner.write();
        match threads.get_mut(thread_id) {
            Some(thread) => {
                thread.last_used_at = Instant::now();
                thread.messages.clone()
            }
            None => Vec::new(),
        }
    }

    pub fn add_user_message(&self, thread_id: &str, text: impl Into<String>) {
        self.add_messages(thread_id, [Message::user(text)]);
    }

    pub fn add_assistant_message(&self, thread_id: &str, text: impl Into<String>) {
        self.add_messages(thread_id, [Message::assistant(text)]);
    }

    /// Record a question and its answer together.
    pub fn record_turn(&self, thread_id: &str, question: impl Into<String>, answer: impl Into<String>) {
        self.add_messages(
            thread_id,
            [Message::user(question), Message::assistant(answer)],
        );
    }

    /// Append messages, creating the thread on first use, then trim.
    pub fn add_messages(&self, thread_id: &str, messages: impl IntoIterator<Item = Message>) {
        sweeper::ensure_started(&self.inner);
        let max_messages = self.inner.settings.max_messages;
        let now = Instant::now();
        let mut threads = self.inner.write();
        let thread = threads
            .entry(thread_id.to_string())
            .or_insert_with(|| ConversationThread::new(now));
        for message in messages {
            thread.push(message, max_messages, now);
        }
    }

    pub fn has_context(&self, thread_id: &str) -> bool {
        self.inner.read().contains_key(thread_id)
    }

    /// Forget a thread. Returns whether it existed.
    pub fn clear_thread(&self, thread_id: &str) -> bool {
        self.inner.write().remove(thread_id).is_some()
    }

    pub fn stats(&self) -> ContextStats {
        let threads = self.inner.read();
        ContextStats {
            active_threads: threads.len(),
            total_messages: threads.values().map(|t| t.messages.len()).sum(),
        }
    }

    /// Evict every thread idle longer than the TTL. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.inner.sweep_expired()
    }

    pub fn is_sweeper_running(&self) -> bool {
        sweeper::is_running(&self.inner)
    }

    /// Stop the background sweep and wait for it to exit.
    ///
    /// The sweep is not restarted afterwards; [`sweep_expired`](Self::sweep_expired)
    /// still works manually.
    pub async fn shutdown(&self) {
        sweeper::stop(&self.inner).await;
    }
}

impl Inner {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ConversationThread>> {
        self.threads.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ConversationThread>> {
        self.threads.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let ttl = self.settings.ttl;
        let is_expired = |thread: &ConversationThread| now.duration_since(thread.last_used_at) > ttl;

        let expired: Vec<String> = self
            .read()
            .iter()
            .filter(|(_, thread)| is_expired(thread))
            .map(|(id, _)| id.clone())
            .collect();

        let mut removed = 0;
        for batch in expired.chunks(SWEEP_BATCH) {
            let mut threads = self.write();
            for id in batch {
                // may have been touched since the scan
                if threads.get(id).is_some_and(is_expired) {
                    threads.remove(id);
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            info!(removed, "Evicted idle conversation threads");
        }
        removed
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        sweeper::cancel(self.sweeper.get_mut().unwrap_or_else(PoisonError::into_inner));
    }
}
