//! Tests for the conversation cache.

use std::time::Duration;

use cortex_agent::context::{ContextSettings, ContextStats, ConversationContext};
use cortex_agent::types::{Message, Role};
use pretty_assertions::assert_eq;

fn short_lived() -> ConversationContext {
    ConversationContext::new(ContextSettings {
        ttl: Duration::from_secs(60),
        max_messages: 10,
        cleanup_interval: Duration::from_secs(10),
    })
}

#[tokio::test]
async fn unknown_thread_has_empty_history() {
    let context = ConversationContext::default();
    assert!(context.get_history("nope").is_empty());
    assert!(!context.has_context("nope"));
    assert!(!context.clear_thread("nope"));
}

#[tokio::test]
async fn history_is_trimmed_to_most_recent_messages_in_order() {
    let context = ConversationContext::new(ContextSettings {
        max_messages: 3,
        ..ContextSettings::default()
    });
    for i in 0..5 {
        context.add_user_message("t", format!("q{i}"));
    }

    let history: Vec<String> = context
        .get_history("t")
        .iter()
        .map(Message::text_content)
        .collect();
    assert_eq!(history, vec!["q2", "q3", "q4"]);
    context.shutdown().await;
}

#[tokio::test]
async fn record_turn_keeps_question_before_answer() {
    let context = ConversationContext::default();
    context.record_turn("t", "How many lifts?", "Twelve lifts are open.");

    let roles: Vec<Role> = context.get_history("t").iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
    assert_eq!(
        context.stats(),
        ContextStats {
            active_threads: 1,
            total_messages: 2
        }
    );
    context.shutdown().await;
}

#[tokio::test]
async fn clear_thread_forgets_history() {
    let context = ConversationContext::default();
    context.add_assistant_message("t", "hello");
    assert!(context.has_context("t"));
    assert!(context.clear_thread("t"));
    assert!(!context.has_context("t"));
    assert!(context.get_history("t").is_empty());
    context.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn idle_thread_is_evicted_by_background_sweep() {
    let context = short_lived();
    context.add_user_message("idle", "hello");
    assert!(context.is_sweeper_running());

    tokio::time::sleep(Duration::from_secs(75)).await;
    tokio::task::yield_now().await;

    assert!(!context.has_context("idle"));
    context.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn recently_used_thread_survives_sweep() {
    let context = short_lived();
    context.add_user_message("active", "hello");
    context.add_user_message("idle", "hello");

    tokio::time::sleep(Duration::from_secs(40)).await;
    assert_eq!(context.get_history("active").len(), 1);

    tokio::time::sleep(Duration::from_secs(35)).await;
    tokio::task::yield_now().await;

    assert!(context.has_context("active"));
    assert!(!context.has_context("idle"));
    context.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn manual_sweep_reports_evictions() {
    let context = short_lived();
    context.shutdown().await;
    context.add_user_message("a", "1");
    context.add_user_message("b", "2");
    assert!(!context.is_sweeper_running());

    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(context.sweep_expired(), 0);

    tokio::time::advance(Duration::from_secs(31)).await;
    assert_eq!(context.sweep_expired(), 2);
    assert_eq!(context.stats(), ContextStats::default());
}

#[tokio::test]
async fn sweeper_starts_lazily_and_stops_on_shutdown() {
    let context = ConversationContext::default();
    assert!(!context.is_sweeper_running());

    context.add_user_message("t", "hi");
    assert!(context.is_sweeper_running());

    context.shutdown().await;
    assert!(!context.is_sweeper_running());

    // writes after shutdown still work, without restarting the sweep
    context.add_user_message("t", "again");
    assert_eq!(context.get_history("t").len(), 2);
    assert!(!context.is_sweeper_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_do_not_lose_updates() {
    let context = ConversationContext::new(ContextSettings {
        max_messages: 1_000,
        ..ContextSettings::default()
    });

    let tasks: Vec<_> = (0..8)
        .map(|worker| {
            let context = context.clone();
            tokio::spawn(async move {
                for i in 0..25 {
                    context.add_user_message("shared", format!("{worker}-{i}"));
                    context.add_user_message(&format!("own-{worker}"), "x");
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(context.get_history("shared").len(), 200);
    assert_eq!(
        context.stats(),
        ContextStats {
            active_threads: 9,
            total_messages: 400
        }
    );
    context.shutdown().await;
}
