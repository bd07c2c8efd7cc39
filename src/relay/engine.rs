//! Response engine - remote completion with a canned-reply fallback.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::relay::client::{RemoteClient, RemoteConfig};
use crate::relay::endpoint::EndpointPool;
use crate::relay::selector::{self, ChatContext};

/// Extra time allowed on top of the request deadline before giving up on
/// the remote attempt entirely.
const DEADLINE_GRACE: Duration = Duration::from_secs(1);

/// Snapshot of engine state for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub active_conversations: usize,
    pub current_endpoint: String,
    pub total_endpoints: usize,
}

pub struct ResponseEngine {
    remote: RemoteClient,
}

impl ResponseEngine {
    pub fn new(pool: Arc<EndpointPool>, config: RemoteConfig) -> Self {
        Self {
            remote: RemoteClient::new(pool, config),
        }
    }

    /// Produce a reply for a message. Never fails and never returns empty text.
    pub async fn generate_response(&self, text: &str, user_id: &str, context: ChatContext) -> String {
        let deadline = self.remote.timeout() + DEADLINE_GRACE;
        match tokio::time::timeout(deadline, self.remote.try_complete(text, user_id)).await {
            Ok(Some(reply)) => return reply,
            Ok(None) => {}
            Err(_) => warn!("Remote attempt exceeded {:?}, using fallback", deadline),
        }

        let reply = selector::select_fallback(text, context);
        debug!("Fallback reply ({}): {}", context.as_str(), reply);
        reply
    }

    /// Forget a user's conversation log. Returns true if one existed.
    pub fn clear_history(&self, user_id: &str) -> bool {
        self.remote.clear_history(user_id)
    }

    pub fn history_for(&self, user_id: &str) -> Option<Vec<String>> {
        self.remote.history_for(user_id)
    }

    pub fn stats(&self) -> Stats {
        let pool = self.remote.pool();
        Stats {
            active_conversations: self.remote.active_conversations(),
            current_endpoint: pool.current().url.clone(),
            total_endpoints: pool.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::endpoint::EndpointDescriptor;
    use std::time::Instant;

    /// Engine pointed at ports nothing listens on, so every remote call fails fast.
    fn offline_engine(n: usize) -> ResponseEngine {
        let endpoints = (0..n)
            .map(|i| EndpointDescriptor::from_url(format!("http://127.0.0.1:1/model-{i}")))
            .collect();
        let pool = Arc::new(EndpointPool::new(endpoints).unwrap());
        let config = RemoteConfig {
            timeout: Duration::from_millis(500),
            ..RemoteConfig::default()
        };
        ResponseEngine::new(pool, config)
    }

    #[tokio::test]
    async fn test_falls_back_when_remote_unreachable() {
        let engine = offline_engine(3);
        let started = Instant::now();
        let reply = engine.generate_response("Hello there", "42", ChatContext::Private).await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(selector::possible_replies("Hello there", ChatContext::Private).contains(&reply));
    }

    #[tokio::test]
    async fn test_failures_rotate_cursor() {
        let engine = offline_engine(3);
        for _ in 0..4 {
            engine.generate_response("anything", "42", ChatContext::Group).await;
        }
        assert_eq!(engine.stats().current_endpoint, "http://127.0.0.1:1/model-1");
    }

    #[tokio::test]
    async fn test_history_recorded_even_on_failure() {
        let engine = offline_engine(1);
        engine.generate_response("one", "7", ChatContext::Private).await;
        engine.generate_response("two", "7", ChatContext::Private).await;
        assert_eq!(
            engine.history_for("7").unwrap(),
            vec!["one".to_string(), "two".to_string()]
        );
    }

    #[tokio::test]
    async fn test_clear_history_updates_stats() {
        let engine = offline_engine(2);
        engine.generate_response("hi", "a", ChatContext::Private).await;
        engine.generate_response("hi", "b", ChatContext::Private).await;
        assert_eq!(engine.stats().active_conversations, 2);

        assert!(!engine.clear_history("missing"));
        assert_eq!(engine.stats().active_conversations, 2);

        assert!(engine.clear_history("a"));
        assert_eq!(engine.stats().active_conversations, 1);
    }

    #[tokio::test]
    async fn test_stats_reports_pool() {
        let engine = offline_engine(3);
        let stats = engine.stats();
        assert_eq!(stats.total_endpoints, 3);
        assert_eq!(stats.current_endpoint, "http://127.0.0.1:1/model-0");
        assert_eq!(stats.active_conversations, 0);
    }
}
