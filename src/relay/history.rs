//! Per-user log of raw messages sent to the bot.
//!
//! Entries are created on a user's first message and removed only by an
//! explicit reset. The log is bounded: least recently active users are
//! evicted once `max_users` is reached, and each user keeps at most
//! `max_messages` of their latest messages.

use lru::LruCache;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use tracing::debug;

pub struct ConversationLog {
    users: LruCache<String, VecDeque<String>>,
    max_messages: NonZeroUsize,
}

impl ConversationLog {
    pub fn new(max_users: NonZeroUsize, max_messages: NonZeroUsize) -> Self {
        Self {
            users: LruCache::new(max_users),
            max_messages,
        }
    }

    /// Append a message and return the user's log as it stood before the
    /// append (oldest first).
    pub fn record(&mut self, user_id: &str, text: &str) -> Vec<String> {
        if !self.users.contains(user_id)
            && let Some((evicted, _)) = self.users.push(user_id.to_string(), VecDeque::new())
            && evicted != user_id
        {
            debug!("Evicted conversation log for user {evicted}");
        }

        let Some(entry) = self.users.get_mut(user_id) else {
            return Vec::new();
        };
        let prior: Vec<String> = entry.iter().cloned().collect();
        entry.push_back(text.to_string());
        while entry.len() > self.max_messages.get() {
            entry.pop_front();
        }
        prior
    }

    /// Drop a user's log. Returns true if one existed.
    pub fn clear(&mut self, user_id: &str) -> bool {
        self.users.pop(user_id).is_some()
    }

    pub fn messages(&self, user_id: &str) -> Option<Vec<String>> {
        self.users
            .peek(user_id)
            .map(|entry| entry.iter().cloned().collect())
    }

    /// Number of users with a live log.
    pub fn active_users(&self) -> usize {
        self.users.len()
    }
}
