// Sliding-window spam detection, keyed by (tenant, user).
//
// Both windows follow the same shape: append the new observation, lazily
// evict everything older than the window, then count what is left. Entries
// are created on first sight and never explicitly destroyed; an idle
// window self-heals to empty on the next observation.

use super::moderation_models::TenantUserKey;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;

/// Per-user message-rate window. Flags when `max_messages` or more
/// messages land within `per_seconds`.
pub struct RateWindow {
    max_messages: u32,
    per_seconds: u64,
    times: DashMap<TenantUserKey, VecDeque<DateTime<Utc>>>,
}

impl RateWindow {
    pub fn new(max_messages: u32, per_seconds: u64) -> Self {
        Self {
            max_messages,
            per_seconds,
            times: DashMap::new(),
        }
    }

    /// Record a message at `now` and report whether the user is rate
    /// spamming. The threshold is inclusive: the Nth message inside the
    /// window is itself flagged. Detection does not reset the window;
    /// continued flooding keeps flagging.
    pub fn observe(&self, key: TenantUserKey, now: DateTime<Utc>) -> bool {
        let cutoff = now - Duration::seconds(self.per_seconds as i64);
        let mut q = self.times.entry(key).or_default();
        q.push_back(now);
        while q.front().is_some_and(|t| *t < cutoff) {
            q.pop_front();
        }
        q.len() >= self.max_messages as usize
    }
}

/// Per-user duplicate-content window. Flags when `max_duplicates` or more
/// identical (trimmed) messages land within `window_seconds`.
pub struct DuplicateWindow {
    max_duplicates: u32,
    window_seconds: u64,
    history: DashMap<TenantUserKey, VecDeque<(String, DateTime<Utc>)>>,
}

impl DuplicateWindow {
    pub fn new(max_duplicates: u32, window_seconds: u64) -> Self {
        Self {
            max_duplicates,
            window_seconds,
            history: DashMap::new(),
        }
    }

    /// Record `content` at `now` and report whether it is duplicate spam.
    /// Whitespace-only content never flags, so image-only and embed-only
    /// messages cannot trip the check.
    pub fn observe(&self, key: TenantUserKey, content: &str, now: DateTime<Utc>) -> bool {
        let trimmed = content.trim();
        let cutoff = now - Duration::seconds(self.window_seconds as i64);

        let mut q = self.history.entry(key).or_default();
        q.push_back((trimmed.to_string(), now));
        while q.front().is_some_and(|(_, t)| *t < cutoff) {
            q.pop_front();
        }

        if trimmed.is_empty() {
            return false;
        }

        let dup_count = q.iter().filter(|(c, _)| c == trimmed).count();
        dup_count >= self.max_duplicates as usize
    }
}
