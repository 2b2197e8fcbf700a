// Anti-raid detection - per-tenant join-burst monitoring.
//
// Same sliding-window family as the message rate window, but keyed by
// tenant only: a raid is a server-level event. A join flags either when
// the burst threshold is hit or when the joining account is younger than
// the configured minimum age.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaidConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Joins within the interval that count as a raid.
    #[serde(default = "RaidConfig::default_join_threshold")]
    pub join_threshold: u32,
    #[serde(default = "RaidConfig::default_join_interval_seconds")]
    pub join_interval_seconds: u64,
    /// Accounts younger than this always flag. 0 disables the age check.
    #[serde(default)]
    pub min_account_age_days: u32,
    #[serde(default = "RaidConfig::default_auto_timeout_minutes")]
    pub auto_timeout_minutes: u32,
    #[serde(default = "RaidConfig::default_slowmode_seconds")]
    pub slowmode_seconds: u32,
}

impl RaidConfig {
    fn default_join_threshold() -> u32 {
        5
    }
    fn default_join_interval_seconds() -> u64 {
        15
    }
    fn default_auto_timeout_minutes() -> u32 {
        10
    }
    fn default_slowmode_seconds() -> u32 {
        15
    }

    pub fn clamped(mut self) -> Self {
        self.join_threshold = self.join_threshold.max(2);
        self.join_interval_seconds = self.join_interval_seconds.clamp(1, 3600);
        self.auto_timeout_minutes = self.auto_timeout_minutes.clamp(1, 7 * 24 * 60);
        // Discord caps channel slowmode at 6 hours.
        self.slowmode_seconds = self.slowmode_seconds.min(21_600);
        self
    }
}

impl Default for RaidConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            join_threshold: Self::default_join_threshold(),
            join_interval_seconds: Self::default_join_interval_seconds(),
            min_account_age_days: 0,
            auto_timeout_minutes: Self::default_auto_timeout_minutes(),
            slowmode_seconds: Self::default_slowmode_seconds(),
        }
    }
}

/// One member-join observation.
#[derive(Debug, Clone)]
pub struct JoinEvent {
    pub tenant_id: u64,
    pub user_id: u64,
    pub joined_at: DateTime<Utc>,
    pub account_created_at: DateTime<Utc>,
}

/// What the caller should do about a suspicious join.
#[derive(Debug, Clone, PartialEq)]
pub struct RaidAlert {
    pub tenant_id: u64,
    pub user_id: u64,
    pub timeout_minutes: u32,
    pub slowmode_seconds: u32,
    pub join_count: u32,
    pub account_age_days: i64,
}

pub struct RaidGuard {
    config: RaidConfig,
    joins: DashMap<u64, VecDeque<DateTime<Utc>>>,
    /// Per-tenant manual override (the `/raid off` command). Missing
    /// entry means on.
    manual_enabled: DashMap<u64, bool>,
}

impl RaidGuard {
    pub fn new(config: RaidConfig) -> Self {
        Self {
            config: config.clamped(),
            joins: DashMap::new(),
            manual_enabled: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RaidConfig {
        &self.config
    }

    pub fn is_enabled(&self, tenant_id: u64) -> bool {
        self.config.enabled
            && self
                .manual_enabled
                .get(&tenant_id)
                .map(|v| *v)
                .unwrap_or(true)
    }

    pub fn set_enabled(&self, tenant_id: u64, enabled: bool) {
        self.manual_enabled.insert(tenant_id, enabled);
    }

    /// Record a join and decide whether it looks like part of a raid.
    pub fn observe_join(&self, event: &JoinEvent) -> Option<RaidAlert> {
        if !self.is_enabled(event.tenant_id) {
            return None;
        }

        let now = event.joined_at;
        let cutoff = now - Duration::seconds(self.config.join_interval_seconds as i64);

        let mut q = self.joins.entry(event.tenant_id).or_default();
        q.push_back(now);
        while q.front().is_some_and(|t| *t < cutoff) {
            q.pop_front();
        }
        let join_count = q.len() as u32;
        drop(q);

        let account_age_days = (now - event.account_created_at).num_days();
        let burst = join_count >= self.config.join_threshold;
        let too_young = self.config.min_account_age_days > 0
            && account_age_days < self.config.min_account_age_days as i64;

        if burst || too_young {
            Some(RaidAlert {
                tenant_id: event.tenant_id,
                user_id: event.user_id,
                timeout_minutes: self.config.auto_timeout_minutes,
                slowmode_seconds: self.config.slowmode_seconds,
                join_count,
                account_age_days,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn join(tenant: u64, user: u64, at: DateTime<Utc>, age_days: i64) -> JoinEvent {
        JoinEvent {
            tenant_id: tenant,
            user_id: user,
            joined_at: at,
            account_created_at: at - Duration::days(age_days),
        }
    }

    #[test]
    fn burst_of_joins_triggers_on_the_threshold() {
        let guard = RaidGuard::new(RaidConfig::default());
        let now = t0();
        for i in 0..4u64 {
            assert!(guard
                .observe_join(&join(1, i, now + Duration::seconds(i as i64), 400))
                .is_none());
        }
        let alert = guard
            .observe_join(&join(1, 5, now + Duration::seconds(5), 400))
            .expect("fifth join within 15s should flag");
        assert_eq!(alert.join_count, 5);
        assert_eq!(alert.timeout_minutes, 10);
    }

    #[test]
    fn spaced_joins_never_trigger() {
        let guard = RaidGuard::new(RaidConfig::default());
        let mut now = t0();
        for i in 0..20u64 {
            assert!(guard.observe_join(&join(1, i, now, 400)).is_none());
            now += Duration::seconds(30);
        }
    }

    #[test]
    fn young_account_flags_regardless_of_rate() {
        let config = RaidConfig {
            min_account_age_days: 7,
            ..Default::default()
        };
        let guard = RaidGuard::new(config);
        let alert = guard
            .observe_join(&join(1, 1, t0(), 2))
            .expect("2-day-old account should flag");
        assert_eq!(alert.account_age_days, 2);
    }

    #[test]
    fn join_windows_are_per_tenant() {
        let guard = RaidGuard::new(RaidConfig::default());
        let now = t0();
        for i in 0..4u64 {
            guard.observe_join(&join(1, i, now, 400));
        }
        // Tenant 2 has its own window.
        assert!(guard.observe_join(&join(2, 99, now, 400)).is_none());
    }

    #[test]
    fn oversized_slowmode_clamps_to_discord_maximum() {
        let config = RaidConfig {
            slowmode_seconds: 100_000,
            ..Default::default()
        };
        let guard = RaidGuard::new(config);
        assert_eq!(guard.config().slowmode_seconds, 21_600);

        let now = t0();
        for i in 0..4u64 {
            guard.observe_join(&join(1, i, now, 400));
        }
        let alert = guard
            .observe_join(&join(1, 5, now + Duration::seconds(1), 400))
            .expect("burst should flag");
        assert_eq!(alert.slowmode_seconds, 21_600);
    }

    #[test]
    fn manual_toggle_overrides_per_tenant() {
        let guard = RaidGuard::new(RaidConfig::default());
        guard.set_enabled(1, false);
        let now = t0();
        for i in 0..10u64 {
            assert!(guard.observe_join(&join(1, i, now, 400)).is_none());
        }
        // Other tenants unaffected by the toggle.
        assert!(guard.is_enabled(2));

        guard.set_enabled(1, true);
        assert!(guard.is_enabled(1));
    }
}
