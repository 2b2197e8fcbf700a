// The two escalation tracks behind the engine.
//
// StrikeLedger (anti-spam) decays: strikes evaporate after a quiet period,
// checked lazily on every read. ViolationCounter (automod) never decays
// and only resets after the terminal action actually lands. They look
// similar but encode different punishment policies on purpose - do not
// merge them.

use super::moderation_models::TenantUserKey;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Decaying strike counter for the anti-spam track.
pub struct StrikeLedger {
    reset_minutes: u64,
    strikes: DashMap<TenantUserKey, (u32, DateTime<Utc>)>,
}

impl StrikeLedger {
    pub fn new(reset_minutes: u64) -> Self {
        Self {
            reset_minutes,
            strikes: DashMap::new(),
        }
    }

    /// Current strike count with decay applied. An entry older than the
    /// reset period reads as 0 and is dropped; the stored value is never
    /// proactively expired otherwise.
    pub fn read(&self, key: TenantUserKey, now: DateTime<Utc>) -> u32 {
        let Some(entry) = self.strikes.get(&key) else {
            return 0;
        };
        let (count, last_time) = *entry;
        drop(entry);

        if self.is_expired(last_time, now) {
            self.strikes.remove(&key);
            return 0;
        }
        count
    }

    /// Add one strike on top of the decayed count and return the new total.
    pub fn increment(&self, key: TenantUserKey, now: DateTime<Utc>) -> u32 {
        let mut entry = self.strikes.entry(key).or_insert((0, now));
        let (count, last_time) = *entry;
        let current = if self.is_expired(last_time, now) { 0 } else { count };
        let new_count = current + 1;
        *entry = (new_count, now);
        new_count
    }

    /// Drop a user's strikes entirely (manual moderator action).
    pub fn clear(&self, key: TenantUserKey) {
        self.strikes.remove(&key);
    }

    fn is_expired(&self, last_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (now - last_time).num_seconds() > (self.reset_minutes * 60) as i64
    }
}

/// Monotonic violation counter for the automod track. No time decay;
/// `reset` is called only after a successful kick so a kicked user comes
/// back to a clean slate.
pub struct ViolationCounter {
    counts: DashMap<TenantUserKey, u32>,
}

impl ViolationCounter {
    pub fn new() -> Self {
        Self {
            counts: DashMap::new(),
        }
    }

    pub fn increment(&self, key: TenantUserKey) -> u32 {
        let mut entry = self.counts.entry(key).or_insert(0);
        *entry += 1;
        *entry
    }

    pub fn read(&self, key: TenantUserKey) -> u32 {
        self.counts.get(&key).map(|v| *v).unwrap_or(0)
    }

    pub fn reset(&self, key: TenantUserKey) {
        self.counts.remove(&key);
    }
}

impl Default for ViolationCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn key() -> TenantUserKey {
        TenantUserKey::new(1, 2)
    }

    #[test]
    fn strikes_accumulate_within_the_reset_window() {
        let ledger = StrikeLedger::new(10);
        let mut now = t0();
        // One strike per minute, well inside the 10 minute reset.
        for expected in 1..=3 {
            assert_eq!(ledger.increment(key(), now), expected);
            now += Duration::minutes(1);
        }
    }

    #[test]
    fn read_after_quiet_period_returns_zero() {
        let ledger = StrikeLedger::new(10);
        let now = t0();
        ledger.increment(key(), now);
        ledger.increment(key(), now + Duration::minutes(1));

        // Entry was never explicitly cleared, but reads as 0 once stale.
        let later = now + Duration::minutes(12);
        assert_eq!(ledger.read(key(), later), 0);
    }

    #[test]
    fn read_within_reset_window_has_no_side_effects() {
        let ledger = StrikeLedger::new(10);
        let now = t0();
        ledger.increment(key(), now);
        assert_eq!(ledger.read(key(), now + Duration::minutes(5)), 1);
        assert_eq!(ledger.read(key(), now + Duration::minutes(5)), 1);
    }

    #[test]
    fn increment_after_decay_restarts_from_one() {
        let ledger = StrikeLedger::new(10);
        let now = t0();
        ledger.increment(key(), now);
        ledger.increment(key(), now + Duration::minutes(1));
        assert_eq!(ledger.increment(key(), now + Duration::minutes(30)), 1);
    }

    #[test]
    fn escalation_crosses_warn_threshold_at_the_right_call() {
        // warn_before_timeout = 2: strikes 1 and 2 warn, strike 3 times out.
        let warn_before_timeout = 2u32;
        let ledger = StrikeLedger::new(60);
        let mut now = t0();
        for call in 1..=warn_before_timeout + 1 {
            let strikes = ledger.increment(key(), now);
            assert_eq!(strikes, call);
            if call <= warn_before_timeout {
                assert!(strikes <= warn_before_timeout);
            } else {
                assert!(strikes > warn_before_timeout);
            }
            now += Duration::minutes(1);
        }
    }

    #[test]
    fn violation_counter_is_monotonic_until_reset() {
        let counter = ViolationCounter::new();
        assert_eq!(counter.increment(key()), 1);
        assert_eq!(counter.increment(key()), 2);
        assert_eq!(counter.increment(key()), 3);
        assert_eq!(counter.read(key()), 3);

        counter.reset(key());
        assert_eq!(counter.read(key()), 0);
        assert_eq!(counter.increment(key()), 1);
    }

    #[test]
    fn counters_are_isolated_per_tenant() {
        let counter = ViolationCounter::new();
        let a = TenantUserKey::new(1, 7);
        let b = TenantUserKey::new(2, 7);
        counter.increment(a);
        counter.increment(a);
        assert_eq!(counter.read(b), 0);
    }
}
