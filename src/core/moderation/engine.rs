// The abuse engine - orchestrates classifier, windows, ledgers and policy
// for each incoming message.
//
// evaluate() is pure computation over in-memory state: no I/O, no await.
// The Discord layer executes whatever the returned decision asks for.
// Evaluations for the same (tenant, user) key are serialized behind a
// per-key lock; different keys proceed in parallel.

use super::classifier::{self, MentionCounts};
use super::escalation::{StrikeLedger, ViolationCounter};
use super::moderation_models::{
    AuditEntry, EnforcementDecision, MessageEvent, ModerationConfig, TenantUserKey,
};
use super::policy;
use super::windows::{DuplicateWindow, RateWindow};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("storage error: {0}")]
    StorageError(String),
}

/// Port for the warning/audit persistence collaborator. The engine itself
/// never calls this; the platform adapter writes records after executing
/// a decision, treating every failure as log-and-continue.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist a warning against the user. `moderator_id` is the bot's
    /// own user id (acting as "system").
    async fn add_warning(
        &self,
        tenant_id: u64,
        user_id: u64,
        moderator_id: u64,
        reason: &str,
    ) -> Result<(), SinkError>;

    /// Append an entry to the moderation action log.
    async fn log_action(&self, entry: &AuditEntry, moderator_id: u64) -> Result<(), SinkError>;
}

pub struct AbuseEngine {
    config: ModerationConfig,
    rate: RateWindow,
    duplicates: DuplicateWindow,
    strikes: StrikeLedger,
    violations: ViolationCounter,
    /// Serializes same-key evaluations: window + ledger updates are
    /// check-then-act and must not interleave for one user.
    locks: DashMap<TenantUserKey, Arc<Mutex<()>>>,
    antispam_enabled: AtomicBool,
    automod_enabled: AtomicBool,
}

impl AbuseEngine {
    pub fn new(config: ModerationConfig) -> Self {
        let config = config.clamped();
        Self {
            rate: RateWindow::new(config.antispam.max_messages, config.antispam.per_seconds),
            duplicates: DuplicateWindow::new(
                config.antispam.max_duplicates,
                config.antispam.duplicate_window_seconds,
            ),
            strikes: StrikeLedger::new(config.antispam.strikes_reset_minutes),
            violations: ViolationCounter::new(),
            locks: DashMap::new(),
            antispam_enabled: AtomicBool::new(config.antispam.enabled),
            automod_enabled: AtomicBool::new(config.automod.enabled),
            config,
        }
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    pub fn antispam_enabled(&self) -> bool {
        self.antispam_enabled.load(Ordering::Relaxed)
    }

    pub fn automod_enabled(&self) -> bool {
        self.automod_enabled.load(Ordering::Relaxed)
    }

    /// Runtime toggle for both subsystems (the `/automod` command).
    /// Thresholds stay immutable; only the on/off bits move.
    pub fn set_enabled(&self, enabled: bool) {
        self.antispam_enabled.store(enabled, Ordering::Relaxed);
        self.automod_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Evaluate one message event and decide what, if anything, to do.
    ///
    /// Pipeline order matters and is a behavioral contract: exemption
    /// first, then automod content rules (short-circuiting so one message
    /// is never punished twice), then the rate/duplicate/keyword checks.
    pub fn evaluate(&self, event: &MessageEvent, mentions: MentionCounts) -> EnforcementDecision {
        let antispam_on = self.antispam_enabled();
        let automod_on = self.automod_enabled();
        if !antispam_on && !automod_on {
            return EnforcementDecision::no_action();
        }

        // Exempt users never touch a window or ledger, so an admin's
        // history cannot build latent strikes that surface after a role
        // change.
        if classifier::is_exempt(event, &self.config) {
            return EnforcementDecision::no_action();
        }

        let key = event.key();
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let violations = classifier::classify(event, mentions, &self.config);

        // Track B: automod content violations, checked first.
        if automod_on && violations.has_automod_violation() {
            let count = self.violations.increment(key);
            return policy::automod_decision(
                key,
                count,
                self.config.automod.repeat_timeout_minutes,
                &violations.describe_automod(),
            );
        }

        // Track A: keyword/rate/duplicate spam against the decaying ledger.
        if antispam_on {
            let keyword_spam = violations.contains_keyword_spam();
            let rate_spam = self.rate.observe(key, event.timestamp);
            let dup_spam = self
                .duplicates
                .observe(key, &event.content, event.timestamp);

            if keyword_spam || rate_spam || dup_spam {
                let mut reasons = Vec::new();
                if keyword_spam {
                    reasons.push("keyword/link spam");
                }
                if rate_spam {
                    reasons.push("rate spam");
                }
                if dup_spam {
                    reasons.push("duplicate spam");
                }
                let reason_text = reasons.join(" + ");

                let strikes = self.strikes.increment(key, event.timestamp);
                return policy::antispam_decision(
                    key,
                    strikes,
                    self.config.antispam.warn_before_timeout,
                    self.config.antispam.timeout_minutes,
                    &reason_text,
                );
            }
        }

        EnforcementDecision::no_action()
    }

    /// Called by the platform adapter once a kick has actually succeeded.
    /// Gives the kicked user a clean automod slate; the strike ledger is
    /// untouched.
    pub fn acknowledge_kick(&self, key: TenantUserKey) {
        self.violations.reset(key);
    }

    /// Manual moderator reset of both tracks for one user.
    pub fn clear_user(&self, key: TenantUserKey) {
        self.strikes.clear(key);
        self.violations.reset(key);
    }

    /// Current automod violation count (for status displays).
    pub fn violation_count(&self, key: TenantUserKey) -> u32 {
        self.violations.read(key)
    }
}
