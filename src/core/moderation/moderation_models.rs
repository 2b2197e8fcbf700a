// Moderation domain models - data structures for the abuse-detection engine.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer converts these to Discord-specific actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Identity for all per-user tracking state. Every window and ledger is
/// scoped by this key, so activity in one server never leaks into another.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct TenantUserKey {
    pub tenant_id: u64,
    pub user_id: u64,
}

impl TenantUserKey {
    pub fn new(tenant_id: u64, user_id: u64) -> Self {
        Self { tenant_id, user_id }
    }
}

/// A normalized inbound message event, produced by the platform adapter.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub tenant_id: u64,
    pub user_id: u64,
    pub channel_id: u64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Role ids held by the author.
    pub member_roles: Vec<u64>,
    pub is_admin: bool,
}

impl MessageEvent {
    pub fn key(&self) -> TenantUserKey {
        TenantUserKey::new(self.tenant_id, self.user_id)
    }
}

/// One content-rule violation found by the classifier.
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationTag {
    /// Matched the anti-spam keyword list (scam phrases, raw links).
    KeywordSpam,
    /// Discord invite link.
    InviteLink,
    /// Generic URL (http, www, bare domain or IP literal).
    UrlLink,
    /// User + role mentions at or above the configured maximum.
    ExcessMentions(u32),
    /// Matched a configured blocked word.
    BlockedWord(String),
}

impl fmt::Display for ViolationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationTag::KeywordSpam => write!(f, "keyword/link spam"),
            ViolationTag::InviteLink => write!(f, "Discord invite link"),
            ViolationTag::UrlLink => write!(f, "link detected"),
            ViolationTag::ExcessMentions(n) => write!(f, "too many mentions ({n})"),
            ViolationTag::BlockedWord(w) => write!(f, "blocked word: {w}"),
        }
    }
}

/// Set of violations found in a single message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViolationSet {
    tags: Vec<ViolationTag>,
}

impl ViolationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: ViolationTag) {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags(&self) -> &[ViolationTag] {
        &self.tags
    }

    pub fn contains_keyword_spam(&self) -> bool {
        self.tags.contains(&ViolationTag::KeywordSpam)
    }

    /// True if any tag belongs to the automod track (everything except
    /// the anti-spam keyword list).
    pub fn has_automod_violation(&self) -> bool {
        self.tags
            .iter()
            .any(|t| !matches!(t, ViolationTag::KeywordSpam))
    }

    /// Human-readable joined description of the automod violations.
    pub fn describe_automod(&self) -> String {
        self.tags
            .iter()
            .filter(|t| !matches!(t, ViolationTag::KeywordSpam))
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// The punitive action (beyond message deletion) a decision asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum PunitiveAction {
    None,
    Warn,
    Timeout {
        minutes: u32,
    },
    /// Kick the user. If the platform refuses (insufficient permission),
    /// the caller falls back to a timeout of the given length and the
    /// violation counter is NOT reset.
    Kick {
        fallback_timeout_minutes: u32,
    },
}

/// Audit-log category written alongside enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActionKind {
    AntispamWarn,
    AntispamTimeout,
    AutomodWarn,
    AutomodTimeout,
    AutomodKick,
    RaidTimeout,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::AntispamWarn => "antispam_warn",
            ActionKind::AntispamTimeout => "antispam_timeout",
            ActionKind::AutomodWarn => "automod_warn",
            ActionKind::AutomodTimeout => "automod_timeout",
            ActionKind::AutomodKick => "automod_kick",
            ActionKind::RaidTimeout => "raid_timeout",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit-log write request. The acting party is always the bot itself,
/// so only the target is recorded here.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub tenant_id: u64,
    pub kind: ActionKind,
    pub target_user_id: u64,
    pub reason: String,
}

/// What the engine decided for one message. Pure data; the caller performs
/// every side effect and must treat each one as independently fallible.
#[derive(Debug, Clone, PartialEq)]
pub struct EnforcementDecision {
    pub delete_message: bool,
    pub action: PunitiveAction,
    pub reason: String,
    /// Best-effort direct message to the offender. Delivery failures are
    /// swallowed by the caller.
    pub dm_text: Option<String>,
    pub audit: Option<AuditEntry>,
}

impl EnforcementDecision {
    /// No violation detected - nothing to do.
    pub fn no_action() -> Self {
        Self {
            delete_message: false,
            action: PunitiveAction::None,
            reason: String::new(),
            dm_text: None,
            audit: None,
        }
    }

    pub fn is_no_action(&self) -> bool {
        !self.delete_message && self.action == PunitiveAction::None
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

fn default_true() -> bool {
    true
}

/// Anti-spam (strike track) settings: rate window, duplicate window and the
/// decaying strike ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntiSpamConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Messages allowed inside the rate window before flagging.
    #[serde(default = "AntiSpamConfig::default_max_messages")]
    pub max_messages: u32,
    /// Rate window length in seconds.
    #[serde(default = "AntiSpamConfig::default_per_seconds")]
    pub per_seconds: u64,
    /// Duplicate-detection window length in seconds.
    #[serde(default = "AntiSpamConfig::default_duplicate_window_seconds")]
    pub duplicate_window_seconds: u64,
    /// Identical messages inside the window before flagging.
    #[serde(default = "AntiSpamConfig::default_max_duplicates")]
    pub max_duplicates: u32,
    /// Minutes of clean behavior after which strikes reset.
    #[serde(default = "AntiSpamConfig::default_strikes_reset_minutes")]
    pub strikes_reset_minutes: u64,
    /// Strikes that only warn; anything above times out.
    #[serde(default = "AntiSpamConfig::default_warn_before_timeout")]
    pub warn_before_timeout: u32,
    /// Timeout length once strikes exceed the warn threshold.
    #[serde(default = "AntiSpamConfig::default_timeout_minutes")]
    pub timeout_minutes: u32,
    /// Phrases that mark a message as keyword spam (case-insensitive
    /// substring match).
    #[serde(default = "AntiSpamConfig::default_spam_keywords")]
    pub spam_keywords: Vec<String>,
}

impl AntiSpamConfig {
    fn default_max_messages() -> u32 {
        6
    }
    fn default_per_seconds() -> u64 {
        8
    }
    fn default_duplicate_window_seconds() -> u64 {
        12
    }
    fn default_max_duplicates() -> u32 {
        3
    }
    fn default_strikes_reset_minutes() -> u64 {
        10
    }
    fn default_warn_before_timeout() -> u32 {
        2
    }
    fn default_timeout_minutes() -> u32 {
        5
    }
    fn default_spam_keywords() -> Vec<String> {
        [
            "scam",
            "free nitro",
            "airdrop",
            "claim",
            "giveaway",
            "discord.gg/",
            "discord.com/invite",
            "http://",
            "https://",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    /// Clamp out-of-range values to sane bounds. Applied once at load so
    /// per-call code never has to re-validate.
    pub fn clamped(mut self) -> Self {
        self.max_messages = self.max_messages.max(1);
        self.per_seconds = self.per_seconds.clamp(1, 3600);
        self.duplicate_window_seconds = self.duplicate_window_seconds.clamp(1, 3600);
        self.max_duplicates = self.max_duplicates.max(1);
        self.strikes_reset_minutes = self.strikes_reset_minutes.max(1);
        self.timeout_minutes = self.timeout_minutes.clamp(1, 7 * 24 * 60);
        self
    }
}

impl Default for AntiSpamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_messages: Self::default_max_messages(),
            per_seconds: Self::default_per_seconds(),
            duplicate_window_seconds: Self::default_duplicate_window_seconds(),
            max_duplicates: Self::default_max_duplicates(),
            strikes_reset_minutes: Self::default_strikes_reset_minutes(),
            warn_before_timeout: Self::default_warn_before_timeout(),
            timeout_minutes: Self::default_timeout_minutes(),
            spam_keywords: Self::default_spam_keywords(),
        }
    }
}

/// Automod (violation track) settings: content rules and the non-decaying
/// progressive punishment counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoModConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Mentions (users + roles) at or above this count flag the message.
    /// 0 disables the check.
    #[serde(default = "AutoModConfig::default_max_mentions")]
    pub max_mentions: u32,
    #[serde(default = "default_true")]
    pub block_invites: bool,
    /// Block all links, not just invites.
    #[serde(default)]
    pub block_links: bool,
    /// Words that are never allowed (case-insensitive substring match).
    #[serde(default)]
    pub blocked_words: Vec<String>,
    /// Timeout length for the second violation (and for the kick fallback).
    #[serde(default = "AutoModConfig::default_repeat_timeout_minutes")]
    pub repeat_timeout_minutes: u32,
    /// Channels where no checks run at all.
    #[serde(default)]
    pub exempt_channel_ids: HashSet<u64>,
    /// Roles whose holders bypass all checks.
    #[serde(default)]
    pub exempt_role_ids: HashSet<u64>,
}

impl AutoModConfig {
    fn default_max_mentions() -> u32 {
        5
    }
    fn default_repeat_timeout_minutes() -> u32 {
        10
    }

    pub fn clamped(mut self) -> Self {
        self.repeat_timeout_minutes = self.repeat_timeout_minutes.clamp(1, 7 * 24 * 60);
        self
    }
}

impl Default for AutoModConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_mentions: Self::default_max_mentions(),
            block_invites: true,
            block_links: false,
            blocked_words: Vec::new(),
            repeat_timeout_minutes: Self::default_repeat_timeout_minutes(),
            exempt_channel_ids: HashSet::new(),
            exempt_role_ids: HashSet::new(),
        }
    }
}

/// Resolved moderation configuration, built once at startup and shared
/// immutably across all evaluations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModerationConfig {
    #[serde(default)]
    pub antispam: AntiSpamConfig,
    #[serde(default)]
    pub automod: AutoModConfig,
}

impl ModerationConfig {
    pub fn clamped(self) -> Self {
        Self {
            antispam: self.antispam.clamped(),
            automod: self.automod.clamped(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ModerationConfig::default();
        assert_eq!(cfg.antispam.max_messages, 6);
        assert_eq!(cfg.antispam.per_seconds, 8);
        assert_eq!(cfg.antispam.duplicate_window_seconds, 12);
        assert_eq!(cfg.antispam.max_duplicates, 3);
        assert_eq!(cfg.antispam.warn_before_timeout, 2);
        assert_eq!(cfg.antispam.timeout_minutes, 5);
        assert_eq!(cfg.automod.max_mentions, 5);
        assert!(cfg.automod.block_invites);
        assert!(!cfg.automod.block_links);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        // An empty object must deserialize into the full default config.
        let cfg: ModerationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.antispam.max_messages, 6);
        assert_eq!(cfg.automod.repeat_timeout_minutes, 10);

        // Partial overrides keep the rest at defaults.
        let cfg: ModerationConfig =
            serde_json::from_str(r#"{"antispam": {"max_messages": 3}}"#).unwrap();
        assert_eq!(cfg.antispam.max_messages, 3);
        assert_eq!(cfg.antispam.per_seconds, 8);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let cfg: ModerationConfig = serde_json::from_str(
            r#"{"antispam": {"max_messages": 0, "per_seconds": 0, "timeout_minutes": 99999999}}"#,
        )
        .unwrap();
        let cfg = cfg.clamped();
        assert_eq!(cfg.antispam.max_messages, 1);
        assert_eq!(cfg.antispam.per_seconds, 1);
        assert_eq!(cfg.antispam.timeout_minutes, 7 * 24 * 60);
    }

    #[test]
    fn violation_set_dedups_and_describes() {
        let mut set = ViolationSet::new();
        set.push(ViolationTag::InviteLink);
        set.push(ViolationTag::InviteLink);
        set.push(ViolationTag::BlockedWord("scam".into()));
        assert_eq!(set.tags().len(), 2);
        assert!(set.has_automod_violation());
        assert_eq!(
            set.describe_automod(),
            "Discord invite link | blocked word: scam"
        );
    }
}
