// Content classification - pure, stateless checks against a single message.
//
// Safe to call concurrently: nothing here holds state, the regexes are
// compiled once and only ever read.

use super::moderation_models::{MessageEvent, ModerationConfig, ViolationSet, ViolationTag};
use once_cell::sync::Lazy;
use regex::Regex;

static INVITE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(discord\.gg/|discord\.com/invite/|discordapp\.com/invite/)")
        .expect("invite regex")
});

// One alternation covering the ways links show up in chat: explicit
// schemes, www. prefixes, bare domain.tld and raw IPv4 literals. Plain
// prose without a dot + TLD must not match.
static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        (?:https?|ftp)://[^\s/$.?\#][^\s]* |
        www\.[^\s]+ |
        \b[a-z0-9-]+(?:\.[a-z0-9-]+)*\.(?:com|net|org|io|gg|xyz|cc|tv|me|co|us|uk|de|fr|ru|cn|jp|br|in|au|nl|pl|es|it|link|info|biz|app|dev|top|site|online|club|store|stream)(?:/[^\s]*)?\b |
        \b(?:\d{1,3}\.){3}\d{1,3}(?::\d+)?(?:/[^\s]*)?\b
        ",
    )
    .expect("url regex")
});

/// Counts supplied by the platform adapter alongside the raw text.
#[derive(Debug, Clone, Copy, Default)]
pub struct MentionCounts {
    pub users: u32,
    pub roles: u32,
}

impl MentionCounts {
    pub fn total(&self) -> u32 {
        self.users + self.roles
    }
}

/// True when the author bypasses every check: administrator, exempt
/// channel, or any exempt role. Evaluated before anything else so exempt
/// users never feed the windows or ledgers either.
pub fn is_exempt(event: &MessageEvent, config: &ModerationConfig) -> bool {
    if event.is_admin {
        return true;
    }
    if config.automod.exempt_channel_ids.contains(&event.channel_id) {
        return true;
    }
    event
        .member_roles
        .iter()
        .any(|r| config.automod.exempt_role_ids.contains(r))
}

/// Classify a message against the configured content rules.
///
/// Returns the full set of violations found; the engine decides which
/// escalation track they route to. Exempt authors always get an empty set.
pub fn classify(
    event: &MessageEvent,
    mentions: MentionCounts,
    config: &ModerationConfig,
) -> ViolationSet {
    let mut violations = ViolationSet::new();

    if is_exempt(event, config) {
        return violations;
    }

    let content = event.content.trim();
    let lowered = content.to_lowercase();

    if config.automod.enabled {
        let max_mentions = config.automod.max_mentions;
        if max_mentions > 0 && mentions.total() >= max_mentions {
            violations.push(ViolationTag::ExcessMentions(mentions.total()));
        }

        if config.automod.block_invites && INVITE_REGEX.is_match(content) {
            violations.push(ViolationTag::InviteLink);
        }

        if config.automod.block_links && URL_REGEX.is_match(content) {
            violations.push(ViolationTag::UrlLink);
        }

        for word in &config.automod.blocked_words {
            let word = word.to_lowercase();
            if !word.is_empty() && lowered.contains(&word) {
                violations.push(ViolationTag::BlockedWord(word));
                break;
            }
        }
    }

    if config.antispam.enabled && !content.is_empty() {
        let spammy = config
            .antispam
            .spam_keywords
            .iter()
            .any(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()));
        if spammy {
            violations.push(ViolationTag::KeywordSpam);
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(content: &str) -> MessageEvent {
        MessageEvent {
            tenant_id: 1,
            user_id: 2,
            channel_id: 3,
            content: content.to_string(),
            timestamp: Utc::now(),
            member_roles: vec![],
            is_admin: false,
        }
    }

    fn config() -> ModerationConfig {
        let mut cfg = ModerationConfig::default();
        cfg.automod.blocked_words = vec!["scam".to_string()];
        cfg
    }

    #[test]
    fn clean_prose_is_clean() {
        let set = classify(&event("just a normal sentence, nothing else"), MentionCounts::default(), &config());
        assert!(set.is_empty());
    }

    #[test]
    fn classify_is_idempotent() {
        let ev = event("join discord.gg/abc now");
        let cfg = config();
        let a = classify(&ev, MentionCounts::default(), &cfg);
        let b = classify(&ev, MentionCounts::default(), &cfg);
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn detects_invites() {
        let cfg = config();
        for text in [
            "discord.gg/abc123",
            "hey DISCORD.COM/INVITE/xyz",
            "discordapp.com/invite/q",
        ] {
            let set = classify(&event(text), MentionCounts::default(), &cfg);
            assert!(set.tags().contains(&ViolationTag::InviteLink), "{text}");
        }
    }

    #[test]
    fn url_detection_covers_obfuscated_forms() {
        let mut cfg = config();
        cfg.automod.block_links = true;
        for text in [
            "https://evil.example/path",
            "http://evil.example",
            "www.evil-site.net free stuff",
            "visit badsite.xyz/win",
            "connect to 192.168.1.1:8080/panel",
        ] {
            let set = classify(&event(text), MentionCounts::default(), &cfg);
            assert!(set.tags().contains(&ViolationTag::UrlLink), "{text}");
        }
    }

    #[test]
    fn ordinary_prose_is_not_a_url() {
        let mut cfg = config();
        cfg.automod.block_links = true;
        cfg.automod.blocked_words.clear();
        cfg.antispam.spam_keywords.clear();
        for text in ["hello there friend", "what time is it", "e.g some words"] {
            let set = classify(&event(text), MentionCounts::default(), &cfg);
            assert!(set.is_empty(), "{text} -> {:?}", set);
        }
    }

    #[test]
    fn links_ignored_when_not_blocked() {
        // block_links is off by default; bare domains pass automod but the
        // scheme-prefixed ones still hit the anti-spam keyword list.
        let set = classify(&event("see mysite.com/stuff"), MentionCounts::default(), &config());
        assert!(!set.tags().contains(&ViolationTag::UrlLink));
    }

    #[test]
    fn mention_threshold_is_inclusive() {
        let cfg = config();
        let at_limit = MentionCounts { users: 3, roles: 2 };
        let set = classify(&event("hi"), at_limit, &cfg);
        assert!(set.tags().contains(&ViolationTag::ExcessMentions(5)));

        let below = MentionCounts { users: 3, roles: 1 };
        let set = classify(&event("hi"), below, &cfg);
        assert!(set.is_empty());
    }

    #[test]
    fn zero_max_mentions_disables_the_check() {
        let mut cfg = config();
        cfg.automod.max_mentions = 0;
        let set = classify(&event("hi"), MentionCounts { users: 50, roles: 0 }, &cfg);
        assert!(!set
            .tags()
            .iter()
            .any(|t| matches!(t, ViolationTag::ExcessMentions(_))));
    }

    #[test]
    fn blocked_words_match_case_insensitively() {
        let set = classify(&event("this is a ScAm"), MentionCounts::default(), &config());
        assert!(set
            .tags()
            .contains(&ViolationTag::BlockedWord("scam".into())));
    }

    #[test]
    fn keyword_spam_from_antispam_list() {
        let set = classify(&event("FREE NITRO here"), MentionCounts::default(), &config());
        assert!(set.contains_keyword_spam());
        // Keyword spam alone is not an automod violation.
        assert!(!ViolationSet::new().has_automod_violation());
    }

    #[test]
    fn admin_and_exempt_roles_short_circuit() {
        let cfg = {
            let mut c = config();
            c.automod.exempt_role_ids.insert(99);
            c.automod.exempt_channel_ids.insert(42);
            c
        };

        let mut ev = event("scam discord.gg/x");
        ev.is_admin = true;
        assert!(classify(&ev, MentionCounts { users: 9, roles: 9 }, &cfg).is_empty());

        let mut ev = event("scam discord.gg/x");
        ev.member_roles = vec![99];
        assert!(classify(&ev, MentionCounts::default(), &cfg).is_empty());

        let mut ev = event("scam discord.gg/x");
        ev.channel_id = 42;
        assert!(classify(&ev, MentionCounts::default(), &cfg).is_empty());
    }
}
