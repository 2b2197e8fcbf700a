// Enforcement policy - maps a detection outcome and a counter value to a
// concrete decision. Pure functions; all state lives in the escalation
// tracks and all side effects in the caller.

use super::moderation_models::{
    ActionKind, AuditEntry, EnforcementDecision, PunitiveAction, TenantUserKey,
};

/// Anti-spam track: warn while `strikes <= warn_before_timeout`, then
/// timeout. The triggering message is always deleted.
pub fn antispam_decision(
    key: TenantUserKey,
    strikes: u32,
    warn_before_timeout: u32,
    timeout_minutes: u32,
    reason_text: &str,
) -> EnforcementDecision {
    let reason = format!("AntiSpam: {reason_text} (strike {strikes})");

    if strikes <= warn_before_timeout {
        EnforcementDecision {
            delete_message: true,
            action: PunitiveAction::Warn,
            dm_text: Some(format!(
                "Anti-spam warning ({strikes}/{warn_before_timeout}): your message was \
                 removed for **{reason_text}**. Next offenses may result in a timeout."
            )),
            audit: Some(AuditEntry {
                tenant_id: key.tenant_id,
                kind: ActionKind::AntispamWarn,
                target_user_id: key.user_id,
                reason: reason.clone(),
            }),
            reason,
        }
    } else {
        EnforcementDecision {
            delete_message: true,
            action: PunitiveAction::Timeout {
                minutes: timeout_minutes,
            },
            dm_text: Some(format!(
                "You have been timed out.\nReason: **{reason_text}**\n\
                 Duration: **{timeout_minutes} minutes**"
            )),
            audit: Some(AuditEntry {
                tenant_id: key.tenant_id,
                kind: ActionKind::AntispamTimeout,
                target_user_id: key.user_id,
                reason: format!("{reason} | {timeout_minutes}m"),
            }),
            reason,
        }
    }
}

/// Automod track: progressive 1 -> warn, 2 -> timeout, 3+ -> kick.
/// The kick carries a fallback timeout for the caller in case the
/// platform refuses the kick.
pub fn automod_decision(
    key: TenantUserKey,
    violation_count: u32,
    repeat_timeout_minutes: u32,
    violations_text: &str,
) -> EnforcementDecision {
    match violation_count {
        1 => EnforcementDecision {
            delete_message: true,
            action: PunitiveAction::Warn,
            reason: format!("[1st Warning] {violations_text}"),
            dm_text: Some(format!(
                "**Violation:** {violations_text}\n\n**Warning 1/3**\nNext violation = timeout."
            )),
            audit: Some(AuditEntry {
                tenant_id: key.tenant_id,
                kind: ActionKind::AutomodWarn,
                target_user_id: key.user_id,
                reason: format!("[1st Warning] {violations_text}"),
            }),
        },
        2 => EnforcementDecision {
            delete_message: true,
            action: PunitiveAction::Timeout {
                minutes: repeat_timeout_minutes,
            },
            reason: format!("[2nd Warning - Timeout {repeat_timeout_minutes}min] {violations_text}"),
            dm_text: Some(format!(
                "**Violation:** {violations_text}\n\n**Warning 2/3**\n\
                 Timed out for {repeat_timeout_minutes} min.\nNext violation = kick."
            )),
            audit: Some(AuditEntry {
                tenant_id: key.tenant_id,
                kind: ActionKind::AutomodTimeout,
                target_user_id: key.user_id,
                reason: format!(
                    "[2nd Warning - Timeout {repeat_timeout_minutes}min] {violations_text}"
                ),
            }),
        },
        _ => EnforcementDecision {
            delete_message: true,
            action: PunitiveAction::Kick {
                fallback_timeout_minutes: repeat_timeout_minutes,
            },
            reason: format!("[3rd Warning - Kicked] {violations_text}"),
            dm_text: Some(format!(
                "**Violation:** {violations_text}\n\nKicked for repeated violations."
            )),
            audit: Some(AuditEntry {
                tenant_id: key.tenant_id,
                kind: ActionKind::AutomodKick,
                target_user_id: key.user_id,
                reason: format!("[3rd Warning - Kicked] {violations_text}"),
            }),
        },
    }
}
