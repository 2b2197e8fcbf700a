// Discord-specific abuse handling - translates engine decisions into
// platform actions.
//
// The engine only computes; everything here (delete, DM, timeout, kick,
// record writes) is independently fallible and handled log-and-continue.
// A failure in one action never aborts the rest, and ledger state is
// never rolled back - a counted strike stays counted.

use crate::core::moderation::{
    ActionKind, AuditEntry, EnforcementDecision, MentionCounts, MessageEvent, PunitiveAction,
    RecordSink,
};
use crate::discord::{Data, Error};
use chrono::Utc;
use poise::serenity_prelude as serenity;

/// Check a message for abuse and enforce whatever the engine decides.
///
/// Returns `true` if the message was flagged and handled.
pub async fn handle_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<bool, Error> {
    // Skip bots
    if msg.author.bot {
        return Ok(false);
    }

    // Only guild messages are moderated
    let guild_id = match msg.guild_id {
        Some(id) => id.get(),
        None => return Ok(false),
    };

    let member = msg.member.as_deref();
    let member_roles: Vec<u64> = member
        .map(|m| m.roles.iter().map(|r| r.get()).collect())
        .unwrap_or_default();

    // PartialMember.permissions is only filled on interaction payloads;
    // gateway messages carry None, so admin status has to come from the
    // cached guild (owner, or any held role granting ADMINISTRATOR).
    let interaction_perms = member.and_then(|m| m.permissions);
    let is_admin = match msg.guild(&ctx.cache) {
        Some(guild) => resolve_admin(
            interaction_perms,
            guild.owner_id == msg.author.id,
            member
                .map(|m| m.roles.as_slice())
                .unwrap_or_default()
                .iter()
                .filter_map(|r| guild.roles.get(r).map(|role| role.permissions)),
        ),
        None => resolve_admin(interaction_perms, false, std::iter::empty()),
    };

    let event = MessageEvent {
        tenant_id: guild_id,
        user_id: msg.author.id.get(),
        channel_id: msg.channel_id.get(),
        content: msg.content.clone(),
        timestamp: Utc::now(),
        member_roles,
        is_admin,
    };
    let mentions = MentionCounts {
        users: msg.mentions.len() as u32,
        roles: msg.mention_roles.len() as u32,
    };

    let decision = data.engine.evaluate(&event, mentions);
    if decision.is_no_action() {
        return Ok(false);
    }

    tracing::info!(
        guild_id,
        user_id = event.user_id,
        reason = %decision.reason,
        "abuse detected"
    );

    apply_decision(ctx, msg, &event, &decision, data).await;
    Ok(true)
}

/// Execute every part of a decision, each best-effort.
async fn apply_decision(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    event: &MessageEvent,
    decision: &EnforcementDecision,
    data: &Data,
) {
    // The triggering message goes first, regardless of tier.
    if decision.delete_message {
        if let Err(e) = msg.delete(&ctx.http).await {
            tracing::warn!("Failed to delete flagged message: {}", e);
        }
    }

    // DM is attempted before any punitive action so a kicked user still
    // sees why. Delivery failure is swallowed.
    if let Some(text) = &decision.dm_text {
        if let Err(e) = msg
            .author
            .dm(&ctx.http, serenity::CreateMessage::new().content(text))
            .await
        {
            tracing::debug!("Failed to DM offender: {}", e);
        }
    }

    match &decision.action {
        PunitiveAction::None | PunitiveAction::Warn => {}

        PunitiveAction::Timeout { minutes } => {
            timeout_member(ctx, msg, *minutes, &decision.reason).await;
        }

        PunitiveAction::Kick {
            fallback_timeout_minutes,
        } => {
            let Some(guild_id) = msg.guild_id else { return };
            match guild_id
                .kick_with_reason(&ctx.http, msg.author.id, &decision.reason)
                .await
            {
                Ok(()) => {
                    // Clean slate only once the kick actually landed.
                    data.engine.acknowledge_kick(event.key());
                }
                Err(e) if is_forbidden(&e) => {
                    tracing::warn!("Kick forbidden, falling back to timeout: {}", e);
                    timeout_member(ctx, msg, *fallback_timeout_minutes, &decision.reason).await;
                }
                Err(e) => {
                    tracing::error!("Failed to kick user: {}", e);
                }
            }
        }
    }

    if let Some(audit) = &decision.audit {
        let bot_id = ctx.cache.current_user().id.get();
        write_records(data.records.as_ref(), audit, bot_id).await;
    }
}

/// Persist the audit trail: every action is logged, and everything except
/// a plain anti-spam timeout also counts as a stored warning.
async fn write_records(sink: &dyn RecordSink, audit: &AuditEntry, bot_id: u64) {
    let warn_worthy = !matches!(audit.kind, ActionKind::AntispamTimeout | ActionKind::RaidTimeout);
    if warn_worthy {
        if let Err(e) = sink
            .add_warning(audit.tenant_id, audit.target_user_id, bot_id, &audit.reason)
            .await
        {
            tracing::warn!("Failed to store warning: {}", e);
        }
    }

    if let Err(e) = sink.log_action(audit, bot_id).await {
        tracing::warn!("Failed to write action log: {}", e);
    }
}

async fn timeout_member(ctx: &serenity::Context, msg: &serenity::Message, minutes: u32, reason: &str) {
    let Some(guild_id) = msg.guild_id else { return };

    let until = match serenity::Timestamp::from_unix_timestamp(
        Utc::now().timestamp() + (minutes as i64) * 60,
    ) {
        Ok(ts) => ts,
        Err(e) => {
            tracing::error!("Failed to create timeout timestamp: {}", e);
            return;
        }
    };

    if let Err(e) = guild_id
        .edit_member(
            &ctx.http,
            msg.author.id,
            serenity::EditMember::new().disable_communication_until_datetime(until),
        )
        .await
    {
        tracing::error!("Failed to timeout user ({}): {}", reason, e);
    }
}

fn is_forbidden(err: &serenity::Error) -> bool {
    match err {
        serenity::Error::Http(http) => http.status_code() == Some(serenity::StatusCode::FORBIDDEN),
        _ => false,
    }
}

/// Resolve the author's admin bit. Interaction-supplied permissions win
/// when present; otherwise owner status or any role with ADMINISTRATOR
/// counts.
fn resolve_admin(
    interaction_permissions: Option<serenity::Permissions>,
    is_owner: bool,
    mut role_permissions: impl Iterator<Item = serenity::Permissions>,
) -> bool {
    if let Some(p) = interaction_permissions {
        return p.administrator();
    }
    is_owner || role_permissions.any(|p| p.administrator())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_message_without_permissions_uses_role_lookup() {
        // Gateway MESSAGE_CREATE payloads never carry member permissions;
        // an admin role found in the cached guild must still exempt.
        let roles = [
            serenity::Permissions::SEND_MESSAGES,
            serenity::Permissions::ADMINISTRATOR,
        ];
        assert!(resolve_admin(None, false, roles.into_iter()));
    }

    #[test]
    fn plain_member_is_not_admin() {
        let roles = [serenity::Permissions::SEND_MESSAGES];
        assert!(!resolve_admin(None, false, roles.into_iter()));
        assert!(!resolve_admin(None, false, std::iter::empty()));
    }

    #[test]
    fn guild_owner_is_admin_without_any_role() {
        assert!(resolve_admin(None, true, std::iter::empty()));
    }

    #[test]
    fn interaction_permissions_take_precedence() {
        assert!(resolve_admin(
            Some(serenity::Permissions::ADMINISTRATOR),
            false,
            std::iter::empty(),
        ));
        // Explicit non-admin permissions are trusted over role lookup.
        let roles = [serenity::Permissions::ADMINISTRATOR];
        assert!(!resolve_admin(
            Some(serenity::Permissions::SEND_MESSAGES),
            false,
            roles.into_iter(),
        ));
    }
}
