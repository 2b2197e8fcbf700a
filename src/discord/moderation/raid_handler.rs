// Discord-specific raid handling - reacts to suspicious member joins.

use crate::core::antiraid::{JoinEvent, RaidAlert};
use crate::core::moderation::{ActionKind, AuditEntry};
use crate::discord::{Data, Error};
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;

/// Feed a member join to the raid guard and apply the response if it
/// flags: timeout the new member, enable slowmode, alert staff.
pub async fn handle_member_join(
    ctx: &serenity::Context,
    member: &serenity::Member,
    data: &Data,
) -> Result<(), Error> {
    let created_at = DateTime::<Utc>::from_timestamp(member.user.created_at().unix_timestamp(), 0)
        .unwrap_or_else(Utc::now);

    let event = JoinEvent {
        tenant_id: member.guild_id.get(),
        user_id: member.user.id.get(),
        joined_at: Utc::now(),
        account_created_at: created_at,
    };

    let Some(alert) = data.raid.observe_join(&event) else {
        return Ok(());
    };

    tracing::warn!(
        guild_id = alert.tenant_id,
        user_id = alert.user_id,
        join_count = alert.join_count,
        account_age_days = alert.account_age_days,
        "raid guard triggered"
    );

    // Timeout the new member.
    let until = serenity::Timestamp::from_unix_timestamp(
        Utc::now().timestamp() + (alert.timeout_minutes as i64) * 60,
    );
    match until {
        Ok(until) => {
            if let Err(e) = member
                .guild_id
                .edit_member(
                    &ctx.http,
                    member.user.id,
                    serenity::EditMember::new().disable_communication_until_datetime(until),
                )
                .await
            {
                tracing::warn!("Failed to timeout raid joiner: {}", e);
            }
        }
        Err(e) => tracing::error!("Failed to create timeout timestamp: {}", e),
    }

    apply_slowmode(ctx, member.guild_id, alert.slowmode_seconds).await;
    send_alert(ctx, &alert, data).await;

    let audit = AuditEntry {
        tenant_id: alert.tenant_id,
        kind: ActionKind::RaidTimeout,
        target_user_id: alert.user_id,
        reason: format!(
            "Anti-raid: {} joins in window, account age {} days | {}m",
            alert.join_count, alert.account_age_days, alert.timeout_minutes
        ),
    };
    let bot_id = ctx.cache.current_user().id.get();
    if let Err(e) = crate::core::moderation::RecordSink::log_action(
        data.records.as_ref(),
        &audit,
        bot_id,
    )
    .await
    {
        tracing::warn!("Failed to write raid action log: {}", e);
    }

    Ok(())
}

/// Enable slowmode on the first text channel that has none yet. Best
/// effort; a channel we cannot edit is skipped.
async fn apply_slowmode(ctx: &serenity::Context, guild_id: serenity::GuildId, seconds: u32) {
    let channels = match guild_id.channels(&ctx.http).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to list channels for slowmode: {}", e);
            return;
        }
    };

    for channel in channels.values() {
        if channel.kind != serenity::ChannelType::Text {
            continue;
        }
        if channel.rate_limit_per_user.unwrap_or(0) > 0 {
            break;
        }
        let edit = serenity::EditChannel::new().rate_limit_per_user(seconds as u16);
        match channel.id.edit(&ctx.http, edit).await {
            Ok(_) => break,
            Err(_) => continue,
        }
    }
}

async fn send_alert(ctx: &serenity::Context, alert: &RaidAlert, data: &Data) {
    let Some(channel_id) = data.alert_channel_id else {
        return;
    };

    let embed = serenity::CreateEmbed::new()
        .title("🚨 Anti-Raid Triggered")
        .description(format!(
            "Suspicious join detected.\n\n**User:** <@{}>\n**Account Age:** {} days\n\
             **Joins in window:** {}\n**Action:** Auto-timeout + slowmode",
            alert.user_id, alert.account_age_days, alert.join_count
        ))
        .color(0xE74C3C)
        .timestamp(serenity::Timestamp::now());

    if let Err(e) = serenity::ChannelId::new(channel_id)
        .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
        .await
    {
        tracing::warn!("Failed to send raid alert: {}", e);
    }
}
