// Moderation slash commands - thin controls over the engine and guards.

use crate::core::moderation::TenantUserKey;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

type Context<'a> = poise::Context<'a, Data, Error>;

/// AutoMod + AntiSpam controls.
#[poise::command(
    slash_command,
    subcommands("status", "enable", "disable"),
    required_permissions = "ADMINISTRATOR",
    guild_only
)]
pub async fn automod(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// Show current moderation status and thresholds.
#[poise::command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let engine = &ctx.data().engine;
    let cfg = engine.config();

    let flag = |on: bool| if on { "✅ ON" } else { "❌ OFF" };

    let embed = serenity::CreateEmbed::new()
        .title("🛡️ Moderation Status")
        .color(if engine.automod_enabled() { 0x2ECC71 } else { 0xE74C3C })
        .field("AutoMod", flag(engine.automod_enabled()), true)
        .field("AntiSpam", flag(engine.antispam_enabled()), true)
        .field(
            "Rate Limit",
            format!(
                "{} messages / {} seconds",
                cfg.antispam.max_messages, cfg.antispam.per_seconds
            ),
            false,
        )
        .field(
            "Duplicates",
            format!(
                "{} identical / {} seconds",
                cfg.antispam.max_duplicates, cfg.antispam.duplicate_window_seconds
            ),
            true,
        )
        .field(
            "Mentions",
            format!("max {} per message", cfg.automod.max_mentions),
            true,
        )
        .field(
            "Escalation",
            format!(
                "{} strikes warn → {} min timeout | automod: warn → {} min timeout → kick",
                cfg.antispam.warn_before_timeout,
                cfg.antispam.timeout_minutes,
                cfg.automod.repeat_timeout_minutes
            ),
            false,
        );

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Turn AutoMod + AntiSpam on.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn enable(ctx: Context<'_>) -> Result<(), Error> {
    ctx.data().engine.set_enabled(true);
    ctx.say("🛡️ AutoMod + AntiSpam turned **ON**").await?;
    Ok(())
}

/// Turn AutoMod + AntiSpam off.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn disable(ctx: Context<'_>) -> Result<(), Error> {
    ctx.data().engine.set_enabled(false);
    ctx.say("🛡️ AutoMod + AntiSpam turned **OFF**").await?;
    Ok(())
}

/// Anti-raid controls.
#[poise::command(
    slash_command,
    subcommands("raid_on", "raid_off", "raid_status"),
    required_permissions = "ADMINISTRATOR",
    guild_only
)]
pub async fn raid(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Enable anti-raid for this server.
#[poise::command(slash_command, guild_only, rename = "on", required_permissions = "ADMINISTRATOR")]
pub async fn raid_on(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    ctx.data().raid.set_enabled(guild_id.get(), true);
    ctx.say("🛡️ Anti-Raid turned **ON**").await?;
    Ok(())
}

/// Disable anti-raid for this server.
#[poise::command(slash_command, guild_only, rename = "off", required_permissions = "ADMINISTRATOR")]
pub async fn raid_off(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    ctx.data().raid.set_enabled(guild_id.get(), false);
    ctx.say("🛡️ Anti-Raid turned **OFF**").await?;
    Ok(())
}

/// Show anti-raid status.
#[poise::command(slash_command, guild_only, rename = "status")]
pub async fn raid_status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let enabled = ctx.data().raid.is_enabled(guild_id.get());
    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "🛡️ Anti-Raid is **{}**",
                if enabled { "ON" } else { "OFF" }
            ))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Reset strikes and automod violations for a user.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn clear_strikes(
    ctx: Context<'_>,
    #[description = "User to clear"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let key = TenantUserKey::new(guild_id.get(), user.id.get());

    ctx.data().engine.clear_user(key);

    let stored = ctx
        .data()
        .records
        .warning_count(guild_id.get(), user.id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    ctx.say(format!(
        "✅ Cleared in-memory strikes for <@{}> ({} warning{} remain on record).",
        user.id,
        stored,
        if stored == 1 { "" } else { "s" }
    ))
    .await?;
    Ok(())
}
