// Discord layer - event handlers and slash commands.

#[path = "moderation/abuse_handler.rs"]
pub mod abuse_handler;

#[path = "moderation/raid_handler.rs"]
pub mod raid_handler;

#[path = "moderation/commands.rs"]
pub mod commands;

use crate::core::antiraid::RaidGuard;
use crate::core::moderation::AbuseEngine;
use crate::infra::moderation::SqliteRecordSink;
use std::sync::Arc;

/// Shared state handed to every command and event handler.
pub struct Data {
    pub engine: Arc<AbuseEngine>,
    pub raid: Arc<RaidGuard>,
    pub records: Arc<SqliteRecordSink>,
    /// Channel for staff raid alerts, if configured.
    pub alert_channel_id: Option<u64>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
