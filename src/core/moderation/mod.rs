// Core moderation module - abuse detection and progressive enforcement.

pub mod classifier;
pub mod engine;
pub mod escalation;
pub mod moderation_models;
pub mod policy;
pub mod windows;

pub use classifier::MentionCounts;
pub use engine::{AbuseEngine, RecordSink, SinkError};
pub use moderation_models::*;
