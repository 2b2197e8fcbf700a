// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "antiraid/raid_service.rs"]
pub mod antiraid;
