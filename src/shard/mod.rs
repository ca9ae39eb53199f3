//! Shard management module
//!
//! One Twilight shard feeds guild events to the team service.

mod runner;
mod state;
mod tasks;

pub use runner::{BotContext, ShardRunner};
pub use state::{ShardHealth, ShardState};
pub use tasks::EventTasks;
