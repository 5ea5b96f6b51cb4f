//! quill-core: the conversation loop, session setup and token accounting.

pub mod agent;
pub mod config;
mod error;
pub mod message;
pub mod session;
pub mod token_stats;
pub mod usage;

pub use agent::{Agent, AgentConfig, AgentProcessError, EventCallback, TurnOutcome, DEFAULT_SYSTEM_PROMPT};
pub use config::{Config, ConfigStore, Profile};
pub use error::QuillError;
pub use message::{ContentBlock, Message, MessageId, Role};
pub use session::build_toolset;
pub use token_stats::TokenStats;
pub use usage::{GlobalStats, GlobalStatsStore, RequestUsage, SessionUsage, SharedTracker, TokenTracker};
