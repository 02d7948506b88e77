//! Managed components built on the lifecycle hooks

mod cache;
mod chat;
mod model;

pub use cache::MemoryCache;
pub use chat::{ChatClient, OutboundMessage};
pub use model::{ModelClient, ModelSession};
