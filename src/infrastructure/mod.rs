//! Infrastructure layer - Store abstraction, persistence and configuration

pub mod config;
pub mod context;
pub mod memory;
pub mod snapshot;
pub mod store;

pub use config::EngineConfig;
pub use context::{ContentRecords, RequestContext, StaticContext};
pub use memory::MemoryStore;
pub use store::{transaction, TagStore};
