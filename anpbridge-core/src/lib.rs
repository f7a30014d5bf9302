//! ANP Bridge Core - session lifecycle and authentication
//!
//! Turns a stateless bridge into a multi-tenant one: bearer tokens resolve to
//! credentials, credentials back isolated sessions, idle sessions get reaped.
//! Nothing in this crate knows about HTTP.

pub mod config;
pub mod error;
pub mod logging;
pub mod reaper;
pub mod session;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use reaper::*;
pub use session::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tracing;
