//! HTTP request handlers for the ANP bridge
//!
//! `health` is public; everything in `mcp` runs behind the session middleware.

pub mod health;
pub mod mcp;
pub mod types;

pub use health::*;
pub use mcp::*;

pub use types::*;
