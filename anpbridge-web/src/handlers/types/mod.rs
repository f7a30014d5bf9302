//! Request/response types used by the handlers

pub mod common;
pub mod mcp;

pub use common::*;
pub use mcp::*;
