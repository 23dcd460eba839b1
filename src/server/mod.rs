//! Server configuration, startup guards and MCP runtime.
pub mod config;
pub mod guard;
pub mod runtime;
