//! Shared library modules: error types, field conversion, the `agentkit` command builder, and telemetry.

pub mod agentkit_cli;
pub mod convention;
pub mod errors;
pub mod telemetry;
