//! Switchboard CLI library components.
//!
//! This crate provides the command-line interface over the rule engine and
//! URL resources. The main binary is in `main.rs`.

pub mod commands;
pub mod formatters;
pub mod session;

pub use formatters::OutputFormat;
pub use session::{HandlerCall, HandlerLog, RequestSpec, Session};
