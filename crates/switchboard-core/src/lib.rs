//! Switchboard Core - shared values and collaborator contracts.
//!
//! This crate provides the foundational types the rest of the workspace
//! builds on:
//!
//! - [`ParameterSource`] and [`IdentityProvider`]: the request collaborators
//!   conditions consult during a dispatch cycle
//! - [`RequestParameters`] and [`StaticIdentity`]: in-memory implementations
//! - [`value`]: scalar semantics (display, numeric checks, loose equality)
//!   for the dynamic [`Value`]s carried through the engine
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  switchboard-cli    │  (User interface)
//! └─────────┬───────────┘
//!           │
//!           ▼
//! ┌─────────────────────────┐     ┌──────────────────┐
//! │ switchboard-rule-engine │ ──▶ │ switchboard-url  │
//! └─────────┬───────────────┘     └────────┬─────────┘
//!           │                              │
//!           ▼                              ▼
//! ┌─────────────────────────────────────────────────┐
//! │  switchboard-core  (This crate)                 │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod collaborator;
pub mod error;
pub mod types;
pub mod value;

pub use collaborator::{
    parse_assignment, IdentityProvider, ParameterSource, RequestParameters, StaticIdentity,
};
pub use error::{Error, Result};
pub use serde_json::{Map, Value};
pub use types::{DispatchMode, ParamScope};
