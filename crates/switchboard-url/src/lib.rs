//! Switchboard URL - placeholder patterns in both directions
//!
//! A pattern like `/users/{photo.owner.id}` is both a matcher for incoming
//! paths and a builder for canonical URLs:
//!
//! ```
//! use switchboard_url::UrlPattern;
//! use serde_json::json;
//!
//! let pattern = UrlPattern::parse("owner", "/users/{photo.owner.id}").unwrap();
//! let url = pattern.build(&json!({"photo": {"owner": {"id": 7}}}), true).unwrap();
//! assert_eq!(url, "/users/7");
//!
//! let found = pattern.matches("/users/7").unwrap().unwrap();
//! assert_eq!(found.get("photo.owner.id"), Some("7"));
//! ```

pub mod error;
pub mod origin;
pub mod pattern;
pub mod resources;

pub use error::{Result, UrlError};
pub use origin::{default_port, Origin};
pub use pattern::{PatternMatch, Placeholder, PropertyPath, UrlPattern};
pub use resources::Resources;
