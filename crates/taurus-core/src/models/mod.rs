//! Data models for API responses.
//!
//! - `JsonWrap`: field access over a JSON object, nested objects wrapped too
//! - `Behavior`: audience behavior that composes with `|`

pub mod wrap;

pub use wrap::{Behavior, Field, JsonWrap};
