//! Small helpers for query strings and credential files.

pub mod ini;
pub mod url;

pub use url::{add_url, Params};
