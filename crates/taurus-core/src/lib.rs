//! Wrapper for the eToro API.
//!
//! - [`auth`]: per-service credential files and interactive setup
//! - [`api`]: authenticated HTTP access to the API gateway
//! - [`models`]: helpers for working with JSON responses
//! - [`config`]: application settings

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, ConnectionState};
pub use auth::{
    CredentialError, CredentialMap, CredentialStore, Overwrite, Prompt, ServiceProfile, ETORO,
};
pub use config::Config;
pub use models::{Behavior, JsonWrap};
pub use utils::{add_url, Params};
