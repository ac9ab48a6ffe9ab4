//! Credential management for API services.
//!
//! This module provides:
//! - `CredentialStore`: per-service INI file under `~/.credentials`
//! - `Prompt`: interactive input used by credential setup
//!
//! Each service owns one file holding a single profile section.

pub mod credentials;
pub mod error;
pub mod prompt;

pub use credentials::{
    CredentialMap, CredentialStore, Overwrite, ServiceProfile, DEFAULT_CREDENTIALS_FOLDER, ETORO,
};
pub use error::CredentialError;
pub use prompt::{Prompt, ScriptedPrompt};
