use std::path::PathBuf;

use thiserror::Error;

use crate::utils::ini::IniError;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Could not determine the home directory")]
    NoHomeDirectory,

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed credential file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: IniError,
    },

    #[error("Section [{section}] not found in {path}")]
    MissingSection { section: String, path: PathBuf },

    #[error("Section [{section}] in {path} has no entries")]
    EmptySection { section: String, path: PathBuf },

    #[error("Credential `{0}` is not set")]
    MissingKey(String),

    #[error("Invalid credential name `{0}`")]
    InvalidKey(String),

    #[error("Value of `{0}` would change on reload (surrounding whitespace or `\\r`)")]
    InvalidValue(String),

    #[error("Prompt failed: {0}")]
    Prompt(#[source] std::io::Error),
}

impl CredentialError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CredentialError::Io {
            path: path.into(),
            source,
        }
    }
}
