use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised by the login flow and its collaborators
#[derive(Debug, Error)]
pub enum LoginError {
    /// The credentials file could not be opened or read
    #[error("failed to read credentials file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A configuration value is invalid
    #[error("invalid {setting} '{value}', valid options are: {valid}")]
    Config {
        setting: &'static str,
        value: String,
        valid: String,
    },

    #[error("profile '{0}' not found in credentials")]
    ProfileNotFound(String),

    #[error("MFA serial not configured for profile '{0}'")]
    MfaNotConfigured(String),

    /// The auth driver could not produce a code
    #[error("{0}")]
    Driver(String),

    #[error("{0}")]
    UnsupportedOperation(String),

    /// A session-token or assume-role exchange failed
    #[error("{0}")]
    Exchange(String),

    /// Registry login failed; never fatal for the flow
    #[error("{0}")]
    RegistryLogin(String),

    /// The session could not be handed off
    #[error("failed to write session file {}: {source}", path.display())]
    Publish {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T, E = LoginError> = std::result::Result<T, E>;
