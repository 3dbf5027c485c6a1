use crate::error::{LoginError, Result};

/// Codes are typed by the operator at the MFA prompt; the driver itself
/// never produces one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualDriver;

impl ManualDriver {
    pub fn new() -> Self {
        Self
    }

    pub fn yields_code(&self) -> bool {
        false
    }

    pub fn get_code(&self) -> Result<String> {
        Err(LoginError::UnsupportedOperation(
            "manual driver cannot yield an MFA code".to_string(),
        ))
    }

    pub fn is_installed(&self) -> bool {
        true
    }
}
