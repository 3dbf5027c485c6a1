use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::constants::DEFAULT_VAULT_CLI;
use crate::error::{LoginError, Result};

/// Password-vault driver reading the TOTP of a vault item through the
/// 1Password CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultDriver {
    cli: String,
    profile: String,
    vault_key: Option<String>,
}

impl VaultDriver {
    /// Create a driver for `profile` reading the item named `vault_key`
    pub fn new(cli: impl Into<String>, profile: &str, vault_key: Option<&str>) -> Self {
        Self {
            cli: cli.into(),
            profile: profile.to_string(),
            vault_key: vault_key.map(str::to_string),
        }
    }

    pub fn yields_code(&self) -> bool {
        true
    }

    /// Run `op item get <vault_key> --otp`
    pub async fn get_code(&self) -> Result<String> {
        let vault_key = self.vault_key.as_deref().ok_or_else(|| {
            LoginError::Driver(format!(
                "vault_key not configured for profile '{}'",
                self.profile
            ))
        })?;

        info!("Fetching MFA code from {}", self.cli);
        debug!("Vault key: {}", vault_key);

        let output = Command::new(&self.cli)
            .args(["item", "get", vault_key, "--otp"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                LoginError::Driver(format!(
                    "failed to retrieve MFA code from 1Password with vault key {vault_key}: {e}"
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LoginError::Driver(format!(
                "failed to retrieve MFA code from 1Password with vault key {}: {}",
                vault_key,
                stderr.trim()
            )));
        }

        parse_code(&output.stdout)
    }

    /// Whether the vault CLI answers `--version`
    pub async fn is_installed(&self) -> bool {
        probe(&self.cli).await
    }
}

impl Default for VaultDriver {
    fn default() -> Self {
        Self::new(DEFAULT_VAULT_CLI, "", None)
    }
}

/// Probe the vault CLI without a profile
pub async fn probe(cli: &str) -> bool {
    let installed = Command::new(cli)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .is_ok_and(|status| status.success());

    debug!("{} installed: {}", cli, installed);
    installed
}

fn parse_code(stdout: &[u8]) -> Result<String> {
    let code = String::from_utf8_lossy(stdout).trim().to_string();
    if code.is_empty() {
        return Err(LoginError::Driver(
            "empty MFA code from 1Password".to_string(),
        ));
    }
    Ok(code)
}
