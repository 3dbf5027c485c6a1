pub mod manual;
pub mod vault;

use std::{fmt, str::FromStr};

use self::{manual::ManualDriver, vault::VaultDriver};
use crate::aws::StaticCredential;
use crate::error::{LoginError, Result};

/// The auth driver variants a user can pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    Manual,
    Vault,
}

impl DriverKind {
    pub const ALL: [DriverKind; 2] = [DriverKind::Manual, DriverKind::Vault];

    /// Configuration value naming this variant
    pub fn name(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Vault => "1password",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Manual => "Manual",
            Self::Vault => "1Password",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Manual => "Enter MFA code manually",
            Self::Vault => "Use 1Password CLI (requires 1Password CLI)",
        }
    }

    /// Variants whose tooling is present, Manual first
    pub async fn installed(vault_cli: &str) -> Vec<DriverKind> {
        let mut kinds = vec![DriverKind::Manual];
        if vault::probe(vault_cli).await {
            kinds.push(DriverKind::Vault);
        }
        kinds
    }

    fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|kind| kind.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DriverKind {
    type Err = LoginError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| LoginError::Config {
                setting: "auth driver",
                value: s.to_string(),
                valid: Self::valid_names(),
            })
    }
}

/// Auth driver bound to the selected profile
/// Each variant contains a driver-specific struct with its own implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDriver {
    Manual(ManualDriver),
    Vault(VaultDriver),
}

impl AuthDriver {
    /// Build the driver of `kind` for a profile; the vault variant reads the
    /// profile's `vault_key`
    pub fn for_profile(
        kind: DriverKind,
        profile: &str,
        credential: Option<&StaticCredential>,
        vault_cli: &str,
    ) -> Self {
        match kind {
            DriverKind::Manual => Self::Manual(ManualDriver::new()),
            DriverKind::Vault => {
                let vault_key = credential.and_then(|c| c.vault_key.as_deref());
                Self::Vault(VaultDriver::new(vault_cli, profile, vault_key))
            }
        }
    }

    pub fn kind(&self) -> DriverKind {
        match self {
            Self::Manual(_) => DriverKind::Manual,
            Self::Vault(_) => DriverKind::Vault,
        }
    }

    /// Whether the driver can produce a code without the operator
    pub fn yields_code(&self) -> bool {
        match self {
            Self::Manual(driver) => driver.yields_code(),
            Self::Vault(driver) => driver.yields_code(),
        }
    }

    pub async fn get_code(&self) -> Result<String> {
        match self {
            Self::Manual(driver) => driver.get_code(),
            Self::Vault(driver) => driver.get_code().await,
        }
    }

    /// Never fails; a missing tool reports `false`
    pub async fn is_installed(&self) -> bool {
        match self {
            Self::Manual(driver) => driver.is_installed(),
            Self::Vault(driver) => driver.is_installed().await,
        }
    }
}
