use std::{collections::HashMap, path::Path};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{LoginError, Result};

/// Static credentials for one profile of the shared credentials file,
/// including the `assumable_role_id` and `vault_key` extensions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticCredential {
    pub profile_name: String,
    pub access_key: String,
    pub access_secret: String,
    pub account_id: Option<String>,
    pub mfa_serial: Option<String>,
    /// ARN of the role other profiles may assume to act as this profile
    pub assumable_role_id: Option<String>,
    /// Item name in the password vault holding the profile's TOTP secret
    pub vault_key: Option<String>,
}

impl StaticCredential {
    fn new(profile_name: &str) -> Self {
        Self {
            profile_name: profile_name.to_string(),
            ..Self::default()
        }
    }

    /// Whether this profile can start an MFA session on its own
    pub fn is_valid(&self) -> bool {
        !self.access_key.is_empty() && !self.access_secret.is_empty() && self.mfa_serial.is_some()
    }

    fn assign(&mut self, key: &str, value: &str) {
        let value = value.to_string();
        match key {
            "aws_access_key_id" => self.access_key = value,
            "aws_secret_access_key" => self.access_secret = value,
            "account_id" | "aws_account_id" => self.account_id = Some(value),
            "mfa_serial" => self.mfa_serial = Some(value),
            "assumable_role_id" => self.assumable_role_id = Some(value),
            "vault_key" => self.vault_key = Some(value),
            _ => {}
        }
    }
}

/// In-memory view of the credentials file with a reverse index from
/// assumable role id to the profile that owns it
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    profiles: Vec<StaticCredential>,
    positions: HashMap<String, usize>,
    role_owners: HashMap<String, String>,
}

impl CredentialStore {
    /// Load and parse the credentials file at `path`
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| LoginError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let store = Self::from_content(&content);
        info!(
            "Loaded {} profiles from {}",
            store.profiles.len(),
            path.display()
        );
        Ok(store)
    }

    /// Parse credentials from literal text. Lines that do not fit the format
    /// are skipped rather than rejected.
    pub fn from_content(content: &str) -> Self {
        let mut store = Self::default();
        let mut current: Option<StaticCredential> = None;

        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                if let Some(credential) = current.take() {
                    store.insert(credential);
                }
                let name = line.trim_matches(|c: char| c == '[' || c == ']').trim();
                // keys under a nameless header belong to no profile
                current = (!name.is_empty()).then(|| StaticCredential::new(name));
                continue;
            }

            let Some(credential) = current.as_mut() else {
                continue;
            };

            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim();
                if !value.is_empty() {
                    credential.assign(key.trim(), value);
                }
            } else {
                debug!("Skipping malformed line in [{}]", credential.profile_name);
            }
        }

        if let Some(credential) = current.take() {
            store.insert(credential);
        }

        store
    }

    fn insert(&mut self, credential: StaticCredential) {
        let name = credential.profile_name.clone();

        if let Some(role) = &credential.assumable_role_id {
            if let Some(previous) = self.role_owners.get(role) {
                if *previous != name {
                    warn!(
                        "Role {} is claimed by both [{}] and [{}], using [{}]",
                        role, previous, name, name
                    );
                }
            }
            self.role_owners.insert(role.clone(), name.clone());
        }

        match self.positions.get(&name) {
            Some(&position) => {
                // A repeated section replaces the earlier one
                if let Some(stale) = self.profiles[position].assumable_role_id.take() {
                    if credential.assumable_role_id.as_ref() != Some(&stale)
                        && self.role_owners.get(&stale) == Some(&name)
                    {
                        self.role_owners.remove(&stale);
                    }
                }
                self.profiles[position] = credential;
            }
            None => {
                self.positions.insert(name, self.profiles.len());
                self.profiles.push(credential);
            }
        }
    }

    /// Profiles with an access key, a secret and an MFA serial, in file order
    pub fn valid_profiles(&self) -> Vec<String> {
        self.profiles
            .iter()
            .filter(|credential| credential.is_valid())
            .map(|credential| credential.profile_name.clone())
            .collect()
    }

    /// Every role id in the file except the one owned by `profile`.
    /// An unknown profile can see all of them.
    pub fn assumable_roles(&self, profile: &str) -> Vec<String> {
        let own_role = self
            .credential(profile)
            .and_then(|credential| credential.assumable_role_id.as_deref());

        let mut roles: Vec<String> = Vec::new();
        for credential in &self.profiles {
            if credential.profile_name == profile {
                continue;
            }
            let Some(role) = credential.assumable_role_id.as_deref() else {
                continue;
            };
            if Some(role) == own_role || roles.iter().any(|r| r == role) {
                continue;
            }
            roles.push(role.to_string());
        }
        roles
    }

    /// Name of the profile owning `role_id`, or `""` when nobody does
    pub fn profile_for_role(&self, role_id: &str) -> &str {
        self.role_owners
            .get(role_id)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn credential(&self, profile: &str) -> Option<&StaticCredential> {
        self.positions
            .get(profile)
            .map(|&position| &self.profiles[position])
    }

    /// MFA device serial for `profile`
    pub fn mfa_serial(&self, profile: &str) -> Result<&str> {
        let credential = self
            .credential(profile)
            .ok_or_else(|| LoginError::ProfileNotFound(profile.to_string()))?;

        credential
            .mfa_serial
            .as_deref()
            .ok_or_else(|| LoginError::MfaNotConfigured(profile.to_string()))
    }

    /// Account id for `profile`, taken from `account_id` or else from the
    /// account field of its assumable role ARN
    pub fn account_id(&self, profile: &str) -> Option<String> {
        let credential = self.credential(profile)?;

        if let Some(account_id) = &credential.account_id {
            return Some(account_id.clone());
        }

        // arn:aws:iam::ACCOUNT:role/NAME
        credential
            .assumable_role_id
            .as_deref()
            .and_then(|arn| arn.split(':').nth(4))
            .filter(|account| !account.is_empty())
            .map(str::to_string)
    }

    /// Every profile of the file, in file order
    pub fn profiles(&self) -> &[StaticCredential] {
        &self.profiles
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
