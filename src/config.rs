use crate::constants::{
    self, CONFIG_SECTION, DEFAULT_ECR_REGION, DEFAULT_ROLE_SESSION_NAME,
    DEFAULT_SESSION_DURATION_SECONDS, DEFAULT_VAULT_CLI, MAX_SESSION_DURATION_SECONDS,
    MIN_SESSION_DURATION_SECONDS,
};
use crate::driver::DriverKind;
use crate::error::LoginError;
use anyhow::{Context, Result};
use dialoguer::{Input, Select, theme::ColorfulTheme};
use ini::{Ini, Properties};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Driver used without prompting; `None` asks every time
    pub auth_driver: Option<DriverKind>,
    /// STS region; `None` uses the profile's region
    pub region: Option<String>,
    pub ecr_region: String,
    pub session_duration_seconds: i32,
    pub role_session_name: String,
    pub vault_cli: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_driver: None,
            region: None,
            ecr_region: DEFAULT_ECR_REGION.to_string(),
            session_duration_seconds: DEFAULT_SESSION_DURATION_SECONDS,
            role_session_name: DEFAULT_ROLE_SESSION_NAME.to_string(),
            vault_cli: DEFAULT_VAULT_CLI.to_string(),
        }
    }
}

impl Config {
    fn from_ini_section(section: &Properties) -> Result<Self, LoginError> {
        let auth_driver = section
            .get("auth_driver")
            .filter(|value| !value.trim().is_empty())
            .map(str::parse::<DriverKind>)
            .transpose()?;

        let session_duration_seconds = match section.get("session_duration_seconds") {
            Some(value) => match value.trim().parse() {
                Ok(seconds) if is_valid_duration(seconds) => seconds,
                _ => {
                    warn!(
                        "Ignoring session_duration_seconds '{}', using {}",
                        value, DEFAULT_SESSION_DURATION_SECONDS
                    );
                    DEFAULT_SESSION_DURATION_SECONDS
                }
            },
            None => DEFAULT_SESSION_DURATION_SECONDS,
        };

        Ok(Self {
            auth_driver,
            region: section
                .get("region")
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            ecr_region: non_empty(section.get("ecr_region"), DEFAULT_ECR_REGION),
            session_duration_seconds,
            role_session_name: non_empty(
                section.get("role_session_name"),
                DEFAULT_ROLE_SESSION_NAME,
            ),
            vault_cli: non_empty(section.get("vault_cli"), DEFAULT_VAULT_CLI),
        })
    }

    fn save_to_ini(&self, ini: &mut Ini) {
        let auth_driver = self.auth_driver.map(DriverKind::name).unwrap_or_default();
        let region = self.region.as_deref().unwrap_or_default();

        ini.with_section(Some(CONFIG_SECTION))
            .set("auth_driver", auth_driver)
            .set("region", region)
            .set("ecr_region", &self.ecr_region)
            .set(
                "session_duration_seconds",
                self.session_duration_seconds.to_string(),
            )
            .set("role_session_name", &self.role_session_name)
            .set("vault_cli", &self.vault_cli);
    }
}

/// Load the tool configuration. A missing file yields the defaults.
pub async fn load() -> Result<Config> {
    let path = get_config_path()?;
    load_from(&path).await
}

pub async fn load_from(path: &Path) -> Result<Config> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let ini = Ini::load_from_file(path)
        .with_context(|| format!("Failed to load config file {}", path.display()))?;

    match ini.section(Some(CONFIG_SECTION)) {
        Some(section) => Config::from_ini_section(section)
            .with_context(|| format!("Invalid configuration in {}", path.display())),
        None => Ok(Config::default()),
    }
}

pub async fn save(config: &Config) -> Result<()> {
    let path = get_config_path()?;
    save_to(&path, config).await
}

pub async fn save_to(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut ini = if path.exists() {
        Ini::load_from_file(path).unwrap_or_else(|_| Ini::new())
    } else {
        Ini::new()
    };

    config.save_to_ini(&mut ini);

    ini.write_to_file(path)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

pub async fn configure_interactive() -> Result<()> {
    println!("Configuring aws-login");

    let existing_config = load().await.ok();

    if existing_config.is_some() {
        println!("Press Enter to keep current values, or type new values.");
    }
    println!();

    let theme = ColorfulTheme::default();
    let default_config = existing_config.unwrap_or_default();

    let mut driver_items = vec!["Ask every time".to_string()];
    driver_items.extend(
        DriverKind::ALL
            .iter()
            .map(|kind| format!("{} - {}", kind.title(), kind.description())),
    );
    let current_driver = default_config
        .auth_driver
        .and_then(|kind| DriverKind::ALL.iter().position(|k| *k == kind))
        .map_or(0, |index| index + 1);

    let driver_index = Select::with_theme(&theme)
        .with_prompt("Auth driver")
        .items(&driver_items)
        .default(current_driver)
        .interact()
        .context("Failed to read auth driver")?;
    let auth_driver = driver_index
        .checked_sub(1)
        .and_then(|index| DriverKind::ALL.get(index).copied());

    let region = Input::<String>::with_theme(&theme)
        .with_prompt("STS region (empty to use the profile region)")
        .default(default_config.region.clone().unwrap_or_default())
        .allow_empty(true)
        .interact_text()
        .context("Failed to read STS region")?;

    let ecr_region = Input::<String>::with_theme(&theme)
        .with_prompt("ECR region")
        .default(default_config.ecr_region)
        .interact_text()
        .context("Failed to read ECR region")?;

    let session_duration_seconds = Input::<i32>::with_theme(&theme)
        .with_prompt("Session duration seconds (900-129600)")
        .default(default_config.session_duration_seconds)
        .validate_with(|input: &i32| {
            if is_valid_duration(*input) {
                Ok(())
            } else {
                Err("Please enter a value between 900 and 129600")
            }
        })
        .interact_text()
        .context("Failed to read session duration")?;

    let role_session_name = Input::<String>::with_theme(&theme)
        .with_prompt("Role session name")
        .default(default_config.role_session_name)
        .interact_text()
        .context("Failed to read role session name")?;

    let config = Config {
        auth_driver,
        region: Some(region.trim().to_string()).filter(|r| !r.is_empty()),
        ecr_region,
        session_duration_seconds,
        role_session_name,
        vault_cli: default_config.vault_cli,
    };

    save(&config).await?;

    println!("\nConfiguration saved successfully.");
    Ok(())
}

fn get_config_path() -> Result<PathBuf> {
    constants::get_config_path().context("Failed to determine aws-login config path")
}

fn is_valid_duration(seconds: i32) -> bool {
    (MIN_SESSION_DURATION_SECONDS..=MAX_SESSION_DURATION_SECONDS).contains(&seconds)
}

fn non_empty(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_duration() {
        assert!(is_valid_duration(900));
        assert!(is_valid_duration(86_400));
        assert!(is_valid_duration(129_600));
        assert!(!is_valid_duration(899));
        assert!(!is_valid_duration(129_601));
        assert!(!is_valid_duration(-1));
    }

    #[test]
    fn test_config_from_ini_section() {
        let mut props = Properties::new();
        props.insert("auth_driver", "1password");
        props.insert("region", "eu-west-1");
        props.insert("ecr_region", "us-east-2");
        props.insert("session_duration_seconds", "3600");
        props.insert("role_session_name", "ci");
        props.insert("vault_cli", "/usr/local/bin/op");

        let config = Config::from_ini_section(&props).unwrap();

        assert_eq!(config.auth_driver, Some(DriverKind::Vault));
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.ecr_region, "us-east-2");
        assert_eq!(config.session_duration_seconds, 3600);
        assert_eq!(config.role_session_name, "ci");
        assert_eq!(config.vault_cli, "/usr/local/bin/op");
    }

    #[test]
    fn test_config_from_ini_section_with_defaults() {
        let props = Properties::new();
        let config = Config::from_ini_section(&props).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.ecr_region, DEFAULT_ECR_REGION);
        assert_eq!(
            config.session_duration_seconds,
            DEFAULT_SESSION_DURATION_SECONDS
        );
    }

    #[test]
    fn test_config_invalid_driver_is_error() {
        let mut props = Properties::new();
        props.insert("auth_driver", "yubikey");

        let err = Config::from_ini_section(&props).unwrap_err();
        assert!(matches!(err, LoginError::Config { .. }));
    }

    #[test]
    fn test_config_out_of_range_duration_falls_back() {
        let mut props = Properties::new();
        props.insert("session_duration_seconds", "60");
        props.insert("auth_driver", "");

        let config = Config::from_ini_section(&props).unwrap();
        assert_eq!(
            config.session_duration_seconds,
            DEFAULT_SESSION_DURATION_SECONDS
        );
        assert_eq!(config.auth_driver, None);
    }

    #[tokio::test]
    async fn test_missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_from(&dir.path().join("config")).await.unwrap();
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config");

        let config = Config {
            auth_driver: Some(DriverKind::Manual),
            region: Some("eu-central-1".to_string()),
            session_duration_seconds: 7200,
            ..Config::default()
        };
        save_to(&path, &config).await.unwrap();

        assert_eq!(load_from(&path).await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_save_without_driver_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");

        save_to(&path, &Config::default()).await.unwrap();
        assert_eq!(load_from(&path).await.unwrap(), Config::default());
    }
}
