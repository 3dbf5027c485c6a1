use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info};

use crate::{
    aws::{AwsGateway, CredentialStore, SessionPublisher},
    config::{self, Config},
    constants::{self, AUTH_DRIVER_ENV, SESSION_FILE_PATH},
    driver::DriverKind,
    flow::{Flow, Outcome, Processor, Runner},
    ui::{self, TerminalPrompter},
};

#[derive(Debug, Clone, Args)]
pub struct LoginCommand {
    #[arg(
        short = 'd',
        long,
        env = AUTH_DRIVER_ENV,
        help = "Auth driver supplying the MFA code (manual, 1password)"
    )]
    pub driver: Option<String>,

    #[arg(long, help = "Log in to ECR after authenticating")]
    pub ecr: bool,

    #[arg(long, value_name = "PATH", help = "Shared credentials file to read profiles from")]
    pub credentials_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        default_value = SESSION_FILE_PATH,
        help = "Where to write the session for the calling shell"
    )]
    pub session_file: PathBuf,

    /// Any argument requests ECR login, as older wrappers pass one
    #[arg(hide = true)]
    pub extra: Vec<String>,
}

impl LoginCommand {
    pub fn wants_registry_login(&self) -> bool {
        self.ecr || !self.extra.is_empty()
    }

    pub async fn execute(self, profile: Option<String>) -> Result<ExitCode> {
        let config = config::load().await?;
        let driver = resolve_driver(self.driver.as_deref(), &config)?;

        let credentials_path = match self.credentials_file.clone() {
            Some(path) => path,
            None => constants::get_aws_credentials_path()
                .context("Failed to determine AWS credentials path")?,
        };
        let store = CredentialStore::load(&credentials_path).await?;

        let installed_drivers = match driver {
            Some(_) => Vec::new(),
            None => DriverKind::installed(&config.vault_cli).await,
        };
        debug!("Installed auth drivers: {:?}", installed_drivers);

        let flow = Flow::new(&store)
            .with_profile(profile)
            .with_driver(driver)
            .with_installed_drivers(installed_drivers)
            .with_vault_cli(config.vault_cli.as_str());

        let gateway = AwsGateway::new(&config);
        let publisher = SessionPublisher::new(self.session_file.clone());
        let processor = Processor::new(&store, &gateway, &publisher, self.wants_registry_login());

        info!("Starting login");
        let state = Runner::new(flow, processor, TerminalPrompter::new())
            .run()
            .await?;

        let Some(outcome) = state.outcome else {
            info!("Login cancelled");
            return Ok(ExitCode::SUCCESS);
        };

        println!("{}", ui::render_outcome(&outcome));

        match outcome {
            Outcome::Success(_) => Ok(ExitCode::SUCCESS),
            Outcome::Failure(_) => Ok(ExitCode::FAILURE),
        }
    }
}

/// The flag or environment variable wins over the config file
fn resolve_driver(flag: Option<&str>, config: &Config) -> Result<Option<DriverKind>> {
    match flag.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => {
            let kind = name.parse::<DriverKind>()?;
            Ok(Some(kind))
        }
        None => Ok(config.auth_driver),
    }
}
