use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::commands::{CompletionsCommand, ConfigureCommand, LoginCommand, ProfilesCommand};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "aws-login",
    version,
    about = "Interactive AWS MFA login with role chaining and ECR authentication",
    long_about = None
)]
pub struct Cli {
    #[arg(
        short = 'p',
        long,
        global = true,
        help = "AWS profile name (skips the profile prompt)"
    )]
    pub profile: Option<String>,

    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Increase verbosity (-v info, -vv debug, -vvv trace)")]
    pub verbose: u8,

    #[command(flatten)]
    pub login: LoginCommand,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Log in with MFA and publish the session (default)")]
    Login(LoginCommand),
    #[command(about = "Configure aws-login defaults")]
    Configure(ConfigureCommand),
    #[command(about = "List usable profiles and the roles they may assume")]
    Profiles(ProfilesCommand),
    #[command(about = "Generate shell completion scripts for aws-login")]
    Completions(CompletionsCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<ExitCode> {
        let profile = self.profile;
        let command = self.command.unwrap_or(Commands::Login(self.login));

        match command {
            Commands::Login(cmd) => cmd.execute(profile).await,
            Commands::Configure(cmd) => cmd.execute().await.map(|()| ExitCode::SUCCESS),
            Commands::Profiles(cmd) => cmd
                .execute(profile.as_deref())
                .await
                .map(|()| ExitCode::SUCCESS),
            Commands::Completions(cmd) => {
                cmd.execute();
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
