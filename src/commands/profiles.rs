use std::fmt::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::aws::CredentialStore;
use crate::constants;

#[derive(Debug, Clone, Args)]
pub struct ProfilesCommand {
    #[arg(long, value_name = "PATH", help = "Shared credentials file to read profiles from")]
    pub credentials_file: Option<PathBuf>,
}

impl ProfilesCommand {
    pub async fn execute(self, profile: Option<&str>) -> Result<()> {
        let path = match self.credentials_file {
            Some(path) => path,
            None => constants::get_aws_credentials_path()
                .context("Failed to determine AWS credentials path")?,
        };
        let store = CredentialStore::load(&path).await?;

        print!("{}", render(&store, profile));
        Ok(())
    }
}

fn render(store: &CredentialStore, only: Option<&str>) -> String {
    let mut out = String::new();

    let profiles: Vec<String> = store
        .valid_profiles()
        .into_iter()
        .filter(|name| only.is_none_or(|only| only == name.as_str()))
        .collect();

    if profiles.is_empty() {
        let _ = writeln!(out, "{}", "No usable profiles found".yellow());
        return out;
    }

    for name in profiles {
        let account = store
            .account_id(&name)
            .map(|account| format!(" ({account})"))
            .unwrap_or_default();
        let _ = writeln!(out, "{}{}", name.bold(), account.dimmed());

        for role in store.assumable_roles(&name) {
            let _ = writeln!(
                out,
                "  -> {} {}",
                store.profile_for_role(&role),
                role.dimmed()
            );
        }
    }

    out
}
