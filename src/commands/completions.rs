use std::io::{self, Write};

use clap::{Args, CommandFactory};
use clap_complete::Shell;

use crate::cli::Cli;

#[derive(Debug, Clone, Args)]
pub struct CompletionsCommand {
    #[arg(value_enum, help = "Target shell for completion script")]
    pub shell: Shell,
}

impl CompletionsCommand {
    pub fn execute(self) {
        self.write_to(&mut io::stdout());
    }

    fn write_to(&self, out: &mut dyn Write) {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        clap_complete::generate(self.shell, &mut cmd, bin_name, out);
    }

    #[cfg(test)]
    fn generate_to_string(&self) -> String {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer);
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    fn script(shell: Shell) -> String {
        CompletionsCommand { shell }.generate_to_string()
    }

    #[test]
    fn test_every_shell_targets_aws_login() {
        for shell in Shell::value_variants() {
            let script = script(*shell);
            assert!(!script.is_empty(), "{shell} script is empty");
            assert!(script.contains("aws-login"), "{shell} script misses binary name");
        }
    }

    #[test]
    fn test_subcommands_are_offered() {
        let script = script(Shell::Zsh);
        for subcommand in ["login", "configure", "profiles", "completions"] {
            assert!(script.contains(subcommand), "missing subcommand {subcommand}");
        }
    }

    #[test]
    fn test_login_flags_are_offered() {
        let script = script(Shell::Bash);
        for flag in [
            "--driver",
            "--ecr",
            "--credentials-file",
            "--session-file",
            "--profile",
            "--verbose",
        ] {
            assert!(script.contains(flag), "missing flag {flag}");
        }
    }

    #[test]
    fn test_driver_help_is_described() {
        assert!(script(Shell::Zsh).contains("Auth driver supplying the MFA code"));
        assert!(script(Shell::Fish).contains("Log in to ECR after authenticating"));
    }

    #[test]
    fn test_legacy_argument_stays_hidden() {
        assert!(!script(Shell::Fish).contains("extra"));

        let help = Cli::command().render_long_help().to_string();
        assert!(!help.to_lowercase().contains("extra"));
        assert!(help.contains("--ecr"));
    }
}
