use std::{env, path::PathBuf};

use dirs;

/// Configuration directory name under `~/.config`
pub const CONFIG_DIR_NAME: &str = "aws-login";

/// Configuration file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config";

/// INI section holding the tool settings
pub const CONFIG_SECTION: &str = "aws-login";

/// AWS configuration directory name
pub const AWS_CONFIG_DIR_NAME: &str = ".aws";

/// AWS shared credentials file name
pub const AWS_CREDENTIALS_FILE_NAME: &str = "credentials";

/// Environment variable selecting the auth driver
pub const AUTH_DRIVER_ENV: &str = "AWS_LOGIN_AUTH_DRIVER";

/// One-shot handoff file sourced (and removed) by the calling shell
pub const SESSION_FILE_PATH: &str = "/tmp/aws-session.json";

/// Schema version written into the handoff file
pub const SESSION_FILE_VERSION: u32 = 1;

/// Default AWS region for STS operations when no region is configured
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Default region of the ECR registry
pub const DEFAULT_ECR_REGION: &str = "eu-west-2";

/// Default lifetime of the MFA session (24 hours)
pub const DEFAULT_SESSION_DURATION_SECONDS: i32 = 86_400;

/// Minimum session duration accepted by STS GetSessionToken
pub const MIN_SESSION_DURATION_SECONDS: i32 = 900;

/// Maximum session duration accepted by STS GetSessionToken
pub const MAX_SESSION_DURATION_SECONDS: i32 = 129_600;

/// Session name passed to AssumeRole
pub const DEFAULT_ROLE_SESSION_NAME: &str = "aws-login-session";

/// 1Password CLI binary
pub const DEFAULT_VAULT_CLI: &str = "op";

/// Length of a TOTP code
pub const MFA_CODE_LENGTH: usize = 6;

/// Get the tool configuration file path
/// Respects AWS_LOGIN_CONFIG_FILE environment variable if set
pub fn get_config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("AWS_LOGIN_CONFIG_FILE") {
        return Some(PathBuf::from(path));
    }

    dirs::home_dir().map(|home| {
        home.join(".config")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    })
}

/// Get the AWS credentials file path
/// Respects AWS_SHARED_CREDENTIALS_FILE environment variable if set
pub fn get_aws_credentials_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("AWS_SHARED_CREDENTIALS_FILE") {
        return Some(PathBuf::from(path));
    }

    dirs::home_dir().map(|home| {
        home.join(AWS_CONFIG_DIR_NAME)
            .join(AWS_CREDENTIALS_FILE_NAME)
    })
}
