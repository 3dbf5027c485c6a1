use std::{process::Stdio, time::SystemTime};

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_ecr::{Client as EcrClient, error::DisplayErrorContext};
use base64::{Engine as _, engine::general_purpose};
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, info};

use super::SessionCredential;
use crate::error::{LoginError, Result};

const DOCKER_CLI: &str = "docker";
const REGISTRY_USERNAME: &str = "AWS";

/// Log docker into the ECR registry of `account_id` with the active session
pub async fn login(session: &SessionCredential, account_id: &str, region: &str) -> Result<()> {
    let registry = registry_host(account_id, region);
    info!("Logging in to ECR registry {}", registry);

    let password = get_login_password(session, region).await?;

    let mut child = Command::new(DOCKER_CLI)
        .args(["login", "--username", REGISTRY_USERNAME, "--password-stdin"])
        .arg(&registry)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| LoginError::RegistryLogin(format!("failed to run {DOCKER_CLI}: {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(password.as_bytes())
            .await
            .map_err(|e| LoginError::RegistryLogin(format!("failed to pass ECR password: {e}")))?;
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| LoginError::RegistryLogin(format!("failed to login to ECR: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(LoginError::RegistryLogin(format!(
            "failed to login to ECR: {}",
            stderr.trim()
        )));
    }

    info!("Logged in to {}", registry);
    Ok(())
}

/// Equivalent of `aws ecr get-login-password`
async fn get_login_password(session: &SessionCredential, region: &str) -> Result<String> {
    debug!("Requesting ECR authorization token in {}", region);

    let credentials = Credentials::new(
        session.access_key_id.clone(),
        session.secret_access_key.clone(),
        Some(session.session_token.clone()),
        SystemTime::try_from(session.expiration).ok(),
        "aws-login",
    );
    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .credentials_provider(credentials)
        .load()
        .await;
    let client = EcrClient::new(&config);

    let response = client
        .get_authorization_token()
        .send()
        .await
        .map_err(|e| {
            LoginError::RegistryLogin(format!(
                "failed to get ECR login password: {}",
                DisplayErrorContext(&e)
            ))
        })?;

    let token = response
        .authorization_data()
        .iter()
        .find_map(|data| data.authorization_token())
        .ok_or_else(|| {
            LoginError::RegistryLogin("ECR returned no authorization token".to_string())
        })?;

    decode_authorization_token(token)
}

/// ECR tokens are base64 of `AWS:<password>`
fn decode_authorization_token(token: &str) -> Result<String> {
    let decoded = general_purpose::STANDARD
        .decode(token.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| {
            LoginError::RegistryLogin("ECR authorization token is not valid base64".to_string())
        })?;

    decoded
        .split_once(':')
        .map(|(_, password)| password.to_string())
        .filter(|password| !password.is_empty())
        .ok_or_else(|| {
            LoginError::RegistryLogin("ECR authorization token has no password".to_string())
        })
}

fn registry_host(account_id: &str, region: &str) -> String {
    let domain = if region.starts_with("cn-") {
        "amazonaws.com.cn"
    } else {
        "amazonaws.com"
    };
    format!("{account_id}.dkr.ecr.{region}.{domain}")
}
