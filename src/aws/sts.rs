use std::time::SystemTime;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_sts::{Client as StsClient, error::DisplayErrorContext, types::Credentials as StsCredentials};
use tracing::{debug, info};

use super::{SessionCredential, StaticCredential};
use crate::constants::DEFAULT_AWS_REGION;
use crate::error::{LoginError, Result};

const PROVIDER_NAME: &str = "aws-login";

/// Get temporary credentials for `credential`'s profile using an MFA code
pub async fn get_session_token(
    credential: &StaticCredential,
    mfa_serial: &str,
    code: &str,
    duration_seconds: i32,
    region: Option<&str>,
) -> Result<SessionCredential> {
    let profile = credential.profile_name.as_str();
    info!("Calling AWS STS GetSessionToken");
    debug!("Profile: {}", profile);
    debug!("MFA serial: {}", mfa_serial);
    debug!("Duration: {} seconds", duration_seconds);

    let static_keys = Credentials::new(
        credential.access_key.clone(),
        credential.access_secret.clone(),
        None,
        None,
        PROVIDER_NAME,
    );
    let config = load_config(profile, static_keys, region).await;
    let client = StsClient::new(&config);

    let response = client
        .get_session_token()
        .serial_number(mfa_serial)
        .token_code(code)
        .duration_seconds(duration_seconds)
        .send()
        .await
        .map_err(|e| {
            LoginError::Exchange(format!(
                "failed to get AWS session token: {}",
                DisplayErrorContext(&e)
            ))
        })?;

    let sts_creds = response.credentials().ok_or_else(|| {
        LoginError::Exchange("failed to parse STS response: no credentials returned".to_string())
    })?;

    info!("Successfully obtained session credentials for {}", profile);
    Ok(to_session(sts_creds, profile))
}

/// Assume `role_arn` using the active session credentials
pub async fn assume_role(
    session: &SessionCredential,
    role_arn: &str,
    role_session_name: &str,
    region: Option<&str>,
) -> Result<SessionCredential> {
    let role_arn = role_arn.trim();
    info!("Calling AWS STS AssumeRole");
    debug!("Role ARN: {}", role_arn);
    debug!("Session name: {}", role_session_name);

    let session_keys = Credentials::new(
        session.access_key_id.clone(),
        session.secret_access_key.clone(),
        Some(session.session_token.clone()),
        SystemTime::try_from(session.expiration).ok(),
        PROVIDER_NAME,
    );
    let config = load_config(&session.profile, session_keys, region).await;
    let client = StsClient::new(&config);

    let response = client
        .assume_role()
        .role_arn(role_arn)
        .role_session_name(role_session_name)
        .send()
        .await
        .map_err(|e| {
            LoginError::Exchange(format!(
                "failed to assume role {}: {}",
                role_arn,
                DisplayErrorContext(&e)
            ))
        })?;

    let sts_creds = response.credentials().ok_or_else(|| {
        LoginError::Exchange(format!(
            "failed to parse assume-role response for {role_arn}: no credentials returned"
        ))
    })?;

    info!("Successfully assumed role {}", role_arn);
    Ok(to_session(sts_creds, &session.profile))
}

/// Load SDK config with explicit credentials. The region falls back from the
/// configured value to the profile's region and then to DEFAULT_AWS_REGION.
async fn load_config(profile: &str, credentials: Credentials, region: Option<&str>) -> SdkConfig {
    if let Some(region) = region {
        return aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .load()
            .await;
    }

    let loaded = aws_config::defaults(BehaviorVersion::latest())
        .profile_name(profile)
        .credentials_provider(credentials.clone())
        .load()
        .await;

    match loaded.region() {
        Some(region) => {
            info!("Using region: {}", region);
            loaded
        }
        None => {
            info!(
                "No region configured, using default {} for STS",
                DEFAULT_AWS_REGION
            );
            aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(DEFAULT_AWS_REGION))
                .credentials_provider(credentials)
                .load()
                .await
        }
    }
}

fn to_session(sts_creds: &StsCredentials, profile: &str) -> SessionCredential {
    SessionCredential {
        access_key_id: sts_creds.access_key_id().to_string(),
        secret_access_key: sts_creds.secret_access_key().to_string(),
        session_token: sts_creds.session_token().to_string(),
        expiration: *sts_creds.expiration(),
        profile: profile.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_smithy_types::DateTime;

    #[test]
    fn test_to_session_attributes_profile() {
        let sts_creds = StsCredentials::builder()
            .access_key_id("ASIAEXAMPLE")
            .secret_access_key("secret")
            .session_token("token")
            .expiration(DateTime::from_secs(1_700_000_000))
            .build()
            .unwrap();

        let session = to_session(&sts_creds, "int");
        assert_eq!(session.access_key_id, "ASIAEXAMPLE");
        assert_eq!(session.secret_access_key, "secret");
        assert_eq!(session.session_token, "token");
        assert_eq!(session.expiration, DateTime::from_secs(1_700_000_000));
        assert_eq!(session.profile, "int");
    }
}
