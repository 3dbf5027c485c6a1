use async_trait::async_trait;

use super::{SessionCredential, StaticCredential, ecr, sts};
use crate::config::Config;
use crate::error::Result;

/// The cloud exchanges the login flow depends on
#[async_trait]
pub trait CloudGateway: Send + Sync {
    /// Exchange a profile's static keys and an MFA code for a session
    async fn get_session_token(
        &self,
        credential: &StaticCredential,
        mfa_serial: &str,
        code: &str,
    ) -> Result<SessionCredential>;

    /// Assume `role_id` using the active session
    async fn assume_role(
        &self,
        session: &SessionCredential,
        role_id: &str,
    ) -> Result<SessionCredential>;

    /// Log the container runtime into the account's ECR registry
    async fn registry_login(&self, session: &SessionCredential, account_id: &str) -> Result<()>;
}

/// [`CloudGateway`] backed by the AWS SDK and the docker CLI
#[derive(Debug, Clone)]
pub struct AwsGateway {
    region: Option<String>,
    ecr_region: String,
    session_duration_seconds: i32,
    role_session_name: String,
}

impl AwsGateway {
    pub fn new(config: &Config) -> Self {
        Self {
            region: config.region.clone(),
            ecr_region: config.ecr_region.clone(),
            session_duration_seconds: config.session_duration_seconds,
            role_session_name: config.role_session_name.clone(),
        }
    }
}

#[async_trait]
impl CloudGateway for AwsGateway {
    async fn get_session_token(
        &self,
        credential: &StaticCredential,
        mfa_serial: &str,
        code: &str,
    ) -> Result<SessionCredential> {
        sts::get_session_token(
            credential,
            mfa_serial,
            code,
            self.session_duration_seconds,
            self.region.as_deref(),
        )
        .await
    }

    async fn assume_role(
        &self,
        session: &SessionCredential,
        role_id: &str,
    ) -> Result<SessionCredential> {
        sts::assume_role(
            session,
            role_id,
            &self.role_session_name,
            self.region.as_deref(),
        )
        .await
    }

    async fn registry_login(&self, session: &SessionCredential, account_id: &str) -> Result<()> {
        ecr::login(session, account_id, &self.ecr_region).await
    }
}
