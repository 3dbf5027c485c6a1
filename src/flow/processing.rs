use tracing::{debug, info, warn};

use super::AuthFlowResult;
use crate::aws::{CloudGateway, CredentialStore, SessionCredential, SessionPublisher};
use crate::error::{LoginError, Result};

/// What the Processing step works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    pub profile: String,
    pub role: Option<String>,
    pub mfa_code: String,
}

/// Turns a profile and MFA code into a published session, optionally
/// chained into a role and followed by a registry login
pub struct Processor<'a, G: ?Sized> {
    store: &'a CredentialStore,
    gateway: &'a G,
    publisher: &'a SessionPublisher,
    registry_login: bool,
}

impl<'a, G: CloudGateway + ?Sized> Processor<'a, G> {
    pub fn new(
        store: &'a CredentialStore,
        gateway: &'a G,
        publisher: &'a SessionPublisher,
        registry_login: bool,
    ) -> Self {
        Self {
            store,
            gateway,
            publisher,
            registry_login,
        }
    }

    /// Stops at the first failing step; sessions published before the
    /// failure stay published
    pub async fn run(&self, request: &ProcessRequest) -> Result<AuthFlowResult> {
        let profile = request.profile.as_str();

        let mfa_serial = self.store.mfa_serial(profile)?;
        let credential = self
            .store
            .credential(profile)
            .ok_or_else(|| LoginError::ProfileNotFound(profile.to_string()))?;

        info!("Requesting session token for {}", profile);
        let mut session = self
            .gateway
            .get_session_token(credential, mfa_serial, &request.mfa_code)
            .await?;
        session.profile = profile.to_string();
        self.publisher.publish(&session).await?;

        if let Some(role) = request.role.as_deref() {
            session = self.assume(&session, role).await?;
        }

        let registry_login = self.registry_login && self.login_registry(&session).await;

        Ok(AuthFlowResult {
            profile: session.profile,
            registry_login,
        })
    }

    async fn assume(&self, session: &SessionCredential, role: &str) -> Result<SessionCredential> {
        info!("Assuming role {}", role);
        let mut assumed = self.gateway.assume_role(session, role).await?;

        // act as the profile owning the role from here on
        let owner = self.store.profile_for_role(role);
        assumed.profile = if owner.is_empty() {
            warn!("No profile owns role {}, keeping {}", role, session.profile);
            session.profile.clone()
        } else {
            owner.to_string()
        };

        self.publisher.publish(&assumed).await?;
        Ok(assumed)
    }

    /// Failures are reported and swallowed
    async fn login_registry(&self, session: &SessionCredential) -> bool {
        let Some(account_id) = self.store.account_id(&session.profile) else {
            warn!(
                "Skipping ECR login, no account id known for {}",
                session.profile
            );
            return false;
        };

        debug!("Logging in to ECR for account {}", account_id);
        match self.gateway.registry_login(session, &account_id).await {
            Ok(()) => {
                info!("Logged in to ECR for account {}", account_id);
                true
            }
            Err(e) => {
                warn!("ECR login failed: {}", e);
                false
            }
        }
    }
}
