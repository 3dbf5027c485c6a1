use std::{
    env,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info};

use super::SessionCredential;
use crate::constants::{SESSION_FILE_PATH, SESSION_FILE_VERSION};
use crate::error::{LoginError, Result};

/// Handoff file format read by the shell wrapper
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SessionFile {
    pub version: u32,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: String,
    pub profile_name: String,
}

impl From<&SessionCredential> for SessionFile {
    fn from(session: &SessionCredential) -> Self {
        Self {
            version: SESSION_FILE_VERSION,
            access_key_id: session.access_key_id.clone(),
            secret_access_key: session.secret_access_key.clone(),
            session_token: session.session_token.clone(),
            expiration: session.expiration_string(),
            profile_name: session.profile.clone(),
        }
    }
}

/// Makes a session the active one: exported to this process and handed to
/// the parent shell through the session file
#[derive(Debug, Clone)]
pub struct SessionPublisher {
    path: PathBuf,
}

impl Default for SessionPublisher {
    fn default() -> Self {
        Self::new(SESSION_FILE_PATH)
    }
}

impl SessionPublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn publish(&self, session: &SessionCredential) -> Result<()> {
        export_env(session);
        self.write_session_file(session).await?;
        info!("Published session for profile {}", session.profile);
        Ok(())
    }

    async fn write_session_file(&self, session: &SessionCredential) -> Result<()> {
        let publish_err = |source: std::io::Error| LoginError::Publish {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(&SessionFile::from(session))
            .map_err(|e| publish_err(e.into()))?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await.map_err(publish_err)?;

        // mode() only applies on creation; tighten a file left by an older run
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(publish_err)?;
        }

        file.write_all(json.as_bytes()).await.map_err(publish_err)?;
        file.flush().await.map_err(publish_err)?;

        debug!("Session written to {}", self.path.display());
        Ok(())
    }
}

fn export_env(session: &SessionCredential) {
    // SAFETY: the login flow runs on a current-thread runtime, nothing reads
    // the environment concurrently
    unsafe {
        env::set_var("AWS_ACCESS_KEY_ID", &session.access_key_id);
        env::set_var("AWS_SECRET_ACCESS_KEY", &session.secret_access_key);
        env::set_var("AWS_SESSION_TOKEN", &session.session_token);
        env::set_var("AWS_PROFILE", &session.profile);
    }
}
