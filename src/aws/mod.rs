use aws_smithy_types::{DateTime, date_time::Format};

pub mod ecr;
pub mod gateway;
pub mod session;
pub mod store;
pub mod sts;

/// AWS temporary credentials attributed to the profile they act as
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCredential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime,
    pub profile: String,
}

impl SessionCredential {
    /// Expiration as an RFC 3339 timestamp
    pub fn expiration_string(&self) -> String {
        self.expiration
            .fmt(Format::DateTime)
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

// Re-export commonly used types (functions should be accessed via module path)
pub use gateway::{AwsGateway, CloudGateway};
pub use session::SessionPublisher;
pub use store::{CredentialStore, StaticCredential};
