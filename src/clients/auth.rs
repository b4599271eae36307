use gcp_auth::TokenProvider;
use tracing::debug;

use crate::{error::FcmError, models::credentials::Credentials};

pub const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// What a single request needs from the credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub header: String,
    /// Set for every v1 credential.
    pub project_id: Option<String>,
}

impl Credentials {
    /// Resolves the `Authorization` header value, fetching a fresh OAuth2
    /// token for service-account and application-default credentials.
    pub async fn authorize(&self) -> Result<Authorization, FcmError> {
        match self {
            Credentials::ApiKey(key) => Ok(Authorization {
                header: format!("key={}", key),
                project_id: None,
            }),
            Credentials::ServiceAccount {
                project_id,
                account,
            } => {
                let token = account.token(&[FCM_SCOPE]).await?;
                debug!(project_id = %project_id, "Obtained service account access token");

                Ok(Authorization {
                    header: format!("Bearer {}", token.as_str()),
                    project_id: Some(project_id.clone()),
                })
            }
            Credentials::ApplicationDefault { project_id } => {
                let provider = gcp_auth::provider().await?;
                let token = provider.token(&[FCM_SCOPE]).await?;

                let project_id = match project_id {
                    Some(id) => id.clone(),
                    None => provider
                        .project_id()
                        .await
                        .map_err(|e| {
                            FcmError::Config(format!("Unable to determine project id: {}", e))
                        })?
                        .to_string(),
                };
                debug!(project_id = %project_id, "Obtained application default access token");

                Ok(Authorization {
                    header: format!("Bearer {}", token.as_str()),
                    project_id: Some(project_id),
                })
            }
            Credentials::BearerToken { project_id, token } => Ok(Authorization {
                header: format!("Bearer {}", token),
                project_id: Some(project_id.clone()),
            }),
        }
    }
}
