use std::{fmt, path::Path};

use gcp_auth::CustomServiceAccount;
use serde::Deserialize;
use serde_json::Value;

use crate::error::FcmError;

/// Which send API a client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Legacy,
    V1,
}

/// Fields of a service-account key file this crate reads itself. The rest is
/// handled by `gcp_auth`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceAccountKey {
    /// Kept untyped so a non-string id is reported as a configuration error.
    #[serde(default)]
    pub project_id: Option<Value>,
}

pub enum Credentials {
    /// Static server key for the legacy API.
    ApiKey(String),
    ServiceAccount {
        project_id: String,
        account: CustomServiceAccount,
    },
    /// Credentials discovered from the environment (env var, gcloud, metadata server).
    ApplicationDefault { project_id: Option<String> },
    /// A bearer token minted elsewhere.
    BearerToken { project_id: String, token: String },
}

impl Credentials {
    pub fn api_key(key: impl Into<String>) -> Self {
        Credentials::ApiKey(key.into())
    }

    pub fn service_account_json(json: &str) -> Result<Self, FcmError> {
        let key: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| FcmError::Auth(format!("Malformed service account JSON: {}", e)))?;

        let project_id = match key.project_id {
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(other) if !other.is_null() && !other.is_string() => {
                return Err(FcmError::Config(format!(
                    "Service account project_id is not a string: {}",
                    other
                )));
            }
            _ => {
                return Err(FcmError::Config(
                    "Service account has no project_id".to_string(),
                ));
            }
        };

        let account = CustomServiceAccount::from_json(json)?;

        Ok(Credentials::ServiceAccount {
            project_id,
            account,
        })
    }

    pub fn service_account_file(path: impl AsRef<Path>) -> Result<Self, FcmError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            FcmError::Auth(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::service_account_json(&json)
    }

    pub fn application_default(project_id: Option<String>) -> Self {
        Credentials::ApplicationDefault { project_id }
    }

    pub fn bearer_token(project_id: impl Into<String>, token: impl Into<String>) -> Self {
        Credentials::BearerToken {
            project_id: project_id.into(),
            token: token.into(),
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Credentials::ApiKey(_) => Protocol::Legacy,
            _ => Protocol::V1,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ApiKey(_) => f.write_str("ApiKey(..)"),
            Credentials::ServiceAccount { project_id, .. } => f
                .debug_struct("ServiceAccount")
                .field("project_id", project_id)
                .finish_non_exhaustive(),
            Credentials::ApplicationDefault { project_id } => f
                .debug_struct("ApplicationDefault")
                .field("project_id", project_id)
                .finish(),
            Credentials::BearerToken { project_id, .. } => f
                .debug_struct("BearerToken")
                .field("project_id", project_id)
                .finish_non_exhaustive(),
        }
    }
}
