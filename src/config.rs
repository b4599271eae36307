use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::{error::FcmError, models::credentials::Credentials};

pub const LEGACY_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";
pub const V1_BASE_URL: &str = "https://fcm.googleapis.com/v1";

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub fcm_api_key: Option<String>,
    pub fcm_credentials_file: Option<String>,
    pub fcm_project_id: Option<String>,

    #[serde(default = "default_legacy_url")]
    pub fcm_legacy_url: String,
    #[serde(default = "default_v1_base_url")]
    pub fcm_v1_base_url: String,

    pub fcm_request_timeout_seconds: Option<u64>,
}

fn default_legacy_url() -> String {
    LEGACY_SEND_URL.to_string()
}

fn default_v1_base_url() -> String {
    V1_BASE_URL.to_string()
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;
        Ok(config)
    }

    /// Picks credentials: a service-account file wins over an API key, and
    /// application default credentials are the fallback.
    pub fn credentials(&self) -> Result<Credentials, FcmError> {
        if let Some(path) = self.fcm_credentials_file.as_deref().filter(|p| !p.is_empty()) {
            return Credentials::service_account_file(path);
        }

        if let Some(key) = self.fcm_api_key.as_deref().filter(|k| !k.is_empty()) {
            return Ok(Credentials::api_key(key));
        }

        Ok(Credentials::application_default(
            self.fcm_project_id.clone().filter(|id| !id.is_empty()),
        ))
    }
}
