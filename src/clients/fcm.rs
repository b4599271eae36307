use std::{collections::HashMap, time::Duration};

use reqwest::{
    Client,
    header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER},
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    config::{Config, LEGACY_SEND_URL, V1_BASE_URL},
    error::FcmError,
    models::{
        credentials::{Credentials, Protocol},
        fcm::FcmRequest,
        message::{FcmMessage, NotificationPayload, Priority},
        response::ResponseStatus,
    },
};

/// Sends one message at a time over either FCM protocol.
///
/// Setters mutate the pending message and return the client so calls chain.
/// [`FcmClient::send`] consumes the pending message; the client is then ready
/// for the next one. There is no internal locking: share a client across tasks
/// only behind external synchronization.
#[derive(Debug)]
pub struct FcmClient {
    http_client: Client,
    credentials: Credentials,
    legacy_url: String,
    v1_base_url: String,
    message: FcmMessage,
}

impl FcmClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_http_client(Client::new(), credentials)
    }

    pub fn with_http_client(http_client: Client, credentials: Credentials) -> Self {
        info!(protocol = ?credentials.protocol(), "FCM client initialized");

        Self {
            http_client,
            credentials,
            legacy_url: LEGACY_SEND_URL.to_string(),
            v1_base_url: V1_BASE_URL.to_string(),
            message: FcmMessage::default(),
        }
    }

    /// Legacy client keyed by a static server key.
    pub fn legacy(api_key: impl Into<String>) -> Self {
        Self::new(Credentials::api_key(api_key))
    }

    /// v1 client from a service-account key JSON document.
    pub fn v1(service_account_json: &str) -> Result<Self, FcmError> {
        Ok(Self::new(Credentials::service_account_json(service_account_json)?))
    }

    pub fn from_config(config: &Config) -> Result<Self, FcmError> {
        let mut builder = Client::builder();
        if let Some(seconds) = config.fcm_request_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let http_client = builder.build()?;

        let mut client = Self::with_http_client(http_client, config.credentials()?);
        client.with_endpoints(&config.fcm_legacy_url, &config.fcm_v1_base_url);
        Ok(client)
    }

    /// Overrides the legacy send URL and the v1 base URL.
    pub fn with_endpoints(&mut self, legacy_url: &str, v1_base_url: &str) -> &mut Self {
        self.legacy_url = legacy_url.to_string();
        self.v1_base_url = v1_base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn protocol(&self) -> Protocol {
        self.credentials.protocol()
    }

    /// The pending message.
    pub fn message(&self) -> &FcmMessage {
        &self.message
    }

    /// Targets a device token or `/topics/<name>` and sets the data payload.
    pub fn message_to(&mut self, to: impl Into<String>, data: Value) -> &mut Self {
        self.message.to = to.into();
        self.message.data = Some(data);
        self
    }

    pub fn topic_message(
        &mut self,
        to: impl Into<String>,
        data: HashMap<String, String>,
    ) -> &mut Self {
        let data = data
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        self.message_to(to, Value::Object(data))
    }

    /// Multicast to a copy of `list` (legacy only).
    pub fn registration_ids_message(&mut self, list: &[String], data: Value) -> &mut Self {
        self.message.set_registration_ids(list);
        self.message.data = Some(data);
        self
    }

    pub fn append_devices(&mut self, list: &[String]) -> &mut Self {
        self.message.append_registration_ids(list);
        self
    }

    pub fn set_data(&mut self, data: Value) -> &mut Self {
        self.message.data = Some(data);
        self
    }

    pub fn set_priority(&mut self, priority: Priority) -> &mut Self {
        self.message.priority = Some(priority);
        self
    }

    /// Groups messages so only the latest is delivered when the device comes back online.
    pub fn set_collapse_key(&mut self, key: impl Into<String>) -> &mut Self {
        self.message.collapse_key = key.into();
        self
    }

    pub fn set_notification_payload(&mut self, payload: NotificationPayload) -> &mut Self {
        self.message.notification = payload;
        self
    }

    pub fn set_content_available(&mut self, content_available: bool) -> &mut Self {
        self.message.content_available = content_available;
        self
    }

    pub fn set_delay_while_idle(&mut self, delay_while_idle: bool) -> &mut Self {
        self.message.delay_while_idle = delay_while_idle;
        self
    }

    /// Seconds to keep the message for an offline device, capped at four weeks.
    pub fn set_time_to_live(&mut self, ttl: u32) -> &mut Self {
        self.message.set_time_to_live(ttl);
        self
    }

    pub fn set_restricted_package_name(&mut self, package: impl Into<String>) -> &mut Self {
        self.message.restricted_package_name = package.into();
        self
    }

    pub fn set_dry_run(&mut self, dry_run: bool) -> &mut Self {
        self.message.dry_run = dry_run;
        self
    }

    /// Targets a boolean topic expression, e.g. `'news' in topics && 'eu' in topics`.
    pub fn set_condition(&mut self, condition: impl Into<String>) -> &mut Self {
        self.message.condition = condition.into();
        self
    }

    pub fn set_analytics_label(&mut self, label: impl Into<String>) -> &mut Self {
        self.message.analytics_label = label.into();
        self
    }

    /// Sends the pending message and normalizes the response.
    ///
    /// The message is consumed whether or not the send succeeds. Nothing is
    /// retried here; consult [`ResponseStatus::is_retryable`].
    pub async fn send(&mut self) -> Result<ResponseStatus, FcmError> {
        let message = std::mem::take(&mut self.message);
        let protocol = self.protocol();

        let body = match protocol {
            Protocol::Legacy => message.to_json_bytes(),
            Protocol::V1 => serde_json::to_vec(&FcmRequest::from_message(&message)?),
        }
        .map_err(FcmError::Serialization)?;

        let authorization = self.credentials.authorize().await?;

        let url = match protocol {
            Protocol::Legacy => self.legacy_url.clone(),
            Protocol::V1 => {
                let project_id = authorization.project_id.as_deref().ok_or_else(|| {
                    FcmError::Config("No project id for the v1 API".to_string())
                })?;
                format!("{}/projects/{}/messages:send", self.v1_base_url, project_id)
            }
        };

        debug!(url = %url, protocol = ?protocol, "Sending FCM request");

        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, authorization.header)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status_code = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await?;

        let status = match protocol {
            Protocol::Legacy => ResponseStatus::from_legacy_response(status_code, retry_after, &body),
            Protocol::V1 => ResponseStatus::from_v1_response(status_code, retry_after, &body),
        }?;

        if status.ok {
            info!(status_code, success = status.success, "FCM request completed");
        } else {
            warn!(
                status_code,
                failure = status.failure,
                error = status.err.as_deref().unwrap_or_default(),
                "FCM request reported failure"
            );
        }

        Ok(status)
    }
}
