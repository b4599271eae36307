use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{error::FcmError, utils::parse_duration};

const ERROR_KEY: &str = "error";
const MESSAGE_ID_KEY: &str = "message_id";

/// Transient error names worth another attempt: legacy result errors, then
/// the canonical statuses the v1 API reports for the same conditions.
pub const RETRYABLE_ERRORS: &[&str] = &[
    "Unavailable",
    "InternalServerError",
    "UNAVAILABLE",
    "INTERNAL",
];

/// Outcome of one send, in the same shape for both protocols.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseStatus {
    pub ok: bool,
    pub status_code: u16,
    pub multicast_id: i64,
    pub success: u32,
    pub failure: u32,
    pub canonical_ids: u32,
    pub results: Vec<HashMap<String, String>>,
    pub message_id: Option<String>,
    pub err: Option<String>,
    /// First `details[].errorCode` of a v1 error, e.g. `UNREGISTERED`.
    pub error_code: Option<String>,
    pub retry_after: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumericId {
    Number(i64),
    Text(String),
}

impl NumericId {
    fn into_string(self) -> String {
        match self {
            NumericId::Number(n) => n.to_string(),
            NumericId::Text(s) => s,
        }
    }
}

/// Legacy `/fcm/send` response body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyResponse {
    multicast_id: i64,
    success: u32,
    failure: u32,
    canonical_ids: u32,
    results: Vec<HashMap<String, String>>,
    message_id: Option<NumericId>,
    error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct V1ErrorDetail {
    #[serde(rename = "@type")]
    pub detail_type: String,
    #[serde(rename = "errorCode")]
    pub error_code: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct V1Error {
    pub code: i64,
    pub message: String,
    pub status: String,
    pub details: Vec<V1ErrorDetail>,
}

/// v1 `messages:send` response body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct V1Response {
    pub name: String,
    pub error: V1Error,
}

impl ResponseStatus {
    fn captured(status_code: u16, retry_after: Option<String>) -> Self {
        Self {
            status_code,
            retry_after,
            ..Self::default()
        }
    }

    /// Normalizes a legacy response. Only a 200 carries a body worth parsing.
    pub fn from_legacy_response(
        status_code: u16,
        retry_after: Option<String>,
        body: &[u8],
    ) -> Result<Self, FcmError> {
        let mut status = Self::captured(status_code, retry_after);

        if status_code != 200 {
            return Ok(status);
        }

        let parsed: LegacyResponse = match serde_json::from_slice(body) {
            Ok(parsed) => parsed,
            Err(source) => {
                return Err(FcmError::Parse {
                    status: Box::new(status),
                    source,
                });
            }
        };

        status.multicast_id = parsed.multicast_id;
        status.success = parsed.success;
        status.failure = parsed.failure;
        status.canonical_ids = parsed.canonical_ids;
        status.results = parsed.results;
        status.message_id = parsed.message_id.map(NumericId::into_string);
        status.err = parsed.error.filter(|e| !e.is_empty());
        status.ok = true;

        Ok(status)
    }

    /// Normalizes a v1 response onto the legacy result shape.
    ///
    /// Both outcomes report `status_code == 200`; callers branch on `ok` and
    /// `results`. A body that fails to parse keeps the real status code.
    pub fn from_v1_response(
        status_code: u16,
        retry_after: Option<String>,
        body: &[u8],
    ) -> Result<Self, FcmError> {
        let mut status = Self::captured(status_code, retry_after);

        let parsed: V1Response = match serde_json::from_slice(body) {
            Ok(parsed) => parsed,
            Err(source) => {
                return Err(FcmError::Parse {
                    status: Box::new(status),
                    source,
                });
            }
        };

        let error = parsed.error;
        let transport_failed = !(200..300).contains(&status_code);

        if !error.message.is_empty() || !error.status.is_empty() || transport_failed {
            let error_status = if error.status.is_empty() {
                "UNKNOWN".to_string()
            } else {
                error.status
            };
            let message = if error.message.is_empty() {
                format!("HTTP {}", status_code)
            } else {
                error.message
            };

            status.failure = 1;
            status.results = vec![HashMap::from([(ERROR_KEY.to_string(), error_status)])];
            status.err = Some(message);
            status.error_code = error
                .details
                .into_iter()
                .map(|detail| detail.error_code)
                .find(|code| !code.is_empty());
            status.ok = false;
        } else {
            status.success = 1;
            status.results = vec![HashMap::from([(
                MESSAGE_ID_KEY.to_string(),
                parsed.name.clone(),
            )])];
            status.message_id = Some(parsed.name);
            status.ok = true;
        }
        status.status_code = 200;

        Ok(status)
    }

    /// Whether the failure is transient: a 5xx, or a 200 whose results carry
    /// a known transient error.
    pub fn is_retryable(&self) -> bool {
        if self.status_code >= 500 {
            return true;
        }

        if self.status_code == 200 {
            return self.results.iter().any(|result| {
                result
                    .get(ERROR_KEY)
                    .is_some_and(|error| RETRYABLE_ERRORS.contains(&error.as_str()))
            });
        }

        false
    }

    /// The captured Retry-After header as a duration.
    ///
    /// An error here means "no hint", not a failed send.
    pub fn retry_after_duration(&self) -> Result<Duration, FcmError> {
        let raw = self
            .retry_after
            .as_deref()
            .ok_or_else(|| FcmError::Format("no Retry-After header".to_string()))?;

        parse_duration(raw).ok_or_else(|| FcmError::Format(raw.to_string()))
    }
}

impl Display for ResponseStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Status Code   : {}", self.status_code)?;
        writeln!(f, "Ok            : {}", self.ok)?;
        writeln!(f, "Success       : {}", self.success)?;
        writeln!(f, "Fail          : {}", self.failure)?;
        writeln!(f, "Canonical_ids : {}", self.canonical_ids)?;
        writeln!(f, "Message Id    : {}", self.message_id.as_deref().unwrap_or("-"))?;
        writeln!(f, "Error         : {}", self.err.as_deref().unwrap_or("-"))?;

        for (index, result) in self.results.iter().enumerate() {
            writeln!(f, "Result({})>", index)?;
            let mut entries: Vec<_> = result.iter().collect();
            entries.sort();
            for (key, value) in entries {
                writeln!(f, "\t{} : {}", key, value)?;
            }
        }

        Ok(())
    }
}
