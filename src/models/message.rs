use std::fmt::{Display, Formatter, Result};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Four weeks, the longest FCM will hold a message for an offline device.
pub const MAX_TTL: u32 = 2_419_200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
}

impl Priority {
    pub fn as_str(&self) -> &str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
        }
    }

    /// Android priority as the v1 API spells it.
    pub fn as_v1_str(&self) -> &str {
        match self {
            Priority::High => "HIGH",
            Priority::Normal => "NORMAL",
        }
    }
}

impl From<&str> for Priority {
    fn from(value: &str) -> Self {
        match value {
            "high" => Priority::High,
            _ => Priority::Normal,
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.as_str())
    }
}

/// Display payload shown by the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPayload {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub icon: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sound: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub badge: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tag: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub click_action: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body_loc_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body_loc_args: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title_loc_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title_loc_args: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub android_channel_id: String,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Badge as a count; anything unparseable counts as zero.
    pub fn notification_count(&self) -> i32 {
        self.badge.trim().parse().unwrap_or(0)
    }
}

/// The message under construction. Its serde form is the legacy wire payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FcmMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub to: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub registration_ids: Vec<String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub collapse_key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    #[serde(skip_serializing_if = "NotificationPayload::is_empty")]
    pub notification: NotificationPayload,

    #[serde(skip_serializing_if = "is_false")]
    pub content_available: bool,

    #[serde(skip_serializing_if = "is_false")]
    pub delay_while_idle: bool,

    #[serde(skip_serializing_if = "is_zero")]
    pub time_to_live: u32,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub restricted_package_name: String,

    #[serde(skip_serializing_if = "is_false")]
    pub dry_run: bool,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub condition: String,

    /// Only carried by the v1 payload.
    #[serde(skip)]
    pub analytics_label: String,
}

impl FcmMessage {
    pub fn set_time_to_live(&mut self, ttl: u32) {
        self.time_to_live = ttl.min(MAX_TTL);
    }

    pub fn set_registration_ids(&mut self, list: &[String]) {
        self.registration_ids = list.to_vec();
    }

    pub fn append_registration_ids(&mut self, list: &[String]) {
        self.registration_ids.extend_from_slice(list);
    }

    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}
