use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::FcmError,
    models::message::FcmMessage,
    utils::flatten_data,
};

const TOPIC_PREFIX: &str = "/topics/";

/// Body of a v1 `messages:send` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcmRequest {
    pub message: V1Message,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct V1Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    pub notification: FcmNotification,

    pub data: BTreeMap<String, String>,

    pub android: AndroidConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_options: Option<FcmOptions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FcmNotification {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AndroidConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub collapse_key: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub priority: String,

    /// Omitted when the message TTL is 0, which both protocols treat as unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub restricted_package_name: String,

    pub data: BTreeMap<String, String>,

    pub notification: AndroidNotification,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AndroidNotification {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub icon: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sound: String,
    pub notification_count: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tag: String,
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
    pub channel_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FcmOptions {
    pub analytics_label: String,
}

impl FcmRequest {
    /// Translates a legacy-shaped message into the v1 request body.
    pub fn from_message(message: &FcmMessage) -> Result<Self, FcmError> {
        let empty = Value::Object(Map::new());
        let data = message.data.as_ref().unwrap_or(&empty);

        let flattened = flatten_data(data).map_err(FcmError::Serialization)?;

        let notification = &message.notification;
        let mut title = notification.title.clone();
        let body = notification.body.clone();

        // Data-driven senders put the headline under "alert".
        if let Some(alert) = data
            .get("alert")
            .and_then(Value::as_str)
            .filter(|alert| !alert.is_empty())
        {
            title = alert.to_string();
        }

        let (token, topic, condition) = resolve_target(message)?;

        let android = AndroidConfig {
            collapse_key: message.collapse_key.clone(),
            priority: message
                .priority
                .map(|p| p.as_v1_str().to_string())
                .unwrap_or_default(),
            ttl: (message.time_to_live > 0).then(|| format!("{}s", message.time_to_live)),
            restricted_package_name: message.restricted_package_name.clone(),
            data: flattened.clone(),
            notification: AndroidNotification {
                title: title.clone(),
                body: body.clone(),
                icon: notification.icon.clone(),
                color: notification.color.clone(),
                sound: notification.sound.clone(),
                notification_count: notification.notification_count(),
                tag: notification.tag.clone(),
                click_action: notification.click_action.clone(),
                body_loc_key: notification.body_loc_key.clone(),
                body_loc_args: notification.body_loc_args.clone(),
                title_loc_key: notification.title_loc_key.clone(),
                title_loc_args: notification.title_loc_args.clone(),
                channel_id: notification.android_channel_id.clone(),
            },
        };

        let fcm_options = (!message.analytics_label.is_empty()).then(|| FcmOptions {
            analytics_label: message.analytics_label.clone(),
        });

        Ok(Self {
            message: V1Message {
                token,
                topic,
                condition,
                notification: FcmNotification { title, body },
                data: flattened,
                android,
                fcm_options,
            },
        })
    }
}

type Target = (Option<String>, Option<String>, Option<String>);

fn resolve_target(message: &FcmMessage) -> Result<Target, FcmError> {
    if !message.condition.is_empty() {
        return Ok((None, None, Some(message.condition.clone())));
    }

    if let Some(topic) = message.to.strip_prefix(TOPIC_PREFIX) {
        return Ok((None, Some(topic.to_string()), None));
    }

    if message.to.is_empty() && !message.registration_ids.is_empty() {
        return Err(FcmError::UnsupportedTarget(format!(
            "multicast to {} registration ids",
            message.registration_ids.len()
        )));
    }

    Ok((Some(message.to.clone()), None, None))
}
