//! Client for the Firebase Cloud Messaging send APIs.
//!
//! One [`FcmClient`] speaks either the legacy `/fcm/send` protocol (static
//! server key) or the v1 `messages:send` protocol (OAuth2 bearer token), and
//! reports both kinds of response as a single [`ResponseStatus`].

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod utils;

pub use clients::fcm::FcmClient;
pub use error::FcmError;
pub use models::{
    credentials::{Credentials, Protocol},
    message::{FcmMessage, MAX_TTL, NotificationPayload, Priority},
    response::ResponseStatus,
};
