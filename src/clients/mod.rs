pub mod auth;
pub mod fcm;
