pub mod credentials;
pub mod fcm;
pub mod message;
pub mod response;
