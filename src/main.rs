use anyhow::{Error, Result, anyhow};
use fcm_client::{FcmClient, NotificationPayload, config::Config};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: fcm-send <to> <title> <body> [data-json]";

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let _ = rustls::crypto::ring::default_provider().install_default();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [to, title, body, rest @ ..] = args.as_slice() else {
        return Err(anyhow!(USAGE));
    };

    let data = match rest.first() {
        Some(raw) => serde_json::from_str::<Value>(raw)?,
        None => Value::Object(Default::default()),
    };

    let config = Config::load()?;
    let mut client = FcmClient::from_config(&config)?;

    info!(protocol = ?client.protocol(), to = %to, "Configuration validated, sending");

    let status = client
        .message_to(to.as_str(), data)
        .set_notification_payload(NotificationPayload::new(title.as_str(), body.as_str()))
        .send()
        .await?;

    println!("{}", status);

    if !status.ok {
        if status.is_retryable() {
            match status.retry_after_duration() {
                Ok(delay) => warn!(delay_ms = delay.as_millis() as u64, "Send is retryable"),
                Err(_) => warn!("Send is retryable, no Retry-After hint"),
            }
        }
        return Err(anyhow!("FCM reported failure"));
    }

    Ok(())
}
