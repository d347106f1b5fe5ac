use crate::transport::{Transport, TransportError};
use serde_json::Value;

pub async fn check_one(
    transport: &Transport,
    channel_id: u64,
) -> Result<Value, TransportError> {
    transport
        .post_empty(&format!("/health/check/{}", channel_id))
        .await
}

/// Kick off a health check of every channel.
pub async fn check_all(transport: &Transport) -> Result<Value, TransportError> {
    transport.post_empty("/health/check-all").await
}

pub async fn status(transport: &Transport) -> Result<Value, TransportError> {
    transport.get("/health/status").await
}
