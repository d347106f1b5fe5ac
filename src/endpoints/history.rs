use crate::transport::{RequestOptions, Transport, TransportError};
use serde_json::Value;

pub const DEFAULT_PER_PAGE: u32 = 20;

/// Delete old watch history entries.
pub async fn cleanup(transport: &Transport) -> Result<Value, TransportError> {
    transport.post_empty("/history/cleanup").await
}

pub async fn stats(transport: &Transport) -> Result<Value, TransportError> {
    transport.get("/history/stats").await
}

/// One page of the watch history, with `page` starting at 1.
pub async fn list(
    transport: &Transport,
    page: u32,
    per_page: u32,
) -> Result<Value, TransportError> {
    let options = RequestOptions::default()
        .query("page", page)
        .query("per_page", per_page);
    transport.get_with("/history/list", &options).await
}
