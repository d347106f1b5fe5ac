use super::{Orders, SortOrder};
use crate::transport::{RequestOptions, Transport, TransportError};
use serde_json::Value;

pub async fn list(
    transport: &Transport,
    include_channels: bool,
) -> Result<Value, TransportError> {
    let options =
        RequestOptions::default().query("include_channels", include_channels);
    transport.get_with("/groups", &options).await
}

pub async fn get(
    transport: &Transport,
    id: u64,
    include_channels: bool,
) -> Result<Value, TransportError> {
    let options =
        RequestOptions::default().query("include_channels", include_channels);
    transport.get_with(&format!("/groups/{}", id), &options).await
}

pub async fn create(
    transport: &Transport,
    data: &Value,
) -> Result<Value, TransportError> {
    transport.post("/groups", data).await
}

pub async fn update(
    transport: &Transport,
    id: u64,
    data: &Value,
) -> Result<Value, TransportError> {
    transport.put(&format!("/groups/{}", id), data).await
}

pub async fn delete(
    transport: &Transport,
    id: u64,
) -> Result<Value, TransportError> {
    transport.delete(&format!("/groups/{}", id)).await
}

/// Remove every group which no longer contains any channels.
pub async fn delete_empty(
    transport: &Transport,
) -> Result<Value, TransportError> {
    transport.delete("/groups/empty").await
}

pub async fn update_sort(
    transport: &Transport,
    orders: &[SortOrder],
) -> Result<Value, TransportError> {
    transport.post("/groups/sort", &Orders { orders }).await
}
