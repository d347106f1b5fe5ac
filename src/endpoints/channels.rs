use super::{Orders, SortOrder};
use crate::transport::{RequestOptions, Transport, TransportError};
use serde_derive::Serialize;
use serde_json::Value;

/// Filters for [`list()`]. Unset fields are left for the server to default.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChannelQuery {
    pub group_id: Option<u64>,
    pub is_active: Option<bool>,
    pub is_healthy: Option<bool>,
    pub protocol: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ChannelQuery {
    fn to_options(&self) -> RequestOptions {
        let mut options = RequestOptions::default();

        if let Some(group_id) = self.group_id {
            options = options.query("group_id", group_id);
        }
        if let Some(is_active) = self.is_active {
            options = options.query("is_active", is_active);
        }
        if let Some(is_healthy) = self.is_healthy {
            options = options.query("is_healthy", is_healthy);
        }
        if let Some(ref protocol) = self.protocol {
            options = options.query("protocol", protocol);
        }
        if let Some(ref search) = self.search {
            options = options.query("search", search);
        }
        if let Some(page) = self.page {
            options = options.query("page", page);
        }
        if let Some(per_page) = self.per_page {
            options = options.query("per_page", per_page);
        }

        options
    }
}

pub async fn list(
    transport: &Transport,
    query: &ChannelQuery,
) -> Result<Value, TransportError> {
    transport.get_with("/channels", &query.to_options()).await
}

pub async fn get(
    transport: &Transport,
    id: u64,
) -> Result<Value, TransportError> {
    transport.get(&format!("/channels/{}", id)).await
}

/// Add a new channel, where `data` holds at least a `name` and `url`.
pub async fn create(
    transport: &Transport,
    data: &Value,
) -> Result<Value, TransportError> {
    transport.post("/channels", data).await
}

/// Update only the fields present in `data`.
pub async fn update(
    transport: &Transport,
    id: u64,
    data: &Value,
) -> Result<Value, TransportError> {
    transport.put(&format!("/channels/{}", id), data).await
}

pub async fn delete(
    transport: &Transport,
    id: u64,
) -> Result<Value, TransportError> {
    transport.delete(&format!("/channels/{}", id)).await
}

pub async fn batch_delete(
    transport: &Transport,
    ids: &[u64],
) -> Result<Value, TransportError> {
    transport
        .post("/channels/batch-delete", &BatchDelete { ids })
        .await
}

pub async fn update_sort(
    transport: &Transport,
    orders: &[SortOrder],
) -> Result<Value, TransportError> {
    transport.post("/channels/sort", &Orders { orders }).await
}

#[derive(Debug, Serialize)]
struct BatchDelete<'a> {
    ids: &'a [u64],
}
