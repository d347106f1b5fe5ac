use crate::transport::{Transport, TransportError};
use serde_derive::Serialize;
use serde_json::{Map, Value};
use url::form_urlencoded;

pub async fn get_all(transport: &Transport) -> Result<Value, TransportError> {
    transport.get("/settings").await
}

pub async fn get(
    transport: &Transport,
    key: &str,
) -> Result<Value, TransportError> {
    transport.get(&setting_path(key)).await
}

/// Overwrite several settings at once.
pub async fn update(
    transport: &Transport,
    settings: &Map<String, Value>,
) -> Result<Value, TransportError> {
    transport.post("/settings", settings).await
}

pub async fn update_one(
    transport: &Transport,
    key: &str,
    value: &Value,
) -> Result<Value, TransportError> {
    transport
        .put(&setting_path(key), &SettingValue { value })
        .await
}

#[derive(Debug, Serialize)]
struct SettingValue<'a> {
    value: &'a Value,
}

/// The route for a single setting, with `key` escaped so it stays one path
/// segment.
fn setting_path(key: &str) -> String {
    // byte_serialize only emits '+' for spaces, which a path would keep
    // literally
    let key: String = form_urlencoded::byte_serialize(key.as_bytes())
        .collect::<String>()
        .replace('+', "%20");

    format!("/settings/{}", key)
}
