use crate::transport::{Transport, TransportError};
use serde_json::Value;

/// The playlist URLs clients can subscribe to, each embedding the user's
/// subscription token.
pub async fn urls(transport: &Transport) -> Result<Value, TransportError> {
    transport.get("/subscription/urls").await
}
