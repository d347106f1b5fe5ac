use crate::transport::{Transport, TransportError};
use serde_json::Value;

/// Active streams and other proxy bookkeeping.
pub async fn status(transport: &Transport) -> Result<Value, TransportError> {
    transport.get("/proxy/status").await
}
