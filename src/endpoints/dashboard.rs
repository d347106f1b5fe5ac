use crate::transport::{RequestOptions, Transport, TransportError};
use serde_json::Value;

pub const DEFAULT_DAYS: u32 = 7;
pub const DEFAULT_RANKING_LIMIT: u32 = 10;

/// Summary counters shown on the landing page.
pub async fn get(transport: &Transport) -> Result<Value, TransportError> {
    transport.get("/dashboard").await
}

pub async fn watch_stats(
    transport: &Transport,
    days: u32,
) -> Result<Value, TransportError> {
    let options = RequestOptions::default().query("days", days);
    transport.get_with("/dashboard/watch-stats", &options).await
}

/// The most watched channels over the last `days` days.
pub async fn channel_ranking(
    transport: &Transport,
    days: u32,
    limit: u32,
) -> Result<Value, TransportError> {
    let options = RequestOptions::default()
        .query("days", days)
        .query("limit", limit);
    transport.get_with("/dashboard/channel-ranking", &options).await
}
