//! The admin API's endpoints.
//!
//! Each function is a thin, stateless wrapper which shapes its parameters
//! into a request and sends it through a [`Transport`](crate::Transport).
//! Anything the backend sends back is handed over as JSON.

pub mod auth;
pub mod channels;
pub mod dashboard;
pub mod groups;
pub mod health;
pub mod history;
pub mod import_export;
pub mod proxy;
pub mod settings;
pub mod subscription;

/// A new position for an item in a sorted list.
#[derive(Debug, Copy, Clone, PartialEq, serde_derive::Serialize)]
pub struct SortOrder {
    pub id: u64,
    pub sort_order: i64,
}

#[derive(Debug, Clone, serde_derive::Serialize)]
struct Orders<'a> {
    orders: &'a [SortOrder],
}
