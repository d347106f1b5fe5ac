//! An administrative client for an IPTV channel and proxy management API.

#![forbid(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod client;
pub mod config;
pub mod endpoints;
pub mod mirror;
pub mod router;
mod session;
mod site;
mod store;
mod theme;
pub mod transport;

pub use client::AdminClient;
pub use config::Config;
pub use mirror::{FileMirror, MemoryMirror, Mirror, MirrorError};
pub use router::{Navigation, NavigationError, Route, Router};
pub use session::{Profile, Session};
pub use site::SiteStore;
pub use store::{AuthError, SessionStore};
pub use theme::{Theme, ThemeMode, ThemeStore, UnknownThemeMode};
pub use transport::{
    Body, RequestInterceptor, RequestOptions, SessionInvalidationHandler,
    Transport, TransportError,
};

/// The default user agent to use when communicating with the server.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));
