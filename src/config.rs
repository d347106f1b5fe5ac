use std::{path::PathBuf, time::Duration};
use url::Url;

/// Every API route lives under this prefix.
pub const API_PREFIX: &str = "/api";

/// How long a request may take before it is abandoned.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the durable mirror lives unless told otherwise.
pub const DEFAULT_STATE_DIR: &str = ".iptv-admin";

/// Settings used when constructing an [`AdminClient`](crate::AdminClient).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// The backend's origin (e.g. `http://localhost:5000`).
    pub base_url: Url,
    pub timeout: Duration,
    pub state_dir: PathBuf,
    pub user_agent: String,
}

impl Config {
    pub fn new(base_url: Url) -> Self {
        Config {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            user_agent: String::from(crate::DEFAULT_USER_AGENT),
        }
    }

    pub fn with_state_dir(self, state_dir: impl Into<PathBuf>) -> Self {
        Config {
            state_dir: state_dir.into(),
            ..self
        }
    }

    /// The URL every request path gets appended to.
    pub fn api_root(&self) -> String {
        format!(
            "{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            API_PREFIX
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        let base_url = Url::parse("http://localhost:5000")
            .expect("The default base URL is always valid");
        Config::new(base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_root_appends_the_prefix() {
        let cfg = Config::new(Url::parse("http://example.com/").unwrap());

        assert_eq!(cfg.api_root().as_str(), "http://example.com/api");
    }

    #[test]
    fn api_root_keeps_a_mount_point() {
        let cfg =
            Config::new(Url::parse("https://example.com/iptv/").unwrap());

        assert_eq!(cfg.api_root().as_str(), "https://example.com/iptv/api");
    }

    #[test]
    fn defaults() {
        let cfg = Config::default();

        assert_eq!(cfg.timeout, DEFAULT_TIMEOUT);
        assert_eq!(cfg.state_dir, PathBuf::from(DEFAULT_STATE_DIR));
        assert_eq!(cfg.user_agent.as_str(), crate::DEFAULT_USER_AGENT);
    }
}
