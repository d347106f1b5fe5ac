use crate::{
    endpoints::settings,
    transport::{Transport, TransportError},
};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

/// What the site is called until the server says otherwise.
pub const DEFAULT_SITE_NAME: &str = "IPTV Proxy Admin";

/// The setting holding the site's display name.
pub const SITE_NAME_KEY: &str = "site_name";

/// Site-wide branding, as configured on the server.
#[derive(Debug)]
pub struct SiteStore {
    name: Mutex<String>,
}

impl SiteStore {
    pub fn new() -> Self {
        SiteStore {
            name: Mutex::new(String::from(DEFAULT_SITE_NAME)),
        }
    }

    pub fn site_name(&self) -> String { self.name().clone() }

    /// Pick up the site name from the server's settings.
    ///
    /// Failures are logged and otherwise ignored, leaving whatever name we
    /// already had.
    pub async fn fetch_settings(&self, transport: &Transport) -> String {
        match settings::get_all(transport).await {
            Ok(all) => {
                let configured = all
                    .get(SITE_NAME_KEY)
                    .and_then(Value::as_str)
                    .filter(|name| !name.is_empty());

                if let Some(name) = configured {
                    *self.name() = name.to_string();
                }
            },
            Err(e) => log::warn!("Unable to fetch the site settings: {}", e),
        }

        self.site_name()
    }

    /// Rename the site, only updating our copy once the server agrees.
    pub async fn update_site_name(
        &self,
        transport: &Transport,
        name: &str,
    ) -> Result<(), TransportError> {
        let value = Value::from(name);

        if let Err(e) =
            settings::update_one(transport, SITE_NAME_KEY, &value).await
        {
            log::error!("Unable to rename the site: {}", e);
            return Err(e);
        }

        *self.name() = name.to_string();
        log::info!("Site renamed to {}", name);

        Ok(())
    }

    fn name(&self) -> MutexGuard<'_, String> {
        match self.name.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for SiteStore {
    fn default() -> Self { SiteStore::new() }
}
