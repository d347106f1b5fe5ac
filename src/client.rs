use crate::{
    config::Config,
    mirror::{FileMirror, Mirror, COOKIES_KEY},
    router::{Navigation, NavigationError, Router, LANDING, LOGIN},
    session::Profile,
    site::SiteStore,
    store::{AuthError, SessionStore},
    theme::ThemeStore,
    transport::{SessionInvalidationHandler, Transport, TransportError},
};
use std::sync::Arc;

/// Forgets the session and sends the user back to the login page whenever
/// the server stops accepting our credentials.
#[derive(Debug)]
struct RedirectToLogin {
    session: Arc<SessionStore>,
    router: Arc<Router>,
}

impl SessionInvalidationHandler for RedirectToLogin {
    fn on_unauthorized(&self) {
        self.session.invalidate();

        if let Err(e) = self.router.push(LOGIN) {
            log::warn!("Unable to redirect to the login page: {}", e);
        }
    }
}

/// Everything needed to drive the admin API, wired together.
#[derive(Debug)]
pub struct AdminClient {
    transport: Transport,
    session: Arc<SessionStore>,
    router: Arc<Router>,
    site: SiteStore,
    mirror: Arc<dyn Mirror>,
}

impl AdminClient {
    /// Create a client which persists its state under
    /// [`Config::state_dir`].
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let mirror = FileMirror::new(config.state_dir.clone());
        AdminClient::with_mirror(config, Arc::new(mirror))
    }

    pub fn with_mirror(
        config: &Config,
        mirror: Arc<dyn Mirror>,
    ) -> Result<Self, TransportError> {
        let session = Arc::new(SessionStore::bootstrap(Arc::clone(&mirror)));
        let router = Arc::new(Router::new(Arc::clone(&session)));
        let handler = RedirectToLogin {
            session: Arc::clone(&session),
            router: Arc::clone(&router),
        };
        let transport = Transport::new(config, Arc::new(handler))?;

        if let Some(cookies) = mirror.load(COOKIES_KEY) {
            transport.restore_cookies(&cookies);
        }

        Ok(AdminClient {
            transport,
            session,
            router,
            site: SiteStore::new(),
            mirror,
        })
    }

    pub fn transport(&self) -> &Transport { &self.transport }

    pub fn session(&self) -> &SessionStore { &self.session }

    pub fn router(&self) -> &Router { &self.router }

    pub fn is_authenticated(&self) -> bool { self.session.is_authenticated() }

    pub fn site(&self) -> &SiteStore { &self.site }

    pub fn theme(&self) -> ThemeStore { ThemeStore::load(Arc::clone(&self.mirror)) }

    pub fn navigate(&self, path: &str) -> Result<Navigation, NavigationError> {
        self.router.push(path)
    }

    /// Log in and move to the landing page.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Profile, AuthError> {
        let profile =
            self.session.login(&self.transport, username, password).await?;
        self.go_to(LANDING);

        Ok(profile)
    }

    /// Log out and move to the login page.
    pub async fn logout(&self) {
        self.session.logout(&self.transport).await;
        self.go_to(LOGIN);
    }

    pub async fn refresh_profile(&self) -> Result<Profile, AuthError> {
        let outcome = self.session.refresh_profile(&self.transport).await;

        if outcome.is_err() {
            self.go_to(LOGIN);
        }

        outcome
    }

    pub async fn reset_credential(&self) -> Result<String, AuthError> {
        self.session.reset_credential(&self.transport).await
    }

    /// Save the API's cookies so the next process can pick up where we left
    /// off.
    pub fn persist_cookies(&self) {
        let outcome = match self.transport.cookie_header() {
            Some(header) => self.mirror.store(COOKIES_KEY, &header),
            None => self.mirror.remove(COOKIES_KEY),
        };

        if let Err(e) = outcome {
            log::warn!("Unable to save cookies: {}", e);
        }
    }

    fn go_to(&self, path: &str) {
        if let Err(e) = self.router.push(path) {
            log::warn!("Unable to navigate to {}: {}", path, e);
        }
    }
}
