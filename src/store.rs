use crate::{
    endpoints::auth,
    mirror::{Mirror, MirrorError, SESSION_KEY},
    session::{Profile, Session},
    transport::{Transport, TransportError},
};
use reqwest::StatusCode;
use std::sync::{Arc, Mutex, MutexGuard};

/// The single source of truth for "who is logged in".
///
/// Every mutation goes through one of this type's methods, each of which
/// swaps the whole [`Session`] in one step and writes it to the [`Mirror`]
/// before returning. Nothing outside the store can observe a half-updated
/// session.
///
/// None of the mutations hold the lock across an `.await`, so concurrent
/// requests can't interleave inside a single update.
pub struct SessionStore {
    session: Mutex<Option<Session>>,
    mirror: Arc<dyn Mirror>,
}

impl SessionStore {
    /// Reconstruct the store from whatever a previous run left in the
    /// [`Mirror`].
    ///
    /// A missing or unreadable value just means we aren't logged in. This
    /// never touches the network.
    pub fn bootstrap(mirror: Arc<dyn Mirror>) -> Self {
        let session = mirror.load(SESSION_KEY).and_then(|raw| {
            match serde_json::from_str::<Option<Session>>(&raw) {
                Ok(session) => session,
                Err(e) => {
                    log::warn!("Ignoring a malformed stored session: {}", e);
                    None
                },
            }
        });

        match session.as_ref().and_then(|s| s.profile().username()) {
            Some(username) => log::debug!("Restored the session for {}", username),
            None if session.is_some() => log::debug!("Restored a session"),
            None => log::debug!("No stored session"),
        }

        SessionStore {
            session: Mutex::new(session),
            mirror,
        }
    }

    pub fn is_authenticated(&self) -> bool { self.state().is_some() }

    /// A snapshot of the current session.
    pub fn session(&self) -> Option<Session> { self.state().clone() }

    pub fn profile(&self) -> Option<Profile> {
        self.state().as_ref().map(|s| s.profile().clone())
    }

    /// Log in, replacing any existing session.
    ///
    /// The store is left untouched if the server rejects us.
    pub async fn login(
        &self,
        transport: &Transport,
        username: &str,
        password: &str,
    ) -> Result<Profile, AuthError> {
        let response = auth::login(transport, username, password)
            .await
            .map_err(|e| {
                log::error!("Login failed: {}", e);
                AuthError::from(e)
            })?;

        log::info!(
            "Logged in as {}",
            response.user.username().unwrap_or(username)
        );
        self.replace(Some(Session::new(response.user.clone())));

        Ok(response.user)
    }

    /// Log out, forgetting the current session even if the server can't be
    /// told about it.
    pub async fn logout(&self, transport: &Transport) {
        if let Err(e) = auth::logout(transport).await {
            log::warn!("Ignoring a failed logout request: {}", e);
        }

        self.replace(None);
        log::info!("Logged out");
    }

    /// Drop the session without telling the server.
    ///
    /// Returns `true` if there was a session to drop. Calling this when
    /// already logged out is a no-op.
    pub fn invalidate(&self) -> bool {
        let mut state = self.state();
        let was_present = state.take().is_some();
        self.write_mirror(&state);

        if was_present {
            log::info!("The session is no longer valid");
        }

        was_present
    }

    /// Ask the server for an up-to-date copy of our profile.
    ///
    /// If that fails we can no longer trust the session we have, so we log
    /// out before returning the error.
    pub async fn refresh_profile(
        &self,
        transport: &Transport,
    ) -> Result<Profile, AuthError> {
        match auth::me(transport).await {
            Ok(profile) => {
                self.replace(Some(Session::new(profile.clone())));
                Ok(profile)
            },
            Err(e) => {
                log::warn!("Unable to refresh the profile: {}", e);
                self.logout(transport).await;
                Err(AuthError::from(e))
            },
        }
    }

    /// Rotate the subscription token, merging the new one into the current
    /// session.
    pub async fn reset_credential(
        &self,
        transport: &Transport,
    ) -> Result<String, AuthError> {
        let token = auth::reset_token(transport).await?;

        // the session may have been invalidated while we were waiting
        self.update(|session| session.with_token(&token));

        Ok(token)
    }

    pub async fn change_password(
        &self,
        transport: &Transport,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        auth::change_password(transport, old_password, new_password).await?;
        log::info!("Password changed");

        Ok(())
    }

    pub async fn change_username(
        &self,
        transport: &Transport,
        username: &str,
    ) -> Result<String, AuthError> {
        let username = auth::change_username(transport, username).await?;
        self.update(|session| {
            session.with_field("username", username.as_str())
        });
        log::info!("Username changed to {}", username);

        Ok(username)
    }

    fn state(&self) -> MutexGuard<'_, Option<Session>> {
        // a panic while holding the lock can't leave a partial session
        // behind because every write swaps the whole value
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn replace(&self, next: Option<Session>) {
        let mut state = self.state();
        *state = next;
        self.write_mirror(&state);
    }

    /// Apply `f` to the current session, if there is one.
    fn update<F>(&self, f: F)
    where
        F: FnOnce(&Session) -> Session,
    {
        let mut state = self.state();
        let next = match state.as_ref() {
            Some(session) => f(session),
            None => return,
        };

        *state = Some(next);
        self.write_mirror(&state);
    }

    fn write_mirror(&self, session: &Option<Session>) {
        let outcome = match session {
            Some(session) => serde_json::to_string(session)
                .map_err(MirrorError::from)
                .and_then(|raw| self.mirror.store(SESSION_KEY, &raw)),
            None => self.mirror.remove(SESSION_KEY),
        };

        if let Err(e) = outcome {
            log::warn!("Unable to persist the session: {}", e);
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*self.state())
            .finish()
    }
}

/// Errors returned by the [`SessionStore`]'s account operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The server understood the request and said no.
    #[error("Rejected by the server ({}): {}", status, reason)]
    Rejected { status: StatusCode, reason: String },
    /// We couldn't get a usable answer out of the server.
    #[error("Unable to complete the request")]
    Transport(#[source] TransportError),
}

impl AuthError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AuthError::Rejected { status, .. } => Some(*status),
            AuthError::Transport(e) => e.status(),
        }
    }
}

impl From<TransportError> for AuthError {
    fn from(e: TransportError) -> AuthError {
        match e {
            TransportError::HttpStatus { status, reason } => {
                AuthError::Rejected {
                    status,
                    reason: reason.unwrap_or_else(|| {
                        status.canonical_reason().unwrap_or("unknown").to_string()
                    }),
                }
            },
            other => AuthError::Transport(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        mirror::MemoryMirror,
        session::sample_profile,
        transport::tests::CountingHandler,
    };
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;
    use url::Url;

    struct Fixture {
        server: ServerGuard,
        mirror: Arc<MemoryMirror>,
        store: SessionStore,
        transport: Transport,
    }

    async fn fixture(stored: Option<&str>) -> Fixture {
        let server = Server::new_async().await;
        let mirror = match stored {
            Some(raw) => MemoryMirror::new().with(SESSION_KEY, raw),
            None => MemoryMirror::new(),
        };
        let mirror = Arc::new(mirror);
        let store = SessionStore::bootstrap(mirror.clone());
        let config = Config::new(Url::parse(&server.url()).unwrap());
        let transport =
            Transport::new(&config, Arc::new(CountingHandler::default()))
                .unwrap();

        Fixture {
            server,
            mirror,
            store,
            transport,
        }
    }

    fn stored_profile() -> String {
        serde_json::to_string(&sample_profile()).unwrap()
    }

    fn mirrored(mirror: &MemoryMirror) -> Option<Session> {
        let raw = mirror.load(SESSION_KEY)?;
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn bootstrap_from_an_empty_mirror() {
        let f = fixture(None).await;

        assert!(!f.store.is_authenticated());
        assert_eq!(f.store.session(), None);
    }

    #[tokio::test]
    async fn bootstrap_restores_a_stored_session() {
        let f = fixture(Some(&stored_profile())).await;

        assert!(f.store.is_authenticated());
        assert_eq!(f.store.profile(), Some(sample_profile()));
    }

    #[tokio::test]
    async fn bootstrap_treats_garbage_as_logged_out() {
        for garbage in &["{not json", "null", "[1, 2]", "42", ""] {
            let f = fixture(Some(*garbage)).await;

            assert!(!f.store.is_authenticated(), "{:?}", garbage);
        }
    }

    #[tokio::test]
    async fn login_populates_the_session_and_mirror() {
        let mut f = fixture(None).await;
        let mock = f
            .server
            .mock("POST", "/api/auth/login")
            .match_body(Matcher::Json(
                json!({"username": "admin", "password": "hunter2"}),
            ))
            .with_status(200)
            .with_body(json!({"message": "ok", "user": sample_profile()}).to_string())
            .create_async()
            .await;

        let got = f.store.login(&f.transport, "admin", "hunter2").await.unwrap();

        mock.assert_async().await;
        assert_eq!(got, sample_profile());
        assert!(f.store.is_authenticated());
        assert_eq!(mirrored(&f.mirror), f.store.session());

        // and a fresh store built from the mirror sees the same thing
        let reloaded = SessionStore::bootstrap(f.mirror.clone());
        assert_eq!(reloaded.session(), f.store.session());
    }

    #[tokio::test]
    async fn failed_login_changes_nothing() {
        let mut f = fixture(None).await;
        let _mock = f
            .server
            .mock("POST", "/api/auth/login")
            .with_status(401)
            .with_body(r#"{"error": "bad credentials"}"#)
            .create_async()
            .await;

        let err = f.store.login(&f.transport, "admin", "nope").await.unwrap_err();

        match err {
            AuthError::Rejected { status, reason } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(reason.as_str(), "bad credentials");
            },
            other => panic!("Unexpected error: {:?}", other),
        }
        assert!(!f.store.is_authenticated());
        assert_eq!(f.mirror.load(SESSION_KEY), None);
    }

    #[tokio::test]
    async fn failed_login_keeps_an_existing_session() {
        let mut f = fixture(Some(&stored_profile())).await;
        let _mock = f
            .server
            .mock("POST", "/api/auth/login")
            .with_status(400)
            .create_async()
            .await;

        f.store.login(&f.transport, "", "").await.unwrap_err();

        assert_eq!(f.store.profile(), Some(sample_profile()));
        assert_eq!(f.mirror.load(SESSION_KEY), Some(stored_profile()));
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let mut f = fixture(Some(&stored_profile())).await;
        let mock = f
            .server
            .mock("POST", "/api/auth/logout")
            .with_status(200)
            .create_async()
            .await;

        f.store.logout(&f.transport).await;

        mock.assert_async().await;
        assert!(!f.store.is_authenticated());
        assert_eq!(f.mirror.load(SESSION_KEY), None);
    }

    #[tokio::test]
    async fn logout_works_even_if_the_server_is_unhappy() {
        let mut f = fixture(Some(&stored_profile())).await;
        let _mock = f
            .server
            .mock("POST", "/api/auth/logout")
            .with_status(500)
            .create_async()
            .await;

        f.store.logout(&f.transport).await;

        assert!(!f.store.is_authenticated());
        assert_eq!(f.mirror.load(SESSION_KEY), None);
    }

    #[tokio::test]
    async fn logout_when_already_logged_out() {
        let mut f = fixture(None).await;
        let _mock = f
            .server
            .mock("POST", "/api/auth/logout")
            .with_status(401)
            .create_async()
            .await;

        f.store.logout(&f.transport).await;
        f.store.logout(&f.transport).await;

        assert!(!f.store.is_authenticated());
    }

    #[tokio::test]
    async fn invalidate_is_idempotent() {
        let f = fixture(Some(&stored_profile())).await;

        assert!(f.store.invalidate());
        assert!(!f.store.is_authenticated());
        assert_eq!(f.mirror.load(SESSION_KEY), None);

        for _ in 0..3 {
            assert!(!f.store.invalidate());
            assert!(!f.store.is_authenticated());
            assert_eq!(f.mirror.load(SESSION_KEY), None);
        }
    }

    #[tokio::test]
    async fn invalidate_never_calls_the_server() {
        let mut f = fixture(Some(&stored_profile())).await;
        let mock = f
            .server
            .mock("POST", "/api/auth/logout")
            .expect(0)
            .create_async()
            .await;

        f.store.invalidate();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn refresh_profile_replaces_the_session() {
        let mut f = fixture(Some(&stored_profile())).await;
        let fresh = json!({"id": 1, "username": "renamed", "token": "t2"});
        let _mock = f
            .server
            .mock("GET", "/api/auth/me")
            .with_status(200)
            .with_body(fresh.to_string())
            .create_async()
            .await;

        let got = f.store.refresh_profile(&f.transport).await.unwrap();

        assert_eq!(got.username(), Some("renamed"));
        assert_eq!(f.store.profile(), Some(got));
        assert_eq!(mirrored(&f.mirror), f.store.session());
    }

    #[tokio::test]
    async fn failed_refresh_is_the_same_as_logging_out() {
        let mut f = fixture(Some(&stored_profile())).await;
        let _me = f
            .server
            .mock("GET", "/api/auth/me")
            .with_status(401)
            .create_async()
            .await;
        let logout = f
            .server
            .mock("POST", "/api/auth/logout")
            .with_status(200)
            .create_async()
            .await;

        let err = f.store.refresh_profile(&f.transport).await.unwrap_err();

        logout.assert_async().await;
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert!(!f.store.is_authenticated());
        assert_eq!(f.store.session(), None);
        assert_eq!(f.mirror.load(SESSION_KEY), None);
    }

    #[tokio::test]
    async fn reset_credential_merges_the_new_token() {
        let mut f = fixture(Some(&stored_profile())).await;
        let _mock = f
            .server
            .mock("POST", "/api/auth/reset-token")
            .with_status(200)
            .with_body(r#"{"message": "reset", "token": "brand-new"}"#)
            .create_async()
            .await;

        let got = f.store.reset_credential(&f.transport).await.unwrap();

        assert_eq!(got.as_str(), "brand-new");
        let profile = f.store.profile().unwrap();
        assert_eq!(profile.token(), Some("brand-new"));
        assert_eq!(profile.username(), sample_profile().username());
        assert_eq!(profile.get("created_at"), sample_profile().get("created_at"));
        assert_eq!(mirrored(&f.mirror), f.store.session());
    }

    #[tokio::test]
    async fn reset_credential_without_a_session_stays_logged_out() {
        let mut f = fixture(None).await;
        let _mock = f
            .server
            .mock("POST", "/api/auth/reset-token")
            .with_status(200)
            .with_body(r#"{"token": "brand-new"}"#)
            .create_async()
            .await;

        let got = f.store.reset_credential(&f.transport).await.unwrap();

        assert_eq!(got.as_str(), "brand-new");
        assert!(!f.store.is_authenticated());
        assert_eq!(f.mirror.load(SESSION_KEY), None);
    }

    #[tokio::test]
    async fn failed_reset_keeps_the_old_token() {
        let mut f = fixture(Some(&stored_profile())).await;
        let _mock = f
            .server
            .mock("POST", "/api/auth/reset-token")
            .with_status(500)
            .with_body(r#"{"error": "database is locked"}"#)
            .create_async()
            .await;

        let err = f.store.reset_credential(&f.transport).await.unwrap_err();

        assert_eq!(
            err.to_string().as_str(),
            "Rejected by the server (500 Internal Server Error): database is \
             locked"
        );
        assert_eq!(f.store.profile(), Some(sample_profile()));
    }

    #[tokio::test]
    async fn change_username_updates_the_profile() {
        let mut f = fixture(Some(&stored_profile())).await;
        let _mock = f
            .server
            .mock("POST", "/api/auth/change-username")
            .match_body(Matcher::Json(json!({"username": "root"})))
            .with_status(200)
            .with_body(r#"{"message": "ok", "username": "root"}"#)
            .create_async()
            .await;

        let got = f.store.change_username(&f.transport, "root").await.unwrap();

        assert_eq!(got.as_str(), "root");
        let profile = f.store.profile().unwrap();
        assert_eq!(profile.username(), Some("root"));
        assert_eq!(profile.token(), sample_profile().token());
    }

    #[tokio::test]
    async fn change_password_surfaces_the_reason() {
        let mut f = fixture(Some(&stored_profile())).await;
        let _mock = f
            .server
            .mock("POST", "/api/auth/change-password")
            .with_status(400)
            .with_body(r#"{"error": "too short"}"#)
            .create_async()
            .await;

        let err = f
            .store
            .change_password(&f.transport, "hunter2", "abc")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert!(err.to_string().contains("too short"));
        assert!(f.store.is_authenticated());
    }
}
