//! In-app destinations and the guard deciding who may visit them.

use crate::store::SessionStore;
use std::sync::{Arc, Mutex, MutexGuard};

/// Where unauthenticated users get sent.
pub const LOGIN: &str = "/login";
/// Where authenticated users land.
pub const LANDING: &str = "/";
/// How many committed destinations [`Router::history()`] remembers.
pub const HISTORY_LIMIT: usize = 50;

/// A destination within the application.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub name: &'static str,
    /// Does the user need to be logged in to see this?
    pub requires_auth: bool,
}

impl Route {
    /// A destination which needs a session, the usual case.
    pub const fn new(path: &'static str, name: &'static str) -> Self {
        Route {
            path,
            name,
            requires_auth: true,
        }
    }

    pub const fn public(path: &'static str, name: &'static str) -> Self {
        Route {
            path,
            name,
            requires_auth: false,
        }
    }
}

/// Every destination the admin interface knows about.
pub const ROUTES: &[Route] = &[
    Route::public(LOGIN, "Login"),
    Route::new(LANDING, "Dashboard"),
    Route::new("/channels", "Channels"),
    Route::new("/groups", "Groups"),
    Route::new("/settings", "Settings"),
    Route::new("/subscription", "Subscription"),
    Route::new("/proxy-status", "ProxyStatus"),
];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

/// Decide whether someone may visit `destination`.
///
/// The originally requested destination is dropped when redirecting to
/// [`LOGIN`].
pub fn guard(destination: &Route, authenticated: bool) -> GuardDecision {
    if destination.requires_auth && !authenticated {
        GuardDecision::Redirect(LOGIN)
    } else if destination.path == LOGIN && authenticated {
        GuardDecision::Redirect(LANDING)
    } else {
        GuardDecision::Allow
    }
}

/// The outcome of [`Router::push()`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub requested: &'static str,
    /// Where we actually ended up after consulting the [`guard()`].
    pub destination: &'static str,
    /// `false` if we were already at `destination`.
    pub changed: bool,
}

impl Navigation {
    pub fn was_redirected(&self) -> bool { self.requested != self.destination }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NavigationError {
    #[error("There is no page at \"{}\"", path)]
    NotFound { path: String },
    #[error("Redirects starting at \"{}\" never settle", path)]
    RedirectLoop { path: &'static str },
}

#[derive(Debug, Default)]
struct Location {
    current: Option<&'static str>,
    history: Vec<&'static str>,
}

/// Keeps track of where the user currently is.
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
    session: Arc<SessionStore>,
    location: Mutex<Location>,
}

impl Router {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Router::with_routes(session, ROUTES.to_vec())
    }

    pub fn with_routes(session: Arc<SessionStore>, routes: Vec<Route>) -> Self {
        Router {
            routes,
            session,
            location: Mutex::new(Location::default()),
        }
    }

    pub fn resolve(&self, path: &str) -> Result<Route, NavigationError> {
        let normalized = match path.trim_end_matches('/') {
            "" => "/",
            other => other,
        };

        self.routes
            .iter()
            .copied()
            .find(|route| route.path == normalized)
            .ok_or_else(|| NavigationError::NotFound {
                path: path.to_string(),
            })
    }

    /// Try to navigate to `path`, following any redirects the [`guard()`]
    /// asks for.
    ///
    /// Navigating to where we already are is a no-op, so a burst of
    /// redirects to the same place only moves the user once.
    pub fn push(&self, path: &str) -> Result<Navigation, NavigationError> {
        let requested = self.resolve(path)?;
        let authenticated = self.session.is_authenticated();
        let mut route = requested;

        // each redirect target is guarded again, but a sane route table
        // settles after a single hop
        for _ in 0..self.routes.len() {
            match guard(&route, authenticated) {
                GuardDecision::Allow => {
                    return Ok(self.commit(requested.path, route.path))
                },
                GuardDecision::Redirect(to) => {
                    log::debug!("Redirecting from {} to {}", route.path, to);
                    route = self.resolve(to)?;
                },
            }
        }

        Err(NavigationError::RedirectLoop {
            path: requested.path,
        })
    }

    fn commit(
        &self,
        requested: &'static str,
        destination: &'static str,
    ) -> Navigation {
        let mut location = self.location();
        let changed = location.current != Some(destination);

        if changed {
            log::debug!("Navigated to {}", destination);
            location.current = Some(destination);
            location.history.push(destination);
            if location.history.len() > HISTORY_LIMIT {
                let excess = location.history.len() - HISTORY_LIMIT;
                location.history.drain(..excess);
            }
        }

        Navigation {
            requested,
            destination,
            changed,
        }
    }

    pub fn current(&self) -> Option<&'static str> { self.location().current }

    /// The last [`HISTORY_LIMIT`] destinations we've moved to, oldest first.
    pub fn history(&self) -> Vec<&'static str> {
        self.location().history.clone()
    }

    fn location(&self) -> MutexGuard<'_, Location> {
        match self.location.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mirror::{MemoryMirror, SESSION_KEY},
        session::sample_profile,
    };

    fn logged_in() -> Arc<SessionStore> {
        let raw = serde_json::to_string(&sample_profile()).unwrap();
        let mirror = MemoryMirror::new().with(SESSION_KEY, &raw);
        Arc::new(SessionStore::bootstrap(Arc::new(mirror)))
    }

    fn logged_out() -> Arc<SessionStore> {
        Arc::new(SessionStore::bootstrap(Arc::new(MemoryMirror::new())))
    }

    #[test]
    fn guard_decisions() {
        let login = Route::public(LOGIN, "Login");
        let channels = Route::new("/channels", "Channels");
        let about = Route::public("/about", "About");

        assert_eq!(guard(&channels, false), GuardDecision::Redirect(LOGIN));
        assert_eq!(guard(&channels, true), GuardDecision::Allow);
        assert_eq!(guard(&login, true), GuardDecision::Redirect(LANDING));
        assert_eq!(guard(&login, false), GuardDecision::Allow);
        assert_eq!(guard(&about, false), GuardDecision::Allow);
        assert_eq!(guard(&about, true), GuardDecision::Allow);
    }

    #[test]
    fn routes_need_a_session_unless_marked_public() {
        assert!(Route::new("/channels", "Channels").requires_auth);
        assert!(!Route::public(LOGIN, "Login").requires_auth);
    }

    #[test]
    fn history_only_keeps_recent_destinations() {
        let router = Router::new(logged_in());

        for _ in 0..HISTORY_LIMIT {
            router.push("/channels").unwrap();
            router.push("/groups").unwrap();
        }
        router.push("/settings").unwrap();

        let history = router.history();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history.last().copied(), Some("/settings"));
        assert_eq!(history.first().copied(), Some("/groups"));
    }

    #[test]
    fn only_login_is_public() {
        let public: Vec<_> = ROUTES
            .iter()
            .filter(|r| !r.requires_auth)
            .map(|r| r.path)
            .collect();

        assert_eq!(public, vec![LOGIN]);
    }

    #[test]
    fn protected_pages_redirect_to_login() {
        let router = Router::new(logged_out());

        let got = router.push("/channels").unwrap();

        assert_eq!(
            got,
            Navigation {
                requested: "/channels",
                destination: LOGIN,
                changed: true,
            }
        );
        assert!(got.was_redirected());
        assert_eq!(router.current(), Some(LOGIN));
    }

    #[test]
    fn login_redirects_to_the_landing_page_when_logged_in() {
        let router = Router::new(logged_in());

        let got = router.push(LOGIN).unwrap();

        assert_eq!(got.destination, LANDING);
        assert_eq!(router.current(), Some(LANDING));
    }

    #[test]
    fn logged_in_users_go_where_they_asked() {
        let router = Router::new(logged_in());

        let got = router.push("/groups/").unwrap();

        assert_eq!(got.destination, "/groups");
        assert!(!got.was_redirected());
    }

    #[test]
    fn repeated_navigation_is_a_no_op() {
        let router = Router::new(logged_out());

        assert!(router.push(LOGIN).unwrap().changed);
        assert!(!router.push(LOGIN).unwrap().changed);
        assert!(!router.push("/settings").unwrap().changed);

        assert_eq!(router.history(), vec![LOGIN]);
    }

    #[test]
    fn guard_sees_session_changes_immediately() {
        let session = logged_in();
        let router = Router::new(Arc::clone(&session));
        router.push("/channels").unwrap();

        session.invalidate();
        let got = router.push("/groups").unwrap();

        assert_eq!(got.destination, LOGIN);
        assert_eq!(router.history(), vec!["/channels", LOGIN]);
    }

    #[test]
    fn unknown_pages() {
        let router = Router::new(logged_in());

        let got = router.push("/nope");

        assert_eq!(
            got,
            Err(NavigationError::NotFound {
                path: String::from("/nope")
            })
        );
        assert_eq!(router.current(), None);
    }

    #[test]
    fn redirect_loops_are_detected() {
        // a broken table where the login page itself needs a login
        let routes = vec![
            Route::new(LOGIN, "Login"),
            Route::new(LANDING, "Dashboard"),
        ];
        let router = Router::with_routes(logged_out(), routes);

        let got = router.push(LANDING);

        assert_eq!(got, Err(NavigationError::RedirectLoop { path: LANDING }));
    }
}
