//! Router
//!
//! Static route table mapping paths to views, plus the auth guard that runs
//! before every navigation. The guard reads the persisted token directly so
//! it agrees with the HTTP client about whether a session exists.

use crate::http::Navigator;
use crate::storage::{KeyValueStore, TOKEN_KEY};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

const MAX_REDIRECTS: usize = 8;

/// Screens the front-end can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    MainLayout,
    Chat,
    Groups,
    Documents,
}

/// One entry of the route table
#[derive(Debug, Clone)]
pub struct RouteRecord {
    pub path: &'static str,
    pub name: Option<&'static str>,
    pub view: Option<View>,
    /// `None` inherits from the parent; the root default is `true`
    pub requires_auth: Option<bool>,
    pub redirect: Option<&'static str>,
    pub children: Vec<RouteRecord>,
}

impl RouteRecord {
    pub fn new(path: &'static str, view: View) -> Self {
        Self {
            path,
            name: None,
            view: Some(view),
            requires_auth: None,
            redirect: None,
            children: Vec::new(),
        }
    }

    /// Route that immediately sends the user elsewhere
    pub fn redirect(path: &'static str, to: &'static str) -> Self {
        Self {
            path,
            name: None,
            view: None,
            requires_auth: None,
            redirect: Some(to),
            children: Vec::new(),
        }
    }

    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn requires_auth(mut self, required: bool) -> Self {
        self.requires_auth = Some(required);
        self
    }

    pub fn children(mut self, children: Vec<RouteRecord>) -> Self {
        self.children = children;
        self
    }
}

/// Application route table
pub fn default_routes() -> Vec<RouteRecord> {
    vec![
        RouteRecord::new(LOGIN_PATH, View::Login)
            .name("Login")
            .requires_auth(false),
        RouteRecord::new(HOME_PATH, View::MainLayout)
            .requires_auth(true)
            .children(vec![
                RouteRecord::new("", View::Chat).name("Chat"),
                RouteRecord::new("groups", View::Groups).name("Groups"),
                RouteRecord::new("documents", View::Documents).name("Documents"),
            ]),
        RouteRecord::redirect("*", HOME_PATH),
    ]
}

/// A path matched against the table
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRoute {
    pub path: String,
    pub name: Option<&'static str>,
    /// Views from the outermost layout to the leaf
    pub views: Vec<View>,
    pub requires_auth: bool,
}

impl ResolvedRoute {
    /// Innermost view
    pub fn view(&self) -> Option<View> {
        self.views.last().copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Matched(ResolvedRoute),
    Redirect(&'static str),
}

/// Outcome of the navigation guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(&'static str),
}

/// Auth guard applied before each navigation
pub fn guard(target: &ResolvedRoute, authenticated: bool) -> GuardDecision {
    if target.requires_auth && !authenticated {
        GuardDecision::Redirect(LOGIN_PATH)
    } else if target.path == LOGIN_PATH && authenticated {
        GuardDecision::Redirect(HOME_PATH)
    } else {
        GuardDecision::Proceed
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("Redirect loop while navigating to {0}")]
    TooManyRedirects(String),
}

fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        HOME_PATH.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn join(parent: &str, child: &str) -> String {
    if child.starts_with('/') {
        return normalize(child);
    }
    normalize(&format!("{}/{}", parent.trim_end_matches('/'), child))
}

fn match_records(
    records: &[RouteRecord],
    base: &str,
    path: &str,
    inherited_auth: Option<bool>,
    views: &[View],
) -> Option<Resolution> {
    for record in records {
        if record.path == "*" {
            return Some(match record.redirect {
                Some(to) => Resolution::Redirect(to),
                None => Resolution::Matched(ResolvedRoute {
                    path: path.to_string(),
                    name: record.name,
                    views: views.iter().copied().chain(record.view).collect(),
                    requires_auth: record.requires_auth.or(inherited_auth).unwrap_or(true),
                }),
            });
        }

        let full = join(base, record.path);
        let auth = record.requires_auth.or(inherited_auth);
        let mut chain = views.to_vec();
        chain.extend(record.view);

        if !record.children.is_empty() {
            if let Some(found @ Resolution::Matched(_)) =
                match_records(&record.children, &full, path, auth, &chain)
            {
                return Some(found);
            }
        }

        if full == path {
            if let Some(to) = record.redirect {
                return Some(Resolution::Redirect(to));
            }
            return Some(Resolution::Matched(ResolvedRoute {
                path: full,
                name: record.name,
                views: chain,
                requires_auth: auth.unwrap_or(true),
            }));
        }
    }
    None
}

/// Route table plus the current location
pub struct Router {
    routes: Vec<RouteRecord>,
    store: Arc<dyn KeyValueStore>,
    current: RwLock<Option<ResolvedRoute>>,
    /// Bumped on every hard redirect
    reloads: watch::Sender<u64>,
}

impl Router {
    /// Router over the application route table
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_routes(default_routes(), store)
    }

    pub fn with_routes(routes: Vec<RouteRecord>, store: Arc<dyn KeyValueStore>) -> Self {
        let (reloads, _) = watch::channel(0);
        Self {
            routes,
            store,
            current: RwLock::new(None),
            reloads,
        }
    }

    /// Receiver that changes whenever a hard redirect happens. The owner of
    /// the in-memory state drops it in response, as a full page load would.
    pub fn subscribe_reloads(&self) -> watch::Receiver<u64> {
        self.reloads.subscribe()
    }

    /// Match a path without running the guard
    pub fn resolve(&self, path: &str) -> Option<Resolution> {
        let path = normalize(path);
        match_records(&self.routes, HOME_PATH, &path, None, &[])
    }

    fn authenticated(&self) -> bool {
        self.store.get(TOKEN_KEY).is_some()
    }

    /// Navigate to `path`, following table redirects and guard redirects
    pub fn navigate(&self, path: &str) -> Result<ResolvedRoute, RouterError> {
        let mut target = normalize(path);

        for _ in 0..MAX_REDIRECTS {
            let resolved = match self.resolve(&target) {
                Some(Resolution::Matched(route)) => route,
                Some(Resolution::Redirect(to)) => {
                    target = normalize(to);
                    continue;
                }
                None => {
                    target = HOME_PATH.to_string();
                    continue;
                }
            };

            match guard(&resolved, self.authenticated()) {
                GuardDecision::Proceed => {
                    tracing::debug!(path = %resolved.path, "Navigated");
                    self.set_current(resolved.clone());
                    return Ok(resolved);
                }
                GuardDecision::Redirect(to) => {
                    tracing::debug!(from = %resolved.path, to, "Guard redirect");
                    target = to.to_string();
                }
            }
        }

        Err(RouterError::TooManyRedirects(path.to_string()))
    }

    /// Current location, if any navigation has happened
    pub fn current(&self) -> Option<ResolvedRoute> {
        self.current.read().ok().and_then(|c| c.clone())
    }

    fn set_current(&self, route: ResolvedRoute) {
        if let Ok(mut current) = self.current.write() {
            *current = Some(route);
        }
    }
}

impl Navigator for Router {
    fn hard_redirect(&self, path: &str) {
        match self.resolve(path) {
            Some(Resolution::Matched(route)) => {
                tracing::info!(path = %route.path, "Hard redirect");
                self.set_current(route);
            }
            _ => {
                tracing::warn!(path, "Hard redirect to unknown path");
            }
        }
        self.reloads.send_modify(|n| *n += 1);
    }
}
