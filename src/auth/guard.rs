//! Route guard
//!
//! Pure per-request decision: classify the path, and for protected paths
//! require a session token that validates. No I/O and no shared mutable
//! state, so the axum middleware can call it inline.

use super::session::{Session, SessionIssuer};
use crate::config::RoutesConfig;

/// How a request path is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Login/registration pages and the auth API
    AuthFlow,
    /// Landing page and public namespaces
    Public,
    /// Everything else
    Protected,
}

impl RouteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::AuthFlow => "auth_flow",
            RouteClass::Public => "public",
            RouteClass::Protected => "protected",
        }
    }
}

/// Static path allow-lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    auth_flow_paths: Vec<String>,
    auth_flow_prefixes: Vec<String>,
    public_paths: Vec<String>,
    public_prefixes: Vec<String>,
}

impl AllowList {
    pub fn from_config(routes: &RoutesConfig) -> Self {
        Self {
            auth_flow_paths: routes.auth_flow_paths.clone(),
            auth_flow_prefixes: routes.auth_flow_prefixes.clone(),
            public_paths: routes.public_paths.clone(),
            public_prefixes: routes.public_prefixes.clone(),
        }
    }

    /// Classify a request path
    ///
    /// Auth-flow entries are checked before public ones.
    pub fn classify(&self, path: &str) -> RouteClass {
        if matches_any(path, &self.auth_flow_paths, &self.auth_flow_prefixes) {
            RouteClass::AuthFlow
        } else if matches_any(path, &self.public_paths, &self.public_prefixes) {
            RouteClass::Public
        } else {
            RouteClass::Protected
        }
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::from_config(&RoutesConfig::default())
    }
}

fn matches_any(path: &str, exact: &[String], prefixes: &[String]) -> bool {
    exact.iter().any(|p| p == path) || prefixes.iter().any(|p| path.starts_with(p.as_str()))
}

/// Outcome of guarding one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Let the request through, with the session when one was checked
    Proceed(Option<Session>),
    /// Send the client to this location instead
    Redirect(String),
}

impl GuardDecision {
    pub fn is_proceed(&self) -> bool {
        matches!(self, GuardDecision::Proceed(_))
    }
}

/// Gate run ahead of every handler
#[derive(Debug, Clone)]
pub struct RouteGuard {
    allow_list: AllowList,
    login_path: String,
    sessions: SessionIssuer,
}

impl RouteGuard {
    pub fn new(allow_list: AllowList, login_path: impl Into<String>, sessions: SessionIssuer) -> Self {
        Self {
            allow_list,
            login_path: login_path.into(),
            sessions,
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        self.allow_list.classify(path)
    }

    /// Decide whether a request for `path` carrying `token` may proceed
    ///
    /// Auth-flow and public paths always proceed and their token is not
    /// inspected. Protected paths proceed only with a valid session.
    pub fn guard(&self, path: &str, token: Option<&str>) -> GuardDecision {
        match self.classify(path) {
            RouteClass::AuthFlow | RouteClass::Public => GuardDecision::Proceed(None),
            RouteClass::Protected => match token.map(|t| self.sessions.validate(t)) {
                Some(Ok(session)) => GuardDecision::Proceed(Some(session)),
                Some(Err(_)) | None => GuardDecision::Redirect(self.login_path.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::DEFAULT_MAX_AGE_SECONDS;
    use chrono::{Duration, Utc};

    fn issuer() -> SessionIssuer {
        SessionIssuer::new(&"k".repeat(32), DEFAULT_MAX_AGE_SECONDS).unwrap()
    }

    fn guard() -> RouteGuard {
        RouteGuard::new(AllowList::default(), "/login", issuer())
    }

    #[test]
    fn classifies_default_allow_list() {
        let allow = AllowList::default();
        assert_eq!(allow.classify("/login"), RouteClass::AuthFlow);
        assert_eq!(allow.classify("/register"), RouteClass::AuthFlow);
        assert_eq!(allow.classify("/api/auth"), RouteClass::AuthFlow);
        assert_eq!(allow.classify("/api/auth/session"), RouteClass::AuthFlow);
        assert_eq!(allow.classify("/"), RouteClass::Public);
        assert_eq!(allow.classify("/api/videos"), RouteClass::Public);
        assert_eq!(allow.classify("/api/videos/123"), RouteClass::Public);
        assert_eq!(allow.classify("/upload"), RouteClass::Protected);
        assert_eq!(allow.classify("/login/extra"), RouteClass::Protected);
        assert_eq!(allow.classify("/api/uploads"), RouteClass::Protected);
        assert_eq!(allow.classify("/metrics"), RouteClass::Protected);
    }

    #[test]
    fn prefixes_match_like_starts_with() {
        let allow = AllowList::default();
        assert_eq!(allow.classify("/api/authors"), RouteClass::AuthFlow);
        assert_eq!(allow.classify("/api/videosx"), RouteClass::Public);
    }

    #[test]
    fn exempt_paths_proceed_regardless_of_token() {
        let guard = guard();
        let valid = issuer().issue("id", "a@b.com").unwrap().token;
        for path in ["/", "/login", "/register", "/api/auth/session", "/api/videos/1"] {
            for token in [None, Some("garbage"), Some(valid.as_str())] {
                assert_eq!(guard.guard(path, token), GuardDecision::Proceed(None), "{path}");
            }
        }
    }

    #[test]
    fn protected_path_without_token_redirects() {
        assert_eq!(
            guard().guard("/upload", None),
            GuardDecision::Redirect("/login".to_string())
        );
    }

    #[test]
    fn protected_path_with_invalid_token_redirects() {
        assert_eq!(
            guard().guard("/upload", Some("not-a-token")),
            GuardDecision::Redirect("/login".to_string())
        );
    }

    #[test]
    fn protected_path_with_expired_token_redirects() {
        let stale = issuer()
            .issue_at("id", "a@b.com", Utc::now() - Duration::days(31))
            .unwrap()
            .token;
        assert_eq!(
            guard().guard("/upload", Some(&stale)),
            GuardDecision::Redirect("/login".to_string())
        );
    }

    #[test]
    fn protected_path_with_valid_token_proceeds_with_session() {
        let token = issuer().issue("01HABC", "a@b.com").unwrap().token;
        match guard().guard("/upload", Some(&token)) {
            GuardDecision::Proceed(Some(session)) => assert_eq!(session.identifier, "01HABC"),
            other => panic!("expected proceed with session, got {other:?}"),
        }
    }

    #[test]
    fn redirect_target_follows_configuration() {
        let mut routes = RoutesConfig::default();
        routes.login_path = "/signin".to_string();
        routes.auth_flow_paths.push("/signin".to_string());
        let guard = RouteGuard::new(AllowList::from_config(&routes), &routes.login_path, issuer());

        assert_eq!(guard.classify("/signin"), RouteClass::AuthFlow);
        assert_eq!(
            guard.guard("/dashboard", None),
            GuardDecision::Redirect("/signin".to_string())
        );
    }
}
