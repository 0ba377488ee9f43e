//! Authentication middleware
//!
//! Runs the route guard ahead of every handler and exposes the session
//! to handlers through extractors.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::guard::GuardDecision;
use super::session::Session;
use crate::AppState;
use crate::error::AppError;
use crate::metrics::GUARD_DECISIONS_TOTAL;

/// Session token from `Authorization: Bearer` or the session cookie
pub(crate) fn extract_token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(cookie_name).map(|cookie| cookie.value().to_owned())
        })
        .filter(|token| !token.is_empty())
}

/// Middleware gating every request through the route guard
///
/// Protected paths without a valid session get a 307 to the login
/// path. When a session was validated it is added to the request
/// extensions for [`CurrentUser`].
///
/// # Usage
/// ```ignore
/// let app = Router::new()
///     .route("/upload", get(upload_page))
///     .layer(middleware::from_fn_with_state(state.clone(), route_guard));
/// ```
pub async fn route_guard(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let token = extract_token_from_headers(request.headers(), &state.config.auth.cookie_name);

    let class = state.guard.classify(&path);
    let decision = state.guard.guard(&path, token.as_deref());

    let label = if decision.is_proceed() { "proceed" } else { "redirect" };
    GUARD_DECISIONS_TOTAL
        .with_label_values(&[class.as_str(), label])
        .inc();

    match decision {
        GuardDecision::Proceed(session) => {
            if let Some(session) = session {
                request.extensions_mut().insert(session);
            }
            next.run(request).await
        }
        GuardDecision::Redirect(target) => {
            tracing::debug!(%path, has_token = token.is_some(), "Redirecting to login");
            Redirect::temporary(&target).into_response()
        }
    }
}

/// Extractor for current authenticated user
///
/// Use in handlers to get the current session.
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(session): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", session.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(CurrentUser(session));
        }

        let state = AppState::from_ref(state);
        let token = extract_token_from_headers(&parts.headers, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthorized)?;
        let session = state.sessions.validate(&token)?;
        parts.extensions.insert(session.clone());

        Ok(CurrentUser(session))
    }
}

/// Optional current user extractor
///
/// Returns None if not authenticated, instead of error.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(MaybeUser(Some(session)));
        }

        let app_state = AppState::from_ref(state);
        let session = extract_token_from_headers(&parts.headers, &app_state.config.auth.cookie_name)
            .and_then(|token| app_state.sessions.validate(&token).ok());

        if let Some(session) = &session {
            parts.extensions.insert(session.clone());
        }

        Ok(MaybeUser(session))
    }
}
