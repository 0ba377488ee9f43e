//! Credential login flow
//!
//! Routes:
//! - GET /login - Login page
//! - POST /login - Form login
//! - POST /api/auth/callback/credentials - JSON login
//! - GET /api/auth/session - Current session (or null)
//! - POST /api/auth/signout - Clear the session cookie

use axum::{
    Form, Json, Router,
    extract::{
        Query, State,
        rejection::{FormRejection, JsonRejection},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};

use super::authenticator::{AuthOutcome, AuthenticatedIdentity, Credentials};
use super::middleware::MaybeUser;
use super::session::{Session, SessionToken};
use crate::AppState;
use crate::error::AppError;

/// Query value appended to the login path after a failed form login
const SIGNIN_ERROR: &str = "CredentialsSignin";

/// Create authentication router
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login_form))
        .route("/api/auth/callback/credentials", post(login_json))
        .route("/api/auth/session", get(current_session))
        .route("/api/auth/signout", post(signout))
}

// =============================================================================
// Login
// =============================================================================

#[derive(Debug, Deserialize)]
struct LoginPageQuery {
    error: Option<String>,
}

/// GET /login
///
/// Renders the login form. Any `error` value shows the same generic notice.
async fn login_page(Query(query): Query<LoginPageQuery>) -> impl IntoResponse {
    let notice = if query.error.is_some() {
        r#"<p class="error">Invalid email or password.</p>"#
    } else {
        ""
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Login - ReelGate</title></head>
<body>
    <h1>ReelGate</h1>
    {notice}
    <form method="post" action="/login">
        <label>Email <input type="email" name="email" required /></label>
        <label>Password <input type="password" name="password" required /></label>
        <button type="submit">Sign in</button>
    </form>
</body>
</html>
"#
    ))
}

/// POST /login
///
/// Success sets the session cookie and goes to `/`. Every rejection goes
/// back to the login page with the same error marker, including bodies
/// that fail to parse.
async fn login_form(
    State(state): State<AppState>,
    jar: CookieJar,
    form: Result<Form<Credentials>, FormRejection>,
) -> Response {
    let credentials = match form {
        Ok(Form(credentials)) => credentials,
        Err(rejection) => match unparsed_login(rejection.status(), &rejection.body_text()) {
            Some(response) => return response,
            None => Credentials::default(),
        },
    };

    match sign_in(&state, &credentials).await {
        Ok((_, issued)) => (
            jar.add(session_cookie(&state, issued.token)),
            Redirect::to("/"),
        )
            .into_response(),
        Err(_) => {
            let target = format!("{}?error={}", state.guard.login_path(), SIGNIN_ERROR);
            Redirect::to(&target).into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionUser {
    id: String,
    email: String,
}

/// Body returned for a signed-in client
#[derive(Debug, Serialize)]
struct SessionResponse {
    user: SessionUser,
    expires: chrono::DateTime<chrono::Utc>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            user: SessionUser {
                id: session.identifier,
                email: session.email,
            },
            expires: session.expires_at,
        }
    }
}

/// POST /api/auth/callback/credentials
///
/// JSON variant of the form login for script clients. Malformed bodies
/// get the same 401 as wrong credentials.
async fn login_json(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, AppError> {
    let credentials = match body {
        Ok(Json(credentials)) => credentials,
        Err(rejection) => match unparsed_login(rejection.status(), &rejection.body_text()) {
            Some(response) => return Ok(response),
            None => Credentials::default(),
        },
    };

    let (identity, issued) = sign_in(&state, &credentials).await?;
    let response = SessionResponse {
        user: SessionUser {
            id: identity.identifier,
            email: identity.email,
        },
        expires: issued.expires_at,
    };

    Ok((jar.add(session_cookie(&state, issued.token)), Json(response)).into_response())
}

/// Decide what to do with a login body that did not deserialize
///
/// Oversized bodies keep their 413. Anything else is treated as an empty
/// submission so it flows through the authenticator as missing
/// credentials and gets the generic failure.
fn unparsed_login(status: StatusCode, detail: &str) -> Option<Response> {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return Some(status.into_response());
    }
    tracing::debug!(%status, detail, "Unparseable login body");
    None
}

/// Authenticate and mint a token
///
/// All rejection reasons collapse into `AuthenticationFailed`.
async fn sign_in(
    state: &AppState,
    credentials: &Credentials,
) -> Result<(AuthenticatedIdentity, SessionToken), AppError> {
    match state.authenticator.authenticate(credentials).await {
        AuthOutcome::Authenticated(identity) => {
            let issued = state.sessions.issue(&identity.identifier, &identity.email)?;
            Ok((identity, issued))
        }
        AuthOutcome::Rejected(_) => Err(AppError::AuthenticationFailed),
    }
}

// =============================================================================
// Session
// =============================================================================

/// GET /api/auth/session
///
/// Read-only view of the caller's session; `null` when signed out.
async fn current_session(MaybeUser(session): MaybeUser) -> Json<Option<SessionResponse>> {
    Json(session.map(SessionResponse::from))
}

// =============================================================================
// Sign out
// =============================================================================

/// POST /api/auth/signout
///
/// Tokens are stateless, so signing out only discards the cookie.
async fn signout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let mut removal = Cookie::build((state.config.auth.cookie_name.clone(), String::new()))
        .path("/")
        .http_only(true)
        .build();
    removal.make_removal();

    (jar.add(removal), Redirect::to(state.guard.login_path()))
}

// =============================================================================
// Helpers
// =============================================================================

/// Cookie lifetime matches the token's validity window
fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let max_age = time::Duration::seconds(state.sessions.max_age().num_seconds());

    Cookie::build((state.config.auth.cookie_name.clone(), token))
        .path("/")
        .max_age(max_age)
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .build()
}
