//! ReelGate - credential login and route guarding for a media-upload app
//!
//! # Architecture
//!
//! ```text
//! request ──► route guard ──► public / auth-flow ──► handler
//!                  │
//!                  └──► protected ──► session valid? ──► handler
//!                                          │
//!                                          └──► 307 /login
//!
//! POST /login ──► authenticator ──► credential store (SQLite)
//!                      │
//!                      └──► session issuer ──► signed cookie
//! ```
//!
//! # Modules
//!
//! - `auth`: authenticator, session tokens, route guard, login handlers
//! - `api`: host application pages and metrics endpoint
//! - `data`: credential store (SQLite)
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;

use std::sync::Arc;

/// Login forms are tiny; anything larger is rejected before parsing.
const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024;

/// Application state shared across all handlers
///
/// Built once at startup and cloned into each request. Nothing in it is
/// mutated after construction.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool (credential store)
    pub db: Arc<data::Database>,

    /// Verifies login attempts
    pub authenticator: Arc<auth::Authenticator>,

    /// Issues and validates session tokens
    pub sessions: Arc<auth::SessionIssuer>,

    /// Per-request route guard
    pub guard: Arc<auth::RouteGuard>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Build the session issuer (fails on a bad secret)
    /// 2. Connect to SQLite database
    /// 3. Seed the configured admin credential
    /// 4. Wire authenticator and route guard
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");
        config.validate()?;

        // 1. Signing secret is checked before anything else touches disk
        let sessions =
            auth::SessionIssuer::new(&config.auth.session_secret, config.auth.session_max_age)?;

        // 2. Connect to SQLite database
        let db = Arc::new(data::Database::connect(&config.database.path).await?);
        tracing::info!("Database connected");

        // 3. Seed admin credential
        Self::ensure_admin_user(&db, &config).await?;

        // 4. Wire the auth core
        let store: Arc<dyn auth::CredentialStore> = db.clone();
        let authenticator = auth::Authenticator::new(store);
        let guard = auth::RouteGuard::new(
            auth::AllowList::from_config(&config.routes),
            config.routes.login_path.clone(),
            sessions.clone(),
        );

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            authenticator: Arc::new(authenticator),
            sessions: Arc::new(sessions),
            guard: Arc::new(guard),
        })
    }

    /// Ensure the configured admin credential exists
    ///
    /// Existing records are left untouched; the password is only used
    /// when the email is not yet registered.
    async fn ensure_admin_user(
        db: &data::Database,
        config: &config::AppConfig,
    ) -> Result<(), error::AppError> {
        let (Some(email), Some(password)) = (&config.admin.email, &config.admin.password) else {
            tracing::debug!("No admin credential configured");
            return Ok(());
        };

        if auth::normalize_email(email).is_empty() || password.is_empty() {
            return Err(error::AppError::Config(
                "admin.email and admin.password must not be empty".to_string(),
            ));
        }

        if db.get_credential_by_email(email).await?.is_some() {
            tracing::info!(email = %auth::normalize_email(email), "Admin credential exists");
            return Ok(());
        }

        let password = password.clone();
        let password_hash = tokio::task::spawn_blocking(move || auth::password::hash(&password))
            .await
            .map_err(|e| error::AppError::Internal(e.into()))??;

        let record = data::CredentialRecord::new(email, Some(password_hash));
        db.insert_credential(&record).await?;

        tracing::info!(email = %record.email, id = %record.id, "Admin credential created");
        Ok(())
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments. The route guard wraps
/// every route and the fallback.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware};
    use tower_http::{
        compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
    };

    let cors_layer = build_cors_layer(&state.config.server);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router())
        .merge(api::pages_router())
        .merge(api::metrics_router())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::route_guard,
        ))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(api::track_http_metrics))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> error::AppError {
    error::AppError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn test_state(temp_dir: &TempDir) -> AppState {
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            database: config::DatabaseConfig {
                path: temp_dir.path().join("router.db"),
            },
            auth: config::AuthConfig {
                session_secret: "r".repeat(32),
                session_max_age: 60,
                cookie_name: "session-token".to_string(),
            },
            routes: config::RoutesConfig::default(),
            admin: config::AdminConfig {
                email: Some("Owner@Example.com".to_string()),
                password: Some("owner-pass".to_string()),
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        AppState::new(config).await.unwrap()
    }

    #[tokio::test]
    async fn startup_fails_on_short_secret() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_state(&temp_dir).await.config.as_ref().clone();
        config.auth.session_secret = "too-short".to_string();

        let error = AppState::new(config).await.err().expect("startup must fail");
        assert!(matches!(error, error::AppError::Config(_)));
    }

    #[tokio::test]
    async fn admin_credential_is_seeded_once() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir).await;
        assert_eq!(state.db.count_credentials().await.unwrap(), 1);

        // Restarting against the same database keeps the existing record
        let config = state.config.as_ref().clone();
        let restarted = AppState::new(config).await.unwrap();
        assert_eq!(restarted.db.count_credentials().await.unwrap(), 1);

        let outcome = restarted
            .authenticator
            .authenticate(&auth::Credentials::new("owner@example.com", "owner-pass"))
            .await;
        assert!(outcome.is_authenticated());
    }

    #[tokio::test]
    async fn guard_redirects_protected_request() {
        let temp_dir = TempDir::new().unwrap();
        let app = build_router(test_state(&temp_dir).await);

        let response = app
            .oneshot(Request::get("/upload").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn guard_passes_valid_session_through() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir).await;
        let token = state.sessions.issue("01HROUTER", "owner@example.com").unwrap();
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::get("/upload")
                    .header(header::COOKIE, format!("session-token={}", token.token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn oversized_login_body_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let app = build_router(test_state(&temp_dir).await);

        let body = format!("email=a%40b.com&password={}", "x".repeat(MAX_REQUEST_BODY_BYTES));
        let response = app
            .oneshot(
                Request::post("/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
