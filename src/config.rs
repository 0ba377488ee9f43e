//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub routes: RoutesConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "videos.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://videos.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Session configuration
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// Session signing secret (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 2592000 = 30 days)
    pub session_max_age: i64,
    /// Name of the cookie carrying the session token
    pub cookie_name: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_secret", &"<redacted>")
            .field("session_max_age", &self.session_max_age)
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

/// Route allow-lists consulted by the route guard
///
/// Exact paths must match the whole request path. Prefixes match with a
/// plain `starts_with`, so `/api/auth` also covers `/api/auth/session`.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutesConfig {
    /// Where unauthenticated requests are sent
    pub login_path: String,
    /// Login/registration entry points
    pub auth_flow_paths: Vec<String>,
    /// Auth protocol namespaces
    pub auth_flow_prefixes: Vec<String>,
    /// Public pages
    pub public_paths: Vec<String>,
    /// Public namespaces (media serving, static assets)
    pub public_prefixes: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            auth_flow_paths: vec!["/login".to_string(), "/register".to_string()],
            auth_flow_prefixes: vec!["/api/auth".to_string()],
            public_paths: vec![
                "/".to_string(),
                "/health".to_string(),
                "/favicon.ico".to_string(),
            ],
            public_prefixes: vec!["/api/videos".to_string(), "/public/".to_string()],
        }
    }
}

/// Optional seed account
///
/// When both fields are set, a credential record for `email` is
/// created at startup unless one already exists.
#[derive(Clone, Deserialize, Default)]
pub struct AdminConfig {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (REELGATE__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let routes = RoutesConfig::default();

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/reelgate.db")?
            .set_default("auth.session_max_age", 2_592_000)?
            .set_default("auth.cookie_name", "session-token")?
            .set_default("routes.login_path", routes.login_path)?
            .set_default("routes.auth_flow_paths", routes.auth_flow_paths)?
            .set_default("routes.auth_flow_prefixes", routes.auth_flow_prefixes)?
            .set_default("routes.public_paths", routes.public_paths)?
            .set_default("routes.public_prefixes", routes.public_prefixes)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("REELGATE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("routes.auth_flow_paths")
                    .with_list_parse_key("routes.auth_flow_prefixes")
                    .with_list_parse_key("routes.public_paths")
                    .with_list_parse_key("routes.public_prefixes")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    /// Startup checks. Any failure here aborts the process.
    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::auth::session::MIN_SECRET_BYTES;

        if self.auth.session_secret.as_bytes().len() < MIN_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.auth.cookie_name.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "auth.cookie_name must not be empty".to_string(),
            ));
        }

        if !self.routes.login_path.starts_with('/') {
            return Err(crate::error::AppError::Config(
                "routes.login_path must start with '/'".to_string(),
            ));
        }

        // The login page must be reachable without a session, or every
        // redirect would loop back onto itself.
        let allow_list = crate::auth::AllowList::from_config(&self.routes);
        if allow_list.classify(&self.routes.login_path) == crate::auth::RouteClass::Protected {
            return Err(crate::error::AppError::Config(format!(
                "routes.login_path {} must be listed as an auth-flow or public route",
                self.routes.login_path
            )));
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from("/tmp/reelgate-test.db"),
            },
            auth: AuthConfig {
                session_secret: "x".repeat(32),
                session_max_age: 2_592_000,
                cookie_name: "session-token".to_string(),
            },
            routes: RoutesConfig::default(),
            admin: AdminConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_http_on_localhost() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert!(!config.should_use_secure_cookies());
    }

    #[test]
    fn validate_rejects_short_session_secret() {
        let mut config = valid_config();
        config.auth.session_secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("session secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.session_secret")
        ));
    }

    #[test]
    fn validate_rejects_non_positive_max_age() {
        let mut config = valid_config();
        config.auth.session_max_age = 0;

        assert!(matches!(
            config.validate(),
            Err(crate::error::AppError::Config(message))
                if message.contains("session_max_age")
        ));
    }

    #[test]
    fn validate_rejects_guarded_login_path() {
        let mut config = valid_config();
        config.routes.login_path = "/signin".to_string();

        assert!(matches!(
            config.validate(),
            Err(crate::error::AppError::Config(message))
                if message.contains("routes.login_path")
        ));
    }

    #[test]
    fn validate_rejects_http_for_non_local_domain() {
        let mut config = valid_config();
        config.server.domain = "videos.example.com".to_string();
        config.server.protocol = "http".to_string();

        let error = config
            .validate()
            .expect_err("public domains must require https");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("server.protocol must be https")
        ));
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let mut config = valid_config();
        config.admin.password = Some("hunter2hunter2".to_string());

        let rendered = format!("{config:?}");
        assert!(!rendered.contains(&"x".repeat(32)));
        assert!(!rendered.contains("hunter2hunter2"));
    }
}
