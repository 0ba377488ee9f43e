//! Common test utilities for E2E tests

#![allow(dead_code)]

use reelgate::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const ADMIN_EMAIL: &str = "admin@test.example.com";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";
pub const COOKIE_NAME: &str = "session-token";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance with a seeded admin credential
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let state = AppState::new(config).await.unwrap();

        let client = no_redirect_client();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = reelgate::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Create an extra credential record directly in the database
    pub async fn create_user(&self, email: &str, password: &str) -> reelgate::data::CredentialRecord {
        let hash = reelgate::auth::password::hash(password).unwrap();
        let record = reelgate::data::CredentialRecord::new(email, Some(hash));
        self.state.db.insert_credential(&record).await.unwrap();
        record
    }

    /// Mint a session token for an identifier without going through login
    pub fn create_test_token(&self, identifier: &str, email: &str) -> String {
        self.state
            .sessions
            .issue(identifier, email)
            .expect("Failed to create test token")
            .token
    }

    /// Log in through the form endpoint and return the session cookie value
    pub async fn login(&self, email: &str, password: &str) -> Option<String> {
        let response = self
            .client
            .post(self.url("/login"))
            .form(&[("email", email), ("password", password)])
            .send()
            .await
            .expect("request succeeds");

        session_cookie_value(&response)
    }
}

/// Client that surfaces redirects instead of following them
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

/// Value of the session cookie set by a response, if any
pub fn session_cookie_value(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| {
            v.strip_prefix(&format!("{COOKIE_NAME}="))
                .and_then(|rest| rest.split(';').next())
                .map(ToString::to_string)
        })
        .filter(|value| !value.is_empty())
}

/// Location header of a redirect response
pub fn location(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn test_config(temp_dir: &TempDir) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "test.example.com".to_string(),
            protocol: "https".to_string(),
        },
        database: config::DatabaseConfig {
            path: temp_dir.path().join("test.db"),
        },
        auth: config::AuthConfig {
            session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
            session_max_age: 2_592_000,
            cookie_name: COOKIE_NAME.to_string(),
        },
        routes: config::RoutesConfig::default(),
        admin: config::AdminConfig {
            email: Some(ADMIN_EMAIL.to_string()),
            password: Some(ADMIN_PASSWORD.to_string()),
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}
