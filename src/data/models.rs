//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// One registered identity
///
/// `email` is stored normalized (see [`crate::auth::normalize_email`]).
/// `password_hash` is a PHC string; a record without one cannot log in.
#[derive(Clone, sqlx::FromRow)]
pub struct CredentialRecord {
    pub id: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Build a new record with a fresh ULID
    pub fn new(email: &str, password_hash: Option<String>) -> Self {
        Self {
            id: EntityId::new().0,
            email: crate::auth::normalize_email(email),
            password_hash,
            created_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "<redacted>"),
            )
            .field("created_at", &self.created_at)
            .finish()
    }
}
