//! Credential store seam
//!
//! The authenticator only ever reads credentials through this trait, so
//! tests can substitute a stub and the SQLite implementation stays in
//! the data layer.

use async_trait::async_trait;

use crate::data::CredentialRecord;
use crate::error::AppError;

/// Lookup-only access to registered identities
///
/// `Ok(None)` means the email is not registered. `Err` means the store
/// could not answer (connectivity, decoding) and is kept distinct so a
/// wrong password is never confused with an outage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, AppError>;
}

/// Canonical form of an email used as the identity key
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
