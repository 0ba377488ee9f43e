//! Credential authentication
//!
//! Handles:
//! - Credential verification against the credential store
//! - Signed, time-bounded session tokens
//! - Route guarding ahead of every handler

mod authenticator;
mod credentials;
mod guard;
mod handlers;
mod middleware;
pub mod password;
pub mod session;

pub use authenticator::{
    AuthOutcome, AuthenticatedIdentity, Authenticator, Credentials, RejectReason,
};
pub use credentials::{CredentialStore, normalize_email};
pub use guard::{AllowList, GuardDecision, RouteClass, RouteGuard};
pub use handlers::auth_router;
pub use middleware::{CurrentUser, MaybeUser, route_guard};
pub use session::{InvalidSession, Session, SessionIssuer, SessionToken};
