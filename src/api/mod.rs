//! API layer
//!
//! HTTP handlers for:
//! - Host application pages (landing, upload)
//! - Metrics (Prometheus)

pub mod metrics;
mod pages;

pub use metrics::{metrics_router, track_http_metrics};
pub use pages::pages_router;
