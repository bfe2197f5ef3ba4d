//! First-run setup tracking.
//!
//! The gateway behaves differently before and after the service completes its
//! initial setup: before, every request is let through with permissive CORS so
//! that setup traffic can reach the API; after, every request is tenant-scoped.

mod gate;

pub use gate::{ensure_initialized, Bootstrap, InitializationGate, APP_INITIALIZED_KEY};
