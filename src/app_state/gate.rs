//! Initialization gate backed by a persisted flag.
//!
//! The process-local cache is monotonic: once the flag has been observed as
//! `true` it is never read from storage again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::settings::SystemSettingStore;

/// Reserved system setting key holding the initialization flag.
pub const APP_INITIALIZED_KEY: &str = "system.app.initialized";

const APP_INITIALIZED_DESCRIPTION: &str =
    "Indicates whether the application completed its initial setup.";

/// Tracks whether first-run setup has completed.
pub struct InitializationGate {
    store: Arc<dyn SystemSettingStore>,
    initialized: AtomicBool,
}

impl InitializationGate {
    pub fn new(store: Arc<dyn SystemSettingStore>) -> Self {
        Self {
            store,
            initialized: AtomicBool::new(false),
        }
    }

    /// Whether setup has completed.
    ///
    /// A `false` result is not cached, so later calls read storage again.
    /// Storage errors are returned as-is and never treated as "not initialized".
    pub async fn is_initialized(&self) -> Result<bool, StoreError> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(true);
        }

        let value = self.store.get_value(APP_INITIALIZED_KEY).await?;
        let initialized = matches!(value, Some(Value::Bool(true)));
        if initialized {
            self.initialized.store(true, Ordering::Release);
            debug!("Initialization flag observed, caching");
        }

        Ok(initialized)
    }

    /// Persist the flag and cache it. No-op once cached.
    ///
    /// Concurrent callers may both reach the store; the upsert resolves the
    /// conflict to `true`.
    pub async fn mark_initialized(&self) -> Result<(), StoreError> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        self.store
            .upsert_value(
                APP_INITIALIZED_KEY,
                Value::Bool(true),
                APP_INITIALIZED_DESCRIPTION,
            )
            .await?;

        self.initialized.store(true, Ordering::Release);
        info!("Application marked as initialized");
        Ok(())
    }
}

/// Provisioning that must exist before the service is usable.
///
/// Implementations must be idempotent: the step also runs on every start of an
/// already-initialized service.
#[async_trait]
pub trait Bootstrap: Send + Sync {
    async fn provision(&self) -> Result<(), StoreError>;
}

/// Run first-run provisioning and flip the initialization flag.
///
/// Returns `true` if this call performed the initialization.
pub async fn ensure_initialized(
    gate: &InitializationGate,
    bootstrap: &dyn Bootstrap,
) -> Result<bool, StoreError> {
    if gate.is_initialized().await? {
        bootstrap.provision().await?;
        return Ok(false);
    }

    info!("Application not initialized, running first-run provisioning");
    bootstrap.provision().await?;
    gate.mark_initialized().await?;
    info!("Application initialization completed");
    Ok(true)
}
