//! Per-tenant allowed-origin cache with event-driven invalidation.
//!
//! Policies are loaded on the first request for a tenant and stay
//! authoritative until a `setting.updated` or `setting.deleted` notification
//! for the CORS origins key arrives for that tenant.
//!
//! # Concurrency
//!
//! - Loads are single-flight per tenant: concurrent first requests for the
//!   same tenant wait on one load instead of issuing several.
//! - Every invalidation bumps a per-tenant generation. A load only publishes
//!   its result if the generation is unchanged since it started, so a load
//!   racing with a delete or update can never resurrect a stale policy.
//! - A dropped (cancelled) load publishes nothing.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::settings::{
    SettingChange, SettingEventBus, SettingEventKind, SettingHandler, SubscriptionId,
    TenantSettingStore,
};
use crate::tenant::TenantContext;

use super::origin::{normalize_origin, AllowedOrigins, CORS_ALLOWED_ORIGINS_KEY};

/// Cache of tenant id → allowed origins.
pub struct CorsPolicyCache {
    store: Arc<dyn TenantSettingStore>,
    policies: DashMap<String, Arc<AllowedOrigins>>,
    generations: DashMap<String, u64>,
    load_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CorsPolicyCache {
    pub fn new(store: Arc<dyn TenantSettingStore>) -> Self {
        Self {
            store,
            policies: DashMap::new(),
            generations: DashMap::new(),
            load_locks: DashMap::new(),
        }
    }

    /// Load the tenant's policy unless it is already cached.
    pub async fn ensure_loaded(&self, tenant_id: &str) {
        if self.policies.contains_key(tenant_id) {
            return;
        }

        let lock = self
            .load_locks
            .entry(tenant_id.to_string())
            .or_default()
            .value()
            .clone();
        let _guard = lock.lock().await;

        // Another request may have finished the load while we waited.
        if self.policies.contains_key(tenant_id) {
            return;
        }

        let generation = self.generation(tenant_id);
        self.load(tenant_id, generation).await;
    }

    /// Replace the tenant's policy with a fresh load.
    pub async fn reload(&self, tenant_id: &str) {
        let generation = self.bump_generation(tenant_id);
        self.load(tenant_id, generation).await;
    }

    /// Drop the tenant's policy; the next request reloads it.
    pub fn invalidate(&self, tenant_id: &str) {
        let mut generation = self.generations.entry(tenant_id.to_string()).or_insert(0);
        *generation += 1;
        self.policies.remove(tenant_id);
        debug!(tenant_id = tenant_id, "Invalidated CORS allowed origins");
    }

    /// The cached policy for a tenant, if loaded.
    pub fn policy(&self, tenant_id: &str) -> Option<Arc<AllowedOrigins>> {
        self.policies
            .get(tenant_id)
            .map(|policy| Arc::clone(policy.value()))
    }

    /// Number of tenants with a cached policy.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Decide the `Access-Control-Allow-Origin` value for a request.
    ///
    /// Returns the normalized origin when allowed and `None` otherwise. Denies
    /// when the origin is missing or empty, when there is no tenant, and when
    /// the tenant's policy is not cached.
    pub fn resolve_origin(
        &self,
        origin: Option<&str>,
        tenant: Option<&TenantContext>,
    ) -> Option<String> {
        let normalized = normalize_origin(origin?);
        if normalized.is_empty() {
            return None;
        }

        let policy = self.policy(tenant?.tenant_id())?;
        if policy.allows(&normalized) {
            Some(normalized)
        } else {
            debug!(
                tenant_id = tenant.map(TenantContext::tenant_id).unwrap_or("-"),
                origin = %normalized,
                "Origin not allowed"
            );
            None
        }
    }

    /// Subscribe to setting notifications. Call [`CorsSubscriptions::stop`]
    /// on shutdown.
    pub fn start(self: &Arc<Self>, events: &SettingEventBus) -> CorsSubscriptions {
        let updated = events.subscribe(
            SettingEventKind::Updated,
            Arc::new(ReloadOnUpdate(Arc::clone(self))),
        );
        let deleted = events.subscribe(
            SettingEventKind::Deleted,
            Arc::new(EvictOnDelete(Arc::clone(self))),
        );
        debug!("CORS policy cache subscribed to setting notifications");
        CorsSubscriptions { updated, deleted }
    }

    fn generation(&self, tenant_id: &str) -> u64 {
        self.generations
            .get(tenant_id)
            .map(|generation| *generation.value())
            .unwrap_or(0)
    }

    fn bump_generation(&self, tenant_id: &str) -> u64 {
        let mut generation = self.generations.entry(tenant_id.to_string()).or_insert(0);
        *generation += 1;
        *generation
    }

    async fn load(&self, tenant_id: &str, generation: u64) {
        let result = self
            .store
            .get_setting(tenant_id, CORS_ALLOWED_ORIGINS_KEY)
            .await;

        // Holding the generation entry serializes this publish with
        // `invalidate` and `bump_generation` for the same tenant.
        let current = self.generations.entry(tenant_id.to_string()).or_insert(0);
        if *current != generation {
            debug!(
                tenant_id = tenant_id,
                "Discarding CORS origins load superseded by a newer change"
            );
            return;
        }

        match result {
            Ok(raw) => {
                let parsed = AllowedOrigins::parse(raw.as_deref());
                info!(
                    tenant_id = tenant_id,
                    origins = %parsed,
                    "Updated CORS allowed origins for tenant"
                );
                self.policies.insert(tenant_id.to_string(), Arc::new(parsed));
            }
            Err(e) => {
                self.policies.remove(tenant_id);
                warn!(
                    tenant_id = tenant_id,
                    error = %e,
                    "Failed to load CORS configuration for tenant"
                );
            }
        }
    }
}

/// Live subscriptions of a [`CorsPolicyCache`].
#[derive(Debug)]
pub struct CorsSubscriptions {
    updated: SubscriptionId,
    deleted: SubscriptionId,
}

impl CorsSubscriptions {
    /// Remove both subscriptions from `events`.
    pub fn stop(self, events: &SettingEventBus) {
        events.unsubscribe(self.updated);
        events.unsubscribe(self.deleted);
        debug!("CORS policy cache unsubscribed from setting notifications");
    }
}

struct ReloadOnUpdate(Arc<CorsPolicyCache>);

#[async_trait]
impl SettingHandler for ReloadOnUpdate {
    async fn handle(&self, change: &SettingChange) {
        if change.key != CORS_ALLOWED_ORIGINS_KEY {
            return;
        }
        self.0.reload(&change.tenant_id).await;
    }
}

struct EvictOnDelete(Arc<CorsPolicyCache>);

#[async_trait]
impl SettingHandler for EvictOnDelete {
    async fn handle(&self, change: &SettingChange) {
        if change.key != CORS_ALLOWED_ORIGINS_KEY {
            return;
        }
        self.0.invalidate(&change.tenant_id);
    }
}

// =============================================================================
// Tests
// =============================================================================
