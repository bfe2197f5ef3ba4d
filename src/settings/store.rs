//! Settings store traits and the in-memory implementation.

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;

use super::events::{SettingChange, SettingEventBus, SettingEventKind};

// =============================================================================
// Traits
// =============================================================================

/// Process-wide settings keyed by a reserved name.
#[async_trait]
pub trait SystemSettingStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get_value(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Insert `key`, or on conflict overwrite its value and refresh its
    /// update timestamp. Must be atomic with respect to concurrent callers.
    async fn upsert_value(&self, key: &str, value: Value, description: &str)
        -> Result<(), StoreError>;
}

/// Per-tenant settings holding raw string values.
#[async_trait]
pub trait TenantSettingStore: Send + Sync {
    /// Read the raw value of `key` for `tenant_id`, if any.
    async fn get_setting(&self, tenant_id: &str, key: &str) -> Result<Option<String>, StoreError>;
}

// =============================================================================
// MemorySettingStore
// =============================================================================

/// A stored system setting row.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSetting {
    pub key: String,
    pub value: Value,
    pub description: String,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

/// Dashmap-backed settings store.
///
/// Tenant setting writes are announced on the attached [`SettingEventBus`],
/// if any.
#[derive(Default)]
pub struct MemorySettingStore {
    system: DashMap<String, SystemSetting>,
    tenant: DashMap<(String, String), String>,
    events: Option<Arc<SettingEventBus>>,
}

impl MemorySettingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish tenant setting changes on `events`.
    pub fn with_events(mut self, events: Arc<SettingEventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Read a full system setting row.
    pub fn system_setting(&self, key: &str) -> Option<SystemSetting> {
        self.system.get(key).map(|row| row.value().clone())
    }

    /// Store a tenant setting and announce `setting.updated`.
    pub async fn set_tenant_setting(
        &self,
        tenant_id: &str,
        key: &str,
        value: impl Into<String>,
    ) {
        self.tenant
            .insert((tenant_id.to_string(), key.to_string()), value.into());
        self.announce(SettingEventKind::Updated, tenant_id, key).await;
    }

    /// Remove a tenant setting and announce `setting.deleted`.
    ///
    /// Returns whether a value was present.
    pub async fn delete_tenant_setting(&self, tenant_id: &str, key: &str) -> bool {
        let removed = self
            .tenant
            .remove(&(tenant_id.to_string(), key.to_string()))
            .is_some();
        self.announce(SettingEventKind::Deleted, tenant_id, key).await;
        removed
    }

    async fn announce(&self, kind: SettingEventKind, tenant_id: &str, key: &str) {
        if let Some(events) = &self.events {
            events
                .publish(kind, &SettingChange::new(tenant_id, key))
                .await;
        }
    }
}

#[async_trait]
impl SystemSettingStore for MemorySettingStore {
    async fn get_value(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.system.get(key).map(|row| row.value.clone()))
    }

    async fn upsert_value(
        &self,
        key: &str,
        value: Value,
        description: &str,
    ) -> Result<(), StoreError> {
        let now = SystemTime::now();

        // The entry guard holds the shard lock, so insert-or-update is atomic.
        match self.system.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let row = occupied.get_mut();
                row.value = value;
                row.updated_at = now;
                debug!(key = key, "Updated system setting");
            }
            Entry::Vacant(vacant) => {
                vacant.insert(SystemSetting {
                    key: key.to_string(),
                    value,
                    description: description.to_string(),
                    created_at: now,
                    updated_at: now,
                });
                debug!(key = key, "Inserted system setting");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl TenantSettingStore for MemorySettingStore {
    async fn get_setting(&self, tenant_id: &str, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .tenant
            .get(&(tenant_id.to_string(), key.to_string()))
            .map(|value| value.value().clone()))
    }
}

// =============================================================================
// Tests
// =============================================================================
