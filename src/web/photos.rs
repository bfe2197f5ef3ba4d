//! Photo and site-configuration collaborators used by share documents.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::tenant::TenantContext;

/// A photo manifest entry as embedded into share documents.
///
/// Only `id` is interpreted by the gateway; every other field is carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PhotoRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Attach an extra field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Looks up photos by identifier.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Fetch the records matching `ids` for a tenant.
    ///
    /// Unknown identifiers are omitted. The result order is unspecified.
    async fn find_photos_by_ids(
        &self,
        tenant: Option<&TenantContext>,
        ids: &[String],
    ) -> Result<Vec<PhotoRecord>, StoreError>;
}

/// Provides the public site configuration of a tenant.
#[async_trait]
pub trait SiteConfigProvider: Send + Sync {
    async fn site_config(&self, tenant: Option<&TenantContext>) -> Result<Value, StoreError>;
}

// =============================================================================
// In-memory implementations
// =============================================================================

/// Photo store keyed by tenant id and photo id.
#[derive(Default)]
pub struct MemoryPhotoStore {
    photos: DashMap<(String, String), PhotoRecord>,
}

impl MemoryPhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a tenant's photo.
    pub fn insert(&self, tenant_id: impl Into<String>, record: PhotoRecord) {
        self.photos
            .insert((tenant_id.into(), record.id.clone()), record);
    }

    /// Load a JSON array of photo records for a tenant.
    pub fn load_manifest(&self, tenant_id: &str, json: &str) -> Result<usize, StoreError> {
        let records: Vec<PhotoRecord> =
            serde_json::from_str(json).map_err(|e| StoreError::InvalidValue {
                key: format!("photos:{}", tenant_id),
                message: e.to_string(),
            })?;

        let count = records.len();
        for record in records {
            self.insert(tenant_id, record);
        }
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

#[async_trait]
impl PhotoStore for MemoryPhotoStore {
    async fn find_photos_by_ids(
        &self,
        tenant: Option<&TenantContext>,
        ids: &[String],
    ) -> Result<Vec<PhotoRecord>, StoreError> {
        let Some(tenant) = tenant else {
            return Ok(Vec::new());
        };

        let tenant_id = tenant.tenant_id().to_string();
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.photos
                    .get(&(tenant_id.clone(), id.clone()))
                    .map(|entry| entry.value().clone())
            })
            .collect())
    }
}

/// Site configuration derived from the tenant, with per-tenant overrides.
#[derive(Default)]
pub struct MemorySiteConfig {
    overrides: DashMap<String, Map<String, Value>>,
}

impl MemorySiteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a configuration field for a tenant.
    pub fn set(&self, tenant_id: impl Into<String>, key: impl Into<String>, value: Value) {
        self.overrides
            .entry(tenant_id.into())
            .or_default()
            .insert(key.into(), value);
    }
}

#[async_trait]
impl SiteConfigProvider for MemorySiteConfig {
    async fn site_config(&self, tenant: Option<&TenantContext>) -> Result<Value, StoreError> {
        let mut config = Map::new();

        if let Some(tenant) = tenant {
            config.insert("name".into(), Value::String(tenant.tenant.name.clone()));
            config.insert("slug".into(), Value::String(tenant.tenant.slug.clone()));

            if let Some(overrides) = self.overrides.get(tenant.tenant_id()) {
                for (key, value) in overrides.iter() {
                    config.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(Value::Object(config))
    }
}
