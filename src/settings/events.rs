//! Typed setting change notifications.
//!
//! Components subscribe explicitly when they start and unsubscribe when they
//! stop; there is no global emitter.
//!
//! ```ignore
//! let bus = SettingEventBus::new();
//! let id = bus.subscribe(SettingEventKind::Deleted, Arc::new(MyHandler));
//! bus.publish(SettingEventKind::Deleted, &SettingChange::new("tenant-a", "some.key")).await;
//! bus.unsubscribe(id);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

/// The kind of change a notification describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingEventKind {
    /// A setting was created or its value changed
    Updated,
    /// A setting was removed
    Deleted,
}

impl SettingEventKind {
    /// Wire name of the notification.
    pub fn name(&self) -> &'static str {
        match self {
            SettingEventKind::Updated => "setting.updated",
            SettingEventKind::Deleted => "setting.deleted",
        }
    }
}

/// Payload carried by every setting notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingChange {
    /// Tenant owning the setting
    pub tenant_id: String,
    /// Setting key (e.g. `http.cors.allowedOrigins`)
    pub key: String,
}

impl SettingChange {
    pub fn new(tenant_id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            key: key.into(),
        }
    }
}

/// Handler invoked for each notification of the kind it subscribed to.
#[async_trait]
pub trait SettingHandler: Send + Sync {
    async fn handle(&self, change: &SettingChange);
}

/// Opaque handle returned by [`SettingEventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscription {
    kind: SettingEventKind,
    handler: Arc<dyn SettingHandler>,
}

/// In-process notification bus for setting changes.
#[derive(Default)]
pub struct SettingEventBus {
    next_id: AtomicU64,
    subscriptions: DashMap<SubscriptionId, Subscription>,
}

impl SettingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for notifications of `kind`.
    pub fn subscribe(
        &self,
        kind: SettingEventKind,
        handler: Arc<dyn SettingHandler>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.insert(id, Subscription { kind, handler });
        debug!(event = kind.name(), subscription = id.0, "Subscribed");
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    /// Deliver `change` to every handler subscribed to `kind`.
    ///
    /// Handlers run in subscription order and are awaited one after another.
    pub async fn publish(&self, kind: SettingEventKind, change: &SettingChange) {
        // Snapshot first so no shard lock is held across an await point.
        let mut handlers: Vec<(SubscriptionId, Arc<dyn SettingHandler>)> = self
            .subscriptions
            .iter()
            .filter(|entry| entry.value().kind == kind)
            .map(|entry| (*entry.key(), Arc::clone(&entry.value().handler)))
            .collect();
        handlers.sort_by_key(|(id, _)| *id);

        debug!(
            event = kind.name(),
            tenant_id = %change.tenant_id,
            key = %change.key,
            handlers = handlers.len(),
            "Publishing setting change"
        );

        for (_, handler) in handlers {
            handler.handle(change).await;
        }
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}
