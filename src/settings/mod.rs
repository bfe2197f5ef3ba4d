//! Settings persistence and change notifications.
//!
//! Two stores are consumed by the gateway:
//!
//! - [`SystemSettingStore`] holds process-wide flags such as the
//!   first-run initialization marker.
//! - [`TenantSettingStore`] holds per-tenant raw setting strings such as the
//!   allowed CORS origins.
//!
//! Changes to tenant settings are announced on a [`SettingEventBus`] so that
//! caches built on top of them can be invalidated.

mod events;
mod store;

pub use events::{SettingChange, SettingEventBus, SettingEventKind, SettingHandler, SubscriptionId};
pub use store::{MemorySettingStore, SystemSetting, SystemSettingStore, TenantSettingStore};
