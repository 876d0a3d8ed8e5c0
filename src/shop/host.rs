//! Integration points the embedding host provides.
//!
//! The engine never talks to a wire protocol or a rendering layer; the
//! host runtime implements these traits and drives the entry points on
//! [`crate::shop::dispatch::ShopService`].

use std::sync::Arc;

use crate::shop::types::{ActorId, ContainerHandle, CurrencyItem};

/// Permission query against the host's permission system.
pub trait Permissions: Send + Sync {
    fn actor_has_permission(&self, actor: ActorId, key: &str) -> bool;
}

/// Region policy query: may this actor create a shop on this container?
pub trait RegionPolicy: Send + Sync {
    fn allows_shop_creation(&self, actor: ActorId, container: &ContainerHandle) -> bool;
}

/// Default region policy when no region system is present.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllRegions;

impl RegionPolicy for AllowAllRegions {
    fn allows_shop_creation(&self, _actor: ActorId, _container: &ContainerHandle) -> bool {
        true
    }
}

/// Notify-actor side channel. Messages arrive pre-formatted; hosts that
/// localize do so inside their implementation.
pub trait Notifier: Send + Sync {
    fn success(&self, actor: ActorId, message: &str);
    fn info(&self, actor: ActorId, message: &str);
    fn error(&self, actor: ActorId, message: &str);
}

/// Display-name and identity resolution for actors. Consumed by the
/// v2→v3 schema migration (display-name owners become stable ids) and by
/// default shop naming.
pub trait ActorDirectory: Send + Sync {
    fn resolve_actor_id(&self, display_name: &str) -> ActorId;
    fn display_name(&self, actor: ActorId) -> String;
}

/// Access to the item an actor currently holds, for the `currency`
/// registration command.
pub trait HandInventory: Send + Sync {
    fn held_item(&self, actor: ActorId) -> Option<CurrencyItem>;
}

/// Bundle of all host collaborators, passed at service construction.
#[derive(Clone)]
pub struct HostHooks {
    pub permissions: Arc<dyn Permissions>,
    pub regions: Arc<dyn RegionPolicy>,
    pub notifier: Arc<dyn Notifier>,
    pub directory: Arc<dyn ActorDirectory>,
    pub hands: Arc<dyn HandInventory>,
}
