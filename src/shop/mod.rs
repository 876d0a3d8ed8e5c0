//! Container shop engine: entity model, versioned sled persistence,
//! the per-actor pending-command state machine, and the interaction
//! dispatcher that ties them together. The embedding host drives
//! everything through [`dispatch::ShopService`] and the trait seams in
//! [`host`].

pub mod currency;
pub mod dispatch;
pub mod errors;
pub mod host;
pub mod pending;
pub mod storage;
pub mod types;

pub use currency::CurrencyRegistry;
pub use dispatch::{
    ShopService, PERM_CLONE, PERM_CREATE, PERM_CURRENCY, PERM_REMOVE_ANY, PERM_RENAME,
    PERM_SET_ADMIN,
};
pub use errors::ShopError;
pub use host::{
    ActorDirectory, AllowAllRegions, HandInventory, HostHooks, Notifier, Permissions, RegionPolicy,
};
pub use pending::{PendingCommand, PendingEngine, PendingKind, DEFAULT_PENDING_TIMEOUT};
pub use storage::{ShopStore, SCHEMA_VERSION};
pub use types::*;
