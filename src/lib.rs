//! # Tradepost — container shop engine
//!
//! Tradepost lets actors turn world containers into persistent shops
//! offering item-for-item trades, administered through short
//! conversational command flows ("issue a command, then click a
//! container"). It is an embeddable core: the host game runtime delivers
//! command and interaction events synchronously and implements the
//! narrow collaborator traits in [`shop::host`]; tradepost owns the
//! pending-command state machine and the versioned persistent store.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tradepost::config::Config;
//! use tradepost::shop::{
//!     AllowAllRegions, CurrencyRegistry, HostHooks, ShopService, ShopStore,
//! };
//!
//! # use tradepost::shop::{ActorDirectory, ActorId, HandInventory, Notifier, Permissions};
//! # struct Host;
//! # impl Permissions for Host {
//! #     fn actor_has_permission(&self, _: ActorId, _: &str) -> bool { true }
//! # }
//! # impl Notifier for Host {
//! #     fn success(&self, _: ActorId, _: &str) {}
//! #     fn info(&self, _: ActorId, _: &str) {}
//! #     fn error(&self, _: ActorId, _: &str) {}
//! # }
//! # impl ActorDirectory for Host {
//! #     fn resolve_actor_id(&self, _: &str) -> ActorId { ActorId::random() }
//! #     fn display_name(&self, actor: ActorId) -> String { actor.to_string() }
//! # }
//! # impl HandInventory for Host {
//! #     fn held_item(&self, _: ActorId) -> Option<tradepost::shop::CurrencyItem> { None }
//! # }
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("tradepost.toml").await?;
//!     let host = Arc::new(Host);
//!     let hooks = HostHooks {
//!         permissions: host.clone(),
//!         regions: Arc::new(AllowAllRegions),
//!         notifier: host.clone(),
//!         directory: host.clone(),
//!         hands: host,
//!     };
//!     let store = ShopStore::open(&config.data_dir, hooks.directory.as_ref())?;
//!     let currencies =
//!         CurrencyRegistry::with_recognized_kinds(config.recognized_currency_kinds.clone());
//!     let mut service =
//!         ShopService::new(store, currencies, config.pending_timeout(), hooks);
//!
//!     // The host runtime forwards events:
//!     // service.on_command_issued(actor, "create", &[]);
//!     // service.on_world_interaction(actor, Some(&container));
//!     Ok(())
//! }
//! ```
//!
//! ## Module organization
//!
//! - [`shop`] — entity model, persistence, pending-command engine, and
//!   the interaction dispatcher
//! - [`config`] — TOML configuration with validation and defaults

pub mod config;
pub mod shop;
