//! Command entry points and the world-interaction dispatcher.
//!
//! Flows are conversational: a command arms the pending engine and the
//! actor's next container interaction completes it. Handlers re-check
//! their permission at interaction time, because permissions can change
//! while a command sits pending.

use std::collections::HashMap;
use std::time::Duration;

use log::info;

use crate::shop::currency::CurrencyRegistry;
use crate::shop::host::HostHooks;
use crate::shop::pending::{PendingEngine, PendingKind};
use crate::shop::storage::ShopStore;
use crate::shop::types::{default_shop_name, ActorId, ContainerHandle, Deal, Location, Shop};

/// Gates shop creation, and removal of one's own shops.
pub const PERM_CREATE: &str = "shops.create";
/// Allows removing shops owned by someone else.
pub const PERM_REMOVE_ANY: &str = "shops.remove";
pub const PERM_SET_ADMIN: &str = "shops.setadmin";
pub const PERM_RENAME: &str = "shops.rename";
pub const PERM_CLONE: &str = "shops.clone";
pub const PERM_CURRENCY: &str = "shops.currency";

/// The shop engine's host-facing surface: routes issued commands, holds
/// the in-memory Location → Shop index, and dispatches world
/// interactions against pending commands.
pub struct ShopService {
    store: ShopStore,
    shops: HashMap<Location, Shop>,
    pending: PendingEngine,
    currencies: CurrencyRegistry,
    hooks: HostHooks,
}

impl ShopService {
    pub fn new(
        store: ShopStore,
        currencies: CurrencyRegistry,
        pending_timeout: Duration,
        hooks: HostHooks,
    ) -> Self {
        Self {
            store,
            shops: HashMap::new(),
            pending: PendingEngine::new(pending_timeout),
            currencies,
            hooks,
        }
    }

    /// Is this container recognized as hosting a shop? Pure in-memory
    /// index lookup; reconstruction from the store happens at the
    /// dispatch entry point, not here.
    pub fn is_shop(&self, container: &ContainerHandle) -> bool {
        self.shops.contains_key(&container.location())
    }

    /// The shop hosted by this container, reconstructing it from the
    /// store on first touch.
    pub fn shop_at(&mut self, container: &ContainerHandle) -> Option<&Shop> {
        self.ensure_loaded(container);
        self.shops.get(&container.location())
    }

    /// Does this actor have a command waiting for an interaction? Hosts
    /// use this to decide whether to intercept an interaction at all.
    pub fn has_pending(&self, actor: ActorId) -> bool {
        self.pending.has_pending(actor)
    }

    /// Replace a shop's deal list wholesale and persist it. The host's
    /// inventory editor always saves the complete list, so there is no
    /// per-deal update. Returns false when the container hosts no shop.
    pub fn set_deals(
        &mut self,
        actor: ActorId,
        container: &ContainerHandle,
        deals: Vec<Deal>,
    ) -> bool {
        self.ensure_loaded(container);
        let location = container.location();
        match self.shops.get_mut(&location) {
            Some(shop) => shop.deals = deals,
            None => return false,
        }
        if let Some(shop) = self.shops.get(&location) {
            self.persist(actor, shop);
        }
        true
    }

    /// Route an issued command. Returns whether the verb was handled.
    pub fn on_command_issued(&mut self, actor: ActorId, verb: &str, args: &[&str]) -> bool {
        match verb {
            "create" => self.cmd_create(actor, args),
            "remove" => self.cmd_remove(actor, args),
            "setadmin" => self.cmd_set_admin(actor, args),
            "rename" => self.cmd_rename(actor, args),
            "clone" => self.cmd_clone(actor, args),
            "currency" => self.cmd_currency(actor, args),
            _ => return false,
        }
        true
    }

    /// Route a world interaction. Returns whether the event was consumed
    /// (default world behavior suppressed).
    ///
    /// No pending command: the interaction proceeds normally. Pending
    /// command but the target is not a container: the event passes
    /// through and the pending command — timer included — stays
    /// untouched, so the actor gets another chance.
    pub fn on_world_interaction(
        &mut self,
        actor: ActorId,
        target: Option<&ContainerHandle>,
    ) -> bool {
        let Some(command) = self.pending.resolve(actor) else {
            return false;
        };
        let Some(container) = target else {
            return false;
        };
        let container = container.clone();
        self.ensure_loaded(&container);
        match command.kind {
            PendingKind::Create => self.finish_create(actor, container),
            PendingKind::Remove => self.finish_remove(actor, container),
            PendingKind::SetAdmin(flag) => self.finish_set_admin(actor, container, flag),
            PendingKind::Rename(name) => self.finish_rename(actor, container, name),
            PendingKind::CloneAwaitSource => self.finish_clone_source(actor, container),
            PendingKind::CloneAwaitTarget(source) => {
                self.finish_clone_target(actor, source, container)
            }
        }
        true
    }

    // ----- command issue (precheck + arm) -----

    fn cmd_create(&mut self, actor: ActorId, args: &[&str]) {
        if !self.allowed(actor, PERM_CREATE) {
            self.hooks
                .notifier
                .error(actor, "You don't have permission to create shops.");
            return;
        }
        if !args.is_empty() {
            self.hooks.notifier.error(actor, "Usage: shop create");
            return;
        }
        self.hooks
            .notifier
            .info(actor, "Click a container to turn it into a shop.");
        self.pending.set_pending(actor, PendingKind::Create);
    }

    fn cmd_remove(&mut self, actor: ActorId, args: &[&str]) {
        // Removal rides on the create permission; PERM_REMOVE_ANY only
        // widens it to other actors' shops.
        if !self.allowed(actor, PERM_CREATE) {
            self.hooks
                .notifier
                .error(actor, "You don't have permission to remove shops.");
            return;
        }
        if !args.is_empty() {
            self.hooks.notifier.error(actor, "Usage: shop remove");
            return;
        }
        self.hooks
            .notifier
            .info(actor, "Click the shop you want to remove.");
        self.pending.set_pending(actor, PendingKind::Remove);
    }

    fn cmd_set_admin(&mut self, actor: ActorId, args: &[&str]) {
        if !self.allowed(actor, PERM_SET_ADMIN) {
            self.hooks
                .notifier
                .error(actor, "You don't have permission to manage admin shops.");
            return;
        }
        let flag = match args {
            [] | ["true"] => true,
            ["false"] => false,
            _ => {
                self.hooks
                    .notifier
                    .error(actor, "Usage: shop setadmin [true|false]");
                return;
            }
        };
        let prompt = if flag {
            "Click the shop to mark as an admin shop."
        } else {
            "Click the shop to mark as a normal shop."
        };
        self.hooks.notifier.info(actor, prompt);
        self.pending.set_pending(actor, PendingKind::SetAdmin(flag));
    }

    fn cmd_rename(&mut self, actor: ActorId, args: &[&str]) {
        if !self.allowed(actor, PERM_RENAME) {
            self.hooks
                .notifier
                .error(actor, "You don't have permission to rename shops.");
            return;
        }
        if args.is_empty() {
            self.hooks
                .notifier
                .error(actor, "Usage: shop rename <new name>");
            return;
        }
        let name = args.join(" ");
        self.hooks.notifier.info(actor, "Click the shop to rename.");
        self.pending.set_pending(actor, PendingKind::Rename(name));
    }

    fn cmd_clone(&mut self, actor: ActorId, args: &[&str]) {
        if !self.allowed(actor, PERM_CLONE) {
            self.hooks
                .notifier
                .error(actor, "You don't have permission to clone shops.");
            return;
        }
        if !args.is_empty() {
            self.hooks.notifier.error(actor, "Usage: shop clone");
            return;
        }
        self.hooks
            .notifier
            .info(actor, "Click the shop you want to copy.");
        self.pending.set_pending(actor, PendingKind::CloneAwaitSource);
    }

    /// Register the held item as a named custom currency. Acts
    /// immediately; no follow-up interaction.
    fn cmd_currency(&mut self, actor: ActorId, args: &[&str]) {
        if !self.allowed(actor, PERM_CURRENCY) {
            self.hooks
                .notifier
                .error(actor, "You don't have permission to register currencies.");
            return;
        }
        if args.is_empty() {
            self.hooks
                .notifier
                .error(actor, "Usage: shop currency <name>");
            return;
        }
        let name = args.join(" ");
        if self.currencies.is_custom(&name) {
            self.hooks
                .notifier
                .error(actor, "A currency with that name already exists.");
            return;
        }
        let held = match self.hooks.hands.held_item(actor) {
            Some(item) if item.count > 0 => item,
            _ => {
                self.hooks
                    .notifier
                    .error(actor, "Hold the item you want to register.");
                return;
            }
        };
        match self.currencies.add_custom(&name, held) {
            Ok(()) => {
                info!("{} registered currency '{}'", actor, name);
                self.hooks
                    .notifier
                    .success(actor, &format!("Registered currency '{}'.", name));
            }
            Err(err) => self.hooks.notifier.error(actor, &err.to_string()),
        }
    }

    // ----- interaction completion -----

    fn finish_create(&mut self, actor: ActorId, container: ContainerHandle) {
        if !self.allowed(actor, PERM_CREATE) {
            self.hooks
                .notifier
                .error(actor, "You don't have permission to create shops.");
            self.pending.clear_pending(actor);
            return;
        }
        if self.is_shop(&container) {
            self.hooks
                .notifier
                .error(actor, "That container is already a shop.");
        } else if !self.hooks.regions.allows_shop_creation(actor, &container) {
            self.hooks
                .notifier
                .error(actor, "Shops are not allowed in this region.");
        } else {
            let display = self.hooks.directory.display_name(actor);
            let shop = Shop::new(container, actor, default_shop_name(&display));
            self.persist(actor, &shop);
            info!("{} created shop at {}", actor, shop.location);
            self.hooks
                .notifier
                .success(actor, "This container is now a shop.");
            self.hooks
                .notifier
                .info(actor, "Open it to stock items and set up deals.");
            self.shops.insert(shop.location.clone(), shop);
        }
        self.pending.clear_pending(actor);
    }

    fn finish_remove(&mut self, actor: ActorId, container: ContainerHandle) {
        if !self.allowed(actor, PERM_CREATE) {
            self.hooks
                .notifier
                .error(actor, "You don't have permission to remove shops.");
            self.pending.clear_pending(actor);
            return;
        }
        let location = container.location();
        let may_remove = self
            .shops
            .get(&location)
            .map(|shop| shop.owner == actor || self.allowed(actor, PERM_REMOVE_ANY));
        match may_remove {
            None => {
                self.hooks
                    .notifier
                    .error(actor, "That container is not a shop.");
            }
            Some(false) => {
                self.hooks
                    .notifier
                    .error(actor, "Only the owner can remove this shop.");
            }
            Some(true) => {
                if !self.store.remove(&location) {
                    self.hooks.notifier.error(
                        actor,
                        "The shop could not be removed from storage; it may come back after a restart.",
                    );
                }
                self.shops.remove(&location);
                info!("{} removed shop at {}", actor, location);
                self.hooks.notifier.success(actor, "Shop removed.");
            }
        }
        self.pending.clear_pending(actor);
    }

    fn finish_set_admin(&mut self, actor: ActorId, container: ContainerHandle, flag: bool) {
        if !self.allowed(actor, PERM_SET_ADMIN) {
            self.hooks
                .notifier
                .error(actor, "You don't have permission to manage admin shops.");
            self.pending.clear_pending(actor);
            return;
        }
        let location = container.location();
        if let Some(shop) = self.shops.get_mut(&location) {
            shop.is_admin = flag;
        } else {
            self.hooks
                .notifier
                .error(actor, "That container is not a shop.");
            self.pending.clear_pending(actor);
            return;
        }
        if let Some(shop) = self.shops.get(&location) {
            self.persist(actor, shop);
        }
        let confirmation = if flag {
            "This shop is now an admin shop."
        } else {
            "This shop is now a normal shop."
        };
        self.hooks.notifier.success(actor, confirmation);
        self.pending.clear_pending(actor);
    }

    fn finish_rename(&mut self, actor: ActorId, container: ContainerHandle, name: String) {
        if !self.allowed(actor, PERM_RENAME) {
            self.hooks
                .notifier
                .error(actor, "You don't have permission to rename shops.");
            self.pending.clear_pending(actor);
            return;
        }
        let location = container.location();
        match self.shops.get(&location).map(|shop| shop.owner) {
            None => {
                self.hooks
                    .notifier
                    .error(actor, "That container is not a shop.");
            }
            Some(owner) if owner != actor => {
                self.hooks
                    .notifier
                    .error(actor, "Only the owner can rename this shop.");
            }
            Some(_) => {
                if let Some(shop) = self.shops.get_mut(&location) {
                    shop.name = name.clone();
                }
                if let Some(shop) = self.shops.get(&location) {
                    self.persist(actor, shop);
                }
                self.hooks
                    .notifier
                    .success(actor, &format!("Shop renamed to '{}'.", name));
            }
        }
        self.pending.clear_pending(actor);
    }

    fn finish_clone_source(&mut self, actor: ActorId, container: ContainerHandle) {
        // Permission may have been revoked while the command was pending.
        if !self.allowed(actor, PERM_CLONE) {
            self.hooks
                .notifier
                .error(actor, "You don't have permission to clone shops.");
            self.pending.clear_pending(actor);
            return;
        }
        if !self.is_shop(&container) {
            self.hooks
                .notifier
                .error(actor, "That container is not a shop.");
            self.hooks
                .notifier
                .info(actor, "Click the shop you want to copy.");
            self.pending.set_pending(actor, PendingKind::CloneAwaitSource);
            return;
        }
        self.hooks
            .notifier
            .info(actor, "Now click an empty container to receive the copy.");
        self.pending
            .set_pending(actor, PendingKind::CloneAwaitTarget(container));
    }

    fn finish_clone_target(
        &mut self,
        actor: ActorId,
        source: ContainerHandle,
        target: ContainerHandle,
    ) {
        if !self.allowed(actor, PERM_CLONE) {
            self.hooks
                .notifier
                .error(actor, "You don't have permission to clone shops.");
            self.pending.clear_pending(actor);
            return;
        }
        if self.is_shop(&target) {
            self.hooks
                .notifier
                .error(actor, "That container is already a shop.");
            // Re-run the source stage with the original source: if it
            // still hosts a shop this re-arms the target prompt, and if
            // it vanished the actor is asked for a fresh source.
            self.finish_clone_source(actor, source);
            return;
        }
        let source_location = source.location();
        let Some(source_shop) = self.shops.get(&source_location) else {
            self.hooks
                .notifier
                .error(actor, "The shop you selected is gone.");
            self.pending.clear_pending(actor);
            return;
        };
        let copy = source_shop.clone_to(target);
        self.persist(actor, &copy);
        info!(
            "{} cloned shop at {} to {}",
            actor, source_location, copy.location
        );
        self.hooks.notifier.success(actor, "Shop copied.");
        self.hooks
            .notifier
            .info(actor, "Open it to adjust the copied deals.");
        self.shops.insert(copy.location.clone(), copy);
        self.pending.clear_pending(actor);
    }

    // ----- internals -----

    fn allowed(&self, actor: ActorId, key: &str) -> bool {
        self.hooks.permissions.actor_has_permission(actor, key)
    }

    /// Reconstruct the shop persisted under this container's location
    /// into the index, if it is not already there.
    fn ensure_loaded(&mut self, container: &ContainerHandle) {
        let location = container.location();
        if self.shops.contains_key(&location) {
            return;
        }
        if let Some(shop) = self
            .store
            .load(&location, container.clone(), &self.currencies)
        {
            info!("reconstructed shop '{}' at {}", shop.name, location);
            self.shops.insert(location, shop);
        }
    }

    /// Write-through after an in-memory mutation. The in-memory change
    /// stands even when the write fails; the actor is warned that it may
    /// not survive a restart and the fault is already error-logged by
    /// the store.
    fn persist(&self, actor: ActorId, shop: &Shop) {
        if !self.store.store(shop) {
            self.hooks.notifier.error(
                actor,
                "The change was applied but could not be saved; it may be lost after a restart.",
            );
        }
    }
}
