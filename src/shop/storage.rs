//! Sled-backed persistence for the shop aggregate.
//!
//! Logical layout: a `shops` tree keyed by the shop's Location text, a
//! `deals` tree keyed by Location plus a monotonically generated row id
//! (so key order equals insertion order), and a `meta` tree holding the
//! single integer schema-version marker.
//!
//! Deals are a wholesale-replaced sub-resource: every `store` call writes
//! the complete deal list the caller passed, never a delta. The upsert,
//! the delete of the old rows, and the reinsert of the new ones run as
//! one sled transaction so a partial failure leaves the previous state
//! intact.

use std::path::Path;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use sled::transaction::TransactionError;
use sled::Transactional;

use crate::shop::currency::CurrencyRegistry;
use crate::shop::errors::ShopError;
use crate::shop::host::ActorDirectory;
use crate::shop::types::{default_shop_name, ActorId, ContainerHandle, CurrencyItem, Deal, Location, Shop};

const TREE_SHOPS: &str = "shops";
const TREE_DEALS: &str = "deals";
const TREE_META: &str = "meta";

const META_VERSION_KEY: &[u8] = b"schema_version";

/// Highest schema version this build understands. A database carrying a
/// higher version belongs to a newer release and must not be opened.
pub const SCHEMA_VERSION: u32 = 3;

/// Shop row as first laid out (schema v1): owner stored by display name.
#[derive(Serialize, Deserialize)]
struct ShopRowV1 {
    owner: String,
}

/// Schema v2 added the admin flag, defaulting false.
#[derive(Serialize, Deserialize)]
struct ShopRowV2 {
    owner: String,
    is_admin: bool,
}

/// Current shop row (schema v3): owner resolved to a stable actor id,
/// plus the shop name.
#[derive(Serialize, Deserialize)]
struct ShopRow {
    owner: ActorId,
    is_admin: bool,
    name: String,
}

/// One persisted deal. Prices hold the currency codec's canonical text
/// form; a missing price means the deal is one-directional.
#[derive(Serialize, Deserialize)]
struct DealRow {
    item: String,
    buy_price: Option<String>,
    sell_price: Option<String>,
}

fn shop_key(location: &Location) -> Vec<u8> {
    location.to_string().into_bytes()
}

/// Deal keys are `<location>\x1f<zero-padded id>`. The unit separator
/// keeps prefixes of distinct locations from shadowing each other.
fn deal_prefix(location: &Location) -> Vec<u8> {
    format!("{}\u{1f}", location).into_bytes()
}

fn deal_key(location: &Location, id: u64) -> Vec<u8> {
    format!("{}\u{1f}{:020}", location, id).into_bytes()
}

fn version_bytes(version: u32) -> Vec<u8> {
    version.to_be_bytes().to_vec()
}

fn commit_err(err: TransactionError<()>) -> ShopError {
    match err {
        TransactionError::Abort(()) => ShopError::Transaction("transaction aborted".into()),
        TransactionError::Storage(e) => ShopError::Sled(e),
    }
}

/// Durable storage for shops and their deals, with ordered schema
/// migrations applied at open.
#[derive(Debug)]
pub struct ShopStore {
    db: sled::Db,
    shops: sled::Tree,
    deals: sled::Tree,
    meta: sled::Tree,
}

impl ShopStore {
    /// Open (or create) the store rooted at `path` and bring its schema
    /// up to [`SCHEMA_VERSION`]. The directory is consulted by the v2→v3
    /// migration to resolve display-name owners into stable actor ids.
    ///
    /// Fails fatally when the database cannot be opened or when its
    /// stored schema version exceeds what this build knows.
    pub fn open<P: AsRef<Path>>(
        path: P,
        directory: &dyn ActorDirectory,
    ) -> Result<Self, ShopError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let shops = db.open_tree(TREE_SHOPS)?;
        let deals = db.open_tree(TREE_DEALS)?;
        let meta = db.open_tree(TREE_META)?;
        let store = Self {
            db,
            shops,
            deals,
            meta,
        };
        store.run_migrations(directory)?;
        Ok(store)
    }

    fn stored_version(&self) -> Result<u32, ShopError> {
        match self.meta.get(META_VERSION_KEY)? {
            None => Ok(0),
            Some(bytes) => {
                let raw: [u8; 4] = bytes
                    .as_ref()
                    .try_into()
                    .map_err(|_| ShopError::Transaction("corrupt schema version marker".into()))?;
                Ok(u32::from_be_bytes(raw))
            }
        }
    }

    /// Apply every pending upgrade step in order. Each step commits its
    /// own version bump in the same transaction as its rewrites, so a
    /// crash mid-chain resumes at the last completed step instead of
    /// replaying from zero.
    fn run_migrations(&self, directory: &dyn ActorDirectory) -> Result<(), ShopError> {
        let mut version = self.stored_version()?;
        if version > SCHEMA_VERSION {
            return Err(ShopError::SchemaTooNew {
                found: version,
                supported: SCHEMA_VERSION,
            });
        }
        while version < SCHEMA_VERSION {
            match version {
                0 => self.migrate_v0_to_v1()?,
                1 => self.migrate_v1_to_v2()?,
                2 => self.migrate_v2_to_v3(directory)?,
                _ => break,
            }
            version += 1;
            info!("shop store migrated to schema v{}", version);
        }
        self.db.flush()?;
        Ok(())
    }

    /// v0→v1: establish the shops/deals layout. Sled creates trees on
    /// open, so the step only commits the version marker.
    fn migrate_v0_to_v1(&self) -> Result<(), ShopError> {
        self.meta
            .transaction(|meta| {
                meta.insert(META_VERSION_KEY, version_bytes(1))?;
                Ok(())
            })
            .map_err(commit_err)
    }

    /// v1→v2: add the admin flag to every shop row, defaulting false.
    fn migrate_v1_to_v2(&self) -> Result<(), ShopError> {
        let mut rewrites = Vec::new();
        for entry in self.shops.iter() {
            let (key, value) = entry?;
            let old: ShopRowV1 = bincode::deserialize(&value)?;
            let new = ShopRowV2 {
                owner: old.owner,
                is_admin: false,
            };
            rewrites.push((key, bincode::serialize(&new)?));
        }
        (&self.shops, &self.meta)
            .transaction(|(shops, meta)| {
                for (key, value) in &rewrites {
                    shops.insert(key.clone(), value.clone())?;
                }
                meta.insert(META_VERSION_KEY, version_bytes(2))?;
                Ok(())
            })
            .map_err(commit_err)
    }

    /// v2→v3: add the name column, backfilled from the owner's display
    /// name, and rewrite the owner column from display name to a stable
    /// actor id in the same pass.
    fn migrate_v2_to_v3(&self, directory: &dyn ActorDirectory) -> Result<(), ShopError> {
        let mut rewrites = Vec::new();
        for entry in self.shops.iter() {
            let (key, value) = entry?;
            let old: ShopRowV2 = bincode::deserialize(&value)?;
            let new = ShopRow {
                owner: directory.resolve_actor_id(&old.owner),
                is_admin: old.is_admin,
                name: default_shop_name(&old.owner),
            };
            rewrites.push((key, bincode::serialize(&new)?));
        }
        (&self.shops, &self.meta)
            .transaction(|(shops, meta)| {
                for (key, value) in &rewrites {
                    shops.insert(key.clone(), value.clone())?;
                }
                meta.insert(META_VERSION_KEY, version_bytes(3))?;
                Ok(())
            })
            .map_err(commit_err)
    }

    /// Persist a shop and its complete deal list. The caller passes the
    /// full desired list; previous deal rows are replaced wholesale.
    ///
    /// Failures are logged with full detail and surfaced as `false`;
    /// they never leave a half-updated aggregate behind.
    pub fn store(&self, shop: &Shop) -> bool {
        match self.try_store(shop) {
            Ok(()) => {
                debug!(
                    "persisted shop '{}' at {} ({} deals)",
                    shop.name,
                    shop.location,
                    shop.deals.len()
                );
                true
            }
            Err(err) => {
                error!("failed to persist shop at {}: {}", shop.location, err);
                false
            }
        }
    }

    fn try_store(&self, shop: &Shop) -> Result<(), ShopError> {
        let key = shop_key(&shop.location);
        let row = bincode::serialize(&ShopRow {
            owner: shop.owner,
            is_admin: shop.is_admin,
            name: shop.name.clone(),
        })?;

        let old_keys: Vec<sled::IVec> = self
            .deals
            .scan_prefix(deal_prefix(&shop.location))
            .keys()
            .collect::<Result<_, _>>()?;

        let mut new_rows = Vec::with_capacity(shop.deals.len());
        for deal in &shop.deals {
            let deal_row = DealRow {
                item: deal.item.to_text()?,
                buy_price: deal.buy_price.as_ref().map(|p| p.to_text()).transpose()?,
                sell_price: deal.sell_price.as_ref().map(|p| p.to_text()).transpose()?,
            };
            // Ids are monotonic, so key order preserves deal order.
            let id = self.db.generate_id()?;
            new_rows.push((deal_key(&shop.location, id), bincode::serialize(&deal_row)?));
        }

        (&self.shops, &self.deals)
            .transaction(|(shops, deals)| {
                shops.insert(key.clone(), row.clone())?;
                for old in &old_keys {
                    deals.remove(old.clone())?;
                }
                for (new_key, new_row) in &new_rows {
                    deals.insert(new_key.clone(), new_row.clone())?;
                }
                Ok(())
            })
            .map_err(commit_err)?;
        self.db.flush()?;
        Ok(())
    }

    /// Delete a shop and all its deals. Removing a shop that does not
    /// exist is a no-op success.
    pub fn remove(&self, location: &Location) -> bool {
        match self.try_remove(location) {
            Ok(()) => {
                debug!("removed persisted shop at {}", location);
                true
            }
            Err(err) => {
                error!("failed to remove shop at {}: {}", location, err);
                false
            }
        }
    }

    fn try_remove(&self, location: &Location) -> Result<(), ShopError> {
        let key = shop_key(location);
        let old_keys: Vec<sled::IVec> = self
            .deals
            .scan_prefix(deal_prefix(location))
            .keys()
            .collect::<Result<_, _>>()?;

        (&self.shops, &self.deals)
            .transaction(|(shops, deals)| {
                for old in &old_keys {
                    deals.remove(old.clone())?;
                }
                shops.remove(key.clone())?;
                Ok(())
            })
            .map_err(commit_err)?;
        self.db.flush()?;
        Ok(())
    }

    /// Load the shop persisted at `location`, binding it to the supplied
    /// live container handle. `None` means either "no shop here" or a
    /// storage fault; faults are logged, absence is not.
    pub fn load(
        &self,
        location: &Location,
        container: ContainerHandle,
        currencies: &CurrencyRegistry,
    ) -> Option<Shop> {
        match self.try_load(location, container, currencies) {
            Ok(found) => found,
            Err(err) => {
                error!("failed to load shop at {}: {}", location, err);
                None
            }
        }
    }

    fn try_load(
        &self,
        location: &Location,
        container: ContainerHandle,
        currencies: &CurrencyRegistry,
    ) -> Result<Option<Shop>, ShopError> {
        let Some(bytes) = self.shops.get(shop_key(location))? else {
            return Ok(None);
        };
        let row: ShopRow = bincode::deserialize(&bytes)?;

        let mut deals = Vec::new();
        for entry in self.deals.scan_prefix(deal_prefix(location)) {
            let (_, value) = entry?;
            let deal_row: DealRow = bincode::deserialize(&value)?;
            let item = match CurrencyItem::from_text(&deal_row.item) {
                Ok(item) => item,
                Err(err) => {
                    warn!("skipping unreadable deal item for shop at {}: {}", location, err);
                    continue;
                }
            };
            deals.push(Deal {
                item,
                buy_price: degrade_price(deal_row.buy_price.as_deref(), currencies, location, "buy"),
                sell_price: degrade_price(deal_row.sell_price.as_deref(), currencies, location, "sell"),
            });
        }

        Ok(Some(Shop {
            location: location.clone(),
            owner: row.owner,
            name: row.name,
            is_admin: row.is_admin,
            deals,
            container,
        }))
    }
}

/// Decode a persisted price, downgrading anything that no longer parses
/// or validates as currency to "no price". A shop must always load even
/// when some of its deals have degraded.
fn degrade_price(
    text: Option<&str>,
    currencies: &CurrencyRegistry,
    location: &Location,
    direction: &str,
) -> Option<CurrencyItem> {
    let text = text?;
    match CurrencyItem::from_text(text) {
        Ok(item) if currencies.is_recognized(&item) => Some(item),
        Ok(item) => {
            warn!(
                "dropping unrecognized {} price {} for shop at {}",
                direction, item, location
            );
            None
        }
        Err(err) => {
            warn!(
                "dropping unreadable {} price for shop at {}: {}",
                direction, location, err
            );
            None
        }
    }
}
