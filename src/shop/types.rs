//! Core data types for the shop engine: actors, locations, container
//! handles, currency items, deals, and the shop aggregate itself.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for the entity issuing commands and performing
/// world interactions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ActorId(pub Uuid);

impl ActorId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ActorId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Canonical identifier for a container in the world: world name plus
/// integer block coordinates. Totally ordered and string-serializable so
/// it can double as a storage key.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Location {
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Location {
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Collapse a linked container pair (e.g. a double chest) to a single
    /// canonical Location. Both halves must normalize identically, so the
    /// lesser of the two keys is the canonical one.
    pub fn normalized_pair(a: Location, b: Location) -> Location {
        if a <= b {
            a
        } else {
            b
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{},{},{}", self.world, self.x, self.y, self.z)
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // World names may contain ':', so split on the last one.
        let (world, coords) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("location missing coordinates: '{}'", s))?;
        let parts: Vec<&str> = coords.split(',').collect();
        if parts.len() != 3 {
            return Err(format!("location needs three coordinates: '{}'", s));
        }
        let parse = |p: &str| {
            p.trim()
                .parse::<i32>()
                .map_err(|e| format!("bad coordinate '{}': {}", p, e))
        };
        Ok(Location {
            world: world.to_string(),
            x: parse(parts[0])?,
            y: parse(parts[1])?,
            z: parse(parts[2])?,
        })
    }
}

/// Live handle to a world container. Carries the raw block location(s);
/// [`ContainerHandle::location`] yields the normalized key a shop is
/// indexed and persisted under. Never persisted itself — the store
/// re-binds a fresh handle on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    primary: Location,
    secondary: Option<Location>,
}

impl ContainerHandle {
    /// Handle for a single-block container.
    pub fn single(location: Location) -> Self {
        Self {
            primary: location,
            secondary: None,
        }
    }

    /// Handle for a linked pair; either ordering of the halves resolves
    /// to the same normalized location.
    pub fn linked(a: Location, b: Location) -> Self {
        Self {
            primary: a,
            secondary: Some(b),
        }
    }

    /// The canonical Location for this container.
    pub fn location(&self) -> Location {
        match &self.secondary {
            Some(second) => {
                Location::normalized_pair(self.primary.clone(), second.clone())
            }
            None => self.primary.clone(),
        }
    }
}

/// An immutable item stack used as tender or traded good: item identity,
/// stack size, and identity-relevant metadata.
///
/// The canonical text form produced by [`CurrencyItem::to_text`] is the
/// persisted representation; equality on the struct coincides with
/// equality of that form because the codec is injective (`meta` is a
/// `BTreeMap`, so serialization order is deterministic).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyItem {
    pub kind: String,
    pub count: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

impl CurrencyItem {
    pub fn new(kind: impl Into<String>, count: u32) -> Self {
        Self {
            kind: kind.into(),
            count,
            meta: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Canonical string form used for persistence and equality.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse the canonical string form back into an item.
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl fmt::Display for CurrencyItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x{}", self.kind, self.count)
    }
}

/// One trade offered by a shop. A `None` price means the deal is not
/// available in that direction; a deal with both prices `None` is
/// tolerated and simply inert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub item: CurrencyItem,
    pub buy_price: Option<CurrencyItem>,
    pub sell_price: Option<CurrencyItem>,
}

impl Deal {
    pub fn new(
        item: CurrencyItem,
        buy_price: Option<CurrencyItem>,
        sell_price: Option<CurrencyItem>,
    ) -> Self {
        Self {
            item,
            buy_price,
            sell_price,
        }
    }
}

/// A shop: a container turned into a persistent trading post. Deal order
/// is significant and preserved across persistence round-trips. The
/// container handle is a live world reference and is never persisted; the
/// store re-acquires it from the location on load.
#[derive(Debug, Clone, PartialEq)]
pub struct Shop {
    pub location: Location,
    pub owner: ActorId,
    pub name: String,
    pub is_admin: bool,
    pub deals: Vec<Deal>,
    pub container: ContainerHandle,
}

impl Shop {
    /// Create a fresh shop bound to `container`, owned by `owner`.
    pub fn new(container: ContainerHandle, owner: ActorId, name: impl Into<String>) -> Self {
        Self {
            location: container.location(),
            owner,
            name: name.into(),
            is_admin: false,
            deals: Vec::new(),
            container,
        }
    }

    /// Copy this shop onto another container: same owner, name, and admin
    /// flag, deep copy of the deal list, fresh location. The caller is
    /// responsible for persisting and indexing the result.
    pub fn clone_to(&self, container: ContainerHandle) -> Shop {
        Shop {
            location: container.location(),
            owner: self.owner,
            name: self.name.clone(),
            is_admin: self.is_admin,
            deals: self.deals.clone(),
            container,
        }
    }
}

/// Default shop name shown until the owner renames it.
pub fn default_shop_name(owner_display_name: &str) -> String {
    format!("{}'s shop", owner_display_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display_round_trip() {
        let loc = Location::new("overworld", 12, -3, 400);
        let text = loc.to_string();
        assert_eq!(text, "overworld:12,-3,400");
        let parsed: Location = text.parse().expect("parse");
        assert_eq!(parsed, loc);
    }

    #[test]
    fn location_parse_world_with_colon() {
        let parsed: Location = "nether:east:1,2,3".parse().expect("parse");
        assert_eq!(parsed.world, "nether:east");
        assert_eq!((parsed.x, parsed.y, parsed.z), (1, 2, 3));
    }

    #[test]
    fn location_parse_rejects_garbage() {
        assert!("overworld".parse::<Location>().is_err());
        assert!("overworld:1,2".parse::<Location>().is_err());
        assert!("overworld:1,2,zebra".parse::<Location>().is_err());
    }

    #[test]
    fn linked_pair_normalizes_both_ways() {
        let a = Location::new("overworld", 10, 64, 5);
        let b = Location::new("overworld", 11, 64, 5);
        let left = ContainerHandle::linked(a.clone(), b.clone());
        let right = ContainerHandle::linked(b, a.clone());
        assert_eq!(left.location(), right.location());
        assert_eq!(left.location(), a);
    }

    #[test]
    fn currency_item_text_round_trip() {
        let item = CurrencyItem::new("emerald", 3).with_meta("enchant", "haggle_1");
        let text = item.to_text().expect("encode");
        let back = CurrencyItem::from_text(&text).expect("decode");
        assert_eq!(back, item);
    }

    #[test]
    fn currency_item_equality_tracks_canonical_form() {
        let a = CurrencyItem::new("emerald", 3);
        let b = CurrencyItem::new("emerald", 3);
        let c = CurrencyItem::new("emerald", 4);
        assert_eq!(a.to_text().unwrap(), b.to_text().unwrap());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn clone_to_deep_copies_deals() {
        let owner = ActorId::random();
        let source_container =
            ContainerHandle::single(Location::new("overworld", 0, 64, 0));
        let mut shop = Shop::new(source_container, owner, "Trinkets");
        shop.is_admin = true;
        shop.deals.push(Deal::new(
            CurrencyItem::new("arrow", 16),
            Some(CurrencyItem::new("emerald", 1)),
            None,
        ));

        let target = ContainerHandle::single(Location::new("overworld", 5, 64, 0));
        let copy = shop.clone_to(target.clone());

        assert_eq!(copy.location, target.location());
        assert_eq!(copy.owner, owner);
        assert_eq!(copy.name, "Trinkets");
        assert!(copy.is_admin);
        assert_eq!(copy.deals, shop.deals);

        // Mutating the copy must not touch the source.
        let mut copy = copy;
        copy.deals[0].buy_price = None;
        assert!(shop.deals[0].buy_price.is_some());
    }
}
