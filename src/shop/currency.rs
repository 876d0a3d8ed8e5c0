//! Currency recognition and the custom-currency registry.
//!
//! Prices are ordinary [`CurrencyItem`] stacks; the registry decides which
//! stacks count as valid tender. Persisted prices that stop validating
//! (e.g. a custom currency was deleted) degrade to "no price" on load
//! rather than failing the shop.

use std::collections::{BTreeMap, BTreeSet};

use crate::shop::errors::ShopError;
use crate::shop::types::CurrencyItem;

/// Registry of recognized currency kinds plus named custom currencies.
///
/// An empty recognized-kind set means every well-formed item is accepted;
/// hosts that want a closed economy configure an explicit kind list.
#[derive(Debug, Default, Clone)]
pub struct CurrencyRegistry {
    recognized_kinds: BTreeSet<String>,
    custom: BTreeMap<String, CurrencyItem>,
}

impl CurrencyRegistry {
    /// Registry that accepts any well-formed item as currency.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry restricted to the given item kinds.
    pub fn with_recognized_kinds<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            recognized_kinds: kinds.into_iter().map(Into::into).collect(),
            custom: BTreeMap::new(),
        }
    }

    /// Is this item acceptable as tender? Degenerate stacks (empty kind,
    /// zero count) never are; otherwise the kind must be recognized when
    /// a recognized set is configured.
    pub fn is_recognized(&self, item: &CurrencyItem) -> bool {
        if item.kind.is_empty() || item.count == 0 {
            return false;
        }
        self.recognized_kinds.is_empty() || self.recognized_kinds.contains(&item.kind)
    }

    /// Register a named custom currency from an item stack.
    pub fn add_custom(
        &mut self,
        name: impl Into<String>,
        item: CurrencyItem,
    ) -> Result<(), ShopError> {
        let name = name.into();
        if self.custom.contains_key(&name) {
            return Err(ShopError::CurrencyExists(name));
        }
        // A named currency is recognized from now on, even under a
        // restricted kind set.
        self.recognized_kinds.insert(item.kind.clone());
        self.custom.insert(name, item);
        Ok(())
    }

    pub fn is_custom(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    pub fn custom(&self, name: &str) -> Option<&CurrencyItem> {
        self.custom.get(name)
    }

    /// Names of all registered custom currencies, sorted.
    pub fn custom_names(&self) -> impl Iterator<Item = &str> {
        self.custom.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissive_registry_accepts_well_formed_items() {
        let registry = CurrencyRegistry::new();
        assert!(registry.is_recognized(&CurrencyItem::new("emerald", 1)));
        assert!(!registry.is_recognized(&CurrencyItem::new("emerald", 0)));
        assert!(!registry.is_recognized(&CurrencyItem::new("", 5)));
    }

    #[test]
    fn restricted_registry_rejects_unknown_kinds() {
        let registry = CurrencyRegistry::with_recognized_kinds(["emerald", "gold_ingot"]);
        assert!(registry.is_recognized(&CurrencyItem::new("emerald", 2)));
        assert!(!registry.is_recognized(&CurrencyItem::new("dirt", 64)));
    }

    #[test]
    fn custom_currency_registration() {
        let mut registry = CurrencyRegistry::with_recognized_kinds(["emerald"]);
        let token = CurrencyItem::new("paper", 1).with_meta("mark", "harbor_token");

        registry
            .add_custom("Harbor Token", token.clone())
            .expect("register");
        assert!(registry.is_custom("Harbor Token"));
        assert_eq!(registry.custom("Harbor Token"), Some(&token));
        // Registering makes the backing kind recognized.
        assert!(registry.is_recognized(&token));

        let err = registry.add_custom("Harbor Token", token).unwrap_err();
        assert!(matches!(err, ShopError::CurrencyExists(_)));
    }
}
