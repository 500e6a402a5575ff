//! The cart store: a [`CartState`] mirrored into a [`CartStorage`].
//!
//! A store is built explicitly from a storage handle and a pricing policy,
//! hydrated once, and then kept in sync after every mutation. Storage is a
//! convenience cache, not a system of record, so no store operation ever
//! fails: corrupt records are discarded, invalid entries are dropped, and
//! write failures are logged while the in-memory state carries on.
//!
//! ```
//! use rust_decimal::Decimal;
//! use sillage_core::{CartLineInput, CartStore, MemoryStorage, PricingPolicy};
//!
//! let mut store = CartStore::hydrate(MemoryStorage::new(), PricingPolicy::default());
//! store.add_line(CartLineInput {
//!     id: "p1".into(),
//!     name: "Noir Absolu".into(),
//!     subtitle: String::new(),
//!     size: "50ml".into(),
//!     image: String::new(),
//!     slug: "noir-absolu".into(),
//!     unit_price: Decimal::from(100),
//! });
//!
//! assert_eq!(store.total(), Decimal::from(123));
//! ```

use rust_decimal::Decimal;

use crate::cart::{
    CartCommand, CartLine, CartLineInput, CartOutcome, CartState, CartTotals, PricingPolicy,
    inspect_record, serialize_lines,
};
use crate::storage::CartStorage;

/// Storage key the storefront and CLI persist carts under.
pub const CART_STORAGE_KEY: &str = "sillage-cart";

/// A cart bound to its persisted mirror.
#[derive(Debug)]
pub struct CartStore<S: CartStorage> {
    storage: S,
    key: String,
    state: CartState,
    pricing: PricingPolicy,
}

impl<S: CartStorage> CartStore<S> {
    /// Hydrate a store from [`CART_STORAGE_KEY`].
    pub fn hydrate(storage: S, pricing: PricingPolicy) -> Self {
        Self::hydrate_with_key(storage, CART_STORAGE_KEY, pricing)
    }

    /// Hydrate a store from an explicit key.
    ///
    /// An absent or unreadable record yields an empty cart. A record that is
    /// not a JSON array is removed from storage. Invalid entries are dropped.
    pub fn hydrate_with_key(
        mut storage: S,
        key: impl Into<String>,
        pricing: PricingPolicy,
    ) -> Self {
        let key = key.into();
        let state = load_state(&mut storage, &key);

        Self {
            storage,
            key,
            state,
            pricing,
        }
    }

    /// Apply a command, persisting if it wrote to the cart.
    pub fn dispatch(&mut self, command: CartCommand) -> CartOutcome {
        let outcome = self.state.apply(command);
        if outcome.mutated() {
            self.persist();
        }
        outcome
    }

    /// Add a line or bump its quantity by one (capped at the maximum).
    pub fn add_line(&mut self, candidate: CartLineInput) -> CartOutcome {
        self.dispatch(CartCommand::Add(candidate))
    }

    /// Set a line's quantity, clamped into range. No-op for unknown ids.
    pub fn update_quantity(&mut self, id: &str, quantity: i64) -> CartOutcome {
        self.dispatch(CartCommand::SetQuantity {
            id: id.to_owned(),
            quantity,
        })
    }

    /// Remove a line. No-op for unknown ids.
    pub fn remove_line(&mut self, id: &str) -> CartOutcome {
        self.dispatch(CartCommand::Remove { id: id.to_owned() })
    }

    /// Remove every line.
    pub fn clear(&mut self) -> CartOutcome {
        self.dispatch(CartCommand::Clear)
    }

    /// Tear the store down at session end: delete the persisted record and
    /// hand back the storage.
    pub fn discard(mut self) -> S {
        if let Err(e) = self.storage.remove(&self.key) {
            tracing::warn!(key = %self.key, error = %e, "Failed to remove persisted cart");
        }
        self.storage
    }

    /// Give back the storage without touching it.
    pub fn into_storage(self) -> S {
        self.storage
    }

    fn persist(&mut self) {
        let payload = match serialize_lines(self.state.lines()) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to serialize cart");
                return;
            }
        };

        if let Err(e) = self.storage.write(&self.key, &payload) {
            tracing::warn!(
                key = %self.key,
                error = %e,
                "Failed to persist cart, keeping in-memory state"
            );
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    #[must_use]
    pub const fn state(&self) -> &CartState {
        &self.state
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        self.state.lines()
    }

    #[must_use]
    pub const fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    /// Storage key this store persists under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.state.item_count()
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.state.subtotal()
    }

    #[must_use]
    pub fn shipping_cost(&self) -> Decimal {
        self.pricing.shipping_cost(self.subtotal())
    }

    #[must_use]
    pub fn tax(&self) -> Decimal {
        self.pricing.tax(self.subtotal())
    }

    #[must_use]
    pub fn total(&self) -> Decimal {
        self.totals().total
    }

    #[must_use]
    pub fn free_shipping_remaining(&self) -> Decimal {
        self.pricing.free_shipping_remaining(self.subtotal())
    }

    /// All derived values at once.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        self.pricing.totals(&self.state)
    }
}

fn load_state<S: CartStorage>(storage: &mut S, key: &str) -> CartState {
    let raw = match storage.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return CartState::new(),
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read persisted cart, starting empty");
            return CartState::new();
        }
    };

    match inspect_record(&raw) {
        Ok(report) => {
            for dropped in &report.dropped {
                tracing::debug!(
                    key,
                    index = dropped.index,
                    reason = %dropped.reason,
                    "Dropped invalid cart entry"
                );
            }
            if report.truncated > 0 {
                tracing::debug!(key, truncated = report.truncated, "Truncated oversized cart");
            }
            CartState::from_validated(report.lines)
        }
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding corrupt persisted cart");
            if let Err(e) = storage.remove(key) {
                tracing::warn!(key, error = %e, "Failed to remove corrupt cart record");
            }
            CartState::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::cart::tests::input;
    use crate::storage::{MemoryStorage, StorageError};

    fn store() -> CartStore<MemoryStorage> {
        CartStore::hydrate(MemoryStorage::new(), PricingPolicy::default())
    }

    fn seeded(raw: &str) -> CartStore<MemoryStorage> {
        let mut storage = MemoryStorage::new();
        storage.write(CART_STORAGE_KEY, raw).unwrap();
        CartStore::hydrate(storage, PricingPolicy::default())
    }

    fn persisted(store: &CartStore<MemoryStorage>) -> Option<Value> {
        store
            .storage()
            .read(CART_STORAGE_KEY)
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    /// Storage whose reads fail and whose writes are refused.
    struct BrokenStorage;

    impl CartStorage for BrokenStorage {
        fn read(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }

        fn write(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }

        fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
    }

    #[test]
    fn test_starts_empty_without_record() {
        let store = store();
        assert!(store.lines().is_empty());
        assert_eq!(store.item_count(), 0);
        assert_eq!(persisted(&store), None);
    }

    #[test]
    fn test_scenario_below_threshold() {
        let mut store = store();
        store.add_line(input("p1", 100));

        assert_eq!(store.subtotal(), Decimal::from(100));
        assert_eq!(store.shipping_cost(), Decimal::from(15));
        assert_eq!(store.tax(), Decimal::from(8));
        assert_eq!(store.total(), Decimal::from(123));
    }

    #[test]
    fn test_scenario_at_threshold() {
        let mut store = store();
        store.add_line(input("p1", 200));

        assert_eq!(store.subtotal(), Decimal::from(200));
        assert_eq!(store.shipping_cost(), Decimal::ZERO);
        assert_eq!(store.tax(), Decimal::from(16));
        assert_eq!(store.total(), Decimal::from(216));
    }

    #[test]
    fn test_every_mutation_persists() {
        let mut store = store();

        store.add_line(input("p1", 100));
        assert_eq!(persisted(&store).unwrap()[0]["quantity"], json!(1));

        store.update_quantity("p1", 4);
        assert_eq!(persisted(&store).unwrap()[0]["quantity"], json!(4));

        store.add_line(input("p2", 20));
        assert_eq!(persisted(&store).unwrap().as_array().unwrap().len(), 2);

        store.remove_line("p1");
        let record = persisted(&store).unwrap();
        assert_eq!(record.as_array().unwrap().len(), 1);
        assert_eq!(record[0]["id"], json!("p2"));

        store.clear();
        assert_eq!(persisted(&store).unwrap(), json!([]));
    }

    #[test]
    fn test_noop_mutations_do_not_write() {
        let mut store = store();
        assert_eq!(store.update_quantity("missing", 5), CartOutcome::NotInCart);
        assert_eq!(store.remove_line("missing"), CartOutcome::NotInCart);
        assert!(store.lines().is_empty());
        assert_eq!(persisted(&store), None);
    }

    #[test]
    fn test_roundtrip_through_storage() {
        let mut store = store();
        store.add_line(input("p1", 100));
        store.add_line(input("p2", 45));
        store.update_quantity("p2", 3);
        let mut odd = input("p3", 0);
        odd.unit_price = Decimal::new(8999, 2);
        store.add_line(odd);
        let before = store.lines().to_vec();

        let reloaded = CartStore::hydrate(store.into_storage(), PricingPolicy::default());
        assert_eq!(reloaded.lines(), before.as_slice());
        assert_eq!(reloaded.subtotal(), Decimal::new(32499, 2));
    }

    #[test]
    fn test_high_precision_price_survives_reload() {
        let candidate: CartLineInput = serde_json::from_str(
            r#"{"id":"p1","name":"Noir Absolu","price":"19.999999999999999999"}"#,
        )
        .unwrap();

        let mut store = store();
        assert_eq!(store.add_line(candidate), CartOutcome::Applied);
        assert_eq!(store.lines()[0].unit_price, Decimal::from(20));
        let before = store.lines().to_vec();

        let reloaded = CartStore::hydrate(store.into_storage(), PricingPolicy::default());
        assert_eq!(reloaded.lines(), before.as_slice());
    }

    #[test]
    fn test_hydration_drops_invalid_entries() {
        let store = seeded(
            r#"[{"id":"x","name":"X","price":-5,"quantity":1},
                {"id":"y","name":"Y","price":10,"quantity":1}]"#,
        );

        assert_eq!(store.lines().len(), 1);
        assert_eq!(store.lines()[0].id, "y");
    }

    #[test]
    fn test_hydration_does_not_rewrite_record() {
        let raw = r#"[{"id":"x","name":"X","price":-5,"quantity":1}]"#;
        let store = seeded(raw);

        assert!(store.lines().is_empty());
        assert_eq!(
            store.storage().read(CART_STORAGE_KEY).unwrap().as_deref(),
            Some(raw)
        );
    }

    #[test]
    fn test_corrupt_record_is_removed() {
        for raw in ["{{{", r#"{"id":"p1"}"#, "42"] {
            let store = seeded(raw);
            assert!(store.lines().is_empty());
            assert_eq!(persisted(&store), None, "record {raw:?} should be removed");
        }
    }

    #[test]
    fn test_hydration_truncates_to_limit() {
        let entries: Vec<Value> = (0..30)
            .map(|i| json!({"id": format!("p{i}"), "name": "n", "price": 1, "quantity": 2}))
            .collect();
        let store = seeded(&serde_json::to_string(&entries).unwrap());

        assert_eq!(store.lines().len(), 20);
        assert_eq!(store.item_count(), 40);
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let mut store =
            CartStore::hydrate(MemoryStorage::with_quota(200), PricingPolicy::default());

        assert_eq!(store.add_line(input("p1", 100)), CartOutcome::Applied);
        assert_eq!(store.add_line(input("p2", 100)), CartOutcome::Applied);

        // The two-line record does not fit in the quota
        assert_eq!(store.lines().len(), 2);
        assert_eq!(store.subtotal(), Decimal::from(200));
        let record = persisted(&store).unwrap();
        assert_eq!(record.as_array().unwrap().len(), 1);
        assert_eq!(record[0]["id"], json!("p1"));
    }

    #[test]
    fn test_broken_storage_never_fails() {
        let mut store = CartStore::hydrate(BrokenStorage, PricingPolicy::default());
        assert!(store.lines().is_empty());

        store.add_line(input("p1", 100));
        store.update_quantity("p1", 3);
        assert_eq!(store.item_count(), 3);

        store.clear();
        assert!(store.lines().is_empty());
        let _storage = store.discard();
    }

    #[test]
    fn test_discard_removes_record() {
        let mut store = store();
        store.add_line(input("p1", 100));

        let storage = store.discard();
        assert_eq!(storage.read(CART_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_custom_key_is_isolated() {
        let mut storage = MemoryStorage::new();
        {
            let mut store =
                CartStore::hydrate_with_key(&mut storage, "other-cart", PricingPolicy::default());
            store.add_line(input("p1", 100));
            assert_eq!(store.key(), "other-cart");
        }

        assert!(storage.read("other-cart").unwrap().is_some());
        assert_eq!(storage.read(CART_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_distinct_adds_sum_quantities() {
        let mut store = store();
        for i in 0..25 {
            store.add_line(input(&format!("p{i}"), 5));
            if i % 3 == 0 {
                store.add_line(input(&format!("p{i}"), 5));
            }
        }

        let expected: u32 = store.lines().iter().map(|l| l.quantity).sum();
        assert_eq!(store.item_count(), expected);
        assert!(store.lines().len() <= 20);
    }
}
