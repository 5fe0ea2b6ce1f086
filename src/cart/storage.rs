use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::errors::CheckoutError;
use crate::models::Cart;

/// Durable local storage for the cart snapshot. The cart is written on every
/// mutation and reloaded on startup; a missing or corrupt record always loads
/// as an empty cart, never an error.
pub trait CartStorage: Send + Sync {
    fn save(&self, cart: &Cart) -> Result<(), CheckoutError>;
    fn load(&self) -> Cart;
}

/// JSON-file storage keyed per install.
pub struct JsonFileCartStorage {
    path: PathBuf,
}

impl JsonFileCartStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CartStorage for JsonFileCartStorage {
    fn save(&self, cart: &Cart) -> Result<(), CheckoutError> {
        let json = serde_json::to_string(cart)?;
        std::fs::write(&self.path, json)?;
        debug!("Persisted cart to {}", self.path.display());
        Ok(())
    }

    fn load(&self) -> Cart {
        match std::fs::read_to_string(&self.path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(cart) => cart,
                Err(e) => {
                    warn!(
                        "Corrupt cart snapshot at {}; starting empty: {}",
                        self.path.display(),
                        e
                    );
                    Cart::default()
                }
            },
            Err(_) => Cart::default(),
        }
    }
}

/// Storage that keeps the serialized snapshot in memory. Used by tests and
/// by embedders that manage persistence themselves.
#[derive(Default)]
pub struct InMemoryCartStorage {
    snapshot: Mutex<Option<String>>,
}

impl InMemoryCartStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStorage for InMemoryCartStorage {
    fn save(&self, cart: &Cart) -> Result<(), CheckoutError> {
        let json = serde_json::to_string(cart)?;
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = Some(json);
        Ok(())
    }

    fn load(&self) -> Cart {
        let snapshot = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        snapshot
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CartItem;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn cart_with_item() -> Cart {
        Cart {
            items: vec![CartItem {
                product_id: Uuid::new_v4(),
                name: "Block-print Saree".to_string(),
                image_url: None,
                size: None,
                color: Some("Indigo".to_string()),
                unit_price: dec!(2499),
                quantity: 1,
            }],
            ..Cart::default()
        }
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileCartStorage::new(dir.path().join("cart.json"));

        let cart = cart_with_item();
        storage.save(&cart).unwrap();
        assert_eq!(storage.load(), cart);
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileCartStorage::new(dir.path().join("absent.json"));
        assert!(storage.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");
        std::fs::write(&path, "{not json").unwrap();

        let storage = JsonFileCartStorage::new(path);
        assert!(storage.load().is_empty());
    }

    #[test]
    fn test_in_memory_roundtrip() {
        let storage = InMemoryCartStorage::new();
        let cart = cart_with_item();
        storage.save(&cart).unwrap();
        assert_eq!(storage.load(), cart);
    }
}
