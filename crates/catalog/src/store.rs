use crate::CatalogError;
use crate::deck::DeckSnapshot;

/// Where the process-lifetime deck snapshot lives between page loads.
///
/// Loading is forgiving: corrupt payloads are discarded (the host just
/// reshuffles), only storage-layer failures surface as errors.
pub trait DeckStore {
    fn load(&self) -> Result<Option<DeckSnapshot>, CatalogError>;
    fn save(&mut self, snapshot: &DeckSnapshot) -> Result<(), CatalogError>;
    fn clear(&mut self) -> Result<(), CatalogError>;
}

#[derive(Debug, Default)]
pub struct InMemoryDeckStore {
    snapshot: Option<DeckSnapshot>,
}

impl InMemoryDeckStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeckStore for InMemoryDeckStore {
    fn load(&self) -> Result<Option<DeckSnapshot>, CatalogError> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &DeckSnapshot) -> Result<(), CatalogError> {
        self.snapshot = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), CatalogError> {
        self.snapshot = None;
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_storage {
    use super::DeckStore;
    use crate::CatalogError;
    use crate::deck::DeckSnapshot;

    /// Deck snapshot persisted under a single localStorage key. The payload
    /// is small (one permutation of catalog indices), so no chunking.
    #[derive(Debug)]
    pub struct LocalStorageDeckStore {
        key: String,
    }

    impl LocalStorageDeckStore {
        pub fn new(key: impl Into<String>) -> Result<Self, CatalogError> {
            let store = Self { key: key.into() };
            // Probe storage up front so the host can fall back to memory.
            window_local_storage()?;
            Ok(store)
        }
    }

    impl DeckStore for LocalStorageDeckStore {
        fn load(&self) -> Result<Option<DeckSnapshot>, CatalogError> {
            let storage = window_local_storage()?;
            let raw = storage
                .get_item(&self.key)
                .map_err(|e| CatalogError::Io(format!("get_item failed: {:?}", e)))?;
            let Some(raw) = raw else {
                return Ok(None);
            };
            if raw.trim().is_empty() {
                return Ok(None);
            }
            // Don't loop on a bad payload forever: drop it and start fresh.
            match serde_json::from_str::<DeckSnapshot>(&raw) {
                Ok(snap) => Ok(Some(snap)),
                Err(_) => {
                    let _ = storage.remove_item(&self.key);
                    Ok(None)
                }
            }
        }

        fn save(&mut self, snapshot: &DeckSnapshot) -> Result<(), CatalogError> {
            let storage = window_local_storage()?;
            let raw =
                serde_json::to_string(snapshot).map_err(|e| CatalogError::Io(e.to_string()))?;
            storage
                .set_item(&self.key, &raw)
                .map_err(|e| CatalogError::Io(format!("set_item failed: {:?}", e)))?;
            Ok(())
        }

        fn clear(&mut self) -> Result<(), CatalogError> {
            let storage = window_local_storage()?;
            storage
                .remove_item(&self.key)
                .map_err(|e| CatalogError::Io(format!("remove_item failed: {:?}", e)))?;
            Ok(())
        }
    }

    fn window_local_storage() -> Result<web_sys::Storage, CatalogError> {
        let win = web_sys::window().ok_or(CatalogError::StorageUnavailable)?;
        win.local_storage()
            .map_err(|e| CatalogError::Io(format!("localStorage error: {:?}", e)))?
            .ok_or(CatalogError::StorageUnavailable)
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_storage::LocalStorageDeckStore;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct LocalStorageDeckStore;

#[cfg(not(target_arch = "wasm32"))]
impl LocalStorageDeckStore {
    pub fn new(_key: impl Into<String>) -> Result<Self, CatalogError> {
        Err(CatalogError::StorageUnavailable)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl DeckStore for LocalStorageDeckStore {
    fn load(&self) -> Result<Option<DeckSnapshot>, CatalogError> {
        Err(CatalogError::StorageUnavailable)
    }

    fn save(&mut self, _snapshot: &DeckSnapshot) -> Result<(), CatalogError> {
        Err(CatalogError::StorageUnavailable)
    }

    fn clear(&mut self) -> Result<(), CatalogError> {
        Err(CatalogError::StorageUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::{DeckStore, InMemoryDeckStore};
    use crate::deck::{DeckSnapshot, LocationDeck};
    use crate::test_support::location;
    use crate::LocationCatalog;
    use pretty_assertions::assert_eq;

    fn sample_snapshot() -> (LocationCatalog, DeckSnapshot) {
        let cat = LocationCatalog::new(vec![
            location("A", 0.0, 0.0),
            location("B", 1.0, 1.0),
        ]);
        let deck = LocationDeck::new(&cat).unwrap();
        let snap = deck.snapshot(&cat);
        (cat, snap)
    }

    #[test]
    fn in_memory_store_round_trips() {
        let (_cat, snap) = sample_snapshot();
        let mut store = InMemoryDeckStore::new();
        assert_eq!(store.load().unwrap(), None);

        store.save(&snap).unwrap();
        assert_eq!(store.load().unwrap(), Some(snap));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn snapshot_json_is_stable_for_storage() {
        let (cat, snap) = sample_snapshot();
        let raw = serde_json::to_string(&snap).unwrap();
        let back: DeckSnapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, snap);
        assert_eq!(back.catalog_digest, cat.digest());
    }
}
