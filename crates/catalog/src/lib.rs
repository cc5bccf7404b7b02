use foundation::geo::{LatLng, distance_km};
use serde::{Deserialize, Serialize};

pub mod deck;
pub mod store;

pub use deck::{DeckSnapshot, LocationDeck};
pub use store::{DeckStore, InMemoryDeckStore, LocalStorageDeckStore};

/// One entry of the static location catalog. Read-only input: the catalog
/// is never mutated after ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(rename = "lat")]
    pub lat_deg: f64,
    #[serde(rename = "lng")]
    pub lng_deg: f64,
}

impl Location {
    pub fn latlng(&self) -> LatLng {
        LatLng::new(self.lat_deg, self.lng_deg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    EmptyCatalog,
    StorageUnavailable,
    Corrupt(String),
    Io(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::EmptyCatalog => write!(f, "location catalog has no entries"),
            CatalogError::StorageUnavailable => write!(f, "browser storage unavailable"),
            CatalogError::Corrupt(msg) => write!(f, "deck storage corrupt: {msg}"),
            CatalogError::Io(msg) => write!(f, "deck storage error: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// The full set of guessable locations for one host process.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationCatalog {
    locations: Vec<Location>,
}

impl LocationCatalog {
    pub fn new(locations: Vec<Location>) -> Self {
        Self { locations }
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let locations: Vec<Location> =
            serde_json::from_str(json).map_err(|e| CatalogError::Corrupt(e.to_string()))?;
        Ok(Self::new(locations))
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Location> {
        self.locations.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    /// Content fingerprint used to version persisted deck snapshots: a deck
    /// is only restored against the exact catalog it was dealt from.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for loc in &self.locations {
            hasher.update(loc.name.as_bytes());
            hasher.update(&loc.lat_deg.to_le_bytes());
            hasher.update(&loc.lng_deg.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Name of the catalog entry nearest to `point`, by great-circle
    /// distance. Ties keep the first occurrence in catalog order. `None`
    /// only for an empty catalog.
    pub fn nearest_name(&self, point: LatLng) -> Option<&str> {
        let mut best: Option<(&str, f64)> = None;
        for loc in &self.locations {
            let d = distance_km(point, loc.latlng());
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((loc.name.as_str(), d)),
            }
        }
        best.map(|(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogError, LocationCatalog};
    use crate::test_support::location;
    use foundation::geo::LatLng;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_json_parses_name_lat_lng() {
        let cat = LocationCatalog::from_json(
            r#"[{"name": "Reykjavik", "lat": 64.1466, "lng": -21.9426}]"#,
        )
        .unwrap();
        assert_eq!(cat.len(), 1);
        assert_eq!(cat.get(0).unwrap().name, "Reykjavik");
    }

    #[test]
    fn from_json_rejects_malformed_input() {
        let err = LocationCatalog::from_json("not json").unwrap_err();
        assert!(matches!(err, CatalogError::Corrupt(_)));
    }

    #[test]
    fn nearest_name_finds_the_closest_entry() {
        let cat = LocationCatalog::new(vec![
            location("Oslo", 59.9139, 10.7522),
            location("Bergen", 60.3913, 5.3221),
            location("Trondheim", 63.4305, 10.3951),
        ]);
        // A point just outside Oslo.
        let got = cat.nearest_name(LatLng::new(59.95, 10.8)).unwrap();
        assert_eq!(got, "Oslo");
    }

    #[test]
    fn nearest_name_ties_keep_first_occurrence() {
        let cat = LocationCatalog::new(vec![
            location("First", 10.0, 10.0),
            location("Second", 10.0, 10.0),
        ]);
        let got = cat.nearest_name(LatLng::new(10.0, 10.0)).unwrap();
        assert_eq!(got, "First");
    }

    #[test]
    fn nearest_name_is_none_for_empty_catalog() {
        let cat = LocationCatalog::new(Vec::new());
        assert_eq!(cat.nearest_name(LatLng::new(0.0, 0.0)), None);
    }

    #[test]
    fn digest_tracks_content() {
        let a = LocationCatalog::new(vec![location("A", 1.0, 2.0)]);
        let same = LocationCatalog::new(vec![location("A", 1.0, 2.0)]);
        let moved = LocationCatalog::new(vec![location("A", 1.0, 2.5)]);
        assert_eq!(a.digest(), same.digest());
        assert_ne!(a.digest(), moved.digest());
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Location;

    pub fn location(name: &str, lat_deg: f64, lng_deg: f64) -> Location {
        Location {
            name: name.to_string(),
            lat_deg,
            lng_deg,
        }
    }
}
