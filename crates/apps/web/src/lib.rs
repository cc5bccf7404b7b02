//! Browser bindings for the guessing game core.
//!
//! The JS side owns the map, markers, and DOM; this side owns the rules.
//! All state crossing the boundary is JSON so the UI layer stays decoupled
//! from Rust types. Time always arrives from the host (`Date.now()`), so
//! the session logic remains a pure function of the events it is fed.

use catalog::{
    DeckSnapshot, DeckStore, InMemoryDeckStore, LocalStorageDeckStore, LocationCatalog,
    LocationDeck,
};
use foundation::geo::LatLng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;
use session::{Difficulty, GameSession, create_points_session, create_reveal_session};
use wasm_bindgen::prelude::*;

/// Versioned by catalog digest inside the payload, not by this key.
const DECK_STORAGE_KEY: &str = "pinpoint.deck.v1";

/// localStorage when available, plain memory otherwise (private browsing,
/// storage quota, non-browser hosts).
enum HostDeckStore {
    Local(LocalStorageDeckStore),
    Memory(InMemoryDeckStore),
}

impl HostDeckStore {
    fn open() -> Self {
        match LocalStorageDeckStore::new(DECK_STORAGE_KEY) {
            Ok(s) => HostDeckStore::Local(s),
            Err(_) => HostDeckStore::Memory(InMemoryDeckStore::new()),
        }
    }

    fn load(&self) -> Option<DeckSnapshot> {
        let loaded = match self {
            HostDeckStore::Local(s) => s.load(),
            HostDeckStore::Memory(s) => s.load(),
        };
        match loaded {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn(&format!("deck load failed, reshuffling: {e}"));
                None
            }
        }
    }

    fn save(&mut self, snapshot: &DeckSnapshot) {
        let saved = match self {
            HostDeckStore::Local(s) => s.save(snapshot),
            HostDeckStore::Memory(s) => s.save(snapshot),
        };
        if let Err(e) = saved {
            warn(&format!("deck save failed: {e}"));
        }
    }
}

fn warn(msg: &str) {
    web_sys::console::warn_1(&JsValue::from_str(msg));
}

fn err_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_json(value: &impl Serialize) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(err_js)
}

#[derive(Serialize)]
struct PollReport {
    remaining_ms: u64,
    just_expired: bool,
}

/// One game instance: the catalog, the process-lifetime deck, and at most
/// one active session.
#[wasm_bindgen]
pub struct GameHost {
    catalog: LocationCatalog,
    deck: LocationDeck,
    store: HostDeckStore,
    session: Option<GameSession>,
    rng: SmallRng,
}

#[wasm_bindgen]
impl GameHost {
    /// `catalog_json` is the static location array:
    /// `[{"name": ..., "lat": ..., "lng": ...}, ...]`.
    #[wasm_bindgen(constructor)]
    pub fn new(catalog_json: &str) -> Result<GameHost, JsValue> {
        let catalog = LocationCatalog::from_json(catalog_json).map_err(err_js)?;
        let store = HostDeckStore::open();
        let deck = store
            .load()
            .and_then(|snap| LocationDeck::restore(&snap, &catalog))
            .map_or_else(|| LocationDeck::new(&catalog).map_err(err_js), Ok)?;

        let seed = js_sys::Date::now() as u64 ^ (js_sys::Math::random().to_bits());
        Ok(GameHost {
            catalog,
            deck,
            store,
            session: None,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    pub fn location_count(&self) -> usize {
        self.catalog.len()
    }

    /// Suggested interval for the `poll` loop.
    pub fn recommended_tick_ms() -> u32 {
        runtime::RECOMMENDED_TICK_MS as u32
    }

    /// Starts a Points playthrough; call `advance_round` for round 1.
    pub fn start_points(&mut self, difficulty: &str) -> Result<(), JsValue> {
        let difficulty: Difficulty = difficulty.parse().map_err(|e: String| err_js(e))?;
        self.session = Some(create_points_session(&self.catalog, difficulty).map_err(err_js)?);
        Ok(())
    }

    /// Starts a Reveal playthrough; round 1 is live immediately.
    pub fn start_reveal(&mut self, timer_style: bool, now_ms: f64) -> Result<(), JsValue> {
        let session = create_reveal_session(
            &mut self.deck,
            &self.catalog,
            &mut self.rng,
            timer_style,
            now_ms as u64,
        )
        .map_err(err_js)?;
        self.session = Some(session);
        self.persist_deck();
        Ok(())
    }

    /// Starts the next round (Points) or advances past a lost round
    /// (Reveal). Returns whether a new round began.
    pub fn advance_round(&mut self, now_ms: f64) -> Result<bool, JsValue> {
        let session = self.session.as_mut().ok_or_else(no_session)?;
        let started = session
            .advance_round(&mut self.deck, &self.catalog, &mut self.rng, now_ms as u64)
            .map_err(err_js)?;
        if started {
            self.persist_deck();
        }
        Ok(started)
    }

    /// Settles the active round. Returns the outcome as JSON, or `"null"`
    /// when the call was a no-op (no active round). Out-of-range
    /// coordinates are an error and leave the round untouched.
    pub fn submit_guess(&mut self, lat: f64, lng: f64, now_ms: f64) -> Result<String, JsValue> {
        let session = self.session.as_mut().ok_or_else(no_session)?;
        let outcome = session
            .submit_guess(lat, lng, now_ms as u64)
            .map_err(err_js)?;
        to_json(&outcome)
    }

    /// Drives the round countdown. Returns `{remaining_ms, just_expired}`
    /// as JSON, or `"null"` when no timer is running.
    pub fn poll(&mut self, now_ms: f64) -> Result<String, JsValue> {
        let session = self.session.as_mut().ok_or_else(no_session)?;
        let report = session.poll(now_ms as u64).map(|p| PollReport {
            remaining_ms: p.remaining_ms,
            just_expired: p.just_expired,
        });
        to_json(&report)
    }

    /// Mode-tagged render state as JSON.
    pub fn snapshot(&self, now_ms: f64) -> Result<String, JsValue> {
        let session = self.session.as_ref().ok_or_else(no_session)?;
        to_json(&session.snapshot(now_ms as u64))
    }

    pub fn session_ended(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.ended())
    }

    /// Name of the best-known place nearest to a point, for messaging.
    pub fn nearest_name(&self, lat: f64, lng: f64) -> Option<String> {
        self.catalog
            .nearest_name(LatLng::new(lat, lng))
            .map(str::to_string)
    }

    /// Accumulated session events as JSON, clearing the buffer.
    pub fn drain_events(&mut self) -> Result<String, JsValue> {
        let Some(session) = self.session.as_mut() else {
            return Ok("[]".to_string());
        };
        let events: Vec<EventReport> = session
            .drain_events()
            .into_iter()
            .map(|e| EventReport {
                round: e.round,
                kind: e.kind,
                message: e.message,
            })
            .collect();
        to_json(&events)
    }

    fn persist_deck(&mut self) {
        let snapshot = self.deck.snapshot(&self.catalog);
        self.store.save(&snapshot);
    }
}

#[derive(Serialize)]
struct EventReport {
    round: u32,
    kind: &'static str,
    message: String,
}

fn no_session() -> JsValue {
    JsValue::from_str("no active session")
}
