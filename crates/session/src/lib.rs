pub mod points;
pub mod reveal;
pub mod scoring;

pub use points::{GuessOutcome, PointsPhase, PointsSession, PointsSnapshot, PointsSummary};
pub use reveal::{RevealOutcome, RevealPhase, RevealSession, RevealSnapshot};
pub use scoring::{
    Difficulty, FeedbackTier, awarded_points, base_points, feedback_tier, speed_multiplier,
};

use catalog::{CatalogError, LocationCatalog, LocationDeck};
use foundation::geo::CoordinateError;
use rand::Rng;
use runtime::{GameEvent, TimerPoll};
use serde::Serialize;

/// The one active playthrough, selected per mode at creation.
///
/// The host owns exactly one of these at a time and drives it with
/// discrete events (guess, advance, timer poll); mode branching happens
/// here once instead of at every call site.
#[derive(Debug)]
pub enum GameSession {
    Points(PointsSession),
    Reveal(RevealSession),
}

/// Mode-tagged settle report for the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SessionOutcome {
    Points(GuessOutcome),
    Reveal(RevealOutcome),
}

/// Mode-tagged render state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SessionSnapshot {
    Points(PointsSnapshot),
    Reveal(RevealSnapshot),
}

/// Creates a Points-mode session. The first round starts on the first
/// `advance_round` call.
pub fn create_points_session(
    catalog: &LocationCatalog,
    difficulty: Difficulty,
) -> Result<GameSession, CatalogError> {
    Ok(GameSession::Points(PointsSession::new(catalog, difficulty)?))
}

/// Creates a Reveal-mode session: draws the fixed target from the shared
/// deck and enters round 1 immediately.
pub fn create_reveal_session(
    deck: &mut LocationDeck,
    catalog: &LocationCatalog,
    rng: &mut impl Rng,
    timer_style: bool,
    now_ms: u64,
) -> Result<GameSession, CatalogError> {
    Ok(GameSession::Reveal(RevealSession::new(
        deck,
        catalog,
        rng,
        timer_style,
        now_ms,
    )?))
}

impl GameSession {
    /// Starts the next round (Points) or advances past a lost round
    /// (Reveal). Returns whether a new round actually began; no-op when
    /// the session has ended.
    pub fn advance_round(
        &mut self,
        deck: &mut LocationDeck,
        catalog: &LocationCatalog,
        rng: &mut impl Rng,
        now_ms: u64,
    ) -> Result<bool, CatalogError> {
        match self {
            GameSession::Points(s) => s.start_round(deck, catalog, rng, now_ms),
            GameSession::Reveal(s) => Ok(s.advance_round(now_ms)),
        }
    }

    /// Settles the active round with a guess. `Ok(None)` when no round is
    /// active; invalid coordinates are rejected with state untouched.
    pub fn submit_guess(
        &mut self,
        lat_deg: f64,
        lng_deg: f64,
        now_ms: u64,
    ) -> Result<Option<SessionOutcome>, CoordinateError> {
        match self {
            GameSession::Points(s) => Ok(s
                .submit_guess(lat_deg, lng_deg, now_ms)?
                .map(SessionOutcome::Points)),
            GameSession::Reveal(s) => Ok(s
                .submit_guess(lat_deg, lng_deg, now_ms)?
                .map(SessionOutcome::Reveal)),
        }
    }

    /// Drives the round countdown; expiry settles the round per mode.
    pub fn poll(&mut self, now_ms: u64) -> Option<TimerPoll> {
        match self {
            GameSession::Points(s) => s.poll(now_ms),
            GameSession::Reveal(s) => s.poll(now_ms),
        }
    }

    pub fn snapshot(&self, now_ms: u64) -> SessionSnapshot {
        match self {
            GameSession::Points(s) => SessionSnapshot::Points(s.snapshot(now_ms)),
            GameSession::Reveal(s) => SessionSnapshot::Reveal(s.snapshot(now_ms)),
        }
    }

    pub fn ended(&self) -> bool {
        match self {
            GameSession::Points(s) => s.ended(),
            GameSession::Reveal(s) => s.ended(),
        }
    }

    pub fn events(&self) -> &[GameEvent] {
        match self {
            GameSession::Points(s) => s.events(),
            GameSession::Reveal(s) => s.events(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        match self {
            GameSession::Points(s) => s.drain_events(),
            GameSession::Reveal(s) => s.drain_events(),
        }
    }
}
