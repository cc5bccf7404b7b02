use catalog::{CatalogError, Location, LocationCatalog, LocationDeck};
use foundation::geo::{LatLng, distance_km};
use rand::Rng;
use runtime::{EventBus, GameEvent, RoundTimer, TimerPoll};
use serde::Serialize;

use crate::scoring::{Difficulty, FeedbackTier, awarded_points, feedback_tier};

/// Session ends once the running total reaches this many points.
pub const GOAL_POINTS: u32 = 1000;
/// Session ends after this many rounds even if the goal was never reached.
pub const MAX_ROUNDS: u32 = 10;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsPhase {
    /// Created, first round not yet started.
    Idle,
    /// A round is live and awaiting a guess or a timeout.
    Active,
    /// The round settled; awaiting the next `start_round`.
    Settled,
    /// Terminal: goal reached or rounds exhausted.
    Ended,
}

/// What a settled round produced. Returned from `submit_guess` and carried
/// on the snapshot after a timeout settle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuessOutcome {
    pub round: u32,
    /// None when the round settled by timeout rather than a guess.
    pub distance_km: Option<f64>,
    pub tier: Option<FeedbackTier>,
    pub elapsed_ms: u64,
    pub points: u32,
    pub total_points: u32,
    pub goal_reached: bool,
    /// True when this settle also finished the session (goal and/or last
    /// round); `Ended` is entered on the next `start_round`.
    pub session_complete: bool,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointsSnapshot {
    pub difficulty: Difficulty,
    pub phase: PointsPhase,
    pub round_index: u32,
    pub total_points: u32,
    pub total_time_ms: u64,
    pub goal_reached: bool,
    pub session_complete: bool,
    /// Remaining round time; only present while a round is active.
    pub remaining_ms: Option<u64>,
    /// The location to find. Present from round start so the host can show
    /// the prompt, and after settling so it can reveal the answer.
    pub target: Option<Location>,
    pub last_outcome: Option<GuessOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointsSummary {
    pub goal_reached: bool,
    pub rounds_played: u32,
    pub total_points: u32,
    pub total_time_ms: u64,
}

/// Goal-based scoring session: up to ten timed rounds, first to 1000
/// points wins early.
///
/// State machine: `Idle → Active → Settled → (Active | Ended)`. All
/// transitions happen on discrete host calls; re-entrant calls are
/// idempotent no-ops.
#[derive(Debug)]
pub struct PointsSession {
    difficulty: Difficulty,
    phase: PointsPhase,
    round_index: u32,
    total_points: u32,
    total_time_ms: u64,
    goal_reached: bool,
    session_complete: bool,
    target: Option<Location>,
    timer: Option<RoundTimer>,
    round_started_ms: u64,
    last_outcome: Option<GuessOutcome>,
    bus: EventBus,
}

impl PointsSession {
    /// An empty catalog is fatal here: no session can be produced.
    pub fn new(catalog: &LocationCatalog, difficulty: Difficulty) -> Result<Self, CatalogError> {
        if catalog.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }
        Ok(Self {
            difficulty,
            phase: PointsPhase::Idle,
            round_index: 0,
            total_points: 0,
            total_time_ms: 0,
            goal_reached: false,
            session_complete: false,
            target: None,
            timer: None,
            round_started_ms: 0,
            last_outcome: None,
            bus: EventBus::new(),
        })
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn phase(&self) -> PointsPhase {
        self.phase
    }

    pub fn ended(&self) -> bool {
        self.phase == PointsPhase::Ended || self.session_complete
    }

    /// Starts the next round: draws a location from the shared deck and
    /// arms the per-difficulty countdown (replacing, and thereby
    /// cancelling, any previous timer).
    ///
    /// Returns `Ok(false)` without starting when the session is (or has
    /// just become) terminal, or when a round is already active.
    pub fn start_round(
        &mut self,
        deck: &mut LocationDeck,
        catalog: &LocationCatalog,
        rng: &mut impl Rng,
        now_ms: u64,
    ) -> Result<bool, CatalogError> {
        match self.phase {
            PointsPhase::Ended | PointsPhase::Active => return Ok(false),
            PointsPhase::Idle | PointsPhase::Settled => {}
        }
        // Terminal detection is idempotent: goal and round exhaustion may
        // both hold, and either may have been surfaced at settle already.
        if self.goal_reached || self.round_index >= MAX_ROUNDS {
            self.end_session();
            return Ok(false);
        }

        let target = deck.pick_next(catalog, rng)?;
        self.round_index += 1;
        self.bus
            .emit(self.round_index, "round.start", target.name.clone());
        self.target = Some(target);
        self.timer = Some(RoundTimer::start(
            now_ms,
            self.difficulty.round_time_limit_ms(),
        ));
        self.round_started_ms = now_ms;
        self.phase = PointsPhase::Active;
        Ok(true)
    }

    /// Settles the active round with a guess.
    ///
    /// `Ok(None)` when no round is active or the round already settled
    /// (duplicate UI events are no-ops). Out-of-range coordinates are
    /// rejected and leave the round state untouched.
    pub fn submit_guess(
        &mut self,
        lat_deg: f64,
        lng_deg: f64,
        now_ms: u64,
    ) -> Result<Option<GuessOutcome>, foundation::geo::CoordinateError> {
        let guess = LatLng::checked(lat_deg, lng_deg)?;
        if self.phase != PointsPhase::Active {
            return Ok(None);
        }
        let Some(target) = &self.target else {
            return Ok(None);
        };

        let d = distance_km(guess, target.latlng());
        let elapsed_ms = now_ms.saturating_sub(self.round_started_ms);
        let points = awarded_points(d, elapsed_ms, self.difficulty);
        let outcome = self.settle(Some(d), elapsed_ms, points, false);
        Ok(Some(outcome))
    }

    /// Drives the round countdown. On expiry the round settles as a
    /// timeout: zero points, the full budget charged to the time total.
    /// The host is expected to advance to the next round shortly after.
    pub fn poll(&mut self, now_ms: u64) -> Option<TimerPoll> {
        if self.phase != PointsPhase::Active {
            return None;
        }
        let poll = self.timer.as_mut()?.poll(now_ms)?;
        if poll.just_expired {
            let budget = self.difficulty.round_time_limit_ms();
            self.settle(None, budget, 0, true);
        }
        Some(poll)
    }

    fn settle(
        &mut self,
        distance: Option<f64>,
        elapsed_ms: u64,
        points: u32,
        timed_out: bool,
    ) -> GuessOutcome {
        if let Some(timer) = &mut self.timer {
            timer.cancel();
        }
        self.total_points += points;
        self.total_time_ms += elapsed_ms;
        if self.total_points >= GOAL_POINTS {
            self.goal_reached = true;
        }
        if self.goal_reached || self.round_index >= MAX_ROUNDS {
            self.session_complete = true;
        }
        self.phase = PointsPhase::Settled;

        let outcome = GuessOutcome {
            round: self.round_index,
            distance_km: distance,
            tier: distance.map(feedback_tier),
            elapsed_ms,
            points,
            total_points: self.total_points,
            goal_reached: self.goal_reached,
            session_complete: self.session_complete,
            timed_out,
        };
        let kind = if timed_out {
            "round.timeout"
        } else {
            "round.settled"
        };
        self.bus.emit(
            self.round_index,
            kind,
            format!("+{points} points, total {}", self.total_points),
        );
        if self.session_complete {
            self.bus.emit(
                self.round_index,
                "session.complete",
                if self.goal_reached {
                    format!("goal reached in {} rounds", self.round_index)
                } else {
                    "rounds exhausted before the goal".to_string()
                },
            );
        }
        self.last_outcome = Some(outcome.clone());
        outcome
    }

    fn end_session(&mut self) {
        if self.phase != PointsPhase::Ended {
            self.phase = PointsPhase::Ended;
            self.timer = None;
            self.bus.emit(self.round_index, "session.end", "");
        }
    }

    pub fn snapshot(&self, now_ms: u64) -> PointsSnapshot {
        let remaining_ms = match (self.phase, &self.timer) {
            (PointsPhase::Active, Some(timer)) => Some(timer.remaining_ms(now_ms)),
            _ => None,
        };
        PointsSnapshot {
            difficulty: self.difficulty,
            phase: self.phase,
            round_index: self.round_index,
            total_points: self.total_points,
            total_time_ms: self.total_time_ms,
            goal_reached: self.goal_reached,
            session_complete: self.session_complete,
            remaining_ms,
            target: self.target.clone(),
            last_outcome: self.last_outcome.clone(),
        }
    }

    /// "Goal reached in N rounds" vs "goal not reached" is the summary's
    /// distinction; both are complete playthroughs.
    pub fn summary(&self) -> PointsSummary {
        PointsSummary {
            goal_reached: self.goal_reached,
            rounds_played: self.round_index,
            total_points: self.total_points,
            total_time_ms: self.total_time_ms,
        }
    }

    pub fn events(&self) -> &[GameEvent] {
        self.bus.events()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.bus.drain()
    }
}
