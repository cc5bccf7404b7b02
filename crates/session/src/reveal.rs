use catalog::{CatalogError, Location, LocationCatalog, LocationDeck};
use foundation::geo::{LatLng, distance_km};
use rand::Rng;
use runtime::{EventBus, GameEvent, RoundTimer, TimerPoll};
use serde::Serialize;

use crate::scoring::{FeedbackTier, feedback_tier};

/// A guess within this distance of the target wins (inclusive).
pub const WIN_RADIUS_KM: f64 = 5.0;
/// Rounds before the session is lost.
pub const MAX_ROUNDS: u32 = 10;
/// Map zoom per round, most zoomed-in first: each miss reveals more
/// context and less identifiable detail.
pub const ZOOM_SCHEDULE: [u8; 10] = [19, 18, 17, 16, 15, 14, 12, 11, 10, 9];

/// Round time budget when timer style is enabled: 120s for round 1,
/// shrinking 12s per round, floored at 12s.
pub fn round_budget_ms(round: u32) -> u64 {
    120_000u64
        .saturating_sub(u64::from(round.saturating_sub(1)) * 12_000)
        .max(12_000)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealPhase {
    /// A round is live and awaiting a guess (or a timeout in timer style).
    Active,
    /// Round lost; awaiting an explicit advance to the next zoom level.
    Settled,
    /// Terminal: a guess landed within the win radius.
    Won,
    /// Terminal: ten rounds passed without a winning guess.
    GameOver,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevealOutcome {
    pub round: u32,
    /// None when the round was lost to the clock rather than a guess.
    pub distance_km: Option<f64>,
    pub tier: Option<FeedbackTier>,
    pub won: bool,
    pub game_over: bool,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevealSnapshot {
    pub phase: RevealPhase,
    pub round_index: u32,
    pub zoom_level: u8,
    pub timer_style: bool,
    pub total_time_ms: u64,
    pub final_distance_km: Option<f64>,
    pub remaining_ms: Option<u64>,
    /// Host-trusted: the map is centered here at the round's zoom level.
    /// Never shown to the player as text before the session ends.
    pub target: Location,
    pub last_outcome: Option<RevealOutcome>,
}

/// Progressive-disclosure guessing session.
///
/// One target is fixed at creation and never changes; each of up to ten
/// rounds shows the same place at a wider zoom. A guess within
/// [`WIN_RADIUS_KM`] ends the session as won.
#[derive(Debug)]
pub struct RevealSession {
    target: Location,
    timer_style: bool,
    phase: RevealPhase,
    round_index: u32,
    total_time_ms: u64,
    final_distance_km: Option<f64>,
    winning_round: Option<u32>,
    timer: Option<RoundTimer>,
    round_started_ms: u64,
    last_outcome: Option<RevealOutcome>,
    bus: EventBus,
}

impl RevealSession {
    /// Draws the session target from the shared deck and enters round 1.
    pub fn new(
        deck: &mut LocationDeck,
        catalog: &LocationCatalog,
        rng: &mut impl Rng,
        timer_style: bool,
        now_ms: u64,
    ) -> Result<Self, CatalogError> {
        let target = deck.pick_next(catalog, rng)?;
        let mut session = Self {
            target,
            timer_style,
            phase: RevealPhase::Active,
            round_index: 1,
            total_time_ms: 0,
            final_distance_km: None,
            winning_round: None,
            timer: None,
            round_started_ms: now_ms,
            last_outcome: None,
            bus: EventBus::new(),
        };
        session.arm_round(now_ms);
        Ok(session)
    }

    fn arm_round(&mut self, now_ms: u64) {
        self.round_started_ms = now_ms;
        self.timer = self
            .timer_style
            .then(|| RoundTimer::start(now_ms, round_budget_ms(self.round_index)));
        self.bus.emit(
            self.round_index,
            "round.start",
            format!("zoom {}", self.zoom_level()),
        );
    }

    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    pub fn won(&self) -> bool {
        self.phase == RevealPhase::Won
    }

    pub fn game_over(&self) -> bool {
        self.phase == RevealPhase::GameOver
    }

    pub fn ended(&self) -> bool {
        matches!(self.phase, RevealPhase::Won | RevealPhase::GameOver)
    }

    pub fn round_index(&self) -> u32 {
        self.round_index
    }

    /// Round the winning guess landed in, once won.
    pub fn winning_round(&self) -> Option<u32> {
        self.winning_round
    }

    pub fn zoom_level(&self) -> u8 {
        let i = (self.round_index.saturating_sub(1) as usize).min(ZOOM_SCHEDULE.len() - 1);
        ZOOM_SCHEDULE[i]
    }

    /// Settles the active round with a guess against the fixed target.
    ///
    /// `Ok(None)` when no round is active (already settled or ended);
    /// out-of-range coordinates are rejected with the round untouched.
    pub fn submit_guess(
        &mut self,
        lat_deg: f64,
        lng_deg: f64,
        now_ms: u64,
    ) -> Result<Option<RevealOutcome>, foundation::geo::CoordinateError> {
        let guess = LatLng::checked(lat_deg, lng_deg)?;
        if self.phase != RevealPhase::Active {
            return Ok(None);
        }

        let d = distance_km(guess, self.target.latlng());
        let elapsed_ms = now_ms.saturating_sub(self.round_started_ms);
        self.total_time_ms += elapsed_ms;
        self.cancel_timer();

        if d <= WIN_RADIUS_KM {
            self.phase = RevealPhase::Won;
            self.final_distance_km = Some(d);
            self.winning_round = Some(self.round_index);
            self.bus.emit(
                self.round_index,
                "session.won",
                format!("{d:.2} km in round {}", self.round_index),
            );
        } else if self.round_index >= MAX_ROUNDS {
            self.phase = RevealPhase::GameOver;
            self.final_distance_km = Some(d);
            self.bus
                .emit(self.round_index, "session.game_over", format!("{d:.2} km"));
        } else {
            self.phase = RevealPhase::Settled;
            self.bus
                .emit(self.round_index, "round.missed", format!("{d:.2} km"));
        }

        let outcome = RevealOutcome {
            round: self.round_index,
            distance_km: Some(d),
            tier: Some(feedback_tier(d)),
            won: self.won(),
            game_over: self.game_over(),
            timed_out: false,
        };
        self.last_outcome = Some(outcome.clone());
        Ok(Some(outcome))
    }

    /// Moves a settled round on to the next zoom level. The target stays
    /// fixed; only the revealed context changes. No-op unless a round was
    /// just lost.
    pub fn advance_round(&mut self, now_ms: u64) -> bool {
        if self.phase != RevealPhase::Settled {
            return false;
        }
        self.round_index += 1;
        self.phase = RevealPhase::Active;
        self.arm_round(now_ms);
        true
    }

    /// Drives the round countdown (timer style only). Expiry loses the
    /// round with no guess: the last round ends the session with a
    /// recorded distance of 0, earlier rounds settle like a miss.
    pub fn poll(&mut self, now_ms: u64) -> Option<TimerPoll> {
        if self.phase != RevealPhase::Active {
            return None;
        }
        let poll = self.timer.as_mut()?.poll(now_ms)?;
        if poll.just_expired {
            self.total_time_ms += round_budget_ms(self.round_index);
            let last_round = self.round_index >= MAX_ROUNDS;
            if last_round {
                self.phase = RevealPhase::GameOver;
                self.final_distance_km = Some(0.0);
                self.bus
                    .emit(self.round_index, "session.game_over", "out of time");
            } else {
                self.phase = RevealPhase::Settled;
                self.bus.emit(self.round_index, "round.timeout", "");
            }
            self.last_outcome = Some(RevealOutcome {
                round: self.round_index,
                distance_km: None,
                tier: None,
                won: false,
                game_over: last_round,
                timed_out: true,
            });
        }
        Some(poll)
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = &mut self.timer {
            timer.cancel();
        }
    }

    pub fn snapshot(&self, now_ms: u64) -> RevealSnapshot {
        let remaining_ms = match (self.phase, &self.timer) {
            (RevealPhase::Active, Some(timer)) => Some(timer.remaining_ms(now_ms)),
            _ => None,
        };
        RevealSnapshot {
            phase: self.phase,
            round_index: self.round_index,
            zoom_level: self.zoom_level(),
            timer_style: self.timer_style,
            total_time_ms: self.total_time_ms,
            final_distance_km: self.final_distance_km,
            remaining_ms,
            target: self.target.clone(),
            last_outcome: self.last_outcome.clone(),
        }
    }

    pub fn events(&self) -> &[GameEvent] {
        self.bus.events()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.bus.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_ROUNDS, RevealPhase, RevealSession, ZOOM_SCHEDULE, round_budget_ms};
    use catalog::{Location, LocationCatalog, LocationDeck};
    use foundation::geo::lat_degrees_for_km;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn catalog() -> LocationCatalog {
        LocationCatalog::new(vec![
            Location {
                name: "Kyoto".to_string(),
                lat_deg: 35.0116,
                lng_deg: 135.7681,
            },
            Location {
                name: "Lima".to_string(),
                lat_deg: -12.0464,
                lng_deg: -77.0428,
            },
        ])
    }

    fn session(timer_style: bool) -> RevealSession {
        let catalog = catalog();
        let mut deck = LocationDeck::new(&catalog).unwrap();
        let mut rng = SmallRng::seed_from_u64(9);
        RevealSession::new(&mut deck, &catalog, &mut rng, timer_style, 0).unwrap()
    }

    /// Guess at a known meridian distance from the fixed target.
    fn miss_by_km(s: &mut RevealSession, km: f64, now_ms: u64) -> super::RevealOutcome {
        let target = s.snapshot(now_ms).target;
        s.submit_guess(
            target.lat_deg + lat_degrees_for_km(km),
            target.lng_deg,
            now_ms,
        )
        .unwrap()
        .unwrap()
    }

    #[test]
    fn guess_inside_the_radius_wins() {
        let mut s = session(false);
        let outcome = miss_by_km(&mut s, 4.999, 8_000);
        assert!(outcome.won);
        assert!(!outcome.game_over);
        assert_eq!(s.phase(), RevealPhase::Won);
        assert_eq!(s.winning_round(), Some(1));
        let snap = s.snapshot(8_000);
        assert!(snap.final_distance_km.unwrap() < 5.0);
        assert_eq!(snap.total_time_ms, 8_000);
    }

    #[test]
    fn guess_just_outside_the_radius_does_not_win() {
        let mut s = session(false);
        let outcome = miss_by_km(&mut s, 5.01, 8_000);
        assert!(!outcome.won);
        assert_eq!(s.phase(), RevealPhase::Settled);
        assert_eq!(s.winning_round(), None);
    }

    #[test]
    fn target_is_fixed_across_rounds_and_zoom_widens() {
        let mut s = session(false);
        let first_target = s.snapshot(0).target.clone();
        assert_eq!(s.zoom_level(), ZOOM_SCHEDULE[0]);

        let mut now = 0;
        for round in 1..4 {
            assert_eq!(s.round_index(), round);
            now += 5_000;
            miss_by_km(&mut s, 100.0, now);
            assert!(s.advance_round(now));
        }
        assert_eq!(s.round_index(), 4);
        assert_eq!(s.zoom_level(), ZOOM_SCHEDULE[3]);
        assert_eq!(s.snapshot(now).target, first_target);
    }

    #[test]
    fn ten_misses_end_the_session() {
        let mut s = session(false);
        for round in 1..=MAX_ROUNDS {
            let outcome = miss_by_km(&mut s, 50.0, u64::from(round) * 1_000);
            if round < MAX_ROUNDS {
                assert!(!outcome.game_over);
                assert!(s.advance_round(u64::from(round) * 1_000));
            } else {
                assert!(outcome.game_over);
            }
        }
        assert_eq!(s.phase(), RevealPhase::GameOver);
        assert!(!s.won());
        // The miss distance is recorded.
        let snap = s.snapshot(11_000);
        assert!(snap.final_distance_km.unwrap() > 5.0);
        // Further guesses and advances are no-ops.
        assert_eq!(s.submit_guess(0.0, 0.0, 12_000).unwrap(), None);
        assert!(!s.advance_round(12_000));
    }

    #[test]
    fn settled_round_waits_for_an_explicit_advance() {
        let mut s = session(false);
        miss_by_km(&mut s, 100.0, 1_000);
        assert_eq!(s.phase(), RevealPhase::Settled);
        // A second guess while settled is a no-op.
        assert_eq!(s.submit_guess(0.0, 0.0, 2_000).unwrap(), None);
        assert_eq!(s.round_index(), 1);

        assert!(s.advance_round(3_000));
        assert_eq!(s.phase(), RevealPhase::Active);
        assert!(!s.advance_round(3_000));
    }

    #[test]
    fn round_budgets_shrink_to_a_floor() {
        assert_eq!(round_budget_ms(1), 120_000);
        assert_eq!(round_budget_ms(2), 108_000);
        assert_eq!(round_budget_ms(9), 24_000);
        assert_eq!(round_budget_ms(10), 12_000);
        // Floor holds even past the schedule.
        assert_eq!(round_budget_ms(12), 12_000);
    }

    #[test]
    fn timer_style_counts_down_and_times_out_like_a_miss() {
        let mut s = session(true);
        let snap = s.snapshot(30_000);
        assert_eq!(snap.remaining_ms, Some(90_000));

        let expiry = s.poll(120_000).unwrap();
        assert!(expiry.just_expired);
        assert_eq!(s.phase(), RevealPhase::Settled);
        assert_eq!(s.snapshot(120_000).total_time_ms, 120_000);

        assert!(s.advance_round(120_000));
        // Round 2 budget is 108s.
        assert_eq!(s.snapshot(120_000).remaining_ms, Some(108_000));
    }

    #[test]
    fn timeout_on_the_last_round_records_distance_zero() {
        let mut s = session(true);
        let mut now = 0;
        for _ in 1..MAX_ROUNDS {
            now += 2_000;
            miss_by_km(&mut s, 50.0, now);
            assert!(s.advance_round(now));
        }
        assert_eq!(s.round_index(), MAX_ROUNDS);

        now += round_budget_ms(MAX_ROUNDS);
        assert!(s.poll(now).unwrap().just_expired);
        assert_eq!(s.phase(), RevealPhase::GameOver);
        assert_eq!(s.snapshot(now).final_distance_km, Some(0.0));
        assert!(s.snapshot(now).last_outcome.unwrap().timed_out);
    }

    #[test]
    fn no_timer_without_timer_style() {
        let mut s = session(false);
        assert_eq!(s.snapshot(0).remaining_ms, None);
        assert_eq!(s.poll(1_000_000), None);
        assert_eq!(s.phase(), RevealPhase::Active);
    }

    #[test]
    fn guess_cancels_the_round_timer() {
        let mut s = session(true);
        miss_by_km(&mut s, 100.0, 5_000);
        // Expiry never fires for a settled round.
        assert_eq!(s.poll(300_000), None);
        assert_eq!(s.phase(), RevealPhase::Settled);
    }

    #[test]
    fn invalid_coordinates_are_rejected() {
        let mut s = session(false);
        assert!(s.submit_guess(-91.0, 0.0, 0).is_err());
        assert_eq!(s.phase(), RevealPhase::Active);
    }
}
