use serde::{Deserialize, Serialize};

/// Points-mode difficulty tier. Harder tiers pay more for precision and
/// fall off faster with distance; Reveal mode ignores difficulty entirely.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Normal,
    Challenging,
    Hard,
}

impl Difficulty {
    /// Fixed per-round time budget in Points mode.
    pub fn round_time_limit_ms(self) -> u64 {
        match self {
            Difficulty::Normal => 120_000,
            Difficulty::Challenging => 60_000,
            Difficulty::Hard => 30_000,
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Difficulty::Normal),
            "challenging" => Ok(Difficulty::Challenging),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Qualitative distance feedback for user-facing messaging. Fixed
/// thresholds, independent of mode and difficulty; never used for scoring.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackTier {
    Perfect,
    Excellent,
    Great,
    Ok,
    Fair,
    Poor,
}

pub fn feedback_tier(distance_km: f64) -> FeedbackTier {
    if distance_km < 1.0 {
        FeedbackTier::Perfect
    } else if distance_km < 10.0 {
        FeedbackTier::Excellent
    } else if distance_km < 50.0 {
        FeedbackTier::Great
    } else if distance_km < 200.0 {
        FeedbackTier::Ok
    } else if distance_km < 1000.0 {
        FeedbackTier::Fair
    } else {
        FeedbackTier::Poor
    }
}

/// Base reward as a step function of distance. Thresholds are strict
/// (`distance < threshold`); only Hard has the `< 2 km` top band.
pub fn base_points(distance_km: f64, difficulty: Difficulty) -> u32 {
    match difficulty {
        Difficulty::Normal => {
            if distance_km < 10.0 {
                200
            } else if distance_km < 50.0 {
                160
            } else if distance_km < 200.0 {
                120
            } else if distance_km < 500.0 {
                90
            } else if distance_km < 1000.0 {
                60
            } else {
                30
            }
        }
        Difficulty::Challenging => {
            if distance_km < 10.0 {
                170
            } else if distance_km < 50.0 {
                130
            } else if distance_km < 200.0 {
                100
            } else if distance_km < 500.0 {
                75
            } else if distance_km < 1000.0 {
                55
            } else {
                35
            }
        }
        Difficulty::Hard => {
            if distance_km < 2.0 {
                200
            } else if distance_km < 10.0 {
                150
            } else if distance_km < 50.0 {
                95
            } else if distance_km < 200.0 {
                65
            } else if distance_km < 500.0 {
                40
            } else if distance_km < 1000.0 {
                20
            } else {
                10
            }
        }
    }
}

/// Fast-answer bonus factor; 1.0 once the window has elapsed. Windows are
/// strict (`elapsed < window`).
pub fn speed_multiplier(elapsed_ms: u64, difficulty: Difficulty) -> f64 {
    match difficulty {
        Difficulty::Normal => {
            if elapsed_ms < 30_000 {
                2.0
            } else if elapsed_ms < 60_000 {
                1.5
            } else {
                1.0
            }
        }
        Difficulty::Challenging => {
            if elapsed_ms < 30_000 {
                1.5
            } else {
                1.0
            }
        }
        Difficulty::Hard => {
            if elapsed_ms < 10_000 {
                2.0
            } else {
                1.0
            }
        }
    }
}

pub fn awarded_points(distance_km: f64, elapsed_ms: u64, difficulty: Difficulty) -> u32 {
    let base = base_points(distance_km, difficulty) as f64;
    (base * speed_multiplier(elapsed_ms, difficulty)).round() as u32
}

#[cfg(test)]
mod tests {
    use super::{
        Difficulty, FeedbackTier, awarded_points, base_points, feedback_tier, speed_multiplier,
    };

    #[test]
    fn base_points_match_the_reward_table() {
        use Difficulty::*;
        let rows: &[(f64, u32, u32, u32)] = &[
            (1.0, 200, 170, 200),
            (5.0, 200, 170, 150),
            (25.0, 160, 130, 95),
            (100.0, 120, 100, 65),
            (300.0, 90, 75, 40),
            (700.0, 60, 55, 20),
            (2500.0, 30, 35, 10),
        ];
        for &(d, normal, challenging, hard) in rows {
            assert_eq!(base_points(d, Normal), normal, "normal @ {d} km");
            assert_eq!(base_points(d, Challenging), challenging, "challenging @ {d} km");
            assert_eq!(base_points(d, Hard), hard, "hard @ {d} km");
        }
    }

    #[test]
    fn base_point_thresholds_are_strict() {
        assert_eq!(base_points(10.0, Difficulty::Normal), 160);
        assert_eq!(base_points(9.999, Difficulty::Normal), 200);
        assert_eq!(base_points(2.0, Difficulty::Hard), 150);
        assert_eq!(base_points(1.999, Difficulty::Hard), 200);
        assert_eq!(base_points(1000.0, Difficulty::Challenging), 35);
    }

    #[test]
    fn base_points_are_monotonically_non_increasing_in_distance() {
        let probes = [
            0.0, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 400.0, 500.0, 900.0, 1000.0,
            5000.0, 20000.0,
        ];
        for difficulty in [Difficulty::Normal, Difficulty::Challenging, Difficulty::Hard] {
            for pair in probes.windows(2) {
                assert!(
                    base_points(pair[0], difficulty) >= base_points(pair[1], difficulty),
                    "{difficulty:?}: {} km pays less than {} km",
                    pair[0],
                    pair[1]
                );
            }
        }
    }

    #[test]
    fn speed_bonus_boundaries_on_normal() {
        assert_eq!(speed_multiplier(29_999, Difficulty::Normal), 2.0);
        assert_eq!(speed_multiplier(30_001, Difficulty::Normal), 1.5);
        assert_eq!(speed_multiplier(60_001, Difficulty::Normal), 1.0);
    }

    #[test]
    fn speed_windows_vary_by_difficulty() {
        assert_eq!(speed_multiplier(5_000, Difficulty::Challenging), 1.5);
        assert_eq!(speed_multiplier(45_000, Difficulty::Challenging), 1.0);
        assert_eq!(speed_multiplier(9_999, Difficulty::Hard), 2.0);
        assert_eq!(speed_multiplier(10_000, Difficulty::Hard), 1.0);
    }

    #[test]
    fn awarded_points_round_the_product() {
        // 200 base * 2.0 fast bonus.
        assert_eq!(awarded_points(5.0, 10_000, Difficulty::Normal), 400);
        // 170 base * 1.5 = 255.
        assert_eq!(awarded_points(5.0, 10_000, Difficulty::Challenging), 255);
        // 55 * 1.5 = 82.5 rounds to 83.
        assert_eq!(awarded_points(700.0, 10_000, Difficulty::Challenging), 83);
    }

    #[test]
    fn round_time_limits_per_difficulty() {
        assert_eq!(Difficulty::Normal.round_time_limit_ms(), 120_000);
        assert_eq!(Difficulty::Challenging.round_time_limit_ms(), 60_000);
        assert_eq!(Difficulty::Hard.round_time_limit_ms(), 30_000);
    }

    #[test]
    fn feedback_tiers_from_fixed_thresholds() {
        assert_eq!(feedback_tier(0.3), FeedbackTier::Perfect);
        assert_eq!(feedback_tier(3.0), FeedbackTier::Excellent);
        assert_eq!(feedback_tier(30.0), FeedbackTier::Great);
        assert_eq!(feedback_tier(75.0), FeedbackTier::Ok);
        assert_eq!(feedback_tier(500.0), FeedbackTier::Fair);
        assert_eq!(feedback_tier(2000.0), FeedbackTier::Poor);
    }

    #[test]
    fn difficulty_parses_from_str() {
        assert_eq!("hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("expert".parse::<Difficulty>().is_err());
    }
}
