use std::env;
use std::fs;

use catalog::{LocationCatalog, LocationDeck};
use foundation::geo::{LatLng, distance_km, lat_degrees_for_km};
use foundation::time::{Clock, ManualClock, SystemClock};
use rand::Rng;
use session::{Difficulty, PointsSession, RevealSession};

fn main() {
    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let mut args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(usage());
    }

    let cmd = args[1].clone();
    args.drain(0..2);

    match cmd.as_str() {
        "deal" => cmd_deal(args),
        "nearest" => cmd_nearest(args),
        "simulate" => cmd_simulate(args),
        _ => Err(usage()),
    }
}

fn usage() -> String {
    [
        "usage:",
        "  pinpoint deal <catalog.json> <count>",
        "  pinpoint nearest <catalog.json> <lat> <lng>",
        "  pinpoint simulate <catalog.json> [--mode points|reveal]",
        "      [--difficulty normal|challenging|hard] [--games N] [--skill-km D]",
    ]
    .join("\n")
}

fn load_catalog(path: &str) -> Result<LocationCatalog, String> {
    let raw = fs::read_to_string(path).map_err(|e| format!("read {path}: {e}"))?;
    LocationCatalog::from_json(&raw).map_err(|e| format!("parse {path}: {e}"))
}

// pinpoint deal <catalog.json> <count>
//
// Deals from one continuous deck to show the non-repeating sampler,
// including refills past the catalog size.
fn cmd_deal(args: Vec<String>) -> Result<(), String> {
    if args.len() != 2 {
        return Err(usage());
    }
    let cat = load_catalog(&args[0])?;
    let count: usize = args[1]
        .parse()
        .map_err(|e| format!("bad count {:?}: {e}", args[1]))?;

    let mut deck = LocationDeck::new(&cat).map_err(|e| e.to_string())?;
    let mut rng = rand::rng();
    for i in 1..=count {
        let loc = deck.pick_next(&cat, &mut rng).map_err(|e| e.to_string())?;
        println!(
            "{i:>4}  {:<30} {:>9.4} {:>10.4}  ({} left in cycle)",
            loc.name,
            loc.lat_deg,
            loc.lng_deg,
            deck.remaining()
        );
    }
    Ok(())
}

// pinpoint nearest <catalog.json> <lat> <lng>
fn cmd_nearest(args: Vec<String>) -> Result<(), String> {
    if args.len() != 3 {
        return Err(usage());
    }
    let cat = load_catalog(&args[0])?;
    let lat: f64 = args[1].parse().map_err(|e| format!("bad lat: {e}"))?;
    let lng: f64 = args[2].parse().map_err(|e| format!("bad lng: {e}"))?;
    let point = LatLng::checked(lat, lng).map_err(|e| e.to_string())?;

    let name = cat
        .nearest_name(point)
        .ok_or_else(|| "catalog is empty".to_string())?;
    let entry = cat
        .iter()
        .find(|l| l.name == name)
        .ok_or_else(|| "catalog is empty".to_string())?;
    println!("{name} ({:.1} km away)", distance_km(point, entry.latlng()));
    Ok(())
}

struct SimulateOpts {
    mode: String,
    difficulty: Difficulty,
    games: u32,
    skill_km: f64,
}

fn parse_simulate_opts(args: &[String]) -> Result<SimulateOpts, String> {
    let mut opts = SimulateOpts {
        mode: "points".to_string(),
        difficulty: Difficulty::Normal,
        games: 100,
        skill_km: 150.0,
    };

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        i += 1;
        let value = args
            .get(i)
            .ok_or_else(|| format!("{flag} requires a value"))?;
        match flag {
            "--mode" => opts.mode = value.clone(),
            "--difficulty" => opts.difficulty = value.parse()?,
            "--games" => {
                opts.games = value.parse().map_err(|e| format!("bad --games: {e}"))?;
            }
            "--skill-km" => {
                opts.skill_km = value.parse().map_err(|e| format!("bad --skill-km: {e}"))?;
            }
            other => return Err(format!("unknown arg: {other}\n\n{}", usage())),
        }
        i += 1;
    }
    Ok(opts)
}

// pinpoint simulate <catalog.json> [...]
//
// Headless Monte-Carlo playthroughs with noisy guesses. One shared deck
// feeds every game, matching how a real host process behaves.
fn cmd_simulate(mut args: Vec<String>) -> Result<(), String> {
    if args.is_empty() {
        return Err(usage());
    }
    let cat = load_catalog(&args.remove(0))?;
    let opts = parse_simulate_opts(&args)?;

    match opts.mode.as_str() {
        "points" => simulate_points(&cat, &opts),
        "reveal" => simulate_reveal(&cat, &opts),
        other => Err(format!("unknown mode: {other}\n\n{}", usage())),
    }
}

/// Guess near `target` with up to `noise_km` of error in a random
/// direction. Longitude noise ignores latitude shrink; a plausible player
/// model, not survey geometry.
fn noisy_guess(target: LatLng, noise_km: f64, rng: &mut impl Rng) -> (f64, f64) {
    let r = noise_km * rng.random_range(0.0..1.0f64).sqrt();
    let theta = rng.random_range(0.0..std::f64::consts::TAU);
    let lat = (target.lat_deg + lat_degrees_for_km(r * theta.sin())).clamp(-90.0, 90.0);
    let lng = (target.lng_deg + lat_degrees_for_km(r * theta.cos())).clamp(-180.0, 180.0);
    (lat, lng)
}

fn simulate_points(cat: &LocationCatalog, opts: &SimulateOpts) -> Result<(), String> {
    let mut deck = LocationDeck::new(cat).map_err(|e| e.to_string())?;
    let mut rng = rand::rng();
    // Manual clock anchored at wall time, then advanced deterministically.
    let clock = ManualClock::new(SystemClock.now_ms());

    let mut goals = 0u32;
    let mut total_points = 0u64;
    let mut total_rounds = 0u64;
    let mut timeouts = 0u64;

    for _ in 0..opts.games {
        let mut session =
            PointsSession::new(cat, opts.difficulty).map_err(|e| e.to_string())?;
        while session
            .start_round(&mut deck, cat, &mut rng, clock.now_ms())
            .map_err(|e| e.to_string())?
        {
            // Some rounds run out the clock entirely.
            let limit = opts.difficulty.round_time_limit_ms();
            let think_ms = rng.random_range(3_000..limit + limit / 4);
            clock.advance(think_ms);

            if let Some(poll) = session.poll(clock.now_ms()) {
                if poll.just_expired {
                    timeouts += 1;
                    continue;
                }
            }
            let target = match session.snapshot(clock.now_ms()).target {
                Some(t) => t.latlng(),
                None => break,
            };
            let noise = rng.random_range(0.0..opts.skill_km);
            let (lat, lng) = noisy_guess(target, noise, &mut rng);
            session
                .submit_guess(lat, lng, clock.now_ms())
                .map_err(|e| e.to_string())?;
        }

        let summary = session.summary();
        if summary.goal_reached {
            goals += 1;
        }
        total_points += u64::from(summary.total_points);
        total_rounds += u64::from(summary.rounds_played);
    }

    let games = f64::from(opts.games.max(1));
    println!("points mode, {:?}, {} games:", opts.difficulty, opts.games);
    println!("  goal reached    {goals} ({:.1}%)", 100.0 * f64::from(goals) / games);
    println!("  avg points      {:.0}", total_points as f64 / games);
    println!("  avg rounds      {:.1}", total_rounds as f64 / games);
    println!("  timed-out rounds {timeouts}");
    Ok(())
}

fn simulate_reveal(cat: &LocationCatalog, opts: &SimulateOpts) -> Result<(), String> {
    let mut deck = LocationDeck::new(cat).map_err(|e| e.to_string())?;
    let mut rng = rand::rng();
    let clock = ManualClock::new(SystemClock.now_ms());

    let mut wins = 0u32;
    let mut winning_rounds = 0u64;

    for _ in 0..opts.games {
        let mut session =
            RevealSession::new(&mut deck, cat, &mut rng, false, clock.now_ms())
                .map_err(|e| e.to_string())?;
        let target = session.snapshot(clock.now_ms()).target.latlng();

        while !session.ended() {
            clock.advance(rng.random_range(4_000..30_000));
            // Each wider zoom level halves the guess error.
            let noise = opts.skill_km / f64::from(1u32 << (session.round_index() - 1).min(16));
            let (lat, lng) = noisy_guess(target, noise, &mut rng);
            session
                .submit_guess(lat, lng, clock.now_ms())
                .map_err(|e| e.to_string())?;
            if !session.ended() {
                session.advance_round(clock.now_ms());
            }
        }

        if session.won() {
            wins += 1;
            winning_rounds += u64::from(session.winning_round().unwrap_or(0));
        }
    }

    let games = f64::from(opts.games.max(1));
    println!("reveal mode, {} games:", opts.games);
    println!("  won             {wins} ({:.1}%)", 100.0 * f64::from(wins) / games);
    if wins > 0 {
        println!("  avg win round   {:.1}", winning_rounds as f64 / f64::from(wins));
    }
    Ok(())
}
