pub mod app_dirs;
pub mod classifier;
pub mod config;
pub mod ledger;
pub mod remote;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod tracker;

use std::error::Error;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use serde::Deserialize;

use crate::classifier::GameEvent;
use crate::snapshot::SessionSnapshot;
use crate::tracker::{AlwaysInTraining, Tracker};

/// practice-session shot tracker: replay recorded game events and inspect sessions
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// replay a recorded event log (JSON) through the classifier
    #[clap(short = 'l', long)]
    log: Option<PathBuf>,

    /// pretty-print a stored session snapshot file
    #[clap(short = 's', long)]
    show: Option<PathBuf>,
}

/// One recorded game event: seconds since the start of the recording plus
/// the event tag the host hook observed.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum LogEvent {
    BallTouched { at: f64 },
    BallExplode { at: f64 },
    GoalScored { at: f64, score: i32 },
    RoundReset { at: f64 },
}

impl LogEvent {
    fn at(&self) -> f64 {
        match *self {
            LogEvent::BallTouched { at }
            | LogEvent::BallExplode { at }
            | LogEvent::GoalScored { at, .. }
            | LogEvent::RoundReset { at } => at,
        }
    }

    fn game_event(&self) -> GameEvent {
        match *self {
            LogEvent::BallTouched { .. } => GameEvent::BallTouched,
            LogEvent::BallExplode { .. } => GameEvent::BallExplode,
            LogEvent::GoalScored { score, .. } => GameEvent::GoalScored { team_score: score },
            LogEvent::RoundReset { .. } => GameEvent::RoundReset,
        }
    }
}

fn replay(path: &PathBuf) -> Result<(), Box<dyn Error>> {
    let events: Vec<LogEvent> = serde_json::from_slice(&std::fs::read(path)?)?;
    let mut tracker = Tracker::new(AlwaysInTraining);

    let base = Instant::now();
    for event in &events {
        tracker.handle_event_at(event.game_event(), base + Duration::from_secs_f64(event.at()));
    }

    println!("session {}", tracker.session().id);
    println!("{:<6} {:>8} {:>6} {:>9}  history", "shot", "attempts", "goals", "accuracy");
    for (id, entry) in tracker.ledger().all() {
        let history: String = entry
            .history
            .iter()
            .map(|goal| if *goal { 'x' } else { '.' })
            .collect();
        println!(
            "{:<6} {:>8} {:>6} {:>8.1}%  {}",
            id,
            entry.attempts,
            entry.goals,
            entry.accuracy(),
            history
        );
    }
    let (attempts, goals) = tracker.ledger().totals();
    println!(
        "total  {:>8} {:>6} {:>8.1}%",
        attempts,
        goals,
        tracker.ledger().total_accuracy()
    );
    Ok(())
}

fn show(path: &PathBuf) -> Result<(), Box<dyn Error>> {
    let snapshot: SessionSnapshot = serde_json::from_slice(&std::fs::read(path)?)?;
    println!(
        "session {} ({}), started {}",
        snapshot.session_id, snapshot.status, snapshot.start_time
    );
    println!(
        "{} shots, {} attempts, {} goals, {:.1}% over {} min",
        snapshot.total_shots,
        snapshot.total_attempts,
        snapshot.total_goals,
        snapshot.total_accuracy,
        snapshot.duration_minutes
    );
    for (id, shot) in &snapshot.shots {
        println!(
            "  shot {id} [{}]: {}/{} ({:.1}%)",
            shot.shot_type, shot.goals, shot.attempts, shot.accuracy
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match (&cli.log, &cli.show) {
        (Some(path), _) => replay(path),
        (None, Some(path)) => show(path),
        (None, None) => {
            eprintln!("nothing to do: pass --log <events.json> or --show <session.json>");
            Ok(())
        }
    }
}
