use std::time::Instant;

use crate::ledger::ShotLedger;

/// Seconds after a recorded goal during which ball explosions are replay
/// artifacts of that goal, not new attempts.
pub const GOAL_COOLDOWN_SECS: u64 = 12;

/// Lower bound of the window in which a lagging goal confirmation is
/// attributed to an attempt the explosion already recorded. Below this the
/// score update belongs to the attempt being recorded in the same instant.
pub const GOAL_LAG_MIN_SECS: u64 = 2;

/// Tagged game events consumed by the classifier. The goal event carries the
/// team score read by the host adapter, since score updates fire on every
/// score-relevant change and must be filtered by delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    BallTouched,
    BallExplode,
    GoalScored { team_score: i32 },
    RoundReset,
}

/// The attempt/goal inference state machine.
///
/// Game signals are noisy: explosions fire both on scoring and on timeout,
/// replay playback re-fires them, score updates lag and duplicate. The
/// classifier decides from timers and score deltas which occurrences are
/// genuine attempts and goals, and mutates the ledger exactly once per
/// completed attempt.
///
/// Must only be driven from a single thread; see `Tracker`.
#[derive(Debug, Default)]
pub struct Classifier {
    last_goal: Option<Instant>,
    last_known_score: i32,
    round_active: bool,
    just_recorded_attempt: bool,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event at the given instant. Returns true when the ledger was
    /// mutated and a persistence sync should be triggered.
    pub fn observe(&mut self, event: GameEvent, now: Instant, ledger: &mut ShotLedger) -> bool {
        match event {
            GameEvent::BallTouched => self.on_ball_touched(),
            GameEvent::BallExplode => self.on_ball_explode(now, ledger),
            GameEvent::GoalScored { team_score } => self.on_goal_scored(team_score, now, ledger),
            GameEvent::RoundReset => self.on_round_reset(ledger),
        }
    }

    /// Ball touched since the last reset: the round is live. A later manual
    /// reset without a goal or explosion will count as a miss.
    fn on_ball_touched(&mut self) -> bool {
        self.round_active = true;
        false
    }

    /// Ball destroyed, either by scoring or by the shot timing out. Within
    /// the cooldown window of a recorded goal this is the replay artifact of
    /// that goal and is suppressed.
    fn on_ball_explode(&mut self, now: Instant, ledger: &mut ShotLedger) -> bool {
        if self.secs_since_goal(now) < GOAL_COOLDOWN_SECS {
            log::debug!("ball explode inside goal cooldown, suppressed");
            self.last_goal = None;
            return false;
        }
        ledger.current_entry().record_attempt(false);
        self.just_recorded_attempt = true;
        true
    }

    /// Team score update. Only a strict increase over the last known score is
    /// a real goal; everything else just refreshes the baseline.
    fn on_goal_scored(&mut self, team_score: i32, now: Instant, ledger: &mut ShotLedger) -> bool {
        if team_score <= self.last_known_score {
            log::debug!(
                "score update {} <= last known {}, ignored",
                team_score,
                self.last_known_score
            );
            self.last_known_score = team_score;
            return false;
        }
        self.last_known_score = team_score;

        let lag = self.secs_since_goal(now);
        let entry = ledger.current_entry();
        if (GOAL_LAG_MIN_SECS..GOAL_COOLDOWN_SECS).contains(&lag) && entry.convert_last_miss() {
            // The explosion fired first and already recorded this attempt as
            // a miss; the lagging confirmation converts it in place.
            log::debug!("goal confirmation lagged {lag}s, converted trailing miss");
        } else {
            entry.record_attempt(true);
        }
        self.last_goal = Some(now);
        self.just_recorded_attempt = true;
        true
    }

    /// New round started. A manual reset after the ball was touched, with no
    /// attempt recorded yet, means the user bailed on the shot: count a miss.
    fn on_round_reset(&mut self, ledger: &mut ShotLedger) -> bool {
        self.last_goal = None;
        if self.round_active && !self.just_recorded_attempt {
            ledger.current_entry().record_attempt(false);
        }
        self.round_active = false;
        self.just_recorded_attempt = false;
        true
    }

    /// Whole seconds since the last recorded goal; u64::MAX when unset so
    /// window comparisons treat "no goal yet" as infinitely long ago.
    fn secs_since_goal(&self, now: Instant) -> u64 {
        self.last_goal
            .map(|t| now.duration_since(t).as_secs())
            .unwrap_or(u64::MAX)
    }

    /// Forget score and timer baselines, e.g. on session restart.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
