use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Local;

use crate::classifier::{Classifier, GameEvent};
use crate::ledger::{Direction, ShotEntry, ShotLedger};
use crate::remote::RemoteSession;
use crate::session::SessionContext;
use crate::snapshot::SessionSnapshot;
use crate::sync::{SyncNotice, SyncService};

/// Tells the tracker whether the game is currently inside the observed
/// training context. Implemented by the host adapter; events observed
/// outside that context are discarded silently.
pub trait ModeProbe {
    fn in_training_mode(&self) -> bool;
}

/// Probe for hosts (and tests) where the context is always the right one.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysInTraining;

impl ModeProbe for AlwaysInTraining {
    fn in_training_mode(&self) -> bool {
        true
    }
}

/// Capability interface the host environment drives from its event hooks.
/// Keeps the tracker free of host-specific registration mechanics: the
/// adapter owns hook names and callback plumbing, the tracker owns meaning.
pub trait TrainingEvents {
    fn on_ball_touched(&mut self);
    fn on_ball_explode(&mut self);
    fn on_goal_scored(&mut self, team_score: i32);
    fn on_round_reset(&mut self);
}

/// Top-level controller owning the ledger, the session context, the
/// classifier, and the handle to the background sync service.
///
/// Hard precondition: all methods must be called from a single thread (the
/// host's event-dispatch thread). Nothing here locks; the only concurrency
/// is the sync worker, which communicates via channels and never touches
/// this state.
pub struct Tracker<P: ModeProbe> {
    ledger: ShotLedger,
    session: SessionContext,
    classifier: Classifier,
    probe: P,
    sync: Option<SyncService>,
}

impl<P: ModeProbe> Tracker<P> {
    /// Tracker without background sync, e.g. for tests or offline use.
    pub fn new(probe: P) -> Self {
        Self {
            ledger: ShotLedger::new(),
            session: SessionContext::begin(),
            classifier: Classifier::new(),
            probe,
            sync: None,
        }
    }

    pub fn with_sync(probe: P, sync: SyncService) -> Self {
        let mut tracker = Self::new(probe);
        tracker.sync = Some(sync);
        tracker
    }

    // ── Read access for the presentation layer ───────────────────────────

    pub fn ledger(&self) -> &ShotLedger {
        &self.ledger
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn current_shot(&self) -> u32 {
        self.ledger.current_shot()
    }

    // ── Game events ──────────────────────────────────────────────────────

    /// Feed one game event, stamped now.
    pub fn handle_event(&mut self, event: GameEvent) {
        self.handle_event_at(event, Instant::now());
    }

    /// Feed one game event with an explicit timestamp. Replay and tests use
    /// this to drive the classifier's cooldown windows deterministically.
    pub fn handle_event_at(&mut self, event: GameEvent, now: Instant) {
        if !self.probe.in_training_mode() {
            log::debug!("event outside training context, discarded");
            return;
        }
        if self.classifier.observe(event, now, &mut self.ledger) {
            self.push_snapshot();
        }
    }

    // ── Manual corrections (presentation layer entry points) ─────────────

    /// Toggle the outcome of a shot's most recent attempt. Returns the new
    /// outcome, or None when the shot has no history.
    pub fn flip_last(&mut self, shot_id: u32) -> Option<bool> {
        let flipped = self.ledger.get_or_create(shot_id).flip_last();
        if let Some(goal) = flipped {
            log::info!(
                "shot {shot_id} corrected: {}",
                if goal { "miss -> goal" } else { "goal -> miss" }
            );
            self.push_snapshot();
        }
        flipped
    }

    /// Direct override of a shot's counters. No-op on shots that were never
    /// created.
    pub fn set_counts(&mut self, shot_id: u32, goals: u32, attempts: u32) -> bool {
        match self.ledger.get(shot_id) {
            Some(_) => {
                self.ledger.get_or_create(shot_id).set_counts(goals, attempts);
                self.push_snapshot();
                true
            }
            None => false,
        }
    }

    pub fn advance_shot(&mut self, direction: Direction) {
        self.ledger.advance(direction);
    }

    pub fn set_shot_type(&mut self, shot_id: u32, label: impl Into<String>) {
        self.ledger.get_or_create(shot_id).shot_type = label.into();
        self.push_snapshot();
    }

    // ── Session lifecycle ────────────────────────────────────────────────

    /// End the current session: final flush with status "completed", clear
    /// the ledger, and immediately begin a fresh active session.
    pub fn end_session(&mut self) {
        self.session.active = false;
        if let Some(sync) = &self.sync {
            let snap = SessionSnapshot::capture(&self.session, &self.ledger, Local::now());
            sync.push_blocking(snap);
        }
        self.ledger.clear();
        self.classifier.reset();
        self.session = SessionContext::begin();
        log::info!("session ended, new session {}", self.session.id);
    }

    /// Replace local state with a session the remote side reports active.
    pub fn hydrate(&mut self, remote: RemoteSession) {
        let mut shots = BTreeMap::new();
        for (key, record) in remote.shots_data {
            match key.parse::<u32>() {
                Ok(id) => {
                    shots.insert(id, record.into_entry());
                }
                Err(_) => log::warn!("ignoring shot with non-numeric id {key:?}"),
            }
        }
        log::info!("loaded {} shots from {}", shots.len(), remote.session_id);
        self.ledger.replace(shots);
        self.classifier.reset();
        self.session = SessionContext::adopt(remote.session_id);
    }

    /// Drain pending notices from the sync worker. Call periodically from
    /// the event thread (e.g. the host's render tick); this is the only
    /// place background work feeds back into tracker state.
    pub fn tick(&mut self) {
        let mut pending = Vec::new();
        if let Some(sync) = &self.sync {
            while let Some(notice) = sync.poll_notice() {
                pending.push(notice);
            }
        }
        for notice in pending {
            match notice {
                SyncNotice::Hydrated(remote) | SyncNotice::SessionSwitched(remote) => {
                    self.hydrate(remote);
                }
                SyncNotice::Deactivated => {
                    self.session.active = false;
                }
            }
        }
    }

    /// Capture a consistent snapshot and trigger the background sync. The
    /// copy happens here on the event thread; a skipped trigger (one already
    /// in flight) relies on the next mutation or heartbeat.
    fn push_snapshot(&mut self) {
        if let Some(sync) = &self.sync {
            let snap = SessionSnapshot::capture(&self.session, &self.ledger, Local::now());
            sync.push(snap);
        }
    }
}

impl<P: ModeProbe> TrainingEvents for Tracker<P> {
    fn on_ball_touched(&mut self) {
        self.handle_event(GameEvent::BallTouched);
    }

    fn on_ball_explode(&mut self) {
        self.handle_event(GameEvent::BallExplode);
    }

    fn on_goal_scored(&mut self, team_score: i32) {
        self.handle_event(GameEvent::GoalScored { team_score });
    }

    fn on_round_reset(&mut self) {
        self.handle_event(GameEvent::RoundReset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct TogglingProbe(Rc<Cell<bool>>);

    impl ModeProbe for TogglingProbe {
        fn in_training_mode(&self) -> bool {
            self.0.get()
        }
    }

    #[test]
    fn events_outside_training_context_are_discarded() {
        let in_training = Rc::new(Cell::new(false));
        let mut tracker = Tracker::new(TogglingProbe(Rc::clone(&in_training)));

        tracker.on_ball_touched();
        tracker.on_ball_explode();
        tracker.on_goal_scored(1);
        tracker.on_round_reset();
        assert_eq!(tracker.ledger().totals(), (0, 0));

        in_training.set(true);
        tracker.on_ball_touched();
        tracker.on_ball_explode();
        assert_eq!(tracker.ledger().totals(), (1, 0));
    }

    #[test]
    fn flip_last_round_trips() {
        let mut tracker = Tracker::new(AlwaysInTraining);
        tracker.on_ball_touched();
        tracker.on_goal_scored(1);

        assert_eq!(tracker.flip_last(1), Some(false));
        let entry = tracker.ledger().get(1).unwrap();
        assert_eq!((entry.attempts, entry.goals), (1, 0));

        assert_eq!(tracker.flip_last(1), Some(true));
        let entry = tracker.ledger().get(1).unwrap();
        assert_eq!((entry.attempts, entry.goals), (1, 1));
    }

    #[test]
    fn set_counts_requires_existing_shot() {
        let mut tracker = Tracker::new(AlwaysInTraining);
        assert!(!tracker.set_counts(9, 1, 2));
        assert!(tracker.set_counts(1, 1, 2));

        let entry = tracker.ledger().get(1).unwrap();
        assert_eq!((entry.attempts, entry.goals), (2, 1));
    }

    #[test]
    fn end_session_clears_and_restarts() {
        let mut tracker = Tracker::new(AlwaysInTraining);
        tracker.on_ball_touched();
        tracker.on_ball_explode();
        let old_id = tracker.session().id.clone();

        tracker.end_session();

        assert!(tracker.ledger().is_empty());
        assert_eq!(tracker.current_shot(), crate::ledger::FIRST_SHOT);
        assert!(tracker.session().active);
        assert_ne!(tracker.session().id, old_id);
        assert_eq!(tracker.ledger().totals(), (0, 0));
    }

    #[test]
    fn score_baseline_survives_shot_navigation() {
        let mut tracker = Tracker::new(AlwaysInTraining);
        tracker.on_goal_scored(1);
        tracker.advance_shot(Direction::Previous);

        // Same score again must not count on any shot.
        tracker.on_goal_scored(1);
        assert_eq!(tracker.ledger().totals(), (1, 1));
    }

    #[test]
    fn hydrate_replaces_ledger_and_session() {
        let mut tracker = Tracker::new(AlwaysInTraining);
        tracker.on_ball_touched();
        tracker.on_ball_explode();

        let remote: RemoteSession = serde_json::from_str(
            r#"{
                "session_id": "session_99",
                "shots_data": {
                    "2": {"attempts": 4, "goals": 6, "attemptHistory": [true, true], "shotType": "Aerial"},
                    "bogus": {"attempts": 1, "goals": 0, "attemptHistory": [false], "shotType": "Unknown"}
                }
            }"#,
        )
        .unwrap();
        tracker.hydrate(remote);

        assert_eq!(tracker.session().id, "session_99");
        assert!(tracker.session().active);
        assert_eq!(tracker.current_shot(), 2);
        assert_eq!(tracker.ledger().len(), 1);

        // Malformed counts were clamped on load.
        let entry = tracker.ledger().get(2).unwrap();
        assert_eq!(entry.attempts, 4);
        assert_eq!(entry.goals, 4);
        assert_eq!(entry.history.len(), 4);
        assert_eq!(entry.shot_type, "Aerial");
    }

    #[test]
    fn set_shot_type_updates_label() {
        let mut tracker = Tracker::new(AlwaysInTraining);
        tracker.set_shot_type(1, "Backboard");
        assert_eq!(tracker.ledger().get(1).unwrap().shot_type, "Backboard");
    }
}
