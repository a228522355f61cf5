use std::collections::BTreeMap;

/// Accumulated statistics for one shot in the training pack.
///
/// Two invariants hold after every mutation, including manual edits and
/// remote hydration: `goals <= attempts` and `history.len() == attempts`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotEntry {
    pub attempts: u32,
    pub goals: u32,
    /// Chronological attempt outcomes, true = goal.
    pub history: Vec<bool>,
    pub shot_type: String,
}

impl Default for ShotEntry {
    fn default() -> Self {
        Self {
            attempts: 0,
            goals: 0,
            history: Vec::new(),
            shot_type: "Unknown".to_string(),
        }
    }
}

impl ShotEntry {
    /// Append one completed attempt with its outcome.
    pub fn record_attempt(&mut self, goal: bool) {
        self.attempts += 1;
        if goal {
            self.goals += 1;
        }
        self.history.push(goal);
    }

    /// Toggle the outcome of the most recent attempt. Returns the new
    /// outcome, or None if there is no history to correct.
    pub fn flip_last(&mut self) -> Option<bool> {
        let last = self.history.last_mut()?;
        *last = !*last;
        let flipped = *last;
        if flipped {
            self.goals += 1;
        } else {
            self.goals = self.goals.saturating_sub(1);
        }
        self.goals = self.goals.min(self.attempts);
        Some(flipped)
    }

    /// Convert the most recent miss into a goal in place. Used by the
    /// classifier when a goal confirmation lags behind the ball explosion
    /// that already recorded the attempt. Returns false if the history is
    /// empty or already ends with a goal.
    pub fn convert_last_miss(&mut self) -> bool {
        match self.history.last_mut() {
            Some(last) if !*last => {
                *last = true;
                self.goals = (self.goals + 1).min(self.attempts);
                true
            }
            _ => false,
        }
    }

    /// Direct override of both counters. Clamps `goals <= attempts` and
    /// reconciles the history so its length and goal count match: truncate
    /// or pad with misses to the new attempt count, then flip trailing
    /// entries until the goal count lines up. Chronology is preserved
    /// except at the tail.
    pub fn set_counts(&mut self, goals: u32, attempts: u32) {
        self.attempts = attempts;
        self.goals = goals.min(attempts);
        self.history.truncate(attempts as usize);
        while self.history.len() < attempts as usize {
            self.history.push(false);
        }
        let mut tallied = self.history.iter().filter(|g| **g).count() as u32;
        for slot in self.history.iter_mut().rev() {
            if tallied == self.goals {
                break;
            }
            if tallied > self.goals && *slot {
                *slot = false;
                tallied -= 1;
            } else if tallied < self.goals && !*slot {
                *slot = true;
                tallied += 1;
            }
        }
    }

    /// Accuracy as a percentage; 0 when no attempts were made.
    pub fn accuracy(&self) -> f64 {
        if self.attempts > 0 {
            f64::from(self.goals) / f64::from(self.attempts) * 100.0
        } else {
            0.0
        }
    }
}

/// Direction for shot-cursor navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Ordered mapping from shot identifier to its statistics, plus the cursor
/// the classifier records against. Iteration order is ascending identifier.
#[derive(Debug, Clone, Default)]
pub struct ShotLedger {
    shots: BTreeMap<u32, ShotEntry>,
    current: u32,
}

pub const FIRST_SHOT: u32 = 1;

impl ShotLedger {
    pub fn new() -> Self {
        let mut ledger = Self {
            shots: BTreeMap::new(),
            current: FIRST_SHOT,
        };
        ledger.shots.insert(FIRST_SHOT, ShotEntry::default());
        ledger
    }

    pub fn current_shot(&self) -> u32 {
        self.current
    }

    pub fn get(&self, id: u32) -> Option<&ShotEntry> {
        self.shots.get(&id)
    }

    pub fn get_or_create(&mut self, id: u32) -> &mut ShotEntry {
        self.shots.entry(id).or_default()
    }

    /// Entry under the cursor, created on first access.
    pub fn current_entry(&mut self) -> &mut ShotEntry {
        let id = self.current;
        self.get_or_create(id)
    }

    pub fn all(&self) -> impl Iterator<Item = (u32, &ShotEntry)> {
        self.shots.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    /// Move the cursor one step. Previous decrements toward the first shot
    /// and auto-creates the entry; next stops at the last existing key and
    /// never fabricates identifiers past it.
    pub fn advance(&mut self, direction: Direction) {
        match direction {
            Direction::Previous => {
                if self.current > FIRST_SHOT {
                    self.current -= 1;
                    let id = self.current;
                    self.get_or_create(id);
                }
            }
            Direction::Next => {
                if let Some((&next, _)) = self.shots.range(self.current + 1..).next() {
                    self.current = next;
                }
            }
        }
    }

    /// Replace the entire ledger contents, e.g. when hydrating from the
    /// remote side. The cursor moves to the first loaded identifier.
    pub fn replace(&mut self, shots: BTreeMap<u32, ShotEntry>) {
        self.current = shots.keys().next().copied().unwrap_or(FIRST_SHOT);
        self.shots = shots;
    }

    /// Drop all entries and reset the cursor. The ledger stays empty until
    /// the next access re-creates the first entry.
    pub fn clear(&mut self) {
        self.shots.clear();
        self.current = FIRST_SHOT;
    }

    pub fn totals(&self) -> (u32, u32) {
        self.shots
            .values()
            .fold((0, 0), |(a, g), s| (a + s.attempts, g + s.goals))
    }

    /// Aggregate accuracy percentage across all shots.
    pub fn total_accuracy(&self) -> f64 {
        let (attempts, goals) = self.totals();
        if attempts > 0 {
            f64::from(goals) / f64::from(attempts) * 100.0
        } else {
            0.0
        }
    }
}
