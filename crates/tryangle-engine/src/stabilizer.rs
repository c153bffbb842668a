//! Temporal stabilization of feedback.
//!
//! A category has to be detected on several consecutive frames before it is
//! shown, and has to be absent for several frames before it is cleared. This
//! keeps single-frame detector noise from flickering through to the user.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use serde::Serialize;
use tracing::debug;
use tryangle_models::{FeedbackCategory, FeedbackItem};

use crate::config::StabilizerConfig;

/// Per-category status exposed to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    /// Not detected, nothing to fix
    Satisfied,
    /// Detected but not yet confirmed, or absent but not yet cleared
    Pending,
    /// Confirmed and currently shown
    Unsatisfied,
}

/// A surfaced category that has just been fixed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedEvent {
    pub category: FeedbackCategory,
    pub message: String,
    #[serde(skip)]
    pub at: Instant,
}

#[derive(Debug, Clone)]
struct CategoryState {
    hits: u32,
    misses: u32,
    surfaced: bool,
    last: FeedbackItem,
}

/// Output of one stabilizer update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StabilizedFeedback {
    /// Shown items, most important first
    pub items: Vec<FeedbackItem>,
    pub statuses: BTreeMap<FeedbackCategory, CategoryStatus>,
    pub completed: Vec<CompletedEvent>,
    pub perfect_streak: u32,
    pub is_perfect: bool,
    /// The perfect lock engaged on this update
    pub newly_perfect: bool,
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StabilizerStats {
    pub updates: u64,
    pub surfaced: u64,
    pub cleared: u64,
}

/// Hysteresis state machine over feedback categories.
#[derive(Debug, Clone)]
pub struct FeedbackStabilizer {
    config: StabilizerConfig,
    states: HashMap<FeedbackCategory, CategoryState>,
    completed: Vec<CompletedEvent>,
    perfect_streak: u32,
    stats: StabilizerStats,
}

impl FeedbackStabilizer {
    pub fn new(config: StabilizerConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
            completed: Vec::new(),
            perfect_streak: 0,
            stats: StabilizerStats::default(),
        }
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    pub fn stats(&self) -> StabilizerStats {
        self.stats
    }

    pub fn perfect_streak(&self) -> u32 {
        self.perfect_streak
    }

    pub fn is_perfect(&self) -> bool {
        self.perfect_streak >= self.config.perfect_threshold
    }

    /// Feed one frame's detected items.
    pub fn update(
        &mut self,
        detected: Vec<FeedbackItem>,
        all_passed: bool,
        now: Instant,
    ) -> StabilizedFeedback {
        self.stats.updates += 1;

        let mut present: HashMap<FeedbackCategory, FeedbackItem> = HashMap::new();
        for item in detected {
            let keep = present
                .get(&item.category)
                .map_or(true, |existing| item.priority < existing.priority);
            if keep {
                present.insert(item.category, item);
            }
        }

        for (category, item) in &present {
            let state = self.states.entry(*category).or_insert_with(|| CategoryState {
                hits: 0,
                misses: 0,
                surfaced: false,
                last: item.clone(),
            });
            state.hits = state.hits.saturating_add(1);
            state.misses = 0;
            state.last = item.clone();
            if !state.surfaced && state.hits >= self.config.history_threshold {
                state.surfaced = true;
                self.stats.surfaced += 1;
                debug!(category = %category, "Feedback surfaced");
            }
        }

        let mut cleared = Vec::new();
        for (category, state) in self.states.iter_mut() {
            if present.contains_key(category) {
                continue;
            }
            state.hits = 0;
            state.misses = state.misses.saturating_add(1);
            if state.misses >= self.config.disappeared_threshold {
                cleared.push(*category);
            }
        }

        for category in cleared {
            if let Some(state) = self.states.remove(&category) {
                if state.surfaced {
                    self.stats.cleared += 1;
                    debug!(category = %category, "Feedback resolved");
                    self.completed.push(CompletedEvent {
                        category,
                        message: state.last.message,
                        at: now,
                    });
                }
            }
        }

        let display = self.config.completed_display();
        self.completed
            .retain(|event| now.saturating_duration_since(event.at) < display);

        let was_perfect = self.is_perfect();
        self.perfect_streak = if all_passed {
            self.perfect_streak.saturating_add(1)
        } else {
            0
        };
        let is_perfect = self.is_perfect();

        StabilizedFeedback {
            items: self.visible_items(&present),
            statuses: self.statuses(),
            completed: self.completed.clone(),
            perfect_streak: self.perfect_streak,
            is_perfect,
            newly_perfect: is_perfect && !was_perfect,
        }
    }

    /// Break the perfect streak without touching category state.
    pub fn interrupt(&mut self) {
        self.perfect_streak = 0;
    }

    /// Status of every category.
    pub fn statuses(&self) -> BTreeMap<FeedbackCategory, CategoryStatus> {
        FeedbackCategory::ALL
            .iter()
            .map(|category| {
                let status = match self.states.get(category) {
                    None => CategoryStatus::Satisfied,
                    Some(state) if state.surfaced && state.misses == 0 => {
                        CategoryStatus::Unsatisfied
                    }
                    Some(_) => CategoryStatus::Pending,
                };
                (*category, status)
            })
            .collect()
    }

    /// Completed events still on screen at `now`.
    pub fn completed(&self, now: Instant) -> Vec<CompletedEvent> {
        let display = self.config.completed_display();
        self.completed
            .iter()
            .filter(|e| now.saturating_duration_since(e.at) < display)
            .cloned()
            .collect()
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        self.states.clear();
        self.completed.clear();
        self.perfect_streak = 0;
    }

    fn visible_items(
        &self,
        present: &HashMap<FeedbackCategory, FeedbackItem>,
    ) -> Vec<FeedbackItem> {
        let mut items: Vec<FeedbackItem> = self
            .states
            .iter()
            .filter(|(category, state)| {
                state.surfaced && (present.contains_key(*category) || category.is_sticky())
            })
            .map(|(_, state)| state.last.clone())
            .collect();
        items.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.category.cmp(&b.category)));
        items.truncate(self.config.max_items);
        items
    }
}

impl Default for FeedbackStabilizer {
    fn default() -> Self {
        Self::new(StabilizerConfig::default())
    }
}
