//! Per-card retention state tracked by the SM-2 scheduler.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const INITIAL_EASINESS_FACTOR: f64 = 2.5;
pub const MIN_EASINESS_FACTOR: f64 = 1.3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleState {
    pub card_id: String,
    pub vocabulary_id: String,
    pub repetition: u32,
    pub easiness_factor: f64,
    pub interval: u32,
    pub due_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub correct_count: u32,
}

/// What a session hands back to its caller for each queued card.
pub type CardSnapshot = ScheduleState;

impl ScheduleState {
    /// Fresh state for a card materialized from a vocabulary item, due immediately.
    pub fn new(
        card_id: impl Into<String>,
        vocabulary_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            card_id: card_id.into(),
            vocabulary_id: vocabulary_id.into(),
            repetition: 0,
            easiness_factor: INITIAL_EASINESS_FACTOR,
            interval: 0,
            due_date: now,
            last_reviewed: None,
            created_at: now,
            review_count: 0,
            correct_count: 0,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_date <= now
    }

    pub fn is_mature(&self, mastery_threshold: u32) -> bool {
        self.repetition >= mastery_threshold
    }
}
