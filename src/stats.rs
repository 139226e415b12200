//! Summary statistics recomputed from a full scan of the card store.

use crate::clock::Clock;
use crate::config::StatsConfig;
use crate::error::Result;
use crate::models::ScheduleState;
use crate::store::CardStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub due_for_review: usize,
    pub learning: usize,
    pub mature: usize,
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
    pub total_reviews: u64,
    pub total_correct: u64,
    /// Fraction of all gradings that were recalled, 0.0 before any review
    pub accuracy: f64,
}

impl Stats {
    pub fn accuracy_percent(&self) -> String {
        format!("{:.1}", self.accuracy * 100.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

pub fn difficulty(state: &ScheduleState, config: &StatsConfig) -> Difficulty {
    if state.easiness_factor >= config.easy_min_ef {
        Difficulty::Easy
    } else if state.easiness_factor < config.hard_max_ef {
        Difficulty::Hard
    } else {
        Difficulty::Medium
    }
}

/// Folds a set of cards into counts; `total` is the number of cards given.
pub fn summarize(cards: &[ScheduleState], now: DateTime<Utc>, config: &StatsConfig) -> Stats {
    let mut stats = Stats {
        total: cards.len(),
        ..Stats::default()
    };

    for card in cards {
        if card.is_due(now) {
            stats.due_for_review += 1;
        }
        if card.is_mature(config.mastery_threshold) {
            stats.mature += 1;
        } else {
            stats.learning += 1;
        }
        match difficulty(card, config) {
            Difficulty::Easy => stats.easy += 1,
            Difficulty::Medium => stats.medium += 1,
            Difficulty::Hard => stats.hard += 1,
        }
        stats.total_reviews += card.review_count as u64;
        stats.total_correct += card.correct_count as u64;
    }

    if stats.total_reviews > 0 {
        stats.accuracy = stats.total_correct as f64 / stats.total_reviews as f64;
    }
    stats
}

pub struct StatsAggregator {
    store: Arc<dyn CardStore>,
    clock: Arc<dyn Clock>,
    config: StatsConfig,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn CardStore>, clock: Arc<dyn Clock>, config: StatsConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub async fn compute(&self) -> Result<Stats> {
        let total = self.store.pool_size().await?;
        let cards = self.store.snapshot().await?;
        Ok(Stats {
            total,
            ..summarize(&cards, self.clock.now(), &self.config)
        })
    }
}
