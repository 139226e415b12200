//! SM-2 (SuperMemo 2) spaced repetition algorithm implementation.
//!
//! The SM-2 algorithm calculates optimal review intervals based on recall quality:
//! - Each card has an easiness factor (EF) that adjusts based on performance
//! - Quality grades 0-2: Reset repetitions, card is due again tomorrow
//! - Quality grades 3-5: Increase interval progressively (1 day → 6 days → EF multiplier)
//! - EF is adjusted after every review, rounded to 2 decimals, never below 1.3
//!
//! The function is pure: the caller supplies `now` and commits the result.

use super::schedule_state::MIN_EASINESS_FACTOR;
use super::{Quality, ScheduleState};
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};

/// Grades a card with a raw 0-5 rating, rejecting anything outside that range.
pub fn review(state: &ScheduleState, quality: i64, now: DateTime<Utc>) -> Result<ScheduleState> {
    let quality = Quality::new(quality)?;
    Ok(calculate_next_review(state, quality, now))
}

/// Calculates the next schedule state according to the SM-2 algorithm.
pub fn calculate_next_review(
    state: &ScheduleState,
    quality: Quality,
    now: DateTime<Utc>,
) -> ScheduleState {
    let new_ef = next_easiness_factor(state.easiness_factor, quality);

    let (new_interval, new_repetition) = if quality.is_lapse() {
        (1, 0)
    } else {
        let new_reps = state.repetition + 1;
        let new_int = match new_reps {
            1 => 1,
            2 => 6,
            _ => ((state.interval as f64 * new_ef).round() as u32).max(1),
        };
        (new_int, new_reps)
    };

    ScheduleState {
        repetition: new_repetition,
        easiness_factor: new_ef,
        interval: new_interval,
        due_date: now + Duration::days(new_interval as i64),
        last_reviewed: Some(now),
        review_count: state.review_count + 1,
        correct_count: state.correct_count + u32::from(!quality.is_lapse()),
        ..state.clone()
    }
}

/// EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)), floored at 1.3
fn next_easiness_factor(ef: f64, quality: Quality) -> f64 {
    let miss = (Quality::MAX - quality.value()) as f64;
    let raw = ef + (0.1 - miss * (0.08 + miss * 0.02));
    round_to_hundredths(raw).max(MIN_EASINESS_FACTOR)
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
