//! Transient state of one review session: a fixed queue and a cursor into it.

use crate::models::CardSnapshot;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Idle,
    Bootstrapping,
    Active,
    /// Cards exist but none are due
    Empty,
    Completed,
}

impl SessionStatus {
    /// A new session may be started from here.
    pub fn can_start(self) -> bool {
        matches!(
            self,
            SessionStatus::Idle | SessionStatus::Empty | SessionStatus::Completed
        )
    }
}

/// Never persisted; only per-card schedule updates are durable.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    pub session_id: String,
    pub status: SessionStatus,
    queue: Vec<CardSnapshot>,
    cursor: usize,
    pub graded_count: usize,
    pub correct_count: usize,
}

impl ReviewSession {
    pub fn idle() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            status: SessionStatus::Idle,
            queue: Vec::new(),
            cursor: 0,
            graded_count: 0,
            correct_count: 0,
        }
    }

    pub fn bootstrapping() -> Self {
        Self {
            status: SessionStatus::Bootstrapping,
            ..Self::idle()
        }
    }

    /// Fixes the queue for the rest of the session.
    pub fn activate(&mut self, queue: Vec<CardSnapshot>) {
        self.status = if queue.is_empty() {
            SessionStatus::Empty
        } else {
            SessionStatus::Active
        };
        self.queue = queue;
        self.cursor = 0;
    }

    pub fn queue(&self) -> &[CardSnapshot] {
        &self.queue
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_card(&self) -> Option<&CardSnapshot> {
        if self.status == SessionStatus::Active {
            self.queue.get(self.cursor)
        } else {
            None
        }
    }

    pub fn contains(&self, card_id: &str) -> bool {
        self.queue.iter().any(|c| c.card_id == card_id)
    }

    /// Advances past the current card after its grade was committed.
    pub fn record_grade(&mut self, correct: bool) {
        self.graded_count += 1;
        if correct {
            self.correct_count += 1;
        }
        self.cursor += 1;
        if self.cursor >= self.queue.len() {
            self.cursor = self.queue.len();
            self.status = SessionStatus::Completed;
        }
    }

    pub fn total_count(&self) -> usize {
        self.queue.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.total_count() - self.cursor
    }

    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            session_id: self.session_id.clone(),
            status: self.status,
            cursor: self.cursor,
            total: self.total_count(),
            graded_count: self.graded_count,
            correct_count: self.correct_count,
        }
    }

    pub fn progress_message(&self) -> String {
        match self.status {
            SessionStatus::Active => format!("Card {} / {}", self.cursor + 1, self.total_count()),
            SessionStatus::Completed => format!(
                "Session complete: {} of {} recalled",
                self.correct_count, self.graded_count
            ),
            SessionStatus::Empty => "Nothing due right now".to_string(),
            SessionStatus::Idle | SessionStatus::Bootstrapping => String::new(),
        }
    }
}

/// Read-only view of a session for callers and UI layers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub session_id: String,
    pub status: SessionStatus,
    pub cursor: usize,
    pub total: usize,
    pub graded_count: usize,
    pub correct_count: usize,
}
