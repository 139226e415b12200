//! Review session state machine.
//!
//! Bootstraps a batch of due cards (seeding cards from the vocabulary pool
//! when none exist yet), grades them one at a time through SM-2, commits each
//! result to the card store and reports completion.
//!
//! Session state is only written after a store call resolves. A second call
//! on the same controller while one is in flight fails with `SessionBusy`.
//! Dropping an in-flight future (e.g. through `tokio::time::timeout`) is a
//! valid way to cancel it: a dropped bootstrap returns the session to `Idle`,
//! a dropped grade leaves the cursor where it was.

use super::review_session::{ReviewSession, SessionProgress, SessionStatus};
use crate::clock::Clock;
use crate::config::{ReviewConfig, SessionConfig, StatsConfig};
use crate::error::{Result, ReviewError};
use crate::models::{CardSnapshot, Quality, sm2};
use crate::stats::{Stats, StatsAggregator};
use crate::store::{CardStore, VocabularySource};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    pub status: SessionStatus,
    pub cards: Vec<CardSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeOutcome {
    pub status: SessionStatus,
    pub next_card: Option<CardSnapshot>,
}

/// Marks a call as in flight for as long as it lives.
struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ReviewError::SessionBusy)?;
        Ok(Self { flag })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Returns the session to `Idle` unless bootstrap finished.
struct BootstrapGuard<'a> {
    controller: &'a SessionController,
    generation: u64,
    armed: bool,
}

impl BootstrapGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for BootstrapGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.controller.reset_if_current(self.generation);
        }
    }
}

pub struct SessionController {
    store: Arc<dyn CardStore>,
    clock: Arc<dyn Clock>,
    stats: StatsAggregator,
    config: SessionConfig,
    session: Mutex<ReviewSession>,
    in_flight: AtomicBool,
    /// Bumped by `cancel`; results of calls started under an older value are dropped
    generation: AtomicU64,
    status_tx: watch::Sender<SessionStatus>,
}

impl SessionController {
    pub fn new(store: Arc<dyn CardStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_config(store, clock, SessionConfig::default(), StatsConfig::default())
    }

    pub fn from_config(
        store: Arc<dyn CardStore>,
        clock: Arc<dyn Clock>,
        config: &ReviewConfig,
    ) -> Self {
        Self::with_config(store, clock, config.session.clone(), config.stats.clone())
    }

    pub fn with_config(
        store: Arc<dyn CardStore>,
        clock: Arc<dyn Clock>,
        session_config: SessionConfig,
        stats_config: StatsConfig,
    ) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Idle);
        Self {
            stats: StatsAggregator::new(Arc::clone(&store), Arc::clone(&clock), stats_config),
            store,
            clock,
            config: session_config,
            session: Mutex::new(ReviewSession::idle()),
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            status_tx,
        }
    }

    /// Bootstraps a new session of at most `limit` due cards.
    pub async fn start(
        &self,
        limit: i64,
        vocabulary: &dyn VocabularySource,
    ) -> Result<StartOutcome> {
        let _in_flight = InFlight::acquire(&self.in_flight)?;
        if limit <= 0 {
            return Err(ReviewError::InvalidLimit(limit));
        }

        let generation = {
            let mut session = self.lock();
            if !session.status.can_start() {
                return Err(ReviewError::InvalidState(format!(
                    "cannot start while session is {:?}, cancel it first",
                    session.status
                )));
            }
            *session = ReviewSession::bootstrapping();
            self.publish(SessionStatus::Bootstrapping);
            self.generation.load(Ordering::SeqCst)
        };

        let mut guard = BootstrapGuard {
            controller: self,
            generation,
            armed: true,
        };
        let mut queue = self.bootstrap(limit as usize, vocabulary).await?;
        queue.truncate(limit as usize);

        let mut session = self.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            guard.disarm();
            return Err(ReviewError::Cancelled);
        }
        session.activate(queue);
        guard.disarm();

        let outcome = StartOutcome {
            status: session.status,
            cards: session.queue().to_vec(),
        };
        info!(
            "Session {} started: {:?} with {} cards",
            session.session_id,
            outcome.status,
            outcome.cards.len()
        );
        self.publish(outcome.status);
        Ok(outcome)
    }

    async fn bootstrap(
        &self,
        limit: usize,
        vocabulary: &dyn VocabularySource,
    ) -> Result<Vec<CardSnapshot>> {
        let due = self.call(self.store.find_due(limit)).await?;
        if !due.is_empty() {
            return Ok(due);
        }

        let pool_size = self.call(self.store.pool_size()).await?;
        if pool_size > 0 {
            debug!("{} cards in pool, none due", pool_size);
            return Ok(Vec::new());
        }

        let ids = self.call(vocabulary.list_all_ids()).await?;
        let created = if ids.is_empty() {
            0
        } else {
            self.call(self.store.create_from_pool(&ids)).await?
        };
        if created == 0 {
            return Err(ReviewError::EmptyPool);
        }
        info!("Created {} cards from {} vocabulary items", created, ids.len());

        self.call(self.store.find_due(limit)).await
    }

    /// Grades the card at the cursor and commits the new schedule.
    pub async fn grade(&self, card_id: &str, quality: i64) -> Result<GradeOutcome> {
        let _in_flight = InFlight::acquire(&self.in_flight)?;

        let (generation, current) = {
            let session = self.lock();
            let current = session.current_card().ok_or_else(|| {
                ReviewError::InvalidState(format!("cannot grade while session is {:?}", session.status))
            })?;
            if current.card_id != card_id {
                if session.contains(card_id) {
                    return Err(ReviewError::InvalidState(format!(
                        "card {} is not the current card, expected {}",
                        card_id, current.card_id
                    )));
                }
                return Err(ReviewError::NotFound(card_id.to_string()));
            }
            (self.generation.load(Ordering::SeqCst), current.clone())
        };

        let quality = Quality::new(quality)?;
        let new_state = sm2::calculate_next_review(&current, quality, self.clock.now());

        let committed = match self.call(self.store.update(card_id, new_state)).await {
            Ok(committed) => committed,
            Err(err) => {
                warn!("Failed to commit grade for card {}: {}", card_id, err);
                return Err(err);
            }
        };
        debug!(
            "Card {} graded {}: next due {} (interval {}d, EF {:.2})",
            card_id,
            quality.value(),
            committed.due_date,
            committed.interval,
            committed.easiness_factor
        );

        let mut session = self.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            return Err(ReviewError::Cancelled);
        }
        session.record_grade(!quality.is_lapse());

        let outcome = GradeOutcome {
            status: session.status,
            next_card: session.current_card().cloned(),
        };
        if outcome.status == SessionStatus::Completed {
            info!(
                "Session {} completed: {} of {} recalled",
                session.session_id, session.correct_count, session.graded_count
            );
        }
        self.publish(outcome.status);
        Ok(outcome)
    }

    /// Grades with a plain correct/incorrect answer.
    pub async fn grade_correct(&self, card_id: &str, correct: bool) -> Result<GradeOutcome> {
        self.grade(card_id, Quality::from_correct(correct).value() as i64)
            .await
    }

    /// Drops the session and the result of any call still in flight.
    pub fn cancel(&self) -> SessionStatus {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut session = self.lock();
        if session.status != SessionStatus::Idle {
            debug!(
                "Session {} cancelled at {}/{}",
                session.session_id,
                session.cursor(),
                session.total_count()
            );
        }
        *session = ReviewSession::idle();
        self.publish(SessionStatus::Idle);
        SessionStatus::Idle
    }

    pub async fn stats(&self) -> Result<Stats> {
        self.stats.compute().await
    }

    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    pub fn progress(&self) -> SessionProgress {
        self.lock().progress()
    }

    pub fn progress_message(&self) -> String {
        self.lock().progress_message()
    }

    pub fn current_card(&self) -> Option<CardSnapshot> {
        self.lock().current_card().cloned()
    }

    /// Status changes for UI layers that poll or await instead of reading return values.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    fn reset_if_current(&self, generation: u64) {
        let mut session = self.lock();
        if self.generation.load(Ordering::SeqCst) == generation
            && session.status == SessionStatus::Bootstrapping
        {
            *session = ReviewSession::idle();
            self.publish(SessionStatus::Idle);
        }
    }

    async fn call<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match self.config.store_timeout() {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                ReviewError::PersistenceError(format!("store call timed out after {:?}", limit))
            })?,
            None => fut.await,
        }
    }

    /// Callers hold the session lock so published statuses follow the order
    /// in which the session itself changed.
    fn publish(&self, status: SessionStatus) {
        self.status_tx.send_replace(status);
    }

    fn lock(&self) -> MutexGuard<'_, ReviewSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}
