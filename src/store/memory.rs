//! In-memory card store and vocabulary source.
use super::{CardStore, VocabularySource};
use crate::clock::Clock;
use crate::error::{Result, ReviewError};
use crate::models::ScheduleState;
use async_trait::async_trait;
use log::debug;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Cards kept in insertion order, which is the final tie-break for due ordering.
pub struct InMemoryCardStore {
    clock: Arc<dyn Clock>,
    cards: Mutex<Vec<ScheduleState>>,
}

impl InMemoryCardStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            cards: Mutex::new(Vec::new()),
        }
    }

    pub fn with_cards(clock: Arc<dyn Clock>, cards: Vec<ScheduleState>) -> Self {
        Self {
            clock,
            cards: Mutex::new(cards),
        }
    }

    pub fn get(&self, card_id: &str) -> Option<ScheduleState> {
        self.lock().iter().find(|c| c.card_id == card_id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ScheduleState>> {
        self.cards.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CardStore for InMemoryCardStore {
    async fn find_due(&self, limit: usize) -> Result<Vec<ScheduleState>> {
        let now = self.clock.now();
        let mut due: Vec<ScheduleState> = self
            .lock()
            .iter()
            .filter(|c| c.is_due(now))
            .cloned()
            .collect();

        // stable sort keeps insertion order for full ties
        due.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then(a.created_at.cmp(&b.created_at))
        });
        due.truncate(limit);
        Ok(due)
    }

    async fn create_from_pool(&self, vocabulary_ids: &[String]) -> Result<usize> {
        let now = self.clock.now();
        let mut cards = self.lock();

        let mut seen: HashSet<&str> = cards.iter().map(|c| c.vocabulary_id.as_str()).collect();
        let mut created = Vec::new();
        for id in vocabulary_ids {
            if seen.insert(id.as_str()) {
                created.push(ScheduleState::new(Uuid::new_v4().to_string(), id.clone(), now));
            }
        }

        let count = created.len();
        cards.extend(created);
        debug!("Created {} cards in memory ({} requested)", count, vocabulary_ids.len());
        Ok(count)
    }

    async fn update(&self, card_id: &str, new_state: ScheduleState) -> Result<ScheduleState> {
        let mut cards = self.lock();
        let slot = cards
            .iter_mut()
            .find(|c| c.card_id == card_id)
            .ok_or_else(|| ReviewError::NotFound(card_id.to_string()))?;

        // identity and creation time are fixed once the card exists
        slot.repetition = new_state.repetition;
        slot.easiness_factor = new_state.easiness_factor;
        slot.interval = new_state.interval;
        slot.due_date = new_state.due_date;
        slot.last_reviewed = new_state.last_reviewed;
        slot.review_count = new_state.review_count;
        slot.correct_count = new_state.correct_count;
        Ok(slot.clone())
    }

    async fn pool_size(&self) -> Result<usize> {
        Ok(self.lock().len())
    }

    async fn snapshot(&self) -> Result<Vec<ScheduleState>> {
        Ok(self.lock().clone())
    }
}

/// Fixed list of vocabulary ids.
#[derive(Debug, Clone, Default)]
pub struct StaticVocabulary {
    ids: Vec<String>,
}

impl StaticVocabulary {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl VocabularySource for StaticVocabulary {
    async fn list_all_ids(&self) -> Result<Vec<String>> {
        Ok(self.ids.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
    }

    fn card(id: &str, due_offset_days: i64, created_offset_secs: i64) -> ScheduleState {
        ScheduleState {
            due_date: start() + Duration::days(due_offset_days),
            created_at: start() + Duration::seconds(created_offset_secs),
            ..ScheduleState::new(id, format!("w-{}", id), start())
        }
    }

    #[tokio::test]
    async fn test_find_due_orders_by_due_date_then_created_at() {
        let clock = Arc::new(ManualClock::new(start()));
        let store = InMemoryCardStore::with_cards(
            clock,
            vec![
                card("late", 0, 30),
                card("future", 3, 0),
                card("oldest", -2, 50),
                card("early", 0, 10),
            ],
        );

        let due = store.find_due(10).await.unwrap();
        let ids: Vec<&str> = due.iter().map(|c| c.card_id.as_str()).collect();
        assert_eq!(ids, vec!["oldest", "early", "late"]);
    }

    #[tokio::test]
    async fn test_find_due_respects_limit() {
        let clock = Arc::new(ManualClock::new(start()));
        let store = InMemoryCardStore::new(clock);
        let ids: Vec<String> = (0..5).map(|i| format!("w{}", i)).collect();
        store.create_from_pool(&ids).await.unwrap();

        let due = store.find_due(2).await.unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].vocabulary_id, "w0");
        assert_eq!(due[1].vocabulary_id, "w1");
    }

    #[tokio::test]
    async fn test_create_from_pool_skips_existing_and_duplicates() {
        let clock = Arc::new(ManualClock::new(start()));
        let store = InMemoryCardStore::new(clock);

        let first = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(store.create_from_pool(&first).await.unwrap(), 2);

        let second = vec!["b".to_string(), "c".to_string()];
        assert_eq!(store.create_from_pool(&second).await.unwrap(), 1);
        assert_eq!(store.pool_size().await.unwrap(), 3);

        let cards = store.snapshot().await.unwrap();
        assert!(cards.iter().all(|c| c.repetition == 0 && c.interval == 0));
        assert!(cards.iter().all(|c| c.due_date == start()));
    }

    #[tokio::test]
    async fn test_update_unknown_card_is_not_found() {
        let clock = Arc::new(ManualClock::new(start()));
        let store = InMemoryCardStore::new(clock);
        let result = store.update("missing", card("missing", 0, 0)).await;
        assert!(matches!(result, Err(ReviewError::NotFound(id)) if id == "missing"));
    }

    #[tokio::test]
    async fn test_update_is_last_write_wins() {
        let clock = Arc::new(ManualClock::new(start()));
        let store = InMemoryCardStore::with_cards(clock, vec![card("c1", 0, 0)]);

        let mut state = card("c1", 6, 0);
        state.repetition = 2;
        store.update("c1", state.clone()).await.unwrap();
        store.update("c1", state.clone()).await.unwrap();

        assert_eq!(store.get("c1"), Some(state));
        assert_eq!(store.pool_size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_vocabulary_id_and_created_at() {
        let clock = Arc::new(ManualClock::new(start()));
        let store = InMemoryCardStore::with_cards(clock, vec![card("c1", 0, 5)]);

        let mut state = card("c1", 1, 999);
        state.vocabulary_id = "w-other".to_string();
        state.repetition = 1;
        state.interval = 1;
        state.review_count = 1;
        let stored = store.update("c1", state).await.unwrap();

        assert_eq!(stored.vocabulary_id, "w-c1");
        assert_eq!(stored.created_at, start() + Duration::seconds(5));
        assert_eq!(stored.repetition, 1);
        assert_eq!(stored.due_date, start() + Duration::days(1));
        assert_eq!(store.get("c1"), Some(stored));
    }

    #[tokio::test]
    async fn test_cards_become_due_as_clock_advances() {
        let clock = Arc::new(ManualClock::new(start()));
        let store = InMemoryCardStore::with_cards(clock.clone(), vec![card("c1", 1, 0)]);
        assert!(store.find_due(5).await.unwrap().is_empty());

        clock.advance_days(1);
        assert_eq!(store.find_due(5).await.unwrap().len(), 1);
    }
}
