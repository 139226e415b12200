//! Persistence boundary consumed by the session controller.
//!
//! `CardStore` is the whole contract to durable card state; `VocabularySource`
//! is the single operation needed to seed cards when none exist yet.

pub mod memory;

pub use memory::{InMemoryCardStore, StaticVocabulary};

use crate::error::Result;
use crate::models::ScheduleState;
use async_trait::async_trait;

#[async_trait]
pub trait CardStore: Send + Sync {
    /// Due cards ordered by due date, then creation time. Never creates cards.
    async fn find_due(&self, limit: usize) -> Result<Vec<ScheduleState>>;

    /// Creates one default card per vocabulary id that has none yet, all or nothing.
    /// Returns how many cards were created.
    async fn create_from_pool(&self, vocabulary_ids: &[String]) -> Result<usize>;

    /// Last-write-wins replacement of a card's state.
    async fn update(&self, card_id: &str, new_state: ScheduleState) -> Result<ScheduleState>;

    /// Total number of cards ever created.
    async fn pool_size(&self) -> Result<usize>;

    /// Every card in the store.
    async fn snapshot(&self) -> Result<Vec<ScheduleState>>;
}

#[async_trait]
pub trait VocabularySource: Send + Sync {
    async fn list_all_ids(&self) -> Result<Vec<String>>;
}
