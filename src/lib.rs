pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;
pub mod session;
pub mod stats;
pub mod store;

pub use clock::{Clock, ManualClock, OffsetClock, SystemClock};
pub use config::ReviewConfig;
pub use database::SqliteCardStore;
pub use error::{Result, ReviewError};
pub use models::{CardSnapshot, Quality, ScheduleState, VocabularyItem, VocabularyList};
pub use session::{GradeOutcome, SessionController, SessionStatus, StartOutcome};
pub use stats::{Stats, StatsAggregator};
pub use store::{CardStore, InMemoryCardStore, StaticVocabulary, VocabularySource};
