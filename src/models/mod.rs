pub mod quality;
pub mod schedule_state;
pub mod sm2;
pub mod vocabulary;

pub use quality::Quality;
pub use schedule_state::{CardSnapshot, ScheduleState};
pub use vocabulary::{VocabularyItem, VocabularyList};
