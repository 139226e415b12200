pub mod controller;
pub mod review_session;

pub use controller::{GradeOutcome, SessionController, StartOutcome};
pub use review_session::{ReviewSession, SessionProgress, SessionStatus};
