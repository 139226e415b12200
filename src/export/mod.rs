pub mod json;

pub use json::{export_cards_to_path, import_vocabulary};
