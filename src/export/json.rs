//! JSON import/export for vocabulary lists and card schedules.

use crate::error::Result;
use crate::models::{ScheduleState, VocabularyList};
use log::info;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Writes card schedules to a pretty-printed JSON file.
pub fn export_cards_to_path<P: AsRef<Path>>(cards: &[ScheduleState], path: P) -> Result<()> {
    let json_string = serde_json::to_string_pretty(cards)?;
    let mut file = File::create(&path)?;
    file.write_all(json_string.as_bytes())?;
    info!("Exported {} cards to '{}'", cards.len(), path.as_ref().display());
    Ok(())
}

/// Reads a vocabulary list from a JSON file.
pub fn import_vocabulary<P: AsRef<Path>>(path: P) -> Result<VocabularyList> {
    let mut file = File::open(&path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let list: VocabularyList = serde_json::from_str(&contents)?;

    info!(
        "Vocabulary list '{}' read from '{}' ({} items)",
        list.name,
        path.as_ref().display(),
        list.items.len()
    );
    Ok(list)
}
