//! Vocabulary items are the pool review cards are materialized from.
//! Only text is used in terms and definitions.
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VocabularyItem {
    /// Assigned by the store when missing from an imported file
    #[serde(default)]
    pub id: String,
    pub term: String,
    pub definition: String,
}

/// A named word list, the JSON import format
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VocabularyList {
    pub name: String,
    pub items: Vec<VocabularyItem>,
}

impl Default for VocabularyList {
    fn default() -> Self {
        Self {
            name: "My Vocabulary".to_string(),
            items: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_without_id_deserializes() {
        let item: VocabularyItem =
            serde_json::from_str(r#"{"term": "你好", "definition": "xin chào"}"#).unwrap();

        assert_eq!(item.id, "");
        assert_eq!(item.term, "你好");
        assert_eq!(item.definition, "xin chào");
    }

    #[test]
    fn test_default_list_is_empty() {
        let list = VocabularyList::default();
        assert_eq!(list.name, "My Vocabulary");
        assert!(list.items.is_empty());
    }
}
