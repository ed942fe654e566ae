//! Flashcard is a pair <front, back>. Only text is used on either side.
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    /// Database id; `0` for cards that are not persisted yet.
    #[serde(skip)]
    pub id: i64,
    #[serde(alias = "term")]
    pub front: String,
    #[serde(alias = "definition")]
    pub back: String,
}

impl Flashcard {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            id: 0,
            front: front.into(),
            back: back.into(),
        }
    }

    /// Trims both sides; `None` when either side ends up empty.
    pub fn normalized(&self) -> Option<Flashcard> {
        let front = self.front.trim();
        let back = self.back.trim();
        if front.is_empty() || back.is_empty() {
            return None;
        }
        Some(Flashcard {
            id: self.id,
            front: front.to_string(),
            back: back.to_string(),
        })
    }
}
