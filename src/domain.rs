use std::collections::HashSet;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::TrackError;

pub type CategoryId = u32;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub long_name: String,
    pub short_name: String,
    /// Keys added by hand that the program does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A checkpoint in the log. The time since the previous checkpoint belongs
/// to this entry's category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(with = "minute_timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entry {
    pub fn new(
        timestamp: NaiveDateTime,
        message: Option<String>,
        category_id: Option<CategoryId>,
    ) -> Self {
        Self {
            timestamp,
            message: message.filter(|message| !message.is_empty()),
            category_id,
            extra: Map::new(),
        }
    }

    /// Markers say nothing was tracked since the previous entry.
    pub fn is_marker(&self) -> bool {
        self.message
            .as_deref()
            .is_none_or(|message| message.is_empty())
    }

    pub fn message_text(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub categories: Vec<Category>,
    pub entries: Vec<Entry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_category_id: Option<CategoryId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for category in &self.categories {
            if !seen.insert(category.id) {
                return Err(format!("duplicate category id {}", category.id));
            }
        }
        Ok(())
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn resolve_short_name(&self, short_name: &str) -> Result<CategoryId, TrackError> {
        resolve_short_name(&self.categories, short_name)
    }

    /// Short name for display, with a fallback for ids whose category was
    /// removed from the document by hand.
    pub fn category_label(&self, id: Option<CategoryId>) -> String {
        match id {
            None => "-".to_string(),
            Some(id) => self
                .category(id)
                .map(|category| category.short_name.clone())
                .unwrap_or_else(|| format!("#{id}?")),
        }
    }

    pub fn add_category(
        &mut self,
        long_name: String,
        short_name: String,
    ) -> Result<CategoryId, TrackError> {
        if self
            .categories
            .iter()
            .any(|category| category.short_name == short_name)
        {
            return Err(TrackError::DuplicateCategory(short_name));
        }

        let id = self.allocate_category_id()?;
        let next = id
            .checked_add(1)
            .ok_or(TrackError::CategoryIdsExhausted)?;
        self.categories.push(Category {
            id,
            long_name,
            short_name,
            extra: Map::new(),
        });
        self.next_category_id = Some(next);
        Ok(id)
    }

    /// Appends regardless of timestamp order and returns the storage position.
    pub fn push_entry(&mut self, entry: Entry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// One past every id seen in categories, entries and the stored counter.
    fn allocate_category_id(&self) -> Result<CategoryId, TrackError> {
        let highest = self
            .categories
            .iter()
            .map(|category| category.id)
            .chain(self.entries.iter().filter_map(|entry| entry.category_id))
            .max();
        let after_highest = match highest {
            Some(id) => id.checked_add(1).ok_or(TrackError::CategoryIdsExhausted)?,
            None => 1,
        };
        Ok(self.next_category_id.unwrap_or(1).max(after_highest))
    }
}

/// Looks a category up by short name. Duplicates can only come from hand
/// edits; the first one in document order wins.
pub fn resolve_short_name(
    categories: &[Category],
    short_name: &str,
) -> Result<CategoryId, TrackError> {
    let mut matches = categories
        .iter()
        .filter(|category| category.short_name == short_name);
    let first = matches
        .next()
        .ok_or_else(|| TrackError::UnknownCategory(short_name.to_string()))?;
    if matches.next().is_some() {
        warn!(short_name, id = first.id, "short name is ambiguous, using first match");
    }
    Ok(first.id)
}

pub fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.num_minutes().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    format!("{hours}h{minutes:02}m")
}

mod minute_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(
        timestamp: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&timestamp.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(D::Error::custom)
    }
}
