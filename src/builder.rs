use chrono::NaiveDateTime;
use tracing::debug;

use crate::clock::{Clock, truncate_to_minute};
use crate::domain::{Database, Entry};
use crate::error::TrackError;
use crate::time_input::parse_time_input;

/// What the user asked `add` to record.
#[derive(Debug, Clone, Default)]
pub struct EntryDraft {
    pub message: Option<String>,
    pub category: Option<String>,
    pub time: Option<String>,
}

/// Builds the entry without touching the database, so a bad category or time
/// leaves the model as it was.
pub fn build_entry(
    database: &Database,
    draft: EntryDraft,
    clock: &dyn Clock,
) -> Result<Entry, TrackError> {
    let category_id = draft
        .category
        .as_deref()
        .map(|short_name| database.resolve_short_name(short_name))
        .transpose()?;
    let timestamp = entry_time(draft.time.as_deref(), clock.now())?;
    Ok(Entry::new(timestamp, draft.message, category_id))
}

/// Builds and appends. Returns the storage position of the new entry.
pub fn add_entry(
    database: &mut Database,
    draft: EntryDraft,
    clock: &dyn Clock,
) -> Result<usize, TrackError> {
    let entry = build_entry(database, draft, clock)?;
    debug!(timestamp = %entry.timestamp, category = ?entry.category_id, "appending entry");
    Ok(database.push_entry(entry))
}

fn entry_time(input: Option<&str>, now: NaiveDateTime) -> Result<NaiveDateTime, TrackError> {
    match input {
        Some(input) => parse_time_input(input, now, now),
        None => Ok(truncate_to_minute(now)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{EntryDraft, add_entry};
    use crate::clock::FixedClock;
    use crate::domain::{Database, Entry};
    use crate::error::TrackError;

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    fn seeded() -> Database {
        let mut database = Database::new();
        database
            .add_category("Client Work".to_string(), "cw".to_string())
            .unwrap();
        database.push_entry(Entry::new(at(12, 0, 0), Some("lunch".to_string()), None));
        database
    }

    #[test]
    fn defaults_to_now_truncated_to_minute() {
        let mut database = seeded();
        let clock = FixedClock(at(14, 7, 42));
        let position = add_entry(&mut database, EntryDraft::default(), &clock).unwrap();
        assert_eq!(position, 1);
        let entry = &database.entries[1];
        assert_eq!(entry.timestamp, at(14, 7, 0));
        assert!(entry.is_marker());
        assert_eq!(entry.category_id, None);
    }

    #[test]
    fn back_dated_entry_is_still_appended_last() {
        let mut database = seeded();
        let before = database.entries.clone();
        let categories = database.categories.clone();
        let draft = EntryDraft {
            message: Some("wrote spec".to_string()),
            category: Some("cw".to_string()),
            time: Some("11:00".to_string()),
        };
        let position = add_entry(&mut database, draft, &FixedClock(at(15, 0, 0))).unwrap();

        assert_eq!(position, database.entries.len() - 1);
        assert_eq!(&database.entries[..1], &before[..]);
        let entry = database.entries.last().unwrap();
        assert_eq!(entry.timestamp, at(11, 0, 0));
        assert_eq!(entry.category_id, Some(1));
        assert_eq!(entry.message.as_deref(), Some("wrote spec"));
        assert_eq!(database.categories, categories);
    }

    #[test]
    fn unknown_category_leaves_model_untouched() {
        let mut database = seeded();
        let before = database.clone();
        let draft = EntryDraft {
            message: Some("x".to_string()),
            category: Some("nope".to_string()),
            time: None,
        };
        let err = add_entry(&mut database, draft, &FixedClock(at(15, 0, 0))).unwrap_err();
        assert!(matches!(err, TrackError::UnknownCategory(_)));
        assert_eq!(database, before);
    }
}
