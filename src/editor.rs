use tracing::debug;

use crate::clock::Clock;
use crate::domain::Database;
use crate::error::TrackError;
use crate::history::{locate, locate_mut};
use crate::time_input::parse_time_input;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldChange<T> {
    #[default]
    Keep,
    Set(T),
    Clear,
}

#[derive(Debug, Clone, Default)]
pub struct EntryEdit {
    pub message: FieldChange<String>,
    pub time: Option<String>,
    pub category: FieldChange<String>,
}

impl EntryEdit {
    pub fn is_empty(&self) -> bool {
        self.message == FieldChange::Keep
            && self.time.is_none()
            && self.category == FieldChange::Keep
    }
}

/// Edits the entry at history `index` in place. Every input is resolved
/// before the entry is touched; the entry keeps its storage position.
pub fn edit_entry(
    database: &mut Database,
    index: usize,
    edit: EntryEdit,
    clock: &dyn Clock,
) -> Result<usize, TrackError> {
    let (position, current) = locate(database, index)?;

    let timestamp = edit
        .time
        .as_deref()
        .map(|input| parse_time_input(input, clock.now(), current.timestamp))
        .transpose()?;
    let category_id = match &edit.category {
        FieldChange::Keep => None,
        FieldChange::Set(short_name) => Some(Some(database.resolve_short_name(short_name)?)),
        FieldChange::Clear => Some(None),
    };

    let entry = locate_mut(database, index)?;
    if let Some(timestamp) = timestamp {
        entry.timestamp = timestamp;
    }
    match edit.message {
        FieldChange::Keep => {}
        FieldChange::Set(message) if !message.is_empty() => entry.message = Some(message),
        FieldChange::Set(_) | FieldChange::Clear => entry.message = None,
    }
    if let Some(category_id) = category_id {
        entry.category_id = category_id;
    }

    debug!(index, position, "edited entry");
    Ok(position)
}
