use crate::domain::{Database, Entry};
use crate::error::TrackError;

/// Storage position of the `index`-th most recent entry, counting from 1 and
/// going by position in the document rather than by timestamp.
pub fn position_for_index(len: usize, index: usize) -> Result<usize, TrackError> {
    if index == 0 || index > len {
        return Err(TrackError::IndexOutOfRange { index, len });
    }
    Ok(len - index)
}

/// Inverse of [`position_for_index`]; what `log` prints next to each row.
pub fn index_for_position(len: usize, position: usize) -> usize {
    len - position
}

pub fn locate(database: &Database, index: usize) -> Result<(usize, &Entry), TrackError> {
    let position = position_for_index(database.entries.len(), index)?;
    Ok((position, &database.entries[position]))
}

pub fn locate_mut(database: &mut Database, index: usize) -> Result<&mut Entry, TrackError> {
    let position = position_for_index(database.entries.len(), index)?;
    Ok(&mut database.entries[position])
}
