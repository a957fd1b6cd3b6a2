use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Every way a command can fail. Nothing is written to disk once one of
/// these has been produced.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("database {path} is corrupt: {reason}")]
    CorruptDatabase { path: PathBuf, reason: String },

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("a category with short name `{0}` already exists")]
    DuplicateCategory(String),

    #[error("no category ids left to assign")]
    CategoryIdsExhausted,

    #[error("no entry at index {index} (there are {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid time window: {start} is not before {end}")]
    InvalidTimeWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("could not parse time `{input}`: expected now, HH:MM, YYYY-MM-DD or YYYY-MM-DD HH:MM")]
    InvalidTime { input: String },

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),
}

impl TrackError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CorruptDatabase {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit code for scripts. Clap reserves 2 for usage errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            TrackError::Io { .. } | TrackError::Config(_) => 1,
            TrackError::CorruptDatabase { .. } => 3,
            TrackError::UnknownCategory(_) => 4,
            TrackError::IndexOutOfRange { .. } => 5,
            TrackError::InvalidTimeWindow { .. } => 6,
            TrackError::DuplicateCategory(_) => 7,
            TrackError::InvalidTime { .. } => 8,
            TrackError::CategoryIdsExhausted => 9,
        }
    }
}
