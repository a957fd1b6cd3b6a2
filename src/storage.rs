use std::ffi::OsString;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::Database;
use crate::error::TrackError;

pub fn load_database(path: &Path) -> Result<Database, TrackError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no database yet, starting empty");
            return Ok(Database::new());
        }
        Err(err) => return Err(TrackError::io(path, err)),
    };

    if raw.trim().is_empty() {
        return Ok(Database::new());
    }

    parse_database(&raw).map_err(|reason| TrackError::corrupt(path, reason))
}

pub fn parse_database(raw: &str) -> Result<Database, String> {
    let database: Database = serde_json::from_str(raw).map_err(|err| err.to_string())?;
    database.validate()?;
    Ok(database)
}

pub fn render_database(database: &Database) -> Result<String, serde_json::Error> {
    let mut document = serde_json::to_string_pretty(database)?;
    document.push('\n');
    Ok(document)
}

/// Replaces the document through a sibling temporary file and a rename, so a
/// crash never leaves half a document behind. There is no locking: two
/// invocations racing on the same file can still lose one update.
pub fn save_database(path: &Path, database: &Database) -> Result<(), TrackError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| TrackError::io(parent, err))?;
        }
    }

    let document = render_database(database).map_err(|err| TrackError::corrupt(path, err))?;
    let temp_path = temp_path_for(path);

    let mut file = fs::File::create(&temp_path).map_err(|err| TrackError::io(&temp_path, err))?;
    file.write_all(document.as_bytes())
        .map_err(|err| TrackError::io(&temp_path, err))?;
    file.sync_all()
        .map_err(|err| TrackError::io(&temp_path, err))?;
    drop(file);

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(TrackError::io(path, err));
    }

    info!(
        path = %path.display(),
        categories = database.categories.len(),
        entries = database.entries.len(),
        "saved database"
    );
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("database.json"));
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
