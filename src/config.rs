use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TrackError;

const APP_DIR: &str = "punchcard";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "database.json";
pub const DATABASE_ENV: &str = "PUNCHCARD_DATABASE";
const CONFIG_DIR_ENV: &str = "PUNCHCARD_CONFIG_DIR";
pub const DEFAULT_FALLBACK_WIDTH: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub database_path: Option<PathBuf>,
	/// Report width when the terminal cannot be asked.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fallback_width: Option<usize>,
}

impl Config {
	pub fn fallback_width(&self) -> usize {
		self.fallback_width.unwrap_or(DEFAULT_FALLBACK_WIDTH)
	}
}

pub fn load_config(path: &Path) -> Result<Config, TrackError> {
	let raw = match fs::read_to_string(path) {
		Ok(raw) => raw,
		Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Config::default()),
		Err(err) => return Err(TrackError::io(path, err)),
	};

	toml::from_str(&raw)
		.map_err(|err| TrackError::Config(format!("{}: {err}", path.display())))
}

pub fn save_config(path: &Path, config: &Config) -> Result<(), TrackError> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			fs::create_dir_all(parent).map_err(|err| TrackError::io(parent, err))?;
		}
	}

	let raw = toml::to_string_pretty(config)
		.map_err(|err| TrackError::Config(format!("failed to encode config: {err}")))?;
	fs::write(path, raw).map_err(|err| TrackError::io(path, err))
}

/// `--database`, then `PUNCHCARD_DATABASE`, then the config file, then the
/// data directory.
pub fn resolve_database_path(cli_path: Option<PathBuf>, config: &Config) -> PathBuf {
	choose_database_path(
		cli_path,
		env::var_os(DATABASE_ENV),
		config,
		default_database_path(),
	)
}

fn choose_database_path(
	cli_path: Option<PathBuf>,
	env_path: Option<OsString>,
	config: &Config,
	default: PathBuf,
) -> PathBuf {
	let chosen = cli_path
		.or_else(|| {
			env_path
				.filter(|path| !path.is_empty())
				.map(PathBuf::from)
		})
		.or_else(|| config.database_path.clone())
		.unwrap_or(default);
	debug!(path = %chosen.display(), "resolved database path");
	anchor_path(chosen)
}

pub fn config_path() -> PathBuf {
	config_dir().join(CONFIG_FILE)
}

fn config_dir() -> PathBuf {
	if let Some(path) = env::var_os(CONFIG_DIR_ENV) {
		return PathBuf::from(path);
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("APPDATA") {
			return PathBuf::from(path).join(APP_DIR);
		}
	}

	if let Some(path) = env::var_os("XDG_CONFIG_HOME") {
		return PathBuf::from(path).join(APP_DIR);
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path).join(".config").join(APP_DIR);
	}

	PathBuf::from(format!(".{APP_DIR}"))
}

fn default_database_path() -> PathBuf {
	data_dir().join(DATABASE_FILE)
}

fn data_dir() -> PathBuf {
	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("APPDATA") {
			return PathBuf::from(path).join(APP_DIR);
		}
	}

	if let Some(path) = env::var_os("XDG_DATA_HOME") {
		return PathBuf::from(path).join(APP_DIR);
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path)
			.join(".local")
			.join("share")
			.join(APP_DIR);
	}

	PathBuf::from(format!(".{APP_DIR}"))
}

/// Anchors a relative database path at the working directory, following
/// symlinks when the file already exists.
fn anchor_path(path: PathBuf) -> PathBuf {
	let anchored = std::path::absolute(&path).unwrap_or(path);
	fs::canonicalize(&anchored).unwrap_or(anchored)
}
