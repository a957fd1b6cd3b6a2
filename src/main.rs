mod builder;
mod clock;
mod config;
mod domain;
mod editor;
mod error;
mod history;
mod logging;
mod report;
mod storage;
mod terminal;
mod time_input;
mod ui;

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use tracing::{error, info};

use crate::builder::{EntryDraft, add_entry};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, config_path, load_config, resolve_database_path, save_config};
use crate::editor::{EntryEdit, FieldChange, edit_entry};
use crate::error::TrackError;
use crate::history::locate;
use crate::logging::enable_logging;
use crate::report::{ReportQuery, Selection, build_report, days_back_window, resolve_window};
use crate::storage::{load_database, save_database};
use crate::terminal::{TerminalWidth, WidthProbe, resolve_width};
use crate::ui::{Detail, describe_added, render_categories, render_entry_detail, render_report};

#[derive(Debug, Parser)]
#[command(name = "punchcard", version, about = "Checkpoint-based time tracker")]
struct Cli {
	#[arg(long, global = true, help = "Database file to use instead of the configured one")]
	database: Option<PathBuf>,
	#[arg(long, global = true, help = "Print debug logging to stderr")]
	log: bool,
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	#[command(about = "Create a category that entries can be filed under")]
	AddCategory {
		#[arg(short, long, help = "Display name")]
		long: String,
		#[arg(short, long, help = "Short code used on the command line")]
		short: String,
	},
	#[command(about = "List categories")]
	Categories,
	#[command(about = "Add a checkpoint; leave out the message to mark untracked time")]
	Add {
		message: Option<String>,
		category: Option<String>,
		#[arg(short, long, help = "now, HH:MM, YYYY-MM-DD or \"YYYY-MM-DD HH:MM\"")]
		time: Option<String>,
	},
	#[command(about = "Print every field of one entry")]
	Show {
		#[arg(default_value_t = 1, help = "How far back, 1 being the last entry added")]
		index: usize,
	},
	#[command(about = "Report entries and tracked time")]
	Log {
		#[arg(
			conflicts_with_all = ["from", "to", "days", "back"],
			help = "Report the last N entries instead of a time window"
		)]
		index_start: Option<usize>,
		#[arg(long, help = "Start of the window, defaults to today")]
		from: Option<String>,
		#[arg(long, help = "End of the window; a bare date includes that whole day")]
		to: Option<String>,
		#[arg(
			short,
			long,
			conflicts_with_all = ["from", "to"],
			help = "Also include this many days before the last day"
		)]
		days: Option<u32>,
		#[arg(
			short,
			long,
			conflicts_with_all = ["from", "to"],
			help = "End the window this many days before today"
		)]
		back: Option<u32>,
		#[arg(short, long, help = "Only show entries of this category")]
		category: Option<String>,
		#[arg(short, long, action = ArgAction::Count, help = "-v totals, -vv daily totals, default full table")]
		verbose: u8,
		#[arg(short, long, help = "Maximum line width, defaults to the terminal width")]
		width: Option<usize>,
	},
	#[command(about = "Change an existing entry")]
	Edit {
		#[arg(default_value_t = 1, help = "How far back, 1 being the last entry added")]
		index: usize,
		#[arg(short, long, conflicts_with = "no_message")]
		message: Option<String>,
		#[arg(long, help = "Turn the entry into a marker")]
		no_message: bool,
		#[arg(short, long, help = "now, HH:MM, YYYY-MM-DD or \"YYYY-MM-DD HH:MM\"")]
		time: Option<String>,
		#[arg(short, long, conflicts_with = "clear_category")]
		category: Option<String>,
		#[arg(long)]
		clear_category: bool,
	},
	#[command(about = "Show or change the configuration")]
	Config {
		#[arg(short, long, value_name = "FILE", help = "Store this database path")]
		path: Option<PathBuf>,
		#[arg(long, help = "Report width when no terminal is attached")]
		fallback_width: Option<usize>,
	},
}

/// Collaborators the commands read from instead of the real world.
struct Environment<'a> {
	clock: &'a dyn Clock,
	width: &'a dyn WidthProbe,
}

fn main() {
	let cli = Cli::parse();
	if let Err(err) = enable_logging(cli.log) {
		eprintln!("warning: failed to enable logging: {err:#}");
	}

	let environment = Environment {
		clock: &SystemClock,
		width: &TerminalWidth,
	};

	match run(cli, &environment) {
		Ok(lines) => {
			for line in lines {
				println!("{line}");
			}
		}
		Err(err) => {
			error!("{err}");
			eprintln!("error: {err}");
			std::process::exit(err.exit_code());
		}
	}
}

fn run(cli: Cli, environment: &Environment) -> Result<Vec<String>, TrackError> {
	let config_file = config_path();
	let config = load_config(&config_file)?;

	if let Command::Config {
		path,
		fallback_width,
	} = cli.command
	{
		return configure(&config_file, config, path, fallback_width);
	}

	let database_path = resolve_database_path(cli.database, &config);
	run_command(cli.command, &database_path, &config, environment)
}

/// One load, at most one mutation, at most one save. Any error returns before
/// the save, so the document on disk is left as it was.
fn run_command(
	command: Command,
	path: &Path,
	config: &Config,
	environment: &Environment,
) -> Result<Vec<String>, TrackError> {
	let mut database = load_database(path)?;
	info!(path = %path.display(), entries = database.entries.len(), "loaded database");

	match command {
		Command::AddCategory { long, short } => {
			let id = database.add_category(long, short.clone())?;
			save_database(path, &database)?;
			Ok(vec![format!("created category {id} ({short})")])
		}
		Command::Categories => Ok(render_categories(&database)),
		Command::Add {
			message,
			category,
			time,
		} => {
			let draft = EntryDraft {
				message,
				category,
				time,
			};
			let position = add_entry(&mut database, draft, environment.clock)?;
			save_database(path, &database)?;
			Ok(vec![describe_added(&database, position)])
		}
		Command::Show { index } => {
			let (position, _) = locate(&database, index)?;
			Ok(render_entry_detail(&database, index, position))
		}
		Command::Log {
			index_start,
			from,
			to,
			days,
			back,
			category,
			verbose,
			width,
		} => {
			let selection = match index_start {
				Some(count) => Selection::Recent(count),
				None if days.is_some() || back.is_some() => {
					let (start, end) = days_back_window(
						days.unwrap_or(0),
						back.unwrap_or(0),
						environment.clock.now(),
					);
					Selection::Window { start, end }
				}
				None => {
					let (start, end) =
						resolve_window(from.as_deref(), to.as_deref(), environment.clock.now())?;
					Selection::Window { start, end }
				}
			};
			let report = build_report(&database, &ReportQuery { selection, category })?;
			let width = resolve_width(width, environment.width, config.fallback_width());
			Ok(render_report(&report, Detail::from_verbosity(verbose), width))
		}
		Command::Edit {
			index,
			message,
			no_message,
			time,
			category,
			clear_category,
		} => {
			locate(&database, index)?;
			let edit = EntryEdit {
				message: field_change(message, no_message),
				time,
				category: field_change(category, clear_category),
			};
			if edit.is_empty() {
				return Ok(vec!["nothing to change".to_string()]);
			}

			let position = edit_entry(&mut database, index, edit, environment.clock)?;
			save_database(path, &database)?;
			let mut lines = vec![format!("edited entry {index}")];
			lines.extend(render_entry_detail(&database, index, position));
			Ok(lines)
		}
		Command::Config { .. } => Ok(Vec::new()),
	}
}

fn field_change(value: Option<String>, clear: bool) -> FieldChange<String> {
	match (value, clear) {
		(Some(value), _) => FieldChange::Set(value),
		(None, true) => FieldChange::Clear,
		(None, false) => FieldChange::Keep,
	}
}

fn configure(
	config_file: &Path,
	mut config: Config,
	path: Option<PathBuf>,
	fallback_width: Option<usize>,
) -> Result<Vec<String>, TrackError> {
	let changed = path.is_some() || fallback_width.is_some();
	if let Some(path) = path {
		config.database_path = Some(resolve_database_path(Some(path), &Config::default()));
	}
	if let Some(width) = fallback_width {
		config.fallback_width = Some(width);
	}
	if changed {
		save_config(config_file, &config)?;
	}

	Ok(vec![
		format!("config file: {}", config_file.display()),
		format!(
			"database: {}",
			resolve_database_path(None, &config).display()
		),
		format!("fallback width: {}", config.fallback_width()),
	])
}
