use chrono::Duration;

use crate::domain::{Database, format_duration};
use crate::report::{Report, Row, Selection};

const GAP: &str = "  ";
const MAX_CATEGORY_WIDTH: usize = 12;
const TRUNCATION_MARK: char = '~';

/// How much of a report `log` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
	Totals,
	Daily,
	Full,
}

impl Detail {
	pub fn from_verbosity(count: u8) -> Self {
		match count {
			1 => Detail::Totals,
			2 => Detail::Daily,
			_ => Detail::Full,
		}
	}
}

/// Every returned line is at most `width` characters wide.
pub fn render_report(report: &Report, detail: Detail, width: usize) -> Vec<String> {
	let mut lines = vec![selection_heading(report.selection)];

	if detail == Detail::Full {
		lines.push(String::new());
		lines.extend(render_table(report, width));
	}

	if detail == Detail::Daily || (detail == Detail::Full && report.spans_days()) {
		lines.push(String::new());
		lines.push("By day:".to_string());
		for (day, duration) in &report.by_day {
			lines.push(format!(
				"{GAP}{}{GAP}{:>7}",
				day.format("%Y-%m-%d %a"),
				format_duration(*duration)
			));
		}
	}

	lines.push(String::new());
	lines.push("By category:".to_string());
	if report.by_category.is_empty() {
		lines.push(format!("{GAP}no tracked time"));
	}
	let label_width = report
		.by_category
		.iter()
		.map(|bucket| bucket.label.chars().count())
		.max()
		.unwrap_or(0);
	for bucket in &report.by_category {
		let line = format!(
			"{GAP}{:<label_width$}{GAP}{:>7}{GAP}{}",
			bucket.label,
			format_duration(bucket.duration),
			bucket.long_name.as_deref().unwrap_or("")
		);
		lines.push(line);
	}

	lines.push(String::new());
	let mut total = format!("Total: {}", format_duration(report.total));
	if report.idle > Duration::zero() {
		total.push_str(&format!(
			"{GAP}(tracked {}, idle {})",
			format_duration(report.tracked()),
			format_duration(report.idle)
		));
	}
	lines.push(total);

	lines
		.iter()
		.map(|line| fit(line.trim_end(), width))
		.collect()
}

fn selection_heading(selection: Selection) -> String {
	match selection {
		Selection::Window { start, end } => format!(
			"Entries from {} to {}",
			start.format("%Y-%m-%d %H:%M"),
			end.format("%Y-%m-%d %H:%M")
		),
		Selection::Recent(count) => format!("Last {count} entries"),
	}
}

fn render_table(report: &Report, width: usize) -> Vec<String> {
	let time_format = if report.spans_days() {
		"%m-%d %H:%M"
	} else {
		"%H:%M"
	};
	let cells = report
		.rows
		.iter()
		.map(|row| {
			[
				row.index.to_string(),
				row.timestamp.format(time_format).to_string(),
				duration_cell(row),
				truncate(&row.category, MAX_CATEGORY_WIDTH),
			]
		})
		.collect::<Vec<_>>();

	let header = ["#", "Time", "Dur", "Cat"].map(str::to_string);
	let mut widths = header.clone().map(|cell| cell.chars().count());
	for row in &cells {
		for (column_width, cell) in widths.iter_mut().zip(row) {
			*column_width = (*column_width).max(cell.chars().count());
		}
	}
	let fixed = widths.iter().sum::<usize>() + GAP.len() * widths.len();
	let message_width = width.saturating_sub(fixed);

	let mut lines = vec![table_line(&header, &widths, "Message", message_width)];
	let mut current_day = None;
	for (row, cells) in report.rows.iter().zip(&cells) {
		let day = row.timestamp.date();
		if report.spans_days() && current_day != Some(day) {
			lines.push(format!("-- {} --", day.format("%Y-%m-%d %a")));
			current_day = Some(day);
		}
		let message = if row.marker { "" } else { row.message.as_str() };
		lines.push(table_line(cells, &widths, message, message_width));
	}
	lines
}

fn table_line(cells: &[String; 4], widths: &[usize; 4], message: &str, message_width: usize) -> String {
	let [index, time, duration, category] = cells;
	let [index_width, time_width, duration_width, category_width] = *widths;
	format!(
		"{index:>index_width$}{GAP}{time:<time_width$}{GAP}{duration:<duration_width$}{GAP}{category:<category_width$}{GAP}{}",
		truncate(message, message_width)
	)
}

/// `*` marks idle time closed by a marker entry, `!` a back-dated entry.
fn duration_cell(row: &Row) -> String {
	let Some(duration) = row.duration else {
		return String::new();
	};
	let mut cell = format_duration(duration);
	if row.marker {
		cell.push('*');
	}
	if row.out_of_order {
		cell.push('!');
	}
	cell
}

pub fn truncate(text: &str, max: usize) -> String {
	if text.chars().count() <= max {
		return text.to_string();
	}
	if max == 0 {
		return String::new();
	}
	let mut cut = text.chars().take(max - 1).collect::<String>();
	cut.push(TRUNCATION_MARK);
	cut
}

fn fit(line: &str, width: usize) -> String {
	truncate(line, width)
}

pub fn render_categories(database: &Database) -> Vec<String> {
	if database.categories.is_empty() {
		return vec!["no categories yet".to_string()];
	}

	database
		.categories
		.iter()
		.map(|category| {
			format!(
				"{}: {} - {}",
				category.id, category.short_name, category.long_name
			)
		})
		.collect()
}

/// Time since the entry stored just before this one, if it is not later.
pub fn duration_since_previous(database: &Database, position: usize) -> Option<Duration> {
	let previous = database.entries.get(position.checked_sub(1)?)?;
	let current = database.entries.get(position)?;
	let duration = current.timestamp - previous.timestamp;
	(duration >= Duration::zero()).then_some(duration)
}

pub fn render_entry_detail(database: &Database, index: usize, position: usize) -> Vec<String> {
	let Some(entry) = database.entries.get(position) else {
		return Vec::new();
	};

	let duration = duration_since_previous(database, position)
		.map(format_duration)
		.unwrap_or_else(|| "-".to_string());
	let message = if entry.is_marker() {
		"(marker: nothing tracked)".to_string()
	} else {
		entry.message_text().to_string()
	};
	let category = match entry.category_id.and_then(|id| database.category(id)) {
		Some(category) => format!("{} - {}", category.short_name, category.long_name),
		None => database.category_label(entry.category_id),
	};

	[
		("Time", entry.timestamp.format("%Y-%m-%d %H:%M (%a)").to_string()),
		("Duration", duration),
		("Message", message),
		("Category", category),
		("Index", index.to_string()),
	]
	.into_iter()
	.map(|(key, value)| format!("{key:>10}: {value}"))
	.collect()
}

pub fn describe_added(database: &Database, position: usize) -> String {
	let Some(entry) = database.entries.get(position) else {
		return String::new();
	};

	let since = duration_since_previous(database, position)
		.map(|duration| format!(" ({} since previous entry)", format_duration(duration)))
		.unwrap_or_default();
	let message = if entry.is_marker() {
		"(marker)"
	} else {
		entry.message_text()
	};
	format!(
		"added {} {}: {}{}",
		entry.timestamp.format("%Y-%m-%d %H:%M"),
		database.category_label(entry.category_id),
		message,
		since
	)
}
