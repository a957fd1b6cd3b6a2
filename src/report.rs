use std::collections::BTreeMap;

use chrono::{Days, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

use crate::domain::{CategoryId, Database};
use crate::error::TrackError;
use crate::history::{index_for_position, position_for_index};
use crate::time_input::{is_date_only, parse_time_input};

pub const UNCATEGORIZED: &str = "uncategorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Entries whose timestamp is in `[start, end)`.
    Window {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// The `count` most recently appended entries.
    Recent(usize),
}

#[derive(Debug, Clone)]
pub struct ReportQuery {
    pub selection: Selection,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    /// `None` for the first selected entry.
    pub duration: Option<Duration>,
    /// Set when the entry is timestamped before the one preceding it.
    pub out_of_order: bool,
    pub marker: bool,
    pub category_id: Option<CategoryId>,
    pub category: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category_id: Option<CategoryId>,
    pub label: String,
    pub long_name: Option<String>,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub selection: Selection,
    pub rows: Vec<Row>,
    pub by_category: Vec<CategoryTotal>,
    pub by_day: BTreeMap<NaiveDate, Duration>,
    pub total: Duration,
    /// Part of `total` that closes on a marker, time nothing was tracked in.
    pub idle: Duration,
}

impl Report {
    pub fn spans_days(&self) -> bool {
        self.by_day.len() > 1
    }

    pub fn tracked(&self) -> Duration {
        self.total - self.idle
    }
}

/// `[midnight, next midnight)` of `day`.
pub fn day_window(day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = day.and_time(NaiveTime::MIN);
    let end = day
        .checked_add_days(Days::new(1))
        .map(|next| next.and_time(NaiveTime::MIN))
        .unwrap_or(NaiveDateTime::MAX);
    (start, end)
}

/// Turns the optional `--from`/`--to` arguments into a window. A bare date
/// for `--to` includes that whole day; the default is today.
pub fn resolve_window(
    from: Option<&str>,
    to: Option<&str>,
    now: NaiveDateTime,
) -> Result<(NaiveDateTime, NaiveDateTime), TrackError> {
    let (today_start, today_end) = day_window(now.date());

    let end = match to {
        Some(input) if is_date_only(input) => {
            let day = parse_time_input(input, now, today_start)?.date();
            day_window(day).1
        }
        Some(input) => parse_time_input(input, now, now)?,
        None if from.is_some() => today_end.max(now),
        None => today_end,
    };

    let start = match from {
        Some(input) => parse_time_input(input, now, today_start)?,
        None if to.is_some() => {
            let last_minute = end - Duration::minutes(1);
            day_window(last_minute.date()).0
        }
        None => today_start,
    };

    validate_window(start, end)?;
    Ok((start, end))
}

/// Whole days ending `back` days before today, `days` extra days long.
/// `days_back_window(0, 0, now)` is today.
pub fn days_back_window(
    days: u32,
    back: u32,
    now: NaiveDateTime,
) -> (NaiveDateTime, NaiveDateTime) {
    let last_day = now
        .date()
        .checked_sub_days(Days::new(back.into()))
        .unwrap_or(NaiveDate::MIN);
    let first_day = last_day
        .checked_sub_days(Days::new(days.into()))
        .unwrap_or(NaiveDate::MIN);
    (day_window(first_day).0, day_window(last_day).1)
}

pub fn validate_window(start: NaiveDateTime, end: NaiveDateTime) -> Result<(), TrackError> {
    if start >= end {
        return Err(TrackError::InvalidTimeWindow { start, end });
    }
    Ok(())
}

/// Storage positions of the selected entries, in storage order.
pub fn select_positions(
    database: &Database,
    selection: Selection,
) -> Result<Vec<usize>, TrackError> {
    match selection {
        Selection::Window { start, end } => {
            validate_window(start, end)?;
            Ok(database
                .entries
                .iter()
                .enumerate()
                .filter(|(_, entry)| entry.timestamp >= start && entry.timestamp < end)
                .map(|(position, _)| position)
                .collect())
        }
        Selection::Recent(count) => {
            let len = database.entries.len();
            let first = position_for_index(len, count)?;
            Ok((first..len).collect())
        }
    }
}

/// One row per selected entry. Each row's duration runs from the previous
/// selected entry to this one and belongs to this entry's category.
pub fn build_rows(database: &Database, positions: &[usize]) -> Vec<Row> {
    let len = database.entries.len();
    let mut previous: Option<NaiveDateTime> = None;
    let mut rows = Vec::with_capacity(positions.len());

    for &position in positions {
        let entry = &database.entries[position];
        let (duration, out_of_order) = match previous {
            None => (None, false),
            Some(previous) if entry.timestamp < previous => {
                warn!(
                    position,
                    timestamp = %entry.timestamp,
                    "entry is earlier than the one before it, counting zero time"
                );
                (Some(Duration::zero()), true)
            }
            Some(previous) => (Some(entry.timestamp - previous), false),
        };
        previous = Some(entry.timestamp);

        rows.push(Row {
            index: index_for_position(len, position),
            timestamp: entry.timestamp,
            duration,
            out_of_order,
            marker: entry.is_marker(),
            category_id: entry.category_id,
            category: database.category_label(entry.category_id),
            message: entry.message_text().to_string(),
        });
    }

    rows
}

/// Sums per category in order of first appearance. Only rows that carry a
/// duration open a bucket.
pub fn totals_by_category(database: &Database, rows: &[Row]) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    for row in rows {
        let Some(duration) = row.duration else {
            continue;
        };
        match totals
            .iter_mut()
            .find(|total| total.category_id == row.category_id)
        {
            Some(total) => total.duration += duration,
            None => totals.push(CategoryTotal {
                category_id: row.category_id,
                label: match row.category_id {
                    Some(_) => row.category.clone(),
                    None => UNCATEGORIZED.to_string(),
                },
                long_name: row
                    .category_id
                    .and_then(|id| database.category(id))
                    .map(|category| category.long_name.clone()),
                duration,
            }),
        }
    }
    totals
}

pub fn totals_by_day(rows: &[Row]) -> BTreeMap<NaiveDate, Duration> {
    let mut days = BTreeMap::new();
    for row in rows {
        *days
            .entry(row.timestamp.date())
            .or_insert_with(Duration::zero) += row.duration.unwrap_or_else(Duration::zero);
    }
    days
}

pub fn build_report(database: &Database, query: &ReportQuery) -> Result<Report, TrackError> {
    let filter = query
        .category
        .as_deref()
        .map(|short_name| database.resolve_short_name(short_name))
        .transpose()?;

    let positions = select_positions(database, query.selection)?;
    let mut rows = build_rows(database, &positions);
    if let Some(category_id) = filter {
        rows.retain(|row| row.category_id == Some(category_id));
    }

    let by_category = totals_by_category(database, &rows);
    let by_day = totals_by_day(&rows);
    let total = by_category
        .iter()
        .fold(Duration::zero(), |sum, bucket| sum + bucket.duration);
    let idle = rows
        .iter()
        .filter(|row| row.marker)
        .filter_map(|row| row.duration)
        .fold(Duration::zero(), |sum, duration| sum + duration);

    debug!(
        rows = rows.len(),
        categories = by_category.len(),
        "built report"
    );

    Ok(Report {
        selection: query.selection,
        rows,
        by_category,
        by_day,
        total,
        idle,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    use super::{
        ReportQuery, Selection, UNCATEGORIZED, build_report, day_window, days_back_window,
        resolve_window,
    };
    use crate::domain::{Database, Entry};
    use crate::error::TrackError;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn with_categories() -> Database {
        let mut database = Database::new();
        database
            .add_category("Alpha".to_string(), "a".to_string())
            .unwrap();
        database
            .add_category("Beta".to_string(), "b".to_string())
            .unwrap();
        database
    }

    fn entry(timestamp: NaiveDateTime, message: Option<&str>, category: Option<u32>) -> Entry {
        Entry::new(timestamp, message.map(str::to_string), category)
    }

    fn day_query(day: u32) -> ReportQuery {
        let (start, end) = day_window(NaiveDate::from_ymd_opt(2026, 1, day).unwrap());
        ReportQuery {
            selection: Selection::Window { start, end },
            category: None,
        }
    }

    #[test]
    fn attributes_time_to_the_entry_that_closes_it() {
        let mut database = with_categories();
        database.push_entry(entry(at(5, 9, 0), None, Some(1)));
        database.push_entry(entry(at(5, 10, 30), Some("did X"), Some(2)));
        database.push_entry(entry(at(5, 11, 0), Some("did Y"), Some(1)));

        let report = build_report(&database, &day_query(5)).unwrap();
        let durations = report
            .rows
            .iter()
            .map(|row| row.duration)
            .collect::<Vec<_>>();
        assert_eq!(
            durations,
            vec![None, Some(Duration::minutes(90)), Some(Duration::minutes(30))]
        );

        let buckets = report
            .by_category
            .iter()
            .map(|bucket| (bucket.label.as_str(), bucket.duration))
            .collect::<Vec<_>>();
        assert_eq!(
            buckets,
            vec![("b", Duration::minutes(90)), ("a", Duration::minutes(30))]
        );
        assert_eq!(report.total, Duration::minutes(120));
    }

    #[test]
    fn first_entry_of_window_ignores_earlier_entries() {
        let mut database = with_categories();
        database.push_entry(entry(at(4, 17, 0), Some("yesterday"), Some(1)));
        database.push_entry(entry(at(5, 9, 0), Some("start"), Some(1)));
        database.push_entry(entry(at(5, 9, 45), Some("work"), Some(2)));

        let report = build_report(&database, &day_query(5)).unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].duration, None);
        assert_eq!(report.rows[1].duration, Some(Duration::minutes(45)));
        assert_eq!(report.by_category.len(), 1);
    }

    #[test]
    fn empty_window_is_valid_and_empty() {
        let mut database = with_categories();
        database.push_entry(entry(at(4, 9, 0), Some("other day"), Some(1)));

        let report = build_report(&database, &day_query(5)).unwrap();
        assert!(report.rows.is_empty());
        assert!(report.by_category.is_empty());
        assert!(report.by_day.is_empty());
        assert_eq!(report.total, Duration::zero());
    }

    #[test]
    fn window_is_half_open() {
        let mut database = with_categories();
        database.push_entry(entry(at(5, 0, 0), Some("midnight"), None));
        database.push_entry(entry(at(6, 0, 0), Some("next midnight"), None));

        let report = build_report(&database, &day_query(5)).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].message, "midnight");
    }

    #[test]
    fn uncategorized_and_dangling_buckets_keep_first_appearance_order() {
        let mut database = with_categories();
        database.push_entry(entry(at(5, 8, 0), None, None));
        database.push_entry(entry(at(5, 8, 20), Some("mail"), None));
        database.push_entry(entry(at(5, 9, 0), Some("old project"), Some(42)));
        database.push_entry(entry(at(5, 9, 30), Some("alpha"), Some(1)));
        database.push_entry(entry(at(5, 9, 40), Some("more mail"), None));

        let report = build_report(&database, &day_query(5)).unwrap();
        let buckets = report
            .by_category
            .iter()
            .map(|bucket| (bucket.label.as_str(), bucket.duration.num_minutes()))
            .collect::<Vec<_>>();
        assert_eq!(
            buckets,
            vec![(UNCATEGORIZED, 30), ("#42?", 40), ("a", 30)]
        );
        assert_eq!(report.by_category[2].long_name.as_deref(), Some("Alpha"));
        assert_eq!(report.by_category[1].long_name, None);
    }

    #[test]
    fn marker_rows_still_carry_duration() {
        let mut database = with_categories();
        database.push_entry(entry(at(5, 9, 0), Some("start"), Some(1)));
        database.push_entry(entry(at(5, 12, 0), None, None));

        let report = build_report(&database, &day_query(5)).unwrap();
        let marker = &report.rows[1];
        assert!(marker.marker);
        assert_eq!(marker.duration, Some(Duration::hours(3)));
        assert_eq!(report.by_category[0].label, UNCATEGORIZED);
        assert_eq!(report.total, Duration::hours(3));
        assert_eq!(report.idle, Duration::hours(3));
        assert_eq!(report.tracked(), Duration::zero());
    }

    #[test]
    fn tolerates_back_dated_entries() {
        let mut database = with_categories();
        database.push_entry(entry(at(5, 9, 0), Some("start"), Some(1)));
        database.push_entry(entry(at(5, 12, 0), Some("lunch"), Some(1)));
        database.push_entry(entry(at(5, 10, 0), Some("forgot this"), Some(2)));
        database.push_entry(entry(at(5, 10, 30), Some("after"), Some(2)));

        let report = build_report(&database, &day_query(5)).unwrap();
        let back_dated = &report.rows[2];
        assert!(back_dated.out_of_order);
        assert_eq!(back_dated.duration, Some(Duration::zero()));
        assert_eq!(report.rows[3].duration, Some(Duration::minutes(30)));
        assert_eq!(
            report.rows.iter().map(|row| row.index).collect::<Vec<_>>(),
            vec![4, 3, 2, 1]
        );
    }

    #[test]
    fn category_filter_keeps_window_durations() {
        let mut database = with_categories();
        database.push_entry(entry(at(5, 9, 0), None, None));
        database.push_entry(entry(at(5, 10, 0), Some("alpha"), Some(1)));
        database.push_entry(entry(at(5, 10, 15), Some("beta"), Some(2)));

        let query = ReportQuery {
            category: Some("b".to_string()),
            ..day_query(5)
        };
        let report = build_report(&database, &query).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].duration, Some(Duration::minutes(15)));
        assert_eq!(report.total, Duration::minutes(15));

        let unknown = ReportQuery {
            category: Some("zzz".to_string()),
            ..day_query(5)
        };
        assert!(matches!(
            build_report(&database, &unknown),
            Err(TrackError::UnknownCategory(_))
        ));
    }

    #[test]
    fn recent_selection_goes_by_position_across_days() {
        let mut database = with_categories();
        database.push_entry(entry(at(3, 9, 0), Some("old"), Some(1)));
        database.push_entry(entry(at(4, 9, 0), Some("start"), Some(1)));
        database.push_entry(entry(at(5, 9, 0), Some("next day"), Some(2)));

        let query = ReportQuery {
            selection: Selection::Recent(2),
            category: None,
        };
        let report = build_report(&database, &query).unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].index, 2);
        assert_eq!(report.rows[1].duration, Some(Duration::hours(24)));
        assert!(report.spans_days());
        assert_eq!(
            report.by_day.values().copied().collect::<Vec<_>>(),
            vec![Duration::zero(), Duration::hours(24)]
        );

        let too_far = ReportQuery {
            selection: Selection::Recent(4),
            category: None,
        };
        assert!(matches!(
            build_report(&database, &too_far),
            Err(TrackError::IndexOutOfRange { index: 4, len: 3 })
        ));
    }

    #[test]
    fn rejects_inverted_windows() {
        let database = with_categories();
        let query = ReportQuery {
            selection: Selection::Window {
                start: at(5, 12, 0),
                end: at(5, 12, 0),
            },
            category: None,
        };
        assert!(matches!(
            build_report(&database, &query),
            Err(TrackError::InvalidTimeWindow { .. })
        ));
    }

    #[test]
    fn day_ranges_count_back_from_today() {
        let now = at(5, 14, 30);
        assert_eq!(days_back_window(0, 0, now), (at(5, 0, 0), at(6, 0, 0)));
        assert_eq!(days_back_window(0, 1, now), (at(4, 0, 0), at(5, 0, 0)));
        assert_eq!(days_back_window(2, 0, now), (at(3, 0, 0), at(6, 0, 0)));
        assert_eq!(days_back_window(2, 1, now), (at(2, 0, 0), at(5, 0, 0)));

        let mut database = with_categories();
        database.push_entry(entry(at(3, 9, 0), Some("start"), Some(1)));
        database.push_entry(entry(at(4, 9, 0), Some("yesterday"), Some(2)));
        database.push_entry(entry(at(5, 9, 0), Some("today"), Some(1)));
        let (start, end) = days_back_window(1, 1, now);
        let query = ReportQuery {
            selection: Selection::Window { start, end },
            category: None,
        };
        let report = build_report(&database, &query).unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.total, Duration::hours(24));
    }

    #[test]
    fn resolves_window_arguments() {
        let now = at(5, 14, 30);
        assert_eq!(resolve_window(None, None, now).unwrap(), (at(5, 0, 0), at(6, 0, 0)));
        assert_eq!(
            resolve_window(Some("2026-01-02"), Some("2026-01-03"), now).unwrap(),
            (at(2, 0, 0), at(4, 0, 0))
        );
        assert_eq!(
            resolve_window(Some("09:00"), Some("12:00"), now).unwrap(),
            (at(5, 9, 0), at(5, 12, 0))
        );
        assert_eq!(
            resolve_window(None, Some("2026-01-03 10:00"), now).unwrap(),
            (at(3, 0, 0), at(3, 10, 0))
        );
        assert_eq!(
            resolve_window(Some("2026-01-01"), None, now).unwrap(),
            (at(1, 0, 0), at(6, 0, 0))
        );
        assert!(matches!(
            resolve_window(Some("12:00"), Some("09:00"), now),
            Err(TrackError::InvalidTimeWindow { .. })
        ));
    }
}
