//! Record normalization: raw export rows into canonical tickets.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use time::macros::format_description;
use time::parsing::Parsed;
use time::Date;

use crate::config::ColumnMap;

static BRACKET_ANNOTATION: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\s*\[.*?\]").ok());

/// One export row, keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    /// Missing columns read as an empty string.
    #[must_use]
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map_or("", String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for RawRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect() }
    }
}

/// Canonical ticket. Every ticket has a creation date; rows without one never
/// become tickets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub created: Date,
    /// Absent while unresolved. No ordering against `created` is enforced.
    pub closure: Option<Date>,
    pub customer_display: String,
    pub customer_raw: String,
    pub issue_key: String,
    pub summary: String,
}

impl Ticket {
    #[must_use]
    pub fn has_customer(&self) -> bool {
        !self.customer_display.is_empty()
    }
}

fn parse_day_month_year(text: &str) -> Result<Date, String> {
    let date_part = text.split(' ').next().unwrap_or_default();
    let layout = format_description!("[day padding:none]/[month repr:short]/[year repr:last_two]");

    let mut parsed = Parsed::new();
    let rest = parsed.parse_items(date_part.as_bytes(), layout).map_err(|err| err.to_string())?;
    if !rest.is_empty() {
        return Err(format!("unexpected trailing text in `{date_part}`"));
    }

    let day = parsed.day().ok_or("missing day")?;
    let month = parsed.month().ok_or("missing month")?;
    let year = 2000 + i32::from(parsed.year_last_two().ok_or("missing year")?);
    Date::from_calendar_date(year, month, day.get()).map_err(|err| err.to_string())
}

/// Parse the export timestamp layout `21/Dec/25 8:54 AM`; the time of day is
/// ignored and the two-digit year is read as `2000 + year`.
///
/// Blank text is "no date". Any other failure is logged and also yields `None`.
#[must_use]
pub fn parse_export_date(text: &str) -> Option<Date> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match parse_day_month_year(text) {
        Ok(date) => Some(date),
        Err(reason) => {
            tracing::warn!("failed to parse date '{}': {}", text, reason);
            None
        }
    }
}

/// Strip every `[...]` annotation (and the whitespace before it) from a
/// customer label.
#[must_use]
pub fn clean_customer_name(label: &str) -> String {
    match BRACKET_ANNOTATION.as_ref() {
        Some(pattern) => pattern.replace_all(label, "").trim().to_string(),
        None => label.trim().to_string(),
    }
}

/// Returns `None` when the row has no parseable creation date.
#[must_use]
pub fn normalize_record(record: &RawRecord, columns: &ColumnMap) -> Option<Ticket> {
    let created = parse_export_date(record.get(&columns.created))?;
    let closure = parse_export_date(record.get(&columns.closure));
    let customer_raw = record.get(&columns.customer).to_string();

    Some(Ticket {
        created,
        closure,
        customer_display: clean_customer_name(&customer_raw),
        customer_raw,
        issue_key: record.get(&columns.issue_key).to_string(),
        summary: record.get(&columns.summary).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use time::Month;

    use super::*;

    fn date(year: i32, month: Month, day: u8) -> Date {
        match Date::from_calendar_date(year, month, day) {
            Ok(date) => date,
            Err(err) => panic!("invalid fixture date: {err}"),
        }
    }

    fn record(created: &str, closure: &str, customer: &str) -> RawRecord {
        let columns = ColumnMap::default();
        [
            (columns.created, created),
            (columns.closure, closure),
            (columns.customer, customer),
            (columns.issue_key, "PS-1"),
            (columns.summary, "VPN down"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn parses_export_layout_with_time_of_day() {
        assert_eq!(parse_export_date("21/Dec/25 8:54 AM"), Some(date(2025, Month::December, 21)));
        assert_eq!(parse_export_date("  3/Mar/24  "), Some(date(2024, Month::March, 3)));
        assert_eq!(parse_export_date("07/Jul/25"), Some(date(2025, Month::July, 7)));
    }

    #[test]
    fn rejects_malformed_dates() {
        assert_eq!(parse_export_date("31/Feb/25 1:00 PM"), None);
        assert_eq!(parse_export_date("12/Foo/25"), None);
        assert_eq!(parse_export_date("12/Dec"), None);
        assert_eq!(parse_export_date("12/Dec/25/01"), None);
        assert_eq!(parse_export_date("12/Dec/2025"), None);
        assert_eq!(parse_export_date("2025-12-01"), None);
        assert_eq!(parse_export_date("xx/Dec/25"), None);
    }

    #[test]
    fn month_abbreviations_are_case_sensitive() {
        assert_eq!(parse_export_date("01/dec/25"), None);
    }

    #[test]
    fn blank_date_is_absent() {
        assert_eq!(parse_export_date(""), None);
        assert_eq!(parse_export_date("   "), None);
    }

    #[test]
    fn cleaning_strips_every_bracket_annotation() {
        assert_eq!(clean_customer_name("Acme Corp [1234]"), "Acme Corp");
        assert_eq!(clean_customer_name("[x] Acme [y] Corp [z]"), "Acme Corp");
        assert_eq!(clean_customer_name("  Plain Name  "), "Plain Name");
        assert_eq!(clean_customer_name("[only]"), "");
    }

    #[test]
    fn normalize_keeps_original_label_next_to_display_name() {
        let raw = record("28/Sep/25 9:00 AM", "03/Oct/25 5:00 PM", "One Albania [99]");
        let Some(ticket) = normalize_record(&raw, &ColumnMap::default()) else {
            panic!("record with a creation date should normalize");
        };
        assert_eq!(ticket.created, date(2025, Month::September, 28));
        assert_eq!(ticket.closure, Some(date(2025, Month::October, 3)));
        assert_eq!(ticket.customer_display, "One Albania");
        assert_eq!(ticket.customer_raw, "One Albania [99]");
        assert_eq!(ticket.issue_key, "PS-1");
        assert_eq!(ticket.summary, "VPN down");
    }

    #[test]
    fn normalize_drops_rows_without_creation_date() {
        let columns = ColumnMap::default();
        assert!(normalize_record(&record("", "03/Oct/25", "Acme"), &columns).is_none());
        assert!(normalize_record(&record("99/Oct/25", "03/Oct/25", "Acme"), &columns).is_none());
    }

    #[test]
    fn unparseable_closure_leaves_ticket_unresolved() {
        let ticket = normalize_record(&record("01/Oct/25", "soon", "Acme"), &ColumnMap::default());
        assert_eq!(ticket.map(|ticket| ticket.closure), Some(None));
    }

    #[test]
    fn closure_before_creation_is_accepted() {
        let columns = ColumnMap::default();
        let ticket = normalize_record(&record("10/Oct/25", "01/Oct/25", "Acme"), &columns);
        assert_eq!(ticket.and_then(|ticket| ticket.closure), Some(date(2025, Month::October, 1)));
    }

    #[test]
    fn missing_columns_read_as_empty() {
        let raw = std::iter::once(("Created", "01/Jan/25")).collect::<RawRecord>();
        let Some(ticket) = normalize_record(&raw, &ColumnMap::default()) else {
            panic!("creation date alone should be enough");
        };
        assert!(!ticket.has_customer());
        assert!(ticket.issue_key.is_empty());
        assert_eq!(ticket.closure, None);
    }
}
