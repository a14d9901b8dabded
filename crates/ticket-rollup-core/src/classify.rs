//! Pure predicates and calendar keys over canonical tickets.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use time::{Date, Duration, Month};

use crate::ticket::Ticket;

static NAMED_SEGMENT: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?i)one\s+albania").ok());

/// Case-insensitive `one <whitespace> albania` anywhere in the label.
#[must_use]
pub fn is_named_segment(label: &str) -> bool {
    NAMED_SEGMENT.as_ref().is_some_and(|pattern| pattern.is_match(label))
}

/// Monday on or before `date`.
#[must_use]
pub fn week_start(date: Date) -> Date {
    let offset = i64::from(date.weekday().number_days_from_monday());
    date.checked_sub(Duration::days(offset)).unwrap_or(Date::MIN)
}

#[must_use]
pub fn week_end(start: Date) -> Date {
    start.checked_add(Duration::days(6)).unwrap_or(Date::MAX)
}

#[must_use]
pub fn month_start(date: Date) -> Date {
    date.replace_day(1).unwrap_or(date)
}

/// Last calendar day of the month containing `date`.
#[must_use]
pub fn month_end(date: Date) -> Date {
    let (year, month) = match date.month() {
        Month::December => (date.year() + 1, Month::January),
        month => (date.year(), month.next()),
    };
    Date::from_calendar_date(year, month, 1).ok().and_then(Date::previous_day).unwrap_or(Date::MAX)
}

#[must_use]
pub fn quarter(date: Date) -> u8 {
    (u8::from(date.month()) - 1) / 3 + 1
}

/// Ticket subsets that get their own artifacts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    All,
    /// Original label matches [`is_named_segment`].
    Named,
    /// Original label does not match [`is_named_segment`]; includes tickets
    /// without a customer.
    Complement,
    /// Exact match on the cleaned display name.
    Customer(String),
}

impl Segment {
    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        match self {
            Self::All => true,
            Self::Named => is_named_segment(&ticket.customer_raw),
            Self::Complement => !is_named_segment(&ticket.customer_raw),
            Self::Customer(name) => ticket.customer_display == *name,
        }
    }

    /// Value of the `customer` field in a period artifact.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Named => "one-albania",
            Self::Complement => "rest-of-world",
            Self::Customer(name) => name,
        }
    }
}
