//! Weekly and monthly period aggregation.
//!
//! Creation and closure are tallied in two independent passes: a ticket counts
//! as `created` in the period of its creation date and as `resolved` in the
//! period of its closure date, and a period exists as soon as either pass
//! lands in it.

use std::collections::HashMap;

use serde::Serialize;
use time::formatting::Formattable;
use time::macros::format_description;
use time::Date;

use crate::classify::{month_end, month_start, week_end, week_start};
use crate::links::issue_query_link;
use crate::ticket::Ticket;

time::serde::format_description!(calendar_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Weekly,
    Monthly,
}

impl Granularity {
    pub const ALL: [Self; 2] = [Self::Weekly, Self::Monthly];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Bucket key for `date`: the Monday of its week or the first of its month.
    #[must_use]
    pub fn period_start(self, date: Date) -> Date {
        match self {
            Self::Weekly => week_start(date),
            Self::Monthly => month_start(date),
        }
    }

    #[must_use]
    pub fn window(self, start: Date) -> PeriodWindow {
        match self {
            Self::Weekly => PeriodWindow::Week { week_start: start, week_end: week_end(start) },
            Self::Monthly => PeriodWindow::Month {
                month: render(start, format_description!("[year]-[month]")),
                month_start: start,
                month_end: month_end(start),
            },
        }
    }
}

/// Inclusive boundaries of one bucket, serialized under granularity-specific
/// field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PeriodWindow {
    Week {
        #[serde(with = "calendar_date")]
        week_start: Date,
        #[serde(with = "calendar_date")]
        week_end: Date,
    },
    Month {
        month: String,
        #[serde(with = "calendar_date")]
        month_start: Date,
        #[serde(with = "calendar_date")]
        month_end: Date,
    },
}

impl PeriodWindow {
    #[must_use]
    pub fn start(&self) -> Date {
        match self {
            Self::Week { week_start, .. } => *week_start,
            Self::Month { month_start, .. } => *month_start,
        }
    }

    /// `29 Sep 2025 - 05 Oct 2025` for weeks, `Sep 2025` for months.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Week { week_start, week_end } => {
                format!("{} - {}", day_label(*week_start), day_label(*week_end))
            }
            Self::Month { month_start, .. } => {
                render(*month_start, format_description!("[month repr:short] [year]"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketLinks {
    pub created: String,
    pub resolved: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodBucket {
    #[serde(flatten)]
    pub window: PeriodWindow,
    pub label: String,
    pub created: u64,
    pub resolved: u64,
    pub jira_links: BucketLinks,
    /// Running `created - resolved` over this and every earlier bucket.
    pub cumulative: i64,
}

#[derive(Debug, Default)]
struct Tally<'a> {
    created: u64,
    resolved: u64,
    created_keys: Vec<&'a str>,
    resolved_keys: Vec<&'a str>,
}

fn render(date: Date, layout: &(impl Formattable + ?Sized)) -> String {
    // layouts here only name calendar components, which a `Date` always has
    date.format(layout).unwrap_or_default()
}

/// `2025-09-29`
#[must_use]
pub fn iso_date(date: Date) -> String {
    render(date, format_description!("[year]-[month]-[day]"))
}

fn day_label(date: Date) -> String {
    render(date, format_description!("[day] [month repr:short] [year]"))
}

fn signed(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Aggregate `tickets` into chronologically ordered buckets with query links
/// and running cumulative totals. An empty input yields no buckets.
#[must_use]
pub fn aggregate(
    tickets: &[&Ticket],
    granularity: Granularity,
    link_base_url: &str,
) -> Vec<PeriodBucket> {
    let mut tallies: HashMap<Date, Tally<'_>> = HashMap::new();

    for ticket in tickets {
        let tally = tallies.entry(granularity.period_start(ticket.created)).or_default();
        tally.created += 1;
        if !ticket.issue_key.is_empty() {
            tally.created_keys.push(&ticket.issue_key);
        }
    }

    for ticket in tickets {
        let Some(closure) = ticket.closure else {
            continue;
        };
        let tally = tallies.entry(granularity.period_start(closure)).or_default();
        tally.resolved += 1;
        if !ticket.issue_key.is_empty() {
            tally.resolved_keys.push(&ticket.issue_key);
        }
    }

    let mut ordered = tallies.into_iter().collect::<Vec<_>>();
    ordered.sort_by_key(|(start, _)| *start);

    let mut cumulative = 0_i64;
    ordered
        .into_iter()
        .map(|(start, tally)| {
            cumulative += signed(tally.created) - signed(tally.resolved);
            let window = granularity.window(start);
            PeriodBucket {
                label: window.label(),
                window,
                created: tally.created,
                resolved: tally.resolved,
                jira_links: BucketLinks {
                    created: issue_query_link(link_base_url, tally.created_keys),
                    resolved: issue_query_link(link_base_url, tally.resolved_keys),
                },
                cumulative,
            }
        })
        .collect()
}
