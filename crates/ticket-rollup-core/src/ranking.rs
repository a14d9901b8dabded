use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use crate::classify::{is_named_segment, quarter};
use crate::config::RankingWindow;
use crate::ticket::Ticket;

/// Customer roster ordered for display, plus the counts that ordered it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerRanking {
    /// Every customer, by window count descending then case-insensitive name.
    pub roster: Vec<String>,
    /// Subsequence of `roster` in the named segment.
    pub named_roster: Vec<String>,
    /// Tickets created inside the window, per customer. Customers with none
    /// are absent.
    pub counts: BTreeMap<String, u64>,
}

/// Creation counts per display name for tickets created inside `window`.
#[must_use]
pub fn window_counts(tickets: &[Ticket], window: &RankingWindow) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for ticket in tickets {
        let in_window = window.contains(ticket.created.year(), quarter(ticket.created));
        if !ticket.has_customer() || !in_window {
            continue;
        }
        *counts.entry(ticket.customer_display.clone()).or_insert(0) += 1;
    }
    counts
}

#[must_use]
pub fn rank_customers(
    tickets: &[Ticket],
    customers: &BTreeSet<String>,
    window: &RankingWindow,
) -> CustomerRanking {
    let counts = window_counts(tickets, window);

    let mut roster = customers.iter().cloned().collect::<Vec<_>>();
    roster.sort_by_cached_key(|customer| {
        let count = counts.get(customer).copied().unwrap_or(0);
        (Reverse(count), customer.to_lowercase(), customer.clone())
    });

    let named_roster =
        roster.iter().filter(|customer| is_named_segment(customer)).cloned().collect();

    CustomerRanking { roster, named_roster, counts }
}
