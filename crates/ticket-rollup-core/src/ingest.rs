use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use crate::config::ColumnMap;
use crate::error::RollupError;
use crate::ticket::{normalize_record, RawRecord, Ticket};

/// Canonical tickets of one export plus the customers and years they span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketSet {
    pub tickets: Vec<Ticket>,
    /// Distinct non-empty display names.
    pub customers: BTreeSet<String>,
    /// Distinct creation years.
    pub years: BTreeSet<i32>,
    pub rows_read: usize,
}

impl TicketSet {
    #[must_use]
    pub fn from_tickets(tickets: Vec<Ticket>, rows_read: usize) -> Self {
        let customers = tickets
            .iter()
            .filter(|ticket| ticket.has_customer())
            .map(|ticket| ticket.customer_display.clone())
            .collect();
        let years = tickets.iter().map(|ticket| ticket.created.year()).collect();
        Self { tickets, customers, years, rows_read }
    }

    #[must_use]
    pub fn dropped_rows(&self) -> usize {
        self.rows_read.saturating_sub(self.tickets.len())
    }
}

/// Read and normalize an export from any reader.
///
/// # Errors
/// Returns the underlying [`csv::Error`] when the header or a row cannot be read.
pub fn read_tickets<R: Read>(input: R, columns: &ColumnMap) -> Result<TicketSet, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let headers = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(index, name)| {
            if index == 0 {
                name.trim_start_matches('\u{feff}').to_string()
            } else {
                name.to_string()
            }
        })
        .collect::<Vec<_>>();

    let mut rows_read = 0_usize;
    let mut tickets = Vec::new();
    for row in reader.records() {
        let row = row?;
        rows_read += 1;
        let record = headers
            .iter()
            .zip(row.iter())
            .map(|(name, value)| (name.as_str(), value))
            .collect::<RawRecord>();
        match normalize_record(&record, columns) {
            Some(ticket) => tickets.push(ticket),
            None => tracing::debug!(row = rows_read, "dropping row without a creation date"),
        }
    }

    Ok(TicketSet::from_tickets(tickets, rows_read))
}

/// Read and normalize the export at `path`.
///
/// # Errors
/// Returns [`RollupError::InputMissing`] when `path` does not exist and
/// [`RollupError::Csv`] when the file cannot be opened or parsed.
pub fn read_export(path: &Path, columns: &ColumnMap) -> Result<TicketSet, RollupError> {
    if !path.exists() {
        return Err(RollupError::InputMissing { path: path.to_path_buf() });
    }
    tracing::info!("reading CSV export {}", path.display());

    let file = std::fs::File::open(path).map_err(|source| RollupError::io(path, source))?;
    let set = read_tickets(file, columns)
        .map_err(|source| RollupError::Csv { path: path.to_path_buf(), source })?;

    tracing::info!(
        "processed {} tickets from {} rows ({} dropped)",
        set.tickets.len(),
        set.rows_read,
        set.dropped_rows()
    );
    tracing::info!("found {} unique customers", set.customers.len());
    tracing::info!("found years: {:?}", set.years);
    Ok(set)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const EXPORT: &str = "\
Summary,Issue key,Created,Custom field (PS Customer Name),Custom field (Closure Date)
\"Login fails, again\",PS-1,28/Sep/25 9:00 AM,Acme Corp [1234],03/Oct/25 5:00 PM
Printer jam,PS-2,not a date,Acme Corp [1234],
Slow VPN,PS-3,02/Jan/24 10:00 AM,One Albania [99],
Orphan,PS-4,15/Mar/25 1:00 PM,,
";

    #[test]
    fn reads_rows_by_header_name() {
        let set = match read_tickets(EXPORT.as_bytes(), &ColumnMap::default()) {
            Ok(set) => set,
            Err(err) => panic!("fixture export should parse: {err}"),
        };

        assert_eq!(set.rows_read, 4);
        assert_eq!(set.tickets.len(), 3);
        assert_eq!(set.dropped_rows(), 1);
        assert_eq!(set.tickets[0].summary, "Login fails, again");
        assert_eq!(set.tickets[0].customer_display, "Acme Corp");
        assert!(set.tickets.iter().all(|ticket| ticket.issue_key != "PS-2"));
        assert_eq!(
            set.customers.iter().cloned().collect::<Vec<_>>(),
            vec!["Acme Corp", "One Albania"]
        );
        assert_eq!(set.years.iter().copied().collect::<Vec<_>>(), vec![2024, 2025]);
    }

    #[test]
    fn short_rows_and_byte_order_mark_are_tolerated() {
        let export = "\u{feff}Created,Issue key,Summary\n01/Feb/25,PS-9\n";
        let set = match read_tickets(export.as_bytes(), &ColumnMap::default()) {
            Ok(set) => set,
            Err(err) => panic!("short row should parse: {err}"),
        };
        assert_eq!(set.tickets.len(), 1);
        assert_eq!(set.tickets[0].issue_key, "PS-9");
        assert!(set.tickets[0].summary.is_empty());
    }

    #[test]
    fn repeated_header_uses_last_column() {
        let export = "Created,Summary,Summary\n01/Feb/25,first,second\n";
        let set = match read_tickets(export.as_bytes(), &ColumnMap::default()) {
            Ok(set) => set,
            Err(err) => panic!("export should parse: {err}"),
        };
        assert_eq!(set.tickets[0].summary, "second");
    }

    #[test]
    fn missing_file_is_reported_before_reading() {
        let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let missing = dir.path().join("absent.csv");
        match read_export(&missing, &ColumnMap::default()) {
            Err(RollupError::InputMissing { path }) => assert_eq!(path, missing),
            other => panic!("expected InputMissing, got {other:?}"),
        }
    }

    #[test]
    fn reads_export_from_disk() {
        let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = dir.path().join("export.csv");
        let mut file =
            std::fs::File::create(&path).unwrap_or_else(|err| panic!("create export: {err}"));
        file.write_all(EXPORT.as_bytes()).unwrap_or_else(|err| panic!("write export: {err}"));
        drop(file);

        let set = read_export(&path, &ColumnMap::default())
            .unwrap_or_else(|err| panic!("export should load: {err}"));
        assert_eq!(set.tickets.len(), 3);
    }
}
