//! Ticket rollup engine: turns a flat support-ticket export into weekly and
//! monthly created/resolved series per year and customer segment, written as
//! JSON artifacts for a read-only reporting front-end.

pub mod classify;
pub mod config;
pub mod error;
pub mod fanout;
pub mod ingest;
pub mod links;
pub mod period;
pub mod ranking;
pub mod ticket;

use serde::Serialize;

pub use crate::classify::Segment;
pub use crate::config::{ColumnMap, RankingWindow, RollupConfig};
pub use crate::error::RollupError;
pub use crate::fanout::{
    plan_artifacts, write_artifacts, ArtifactSpec, ArtifactWriter, Metadata, OutputInventory,
    WriteReport, METADATA_FILE,
};
pub use crate::ingest::{read_export, TicketSet};
pub use crate::period::{aggregate, Granularity, PeriodBucket};
pub use crate::ranking::{rank_customers, CustomerRanking};
pub use crate::ticket::{RawRecord, Ticket};

/// Outcome of one complete run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub rows_read: usize,
    pub tickets: usize,
    pub dropped_rows: usize,
    pub customers: usize,
    pub years: Vec<i32>,
    pub artifacts: WriteReport,
}

/// Ingest, rank and plan without writing anything.
///
/// # Errors
/// Returns [`RollupError::Config`] for an invalid configuration and the
/// ingestion errors of [`read_export`].
pub fn load_and_plan(
    config: &RollupConfig,
) -> Result<(TicketSet, CustomerRanking, Vec<ArtifactSpec>), RollupError> {
    config.validate()?;
    let set = read_export(&config.input, &config.columns)?;
    let ranking = rank_customers(&set.tickets, &set.customers, &config.ranking);
    let plan = plan_artifacts(&set.years, &set.customers);
    tracing::info!(
        "generating aggregations for {} years and {} customers",
        set.years.len(),
        set.customers.len()
    );
    Ok((set, ranking, plan))
}

/// Run the whole pipeline: every artifact under `config.output_dir` is
/// rebuilt from `config.input`.
///
/// # Errors
/// Fails when the input is missing or unreadable, the configuration is
/// invalid, or any artifact cannot be written.
pub fn run(config: &RollupConfig) -> Result<RunSummary, RollupError> {
    let (set, ranking, plan) = load_and_plan(config)?;
    let metadata = Metadata::new(&set, &ranking, config.ranking.counts_key());

    let writer = ArtifactWriter::create(&config.output_dir)?;
    let artifacts = write_artifacts(&writer, &set, &metadata, &plan, &config.link_base_url)?;

    Ok(RunSummary {
        rows_read: set.rows_read,
        tickets: set.tickets.len(),
        dropped_rows: set.dropped_rows(),
        customers: set.customers.len(),
        years: set.years.iter().copied().collect(),
        artifacts,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const EXPORT: &str = "\
Issue key,Summary,Created,Custom field (Closure Date),Custom field (PS Customer Name)
PS-10,Alarm storm,28/Sep/25 9:00 AM,03/Oct/25 5:00 PM,Acme Corp [1234]
PS-11,Billing gap,02/Oct/25 8:00 AM,,One Albania [99]
PS-12,Bad row,32/Oct/25 8:00 AM,,Acme Corp [1234]
";

    fn config_in(dir: &std::path::Path) -> RollupConfig {
        let input = dir.join("export.csv");
        fs::write(&input, EXPORT).unwrap_or_else(|err| panic!("write export: {err}"));
        RollupConfig { input, output_dir: dir.join("data"), ..RollupConfig::default() }
    }

    fn read_outputs(config: &RollupConfig) -> Vec<Vec<u8>> {
        [METADATA_FILE, "weekly-2025-all.json", "monthly-2025-Acme_Corp.json"]
            .iter()
            .map(|name| {
                let path = config.output_dir.join(name);
                fs::read(&path).unwrap_or_else(|err| panic!("read {}: {err}", path.display()))
            })
            .collect()
    }

    #[test]
    fn run_writes_complete_artifact_set() {
        let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let config = config_in(dir.path());
        let summary = run(&config).unwrap_or_else(|err| panic!("run failed: {err}"));

        assert_eq!(summary.rows_read, 3);
        assert_eq!(summary.tickets, 2);
        assert_eq!(summary.dropped_rows, 1);
        assert_eq!(summary.years, vec![2025]);
        // metadata + 1 year x 2 granularities x (all, named, complement, Acme Corp)
        assert_eq!(summary.artifacts.files_written, 1 + 2 * 4);
        assert!(config.output_dir.join("weekly-2025-Acme_Corp.json").is_file());
        assert!(config.output_dir.join("monthly-2025-one-albania.json").is_file());
    }

    #[test]
    fn reruns_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let config = config_in(dir.path());

        run(&config).unwrap_or_else(|err| panic!("first run failed: {err}"));
        let first = read_outputs(&config);
        run(&config).unwrap_or_else(|err| panic!("second run failed: {err}"));
        let second = read_outputs(&config);

        assert_eq!(first, second);
    }

    #[test]
    fn invalid_window_fails_before_reading_input() {
        let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let mut config = config_in(dir.path());
        config.ranking.quarters = vec![0];

        assert!(matches!(run(&config), Err(RollupError::Config(_))));
        assert!(!config.output_dir.exists());
    }

    #[test]
    fn missing_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let config = RollupConfig {
            input: dir.path().join("absent.csv"),
            output_dir: dir.path().join("data"),
            ..RollupConfig::default()
        };

        assert!(matches!(run(&config), Err(RollupError::InputMissing { .. })));
        assert!(!config.output_dir.exists());
    }
}
