//! Artifact enumeration and persistence.
//!
//! The artifact set is the product of three independent dimensions: creation
//! year, granularity and segment. [`plan_artifacts`] enumerates it once so the
//! file-naming contract can be checked without running any aggregation.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::classify::{is_named_segment, Segment};
use crate::error::RollupError;
use crate::ingest::TicketSet;
use crate::period::{aggregate, Granularity, PeriodBucket};
use crate::ranking::CustomerRanking;
use crate::ticket::Ticket;

pub const METADATA_FILE: &str = "metadata.json";
pub const MAX_IDENTIFIER_LEN: usize = 50;

/// File-safe identifier for a customer: anything outside `[A-Za-z0-9_-]`
/// becomes `_`, then the result is cut to [`MAX_IDENTIFIER_LEN`] characters.
///
/// Distinct names can map to the same identifier; later artifacts overwrite
/// earlier ones in that case.
#[must_use]
pub fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' { ch } else { '_' })
        .take(MAX_IDENTIFIER_LEN)
        .collect()
}

/// Segments that get artifacts: the three fixed ones, then every customer
/// outside the named segment.
#[must_use]
pub fn fanout_segments(customers: &BTreeSet<String>) -> Vec<Segment> {
    let individual = customers.iter().filter(|customer| !is_named_segment(customer));
    [Segment::All, Segment::Named, Segment::Complement]
        .into_iter()
        .chain(individual.map(|customer| Segment::Customer(customer.clone())))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactSpec {
    pub granularity: Granularity,
    pub year: i32,
    pub segment: Segment,
}

impl ArtifactSpec {
    #[must_use]
    pub fn segment_identifier(&self) -> String {
        match &self.segment {
            Segment::Customer(name) => sanitize_identifier(name),
            fixed => fixed.label().to_string(),
        }
    }

    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}-{}-{}.json", self.granularity.as_str(), self.year, self.segment_identifier())
    }

    /// Tickets created in this artifact's year that belong to its segment.
    #[must_use]
    pub fn select<'a>(&self, tickets: &'a [Ticket]) -> Vec<&'a Ticket> {
        tickets
            .iter()
            .filter(|ticket| ticket.created.year() == self.year && self.segment.matches(ticket))
            .collect()
    }

    #[must_use]
    pub fn render<'a>(&'a self, tickets: &[Ticket], link_base_url: &str) -> PeriodArtifact<'a> {
        PeriodArtifact {
            period: self.granularity,
            year: self.year,
            customer: self.segment.label(),
            data: aggregate(&self.select(tickets), self.granularity, link_base_url),
        }
    }
}

/// years × granularities × segments, in that nesting order.
#[must_use]
pub fn plan_artifacts(years: &BTreeSet<i32>, customers: &BTreeSet<String>) -> Vec<ArtifactSpec> {
    let segments = fanout_segments(customers);
    let mut plan = Vec::with_capacity(years.len() * Granularity::ALL.len() * segments.len());
    for &year in years {
        for granularity in Granularity::ALL {
            for segment in &segments {
                plan.push(ArtifactSpec { granularity, year, segment: segment.clone() });
            }
        }
    }
    plan
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodArtifact<'a> {
    pub period: Granularity,
    pub year: i32,
    pub customer: &'a str,
    pub data: Vec<PeriodBucket>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub customers: Vec<String>,
    pub years: Vec<i32>,
    pub one_albania_customers: Vec<String>,
    pub total_tickets: usize,
    /// Single entry keyed by [`crate::RankingWindow::counts_key`].
    #[serde(flatten)]
    pub ranking_counts: BTreeMap<String, BTreeMap<String, u64>>,
}

impl Metadata {
    #[must_use]
    pub fn new(set: &TicketSet, ranking: &CustomerRanking, counts_key: String) -> Self {
        Self {
            customers: ranking.roster.clone(),
            years: set.years.iter().copied().collect(),
            one_albania_customers: ranking.named_roster.clone(),
            total_tickets: set.tickets.len(),
            ranking_counts: BTreeMap::from([(counts_key, ranking.counts.clone())]),
        }
    }
}

/// Writes pretty-printed JSON documents into one directory, overwriting.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    out_dir: PathBuf,
}

impl ArtifactWriter {
    /// # Errors
    /// Returns [`RollupError::Io`] when the directory cannot be created.
    pub fn create(out_dir: &Path) -> Result<Self, RollupError> {
        fs::create_dir_all(out_dir).map_err(|source| RollupError::io(out_dir, source))?;
        Ok(Self { out_dir: out_dir.to_path_buf() })
    }

    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// # Errors
    /// Returns [`RollupError::Serialize`] or [`RollupError::Io`] when the
    /// document cannot be encoded or written.
    pub fn write<T: Serialize>(
        &self,
        file_name: &str,
        document: &T,
    ) -> Result<PathBuf, RollupError> {
        let path = self.out_dir.join(file_name);
        let body = serde_json::to_vec_pretty(document)
            .map_err(|source| RollupError::Serialize { path: path.clone(), source })?;
        fs::write(&path, body).map_err(|source| RollupError::io(&path, source))?;
        tracing::debug!("generated {}", file_name);
        Ok(path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub metadata_path: PathBuf,
    /// Including `metadata.json`.
    pub files_written: usize,
    pub weekly: usize,
    pub monthly: usize,
}

/// Write `metadata.json` then every planned period artifact.
///
/// # Errors
/// Stops at the first artifact that cannot be written; files already written
/// stay in place.
pub fn write_artifacts(
    writer: &ArtifactWriter,
    set: &TicketSet,
    metadata: &Metadata,
    plan: &[ArtifactSpec],
    link_base_url: &str,
) -> Result<WriteReport, RollupError> {
    let metadata_path = writer.write(METADATA_FILE, metadata)?;
    tracing::info!("generated {}", METADATA_FILE);

    let mut report = WriteReport { metadata_path, files_written: 1, ..WriteReport::default() };
    for spec in plan {
        writer.write(&spec.file_name(), &spec.render(&set.tickets, link_base_url))?;
        report.files_written += 1;
        match spec.granularity {
            Granularity::Weekly => report.weekly += 1,
            Granularity::Monthly => report.monthly += 1,
        }
    }

    tracing::info!(
        "generated {} JSON files in {}",
        report.files_written,
        writer.out_dir().display()
    );
    Ok(report)
}

/// JSON files found in an output directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputInventory {
    pub has_metadata: bool,
    pub json_files: usize,
    pub weekly_files: usize,
    pub monthly_files: usize,
}

impl OutputInventory {
    /// A directory that does not exist yields an empty inventory.
    ///
    /// # Errors
    /// Returns [`RollupError::Io`] when the directory cannot be listed.
    pub fn scan(dir: &Path) -> Result<Self, RollupError> {
        let mut inventory = Self::default();
        if !dir.is_dir() {
            return Ok(inventory);
        }

        let entries = fs::read_dir(dir).map_err(|source| RollupError::io(dir, source))?;
        for entry in entries {
            let entry = entry.map_err(|source| RollupError::io(dir, source))?;
            let path = entry.path();
            let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !is_json {
                continue;
            }
            inventory.json_files += 1;
            if name == METADATA_FILE {
                inventory.has_metadata = true;
            } else if name.starts_with("weekly-") {
                inventory.weekly_files += 1;
            } else if name.starts_with("monthly-") {
                inventory.monthly_files += 1;
            }
        }
        Ok(inventory)
    }
}
