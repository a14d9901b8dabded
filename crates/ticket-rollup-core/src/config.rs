use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::RollupError;

pub const DEFAULT_INPUT: &str = "ticket-list-export.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const DEFAULT_LINK_BASE_URL: &str = "https://psskyvera.atlassian.net/issues/?jql=";

/// Year/quarter window used to rank customers in the metadata roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RankingWindow {
    pub year: i32,
    pub quarters: Vec<u8>,
}

impl Default for RankingWindow {
    fn default() -> Self {
        Self { year: 2025, quarters: vec![3, 4] }
    }
}

impl RankingWindow {
    /// # Errors
    /// Returns [`RollupError::Config`] when no quarter is given or a quarter is
    /// outside `1..=4`.
    pub fn validate(&self) -> Result<(), RollupError> {
        if self.quarters.is_empty() {
            return Err(RollupError::Config("ranking window has no quarters".to_string()));
        }
        if let Some(bad) = self.quarters.iter().find(|quarter| !(1..=4).contains(*quarter)) {
            return Err(RollupError::Config(format!("ranking quarter {bad} is outside 1..=4")));
        }
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, year: i32, quarter: u8) -> bool {
        self.year == year && self.quarters.contains(&quarter)
    }

    /// Metadata key carrying the per-customer counts, e.g.
    /// `customer_ticket_counts_q3_q4_2025`.
    #[must_use]
    pub fn counts_key(&self) -> String {
        let mut quarters = self.quarters.clone();
        quarters.sort_unstable();
        quarters.dedup();
        let quarters =
            quarters.iter().map(|quarter| format!("q{quarter}")).collect::<Vec<_>>().join("_");
        format!("customer_ticket_counts_{quarters}_{}", self.year)
    }
}

/// Header names of the export columns the engine reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ColumnMap {
    pub created: String,
    pub closure: String,
    pub customer: String,
    pub issue_key: String,
    pub summary: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            created: "Created".to_string(),
            closure: "Custom field (Closure Date)".to_string(),
            customer: "Custom field (PS Customer Name)".to_string(),
            issue_key: "Issue key".to_string(),
            summary: "Summary".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RollupConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub ranking: RankingWindow,
    pub link_base_url: String,
    pub columns: ColumnMap,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            ranking: RankingWindow::default(),
            link_base_url: DEFAULT_LINK_BASE_URL.to_string(),
            columns: ColumnMap::default(),
        }
    }
}

impl RollupConfig {
    /// # Errors
    /// Returns [`RollupError::Config`] when the ranking window is invalid or the
    /// link endpoint is empty.
    pub fn validate(&self) -> Result<(), RollupError> {
        self.ranking.validate()?;
        if self.link_base_url.trim().is_empty() {
            return Err(RollupError::Config("link_base_url must not be empty".to_string()));
        }
        Ok(())
    }
}
