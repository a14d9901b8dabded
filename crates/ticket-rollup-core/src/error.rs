use std::path::PathBuf;

/// Failures that abort a rollup run.
///
/// Record-level problems (an unparseable date on one row) are not represented
/// here: they are logged and the row is dropped or its closure left absent.
#[derive(Debug, thiserror::Error)]
pub enum RollupError {
    #[error("input file not found: {}", path.display())]
    InputMissing { path: PathBuf },
    #[error("failed to read CSV export {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize artifact {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("configuration error: {0}")]
    Config(String),
}

impl RollupError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
