use thiserror::Error;

/// Every failure the dashboard pipeline can surface to the user.
///
/// None of these are fatal: the session shows the message and keeps going.
#[derive(Debug, Error)]
pub enum DashError {
    #[error("unsupported file format for `{0}` (expected .csv, .xls or .xlsx)")]
    UnsupportedFormat(String),

    #[error("there was an error processing `{filename}`: {reason}")]
    Decode { filename: String, reason: String },

    #[error("column not found: {}", .0.join(", "))]
    ColumnNotFound(Vec<String>),

    #[error("unsupported chart kind `{0}`")]
    UnsupportedChartKind(String),

    #[error("could not build chart: {0}")]
    ChartConstruction(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashError {
    pub(crate) fn decode(filename: &str, reason: impl Into<String>) -> Self {
        DashError::Decode {
            filename: filename.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = DashError> = std::result::Result<T, E>;
