//! Error types for cprf-audit.

use std::path::PathBuf;

/// Result type alias for cprf-audit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while auditing an extract.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        /// The path where the error occurred, if known.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Arrow error during data processing.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// One or more required columns are absent from the source header.
    #[error("Missing required column(s): {}", missing.join(", "))]
    MissingColumns {
        /// Every required column that was not found, in required order.
        missing: Vec<String>,
    },

    /// The run produced no flagged records, so there is nothing to export.
    #[error("No issues found: {population} record(s) checked, none flagged")]
    NoIssuesFound {
        /// Size of the filtered population that was checked.
        population: usize,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Unsupported file format.
    #[error("Unsupported format: {format}")]
    UnsupportedFormat {
        /// The unsupported format name or extension.
        format: String,
    },

    /// The source extract has a header but no usable sheet or rows.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// Parse error in the source extract or configuration.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parse error.
        message: String,
    },

    /// Rendering a report failed.
    #[error("Format error: {0}")]
    Format(String),

    /// Reading or writing a spreadsheet failed.
    #[error("Workbook error: {0}")]
    Workbook(String),

    /// Bundling artifacts into an archive failed.
    #[error("Archive error: {0}")]
    Archive(String),

    /// The persistent run counter could not be read or updated.
    #[error("Run counter error: {message}")]
    Counter {
        /// Description of the counter failure.
        message: String,
    },
}

impl Error {
    /// Create an I/O error with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }

    /// Create an I/O error without path context.
    pub fn io_no_path(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }

    /// Create a missing columns error.
    pub fn missing_columns<S: Into<String>>(missing: impl IntoIterator<Item = S>) -> Self {
        Self::MissingColumns {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a run counter error.
    pub fn counter(message: impl Into<String>) -> Self {
        Self::Counter {
            message: message.into(),
        }
    }

    /// Returns true when this error is the expected "no issues found" outcome
    /// rather than a fault.
    #[must_use]
    pub fn is_no_issues(&self) -> bool {
        matches!(self, Self::NoIssuesFound { .. })
    }
}

impl From<calamine::Error> for Error {
    fn from(err: calamine::Error) -> Self {
        Self::Workbook(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for Error {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Workbook(err.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io(io_err, "/path/to/extract.xlsx");
        assert!(err.to_string().contains("/path/to/extract.xlsx"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_io_error_without_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io_no_path(io_err);
        assert!(err.to_string().contains("None"));
    }

    #[test]
    fn test_missing_columns_lists_every_name() {
        let err = Error::missing_columns(["School UDISE", "ProgramLaunchName"]);
        let msg = err.to_string();
        assert!(msg.contains("School UDISE, ProgramLaunchName"));
        assert!(!err.is_no_issues());
    }

    #[test]
    fn test_no_issues_found() {
        let err = Error::NoIssuesFound { population: 12 };
        assert!(err.is_no_issues());
        assert!(err.to_string().contains("No issues found"));
        assert!(err.to_string().contains("12"));
    }

    #[test]
    fn test_invalid_config() {
        let err = Error::invalid_config("target_subtype must not be empty");
        assert!(err.to_string().contains("target_subtype must not be empty"));
    }

    #[test]
    fn test_unsupported_format() {
        let err = Error::unsupported_format("parquet");
        assert!(err.to_string().contains("parquet"));
    }

    #[test]
    fn test_parse_error() {
        let err = Error::parse("row 4 has 9 cells but the header has 8");
        assert!(err.to_string().contains("row 4"));
    }

    #[test]
    fn test_counter_error() {
        let err = Error::counter("counter file holds 'abc'");
        assert!(err.to_string().contains("Run counter"));
    }

    #[test]
    fn test_empty_dataset() {
        assert!(Error::EmptyDataset.to_string().contains("empty"));
    }
}
