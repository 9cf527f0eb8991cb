//! Schema normalization.
//!
//! The boundary between loosely typed ingestion and the rest of the
//! pipeline: every cell becomes trimmed text (or null), duplicate headers
//! are rejected and the required columns are verified before any rule runs.

use std::collections::HashSet;

use arrow::array::RecordBatch;

use crate::{
    dataset::{RawTable, TextDataset},
    error::{Error, Result},
    transform::{ToText, Transform},
};

/// Column layout of a full CPRF delivery extract.
///
/// Only a handful of these are read by the checks; the rest pass through to
/// the exports. Missing ones are reported, not fatal.
pub const EXPECTED_COLUMNS: &[&str] = &[
    "COUNTRYNAME",
    "REGIONNAME",
    "STATENAME",
    "DISTRICTNAME",
    "Community/School",
    "School Type",
    "School UDISE",
    "PROGRAMTYPENAME",
    "PROGRAMSUBTYPENAME",
    "Day Of Session",
    "Group Registration Date",
    "Session Timing",
    "YM NAME",
    "TMO NAME",
    "ProgramLaunchName",
    "FUNDERNAME",
    "ProjectName",
    "ProjectType",
    "GROUPID",
    "Group Status",
    "Child School Name",
    "CHILDID",
    "Intervention Year",
    "CHILDREGNO",
    "DATE OF JOINING",
    "FNAME",
    "MNAME",
    "LNAME",
    "GENDER",
    "ISDOBKNOWN",
    "DATE OF BIRTH",
    "AGE",
    "CHILDGOSCHOOL",
    "SCHOOLTYPENAME",
    "Class Of the Child Attending school",
    "CHILDDROPEDSCHOOL",
    "CLASSCHILDDROPEDSCHOOL",
    "REASONFORDROUPOUT",
    "CHILDDISABILITY",
    "DISABILITYNAME",
    "OTHERS",
    "WASPARTOFMBPROGRAM",
    "PREVIOUSCHILDREGNO",
    "REMARKS",
    "STATUS",
    "GUARDIAN",
    "P_Poverty Line(APL/BPL)",
    "CONTACTTYPE",
    "CONTACTNUMBER",
    "P_Do you Have Document?",
    "DOCUMENTTYPE",
    "DOCUMENTNO",
    "P_FName",
    "P_Age",
    "RELATION",
    "RELIGIONNAME",
    "CASTE",
    "TRIBE",
    "Previous year grade",
    "School Academic Cycle",
    "School HM/Teacher Contact",
    "Child Level",
    "Parent Consent",
];

/// What the normalizer noticed about the source header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    /// Expected extract columns that the source does not have
    pub missing_expected: Vec<String>,
    /// Source columns outside the expected layout (passed through)
    pub extra: Vec<String>,
}

impl SchemaReport {
    /// Returns true if the source matches the expected layout exactly.
    pub fn is_complete(&self) -> bool {
        self.missing_expected.is_empty()
    }
}

/// Coerces a source table to text and checks its columns.
///
/// # Example
///
/// ```
/// use cprf_audit::{RawTable, SchemaNormalizer};
///
/// let raw = RawTable::from_text_rows(["id", "name"], vec![vec!["1", " asha "]]);
/// let (dataset, _report) = SchemaNormalizer::new(["id"]).normalize_raw(raw).unwrap();
/// assert_eq!(dataset.record(0).unwrap().get("name"), Some("asha"));
/// ```
#[derive(Debug, Clone)]
pub struct SchemaNormalizer {
    required: Vec<String>,
    expected: Vec<String>,
}

impl SchemaNormalizer {
    /// Creates a normalizer that requires the given columns.
    pub fn new<S: Into<String>>(required: impl IntoIterator<Item = S>) -> Self {
        Self {
            required: required.into_iter().map(Into::into).collect(),
            expected: EXPECTED_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    /// Replaces the expected layout used for the missing-column report.
    #[must_use]
    pub fn with_expected<S: Into<String>>(mut self, expected: impl IntoIterator<Item = S>) -> Self {
        self.expected = expected.into_iter().map(Into::into).collect();
        self
    }

    /// Columns that must be present.
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Normalizes a raw table.
    ///
    /// # Errors
    ///
    /// See [`SchemaNormalizer::normalize`].
    pub fn normalize_raw(&self, raw: RawTable) -> Result<(TextDataset, SchemaReport)> {
        self.normalize(raw.into_record_batch()?)
    }

    /// Normalizes an Arrow batch of any column types.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingColumns`] listing every absent required column,
    /// or [`Error::Parse`] for duplicate header names.
    pub fn normalize(&self, batch: RecordBatch) -> Result<(TextDataset, SchemaReport)> {
        let schema = batch.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();

        let mut seen = HashSet::with_capacity(names.len());
        if let Some(dup) = names.iter().find(|name| !seen.insert(**name)) {
            return Err(Error::parse(format!("duplicate column '{}' in header", dup)));
        }

        let missing: Vec<&String> = self
            .required
            .iter()
            .filter(|c| !seen.contains(c.as_str()))
            .collect();
        if !missing.is_empty() {
            return Err(Error::missing_columns(missing.into_iter().cloned()));
        }

        let report = SchemaReport {
            missing_expected: self
                .expected
                .iter()
                .filter(|c| !seen.contains(c.as_str()))
                .cloned()
                .collect(),
            extra: names
                .iter()
                .filter(|name| !self.expected.iter().any(|e| e.as_str() == **name))
                .map(|name| (*name).to_string())
                .collect(),
        };

        if !report.missing_expected.is_empty() {
            tracing::warn!(
                missing = %report.missing_expected.join(", "),
                "source is missing expected extract columns"
            );
        }

        let dataset = TextDataset::from_batch(ToText.apply(batch)?)?;
        tracing::info!(
            rows = dataset.len(),
            columns = names.len(),
            "normalized source extract"
        );
        Ok((dataset, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Cell;

    fn raw(header: &[&str], rows: Vec<Vec<Cell>>) -> RawTable {
        RawTable::new(header.iter().copied(), rows)
    }

    #[test]
    fn test_missing_required_columns_all_reported() {
        let table = raw(&["School UDISE"], vec![]);
        let err = SchemaNormalizer::new(["PROGRAMSUBTYPENAME", "School UDISE", "ProgramLaunchName"])
            .normalize_raw(table)
            .unwrap_err();
        match err {
            Error::MissingColumns { missing } => {
                assert_eq!(missing, vec!["PROGRAMSUBTYPENAME", "ProgramLaunchName"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_column_match_is_case_sensitive() {
        let table = raw(&["school udise"], vec![]);
        let err = SchemaNormalizer::new(["School UDISE"])
            .normalize_raw(table)
            .unwrap_err();
        assert!(matches!(err, Error::MissingColumns { .. }));
    }

    #[test]
    fn test_duplicate_header_rejected() {
        let table = raw(&["a", "a"], vec![]);
        let err = SchemaNormalizer::new(["a"]).normalize_raw(table).unwrap_err();
        assert!(err.to_string().contains("duplicate column 'a'"));
    }

    #[test]
    fn test_cells_trimmed_and_blank_nulled() {
        let table = raw(
            &["a", "b", "c"],
            vec![vec![
                Cell::from("  x  "),
                Cell::from("\t "),
                Cell::Number(42.0),
            ]],
        );
        let (dataset, _) = SchemaNormalizer::new(["a"]).normalize_raw(table).unwrap();
        let record = dataset.record(0).unwrap();
        assert_eq!(record.get("a"), Some("x"));
        assert_eq!(record.get("b"), None);
        assert_eq!(record.get("c"), Some("42"));
    }

    #[test]
    fn test_literal_null_text_is_kept() {
        let table = raw(&["a"], vec![vec![Cell::from("NULL")]]);
        let (dataset, _) = SchemaNormalizer::new(["a"]).normalize_raw(table).unwrap();
        assert_eq!(dataset.record(0).unwrap().get("a"), Some("NULL"));
    }

    #[test]
    fn test_schema_report() {
        let table = raw(&["CASTE", "Extra Column"], vec![]);
        let (_, report) = SchemaNormalizer::new(["CASTE"])
            .with_expected(["CASTE", "TRIBE"])
            .normalize_raw(table)
            .unwrap();
        assert_eq!(report.missing_expected, vec!["TRIBE"]);
        assert_eq!(report.extra, vec!["Extra Column"]);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_full_layout_is_complete() {
        let table = raw(EXPECTED_COLUMNS, vec![]);
        let (dataset, report) = SchemaNormalizer::new(["CASTE"]).normalize_raw(table).unwrap();
        assert!(report.is_complete());
        assert!(report.extra.is_empty());
        assert_eq!(dataset.column_names().len(), EXPECTED_COLUMNS.len());
    }

    #[test]
    fn test_expected_columns_has_no_duplicates() {
        let unique: HashSet<_> = EXPECTED_COLUMNS.iter().collect();
        assert_eq!(unique.len(), EXPECTED_COLUMNS.len());
        assert_eq!(EXPECTED_COLUMNS.len(), 63);
    }
}
