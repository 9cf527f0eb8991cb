//! Rule engine
//!
//! Runs the enabled checks over every record of a population and keeps a
//! finding for each record that trips at least one of them.

use std::fmt;

use serde::{Serialize, Serializer};

use super::checks::IssueKind;
use crate::{
    config::{AuditConfig, ColumnMap},
    dataset::{Record, RowId, TextDataset},
    error::{Error, Result},
};

/// A set of issue kinds, iterated in [`IssueKind::ALL`] order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IssueSet(u8);

impl IssueSet {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Adds a kind to the set.
    pub fn insert(&mut self, kind: IssueKind) {
        self.0 |= 1 << kind.index();
    }

    /// Returns true if the set holds `kind`.
    #[must_use]
    pub fn contains(&self, kind: IssueKind) -> bool {
        self.0 & (1 << kind.index()) != 0
    }

    /// Number of kinds in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns true if no kind is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates over the kinds in the set.
    pub fn iter(&self) -> impl Iterator<Item = IssueKind> + '_ {
        IssueKind::ALL.into_iter().filter(|k| self.contains(*k))
    }
}

impl FromIterator<IssueKind> for IssueSet {
    fn from_iter<I: IntoIterator<Item = IssueKind>>(iter: I) -> Self {
        let mut set = Self::empty();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl fmt::Display for IssueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kind) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(kind.name())?;
        }
        Ok(())
    }
}

impl Serialize for IssueSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// A record that failed one or more checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueFinding {
    /// Identity of the record in the source extract
    #[serde(serialize_with = "serialize_row_id")]
    pub row: RowId,
    /// Position of the record in the audited population
    pub index: usize,
    /// Triggered checks, never empty
    pub issues: IssueSet,
}

fn serialize_row_id<S: Serializer>(row: &RowId, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(row.0 as u64)
}

/// Evaluates the enabled checks against records.
///
/// # Example
///
/// ```
/// use cprf_audit::{quality::RuleEngine, AuditConfig, RawTable, SchemaNormalizer};
///
/// let config = AuditConfig::default();
/// let raw = RawTable::from_text_rows(
///     config.required_columns(),
///     vec![vec!["ADOLOSCENT", "P1", "", "school", "15/06/2010", "9876543210", "GENERAL", "yes"]],
/// );
/// let (dataset, _) = SchemaNormalizer::new(config.required_columns()).normalize_raw(raw).unwrap();
///
/// let findings = RuleEngine::from_config(&config).scan(&dataset).unwrap();
/// assert_eq!(findings.len(), 1);
/// assert_eq!(findings[0].issues.to_string(), "MISSING_UDISE");
/// ```
#[derive(Debug, Clone)]
pub struct RuleEngine {
    columns: ColumnMap,
    checks: Vec<IssueKind>,
}

impl RuleEngine {
    /// Creates an engine running `checks` against the given columns.
    pub fn new(columns: ColumnMap, checks: impl IntoIterator<Item = IssueKind>) -> Self {
        let mut enabled: Vec<IssueKind> = Vec::with_capacity(IssueKind::COUNT);
        for kind in checks {
            if !enabled.contains(&kind) {
                enabled.push(kind);
            }
        }
        Self {
            columns,
            checks: enabled,
        }
    }

    /// Creates an engine from an audit configuration.
    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.columns.clone(), config.checks.iter().copied())
    }

    /// The enabled checks, in evaluation order.
    pub fn checks(&self) -> &[IssueKind] {
        &self.checks
    }

    /// Evaluates every enabled check against one record.
    ///
    /// A column missing from the record reads as a null cell.
    pub fn evaluate(&self, record: &Record<'_>) -> IssueSet {
        self.checks
            .iter()
            .filter(|kind| kind.is_triggered_by(record.get(self.columns.column_for(**kind))))
            .copied()
            .collect()
    }

    /// Runs the checks over a whole population.
    ///
    /// Returns one finding per flagged record, in population order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingColumns`] if a column read by an enabled check
    /// is absent from the dataset.
    pub fn scan(&self, dataset: &TextDataset) -> Result<Vec<IssueFinding>> {
        let mut resolved = Vec::with_capacity(self.checks.len());
        let mut missing = Vec::new();
        for kind in &self.checks {
            let column = self.columns.column_for(*kind);
            match dataset.column_index(column) {
                Some(idx) => resolved.push((*kind, idx)),
                None => missing.push(column.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(Error::missing_columns(missing));
        }

        let findings: Vec<IssueFinding> = dataset
            .records()
            .filter_map(|record| {
                let issues: IssueSet = resolved
                    .iter()
                    .filter(|(kind, idx)| kind.is_triggered_by(record.value(*idx)))
                    .map(|(kind, _)| *kind)
                    .collect();
                (!issues.is_empty()).then(|| IssueFinding {
                    row: record.id(),
                    index: record.index(),
                    issues,
                })
            })
            .collect();

        tracing::info!(
            population = dataset.len(),
            flagged = findings.len(),
            checks = self.checks.len(),
            "evaluated data-quality checks"
        );
        Ok(findings)
    }
}
