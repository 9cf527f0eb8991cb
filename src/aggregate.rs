//! Roll-up of findings by issue kind and by program.
//!
//! The aggregator partitions flagged records by their program launch name.
//! The partition is total and disjoint: every finding lands in exactly one
//! group, and records without a program name share the `UNSPECIFIED` bucket.

use std::{collections::HashMap, fmt};

use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{
    config::AuditConfig,
    dataset::TextDataset,
    error::{Error, Result},
    quality::{is_null_marker, IssueFinding, IssueKind},
};

/// Label of the bucket for records without a program launch name.
pub const UNSPECIFIED_GROUP: &str = "UNSPECIFIED";

/// Partitioning key of a flagged record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// A named program launch
    Program(String),
    /// The program launch name was missing
    Unspecified,
}

impl GroupKey {
    /// Derives the key from a program launch name cell.
    pub fn from_cell(value: Option<&str>) -> Self {
        match value {
            Some(v) if !is_null_marker(Some(v)) => Self::Program(v.trim().to_string()),
            _ => Self::Unspecified,
        }
    }

    /// Display label of the group.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Program(name) => name,
            Self::Unspecified => UNSPECIFIED_GROUP,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Number of findings per issue kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts([usize; IssueKind::COUNT]);

impl KindCounts {
    /// Count for one kind.
    #[must_use]
    pub fn get(&self, kind: IssueKind) -> usize {
        self.0[kind.index()]
    }

    /// Adds every kind of a finding.
    pub fn record(&mut self, finding: &IssueFinding) {
        for kind in finding.issues.iter() {
            self.0[kind.index()] += 1;
        }
    }

    /// `(kind, count)` pairs in [`IssueKind::ALL`] order, zeros included.
    pub fn iter(&self) -> impl Iterator<Item = (IssueKind, usize)> + '_ {
        IssueKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }
}

impl Serialize for KindCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(IssueKind::COUNT))?;
        for (kind, count) in self.iter() {
            map.serialize_entry(kind.name(), &count)?;
        }
        map.end()
    }
}

/// Findings that share a group key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBucket {
    /// The group key
    pub key: GroupKey,
    /// Findings of the group, in population order
    pub findings: Vec<IssueFinding>,
    /// Per-kind counts within the group
    pub counts: KindCounts,
}

impl GroupBucket {
    /// Number of flagged records in the group.
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Returns true if the group holds no finding.
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Aggregated view of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    population: usize,
    findings: Vec<IssueFinding>,
    kind_counts: KindCounts,
    groups: Vec<GroupBucket>,
}

impl Aggregation {
    /// Size of the audited population.
    pub fn population(&self) -> usize {
        self.population
    }

    /// Number of flagged records.
    pub fn flagged(&self) -> usize {
        self.findings.len()
    }

    /// Returns true if no record was flagged.
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Every finding in population order.
    pub fn findings(&self) -> &[IssueFinding] {
        &self.findings
    }

    /// Per-kind counts over all findings.
    pub fn kind_counts(&self) -> &KindCounts {
        &self.kind_counts
    }

    /// Groups in first-occurrence order.
    pub fn groups(&self) -> &[GroupBucket] {
        &self.groups
    }

    /// Looks up a group by key.
    pub fn group(&self, key: &GroupKey) -> Option<&GroupBucket> {
        self.groups.iter().find(|g| &g.key == key)
    }
}

/// Builds an [`Aggregation`] from findings.
#[derive(Debug, Clone)]
pub struct Aggregator {
    group_column: String,
}

impl Aggregator {
    /// Creates an aggregator grouping on `group_column`.
    pub fn new(group_column: impl Into<String>) -> Self {
        Self {
            group_column: group_column.into(),
        }
    }

    /// Creates an aggregator grouping on the configured program column.
    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.columns.program_launch_name.clone())
    }

    /// The grouping column.
    pub fn group_column(&self) -> &str {
        &self.group_column
    }

    /// Aggregates findings produced from `population`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingColumns`] if the grouping column is absent, or
    /// [`Error::Parse`] if a finding points outside the population.
    pub fn aggregate(
        &self,
        population: &TextDataset,
        findings: Vec<IssueFinding>,
    ) -> Result<Aggregation> {
        let column = population
            .column_index(&self.group_column)
            .ok_or_else(|| Error::missing_columns([self.group_column.as_str()]))?;

        let mut kind_counts = KindCounts::default();
        let mut groups: Vec<GroupBucket> = Vec::new();
        let mut positions: HashMap<GroupKey, usize> = HashMap::new();

        for finding in &findings {
            let record = population.record(finding.index).ok_or_else(|| {
                Error::parse(format!(
                    "finding for row {} is outside the population",
                    finding.index
                ))
            })?;
            let key = GroupKey::from_cell(record.value(column));

            kind_counts.record(finding);
            let pos = *positions.entry(key.clone()).or_insert_with(|| {
                groups.push(GroupBucket {
                    key,
                    findings: Vec::new(),
                    counts: KindCounts::default(),
                });
                groups.len() - 1
            });
            let bucket = &mut groups[pos];
            bucket.counts.record(finding);
            bucket.findings.push(finding.clone());
        }

        tracing::info!(
            flagged = findings.len(),
            groups = groups.len(),
            "aggregated findings"
        );
        Ok(Aggregation {
            population: population.len(),
            findings,
            kind_counts,
            groups,
        })
    }
}
