//! Run summary.
//!
//! The summary is what a caller shows before deciding to export: how many
//! rows came in, how many belonged to the audited population, how many of
//! those were flagged, and the counts per check and per program group.

use std::fmt;

use serde::Serialize;

use crate::{
    aggregate::{Aggregation, GroupKey},
    error::{Error, Result},
    quality::IssueKind,
};

/// Count of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindCount {
    /// The check
    pub kind: IssueKind,
    /// Number of flagged records that tripped it
    pub count: usize,
}

/// Counts of one program group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    /// Group label (`UNSPECIFIED` for missing program names)
    pub group: String,
    /// Whether this is the bucket for missing program names, as opposed to
    /// a program literally called `UNSPECIFIED`
    pub unspecified: bool,
    /// Flagged records in the group
    pub flagged: usize,
    /// Per-check counts within the group, enabled checks only
    pub issues: Vec<KindCount>,
}

impl GroupSummary {
    /// Label for text output; the missing-name bucket is marked so it never
    /// reads like a program called `UNSPECIFIED`.
    pub fn label(&self) -> String {
        if self.unspecified {
            format!("{} (no launch name)", self.group)
        } else {
            self.group.clone()
        }
    }
}

/// Summary of an evaluated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Rows in the ingested extract
    pub total_rows: usize,
    /// Target subtype literal
    pub target_subtype: String,
    /// Rows in the audited population
    pub population: usize,
    /// Flagged records
    pub flagged: usize,
    /// Per-check counts, in configured check order
    pub checks: Vec<KindCount>,
    /// Per-group counts, in first-occurrence order
    pub groups: Vec<GroupSummary>,
}

impl Summary {
    /// Builds a summary from an aggregation.
    pub fn new(
        total_rows: usize,
        target_subtype: impl Into<String>,
        checks: &[IssueKind],
        aggregation: &Aggregation,
    ) -> Self {
        let counts = aggregation.kind_counts();
        let groups = aggregation
            .groups()
            .iter()
            .map(|g| GroupSummary {
                group: g.key.to_string(),
                unspecified: g.key == GroupKey::Unspecified,
                flagged: g.len(),
                issues: checks
                    .iter()
                    .map(|&kind| KindCount {
                        kind,
                        count: g.counts.get(kind),
                    })
                    .collect(),
            })
            .collect();

        Self {
            total_rows,
            target_subtype: target_subtype.into(),
            population: aggregation.population(),
            flagged: aggregation.flagged(),
            checks: checks
                .iter()
                .map(|&kind| KindCount {
                    kind,
                    count: counts.get(kind),
                })
                .collect(),
            groups,
        }
    }

    /// Count for one check; zero for checks that were not run.
    pub fn count(&self, kind: IssueKind) -> usize {
        self.checks
            .iter()
            .find(|c| c.kind == kind)
            .map_or(0, |c| c.count)
    }

    /// Groups ordered by descending flagged count, ties in first-occurrence
    /// order.
    pub fn groups_by_count(&self) -> Vec<&GroupSummary> {
        let mut groups: Vec<&GroupSummary> = self.groups.iter().collect();
        groups.sort_by(|a, b| b.flagged.cmp(&a.flagged));
        groups
    }

    /// Flat `(label, count)` rows: totals, then checks, then groups.
    pub fn rows(&self) -> Vec<(String, usize)> {
        let mut rows = vec![
            ("Rows ingested".to_string(), self.total_rows),
            (format!("Population ({})", self.target_subtype), self.population),
            ("Flagged".to_string(), self.flagged),
        ];
        rows.extend(self.checks.iter().map(|c| (c.kind.name().to_string(), c.count)));
        rows.extend(
            self.groups
                .iter()
                .map(|g| (format!("Group: {}", g.group), g.flagged)),
        );
        rows
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Format(e.to_string()))
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CPRF Data Quality Summary")?;
        writeln!(f, "=========================")?;
        writeln!(f, "Rows ingested: {}", self.total_rows)?;
        writeln!(
            f,
            "Population ({}): {}",
            self.target_subtype, self.population
        )?;
        writeln!(f, "Flagged: {}", self.flagged)?;
        writeln!(f)?;

        writeln!(f, "{:<28} {:>8}", "CHECK", "COUNT")?;
        writeln!(f, "{}", "-".repeat(37))?;
        for c in &self.checks {
            writeln!(f, "{:<28} {:>8}", c.kind.name(), c.count)?;
        }

        if self.groups.is_empty() {
            return Ok(());
        }
        let labels: Vec<String> = self.groups.iter().map(GroupSummary::label).collect();
        let width = labels
            .iter()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
            .max("PROGRAM".len());

        writeln!(f)?;
        writeln!(f, "Programs in order of first appearance:")?;
        writeln!(f, "{:<width$} {:>8}", "PROGRAM", "FLAGGED")?;
        writeln!(f, "{}", "-".repeat(width + 9))?;
        for (g, label) in self.groups.iter().zip(&labels) {
            writeln!(f, "{:<width$} {:>8}", label, g.flagged)?;
        }

        writeln!(f)?;
        writeln!(f, "Programs by flagged count:")?;
        writeln!(f, "{:<width$} {:>8}", "PROGRAM", "FLAGGED")?;
        writeln!(f, "{}", "-".repeat(width + 9))?;
        for g in self.groups_by_count() {
            writeln!(f, "{:<width$} {:>8}", g.label(), g.flagged)?;
        }
        Ok(())
    }
}
