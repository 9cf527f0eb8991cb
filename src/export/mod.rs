//! Export artifact assembly.
//!
//! Renders the flagged records into one combined table plus one table per
//! program group, encodes each as an xlsx workbook with a provenance footer
//! and bundles everything into a single archive.
//!
//! # Example
//!
//! ```
//! use cprf_audit::export::safe_filename;
//!
//! assert_eq!(safe_filename("Launch 2024 / Phase:1"), "Launch_2024___Phase_1");
//! assert_eq!(safe_filename("   "), "UnknownProgramLaunch");
//! ```

mod bundle;
mod xlsx;

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use regex::Regex;

pub use bundle::{Bundler, ZipBundler};
pub use xlsx::{encode_sheet, SHEET_NAME};

use crate::{
    aggregate::{Aggregation, GroupKey},
    config::AuditConfig,
    dataset::TextDataset,
    error::{Error, Result},
    quality::{IssueFinding, IssueKind},
};

/// Header of the column listing the triggered checks.
pub const ISSUES_COLUMN: &str = "Issues";

/// File stem used when a program name sanitizes to nothing.
pub const UNKNOWN_PROGRAM_STEM: &str = "UnknownProgramLaunch";

/// Longest file stem derived from a program name.
pub const MAX_STEM_LEN: usize = 150;

/// Provenance footer appended to every artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    /// When the artifacts were generated
    pub generated_at: NaiveDateTime,
    /// Checks that were applied, in configured order
    pub checks: Vec<IssueKind>,
    /// Application version label
    pub version: String,
    /// Run ordinal from the run counter
    pub run: u64,
}

impl Footer {
    /// Label/value rows in rendering order.
    pub fn rows(&self) -> Vec<(String, String)> {
        vec![
            (
                "Generated at".to_string(),
                self.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
            (
                "Checks applied".to_string(),
                self.checks
                    .iter()
                    .map(IssueKind::name)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            (
                "Version".to_string(),
                format!("{} (run #{})", self.version, self.run),
            ),
        ]
    }
}

/// What an artifact covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactScope {
    /// Every flagged record
    All,
    /// The flagged records of one group
    Group(GroupKey),
}

/// A rendered table, before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTable {
    /// Column headers: source columns then [`ISSUES_COLUMN`]
    pub header: Vec<String>,
    /// One row per flagged record
    pub rows: Vec<Vec<String>>,
    /// Footer label/value pairs
    pub footer: Vec<(String, String)>,
}

/// A named, encoded artifact.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    /// File name
    pub name: String,
    /// Records covered
    pub scope: ArtifactScope,
    /// Rendered table
    pub table: SheetTable,
    /// Encoded xlsx bytes
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Number of flagged records in the artifact.
    pub fn row_count(&self) -> usize {
        self.table.rows.len()
    }
}

/// Every artifact of a run plus the bundle holding them.
#[derive(Debug, Clone)]
pub struct ExportBundle {
    /// Combined artifact first, then groups in first-occurrence order
    pub artifacts: Vec<ExportArtifact>,
    /// File name of the bundle
    pub bundle_name: String,
    /// Encoded bundle
    pub bundle: Vec<u8>,
}

impl ExportBundle {
    /// The combined artifact.
    pub fn combined(&self) -> Option<&ExportArtifact> {
        self.artifacts
            .iter()
            .find(|a| a.scope == ArtifactScope::All)
    }

    /// Per-group artifacts.
    pub fn groups(&self) -> impl Iterator<Item = &ExportArtifact> + '_ {
        self.artifacts
            .iter()
            .filter(|a| matches!(a.scope, ArtifactScope::Group(_)))
    }

    /// Writes every artifact and the bundle into `dir`, creating it if needed.
    ///
    /// Files are first written to a staging directory inside `dir` and then
    /// renamed into place. If any step fails, the files already moved are
    /// removed, so a failed write leaves no partial export behind.
    ///
    /// Returns the written paths, bundle last.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory or a file cannot be written.
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| Error::io(e, dir))?;

        let staging = tempfile::Builder::new()
            .prefix(".cprf-tmp-")
            .tempdir_in(dir)
            .map_err(|e| Error::io(e, dir))?;

        let files: Vec<(&str, &[u8])> = self
            .artifacts
            .iter()
            .map(|a| (a.name.as_str(), a.bytes.as_slice()))
            .chain(std::iter::once((
                self.bundle_name.as_str(),
                self.bundle.as_slice(),
            )))
            .collect();
        for (name, bytes) in &files {
            let path = staging.path().join(name);
            std::fs::write(&path, bytes).map_err(|e| Error::io(e, &path))?;
        }

        let mut written: Vec<PathBuf> = Vec::with_capacity(files.len());
        for (name, bytes) in &files {
            let path = dir.join(name);
            if let Err(e) = std::fs::rename(staging.path().join(name), &path) {
                for done in &written {
                    if let Err(cleanup) = std::fs::remove_file(done) {
                        tracing::warn!(
                            path = %done.display(),
                            error = %cleanup,
                            "could not remove partial artifact"
                        );
                    }
                }
                return Err(Error::io(e, &path));
            }
            tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote artifact");
            written.push(path);
        }
        tracing::info!(dir = %dir.display(), files = written.len(), "wrote export");
        Ok(written)
    }
}

/// Sanitizes a program name into a file stem.
///
/// Characters other than word characters, `-` and whitespace become `_`,
/// whitespace runs become a single `_`, an empty result becomes
/// [`UNKNOWN_PROGRAM_STEM`] and the stem is cut to [`MAX_STEM_LEN`]
/// characters.
pub fn safe_filename(name: &str) -> String {
    FileNamer::new().stem(name)
}

/// Derives unique artifact file names from group keys.
#[derive(Debug)]
struct FileNamer {
    unsafe_re: Regex,
    space_re: Regex,
}

impl FileNamer {
    #[allow(clippy::expect_used)]
    fn new() -> Self {
        Self {
            unsafe_re: Regex::new(r"[^\w\-\s]").expect("valid regex"),
            space_re: Regex::new(r"\s+").expect("valid regex"),
        }
    }

    fn stem(&self, name: &str) -> String {
        let replaced = self.unsafe_re.replace_all(name.trim(), "_");
        let joined = self.space_re.replace_all(&replaced, "_");
        if joined.is_empty() {
            return UNKNOWN_PROGRAM_STEM.to_string();
        }
        joined.chars().take(MAX_STEM_LEN).collect()
    }

    /// File name for a group, suffixed `_2`, `_3`, … when taken.
    ///
    /// `taken` holds lowercased names; case-insensitive file systems would
    /// otherwise merge `Launch A` and `LAUNCH A`.
    fn artifact_name(&self, key: &GroupKey, taken: &mut HashSet<String>) -> String {
        let stem = self.stem(key.as_str());
        let mut name = format!("{stem}_issues.xlsx");
        let mut n = 2;
        while taken.contains(&name.to_lowercase()) {
            name = format!("{stem}_{n}_issues.xlsx");
            n += 1;
        }
        if n > 2 {
            tracing::warn!(group = %key, file = %name, "group file name collided; added suffix");
        }
        taken.insert(name.to_lowercase());
        name
    }
}

/// Builds the export artifacts of a run.
#[derive(Debug)]
pub struct ExportAssembler {
    combined_name: String,
    bundle_name: String,
    namer: FileNamer,
}

impl ExportAssembler {
    /// Creates an assembler with the given combined artifact and bundle names.
    pub fn new(combined_name: impl Into<String>, bundle_name: impl Into<String>) -> Self {
        Self {
            combined_name: combined_name.into(),
            bundle_name: bundle_name.into(),
            namer: FileNamer::new(),
        }
    }

    /// Creates an assembler using the configured names.
    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.combined_artifact.clone(), config.bundle_name.clone())
    }

    /// Renders the combined and per-group tables without encoding them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoIssuesFound`] when nothing was flagged.
    pub fn render(
        &self,
        population: &TextDataset,
        aggregation: &Aggregation,
        footer: &Footer,
    ) -> Result<Vec<(String, ArtifactScope, SheetTable)>> {
        if aggregation.is_empty() {
            return Err(Error::NoIssuesFound {
                population: aggregation.population(),
            });
        }

        let header: Vec<String> = population
            .column_names()
            .into_iter()
            .map(str::to_string)
            .chain(std::iter::once(ISSUES_COLUMN.to_string()))
            .collect();
        let footer_rows = footer.rows();
        let table = |findings: &[IssueFinding]| -> Result<SheetTable> {
            Ok(SheetTable {
                header: header.clone(),
                rows: findings
                    .iter()
                    .map(|f| render_row(population, f))
                    .collect::<Result<_>>()?,
                footer: footer_rows.clone(),
            })
        };

        let mut taken = HashSet::from([
            self.combined_name.to_lowercase(),
            self.bundle_name.to_lowercase(),
        ]);
        let mut tables = Vec::with_capacity(aggregation.groups().len() + 1);
        tables.push((
            self.combined_name.clone(),
            ArtifactScope::All,
            table(aggregation.findings())?,
        ));
        for group in aggregation.groups() {
            let name = self.namer.artifact_name(&group.key, &mut taken);
            tables.push((
                name,
                ArtifactScope::Group(group.key.clone()),
                table(&group.findings)?,
            ));
        }
        Ok(tables)
    }

    /// Renders, encodes and bundles every artifact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoIssuesFound`] when nothing was flagged, or an
    /// encoding error; no artifact is returned in either case.
    pub fn assemble(
        &self,
        population: &TextDataset,
        aggregation: &Aggregation,
        footer: &Footer,
        bundler: &dyn Bundler,
    ) -> Result<ExportBundle> {
        let artifacts = self
            .render(population, aggregation, footer)?
            .into_iter()
            .map(|(name, scope, table)| {
                let bytes = encode_sheet(&table)?;
                tracing::debug!(artifact = %name, rows = table.rows.len(), "encoded artifact");
                Ok(ExportArtifact {
                    name,
                    scope,
                    table,
                    bytes,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let entries: Vec<(&str, &[u8])> = artifacts
            .iter()
            .map(|a| (a.name.as_str(), a.bytes.as_slice()))
            .collect();
        let bundle = bundler.bundle(&entries)?;

        tracing::info!(
            artifacts = artifacts.len(),
            bundle = %self.bundle_name,
            "assembled export"
        );
        Ok(ExportBundle {
            artifacts,
            bundle_name: self.bundle_name.clone(),
            bundle,
        })
    }
}

fn render_row(population: &TextDataset, finding: &IssueFinding) -> Result<Vec<String>> {
    let record = population.record(finding.index).ok_or_else(|| {
        Error::parse(format!(
            "finding for row {} is outside the population",
            finding.index
        ))
    })?;
    Ok(record
        .values()
        .map(|v| v.unwrap_or_default().to_string())
        .chain(std::iter::once(finding.issues.to_string()))
        .collect())
}
