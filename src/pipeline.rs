//! End-to-end audit pipeline.
//!
//! `source → normalize → filter → check → aggregate → {summary, export}`.
//!
//! A run has two phases. [`AuditPipeline::evaluate`] is pure: it produces
//! the findings and the summary. [`AuditPipeline::export`] takes the run
//! counter and bundler capabilities and assembles the artifacts. Either
//! phase aborts on the first error without partial output.

use arrow::array::RecordBatch;
use chrono::NaiveDateTime;

use crate::{
    aggregate::{Aggregation, Aggregator},
    config::AuditConfig,
    counter::RunCounter,
    dataset::{RawTable, TextDataset},
    error::{Error, Result},
    export::{Bundler, ExportAssembler, ExportBundle, Footer},
    population::PopulationFilter,
    quality::RuleEngine,
    schema::{SchemaNormalizer, SchemaReport},
    summary::Summary,
};

/// Correct spelling of the adolescent subtype, checked when the configured
/// literal selects nobody.
pub const ALTERNATE_SUBTYPE_SPELLING: &str = "ADOLESCENT";

/// Result of the evaluation phase.
#[derive(Debug, Clone)]
pub struct Evaluation {
    population: TextDataset,
    aggregation: Aggregation,
    summary: Summary,
    schema_report: SchemaReport,
    alternate_spelling_rows: usize,
}

impl Evaluation {
    /// The audited population.
    pub fn population(&self) -> &TextDataset {
        &self.population
    }

    /// Findings rolled up by kind and group.
    pub fn aggregation(&self) -> &Aggregation {
        &self.aggregation
    }

    /// The run summary.
    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// What normalization noticed about the source header.
    pub fn schema_report(&self) -> &SchemaReport {
        &self.schema_report
    }

    /// Rows spelled [`ALTERNATE_SUBTYPE_SPELLING`] when the population came
    /// out empty; zero otherwise.
    pub fn alternate_spelling_rows(&self) -> usize {
        self.alternate_spelling_rows
    }

    /// Returns true if at least one record was flagged.
    pub fn has_issues(&self) -> bool {
        !self.aggregation.is_empty()
    }
}

/// The configured stages of an audit run.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use cprf_audit::{
///     export::ZipBundler, AuditConfig, AuditPipeline, MemoryRunCounter, RawTable,
/// };
///
/// let config = AuditConfig::default();
/// let raw = RawTable::from_text_rows(
///     config.required_columns(),
///     vec![vec!["ADOLOSCENT", "P1", "", "school", "15/06/2010", "9876543210", "GENERAL", "yes"]],
/// );
/// let pipeline = AuditPipeline::new(config).unwrap();
/// let evaluation = pipeline.evaluate_raw(raw).unwrap();
/// assert_eq!(evaluation.summary().flagged, 1);
///
/// let now = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// let export = pipeline
///     .export(&evaluation, &MemoryRunCounter::default(), &ZipBundler, now)
///     .unwrap();
/// assert_eq!(export.artifacts.len(), 2);
/// ```
#[derive(Debug)]
pub struct AuditPipeline {
    config: AuditConfig,
    normalizer: SchemaNormalizer,
    filter: PopulationFilter,
    engine: RuleEngine,
    aggregator: Aggregator,
    assembler: ExportAssembler,
}

impl AuditPipeline {
    /// Builds the stages from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: AuditConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            normalizer: SchemaNormalizer::new(config.required_columns()),
            filter: PopulationFilter::new(
                config.columns.subtype.clone(),
                config.target_subtype.clone(),
            ),
            engine: RuleEngine::from_config(&config),
            aggregator: Aggregator::from_config(&config),
            assembler: ExportAssembler::from_config(&config),
            config,
        })
    }

    /// The configuration the pipeline was built from.
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Runs normalization, filtering, checks and aggregation on a raw table.
    ///
    /// # Errors
    ///
    /// See [`AuditPipeline::evaluate`].
    pub fn evaluate_raw(&self, raw: RawTable) -> Result<Evaluation> {
        self.evaluate(raw.into_record_batch()?)
    }

    /// Runs normalization, filtering, checks and aggregation on a batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingColumns`] if required columns are absent, or
    /// any error raised while normalizing the source.
    pub fn evaluate(&self, batch: RecordBatch) -> Result<Evaluation> {
        let (dataset, schema_report) = self.normalizer.normalize(batch)?;
        let population = self.filter.apply(&dataset)?;

        let alternate_spelling_rows = if population.is_empty()
            && !self
                .filter
                .target()
                .eq_ignore_ascii_case(ALTERNATE_SUBTYPE_SPELLING)
        {
            self.filter
                .count_alternative(&dataset, ALTERNATE_SUBTYPE_SPELLING)
        } else {
            0
        };
        if alternate_spelling_rows > 0 {
            tracing::warn!(
                target_subtype = %self.filter.target(),
                alternate = ALTERNATE_SUBTYPE_SPELLING,
                rows = alternate_spelling_rows,
                "no rows match the target subtype but rows with the alternate spelling exist"
            );
        }

        let findings = self.engine.scan(&population)?;
        let aggregation = self.aggregator.aggregate(&population, findings)?;
        let summary = Summary::new(
            dataset.len(),
            self.filter.target(),
            self.engine.checks(),
            &aggregation,
        );

        Ok(Evaluation {
            population,
            aggregation,
            summary,
            schema_report,
            alternate_spelling_rows,
        })
    }

    /// Assembles the export artifacts of an evaluated run.
    ///
    /// The run counter is incremented once, only when there is something to
    /// export.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoIssuesFound`] when nothing was flagged, or a counter
    /// or encoding error.
    pub fn export(
        &self,
        evaluation: &Evaluation,
        counter: &dyn RunCounter,
        bundler: &dyn Bundler,
        generated_at: NaiveDateTime,
    ) -> Result<ExportBundle> {
        if !evaluation.has_issues() {
            return Err(Error::NoIssuesFound {
                population: evaluation.population.len(),
            });
        }

        let run = counter.increment_and_read()?;
        let footer = Footer {
            generated_at,
            checks: self.engine.checks().to_vec(),
            version: self.config.app_version.clone(),
            run,
        };
        self.assembler.assemble(
            &evaluation.population,
            &evaluation.aggregation,
            &footer,
            bundler,
        )
    }

    /// Evaluates and exports in one go.
    ///
    /// # Errors
    ///
    /// See [`AuditPipeline::evaluate`] and [`AuditPipeline::export`].
    pub fn run(
        &self,
        batch: RecordBatch,
        counter: &dyn RunCounter,
        bundler: &dyn Bundler,
        generated_at: NaiveDateTime,
    ) -> Result<(Evaluation, ExportBundle)> {
        let evaluation = self.evaluate(batch)?;
        let export = self.export(&evaluation, counter, bundler, generated_at)?;
        Ok((evaluation, export))
    }
}
