//! cprf-audit - Data-quality audit of CPRF delivery extracts
//!
//! Ingests a tabular delivery extract, narrows it to the audited program
//! subtype, runs a fixed battery of per-record checks and exports the
//! flagged records as one combined workbook plus one workbook per program.
//!
//! # Pipeline
//!
//! 1. **Schema normalizer** - every cell becomes trimmed text, required
//!    columns are checked
//! 2. **Population filter** - keeps the target subtype
//! 3. **Rule engine** - six independent checks per record
//! 4. **Aggregator** - counts by check and partitions by program
//! 5. **Export assembler** - xlsx artifacts with a provenance footer, zipped
//! 6. **Summary** - counts for display or JSON
//!
//! # Quick Start
//!
//! ```no_run
//! use cprf_audit::{
//!     dataset::load_extract, export::ZipBundler, AuditConfig, AuditPipeline, FileRunCounter,
//! };
//!
//! let pipeline = AuditPipeline::new(AuditConfig::default()).unwrap();
//! let evaluation = pipeline.evaluate(load_extract("extract.xlsx").unwrap()).unwrap();
//! println!("{}", evaluation.summary());
//!
//! let counter = FileRunCounter::in_data_dir("default").unwrap();
//! let now = chrono::Local::now().naive_local();
//! let export = pipeline.export(&evaluation, &counter, &ZipBundler, now).unwrap();
//! export.write_to_dir("cprf_issues").unwrap();
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
// Allow common test patterns
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::cast_possible_truncation,
        clippy::redundant_clone,
        clippy::too_many_lines,
        clippy::similar_names,
        clippy::unreadable_literal
    )
)]
// Allow some pedantic lints for cleaner code
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::map_unwrap_or)]

pub mod aggregate;
/// CLI module for command-line interface
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod counter;
pub mod dataset;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod population;
pub mod quality;
pub mod schema;
pub mod summary;
pub mod transform;

// Re-exports for convenience
pub use aggregate::{Aggregation, Aggregator, GroupBucket, GroupKey, UNSPECIFIED_GROUP};
// Re-export arrow types commonly needed
pub use arrow::{
    array::RecordBatch,
    datatypes::{Schema, SchemaRef},
};
pub use config::{AuditConfig, ColumnMap};
pub use counter::{FileRunCounter, MemoryRunCounter, RunCounter};
pub use dataset::{Cell, CsvOptions, RawTable, Record, RowId, TextDataset};
pub use error::{Error, Result};
pub use export::{Bundler, ExportArtifact, ExportAssembler, ExportBundle, Footer, ZipBundler};
pub use pipeline::{AuditPipeline, Evaluation};
pub use population::PopulationFilter;
pub use quality::{IssueFinding, IssueKind, IssueSet, RuleEngine};
pub use schema::{SchemaNormalizer, SchemaReport};
pub use summary::Summary;
pub use transform::{ToText, Transform};
