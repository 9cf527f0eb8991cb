//! The `run` command: audit an extract and export the flagged records.

use std::path::PathBuf;

use chrono::Local;

use super::basic::load_config;
use crate::{
    counter::FileRunCounter,
    dataset::load_extract,
    export::{ExportBundle, ZipBundler},
    pipeline::{Evaluation, ALTERNATE_SUBTYPE_SPELLING},
    AuditPipeline,
};

/// Number of written paths listed before the rest is elided.
const LISTED_PATHS: usize = 10;

/// Arguments of the `run` command.
pub(crate) struct RunArgs {
    pub(crate) input: PathBuf,
    pub(crate) config: Option<PathBuf>,
    pub(crate) subtype: Option<String>,
    pub(crate) output_dir: PathBuf,
    pub(crate) counter_dir: Option<PathBuf>,
    pub(crate) no_export: bool,
    pub(crate) format: String,
}

/// Audit an extract, print the summary and write the export.
pub(crate) fn cmd_run(args: &RunArgs) -> crate::Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(subtype) = &args.subtype {
        config = config.with_target_subtype(subtype.clone());
    }
    let installation = config.installation.clone();
    let pipeline = AuditPipeline::new(config)?;

    let batch = load_extract(&args.input)?;
    let evaluation = pipeline.evaluate(batch)?;
    let json = args.format == "json";

    if !json {
        print_evaluation(&args.input, &evaluation);
    }

    let export = if args.no_export {
        None
    } else {
        let counter = match &args.counter_dir {
            Some(dir) => FileRunCounter::new(dir, &installation),
            None => FileRunCounter::in_data_dir(&installation)?,
        };
        match pipeline.export(&evaluation, &counter, &ZipBundler, Local::now().naive_local()) {
            Ok(export) => {
                let written = export.write_to_dir(&args.output_dir)?;
                Some((export, written))
            }
            Err(e) if e.is_no_issues() => {
                if !json {
                    println!("{}. Nothing to export.", e);
                }
                None
            }
            Err(e) => return Err(e),
        }
    };

    if json {
        print_json(&evaluation, export.as_ref())?;
    } else if let Some((export, written)) = &export {
        print_written(export, written);
    }
    Ok(())
}

fn print_evaluation(input: &std::path::Path, evaluation: &Evaluation) {
    println!("File: {}", input.display());
    let report = evaluation.schema_report();
    if !report.is_complete() {
        println!(
            "Warning: {} expected column(s) missing: {}",
            report.missing_expected.len(),
            report.missing_expected.join(", ")
        );
    }
    if evaluation.alternate_spelling_rows() > 0 {
        println!(
            "Warning: no rows match '{}', but {} row(s) are spelled '{}'. Use --subtype to audit them.",
            evaluation.summary().target_subtype,
            evaluation.alternate_spelling_rows(),
            ALTERNATE_SUBTYPE_SPELLING
        );
    }
    println!();
    print!("{}", evaluation.summary());
    println!();
}

fn print_written(export: &ExportBundle, written: &[PathBuf]) {
    println!("Exported {} file(s):", written.len());
    for path in written.iter().take(LISTED_PATHS) {
        println!("  - {}", path.display());
    }
    if written.len() > LISTED_PATHS {
        println!("  ... and {} more", written.len() - LISTED_PATHS);
    }
    if let Some(combined) = export.combined() {
        println!(
            "{} holds {} flagged record(s) across {} group file(s).",
            combined.name,
            combined.row_count(),
            export.groups().count()
        );
    }
}

fn print_json(
    evaluation: &Evaluation,
    export: Option<&(ExportBundle, Vec<PathBuf>)>,
) -> crate::Result<()> {
    let export_json = export.map(|(bundle, written)| {
        serde_json::json!({
            "bundle": bundle.bundle_name,
            "artifacts": bundle.artifacts.iter().map(|a| {
                serde_json::json!({ "name": a.name, "rows": a.row_count() })
            }).collect::<Vec<_>>(),
            "written": written.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        })
    });
    let json = serde_json::json!({
        "summary": evaluation.summary(),
        "missing_expected_columns": evaluation.schema_report().missing_expected,
        "alternate_spelling_rows": evaluation.alternate_spelling_rows(),
        "export": export_json,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&json).map_err(|e| crate::Error::Format(e.to_string()))?
    );
    Ok(())
}
