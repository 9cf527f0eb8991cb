//! Informational CLI commands and shared helpers.

use std::path::PathBuf;

use crate::{quality::IssueKind, schema::EXPECTED_COLUMNS, AuditConfig};

/// Load the configuration file, or the defaults when none is given.
pub(crate) fn load_config(path: Option<&PathBuf>) -> crate::Result<AuditConfig> {
    match path {
        Some(path) => AuditConfig::from_file(path),
        None => Ok(AuditConfig::default()),
    }
}

/// List the available checks.
pub(crate) fn cmd_checks(format: &str) -> crate::Result<()> {
    if format == "json" {
        let json: Vec<serde_json::Value> = IssueKind::ALL
            .iter()
            .map(|k| serde_json::json!({ "name": k.name(), "description": k.description() }))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| crate::Error::Format(e.to_string()))?
        );
        return Ok(());
    }

    println!("{:<28} DESCRIPTION", "CHECK");
    println!("{}", "-".repeat(80));
    for kind in IssueKind::ALL {
        println!("{:<28} {}", kind.name(), kind.description());
    }
    Ok(())
}

/// Show required and expected columns.
pub(crate) fn cmd_columns(config: Option<&PathBuf>) -> crate::Result<()> {
    let config = load_config(config)?;
    let required = config.required_columns();

    println!("Required columns:");
    for column in &required {
        println!("  - {}", column);
    }
    println!();
    println!("Expected extract layout ({} columns):", EXPECTED_COLUMNS.len());
    for column in EXPECTED_COLUMNS {
        let marker = if required.iter().any(|r| r.as_str() == *column) {
            "*"
        } else {
            " "
        };
        println!("  {} {}", marker, column);
    }
    Ok(())
}

/// Print the effective configuration.
pub(crate) fn cmd_config(config: Option<&PathBuf>) -> crate::Result<()> {
    let config = load_config(config)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}
