//! Fixture generation script
//!
//! Writes deterministic sample CPRF extracts for manual runs of the CLI.
//! Run: `cargo run --bin generate_fixtures`

#![allow(clippy::cast_precision_loss)]

use std::{
    fs::{self, File},
    io::Write,
};

use rust_xlsxwriter::Workbook;

const FIXTURE_DIR: &str = "test_fixtures";

const HEADER: [&str; 10] = [
    "STATENAME",
    "PROGRAMSUBTYPENAME",
    "ProgramLaunchName",
    "CHILDID",
    "School UDISE",
    "Child School Name",
    "DATE OF BIRTH",
    "CONTACTNUMBER",
    "CASTE",
    "Parent Consent",
];

const LAUNCHES: [&str; 4] = [
    "Pune Launch 2024",
    "Nagpur / Phase 2",
    "Nashik Launch 2024",
    "",
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== cprf-audit fixture generator ===\n");

    fs::create_dir_all(FIXTURE_DIR)?;
    println!("Created directory: {FIXTURE_DIR}/");

    let rows: Vec<Vec<String>> = (1..=200).map(sample_row).collect();
    generate_csv(&rows)?;
    generate_xlsx(&rows)?;
    generate_clean_csv()?;

    println!("\n✓ All fixtures generated successfully");
    Ok(())
}

/// One extract row. Every seventh row is outside the population, and the
/// other moduli plant one kind of issue each.
fn sample_row(i: usize) -> Vec<String> {
    let subtype = if i % 7 == 0 { "CHILD" } else { "ADOLOSCENT" };
    let launch = LAUNCHES[i % LAUNCHES.len()];
    let udise = if i % 5 == 0 {
        String::new()
    } else {
        format!("2725{:07}", i)
    };
    let school = if i % 11 == 0 { "null" } else { "ZP School" };
    let dob = if i % 9 == 0 {
        "01/01/2010".to_string()
    } else {
        format!("{:02}/{:02}/2009", i % 28 + 1, i % 12 + 1)
    };
    let phone = match i % 13 {
        0 => "12345".to_string(),
        1 => format!("+91 98{:08}", i),
        _ => format!("98{:08}", i),
    };
    let caste = match i % 17 {
        0 => "Dont Know",
        1 => "DON'T WISH",
        _ => "OBC",
    };
    let consent = if i % 19 == 0 { "" } else { "Yes" };

    vec![
        "Maharashtra".to_string(),
        subtype.to_string(),
        launch.to_string(),
        format!("C{i:05}"),
        udise,
        school.to_string(),
        dob,
        phone,
        caste.to_string(),
        consent.to_string(),
    ]
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Sample extract as CSV
fn generate_csv(rows: &[Vec<String>]) -> Result<(), Box<dyn std::error::Error>> {
    let path = format!("{FIXTURE_DIR}/cprf_sample.csv");
    let mut file = File::create(&path)?;

    writeln!(file, "{}", HEADER.map(csv_field).join(","))?;
    for row in rows {
        let line: Vec<String> = row.iter().map(|v| csv_field(v)).collect();
        writeln!(file, "{}", line.join(","))?;
    }

    println!("  ✓ {path} ({} rows)", rows.len());
    Ok(())
}

/// Same extract as a workbook, with the phone numbers stored as numbers
fn generate_xlsx(rows: &[Vec<String>]) -> Result<(), Box<dyn std::error::Error>> {
    let path = format!("{FIXTURE_DIR}/cprf_sample.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in HEADER.iter().enumerate() {
        sheet.write_string(0, u16::try_from(col)?, *name)?;
    }
    for (r, row) in rows.iter().enumerate() {
        let r = u32::try_from(r + 1)?;
        for (col, value) in row.iter().enumerate() {
            let col = u16::try_from(col)?;
            match value.parse::<u64>() {
                Ok(n) if HEADER[usize::from(col)] == "CONTACTNUMBER" => {
                    sheet.write_number(r, col, n as f64)?;
                }
                _ if value.is_empty() => {}
                _ => {
                    sheet.write_string(r, col, value)?;
                }
            }
        }
    }
    workbook.save(&path)?;

    println!("  ✓ {path} ({} rows)", rows.len());
    Ok(())
}

/// An extract with no issues at all
fn generate_clean_csv() -> Result<(), Box<dyn std::error::Error>> {
    let path = format!("{FIXTURE_DIR}/cprf_clean.csv");
    let mut file = File::create(&path)?;

    writeln!(file, "{}", HEADER.join(","))?;
    for i in 1..=20 {
        writeln!(
            file,
            "Maharashtra,ADOLOSCENT,Pune Launch 2024,C{i:05},2725{i:07},ZP School,15/06/2009,98{i:08},OBC,Yes"
        )?;
    }

    println!("  ✓ {path} (20 rows)");
    Ok(())
}
