//! Integration tests for cprf-audit.

#![allow(clippy::unwrap_used, clippy::uninlined_format_args)]

use chrono::{NaiveDate, NaiveDateTime};
use cprf_audit::{
    dataset::{load_extract, read_csv_str},
    export::ZipBundler,
    AuditConfig, AuditPipeline, Error, ExportBundle, GroupKey, IssueKind, MemoryRunCounter,
};

const HEADER: &str = "STATENAME,PROGRAMSUBTYPENAME,ProgramLaunchName,School UDISE,Child School Name,DATE OF BIRTH,CONTACTNUMBER,CASTE,Parent Consent";

fn at(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap_or_else(|| panic!("valid timestamp"))
}

/// Ten adolescent records: 3 missing UDISE only, 2 missing UDISE with a bad
/// phone, 5 clean. Two more rows belong to another subtype and carry issues
/// that must not be counted.
fn scenario_csv() -> String {
    let rows = [
        "MH,ADOLOSCENT,Launch A,,ZP School,15/06/2010,9876543210,OBC,Yes",
        "MH,ADOLOSCENT,Launch A,27250000002,ZP School,15/06/2010,9876543210,OBC,Yes",
        "MH,ADOLOSCENT,Launch B,,ZP School,15/06/2010,12345,OBC,Yes",
        "MH,CHILD,Launch A,,null,01/01/2012,000,DONT KNOW,",
        "MH,ADOLOSCENT,Launch B,27250000004,ZP School,15/06/2010,9876543210,OBC,Yes",
        "MH,ADOLOSCENT,,,ZP School,15/06/2010,9876543210,OBC,Yes",
        "MH, adoloscent ,Launch A,27250000006,ZP School,15/06/2010,+91 98765 43210,OBC,Yes",
        "MH,ADOLOSCENT,Launch A,   ,ZP School,15/06/2010,5876543210,OBC,Yes",
        "MH,ADOLOSCENT,Launch B,27250000008,ZP School,15/06/2010,9876543210,OBC,Yes",
        "MH,CHILD,Launch C,,ZP School,15/06/2010,9876543210,OBC,Yes",
        "MH,ADOLOSCENT,Launch B,,ZP School,15/06/2010,9876543210,OBC,Yes",
        "MH,ADOLOSCENT,Launch A,27250000011,ZP School,15/06/2010,9876543210,OBC,Yes",
    ];
    format!("{}\n{}\n", HEADER, rows.join("\n"))
}

fn pipeline() -> AuditPipeline {
    AuditPipeline::new(AuditConfig::default()).unwrap()
}

fn export_with_counter(run_start: u64, hour: u32) -> ExportBundle {
    let pipeline = pipeline();
    let (_, export) = pipeline
        .run(
            read_csv_str(&scenario_csv()).unwrap(),
            &MemoryRunCounter::new(run_start),
            &ZipBundler,
            at(hour),
        )
        .unwrap();
    export
}

#[test]
fn test_scenario_counts() {
    let evaluation = pipeline()
        .evaluate(read_csv_str(&scenario_csv()).unwrap())
        .unwrap();
    let summary = evaluation.summary();

    assert_eq!(summary.total_rows, 12);
    assert_eq!(summary.population, 10);
    assert_eq!(summary.flagged, 5);
    assert_eq!(summary.count(IssueKind::MissingUdise), 5);
    assert_eq!(summary.count(IssueKind::InvalidPhone), 2);
    for kind in [
        IssueKind::MissingChildSchoolName,
        IssueKind::DobJanFirst,
        IssueKind::CasteUnknownOrRefused,
        IssueKind::MissingParentConsent,
    ] {
        assert_eq!(summary.count(kind), 0, "{kind}");
    }

    let groups: Vec<(&str, usize)> = summary
        .groups
        .iter()
        .map(|g| (g.group.as_str(), g.flagged))
        .collect();
    assert_eq!(
        groups,
        vec![("Launch A", 2), ("Launch B", 2), ("UNSPECIFIED", 1)]
    );
}

#[test]
fn test_scenario_export_partition() {
    let export = export_with_counter(0, 9);

    let combined = export.combined().unwrap();
    assert_eq!(combined.name, "ALL_CPRF_issues.xlsx");
    assert_eq!(combined.row_count(), 5);

    let group_rows: usize = export.groups().map(|a| a.row_count()).sum();
    assert_eq!(group_rows, combined.row_count());

    let names: Vec<&str> = export.groups().map(|a| a.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Launch_A_issues.xlsx", "Launch_B_issues.xlsx", "UNSPECIFIED_issues.xlsx"]
    );

    let issues_col = combined.table.header.len() - 1;
    let both: Vec<&str> = combined
        .table
        .rows
        .iter()
        .map(|r| r[issues_col].as_str())
        .filter(|s| s.contains("INVALID_PHONE"))
        .collect();
    assert_eq!(both, vec!["MISSING_UDISE, INVALID_PHONE"; 2]);
}

#[test]
fn test_export_footer() {
    let export = export_with_counter(41, 9);
    for artifact in &export.artifacts {
        let footer = &artifact.table.footer;
        assert_eq!(footer[0].1, "2024-05-01 09:00:00");
        assert_eq!(
            footer[1].1,
            "MISSING_UDISE, MISSING_CHILD_SCHOOL_NAME, DOB_JAN_FIRST, INVALID_PHONE, CASTE_UNKNOWN_OR_REFUSED, MISSING_PARENT_CONSENT"
        );
        assert!(footer[2].1.ends_with("(run #42)"), "{}", footer[2].1);
    }
}

#[test]
fn test_export_is_idempotent_apart_from_footer() {
    let first = export_with_counter(0, 9);
    let second = export_with_counter(0, 9);
    let later = export_with_counter(6, 17);

    assert_eq!(first.artifacts.len(), later.artifacts.len());
    for ((a, b), c) in first
        .artifacts
        .iter()
        .zip(&second.artifacts)
        .zip(&later.artifacts)
    {
        assert_eq!(a.name, b.name);
        assert_eq!(a.table, b.table);

        assert_eq!(a.name, c.name);
        assert_eq!(a.table.header, c.table.header);
        assert_eq!(a.table.rows, c.table.rows);
        assert_ne!(a.table.footer, c.table.footer);
    }
}

#[test]
fn test_zero_flagged_produces_nothing() {
    let csv = format!(
        "{}\nMH,ADOLOSCENT,Launch A,27250000001,ZP School,15/06/2010,9876543210,OBC,Yes\nMH,CHILD,Launch A,,,,,,\n",
        HEADER
    );
    let pipeline = pipeline();
    let counter = MemoryRunCounter::default();
    let err = pipeline
        .run(read_csv_str(&csv).unwrap(), &counter, &ZipBundler, at(9))
        .unwrap_err();

    assert!(matches!(err, Error::NoIssuesFound { population: 1 }));
    assert_eq!(counter.current(), 0);
}

#[test]
fn test_missing_required_columns_reported_together() {
    let csv = "PROGRAMSUBTYPENAME,School UDISE,CASTE\nADOLOSCENT,,OBC\n";
    let err = pipeline().evaluate(read_csv_str(csv).unwrap()).unwrap_err();
    match err {
        Error::MissingColumns { missing } => assert_eq!(
            missing,
            vec![
                "ProgramLaunchName",
                "Child School Name",
                "DATE OF BIRTH",
                "CONTACTNUMBER",
                "Parent Consent"
            ]
        ),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_custom_subtype_and_checks() {
    let config = AuditConfig::default()
        .with_target_subtype("CHILD")
        .with_checks([IssueKind::CasteUnknownOrRefused, IssueKind::DobJanFirst]);
    let evaluation = AuditPipeline::new(config)
        .unwrap()
        .evaluate(read_csv_str(&scenario_csv()).unwrap())
        .unwrap();

    let summary = evaluation.summary();
    assert_eq!(summary.population, 2);
    assert_eq!(summary.flagged, 1);
    assert_eq!(summary.count(IssueKind::CasteUnknownOrRefused), 1);
    assert_eq!(summary.count(IssueKind::DobJanFirst), 1);
    assert_eq!(summary.count(IssueKind::MissingUdise), 0);
    assert!(evaluation
        .aggregation()
        .group(&GroupKey::Program("Launch A".to_string()))
        .is_some());
}

#[test]
fn test_written_files_and_workbook_contents() {
    use calamine::{open_workbook, Data, Reader, Xlsx};

    let export = export_with_counter(0, 9);
    let dir = tempfile::tempdir().unwrap();
    let written = export.write_to_dir(dir.path()).unwrap();
    assert_eq!(written.len(), 5);
    assert!(dir.path().join("CPRF_issues.zip").exists());

    let mut workbook: Xlsx<_> = open_workbook(dir.path().join("ALL_CPRF_issues.xlsx")).unwrap();
    let range = workbook.worksheet_range("Issues").unwrap();
    // header + 5 rows + blank + 3 footer rows
    assert_eq!(range.height(), 10);
    assert_eq!(
        range.get_value((0, 9)),
        Some(&Data::String("Issues".to_string()))
    );
    assert_eq!(
        range.get_value((9, 0)),
        Some(&Data::String("Version".to_string()))
    );
}

#[test]
fn test_xlsx_extract_with_numeric_cells() {
    use rust_xlsxwriter::Workbook;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("extract.xlsx");
    let header: Vec<&str> = HEADER.split(',').collect();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, name) in header.iter().enumerate() {
        sheet.write_string(0, col as u16, *name).unwrap();
    }
    let rows = [
        ["MH", "ADOLOSCENT", "Launch A", "", "ZP", "01/01/2010", "", "OBC", "Yes"],
        ["MH", "ADOLOSCENT", "Launch A", "2725", "ZP", "15/06/2010", "", "OBC", "Yes"],
    ];
    for (r, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(r as u32 + 1, col as u16, *value).unwrap();
            }
        }
        // phone stored as a number
        sheet.write_number(r as u32 + 1, 6, 9_876_543_210.0).unwrap();
    }
    workbook.save(&path).unwrap();

    let evaluation = pipeline().evaluate(load_extract(&path).unwrap()).unwrap();
    let summary = evaluation.summary();
    assert_eq!(summary.population, 2);
    assert_eq!(summary.flagged, 1);
    assert_eq!(summary.count(IssueKind::InvalidPhone), 0);
    assert_eq!(summary.count(IssueKind::MissingUdise), 1);
    assert_eq!(summary.count(IssueKind::DobJanFirst), 1);
}

#[test]
fn test_xlsx_extract_with_unnamed_extra_columns() {
    use rust_xlsxwriter::Workbook;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("extract.xlsx");
    let header: Vec<&str> = HEADER.split(',').collect();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, name) in header.iter().enumerate() {
        sheet.write_string(0, col as u16, *name).unwrap();
    }
    let row = ["MH", "ADOLOSCENT", "Launch A", "", "ZP", "15/06/2010", "9876543210", "OBC", "Yes"];
    for (col, value) in row.iter().enumerate() {
        if !value.is_empty() {
            sheet.write_string(1, col as u16, *value).unwrap();
        }
    }
    // two trailing columns with data but no header
    sheet.write_string(1, 9, "remark").unwrap();
    sheet.write_string(1, 10, "remark 2").unwrap();
    workbook.save(&path).unwrap();

    let evaluation = pipeline().evaluate(load_extract(&path).unwrap()).unwrap();
    assert_eq!(evaluation.summary().flagged, 1);
    assert!(evaluation
        .schema_report()
        .extra
        .iter()
        .any(|c| c == "Unnamed: 10"));

    let (_, export) = pipeline()
        .run(load_extract(&path).unwrap(), &MemoryRunCounter::new(0), &ZipBundler, at(9))
        .unwrap();
    let combined = export.combined().unwrap();
    assert_eq!(
        &combined.table.header[9..],
        ["Unnamed: 9", "Unnamed: 10", "Issues"]
    );
    assert_eq!(combined.table.rows[0][10], "remark 2");
}
