//! Record-level data-quality checks for CPRF extracts.
//!
//! Six independent checks run against each record of the audited
//! population. They are not mutually exclusive: a record can trip any
//! combination, and a record that trips none produces no finding.
//!
//! | Check | Triggers when |
//! |---|---|
//! | `MISSING_UDISE` | School UDISE is blank |
//! | `MISSING_CHILD_SCHOOL_NAME` | Child school name is blank or `null` |
//! | `DOB_JAN_FIRST` | Date of birth is 1 January (day-first parse) |
//! | `INVALID_PHONE` | Contact number is not 10 digits starting 6-9 |
//! | `CASTE_UNKNOWN_OR_REFUSED` | Caste is `DONT KNOW` / `DONT WISH` |
//! | `MISSING_PARENT_CONSENT` | Parent consent is blank |
//!
//! Malformed values never abort a run. A date that cannot be parsed does
//! not trigger `DOB_JAN_FIRST`; a phone full of punctuation is judged on its
//! digits alone.
//!
//! # Example
//!
//! ```
//! use cprf_audit::quality::{is_null_marker, IssueKind};
//!
//! assert!(is_null_marker(Some("  NULL ")));
//! assert!(IssueKind::InvalidPhone.is_triggered_by(Some("5876543210")));
//! assert!(!IssueKind::DobJanFirst.is_triggered_by(Some("not-a-date")));
//! ```

mod checks;
mod engine;


pub use checks::{
    is_jan_first, is_null_marker, is_unknown_or_refused_caste, is_valid_mobile, normalize_caste,
    normalize_phone, parse_day_first, IssueKind,
};
pub use engine::{IssueFinding, IssueSet, RuleEngine};
