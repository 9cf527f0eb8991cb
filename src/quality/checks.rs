//! Issue kinds and the per-cell predicates behind them.
//!
//! Every predicate is a pure function of one cell value. Missing values are
//! decided by [`is_null_marker`] alone so all checks agree on what "empty"
//! means.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A data-quality issue a record can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    /// School UDISE code is missing
    MissingUdise,
    /// Child school name is missing or the text "null"
    MissingChildSchoolName,
    /// Date of birth is the 1st of January, a common placeholder
    DobJanFirst,
    /// Contact number is not a 10-digit Indian mobile number
    InvalidPhone,
    /// Caste recorded as "don't know" or "don't wish"
    CasteUnknownOrRefused,
    /// Parent consent is missing
    MissingParentConsent,
}

impl IssueKind {
    /// Number of issue kinds.
    pub const COUNT: usize = 6;

    /// Every issue kind, in report order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::MissingUdise,
        Self::MissingChildSchoolName,
        Self::DobJanFirst,
        Self::InvalidPhone,
        Self::CasteUnknownOrRefused,
        Self::MissingParentConsent,
    ];

    /// Canonical upper-case name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::MissingUdise => "MISSING_UDISE",
            Self::MissingChildSchoolName => "MISSING_CHILD_SCHOOL_NAME",
            Self::DobJanFirst => "DOB_JAN_FIRST",
            Self::InvalidPhone => "INVALID_PHONE",
            Self::CasteUnknownOrRefused => "CASTE_UNKNOWN_OR_REFUSED",
            Self::MissingParentConsent => "MISSING_PARENT_CONSENT",
        }
    }

    /// Human-readable description of the check.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::MissingUdise => "School UDISE code is blank",
            Self::MissingChildSchoolName => "Child school name is blank or \"null\"",
            Self::DobJanFirst => "Date of birth falls on 1 January",
            Self::InvalidPhone => "Contact number is not a valid 10-digit mobile number",
            Self::CasteUnknownOrRefused => "Caste is \"don't know\" or \"don't wish\"",
            Self::MissingParentConsent => "Parent consent is blank",
        }
    }

    /// Position in [`IssueKind::ALL`].
    #[must_use]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Evaluates this check against a single cell value.
    ///
    /// `None` means the cell is null or the column is absent.
    #[must_use]
    pub fn is_triggered_by(&self, value: Option<&str>) -> bool {
        match self {
            Self::MissingUdise
            | Self::MissingChildSchoolName
            | Self::MissingParentConsent => is_null_marker(value),
            Self::DobJanFirst => is_jan_first(value),
            Self::InvalidPhone => !is_valid_mobile(value),
            Self::CasteUnknownOrRefused => is_unknown_or_refused_caste(value),
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IssueKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                Error::invalid_config(format!(
                    "unknown check '{}' (expected one of: {})",
                    wanted,
                    Self::ALL.map(|k| k.name()).join(", ")
                ))
            })
    }
}

/// Returns true if a cell carries no usable value.
///
/// Absent cells, empty or whitespace-only text and the literal `null` in any
/// case are all null markers.
#[must_use]
pub fn is_null_marker(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None => true,
        Some(v) => v.is_empty() || v.eq_ignore_ascii_case("null"),
    }
}

/// Strips everything but digits and a leading `91` country code or `0`
/// trunk prefix.
///
/// ```
/// use cprf_audit::quality::normalize_phone;
///
/// assert_eq!(normalize_phone("+91 98765 43210"), "9876543210");
/// assert_eq!(normalize_phone("098765-43210"), "9876543210");
/// ```
#[must_use]
pub fn normalize_phone(value: &str) -> String {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        12 if digits.starts_with("91") => digits[2..].to_string(),
        11 if digits.starts_with('0') => digits[1..].to_string(),
        _ => digits,
    }
}

/// Returns true for a 10-digit number starting with 6, 7, 8 or 9.
#[must_use]
pub fn is_valid_mobile(value: Option<&str>) -> bool {
    if is_null_marker(value) {
        return false;
    }
    let digits = normalize_phone(value.unwrap_or_default());
    digits.len() == 10 && digits.starts_with(['6', '7', '8', '9'])
}

const DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d", "%d-%b-%Y",
];

/// Parses a date written day-first, ignoring any time of day.
///
/// ISO `yyyy-mm-dd` dates are accepted too. Returns `None` when nothing
/// matches; callers treat that as "no evidence".
#[must_use]
pub fn parse_day_first(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let date_part = value.split_whitespace().next().unwrap_or(value);
    // "2010-01-01T00:00:00" only parses once the time is cut off
    let candidates = [date_part, date_part.get(..10).unwrap_or(date_part)];

    candidates.iter().find_map(|candidate| {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
    })
}

/// Returns true if the value parses as a date on 1 January of any year.
///
/// Unparseable values do not trigger.
#[must_use]
pub fn is_jan_first(value: Option<&str>) -> bool {
    value
        .and_then(parse_day_first)
        .is_some_and(|date| date.month() == 1 && date.day() == 1)
}

/// Upper-cases, drops apostrophes and collapses inner whitespace.
#[must_use]
pub fn normalize_caste(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '\'' | '\u{2019}' | '\u{2018}' | '`'))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Returns true for "DONT KNOW" or "DONT WISH", apostrophes optional.
#[must_use]
pub fn is_unknown_or_refused_caste(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(normalize_caste(v).as_str(), "DONT KNOW" | "DONT WISH"))
}
