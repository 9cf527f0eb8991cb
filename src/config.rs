//! Audit configuration.
//!
//! Everything that a data-quality analyst may need to tune between extracts
//! lives here: the population literal, the physical column names, the set of
//! enabled checks and the naming of the produced artifacts. Defaults match the
//! CPRF delivery extract layout, so an empty configuration file is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    quality::IssueKind,
};

/// Subtype literal that selects the audited population.
///
/// Spelled the way the upstream category value is spelled in CPRF extracts.
/// Kept as a configurable default rather than corrected.
pub const DEFAULT_TARGET_SUBTYPE: &str = "ADOLOSCENT";

/// Name of the combined artifact holding every flagged record.
pub const DEFAULT_COMBINED_ARTIFACT: &str = "ALL_CPRF_issues.xlsx";

/// Name of the bundle holding every artifact.
pub const DEFAULT_BUNDLE_NAME: &str = "CPRF_issues.zip";

/// Physical column names for the logical columns the audit reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnMap {
    /// Program subtype column used by the population filter
    pub subtype: String,
    /// School UDISE code
    pub udise: String,
    /// Name of the school the child attends
    pub child_school_name: String,
    /// Date of birth
    pub date_of_birth: String,
    /// Contact phone number
    pub phone: String,
    /// Caste
    pub caste: String,
    /// Parent consent
    pub parent_consent: String,
    /// Program launch name, the grouping key of exports
    pub program_launch_name: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            subtype: "PROGRAMSUBTYPENAME".to_string(),
            udise: "School UDISE".to_string(),
            child_school_name: "Child School Name".to_string(),
            date_of_birth: "DATE OF BIRTH".to_string(),
            phone: "CONTACTNUMBER".to_string(),
            caste: "CASTE".to_string(),
            parent_consent: "Parent Consent".to_string(),
            program_launch_name: "ProgramLaunchName".to_string(),
        }
    }
}

impl ColumnMap {
    /// Column read by a given check.
    #[must_use]
    pub fn column_for(&self, kind: IssueKind) -> &str {
        match kind {
            IssueKind::MissingUdise => &self.udise,
            IssueKind::MissingChildSchoolName => &self.child_school_name,
            IssueKind::DobJanFirst => &self.date_of_birth,
            IssueKind::InvalidPhone => &self.phone,
            IssueKind::CasteUnknownOrRefused => &self.caste,
            IssueKind::MissingParentConsent => &self.parent_consent,
        }
    }

    /// Columns that must be present for the given checks to run.
    ///
    /// The subtype and program launch name columns are always required.
    #[must_use]
    pub fn required_for(&self, checks: &[IssueKind]) -> Vec<String> {
        let mut required = vec![self.subtype.clone(), self.program_launch_name.clone()];
        for kind in checks {
            let column = self.column_for(*kind);
            if !required.iter().any(|c| c == column) {
                required.push(column.to_string());
            }
        }
        required
    }

    fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("subtype", self.subtype.as_str()),
            ("udise", self.udise.as_str()),
            ("child_school_name", self.child_school_name.as_str()),
            ("date_of_birth", self.date_of_birth.as_str()),
            ("phone", self.phone.as_str()),
            ("caste", self.caste.as_str()),
            ("parent_consent", self.parent_consent.as_str()),
            ("program_launch_name", self.program_launch_name.as_str()),
        ]
        .into_iter()
    }
}

/// Full configuration of an audit run.
///
/// # Example
///
/// ```
/// use cprf_audit::AuditConfig;
///
/// let config = AuditConfig::from_toml_str(r#"
///     target_subtype = "ADOLESCENT"
///     checks = ["MISSING_UDISE", "INVALID_PHONE"]
/// "#).unwrap();
/// assert_eq!(config.checks.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Subtype literal selecting the audited population
    pub target_subtype: String,
    /// Physical column names
    pub columns: ColumnMap,
    /// Checks to run, in footer order
    pub checks: Vec<IssueKind>,
    /// Version label written into every artifact footer
    pub app_version: String,
    /// Key of the persistent run counter
    pub installation: String,
    /// File name of the combined artifact
    pub combined_artifact: String,
    /// File name of the bundle
    pub bundle_name: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            target_subtype: DEFAULT_TARGET_SUBTYPE.to_string(),
            columns: ColumnMap::default(),
            checks: IssueKind::ALL.to_vec(),
            app_version: concat!("cprf-audit ", env!("CARGO_PKG_VERSION")).to_string(),
            installation: "default".to_string(),
            combined_artifact: DEFAULT_COMBINED_ARTIFACT.to_string(),
            bundle_name: DEFAULT_BUNDLE_NAME.to_string(),
        }
    }
}

impl AuditConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed TOML and
    /// [`Error::InvalidConfig`] when validation fails.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(e, path))?;
        Self::from_toml_str(&text)
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::parse(e.to_string()))
    }

    /// Sets the target subtype literal.
    #[must_use]
    pub fn with_target_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.target_subtype = subtype.into();
        self
    }

    /// Restricts the run to the given checks.
    #[must_use]
    pub fn with_checks(mut self, checks: impl IntoIterator<Item = IssueKind>) -> Self {
        self.checks = checks.into_iter().collect();
        self
    }

    /// Sets the footer version label.
    #[must_use]
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = version.into();
        self
    }

    /// Columns the source extract must provide for this configuration.
    #[must_use]
    pub fn required_columns(&self) -> Vec<String> {
        self.columns.required_for(&self.checks)
    }

    /// Checks the configuration for values that would make a run meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.target_subtype.trim().is_empty() {
            return Err(Error::invalid_config("target_subtype must not be empty"));
        }
        if let Some((field, _)) = self.columns.iter().find(|(_, c)| c.trim().is_empty()) {
            return Err(Error::invalid_config(format!(
                "columns.{} must not be empty",
                field
            )));
        }
        if self.checks.is_empty() {
            return Err(Error::invalid_config("at least one check must be enabled"));
        }
        for (i, kind) in self.checks.iter().enumerate() {
            if self.checks[..i].contains(kind) {
                return Err(Error::invalid_config(format!("check {} listed twice", kind)));
            }
        }
        if self.installation.trim().is_empty()
            || !self
                .installation
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::invalid_config(
                "installation must be non-empty and use only [A-Za-z0-9_-]",
            ));
        }
        for (field, name) in [
            ("combined_artifact", &self.combined_artifact),
            ("bundle_name", &self.bundle_name),
        ] {
            if name.trim().is_empty() || name.contains(['/', '\\']) {
                return Err(Error::invalid_config(format!(
                    "{} must be a plain file name",
                    field
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AuditConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.target_subtype, "ADOLOSCENT");
        assert_eq!(config.checks, IssueKind::ALL.to_vec());
        assert!(config.app_version.starts_with("cprf-audit "));
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = AuditConfig::from_toml_str("").unwrap();
        assert_eq!(config, AuditConfig::default());
    }

    #[test]
    fn test_partial_column_override() {
        let config = AuditConfig::from_toml_str(
            r#"
            [columns]
            phone = "Mobile"
            "#,
        )
        .unwrap();
        assert_eq!(config.columns.phone, "Mobile");
        assert_eq!(config.columns.udise, "School UDISE");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = AuditConfig::from_toml_str("target = \"X\"").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_unknown_check_rejected() {
        let err = AuditConfig::from_toml_str("checks = [\"MISSING_EMAIL\"]").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_empty_target_rejected() {
        let err = AuditConfig::default()
            .with_target_subtype("  ")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("target_subtype"));
    }

    #[test]
    fn test_empty_column_rejected() {
        let mut config = AuditConfig::default();
        config.columns.caste = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("columns.caste"));
    }

    #[test]
    fn test_no_checks_rejected() {
        let err = AuditConfig::default()
            .with_checks([])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("at least one check"));
    }

    #[test]
    fn test_duplicate_check_rejected() {
        let err = AuditConfig::default()
            .with_checks([IssueKind::InvalidPhone, IssueKind::InvalidPhone])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("INVALID_PHONE"));
    }

    #[test]
    fn test_bad_installation_rejected() {
        let mut config = AuditConfig::default();
        config.installation = "../escape".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_artifact_name_with_separator_rejected() {
        let mut config = AuditConfig::default();
        config.bundle_name = "out/bundle.zip".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_required_columns_follow_checks() {
        let config = AuditConfig::default().with_checks([IssueKind::InvalidPhone]);
        assert_eq!(
            config.required_columns(),
            vec!["PROGRAMSUBTYPENAME", "ProgramLaunchName", "CONTACTNUMBER"]
        );

        let all = AuditConfig::default().required_columns();
        assert_eq!(all.len(), 8);
    }

    #[test]
    fn test_toml_round_trip_keeps_checks() {
        let config = AuditConfig::default().with_checks([IssueKind::DobJanFirst]);
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("DOB_JAN_FIRST"));
        assert_eq!(AuditConfig::from_toml_str(&text).unwrap(), config);
    }
}
