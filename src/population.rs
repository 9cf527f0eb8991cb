//! Population filter.
//!
//! Narrows a normalized extract down to the program subtype being audited.
//! Rows outside the population are dropped silently; they are not issues.

use arrow::array::{AsArray, BooleanArray, RecordBatch};

use crate::{
    dataset::TextDataset,
    error::{Error, Result},
};

/// Keeps the records whose subtype equals a target literal.
///
/// Comparison trims both sides and ignores ASCII case. It is an exact match
/// otherwise: no fuzzy or partial matching.
#[derive(Debug, Clone)]
pub struct PopulationFilter {
    column: String,
    target: String,
}

impl PopulationFilter {
    /// Creates a filter on `column` for the given subtype literal.
    pub fn new(column: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            target: target.into().trim().to_string(),
        }
    }

    /// The subtype column.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// The trimmed target literal.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns true if a subtype value belongs to the population.
    pub fn matches(&self, value: Option<&str>) -> bool {
        value.is_some_and(|v| v.trim().eq_ignore_ascii_case(&self.target))
    }

    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let idx = batch
            .schema()
            .index_of(&self.column)
            .map_err(|_| Error::missing_columns([self.column.as_str()]))?;
        let values = batch
            .column(idx)
            .as_string_opt::<i32>()
            .ok_or_else(|| Error::parse(format!("column '{}' is not text", self.column)))?;
        Ok(values.iter().map(|v| Some(self.matches(v))).collect())
    }

    /// Applies the filter, keeping source row identities.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingColumns`] if the subtype column is absent.
    pub fn apply(&self, dataset: &TextDataset) -> Result<TextDataset> {
        let mask = self.mask(dataset.batch())?;
        let population = dataset.filter(&mask)?;

        tracing::info!(
            column = %self.column,
            target = %self.target,
            kept = population.len(),
            dropped = dataset.len() - population.len(),
            "filtered population"
        );
        Ok(population)
    }

    /// Counts records whose subtype matches an alternative literal instead.
    ///
    /// An empty population with a non-zero count here usually means the
    /// configured literal and the data disagree on spelling.
    pub fn count_alternative(&self, dataset: &TextDataset, alternative: &str) -> usize {
        let alt = Self::new(self.column.clone(), alternative);
        dataset
            .column_values(&self.column)
            .map(|values| values.into_iter().filter(|v| alt.matches(*v)).count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawTable;

    fn dataset(subtypes: &[Option<&str>]) -> TextDataset {
        let raw = RawTable::from_text_rows(
            ["PROGRAMSUBTYPENAME", "row"],
            subtypes
                .iter()
                .enumerate()
                .map(|(i, s)| vec![s.map(str::to_string), Some(i.to_string())]),
        );
        TextDataset::from_batch(raw.into_record_batch().unwrap()).unwrap()
    }

    #[test]
    fn test_matches_trimmed_case_insensitive() {
        let filter = PopulationFilter::new("PROGRAMSUBTYPENAME", "ADOLOSCENT");
        assert!(filter.matches(Some("ADOLOSCENT")));
        assert!(filter.matches(Some("  adoloscent ")));
        assert!(filter.matches(Some("Adoloscent")));
        assert!(!filter.matches(Some("ADOLESCENT")));
        assert!(!filter.matches(Some("ADOLOSCENTS")));
        assert!(!filter.matches(None));
    }

    #[test]
    fn test_target_is_trimmed() {
        let filter = PopulationFilter::new("c", "  ADOLOSCENT\t");
        assert_eq!(filter.target(), "ADOLOSCENT");
        assert_eq!(filter.column(), "c");
    }

    #[test]
    fn test_apply_keeps_matching_rows() {
        let data = dataset(&[
            Some("ADOLOSCENT"),
            Some("CHILD"),
            None,
            Some(" adoloscent "),
        ]);
        let filtered = PopulationFilter::new("PROGRAMSUBTYPENAME", "ADOLOSCENT")
            .apply(&data)
            .unwrap();

        assert_eq!(filtered.len(), 2);
        let rows: Vec<_> = filtered.records().map(|r| r.get("row")).collect();
        assert_eq!(rows, vec![Some("0"), Some("3")]);
        assert_eq!(filtered.record(1).unwrap().id().0, 3);
    }

    #[test]
    fn test_apply_on_empty_population() {
        let data = dataset(&[Some("CHILD")]);
        let filtered = PopulationFilter::new("PROGRAMSUBTYPENAME", "ADOLOSCENT")
            .apply(&data)
            .unwrap();
        assert!(filtered.is_empty());
        assert_eq!(filtered.column_names().len(), 2);
    }

    #[test]
    fn test_missing_column() {
        let data = dataset(&[Some("ADOLOSCENT")]);
        let err = PopulationFilter::new("SUBTYPE", "ADOLOSCENT")
            .apply(&data)
            .unwrap_err();
        assert!(matches!(err, Error::MissingColumns { .. }));
    }

    #[test]
    fn test_count_alternative() {
        let data = dataset(&[Some("ADOLESCENT"), Some("adolescent"), Some("ADOLOSCENT")]);
        let filter = PopulationFilter::new("PROGRAMSUBTYPENAME", "ADOLOSCENT");
        assert_eq!(filter.count_alternative(&data, "ADOLESCENT"), 2);
    }
}
