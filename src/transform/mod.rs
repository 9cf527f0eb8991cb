//! Batch transforms used by the audit pipeline.
//!
//! Transforms take a RecordBatch and produce a new RecordBatch. The schema
//! normalizer reads every extract through [`ToText`].

use std::sync::Arc;

use arrow::{
    array::{Array, ArrayRef, AsArray, RecordBatch, StringArray},
    compute::cast,
    datatypes::{DataType, Field, Schema},
};

use crate::error::{Error, Result};

/// A transform that can be applied to RecordBatches.
pub trait Transform: Send + Sync {
    /// Applies the transform to a RecordBatch.
    ///
    /// # Errors
    ///
    /// Returns an error if the transform cannot be applied to the batch.
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch>;
}

/// Converts every column to trimmed text.
///
/// Non-text columns are cast to `Utf8`. Every value is trimmed and values
/// that are empty after trimming become nulls, so later stages only ever see
/// one representation of "no value".
#[derive(Debug, Clone, Copy, Default)]
pub struct ToText;

impl ToText {
    fn column_to_text(name: &str, column: &ArrayRef) -> Result<StringArray> {
        let casted = if column.data_type() == &DataType::Utf8 {
            Arc::clone(column)
        } else {
            cast(column.as_ref(), &DataType::Utf8).map_err(|e| {
                Error::parse(format!("column '{}' cannot be read as text: {}", name, e))
            })?
        };

        let strings = casted
            .as_string_opt::<i32>()
            .ok_or_else(|| Error::parse(format!("column '{}' did not cast to text", name)))?;

        Ok(strings
            .iter()
            .map(|value| value.map(str::trim).filter(|v| !v.is_empty()))
            .collect())
    }
}

impl Transform for ToText {
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch> {
        let schema = batch.schema();
        let mut fields = Vec::with_capacity(schema.fields().len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

        for (idx, field) in schema.fields().iter().enumerate() {
            let text = Self::column_to_text(field.name(), batch.column(idx))?;
            fields.push(Field::new(field.name(), DataType::Utf8, true));
            arrays.push(Arc::new(text));
        }

        let new_schema = Arc::new(Schema::new(fields));
        if arrays.is_empty() {
            return Ok(RecordBatch::new_empty(new_schema));
        }
        RecordBatch::try_new(new_schema, arrays).map_err(Error::Arrow)
    }
}
