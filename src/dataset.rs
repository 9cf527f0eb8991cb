//! Tabular extract types for cprf-audit.
//!
//! A [`RawTable`] is what an ingestion collaborator hands over: a header row
//! plus rows of untyped [`Cell`]s. After normalization the pipeline works on
//! a [`TextDataset`], an Arrow `RecordBatch` whose columns are all `Utf8`,
//! read through borrowed [`Record`] views.

use std::{collections::HashSet, path::Path, sync::Arc};

use arrow::{
    array::{Array, ArrayRef, AsArray, BooleanArray, RecordBatch, StringArray},
    compute::{concat_batches, filter_record_batch},
    datatypes::{DataType, Field, Schema, SchemaRef},
};
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};

/// A single untyped cell as supplied by the source extract.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// No value
    Empty,
    /// Text value
    Text(String),
    /// Whole number
    Int(i64),
    /// Floating point number
    Number(f64),
    /// Boolean
    Bool(bool),
    /// Calendar date
    Date(NaiveDate),
    /// Date with time of day
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Renders the cell as text, `None` for [`Cell::Empty`].
    ///
    /// Whole-valued floats render without a fractional part so that phone
    /// numbers and codes stored as numbers by a spreadsheet keep their digits.
    /// Dates render day-first.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(s) => Some(s.clone()),
            Self::Int(i) => Some(i.to_string()),
            Self::Number(n) => Some(format_number(*n)),
            Self::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Self::Date(d) => Some(d.format("%d/%m/%Y").to_string()),
            Self::DateTime(dt) if dt.time() == chrono::NaiveTime::MIN => {
                Some(dt.format("%d/%m/%Y").to_string())
            }
            Self::DateTime(dt) => Some(dt.format("%d/%m/%Y %H:%M:%S").to_string()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A header row plus untyped rows, as handed over by ingestion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    header: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Creates a raw table from a header and rows.
    pub fn new<S: Into<String>>(header: impl IntoIterator<Item = S>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    /// Creates a raw table where every cell is text.
    ///
    /// Convenient for callers that already hold string data.
    pub fn from_text_rows<H, R, C>(header: impl IntoIterator<Item = H>, rows: R) -> Self
    where
        H: Into<String>,
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<Cell>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        Self::new(header, rows)
    }

    /// Header names in source order.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Converts every cell to text and builds a single all-`Utf8` batch.
    ///
    /// Rows shorter than the header are padded with empty cells.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if a row has more cells than the header.
    pub fn into_record_batch(self) -> Result<RecordBatch> {
        let width = self.header.len();
        let mut columns: Vec<Vec<Option<String>>> =
            vec![Vec::with_capacity(self.rows.len()); width];

        for (row_idx, row) in self.rows.iter().enumerate() {
            if row.len() > width {
                return Err(Error::parse(format!(
                    "row {} has {} cells but the header has {}",
                    row_idx + 1,
                    row.len(),
                    width
                )));
            }
            for (col_idx, column) in columns.iter_mut().enumerate() {
                column.push(row.get(col_idx).and_then(Cell::to_text));
            }
        }

        let fields: Vec<Field> = self
            .header
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect();
        let arrays: Vec<ArrayRef> = columns
            .into_iter()
            .map(|values| Arc::new(StringArray::from(values)) as ArrayRef)
            .collect();

        let schema = Arc::new(Schema::new(fields));
        if arrays.is_empty() {
            return Ok(RecordBatch::new_empty(schema));
        }
        RecordBatch::try_new(schema, arrays).map_err(Error::Arrow)
    }
}

/// Options for CSV ingestion.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Delimiter character (default is comma).
    pub delimiter: Option<u8>,
    /// Batch size for reading.
    pub batch_size: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            batch_size: 8192,
        }
    }
}

impl CsvOptions {
    /// Sets the delimiter character.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
}

/// Loads an extract from disk based on its extension.
///
/// CSV files go through the Arrow CSV reader; workbooks are read with
/// their first worksheet.
///
/// # Errors
///
/// Returns an error if the format is unsupported or the file is unreadable.
pub fn load_extract(path: impl AsRef<Path>) -> Result<RecordBatch> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => read_csv(path, &CsvOptions::default()),
        "tsv" => read_csv(path, &CsvOptions::default().with_delimiter(b'\t')),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path)?.into_record_batch(),
        ext => Err(Error::unsupported_format(ext)),
    }
}

/// Reads a CSV file with every column typed as text.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not valid CSV.
pub fn read_csv(path: impl AsRef<Path>, options: &CsvOptions) -> Result<RecordBatch> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| Error::io(e, path))?;
    read_csv_from(std::io::BufReader::new(file), options)
}

/// Reads CSV text with every column typed as text.
///
/// # Errors
///
/// Returns an error if the text is not valid CSV.
pub fn read_csv_str(data: &str) -> Result<RecordBatch> {
    read_csv_from(std::io::Cursor::new(data.as_bytes()), &CsvOptions::default())
}

fn read_csv_from<R>(mut reader: R, options: &CsvOptions) -> Result<RecordBatch>
where
    R: std::io::BufRead + std::io::Seek,
{
    use std::io::SeekFrom;

    use arrow_csv::{reader::Format, ReaderBuilder};

    let mut format = Format::default().with_header(true);
    if let Some(delim) = options.delimiter {
        format = format.with_delimiter(delim);
    }
    let (inferred, _) = format
        .infer_schema(&mut reader, Some(1))
        .map_err(Error::Arrow)?;
    reader
        .seek(SeekFrom::Start(0))
        .map_err(Error::io_no_path)?;

    // Every column is read as text, whatever the values look like.
    let names = header_names(inferred.fields().iter().map(|f| f.name()));
    let schema: SchemaRef = Arc::new(Schema::new(
        names
            .into_iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));

    let mut builder = ReaderBuilder::new(Arc::clone(&schema))
        .with_batch_size(options.batch_size)
        .with_header(true)
        .with_truncated_rows(true);
    if let Some(delim) = options.delimiter {
        builder = builder.with_delimiter(delim);
    }

    let batches: Vec<RecordBatch> = builder
        .build(reader)
        .map_err(Error::Arrow)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::Arrow)?;

    concat_batches(&schema, &batches).map_err(Error::Arrow)
}

/// Column names as both loaders present them.
///
/// Names are trimmed. A blank header becomes `Unnamed: {col}` (0-based) and
/// a repeated one gets a `.1`, `.2`, … suffix, so every column keeps a
/// distinct name and extra columns pass through.
pub fn header_names<S: AsRef<str>>(raw: impl IntoIterator<Item = S>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(col, name)| {
            let name = name.as_ref().trim();
            let base = if name.is_empty() {
                format!("Unnamed: {col}")
            } else {
                name.to_string()
            };
            let mut candidate = base.clone();
            let mut n = 1;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{base}.{n}");
                n += 1;
            }
            candidate
        })
        .collect()
}

/// Reads the first worksheet of a workbook into a raw table.
///
/// # Errors
///
/// Returns an error if the workbook cannot be opened, has no worksheet, or
/// has no header row.
pub fn read_workbook(path: impl AsRef<Path>) -> Result<RawTable> {
    use calamine::{open_workbook_auto, Data, Reader};

    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(Error::EmptyDataset)??;

    let mut rows = range.rows();
    let header = header_names(
        rows.next()
            .ok_or(Error::EmptyDataset)?
            .iter()
            .map(ToString::to_string),
    );

    let body = rows
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty => Cell::Empty,
                    Data::String(s) => Cell::Text(s.clone()),
                    Data::Int(i) => Cell::Int(*i),
                    Data::Float(f) => Cell::Number(*f),
                    Data::Bool(b) => Cell::Bool(*b),
                    Data::DateTime(dt) => dt
                        .as_datetime()
                        .map_or(Cell::Number(dt.as_f64()), Cell::DateTime),
                    Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
                    Data::Error(e) => Cell::Text(e.to_string()),
                })
                .collect()
        })
        .collect();

    Ok(RawTable::new(header, body))
}

/// Stable identity of a record: its 0-based position in the source extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(pub usize);

/// A normalized, read-only table whose cells are all text.
///
/// Null cells are Arrow nulls. Each row remembers the [`RowId`] it had in
/// the source extract, so filtered tables still point back to the input.
#[derive(Debug, Clone)]
pub struct TextDataset {
    batch: RecordBatch,
    schema: SchemaRef,
    columns: Vec<StringArray>,
    row_ids: Vec<RowId>,
}

impl TextDataset {
    /// Wraps an all-`Utf8` batch, numbering rows from zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if a column is not `Utf8`.
    pub fn from_batch(batch: RecordBatch) -> Result<Self> {
        let row_ids = (0..batch.num_rows()).map(RowId).collect();
        Self::with_row_ids(batch, row_ids)
    }

    fn with_row_ids(batch: RecordBatch, row_ids: Vec<RowId>) -> Result<Self> {
        let schema = batch.schema();
        let columns = batch
            .columns()
            .iter()
            .zip(schema.fields())
            .map(|(col, field)| {
                col.as_string_opt::<i32>().cloned().ok_or_else(|| {
                    Error::parse(format!(
                        "column '{}' is {:?}, expected text",
                        field.name(),
                        field.data_type()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            batch,
            schema,
            columns,
            row_ids,
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.batch.num_rows()
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The underlying Arrow batch.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// The schema of the table.
    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    /// Column names in source order.
    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    /// Position of a column, matched case-sensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.index_of(name).ok()
    }

    /// Returns the record at a position.
    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        (index < self.len()).then_some(Record {
            dataset: self,
            index,
        })
    }

    /// Iterates over every record in order.
    pub fn records(&self) -> impl ExactSizeIterator<Item = Record<'_>> + '_ {
        (0..self.len()).map(move |index| Record {
            dataset: self,
            index,
        })
    }

    /// Keeps the rows where `mask` is true.
    ///
    /// # Errors
    ///
    /// Returns an error if the mask length differs from the row count.
    pub fn filter(&self, mask: &BooleanArray) -> Result<Self> {
        let batch = filter_record_batch(&self.batch, mask).map_err(Error::Arrow)?;
        let row_ids = self
            .row_ids
            .iter()
            .zip(mask.iter())
            .filter_map(|(id, keep)| keep.unwrap_or(false).then_some(*id))
            .collect();
        Self::with_row_ids(batch, row_ids)
    }

    /// Extracts the values of one column, keeping nulls.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingColumns`] if the column does not exist.
    pub fn column_values(&self, name: &str) -> Result<Vec<Option<&str>>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| Error::missing_columns([name]))?;
        Ok(self.columns[idx].iter().collect())
    }

    fn value(&self, row: usize, col: usize) -> Option<&str> {
        let column = self.columns.get(col)?;
        (!column.is_null(row)).then(|| column.value(row))
    }
}

/// A borrowed view of one row of a [`TextDataset`].
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    dataset: &'a TextDataset,
    index: usize,
}

impl<'a> Record<'a> {
    /// Position of the record in its table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Identity of the record in the source extract.
    pub fn id(&self) -> RowId {
        self.dataset.row_ids[self.index]
    }

    /// Value of a column by position; `None` for null cells.
    pub fn value(&self, column: usize) -> Option<&'a str> {
        self.dataset.value(self.index, column)
    }

    /// Value of a column by name; `None` for null cells or unknown columns.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.dataset
            .column_index(column)
            .and_then(|idx| self.value(idx))
    }

    /// Every value in column order.
    pub fn values(&self) -> impl Iterator<Item = Option<&'a str>> + 'a {
        let dataset = self.dataset;
        let index = self.index;
        (0..dataset.columns.len()).map(move |col| dataset.value(index, col))
    }
}
