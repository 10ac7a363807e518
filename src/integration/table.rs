//! Detection tables read from CSV.

use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::debug;

use crate::error::{Error, Result};
use crate::tracker::Detection;

pub const FRAME_ID: &str = "frame_id";
pub const CLASS_ID: &str = "class_id";
pub const X: &str = "x";
pub const Y: &str = "y";
pub const STABLE_ID: &str = "stable_id";

/// A column of a detection table, in header order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    FrameId,
    ClassId,
    X,
    Y,
    /// Index into [`TableSchema::extra_columns`]
    Extra(usize),
}

/// Column layout of a detection table.
///
/// Stabilized output keeps this layout and appends `stable_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<Column>,
    extra_columns: Vec<String>,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self::with_extra_columns(Vec::new())
    }
}

impl TableSchema {
    /// `frame_id, class_id, x, y` followed by the given passthrough columns.
    pub fn with_extra_columns(extra_columns: Vec<String>) -> Self {
        let mut columns = vec![Column::FrameId, Column::ClassId, Column::X, Column::Y];
        columns.extend((0..extra_columns.len()).map(Column::Extra));
        Self {
            columns,
            extra_columns,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    pub fn has_class_id(&self) -> bool {
        self.columns.contains(&Column::ClassId)
    }

    pub fn column_name(&self, column: Column) -> &str {
        match column {
            Column::FrameId => FRAME_ID,
            Column::ClassId => CLASS_ID,
            Column::X => X,
            Column::Y => Y,
            Column::Extra(i) => &self.extra_columns[i],
        }
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|&c| self.column_name(c)).collect()
    }

    /// Input headers followed by `stable_id`.
    pub fn output_headers(&self) -> Vec<&str> {
        let mut headers = self.headers();
        headers.push(STABLE_ID);
        headers
    }
}

/// Where each schema column lives in a CSV record.
struct RecordLayout {
    frame_id: Option<usize>,
    class_id: Option<usize>,
    x: Option<usize>,
    y: Option<usize>,
    extras: Vec<usize>,
}

impl RecordLayout {
    fn slot_mut(&mut self, column: Column) -> Option<&mut Option<usize>> {
        match column {
            Column::FrameId => Some(&mut self.frame_id),
            Column::ClassId => Some(&mut self.class_id),
            Column::X => Some(&mut self.x),
            Column::Y => Some(&mut self.y),
            Column::Extra(_) => None,
        }
    }
}

fn parse_headers(headers: &StringRecord) -> (TableSchema, RecordLayout) {
    let mut columns = Vec::new();
    let mut extra_columns = Vec::new();
    let mut layout = RecordLayout {
        frame_id: None,
        class_id: None,
        x: None,
        y: None,
        extras: Vec::new(),
    };

    for (pos, name) in headers.iter().enumerate() {
        let known = match name {
            FRAME_ID => Some(Column::FrameId),
            CLASS_ID => Some(Column::ClassId),
            X => Some(Column::X),
            Y => Some(Column::Y),
            STABLE_ID => {
                debug!("ignoring existing stable_id column in input");
                continue;
            }
            _ => None,
        };
        if let Some(column) = known {
            if let Some(slot) = layout.slot_mut(column).filter(|s| s.is_none()) {
                *slot = Some(pos);
                columns.push(column);
                continue;
            }
        }
        // Repeated or unknown names are carried through untouched.
        columns.push(Column::Extra(extra_columns.len()));
        extra_columns.push(name.to_string());
        layout.extras.push(pos);
    }

    (
        TableSchema {
            columns,
            extra_columns,
        },
        layout,
    )
}

/// A table of raw detections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionTable {
    schema: TableSchema,
    detections: Vec<Detection>,
}

impl DetectionTable {
    /// Build a table with the standard layout and no passthrough columns.
    /// Row indices are assigned in order.
    pub fn new(detections: Vec<Detection>) -> Self {
        Self::with_schema(TableSchema::default(), detections)
    }

    pub fn with_schema(schema: TableSchema, detections: Vec<Detection>) -> Self {
        let detections = detections
            .into_iter()
            .enumerate()
            .map(|(row, det)| det.with_row(row))
            .collect();
        Self { schema, detections }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Read a CSV table with a header row.
    ///
    /// `frame_id`, `x` and `y` are always required; `class_id` is required
    /// once the table has any rows.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader.headers()?.clone();
        let records = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;

        let (schema, layout) = parse_headers(&headers);

        let mut missing = Vec::new();
        for (name, position, required) in [
            (FRAME_ID, layout.frame_id, true),
            (CLASS_ID, layout.class_id, !records.is_empty()),
            (X, layout.x, true),
            (Y, layout.y, true),
        ] {
            if required && position.is_none() {
                missing.push(name.to_string());
            }
        }
        if !missing.is_empty() {
            return Err(Error::MissingColumns(missing));
        }

        if records.is_empty() {
            return Ok(Self {
                schema,
                detections: Vec::new(),
            });
        }
        let (Some(frame_pos), Some(class_pos), Some(x_pos), Some(y_pos)) =
            (layout.frame_id, layout.class_id, layout.x, layout.y)
        else {
            return Err(Error::MissingColumns(missing));
        };

        let mut detections = Vec::with_capacity(records.len());
        for (row, record) in records.iter().enumerate() {
            let cell = move |pos: usize| record.get(pos).unwrap_or("");
            let frame_id = parse_integer(cell(frame_pos), row, FRAME_ID)?;
            let frame_id =
                u64::try_from(frame_id).map_err(|_| invalid(row, FRAME_ID, cell(frame_pos)))?;
            let class_id = parse_integer(cell(class_pos), row, CLASS_ID)?;
            let x = parse_coordinate(cell(x_pos), row, X)?;
            let y = parse_coordinate(cell(y_pos), row, Y)?;
            let extras = layout.extras.iter().map(|&pos| cell(pos).to_string()).collect();

            detections.push(
                Detection::new(frame_id, class_id, x, y)
                    .with_row(row)
                    .with_extras(extras),
            );
        }

        debug!(rows = detections.len(), columns = headers.len(), "read detection table");
        Ok(Self { schema, detections })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn into_detections(self) -> Vec<Detection> {
        self.detections
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Smallest and largest frame id, or `None` for an empty table.
    pub fn frame_range(&self) -> Option<(u64, u64)> {
        let first = self.detections.iter().map(|d| d.frame_id).min()?;
        let last = self.detections.iter().map(|d| d.frame_id).max()?;
        Some((first, last))
    }

    /// Number of distinct frame ids.
    pub fn frame_count(&self) -> usize {
        let mut frames: Vec<u64> = self.detections.iter().map(|d| d.frame_id).collect();
        frames.sort_unstable();
        frames.dedup();
        frames.len()
    }

    /// Copy of the table without rows of `class_id`. Row order, row indices
    /// and columns are preserved.
    pub fn without_class(&self, class_id: i64) -> Self {
        Self {
            schema: self.schema.clone(),
            detections: self
                .detections
                .iter()
                .filter(|d| d.class_id != class_id)
                .cloned()
                .collect(),
        }
    }
}

fn invalid(row: usize, column: &str, value: &str) -> Error {
    Error::InvalidValue {
        row,
        column: column.to_string(),
        value: value.to_string(),
    }
}

/// Integers, also accepting integral floats such as `3.0`.
fn parse_integer(value: &str, row: usize, column: &str) -> Result<i64> {
    if let Ok(v) = value.parse::<i64>() {
        return Ok(v);
    }
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(v as i64),
        _ => Err(invalid(row, column, value)),
    }
}

fn parse_coordinate(value: &str, row: usize, column: &str) -> Result<f64> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(invalid(row, column, value)),
    }
}
