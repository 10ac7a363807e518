//! Stabilized tables and their CSV form.

use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::integration::table::{Column, TableSchema};
use crate::tracker::{StabilizationReport, StabilizedRow};

/// Dense per-(frame, identity) output of the stabilizer, sorted by
/// `(frame_id, stable_id)`.
#[derive(Debug, Clone)]
pub struct StabilizedTable {
    schema: TableSchema,
    rows: Vec<StabilizedRow>,
    report: StabilizationReport,
}

impl StabilizedTable {
    /// Sorts `rows` by `(frame_id, stable_id)`.
    pub fn new(schema: TableSchema, mut rows: Vec<StabilizedRow>, report: StabilizationReport) -> Self {
        rows.sort_by_key(|r| (r.frame_id, r.stable_id));
        Self {
            schema,
            rows,
            report,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Column names, always ending in `stable_id`.
    pub fn headers(&self) -> Vec<&str> {
        self.schema.output_headers()
    }

    pub fn rows(&self) -> &[StabilizedRow] {
        &self.rows
    }

    pub fn report(&self) -> &StabilizationReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, frame_id: u64, stable_id: u32) -> Option<&StabilizedRow> {
        self.rows
            .binary_search_by_key(&(frame_id, stable_id), |r| (r.frame_id, r.stable_id))
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Rows of one frame, ordered by identity.
    pub fn frame(&self, frame_id: u64) -> &[StabilizedRow] {
        let start = self.rows.partition_point(|r| r.frame_id < frame_id);
        let end = self.rows.partition_point(|r| r.frame_id <= frame_id);
        &self.rows[start..end]
    }

    /// Distinct frame ids, ascending.
    pub fn frame_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.rows.iter().map(|r| r.frame_id).collect();
        ids.dedup();
        ids
    }

    pub fn write_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        self.write_to(std::io::BufWriter::new(file))
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.headers())?;

        let columns = self.schema.columns();
        let mut record = Vec::with_capacity(columns.len() + 1);
        for row in &self.rows {
            record.clear();
            record.extend(columns.iter().map(|&c| format_cell(row, c)));
            record.push(row.stable_id.to_string());
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

fn format_cell(row: &StabilizedRow, column: Column) -> String {
    match column {
        Column::FrameId => row.frame_id.to_string(),
        Column::ClassId => row.class_id.map(|c| c.to_string()).unwrap_or_default(),
        // Debug keeps a trailing `.0` on integral values and prints `NaN`.
        Column::X => format!("{:?}", row.x()),
        Column::Y => format!("{:?}", row.y()),
        Column::Extra(i) => row.extras.get(i).cloned().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::FillKind;
    use nalgebra::Point2;

    fn row(frame_id: u64, stable_id: u32, x: f64, fill: FillKind) -> StabilizedRow {
        StabilizedRow {
            frame_id,
            stable_id,
            position: Point2::new(x, 1.0),
            class_id: Some(2),
            extras: vec!["e".to_string()],
            fill,
        }
    }

    #[test]
    fn test_rows_sorted_and_indexed() {
        let table = StabilizedTable::new(
            TableSchema::with_extra_columns(vec!["note".to_string()]),
            vec![
                row(1, 2, 0.0, FillKind::Observed),
                row(0, 2, 0.0, FillKind::Observed),
                row(1, 1, 0.0, FillKind::Observed),
                row(0, 1, 0.0, FillKind::Observed),
            ],
            StabilizationReport::default(),
        );
        let keys: Vec<(u64, u32)> = table.rows().iter().map(|r| (r.frame_id, r.stable_id)).collect();
        assert_eq!(keys, vec![(0, 1), (0, 2), (1, 1), (1, 2)]);
        assert_eq!(table.frame_ids(), vec![0, 1]);
        assert_eq!(table.frame(1).len(), 2);
        assert!(table.get(1, 2).is_some());
        assert!(table.get(2, 1).is_none());
    }

    #[test]
    fn test_write_csv() {
        let mut placeholder = row(0, 2, f64::NAN, FillKind::Placeholder);
        placeholder.class_id = None;
        placeholder.extras = vec![String::new()];

        let table = StabilizedTable::new(
            TableSchema::with_extra_columns(vec!["note".to_string()]),
            vec![row(0, 1, 10.0, FillKind::Observed), placeholder],
            StabilizationReport::default(),
        );
        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "frame_id,class_id,x,y,note,stable_id\n0,2,10.0,1.0,e,1\n0,,NaN,1.0,,2\n"
        );
    }

    #[test]
    fn test_empty_table_keeps_stable_id_header() {
        let table = StabilizedTable::new(TableSchema::default(), Vec::new(), StabilizationReport::default());
        assert!(table.is_empty());
        assert!(table.headers().contains(&"stable_id"));

        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "frame_id,class_id,x,y,stable_id\n");
    }
}
