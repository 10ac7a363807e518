//! StabilizationPipeline for running the stabilizer over CSV files.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::tracker::{IdentityStabilizer, StabilizerConfig};

use super::{DetectionTable, StabilizedTable};

/// Default output path: `<stem>_fixed_ids.csv` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "detections".to_string());
    input.with_file_name(format!("{stem}_fixed_ids.csv"))
}

/// Reads a raw detection table, stabilizes it and optionally writes the result.
pub struct StabilizationPipeline {
    stabilizer: IdentityStabilizer,
}

impl StabilizationPipeline {
    /// Create a new pipeline from a stabilizer configuration.
    pub fn new(config: StabilizerConfig) -> Result<Self> {
        Ok(Self {
            stabilizer: IdentityStabilizer::new(config)?,
        })
    }

    /// Stabilize an in-memory table.
    pub fn process_table(&self, table: &DetectionTable) -> Result<StabilizedTable> {
        self.stabilizer.run(table)
    }

    /// Read `input`, stabilize it and write to `output` when given.
    pub fn process_path(&self, input: &Path, output: Option<&Path>) -> Result<StabilizedTable> {
        info!(path = %input.display(), "reading detections");
        let table = DetectionTable::from_path(input)?;
        let stabilized = self.process_table(&table)?;

        if let Some(output) = output {
            stabilized.write_path(output)?;
            info!(path = %output.display(), rows = stabilized.len(), "wrote stabilized table");
        }
        Ok(stabilized)
    }

    /// Get a reference to the underlying stabilizer.
    pub fn stabilizer(&self) -> &IdentityStabilizer {
        &self.stabilizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Detection;

    #[test]
    fn test_default_output_path() {
        let path = default_output_path(Path::new("/data/run1/video_raw.csv"));
        assert_eq!(path, PathBuf::from("/data/run1/video_raw_fixed_ids.csv"));
    }

    #[test]
    fn test_stabilization_pipeline() {
        let pipeline = StabilizationPipeline::new(StabilizerConfig::new(1)).unwrap();
        let table = DetectionTable::new(vec![
            Detection::new(0, 2, 1.0, 1.0),
            Detection::new(2, 2, 3.0, 3.0),
        ]);
        let out = pipeline.process_table(&table).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.get(1, 1).unwrap().x(), 2.0);
    }
}
