//! Table I/O around the stabilizer.
//!
//! This module reads raw detection tables from CSV, validates their schema,
//! and writes the dense stabilized tables the stabilizer produces.

mod builder;
mod output;
mod pipeline;
mod table;

pub use builder::DetectionBuilder;
pub use output::StabilizedTable;
pub use pipeline::{StabilizationPipeline, default_output_path};
pub use table::{CLASS_ID, Column, DetectionTable, FRAME_ID, STABLE_ID, TableSchema, X, Y};
