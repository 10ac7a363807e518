//! Stable identity assignment for per-frame centroid detections.
//!
//! A detector labels objects per frame with no cross-frame identity. The
//! [`IdentityStabilizer`] turns such a table into `num_objects` continuous
//! trajectories: one row per (frame, identity), with gaps interpolated or
//! held at the nearest observation.
//!
//! ```no_run
//! use beetrack_rs::{DetectionTable, fix_ids};
//!
//! let table = DetectionTable::from_path("video_raw.csv")?;
//! let stabilized = fix_ids(&table, 5)?;
//! stabilized.write_path("video_fixed_ids.csv")?;
//! # Ok::<(), beetrack_rs::Error>(())
//! ```

pub mod error;
pub mod integration;
pub mod tracker;

pub use error::{Error, Result};
pub use integration::{
    DetectionBuilder, DetectionTable, StabilizationPipeline, StabilizedTable, TableSchema,
};
pub use tracker::{
    Detection, FillKind, IdentityStabilizer, MatchingStrategy, StabilizationReport,
    StabilizedRow, StabilizerConfig, UnobservedPolicy, filter_out_feeder, fix_ids,
};
