mod config;
mod detection;
mod gap_fill;
mod identity_state;
pub mod matching;
mod report;
mod stabilizer;

pub use config::{
    ConfigFile, DEFAULT_FEEDER_CLASS_ID, MatchingStrategy, StabilizerConfig, UnobservedPolicy,
};
pub use detection::Detection;
pub use gap_fill::{FillKind, StabilizedRow, check_density, fill_identity, placeholder_rows};
pub use identity_state::{IdentitySlot, IdentityState, SlotState};
pub use report::StabilizationReport;
pub use stabilizer::{
    DenseTrajectories, FrameAssignment, IdentityStabilizer, SparseAssignments, filter_out_feeder,
    fix_ids, group_by_frame,
};
