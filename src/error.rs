//! Error type shared by the table layer and the stabilizer.

use thiserror::Error;

/// Errors produced while reading, stabilizing or writing detection tables.
#[derive(Debug, Error)]
pub enum Error {
    /// Required columns are absent from the input header.
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// A required cell could not be parsed.
    #[error("invalid value {value:?} in column `{column}` at row {row}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    /// The stabilizer configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An identity received no detection in the whole sequence.
    #[error("identity {stable_id} was never observed")]
    UnobservedIdentity { stable_id: u32 },

    /// The filled grid does not hold exactly one row per identity for a frame.
    #[error("frame {frame_id} has {found} rows after gap filling, expected {expected}")]
    DensityViolation {
        frame_id: u64,
        found: usize,
        expected: usize,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
