//! Stabilizer configuration and its YAML file form.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

/// Class label of the static feeder marker removed before assignment.
pub const DEFAULT_FEEDER_CLASS_ID: i64 = 1;

/// How detections are matched to observed identities in each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStrategy {
    /// Minimum total distance (Jonker-Volgenant), ties broken by identity
    /// then detection order
    #[default]
    Optimal,
    /// Nearest pair first, ties broken by identity then detection order
    Greedy,
}

/// What to do with an identity that never receives a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnobservedPolicy {
    /// Emit NaN positions for the identity and log a warning
    #[default]
    Placeholder,
    /// Abort the run with [`Error::UnobservedIdentity`]
    Fail,
}

/// Configuration for the [`IdentityStabilizer`](super::IdentityStabilizer).
#[derive(Debug, Clone, PartialEq)]
pub struct StabilizerConfig {
    pub num_objects: usize,
    pub feeder_class_id: i64,
    pub matching: MatchingStrategy,
    pub unobserved_policy: UnobservedPolicy,
    /// Let detections left over in later frames claim identities that were
    /// not filled on the first frame.
    pub activate_late_identities: bool,
}

impl StabilizerConfig {
    pub fn new(num_objects: usize) -> Self {
        Self {
            num_objects,
            feeder_class_id: DEFAULT_FEEDER_CLASS_ID,
            matching: MatchingStrategy::default(),
            unobserved_policy: UnobservedPolicy::default(),
            activate_late_identities: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_objects == 0 {
            return Err(Error::InvalidConfig(
                "num_objects must be a positive integer".to_string(),
            ));
        }
        if u32::try_from(self.num_objects).is_err() {
            return Err(Error::InvalidConfig(format!(
                "num_objects {} exceeds the supported maximum {}",
                self.num_objects,
                u32::MAX
            )));
        }
        Ok(())
    }
}

/// Stabilizer settings as read from a YAML file. Every key is optional.
///
/// ```yaml
/// num_objects: 5
/// feeder_class_id: 1
/// matching: greedy
/// unobserved_policy: fail
/// activate_late_identities: true
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub num_objects: Option<usize>,
    pub feeder_class_id: Option<i64>,
    pub matching: Option<MatchingStrategy>,
    pub unobserved_policy: Option<UnobservedPolicy>,
    pub activate_late_identities: Option<bool>,
}

impl ConfigFile {
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading stabilizer config");
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Resolve into a validated config. `num_objects` given here takes
    /// precedence over the file value.
    pub fn into_config(self, num_objects: Option<usize>) -> Result<StabilizerConfig> {
        let num_objects = num_objects.or(self.num_objects).ok_or_else(|| {
            Error::InvalidConfig("num_objects is required".to_string())
        })?;

        let mut config = StabilizerConfig::new(num_objects);
        if let Some(feeder) = self.feeder_class_id {
            config.feeder_class_id = feeder;
        }
        if let Some(matching) = self.matching {
            config.matching = matching;
        }
        if let Some(policy) = self.unobserved_policy {
            config.unobserved_policy = policy;
        }
        if let Some(late) = self.activate_late_identities {
            config.activate_late_identities = late;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_zero_objects() {
        let err = StabilizerConfig::new(0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(StabilizerConfig::new(5).validate().is_ok());
    }

    #[test]
    fn test_config_file_full() {
        let file = ConfigFile::from_yaml_str(
            "num_objects: 4\nfeeder_class_id: 7\nmatching: greedy\nunobserved_policy: fail\nactivate_late_identities: true\n",
        )
        .unwrap();
        let config = file.into_config(None).unwrap();
        assert_eq!(config.num_objects, 4);
        assert_eq!(config.feeder_class_id, 7);
        assert_eq!(config.matching, MatchingStrategy::Greedy);
        assert_eq!(config.unobserved_policy, UnobservedPolicy::Fail);
        assert!(config.activate_late_identities);
    }

    #[test]
    fn test_override_and_defaults() {
        let file = ConfigFile::from_yaml_str("num_objects: 4\n").unwrap();
        let config = file.into_config(Some(2)).unwrap();
        assert_eq!(config, StabilizerConfig::new(2));
    }

    #[test]
    fn test_missing_num_objects() {
        let file = ConfigFile::from_yaml_str("").unwrap();
        assert!(matches!(file.into_config(None), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            ConfigFile::from_yaml_str("num_objcts: 3\n"),
            Err(Error::Yaml(_))
        ));
    }
}
