//! States, history records and persistence targets

use crate::error::{ConfigError, VerifyError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A step of the verification cycle.
///
/// `Wait` is both the initial and the resting state; there is no
/// terminal state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase", try_from = "String")]
#[strum(serialize_all = "lowercase")]
pub enum VerifyState {
    Wait,
    Restore,
    Modify,
    Verify,
    Cleanup,
    Alarm,
}

impl VerifyState {
    /// Targets reachable from this state.
    ///
    /// Every state can move to `Alarm`; `Alarm` leaves only through
    /// `Cleanup` or by re-entering itself.
    pub fn allowed_targets(self) -> &'static [VerifyState] {
        use VerifyState::*;
        match self {
            Wait => &[Restore, Alarm],
            Restore => &[Modify, Alarm],
            Modify => &[Verify, Alarm],
            Verify => &[Cleanup, Alarm],
            Cleanup => &[Wait, Alarm],
            Alarm => &[Cleanup, Alarm],
        }
    }

    pub fn can_transition_to(self, to: VerifyState) -> bool {
        self.allowed_targets().contains(&to)
    }
}

impl TryFrom<String> for VerifyState {
    type Error = VerifyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse().map_err(|_| VerifyError::UnknownState(value))
    }
}

/// One entry of the state history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub state: VerifyState,
    /// Unix seconds
    pub timestamp: f64,
}

/// Where a state document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceTarget {
    /// S3 bucket; the key is derived from the database identifier
    Bucket(String),
    /// Local JSON file
    Path(PathBuf),
}

impl PersistenceTarget {
    /// Exactly one of `bucket` or `path` must be given. Empty values count
    /// as absent.
    pub fn from_parts(
        bucket: Option<&str>,
        path: Option<&std::path::Path>,
    ) -> Result<Self, ConfigError> {
        let bucket = bucket.filter(|b| !b.is_empty());
        let path = path.filter(|p| !p.as_os_str().is_empty());
        match (bucket, path) {
            (Some(_), Some(_)) => Err(ConfigError::BothTargets),
            (Some(bucket), None) => Ok(Self::Bucket(bucket.to_string())),
            (None, Some(path)) => Ok(Self::Path(path.to_path_buf())),
            (None, None) => Err(ConfigError::NoTarget),
        }
    }
}

impl std::fmt::Display for PersistenceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bucket(bucket) => write!(f, "s3://{bucket}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_state_can_alarm() {
        for state in VerifyState::iter() {
            assert!(state.can_transition_to(VerifyState::Alarm), "{state}");
        }
    }

    #[test]
    fn test_cycle_is_closed() {
        use VerifyState::*;
        let cycle = [Wait, Restore, Modify, Verify, Cleanup, Wait];
        for pair in cycle.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]));
        }
        assert!(!Wait.can_transition_to(Cleanup));
        assert!(!Alarm.can_transition_to(Wait));
        assert!(!Restore.can_transition_to(Restore));
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&VerifyState::Cleanup).unwrap();
        assert_eq!(json, "\"cleanup\"");
        let state: VerifyState = serde_json::from_str("\"restore\"").unwrap();
        assert_eq!(state, VerifyState::Restore);

        let err = serde_json::from_str::<VerifyState>("\"sleeping\"").unwrap_err();
        assert!(err.to_string().contains("Unknown state 'sleeping'"));
    }

    #[test]
    fn test_target_from_parts() {
        assert_eq!(
            PersistenceTarget::from_parts(Some("bucket"), None),
            Ok(PersistenceTarget::Bucket("bucket".to_string()))
        );
        assert_eq!(
            PersistenceTarget::from_parts(None, Some(Path::new("/tmp/doc.json"))),
            Ok(PersistenceTarget::Path("/tmp/doc.json".into()))
        );
        assert_eq!(
            PersistenceTarget::from_parts(Some("bucket"), Some(Path::new("doc.json"))),
            Err(ConfigError::BothTargets)
        );
        assert_eq!(
            PersistenceTarget::from_parts(Some(""), None),
            Err(ConfigError::NoTarget)
        );
    }
}
