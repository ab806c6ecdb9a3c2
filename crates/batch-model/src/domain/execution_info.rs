use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::{BuildId, ExecutionState, ProjectName, Seq};

/// Point-in-time view of one execution record.
///
/// The task is referenced by owner and name, not by a live definition,
/// since the definition may change after the record was allocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInfo {
    /// Sequence number inside the run log (starts at 1).
    pub seq: Seq,
    /// Owning project of the executed task.
    pub project: ProjectName,
    /// Name of the executed task.
    pub task: String,
    /// Build the run log is attached to.
    pub build: BuildId,
    pub state: ExecutionState,
    /// Set when the record enters `Running`.
    #[serde(default, with = "opt_time_serde", skip_serializing_if = "Option::is_none")]
    pub started_at: Option<SystemTime>,
    /// Set when the record reaches a terminal state.
    #[serde(default, with = "opt_time_serde", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<SystemTime>,
    /// Captured output lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<String>,
}

mod opt_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(t) => {
                let since_epoch = t
                    .duration_since(UNIX_EPOCH)
                    .map_err(serde::ser::Error::custom)?;
                Some(since_epoch.as_millis() as u64).serialize(serializer)
            }
            None => None::<u64>.serialize(serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SystemTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(|ms| UNIX_EPOCH + Duration::from_millis(ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn info(state: ExecutionState) -> ExecutionInfo {
        ExecutionInfo {
            seq: 1,
            project: ProjectName::from("app"),
            task: "deploy".to_string(),
            build: BuildId::new("app", 7),
            state,
            started_at: None,
            completed_at: None,
            log: Vec::new(),
        }
    }

    #[test]
    fn pending_record_omits_timestamps_and_log() {
        let json = serde_json::to_string(&info(ExecutionState::Pending)).unwrap();
        assert!(!json.contains("startedAt"));
        assert!(!json.contains("completedAt"));
        assert!(!json.contains("log"));
        assert!(json.contains(r#""state":"pending""#));
        assert!(json.contains(r#""build":{"project":"app","number":7}"#));
    }

    #[test]
    fn timestamps_keep_millisecond_precision() {
        let mut finished = info(ExecutionState::Succeeded);
        finished.started_at = Some(UNIX_EPOCH + Duration::from_millis(1_700_000_000_123));
        finished.completed_at = Some(UNIX_EPOCH + Duration::from_millis(1_700_000_000_456));
        finished.log = vec!["ok".to_string()];

        let json = serde_json::to_string(&finished).unwrap();
        assert!(json.contains(r#""startedAt":1700000000123"#));

        let back: ExecutionInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, finished);
    }
}
