use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a deployment stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StackStatus {
    Absent,
    CreateInProgress,
    CreateComplete,
    CreateFailed,
    UpdateInProgress,
    UpdateComplete,
    UpdateFailed,
    /// Desired state already matched; a success, never an error
    NoUpdates,
    RollbackComplete,
    /// Update rollback stuck; only `continue-update-rollback` clears it
    UpdateRollbackFailed,
}

impl StackStatus {
    /// Maps a CloudFormation status. `None` for states this tool does not
    /// drive (deletes, imports, reviews).
    pub fn from_cloudformation(raw: &str) -> Option<Self> {
        let status = match raw {
            "CREATE_IN_PROGRESS" | "ROLLBACK_IN_PROGRESS" => Self::CreateInProgress,
            "CREATE_COMPLETE" => Self::CreateComplete,
            "CREATE_FAILED" | "ROLLBACK_FAILED" => Self::CreateFailed,
            "ROLLBACK_COMPLETE" => Self::RollbackComplete,
            "UPDATE_IN_PROGRESS"
            | "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS"
            | "UPDATE_ROLLBACK_IN_PROGRESS"
            | "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS" => Self::UpdateInProgress,
            "UPDATE_COMPLETE" => Self::UpdateComplete,
            "UPDATE_FAILED" | "UPDATE_ROLLBACK_COMPLETE" => Self::UpdateFailed,
            "UPDATE_ROLLBACK_FAILED" => Self::UpdateRollbackFailed,
            "DELETE_COMPLETE" => Self::Absent,
            _ => return None,
        };
        Some(status)
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::CreateInProgress | Self::UpdateInProgress)
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::CreateComplete | Self::UpdateComplete | Self::NoUpdates
        )
    }

    /// Failed states that only an operator can clear
    pub fn is_stale_failure(&self) -> bool {
        matches!(
            self,
            Self::CreateFailed | Self::RollbackComplete | Self::UpdateRollbackFailed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::CreateInProgress => "create-in-progress",
            Self::CreateComplete => "create-complete",
            Self::CreateFailed => "create-failed",
            Self::UpdateInProgress => "update-in-progress",
            Self::UpdateComplete => "update-complete",
            Self::UpdateFailed => "update-failed",
            Self::NoUpdates => "no-updates",
            Self::RollbackComplete => "rollback-complete",
            Self::UpdateRollbackFailed => "update-rollback-failed",
        }
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        create_in_progress = { "CREATE_IN_PROGRESS", Some(StackStatus::CreateInProgress) },
        rollback_in_progress = { "ROLLBACK_IN_PROGRESS", Some(StackStatus::CreateInProgress) },
        create_complete = { "CREATE_COMPLETE", Some(StackStatus::CreateComplete) },
        create_failed = { "CREATE_FAILED", Some(StackStatus::CreateFailed) },
        rollback_failed = { "ROLLBACK_FAILED", Some(StackStatus::CreateFailed) },
        rollback_complete = { "ROLLBACK_COMPLETE", Some(StackStatus::RollbackComplete) },
        update_in_progress = { "UPDATE_IN_PROGRESS", Some(StackStatus::UpdateInProgress) },
        update_cleanup = { "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS", Some(StackStatus::UpdateInProgress) },
        update_rollback_in_progress = { "UPDATE_ROLLBACK_IN_PROGRESS", Some(StackStatus::UpdateInProgress) },
        update_complete = { "UPDATE_COMPLETE", Some(StackStatus::UpdateComplete) },
        update_rollback_complete = { "UPDATE_ROLLBACK_COMPLETE", Some(StackStatus::UpdateFailed) },
        update_rollback_failed = { "UPDATE_ROLLBACK_FAILED", Some(StackStatus::UpdateRollbackFailed) },
        delete_complete = { "DELETE_COMPLETE", Some(StackStatus::Absent) },
        delete_in_progress = { "DELETE_IN_PROGRESS", None },
        review = { "REVIEW_IN_PROGRESS", None },
    )]
    fn test_cloudformation_mapping(raw: &str, expected: Option<StackStatus>) {
        assert_eq!(StackStatus::from_cloudformation(raw), expected);
    }

    #[test]
    fn test_no_updates_is_success() {
        assert!(StackStatus::NoUpdates.is_success());
        assert!(!StackStatus::NoUpdates.is_in_progress());
        assert_eq!(StackStatus::NoUpdates.to_string(), "no-updates");
    }

    #[test]
    fn test_stale_failures() {
        assert!(StackStatus::CreateFailed.is_stale_failure());
        assert!(StackStatus::RollbackComplete.is_stale_failure());
        assert!(StackStatus::UpdateRollbackFailed.is_stale_failure());
        assert!(!StackStatus::UpdateFailed.is_stale_failure());
    }
}
