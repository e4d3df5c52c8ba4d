use crate::error::LifecycleError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// LifecycleKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleKind {
    Push,
    Issue,
    PullRequest,
    Review,
}

impl LifecycleKind {
    pub fn all() -> &'static [LifecycleKind] {
        &[
            LifecycleKind::Push,
            LifecycleKind::Issue,
            LifecycleKind::PullRequest,
            LifecycleKind::Review,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleKind::Push => "push",
            LifecycleKind::Issue => "issue",
            LifecycleKind::PullRequest => "pull_request",
            LifecycleKind::Review => "review",
        }
    }

    /// Prefix of the thread identity for this kind of lifecycle.
    pub fn thread_prefix(self) -> &'static str {
        match self {
            LifecycleKind::Push => "push_lifecycle",
            LifecycleKind::Issue => "issue_lifecycle",
            LifecycleKind::PullRequest => "pr_lifecycle",
            LifecycleKind::Review => "review_lifecycle",
        }
    }
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// GoalState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalState {
    Planned,
    Requested,
    InProcess,
    WaitingForApproval,
    Approved,
    WaitingForPreApproval,
    PreApproved,
    Success,
    Failure,
    Skipped,
    Stopped,
    Canceled,
}

impl GoalState {
    pub fn as_str(self) -> &'static str {
        match self {
            GoalState::Planned => "planned",
            GoalState::Requested => "requested",
            GoalState::InProcess => "in_process",
            GoalState::WaitingForApproval => "waiting_for_approval",
            GoalState::Approved => "approved",
            GoalState::WaitingForPreApproval => "waiting_for_pre_approval",
            GoalState::PreApproved => "pre_approved",
            GoalState::Success => "success",
            GoalState::Failure => "failure",
            GoalState::Skipped => "skipped",
            GoalState::Stopped => "stopped",
            GoalState::Canceled => "canceled",
        }
    }

    /// True while a goal can still make progress; a goal set with any such
    /// goal can be cancelled.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            GoalState::InProcess
                | GoalState::Requested
                | GoalState::Planned
                | GoalState::WaitingForApproval
                | GoalState::Approved
                | GoalState::WaitingForPreApproval
                | GoalState::PreApproved
        )
    }

    pub fn emoji(self) -> &'static str {
        match self {
            GoalState::Planned | GoalState::Requested => ":white_circle:",
            GoalState::InProcess => ":large_blue_circle:",
            GoalState::WaitingForApproval | GoalState::WaitingForPreApproval => ":double_vertical_bar:",
            GoalState::Approved | GoalState::PreApproved => ":arrow_forward:",
            GoalState::Success => ":white_check_mark:",
            GoalState::Failure => ":red_circle:",
            GoalState::Skipped => ":fast_forward:",
            GoalState::Stopped | GoalState::Canceled => ":black_square_for_stop:",
        }
    }
}

impl fmt::Display for GoalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GoalState {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(GoalState::Planned),
            "requested" => Ok(GoalState::Requested),
            "in_process" => Ok(GoalState::InProcess),
            "waiting_for_approval" => Ok(GoalState::WaitingForApproval),
            "approved" => Ok(GoalState::Approved),
            "waiting_for_pre_approval" => Ok(GoalState::WaitingForPreApproval),
            "pre_approved" => Ok(GoalState::PreApproved),
            "success" => Ok(GoalState::Success),
            "failure" => Ok(GoalState::Failure),
            "skipped" => Ok(GoalState::Skipped),
            "stopped" => Ok(GoalState::Stopped),
            "canceled" => Ok(GoalState::Canceled),
            _ => Err(LifecycleError::InvalidGoalState(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// BuildStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Started,
    Pending,
    Passed,
    Failed,
    Broken,
    Error,
    Canceled,
}

impl BuildStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildStatus::Started => "started",
            BuildStatus::Pending => "pending",
            BuildStatus::Passed => "passed",
            BuildStatus::Failed => "failed",
            BuildStatus::Broken => "broken",
            BuildStatus::Error => "error",
            BuildStatus::Canceled => "canceled",
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, BuildStatus::Failed | BuildStatus::Broken | BuildStatus::Error)
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RenderingStyle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderingStyle {
    #[default]
    Full,
    Compact,
}

impl RenderingStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderingStyle::Full => "full",
            RenderingStyle::Compact => "compact",
        }
    }
}

impl fmt::Display for RenderingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RenderingStyle {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(RenderingStyle::Full),
            "compact" => Ok(RenderingStyle::Compact),
            _ => Err(LifecycleError::InvalidRenderingStyle(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// RenderTarget
// ---------------------------------------------------------------------------

/// Which message shape a lifecycle is rendered into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderTarget {
    #[default]
    Chat,
    Card,
}

impl RenderTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderTarget::Chat => "chat",
            RenderTarget::Card => "card",
        }
    }
}

impl fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RenderTarget {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(RenderTarget::Chat),
            "card" => Ok(RenderTarget::Card),
            _ => Err(LifecycleError::InvalidRenderTarget(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// MessageClass
// ---------------------------------------------------------------------------

/// Retention class of a delivered message. Each class maps to a TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageClass {
    Lifecycle,
    Notification,
}

impl fmt::Display for MessageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageClass::Lifecycle => "lifecycle",
            MessageClass::Notification => "notification",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
