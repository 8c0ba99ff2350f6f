/// Check lifecycle status definitions
///
/// A check is one complete audit run against a site. Its status moves
/// through `pending -> running -> {completed | failed}` and never
/// leaves a terminal state.
use std::fmt;

/// Represents the current lifecycle status of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckStatus {
    /// Check row exists, no work started
    Pending,

    /// Discovery and crawling in progress
    Running,

    /// Crawl drained, issues detected, score computed
    Completed,

    /// Discovery or the crawl loop hit an unrecoverable error
    Failed,
}

impl CheckStatus {
    /// Returns true if this is a terminal status (no further work)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the transition to `next` is legal
    ///
    /// Transitions are monotonic: pending may start running, running
    /// may finish either way, and terminal states accept nothing.
    pub fn can_transition_to(&self, next: CheckStatus) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Running | Self::Failed),
            Self::Running => matches!(next, Self::Completed | Self::Failed),
            Self::Completed | Self::Failed => false,
        }
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![Self::Pending, Self::Running, Self::Completed, Self::Failed]
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
