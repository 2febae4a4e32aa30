//! Pending-enhancement state machine.
//!
//! Every status change goes through [`PendingStatus::guard_transition`];
//! an edge missing from [`PendingStatus::allowed_next`] is a programming
//! bug and surfaces as [`StateTransitionError`].

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Lifecycle states of a pending enhancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingStatus {
    /// Waiting to be claimed by a robot.
    Pending,
    /// Claimed; the handler is running.
    Processing,
    /// Handler output accepted; artifact write in flight.
    Importing,
    /// Artifact written; synchronous index write in flight.
    Indexing,
    /// Terminal success.
    Completed,
    /// Lease ran out; may be revived to `Pending`.
    Expired,
    /// Terminal: nothing to do for this input (not an error).
    Discarded,
    /// Terminal: the index write failed.
    IndexingFailed,
    /// Handler failed; may be revived to `Pending`.
    Failed,
}

impl PendingStatus {
    pub const ALL: [PendingStatus; 9] = [
        PendingStatus::Pending,
        PendingStatus::Processing,
        PendingStatus::Importing,
        PendingStatus::Indexing,
        PendingStatus::Completed,
        PendingStatus::Expired,
        PendingStatus::Discarded,
        PendingStatus::IndexingFailed,
        PendingStatus::Failed,
    ];

    /// The transition table. All edges not listed here are forbidden.
    pub fn allowed_next(self) -> &'static [PendingStatus] {
        match self {
            PendingStatus::Pending => &[PendingStatus::Processing],
            PendingStatus::Processing => &[
                PendingStatus::Importing,
                PendingStatus::Expired,
                PendingStatus::Failed,
                PendingStatus::Discarded,
            ],
            PendingStatus::Importing => &[
                PendingStatus::Indexing,
                PendingStatus::Completed,
                PendingStatus::Discarded,
                PendingStatus::Failed,
            ],
            PendingStatus::Indexing => {
                &[PendingStatus::Completed, PendingStatus::IndexingFailed]
            }
            PendingStatus::Expired => &[PendingStatus::Pending],
            PendingStatus::Failed => &[PendingStatus::Pending],
            PendingStatus::Completed
            | PendingStatus::Discarded
            | PendingStatus::IndexingFailed => &[],
        }
    }

    pub fn can_transition_to(self, target: PendingStatus) -> bool {
        self.allowed_next().contains(&target)
    }

    /// Fails with a [`StateTransitionError`] when `target` is not
    /// reachable from `self`.
    pub fn guard_transition(self, target: PendingStatus) -> Result<(), StateTransitionError> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(StateTransitionError {
                current: self,
                target,
                allowed: self.allowed_next(),
            })
        }
    }

    /// No outgoing edges.
    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Resting states that may be revived to `Pending` by a claim-free
    /// explicit transition.
    pub fn is_retriable(self) -> bool {
        matches!(self, PendingStatus::Failed | PendingStatus::Expired)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PendingStatus::Pending => "PENDING",
            PendingStatus::Processing => "PROCESSING",
            PendingStatus::Importing => "IMPORTING",
            PendingStatus::Indexing => "INDEXING",
            PendingStatus::Completed => "COMPLETED",
            PendingStatus::Expired => "EXPIRED",
            PendingStatus::Discarded => "DISCARDED",
            PendingStatus::IndexingFailed => "INDEXING_FAILED",
            PendingStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PendingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PendingStatus::Pending),
            "PROCESSING" => Ok(PendingStatus::Processing),
            "IMPORTING" => Ok(PendingStatus::Importing),
            "INDEXING" => Ok(PendingStatus::Indexing),
            "COMPLETED" => Ok(PendingStatus::Completed),
            "EXPIRED" => Ok(PendingStatus::Expired),
            "DISCARDED" => Ok(PendingStatus::Discarded),
            "INDEXING_FAILED" => Ok(PendingStatus::IndexingFailed),
            "FAILED" => Ok(PendingStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A status string not in the closed set (corrupt row or version skew).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pending status: {0:?}")]
pub struct UnknownStatus(pub String);

/// A requested transition that is not an edge of the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransitionError {
    pub current: PendingStatus,
    pub target: PendingStatus,
    pub allowed: &'static [PendingStatus],
}

impl std::error::Error for StateTransitionError {}

impl fmt::Display for StateTransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let allowed = if self.allowed.is_empty() {
            "none".to_string()
        } else {
            self.allowed
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            f,
            "invalid transition: {} -> {} (allowed from {}: {})",
            self.current, self.target, self.current, allowed
        )
    }
}
