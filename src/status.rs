use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the health of a single measurement source.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The source has never produced a reading. It is likely that the device
    /// is not connected.
    #[default]
    Missing,

    /// The source produced a reading on its last invocation.
    Up,

    /// The source has produced readings before, but its last invocation
    /// failed.
    Down,
}

/// What the node is currently doing.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Initializing,
    Idle,
    Scanning,
    Publishing,
    Sleeping,
    Stopped,
}

impl Status {
    /// Returns the status after an invocation that succeeded (`ok`) or not.
    #[must_use]
    pub fn after(self, ok: bool) -> Self {
        match (self, ok) {
            (_, true) => Status::Up,
            (Status::Missing, false) => Status::Missing,
            (_, false) => Status::Down,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Missing => f.write_str("missing"),
            Status::Up => f.write_str("up"),
            Status::Down => f.write_str("down"),
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeStatus::Initializing => "initializing",
            NodeStatus::Idle => "idle",
            NodeStatus::Scanning => "scanning",
            NodeStatus::Publishing => "publishing",
            NodeStatus::Sleeping => "sleeping",
            NodeStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        assert_eq!(Status::Missing.after(false), Status::Missing);
        assert_eq!(Status::Missing.after(true), Status::Up);
        assert_eq!(Status::Up.after(false), Status::Down);
        assert_eq!(Status::Down.after(true), Status::Up);
        assert_eq!(Status::Down.after(false), Status::Down);
    }
}
