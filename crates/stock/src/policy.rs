use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which deltas are added on top of the latest opname baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselinePolicy {
    /// Sum every movement ever recorded, regardless of when the baseline was counted.
    #[default]
    AllHistory,
    /// Sum only movements committed after the latest opname for the (room, item).
    SinceLatestOpname,
}

impl BaselinePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            BaselinePolicy::AllHistory => "all_history",
            BaselinePolicy::SinceLatestOpname => "since_latest_opname",
        }
    }
}

impl core::fmt::Display for BaselinePolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown baseline policy '{0}' (expected all_history or since_latest_opname)")]
pub struct UnknownBaselinePolicy(pub String);

impl FromStr for BaselinePolicy {
    type Err = UnknownBaselinePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all_history" => Ok(BaselinePolicy::AllHistory),
            "since_latest_opname" => Ok(BaselinePolicy::SinceLatestOpname),
            other => Err(UnknownBaselinePolicy(other.to_string())),
        }
    }
}
