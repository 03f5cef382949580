use serde::{Deserialize, Serialize};

/// Procurement request lifecycle: `awaiting_dispatch -> dispatched -> closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    AwaitingDispatch,
    Dispatched,
    Closed,
}

impl RequestStatus {
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::AwaitingDispatch, RequestStatus::Dispatched)
                | (RequestStatus::Dispatched, RequestStatus::Closed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::AwaitingDispatch => "awaiting_dispatch",
            RequestStatus::Dispatched => "dispatched",
            RequestStatus::Closed => "closed",
        }
    }
}

impl core::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
