use serde::{Deserialize, Serialize};

/// Transfer status lifecycle.
///
/// `Pending` is the only non-terminal state; every other state is reached by
/// exactly one approval or rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Approved,
    PartialApproved,
    Rejected,
}

impl TransferStatus {
    pub fn can_transition_to(self, next: TransferStatus) -> bool {
        use TransferStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, PartialApproved) | (Pending, Rejected)
        )
    }

    pub fn is_terminal(self) -> bool {
        self != TransferStatus::Pending
    }

    /// Derive the terminal status from finalized `(requested, approved)` pairs.
    ///
    /// All zero gives `Rejected`, all at requested gives `Approved`, anything
    /// in between gives `PartialApproved`.
    pub fn from_quantities(pairs: impl IntoIterator<Item = (i64, i64)>) -> TransferStatus {
        let mut all_zero = true;
        let mut all_full = true;
        for (requested, approved) in pairs {
            all_zero &= approved == 0;
            all_full &= approved == requested;
        }

        if all_zero {
            TransferStatus::Rejected
        } else if all_full {
            TransferStatus::Approved
        } else {
            TransferStatus::PartialApproved
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Approved => "approved",
            TransferStatus::PartialApproved => "partial_approved",
            TransferStatus::Rejected => "rejected",
        }
    }
}

impl core::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single transfer line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineOutcome {
    Awaiting,
    Approved,
    Partial,
    Rejected,
}

impl LineOutcome {
    pub fn of(requested: i64, approved: Option<i64>) -> LineOutcome {
        match approved {
            None => LineOutcome::Awaiting,
            Some(0) => LineOutcome::Rejected,
            Some(q) if q == requested => LineOutcome::Approved,
            Some(_) => LineOutcome::Partial,
        }
    }
}
