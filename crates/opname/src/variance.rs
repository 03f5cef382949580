use serde::{Deserialize, Serialize};

/// Classification of `physical - system`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceKind {
    /// More counted than the system expected.
    Plus,
    /// Less counted than the system expected.
    Minus,
    /// Count matches.
    Sesuai,
}

impl VarianceKind {
    pub fn of(variance: i64) -> VarianceKind {
        match variance.signum() {
            1 => VarianceKind::Plus,
            -1 => VarianceKind::Minus,
            _ => VarianceKind::Sesuai,
        }
    }
}
