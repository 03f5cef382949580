//! Ledger behaviour switches.

use labstock_stock::BaselinePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Window of the movement sums on top of the latest opname.
    pub baseline_policy: BaselinePolicy,
    /// Refuse transfers asking for more than the source room currently holds.
    pub enforce_available_stock: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            baseline_policy: BaselinePolicy::AllHistory,
            enforce_available_stock: true,
        }
    }
}
