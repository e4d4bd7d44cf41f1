use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default look-ahead window for "expiring soon".
pub const DEFAULT_EXPIRING_WITHIN_DAYS: i64 = 30;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub expiring_within_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardSummary {
    pub contracts: ContractStats,
    pub purchase_orders: PurchaseOrderStats,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContractStats {
    pub total: u64,
    /// Every status is present, zero when unused.
    pub by_status: BTreeMap<String, u64>,
    /// Active contracts ending in the look-ahead window.
    pub expiring_soon: u64,
    /// Sum of `contract_value` over active contracts.
    pub active_value: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PurchaseOrderStats {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    /// Sum of `total_amount` excluding cancelled orders.
    pub total_amount: f64,
}
