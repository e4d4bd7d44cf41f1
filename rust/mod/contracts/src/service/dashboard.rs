use std::collections::BTreeMap;

use amc_core::{round_money, ServiceError};
use amc_sql::Value;

use crate::model::{
    ContractStats, ContractStatus, DashboardQuery, DashboardSummary, PoStatus, PurchaseOrderStats,
    DEFAULT_EXPIRING_WITHIN_DAYS,
};
use crate::service::contract::expiry_window;
use crate::service::{sql_err, ContractsService};

impl ContractsService {
    /// Counts and totals for the dashboard landing page.
    pub fn dashboard_summary(&self, query: &DashboardQuery) -> Result<DashboardSummary, ServiceError> {
        let days = query.expiring_within_days.unwrap_or(DEFAULT_EXPIRING_WITHIN_DAYS);
        if days < 0 {
            return Err(ServiceError::field("expiring_within_days", "must be 0 or greater"));
        }

        Ok(DashboardSummary {
            contracts: self.contract_stats(days)?,
            purchase_orders: self.po_stats()?,
        })
    }

    fn contract_stats(&self, days: i64) -> Result<ContractStats, ServiceError> {
        let mut by_status: BTreeMap<String, u64> = ContractStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        let mut total = 0;

        let rows = self
            .sql
            .query("SELECT status, COUNT(*) AS cnt FROM contracts GROUP BY status", &[])
            .map_err(sql_err)?;
        for row in &rows {
            let count = row.get_i64("cnt").unwrap_or(0) as u64;
            total += count;
            if let Some(status) = row.get_str("status") {
                by_status.insert(status.to_string(), count);
            }
        }

        let (from, to) = expiry_window(days);
        let rows = self
            .sql
            .query(
                "SELECT
                    COALESCE(SUM(CASE WHEN end_date >= ?1 AND end_date <= ?2 THEN 1 ELSE 0 END), 0) AS expiring,
                    COALESCE(SUM(contract_value), 0) AS value
                 FROM contracts WHERE status = ?3",
                &[
                    Value::from(from.to_string()),
                    Value::from(to.to_string()),
                    Value::from(ContractStatus::Active.as_str()),
                ],
            )
            .map_err(sql_err)?;
        let row = rows.first();

        Ok(ContractStats {
            total,
            by_status,
            expiring_soon: row.and_then(|r| r.get_i64("expiring")).unwrap_or(0) as u64,
            active_value: round_money(row.and_then(|r| r.get_f64("value")).unwrap_or(0.0)),
        })
    }

    fn po_stats(&self) -> Result<PurchaseOrderStats, ServiceError> {
        let mut by_status: BTreeMap<String, u64> = PoStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        let mut total = 0;
        let mut total_amount = 0.0;

        let rows = self
            .sql
            .query(
                "SELECT status, COUNT(*) AS cnt, COALESCE(SUM(total_amount), 0) AS amount
                 FROM purchase_orders GROUP BY status",
                &[],
            )
            .map_err(sql_err)?;
        for row in &rows {
            let count = row.get_i64("cnt").unwrap_or(0) as u64;
            total += count;
            let Some(status) = row.get_str("status") else {
                continue;
            };
            if status != PoStatus::Cancelled.as_str() {
                total_amount += row.get_f64("amount").unwrap_or(0.0);
            }
            by_status.insert(status.to_string(), count);
        }

        Ok(PurchaseOrderStats {
            total,
            by_status,
            total_amount: round_money(total_amount),
        })
    }
}

#[cfg(test)]
mod tests {
    use amc_core::today;

    use super::*;
    use crate::service::contract::tests::{actor, input};
    use crate::service::purchase_order::tests::{item, order};
    use crate::service::testing;

    #[test]
    fn test_empty_summary_lists_every_status() {
        let svc = testing::service();
        let summary = svc.dashboard_summary(&DashboardQuery::default()).unwrap();
        assert_eq!(summary.contracts.total, 0);
        assert_eq!(summary.contracts.by_status.len(), 4);
        assert_eq!(summary.purchase_orders.by_status.len(), 5);
        assert_eq!(summary.purchase_orders.total_amount, 0.0);
    }

    #[test]
    fn test_summary_counts() {
        let svc = testing::service();
        let soon = today() + chrono::Duration::days(10);
        let later = today() + chrono::Duration::days(100);

        svc.create_contract(&actor(), input("A", soon)).unwrap();
        svc.create_contract(&actor(), input("B", later)).unwrap();
        let mut draft = input("C", soon);
        draft.status = Some("draft".into());
        svc.create_contract(&actor(), draft).unwrap();

        svc.create_purchase_order(&actor(), order("P1", "2025-01-01", vec![item("x", 2, 5.0)]))
            .unwrap();
        let mut cancelled = order("P2", "2025-01-02", vec![item("y", 1, 100.0)]);
        cancelled.status = Some("cancelled".into());
        svc.create_purchase_order(&actor(), cancelled).unwrap();

        let summary = svc.dashboard_summary(&DashboardQuery::default()).unwrap();
        assert_eq!(summary.contracts.total, 3);
        assert_eq!(summary.contracts.by_status["active"], 2);
        assert_eq!(summary.contracts.by_status["draft"], 1);
        assert_eq!(summary.contracts.by_status["expired"], 0);
        assert_eq!(summary.contracts.expiring_soon, 1);
        assert_eq!(summary.contracts.active_value, 2000.0);

        assert_eq!(summary.purchase_orders.total, 2);
        assert_eq!(summary.purchase_orders.by_status["cancelled"], 1);
        assert_eq!(summary.purchase_orders.total_amount, 10.0);

        let wide = svc
            .dashboard_summary(&DashboardQuery { expiring_within_days: Some(365) })
            .unwrap();
        assert_eq!(wide.contracts.expiring_soon, 2);
    }

    #[test]
    fn test_negative_window_rejected() {
        let svc = testing::service();
        assert!(svc
            .dashboard_summary(&DashboardQuery { expiring_within_days: Some(-1) })
            .is_err());
    }
}
