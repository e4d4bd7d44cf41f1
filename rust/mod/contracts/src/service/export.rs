//! CSV export of the contract and purchase order lists.
//!
//! Exports apply the same filters as the list endpoints but are not paged.

use amc_core::ServiceError;
use serde::Serialize;

use crate::model::{ContractQuery, PurchaseOrderQuery};
use crate::service::ContractsService;

#[derive(Serialize)]
struct ContractRecord<'a> {
    id: i64,
    contract_number: &'a str,
    title: &'a str,
    vendor_name: &'a str,
    equipment: &'a str,
    start_date: String,
    end_date: String,
    contract_value: String,
    status: &'a str,
    notes: &'a str,
}

#[derive(Serialize)]
struct PurchaseOrderRecord<'a> {
    id: i64,
    po_number: &'a str,
    contract_id: Option<i64>,
    vendor_name: &'a str,
    order_date: String,
    status: &'a str,
    item_count: i64,
    total_amount: String,
    notes: &'a str,
}

fn csv_err(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Internal(format!("csv export failed: {}", e))
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ServiceError> {
    writer.into_inner().map_err(csv_err)
}

impl ContractsService {
    pub fn export_contracts_csv(&self, query: &ContractQuery) -> Result<Vec<u8>, ServiceError> {
        let contracts = self.all_contracts(query)?;
        let mut writer = csv::Writer::from_writer(Vec::new());
        for c in &contracts {
            writer
                .serialize(ContractRecord {
                    id: c.id,
                    contract_number: &c.contract_number,
                    title: &c.title,
                    vendor_name: &c.vendor_name,
                    equipment: c.equipment.as_deref().unwrap_or_default(),
                    start_date: c.start_date.to_string(),
                    end_date: c.end_date.to_string(),
                    contract_value: format!("{:.2}", c.contract_value),
                    status: c.status.as_str(),
                    notes: c.notes.as_deref().unwrap_or_default(),
                })
                .map_err(csv_err)?;
        }
        if contracts.is_empty() {
            writer
                .write_record([
                    "id", "contract_number", "title", "vendor_name", "equipment", "start_date",
                    "end_date", "contract_value", "status", "notes",
                ])
                .map_err(csv_err)?;
        }
        tracing::debug!(rows = contracts.len(), "exported contracts");
        finish(writer)
    }

    pub fn export_purchase_orders_csv(
        &self,
        query: &PurchaseOrderQuery,
    ) -> Result<Vec<u8>, ServiceError> {
        let orders = self.all_purchase_orders(query)?;
        let mut writer = csv::Writer::from_writer(Vec::new());
        for po in &orders {
            writer
                .serialize(PurchaseOrderRecord {
                    id: po.id,
                    po_number: &po.po_number,
                    contract_id: po.contract_id,
                    vendor_name: &po.vendor_name,
                    order_date: po.order_date.to_string(),
                    status: po.status.as_str(),
                    item_count: po.item_count,
                    total_amount: format!("{:.2}", po.total_amount),
                    notes: po.notes.as_deref().unwrap_or_default(),
                })
                .map_err(csv_err)?;
        }
        if orders.is_empty() {
            writer
                .write_record([
                    "id", "po_number", "contract_id", "vendor_name", "order_date", "status",
                    "item_count", "total_amount", "notes",
                ])
                .map_err(csv_err)?;
        }
        tracing::debug!(rows = orders.len(), "exported purchase orders");
        finish(writer)
    }
}
