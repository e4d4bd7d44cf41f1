use amc_core::{
    like_pattern, now_rfc3339, round_money, CurrentUser, ListResult, Page, ServiceError, Validator,
    MAX_AMOUNT,
};
use amc_sql::{Row, SQLError, SqlTx, Value};
use chrono::NaiveDate;

use crate::model::{
    PoItem, PoStatus, PurchaseOrder, PurchaseOrderInput, PurchaseOrderQuery, PurchaseOrderSummary,
};
use crate::service::{clean_opt, input_date, parse_date, sql_err, ContractsService, Filter};

const PO_COLUMNS: &str = "id, po_number, contract_id, vendor_name, order_date, status, notes, \
     total_amount, created_by, created_at, updated_at, \
     (SELECT COUNT(*) FROM po_items WHERE po_items.purchase_order_id = purchase_orders.id) AS item_count";

const STATUS_CHOICES: &str = "must be one of draft, submitted, approved, received, cancelled";

struct ValidItem {
    description: String,
    quantity: i64,
    unit_price: f64,
    amount: f64,
}

/// A purchase order body that passed validation.
struct ValidOrder {
    po_number: String,
    contract_id: Option<i64>,
    vendor_name: String,
    order_date: NaiveDate,
    status: PoStatus,
    notes: Option<String>,
    items: Vec<ValidItem>,
    total_amount: f64,
}

/// Writes that trip the contract foreign key name the offending field.
fn po_sql_err(e: SQLError) -> ServiceError {
    match e {
        SQLError::ForeignKey(_) => ServiceError::field("contract_id", "does not exist"),
        other => sql_err(other),
    }
}

fn summary_from_row(row: &Row) -> Result<PurchaseOrderSummary, ServiceError> {
    let status = row
        .get_str("status")
        .and_then(PoStatus::parse)
        .ok_or_else(|| ServiceError::Storage("invalid purchase order status".into()))?;
    Ok(PurchaseOrderSummary {
        id: row.get_i64("id").unwrap_or_default(),
        po_number: row.get_str("po_number").unwrap_or_default().to_string(),
        contract_id: row.get_i64("contract_id"),
        vendor_name: row.get_str("vendor_name").unwrap_or_default().to_string(),
        order_date: parse_date(row.get_str("order_date"), "order_date")?,
        status,
        notes: row.get_str("notes").map(String::from),
        total_amount: row.get_f64("total_amount").unwrap_or_default(),
        item_count: row.get_i64("item_count").unwrap_or_default(),
        created_by: row.get_i64("created_by"),
        created_at: row.get_str("created_at").unwrap_or_default().to_string(),
        updated_at: row.get_str("updated_at").unwrap_or_default().to_string(),
    })
}

fn item_from_row(row: &Row) -> PoItem {
    PoItem {
        id: row.get_i64("id").unwrap_or_default(),
        purchase_order_id: row.get_i64("purchase_order_id").unwrap_or_default(),
        description: row.get_str("description").unwrap_or_default().to_string(),
        quantity: row.get_i64("quantity").unwrap_or_default(),
        unit_price: row.get_f64("unit_price").unwrap_or_default(),
        amount: row.get_f64("amount").unwrap_or_default(),
    }
}

/// Build the WHERE clause shared by list, export and the dashboard.
pub(crate) fn po_filter(query: &PurchaseOrderQuery) -> Result<Filter, ServiceError> {
    let mut f = Filter::default();

    if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        f.push(
            "(unicode_lower(po_number) LIKE ? ESCAPE '\\' OR unicode_lower(vendor_name) LIKE ? ESCAPE '\\')",
            Value::from(like_pattern(q)),
        );
    }
    if let Some(status) = query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        let st = PoStatus::parse(status.trim())
            .ok_or_else(|| ServiceError::field("status", STATUS_CHOICES))?;
        f.push("status = ?", Value::from(st.as_str()));
    }
    if let Some(contract_id) = query.contract_id {
        f.push("contract_id = ?", Value::Integer(contract_id));
    }
    Ok(f)
}

/// Insert the item rows of an order.
fn insert_items(tx: &dyn SqlTx, po_id: i64, items: &[ValidItem]) -> Result<(), SQLError> {
    for item in items {
        tx.insert(
            "INSERT INTO po_items (purchase_order_id, description, quantity, unit_price, amount)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            &[
                Value::Integer(po_id),
                Value::from(item.description.as_str()),
                Value::Integer(item.quantity),
                Value::Real(item.unit_price),
                Value::Real(item.amount),
            ],
        )?;
    }
    Ok(())
}

impl ContractsService {
    fn contract_exists(&self, id: i64) -> Result<bool, ServiceError> {
        let rows = self
            .sql
            .query("SELECT 1 AS found FROM contracts WHERE id = ?1", &[Value::Integer(id)])
            .map_err(sql_err)?;
        Ok(!rows.is_empty())
    }

    fn validate_order(&self, input: PurchaseOrderInput) -> Result<ValidOrder, ServiceError> {
        let mut v = Validator::new();
        v.required("po_number", &input.po_number, 50)
            .required("vendor_name", &input.vendor_name, 200)
            .optional("notes", input.notes.as_deref(), 2000);

        let order_date = input_date(&mut v, "order_date", &input.order_date);

        let status = match input.status.as_deref().map(str::trim) {
            None | Some("") => Some(PoStatus::default()),
            Some(s) => {
                let parsed = PoStatus::parse(s);
                if parsed.is_none() {
                    v.add("status", STATUS_CHOICES);
                }
                parsed
            }
        };

        if let Some(contract_id) = input.contract_id {
            if !self.contract_exists(contract_id)? {
                v.add("contract_id", "does not exist");
            }
        }

        if input.items.is_empty() {
            v.add("items", "must contain at least one item");
        }
        let mut items = Vec::with_capacity(input.items.len());
        for (i, item) in input.items.into_iter().enumerate() {
            v.required(&format!("items[{}].description", i), &item.description, 500);
            match item.quantity {
                Some(q) => {
                    v.positive(&format!("items[{}].quantity", i), q);
                }
                None => v.add(&format!("items[{}].quantity", i), "is required"),
            }
            match item.unit_price {
                Some(p) => {
                    v.amount(&format!("items[{}].unit_price", i), p);
                }
                None => v.add(&format!("items[{}].unit_price", i), "is required"),
            }
            if let (Some(quantity), Some(unit_price)) = (item.quantity, item.unit_price) {
                let unit_price = round_money(unit_price);
                let amount = round_money(quantity as f64 * unit_price);
                if unit_price.is_finite() && amount > MAX_AMOUNT {
                    v.add(&format!("items[{}].amount", i), format!("must not exceed {}", MAX_AMOUNT));
                }
                items.push(ValidItem {
                    description: item.description.trim().to_string(),
                    quantity,
                    unit_price,
                    amount,
                });
            }
        }
        let total_amount = round_money(items.iter().map(|i| i.amount).sum());
        if v.is_empty() && total_amount > MAX_AMOUNT {
            v.add("total_amount", format!("must not exceed {}", MAX_AMOUNT));
        }

        v.finish()?;

        let (Some(order_date), Some(status)) = (order_date, status) else {
            return Err(ServiceError::Internal("purchase order validation incomplete".into()));
        };
        Ok(ValidOrder {
            po_number: input.po_number.trim().to_string(),
            contract_id: input.contract_id,
            vendor_name: input.vendor_name.trim().to_string(),
            order_date,
            status,
            notes: clean_opt(input.notes),
            items,
            total_amount,
        })
    }

    /// Create a purchase order and its items atomically.
    pub fn create_purchase_order(
        &self,
        actor: &CurrentUser,
        input: PurchaseOrderInput,
    ) -> Result<PurchaseOrder, ServiceError> {
        let po = self.validate_order(input)?;
        let now = now_rfc3339();

        let mut po_id = 0;
        self.sql
            .transaction(&mut |tx| {
                po_id = tx.insert(
                    "INSERT INTO purchase_orders (po_number, contract_id, vendor_name, order_date,
                         status, notes, total_amount, created_by, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                    &[
                        Value::from(po.po_number.as_str()),
                        Value::from(po.contract_id),
                        Value::from(po.vendor_name.as_str()),
                        Value::from(po.order_date.to_string()),
                        Value::from(po.status.as_str()),
                        Value::from(po.notes.clone()),
                        Value::Real(po.total_amount),
                        Value::Integer(actor.id),
                        Value::from(now.as_str()),
                    ],
                )?;
                insert_items(tx, po_id, &po.items)
            })
            .map_err(po_sql_err)?;

        tracing::info!(
            po_id,
            items = po.items.len(),
            total = po.total_amount,
            "created purchase order {}",
            po.po_number
        );
        self.get_purchase_order(po_id)
    }

    /// Get a purchase order with its items.
    pub fn get_purchase_order(&self, id: i64) -> Result<PurchaseOrder, ServiceError> {
        let rows = self
            .sql
            .query(
                &format!("SELECT {} FROM purchase_orders WHERE id = ?1", PO_COLUMNS),
                &[Value::Integer(id)],
            )
            .map_err(sql_err)?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("purchase order {} not found", id)))?;
        let header = summary_from_row(row)?;

        let items = self
            .sql
            .query(
                "SELECT id, purchase_order_id, description, quantity, unit_price, amount
                 FROM po_items WHERE purchase_order_id = ?1 ORDER BY id ASC",
                &[Value::Integer(id)],
            )
            .map_err(sql_err)?
            .iter()
            .map(item_from_row)
            .collect();

        Ok(PurchaseOrder { header, items })
    }

    /// List purchase orders, newest `order_date` first. Items are not loaded.
    pub fn list_purchase_orders(
        &self,
        query: &PurchaseOrderQuery,
    ) -> Result<ListResult<PurchaseOrderSummary>, ServiceError> {
        let page = query.page_params().resolve()?;
        let filter = po_filter(query)?;

        let count_rows = self
            .sql
            .query(
                &format!("SELECT COUNT(*) AS cnt FROM purchase_orders{}", filter.where_sql()),
                &filter.params,
            )
            .map_err(sql_err)?;
        let total = count_rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0) as u64;

        let items = self.select_orders(&filter, Some(page))?;
        Ok(ListResult::new(items, total, page))
    }

    /// Every purchase order matching the filters, in list order.
    pub(crate) fn all_purchase_orders(
        &self,
        query: &PurchaseOrderQuery,
    ) -> Result<Vec<PurchaseOrderSummary>, ServiceError> {
        let filter = po_filter(query)?;
        self.select_orders(&filter, None)
    }

    fn select_orders(
        &self,
        filter: &Filter,
        page: Option<Page>,
    ) -> Result<Vec<PurchaseOrderSummary>, ServiceError> {
        let (params, limit_sql) = match page {
            Some(page) => filter.paged(page),
            None => (filter.params.clone(), String::new()),
        };
        let sql = format!(
            "SELECT {} FROM purchase_orders{} ORDER BY order_date DESC, id DESC{}",
            PO_COLUMNS,
            filter.where_sql(),
            limit_sql,
        );
        let rows = self.sql.query(&sql, &params).map_err(sql_err)?;
        rows.iter().map(summary_from_row).collect()
    }

    /// Replace the header fields and the full item set atomically.
    pub fn update_purchase_order(
        &self,
        id: i64,
        input: PurchaseOrderInput,
    ) -> Result<PurchaseOrder, ServiceError> {
        // 404 before 400 for unknown orders.
        self.get_purchase_order(id)?;
        let po = self.validate_order(input)?;
        let now = now_rfc3339();

        self.sql
            .transaction(&mut |tx| {
                tx.exec(
                    "UPDATE purchase_orders SET po_number = ?1, contract_id = ?2, vendor_name = ?3,
                         order_date = ?4, status = ?5, notes = ?6, total_amount = ?7, updated_at = ?8
                     WHERE id = ?9",
                    &[
                        Value::from(po.po_number.as_str()),
                        Value::from(po.contract_id),
                        Value::from(po.vendor_name.as_str()),
                        Value::from(po.order_date.to_string()),
                        Value::from(po.status.as_str()),
                        Value::from(po.notes.clone()),
                        Value::Real(po.total_amount),
                        Value::from(now.as_str()),
                        Value::Integer(id),
                    ],
                )?;
                tx.exec("DELETE FROM po_items WHERE purchase_order_id = ?1", &[Value::Integer(id)])?;
                insert_items(tx, id, &po.items)
            })
            .map_err(po_sql_err)?;

        tracing::info!(po_id = id, items = po.items.len(), "updated purchase order");
        self.get_purchase_order(id)
    }

    /// Delete a purchase order. Items cascade.
    pub fn delete_purchase_order(&self, id: i64) -> Result<(), ServiceError> {
        let affected = self
            .sql
            .exec("DELETE FROM purchase_orders WHERE id = ?1", &[Value::Integer(id)])
            .map_err(sql_err)?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("purchase order {} not found", id)));
        }
        tracing::info!(po_id = id, "deleted purchase order");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{ContractQuery, PoItemInput};
    use crate::service::contract::tests::{actor, input as contract_input};
    use crate::service::testing;

    pub(crate) fn item(description: &str, quantity: i64, unit_price: f64) -> PoItemInput {
        PoItemInput {
            description: description.into(),
            quantity: Some(quantity),
            unit_price: Some(unit_price),
        }
    }

    pub(crate) fn order(number: &str, date: &str, items: Vec<PoItemInput>) -> PurchaseOrderInput {
        PurchaseOrderInput {
            po_number: number.into(),
            contract_id: None,
            vendor_name: "Acme Supplies".into(),
            order_date: date.into(),
            status: None,
            notes: None,
            items,
        }
    }

    fn fields(err: ServiceError) -> Vec<String> {
        err.details().unwrap().iter().map(|d| d.field.clone()).collect()
    }

    #[test]
    fn test_create_computes_amounts() {
        let svc = testing::service();
        let po = svc
            .create_purchase_order(
                &actor(),
                order("PO-1", "2025-02-01", vec![item("Filter", 3, 10.125), item("Belt", 1, 4.5)]),
            )
            .unwrap();

        assert_eq!(po.header.status, PoStatus::Draft);
        assert_eq!(po.header.item_count, 2);
        assert_eq!(po.items.len(), 2);
        assert_eq!(po.items[0].unit_price, 10.13);
        assert_eq!(po.items[0].amount, 30.39);
        assert_eq!(po.header.total_amount, 34.89);
        assert!(po.items.iter().all(|i| i.purchase_order_id == po.header.id));
    }

    #[test]
    fn test_item_validation_names_index() {
        let svc = testing::service();
        let err = svc
            .create_purchase_order(
                &actor(),
                order(
                    "PO-2",
                    "2025-02-01",
                    vec![
                        item("ok", 1, 1.0),
                        PoItemInput { description: "".into(), quantity: Some(0), unit_price: Some(-1.0) },
                    ],
                ),
            )
            .unwrap_err();
        assert_eq!(
            fields(err),
            vec!["items[1].description", "items[1].quantity", "items[1].unit_price"]
        );

        let err = svc
            .create_purchase_order(&actor(), order("PO-3", "not-a-date", vec![]))
            .unwrap_err();
        assert_eq!(fields(err), vec!["order_date", "items"]);
    }

    #[test]
    fn test_amounts_are_bounded() {
        let svc = testing::service();
        let err = svc
            .create_purchase_order(&actor(), order("PO-BIG", "2025-02-01", vec![item("x", 1, 1e307)]))
            .unwrap_err();
        assert_eq!(fields(err), vec!["items[0].unit_price"]);

        let err = svc
            .create_purchase_order(
                &actor(),
                order("PO-BIG", "2025-02-01", vec![item("x", 1_000_000, 2_000_000.0)]),
            )
            .unwrap_err();
        assert_eq!(fields(err), vec!["items[0].amount"]);

        let err = svc
            .create_purchase_order(
                &actor(),
                order("PO-BIG", "2025-02-01", vec![item("a", 1, 6e11), item("b", 1, 6e11)]),
            )
            .unwrap_err();
        assert_eq!(fields(err), vec!["total_amount"]);

        let po = svc
            .create_purchase_order(&actor(), order("PO-CAP", "2025-02-01", vec![item("a", 1, MAX_AMOUNT)]))
            .unwrap();
        assert_eq!(po.header.total_amount, MAX_AMOUNT);
    }

    #[test]
    fn test_unknown_contract_is_field_error() {
        let svc = testing::service();
        let mut input = order("PO-4", "2025-02-01", vec![item("x", 1, 1.0)]);
        input.contract_id = Some(999);
        let err = svc.create_purchase_order(&actor(), input).unwrap_err();
        assert_eq!(fields(err), vec!["contract_id"]);
    }

    #[test]
    fn test_duplicate_po_number_conflicts_and_rolls_back() {
        let svc = testing::service();
        svc.create_purchase_order(&actor(), order("PO-5", "2025-02-01", vec![item("x", 1, 1.0)]))
            .unwrap();
        let err = svc
            .create_purchase_order(&actor(), order("PO-5", "2025-02-02", vec![item("y", 2, 2.0)]))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let rows = svc.sql.query("SELECT COUNT(*) AS cnt FROM po_items", &[]).unwrap();
        assert_eq!(rows[0].get_i64("cnt"), Some(1));
    }

    #[test]
    fn test_update_replaces_items() {
        let svc = testing::service();
        let contract = svc
            .create_contract(&actor(), contract_input("AMC-PO", chrono::NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()))
            .unwrap();
        let po = svc
            .create_purchase_order(&actor(), order("PO-6", "2025-02-01", vec![item("a", 1, 1.0), item("b", 1, 2.0)]))
            .unwrap();

        let mut edit = order("PO-6", "2025-03-01", vec![item("c", 4, 2.5)]);
        edit.contract_id = Some(contract.id);
        edit.status = Some("approved".into());
        let updated = svc.update_purchase_order(po.header.id, edit).unwrap();

        assert_eq!(updated.header.status, PoStatus::Approved);
        assert_eq!(updated.header.contract_id, Some(contract.id));
        assert_eq!(updated.header.total_amount, 10.0);
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.items[0].description, "c");

        let rows = svc.sql.query("SELECT COUNT(*) AS cnt FROM po_items", &[]).unwrap();
        assert_eq!(rows[0].get_i64("cnt"), Some(1));

        // Referenced now, so the contract cannot go.
        assert!(matches!(svc.delete_contract(contract.id), Err(ServiceError::Conflict(_))));
        assert_eq!(svc.list_contracts(&ContractQuery::default()).unwrap().total, 1);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let svc = testing::service();
        let err = svc
            .update_purchase_order(42, order("PO-X", "2025-01-01", vec![item("x", 1, 1.0)]))
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn test_delete_cascades_items() {
        let svc = testing::service();
        let po = svc
            .create_purchase_order(&actor(), order("PO-7", "2025-02-01", vec![item("x", 1, 1.0)]))
            .unwrap();
        svc.delete_purchase_order(po.header.id).unwrap();

        let rows = svc.sql.query("SELECT COUNT(*) AS cnt FROM po_items", &[]).unwrap();
        assert_eq!(rows[0].get_i64("cnt"), Some(0));
        assert!(matches!(svc.delete_purchase_order(po.header.id), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn test_list_orders_and_filters() {
        let svc = testing::service();
        svc.create_purchase_order(&actor(), order("PO-A", "2025-01-01", vec![item("x", 1, 1.0)]))
            .unwrap();
        svc.create_purchase_order(&actor(), order("PO-B", "2025-03-01", vec![item("x", 1, 1.0)]))
            .unwrap();
        let mut c = order("PO-C", "2025-02-01", vec![item("x", 2, 1.0), item("y", 1, 1.0)]);
        c.status = Some("received".into());
        c.vendor_name = "Globex".into();
        svc.create_purchase_order(&actor(), c).unwrap();

        let all = svc.list_purchase_orders(&PurchaseOrderQuery::default()).unwrap();
        let numbers: Vec<_> = all.items.iter().map(|p| p.po_number.as_str()).collect();
        assert_eq!(numbers, vec!["PO-B", "PO-C", "PO-A"]);
        assert_eq!(all.items[1].item_count, 2);
        assert_eq!(all.items[1].total_amount, 3.0);

        let received = svc
            .list_purchase_orders(&PurchaseOrderQuery { status: Some("received".into()), ..Default::default() })
            .unwrap();
        assert_eq!(received.total, 1);

        let globex = svc
            .list_purchase_orders(&PurchaseOrderQuery { q: Some("GLOB".into()), ..Default::default() })
            .unwrap();
        assert_eq!(globex.items[0].po_number, "PO-C");

        let err = svc
            .list_purchase_orders(&PurchaseOrderQuery { status: Some("lost".into()), ..Default::default() })
            .unwrap_err();
        assert_eq!(fields(err), vec!["status"]);
    }
}
