use amc_core::{
    like_pattern, now_rfc3339, today, CurrentUser, ListResult, Page, ServiceError, Validator,
};
use amc_sql::{Row, Value};
use chrono::NaiveDate;

use crate::model::{Contract, ContractInput, ContractQuery, ContractStatus};
use crate::service::{clean_opt, input_date, parse_date, sql_err, ContractsService, Filter};

const CONTRACT_COLUMNS: &str = "id, contract_number, title, vendor_name, equipment, start_date, \
     end_date, contract_value, status, notes, created_by, created_at, updated_at";

/// A contract body that passed validation.
struct ValidContract {
    contract_number: String,
    title: String,
    vendor_name: String,
    equipment: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    contract_value: f64,
    status: ContractStatus,
    notes: Option<String>,
}

fn validate(input: ContractInput) -> Result<ValidContract, ServiceError> {
    let mut v = Validator::new();
    v.required("contract_number", &input.contract_number, 50)
        .required("title", &input.title, 200)
        .required("vendor_name", &input.vendor_name, 200)
        .optional("equipment", input.equipment.as_deref(), 200)
        .optional("notes", input.notes.as_deref(), 2000);

    let start_date = input_date(&mut v, "start_date", &input.start_date);
    let end_date = input_date(&mut v, "end_date", &input.end_date);
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end < start {
            v.add("end_date", "must not be before start_date");
        }
    }

    match input.contract_value {
        Some(value) => {
            v.amount("contract_value", value);
        }
        None => v.add("contract_value", "is required"),
    }

    let status = match input.status.as_deref().map(str::trim) {
        None | Some("") => Some(ContractStatus::default()),
        Some(s) => {
            let parsed = ContractStatus::parse(s);
            if parsed.is_none() {
                v.add("status", "must be one of draft, active, expired, cancelled");
            }
            parsed
        }
    };

    v.finish()?;

    match (start_date, end_date, input.contract_value, status) {
        (Some(start_date), Some(end_date), Some(contract_value), Some(status)) => Ok(ValidContract {
            contract_number: input.contract_number.trim().to_string(),
            title: input.title.trim().to_string(),
            vendor_name: input.vendor_name.trim().to_string(),
            equipment: clean_opt(input.equipment),
            start_date,
            end_date,
            contract_value: amc_core::round_money(contract_value),
            status,
            notes: clean_opt(input.notes),
        }),
        _ => Err(ServiceError::Internal("contract validation incomplete".into())),
    }
}

fn contract_from_row(row: &Row) -> Result<Contract, ServiceError> {
    let status = row
        .get_str("status")
        .and_then(ContractStatus::parse)
        .ok_or_else(|| ServiceError::Storage("invalid contract status".into()))?;
    Ok(Contract {
        id: row.get_i64("id").unwrap_or_default(),
        contract_number: row.get_str("contract_number").unwrap_or_default().to_string(),
        title: row.get_str("title").unwrap_or_default().to_string(),
        vendor_name: row.get_str("vendor_name").unwrap_or_default().to_string(),
        equipment: row.get_str("equipment").map(String::from),
        start_date: parse_date(row.get_str("start_date"), "start_date")?,
        end_date: parse_date(row.get_str("end_date"), "end_date")?,
        contract_value: row.get_f64("contract_value").unwrap_or_default(),
        status,
        notes: row.get_str("notes").map(String::from),
        created_by: row.get_i64("created_by"),
        created_at: row.get_str("created_at").unwrap_or_default().to_string(),
        updated_at: row.get_str("updated_at").unwrap_or_default().to_string(),
    })
}

/// Build the WHERE clause shared by list, export and the dashboard.
pub(crate) fn contract_filter(query: &ContractQuery) -> Result<Filter, ServiceError> {
    let mut f = Filter::default();
    let mut v = Validator::new();

    if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        f.push(
            "(unicode_lower(contract_number) LIKE ? ESCAPE '\\' OR unicode_lower(title) LIKE ? ESCAPE '\\' \
             OR unicode_lower(vendor_name) LIKE ? ESCAPE '\\' OR unicode_lower(coalesce(equipment, '')) LIKE ? ESCAPE '\\')",
            Value::from(like_pattern(q)),
        );
    }
    if let Some(vendor) = query.vendor.as_deref().filter(|s| !s.trim().is_empty()) {
        f.push("unicode_lower(vendor_name) LIKE ? ESCAPE '\\'", Value::from(like_pattern(vendor)));
    }
    if let Some(status) = query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        match ContractStatus::parse(status.trim()) {
            Some(st) => f.push("status = ?", Value::from(st.as_str())),
            None => v.add("status", "must be one of draft, active, expired, cancelled"),
        }
    }
    if let Some(days) = query.expiring_within_days {
        if days < 0 {
            v.add("expiring_within_days", "must be 0 or greater");
        } else {
            let (from, to) = expiry_window(days);
            f.push("status = ?", Value::from(ContractStatus::Active.as_str()));
            f.push("end_date >= ?", Value::from(from.to_string()));
            f.push("end_date <= ?", Value::from(to.to_string()));
        }
    }

    v.finish()?;
    Ok(f)
}

/// Largest look-ahead honored; keeps the upper bound a four-digit year.
const MAX_WINDOW_DAYS: i64 = 1_000_000;

/// `[today, today + days]`.
pub(crate) fn expiry_window(days: i64) -> (NaiveDate, NaiveDate) {
    let from = today();
    let to = from + chrono::Duration::days(days.clamp(0, MAX_WINDOW_DAYS));
    (from, to)
}

impl ContractsService {
    pub fn create_contract(
        &self,
        actor: &CurrentUser,
        input: ContractInput,
    ) -> Result<Contract, ServiceError> {
        let c = validate(input)?;
        let now = now_rfc3339();

        let id = self
            .sql
            .insert(
                "INSERT INTO contracts (contract_number, title, vendor_name, equipment, start_date,
                     end_date, contract_value, status, notes, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                &[
                    Value::from(c.contract_number.as_str()),
                    Value::from(c.title.as_str()),
                    Value::from(c.vendor_name.as_str()),
                    Value::from(c.equipment.clone()),
                    Value::from(c.start_date.to_string()),
                    Value::from(c.end_date.to_string()),
                    Value::Real(c.contract_value),
                    Value::from(c.status.as_str()),
                    Value::from(c.notes.clone()),
                    Value::Integer(actor.id),
                    Value::from(now.as_str()),
                ],
            )
            .map_err(sql_err)?;

        tracing::info!(contract_id = id, created_by = actor.id, "created contract {}", c.contract_number);

        Ok(Contract {
            id,
            contract_number: c.contract_number,
            title: c.title,
            vendor_name: c.vendor_name,
            equipment: c.equipment,
            start_date: c.start_date,
            end_date: c.end_date,
            contract_value: c.contract_value,
            status: c.status,
            notes: c.notes,
            created_by: Some(actor.id),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn get_contract(&self, id: i64) -> Result<Contract, ServiceError> {
        let rows = self
            .sql
            .query(
                &format!("SELECT {} FROM contracts WHERE id = ?1", CONTRACT_COLUMNS),
                &[Value::Integer(id)],
            )
            .map_err(sql_err)?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("contract {} not found", id)))?;
        contract_from_row(row)
    }

    /// List contracts, soonest `end_date` first.
    pub fn list_contracts(&self, query: &ContractQuery) -> Result<ListResult<Contract>, ServiceError> {
        let page = query.page_params().resolve()?;
        let filter = contract_filter(query)?;
        let where_sql = filter.where_sql();

        let count_rows = self
            .sql
            .query(&format!("SELECT COUNT(*) AS cnt FROM contracts{}", where_sql), &filter.params)
            .map_err(sql_err)?;
        let total = count_rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0) as u64;

        let items = self.select_contracts(&filter, Some(page))?;
        Ok(ListResult::new(items, total, page))
    }

    /// Every contract matching the filters, in list order.
    pub(crate) fn all_contracts(&self, query: &ContractQuery) -> Result<Vec<Contract>, ServiceError> {
        let filter = contract_filter(query)?;
        self.select_contracts(&filter, None)
    }

    fn select_contracts(&self, filter: &Filter, page: Option<Page>) -> Result<Vec<Contract>, ServiceError> {
        let (params, limit_sql) = match page {
            Some(page) => filter.paged(page),
            None => (filter.params.clone(), String::new()),
        };
        let sql = format!(
            "SELECT {} FROM contracts{} ORDER BY end_date ASC, id ASC{}",
            CONTRACT_COLUMNS,
            filter.where_sql(),
            limit_sql,
        );
        let rows = self.sql.query(&sql, &params).map_err(sql_err)?;
        rows.iter().map(contract_from_row).collect()
    }

    /// Replace every editable field of a contract.
    pub fn update_contract(&self, id: i64, input: ContractInput) -> Result<Contract, ServiceError> {
        let current = self.get_contract(id)?;
        let c = validate(input)?;
        let now = now_rfc3339();

        self.sql
            .exec(
                "UPDATE contracts SET contract_number = ?1, title = ?2, vendor_name = ?3,
                     equipment = ?4, start_date = ?5, end_date = ?6, contract_value = ?7,
                     status = ?8, notes = ?9, updated_at = ?10
                 WHERE id = ?11",
                &[
                    Value::from(c.contract_number.as_str()),
                    Value::from(c.title.as_str()),
                    Value::from(c.vendor_name.as_str()),
                    Value::from(c.equipment.clone()),
                    Value::from(c.start_date.to_string()),
                    Value::from(c.end_date.to_string()),
                    Value::Real(c.contract_value),
                    Value::from(c.status.as_str()),
                    Value::from(c.notes.clone()),
                    Value::from(now.as_str()),
                    Value::Integer(id),
                ],
            )
            .map_err(sql_err)?;

        Ok(Contract {
            id,
            contract_number: c.contract_number,
            title: c.title,
            vendor_name: c.vendor_name,
            equipment: c.equipment,
            start_date: c.start_date,
            end_date: c.end_date,
            contract_value: c.contract_value,
            status: c.status,
            notes: c.notes,
            created_by: current.created_by,
            created_at: current.created_at,
            updated_at: now,
        })
    }

    /// Delete a contract. Refused while purchase orders reference it.
    pub fn delete_contract(&self, id: i64) -> Result<(), ServiceError> {
        let rows = self
            .sql
            .query(
                "SELECT COUNT(*) AS cnt FROM purchase_orders WHERE contract_id = ?1",
                &[Value::Integer(id)],
            )
            .map_err(sql_err)?;
        let referenced = rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0);
        if referenced > 0 {
            return Err(ServiceError::Conflict(format!(
                "contract {} is referenced by {} purchase order(s)",
                id, referenced
            )));
        }

        let affected = self
            .sql
            .exec("DELETE FROM contracts WHERE id = ?1", &[Value::Integer(id)])
            .map_err(sql_err)?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("contract {} not found", id)));
        }
        tracing::info!(contract_id = id, "deleted contract");
        Ok(())
    }
}
