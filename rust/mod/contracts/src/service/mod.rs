pub mod contract;
pub mod dashboard;
pub mod export;
pub mod purchase_order;
pub mod schema;

use std::sync::Arc;

use amc_core::{Page, ServiceError, Validator};
use amc_sql::{SQLError, SQLStore, Value};
use chrono::NaiveDate;

/// Contracts, purchase orders and the reporting built on them.
pub struct ContractsService {
    pub(crate) sql: Arc<dyn SQLStore>,
}

impl ContractsService {
    /// Create a new ContractsService, initializing the DB schema.
    pub fn new(sql: Arc<dyn SQLStore>) -> Result<Arc<Self>, ServiceError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Arc::new(Self { sql }))
    }
}

/// Map a store error. Duplicate business keys become 409.
pub(crate) fn sql_err(e: SQLError) -> ServiceError {
    match e {
        SQLError::Unique(msg) if msg.contains("contract_number") => {
            ServiceError::Conflict("contract_number is already in use".into())
        }
        SQLError::Unique(msg) if msg.contains("po_number") => {
            ServiceError::Conflict("po_number is already in use".into())
        }
        SQLError::Unique(msg) => ServiceError::Conflict(msg),
        SQLError::ForeignKey(msg) => ServiceError::Conflict(format!("record is still referenced: {}", msg)),
        other => ServiceError::Storage(other.to_string()),
    }
}

/// Parse a stored `YYYY-MM-DD` column.
pub(crate) fn parse_date(value: Option<&str>, column: &str) -> Result<NaiveDate, ServiceError> {
    value
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .ok_or_else(|| ServiceError::Storage(format!("invalid date in column {}", column)))
}

/// Validate a required `YYYY-MM-DD` field from a request body.
pub(crate) fn input_date(v: &mut Validator, field: &str, value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        v.add(field, "is required");
        return None;
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(_) => {
            v.add(field, "must be a date in YYYY-MM-DD format");
            None
        }
    }
}

/// WHERE clause builder with positional parameters.
#[derive(Default)]
pub(crate) struct Filter {
    clauses: Vec<String>,
    pub(crate) params: Vec<Value>,
}

impl Filter {
    /// Add a clause; `?` in `clause` is replaced by the next parameter index.
    pub(crate) fn push(&mut self, clause: &str, value: Value) {
        self.params.push(value);
        let idx = format!("?{}", self.params.len());
        self.clauses.push(clause.replace('?', &idx));
    }

    pub(crate) fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// Parameters followed by LIMIT and OFFSET, with their placeholders.
    pub(crate) fn paged(&self, page: Page) -> (Vec<Value>, String) {
        let mut params = self.params.clone();
        params.push(Value::Integer(page.limit as i64));
        params.push(Value::Integer(page.offset()));
        let n = params.len();
        (params, format!(" LIMIT ?{} OFFSET ?{}", n - 1, n))
    }
}

/// Trimmed optional text; blank becomes `None`.
pub(crate) fn clean_opt(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use amc_sql::SqliteStore;

    use super::ContractsService;

    pub fn service() -> Arc<ContractsService> {
        let sql = Arc::new(SqliteStore::open_in_memory().unwrap());
        ContractsService::new(sql).unwrap()
    }
}
