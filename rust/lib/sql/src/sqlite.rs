use std::path::Path;
use std::sync::Mutex;

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

use crate::error::SQLError;
use crate::traits::{Row, SQLStore, SqlTx, Value};

/// SqliteStore is a SQLStore implementation backed by rusqlite (bundled SQLite).
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SQLError> {
        let conn = Connection::open(path)
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        // Enable WAL mode for better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        configure(&conn)?;

        tracing::debug!("opened sqlite database at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        configure(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SQLError> {
        self.conn
            .lock()
            .map_err(|e| SQLError::Connection(e.to_string()))
    }
}

/// Per-connection setup: foreign keys on, plus `unicode_lower(text)`.
///
/// SQLite's built-in `lower()` only folds ASCII. `unicode_lower` folds the
/// same way as Rust's `str::to_lowercase`, so search terms lowered in Rust
/// match stored text. NULL stays NULL; numbers are lowered as text.
fn configure(conn: &Connection) -> Result<(), SQLError> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")
        .map_err(|e| SQLError::Connection(e.to_string()))?;
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            use rusqlite::types::ValueRef;
            Ok(match ctx.get_raw(0) {
                ValueRef::Null => None,
                ValueRef::Text(t) | ValueRef::Blob(t) => {
                    Some(String::from_utf8_lossy(t).to_lowercase())
                }
                ValueRef::Integer(i) => Some(i.to_string()),
                ValueRef::Real(f) => Some(f.to_string()),
            })
        },
    )
    .map_err(|e| SQLError::Connection(e.to_string()))
}

/// Connection handle lent to a transaction closure.
struct SqliteTx<'a> {
    conn: &'a Connection,
}

impl SqlTx for SqliteTx<'_> {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        run_query(self.conn, sql, params)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        run_exec(self.conn, sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64, SQLError> {
        run_insert(self.conn, sql, params)
    }
}

impl SQLStore for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        let conn = self.lock()?;
        run_query(&conn, sql, params)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        let conn = self.lock()?;
        run_exec(&conn, sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64, SQLError> {
        let conn = self.lock()?;
        run_insert(&conn, sql, params)
    }

    fn transaction(
        &self,
        f: &mut dyn FnMut(&dyn SqlTx) -> Result<(), SQLError>,
    ) -> Result<(), SQLError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        // Dropping `tx` without commit rolls back.
        f(&SqliteTx { conn: &tx })?;

        tx.commit().map_err(|e| SQLError::Execution(e.to_string()))
    }
}

/// Convert our Value enum to rusqlite's ToSql.
fn bind_params(params: &[Value]) -> Vec<Box<dyn rusqlite::types::ToSql + '_>> {
    params
        .iter()
        .map(|v| -> Box<dyn rusqlite::types::ToSql + '_> {
            match v {
                Value::Null => Box::new(rusqlite::types::Null),
                Value::Integer(i) => Box::new(*i),
                Value::Real(f) => Box::new(*f),
                Value::Text(s) => Box::new(s.as_str()),
                Value::Blob(b) => Box::new(b.as_slice()),
            }
        })
        .collect()
}

fn run_query(conn: &Connection, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
    let bound = bind_params(params);
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        bound.iter().map(|b| b.as_ref()).collect();

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| SQLError::Query(e.to_string()))?;

    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            let mut columns = Vec::new();
            for (i, name) in column_names.iter().enumerate() {
                let val = row_value_at(row, i)?;
                columns.push((name.clone(), val));
            }
            Ok(Row { columns })
        })
        .map_err(|e| SQLError::Query(e.to_string()))?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(|e| SQLError::Query(e.to_string()))?);
    }
    Ok(result)
}

fn run_exec(conn: &Connection, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
    let bound = bind_params(params);
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        bound.iter().map(|b| b.as_ref()).collect();

    let affected = conn
        .execute(sql, param_refs.as_slice())
        .map_err(SQLError::from_write)?;

    Ok(affected as u64)
}

fn run_insert(conn: &Connection, sql: &str, params: &[Value]) -> Result<i64, SQLError> {
    run_exec(conn, sql, params)?;
    Ok(conn.last_insert_rowid())
}

/// Extract a Value from a rusqlite row at a given column index,
/// following the column's storage class.
fn row_value_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Value> {
    use rusqlite::types::ValueRef;

    Ok(match row.get_ref(idx)? {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .exec(
                "CREATE TABLE vendors (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE
                )",
                &[],
            )
            .unwrap();
        store
            .exec(
                "CREATE TABLE orders (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    vendor_id INTEGER NOT NULL REFERENCES vendors(id),
                    total REAL NOT NULL
                )",
                &[],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_insert_returns_rowid() {
        let store = store();
        let a = store.insert("INSERT INTO vendors (name) VALUES (?1)", &[Value::from("Acme")]).unwrap();
        let b = store.insert("INSERT INTO vendors (name) VALUES (?1)", &[Value::from("Globex")]).unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);

        let rows = store.query("SELECT id, name FROM vendors WHERE id = ?1", &[Value::Integer(b)]).unwrap();
        assert_eq!(rows[0].get_str("name"), Some("Globex"));
    }

    #[test]
    fn test_unique_violation_is_classified() {
        let store = store();
        store.insert("INSERT INTO vendors (name) VALUES (?1)", &[Value::from("Acme")]).unwrap();
        let err = store
            .insert("INSERT INTO vendors (name) VALUES (?1)", &[Value::from("Acme")])
            .unwrap_err();
        assert!(matches!(err, SQLError::Unique(_)), "got {:?}", err);
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let store = store();
        let err = store
            .insert(
                "INSERT INTO orders (vendor_id, total) VALUES (?1, ?2)",
                &[Value::Integer(99), Value::Real(1.0)],
            )
            .unwrap_err();
        assert!(matches!(err, SQLError::ForeignKey(_)), "got {:?}", err);
    }

    #[test]
    fn test_transaction_commits() {
        let store = store();
        store
            .transaction(&mut |tx| {
                let vendor = tx.insert("INSERT INTO vendors (name) VALUES (?1)", &[Value::from("Acme")])?;
                tx.exec(
                    "INSERT INTO orders (vendor_id, total) VALUES (?1, ?2)",
                    &[Value::Integer(vendor), Value::Real(10.5)],
                )?;
                Ok(())
            })
            .unwrap();

        let rows = store.query("SELECT total FROM orders", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_f64("total"), Some(10.5));
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let store = store();
        let result = store.transaction(&mut |tx| {
            tx.insert("INSERT INTO vendors (name) VALUES (?1)", &[Value::from("Acme")])?;
            // Unknown vendor: the whole transaction must be undone.
            tx.exec(
                "INSERT INTO orders (vendor_id, total) VALUES (?1, ?2)",
                &[Value::Integer(42), Value::Real(1.0)],
            )?;
            Ok(())
        });
        assert!(result.is_err());

        let rows = store.query("SELECT COUNT(*) AS cnt FROM vendors", &[]).unwrap();
        assert_eq!(rows[0].get_i64("cnt"), Some(0));
    }

    #[test]
    fn test_unicode_lower_folds_non_ascii() {
        let store = store();
        store.insert("INSERT INTO vendors (name) VALUES (?1)", &[Value::from("Élan Ünited")]).unwrap();
        store.insert("INSERT INTO vendors (name) VALUES (?1)", &[Value::from("Acme")]).unwrap();

        let rows = store
            .query(
                "SELECT name, unicode_lower(name) AS folded FROM vendors WHERE unicode_lower(name) LIKE ?1",
                &[Value::from("%élan ü%")],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("folded"), Some("élan ünited"));

        let rows = store.query("SELECT unicode_lower(NULL) AS v", &[]).unwrap();
        assert_eq!(rows[0].get("v"), Some(&Value::Null));
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("amc.sqlite");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.exec("CREATE TABLE t (v TEXT)", &[]).unwrap();
            store.exec("INSERT INTO t (v) VALUES (?1)", &[Value::from("kept")]).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let rows = store.query("SELECT v FROM t", &[]).unwrap();
        assert_eq!(rows[0].get_str("v"), Some("kept"));
    }
}
