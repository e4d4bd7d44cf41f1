use amc_core::ServiceError;
use amc_sql::SQLStore;

/// Initialize the SQLite schema for contracts and purchase orders.
pub fn init_schema(sql: &dyn SQLStore) -> Result<(), ServiceError> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS contracts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contract_number TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            vendor_name TEXT NOT NULL,
            equipment TEXT,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            contract_value REAL NOT NULL DEFAULT 0 CHECK (contract_value >= 0),
            status TEXT NOT NULL DEFAULT 'active'
                CHECK (status IN ('draft', 'active', 'expired', 'cancelled')),
            notes TEXT,
            created_by INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK (end_date >= start_date)
        )",
        "CREATE INDEX IF NOT EXISTS idx_contracts_end_date ON contracts(end_date)",
        "CREATE INDEX IF NOT EXISTS idx_contracts_status ON contracts(status)",

        // Contract link is optional; deleting a referenced contract fails.
        "CREATE TABLE IF NOT EXISTS purchase_orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            po_number TEXT NOT NULL UNIQUE,
            contract_id INTEGER REFERENCES contracts(id),
            vendor_name TEXT NOT NULL,
            order_date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'draft'
                CHECK (status IN ('draft', 'submitted', 'approved', 'received', 'cancelled')),
            notes TEXT,
            total_amount REAL NOT NULL DEFAULT 0,
            created_by INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_purchase_orders_contract ON purchase_orders(contract_id)",
        "CREATE INDEX IF NOT EXISTS idx_purchase_orders_order_date ON purchase_orders(order_date)",

        "CREATE TABLE IF NOT EXISTS po_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            purchase_order_id INTEGER NOT NULL,
            description TEXT NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            unit_price REAL NOT NULL CHECK (unit_price >= 0),
            amount REAL NOT NULL,
            FOREIGN KEY (purchase_order_id) REFERENCES purchase_orders(id) ON DELETE CASCADE
        )",
        "CREATE INDEX IF NOT EXISTS idx_po_items_order ON po_items(purchase_order_id)",
    ];

    for stmt in &statements {
        sql.exec(stmt, &[])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
    }

    Ok(())
}
