use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use super::model::{Table, Value};

/// A relational source of full tables, addressed by physical table name.
pub trait TableStore {
    fn fetch(&self, table_name: &str) -> Result<Table>;
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open an existing database read-only.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("opening backing store {}", path.display()))?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl TableStore for SqliteStore {
    fn fetch(&self, table_name: &str) -> Result<Table> {
        let sql = format!("SELECT * FROM \"{}\"", table_name.replace('"', "\"\""));
        let mut stmt = self
            .conn
            .prepare(&sql)
            .with_context(|| format!("querying table {table_name}"))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut result = stmt.query([])?;
        while let Some(row) = result.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(sql_value(row.get_ref(i)?));
            }
            rows.push(values);
        }

        Ok(Table::new(&columns, rows))
    }
}

fn sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::infer(String::from_utf8_lossy(bytes).trim()),
        ValueRef::Blob(_) => Value::Null,
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Tables held in memory, keyed by physical table name.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: HashMap<String, Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table_name: &str, table: Table) {
        self.tables.insert(table_name.to_string(), table);
    }
}

impl TableStore for MemoryStore {
    fn fetch(&self, table_name: &str) -> Result<Table> {
        self.tables
            .get(table_name)
            .cloned()
            .with_context(|| format!("no such table: {table_name}"))
    }
}
