use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::error::SQLError;
use crate::traits::{Row, SQLStore, Statement, Value};

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
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        tracing::debug!(path = %path.display(), "opened sqlite store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;
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

/// Map a rusqlite failure, keeping constraint violations distinguishable.
fn exec_error(e: rusqlite::Error) -> SQLError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
        {
            SQLError::ForeignKey(e.to_string())
        }
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            SQLError::Constraint(e.to_string())
        }
        other => SQLError::Execution(other.to_string()),
    }
}

fn execute(conn: &Connection, sql: &str, params: &[Value]) -> Result<usize, SQLError> {
    let bound = bind_params(params);
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        bound.iter().map(|b| b.as_ref()).collect();
    conn.execute(sql, param_refs.as_slice()).map_err(exec_error)
}

impl SQLStore for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        let conn = self.lock()?;

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
                let mut columns = Vec::with_capacity(column_names.len());
                for (i, name) in column_names.iter().enumerate() {
                    columns.push((name.clone(), row_value_at(row, i)?));
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

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        let conn = self.lock()?;
        let affected = execute(&conn, sql, params)?;
        Ok(affected as u64)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64, SQLError> {
        // Same guard for the insert and the rowid read.
        let conn = self.lock()?;
        execute(&conn, sql, params)?;
        Ok(conn.last_insert_rowid())
    }

    fn exec_batch(&self, statements: &[Statement]) -> Result<u64, SQLError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        let mut total = 0u64;
        for stmt in statements {
            total += execute(&tx, &stmt.sql, &stmt.params)? as u64;
        }

        tx.commit()
            .map_err(|e| SQLError::Execution(e.to_string()))?;
        Ok(total)
    }
}

/// Extract a Value from a rusqlite row at a given column index.
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
                "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE, score INTEGER)",
                &[],
            )
            .unwrap();
        store
    }

    #[test]
    fn insert_returns_rowid() {
        let s = store();
        let a = s.insert("INSERT INTO t (name) VALUES (?1)", &[Value::from("a")]).unwrap();
        let b = s.insert("INSERT INTO t (name) VALUES (?1)", &[Value::from("b")]).unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn query_keeps_nulls_and_column_order() {
        let s = store();
        s.insert("INSERT INTO t (name) VALUES (?1)", &[Value::from("a")]).unwrap();
        let rows = s.query("SELECT id, name, score FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        let names: Vec<&str> = rows[0].columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "score"]);
        assert!(rows[0].is_null("score"));
        assert_eq!(rows[0].get_str("name"), Some("a"));
    }

    #[test]
    fn unique_violation_is_constraint_error() {
        let s = store();
        s.insert("INSERT INTO t (name) VALUES (?1)", &[Value::from("a")]).unwrap();
        let err = s.insert("INSERT INTO t (name) VALUES (?1)", &[Value::from("a")]).unwrap_err();
        assert!(matches!(err, SQLError::Constraint(_)));
    }

    #[test]
    fn dangling_reference_is_foreign_key_error() {
        let s = store();
        s.exec("CREATE TABLE child (t_id INTEGER NOT NULL REFERENCES t(id))", &[])
            .unwrap();
        let err = s.exec("INSERT INTO child (t_id) VALUES (9)", &[]).unwrap_err();
        assert!(matches!(err, SQLError::ForeignKey(_)));
    }

    #[test]
    fn failed_batch_rolls_back() {
        let s = store();
        s.insert("INSERT INTO t (name, score) VALUES (?1, 0)", &[Value::from("a")]).unwrap();

        let result = s.exec_batch(&[
            Statement::new("UPDATE t SET score = score + 1 WHERE name = ?1", vec!["a".into()]),
            Statement::new("INSERT INTO t (name) VALUES (?1)", vec!["a".into()]),
        ]);
        assert!(result.is_err());

        let rows = s.query("SELECT score FROM t WHERE name = 'a'", &[]).unwrap();
        assert_eq!(rows[0].get_i64("score"), Some(0));
    }
}
