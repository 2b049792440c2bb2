//! Append-only log of dispatch outcomes.
//!
//! One row per dispatch attempt, successful or not. There is no queue
//! and no retry machinery; the log exists for operational visibility
//! (which receipts went to thermal, which fell back, which failed).

use chrono::Utc;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::db::DbState;
use crate::dispatch::DispatchOutcome;
use crate::transaction::TransactionKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintLogEntry {
    pub id: String,
    pub transaction_kind: String,
    pub branch_id: Option<String>,
    pub method: String,
    pub success: bool,
    pub printer: Option<String>,
    pub artifact_path: Option<String>,
    pub message: Option<String>,
    pub created_at: String,
}

/// Record one dispatch outcome. Returns the log row id.
pub fn record_outcome(
    db: &DbState,
    kind: TransactionKind,
    branch_id: Option<&str>,
    outcome: &DispatchOutcome,
) -> Result<String, String> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    conn.execute(
        "INSERT INTO print_log (id, transaction_kind, branch_id, method, success,
                                printer, artifact_path, message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            kind.template_name(),
            branch_id,
            outcome.method.as_str(),
            outcome.success as i32,
            outcome.printer,
            outcome.artifact_path,
            outcome.message,
            now,
        ],
    )
    .map_err(|e| format!("record print outcome: {e}"))?;

    info!(
        id = %id,
        kind = kind.template_name(),
        method = outcome.method.as_str(),
        success = outcome.success,
        "Print outcome recorded"
    );
    Ok(id)
}

/// Most recent log entries, newest first.
pub fn list_recent(db: &DbState, limit: u32) -> Result<Vec<PrintLogEntry>, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let mut stmt = conn
        .prepare(
            "SELECT id, transaction_kind, branch_id, method, success,
                    printer, artifact_path, message, created_at
             FROM print_log ORDER BY created_at DESC, id DESC LIMIT ?1",
        )
        .map_err(|e| e.to_string())?;

    let rows = stmt
        .query_map(params![limit], |row| {
            Ok(PrintLogEntry {
                id: row.get(0)?,
                transaction_kind: row.get(1)?,
                branch_id: row.get(2)?,
                method: row.get(3)?,
                success: row.get::<_, i32>(4)? != 0,
                printer: row.get(5)?,
                artifact_path: row.get(6)?,
                message: row.get(7)?,
                created_at: row.get(8)?,
            })
        })
        .map_err(|e| format!("list print log: {e}"))?;

    Ok(rows.filter_map(|r| r.ok()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::dispatch::DispatchMethod;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn test_db() -> DbState {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        db::run_migrations_for_test(&conn);
        DbState {
            conn: Mutex::new(conn),
            db_path: std::path::PathBuf::from(":memory:"),
        }
    }

    fn outcome(method: DispatchMethod, success: bool) -> DispatchOutcome {
        DispatchOutcome {
            success,
            method,
            printer: match method {
                DispatchMethod::Thermal => Some("Front".to_string()),
                _ => None,
            },
            artifact_path: None,
            message: "test".to_string(),
        }
    }

    #[test]
    fn test_record_and_list() {
        let db = test_db();
        record_outcome(
            &db,
            TransactionKind::Sale,
            Some("b1"),
            &outcome(DispatchMethod::Thermal, true),
        )
        .expect("record");
        record_outcome(
            &db,
            TransactionKind::Refund,
            Some("b1"),
            &outcome(DispatchMethod::None, false),
        )
        .expect("record");

        let rows = list_recent(&db, 10).expect("list");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.transaction_kind == "sale"
            && r.method == "thermal"
            && r.success
            && r.printer.as_deref() == Some("Front")));
        assert!(rows
            .iter()
            .any(|r| r.transaction_kind == "refund" && r.method == "none" && !r.success));
    }

    #[test]
    fn test_list_respects_limit() {
        let db = test_db();
        for _ in 0..5 {
            record_outcome(
                &db,
                TransactionKind::Sale,
                None,
                &outcome(DispatchMethod::Browser, true),
            )
            .expect("record");
        }
        let rows = list_recent(&db, 3).expect("list");
        assert_eq!(rows.len(), 3);
    }
}
