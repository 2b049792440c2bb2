//! Receipt composition and dual-channel printing pipeline.
//!
//! The pipeline is resolver -> composer -> dispatcher: a stored template
//! for the (branch, transaction kind) pair is resolved (created lazily,
//! or degraded to a hardcoded fallback), the transaction payload is
//! composed into a section-based document, and the document is dispatched
//! to a thermal printer via the local bridge with a browser fallback.
//! Every dispatch outcome lands in the append-only print log.

use std::sync::OnceLock;

use tracing::error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod compose;
pub mod db;
pub mod dispatch;
pub mod document;
pub mod escpos;
pub mod history;
pub mod render;
pub mod template;
pub mod transaction;

use crate::db::DbState;
use crate::dispatch::{DispatchConfig, DispatchOutcome, Dispatcher, PrinterBridge, ReceiptWindow};
use crate::transaction::Transaction;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Initialize structured logging once. Safe to call repeatedly.
pub fn init_tracing() {
    TRACING_INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,receipt_engine=debug"));
        let console_layer = fmt::layer().with_target(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();
    });
}

/// Facade wiring resolver, composer, dispatcher, and the print log.
pub struct ReceiptPipeline<'a> {
    bridge: &'a dyn PrinterBridge,
    window: &'a dyn ReceiptWindow,
}

impl<'a> ReceiptPipeline<'a> {
    pub fn new(bridge: &'a dyn PrinterBridge, window: &'a dyn ReceiptWindow) -> Self {
        Self { bridge, window }
    }

    /// Print one transaction for a branch and return the dispatch outcome.
    ///
    /// Template resolution never blocks the print: a missing or
    /// unreadable template degrades to the fallback. A failed log write
    /// does not mask the outcome of the print itself.
    pub fn print(
        &self,
        db: &DbState,
        tx: &Transaction,
        branch_id: &str,
    ) -> Result<DispatchOutcome, String> {
        let resolution = template::resolve_template(db, tx.kind(), branch_id);
        let doc = compose::compose(resolution.template(), tx);

        let cfg = DispatchConfig::load(db)?;
        let dispatcher = Dispatcher::new(self.bridge, self.window, cfg.paper, cfg.preferred_printer);
        let outcome = dispatcher.dispatch(&doc);

        if let Err(e) = history::record_outcome(db, tx.kind(), Some(branch_id), &outcome) {
            error!(error = %e, "Failed to record print outcome");
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{BridgeError, DispatchMethod};
    use crate::template::{upsert_branch, Branch, TemplateResolution};
    use crate::transaction::{LineItem, SaleInfo, TransactionKind};
    use rusqlite::Connection;
    use std::cell::RefCell;
    use std::sync::Mutex;

    struct NoBridge;

    impl PrinterBridge for NoBridge {
        fn is_active(&self) -> bool {
            false
        }
        fn list_printers(&self) -> Result<Vec<String>, BridgeError> {
            Ok(vec![])
        }
        fn print_raw(&self, _printer: &str, _data: &[u8]) -> Result<(), BridgeError> {
            Err(BridgeError::Connection("no bridge".to_string()))
        }
    }

    struct CapturingWindow {
        html: RefCell<Option<String>>,
    }

    impl ReceiptWindow for CapturingWindow {
        fn open(&self, html: &str, _label: &str) -> Result<String, String> {
            *self.html.borrow_mut() = Some(html.to_string());
            Ok("/tmp/receipts/out.html".to_string())
        }
    }

    fn test_db() -> DbState {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        db::run_migrations_for_test(&conn);
        DbState {
            conn: Mutex::new(conn),
            db_path: std::path::PathBuf::from(":memory:"),
        }
    }

    #[test]
    fn test_pipeline_end_to_end_browser_fallback() {
        let db = test_db();
        upsert_branch(
            &db,
            &Branch {
                id: "b1".to_string(),
                name: "Boot World Rosebank".to_string(),
                address: Some("12 Main Rd".to_string()),
                phone: None,
            },
        )
        .expect("branch");

        let bridge = NoBridge;
        let window = CapturingWindow {
            html: RefCell::new(None),
        };
        let pipeline = ReceiptPipeline::new(&bridge, &window);

        let tx = Transaction::Sale(SaleInfo {
            receipt_number: "R-1001".to_string(),
            date: "2026-08-25".to_string(),
            time: "14:30".to_string(),
            items: vec![LineItem {
                name: "Boot".to_string(),
                quantity: 2.0,
                price: 10.0,
                total: 20.0,
            }],
            subtotal: 20.0,
            total: 20.0,
            payment_method: Some("Cash".to_string()),
            ..Default::default()
        });

        let outcome = pipeline.print(&db, &tx, "b1").expect("print");
        assert!(outcome.success);
        assert_eq!(outcome.method, DispatchMethod::Browser);

        // The lazily created template carried the branch name into the HTML
        let html = window.html.borrow().clone().expect("html captured");
        assert!(html.contains("Boot World Rosebank"));
        assert!(html.contains("Boot"));

        // Template row now stored
        let res = template::resolve_template(&db, TransactionKind::Sale, "b1");
        assert!(matches!(res, TemplateResolution::Stored(_)));

        // Outcome logged
        let log = history::list_recent(&db, 5).expect("log");
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].method, "browser");
        assert!(log[0].success);
    }

    #[test]
    fn test_pipeline_survives_template_store_loss() {
        let db = test_db();
        {
            let conn = db.conn.lock().unwrap();
            conn.execute_batch("DROP TABLE receipt_templates;")
                .expect("drop");
        }

        let bridge = NoBridge;
        let window = CapturingWindow {
            html: RefCell::new(None),
        };
        let pipeline = ReceiptPipeline::new(&bridge, &window);

        let tx = Transaction::Sale(SaleInfo {
            receipt_number: "R-1".to_string(),
            subtotal: 5.0,
            total: 5.0,
            ..Default::default()
        });

        // Resolver degrades to the fallback; the print still goes out
        let outcome = pipeline.print(&db, &tx, "b1").expect("print");
        assert!(outcome.success);
        let html = window.html.borrow().clone().expect("html captured");
        assert!(html.contains("RECEIPT"));
    }
}
