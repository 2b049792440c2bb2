//! Output dispatcher: thermal first, browser fallback, one attempt each.
//!
//! The printer bridge is a small local HTTP service probed at dispatch
//! time. It is injected behind the `PrinterBridge` trait so tests (and
//! alternative transports) substitute a fake without shared state. The
//! browser tier writes a timestamped HTML artifact and hands it to the
//! system browser, where the page auto-invokes the print dialog.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{self, DbState};
use crate::document::ReceiptDoc;
use crate::escpos::PaperWidth;
use crate::render;

/// Printer bridge error types.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Bridge service unreachable
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Bridge reachable but reported a failure
    #[error("Bridge error: {0}")]
    Service(String),

    /// No printers enumerable
    #[error("No printers available")]
    NoPrinters,
}

/// Client for the local print bridge: probe, enumerate, send raw bytes.
pub trait PrinterBridge {
    fn is_active(&self) -> bool;
    fn list_printers(&self) -> Result<Vec<String>, BridgeError>;
    fn print_raw(&self, printer: &str, data: &[u8]) -> Result<(), BridgeError>;
}

/// Sink for the browser fallback; returns the artifact path on success.
pub trait ReceiptWindow {
    fn open(&self, html: &str, label: &str) -> Result<String, String>;
}

/// How the receipt ultimately went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMethod {
    Thermal,
    Browser,
    None,
}

impl DispatchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchMethod::Thermal => "thermal",
            DispatchMethod::Browser => "browser",
            DispatchMethod::None => "none",
        }
    }
}

/// Result of one dispatch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub success: bool,
    pub method: DispatchMethod,
    pub printer: Option<String>,
    pub artifact_path: Option<String>,
    pub message: String,
}

// ---------------------------------------------------------------------------
// HTTP bridge client
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PrintersResponse {
    printers: Vec<String>,
}

/// `PrinterBridge` over the local bridge service.
///
/// `GET /status` probes, `GET /printers` enumerates, `POST /print`
/// carries the ESC/POS payload base64-encoded.
pub struct HttpPrintBridge {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpPrintBridge {
    pub const DEFAULT_URL: &'static str = "http://127.0.0.1:9723";

    pub fn new(base_url: &str) -> Result<Self, BridgeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| BridgeError::Connection(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

impl PrinterBridge for HttpPrintBridge {
    fn is_active(&self) -> bool {
        self.client
            .get(format!("{}/status", self.base_url))
            .send()
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }

    fn list_printers(&self) -> Result<Vec<String>, BridgeError> {
        let resp = self
            .client
            .get(format!("{}/printers", self.base_url))
            .send()
            .map_err(|e| BridgeError::Connection(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(BridgeError::Service(format!(
                "printer list returned {}",
                resp.status()
            )));
        }
        let body: PrintersResponse = resp
            .json()
            .map_err(|e| BridgeError::Service(format!("printer list decode: {e}")))?;
        Ok(body.printers)
    }

    fn print_raw(&self, printer: &str, data: &[u8]) -> Result<(), BridgeError> {
        let resp = self
            .client
            .post(format!("{}/print", self.base_url))
            .json(&serde_json::json!({
                "printer": printer,
                "data": BASE64.encode(data),
            }))
            .send()
            .map_err(|e| BridgeError::Connection(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(BridgeError::Service(format!(
                "print returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Browser window
// ---------------------------------------------------------------------------

/// Writes the HTML artifact under the receipts directory and opens it in
/// the system browser.
pub struct BrowserWindow {
    receipts_dir: PathBuf,
}

impl BrowserWindow {
    pub fn new(receipts_dir: PathBuf) -> Self {
        Self { receipts_dir }
    }
}

impl ReceiptWindow for BrowserWindow {
    fn open(&self, html: &str, label: &str) -> Result<String, String> {
        fs::create_dir_all(&self.receipts_dir).map_err(|e| format!("create receipts dir: {e}"))?;
        let slug: String = label
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let file_path = self.receipts_dir.join(format!("{slug}_{timestamp}.html"));
        fs::write(&file_path, html).map_err(|e| format!("write print artifact: {e}"))?;
        let path_str = file_path.to_string_lossy().to_string();
        webbrowser::open(&path_str).map_err(|e| format!("open browser: {e}"))?;
        Ok(path_str)
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Dispatch settings read from `local_settings` (category `printing`).
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub paper: PaperWidth,
    pub bridge_url: String,
    pub preferred_printer: Option<String>,
}

impl DispatchConfig {
    pub fn load(db: &DbState) -> Result<Self, String> {
        let conn = db.conn.lock().map_err(|e| e.to_string())?;
        let paper = db::get_setting(&conn, "printing", "paper_width_mm")
            .and_then(|v| v.trim().parse::<i32>().ok())
            .map(PaperWidth::from_mm)
            .unwrap_or(PaperWidth::Mm80);
        let bridge_url = db::get_setting(&conn, "printing", "bridge_url")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| HttpPrintBridge::DEFAULT_URL.to_string());
        let preferred_printer = db::get_setting(&conn, "printing", "preferred_printer")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Ok(Self {
            paper,
            bridge_url,
            preferred_printer,
        })
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Two-tier dispatch state machine. Each tier is attempted at most once,
/// in order; there are no retries.
pub struct Dispatcher<'a> {
    bridge: &'a dyn PrinterBridge,
    window: &'a dyn ReceiptWindow,
    paper: PaperWidth,
    preferred_printer: Option<String>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        bridge: &'a dyn PrinterBridge,
        window: &'a dyn ReceiptWindow,
        paper: PaperWidth,
        preferred_printer: Option<String>,
    ) -> Self {
        Self {
            bridge,
            window,
            paper,
            preferred_printer,
        }
    }

    pub fn dispatch(&self, doc: &ReceiptDoc) -> DispatchOutcome {
        let thermal_failure = match self.try_thermal(doc) {
            Ok(printer) => {
                info!(printer = %printer, label = %doc.label, "Receipt printed");
                return DispatchOutcome {
                    success: true,
                    method: DispatchMethod::Thermal,
                    printer: Some(printer.clone()),
                    artifact_path: None,
                    message: format!("Printed to {printer}"),
                };
            }
            Err(reason) => reason,
        };

        warn!(reason = %thermal_failure, "Thermal attempt failed, falling back to browser");

        let html = render::html::render(doc);
        match self.window.open(&html, &doc.label) {
            Ok(path) => {
                info!(path = %path, label = %doc.label, "Receipt opened in browser");
                DispatchOutcome {
                    success: true,
                    method: DispatchMethod::Browser,
                    printer: None,
                    artifact_path: Some(path),
                    message: "Opened in browser for printing".to_string(),
                }
            }
            Err(browser_failure) => DispatchOutcome {
                success: false,
                method: DispatchMethod::None,
                printer: None,
                artifact_path: None,
                message: format!(
                    "Printing failed: thermal ({thermal_failure}); browser ({browser_failure})"
                ),
            },
        }
    }

    fn try_thermal(&self, doc: &ReceiptDoc) -> Result<String, String> {
        if !self.bridge.is_active() {
            return Err("printer bridge not reachable".to_string());
        }
        let printers = self
            .bridge
            .list_printers()
            .map_err(|e| e.to_string())?;
        if printers.is_empty() {
            return Err(BridgeError::NoPrinters.to_string());
        }

        let printer = self
            .preferred_printer
            .as_deref()
            .filter(|p| printers.iter().any(|name| name == p))
            .unwrap_or(printers[0].as_str())
            .to_string();

        let rendered = render::escpos::render(doc, self.paper);
        for warning in &rendered.warnings {
            warn!(code = %warning.code, "{}", warning.message);
        }
        self.bridge
            .print_raw(&printer, &rendered.bytes)
            .map_err(|e| e.to_string())?;
        Ok(printer)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::compose;
    use crate::template::Template;
    use crate::transaction::{SaleInfo, Transaction};
    use std::cell::RefCell;
    use std::sync::Mutex;

    struct FakeBridge {
        active: bool,
        printers: Vec<String>,
        fail_print: bool,
        printed: RefCell<Vec<(String, Vec<u8>)>>,
    }

    impl FakeBridge {
        fn offline() -> Self {
            Self {
                active: false,
                printers: vec![],
                fail_print: false,
                printed: RefCell::new(vec![]),
            }
        }

        fn online(printers: &[&str]) -> Self {
            Self {
                active: true,
                printers: printers.iter().map(|s| s.to_string()).collect(),
                fail_print: false,
                printed: RefCell::new(vec![]),
            }
        }
    }

    impl PrinterBridge for FakeBridge {
        fn is_active(&self) -> bool {
            self.active
        }

        fn list_printers(&self) -> Result<Vec<String>, BridgeError> {
            Ok(self.printers.clone())
        }

        fn print_raw(&self, printer: &str, data: &[u8]) -> Result<(), BridgeError> {
            if self.fail_print {
                return Err(BridgeError::Service("spooler rejected job".to_string()));
            }
            self.printed
                .borrow_mut()
                .push((printer.to_string(), data.to_vec()));
            Ok(())
        }
    }

    struct FakeWindow {
        fail: bool,
        opened: RefCell<Vec<String>>,
    }

    impl FakeWindow {
        fn working() -> Self {
            Self {
                fail: false,
                opened: RefCell::new(vec![]),
            }
        }

        fn blocked() -> Self {
            Self {
                fail: true,
                opened: RefCell::new(vec![]),
            }
        }
    }

    impl ReceiptWindow for FakeWindow {
        fn open(&self, html: &str, _label: &str) -> Result<String, String> {
            if self.fail {
                return Err("popup blocked".to_string());
            }
            self.opened.borrow_mut().push(html.to_string());
            Ok("/tmp/receipts/sale_20260825_143000.html".to_string())
        }
    }

    fn sample_doc() -> crate::document::ReceiptDoc {
        let template = Template {
            business_name: "Boot World".to_string(),
            thank_you_message: Some("Thank you!".to_string()),
            ..Default::default()
        };
        let tx = Transaction::Sale(SaleInfo {
            receipt_number: "R-1".to_string(),
            total: 20.0,
            subtotal: 20.0,
            ..Default::default()
        });
        compose(&template, &tx)
    }

    #[test]
    fn test_thermal_success() {
        let bridge = FakeBridge::online(&["EPSON TM-T20"]);
        let window = FakeWindow::working();
        let d = Dispatcher::new(&bridge, &window, PaperWidth::Mm80, None);

        let outcome = d.dispatch(&sample_doc());
        assert!(outcome.success);
        assert_eq!(outcome.method, DispatchMethod::Thermal);
        assert_eq!(outcome.printer.as_deref(), Some("EPSON TM-T20"));

        let printed = bridge.printed.borrow();
        assert_eq!(printed.len(), 1);
        // Payload is ESC/POS, starting with init
        assert_eq!(&printed[0].1[..2], &[0x1B, 0x40]);
        // Browser tier never touched
        assert!(window.opened.borrow().is_empty());
    }

    #[test]
    fn test_preferred_printer_selected() {
        let bridge = FakeBridge::online(&["Front", "Back"]);
        let window = FakeWindow::working();
        let d = Dispatcher::new(
            &bridge,
            &window,
            PaperWidth::Mm80,
            Some("Back".to_string()),
        );

        let outcome = d.dispatch(&sample_doc());
        assert_eq!(outcome.printer.as_deref(), Some("Back"));
    }

    #[test]
    fn test_unknown_preferred_falls_back_to_first() {
        let bridge = FakeBridge::online(&["Front", "Back"]);
        let window = FakeWindow::working();
        let d = Dispatcher::new(
            &bridge,
            &window,
            PaperWidth::Mm80,
            Some("Ghost".to_string()),
        );

        let outcome = d.dispatch(&sample_doc());
        assert_eq!(outcome.printer.as_deref(), Some("Front"));
    }

    #[test]
    fn test_no_bridge_uses_browser() {
        let bridge = FakeBridge::offline();
        let window = FakeWindow::working();
        let d = Dispatcher::new(&bridge, &window, PaperWidth::Mm80, None);

        let outcome = d.dispatch(&sample_doc());
        assert!(outcome.success);
        assert_eq!(outcome.method, DispatchMethod::Browser);
        assert!(outcome.artifact_path.is_some());
        // Informational, not an error
        assert!(outcome.message.contains("browser"));

        let opened = window.opened.borrow();
        assert_eq!(opened.len(), 1);
        assert!(opened[0].contains("window.print()"));
    }

    #[test]
    fn test_zero_printers_uses_browser() {
        let bridge = FakeBridge::online(&[]);
        let window = FakeWindow::working();
        let d = Dispatcher::new(&bridge, &window, PaperWidth::Mm80, None);

        let outcome = d.dispatch(&sample_doc());
        assert_eq!(outcome.method, DispatchMethod::Browser);
    }

    #[test]
    fn test_print_failure_falls_through_once() {
        let mut bridge = FakeBridge::online(&["Front"]);
        bridge.fail_print = true;
        let window = FakeWindow::working();
        let d = Dispatcher::new(&bridge, &window, PaperWidth::Mm80, None);

        let outcome = d.dispatch(&sample_doc());
        assert_eq!(outcome.method, DispatchMethod::Browser);
        // Single thermal attempt, no retry
        assert!(bridge.printed.borrow().is_empty());
    }

    #[test]
    fn test_total_failure_returns_none_with_message() {
        let bridge = FakeBridge::offline();
        let window = FakeWindow::blocked();
        let d = Dispatcher::new(&bridge, &window, PaperWidth::Mm80, None);

        let outcome = d.dispatch(&sample_doc());
        assert!(!outcome.success);
        assert_eq!(outcome.method, DispatchMethod::None);
        assert!(!outcome.message.is_empty());
        assert!(outcome.message.contains("popup blocked"));
    }

    #[test]
    fn test_dispatch_config_defaults() {
        let conn = rusqlite::Connection::open_in_memory().expect("open");
        crate::db::run_migrations_for_test(&conn);
        let db = DbState {
            conn: Mutex::new(conn),
            db_path: std::path::PathBuf::from(":memory:"),
        };

        let cfg = DispatchConfig::load(&db).expect("load");
        assert_eq!(cfg.paper, PaperWidth::Mm80);
        assert_eq!(cfg.bridge_url, HttpPrintBridge::DEFAULT_URL);
        assert!(cfg.preferred_printer.is_none());
    }

    #[test]
    fn test_dispatch_config_from_settings() {
        let conn = rusqlite::Connection::open_in_memory().expect("open");
        crate::db::run_migrations_for_test(&conn);
        db::set_setting(&conn, "printing", "paper_width_mm", "58").expect("set");
        db::set_setting(&conn, "printing", "bridge_url", "http://localhost:9100").expect("set");
        db::set_setting(&conn, "printing", "preferred_printer", "Front").expect("set");
        let db = DbState {
            conn: Mutex::new(conn),
            db_path: std::path::PathBuf::from(":memory:"),
        };

        let cfg = DispatchConfig::load(&db).expect("load");
        assert_eq!(cfg.paper, PaperWidth::Mm58);
        assert_eq!(cfg.bridge_url, "http://localhost:9100");
        assert_eq!(cfg.preferred_printer.as_deref(), Some("Front"));
    }
}
