//! Receipt document intermediate representation.
//!
//! Composition produces a `ReceiptDoc`, a flat list of typed sections.
//! The two renderers (ESC/POS bytes for thermal, HTML for the browser
//! fallback) both consume this IR, so layout decisions live in exactly
//! one place per output channel.

use serde::{Deserialize, Serialize};

/// A composed receipt, ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptDoc {
    /// Uppercase document heading, e.g. "SALE RECEIPT".
    pub label: String,
    pub sections: Vec<Section>,
}

/// A label/value pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pair {
    pub label: String,
    pub value: String,
}

impl Pair {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A structured item row: name, quantity, unit price, line total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRow {
    pub name: String,
    pub qty: String,
    pub unit: String,
    pub total: String,
}

/// A totals-block line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalLine {
    pub label: String,
    pub amount: String,
    pub emphasize: bool,
}

/// A customer-statement movement row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementRow {
    pub date: String,
    pub description: String,
    pub debit: String,
    pub credit: String,
    pub balance: String,
}

/// One renderable section of a receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Section {
    /// Business identity block at the top of every document.
    Header {
        business_name: String,
        address: Option<String>,
        phone: Option<String>,
        logo_placeholder: bool,
        label: String,
    },
    /// Document metadata pairs (receipt number, date, cashier, ...).
    Meta(Vec<Pair>),
    /// The item table.
    Items(Vec<ItemRow>),
    /// Subtotal/tax/discount/total block.
    Totals(Vec<TotalLine>),
    /// Payment lines; `total_paid` is set for split payments.
    Payments {
        lines: Vec<Pair>,
        total_paid: Option<String>,
    },
    /// A captioned pair block (balances, cash-up counts, laybye schedule).
    Titled { title: String, pairs: Vec<Pair> },
    /// Customer-statement rows.
    Statement(Vec<StatementRow>),
    /// A free-standing message line.
    Message { text: String, emphasized: bool },
    /// Footer: each optional block is gated by a template toggle; the
    /// thank-you line is always present.
    Footer {
        contact: Option<FooterContact>,
        policy: Option<FooterPolicy>,
        points: Option<String>,
        tagline: Option<String>,
        thank_you: String,
        footer_text: Option<String>,
    },
}

/// QR/contact footer block (website + social handle).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FooterContact {
    pub website: Option<String>,
    pub social_handle: Option<String>,
    /// QR payload; the thermal renderer prints it natively, HTML links it.
    pub qr_data: Option<String>,
}

/// Bilingual return-policy footer block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FooterPolicy {
    pub primary: String,
    pub secondary: Option<String>,
}

/// Format a currency amount with exactly two decimals.
pub fn money(v: f64) -> String {
    format!("{v:.2}")
}

/// Format a quantity: integers without decimals, fractional with two.
pub fn qty(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_two_decimals() {
        assert_eq!(money(0.0), "0.00");
        assert_eq!(money(5.0), "5.00");
        assert_eq!(money(1234.5), "1234.50");
        assert_eq!(money(0.125), "0.13");
        assert_eq!(money(-3.1), "-3.10");
    }

    #[test]
    fn test_qty_formatting() {
        assert_eq!(qty(1.0), "1");
        assert_eq!(qty(12.0), "12");
        assert_eq!(qty(0.5), "0.50");
        assert_eq!(qty(2.25), "2.25");
    }

    #[test]
    fn test_section_serde_tagging() {
        let s = Section::Message {
            text: "VOID".into(),
            emphasized: true,
        };
        let json = serde_json::to_value(&s).expect("serialize");
        assert_eq!(json["type"], "message");
        assert_eq!(json["text"], "VOID");
    }
}
