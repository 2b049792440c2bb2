//! Transaction payload types accepted by the receipt composer.
//!
//! `Transaction` is a closed, data-carrying enum: one variant per printable
//! document kind. Payloads are transient inputs to composition and are never
//! persisted.

use serde::{Deserialize, Serialize};

/// The closed set of printable document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Sale,
    Refund,
    LaybyePayment,
    LaybyeReserve,
    LaybyeFinal,
    LaybyeCancellation,
    CashUp,
    TillSession,
    CashDrop,
    AccountPayment,
    Delivery,
    Quotation,
    Order,
    Exchange,
    CustomerStatement,
    IntermediateBill,
}

impl TransactionKind {
    /// Snake_case identifier, also the stored template name for this kind.
    pub fn template_name(self) -> &'static str {
        match self {
            TransactionKind::Sale => "sale",
            TransactionKind::Refund => "refund",
            TransactionKind::LaybyePayment => "laybye_payment",
            TransactionKind::LaybyeReserve => "laybye_reserve",
            TransactionKind::LaybyeFinal => "laybye_final",
            TransactionKind::LaybyeCancellation => "laybye_cancellation",
            TransactionKind::CashUp => "cash_up",
            TransactionKind::TillSession => "till_session",
            TransactionKind::CashDrop => "cash_drop",
            TransactionKind::AccountPayment => "account_payment",
            TransactionKind::Delivery => "delivery",
            TransactionKind::Quotation => "quotation",
            TransactionKind::Order => "order",
            TransactionKind::Exchange => "exchange",
            TransactionKind::CustomerStatement => "customer_statement",
            TransactionKind::IntermediateBill => "intermediate_bill",
        }
    }

    /// Uppercase heading printed under the business name.
    pub fn label(self) -> &'static str {
        match self {
            TransactionKind::Sale => "SALE RECEIPT",
            TransactionKind::Refund => "REFUND RECEIPT",
            TransactionKind::LaybyePayment => "LAYBYE PAYMENT",
            TransactionKind::LaybyeReserve => "LAYBYE RESERVATION",
            TransactionKind::LaybyeFinal => "LAYBYE FINAL PAYMENT",
            TransactionKind::LaybyeCancellation => "LAYBYE CANCELLATION",
            TransactionKind::CashUp => "CASH-UP REPORT",
            TransactionKind::TillSession => "TILL SESSION REPORT",
            TransactionKind::CashDrop => "CASH DROP",
            TransactionKind::AccountPayment => "ACCOUNT PAYMENT",
            TransactionKind::Delivery => "DELIVERY NOTE",
            TransactionKind::Quotation => "QUOTATION",
            TransactionKind::Order => "ORDER",
            TransactionKind::Exchange => "RETURNS & EXCHANGE",
            TransactionKind::CustomerStatement => "CUSTOMER STATEMENT",
            TransactionKind::IntermediateBill => "INTERMEDIATE BILL",
        }
    }
}

/// A single line item on a sale-style document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LineItem {
    pub name: String,
    pub quantity: f64,
    pub price: f64,
    pub total: f64,
}

/// One leg of a split payment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PaymentSplit {
    pub method: String,
    pub amount: f64,
}

/// Core sale payload, shared by several document kinds.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SaleInfo {
    pub receipt_number: String,
    pub date: String,
    pub time: String,
    pub cashier: Option<String>,
    pub customer: Option<String>,
    pub items: Vec<LineItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
    pub payment_method: Option<String>,
    pub split_payments: Vec<PaymentSplit>,
    pub amount_paid: Option<f64>,
    pub change: Option<f64>,
    pub notes: Option<String>,
    pub points_earned: Option<i64>,
}

/// Laybye documents wrap a sale core with schedule fields.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LaybyeInfo {
    pub sale: SaleInfo,
    pub laybye_number: String,
    pub deposit: f64,
    pub paid_to_date: f64,
    pub balance_remaining: f64,
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RefundInfo {
    pub sale: SaleInfo,
    pub original_receipt: Option<String>,
    pub reason: Option<String>,
}

/// End-of-day reconciliation report.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CashUpInfo {
    pub session_id: String,
    pub date: String,
    pub time: String,
    pub cashier: Option<String>,
    pub opening_float: f64,
    pub cash_sales: f64,
    pub card_sales: f64,
    pub other_sales: f64,
    pub cash_drops: f64,
    pub payouts: f64,
    pub expected_cash: f64,
    pub counted_cash: f64,
    pub variance: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TillSessionInfo {
    pub session_id: String,
    pub opened_at: String,
    pub closed_at: Option<String>,
    pub cashier: Option<String>,
    pub opening_float: f64,
    pub total_sales: f64,
    pub transaction_count: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CashDropInfo {
    pub drop_number: String,
    pub date: String,
    pub time: String,
    pub cashier: Option<String>,
    pub amount: f64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccountPaymentInfo {
    pub receipt_number: String,
    pub date: String,
    pub time: String,
    pub cashier: Option<String>,
    pub customer: String,
    pub account_number: Option<String>,
    pub amount: f64,
    pub payment_method: Option<String>,
    pub balance_before: f64,
    pub balance_after: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeliveryInfo {
    pub sale: SaleInfo,
    pub delivery_address: String,
    pub delivery_notes: Option<String>,
    pub driver: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QuotationInfo {
    pub sale: SaleInfo,
    pub valid_until: Option<String>,
}

/// Returns-and-exchange document: returned goods against newly issued ones.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExchangeInfo {
    pub receipt_number: String,
    pub date: String,
    pub time: String,
    pub cashier: Option<String>,
    pub customer: Option<String>,
    pub original_receipt: Option<String>,
    pub returned_items: Vec<LineItem>,
    pub issued_items: Vec<LineItem>,
    pub returned_total: f64,
    pub issued_total: f64,
    /// Positive when the customer owes, negative when refunded.
    pub difference_due: f64,
    pub payment_method: Option<String>,
}

/// One movement row on a customer statement.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StatementEntry {
    pub date: String,
    pub description: String,
    pub debit: f64,
    pub credit: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StatementInfo {
    pub customer: String,
    pub account_number: Option<String>,
    pub period_start: String,
    pub period_end: String,
    pub entries: Vec<StatementEntry>,
    pub closing_balance: f64,
}

/// A printable transaction, one variant per document kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Transaction {
    Sale(SaleInfo),
    Refund(RefundInfo),
    LaybyePayment(LaybyeInfo),
    LaybyeReserve(LaybyeInfo),
    LaybyeFinal(LaybyeInfo),
    LaybyeCancellation(LaybyeInfo),
    CashUp(CashUpInfo),
    TillSession(TillSessionInfo),
    CashDrop(CashDropInfo),
    AccountPayment(AccountPaymentInfo),
    Delivery(DeliveryInfo),
    Quotation(QuotationInfo),
    Order(SaleInfo),
    Exchange(ExchangeInfo),
    CustomerStatement(StatementInfo),
    IntermediateBill(SaleInfo),
}

impl Transaction {
    pub fn kind(&self) -> TransactionKind {
        match self {
            Transaction::Sale(_) => TransactionKind::Sale,
            Transaction::Refund(_) => TransactionKind::Refund,
            Transaction::LaybyePayment(_) => TransactionKind::LaybyePayment,
            Transaction::LaybyeReserve(_) => TransactionKind::LaybyeReserve,
            Transaction::LaybyeFinal(_) => TransactionKind::LaybyeFinal,
            Transaction::LaybyeCancellation(_) => TransactionKind::LaybyeCancellation,
            Transaction::CashUp(_) => TransactionKind::CashUp,
            Transaction::TillSession(_) => TransactionKind::TillSession,
            Transaction::CashDrop(_) => TransactionKind::CashDrop,
            Transaction::AccountPayment(_) => TransactionKind::AccountPayment,
            Transaction::Delivery(_) => TransactionKind::Delivery,
            Transaction::Quotation(_) => TransactionKind::Quotation,
            Transaction::Order(_) => TransactionKind::Order,
            Transaction::Exchange(_) => TransactionKind::Exchange,
            Transaction::CustomerStatement(_) => TransactionKind::CustomerStatement,
            Transaction::IntermediateBill(_) => TransactionKind::IntermediateBill,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_names_are_unique() {
        let kinds = [
            TransactionKind::Sale,
            TransactionKind::Refund,
            TransactionKind::LaybyePayment,
            TransactionKind::LaybyeReserve,
            TransactionKind::LaybyeFinal,
            TransactionKind::LaybyeCancellation,
            TransactionKind::CashUp,
            TransactionKind::TillSession,
            TransactionKind::CashDrop,
            TransactionKind::AccountPayment,
            TransactionKind::Delivery,
            TransactionKind::Quotation,
            TransactionKind::Order,
            TransactionKind::Exchange,
            TransactionKind::CustomerStatement,
            TransactionKind::IntermediateBill,
        ];
        let mut names: Vec<&str> = kinds.iter().map(|k| k.template_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), kinds.len());
    }

    #[test]
    fn test_transaction_kind_roundtrip() {
        let tx = Transaction::Sale(SaleInfo {
            receipt_number: "R-1001".into(),
            ..Default::default()
        });
        assert_eq!(tx.kind(), TransactionKind::Sale);
        assert_eq!(tx.kind().template_name(), "sale");
    }

    #[test]
    fn test_serde_tagging() {
        let tx = Transaction::CashDrop(CashDropInfo {
            drop_number: "D-7".into(),
            date: "2026-08-25".into(),
            time: "14:30".into(),
            amount: 500.0,
            ..Default::default()
        });
        let json = serde_json::to_value(&tx).expect("serialize");
        assert_eq!(json["type"], "cash_drop");
        assert_eq!(json["data"]["drop_number"], "D-7");

        let back: Transaction = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back.kind(), TransactionKind::CashDrop);
    }
}
