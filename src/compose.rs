//! Receipt composition: transaction payload + template -> document IR.
//!
//! `compose` dispatches on the transaction variant to one builder per
//! document kind. Builders are pure functions; shared helpers assemble
//! the header, metadata pairs, item table, totals block, payments block,
//! and the toggle-gated footer so per-kind code stays small.

use crate::document::{
    money, qty, FooterContact, FooterPolicy, ItemRow, Pair, ReceiptDoc, Section, StatementRow,
    TotalLine,
};
use crate::template::Template;
use crate::transaction::{
    AccountPaymentInfo, CashDropInfo, CashUpInfo, ExchangeInfo, LaybyeInfo, LineItem, RefundInfo,
    SaleInfo, StatementInfo, TillSessionInfo, Transaction,
};

/// Compose a printable document from a resolved template and a payload.
/// Pure and deterministic: identical input yields identical output.
pub fn compose(template: &Template, tx: &Transaction) -> ReceiptDoc {
    let label = tx.kind().label().to_string();
    let sections = match tx {
        Transaction::Sale(s) => sale_doc(template, s, None),
        Transaction::Refund(r) => refund_doc(template, r),
        Transaction::LaybyePayment(l) => laybye_doc(template, l, None),
        Transaction::LaybyeReserve(l) => laybye_doc(
            template,
            l,
            Some("Goods reserved until final payment.".to_string()),
        ),
        Transaction::LaybyeFinal(l) => laybye_doc(
            template,
            l,
            Some("Laybye settled in full. Goods released.".to_string()),
        ),
        Transaction::LaybyeCancellation(l) => laybye_cancellation_doc(template, l),
        Transaction::CashUp(c) => cash_up_doc(template, c),
        Transaction::TillSession(t) => till_session_doc(template, t),
        Transaction::CashDrop(c) => cash_drop_doc(template, c),
        Transaction::AccountPayment(a) => account_payment_doc(template, a),
        Transaction::Delivery(d) => {
            let mut sections = sale_doc(template, &d.sale, None);
            let mut pairs = vec![Pair::new("Deliver to", d.delivery_address.clone())];
            if let Some(n) = opt(&d.delivery_notes) {
                pairs.push(Pair::new("Notes", n));
            }
            if let Some(drv) = opt(&d.driver) {
                pairs.push(Pair::new("Driver", drv));
            }
            // Delivery details go just before the footer
            let footer_at = sections.len() - 1;
            sections.insert(
                footer_at,
                Section::Titled {
                    title: "DELIVERY".to_string(),
                    pairs,
                },
            );
            sections
        }
        Transaction::Quotation(q) => {
            let mut extra = vec![Section::Message {
                text: "Quotation only. Not a tax invoice.".to_string(),
                emphasized: true,
            }];
            if let Some(v) = opt(&q.valid_until) {
                extra.push(Section::Message {
                    text: format!("Valid until {v}"),
                    emphasized: false,
                });
            }
            sale_doc_with_extras(template, &q.sale, extra)
        }
        Transaction::Order(s) => sale_doc(template, s, None),
        Transaction::Exchange(e) => exchange_doc(template, e),
        Transaction::CustomerStatement(st) => statement_doc(template, st),
        Transaction::IntermediateBill(s) => sale_doc_with_extras(
            template,
            s,
            vec![Section::Message {
                text: "NOT A RECEIPT - PAYMENT PENDING".to_string(),
                emphasized: true,
            }],
        ),
    };

    let mut doc = ReceiptDoc { label, sections };
    let label = doc.label.clone();
    if let Some(Section::Header { label: l, .. }) = doc.sections.first_mut() {
        *l = label;
    }
    doc
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn opt(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

// The receipt-type label is filled in by `compose` once the kind is known.
fn header(template: &Template) -> Section {
    Section::Header {
        business_name: template.business_name.clone(),
        address: opt(&template.address),
        phone: opt(&template.phone),
        logo_placeholder: true,
        label: String::new(),
    }
}

fn sale_meta(sale: &SaleInfo) -> Section {
    let mut pairs = vec![
        Pair::new("Receipt", sale.receipt_number.clone()),
        Pair::new("Date", sale.date.clone()),
        Pair::new("Time", sale.time.clone()),
    ];
    if let Some(c) = opt(&sale.cashier) {
        pairs.push(Pair::new("Cashier", c));
    }
    if let Some(c) = opt(&sale.customer) {
        pairs.push(Pair::new("Customer", c));
    }
    Section::Meta(pairs)
}

fn item_rows(items: &[LineItem]) -> Vec<ItemRow> {
    items
        .iter()
        .map(|i| ItemRow {
            name: i.name.clone(),
            qty: qty(i.quantity),
            unit: money(i.price),
            total: money(i.total),
        })
        .collect()
}

/// Totals block: zero-valued tax and discount lines are omitted.
fn totals(sale: &SaleInfo) -> Section {
    let mut lines = vec![TotalLine {
        label: "Subtotal".to_string(),
        amount: money(sale.subtotal),
        emphasize: false,
    }];
    if sale.discount != 0.0 {
        lines.push(TotalLine {
            label: "Discount".to_string(),
            amount: format!("-{}", money(sale.discount)),
            emphasize: false,
        });
    }
    if sale.tax != 0.0 {
        lines.push(TotalLine {
            label: "Tax".to_string(),
            amount: money(sale.tax),
            emphasize: false,
        });
    }
    lines.push(TotalLine {
        label: "TOTAL".to_string(),
        amount: money(sale.total),
        emphasize: true,
    });
    Section::Totals(lines)
}

/// Payments block. A split-payment list replaces the single method line
/// and appends an emphasized total-paid amount.
fn payments(sale: &SaleInfo) -> Option<Section> {
    let mut lines = Vec::new();
    let mut total_paid = None;

    if !sale.split_payments.is_empty() {
        let mut sum = 0.0;
        for p in &sale.split_payments {
            sum += p.amount;
            lines.push(Pair::new(p.method.clone(), money(p.amount)));
        }
        total_paid = Some(money(sum));
    } else if let Some(method) = opt(&sale.payment_method) {
        let amount = sale.amount_paid.unwrap_or(sale.total);
        lines.push(Pair::new(method, money(amount)));
    }

    if let Some(change) = sale.change {
        lines.push(Pair::new("Change", money(change)));
    }

    if lines.is_empty() {
        None
    } else {
        Some(Section::Payments { lines, total_paid })
    }
}

/// Shared footer. Each optional block is gated by its template toggle and
/// only present when the template carries content for it; the thank-you
/// line is unconditional.
fn footer(template: &Template, points_earned: Option<i64>) -> Section {
    let website = opt(&template.website);
    let social = opt(&template.social_handle);
    let contact = if template.show_qr_section && (website.is_some() || social.is_some()) {
        Some(FooterContact {
            qr_data: website.clone(),
            website,
            social_handle: social,
        })
    } else {
        None
    };

    let policy = if template.show_policy_section {
        opt(&template.return_policy).map(|primary| FooterPolicy {
            primary,
            secondary: opt(&template.return_policy_alt),
        })
    } else {
        None
    };

    let points = if template.show_points_section {
        points_earned.map(|p| format!("Points earned: {p}"))
    } else {
        None
    };

    let tagline = if template.show_tagline {
        opt(&template.tagline)
    } else {
        None
    };

    let thank_you = opt(&template.thank_you_message)
        .unwrap_or_else(|| "Thank you for your support!".to_string());

    Section::Footer {
        contact,
        policy,
        points,
        tagline,
        thank_you,
        footer_text: opt(&template.footer_text),
    }
}

// ---------------------------------------------------------------------------
// Per-kind builders
// ---------------------------------------------------------------------------

fn sale_doc(template: &Template, sale: &SaleInfo, note_override: Option<String>) -> Vec<Section> {
    let mut sections = vec![header(template), sale_meta(sale)];
    if !sale.items.is_empty() {
        sections.push(Section::Items(item_rows(&sale.items)));
    }
    sections.push(totals(sale));
    if let Some(p) = payments(sale) {
        sections.push(p);
    }
    let note = note_override.or_else(|| opt(&sale.notes));
    if let Some(n) = note {
        sections.push(Section::Message {
            text: n,
            emphasized: false,
        });
    }
    sections.push(footer(template, sale.points_earned));
    sections
}

fn sale_doc_with_extras(template: &Template, sale: &SaleInfo, extras: Vec<Section>) -> Vec<Section> {
    let mut sections = sale_doc(template, sale, None);
    let footer_at = sections.len() - 1;
    for (i, extra) in extras.into_iter().enumerate() {
        sections.insert(footer_at + i, extra);
    }
    sections
}

fn refund_doc(template: &Template, refund: &RefundInfo) -> Vec<Section> {
    let mut sections = vec![header(template)];

    let mut pairs = vec![
        Pair::new("Refund", refund.sale.receipt_number.clone()),
        Pair::new("Date", refund.sale.date.clone()),
        Pair::new("Time", refund.sale.time.clone()),
    ];
    if let Some(orig) = opt(&refund.original_receipt) {
        pairs.push(Pair::new("Original receipt", orig));
    }
    if let Some(c) = opt(&refund.sale.cashier) {
        pairs.push(Pair::new("Cashier", c));
    }
    if let Some(c) = opt(&refund.sale.customer) {
        pairs.push(Pair::new("Customer", c));
    }
    sections.push(Section::Meta(pairs));

    if !refund.sale.items.is_empty() {
        sections.push(Section::Items(item_rows(&refund.sale.items)));
    }
    sections.push(Section::Totals(vec![TotalLine {
        label: "REFUND TOTAL".to_string(),
        amount: money(refund.sale.total),
        emphasize: true,
    }]));
    if let Some(p) = payments(&refund.sale) {
        sections.push(p);
    }
    if let Some(reason) = opt(&refund.reason) {
        sections.push(Section::Message {
            text: format!("Reason: {reason}"),
            emphasized: false,
        });
    }
    sections.push(footer(template, None));
    sections
}

fn laybye_pairs(laybye: &LaybyeInfo) -> Vec<Pair> {
    let mut pairs = vec![
        Pair::new("Laybye no.", laybye.laybye_number.clone()),
        Pair::new("Deposit", money(laybye.deposit)),
        Pair::new("Paid to date", money(laybye.paid_to_date)),
        Pair::new("Balance remaining", money(laybye.balance_remaining)),
    ];
    if let Some(due) = opt(&laybye.due_date) {
        pairs.push(Pair::new("Due date", due));
    }
    pairs
}

fn laybye_doc(template: &Template, laybye: &LaybyeInfo, note: Option<String>) -> Vec<Section> {
    let mut sections = vec![header(template), sale_meta(&laybye.sale)];
    if !laybye.sale.items.is_empty() {
        sections.push(Section::Items(item_rows(&laybye.sale.items)));
    }
    sections.push(totals(&laybye.sale));
    if let Some(p) = payments(&laybye.sale) {
        sections.push(p);
    }
    sections.push(Section::Titled {
        title: "LAYBYE DETAILS".to_string(),
        pairs: laybye_pairs(laybye),
    });
    if let Some(n) = note.or_else(|| opt(&laybye.sale.notes)) {
        sections.push(Section::Message {
            text: n,
            emphasized: false,
        });
    }
    sections.push(footer(template, laybye.sale.points_earned));
    sections
}

fn laybye_cancellation_doc(template: &Template, laybye: &LaybyeInfo) -> Vec<Section> {
    let mut sections = vec![
        header(template),
        sale_meta(&laybye.sale),
        Section::Titled {
            title: "LAYBYE DETAILS".to_string(),
            pairs: laybye_pairs(laybye),
        },
        Section::Message {
            text: "LAYBYE CANCELLED".to_string(),
            emphasized: true,
        },
    ];
    if let Some(n) = opt(&laybye.sale.notes) {
        sections.push(Section::Message {
            text: n,
            emphasized: false,
        });
    }
    sections.push(footer(template, None));
    sections
}

fn cash_up_doc(template: &Template, c: &CashUpInfo) -> Vec<Section> {
    let mut meta = vec![
        Pair::new("Session", c.session_id.clone()),
        Pair::new("Date", c.date.clone()),
        Pair::new("Time", c.time.clone()),
    ];
    if let Some(cashier) = opt(&c.cashier) {
        meta.push(Pair::new("Cashier", cashier));
    }

    let mut sections = vec![
        header(template),
        Section::Meta(meta),
        Section::Titled {
            title: "TAKINGS".to_string(),
            pairs: vec![
                Pair::new("Opening float", money(c.opening_float)),
                Pair::new("Cash sales", money(c.cash_sales)),
                Pair::new("Card sales", money(c.card_sales)),
                Pair::new("Other sales", money(c.other_sales)),
            ],
        },
        Section::Titled {
            title: "MOVEMENTS".to_string(),
            pairs: vec![
                Pair::new("Cash drops", money(c.cash_drops)),
                Pair::new("Payouts", money(c.payouts)),
            ],
        },
        Section::Totals(vec![
            TotalLine {
                label: "Expected cash".to_string(),
                amount: money(c.expected_cash),
                emphasize: false,
            },
            TotalLine {
                label: "Counted cash".to_string(),
                amount: money(c.counted_cash),
                emphasize: false,
            },
            TotalLine {
                label: "VARIANCE".to_string(),
                amount: money(c.variance),
                emphasize: true,
            },
        ]),
    ];
    if let Some(n) = opt(&c.notes) {
        sections.push(Section::Message {
            text: n,
            emphasized: false,
        });
    }
    sections.push(footer(template, None));
    sections
}

fn till_session_doc(template: &Template, t: &TillSessionInfo) -> Vec<Section> {
    let mut meta = vec![
        Pair::new("Session", t.session_id.clone()),
        Pair::new("Opened", t.opened_at.clone()),
    ];
    if let Some(closed) = opt(&t.closed_at) {
        meta.push(Pair::new("Closed", closed));
    }
    if let Some(cashier) = opt(&t.cashier) {
        meta.push(Pair::new("Cashier", cashier));
    }

    let mut sections = vec![
        header(template),
        Section::Meta(meta),
        Section::Titled {
            title: "SESSION".to_string(),
            pairs: vec![
                Pair::new("Opening float", money(t.opening_float)),
                Pair::new("Total sales", money(t.total_sales)),
                Pair::new("Transactions", t.transaction_count.to_string()),
            ],
        },
    ];
    if let Some(n) = opt(&t.notes) {
        sections.push(Section::Message {
            text: n,
            emphasized: false,
        });
    }
    sections.push(footer(template, None));
    sections
}

fn cash_drop_doc(template: &Template, c: &CashDropInfo) -> Vec<Section> {
    let mut meta = vec![
        Pair::new("Drop no.", c.drop_number.clone()),
        Pair::new("Date", c.date.clone()),
        Pair::new("Time", c.time.clone()),
    ];
    if let Some(cashier) = opt(&c.cashier) {
        meta.push(Pair::new("Cashier", cashier));
    }

    let mut sections = vec![
        header(template),
        Section::Meta(meta),
        Section::Totals(vec![TotalLine {
            label: "AMOUNT DROPPED".to_string(),
            amount: money(c.amount),
            emphasize: true,
        }]),
    ];
    if let Some(r) = opt(&c.reason) {
        sections.push(Section::Message {
            text: format!("Reason: {r}"),
            emphasized: false,
        });
    }
    sections.push(footer(template, None));
    sections
}

fn account_payment_doc(template: &Template, a: &AccountPaymentInfo) -> Vec<Section> {
    let mut meta = vec![
        Pair::new("Receipt", a.receipt_number.clone()),
        Pair::new("Date", a.date.clone()),
        Pair::new("Time", a.time.clone()),
    ];
    if let Some(cashier) = opt(&a.cashier) {
        meta.push(Pair::new("Cashier", cashier));
    }
    meta.push(Pair::new("Customer", a.customer.clone()));
    if let Some(acc) = opt(&a.account_number) {
        meta.push(Pair::new("Account", acc));
    }

    let mut payment_lines = Vec::new();
    if let Some(method) = opt(&a.payment_method) {
        payment_lines.push(Pair::new(method, money(a.amount)));
    }

    let mut sections = vec![header(template), Section::Meta(meta)];
    sections.push(Section::Totals(vec![TotalLine {
        label: "PAYMENT".to_string(),
        amount: money(a.amount),
        emphasize: true,
    }]));
    if !payment_lines.is_empty() {
        sections.push(Section::Payments {
            lines: payment_lines,
            total_paid: None,
        });
    }
    sections.push(Section::Titled {
        title: "ACCOUNT BALANCE".to_string(),
        pairs: vec![
            Pair::new("Balance before", money(a.balance_before)),
            Pair::new("Balance after", money(a.balance_after)),
        ],
    });
    sections.push(footer(template, None));
    sections
}

fn exchange_doc(template: &Template, e: &ExchangeInfo) -> Vec<Section> {
    let mut meta = vec![
        Pair::new("Receipt", e.receipt_number.clone()),
        Pair::new("Date", e.date.clone()),
        Pair::new("Time", e.time.clone()),
    ];
    if let Some(orig) = opt(&e.original_receipt) {
        meta.push(Pair::new("Original receipt", orig));
    }
    if let Some(cashier) = opt(&e.cashier) {
        meta.push(Pair::new("Cashier", cashier));
    }
    if let Some(customer) = opt(&e.customer) {
        meta.push(Pair::new("Customer", customer));
    }

    let mut sections = vec![header(template), Section::Meta(meta)];

    if !e.returned_items.is_empty() {
        sections.push(Section::Message {
            text: "RETURNED ITEMS".to_string(),
            emphasized: true,
        });
        sections.push(Section::Items(item_rows(&e.returned_items)));
    }
    if !e.issued_items.is_empty() {
        sections.push(Section::Message {
            text: "ISSUED ITEMS".to_string(),
            emphasized: true,
        });
        sections.push(Section::Items(item_rows(&e.issued_items)));
    }

    sections.push(Section::Totals(vec![
        TotalLine {
            label: "Returned value".to_string(),
            amount: money(e.returned_total),
            emphasize: false,
        },
        TotalLine {
            label: "Issued value".to_string(),
            amount: money(e.issued_total),
            emphasize: false,
        },
        TotalLine {
            label: "DIFFERENCE DUE".to_string(),
            amount: money(e.difference_due),
            emphasize: true,
        },
    ]));

    if let Some(method) = opt(&e.payment_method) {
        sections.push(Section::Payments {
            lines: vec![Pair::new(method, money(e.difference_due.abs()))],
            total_paid: None,
        });
    }

    sections.push(footer(template, None));
    sections
}

fn statement_doc(template: &Template, st: &StatementInfo) -> Vec<Section> {
    let mut meta = vec![Pair::new("Customer", st.customer.clone())];
    if let Some(acc) = opt(&st.account_number) {
        meta.push(Pair::new("Account", acc));
    }
    meta.push(Pair::new(
        "Period",
        format!("{} to {}", st.period_start, st.period_end),
    ));

    let rows = st
        .entries
        .iter()
        .map(|e| StatementRow {
            date: e.date.clone(),
            description: e.description.clone(),
            debit: money(e.debit),
            credit: money(e.credit),
            balance: money(e.balance),
        })
        .collect();

    vec![
        header(template),
        Section::Meta(meta),
        Section::Statement(rows),
        Section::Totals(vec![TotalLine {
            label: "CLOSING BALANCE".to_string(),
            amount: money(st.closing_balance),
            emphasize: true,
        }]),
        footer(template, None),
    ]
}

// ===========================================================================
// Tests
// ===========================================================================
