//! ESC/POS renderer: receipt document IR -> thermal printer bytes.
//!
//! Fixed-width layout tuned for 80 mm paper (48 columns): item names are
//! truncated/padded to 20 characters with right-aligned numeric columns.
//! On 58 mm paper (32 columns) items fall back to a two-line style.

use serde::{Deserialize, Serialize};

use crate::document::{ItemRow, ReceiptDoc, Section, StatementRow};
use crate::escpos::{EscPosBuilder, PaperWidth};

/// Non-fatal issue noticed while rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderWarning {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct EscPosRender {
    pub bytes: Vec<u8>,
    pub warnings: Vec<RenderWarning>,
}

const ITEM_NAME_WIDTH: usize = 20;

/// Render a composed document to ESC/POS bytes.
pub fn render(doc: &ReceiptDoc, paper: PaperWidth) -> EscPosRender {
    let width = paper.chars();
    let mut warnings = Vec::new();
    let mut builder = EscPosBuilder::new().with_paper(paper);
    builder.init().latin_mode();

    for section in &doc.sections {
        match section {
            Section::Header {
                business_name,
                address,
                phone,
                logo_placeholder: _,
                label,
            } => {
                builder.center();
                if width > 32 {
                    builder
                        .bold(true)
                        .double_height()
                        .text(business_name)
                        .lf()
                        .normal_size()
                        .bold(false);
                } else {
                    builder.bold(true).text(business_name).lf().bold(false);
                }
                if let Some(address) = address {
                    emit_wrapped(&mut builder, address, width);
                }
                if let Some(phone) = phone {
                    builder.text(phone).lf();
                }
                if !label.is_empty() {
                    builder.bold(true).text(label).lf().bold(false);
                }
                builder.left().separator();
            }
            Section::Meta(pairs) => {
                for pair in pairs {
                    emit_pair(&mut builder, &pair.label, &pair.value, width);
                }
            }
            Section::Items(rows) => {
                emit_section_header(&mut builder, "ITEMS", width);
                if rows.is_empty() {
                    builder.text("No items").lf();
                }
                for row in rows {
                    emit_item_row(&mut builder, row, width, &mut warnings);
                }
            }
            Section::Totals(lines) => {
                builder.separator();
                for line in lines {
                    if line.emphasize {
                        if width > 32 {
                            builder.bold(true).double_height();
                            emit_pair(&mut builder, &line.label, &line.amount, width);
                            builder.normal_size().bold(false);
                            continue;
                        }
                        builder.bold(true);
                    }
                    emit_pair(&mut builder, &line.label, &line.amount, width);
                    if line.emphasize {
                        builder.bold(false);
                    }
                }
            }
            Section::Payments { lines, total_paid } => {
                emit_section_header(&mut builder, "PAYMENT", width);
                for pair in lines {
                    emit_pair(&mut builder, &pair.label, &pair.value, width);
                }
                if let Some(total) = total_paid {
                    builder.bold(true);
                    emit_pair(&mut builder, "TOTAL PAID", total, width);
                    builder.bold(false);
                }
            }
            Section::Titled { title, pairs } => {
                emit_section_header(&mut builder, title, width);
                for pair in pairs {
                    emit_pair(&mut builder, &pair.label, &pair.value, width);
                }
            }
            Section::Statement(rows) => {
                emit_section_header(&mut builder, "MOVEMENTS", width);
                for row in rows {
                    emit_statement_row(&mut builder, row, width);
                }
            }
            Section::Message { text, emphasized } => {
                if *emphasized {
                    builder.center().bold(true);
                    emit_wrapped(&mut builder, text, width);
                    builder.bold(false).left();
                } else {
                    emit_wrapped(&mut builder, text, width);
                }
            }
            Section::Footer {
                contact,
                policy,
                points,
                tagline,
                thank_you,
                footer_text,
            } => {
                builder.separator();
                if let Some(contact) = contact {
                    builder.center();
                    if let Some(qr) = &contact.qr_data {
                        builder.qr(qr).lf();
                    }
                    if let Some(website) = &contact.website {
                        builder.text(website).lf();
                    }
                    if let Some(social) = &contact.social_handle {
                        builder.text(social).lf();
                    }
                    builder.left();
                }
                if let Some(policy) = policy {
                    emit_wrapped(&mut builder, &policy.primary, width);
                    if let Some(secondary) = &policy.secondary {
                        emit_wrapped(&mut builder, secondary, width);
                    }
                }
                if let Some(points) = points {
                    builder.text(points).lf();
                }
                builder.center();
                if let Some(tagline) = tagline {
                    builder.text(tagline).lf();
                }
                builder.bold(true).text(thank_you).lf().bold(false);
                if let Some(footer_text) = footer_text {
                    emit_wrapped(&mut builder, footer_text, width);
                }
                builder.left();
            }
        }
    }

    builder.feed(4).cut();

    EscPosRender {
        bytes: builder.build(),
        warnings,
    }
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut line = String::new();
    for token in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(token);
            continue;
        }
        let next_len = line.chars().count() + 1 + token.chars().count();
        if next_len > width.max(8) {
            out.push(line);
            line = token.to_string();
        } else {
            line.push(' ');
            line.push_str(token);
        }
    }
    if !line.is_empty() {
        out.push(line);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn emit_wrapped(builder: &mut EscPosBuilder, text: &str, width: usize) {
    for line in wrap(text, width) {
        builder.text(&line).lf();
    }
}

fn emit_pair(builder: &mut EscPosBuilder, label: &str, value: &str, width: usize) {
    let label_len = label.chars().count();
    let value_len = value.chars().count();
    if label_len + value_len < width {
        builder.line_pair(label, value);
        return;
    }
    for line in wrap(label, width.saturating_sub(value_len + 1).max(8)) {
        builder.text(&line).lf();
    }
    builder.right().text(value).lf().left();
}

fn emit_section_header(builder: &mut EscPosBuilder, title: &str, width: usize) {
    builder.separator();
    if width > 32 {
        builder
            .bold(true)
            .double_height()
            .text(title)
            .lf()
            .normal_size()
            .bold(false);
    } else {
        builder.bold(true).text(title).lf().bold(false);
    }
}

fn pad_left(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        text.to_string()
    } else {
        format!("{}{}", " ".repeat(width - len), text)
    }
}

fn pad_right(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        text.to_string()
    } else {
        format!("{}{}", text, " ".repeat(width - len))
    }
}

fn truncate(text: &str, width: usize) -> (String, bool) {
    if text.chars().count() <= width {
        return (text.to_string(), false);
    }
    (text.chars().take(width).collect(), true)
}

/// Item row layout. At 48 columns: name(20) qty(3) unit(10) total(12) with
/// single-space gutters. Narrow paper gets the name on its own line.
fn emit_item_row(
    builder: &mut EscPosBuilder,
    row: &ItemRow,
    width: usize,
    warnings: &mut Vec<RenderWarning>,
) {
    if width > 32 {
        let (name, truncated) = truncate(&row.name, ITEM_NAME_WIDTH);
        if truncated {
            warnings.push(RenderWarning {
                code: "item_name_truncated".to_string(),
                message: format!("Item name truncated to {ITEM_NAME_WIDTH} chars: {}", row.name),
            });
        }
        let line = format!(
            "{} {} {} {}",
            pad_right(&name, ITEM_NAME_WIDTH),
            pad_left(&row.qty, 3),
            pad_left(&row.unit, 10),
            pad_left(&row.total, 12),
        );
        builder.text(&line).lf();
    } else {
        emit_wrapped(builder, &row.name, width);
        emit_pair(
            builder,
            &format!("  {} x {}", row.qty, row.unit),
            &row.total,
            width,
        );
    }
}

fn emit_statement_row(builder: &mut EscPosBuilder, row: &StatementRow, width: usize) {
    emit_wrapped(builder, &format!("{} {}", row.date, row.description), width);
    if row.debit != "0.00" {
        emit_pair(builder, "  Debit", &row.debit, width);
    }
    if row.credit != "0.00" {
        emit_pair(builder, "  Credit", &row.credit, width);
    }
    emit_pair(builder, "  Balance", &row.balance, width);
}

// ===========================================================================
// Tests
// ===========================================================================
