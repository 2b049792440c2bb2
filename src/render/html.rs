//! HTML renderer: receipt document IR -> browser-fallback artifact.
//!
//! Mirrors the thermal layout section for section so the two channels
//! stay in sync. The artifact auto-invokes the print dialog and closes
//! itself once printing finishes.

use crate::document::{ReceiptDoc, Section};

fn esc(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn html_shell(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8"/>
<meta name="viewport" content="width=device-width, initial-scale=1.0"/>
<title>{}</title>
<style>
body {{ font-family: ui-monospace, SFMono-Regular, Menlo, monospace; margin: 0 auto; padding: 12px; max-width: 320px; background: #fff; color: #111; }}
.line {{ display: flex; justify-content: space-between; gap: 8px; font-size: 10px; }}
.line strong {{ font-size: 11px; }}
.section {{ margin-top: 8px; border-top: 1px dashed #111; padding-top: 6px; }}
.section h3 {{ margin: 0 0 4px 0; font-size: 11px; text-transform: uppercase; }}
table {{ width: 100%; border-collapse: collapse; font-size: 10px; }}
th, td {{ text-align: right; padding: 1px 2px; }}
th:first-child, td:first-child {{ text-align: left; }}
.note {{ color: #666; font-size: 9px; }}
.center {{ text-align: center; }}
.logo {{ height: 40px; line-height: 40px; border: 1px dashed #bbb; color: #bbb; font-size: 9px; margin-bottom: 6px; }}
</style>
</head>
<body>{}
<script>
window.onload = function () {{
  window.print();
  window.onafterprint = function () {{ window.close(); }};
}};
</script>
</body>
</html>"#,
        esc(title),
        body
    )
}

fn push_pair(body: &mut String, label: &str, value: &str) {
    body.push_str(&format!(
        "<div class=\"line\"><span>{}</span><span>{}</span></div>",
        esc(label),
        esc(value)
    ));
}

fn push_pair_strong(body: &mut String, label: &str, value: &str) {
    body.push_str(&format!(
        "<div class=\"line\"><strong>{}</strong><strong>{}</strong></div>",
        esc(label),
        esc(value)
    ));
}

/// Render a composed document to a standalone HTML page.
pub fn render(doc: &ReceiptDoc) -> String {
    let mut body = String::new();

    for section in &doc.sections {
        match section {
            Section::Header {
                business_name,
                address,
                phone,
                logo_placeholder,
                label,
            } => {
                if *logo_placeholder {
                    body.push_str("<div class=\"center logo\">LOGO</div>");
                }
                body.push_str(&format!(
                    "<div class=\"center\"><strong>{}</strong></div>",
                    esc(business_name)
                ));
                if let Some(address) = address {
                    body.push_str(&format!(
                        "<div class=\"center note\">{}</div>",
                        esc(address)
                    ));
                }
                if let Some(phone) = phone {
                    body.push_str(&format!("<div class=\"center note\">{}</div>", esc(phone)));
                }
                if !label.is_empty() {
                    body.push_str(&format!(
                        "<div class=\"center\"><strong>{}</strong></div>",
                        esc(label)
                    ));
                }
            }
            Section::Meta(pairs) => {
                body.push_str("<div class=\"section\">");
                for pair in pairs {
                    push_pair(&mut body, &pair.label, &pair.value);
                }
                body.push_str("</div>");
            }
            Section::Items(rows) => {
                body.push_str("<div class=\"section\"><h3>Items</h3><table>");
                body.push_str("<tr><th>Item</th><th>Qty</th><th>Price</th><th>Total</th></tr>");
                for row in rows {
                    body.push_str(&format!(
                        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                        esc(&row.name),
                        esc(&row.qty),
                        esc(&row.unit),
                        esc(&row.total)
                    ));
                }
                body.push_str("</table></div>");
            }
            Section::Totals(lines) => {
                body.push_str("<div class=\"section\">");
                for line in lines {
                    if line.emphasize {
                        push_pair_strong(&mut body, &line.label, &line.amount);
                    } else {
                        push_pair(&mut body, &line.label, &line.amount);
                    }
                }
                body.push_str("</div>");
            }
            Section::Payments { lines, total_paid } => {
                body.push_str("<div class=\"section\"><h3>Payment</h3>");
                for pair in lines {
                    push_pair(&mut body, &pair.label, &pair.value);
                }
                if let Some(total) = total_paid {
                    push_pair_strong(&mut body, "TOTAL PAID", total);
                }
                body.push_str("</div>");
            }
            Section::Titled { title, pairs } => {
                body.push_str(&format!(
                    "<div class=\"section\"><h3>{}</h3>",
                    esc(title)
                ));
                for pair in pairs {
                    push_pair(&mut body, &pair.label, &pair.value);
                }
                body.push_str("</div>");
            }
            Section::Statement(rows) => {
                body.push_str("<div class=\"section\"><h3>Movements</h3><table>");
                body.push_str(
                    "<tr><th>Date</th><th>Description</th><th>Dr</th><th>Cr</th><th>Balance</th></tr>",
                );
                for row in rows {
                    body.push_str(&format!(
                        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                        esc(&row.date),
                        esc(&row.description),
                        esc(&row.debit),
                        esc(&row.credit),
                        esc(&row.balance)
                    ));
                }
                body.push_str("</table></div>");
            }
            Section::Message { text, emphasized } => {
                if *emphasized {
                    body.push_str(&format!(
                        "<div class=\"center\"><strong>{}</strong></div>",
                        esc(text)
                    ));
                } else {
                    body.push_str(&format!("<div class=\"note\">{}</div>", esc(text)));
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
                body.push_str("<div class=\"section center\">");
                if let Some(contact) = contact {
                    if let Some(qr) = &contact.qr_data {
                        body.push_str(&format!(
                            "<div class=\"note\">Scan: {}</div>",
                            esc(qr)
                        ));
                    }
                    if let Some(website) = &contact.website {
                        body.push_str(&format!("<div>{}</div>", esc(website)));
                    }
                    if let Some(social) = &contact.social_handle {
                        body.push_str(&format!("<div>{}</div>", esc(social)));
                    }
                }
                if let Some(policy) = policy {
                    body.push_str(&format!(
                        "<div class=\"note\">{}</div>",
                        esc(&policy.primary)
                    ));
                    if let Some(secondary) = &policy.secondary {
                        body.push_str(&format!("<div class=\"note\">{}</div>", esc(secondary)));
                    }
                }
                if let Some(points) = points {
                    body.push_str(&format!("<div>{}</div>", esc(points)));
                }
                if let Some(tagline) = tagline {
                    body.push_str(&format!("<div>{}</div>", esc(tagline)));
                }
                body.push_str(&format!("<div><strong>{}</strong></div>", esc(thank_you)));
                if let Some(footer_text) = footer_text {
                    body.push_str(&format!("<div class=\"note\">{}</div>", esc(footer_text)));
                }
                body.push_str("</div>");
            }
        }
    }

    html_shell(&doc.label, &body)
}

// ===========================================================================
// Tests
// ===========================================================================
