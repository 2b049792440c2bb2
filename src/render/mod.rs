//! Dual renderers over the receipt document IR.
//!
//! `escpos` produces the binary thermal payload; `html` produces the
//! browser-fallback artifact. Both walk the same `ReceiptDoc` sections
//! so the two channels cannot drift apart.

pub mod escpos;
pub mod html;
