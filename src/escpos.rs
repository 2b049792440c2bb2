//! Minimal ESC/POS binary command builder for thermal receipt printers.
//!
//! Generates raw byte sequences that the dispatcher hands to the local
//! printer bridge. Supports text formatting, alignment, Western-European
//! character encoding (CP850) for the bilingual policy block, QR codes,
//! and paper cutting.

// ESC/POS command bytes
const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;
const LF: u8 = 0x0A;

/// Paper width in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperWidth {
    Mm58,
    Mm80,
}

impl PaperWidth {
    pub fn chars(self) -> usize {
        match self {
            PaperWidth::Mm58 => 32,
            PaperWidth::Mm80 => 48,
        }
    }

    pub fn from_mm(mm: i32) -> Self {
        if mm <= 58 {
            PaperWidth::Mm58
        } else {
            PaperWidth::Mm80
        }
    }
}

/// Builder for generating ESC/POS binary command buffers.
///
/// ```rust,ignore
/// let mut b = EscPosBuilder::new();
/// b.init()
///     .center()
///     .bold(true).text("RECEIPT\n").bold(false)
///     .left()
///     .line_pair("Item", "5.00")
///     .feed(3)
///     .cut();
/// let data = b.build();
/// ```
pub struct EscPosBuilder {
    buffer: Vec<u8>,
    paper: PaperWidth,
    latin_mode: bool,
}

impl EscPosBuilder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(512),
            paper: PaperWidth::Mm80,
            latin_mode: false,
        }
    }

    pub fn with_paper(mut self, paper: PaperWidth) -> Self {
        self.paper = paper;
        self
    }

    pub fn paper(&self) -> PaperWidth {
        self.paper
    }

    // -----------------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------------

    /// ESC @ — Initialize printer, reset to defaults.
    pub fn init(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x40]);
        self
    }

    /// ESC t n — Select character code page.
    pub fn code_page(&mut self, page: u8) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x74, page]);
        self
    }

    /// Set code page to CP850 (Multilingual Latin) and enable accent encoding.
    pub fn latin_mode(&mut self) -> &mut Self {
        self.code_page(2); // CP850
        self.latin_mode = true;
        self
    }

    // -----------------------------------------------------------------------
    // Text formatting
    // -----------------------------------------------------------------------

    /// ESC E n — Bold on/off.
    pub fn bold(&mut self, on: bool) -> &mut Self {
        self.buffer
            .extend_from_slice(&[ESC, 0x45, if on { 1 } else { 0 }]);
        self
    }

    /// ESC - n — Underline (0=off, 1=thin, 2=thick).
    pub fn underline(&mut self, mode: u8) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x2D, mode]);
        self
    }

    /// GS ! n — Set text size (width x height multiplier, 1-8 each).
    pub fn text_size(&mut self, width: u8, height: u8) -> &mut Self {
        let w = width.clamp(1, 8) - 1;
        let h = height.clamp(1, 8) - 1;
        self.buffer.extend_from_slice(&[GS, 0x21, (w << 4) | h]);
        self
    }

    /// Reset text size to 1x1.
    pub fn normal_size(&mut self) -> &mut Self {
        self.text_size(1, 1)
    }

    /// Double-height text (1x2).
    pub fn double_height(&mut self) -> &mut Self {
        self.text_size(1, 2)
    }

    // -----------------------------------------------------------------------
    // Alignment
    // -----------------------------------------------------------------------

    /// ESC a 0 — Left-align.
    pub fn left(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x61, 0]);
        self
    }

    /// ESC a 1 — Centre-align.
    pub fn center(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x61, 1]);
        self
    }

    /// ESC a 2 — Right-align.
    pub fn right(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x61, 2]);
        self
    }

    // -----------------------------------------------------------------------
    // Text output
    // -----------------------------------------------------------------------

    /// Append text. Characters are encoded as ASCII, or CP850 in latin mode.
    pub fn text(&mut self, s: &str) -> &mut Self {
        if self.latin_mode {
            self.buffer.extend(encode_cp850(s));
        } else {
            for ch in s.chars() {
                let code = ch as u32;
                if code < 0x80 {
                    self.buffer.push(code as u8);
                } else {
                    self.buffer.push(b'?');
                }
            }
        }
        self
    }

    /// Append raw bytes (e.g. pre-encoded text).
    pub fn raw(&mut self, data: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(data);
        self
    }

    /// Append a line-feed.
    pub fn lf(&mut self) -> &mut Self {
        self.buffer.push(LF);
        self
    }

    /// Print a horizontal separator using dashes, matching paper width.
    pub fn separator(&mut self) -> &mut Self {
        let width = self.paper.chars();
        for _ in 0..width {
            self.buffer.push(b'-');
        }
        self.buffer.push(LF);
        self
    }

    /// Print a line with left-aligned label and right-aligned value.
    pub fn line_pair(&mut self, label: &str, value: &str) -> &mut Self {
        let width = self.paper.chars();
        let gap = width.saturating_sub(label.chars().count() + value.chars().count());
        self.text(label);
        for _ in 0..gap {
            self.buffer.push(b' ');
        }
        self.text(value);
        self.lf()
    }

    // -----------------------------------------------------------------------
    // QR code
    // -----------------------------------------------------------------------

    /// GS ( k — Print a QR code (model 2, module size 6, error correction M).
    pub fn qr(&mut self, data: &str) -> &mut Self {
        let payload = data.as_bytes();
        // Select model 2
        self.buffer
            .extend_from_slice(&[GS, 0x28, 0x6B, 4, 0, 49, 65, 50, 0]);
        // Module size
        self.buffer
            .extend_from_slice(&[GS, 0x28, 0x6B, 3, 0, 49, 67, 6]);
        // Error correction level M
        self.buffer
            .extend_from_slice(&[GS, 0x28, 0x6B, 3, 0, 49, 69, 49]);
        // Store symbol data
        let len = payload.len() + 3;
        self.buffer.extend_from_slice(&[
            GS,
            0x28,
            0x6B,
            (len & 0xFF) as u8,
            ((len >> 8) & 0xFF) as u8,
            49,
            80,
            48,
        ]);
        self.buffer.extend_from_slice(payload);
        // Print stored symbol
        self.buffer
            .extend_from_slice(&[GS, 0x28, 0x6B, 3, 0, 49, 81, 48]);
        self
    }

    // -----------------------------------------------------------------------
    // Feed / cut
    // -----------------------------------------------------------------------

    /// ESC d n — Feed n lines.
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x64, lines]);
        self
    }

    /// GS V A 16 — Partial cut with 16-dot feed.
    pub fn cut(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[GS, 0x56, 0x41, 0x10]);
        self
    }

    /// GS V 0 — Full cut.
    pub fn full_cut(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[GS, 0x56, 0x00]);
        self
    }

    // -----------------------------------------------------------------------
    // Cash drawer
    // -----------------------------------------------------------------------

    /// ESC p m t1 t2 — Kick cash drawer (pin 2, 200ms pulse).
    pub fn open_drawer(&mut self) -> &mut Self {
        self.buffer
            .extend_from_slice(&[ESC, 0x70, 0x00, 0x19, 0x78]);
        self
    }

    // -----------------------------------------------------------------------
    // Build
    // -----------------------------------------------------------------------

    /// Consume the builder and return the binary ESC/POS payload.
    pub fn build(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// CP850 Western-European character encoding
// ---------------------------------------------------------------------------

/// Encode a string to CP850 bytes. ASCII passes through; accented Latin
/// characters map to their CP850 byte values; anything else becomes `?`.
fn encode_cp850(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let code = ch as u32;
        if code < 0x80 {
            bytes.push(code as u8);
            continue;
        }
        match latin_to_cp850(ch) {
            Some(b) => bytes.push(b),
            None => bytes.push(b'?'),
        }
    }
    bytes
}

/// Map a Unicode accented Latin character to its CP850 byte value.
fn latin_to_cp850(ch: char) -> Option<u8> {
    match ch {
        'é' => Some(0x82),
        'â' => Some(0x83),
        'ä' => Some(0x84),
        'à' => Some(0x85),
        'å' => Some(0x86),
        'ç' => Some(0x87),
        'ê' => Some(0x88),
        'ë' => Some(0x89),
        'è' => Some(0x8A),
        'ï' => Some(0x8B),
        'î' => Some(0x8C),
        'ì' => Some(0x8D),
        'Ä' => Some(0x8E),
        'Å' => Some(0x8F),
        'É' => Some(0x90),
        'æ' => Some(0x91),
        'Æ' => Some(0x92),
        'ô' => Some(0x93),
        'ö' => Some(0x94),
        'ò' => Some(0x95),
        'û' => Some(0x96),
        'ù' => Some(0x97),
        'ÿ' => Some(0x98),
        'Ö' => Some(0x99),
        'Ü' => Some(0x9A),
        'ø' => Some(0x9B),
        '£' => Some(0x9C),
        'Ø' => Some(0x9D),
        'á' => Some(0xA0),
        'í' => Some(0xA1),
        'ó' => Some(0xA2),
        'ú' => Some(0xA3),
        'ñ' => Some(0xA4),
        'Ñ' => Some(0xA5),
        'Á' => Some(0xB5),
        'Â' => Some(0xB6),
        'À' => Some(0xB7),
        'Ê' => Some(0xD2),
        'Ë' => Some(0xD3),
        'È' => Some(0xD4),
        'Í' => Some(0xD6),
        'Î' => Some(0xD7),
        'Ï' => Some(0xD8),
        'Ì' => Some(0xDE),
        'Ó' => Some(0xE0),
        'ß' => Some(0xE1),
        'Ô' => Some(0xE2),
        'Ò' => Some(0xE3),
        'õ' => Some(0xE4),
        'Õ' => Some(0xE5),
        'Ú' => Some(0xE9),
        'Û' => Some(0xEA),
        'Ù' => Some(0xEB),
        'ý' => Some(0xEC),
        'Ý' => Some(0xED),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_command() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.init();
            b.build()
        };
        assert_eq!(data, vec![0x1B, 0x40]);
    }

    #[test]
    fn test_bold_on_off() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.bold(true).text("HI").bold(false);
            b.build()
        };
        assert_eq!(data, vec![0x1B, 0x45, 1, b'H', b'I', 0x1B, 0x45, 0]);
    }

    #[test]
    fn test_center_align() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.center();
            b.build()
        };
        assert_eq!(data, vec![0x1B, 0x61, 1]);
    }

    #[test]
    fn test_cut() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.cut();
            b.build()
        };
        assert_eq!(data, vec![0x1D, 0x56, 0x41, 0x10]);
    }

    #[test]
    fn test_feed() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.feed(4);
            b.build()
        };
        assert_eq!(data, vec![0x1B, 0x64, 4]);
    }

    #[test]
    fn test_text_ascii() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.text("ABC\n");
            b.build()
        };
        assert_eq!(data, vec![b'A', b'B', b'C', b'\n']);
    }

    #[test]
    fn test_latin_encoding() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.init().latin_mode().text("é\n");
            b.build()
        };
        // ESC @, ESC t 2, 0x82, LF
        assert_eq!(data, vec![0x1B, 0x40, 0x1B, 0x74, 2, 0x82, 0x0A]);
    }

    #[test]
    fn test_unknown_char_becomes_question_mark() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.latin_mode().text("例");
            b.build()
        };
        assert_eq!(data[data.len() - 1], b'?');
    }

    #[test]
    fn test_separator_80mm() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.separator();
            b.build()
        };
        // 48 dashes + LF
        assert_eq!(data.len(), 49);
        assert!(data[..48].iter().all(|&b| b == b'-'));
        assert_eq!(data[48], 0x0A);
    }

    #[test]
    fn test_line_pair_58mm() {
        let data = {
            let mut b = EscPosBuilder::new().with_paper(PaperWidth::Mm58);
            b.line_pair("Item", "5.00");
            b.build()
        };
        // "Item" + 24 spaces + "5.00" + LF = 33 bytes at 32 columns
        assert_eq!(data.len(), 33);
        assert_eq!(&data[..4], b"Item");
        assert_eq!(&data[28..32], b"5.00");
        assert_eq!(data[32], 0x0A);
    }

    #[test]
    fn test_text_size() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.text_size(2, 2);
            b.build()
        };
        // n = ((2-1) << 4) | (2-1) = 0x11
        assert_eq!(data, vec![0x1D, 0x21, 0x11]);
    }

    #[test]
    fn test_qr_emits_symbol_commands() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.qr("https://example.test");
            b.build()
        };
        assert!(data.windows(3).any(|w| w == [0x1D, 0x28, 0x6B]));
        let text = String::from_utf8_lossy(&data);
        assert!(text.contains("https://example.test"));
    }

    #[test]
    fn test_open_drawer() {
        let data = {
            let mut b = EscPosBuilder::new();
            b.open_drawer();
            b.build()
        };
        assert_eq!(data, vec![0x1B, 0x70, 0x00, 0x19, 0x78]);
    }

    #[test]
    fn test_full_test_receipt() {
        let mut b = EscPosBuilder::new();
        b.init()
            .center()
            .bold(true)
            .text("TEST PRINT\n")
            .bold(false)
            .separator()
            .left()
            .text("Printer: Test\n")
            .text("Date: 2026-08-25\n")
            .separator()
            .center()
            .text("-- End of Test --\n")
            .feed(4)
            .cut();
        let data = b.build();
        assert!(data.len() > 50);
        assert_eq!(data[0], 0x1B);
        assert_eq!(data[1], 0x40);
        let tail = &data[data.len() - 4..];
        assert_eq!(tail, &[0x1D, 0x56, 0x41, 0x10]);
    }
}
