//! Fixed 8x8 bitmap font used to rasterize CGA text-mode cells.
//!
//! Covers the printable ASCII range (`0x20`-`0x7E`); codes outside that
//! range (the CP437 box-drawing/accented half of the real character ROM)
//! render as a blank cell. Each glyph is 8 rows, MSB-first, bit set = lit
//! pixel — the same row/bit convention the high-res graphics renderer uses
//! for its 1bpp packing.

const BLANK: [u8; 8] = [0; 8];

/// Glyph bitmap for `ch`, or a blank cell if outside the covered range.
pub fn glyph(ch: u8) -> [u8; 8] {
    match ch {
        0x20 => BLANK,
        0x21 => [0x18, 0x18, 0x18, 0x18, 0x18, 0x00, 0x18, 0x00], // !
        0x22 => [0x6C, 0x6C, 0x48, 0x00, 0x00, 0x00, 0x00, 0x00], // "
        0x23 => [0x6C, 0xFE, 0x6C, 0x6C, 0x6C, 0xFE, 0x6C, 0x00], // #
        0x24 => [0x18, 0x3E, 0x60, 0x3C, 0x06, 0x7C, 0x18, 0x00], // $
        0x25 => [0x00, 0x63, 0x66, 0x0C, 0x18, 0x33, 0x63, 0x00], // %
        0x26 => [0x38, 0x6C, 0x38, 0x76, 0xDC, 0xCC, 0x76, 0x00], // &
        0x27 => [0x18, 0x18, 0x30, 0x00, 0x00, 0x00, 0x00, 0x00], // '
        0x28 => [0x0C, 0x18, 0x30, 0x30, 0x30, 0x18, 0x0C, 0x00], // (
        0x29 => [0x30, 0x18, 0x0C, 0x0C, 0x0C, 0x18, 0x30, 0x00], // )
        0x2A => [0x00, 0x66, 0x3C, 0xFF, 0x3C, 0x66, 0x00, 0x00], // *
        0x2B => [0x00, 0x18, 0x18, 0x7E, 0x18, 0x18, 0x00, 0x00], // +
        0x2C => [0x00, 0x00, 0x00, 0x00, 0x00, 0x18, 0x18, 0x30], // ,
        0x2D => [0x00, 0x00, 0x00, 0x7E, 0x00, 0x00, 0x00, 0x00], // -
        0x2E => [0x00, 0x00, 0x00, 0x00, 0x00, 0x18, 0x18, 0x00], // .
        0x2F => [0x03, 0x06, 0x0C, 0x18, 0x30, 0x60, 0x40, 0x00], // /
        0x30 => [0x3C, 0x66, 0x6E, 0x7E, 0x76, 0x66, 0x3C, 0x00], // 0
        0x31 => [0x18, 0x38, 0x18, 0x18, 0x18, 0x18, 0x7E, 0x00], // 1
        0x32 => [0x3C, 0x66, 0x06, 0x0C, 0x30, 0x60, 0x7E, 0x00], // 2
        0x33 => [0x3C, 0x66, 0x06, 0x1C, 0x06, 0x66, 0x3C, 0x00], // 3
        0x34 => [0x0C, 0x1C, 0x3C, 0x6C, 0x7E, 0x0C, 0x0C, 0x00], // 4
        0x35 => [0x7E, 0x60, 0x7C, 0x06, 0x06, 0x66, 0x3C, 0x00], // 5
        0x36 => [0x3C, 0x66, 0x60, 0x7C, 0x66, 0x66, 0x3C, 0x00], // 6
        0x37 => [0x7E, 0x06, 0x0C, 0x18, 0x30, 0x30, 0x30, 0x00], // 7
        0x38 => [0x3C, 0x66, 0x66, 0x3C, 0x66, 0x66, 0x3C, 0x00], // 8
        0x39 => [0x3C, 0x66, 0x66, 0x3E, 0x06, 0x66, 0x3C, 0x00], // 9
        0x3A => [0x00, 0x18, 0x18, 0x00, 0x00, 0x18, 0x18, 0x00], // :
        0x3B => [0x00, 0x18, 0x18, 0x00, 0x00, 0x18, 0x18, 0x30], // ;
        0x3C => [0x0C, 0x18, 0x30, 0x60, 0x30, 0x18, 0x0C, 0x00], // <
        0x3D => [0x00, 0x00, 0x7E, 0x00, 0x7E, 0x00, 0x00, 0x00], // =
        0x3E => [0x30, 0x18, 0x0C, 0x06, 0x0C, 0x18, 0x30, 0x00], // >
        0x3F => [0x3C, 0x66, 0x06, 0x0C, 0x18, 0x00, 0x18, 0x00], // ?
        0x41 => [0x18, 0x3C, 0x66, 0x66, 0x7E, 0x66, 0x66, 0x00], // A
        0x42 => [0x7C, 0x66, 0x66, 0x7C, 0x66, 0x66, 0x7C, 0x00], // B
        0x43 => [0x3C, 0x66, 0x60, 0x60, 0x60, 0x66, 0x3C, 0x00], // C
        0x44 => [0x78, 0x6C, 0x66, 0x66, 0x66, 0x6C, 0x78, 0x00], // D
        0x45 => [0x7E, 0x60, 0x60, 0x7C, 0x60, 0x60, 0x7E, 0x00], // E
        0x46 => [0x7E, 0x60, 0x60, 0x7C, 0x60, 0x60, 0x60, 0x00], // F
        0x47 => [0x3C, 0x66, 0x60, 0x6E, 0x66, 0x66, 0x3C, 0x00], // G
        0x48 => [0x66, 0x66, 0x66, 0x7E, 0x66, 0x66, 0x66, 0x00], // H
        0x49 => [0x7E, 0x18, 0x18, 0x18, 0x18, 0x18, 0x7E, 0x00], // I
        0x4A => [0x06, 0x06, 0x06, 0x06, 0x06, 0x66, 0x3C, 0x00], // J
        0x4B => [0x66, 0x6C, 0x78, 0x70, 0x78, 0x6C, 0x66, 0x00], // K
        0x4C => [0x60, 0x60, 0x60, 0x60, 0x60, 0x60, 0x7E, 0x00], // L
        0x4D => [0x63, 0x77, 0x7F, 0x6B, 0x63, 0x63, 0x63, 0x00], // M
        0x4E => [0x66, 0x76, 0x7E, 0x7E, 0x6E, 0x66, 0x66, 0x00], // N
        0x4F => [0x3C, 0x66, 0x66, 0x66, 0x66, 0x66, 0x3C, 0x00], // O
        0x50 => [0x7C, 0x66, 0x66, 0x7C, 0x60, 0x60, 0x60, 0x00], // P
        0x51 => [0x3C, 0x66, 0x66, 0x66, 0x6A, 0x6C, 0x36, 0x00], // Q
        0x52 => [0x7C, 0x66, 0x66, 0x7C, 0x78, 0x6C, 0x66, 0x00], // R
        0x53 => [0x3C, 0x66, 0x60, 0x3C, 0x06, 0x66, 0x3C, 0x00], // S
        0x54 => [0x7E, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x00], // T
        0x55 => [0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x3C, 0x00], // U
        0x56 => [0x66, 0x66, 0x66, 0x66, 0x66, 0x3C, 0x18, 0x00], // V
        0x57 => [0x63, 0x63, 0x63, 0x6B, 0x7F, 0x77, 0x63, 0x00], // W
        0x58 => [0x66, 0x66, 0x3C, 0x18, 0x3C, 0x66, 0x66, 0x00], // X
        0x59 => [0x66, 0x66, 0x66, 0x3C, 0x18, 0x18, 0x18, 0x00], // Y
        0x5A => [0x7E, 0x06, 0x0C, 0x18, 0x30, 0x60, 0x7E, 0x00], // Z
        0x61..=0x7A => glyph(ch - 0x20), // lowercase reuses the uppercase glyph
        _ => BLANK,
    }
}
