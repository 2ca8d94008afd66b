//! PDF character classes
//!
//! Byte classification according to ISO 32000-1 Section 7.2.2. Every byte
//! falls into exactly one of whitespace, delimiter, numeric or regular; the
//! line-ending flag is set in addition to whitespace for CR and LF.

use bitflags::bitflags;

bitflags! {
    /// Lexical class of a single byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CharClass: u8 {
        const WHITESPACE = 0b0000_0001;
        const DELIMITER = 0b0000_0010;
        const NUMERIC = 0b0000_0100;
        const REGULAR = 0b0000_1000;
        const LINE_ENDING = 0b0001_0000;
    }
}

const fn classify(byte: u8) -> u8 {
    match byte {
        b'\r' | b'\n' => CharClass::WHITESPACE.bits() | CharClass::LINE_ENDING.bits(),
        0x00 | 0x09 | 0x0c | 0x20 => CharClass::WHITESPACE.bits(),
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' => {
            CharClass::DELIMITER.bits()
        }
        b'0'..=b'9' | b'+' | b'-' | b'.' => CharClass::NUMERIC.bits(),
        _ => CharClass::REGULAR.bits(),
    }
}

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = classify(i as u8);
        i += 1;
    }
    table
}

static CHAR_TABLE: [u8; 256] = build_table();

/// Get the class of a byte
#[inline]
pub fn char_class(byte: u8) -> CharClass {
    CharClass::from_bits_truncate(CHAR_TABLE[byte as usize])
}

#[inline]
pub fn is_whitespace(byte: u8) -> bool {
    char_class(byte).contains(CharClass::WHITESPACE)
}

#[inline]
pub fn is_line_ending(byte: u8) -> bool {
    char_class(byte).contains(CharClass::LINE_ENDING)
}

#[inline]
pub fn is_delimiter(byte: u8) -> bool {
    char_class(byte).contains(CharClass::DELIMITER)
}

/// Digits, signs and the decimal point
#[inline]
pub fn is_numeric(byte: u8) -> bool {
    char_class(byte).contains(CharClass::NUMERIC)
}

/// Anything that is neither whitespace, delimiter nor numeric
#[inline]
pub fn is_regular(byte: u8) -> bool {
    char_class(byte).contains(CharClass::REGULAR)
}

#[inline]
pub(crate) fn is_octal_digit(byte: u8) -> bool {
    matches!(byte, b'0'..=b'7')
}

#[inline]
pub(crate) fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
