//! String literal readers
//!
//! Both readers start just after the opening delimiter has been consumed and
//! never fail: malformed escapes and stray bytes are tolerated, and running
//! out of data returns what was decoded so far.

use super::chars::{hex_value, is_octal_digit};
use super::lexer::SyntaxParser;
use crate::source::ByteSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringState {
    Normal,
    Backslash,
    Octal,
    FinishOctal,
    CarriageReturn,
}

impl<S: ByteSource> SyntaxParser<S> {
    /// Read a literal string body up to its balancing `)`
    ///
    /// Nested parentheses are kept in the output. `\n`, `\r`, `\t`, `\b`
    /// and `\f` map to their control characters, up to three octal digits
    /// form one byte (truncated to 8 bits), a backslash before a line ending
    /// continues the string on the next line, and any other escaped byte
    /// stands for itself.
    pub fn read_string(&mut self) -> Vec<u8> {
        let mut buf = Vec::new();
        let Some(mut ch) = self.get_next_char() else {
            return buf;
        };

        let mut state = StringState::Normal;
        let mut parens = 0u32;
        let mut esc_code: u32 = 0;

        loop {
            // `true` when `ch` has to be looked at again in the new state
            let reprocess = match state {
                StringState::Normal => {
                    if ch == b')' {
                        if parens == 0 {
                            return buf;
                        }
                        parens -= 1;
                    } else if ch == b'(' {
                        parens += 1;
                    }

                    if ch == b'\\' {
                        state = StringState::Backslash;
                    } else {
                        buf.push(ch);
                    }
                    false
                }
                StringState::Backslash => {
                    if is_octal_digit(ch) {
                        esc_code = u32::from(ch - b'0');
                        state = StringState::Octal;
                    } else if ch == b'\r' {
                        state = StringState::CarriageReturn;
                    } else {
                        match ch {
                            b'n' => buf.push(b'\n'),
                            b'r' => buf.push(b'\r'),
                            b't' => buf.push(b'\t'),
                            b'b' => buf.push(0x08),
                            b'f' => buf.push(0x0c),
                            b'\n' => {}
                            other => buf.push(other),
                        }
                        state = StringState::Normal;
                    }
                    false
                }
                StringState::Octal => {
                    if is_octal_digit(ch) {
                        esc_code = esc_code * 8 + u32::from(ch - b'0');
                        state = StringState::FinishOctal;
                        false
                    } else {
                        buf.push(esc_code as u8);
                        state = StringState::Normal;
                        true
                    }
                }
                StringState::FinishOctal => {
                    state = StringState::Normal;
                    if is_octal_digit(ch) {
                        esc_code = esc_code * 8 + u32::from(ch - b'0');
                        buf.push(esc_code as u8);
                        false
                    } else {
                        buf.push(esc_code as u8);
                        true
                    }
                }
                StringState::CarriageReturn => {
                    state = StringState::Normal;
                    ch != b'\n'
                }
            };

            if reprocess {
                continue;
            }
            match self.get_next_char() {
                Some(next) => ch = next,
                None => break,
            }
        }
        buf
    }

    /// Read a hex string body up to `>`
    ///
    /// Non-hex bytes, whitespace included, are skipped. An odd final digit is
    /// padded with a trailing zero.
    pub fn read_hex_string(&mut self) -> Vec<u8> {
        let mut buf = Vec::new();
        let Some(mut ch) = self.get_next_char() else {
            return buf;
        };

        let mut first = true;
        let mut code = 0u8;
        while ch != b'>' {
            if let Some(value) = hex_value(ch) {
                if first {
                    code = value * 16;
                } else {
                    code += value;
                    buf.push(code);
                }
                first = !first;
            }

            match self.get_next_char() {
                Some(next) => ch = next,
                None => break,
            }
        }

        if !first {
            buf.push(code);
        }
        buf
    }
}
