//! PDF Lexer
//!
//! Tokenizes PDF syntax according to ISO 32000-1 Section 7.2. The lexer owns a
//! cursor into the document, a sliding read window over the byte source, and
//! a bounded scratch buffer holding the most recently read word.
//!
//! Tokenizing never fails: running out of data simply ends the current word.
//! Positions are logical, i.e. relative to the header offset given at
//! construction.

use super::chars::{is_delimiter, is_line_ending, is_numeric, is_regular, is_whitespace};
use super::stack_safe::PositionGuard;
use super::ParseOptions;
use crate::source::{ByteSource, ReadValidator};

/// Shortest word scratch buffer; keywords such as `endstream` must fit
const MIN_WORD_LENGTH: usize = 16;

/// A word produced by the tokenizer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Word {
    pub bytes: Vec<u8>,
    /// Every byte of the word is a digit, sign or decimal point
    pub is_number: bool,
}

impl Word {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// States of the `%%EOF` recognizer used while recording trailer ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EofState {
    Initial,
    NonPercent,
    Percent,
    E,
    O,
    F,
    Invalid,
}

/// Tolerant PDF tokenizer and object reader over a [`ByteSource`]
pub struct SyntaxParser<S> {
    pub(crate) validator: ReadValidator<S>,
    pub(crate) header_offset: u64,
    pub(crate) file_len: u64,
    pub(crate) pos: u64,
    buf_offset: u64,
    file_buf: Vec<u8>,
    read_buffer_size: usize,
    pub(crate) word: Vec<u8>,
    max_word_length: usize,
    pub(crate) depth: usize,
    pub(crate) options: ParseOptions,
    trailer_ends: Option<Vec<u64>>,
}

impl<S: ByteSource> SyntaxParser<S> {
    /// Create a parser with default options over a fully resident source
    pub fn new(source: S) -> Self {
        Self::with_options(source, ParseOptions::default())
    }

    pub fn with_options(source: S, options: ParseOptions) -> Self {
        Self::with_validator(ReadValidator::new(source), 0, options)
    }

    /// Create a parser over a validated source whose document starts at
    /// `header_offset`
    pub fn with_validator(
        validator: ReadValidator<S>,
        header_offset: u64,
        options: ParseOptions,
    ) -> Self {
        let file_len = validator.size();
        let max_word_length = options.max_word_length.max(MIN_WORD_LENGTH);
        Self {
            validator,
            header_offset: header_offset.min(file_len),
            file_len,
            pos: 0,
            buf_offset: 0,
            file_buf: Vec::new(),
            read_buffer_size: options.read_buffer_size.max(1),
            word: Vec::with_capacity(max_word_length),
            max_word_length,
            depth: 0,
            trailer_ends: options.record_trailer_ends.then(Vec::new),
            options,
        }
    }

    /// Current logical position
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Move the cursor, clamped to the document size
    pub fn set_pos(&mut self, pos: u64) {
        self.pos = pos.min(self.document_size());
    }

    /// Size of the document after the header offset
    pub fn document_size(&self) -> u64 {
        self.file_len - self.header_offset
    }

    pub fn header_offset(&self) -> u64 {
        self.header_offset
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn validator(&self) -> &ReadValidator<S> {
        &self.validator
    }

    pub fn validator_mut(&mut self) -> &mut ReadValidator<S> {
        &mut self.validator
    }

    /// Offsets just past each `%%EOF` line seen so far, when recording
    pub fn trailer_ends(&self) -> Option<&[u64]> {
        self.trailer_ends.as_deref()
    }

    /// Take the recorded offsets, leaving recording enabled with a fresh list
    pub fn take_trailer_ends(&mut self) -> Vec<u64> {
        match self.trailer_ends.as_mut() {
            Some(ends) => std::mem::take(ends),
            None => Vec::new(),
        }
    }

    /// Run `f` as one read session and report whether any read inside it
    /// hit unavailable data or a source error
    pub(crate) fn in_read_session<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> (T, bool) {
        let saved = self.validator.begin_session();
        let result = f(self);
        let has_problems = self.validator.has_read_problems();
        self.validator.end_session(saved);
        (result, has_problems)
    }

    fn is_position_read(&self, pos: u64) -> bool {
        self.buf_offset <= pos && pos < self.buf_offset + self.file_buf.len() as u64
    }

    /// Refill the read window starting at physical offset `read_pos`
    fn read_block_at(&mut self, read_pos: u64) -> bool {
        if read_pos >= self.file_len {
            return false;
        }

        let read_size = (self.read_buffer_size as u64).min(self.file_len - read_pos) as usize;
        self.file_buf.resize(read_size, 0);
        if !self.validator.read_at(read_pos, &mut self.file_buf) {
            self.file_buf.clear();
            return false;
        }

        tracing::trace!("read window refilled at {read_pos} ({read_size} bytes)");
        self.buf_offset = read_pos;
        true
    }

    /// Read the byte under the cursor and advance
    pub fn get_next_char(&mut self) -> Option<u8> {
        let pos = self.pos + self.header_offset;
        if pos >= self.file_len {
            return None;
        }
        if !self.is_position_read(pos) && !self.read_block_at(pos) {
            return None;
        }

        let ch = *self.file_buf.get((pos - self.buf_offset) as usize)?;
        self.pos += 1;
        Some(ch)
    }

    /// Read the byte at `pos` without moving the cursor
    pub fn get_char_at(&mut self, pos: u64) -> Option<u8> {
        let mut parser = PositionGuard::new(self);
        parser.pos = pos;
        parser.get_next_char()
    }

    /// Read the byte at `pos`, refilling the window so that it ends at `pos`
    /// when needed. Used when scanning towards the start of the file.
    pub(crate) fn get_char_at_backward(&mut self, pos: u64) -> Option<u8> {
        let pos = pos + self.header_offset;
        if pos >= self.file_len {
            return None;
        }

        if !self.is_position_read(pos) {
            let window = self.read_buffer_size as u64;
            let block_start = if pos >= window { pos - window + 1 } else { 0 };
            if !self.read_block_at(block_start) || !self.is_position_read(pos) {
                return None;
            }
        }
        self.file_buf.get((pos - self.buf_offset) as usize).copied()
    }

    /// Fill `buf` from the cursor, advancing past it on success
    pub fn read_block(&mut self, buf: &mut [u8]) -> bool {
        if !self.validator.read_at(self.pos + self.header_offset, buf) {
            return false;
        }
        self.pos += buf.len() as u64;
        true
    }

    fn push_word_byte(&mut self, ch: u8) {
        if self.word.len() < self.max_word_length {
            self.word.push(ch);
        }
    }

    /// Skip whitespace and comments, leaving the cursor on the next
    /// significant byte
    fn to_next_word(&mut self) {
        if self.trailer_ends.is_some() {
            self.recording_to_next_word();
            return;
        }

        let Some(mut ch) = self.get_next_char() else {
            return;
        };

        loop {
            while is_whitespace(ch) {
                match self.get_next_char() {
                    Some(next) => ch = next,
                    None => return,
                }
            }

            if ch != b'%' {
                break;
            }

            loop {
                match self.get_next_char() {
                    Some(next) => ch = next,
                    None => return,
                }
                if is_line_ending(ch) {
                    break;
                }
            }
        }
        self.pos -= 1;
    }

    /// Variant of [`Self::to_next_word`] that also records where each
    /// `%%EOF` line ends. Runs `%` -> `E` -> `O` -> `F` -> line ending.
    fn recording_to_next_word(&mut self) {
        let mut state = EofState::Initial;

        loop {
            let Some(mut ch) = self.get_next_char() else {
                return;
            };

            match state {
                EofState::Initial => {
                    if !is_whitespace(ch) {
                        state = if ch == b'%' {
                            EofState::Percent
                        } else {
                            EofState::NonPercent
                        };
                    }
                }
                EofState::NonPercent | EofState::Invalid => {}
                EofState::Percent => {
                    if ch == b'E' {
                        state = EofState::E;
                    } else if ch != b'%' {
                        state = EofState::Invalid;
                    }
                }
                EofState::E => {
                    state = if ch == b'O' { EofState::O } else { EofState::Invalid };
                }
                EofState::O => {
                    state = if ch == b'F' { EofState::F } else { EofState::Invalid };
                }
                EofState::F => {
                    if ch == b'\r' {
                        // CRLF counts as one terminator
                        match self.get_next_char() {
                            Some(b'\n') => ch = b'\n',
                            Some(_) => self.pos -= 1,
                            None => {}
                        }
                    }
                    if ch == b'\r' || ch == b'\n' {
                        let end = self.pos;
                        if let Some(ends) = self.trailer_ends.as_mut() {
                            ends.push(end);
                        }
                    }
                    state = EofState::Invalid;
                }
            }

            if is_line_ending(ch) {
                state = EofState::Initial;
            }
            if state == EofState::NonPercent {
                break;
            }
        }
        self.pos -= 1;
    }

    /// Advance past the next line terminator (LF, CR, or CRLF)
    pub fn to_next_line(&mut self) {
        while let Some(ch) = self.get_next_char() {
            if ch == b'\n' {
                break;
            }
            if ch == b'\r' {
                if let Some(next) = self.get_next_char() {
                    if next != b'\n' {
                        self.pos -= 1;
                    }
                }
                break;
            }
        }
    }

    /// Read the next word into the scratch buffer and return whether it is
    /// numeric. An empty buffer means the data ran out.
    pub(crate) fn get_next_word_internal(&mut self) -> bool {
        self.word.clear();
        self.to_next_word();

        let Some(mut ch) = self.get_next_char() else {
            return true;
        };

        if is_delimiter(ch) {
            self.word.push(ch);
            match ch {
                b'/' => loop {
                    let Some(next) = self.get_next_char() else {
                        return false;
                    };
                    if !is_regular(next) && !is_numeric(next) {
                        self.pos -= 1;
                        return false;
                    }
                    self.push_word_byte(next);
                },
                b'<' | b'>' => {
                    if let Some(next) = self.get_next_char() {
                        if next == ch {
                            self.word.push(next);
                        } else {
                            self.pos -= 1;
                        }
                    }
                }
                _ => {}
            }
            return false;
        }

        let mut is_number = true;
        loop {
            self.push_word_byte(ch);
            if !is_numeric(ch) {
                is_number = false;
            }

            match self.get_next_char() {
                Some(next) if is_delimiter(next) || is_whitespace(next) => {
                    self.pos -= 1;
                    break;
                }
                Some(next) => ch = next,
                None => break,
            }
        }
        is_number
    }

    /// Read the next word
    ///
    /// Returns an empty word when the data ran out, or when part of the word
    /// could not be read because it is not available yet.
    pub fn get_next_word(&mut self) -> Word {
        let (is_number, has_problems) = self.in_read_session(|parser| parser.get_next_word_internal());
        if has_problems {
            return Word {
                bytes: Vec::new(),
                is_number,
            };
        }
        Word {
            bytes: self.word.clone(),
            is_number,
        }
    }

    /// Read the next word without moving the cursor
    pub fn peek_next_word(&mut self) -> Word {
        let mut parser = PositionGuard::new(self);
        parser.get_next_word()
    }

    pub fn get_keyword(&mut self) -> Vec<u8> {
        self.get_next_word().bytes
    }

    /// Read the next word as an unsigned number; 0 when it is not numeric
    pub fn get_direct_num(&mut self) -> u32 {
        if !self.get_next_word_internal() {
            return 0;
        }
        atoui(&self.word)
    }
}

/// Lenient unsigned conversion: one optional sign, then leading digits.
/// Overflow saturates to `u32::MAX`.
pub(crate) fn atoui(bytes: &[u8]) -> u32 {
    let digits = match bytes.first() {
        Some(b'+' | b'-') => &bytes[1..],
        _ => bytes,
    };

    let mut num: u32 = 0;
    for &byte in digits.iter().take_while(|b| b.is_ascii_digit()) {
        let val = u32::from(byte - b'0');
        if num > (u32::MAX - val) / 10 {
            return u32::MAX;
        }
        num = num * 10 + val;
    }
    num
}

impl<S> std::fmt::Debug for SyntaxParser<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxParser")
            .field("pos", &self.pos)
            .field("header_offset", &self.header_offset)
            .field("file_len", &self.file_len)
            .field("buf_offset", &self.buf_offset)
            .field("buffered", &self.file_buf.len())
            .field("depth", &self.depth)
            .finish()
    }
}
