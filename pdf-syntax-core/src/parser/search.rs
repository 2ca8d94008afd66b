//! Keyword search over the raw byte source
//!
//! Used to locate stream terminators when the declared length is wrong, and
//! by recovery code that has to find objects or trailers without a usable
//! cross-reference table.

use super::chars::{is_delimiter, is_numeric, is_regular, is_whitespace};
use super::lexer::SyntaxParser;
use super::stack_safe::PositionGuard;
use crate::source::ByteSource;

impl<S: ByteSource> SyntaxParser<S> {
    /// Search forward for `tag` starting at the cursor
    ///
    /// Returns the distance from the starting position to the match and
    /// leaves the cursor just past it. At end of data returns `None` with the
    /// cursor at the end. An empty tag never matches.
    pub fn find_tag(&mut self, tag: &[u8]) -> Option<u64> {
        if tag.is_empty() {
            return None;
        }
        let start = self.pos;
        loop {
            let match_start = self.pos;
            let mut matched = true;
            for &expected in tag {
                let ch = self.get_next_char()?;
                if ch != expected {
                    matched = false;
                    break;
                }
            }

            if matched {
                return Some(match_start - start);
            }
            self.set_pos(match_start + 1);
        }
    }

    /// Find the next whole-keyword occurrence of `word` without moving the
    /// cursor; returns the offset of its first byte
    pub fn find_word_pos(&mut self, word: &[u8]) -> Option<u64> {
        let mut parser = PositionGuard::new(self);
        let limit = parser.document_size();
        while parser.find_tag(word).is_some() {
            let start = parser.pos - word.len() as u64;
            if parser.is_whole_word(start, limit, word, true) {
                return Some(start);
            }
        }
        None
    }

    /// Whether `tag` at `start` is not glued to neighbouring word characters
    ///
    /// A side is only checked when the tag's edge byte is itself a word byte.
    /// A neighbour breaks the word when it is regular or numeric, or, with
    /// `check_keyword`, a delimiter.
    pub fn is_whole_word(&mut self, start: u64, limit: u64, tag: &[u8], check_keyword: bool) -> bool {
        let (Some(&first), Some(&last)) = (tag.first(), tag.last()) else {
            return false;
        };

        let check_left = !is_delimiter(first) && !is_whitespace(first);
        let check_right = !is_delimiter(last) && !is_whitespace(last);
        let glued = |ch: u8| is_numeric(ch) || is_regular(ch) || (check_keyword && is_delimiter(ch));

        let end = start + tag.len() as u64;
        if check_right && end <= limit {
            if let Some(ch) = self.get_char_at(end) {
                if glued(ch) {
                    return false;
                }
            }
        }

        if check_left && start > 0 {
            if let Some(ch) = self.get_char_at(start - 1) {
                if glued(ch) {
                    return false;
                }
            }
        }
        true
    }

    /// Search backward from the cursor for a whole-word `word`
    ///
    /// On success the cursor is moved to the start of the match. A nonzero
    /// `limit` bounds how far back the search goes.
    pub fn backwards_search_to_word(&mut self, word: &[u8], limit: u64) -> bool {
        let Some(&last) = word.last() else {
            return false;
        };
        let taglen = word.len();
        let origin = self.pos;
        let doc_size = self.document_size();

        let mut pos = origin;
        let mut offset = taglen - 1;
        loop {
            if limit > 0 && pos + limit <= origin {
                return false;
            }

            let Some(byte) = self.get_char_at_backward(pos) else {
                return false;
            };

            if byte == word[offset] {
                if offset > 0 {
                    if pos == 0 {
                        return false;
                    }
                    offset -= 1;
                    pos -= 1;
                    continue;
                }
                if self.is_whole_word(pos, doc_size, word, false) {
                    self.pos = pos;
                    return true;
                }
            }

            offset = if byte == last && taglen >= 2 {
                taglen - 2
            } else {
                taglen - 1
            };
            if pos == 0 {
                return false;
            }
            pos -= 1;
        }
    }
}
