//! Stream payload location
//!
//! A stream's declared `/Length` is trusted only when the bytes right after
//! the payload (optionally past one line ending) start with `endstream`.
//! Otherwise the payload is taken to run up to the first whole-word
//! `endstream` or `endobj`, minus the line ending in front of it.

use super::chars::{is_line_ending, is_whitespace};
use super::lexer::SyntaxParser;
use super::objects::{ObjectHolder, PdfDictionary, PdfObject, PdfStream};
use super::{ParseError, ParseResult};
use crate::source::ByteSource;

const ENDSTREAM: &[u8] = b"endstream";
const ENDOBJ: &[u8] = b"endobj";

/// Resolve the `/Length` entry of a stream dictionary
///
/// Indirect lengths are looked up in `holder`; anything that does not end in
/// a number counts as no length at all.
fn declared_length(dict: &PdfDictionary, holder: &dyn ObjectHolder) -> Option<i64> {
    let value = match dict.get("Length")? {
        PdfObject::Reference(number, _) => holder.get_object(*number)?,
        direct => direct,
    };
    match value {
        PdfObject::Integer(length) => Some(*length),
        PdfObject::Real(length) => Some(*length as i64),
        _ => None,
    }
}

impl<S: ByteSource> SyntaxParser<S> {
    /// Read the stream that follows a dictionary
    ///
    /// The cursor must be just past the `stream` keyword. On success it ends
    /// up just past `endstream`, or, when `endobj` follows on the same line
    /// or the next, still just past `endstream`.
    pub(crate) fn read_stream(
        &mut self,
        dict: PdfDictionary,
        holder: &dyn ObjectHolder,
    ) -> ParseResult<PdfStream> {
        let declared = declared_length(&dict, holder);

        self.to_next_line();
        let stream_start = self.pos;

        let mut length = match declared {
            Some(length) if length >= 0 => Some(length as u64),
            _ => None,
        };
        if let Some(len) = length {
            let past_end = match stream_start.checked_add(len) {
                Some(end) => end >= self.document_size(),
                None => true,
            };
            if len > 0 && past_end {
                tracing::debug!(
                    "Stream length {} at {} runs past end of data, searching for endstream",
                    len,
                    stream_start
                );
                length = None;
            }
        }

        if let Some(len) = length.filter(|len| *len > 0) {
            if !self
                .validator
                .check_data_range_and_request_if_unavailable(self.header_offset + stream_start, len)
            {
                return Err(ParseError::DataUnavailable);
            }
            self.set_pos(stream_start + len);
        }

        if let Some(len) = length {
            let (found_end, has_problems) = self.in_read_session(|parser| {
                let markers = parser.read_eol_markers(parser.pos);
                parser.pos += markers;
                parser.get_next_word_internal();
                parser.word.starts_with(ENDSTREAM)
            });
            if has_problems {
                return Err(ParseError::DataUnavailable);
            }
            if !found_end {
                tracing::debug!(
                    "Stream length {} at {} is not followed by endstream, searching for it",
                    len,
                    stream_start
                );
                length = None;
                self.set_pos(stream_start);
            }
        }

        let length = match length {
            Some(len) => len,
            None => {
                let end = self
                    .find_stream_end_pos()
                    .ok_or(ParseError::StreamEndNotFound {
                        position: stream_start,
                    })?;
                let len = end - stream_start;
                if len > 0 {
                    self.set_pos(stream_start);
                    if !self.validator.check_data_range_and_request_if_unavailable(
                        self.header_offset + stream_start,
                        len,
                    ) {
                        return Err(ParseError::DataUnavailable);
                    }
                    self.set_pos(stream_start + len);
                }
                len
            }
        };

        let data = self.copy_stream_data(stream_start, length)?;

        let end_stream_offset = self.pos;
        self.get_next_word_internal();

        // Allow whitespace after endstream and before a newline
        while let Some(ch) = self.get_next_char() {
            if !is_whitespace(ch) || is_line_ending(ch) {
                break;
            }
        }
        self.set_pos(self.pos.saturating_sub(1));

        let markers = self.read_eol_markers(self.pos);
        if self.word == ENDOBJ && markers != 0 {
            self.set_pos(end_stream_offset);
        }

        Ok(PdfStream::new(dict, data))
    }

    fn copy_stream_data(&mut self, start: u64, length: u64) -> ParseResult<Vec<u8>> {
        if length == 0 {
            return Ok(Vec::new());
        }

        let size = usize::try_from(length).map_err(|_| ParseError::SyntaxError {
            position: start,
            message: format!("stream of {length} bytes does not fit in memory"),
        })?;
        let mut data = vec![0u8; size];
        if !self.validator.read_at(self.header_offset + start, &mut data) {
            return Err(ParseError::DataUnavailable);
        }
        Ok(data)
    }

    /// Number of line-ending bytes at `pos`: 2 for CRLF, 1 for a lone CR or
    /// LF, otherwise 0
    pub(crate) fn read_eol_markers(&mut self, pos: u64) -> u64 {
        let first = self.get_char_at(pos);
        let second = self.get_char_at(pos + 1);
        match (first, second) {
            (Some(b'\r'), Some(b'\n')) => 2,
            (Some(b'\r' | b'\n'), _) => 1,
            _ => 0,
        }
    }

    /// Position just before the line ending that precedes the nearest
    /// whole-word `endstream` or `endobj`
    pub(crate) fn find_stream_end_pos(&mut self) -> Option<u64> {
        let end_stream = self.find_word_pos(ENDSTREAM);
        let end_obj = self.find_word_pos(ENDOBJ);

        let mut end = match (end_stream, end_obj) {
            (None, None) => return None,
            (Some(end), None) | (None, Some(end)) => end,
            (Some(stream), Some(obj)) => stream.min(obj),
        };

        if end >= 2 && self.read_eol_markers(end - 2) == 2 {
            end -= 2;
        } else if end >= 1 && self.read_eol_markers(end - 1) == 1 {
            end -= 1;
        }

        (end >= self.pos).then_some(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::objects::ObjectTable;
    use crate::parser::test_helpers::{parser_for, progressive_parser, stream_object};
    use pretty_assertions::assert_eq;

    fn read_stream_object(input: &[u8]) -> (ParseResult<PdfObject>, u64) {
        let mut parser = parser_for(input);
        let result = parser.get_object_body(&());
        (result, parser.pos())
    }

    fn stream_data(result: ParseResult<PdfObject>) -> Vec<u8> {
        match result {
            Ok(PdfObject::Stream(stream)) => stream.data,
            other => panic!("expected stream, got {other:?}"),
        }
    }

    #[test]
    fn test_declared_length_is_trusted() {
        let input = stream_object("5", b"HELLO");
        let (result, pos) = read_stream_object(&input);
        assert_eq!(stream_data(result), b"HELLO");
        // Left just past `endstream` since `endobj` follows
        assert_eq!(&input[..pos as usize], b"<< /Length 5 >>\nstream\nHELLO\nendstream");
    }

    #[test]
    fn test_wrong_length_falls_back_to_keyword_search() {
        let input = stream_object("3", b"HELLO");
        let (result, _) = read_stream_object(&input);
        assert_eq!(stream_data(result), b"HELLO");
    }

    #[test]
    fn test_length_past_end_of_data() {
        let input = stream_object("999999", b"HELLO");
        let (result, _) = read_stream_object(&input);
        assert_eq!(stream_data(result), b"HELLO");
    }

    #[test]
    fn test_missing_and_negative_length() {
        let input = b"<< >>\nstream\r\nabc\r\nendstream\nendobj\n";
        let (result, _) = read_stream_object(input);
        assert_eq!(stream_data(result), b"abc");

        let input = stream_object("-4", b"abc");
        let (result, _) = read_stream_object(&input);
        assert_eq!(stream_data(result), b"abc");
    }

    #[test]
    fn test_zero_length_stream() {
        let input = b"<< /Length 0 >>\nstream\nendstream\nendobj\n";
        let (result, _) = read_stream_object(input);
        assert!(stream_data(result).is_empty());
    }

    #[test]
    fn test_endobj_without_endstream() {
        let input = b"<< /Length 100 >>\nstream\ndata bytes\r\nendobj\n";
        let (result, _) = read_stream_object(input);
        assert_eq!(stream_data(result), b"data bytes");
    }

    #[test]
    fn test_no_terminator_at_all() {
        let input = b"<< /Length 100 >>\nstream\ndata that never ends";
        let (result, _) = read_stream_object(input);
        match result {
            Err(ParseError::StreamEndNotFound { position }) => assert_eq!(position, 25),
            other => panic!("expected missing stream end, got {other:?}"),
        }
    }

    #[test]
    fn test_glued_endstream_is_not_a_terminator() {
        let input = b"<< >>\nstream\nxendstream 1endobj\nendstream\n";
        let (result, _) = read_stream_object(input);
        assert_eq!(stream_data(result), b"xendstream 1endobj");
    }

    #[test]
    fn test_indirect_length() {
        let mut table = ObjectTable::new();
        table.insert(7, PdfObject::Integer(5));
        let input = b"<< /Length 7 0 R >>\nstream\nHELLO\nendstream\n";

        let mut parser = parser_for(input);
        let stream = parser.get_object_body(&table).unwrap();
        assert_eq!(stream.as_stream().unwrap().data, b"HELLO");
    }

    #[test]
    fn test_unresolved_indirect_length_searches() {
        let input = b"<< /Length 7 0 R >>\nstream\nHELLO\nendstream\n";
        let (result, _) = read_stream_object(input);
        assert_eq!(stream_data(result), b"HELLO");
    }

    #[test]
    fn test_declared_length_with_trailing_spaces() {
        let input = b"<< /Length 2 >>\nstream\nhi\r\nendstream  \nendobj\n";
        let mut parser = parser_for(input);
        let stream = parser.get_object_body(&()).unwrap();
        assert_eq!(stream.as_stream().unwrap().data, b"hi");
        assert_eq!(parser.get_next_word().bytes, b"endobj");
    }

    #[test]
    fn test_read_eol_markers() {
        let mut parser = parser_for(b"a\r\nb\rc\nd");
        assert_eq!(parser.read_eol_markers(0), 0);
        assert_eq!(parser.read_eol_markers(1), 2);
        assert_eq!(parser.read_eol_markers(2), 1);
        assert_eq!(parser.read_eol_markers(4), 1);
        assert_eq!(parser.read_eol_markers(6), 1);
        assert_eq!(parser.read_eol_markers(8), 0);
    }

    #[test]
    fn test_unavailable_payload_fails() {
        let input = stream_object("1000", &[b'x'; 1000]);
        let (mut parser, availability) = progressive_parser(&input, 600);
        match parser.get_object_body(&()) {
            Err(ParseError::DataUnavailable) => {}
            other => panic!("expected unavailable data, got {other:?}"),
        }
        assert!(!availability.requests.borrow().is_empty());
    }
}
