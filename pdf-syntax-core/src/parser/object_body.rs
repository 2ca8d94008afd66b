//! Object body construction
//!
//! Builds [`PdfObject`] trees from tokens according to ISO 32000-1 Section
//! 7.3. Nested arrays and dictionaries are always read loosely; the
//! [`ParseType`] only decides how the outermost construct treats a missing
//! `]` or a bad dictionary value.

use super::lexer::{atoui, SyntaxParser};
use super::objects::{
    decode_name, IndirectObject, ObjectHolder, PdfArray, PdfDictionary, PdfName, PdfObject,
    PdfString,
};
use super::stack_safe::{PositionGuard, RecursionGuard};
use super::{ParseError, ParseResult, ParseType};
use crate::source::ByteSource;

impl<S: ByteSource> SyntaxParser<S> {
    /// Read one object body at the cursor
    ///
    /// `holder` resolves indirect stream lengths. Fails with
    /// [`ParseError::DataUnavailable`] when any byte needed was not yet
    /// available, even if an object could otherwise be built.
    pub fn get_object_body(&mut self, holder: &dyn ObjectHolder) -> ParseResult<PdfObject> {
        let (result, has_problems) =
            self.in_read_session(|parser| parser.get_object_body_internal(holder, ParseType::Loose));
        if has_problems {
            tracing::warn!("Object body at {} needs data that is not available", self.pos);
            return Err(ParseError::DataUnavailable);
        }
        result
    }

    /// Read `<num> <gen> obj` followed by an object body
    ///
    /// When the header does not match, the cursor is put back where it was.
    pub fn get_indirect_object(
        &mut self,
        holder: &dyn ObjectHolder,
        parse_type: ParseType,
    ) -> ParseResult<IndirectObject> {
        let (result, has_problems) =
            self.in_read_session(|parser| parser.read_indirect_object(holder, parse_type));
        if has_problems {
            tracing::warn!("Indirect object at {} needs data that is not available", self.pos);
            return Err(ParseError::DataUnavailable);
        }
        result
    }

    /// Seek to `pos` and read an indirect object with the configured
    /// [`ParseType`]
    pub fn get_indirect_object_at(
        &mut self,
        pos: u64,
        holder: &dyn ObjectHolder,
    ) -> ParseResult<IndirectObject> {
        self.set_pos(pos);
        let parse_type = self.options.parse_type();
        self.get_indirect_object(holder, parse_type)
    }

    fn read_indirect_object(
        &mut self,
        holder: &dyn ObjectHolder,
        parse_type: ParseType,
    ) -> ParseResult<IndirectObject> {
        let saved_pos = self.pos;

        let number_word = self.get_next_word();
        if !number_word.is_number || number_word.is_empty() {
            self.set_pos(saved_pos);
            return Err(ParseError::SyntaxError {
                position: saved_pos,
                message: "expected object number".to_string(),
            });
        }
        let number = atoui(&number_word.bytes);

        let generation_word = self.get_next_word();
        if !generation_word.is_number || generation_word.is_empty() {
            self.set_pos(saved_pos);
            return Err(ParseError::SyntaxError {
                position: saved_pos,
                message: "expected generation number".to_string(),
            });
        }
        let generation = atoui(&generation_word.bytes);

        let keyword = self.get_keyword();
        if keyword != b"obj" {
            self.set_pos(saved_pos);
            return Err(ParseError::unexpected(saved_pos, &keyword));
        }

        let object = self.get_object_body_internal(holder, parse_type)?;
        Ok(IndirectObject {
            number,
            generation,
            object,
        })
    }

    pub(crate) fn get_object_body_internal(
        &mut self,
        holder: &dyn ObjectHolder,
        parse_type: ParseType,
    ) -> ParseResult<PdfObject> {
        let mut parser = RecursionGuard::enter(self)?;
        parser.parse_object_body(holder, parse_type)
    }

    fn parse_object_body(
        &mut self,
        holder: &dyn ObjectHolder,
        parse_type: ParseType,
    ) -> ParseResult<PdfObject> {
        let saved_obj_pos = self.pos;

        let word = self.get_next_word();
        if word.is_empty() {
            return Err(ParseError::EndOfData(self.pos));
        }

        if word.is_number {
            return self.parse_number_or_reference(&word.bytes);
        }

        let result = match word.bytes.as_slice() {
            b"true" => Ok(PdfObject::Boolean(true)),
            b"false" => Ok(PdfObject::Boolean(false)),
            b"null" => Ok(PdfObject::Null),
            b"(" => Ok(PdfObject::String(PdfString::new(self.read_string()))),
            b"<" => Ok(PdfObject::String(PdfString::new_hex(self.read_hex_string()))),
            b"[" => self.parse_array(holder, parse_type),
            b"<<" => self.parse_dictionary(holder, parse_type),
            [b'/', name @ ..] => Ok(PdfObject::Name(PdfName(decode_name(name)))),
            b">>" => {
                self.pos = saved_obj_pos;
                Err(ParseError::unexpected(saved_obj_pos, &word.bytes))
            }
            other => Err(ParseError::unexpected(saved_obj_pos, other)),
        };

        if let Err(ParseError::RecursionLimit(_)) = &result {
            self.pos = saved_obj_pos;
        }
        result
    }

    /// A number, or `num gen R` when the next two words are a number and `R`
    fn parse_number_or_reference(&mut self, first: &[u8]) -> ParseResult<PdfObject> {
        let position = self.pos;
        let generation = {
            let mut parser = PositionGuard::new(self);
            let next = parser.get_next_word();
            if !next.is_number || next.is_empty() {
                return Ok(PdfObject::number_from_bytes(first));
            }
            if parser.get_next_word().bytes != b"R" {
                return Ok(PdfObject::number_from_bytes(first));
            }
            parser.abandon();
            atoui(&next.bytes)
        };

        let number = atoui(first);
        if number == 0 || number == u32::MAX {
            return Err(ParseError::InvalidReference(format!(
                "{} {} R at position {}",
                String::from_utf8_lossy(first),
                generation,
                position
            )));
        }
        let generation = u16::try_from(generation).unwrap_or(u16::MAX);
        Ok(PdfObject::Reference(number, generation))
    }

    fn parse_array(
        &mut self,
        holder: &dyn ObjectHolder,
        parse_type: ParseType,
    ) -> ParseResult<PdfObject> {
        let mut array = PdfArray::new();
        loop {
            match self.get_object_body_internal(holder, ParseType::Loose) {
                Ok(obj) if obj.is_stream() => {}
                Ok(obj) => array.push(obj),
                Err(err @ ParseError::RecursionLimit(_)) => return Err(err),
                Err(_) => break,
            }
        }

        // The element read that ended the loop consumed the last word
        if parse_type == ParseType::Loose || self.word.first() == Some(&b']') {
            return Ok(PdfObject::Array(array));
        }
        Err(ParseError::SyntaxError {
            position: self.pos,
            message: "array is not terminated by ']'".to_string(),
        })
    }

    fn parse_dictionary(
        &mut self,
        holder: &dyn ObjectHolder,
        parse_type: ParseType,
    ) -> ParseResult<PdfObject> {
        let mut dict = PdfDictionary::new();
        loop {
            let key_word = self.get_next_word();
            if key_word.is_empty() {
                return Err(ParseError::EndOfData(self.pos));
            }

            let key_pos = self.pos.saturating_sub(key_word.bytes.len() as u64);
            match key_word.bytes.as_slice() {
                b">>" => break,
                b"endobj" => {
                    self.pos = key_pos;
                    break;
                }
                [b'/', ..] => {}
                _ => continue,
            }

            let key = decode_name(&key_word.bytes[1..]);
            if key.is_empty() && parse_type == ParseType::Strict {
                self.to_next_line();
                return Err(ParseError::SyntaxError {
                    position: key_pos,
                    message: "empty dictionary key".to_string(),
                });
            }

            let value = match self.get_object_body_internal(holder, ParseType::Loose) {
                Ok(value) => value,
                Err(err @ ParseError::RecursionLimit(_)) => return Err(err),
                Err(_) if parse_type == ParseType::Loose => continue,
                Err(err) => {
                    self.to_next_line();
                    return Err(err);
                }
            };

            // An empty key skips the entry; null values are the same as absent
            if !key.is_empty() && !value.is_stream() && !value.is_null() {
                dict.insert(key, value);
            }
        }

        {
            let mut parser = PositionGuard::new(self);
            if parser.get_next_word().bytes != b"stream" {
                return Ok(PdfObject::Dictionary(dict));
            }
            parser.abandon();
        }
        self.read_stream(dict, holder).map(PdfObject::Stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::test_helpers::{
        create_minimal_pdf, parser_for, parser_with_options, progressive_parser,
    };
    use crate::parser::{ObjectTable, ParseOptions};
    use pretty_assertions::assert_eq;

    fn parse(input: &[u8]) -> ParseResult<PdfObject> {
        parser_for(input).get_object_body(&())
    }

    fn name(value: &str) -> PdfObject {
        PdfObject::Name(PdfName::new(value))
    }

    #[test]
    fn test_simple_objects() {
        assert_eq!(parse(b"true").unwrap(), PdfObject::Boolean(true));
        assert_eq!(parse(b"false").unwrap(), PdfObject::Boolean(false));
        assert_eq!(parse(b"null").unwrap(), PdfObject::Null);
        assert_eq!(parse(b"  42 ").unwrap(), PdfObject::Integer(42));
        assert_eq!(parse(b"-3.5").unwrap(), PdfObject::Real(-3.5));
        assert_eq!(parse(b"/Type").unwrap(), name("Type"));
        assert_eq!(parse(b"/A#20B").unwrap(), name("A B"));
    }

    #[test]
    fn test_strings() {
        let obj = parse(b"(Hello (World))").unwrap();
        let string = obj.as_string().unwrap();
        assert_eq!(string.as_bytes(), b"Hello (World)");
        assert!(!string.is_hex());

        let obj = parse(b"<48 69>").unwrap();
        let string = obj.as_string().unwrap();
        assert_eq!(string.as_bytes(), b"Hi");
        assert!(string.is_hex());
    }

    #[test]
    fn test_reference() {
        assert_eq!(parse(b"12 0 R").unwrap(), PdfObject::Reference(12, 0));
        assert_eq!(parse(b"12 3 R").unwrap(), PdfObject::Reference(12, 3));
    }

    #[test]
    fn test_numbers_not_followed_by_r() {
        let mut parser = parser_for(b"12 0 obj");
        assert_eq!(parser.get_object_body(&()).unwrap(), PdfObject::Integer(12));
        assert_eq!(parser.pos(), 2);

        let mut parser = parser_for(b"1 /Name");
        assert_eq!(parser.get_object_body(&()).unwrap(), PdfObject::Integer(1));
        assert_eq!(parser.pos(), 1);
    }

    #[test]
    fn test_invalid_reference_number() {
        assert!(matches!(parse(b"0 0 R"), Err(ParseError::InvalidReference(_))));
        assert!(matches!(
            parse(b"99999999999 0 R"),
            Err(ParseError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_array() {
        let obj = parse(b"[1 2.5 /N (s) [true] << /K 1 >> 3 0 R null]").unwrap();
        let array = obj.as_array().unwrap();
        assert_eq!(array.len(), 8);
        assert_eq!(array.get(0), Some(&PdfObject::Integer(1)));
        assert_eq!(array.get(6), Some(&PdfObject::Reference(3, 0)));
        assert_eq!(array.get(7), Some(&PdfObject::Null));
    }

    #[test]
    fn test_array_drops_streams() {
        let obj = parse(b"[1 << /Length 1 >>\nstream\nx\nendstream ]").unwrap();
        assert_eq!(obj, PdfObject::Array(PdfArray(vec![PdfObject::Integer(1)])));
    }

    #[test]
    fn test_unterminated_array() {
        let obj = parse(b"[1 2").unwrap();
        assert_eq!(obj.as_array().unwrap().len(), 2);

        let mut parser = parser_for(b"[1 2");
        assert!(parser.strict_object_body().is_err());
    }

    #[test]
    fn test_strict_array_terminated() {
        let mut parser = parser_for(b"[1 2]");
        let obj = parser.strict_object_body().unwrap();
        assert_eq!(obj.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_dictionary() {
        let obj = parse(b"<< /Type /Page /Count 3 /Kids [1 0 R] /Empty null >>").unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.get_type(), Some("Page"));
        assert_eq!(dict.get("Count"), Some(&PdfObject::Integer(3)));
        assert!(!dict.contains_key("Empty"));
    }

    #[test]
    fn test_dictionary_keys_differing_in_non_utf8_byte() {
        let obj = parse(b"<< /A#E9 1 /A#E8 2 >>").unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get(b"A\xE9"), Some(&PdfObject::Integer(1)));
        assert_eq!(dict.get(b"A\xE8"), Some(&PdfObject::Integer(2)));
    }

    #[test]
    fn test_name_with_escaped_nul() {
        assert_eq!(parse(b"/A#00B ").unwrap(), name("AB"));
    }

    #[test]
    fn test_dictionary_skips_junk_and_empty_keys() {
        let obj = parse(b"<< 1 2 /A 1 / 5 /B 2 >>").unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get("A"), Some(&PdfObject::Integer(1)));
        assert_eq!(dict.get("B"), Some(&PdfObject::Integer(2)));
    }

    #[test]
    fn test_dictionary_duplicate_keys_last_wins() {
        let obj = parse(b"<< /A 1 /A 2 >>").unwrap();
        assert_eq!(obj.as_dict().unwrap().get("A"), Some(&PdfObject::Integer(2)));
    }

    #[test]
    fn test_dictionary_bad_value_loose() {
        let obj = parse(b"<< /A ] /B 2 >>").unwrap();
        let dict = obj.as_dict().unwrap();
        assert!(!dict.contains_key("A"));
        assert_eq!(dict.get("B"), Some(&PdfObject::Integer(2)));
    }

    #[test]
    fn test_dictionary_bad_value_strict() {
        let mut parser = parser_for(b"<< /A ] /B 2 >>\nnext");
        assert!(parser.strict_object_body().is_err());
        assert_eq!(parser.get_next_word().bytes, b"next");
    }

    #[test]
    fn test_dictionary_stops_at_endobj() {
        let mut parser = parser_for(b"<< /A 1\nendobj");
        let obj = parser.get_object_body(&()).unwrap();
        assert_eq!(obj.as_dict().unwrap().len(), 1);
        assert_eq!(parser.get_next_word().bytes, b"endobj");
    }

    #[test]
    fn test_unterminated_dictionary() {
        assert!(matches!(parse(b"<< /A 1"), Err(ParseError::EndOfData(_))));
    }

    #[test]
    fn test_stray_dict_end_rewinds() {
        let mut parser = parser_for(b"  >> 1");
        assert!(parser.get_object_body(&()).is_err());
        assert_eq!(parser.pos(), 0);
    }

    #[test]
    fn test_unknown_keyword() {
        assert!(matches!(
            parse(b"foo"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(parse(b""), Err(ParseError::EndOfData(_))));
    }

    #[test]
    fn test_recursion_limit() {
        let options = ParseOptions {
            max_recursion_depth: 8,
            ..ParseOptions::default()
        };

        let mut parser = parser_with_options(b"[[[[[[[1]]]]]]]", options.clone());
        assert!(parser.get_object_body(&()).is_ok());

        let input = format!("{}{}", "[".repeat(20), "]".repeat(20));
        let mut parser = parser_with_options(input.as_bytes(), options);
        match parser.get_object_body(&()) {
            Err(ParseError::RecursionLimit(8)) => {}
            other => panic!("expected recursion limit, got {other:?}"),
        }
        assert_eq!(parser.pos(), 0);
        assert_eq!(parser.depth, 0);
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        // Debug builds use large frames; give the full default depth room
        let handle = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let input = "[<< /A ".repeat(5000);
                parse(input.as_bytes())
            })
            .unwrap();
        assert!(matches!(
            handle.join().unwrap(),
            Err(ParseError::RecursionLimit(1024))
        ));
    }

    #[test]
    fn test_indirect_object() {
        let (pdf, offsets) = create_minimal_pdf();
        let mut parser = parser_for(&pdf);
        parser.set_pos(offsets[1]);

        let indirect = parser.get_indirect_object(&(), ParseType::Loose).unwrap();
        assert_eq!(indirect.number, 2);
        assert_eq!(indirect.generation, 0);
        assert_eq!(indirect.object.as_dict().unwrap().get_type(), Some("Pages"));
        assert_eq!(parser.get_keyword(), b"endobj");
    }

    #[test]
    fn test_indirect_object_header_mismatch_rewinds() {
        for input in [&b"1 0 R"[..], b"1 obj", b"/A 0 obj", b"1 0 endobj", b""] {
            let mut parser = parser_for(input);
            assert!(parser.get_indirect_object(&(), ParseType::Loose).is_err());
            assert_eq!(parser.pos(), 0);
        }
    }

    #[test]
    fn test_indirect_object_with_stream() {
        let input = b"4 0 obj\n<< /Length 3 >>\nstream\nabc\nendstream\nendobj\n";
        let mut parser = parser_for(input);
        let indirect = parser.get_indirect_object(&(), ParseType::Strict).unwrap();
        assert_eq!(indirect.number, 4);
        assert_eq!(indirect.object.as_stream().unwrap().data, b"abc");
    }

    #[test]
    fn test_indirect_object_at_uses_table() {
        let mut table = ObjectTable::new();
        table.insert(9, PdfObject::Integer(2));
        let input = b"junk 5 1 obj << /Length 9 0 R >>\nstream\nhi\nendstream\nendobj";
        let mut parser = parser_for(input);
        let indirect = parser.get_indirect_object_at(5, &table).unwrap();
        assert_eq!(indirect.generation, 1);
        assert_eq!(indirect.object.as_stream().unwrap().data, b"hi");
    }

    #[test]
    fn test_unavailable_data_is_reported() {
        let mut input = b"1 0 obj\n(".to_vec();
        input.extend(std::iter::repeat(b'a').take(2000));
        input.extend_from_slice(b")\nendobj\n");

        let (mut parser, availability) = progressive_parser(&input, 700);
        assert!(matches!(
            parser.get_indirect_object(&(), ParseType::Loose),
            Err(ParseError::DataUnavailable)
        ));
        assert!(!availability.requests.borrow().is_empty());

        // Once everything is downloaded the same read succeeds
        *availability.available.borrow_mut() = input.len() as u64;
        parser.validator_mut().reset_errors();
        parser.set_pos(0);
        let indirect = parser.get_indirect_object(&(), ParseType::Loose).unwrap();
        assert_eq!(indirect.object.as_string().unwrap().as_bytes().len(), 2000);
        assert!(!parser.validator().has_read_problems());
    }

    impl<S: ByteSource> SyntaxParser<S> {
        fn strict_object_body(&mut self) -> ParseResult<PdfObject> {
            self.get_object_body_internal(&(), ParseType::Strict)
        }
    }
}
