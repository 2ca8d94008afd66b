//! Helper functions for building parsers and small PDF files in tests

use super::lexer::SyntaxParser;
use super::ParseOptions;
use crate::source::validator::tests::PrefixAvailability;
use crate::source::{MemorySource, ReadValidator};

pub fn parser_for(data: &[u8]) -> SyntaxParser<MemorySource> {
    SyntaxParser::new(MemorySource::new(data))
}

pub fn parser_with_options(data: &[u8], options: ParseOptions) -> SyntaxParser<MemorySource> {
    SyntaxParser::with_options(MemorySource::new(data), options)
}

/// Parser whose source only has the first `available` bytes downloaded
pub fn progressive_parser(
    data: &[u8],
    available: u64,
) -> (SyntaxParser<MemorySource>, PrefixAvailability) {
    let availability = PrefixAvailability::new(available);
    let validator =
        ReadValidator::with_availability(MemorySource::new(data), Box::new(availability.clone()));
    let parser = SyntaxParser::with_validator(validator, 0, ParseOptions::default());
    (parser, availability)
}

/// Creates a minimal PDF with two objects and returns it together with the
/// offsets of both objects
pub fn create_minimal_pdf() -> (Vec<u8>, [u64; 2]) {
    let header = b"%PDF-1.4\n";
    let obj1 = b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n";
    let obj2 = b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n";
    let obj1_start = header.len() as u64;
    let obj2_start = obj1_start + obj1.len() as u64;

    let mut content = Vec::new();
    content.extend_from_slice(header);
    content.extend_from_slice(obj1);
    content.extend_from_slice(obj2);
    content.extend_from_slice(b"trailer\n<< /Size 3 /Root 1 0 R >>\n%%EOF\n");
    (content, [obj1_start, obj2_start])
}

/// Wraps `payload` in a stream object declaring `length`
pub fn stream_object(length: &str, payload: &[u8]) -> Vec<u8> {
    let mut content = format!("<< /Length {length} >>\nstream\n").into_bytes();
    content.extend_from_slice(payload);
    content.extend_from_slice(b"\nendstream\nendobj\n");
    content
}
