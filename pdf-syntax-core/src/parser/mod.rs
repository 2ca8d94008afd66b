//! PDF Syntax Parser Module
//!
//! This module implements the lowest layer of PDF reading: a tolerant
//! tokenizer and object-body reader that turns a seekable byte source into
//! PDF objects according to ISO 32000-1 Section 7.2 and 7.3. Damaged,
//! truncated, or partially downloaded files still yield whatever objects
//! can be read.

pub mod chars;
pub mod filters;
pub mod lexer;
pub mod literal;
pub mod object_body;
pub mod objects;
pub mod search;
pub mod stack_safe;
pub mod stream;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use self::lexer::{SyntaxParser, Word};
pub use self::objects::{
    decode_name, encode_name, IndirectObject, ObjectHolder, ObjectTable, PdfArray,
    PdfDictionary, PdfName, PdfObject, PdfStream, PdfString,
};

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// PDF Parser errors
///
/// Every error leaves the parser cursor at a well-defined rewind point, so a
/// caller may retry with a different recovery strategy.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected end of data at position {0}")]
    EndOfData(u64),

    #[error("Syntax error at position {position}: {message}")]
    SyntaxError { position: u64, message: String },

    #[error("Unexpected token at position {position}: {found}")]
    UnexpectedToken { position: u64, found: String },

    #[error("Invalid object reference: {0}")]
    InvalidReference(String),

    #[error("Maximum recursion depth exceeded (limit: {0})")]
    RecursionLimit(usize),

    #[error("Required data is not yet available")]
    DataUnavailable,

    #[error("Stream end not found after position {position}")]
    StreamEndNotFound { position: u64 },

    #[error("Stream decode error: {0}")]
    StreamDecodeError(String),
}

impl ParseError {
    pub(crate) fn unexpected(position: u64, word: &[u8]) -> Self {
        ParseError::UnexpectedToken {
            position,
            found: String::from_utf8_lossy(word).into_owned(),
        }
    }
}

/// How forgiving object construction is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseType {
    /// Skip malformed entries and tolerate missing closing delimiters
    #[default]
    Loose,
    /// Fail arrays without a closing `]` and dictionaries with a bad value
    Strict,
}

/// Parser configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Nesting limit for arrays and dictionaries
    pub max_recursion_depth: usize,
    /// Size of the sliding read window in bytes
    pub read_buffer_size: usize,
    /// Longest word kept by the tokenizer; longer words are truncated
    pub max_word_length: usize,
    /// Use [`ParseType::Loose`] for top-level indirect objects
    pub lenient_syntax: bool,
    /// Record the end offset of every `%%EOF` line passed while tokenizing
    pub record_trailer_ends: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_recursion_depth: stack_safe::MAX_RECURSION_DEPTH,
            read_buffer_size: 512,
            max_word_length: 255,
            lenient_syntax: true,
            record_trailer_ends: false,
        }
    }
}

impl ParseOptions {
    /// Options for damaged files: larger read window, loose syntax
    pub fn lenient() -> Self {
        Self {
            read_buffer_size: 4096,
            lenient_syntax: true,
            ..Default::default()
        }
    }

    /// Options that reject malformed arrays and dictionary values
    pub fn strict() -> Self {
        Self {
            lenient_syntax: false,
            ..Default::default()
        }
    }

    pub fn parse_type(&self) -> ParseType {
        if self.lenient_syntax {
            ParseType::Loose
        } else {
            ParseType::Strict
        }
    }
}
