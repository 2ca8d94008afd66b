//! # pdf-syntax
//!
//! The lowest layer of a PDF reader: a fault-tolerant tokenizer and object
//! reader that turns a random-access byte source into PDF objects.
//!
//! ## Features
//!
//! - **Tolerant Tokenizer**: Words, delimiters, comments and names per ISO 32000-1 Section 7.2
//! - **Object Bodies**: Booleans, numbers, strings, names, arrays, dictionaries, references and streams
//! - **Indirect Objects**: `num gen obj ... endobj` with rewind on malformed headers
//! - **Stream Recovery**: Declared lengths are verified, wrong ones recovered by keyword search
//! - **Keyword Search**: Whole-word forward and backward search for recovery code
//! - **Progressive Loading**: Reads of missing byte ranges fail softly and request the data
//! - **Stack Safety**: Nesting depth is bounded, hostile files cannot overflow the stack
//!
//! ## Quick Start
//!
//! ```rust
//! use pdf_syntax::{MemorySource, ParseType, SyntaxParser};
//!
//! # fn main() -> Result<(), pdf_syntax::ParseError> {
//! let data = b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n".to_vec();
//! let mut parser = SyntaxParser::new(MemorySource::new(data));
//!
//! let indirect = parser.get_indirect_object(&(), ParseType::Loose)?;
//! assert_eq!(indirect.number, 1);
//!
//! let catalog = indirect.object.as_dict().unwrap();
//! assert_eq!(catalog.get_type(), Some("Catalog"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Reading Files
//!
//! ```rust,no_run
//! use pdf_syntax::{ParseOptions, ReaderSource, SyntaxParser};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = ReaderSource::open("document.pdf")?;
//! let mut parser = SyntaxParser::with_options(source, ParseOptions::lenient());
//!
//! while let Some(offset) = parser.find_word_pos(b"obj") {
//!     parser.set_pos(offset + 3);
//!     println!("obj keyword at {offset}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod parser;
pub mod source;

pub use parser::{
    decode_name, encode_name, IndirectObject, ObjectHolder, ObjectTable, ParseError,
    ParseOptions, ParseResult, ParseType, PdfArray, PdfDictionary, PdfName, PdfObject,
    PdfStream, PdfString, SyntaxParser, Word,
};
pub use source::{
    ByteSource, DataAvailability, MemorySource, ReadValidator, ReaderSource, SubSource,
};

/// Current version of pdf-syntax
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
