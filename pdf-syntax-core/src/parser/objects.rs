//! PDF Object Model
//!
//! Typed objects produced by the syntax parser, according to ISO 32000-1
//! Section 7.3.

use super::chars::hex_value;
use super::ParseResult;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

/// PDF Name object, stored without the leading slash and with `#xx` escapes
/// already decoded
///
/// Names are byte strings; two names are equal only when their decoded bytes
/// are, whether or not those bytes are valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PdfName(pub Vec<u8>);

/// PDF String object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfString {
    data: Vec<u8>,
    hex: bool,
}

/// PDF Array object
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfArray(pub Vec<PdfObject>);

/// PDF Dictionary object
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfDictionary(pub HashMap<PdfName, PdfObject>);

/// PDF Stream object
#[derive(Debug, Clone, PartialEq)]
pub struct PdfStream {
    pub dict: PdfDictionary,
    pub data: Vec<u8>,
}

/// PDF Object types
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(PdfString),
    Name(PdfName),
    Array(PdfArray),
    Dictionary(PdfDictionary),
    Stream(PdfStream),
    Reference(u32, u16), // object number, generation number
}

/// A top-level object stamped with its object and generation numbers
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectObject {
    pub number: u32,
    pub generation: u32,
    pub object: PdfObject,
}

/// Lookup of already loaded indirect objects by number
///
/// References produced by the parser are plain numbers; whoever owns the
/// object table resolves them later.
pub trait ObjectHolder {
    fn get_object(&self, number: u32) -> Option<&PdfObject>;
}

/// Default in-memory [`ObjectHolder`]
#[derive(Debug, Clone, Default)]
pub struct ObjectTable {
    objects: HashMap<u32, PdfObject>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, number: u32, object: PdfObject) -> Option<PdfObject> {
        self.objects.insert(number, object)
    }

    /// Insert an object under the number it was parsed with
    pub fn insert_indirect(&mut self, indirect: IndirectObject) -> Option<PdfObject> {
        self.objects.insert(indirect.number, indirect.object)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectHolder for ObjectTable {
    fn get_object(&self, number: u32) -> Option<&PdfObject> {
        self.objects.get(&number)
    }
}

/// Holder that never resolves anything
impl ObjectHolder for () {
    fn get_object(&self, _number: u32) -> Option<&PdfObject> {
        None
    }
}

impl PdfStream {
    pub fn new(dict: PdfDictionary, data: Vec<u8>) -> Self {
        Self { dict, data }
    }

    /// Get the decompressed stream data
    pub fn decode(&self) -> ParseResult<Vec<u8>> {
        super::filters::decode_stream(&self.data, &self.dict)
    }

    /// Get the raw (possibly compressed) stream data
    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }
}

impl PdfObject {
    /// Build a number from a numeric word
    ///
    /// Conversion is lenient: a word containing `.` becomes a real built from
    /// its longest valid prefix, anything else an integer built from an
    /// optional sign and the leading digits. Signed values outside the 32-bit
    /// range, and unsigned values past `u32::MAX`, collapse to zero.
    pub fn number_from_bytes(word: &[u8]) -> Self {
        if word.contains(&b'.') {
            return PdfObject::Real(parse_real_prefix(word));
        }

        let (negative, signed, digits) = match word.first() {
            Some(b'+') => (false, true, &word[1..]),
            Some(b'-') => (true, true, &word[1..]),
            _ => (false, false, word),
        };

        let mut value: u32 = 0;
        for &byte in digits.iter().take_while(|b| b.is_ascii_digit()) {
            match value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u32::from(byte - b'0')))
            {
                Some(next) => value = next,
                None => {
                    value = 0;
                    break;
                }
            }
        }

        if !signed {
            return PdfObject::Integer(i64::from(value));
        }

        let limit = if negative {
            i32::MAX as u32 + 1
        } else {
            i32::MAX as u32
        };
        let value = if value > limit { 0 } else { i64::from(value) };
        PdfObject::Integer(if negative { -value } else { value })
    }

    /// Check if this object is null
    pub fn is_null(&self) -> bool {
        matches!(self, PdfObject::Null)
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, PdfObject::Stream(_))
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PdfObject::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PdfObject::Integer(i) => Some(*i),
            PdfObject::Real(r) => Some(*r as i64),
            _ => None,
        }
    }

    /// Get as real number
    pub fn as_real(&self) -> Option<f64> {
        match self {
            PdfObject::Real(r) => Some(*r),
            PdfObject::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_string(&self) -> Option<&PdfString> {
        match self {
            PdfObject::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as name
    pub fn as_name(&self) -> Option<&PdfName> {
        match self {
            PdfObject::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Get as array
    pub fn as_array(&self) -> Option<&PdfArray> {
        match self {
            PdfObject::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get as dictionary; streams expose their dictionary
    pub fn as_dict(&self) -> Option<&PdfDictionary> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            PdfObject::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Get as stream
    pub fn as_stream(&self) -> Option<&PdfStream> {
        match self {
            PdfObject::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// Get as reference
    pub fn as_reference(&self) -> Option<(u32, u16)> {
        match self {
            PdfObject::Reference(obj, gen) => Some((*obj, *gen)),
            _ => None,
        }
    }

    /// Short lowercase name of the object kind
    pub fn kind(&self) -> &'static str {
        match self {
            PdfObject::Null => "null",
            PdfObject::Boolean(_) => "boolean",
            PdfObject::Integer(_) | PdfObject::Real(_) => "number",
            PdfObject::String(_) => "string",
            PdfObject::Name(_) => "name",
            PdfObject::Array(_) => "array",
            PdfObject::Dictionary(_) => "dictionary",
            PdfObject::Stream(_) => "stream",
            PdfObject::Reference(..) => "reference",
        }
    }
}

fn parse_real_prefix(word: &[u8]) -> f64 {
    let mut end = 0;
    if matches!(word.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let mut seen_dot = false;
    while let Some(&byte) = word.get(end) {
        match byte {
            b'0'..=b'9' => {}
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }

    std::str::from_utf8(&word[..end])
        .ok()
        .and_then(|text| text.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Decode `#xx` escapes in the body of a name
///
/// A `#` that is not followed by two hex digits is kept literally. `#00` is
/// dropped, a name cannot contain NUL.
pub fn decode_name(raw: &[u8]) -> Vec<u8> {
    if !raw.contains(&b'#') {
        return raw.to_vec();
    }

    let mut decoded = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' {
            if let (Some(high), Some(low)) = (
                raw.get(i + 1).copied().and_then(hex_value),
                raw.get(i + 2).copied().and_then(hex_value),
            ) {
                let byte = high * 16 + low;
                if byte != 0 {
                    decoded.push(byte);
                }
                i += 3;
                continue;
            }
        }
        decoded.push(raw[i]);
        i += 1;
    }
    decoded
}

/// Escape a name body for writing; the inverse of [`decode_name`]
pub fn encode_name(name: &[u8]) -> String {
    let mut encoded = String::with_capacity(name.len());
    for &byte in name {
        let plain = byte > b' '
            && byte < 0x7f
            && byte != b'#'
            && !super::chars::is_delimiter(byte);
        if plain {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("#{byte:02X}"));
        }
    }
    encoded
}

impl PdfDictionary {
    /// Create a new empty dictionary
    pub fn new() -> Self {
        PdfDictionary(HashMap::new())
    }

    /// Get a value by its decoded key
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&PdfObject> {
        self.0.get(key.as_ref())
    }

    /// Insert a key-value pair
    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: PdfObject) -> Option<PdfObject> {
        self.0.insert(PdfName(key.into()), value)
    }

    /// Check if dictionary contains a key
    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> bool {
        self.0.contains_key(key.as_ref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the dictionary type (value of /Type key)
    pub fn get_type(&self) -> Option<&str> {
        self.get("Type")
            .and_then(|obj| obj.as_name())
            .and_then(PdfName::as_str)
    }
}

impl PdfArray {
    /// Create a new empty array
    pub fn new() -> Self {
        PdfArray(Vec::new())
    }

    /// Get array length
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if array is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get element at index
    pub fn get(&self, index: usize) -> Option<&PdfObject> {
        self.0.get(index)
    }

    /// Push an element
    pub fn push(&mut self, obj: PdfObject) {
        self.0.push(obj);
    }
}

impl PdfString {
    /// Create a literal string
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, hex: false }
    }

    /// Create a string that was written in hexadecimal form
    pub fn new_hex(data: Vec<u8>) -> Self {
        Self { data, hex: true }
    }

    /// Whether the string came from `<...>` syntax
    pub fn is_hex(&self) -> bool {
        self.hex
    }

    /// Get as UTF-8 string if possible
    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.data)
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl PdfName {
    /// Create a new PDF name from its decoded bytes
    pub fn new(name: impl Into<Vec<u8>>) -> Self {
        PdfName(name.into())
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        PdfName(bytes.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The name as text, if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl Borrow<[u8]> for PdfName {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for PdfName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", encode_name(&self.0))
    }
}

impl fmt::Display for PdfString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hex {
            f.write_str("<")?;
            for byte in &self.data {
                write!(f, "{byte:02X}")?;
            }
            return f.write_str(">");
        }

        f.write_str("(")?;
        for &byte in &self.data {
            match byte {
                b'(' | b')' | b'\\' => write!(f, "\\{}", byte as char)?,
                b'\n' => f.write_str("\\n")?,
                b'\r' => f.write_str("\\r")?,
                b'\t' => f.write_str("\\t")?,
                0x08 => f.write_str("\\b")?,
                0x0c => f.write_str("\\f")?,
                0x20..=0x7e => write!(f, "{}", byte as char)?,
                _ => write!(f, "\\{byte:03o}")?,
            }
        }
        f.write_str(")")
    }
}

impl fmt::Display for PdfDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Sorted so that output is stable
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        f.write_str("<<")?;
        for (key, value) in entries {
            write!(f, " {key} {value}")?;
        }
        f.write_str(" >>")
    }
}

impl fmt::Display for PdfObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfObject::Null => f.write_str("null"),
            PdfObject::Boolean(b) => write!(f, "{b}"),
            PdfObject::Integer(i) => write!(f, "{i}"),
            PdfObject::Real(r) => write!(f, "{r}"),
            PdfObject::String(s) => write!(f, "{s}"),
            PdfObject::Name(n) => write!(f, "{n}"),
            PdfObject::Array(a) => {
                f.write_str("[")?;
                for (i, element) in a.0.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
            PdfObject::Dictionary(d) => write!(f, "{d}"),
            PdfObject::Stream(s) => write!(f, "{} stream[{} bytes]", s.dict, s.data.len()),
            PdfObject::Reference(obj, gen) => write!(f, "{obj} {gen} R"),
        }
    }
}
