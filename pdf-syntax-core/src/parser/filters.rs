//! Stream payload decoding
//!
//! Only FlateDecode is understood here; everything else is left to the
//! document layer that consumes stream payloads.

use super::objects::{PdfDictionary, PdfName, PdfObject};
use super::{ParseError, ParseResult};

#[cfg(feature = "compression")]
use flate2::read::ZlibDecoder;
#[cfg(feature = "compression")]
use std::io::Read;

/// Decode stream data according to the `/Filter` entry of its dictionary
pub fn decode_stream(data: &[u8], dict: &PdfDictionary) -> ParseResult<Vec<u8>> {
    let filters: Vec<&PdfName> = match dict.get("Filter") {
        None => return Ok(data.to_vec()),
        Some(PdfObject::Name(name)) => vec![name],
        Some(PdfObject::Array(array)) => array
            .0
            .iter()
            .map(|obj| {
                obj.as_name().ok_or_else(|| {
                    ParseError::StreamDecodeError("Invalid filter in array".to_string())
                })
            })
            .collect::<ParseResult<_>>()?,
        Some(other) => {
            return Err(ParseError::StreamDecodeError(format!(
                "Invalid Filter type: {}",
                other.kind()
            )))
        }
    };

    let mut result = data.to_vec();
    for filter in filters {
        result = match filter.as_bytes() {
            b"FlateDecode" | b"Fl" => decode_flate(&result)?,
            _ => {
                return Err(ParseError::StreamDecodeError(format!(
                    "Unsupported filter: {filter}"
                )))
            }
        };
    }
    Ok(result)
}

/// Decode FlateDecode (zlib/deflate) compressed data
#[cfg(feature = "compression")]
fn decode_flate(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut result = Vec::new();
    decoder
        .read_to_end(&mut result)
        .map_err(|e| ParseError::StreamDecodeError(format!("Flate decode error: {e}")))?;
    Ok(result)
}

#[cfg(not(feature = "compression"))]
fn decode_flate(_data: &[u8]) -> ParseResult<Vec<u8>> {
    Err(ParseError::StreamDecodeError(
        "FlateDecode requires 'compression' feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::objects::{PdfArray, PdfName};

    fn dict_with_filter(filter: PdfObject) -> PdfDictionary {
        let mut dict = PdfDictionary::new();
        dict.insert("Filter".to_string(), filter);
        dict
    }

    #[test]
    fn test_no_filter_returns_raw_data() {
        let decoded = decode_stream(b"raw bytes", &PdfDictionary::new()).unwrap();
        assert_eq!(decoded, b"raw bytes");
    }

    #[test]
    fn test_unsupported_filter() {
        let dict = dict_with_filter(PdfObject::Name(PdfName::new("DCTDecode".to_string())));
        let err = decode_stream(b"data", &dict).unwrap_err();
        assert!(matches!(err, ParseError::StreamDecodeError(_)));
    }

    #[test]
    fn test_invalid_filter_entry() {
        let dict = dict_with_filter(PdfObject::Integer(3));
        assert!(decode_stream(b"data", &dict).is_err());

        let dict = dict_with_filter(PdfObject::Array(PdfArray(vec![PdfObject::Null])));
        assert!(decode_stream(b"data", &dict).is_err());
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_flate_round_trip() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"BT /F1 12 Tf (Hello) Tj ET").unwrap();
        let compressed = encoder.finish().unwrap();

        let dict = dict_with_filter(PdfObject::Array(PdfArray(vec![PdfObject::Name(
            PdfName::new("FlateDecode".to_string()),
        )])));
        assert_eq!(
            decode_stream(&compressed, &dict).unwrap(),
            b"BT /F1 12 Tf (Hello) Tj ET"
        );
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_flate_corrupt_data() {
        let dict = dict_with_filter(PdfObject::Name(PdfName::new("FlateDecode".to_string())));
        assert!(decode_stream(b"not zlib", &dict).is_err());
    }
}
