//! Byte sources
//!
//! The parser never talks to files or transports directly. It reads through a
//! [`ByteSource`], which only needs to report its size and fill a buffer from
//! a given offset.

pub mod validator;

pub use self::validator::{DataAvailability, ReadValidator, SessionState};

use std::io::{self, Read, Seek, SeekFrom};

/// A seekable, random-access provider of bytes
pub trait ByteSource {
    /// Total size in bytes
    fn size(&self) -> u64;

    /// Fill `buf` completely with the bytes starting at `offset`
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_at(offset, buf)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_at(offset, buf)
    }
}

fn range_error(offset: u64, len: usize, size: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("read of {len} bytes at offset {offset} exceeds source size {size}"),
    )
}

/// Source over an owned byte buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for MemorySource {
    fn from(data: &[u8]) -> Self {
        Self::new(data)
    }
}

impl ByteSource for MemorySource {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| range_error(offset, buf.len(), self.size()))?;
        let end = start
            .checked_add(buf.len())
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| range_error(offset, buf.len(), self.size()))?;
        buf.copy_from_slice(&self.data[start..end]);
        Ok(())
    }
}

/// Source over anything that can seek and read, such as a [`std::fs::File`]
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    size: u64,
}

impl<R: Read + Seek> ReaderSource<R> {
    /// Wrap a reader, measuring its length once up front
    pub fn new(mut reader: R) -> io::Result<Self> {
        let size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(Self { reader, size })
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl ReaderSource<std::fs::File> {
    /// Open a file on disk
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> io::Result<Self> {
        Self::new(std::fs::File::open(path)?)
    }
}

impl<R: Read + Seek> ByteSource for ReaderSource<R> {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        if offset.saturating_add(buf.len() as u64) > self.size {
            return Err(range_error(offset, buf.len(), self.size));
        }
        self.reader.seek(SeekFrom::Start(offset))?;
        self.reader.read_exact(buf)
    }
}

/// A bounded window `[offset, offset + len)` of another source
///
/// Offsets passed to [`ByteSource::read_at`] are relative to the window start;
/// reads that would leave the window fail without touching the inner source.
#[derive(Debug)]
pub struct SubSource<S> {
    inner: S,
    offset: u64,
    len: u64,
}

impl<S: ByteSource> SubSource<S> {
    pub fn new(inner: S, offset: u64, len: u64) -> Self {
        Self { inner, offset, len }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ByteSource> ByteSource for SubSource<S> {
    fn size(&self) -> u64 {
        self.len
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        match offset.checked_add(buf.len() as u64) {
            Some(end) if end <= self.len => {}
            _ => return Err(range_error(offset, buf.len(), self.len)),
        }
        self.inner.read_at(self.offset + offset, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_memory_source_reads() {
        let mut source = MemorySource::new(b"0123456789".to_vec());
        assert_eq!(source.size(), 10);

        let mut buf = [0u8; 4];
        source.read_at(3, &mut buf).unwrap();
        assert_eq!(&buf, b"3456");
    }

    #[test]
    fn test_memory_source_rejects_out_of_range() {
        let mut source = MemorySource::new(b"abc".to_vec());
        let mut buf = [0u8; 2];
        let err = source.read_at(2, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(source.read_at(u64::MAX, &mut buf).is_err());
    }

    #[test]
    fn test_reader_source_over_cursor() {
        let mut source = ReaderSource::new(Cursor::new(b"hello world".to_vec())).unwrap();
        assert_eq!(source.size(), 11);

        let mut buf = [0u8; 5];
        source.read_at(6, &mut buf).unwrap();
        assert_eq!(&buf, b"world");
        assert!(source.read_at(8, &mut buf).is_err());
    }

    #[test]
    fn test_reader_source_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.7\n1 0 obj\n").unwrap();
        file.flush().unwrap();

        let mut source = ReaderSource::open(file.path()).unwrap();
        assert_eq!(source.size(), 17);

        let mut buf = [0u8; 5];
        source.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"%PDF-");
    }

    #[test]
    fn test_sub_source_window() {
        let inner = MemorySource::new(b"....stream data....".to_vec());
        let mut sub = SubSource::new(inner, 4, 11);
        assert_eq!(sub.size(), 11);

        let mut buf = [0u8; 11];
        sub.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"stream data");

        let mut buf = [0u8; 2];
        assert!(sub.read_at(10, &mut buf).is_err());
    }
}
