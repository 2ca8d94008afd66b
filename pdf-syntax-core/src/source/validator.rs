//! Read validation for progressively loaded documents
//!
//! A [`ReadValidator`] sits between the parser and its [`ByteSource`]. When a
//! [`DataAvailability`] is attached, reads of byte ranges that have not been
//! fetched yet fail softly: the validator records that data was unavailable
//! and asks the availability provider to fetch the missing segment. Parsers
//! poll [`ReadValidator::has_read_problems`] once per read session instead of
//! threading the failure through every call.

use super::ByteSource;

const ALIGN_BLOCK: u64 = 512;

/// Reports which byte ranges of a document are resident
pub trait DataAvailability {
    /// Whether all of `[offset, offset + len)` can be read right now
    fn is_data_available(&self, offset: u64, len: u64) -> bool;

    /// Ask for `[offset, offset + len)` to be fetched with priority
    fn request_range(&mut self, offset: u64, len: u64);
}

/// Flags saved by [`ReadValidator::begin_session`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    read_error: bool,
    has_unavailable_data: bool,
}

/// A byte source wrapper that tracks short and unavailable reads
pub struct ReadValidator<S> {
    source: S,
    availability: Option<Box<dyn DataAvailability>>,
    file_size: u64,
    read_error: bool,
    has_unavailable_data: bool,
    whole_file_already_available: bool,
}

impl<S: ByteSource> ReadValidator<S> {
    /// Validator over a fully resident source
    pub fn new(source: S) -> Self {
        let file_size = source.size();
        Self {
            source,
            availability: None,
            file_size,
            read_error: false,
            has_unavailable_data: false,
            whole_file_already_available: false,
        }
    }

    /// Validator that consults `availability` before every read
    pub fn with_availability(source: S, availability: Box<dyn DataAvailability>) -> Self {
        let mut validator = Self::new(source);
        validator.availability = Some(availability);
        validator
    }

    pub fn size(&self) -> u64 {
        self.file_size
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    pub fn read_error(&self) -> bool {
        self.read_error
    }

    pub fn has_unavailable_data(&self) -> bool {
        self.has_unavailable_data
    }

    pub fn has_read_problems(&self) -> bool {
        self.read_error || self.has_unavailable_data
    }

    pub fn reset_errors(&mut self) {
        self.read_error = false;
        self.has_unavailable_data = false;
    }

    /// Start a read session: saves and clears the problem flags
    pub fn begin_session(&mut self) -> SessionState {
        let saved = SessionState {
            read_error: self.read_error,
            has_unavailable_data: self.has_unavailable_data,
        };
        self.reset_errors();
        saved
    }

    /// End a read session: problems seen before the session are merged back
    pub fn end_session(&mut self, saved: SessionState) {
        self.read_error |= saved.read_error;
        self.has_unavailable_data |= saved.has_unavailable_data;
    }

    /// Read `buf.len()` bytes at `offset`
    ///
    /// Returns `false` and raises a problem flag when the range is outside the
    /// file, not yet available, or the source fails.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> bool {
        match offset.checked_add(buf.len() as u64) {
            Some(end) if end <= self.file_size => {}
            _ => return false,
        }

        let len = buf.len() as u64;
        if !self.is_data_range_available(offset, len) {
            self.schedule_download(offset, len);
            return false;
        }

        match self.source.read_at(offset, buf) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!("read of {len} bytes at {offset} failed: {err}");
                self.read_error = true;
                self.schedule_download(offset, len);
                false
            }
        }
    }

    /// Mark every byte as resident, skipping availability checks from now on
    pub fn set_whole_file_available(&mut self) {
        self.whole_file_already_available = true;
    }

    /// Check that `[offset, offset + len)` is resident, requesting it if not
    ///
    /// The check is padded by half an alignment block so that the following
    /// tokenizer reads do not immediately hit a missing segment.
    pub fn check_data_range_and_request_if_unavailable(&mut self, offset: u64, len: u64) -> bool {
        if offset > self.file_size {
            return true;
        }

        let end = offset
            .saturating_add(len)
            .saturating_add(ALIGN_BLOCK / 2)
            .min(self.file_size);
        if !self.is_data_range_available(offset, end - offset) {
            self.schedule_download(offset, len);
            return false;
        }
        true
    }

    pub fn check_whole_file_and_request_if_unavailable(&mut self) -> bool {
        if self.whole_file_already_available || self.availability.is_none() {
            return true;
        }

        let size = self.file_size;
        let available = self
            .availability
            .as_ref()
            .is_some_and(|availability| availability.is_data_available(0, size));
        if available {
            self.whole_file_already_available = true;
            return true;
        }

        self.schedule_download(0, size);
        false
    }

    fn is_data_range_available(&self, offset: u64, len: u64) -> bool {
        if self.whole_file_already_available {
            return true;
        }
        match &self.availability {
            Some(availability) => availability.is_data_available(offset, len),
            None => true,
        }
    }

    fn schedule_download(&mut self, offset: u64, len: u64) {
        self.has_unavailable_data = true;
        if len == 0 {
            return;
        }

        let file_size = self.file_size;
        let Some(availability) = self.availability.as_mut() else {
            return;
        };

        let start = offset / ALIGN_BLOCK * ALIGN_BLOCK;
        let end = offset
            .saturating_add(len)
            .div_ceil(ALIGN_BLOCK)
            .saturating_mul(ALIGN_BLOCK)
            .min(file_size);
        if end > start {
            tracing::trace!("requesting segment [{start}, {end})");
            availability.request_range(start, end - start);
        }
    }
}

impl<S> std::fmt::Debug for ReadValidator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadValidator")
            .field("file_size", &self.file_size)
            .field("has_availability", &self.availability.is_some())
            .field("read_error", &self.read_error)
            .field("has_unavailable_data", &self.has_unavailable_data)
            .field(
                "whole_file_already_available",
                &self.whole_file_already_available,
            )
            .finish()
    }
}
