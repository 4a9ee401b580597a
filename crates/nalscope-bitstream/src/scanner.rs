//! Start code scanning over a buffered byte source
//!
//! [`NalUnitScanner`] keeps a read-ahead window over a [`ByteSource`] and
//! walks it for `00 00 01` start code prefixes. Unconsumed bytes survive
//! every refill, so start codes and payloads spanning a window boundary are
//! found exactly once.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::Result;
use crate::hevc::nal::NalHeader;

/// Default read-ahead window in bytes
pub const BUFFER_SIZE: usize = 40960;

/// Default number of payload bytes kept per unit
pub const MAX_PAYLOAD: usize = 8192;

const START_CODE: [u8; 3] = [0, 0, 1];

/// Random access byte supplier
pub trait ByteSource {
    /// Read up to `length` bytes at `start`; fewer (or none) at the end of the data
    fn read_bytes(&self, start: u64, length: usize) -> Result<Bytes>;

    /// Total size when known
    fn size(&self) -> Option<u64>;
}

impl ByteSource for [u8] {
    fn read_bytes(&self, start: u64, length: usize) -> Result<Bytes> {
        let len = self.len() as u64;
        if start >= len {
            return Ok(Bytes::new());
        }
        let begin = start as usize;
        let end = begin.saturating_add(length).min(self.len());
        Ok(Bytes::copy_from_slice(&self[begin..end]))
    }

    fn size(&self) -> Option<u64> {
        Some(self.len() as u64)
    }
}

impl ByteSource for Vec<u8> {
    fn read_bytes(&self, start: u64, length: usize) -> Result<Bytes> {
        self.as_slice().read_bytes(start, length)
    }

    fn size(&self) -> Option<u64> {
        Some(self.len() as u64)
    }
}

impl ByteSource for Bytes {
    fn read_bytes(&self, start: u64, length: usize) -> Result<Bytes> {
        let len = self.len() as u64;
        if start >= len {
            return Ok(Bytes::new());
        }
        let begin = start as usize;
        let end = begin.saturating_add(length).min(self.len());
        Ok(self.slice(begin..end))
    }

    fn size(&self) -> Option<u64> {
        Some(self.len() as u64)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &S {
    fn read_bytes(&self, start: u64, length: usize) -> Result<Bytes> {
        (**self).read_bytes(start, length)
    }

    fn size(&self) -> Option<u64> {
        (**self).size()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for std::sync::Arc<S> {
    fn read_bytes(&self, start: u64, length: usize) -> Result<Bytes> {
        (**self).read_bytes(start, length)
    }

    fn size(&self) -> Option<u64> {
        (**self).size()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Looking for the next start code
    Searching,
    /// Positioned on the first payload byte of a unit
    UnitFound,
}

/// Payload of one discovered unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUnit {
    /// File offset of the `00 00 01` start code prefix
    pub position: u64,
    /// Escaped payload starting with the NAL header
    pub data: Bytes,
    /// Set when the payload was cut at the configured maximum
    pub truncated: bool,
}

impl RawUnit {
    /// Classify the unit from its two byte header
    pub fn header(&self) -> Result<NalHeader> {
        NalHeader::from_bytes(&self.data)
    }
}

fn find_start_code(data: &[u8]) -> Option<usize> {
    data.windows(START_CODE.len())
        .position(|window| window == START_CODE)
}

/// Streaming start code scanner
pub struct NalUnitScanner<S> {
    source: S,
    buffer: BytesMut,
    /// File offset of `buffer[0]`
    buffer_start: u64,
    pos: usize,
    eof: bool,
    state: ScanState,
    unit_position: Option<u64>,
    buffer_size: usize,
    max_payload: usize,
}

impl<S: ByteSource> NalUnitScanner<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: BytesMut::with_capacity(BUFFER_SIZE),
            buffer_start: 0,
            pos: 0,
            eof: false,
            state: ScanState::Searching,
            unit_position: None,
            buffer_size: BUFFER_SIZE,
            max_payload: MAX_PAYLOAD,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(START_CODE.len());
        self
    }

    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload.max(2);
        self
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Position of the start code of the current unit
    pub fn unit_position(&self) -> Option<u64> {
        self.unit_position
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Rewind to the start of the source
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.buffer_start = 0;
        self.pos = 0;
        self.eof = false;
        self.state = ScanState::Searching;
        self.unit_position = None;
    }

    /// Drop consumed bytes and append the next window from the source.
    /// Returns false once the source is exhausted.
    fn refill(&mut self) -> Result<bool> {
        if self.eof {
            return Ok(false);
        }
        if self.pos > 0 {
            self.buffer.advance(self.pos);
            self.buffer_start += self.pos as u64;
            self.pos = 0;
        }

        let offset = self.buffer_start + self.buffer.len() as u64;
        let chunk = self.source.read_bytes(offset, self.buffer_size)?;
        if chunk.is_empty() {
            self.eof = true;
            return Ok(false);
        }

        #[cfg(feature = "tracing")]
        tracing::trace!("Read {} bytes at offset {}", chunk.len(), offset);

        self.buffer.extend_from_slice(&chunk);
        Ok(true)
    }

    /// Advance past the next start code. Returns false only at the end of the source.
    pub fn seek_to_next_unit(&mut self) -> Result<bool> {
        self.state = ScanState::Searching;
        loop {
            if let Some(offset) = find_start_code(&self.buffer[self.pos..]) {
                self.unit_position = Some(self.buffer_start + (self.pos + offset) as u64);
                self.pos += offset + START_CODE.len();
                self.state = ScanState::UnitFound;
                return Ok(true);
            }
            // The last two bytes may begin a start code completed by the next window
            let keep = (self.buffer.len() - self.pos).min(START_CODE.len() - 1);
            self.pos = self.buffer.len() - keep;
            if !self.refill()? {
                self.unit_position = None;
                return Ok(false);
            }
        }
    }

    /// Read the payload of the current unit, up to the next start code or the end of the source
    ///
    /// Trailing zero bytes belong to the next start code (or are stream
    /// padding) and are removed from complete units.
    pub fn read_unit_payload(&mut self) -> Result<Option<RawUnit>> {
        if self.state != ScanState::UnitFound {
            return Ok(None);
        }
        let position = self.unit_position.unwrap_or(self.buffer_start + self.pos as u64);

        loop {
            let window = &self.buffer[self.pos..];
            let next = find_start_code(window);

            let (len, advance, truncated) = match next {
                Some(offset) if offset <= self.max_payload => (offset, offset, false),
                Some(_) => (self.max_payload, self.max_payload, true),
                None if window.len() >= self.max_payload + START_CODE.len() => {
                    (self.max_payload, self.max_payload, true)
                }
                None => {
                    if self.refill()? {
                        continue;
                    }
                    let len = self.buffer.len() - self.pos;
                    (len, len, false)
                }
            };

            let mut payload = &self.buffer[self.pos..self.pos + len];
            if !truncated {
                while let [rest @ .., 0] = payload {
                    payload = rest;
                }
            }
            let data = Bytes::copy_from_slice(payload);
            self.pos += advance;
            self.state = ScanState::Searching;

            #[cfg(feature = "tracing")]
            tracing::debug!(
                "Unit at {}: {} bytes{}",
                position,
                data.len(),
                if truncated { " (truncated)" } else { "" }
            );

            return Ok(Some(RawUnit {
                position,
                data,
                truncated,
            }));
        }
    }

    /// Find and read the next unit
    pub fn next_unit(&mut self) -> Result<Option<RawUnit>> {
        if !self.seek_to_next_unit()? {
            return Ok(None);
        }
        self.read_unit_payload()
    }
}

impl<S: ByteSource> Iterator for NalUnitScanner<S> {
    type Item = Result<RawUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_unit().transpose()
    }
}
