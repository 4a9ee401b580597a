//! Forward bit cursor over RBSP data
//!
//! The cursor operates on the logical (de-escaped) byte stream: emulation
//! prevention bytes are removed when the cursor is constructed, so every
//! position and byte count it reports refers to RBSP bytes.
//!
//! Every read returns the decoded value together with the exact bit string
//! that was consumed, which the symbol reader records in the syntax tree.

use crate::error::{BitstreamError, Result};

/// Longest Exp-Golomb prefix accepted before the code is considered malformed
pub const MAX_LEADING_ZEROS: u32 = 32;

/// Position of the cursor in the logical stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BitPosition {
    /// Byte offset
    pub byte: usize,
    /// Bit offset inside the byte (0 is the most significant bit)
    pub bit: u8,
}

impl BitPosition {
    /// Total number of bits before this position
    pub fn in_bits(&self) -> usize {
        self.byte * 8 + self.bit as usize
    }
}

/// Remove emulation prevention bytes (0x03) from NAL unit data
///
/// Inside a NAL unit the byte sequence 0x00 0x00 0x03 marks an inserted
/// 0x03 that prevents start code emulation. Returns the RBSP and the number
/// of bytes removed.
pub fn remove_emulation_prevention(data: &[u8]) -> (Vec<u8>, usize) {
    let mut result = Vec::with_capacity(data.len());
    let mut zeros = 0usize;
    let mut removed = 0usize;

    for &byte in data {
        if zeros >= 2 && byte == 0x03 {
            zeros = 0;
            removed += 1;
            continue;
        }
        if byte == 0x00 {
            zeros += 1;
        } else {
            zeros = 0;
        }
        result.push(byte);
    }

    (result, removed)
}

/// Exclusive forward bit reader
#[derive(Debug, Clone)]
pub struct BitCursor {
    data: Vec<u8>,
    byte_pos: usize,
    bit_pos: u8,
    emulation_prevention_bytes: usize,
}

impl BitCursor {
    /// Create a cursor over escaped NAL unit data
    pub fn new(data: &[u8]) -> Self {
        let (rbsp, removed) = remove_emulation_prevention(data);
        Self {
            data: rbsp,
            byte_pos: 0,
            bit_pos: 0,
            emulation_prevention_bytes: removed,
        }
    }

    /// Create a cursor over data that is already de-escaped
    pub fn from_rbsp(rbsp: Vec<u8>) -> Self {
        Self {
            data: rbsp,
            byte_pos: 0,
            bit_pos: 0,
            emulation_prevention_bytes: 0,
        }
    }

    /// Number of emulation prevention bytes removed from the input
    pub fn emulation_prevention_bytes(&self) -> usize {
        self.emulation_prevention_bytes
    }

    /// Length of the logical stream in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> BitPosition {
        BitPosition {
            byte: self.byte_pos,
            bit: self.bit_pos,
        }
    }

    /// Move the cursor to an earlier (or later) position, e.g. to retry a parse
    pub fn seek(&mut self, position: BitPosition) -> Result<()> {
        let total = self.data.len() * 8;
        if position.bit > 7 || position.in_bits() > total {
            return Err(BitstreamError::OutOfData {
                requested: position.in_bits(),
                remaining: total,
            });
        }
        self.byte_pos = position.byte;
        self.bit_pos = position.bit;
        Ok(())
    }

    pub fn bits_left(&self) -> usize {
        if self.byte_pos >= self.data.len() {
            return 0;
        }
        (self.data.len() - self.byte_pos) * 8 - self.bit_pos as usize
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.bit_pos == 0
    }

    fn next_bit(&mut self) -> Result<bool> {
        if self.byte_pos >= self.data.len() {
            return Err(BitstreamError::OutOfData {
                requested: 1,
                remaining: 0,
            });
        }

        let bit = (self.data[self.byte_pos] >> (7 - self.bit_pos)) & 1;
        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }

        Ok(bit == 1)
    }

    /// Read `n` bits (0..=64) as an unsigned value, MSB first
    pub fn read_bits(&mut self, n: usize) -> Result<(u64, String)> {
        if n > 64 {
            return Err(BitstreamError::InvalidWidth(n));
        }
        let remaining = self.bits_left();
        if n > remaining {
            return Err(BitstreamError::OutOfData {
                requested: n,
                remaining,
            });
        }

        let mut value = 0u64;
        let mut code = String::with_capacity(n);
        for _ in 0..n {
            let bit = self.next_bit()?;
            value = (value << 1) | u64::from(bit);
            code.push(if bit { '1' } else { '0' });
        }

        Ok((value, code))
    }

    /// Read an unsigned Exp-Golomb coded value (ue(v))
    pub fn read_ue(&mut self) -> Result<(u64, String)> {
        let mut code = String::new();
        let mut leading_zeros = 0u32;

        loop {
            let remaining = self.bits_left();
            if remaining == 0 {
                return Err(BitstreamError::OutOfData {
                    requested: leading_zeros as usize + 1,
                    remaining,
                });
            }
            if self.next_bit()? {
                code.push('1');
                break;
            }
            code.push('0');
            leading_zeros += 1;
            if leading_zeros > MAX_LEADING_ZEROS {
                return Err(BitstreamError::MalformedCode {
                    max_leading_zeros: MAX_LEADING_ZEROS,
                });
            }
        }

        if leading_zeros == 0 {
            return Ok((0, code));
        }

        let (suffix, suffix_code) = self.read_bits(leading_zeros as usize)?;
        code.push_str(&suffix_code);
        Ok(((1u64 << leading_zeros) - 1 + suffix, code))
    }

    /// Read a signed Exp-Golomb coded value (se(v))
    pub fn read_se(&mut self) -> Result<(i64, String)> {
        let (code_num, code) = self.read_ue()?;
        Ok((se_from_code_num(code_num), code))
    }

    /// Read `n` whole bytes; the cursor must be byte aligned
    pub fn read_bytes(&mut self, n: usize) -> Result<(Vec<u8>, String)> {
        if !self.is_byte_aligned() {
            return Err(BitstreamError::NotByteAligned);
        }
        let remaining = self.bits_left();
        if n * 8 > remaining {
            return Err(BitstreamError::OutOfData {
                requested: n * 8,
                remaining,
            });
        }

        let bytes = self.data[self.byte_pos..self.byte_pos + n].to_vec();
        self.byte_pos += n;

        let code = bytes.iter().map(|b| format!("{:08b}", b)).collect();
        Ok((bytes, code))
    }
}

/// Map an Exp-Golomb code number to its signed value (1 -> 1, 2 -> -1, 3 -> 2, ...)
pub fn se_from_code_num(code_num: u64) -> i64 {
    if code_num % 2 == 1 {
        ((code_num + 1) / 2) as i64
    } else {
        -((code_num / 2) as i64)
    }
}
