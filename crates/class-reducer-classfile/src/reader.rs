//! Big-endian cursor used by every decoder in this crate, plus the matching
//! write helpers.

use crate::error::{ClassFileError, Result};

/// Bounds-checked big-endian reader over a byte slice.
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ClassFileError::UnexpectedEof {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self) -> Result<u64> {
        let hi = self.u32()? as u64;
        let lo = self.u32()? as u64;
        Ok((hi << 32) | lo)
    }
}

pub(crate) fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub(crate) fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// Read a big-endian `u16` at `offset`, as used by instruction operands.
pub fn read_u16_at(bytes: &[u8], offset: usize) -> Result<u16> {
    match bytes.get(offset..offset + 2) {
        Some(b) => Ok(u16::from_be_bytes([b[0], b[1]])),
        None => Err(ClassFileError::UnexpectedEof {
            offset,
            needed: offset + 2 - bytes.len().min(offset + 2),
        }),
    }
}

/// Read a big-endian `i32` at `offset`.
pub fn read_i32_at(bytes: &[u8], offset: usize) -> Result<i32> {
    match bytes.get(offset..offset + 4) {
        Some(b) => Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]])),
        None => Err(ClassFileError::UnexpectedEof {
            offset,
            needed: offset + 4 - bytes.len().min(offset + 4),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_big_endian() {
        let mut r = ByteReader::new(&[0xca, 0xfe, 0xba, 0xbe, 0x00, 0x34]);
        assert_eq!(r.u32().unwrap(), 0xcafe_babe);
        assert_eq!(r.u16().unwrap(), 52);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_eof_reports_offset() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        r.u16().unwrap();
        let err = r.u32().unwrap_err();
        assert_eq!(
            err,
            ClassFileError::UnexpectedEof {
                offset: 2,
                needed: 3
            }
        );
    }

    #[test]
    fn test_read_u16_at_out_of_bounds() {
        assert!(read_u16_at(&[0, 1], 1).is_err());
        assert_eq!(read_u16_at(&[0, 1, 2], 1).unwrap(), 0x0102);
    }
}
