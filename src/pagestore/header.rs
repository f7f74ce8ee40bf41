//! The fixed 17-byte file header (spec §3, §4.B1): signature, version,
//! page type, and page size, all little-endian.

use std::io::{self, Read, Write};

use super::error::IntegrityReason;

pub const SIGNATURE: u64 = 0xF19A_C4FE_60C5_30B8;
pub const VERSION: u32 = 1;

/// `8 (signature) + 4 (version) + 1 (type) + 4 (page_size)`.
pub const HEADER_SIZE: u64 = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub signature: u64,
    pub version: u32,
    pub page_type: u8,
    pub page_size: u32,
}

impl FileHeader {
    pub fn new(page_type: u8, page_size: u32) -> Self {
        Self {
            signature: SIGNATURE,
            version: VERSION,
            page_type,
            page_size,
        }
    }

    pub fn to_bytes(self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        buf[0..8].copy_from_slice(&self.signature.to_le_bytes());
        buf[8..12].copy_from_slice(&self.version.to_le_bytes());
        buf[12] = self.page_type;
        buf[13..17].copy_from_slice(&self.page_size.to_le_bytes());
        buf
    }

    pub fn read_from(r: &mut impl Read) -> io::Result<Self> {
        let mut buf = [0u8; HEADER_SIZE as usize];
        r.read_exact(&mut buf)?;
        Ok(Self {
            signature: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            version: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            page_type: buf[12],
            page_size: u32::from_le_bytes(buf[13..17].try_into().unwrap()),
        })
    }

    pub fn write_to(self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&self.to_bytes())
    }

    /// Verify this header against the configured `(type, page_size)`,
    /// surfacing the first mismatch found.
    pub fn verify(&self, expected_type: u8, expected_page_size: u32) -> Result<(), IntegrityReason> {
        if self.signature != SIGNATURE {
            return Err(IntegrityReason::BadSignature {
                expected: SIGNATURE,
                found: self.signature,
            });
        }
        if self.version != VERSION {
            return Err(IntegrityReason::BadVersion {
                expected: VERSION,
                found: self.version,
            });
        }
        if self.page_type != expected_type {
            return Err(IntegrityReason::TypeMismatch {
                expected: expected_type,
                found: self.page_type,
            });
        }
        if self.page_size != expected_page_size {
            return Err(IntegrityReason::PageSizeMismatch {
                expected: expected_page_size,
                found: self.page_size,
            });
        }
        Ok(())
    }
}
