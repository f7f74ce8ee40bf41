//! Error taxonomy for the page file (spec §7): integrity violations
//! and I/O failures are surfaced to the caller; everything else the
//! page file does either succeeds or is a programmer error
//! (`assert!`, not a `Result`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PageStoreError {
    #[error("page file integrity violation at offset {offset:?}: {reason}")]
    Integrity {
        reason: IntegrityReason,
        offset: Option<u64>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PageStoreError {
    pub(crate) fn integrity(reason: IntegrityReason) -> Self {
        Self::Integrity {
            reason,
            offset: None,
        }
    }

    pub(crate) fn integrity_at(reason: IntegrityReason, offset: u64) -> Self {
        Self::Integrity {
            reason,
            offset: Some(offset),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityReason {
    #[error("bad header signature: expected {expected:#x}, found {found:#x}")]
    BadSignature { expected: u64, found: u64 },

    #[error("bad header version: expected {expected}, found {found}")]
    BadVersion { expected: u32, found: u32 },

    #[error("page type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: u8, found: u8 },

    #[error("page size mismatch: expected {expected}, found {found}")]
    PageSizeMismatch { expected: u32, found: u32 },

    #[error("file length {len} is not aligned to the header and page size")]
    MisalignedLength { len: u64 },

    #[error("page CRC mismatch: expected {expected:#x}, found {found:#x}")]
    CrcMismatch { expected: u32, found: u32 },
}
