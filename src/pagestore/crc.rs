//! CRC slot helpers (spec §3, §6, §9): `PageIO.getCrc`/`setCrc` as
//! consumed by the read/write paths.
//!
//! The page-layout collaborator that owns the slot's exact location is
//! out of scope for this crate (§1); since none is present here the
//! slot is fixed at the first four bytes of every page, little-endian
//! (see `DESIGN.md`, "CRC slot placement").

pub const CRC_SLOT_LEN: usize = 4;

/// Read the CRC value currently stored in a page buffer's slot.
pub fn crc(buf: &[u8]) -> u32 {
    u32::from_le_bytes(buf[..CRC_SLOT_LEN].try_into().unwrap())
}

/// Write a CRC value into a page buffer's slot.
pub fn set_crc(buf: &mut [u8], value: u32) {
    buf[..CRC_SLOT_LEN].copy_from_slice(&value.to_le_bytes());
}

/// Zero the CRC slot in place.
pub fn zero_crc(buf: &mut [u8]) {
    buf[..CRC_SLOT_LEN].fill(0);
}

/// CRC-32 over the whole page buffer, computed with the slot zeroed.
/// Callers pass a buffer that already has its slot zeroed (or call
/// this before writing the slot).
pub fn compute(buf: &[u8]) -> u32 {
    crc32fast::hash(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_round_trips() {
        let mut buf = vec![0xABu8; 64];
        zero_crc(&mut buf);
        assert_eq!(crc(&buf), 0);
        set_crc(&mut buf, 0xdead_beef);
        assert_eq!(crc(&buf), 0xdead_beef);
    }

    #[test]
    fn compute_is_stable_for_same_input() {
        let buf = vec![0x42u8; 128];
        assert_eq!(compute(&buf), compute(&buf));
    }
}
