//! Page format helpers over raw 4096-byte buffers.
//!
//! Page layout:
//! ```text
//! [0..8]    page_number: u64 (little-endian)
//! [8..10]   row_count: u16 (little-endian)
//! [10..26]  md5 checksum of the payload
//! [26..4096] row payload
//! ```
//!
//! The checksum covers only the payload region; rows never straddle page
//! boundaries.

use md5::{Digest, Md5};

use crate::error::StorageError;
use crate::types::{PAGE_HEADER_SIZE, PAGE_SIZE, PageId};

/// A raw page buffer.
pub type PageBuf = [u8; PAGE_SIZE];

/// Read the page number from a page header.
pub fn page_number(buf: &PageBuf) -> u64 {
    u64::from_le_bytes(buf[0..8].try_into().unwrap())
}

/// Read the row count from a page header.
pub fn row_count(buf: &PageBuf) -> u16 {
    u16::from_le_bytes(buf[8..10].try_into().unwrap())
}

/// Compute the MD5 checksum of the payload region `[26, 4096)`.
pub fn compute_checksum(buf: &PageBuf) -> [u8; 16] {
    Md5::digest(&buf[PAGE_HEADER_SIZE..]).into()
}

/// Write `page_number` and `row_count` into the header, then compute the
/// payload checksum and store it at `[10, 26)`. Called before every disk
/// write.
pub fn finalize(buf: &mut PageBuf, page_number: PageId, row_count: u16) {
    buf[0..8].copy_from_slice(&page_number.to_le_bytes());
    buf[8..10].copy_from_slice(&row_count.to_le_bytes());
    let checksum = compute_checksum(buf);
    buf[10..26].copy_from_slice(&checksum);
}

/// Verify the stored payload checksum against a recomputed one.
pub fn verify(buf: &PageBuf, page: PageId) -> Result<(), StorageError> {
    let computed = compute_checksum(buf);
    if buf[10..26] != computed {
        return Err(StorageError::CorruptPage {
            page,
            detail: "payload checksum mismatch".to_string(),
        });
    }
    Ok(())
}

/// Build a finalized empty page (zero rows, zero payload).
pub fn empty_page(page_number: PageId) -> Box<PageBuf> {
    let mut buf = Box::new([0u8; PAGE_SIZE]);
    finalize(&mut buf, page_number, 0);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_writes_header() {
        let mut buf = [0u8; PAGE_SIZE];
        finalize(&mut buf, 7, 3);
        assert_eq!(page_number(&buf), 7);
        assert_eq!(row_count(&buf), 3);
        assert!(verify(&buf, 7).is_ok());
    }

    #[test]
    fn test_checksum_detects_payload_corruption() {
        let mut buf = [0u8; PAGE_SIZE];
        buf[100] = 0xAB;
        finalize(&mut buf, 0, 1);
        buf[100] ^= 0xFF;
        match verify(&buf, 0) {
            Err(StorageError::CorruptPage { page: 0, .. }) => {}
            other => panic!("expected CorruptPage, got {other:?}"),
        }
    }

    #[test]
    fn test_checksum_ignores_header_bytes() {
        let mut buf = [0u8; PAGE_SIZE];
        finalize(&mut buf, 1, 0);
        // Flipping header bytes outside the checksum field does not
        // invalidate the payload checksum.
        buf[0] ^= 0xFF;
        assert!(verify(&buf, 1).is_ok());
    }

    #[test]
    fn test_empty_page_verifies() {
        let buf = empty_page(4);
        assert_eq!(page_number(&buf), 4);
        assert_eq!(row_count(&buf), 0);
        assert!(verify(&buf, 4).is_ok());
    }
}
