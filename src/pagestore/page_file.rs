//! The page file itself (spec §4.B1–§4.B5): open/init/check/truncate/
//! stop, atomic page allocation, checksummed read/write, sync.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use super::crc;
use super::error::{IntegrityReason, PageStoreError};
use super::header::{FileHeader, HEADER_SIZE};

/// An opaque logical page identifier. `pageIndex(pageId)` is the
/// identity function here: the page-layout collaborator that would
/// otherwise encode extra bits into this value is out of scope for
/// this crate (§1), so the simplest faithful mapping is used (see
/// `DESIGN.md`, "page id format").
pub type PageId = u64;

#[derive(Debug, Clone)]
pub struct PageStoreConfig {
    pub path: PathBuf,
    pub page_type: u8,
    pub page_size: u32,
    /// Skip CRC computation/verification entirely (used by
    /// collaborators that already checksum at a higher layer).
    pub skip_crc: bool,
}

impl PageStoreConfig {
    pub fn new(path: impl Into<PathBuf>, page_type: u8, page_size: u32) -> Self {
        Self {
            path: path.into(),
            page_type,
            page_size,
            skip_crc: false,
        }
    }
}

/// Fixed-page, append-allocated single file. See module docs for the
/// on-disk layout.
pub struct PageFile {
    path: PathBuf,
    page_type: u8,
    page_size: u32,
    skip_crc: bool,

    file: File,

    /// Next free byte offset from the start of the file, inclusive of
    /// the header (i.e. `HEADER_SIZE + pageSize` right after the
    /// super page is reserved).
    allocated: AtomicU64,
    inited: AtomicBool,
    recover: AtomicBool,
    tag: AtomicI32,

    /// File-lifecycle gate: write mode for init/stop/truncate/recover
    /// toggles/sync, read mode for concurrent page writes. Reads take
    /// no lock at all (§5).
    lock: RwLock<()>,
    /// Extra monitor serializing concurrent first-`ensure()` calls
    /// (§5), on top of the double-checked flag.
    init_lock: Mutex<()>,
}

impl PageFile {
    pub fn open(config: PageStoreConfig) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&config.path)?;
        Ok(Self {
            path: config.path,
            page_type: config.page_type,
            page_size: config.page_size,
            skip_crc: config.skip_crc,
            file,
            allocated: AtomicU64::new(0),
            inited: AtomicBool::new(false),
            recover: AtomicBool::new(false),
            tag: AtomicI32::new(0),
            lock: RwLock::new(()),
            init_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn tag(&self) -> i32 {
        self.tag.load(Ordering::Acquire)
    }

    pub fn is_initialized(&self) -> bool {
        self.inited.load(Ordering::Acquire)
    }

    /// True iff the file exists and is longer than the header.
    pub fn exists(&self) -> io::Result<bool> {
        Ok(self.file.metadata()?.len() > HEADER_SIZE)
    }

    /// `pageIndex(pageId) · pageSize + HEADER_SIZE`.
    pub fn page_offset(&self, page_id: PageId) -> u64 {
        page_id * self.page_size as u64 + HEADER_SIZE
    }

    /// `allocated / pageSize` (0 before init). Note this is a literal
    /// reading of the spec's formula: since `HEADER_SIZE < pageSize`
    /// for any realistic page size, integer division absorbs the
    /// header bytes exactly, so this yields the page count including
    /// the reserved super page.
    pub fn pages(&self) -> u64 {
        if !self.is_initialized() {
            return 0;
        }
        self.allocated.load(Ordering::Acquire) / self.page_size as u64
    }

    /// Lazy init, double-checked under the write lock and additionally
    /// serialized by `init_lock` to collapse concurrent first calls
    /// into one winner (§5).
    pub fn ensure(&self) -> Result<(), PageStoreError> {
        if self.is_initialized() {
            return Ok(());
        }
        let _serialize = self.init_lock.lock();
        if self.is_initialized() {
            return Ok(());
        }
        let _guard = self.lock.write();
        let allocated = self.init_locked()?;
        self.allocated.store(allocated, Ordering::Release);
        self.inited.store(true, Ordering::Release);
        Ok(())
    }

    fn init_locked(&self) -> Result<u64, PageStoreError> {
        let len = self.file.metadata()?.len();
        if len == 0 {
            let header = FileHeader::new(self.page_type, self.page_size);
            self.file.write_at(&header.to_bytes(), 0)?;
            Ok(HEADER_SIZE + self.page_size as u64)
        } else {
            self.check_file_locked(len)
        }
    }

    /// Verify the on-disk header and length against this file's
    /// configured `(type, page_size)`. A header-only file is treated
    /// as having the super page reserved (it just hasn't been written
    /// yet); everything else asserts exact page alignment.
    fn check_file_locked(&self, len: u64) -> Result<u64, PageStoreError> {
        let mut buf = [0u8; HEADER_SIZE as usize];
        self.file.read_exact_at(&mut buf, 0)?;
        let header =
            FileHeader::read_from(&mut io::Cursor::new(buf)).map_err(PageStoreError::Io)?;
        header
            .verify(self.page_type, self.page_size)
            .map_err(PageStoreError::integrity)?;

        if len == HEADER_SIZE {
            return Ok(HEADER_SIZE + self.page_size as u64);
        }

        let body = len - HEADER_SIZE;
        if body % self.page_size as u64 != 0 {
            return Err(PageStoreError::integrity(IntegrityReason::MisalignedLength {
                len,
            }));
        }
        Ok(len)
    }

    /// Atomically reserve the next page and return its logical id.
    pub fn allocate_page(&self) -> Result<PageId, PageStoreError> {
        self.ensure()?;
        let offset = self.allocated.fetch_add(self.page_size as u64, Ordering::SeqCst);
        Ok(offset / self.page_size as u64)
    }

    /// Read a page's contents into `buf` (must be exactly `page_size`
    /// bytes). Lockless with respect to writes: relies on positional
    /// I/O rather than a shared file cursor.
    pub fn read(&self, page_id: PageId, buf: &mut [u8], keep_crc: bool) -> Result<(), PageStoreError> {
        assert_eq!(buf.len(), self.page_size as usize, "page buffer must equal page_size");
        let off = self.page_offset(page_id);

        if !read_exact_or_empty(&self.file, buf, off)? {
            buf.fill(0);
            return Ok(());
        }

        let saved_crc = crc::crc(buf);
        crc::zero_crc(buf);

        if !self.skip_crc {
            let current = crc::compute(buf);
            if saved_crc != current {
                return Err(PageStoreError::integrity_at(
                    IntegrityReason::CrcMismatch {
                        expected: saved_crc,
                        found: current,
                    },
                    off,
                ));
            }
        }

        if keep_crc {
            crc::set_crc(buf, saved_crc);
        }
        Ok(())
    }

    /// Write a page's contents from `buf` (must be exactly `page_size`
    /// bytes). `buf`'s CRC slot is cleared on return, matching the
    /// "caller must observe a zero CRC post-write" contract.
    pub fn write(&self, page_id: PageId, buf: &mut [u8], tag: i32) -> Result<(), PageStoreError> {
        assert_eq!(buf.len(), self.page_size as usize, "page buffer must equal page_size");
        let _guard = self.lock.read();

        if tag < self.tag.load(Ordering::Acquire) {
            // Stale writer from before a truncate: silently drop.
            return Ok(());
        }

        let off = self.page_offset(page_id);
        if !self.recover.load(Ordering::Acquire) {
            let allocated = self.allocated.load(Ordering::Acquire);
            assert!(
                off + self.page_size as u64 <= allocated + HEADER_SIZE,
                "write offset {off} exceeds allocated bound {allocated}"
            );
        }

        crc::zero_crc(buf);
        if !self.skip_crc {
            let computed = crc::compute(buf);
            crc::set_crc(buf, computed);
        }

        self.file.write_at(buf, off)?;
        crc::zero_crc(buf);
        Ok(())
    }

    /// Force the channel with `metadata=false` (data only).
    pub fn sync(&self) -> Result<(), PageStoreError> {
        let _guard = self.lock.write();
        self.file.sync_data()?;
        Ok(())
    }

    /// Read up to `HEADER_SIZE` bytes of the header into the caller's
    /// buffer. Short reads at EOF are tolerated.
    pub fn read_header(&self, buf: &mut [u8]) -> io::Result<usize> {
        let want = buf.len().min(HEADER_SIZE as usize);
        match self.file.read_at(&mut buf[..want], 0) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Stop the file: sync, and optionally delete it from disk.
    pub fn stop(&self, clean_file: bool) -> Result<(), PageStoreError> {
        let _guard = self.lock.write();
        if self.is_initialized() {
            self.file.sync_all()?;
            if clean_file {
                std::fs::remove_file(&self.path)?;
            }
            self.inited.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    /// Reset the file to empty and rewrite the header under a new
    /// tag epoch. Writers carrying an older tag become no-ops.
    pub fn truncate(&self, new_tag: i32) -> Result<(), PageStoreError> {
        let _guard = self.lock.write();
        if !self.is_initialized() {
            return Ok(());
        }
        self.tag.store(new_tag, Ordering::SeqCst);
        self.file.set_len(0)?;
        let header = FileHeader::new(self.page_type, self.page_size);
        self.file.write_at(&header.to_bytes(), 0)?;
        self.allocated
            .store(HEADER_SIZE + self.page_size as u64, Ordering::SeqCst);
        Ok(())
    }

    pub fn begin_recover(&self) {
        self.recover.store(true, Ordering::SeqCst);
    }

    /// Toggle recovery mode off and, if initialized, reconcile
    /// `allocated` to the file's current size.
    pub fn finish_recover(&self) -> Result<(), PageStoreError> {
        let _guard = self.lock.write();
        self.recover.store(false, Ordering::SeqCst);
        if self.is_initialized() {
            let len = self.file.metadata()?.len();
            self.allocated.store(len, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Read `buf.len()` bytes from `offset`, looping over short reads.
/// Returns `Ok(false)` if the very first read hits EOF (unwritten
/// page); returns an error if EOF is hit after some bytes were
/// already read (genuine corruption/truncation, not an unwritten
/// page).
fn read_exact_or_empty(file: &File, buf: &mut [u8], mut offset: u64) -> io::Result<bool> {
    let mut total = 0usize;
    while total < buf.len() {
        match file.read_at(&mut buf[total..], offset) {
            Ok(0) => {
                if total == 0 {
                    return Ok(false);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "page read hit EOF after partial read",
                ));
            }
            Ok(n) => {
                total += n;
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_file(dir: &Path, page_size: u32) -> PageFile {
        PageFile::open(PageStoreConfig::new(dir.join("store.bin"), 1, page_size)).unwrap()
    }

    #[test]
    fn fresh_file_reserves_super_page_on_ensure() {
        let dir = tempdir().unwrap();
        let pf = open_file(dir.path(), 256);
        pf.ensure().unwrap();
        assert_eq!(pf.pages(), 1);
    }

    #[test]
    fn allocate_then_round_trip_a_page() {
        let dir = tempdir().unwrap();
        let pf = open_file(dir.path(), 256);
        let page_id = pf.allocate_page().unwrap();
        assert_eq!(page_id, 1); // index 0 is the super page

        let mut write_buf = vec![0xABu8; 256];
        pf.write(page_id, &mut write_buf, 0).unwrap();
        assert_eq!(crc::crc(&write_buf), 0, "caller's buffer must read zero CRC after write");

        let mut read_buf = vec![0u8; 256];
        pf.read(page_id, &mut read_buf, false).unwrap();
        assert_eq!(crc::crc(&read_buf), 0);
        assert!(read_buf[4..].iter().all(|b| *b == 0xAB));

        let mut read_keep = vec![0u8; 256];
        pf.read(page_id, &mut read_keep, true).unwrap();
        assert_ne!(crc::crc(&read_keep), 0);
    }

    #[test]
    fn unwritten_page_reads_as_zero() {
        let dir = tempdir().unwrap();
        let pf = open_file(dir.path(), 256);
        let page_id = pf.allocate_page().unwrap();

        let mut buf = vec![0xFFu8; 256];
        pf.read(page_id, &mut buf, false).unwrap();
        assert!(buf.iter().all(|b| *b == 0));
    }

    #[test]
    fn corrupted_page_fails_crc_check() {
        let dir = tempdir().unwrap();
        let pf = open_file(dir.path(), 256);
        let page_id = pf.allocate_page().unwrap();

        let mut buf = vec![0xABu8; 256];
        pf.write(page_id, &mut buf, 0).unwrap();

        // Corrupt one byte directly on disk, bypassing the page file.
        let off = pf.page_offset(page_id);
        pf.file.write_at(&[0x00], off + 10).unwrap();

        let mut read_buf = vec![0u8; 256];
        let err = pf.read(page_id, &mut read_buf, false).unwrap_err();
        assert!(matches!(
            err,
            PageStoreError::Integrity {
                reason: IntegrityReason::CrcMismatch { .. },
                ..
            }
        ));
    }

    #[test]
    fn allocate_page_is_concurrency_safe() {
        let dir = tempdir().unwrap();
        let pf = std::sync::Arc::new(open_file(dir.path(), 256));
        pf.ensure().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pf = pf.clone();
                std::thread::spawn(move || pf.allocate_page().unwrap())
            })
            .collect();
        let mut ids: Vec<PageId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8, "all allocated page ids must be distinct");
        assert_eq!(pf.pages(), 9); // 8 allocations plus the super page
    }

    #[test]
    fn truncate_invalidates_stale_writers() {
        let dir = tempdir().unwrap();
        let pf = open_file(dir.path(), 256);
        let page_id = pf.allocate_page().unwrap();

        pf.truncate(7).unwrap();
        assert_eq!(pf.pages(), 1);

        let mut stale = vec![0x11u8; 256];
        pf.write(page_id, &mut stale, 6).unwrap(); // dropped silently

        let mut check = vec![0u8; 256];
        pf.read(page_id, &mut check, false).unwrap();
        assert!(check.iter().all(|b| *b == 0), "stale write must not land");

        let fresh_id = pf.allocate_page().unwrap();
        let mut fresh = vec![0x22u8; 256];
        pf.write(fresh_id, &mut fresh, 7).unwrap();

        let mut read_back = vec![0u8; 256];
        pf.read(fresh_id, &mut read_back, false).unwrap();
        assert!(read_back[4..].iter().all(|b| *b == 0x22));
    }

    #[test]
    fn opening_with_mismatched_type_fails_without_mutating_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.bin");
        {
            let pf = PageFile::open(PageStoreConfig::new(&path, 1, 256)).unwrap();
            pf.ensure().unwrap();
        }
        let len_before = std::fs::metadata(&path).unwrap().len();

        let pf2 = PageFile::open(PageStoreConfig::new(&path, 2, 256)).unwrap();
        let err = pf2.ensure().unwrap_err();
        assert!(matches!(
            err,
            PageStoreError::Integrity {
                reason: IntegrityReason::TypeMismatch { .. },
                ..
            }
        ));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), len_before);
    }

    #[test]
    fn finish_recover_reconciles_allocated_to_file_size() {
        let dir = tempdir().unwrap();
        let pf = open_file(dir.path(), 256);
        pf.ensure().unwrap();
        pf.begin_recover();

        // Recovery mode allows writing past the tracked allocation.
        let mut buf = vec![0x33u8; 256];
        pf.write(5, &mut buf, 0).unwrap();

        pf.finish_recover().unwrap();
        let expected_len = pf.page_offset(5) + pf.page_size() as u64;
        assert_eq!(pf.pages(), expected_len / pf.page_size() as u64);
    }
}
