//! Per-table buffer pool.
//!
//! Each table file gets its own pool of `MAX_POOL_SIZE` page frames. Pages
//! are fetched on demand, pinned while in use, and evicted by a first-fit
//! scan over unpinned frames when the free list runs dry. Fetches return a
//! [`PinnedPage`] guard; dropping the guard unpins the frame.
//!
//! Lock discipline:
//! - `state` (read/write lock): resident-page map, free list, per-slot page
//!   ids. Readers hold it only long enough to observe a hit and pin.
//! - `read_file` mutex: serializes disk reads on a miss.
//! - `write_file` mutex: held around the full finalize/write/fsync sequence
//!   of [`BufferPool::insert_data`].

use std::collections::{HashMap, VecDeque};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::error::StorageError;
use crate::storage::page::{self, PageBuf};
use crate::types::{MAX_POOL_SIZE, PAGE_HEADER_SIZE, PAGE_SIZE, PageId};

#[derive(Debug)]
struct Frame {
    buf: RwLock<Box<PageBuf>>,
    pin_count: AtomicI32,
    pinned: AtomicBool,
}

impl Frame {
    fn new() -> Self {
        Self {
            buf: RwLock::new(Box::new([0u8; PAGE_SIZE])),
            pin_count: AtomicI32::new(0),
            pinned: AtomicBool::new(false),
        }
    }
}

/// Resident-page bookkeeping, guarded by the pool's state lock.
struct PoolState {
    /// page id -> slot index for resident pages.
    page_table: HashMap<PageId, usize>,
    /// Slots not holding any page.
    free_list: VecDeque<usize>,
    /// Which page each slot currently holds (meaningful only while mapped).
    slot_pages: Vec<PageId>,
}

/// A pinned page handle. The frame cannot be evicted while this guard is
/// alive; dropping it unpins the frame.
#[derive(Debug)]
pub struct PinnedPage {
    frame: Arc<Frame>,
    page_id: PageId,
}

impl PinnedPage {
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Borrow the page bytes. The borrow is tied to this guard, so the
    /// bytes cannot outlive the pin.
    pub fn data(&self) -> RwLockReadGuard<'_, Box<PageBuf>> {
        self.frame.buf.read()
    }
}

impl Drop for PinnedPage {
    fn drop(&mut self) {
        let prev = self.frame.pin_count.fetch_sub(1, Ordering::AcqRel);
        if prev <= 1 {
            self.frame.pinned.store(false, Ordering::Release);
        }
    }
}

/// Page cache and disk I/O for a single table file.
pub struct BufferPool {
    slots: Vec<Arc<Frame>>,
    state: RwLock<PoolState>,
    read_file: Mutex<File>,
    write_file: Mutex<File>,
}

impl BufferPool {
    /// Open a pool over an existing table file.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Self::with_capacity(path, MAX_POOL_SIZE)
    }

    fn with_capacity(path: &Path, capacity: usize) -> Result<Self, StorageError> {
        let read_file = OpenOptions::new().read(true).open(path)?;
        let write_file = OpenOptions::new().write(true).open(path)?;
        Ok(Self {
            slots: (0..capacity).map(|_| Arc::new(Frame::new())).collect(),
            state: RwLock::new(PoolState {
                page_table: HashMap::new(),
                free_list: (0..capacity).collect(),
                slot_pages: vec![0; capacity],
            }),
            read_file: Mutex::new(read_file),
            write_file: Mutex::new(write_file),
        })
    }

    /// Fetch a page, pinning its frame.
    ///
    /// On a hit the pin is taken under the shared state lock. On a miss a
    /// frame is claimed (free list first, then a single first-fit victim
    /// scan), mapped, and filled from disk under the read mutex. A fully
    /// pinned pool fails with `PoolExhausted` rather than spinning.
    pub fn fetch(&self, page_id: PageId) -> Result<PinnedPage, StorageError> {
        {
            let state = self.state.read();
            if let Some(&slot) = state.page_table.get(&page_id) {
                let frame = &self.slots[slot];
                frame.pin_count.fetch_add(1, Ordering::AcqRel);
                frame.pinned.store(true, Ordering::Release);
                return Ok(PinnedPage {
                    frame: Arc::clone(frame),
                    page_id,
                });
            }
        }

        // Miss: claim a slot and publish the mapping. The frame's buffer
        // lock is taken before the state lock is released, so a concurrent
        // hit blocks on `data()` until the page is loaded.
        let (slot, frame, mut buf) = {
            let mut state = self.state.write();
            // A racing fetch may have loaded the page between our shared
            // and exclusive sections.
            if let Some(&slot) = state.page_table.get(&page_id) {
                let frame = &self.slots[slot];
                frame.pin_count.fetch_add(1, Ordering::AcqRel);
                frame.pinned.store(true, Ordering::Release);
                return Ok(PinnedPage {
                    frame: Arc::clone(frame),
                    page_id,
                });
            }
            let slot = self.claim_slot(&mut state)?;
            state.page_table.insert(page_id, slot);
            state.slot_pages[slot] = page_id;
            let frame = &self.slots[slot];
            frame.pin_count.store(1, Ordering::Release);
            frame.pinned.store(true, Ordering::Release);
            (slot, Arc::clone(frame), self.slots[slot].buf.write())
        };

        let read_result = {
            let file = self.read_file.lock();
            file.read_exact_at(&mut **buf, page_id * PAGE_SIZE as u64)
        };
        if let Err(e) = read_result {
            drop(buf);
            // Roll the mapping back so the bad frame is not observable.
            let mut state = self.state.write();
            state.page_table.remove(&page_id);
            state.free_list.push_back(slot);
            frame.pin_count.store(0, Ordering::Release);
            frame.pinned.store(false, Ordering::Release);
            return Err(StorageError::Io(e));
        }
        drop(buf);

        Ok(PinnedPage { frame, page_id })
    }

    /// Claim a slot: pop the free list, else one first-fit pass over
    /// unpinned frames. Must be called under the exclusive state lock.
    fn claim_slot(&self, state: &mut PoolState) -> Result<usize, StorageError> {
        if let Some(slot) = state.free_list.pop_front() {
            return Ok(slot);
        }
        for (slot, frame) in self.slots.iter().enumerate() {
            if !frame.pinned.load(Ordering::Acquire) && frame.pin_count.load(Ordering::Acquire) <= 0
            {
                let old = state.slot_pages[slot];
                state.page_table.remove(&old);
                tracing::trace!(victim = slot, evicted_page = old, "evicting frame");
                return Ok(slot);
            }
        }
        Err(StorageError::PoolExhausted(self.slots.len()))
    }

    /// Drop a page from the pool, returning its slot to the free list.
    /// Used after `insert_data` mutates a page behind the pool's back.
    pub fn delete_page(&self, page_id: PageId) {
        let mut state = self.state.write();
        if let Some(slot) = state.page_table.remove(&page_id) {
            let frame = &self.slots[slot];
            frame.pin_count.store(0, Ordering::Release);
            frame.pinned.store(false, Ordering::Release);
            state.free_list.push_back(slot);
        }
    }

    /// Append encoded rows starting at `first_page`, the table's current
    /// last page (which may already hold rows — they are preserved).
    ///
    /// Rows are copied into a working buffer seeded from the fetched page.
    /// Whenever the next row would cross the page boundary the buffer is
    /// finalized and written, and a fresh page begins at `page + 1`. The
    /// final page is written and fsynced, the starting page is dropped from
    /// the pool (its cached copy is stale), and the last page number
    /// written is returned.
    ///
    /// All rows must share one width; rows never straddle pages.
    pub fn insert_data(&self, first_page: PageId, rows: &[Vec<u8>]) -> Result<PageId, StorageError> {
        let pinned = self.fetch(first_page)?;
        let mut buf: PageBuf = **pinned.data();
        drop(pinned);

        let mut row_count = page::row_count(&buf) as usize;
        let mut offset = PAGE_HEADER_SIZE + row_count * rows.first().map_or(0, Vec::len);
        let mut page_num = first_page;

        let file = self.write_file.lock();
        for row in rows {
            debug_assert_eq!(row.len(), rows[0].len(), "rows must share one width");
            if offset + row.len() > PAGE_SIZE {
                page::finalize(&mut buf, page_num, row_count as u16);
                file.write_all_at(&buf, page_num * PAGE_SIZE as u64)?;
                page_num += 1;
                buf = [0u8; PAGE_SIZE];
                row_count = 0;
                offset = PAGE_HEADER_SIZE;
            }
            buf[offset..offset + row.len()].copy_from_slice(row);
            offset += row.len();
            row_count += 1;
        }
        page::finalize(&mut buf, page_num, row_count as u16);
        file.write_all_at(&buf, page_num * PAGE_SIZE as u64)?;
        file.sync_all()?;
        drop(file);

        self.delete_page(first_page);
        Ok(page_num)
    }

    /// Fetch every page in `[start, end]` inclusive. Callers decode rows
    /// out of the returned guards before dropping them.
    pub fn select_range(&self, start: PageId, end: PageId) -> Result<Vec<PinnedPage>, StorageError> {
        let mut pages = Vec::with_capacity((end - start + 1) as usize);
        for page_id in start..=end {
            pages.push(self.fetch(page_id)?);
        }
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Write `n` finalized pages; page `i`'s payload starts with byte `i`.
    fn table_file(dir: &Path, n: u64) -> std::path::PathBuf {
        let path = dir.join("t.db");
        let file = File::create(&path).unwrap();
        for i in 0..n {
            let mut buf = [0u8; PAGE_SIZE];
            buf[PAGE_HEADER_SIZE] = i as u8;
            page::finalize(&mut buf, i, 1);
            file.write_all_at(&buf, i * PAGE_SIZE as u64).unwrap();
        }
        path
    }

    #[test]
    fn test_fetch_hit_and_miss() {
        let dir = tempdir().unwrap();
        let path = table_file(dir.path(), 2);
        let pool = BufferPool::with_capacity(&path, 4).unwrap();

        let p0 = pool.fetch(0).unwrap();
        assert_eq!(p0.data()[PAGE_HEADER_SIZE], 0);
        let p1 = pool.fetch(1).unwrap();
        assert_eq!(p1.data()[PAGE_HEADER_SIZE], 1);

        // Second fetch of page 0 is a hit on the same frame.
        let p0_again = pool.fetch(0).unwrap();
        assert_eq!(p0_again.frame.pin_count.load(Ordering::Acquire), 2);
        assert!(Arc::ptr_eq(&p0.frame, &p0_again.frame));
    }

    #[test]
    fn test_unpin_on_drop() {
        let dir = tempdir().unwrap();
        let path = table_file(dir.path(), 1);
        let pool = BufferPool::with_capacity(&path, 2).unwrap();

        let p = pool.fetch(0).unwrap();
        let frame = Arc::clone(&p.frame);
        assert_eq!(frame.pin_count.load(Ordering::Acquire), 1);
        drop(p);
        assert_eq!(frame.pin_count.load(Ordering::Acquire), 0);
        assert!(!frame.pinned.load(Ordering::Acquire));
    }

    #[test]
    fn test_eviction_first_fit() {
        let dir = tempdir().unwrap();
        let path = table_file(dir.path(), 3);
        let pool = BufferPool::with_capacity(&path, 2).unwrap();

        let p0 = pool.fetch(0).unwrap();
        drop(pool.fetch(1).unwrap());
        drop(p0);

        // Both frames unpinned; fetching page 2 evicts slot 0 (first fit).
        let p2 = pool.fetch(2).unwrap();
        assert_eq!(p2.data()[PAGE_HEADER_SIZE], 2);
        {
            let state = pool.state.read();
            assert!(!state.page_table.contains_key(&0));
            assert!(state.page_table.contains_key(&1));
        }

        // Page 0 can still be re-read from disk.
        let p0 = pool.fetch(0).unwrap();
        assert_eq!(p0.data()[PAGE_HEADER_SIZE], 0);
    }

    #[test]
    fn test_pool_exhausted() {
        let dir = tempdir().unwrap();
        let path = table_file(dir.path(), 3);
        let pool = BufferPool::with_capacity(&path, 2).unwrap();

        let _p0 = pool.fetch(0).unwrap();
        let _p1 = pool.fetch(1).unwrap();
        match pool.fetch(2) {
            Err(StorageError::PoolExhausted(2)) => {}
            other => panic!("expected PoolExhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_fetch_past_eof_is_io_error() {
        let dir = tempdir().unwrap();
        let path = table_file(dir.path(), 1);
        let pool = BufferPool::with_capacity(&path, 2).unwrap();

        assert!(matches!(pool.fetch(5), Err(StorageError::Io(_))));
        // The failed mapping must not linger.
        let state = pool.state.read();
        assert!(!state.page_table.contains_key(&5));
        assert_eq!(state.free_list.len(), 2);
    }

    #[test]
    fn test_insert_preserves_existing_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.db");
        let file = File::create(&path).unwrap();

        // Page 0 with two 100-byte rows already present.
        let mut buf = [0u8; PAGE_SIZE];
        buf[PAGE_HEADER_SIZE] = 0xA1;
        buf[PAGE_HEADER_SIZE + 100] = 0xA2;
        page::finalize(&mut buf, 0, 2);
        file.write_all_at(&buf, 0).unwrap();
        drop(file);

        let pool = BufferPool::with_capacity(&path, 2).unwrap();
        let last = pool.insert_data(0, &[vec![0xB1; 100]]).unwrap();
        assert_eq!(last, 0);

        let read = File::open(&path).unwrap();
        let mut got = [0u8; PAGE_SIZE];
        read.read_exact_at(&mut got, 0).unwrap();
        assert_eq!(page::row_count(&got), 3);
        assert_eq!(got[PAGE_HEADER_SIZE], 0xA1);
        assert_eq!(got[PAGE_HEADER_SIZE + 100], 0xA2);
        assert_eq!(got[PAGE_HEADER_SIZE + 200], 0xB1);
        assert!(page::verify(&got, 0).is_ok());
    }

    #[test]
    fn test_insert_rolls_over_to_new_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.db");
        let file = File::create(&path).unwrap();
        file.write_all_at(&page::empty_page(0)[..], 0).unwrap();
        drop(file);

        // 1000-byte rows: 4 fit per page ((4096 - 26) / 1000).
        let pool = BufferPool::with_capacity(&path, 2).unwrap();
        let rows: Vec<Vec<u8>> = (0..5u8).map(|i| vec![i + 1; 1000]).collect();
        let last = pool.insert_data(0, &rows).unwrap();
        assert_eq!(last, 1);

        let read = File::open(&path).unwrap();
        assert_eq!(read.metadata().unwrap().len(), 2 * PAGE_SIZE as u64);

        let mut p0 = [0u8; PAGE_SIZE];
        read.read_exact_at(&mut p0, 0).unwrap();
        assert_eq!(page::row_count(&p0), 4);
        assert_eq!(page::page_number(&p0), 0);
        assert!(page::verify(&p0, 0).is_ok());

        let mut p1 = [0u8; PAGE_SIZE];
        read.read_exact_at(&mut p1, PAGE_SIZE as u64).unwrap();
        assert_eq!(page::row_count(&p1), 1);
        assert_eq!(page::page_number(&p1), 1);
        assert_eq!(p1[PAGE_HEADER_SIZE], 5);
        assert!(page::verify(&p1, 1).is_ok());
    }

    #[test]
    fn test_insert_drops_stale_cached_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.db");
        let file = File::create(&path).unwrap();
        file.write_all_at(&page::empty_page(0)[..], 0).unwrap();
        drop(file);

        let pool = BufferPool::with_capacity(&path, 2).unwrap();
        drop(pool.fetch(0).unwrap()); // page 0 now resident
        pool.insert_data(0, &[vec![7u8; 64]]).unwrap();

        // The next fetch must observe the inserted row, not the stale frame.
        let p0 = pool.fetch(0).unwrap();
        assert_eq!(page::row_count(&**p0.data()), 1);
        assert_eq!(p0.data()[PAGE_HEADER_SIZE], 7);
    }

    #[test]
    fn test_select_range_pins_all() {
        let dir = tempdir().unwrap();
        let path = table_file(dir.path(), 3);
        let pool = BufferPool::with_capacity(&path, 4).unwrap();

        let pages = pool.select_range(0, 2).unwrap();
        assert_eq!(pages.len(), 3);
        for (i, p) in pages.iter().enumerate() {
            assert_eq!(p.page_id(), i as u64);
            assert_eq!(p.data()[PAGE_HEADER_SIZE], i as u8);
        }
    }
}
