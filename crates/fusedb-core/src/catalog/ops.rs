//! Catalog persistence: the `main.db` header and catalog page.
//!
//! `main.db` layout:
//! ```text
//! [0..16)        magic "Fusedb format 1\0"
//! [16..18)       page size, u16 little-endian
//! [18..100)      reserved, zero
//! [100..100+4096) catalog page: (len: u32 LE, table record)*, zero len ends
//! ```
//!
//! The catalog page is rewritten in full, in a single positioned write,
//! after every schema mutation.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::error::{Error, Result, SchemaError, StorageError};
use crate::types::{CATALOG_OFFSET, MAGIC, PAGE_SIZE};

use super::Table;

/// Name of the catalog file within a database directory.
pub const MAIN_FILE: &str = "main.db";

/// Create a fresh `main.db` in `dir` and write its 100-byte header.
pub fn create_main_file(dir: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(dir.join(MAIN_FILE))
        .map_err(StorageError::Io)?;

    let mut header = [0u8; CATALOG_OFFSET as usize];
    header[0..16].copy_from_slice(MAGIC);
    header[16..18].copy_from_slice(&(PAGE_SIZE as u16).to_le_bytes());
    file.write_all_at(&header, 0).map_err(StorageError::Io)?;
    file.sync_all().map_err(StorageError::Io)?;
    Ok(file)
}

/// Open an existing `main.db`, validate its magic, and parse the catalog.
///
/// A file with no catalog page yet (header only) yields an empty catalog.
/// Every parsed table has its derived column fields recomputed;
/// `last_page` and `last_row_id` reconstruction is the backend's job.
pub fn read_catalog(dir: &Path) -> Result<(File, Vec<Table>)> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(dir.join(MAIN_FILE))
        .map_err(StorageError::Io)?;

    let mut header = [0u8; CATALOG_OFFSET as usize];
    file.read_exact_at(&mut header, 0)
        .map_err(StorageError::Io)?;
    if &header[0..16] != MAGIC {
        return Err(StorageError::InvalidMagic.into());
    }

    let mut page = [0u8; PAGE_SIZE];
    match file.read_exact_at(&mut page, CATALOG_OFFSET) {
        Ok(()) => {}
        // No catalog page written yet: no tables have been created.
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok((file, Vec::new())),
        Err(e) => return Err(StorageError::Io(e).into()),
    }

    let mut tables = Vec::new();
    let mut at = 0usize;
    while at + 4 <= PAGE_SIZE {
        let len = u32::from_le_bytes(page[at..at + 4].try_into().unwrap()) as usize;
        if len == 0 {
            break;
        }
        at += 4;
        let record = page.get(at..at + len).ok_or_else(|| {
            Error::from(SchemaError::BadSchema(
                "catalog record runs past the catalog page".to_string(),
            ))
        })?;
        tables.push(Table::from_bytes(record)?);
        at += len;
    }
    Ok((file, tables))
}

/// Rewrite the catalog page from `tables`, in one positioned write.
pub fn write_catalog(file: &File, tables: &[Table]) -> Result<()> {
    let mut page = [0u8; PAGE_SIZE];
    let mut at = 0usize;
    for table in tables {
        let record = table.to_bytes();
        if at + 4 + record.len() > PAGE_SIZE {
            return Err(SchemaError::BadSchema(
                "catalog page is full; cannot persist schema".to_string(),
            )
            .into());
        }
        page[at..at + 4].copy_from_slice(&(record.len() as u32).to_le_bytes());
        at += 4;
        page[at..at + record.len()].copy_from_slice(&record);
        at += record.len();
    }
    file.write_all_at(&page, CATALOG_OFFSET)
        .map_err(StorageError::Io)?;
    file.sync_all().map_err(StorageError::Io)?;
    Ok(())
}
