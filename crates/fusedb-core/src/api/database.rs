//! The database backend: catalog bookkeeping plus the CREATE / INSERT /
//! SELECT operations over per-table buffer pools.

use std::collections::HashMap;
use std::fs::{self, File};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::catalog::ops as catalog_ops;
use crate::catalog::{Column, Table};
use crate::encoding::{Bitset, cell};
use crate::error::{ParseError, Result, SchemaError, StorageError};
use crate::parser::{self, ColumnDecl, ConstraintDecl, Query, QueryKind};
use crate::storage::lock::FileLock;
use crate::storage::page;
use crate::storage::pool::BufferPool;
use crate::types::{ColumnType, Constraint, PAGE_HEADER_SIZE, PAGE_SIZE};

use super::rows::{ResultColumn, Rows};

/// Where each table column's cell comes from during an INSERT.
enum CellSource {
    /// Index into the statement's value tuple.
    FromValue(usize),
    /// Column absent from the field list: null bit gets set.
    Null,
    /// Absent ROWID column: auto-assign the next row id.
    AutoRowId,
}

struct DatabaseInner {
    dir: PathBuf,
    main_file: File,
    tables: RwLock<Vec<Table>>,
    pools: RwLock<HashMap<String, Arc<BufferPool>>>,
    /// Serializes schema mutations; DML is governed by the pool locks.
    ddl_lock: Mutex<()>,
    _lock: FileLock,
}

/// A handle to a database directory.
///
/// `Database` is cheaply clonable (`Arc`-based) and `Send + Sync`. The
/// directory holds `main.db` (the catalog) and one `<table>.db` per table;
/// each table gets its own buffer pool.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

fn table_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.db"))
}

impl Database {
    /// Open the database at `dir`, creating the directory and a fresh
    /// catalog if it does not exist yet.
    ///
    /// On an existing database the catalog is loaded, each table's
    /// `last_page` is re-derived from its file size, and `last_row_id` is
    /// reconstructed from the ROWID cell of the final row (0 for an empty
    /// table). An exclusive directory lock is held for the life of the
    /// handle.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(StorageError::Io)?;
        let lock = FileLock::try_exclusive(&dir.join("main.lock"))?;

        let main_path = dir.join(catalog_ops::MAIN_FILE);
        let (main_file, mut tables) = if main_path.exists() {
            catalog_ops::read_catalog(dir)?
        } else {
            (catalog_ops::create_main_file(dir)?, Vec::new())
        };

        let mut pools = HashMap::new();
        for table in &mut tables {
            let path = table_path(dir, &table.name);
            let (last_page, last_row_id) = table_params(&path, table)?;
            table.last_page = last_page;
            table.last_row_id = last_row_id;
            pools.insert(table.name.clone(), Arc::new(BufferPool::open(&path)?));
        }
        tracing::debug!(dir = %dir.display(), tables = tables.len(), "opened database");

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                dir: dir.to_path_buf(),
                main_file,
                tables: RwLock::new(tables),
                pools: RwLock::new(pools),
                ddl_lock: Mutex::new(()),
                _lock: lock,
            }),
        })
    }

    /// Parse and run a single statement. SELECT yields a cursor; CREATE
    /// and INSERT yield `None`; everything else the parser accepts is
    /// rejected with `Unsupported`.
    pub fn execute(&self, sql: &str) -> Result<Option<Rows>> {
        let query = parser::parse(sql)?;
        match query.kind {
            QueryKind::Create => {
                self.create_table(&query)?;
                Ok(None)
            }
            QueryKind::Insert => {
                self.insert(&query)?;
                Ok(None)
            }
            QueryKind::Select => Ok(Some(self.select(&query)?)),
            QueryKind::Update => Err(ParseError::Unsupported("UPDATE").into()),
            QueryKind::Delete => Err(ParseError::Unsupported("DELETE").into()),
            QueryKind::Drop => Err(ParseError::Unsupported("DROP TABLE").into()),
        }
    }

    /// Create a table from a parsed CREATE statement: build and validate
    /// the column records, write `<name>.db` with one empty page, then
    /// rewrite the catalog page.
    pub fn create_table(&self, query: &Query) -> Result<()> {
        let _ddl = self.inner.ddl_lock.lock();

        if query.table.len() > u16::MAX as usize {
            return Err(SchemaError::BadSchema("table name is too long".to_string()).into());
        }
        if query.table.contains(['/', '\\']) {
            return Err(SchemaError::BadSchema(
                "table name must not contain path separators".to_string(),
            )
            .into());
        }
        if self
            .inner
            .tables
            .read()
            .iter()
            .any(|t| t.name == query.table)
        {
            return Err(SchemaError::TableExists(query.table.clone()).into());
        }

        let mut table = Table {
            name: query.table.clone(),
            columns: build_columns(&query.columns)?,
            last_row_id: 0,
            last_page: 0,
        };
        table.rebuild_derived();

        // The table file is written before the catalog; a crash between
        // the two leaves an orphan file, never a dangling catalog entry.
        let path = table_path(&self.inner.dir, &table.name);
        let file = File::create(&path).map_err(StorageError::Io)?;
        file.write_all_at(&page::empty_page(0)[..], 0)
            .map_err(StorageError::Io)?;
        file.sync_all().map_err(StorageError::Io)?;
        drop(file);

        let pool = Arc::new(BufferPool::open(&path)?);
        {
            let mut tables = self.inner.tables.write();
            tables.push(table);
            catalog_ops::write_catalog(&self.inner.main_file, &tables)?;
        }
        self.inner
            .pools
            .write()
            .insert(query.table.clone(), pool);
        tracing::debug!(table = %query.table, "created table");
        Ok(())
    }

    /// Append the rows of a parsed INSERT statement.
    ///
    /// Builds a per-column plan from the field list (unknown names fail
    /// with `BadField`), encodes each value tuple into a null-bitmap row
    /// buffer, auto-assigning absent ROWIDs, and hands the batch to the
    /// table's buffer pool starting at the current last page.
    pub fn insert(&self, query: &Query) -> Result<()> {
        let table = self.lookup(&query.table)?;

        for field in &query.fields {
            if table.column(field).is_none() {
                return Err(SchemaError::BadField(field.clone()).into());
            }
        }
        let plan: Vec<CellSource> = table
            .columns
            .iter()
            .map(|col| {
                match query.fields.iter().position(|f| *f == col.name) {
                    Some(pos) => CellSource::FromValue(pos),
                    None if col.constraint == Constraint::RowId => CellSource::AutoRowId,
                    None => CellSource::Null,
                }
            })
            .collect();

        let bitmap_len = table.bitmap_bytes();
        let stride = table.row_stride();
        let mut next_row_id = table.last_row_id;
        let mut rows = Vec::with_capacity(query.inserts.len());

        for tuple in &query.inserts {
            let mut row = vec![0u8; stride];
            let mut nulls = Bitset::new(table.columns.len() as u64);
            for (col, source) in table.columns.iter().zip(&plan) {
                let slot = bitmap_len + col.offset..bitmap_len + col.offset + col.size as usize;
                match source {
                    CellSource::FromValue(pos) => {
                        let token = &tuple[*pos];
                        if col.constraint == Constraint::RowId {
                            next_row_id =
                                token
                                    .parse()
                                    .map_err(|_| crate::error::EncodingError::BadValue {
                                        column: col.name.clone(),
                                        expected: "INT",
                                        value: token.clone(),
                                    })?;
                        }
                        cell::encode_into(&mut row[slot], col.ty, &col.name, token)?;
                    }
                    CellSource::Null => nulls.set(col.index),
                    CellSource::AutoRowId => {
                        next_row_id += 1;
                        row[slot].copy_from_slice(&next_row_id.to_le_bytes());
                    }
                }
            }
            row[..bitmap_len].copy_from_slice(nulls.as_bytes());
            rows.push(row);
        }

        let pool = self.pool(&query.table)?;
        let last_page = pool.insert_data(table.last_page, &rows)?;

        let mut tables = self.inner.tables.write();
        if let Some(t) = tables.iter_mut().find(|t| t.name == query.table) {
            t.last_page = last_page;
            if t.rowid_column().is_some() {
                t.last_row_id = next_row_id;
            }
        }
        tracing::debug!(table = %query.table, rows = rows.len(), last_page, "inserted rows");
        Ok(())
    }

    /// Run a parsed SELECT statement and return a cursor over its rows.
    ///
    /// Pages `[0, last_page]` are range-fetched from the pool; each is
    /// checksum-verified before its rows are decoded. Cells are copied out
    /// of the frames before they are unpinned. WHERE evaluation is not
    /// implemented and fails with `Unsupported`.
    pub fn select(&self, query: &Query) -> Result<Rows> {
        if !query.conditions.is_empty() {
            return Err(ParseError::Unsupported("WHERE evaluation").into());
        }
        let table = self.lookup(&query.table)?;
        let projected = resolve_projection(&table, &query.fields)?;

        let bitmap_len = table.bitmap_bytes();
        let stride = table.row_stride();
        let mut nulls = Bitset::new(table.columns.len() as u64);
        let mut out = Vec::new();

        let pool = self.pool(&query.table)?;
        let pages = pool.select_range(0, table.last_page)?;
        for pinned in &pages {
            let data = pinned.data();
            let buf: &page::PageBuf = &data;
            page::verify(buf, pinned.page_id())?;
            let row_count = page::row_count(buf) as usize;
            for i in 0..row_count {
                let base = PAGE_HEADER_SIZE + i * stride;
                nulls.from_bytes(&buf[base..base + bitmap_len]);
                let mut row = Vec::with_capacity(projected.len());
                for col in &projected {
                    if nulls.has(col.index) {
                        row.push(None);
                    } else {
                        let at = base + bitmap_len + col.offset;
                        row.push(Some(buf[at..at + col.size as usize].to_vec()));
                    }
                }
                out.push(row);
            }
        }
        drop(pages);

        tracing::debug!(table = %query.table, rows = out.len(), "select");
        let columns = projected
            .into_iter()
            .map(|c| ResultColumn {
                name: c.name,
                ty: c.ty,
            })
            .collect();
        Ok(Rows::new(columns, out))
    }

    /// Names of every table in the catalog.
    pub fn table_names(&self) -> Vec<String> {
        self.inner
            .tables
            .read()
            .iter()
            .map(|t| t.name.clone())
            .collect()
    }

    /// Look up a table's full schema.
    pub fn describe_table(&self, name: &str) -> Result<Table> {
        self.lookup(name)
    }

    /// Close this handle, releasing the directory lock once the last
    /// clone drops. Inserts are fsynced eagerly, so there is nothing to
    /// flush.
    pub fn close(self) {}

    fn lookup(&self, name: &str) -> Result<Table> {
        self.inner
            .tables
            .read()
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| SchemaError::TableMissing(name.to_string()).into())
    }

    fn pool(&self, name: &str) -> Result<Arc<BufferPool>> {
        self.inner
            .pools
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::TableMissing(name.to_string()).into())
    }
}

/// Re-derive a table's `last_page` and `last_row_id` from its file.
///
/// `last_page` comes from the file size. `last_row_id` is read from the
/// ROWID cell of the last row on the last page, short-circuiting to 0 for
/// an empty table (or one whose PRIMARY column is not INT).
fn table_params(path: &Path, table: &Table) -> Result<(u64, i64)> {
    let file = File::open(path).map_err(StorageError::Io)?;
    let len = file.metadata().map_err(StorageError::Io)?.len();
    let last_page = (len / PAGE_SIZE as u64).saturating_sub(1);

    let mut buf = [0u8; PAGE_SIZE];
    file.read_exact_at(&mut buf, last_page * PAGE_SIZE as u64)
        .map_err(StorageError::Io)?;
    let row_count = page::row_count(&buf) as usize;

    let Some(rowid) = table.rowid_column() else {
        return Ok((last_page, 0));
    };
    if row_count == 0 {
        return Ok((last_page, 0));
    }
    let at = PAGE_HEADER_SIZE + (row_count - 1) * table.row_stride() + table.bitmap_bytes()
        + rowid.offset;
    let id = i64::from_le_bytes(buf[at..at + 8].try_into().unwrap());
    Ok((last_page, id))
}

/// Build and validate column records from CREATE declarations.
fn build_columns(decls: &[ColumnDecl]) -> Result<Vec<Column>> {
    let mut columns = Vec::with_capacity(decls.len());
    for decl in decls {
        if decl.name.len() > u8::MAX as usize {
            return Err(SchemaError::BadSchema(format!(
                "column name '{}' is too long",
                decl.name
            ))
            .into());
        }
        let primary = decl.constraints.contains(&ConstraintDecl::PrimaryKey);
        let not_null = decl.constraints.contains(&ConstraintDecl::NotNull);
        let unique = decl.constraints.contains(&ConstraintDecl::Unique);
        if decl.ty == ColumnType::Bool && (primary || unique) {
            return Err(SchemaError::BadSchema(format!(
                "BOOL column '{}' cannot be PRIMARY KEY or UNIQUE",
                decl.name
            ))
            .into());
        }

        let size = match decl.ty {
            ColumnType::Int | ColumnType::Float => 8,
            ColumnType::Bool => 1,
            ColumnType::Char => {
                let token = decl.size.as_ref().ok_or_else(|| {
                    SchemaError::BadSchema(format!("CHAR column '{}' needs a size", decl.name))
                })?;
                let n: usize = token.parse().map_err(|_| {
                    SchemaError::BadSchema(format!(
                        "bad CHAR size '{token}' for column '{}'",
                        decl.name
                    ))
                })?;
                if !(1..=255).contains(&n) {
                    return Err(SchemaError::BadSchema(format!(
                        "CHAR size for column '{}' must be between 1 and 255",
                        decl.name
                    ))
                    .into());
                }
                n as u8
            }
        };

        let constraint = if primary {
            Constraint::Primary
        } else if not_null && unique {
            Constraint::NotNullUnique
        } else if not_null {
            Constraint::NotNull
        } else if unique {
            Constraint::Unique
        } else {
            Constraint::None
        };

        columns.push(Column {
            name: decl.name.clone(),
            ty: decl.ty,
            size,
            constraint,
            index: 0,
            offset: 0,
        });
    }

    // Exactly one PRIMARY column; an INT primary becomes the ROWID.
    let mut primaries = 0;
    for col in &mut columns {
        if col.constraint == Constraint::Primary {
            primaries += 1;
            if col.ty == ColumnType::Int {
                col.constraint = Constraint::RowId;
            }
        }
    }
    if primaries != 1 {
        return Err(SchemaError::BadSchema(
            "table must declare exactly one PRIMARY KEY column".to_string(),
        )
        .into());
    }
    Ok(columns)
}

/// Resolve requested SELECT fields against the schema. `*` selects every
/// column; named fields come back in declared (schema) order. Unknown or
/// duplicate names fail with `BadField`.
fn resolve_projection(table: &Table, fields: &[String]) -> Result<Vec<Column>> {
    if fields.first().is_some_and(|f| f == "*") {
        return Ok(table.columns.clone());
    }
    let mut remaining: Vec<&str> = fields.iter().map(String::as_str).collect();
    let mut projected = Vec::with_capacity(fields.len());
    for col in &table.columns {
        if let Some(pos) = remaining.iter().position(|f| *f == col.name) {
            remaining.remove(pos);
            projected.push(col.clone());
        }
    }
    if !remaining.is_empty() {
        return Err(SchemaError::BadField(remaining.join(", ")).into());
    }
    Ok(projected)
}
