//! Table catalog: schema records, their binary codec, and `main.db` I/O.

pub mod ops;

use crate::error::SchemaError;
use crate::types::{ColumnType, Constraint, PAGE_HEADER_SIZE, PAGE_SIZE};

/// A column in a table schema.
///
/// `index` and `offset` are derived at schema-build time and recomputed on
/// load: `index` is the 0-based declared position, `offset` the prefix sum
/// of the preceding columns' sizes within a row's cell region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub size: u8,
    pub constraint: Constraint,
    pub index: usize,
    pub offset: usize,
}

/// A catalog entry: one table and its ordered columns.
///
/// Serialized layout (see `to_bytes`/`from_bytes`):
/// ```text
/// name_len: u16 LE | name: name_len bytes |
/// last_row_id: i64 LE |
/// per column, until end of record:
///   constraint: u8 | type: u8 | size: u8 | col_name_len: u8 | col_name
/// ```
///
/// `last_page` is not serialized; it is re-derived from the table file's
/// size on open.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub last_row_id: i64,
    pub last_page: u64,
}

impl Table {
    /// Serialize this table into a catalog record.
    ///
    /// The table name must fit in a u16 and every column name in a u8;
    /// CREATE validation guarantees both.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        let name = self.name.as_bytes();
        buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
        buf.extend_from_slice(name);
        buf.extend_from_slice(&self.last_row_id.to_le_bytes());
        for col in &self.columns {
            buf.push(col.constraint.as_u8());
            buf.push(col.ty.as_u8());
            buf.push(col.size);
            let col_name = col.name.as_bytes();
            buf.push(col_name.len() as u8);
            buf.extend_from_slice(col_name);
        }
        buf
    }

    /// Parse a catalog record. Columns run to the end of the record;
    /// derived fields are recomputed.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, SchemaError> {
        let truncated = || SchemaError::BadSchema("truncated catalog record".to_string());

        if buf.len() < 2 {
            return Err(truncated());
        }
        let name_len = u16::from_le_bytes([buf[0], buf[1]]) as usize;
        let mut at = 2;
        let name = String::from_utf8(buf.get(at..at + name_len).ok_or_else(truncated)?.to_vec())
            .map_err(|_| SchemaError::BadSchema("table name is not UTF-8".to_string()))?;
        at += name_len;

        let id_bytes: [u8; 8] = buf
            .get(at..at + 8)
            .ok_or_else(truncated)?
            .try_into()
            .unwrap();
        let last_row_id = i64::from_le_bytes(id_bytes);
        at += 8;

        let mut columns = Vec::new();
        while at < buf.len() {
            let head = buf.get(at..at + 4).ok_or_else(truncated)?;
            let constraint = Constraint::from_u8(head[0])?;
            let ty = ColumnType::from_u8(head[1])?;
            let size = head[2];
            let col_name_len = head[3] as usize;
            at += 4;
            let col_name =
                String::from_utf8(buf.get(at..at + col_name_len).ok_or_else(truncated)?.to_vec())
                    .map_err(|_| SchemaError::BadSchema("column name is not UTF-8".to_string()))?;
            at += col_name_len;
            columns.push(Column {
                name: col_name,
                ty,
                size,
                constraint,
                index: 0,
                offset: 0,
            });
        }

        let mut table = Table {
            name,
            columns,
            last_row_id,
            last_page: 0,
        };
        table.rebuild_derived();
        Ok(table)
    }

    /// Recompute `index` and `offset` for every column from declared order.
    pub fn rebuild_derived(&mut self) {
        let mut offset = 0usize;
        for (i, col) in self.columns.iter_mut().enumerate() {
            col.index = i;
            col.offset = offset;
            offset += col.size as usize;
        }
    }

    /// Sum of all cell widths (excludes the null bitmap).
    pub fn row_width(&self) -> usize {
        self.columns.iter().map(|c| c.size as usize).sum()
    }

    /// Width of the per-row null bitmap in bytes.
    pub fn bitmap_bytes(&self) -> usize {
        crate::encoding::Bitset::bytes_for(self.columns.len() as u64)
    }

    /// Full physical row width: null bitmap plus all cells.
    pub fn row_stride(&self) -> usize {
        self.bitmap_bytes() + self.row_width()
    }

    /// How many rows fit in one page's payload region.
    pub fn rows_per_page(&self) -> usize {
        (PAGE_SIZE - PAGE_HEADER_SIZE) / self.row_stride()
    }

    /// The ROWID column, if this table has one.
    pub fn rowid_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.constraint == Constraint::RowId)
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let mut t = Table {
            name: "MyTable2024".to_string(),
            columns: vec![
                Column {
                    name: "a".to_string(),
                    ty: ColumnType::Int,
                    size: 8,
                    constraint: Constraint::RowId,
                    index: 0,
                    offset: 0,
                },
                Column {
                    name: "column2".to_string(),
                    ty: ColumnType::Float,
                    size: 8,
                    constraint: Constraint::None,
                    index: 0,
                    offset: 0,
                },
                Column {
                    name: "ThirdColumn".to_string(),
                    ty: ColumnType::Char,
                    size: 111,
                    constraint: Constraint::NotNull,
                    index: 0,
                    offset: 0,
                },
            ],
            last_row_id: 77,
            last_page: 0,
        };
        t.rebuild_derived();
        t
    }

    #[test]
    fn test_codec_roundtrip() {
        let table = sample_table();
        let buf = table.to_bytes();
        let restored = Table::from_bytes(&buf).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn test_derived_fields() {
        let table = sample_table();
        assert_eq!(table.columns[0].offset, 0);
        assert_eq!(table.columns[1].offset, 8);
        assert_eq!(table.columns[2].offset, 16);
        assert_eq!(table.columns[2].index, 2);
        assert_eq!(table.row_width(), 127);
        assert_eq!(table.bitmap_bytes(), 1);
        assert_eq!(table.row_stride(), 128);
    }

    #[test]
    fn test_rows_per_page() {
        let table = sample_table();
        // (4096 - 26) / 128
        assert_eq!(table.rows_per_page(), 31);
    }

    #[test]
    fn test_from_bytes_truncated() {
        let table = sample_table();
        let buf = table.to_bytes();
        assert!(Table::from_bytes(&buf[..buf.len() - 3]).is_err());
        assert!(Table::from_bytes(&buf[..1]).is_err());
    }

    #[test]
    fn test_from_bytes_bad_discriminant() {
        let table = sample_table();
        let mut buf = table.to_bytes();
        // First column's type byte sits right after name + last_row_id.
        let ty_at = 2 + table.name.len() + 8 + 1;
        buf[ty_at] = 99;
        assert!(Table::from_bytes(&buf).is_err());
    }

    #[test]
    fn test_rowid_lookup() {
        let table = sample_table();
        assert_eq!(table.rowid_column().unwrap().name, "a");
        assert!(table.column("column2").is_some());
        assert!(table.column("nope").is_none());
    }
}
