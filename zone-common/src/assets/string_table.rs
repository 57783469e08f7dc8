//! String table assets: CSV-authored lookup tables, stored row-major.

use crate::arena::ZoneArena;
use crate::buffer::ZoneBuffer;
use crate::cursor::ZoneCursor;
use crate::error::{Result, ZoneError};
use crate::wire::{read_u16, read_u32, MARKER_FOLLOWS, WireRecord};

/// In-memory string table. `cells` is row-major with
/// `columns * rows` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringTable {
    pub columns: u16,
    pub rows: u16,
    pub cells: Vec<String>,
}

impl StringTable {
    pub fn cell(&self, row: u16, column: u16) -> Option<&str> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        self.cells
            .get(row as usize * self.columns as usize + column as usize)
            .map(String::as_str)
    }
}

/// Fixed-size string table wire record (12 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringTableRecord {
    pub columns: u16,
    pub rows: u16,
    pub cells_marker: u32,
    pub name_marker: u32,
}

impl WireRecord for StringTableRecord {
    const SIZE: usize = 12;

    fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.columns.to_le_bytes());
        bytes.extend_from_slice(&self.rows.to_le_bytes());
        bytes.extend_from_slice(&self.cells_marker.to_le_bytes());
        bytes.extend_from_slice(&self.name_marker.to_le_bytes());
        bytes
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            columns: read_u16(bytes, 0)?,
            rows: read_u16(bytes, 2)?,
            cells_marker: read_u32(bytes, 4)?,
            name_marker: read_u32(bytes, 8)?,
        })
    }
}

fn record_for(table: &StringTable) -> StringTableRecord {
    StringTableRecord {
        columns: table.columns,
        rows: table.rows,
        cells_marker: MARKER_FOLLOWS,
        name_marker: MARKER_FOLLOWS,
    }
}

fn cells_from(cursor: &mut ZoneCursor<'_>, arena: &mut ZoneArena, record: &StringTableRecord) -> Result<Vec<String>> {
    let count = record.columns as usize * record.rows as usize;
    let mut cells = Vec::with_capacity(count);
    for _ in 0..count {
        let cell = cursor.read_string(arena)?;
        cells.push(arena.get_str(cell).to_string());
    }
    Ok(cells)
}

/// Write one string table: record, name, then every cell in row-major
/// order.
pub fn write(table: &StringTable, name: &str, buf: &mut ZoneBuffer) {
    buf.write_struct(&record_for(table));
    buf.write_str(name);
    for cell in &table.cells {
        buf.write_str(cell);
    }
}

/// Read one string table, mirroring [`write`].
pub fn read(cursor: &mut ZoneCursor<'_>, arena: &mut ZoneArena) -> Result<(String, StringTable)> {
    let record = cursor.read_single::<StringTableRecord>()?;
    if record.cells_marker != MARKER_FOLLOWS || record.name_marker != MARKER_FOLLOWS {
        return Err(ZoneError::Format(
            "string table record carries bad markers".to_string(),
        ));
    }
    let name = cursor.read_string(arena)?;
    let cells = cells_from(cursor, arena, &record)?;
    Ok((
        arena.get_str(name).to_string(),
        StringTable {
            columns: record.columns,
            rows: record.rows,
            cells,
        },
    ))
}

/// Serialize the flat canonical form.
pub fn canonical_bytes(name: &str, table: &StringTable) -> Vec<u8> {
    let mut buf = ZoneBuffer::new();
    write(table, name, &mut buf);
    let blob = buf.finish();
    blob[crate::buffer::ZONE_INDEX_SIZE..].to_vec()
}

/// Parse the flat canonical form.
pub fn parse_canonical(bytes: &[u8]) -> Result<(String, StringTable)> {
    let mut arena = ZoneArena::new();
    let mut cursor = ZoneCursor::open_flat(bytes);
    read(&mut cursor, &mut arena)
}

/// Parse the external CSV source form. Column count comes from the widest
/// row; short rows are padded with empty cells.
pub fn parse_external(text: &str) -> StringTable {
    let rows: Vec<Vec<&str>> = text
        .lines()
        .map(|line| line.split(',').collect())
        .collect();
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut cells = Vec::with_capacity(rows.len() * columns);
    for row in &rows {
        for i in 0..columns {
            cells.push(row.get(i).copied().unwrap_or("").to_string());
        }
    }
    StringTable {
        columns: columns as u16,
        rows: rows.len() as u16,
        cells,
    }
}

/// Render the external CSV source form.
pub fn to_external(table: &StringTable) -> String {
    let mut out = String::new();
    for row in 0..table.rows {
        let start = row as usize * table.columns as usize;
        let end = start + table.columns as usize;
        out.push_str(&table.cells[start..end].join(","));
        out.push('\n');
    }
    out
}

/// The synthesized safe default: an empty table.
pub fn default_table() -> StringTable {
    StringTable {
        columns: 0,
        rows: 0,
        cells: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_table() -> StringTable {
        StringTable {
            columns: 3,
            rows: 2,
            cells: vec![
                "id".to_string(),
                "cost".to_string(),
                "label".to_string(),
                "smoke".to_string(),
                "400".to_string(),
                "Smoke Grenade".to_string(),
            ],
        }
    }

    #[test]
    fn test_cell_lookup() {
        let table = test_table();
        assert_eq!(table.cell(1, 2), Some("Smoke Grenade"));
        assert_eq!(table.cell(2, 0), None);
        assert_eq!(table.cell(0, 3), None);
    }

    #[test]
    fn test_zone_write_read_roundtrip() {
        let table = test_table();
        let mut buf = ZoneBuffer::new();
        write(&table, "mp/weapons.csv", &mut buf);
        let blob = buf.finish();

        let mut arena = ZoneArena::new();
        let mut cursor = ZoneCursor::open(&blob).unwrap();
        let (name, restored) = read(&mut cursor, &mut arena).unwrap();
        assert_eq!(name, "mp/weapons.csv");
        assert_eq!(restored, table);
    }

    #[test]
    fn test_csv_roundtrip() {
        let table = test_table();
        let csv = to_external(&table);
        assert_eq!(parse_external(&csv), table);
    }

    #[test]
    fn test_csv_ragged_rows_padded() {
        let table = parse_external("a,b,c\nd\n");
        assert_eq!(table.columns, 3);
        assert_eq!(table.rows, 2);
        assert_eq!(table.cell(1, 0), Some("d"));
        assert_eq!(table.cell(1, 2), Some(""));
    }

    #[test]
    fn test_default_is_empty() {
        let table = default_table();
        assert_eq!(table.columns, 0);
        assert_eq!(table.rows, 0);
        assert!(table.cells.is_empty());
    }
}
