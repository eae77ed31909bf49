//! Fixed-width columnar trace buffers.
//!
//! A [`Trace`] holds one byte buffer per column of a module table. Every
//! column of a row must be set exactly once before the row is validated, or
//! the row is zero-filled as a whole. Rows are described by structs deriving
//! [`TraceRow`], which set every column in one go.

mod file;

use bitvec::{order::Lsb0, vec::BitVec};
use ethereum_types::{Address, U256};

pub use self::file::{read_headers, FILE_MAGIC, FILE_VERSION};
use crate::witness::errors::ProtocolViolation;

pub type TraceResult<T> = Result<T, ProtocolViolation>;

/// Name and width, in bytes, of a trace column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub width: usize,
}

impl Column {
    pub const fn new(name: &'static str, width: usize) -> Self {
        Self { name, width }
    }
}

/// Describes a built column: its fully qualified name, the width of each
/// element and the number of elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnHeader {
    pub name: String,
    pub bytes_per_element: usize,
    pub length: usize,
}

/// An unsigned value of at most 32 bytes, stored big-endian.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell([u8; 32]);

impl Cell {
    /// Number of significant bytes.
    pub fn byte_len(&self) -> usize {
        self.0.iter().position(|b| *b != 0).map_or(0, |i| 32 - i)
    }

    fn tail(&self, width: usize) -> &[u8] {
        &self.0[32 - width..]
    }
}

/// Conversion of row fields into cells.
pub trait CellValue {
    fn to_cell(&self) -> Cell;
}

impl CellValue for U256 {
    fn to_cell(&self) -> Cell {
        let mut bytes = [0; 32];
        self.to_big_endian(&mut bytes);
        Cell(bytes)
    }
}

impl CellValue for Address {
    fn to_cell(&self) -> Cell {
        let mut bytes = [0; 32];
        bytes[12..].copy_from_slice(self.as_bytes());
        Cell(bytes)
    }
}

impl CellValue for bool {
    fn to_cell(&self) -> Cell {
        u8::from(*self).to_cell()
    }
}

macro_rules! impl_cell_value {
    ($($t:ty),*) => {
        $(
            impl CellValue for $t {
                fn to_cell(&self) -> Cell {
                    let mut bytes = [0; 32];
                    let be = self.to_be_bytes();
                    bytes[32 - be.len()..].copy_from_slice(&be);
                    Cell(bytes)
                }
            }
        )*
    };
}

impl_cell_value!(u8, u16, u32, u64, u128, usize);

/// A row of a module table.
///
/// Implemented with `#[derive(TraceRow)]`.
pub trait TraceRow {
    const MODULE: &'static str;
    const COLUMNS: &'static [Column];

    /// Sets every column of the current row of `trace`.
    fn write(&self, trace: &mut Trace) -> TraceResult<()>;
}

/// Column buffers of a module table under construction.
#[derive(Debug)]
pub struct Trace {
    module: &'static str,
    columns: &'static [Column],
    buffers: Vec<Vec<u8>>,
    filled: BitVec<usize, Lsb0>,
    rows: usize,
}

impl Trace {
    pub fn new(module: &'static str, columns: &'static [Column]) -> Self {
        Self {
            module,
            columns,
            buffers: vec![Vec::new(); columns.len()],
            filled: BitVec::repeat(false, columns.len()),
            rows: 0,
        }
    }

    /// Returns an empty trace with the columns of the row type `R`.
    pub fn for_row<R: TraceRow>() -> Self {
        Self::new(R::MODULE, R::COLUMNS)
    }

    pub const fn module(&self) -> &'static str {
        self.module
    }

    /// Sets the column at `index` of the current row.
    pub fn set(&mut self, index: usize, cell: Cell) -> TraceResult<()> {
        let column = self
            .columns
            .get(index)
            .ok_or(ProtocolViolation::UnknownColumn {
                module: self.module,
                index,
            })?;
        if self.filled[index] {
            return Err(ProtocolViolation::ColumnAlreadySet {
                column: column.name,
            });
        }
        let bytes = cell.byte_len();
        if bytes > column.width {
            return Err(ProtocolViolation::InvalidWidth {
                column: column.name,
                width: column.width,
                bytes,
            });
        }

        self.buffers[index].extend_from_slice(cell.tail(column.width));
        self.filled.set(index, true);
        Ok(())
    }

    /// Whether some column of the current row has been set.
    pub fn has_open_row(&self) -> bool {
        self.filled.any()
    }

    /// Commits the current row, which must have all its columns set.
    pub fn validate_row(&mut self) -> TraceResult<()> {
        if let Some(index) = self.filled.first_zero() {
            return Err(ProtocolViolation::ColumnNotFilled {
                column: self.columns[index].name,
            });
        }
        self.filled.fill(false);
        self.rows += 1;
        Ok(())
    }

    /// Zero-fills the unset columns of the current row and commits it.
    pub fn fill_and_validate_row(&mut self) -> TraceResult<()> {
        let unset = self.filled.iter_zeros().collect::<Vec<_>>();
        for index in unset {
            self.set(index, Cell::default())?;
        }
        self.validate_row()
    }

    /// Writes and commits a row.
    pub fn push<R: TraceRow>(&mut self, row: &R) -> TraceResult<()> {
        row.write(self)?;
        self.validate_row()
    }

    /// Appends `rows` zero-filled rows.
    pub fn pad(&mut self, rows: usize) -> TraceResult<()> {
        for _ in 0..rows {
            self.fill_and_validate_row()?;
        }
        Ok(())
    }

    /// Number of committed rows.
    pub fn size(&self) -> TraceResult<usize> {
        if self.has_open_row() {
            return Err(ProtocolViolation::OpenRow {
                module: self.module,
            });
        }
        Ok(self.rows)
    }

    pub fn headers(&self) -> Vec<ColumnHeader> {
        self.columns
            .iter()
            .map(|column| ColumnHeader {
                name: column.name.to_string(),
                bytes_per_element: column.width,
                length: self.rows,
            })
            .collect()
    }

    /// Freezes the trace. Fails if a row has been started but not validated.
    pub fn build(self) -> TraceResult<TraceTable> {
        self.size()?;
        Ok(TraceTable {
            headers: self.headers(),
            module: self.module,
            columns: self.buffers,
        })
    }
}

/// An immutable module table, ready to be written out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceTable {
    module: &'static str,
    headers: Vec<ColumnHeader>,
    columns: Vec<Vec<u8>>,
}

impl TraceTable {
    pub const fn module(&self) -> &'static str {
        self.module
    }

    pub fn headers(&self) -> &[ColumnHeader] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.headers.first().map_or(0, |header| header.length)
    }

    /// Raw big-endian bytes of the column named `name`.
    pub fn column(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .position(|header| header.name == name)
            .map(|index| self.columns[index].as_slice())
    }

    /// Value of the column named `name` at `row`.
    pub fn value(&self, name: &str, row: usize) -> Option<U256> {
        let index = self.headers.iter().position(|header| header.name == name)?;
        let width = self.headers[index].bytes_per_element;
        let bytes = self.columns[index].get(row * width..(row + 1) * width)?;
        Some(U256::from_big_endian(bytes))
    }

    /// Values of the column named `name`, one per row.
    pub fn values(&self, name: &str) -> Vec<U256> {
        (0..self.row_count())
            .map_while(|row| self.value(name, row))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[Column] = &[
        Column::new("demo.STAMP", 4),
        Column::new("demo.FLAG", 1),
        Column::new("demo.ACC", 17),
    ];

    #[test]
    fn values_are_left_padded_big_endian() {
        let mut trace = Trace::new("demo", COLUMNS);
        trace.set(0, 0x0102u32.to_cell()).unwrap();
        trace.set(1, true.to_cell()).unwrap();
        trace.set(2, U256::from(u128::MAX).to_cell()).unwrap();
        trace.validate_row().unwrap();

        let table = trace.build().unwrap();
        assert_eq!(table.column("demo.STAMP"), Some(&[0, 0, 1, 2][..]));
        assert_eq!(table.value("demo.FLAG", 0), Some(U256::one()));
        assert_eq!(table.value("demo.ACC", 0), Some(U256::from(u128::MAX)));
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn column_cannot_be_set_twice() {
        let mut trace = Trace::new("demo", COLUMNS);
        trace.set(1, false.to_cell()).unwrap();
        assert_eq!(
            trace.set(1, true.to_cell()),
            Err(ProtocolViolation::ColumnAlreadySet {
                column: "demo.FLAG"
            })
        );
    }

    #[test]
    fn too_wide_values_are_rejected() {
        let mut trace = Trace::new("demo", COLUMNS);
        assert_eq!(
            trace.set(0, u64::from(u32::MAX).wrapping_add(1).to_cell()),
            Err(ProtocolViolation::InvalidWidth {
                column: "demo.STAMP",
                width: 4,
                bytes: 5
            })
        );
        assert_eq!(
            trace.set(7, 0u8.to_cell()),
            Err(ProtocolViolation::UnknownColumn {
                module: "demo",
                index: 7
            })
        );
    }

    #[test]
    fn partial_rows_are_rejected() {
        let mut trace = Trace::new("demo", COLUMNS);
        trace.set(0, 1u8.to_cell()).unwrap();
        assert_eq!(
            trace.validate_row(),
            Err(ProtocolViolation::ColumnNotFilled { column: "demo.FLAG" })
        );
        assert_eq!(
            trace.build().unwrap_err(),
            ProtocolViolation::OpenRow { module: "demo" }
        );
    }

    #[test]
    fn fill_completes_the_open_row() {
        let mut trace = Trace::new("demo", COLUMNS);
        trace.set(1, true.to_cell()).unwrap();
        trace.fill_and_validate_row().unwrap();
        trace.pad(2).unwrap();
        assert!(!trace.has_open_row());
        assert_eq!(trace.size(), Ok(3));

        let table = trace.build().unwrap();
        assert_eq!(
            table.values("demo.FLAG"),
            vec![U256::one(), U256::zero(), U256::zero()]
        );
        assert!(table.headers().iter().all(|header| header.length == 3));
        assert_eq!(table.column("demo.ACC").map(<[u8]>::len), Some(3 * 17));
    }
}
