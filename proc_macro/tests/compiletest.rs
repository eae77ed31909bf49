mod compile;

/// Minimal stand-in for the `trace` module of the tracer crate, which the
/// derived code refers to through `crate::trace`.
pub(crate) mod trace {
    pub type TraceResult<T> = Result<T, String>;

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

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Cell(pub u128);

    pub trait CellValue {
        fn to_cell(&self) -> Cell;
    }

    impl CellValue for u128 {
        fn to_cell(&self) -> Cell {
            Cell(*self)
        }
    }

    impl CellValue for bool {
        fn to_cell(&self) -> Cell {
            Cell(*self as u128)
        }
    }

    #[derive(Default)]
    pub struct Trace {
        pub cells: Vec<(usize, Cell)>,
    }

    impl Trace {
        pub fn set(&mut self, column: usize, cell: Cell) -> TraceResult<&mut Self> {
            if self.cells.iter().any(|(c, _)| *c == column) {
                return Err(format!("column {column} already set"));
            }
            self.cells.push((column, cell));
            Ok(self)
        }
    }

    pub trait TraceRow {
        const MODULE: &'static str;
        const COLUMNS: &'static [Column];

        fn write(&self, trace: &mut Trace) -> TraceResult<()>;
    }
}
