use zk_tracer_proc_macro::TraceRow;

use crate::trace::{Cell, Column, Trace, TraceRow as _};

#[derive(TraceRow)]
#[trace(module = "demo")]
pub struct DemoRow {
    #[column(width = 16)]
    arg_1_hi: u128,
    #[column(width = 1, name = "nBYTES")]
    n_bytes: u128,
    #[column(width = 1)]
    is_data: bool,
}

#[test]
fn columns_are_prefixed_and_ordered() {
    assert_eq!(DemoRow::MODULE, "demo");
    assert_eq!(
        DemoRow::COLUMNS,
        &[
            Column::new("demo.ARG_1_HI", 16),
            Column::new("demo.nBYTES", 1),
            Column::new("demo.IS_DATA", 1),
        ]
    );
    assert_eq!(DemoRow::ARG_1_HI, 0);
    assert_eq!(DemoRow::N_BYTES, 1);
    assert_eq!(DemoRow::IS_DATA, 2);
}

#[test]
fn write_sets_every_column_once() {
    let row = DemoRow {
        arg_1_hi: 7,
        n_bytes: 3,
        is_data: true,
    };
    let mut trace = Trace::default();
    row.write(&mut trace).unwrap();
    assert_eq!(trace.cells, vec![(0, Cell(7)), (1, Cell(3)), (2, Cell(1))]);

    // The same row cannot be written twice into one open row.
    assert!(row.write(&mut trace).is_err());
}
