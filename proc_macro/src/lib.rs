//! This library provides a derive macro describing one row of a columnar
//! trace table.
//!
//! Deriving [`TraceRow`] on a struct with named fields implements the
//! `crate::trace::TraceRow` trait of the invoking crate: the ordered column
//! set of the table (names prefixed with the module name, fixed byte widths)
//! and a writer that sets every column of the current row from the fields of
//! the struct. Since a row can only be built through a struct literal, totality
//! of the row is checked by the compiler, while the trace itself still rejects
//! double-set and over-wide columns at runtime.
//!
//! The struct must carry `#[trace(module = "...")]` and every field a
//! `#[column(width = N)]` attribute, where `N` is the width in bytes (1 to 32).
//! A column name defaults to the upper-cased field name and can be overridden
//! with `#[column(width = N, name = "...")]`.
//!
//! For every field, an associated constant with the upper-cased field name is
//! generated, holding the index of the column in the table.
//!
//! The generated code refers to `crate::trace`, so the macro is meant to be
//! used from within the tracer crate.

pub(crate) mod common;
mod impls;

use impls::trace_row;

#[proc_macro_derive(TraceRow, attributes(trace, column))]
pub fn derive_trace_row(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast = syn::parse_macro_input!(input as syn::DeriveInput);
    trace_row::try_derive(ast)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
