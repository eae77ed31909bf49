use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Result};

use crate::common::{column_attr, ensure, span_err, trace_module};

/// Widest column a row may declare, in bytes.
const MAX_COLUMN_WIDTH: usize = 32;

/// Implements `crate::trace::TraceRow` and one index constant per column.
pub(crate) fn try_derive(ast: DeriveInput) -> Result<proc_macro2::TokenStream> {
    let Data::Struct(data) = &ast.data else {
        return Err(span_err!(&ast, "expected `struct`"));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(span_err!(&ast, "trace row must have named fields"));
    };
    ensure!(
        ast.generics.params.is_empty(),
        &ast.generics,
        "trace row must not be generic"
    );
    ensure!(!fields.named.is_empty(), &ast, "trace row has no column");

    let Some(module) = trace_module(&ast.attrs)? else {
        return Err(span_err!(&ast, "missing `#[trace(module = \"...\")]`"));
    };

    let name = &ast.ident;
    let vis = &ast.vis;

    let mut columns = Vec::with_capacity(fields.named.len());
    let mut setters = Vec::with_capacity(fields.named.len());
    let mut indices = Vec::with_capacity(fields.named.len());
    for (index, field) in fields.named.iter().enumerate() {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| span_err!(field, "expected a named field"))?;
        let attr = column_attr(&field.attrs)?;
        let Some(width) = attr.width else {
            return Err(span_err!(field, "missing `#[column(width = N)]`"));
        };
        ensure!(
            (1..=MAX_COLUMN_WIDTH).contains(&width),
            field,
            "column width must be between 1 and 32 bytes"
        );

        let upper = ident.to_string().trim_start_matches("r#").to_uppercase();
        let column_name = format!("{module}.{}", attr.name.unwrap_or_else(|| upper.clone()));
        let index_ident = format_ident!("{}", upper);

        columns.push(quote!(crate::trace::Column::new(#column_name, #width)));
        setters.push(quote! {
            trace.set(#index, crate::trace::CellValue::to_cell(&self.#ident))?;
        });
        indices.push(quote! {
            #vis const #index_ident: usize = #index;
        });
    }

    Ok(quote! {
        impl crate::trace::TraceRow for #name {
            const MODULE: &'static str = #module;
            const COLUMNS: &'static [crate::trace::Column] = &[#(#columns),*];

            fn write(&self, trace: &mut crate::trace::Trace) -> crate::trace::TraceResult<()> {
                #(#setters)*
                ::core::result::Result::Ok(())
            }
        }

        #[allow(dead_code)]
        impl #name {
            #(#indices)*
        }
    })
}
