use syn::{Attribute, LitInt, LitStr};

/// Prefixes an error message and generates a `syn::Error` from the message.
macro_rules! span_err {
    ($ast:expr, $msg:literal $(,)?) => {
        ::syn::Error::new_spanned($ast, ::core::concat!("zk_tracer_proc_macro error: ", $msg))
    };
}
pub(crate) use span_err;

/// Checks the condition and returns early with a prefixed error message if
/// false.
macro_rules! ensure {
    ($cond:expr, $ast:expr, $msg:literal $(,)?) => {
        if !$cond {
            return Err($crate::common::span_err!($ast, $msg));
        }
    };
}
pub(crate) use ensure;

/// Returns the value of `module` in a `#[trace(module = "...")]` attribute, if
/// any.
pub(crate) fn trace_module<'a>(
    attrs: impl IntoIterator<Item = &'a Attribute>,
) -> syn::Result<Option<String>> {
    let mut module = None;
    for attr in attrs.into_iter().filter(|a| a.path().is_ident("trace")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("module") {
                let value: LitStr = meta.value()?.parse()?;
                module = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("zk_tracer_proc_macro error: unsupported `trace` attribute"))
            }
        })?;
    }
    Ok(module)
}

/// Width and optional name override parsed from a `#[column(...)]` attribute.
pub(crate) struct ColumnAttr {
    pub(crate) width: Option<usize>,
    pub(crate) name: Option<String>,
}

pub(crate) fn column_attr<'a>(
    attrs: impl IntoIterator<Item = &'a Attribute>,
) -> syn::Result<ColumnAttr> {
    let mut parsed = ColumnAttr {
        width: None,
        name: None,
    };
    for attr in attrs.into_iter().filter(|a| a.path().is_ident("column")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("width") {
                let value: LitInt = meta.value()?.parse()?;
                parsed.width = Some(value.base10_parse()?);
                Ok(())
            } else if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                parsed.name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("zk_tracer_proc_macro error: unsupported `column` attribute"))
            }
        })?;
    }
    Ok(parsed)
}
