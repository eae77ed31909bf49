pub mod errors;
pub(crate) mod precompile;
pub mod state;
pub(crate) mod traces;
pub(crate) mod transition;
