//! A tracer lowering EVM execution events into the columns of a constraint
//! trace.
//!
//! The input is the flat sequence of [`TraceEvent`]s an EVM interpreter emits
//! while executing the transactions of a conflation: one event per opcode,
//! plus the transaction and context boundaries (see [`structlog`]). The
//! output is a set of fixed-width tables, one per module, which a proving
//! backend constrains row by row:
//!
//! - `hub`: one row per opcode, with the context and gas facts, the
//!   exceptions, and the stamps of the module operations the opcode triggered;
//! - `mxp`: memory expansion;
//! - `stp`: gas allowances of calls and creations;
//! - `oob`: out-of-bounds checks, including the pricing of precompiles;
//! - `exp`: exponent logarithms;
//! - `mmu`: memory operations;
//! - `shakiradata`: inputs and digests of SHA2, RIPEMD and KECCAK;
//! - `wcp`: the word comparisons requested by the modules above.
//!
//! The tables only reference each other through stamps and context numbers.
//!
//! # Usage
//!
//! ```no_run
//! use zk_tracer::{TraceEvent, Tracer, TracerConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let events: Vec<TraceEvent> = serde_json::from_str("[]")?;
//! let mut tracer = Tracer::new(TracerConfig::default());
//! tracer.handle_events(&events)?;
//! for table in tracer.finalize()? {
//!     println!("{}: {} rows", table.module(), table.row_count());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! A [`HostError`](witness::errors::HostError) means the interpreter sent an
//! event the tracer can not lower: the rows of that event are dropped, and the
//! tracer moves on. A [`ProtocolViolation`](witness::errors::ProtocolViolation)
//! is a defect of the tracer itself, after which the traces can not be
//! trusted.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::field_reassign_with_default)]

// Execution model
pub mod callstack;
pub mod deployment;
pub mod gas;
pub mod opcode;
pub mod precompiles;
pub mod structlog;

// Modules
pub mod exp;
pub mod hash_data;
pub mod hub;
pub mod imc;
pub mod mmu;
pub mod mxp;
pub mod oob;
pub mod stp;
pub mod wcp;

// Witness generation
pub mod generation;
pub mod trace;
pub mod witness;

// Utility modules
pub mod testing_utils;

// Public definitions and re-exports
pub use crate::generation::{Tracer, TracerConfig};
pub use crate::structlog::TraceEvent;
pub use crate::trace::TraceTable;
pub use crate::witness::errors::{TracerError, TracerResult};
