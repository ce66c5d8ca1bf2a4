//! Flush executor: turns pending touches into batched update statements.
//!
//! One statement per (table, attribute set) group, one timestamp per pass,
//! one store transaction per pass, per-record callbacks after the write.

mod batch;
mod immediate;
mod passes;

pub(crate) use immediate::touch_now;
pub(crate) use passes::flush_pending;
