//! Per-item host boundary
//!
//! Raw item records come in, one independently constructed and torn-down
//! crawl session runs per item, and output records go out. The
//! continue-on-failure flag decides whether an item error is annotated into
//! the output or aborts the remaining items.

mod item;
mod runner;

pub use item::{ItemInput, OutputRecord};
pub use runner::{process_item, run_batch, BackendFactory};
