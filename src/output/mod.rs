//! Output module
//!
//! Formats run summaries and store statistics for the terminal.

mod stats;

pub use stats::{print_run_summary, print_store_stats};
