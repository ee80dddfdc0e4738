//! Pipeline stages for a page-by-page run.
//!
//! Each submodule owns one side of the loop in [`crate::iterate`]:
//!
//! ```text
//! load ──▶ llm ──▶ sink
//! (lopdf)  (stream) (append)
//! ```
//!
//! 1. [`load`] turns a path into ordered page texts; runs in `spawn_blocking`
//!    because PDF parsing is CPU-bound
//! 2. [`llm`] streams one completion per page; the only stage with network I/O
//! 3. [`sink`] appends accepted pages to the output file

pub mod llm;
pub mod load;
pub mod sink;
