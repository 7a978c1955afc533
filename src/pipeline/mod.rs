//! Pipeline stages for one decode call.
//!
//! Each submodule implements exactly one step, so each is independently
//! testable and the engine can be swapped without touching the parser.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ command ──▶ engine ──▶ report
//! (stage)    (argv)     (process)   (state machine)
//! ```
//!
//! 1. [`input`]   — resolve a path, or stage an in-memory image/byte buffer
//!    to a uniquely named temp file that is removed after the engine exits
//! 2. [`command`] — build the engine's argument vector from config + options
//! 3. [`engine`]  — spawn the engine and capture its full standard output
//! 4. [`report`]  — split the report into per-image blocks and parse each

pub mod command;
pub mod engine;
pub mod input;
pub mod report;
