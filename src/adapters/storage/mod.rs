//! Storage Adapter
//!
//! File-backed implementation of the ScanJournal port.

mod journal;

pub use journal::JsonJournal;
