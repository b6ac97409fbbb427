//! Ordered record store implementations.
//!
//! The [`OrderedRecordStore`](crate::traits::OrderedRecordStore) trait lives
//! at the crate root; this module holds concrete backends.

pub mod memory;

pub use memory::MemoryRecordStore;
