//! Document adapter: the narrow capability the engine uses to read and
//! write the collaborative document's tables (spec.md §4.4).

pub mod adapter;
pub mod error;
pub mod memory;
pub mod tables;

pub use adapter::DocumentAdapter;
pub use error::{AdapterError, Result};
pub use memory::MemoryAdapter;
pub use tables::*;
