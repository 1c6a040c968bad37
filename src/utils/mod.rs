//! Utility modules

pub mod memory_storage;
pub mod text;

pub use memory_storage::*;
pub use text::*;
