//! Seen-set storage implementations.
//!
//! Available backends:
//! - `MemoryStore` - In-memory storage (tests, injected setups)
//! - `JsonFileStore` - Pretty-printed JSON document on disk

pub mod json_file;
pub mod memory;

pub use json_file::{JsonFileStore, DEFAULT_STORE_PATH};
pub use memory::MemoryStore;
