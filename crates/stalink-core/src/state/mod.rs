// # Key-Value Store Implementations
//
// Implementations of the KeyValueStore trait for different persistence
// strategies.

pub mod file;
pub mod memory;

pub use file::{FileKvStore, FileKvStoreFactory};
pub use memory::{MemoryKvStore, MemoryKvStoreFactory};
