//! Verdict cache: key derivation, store interface and shipped backends.

pub mod file;
pub mod key;
pub mod memory;
pub mod store;

pub use file::FileStore;
pub use key::cache_key;
pub use memory::MemoryStore;
pub use store::{CacheStore, Record};
