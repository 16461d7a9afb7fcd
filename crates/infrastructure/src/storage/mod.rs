//! Key-value storage adapters.
//!
//! Both adapters implement [`KeyValueStore`](warden_application::ports::KeyValueStore):
//! [`MemoryStorage`] for tests and short-lived sessions, [`FileStorage`] for
//! a cache that survives restarts.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;
