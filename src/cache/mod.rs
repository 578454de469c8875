//! Content-addressed caching
//!
//! Keys are derived from the job's declared checksum inputs before any
//! environment exists; the store persists declared paths between runs.

pub mod key;
pub mod store;

pub use key::{checksum_file, derive_key, CacheKey};
pub use store::CacheStore;
