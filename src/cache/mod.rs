//! Process-wide caches shared across interpreter instances (§5.1): the
//! per-address conversion cache (C6's memoisation layer) and the Keccak-256
//! hash cache (C5).

pub mod conversion_cache;
pub mod hash_cache;

pub use conversion_cache::ConversionCache;
pub use hash_cache::HashCache;
