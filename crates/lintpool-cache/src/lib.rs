//! Persistent lint result cache for lintpool.
//!
//! The cache maps each linted file to the signature it had when linted, the
//! fingerprint of the configuration used, and the result with its source
//! text stripped. An entry is reused only when both the signature and the
//! fingerprint still match.
//!
//! ```rust,no_run
//! use std::path::Path;
//! use lintpool_cache::{ResultCache, resolve_cache_file};
//! use lintpool_core::CacheStrategy;
//!
//! let path = resolve_cache_file(Path::new(".lintpoolcache"), Path::new("/project"));
//! let mut cache = ResultCache::load(&path, CacheStrategy::Metadata).unwrap();
//! cache.reconcile();
//! cache.save().unwrap();
//! ```

mod cache;
mod location;

pub use cache::{CACHE_FORMAT_VERSION, CacheEntry, ResultCache};
pub use location::{delete_cache_file, resolve_cache_file};
pub use lintpool_core::FileSignature;
