//! Change-detection signatures for cached files.

use std::fs::{File, Metadata};
use std::io::Read;
use std::path::Path;
use std::time::UNIX_EPOCH;

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use crate::options::CacheStrategy;

/// What a cache entry remembers about a file to detect changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSignature {
    /// File size in bytes.
    pub size: u64,

    /// Modification time in nanoseconds since the epoch (metadata strategy).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_ns: Option<u64>,

    /// BLAKE3 of the content, hex-encoded (content strategy).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl FileSignature {
    /// Compute the current signature of `path` for `strategy`.
    pub fn compute(path: &Path, strategy: CacheStrategy) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;

        match strategy {
            CacheStrategy::Metadata => Self::from_metadata(&metadata),
            CacheStrategy::Content => Ok(Self {
                size: metadata.len(),
                modified_ns: None,
                content_hash: Some(hash_file(path)?),
            }),
        }
    }

    /// Read `path` and return its bytes with the signature of that read.
    ///
    /// Metadata is taken before the bytes are read, so a write racing the
    /// read yields a signature older than the content and the next lookup
    /// misses. Content signatures hash exactly the returned bytes.
    pub fn read(path: &Path, strategy: CacheStrategy) -> std::io::Result<(Vec<u8>, Self)> {
        let metadata = std::fs::metadata(path)?;
        let bytes = std::fs::read(path)?;

        let signature = match strategy {
            CacheStrategy::Metadata => Self::from_metadata(&metadata)?,
            CacheStrategy::Content => Self {
                size: bytes.len() as u64,
                modified_ns: None,
                content_hash: Some(blake3::hash(&bytes).to_hex().to_string()),
            },
        };
        Ok((bytes, signature))
    }

    fn from_metadata(metadata: &Metadata) -> std::io::Result<Self> {
        let modified_ns = metadata
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Ok(Self {
            size: metadata.len(),
            modified_ns: Some(modified_ns),
            content_hash: None,
        })
    }
}

/// Full BLAKE3 hash of a file.
fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}
