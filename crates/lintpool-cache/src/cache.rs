//! Persistent per-file lint result cache.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use lintpool_core::{
    CacheStrategy, ConfigFingerprint, FileSignature, LintError, LintResult, ResolvedConfig,
};

/// On-disk format version. Caches written with another version are discarded.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// One cached file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Signature of the content the result was computed from.
    pub signature: FileSignature,
    /// Fingerprint of the configuration that produced the result.
    pub config_fingerprint: ConfigFingerprint,
    /// The result without its source text.
    pub result: LintResult,
    /// Whether the original result carried source text to re-read on hydrate.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub had_source: bool,
}

#[derive(Debug, Deserialize)]
struct CacheDocument {
    version: u32,
    strategy: CacheStrategy,
    entries: BTreeMap<PathBuf, CacheEntry>,
}

/// File-entry cache keyed by file path.
///
/// Lookups take `&self` so workers can share a loaded cache; stores,
/// reconciliation and saving happen on the owning thread after workers join.
#[derive(Debug)]
pub struct ResultCache {
    path: PathBuf,
    strategy: CacheStrategy,
    entries: BTreeMap<PathBuf, CacheEntry>,
}

impl ResultCache {
    /// Create an empty cache that will be saved to `path`.
    pub fn new(path: impl Into<PathBuf>, strategy: CacheStrategy) -> Self {
        Self {
            path: path.into(),
            strategy,
            entries: BTreeMap::new(),
        }
    }

    /// Load the cache at `path`.
    ///
    /// A missing file yields an empty cache. A file that cannot be parsed, or
    /// was written with another format version or strategy, is discarded.
    pub fn load(path: impl Into<PathBuf>, strategy: CacheStrategy) -> Result<Self, LintError> {
        let path = path.into();
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(cache = %path.display(), "no cache file, starting empty");
                return Ok(Self::new(path, strategy));
            }
            Err(e) => return Err(LintError::io(&path, e)),
        };

        let document: CacheDocument = match serde_json::from_slice(&bytes) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(cache = %path.display(), error = %e, "discarding unreadable cache");
                return Ok(Self::new(path, strategy));
            }
        };

        if document.version != CACHE_FORMAT_VERSION || document.strategy != strategy {
            tracing::debug!(
                cache = %path.display(),
                version = document.version,
                "discarding cache written with a different format or strategy"
            );
            return Ok(Self::new(path, strategy));
        }

        tracing::debug!(cache = %path.display(), entries = document.entries.len(), "loaded cache");
        Ok(Self {
            path,
            strategy,
            entries: document.entries,
        })
    }

    /// Path the cache is saved to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Change-detection strategy.
    pub fn strategy(&self) -> CacheStrategy {
        self.strategy
    }

    /// Number of cached files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw entry for a file, without validation.
    pub fn entry(&self, file_path: &Path) -> Option<&CacheEntry> {
        self.entries.get(file_path)
    }

    /// Cached result for `file_path`, if it can be trusted.
    ///
    /// The entry is trusted only when both the file signature and the
    /// configuration fingerprint still match. Source text stripped on store
    /// is re-read from disk.
    pub fn lookup(&self, file_path: &Path, config: &ResolvedConfig) -> Option<LintResult> {
        let entry = self.entries.get(file_path)?;

        let signature = match FileSignature::compute(file_path, self.strategy) {
            Ok(signature) => signature,
            Err(e) => {
                tracing::debug!(file = %file_path.display(), error = %e, "cannot stat cached file");
                return None;
            }
        };

        if signature != entry.signature {
            tracing::debug!(file = %file_path.display(), "file changed since last run");
            return None;
        }

        if entry.config_fingerprint != config.fingerprint {
            tracing::debug!(file = %file_path.display(), "configuration changed since last run");
            return None;
        }

        let mut result = entry.result.clone();
        if entry.had_source {
            match std::fs::read_to_string(file_path) {
                Ok(source) => result.source = Some(source),
                Err(e) => {
                    tracing::debug!(file = %file_path.display(), error = %e, "cannot re-read source");
                    return None;
                }
            }
        }

        Some(result)
    }

    /// Store `result` for `file_path`, stripping derived fields.
    ///
    /// `signature` must describe the content the result was computed from,
    /// as captured when the file was read; the file is not examined again.
    pub fn store(
        &mut self,
        file_path: &Path,
        signature: FileSignature,
        config_fingerprint: &ConfigFingerprint,
        result: &LintResult,
    ) {
        let mut sanitized = result.clone();
        let had_source = sanitized.source.take().is_some();

        self.entries.insert(
            file_path.to_path_buf(),
            CacheEntry {
                signature,
                config_fingerprint: config_fingerprint.clone(),
                result: sanitized,
                had_source,
            },
        );
    }

    /// Drop entries whose files no longer exist.
    ///
    /// Entries for files that exist but were not linted this run are kept.
    /// Returns the number of pruned entries.
    pub fn reconcile(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|path, _| path.exists());
        let pruned = before - self.entries.len();
        if pruned > 0 {
            tracing::debug!(pruned, "pruned cache entries for removed files");
        }
        pruned
    }

    /// Serialize the cache document.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LintError> {
        let document = CacheDocumentRef {
            version: CACHE_FORMAT_VERSION,
            strategy: self.strategy,
            entries: &self.entries,
        };
        serde_json::to_vec(&document).map_err(|e| LintError::Cache {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Write the cache to disk atomically.
    pub fn save(&self) -> Result<(), LintError> {
        let bytes = self.to_bytes()?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| LintError::io(&dir, e))?;

        let mut temp = NamedTempFile::new_in(&dir).map_err(|e| LintError::io(&dir, e))?;
        temp.write_all(&bytes).map_err(|e| LintError::io(temp.path(), e))?;
        temp.persist(&self.path).map_err(|e| LintError::io(&self.path, e.error))?;

        tracing::debug!(cache = %self.path.display(), entries = self.entries.len(), "saved cache");
        Ok(())
    }
}

#[derive(Serialize)]
struct CacheDocumentRef<'a> {
    version: u32,
    strategy: CacheStrategy,
    entries: &'a BTreeMap<PathBuf, CacheEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use lintpool_core::{LintConfig, LintMessage, RuleEntry, RuleLevel, Severity};
    use std::fs;
    use tempfile::TempDir;

    fn config(level: RuleLevel) -> ResolvedConfig {
        ResolvedConfig::new(
            LintConfig::default().with_rule("r", RuleEntry::Level(level)),
            None,
        )
        .unwrap()
    }

    fn signature(path: &Path, strategy: CacheStrategy) -> FileSignature {
        FileSignature::compute(path, strategy).unwrap()
    }

    fn result_with_source(path: &Path, source: &str) -> LintResult {
        let mut result = LintResult::new(
            path,
            vec![LintMessage::new("r", Severity::Warning, "bad", 1, 1)],
        );
        result.source = Some(source.to_string());
        result
    }

    #[test]
    fn test_store_strips_source_and_lookup_restores_it() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "text ").unwrap();
        let cfg = config(RuleLevel::Warn);

        let mut cache = ResultCache::new(temp.path().join(".cache"), CacheStrategy::Metadata);
        cache.store(
            &file,
            signature(&file, CacheStrategy::Metadata),
            &cfg.fingerprint,
            &result_with_source(&file, "text "),
        );

        let entry = cache.entry(&file).unwrap();
        assert!(entry.result.source.is_none());
        assert!(entry.had_source);

        let hit = cache.lookup(&file, &cfg).unwrap();
        assert_eq!(hit.source.as_deref(), Some("text "));
        assert_eq!(hit.warning_count, 1);
    }

    #[test]
    fn test_lookup_misses_on_config_change() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "text").unwrap();

        let mut cache = ResultCache::new(temp.path().join(".cache"), CacheStrategy::Metadata);
        cache.store(
            &file,
            signature(&file, CacheStrategy::Metadata),
            &config(RuleLevel::Warn).fingerprint,
            &LintResult::new(&file, Vec::new()),
        );

        assert!(cache.lookup(&file, &config(RuleLevel::Warn)).is_some());
        assert!(cache.lookup(&file, &config(RuleLevel::Error)).is_none());
    }

    #[test]
    fn test_lookup_misses_on_content_change() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "text").unwrap();
        let cfg = config(RuleLevel::Warn);

        let mut cache = ResultCache::new(temp.path().join(".cache"), CacheStrategy::Content);
        let sig = signature(&file, CacheStrategy::Content);
        cache.store(&file, sig, &cfg.fingerprint, &LintResult::new(&file, Vec::new()));
        assert!(cache.lookup(&file, &cfg).is_some());

        fs::write(&file, "changed text").unwrap();
        assert!(cache.lookup(&file, &cfg).is_none());
    }

    #[test]
    fn test_store_keeps_the_given_signature() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "bad").unwrap();
        let cfg = config(RuleLevel::Warn);

        let mut cache = ResultCache::new(temp.path().join(".cache"), CacheStrategy::Metadata);
        let seen = signature(&file, CacheStrategy::Metadata);
        fs::write(&file, "good, edited before the store").unwrap();
        cache.store(&file, seen.clone(), &cfg.fingerprint, &result_with_source(&file, "bad"));

        assert_eq!(cache.entry(&file).unwrap().signature, seen);
        assert!(cache.lookup(&file, &cfg).is_none());
    }

    #[test]
    fn test_reconcile_prunes_only_removed_files() {
        let temp = TempDir::new().unwrap();
        let kept = temp.path().join("kept.txt");
        let removed = temp.path().join("removed.txt");
        fs::write(&kept, "a").unwrap();
        fs::write(&removed, "b").unwrap();
        let cfg = config(RuleLevel::Warn);

        let mut cache = ResultCache::new(temp.path().join(".cache"), CacheStrategy::Metadata);
        for file in [&kept, &removed] {
            let sig = signature(file, CacheStrategy::Metadata);
            cache.store(file, sig, &cfg.fingerprint, &LintResult::new(file, Vec::new()));
        }

        fs::remove_file(&removed).unwrap();
        assert_eq!(cache.reconcile(), 1);
        assert!(cache.entry(&kept).is_some());
        assert!(cache.entry(&removed).is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "text").unwrap();
        let cfg = config(RuleLevel::Warn);
        let cache_path = temp.path().join("sub/.cache");

        let mut cache = ResultCache::new(&cache_path, CacheStrategy::Metadata);
        let sig = signature(&file, CacheStrategy::Metadata);
        cache.store(&file, sig, &cfg.fingerprint, &LintResult::new(&file, Vec::new()));
        cache.save().unwrap();

        let loaded = ResultCache::load(&cache_path, CacheStrategy::Metadata).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.lookup(&file, &cfg).is_some());
        assert_eq!(loaded.to_bytes().unwrap(), fs::read(&cache_path).unwrap());
    }

    #[test]
    fn test_load_discards_other_strategy_and_garbage() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "text").unwrap();
        let cache_path = temp.path().join(".cache");

        let mut cache = ResultCache::new(&cache_path, CacheStrategy::Metadata);
        cache.store(
            &file,
            signature(&file, CacheStrategy::Metadata),
            &config(RuleLevel::Warn).fingerprint,
            &LintResult::new(&file, Vec::new()),
        );
        cache.save().unwrap();

        let other = ResultCache::load(&cache_path, CacheStrategy::Content).unwrap();
        assert!(other.is_empty());

        fs::write(&cache_path, "{not json").unwrap();
        let garbage = ResultCache::load(&cache_path, CacheStrategy::Metadata).unwrap();
        assert!(garbage.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let cache = ResultCache::load(temp.path().join("none"), CacheStrategy::Metadata).unwrap();
        assert!(cache.is_empty());
    }
}
