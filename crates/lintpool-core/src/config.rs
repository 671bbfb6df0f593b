//! Lint configuration, fingerprints and per-file resolution.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::LintError;

/// Name of the per-directory configuration file.
pub const CONFIG_FILE_NAME: &str = ".lintpool.toml";

/// How a rule is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleLevel {
    Off,
    Warn,
    Error,
}

/// A rule's configuration: a bare level or a level with options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleEntry {
    Level(RuleLevel),
    Detailed {
        level: RuleLevel,
        #[serde(default)]
        options: serde_json::Value,
    },
}

impl RuleEntry {
    /// The configured level.
    pub fn level(&self) -> RuleLevel {
        match self {
            RuleEntry::Level(level) => *level,
            RuleEntry::Detailed { level, .. } => *level,
        }
    }

    /// Rule options, `Null` when none were given.
    pub fn options(&self) -> &serde_json::Value {
        static NULL: serde_json::Value = serde_json::Value::Null;
        match self {
            RuleEntry::Level(_) => &NULL,
            RuleEntry::Detailed { options, .. } => options,
        }
    }
}

/// Configuration applied to a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LintConfig {
    /// Rules by id, in declaration order.
    #[serde(default)]
    pub rules: IndexMap<String, RuleEntry>,

    /// Free-form settings shared by all rules.
    #[serde(default)]
    pub settings: BTreeMap<String, serde_json::Value>,
}

impl LintConfig {
    /// Parse a TOML configuration document.
    pub fn from_toml(path: &Path, text: &str) -> Result<Self, LintError> {
        toml::from_str(text).map_err(|e| LintError::config_load(path, e.to_string()))
    }

    /// Set a rule, replacing any existing entry.
    pub fn with_rule(mut self, rule_id: impl Into<String>, entry: RuleEntry) -> Self {
        self.rules.insert(rule_id.into(), entry);
        self
    }

    /// Overlay `other` on top of `self`; rules and settings in `other` win.
    pub fn merged_with(&self, other: &LintConfig) -> LintConfig {
        let mut merged = self.clone();
        for (rule_id, entry) in &other.rules {
            merged.rules.insert(rule_id.clone(), entry.clone());
        }
        for (key, value) in &other.settings {
            merged.settings.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Entry for an enabled rule.
    pub fn enabled_rule(&self, rule_id: &str) -> Option<&RuleEntry> {
        self.rules
            .get(rule_id)
            .filter(|entry| entry.level() != RuleLevel::Off)
    }

    /// Compute the fingerprint of this configuration.
    ///
    /// Rules are hashed in id order, so reordering a config file keeps the
    /// fingerprint stable.
    pub fn fingerprint(&self) -> Result<ConfigFingerprint, LintError> {
        let canonical = CanonicalConfig {
            rules: self.rules.iter().map(|(id, entry)| (id.as_str(), entry)).collect(),
            settings: &self.settings,
        };
        let bytes = serde_json::to_vec(&canonical).map_err(|e| LintError::InvalidConfig {
            message: e.to_string(),
        })?;
        Ok(ConfigFingerprint::of_bytes(&bytes))
    }
}

#[derive(Serialize)]
struct CanonicalConfig<'a> {
    rules: BTreeMap<&'a str, &'a RuleEntry>,
    settings: &'a BTreeMap<String, serde_json::Value>,
}

/// BLAKE3 digest of a configuration, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigFingerprint(String);

impl ConfigFingerprint {
    /// Fingerprint arbitrary bytes.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A configuration together with its fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub config: LintConfig,
    pub fingerprint: ConfigFingerprint,
    /// File the configuration was loaded from (`None` for the base config).
    pub source: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Fingerprint `config` and wrap it.
    pub fn new(config: LintConfig, source: Option<PathBuf>) -> Result<Self, LintError> {
        let fingerprint = config.fingerprint()?;
        Ok(Self {
            config,
            fingerprint,
            source,
        })
    }
}

/// Maps a file path to the configuration that applies to it.
///
/// `Ok(None)` means no configuration applies and the file is not linted.
/// `Err` is fatal for the whole run.
pub trait ConfigResolver: Send + Sync {
    fn resolve(&self, file_path: &Path) -> Result<Option<Arc<ResolvedConfig>>, LintError>;
}

/// Applies one configuration to every file.
#[derive(Debug, Clone)]
pub struct SingleConfig(pub Arc<ResolvedConfig>);

impl SingleConfig {
    /// Wrap a configuration.
    pub fn new(config: LintConfig) -> Result<Self, LintError> {
        Ok(Self(Arc::new(ResolvedConfig::new(config, None)?)))
    }
}

impl ConfigResolver for SingleConfig {
    fn resolve(&self, _file_path: &Path) -> Result<Option<Arc<ResolvedConfig>>, LintError> {
        Ok(Some(Arc::clone(&self.0)))
    }
}

/// Resolves the nearest `.lintpool.toml`, overlaid on a base configuration.
///
/// Lookups are memoized per directory and each configuration file is parsed
/// at most once. A resolver lives for a single invocation so repeated or
/// concurrent invocations never share loaded state.
#[derive(Debug)]
pub struct FileConfigResolver {
    base: LintConfig,
    base_resolved: Arc<ResolvedConfig>,
    root: Option<PathBuf>,
    by_dir: DashMap<PathBuf, Arc<ResolvedConfig>>,
    by_file: DashMap<PathBuf, Arc<ResolvedConfig>>,
}

impl FileConfigResolver {
    /// Create a resolver. The upward search stops at `root` when given.
    pub fn new(base: LintConfig, root: Option<PathBuf>) -> Result<Self, LintError> {
        let base_resolved = Arc::new(ResolvedConfig::new(base.clone(), None)?);
        Ok(Self {
            base,
            base_resolved,
            root,
            by_dir: DashMap::new(),
            by_file: DashMap::new(),
        })
    }

    /// Number of configuration files parsed so far.
    pub fn loaded_files(&self) -> usize {
        self.by_file.len()
    }

    fn resolve_dir(&self, dir: &Path) -> Result<Arc<ResolvedConfig>, LintError> {
        if let Some(found) = self.by_dir.get(dir).map(|entry| Arc::clone(entry.value())) {
            return Ok(found);
        }

        let candidate = dir.join(CONFIG_FILE_NAME);
        let resolved = if candidate.is_file() {
            self.load_file(&candidate)?
        } else if self.root.as_deref() == Some(dir) {
            Arc::clone(&self.base_resolved)
        } else {
            match dir.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => self.resolve_dir(parent)?,
                _ => Arc::clone(&self.base_resolved),
            }
        };

        self.by_dir.insert(dir.to_path_buf(), Arc::clone(&resolved));
        Ok(resolved)
    }

    fn load_file(&self, path: &Path) -> Result<Arc<ResolvedConfig>, LintError> {
        if let Some(found) = self.by_file.get(path).map(|entry| Arc::clone(entry.value())) {
            return Ok(found);
        }

        let text = std::fs::read_to_string(path).map_err(|e| LintError::io(path, e))?;
        let local = LintConfig::from_toml(path, &text)?;
        let resolved = Arc::new(ResolvedConfig::new(
            self.base.merged_with(&local),
            Some(path.to_path_buf()),
        )?);
        tracing::debug!(config = %path.display(), fingerprint = %resolved.fingerprint, "loaded configuration");

        Ok(Arc::clone(
            self.by_file
                .entry(path.to_path_buf())
                .or_insert(resolved)
                .value(),
        ))
    }
}

impl ConfigResolver for FileConfigResolver {
    fn resolve(&self, file_path: &Path) -> Result<Option<Arc<ResolvedConfig>>, LintError> {
        match file_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => self.resolve_dir(dir).map(Some),
            _ => self.resolve_dir(Path::new(".")).map(Some),
        }
    }
}
