//! Options controlling one lint invocation.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use derive_builder::Builder;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::result::LintMessage;

/// Default cache file name, relative to the working directory.
pub const DEFAULT_CACHE_FILE: &str = ".lintpoolcache";

/// Requested degree of parallelism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Concurrency {
    /// Lint on the calling thread.
    #[default]
    Off,
    /// Size the pool from available hardware parallelism.
    Auto,
    /// Use this many workers (always at least 1).
    Fixed(usize),
}

impl Concurrency {
    /// Normalize a configured worker count: non-finite, non-positive and
    /// fractional values are floored and clamped to at least 1.
    pub fn from_count(count: f64) -> Self {
        if !count.is_finite() || count < 1.0 {
            return Self::Fixed(1);
        }
        Self::Fixed((count.floor() as usize).max(1))
    }
}

impl FromStr for Concurrency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "auto" => Ok(Self::Auto),
            other => other
                .parse::<f64>()
                .map(Self::from_count)
                .map_err(|_| format!("invalid concurrency \"{s}\": expected \"off\", \"auto\" or a number")),
        }
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concurrency::Off => f.write_str("off"),
            Concurrency::Auto => f.write_str("auto"),
            Concurrency::Fixed(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for Concurrency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Concurrency::Fixed(n) => serializer.serialize_u64(*n as u64),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Concurrency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Name(String),
            Count(f64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Name(name) => name.parse().map_err(serde::de::Error::custom),
            Raw::Count(count) => Ok(Self::from_count(count)),
        }
    }
}

/// Predicate selecting which messages may be fixed.
pub type FixFilter = Arc<dyn Fn(&LintMessage) -> bool + Send + Sync>;

/// Whether and which automatic fixes are applied.
#[derive(Clone, Default)]
pub enum FixMode {
    #[default]
    Off,
    /// Apply every available fix.
    All,
    /// Apply fixes for messages accepted by the filter.
    Only(FixFilter),
}

impl FixMode {
    /// Whether fixing was requested at all.
    ///
    /// A filter counts as a request even if it would reject every message.
    pub fn is_requested(&self) -> bool {
        !matches!(self, FixMode::Off)
    }

    /// Whether the fix attached to `message` may be applied.
    pub fn allows(&self, message: &LintMessage) -> bool {
        match self {
            FixMode::Off => false,
            FixMode::All => message.fix.is_some(),
            FixMode::Only(filter) => message.fix.is_some() && filter(message),
        }
    }
}

impl fmt::Debug for FixMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixMode::Off => f.write_str("Off"),
            FixMode::All => f.write_str("All"),
            FixMode::Only(_) => f.write_str("Only(<filter>)"),
        }
    }
}

/// How cached entries detect that a file changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    /// File size and modification time.
    #[default]
    Metadata,
    /// File size and a hash of the content.
    Content,
}

impl FromStr for CacheStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metadata" => Ok(Self::Metadata),
            "content" => Ok(Self::Content),
            _ => Err(format!("invalid cache strategy \"{s}\": expected \"metadata\" or \"content\"")),
        }
    }
}

/// Options for one lint invocation.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct DispatchOptions {
    /// Directory patterns and relative paths are resolved against.
    #[builder(default = "default_cwd()")]
    pub cwd: PathBuf,

    /// Worker pool sizing.
    #[builder(default)]
    pub concurrency: Concurrency,

    /// Read and write the result cache.
    #[builder(default = "false")]
    pub cache: bool,

    /// Cache file, or a directory to hold it.
    #[builder(default = "PathBuf::from(DEFAULT_CACHE_FILE)")]
    pub cache_location: PathBuf,

    /// How cached entries detect changes.
    #[builder(default)]
    pub cache_strategy: CacheStrategy,

    /// Automatic fixing.
    #[builder(default)]
    pub fix: FixMode,

    /// Report explicitly requested files that are ignored.
    #[builder(default = "true")]
    pub warn_ignored: bool,

    /// Ignore globs, relative to `cwd`.
    #[builder(default)]
    pub ignore_patterns: Vec<String>,

    /// File extensions picked up when walking directories.
    #[builder(default = "default_extensions()")]
    pub extensions: Vec<String>,

    /// Fail when a pattern matches no files.
    #[builder(default = "true")]
    pub error_on_unmatched_pattern: bool,
}

fn default_cwd() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_extensions() -> Vec<String> {
    vec!["txt".to_string(), "md".to_string()]
}

impl DispatchOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref cwd) = self.cwd {
            if cwd.as_os_str().is_empty() {
                return Err("Working directory cannot be empty".to_string());
            }
        }
        if let Some(ref location) = self.cache_location {
            if location.as_os_str().is_empty() {
                return Err("Cache location cannot be empty".to_string());
            }
        }
        if let Some(ref extensions) = self.extensions {
            if extensions.iter().any(|e| e.trim_start_matches('.').is_empty()) {
                return Err("Extensions cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl DispatchOptions {
    /// Create a new options builder.
    pub fn builder() -> DispatchOptionsBuilder {
        DispatchOptionsBuilder::default()
    }

    /// Default options rooted at `cwd`.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            concurrency: Concurrency::Off,
            cache: false,
            cache_location: PathBuf::from(DEFAULT_CACHE_FILE),
            cache_strategy: CacheStrategy::Metadata,
            fix: FixMode::Off,
            warn_ignored: true,
            ignore_patterns: Vec::new(),
            extensions: default_extensions(),
            error_on_unmatched_pattern: true,
        }
    }
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::new(default_cwd())
    }
}
