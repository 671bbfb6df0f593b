//! Core types and traits for lintpool.
//!
//! This crate provides the data model shared by the dispatcher and the
//! result cache: tasks, per-file results, configuration and fingerprints,
//! dispatch options, and the seams to the external analyzer.

mod analyzer;
mod config;
mod error;
mod options;
mod result;
mod signature;
mod task;

pub use analyzer::{AnalyzeRequest, FileAnalyzer, RuleCatalog};
pub use config::{
    CONFIG_FILE_NAME, ConfigFingerprint, ConfigResolver, FileConfigResolver, LintConfig,
    ResolvedConfig, RuleEntry, RuleLevel, SingleConfig,
};
pub use error::LintError;
pub use options::{
    CacheStrategy, Concurrency, DEFAULT_CACHE_FILE, DispatchOptions, DispatchOptionsBuilder,
    FixFilter, FixMode,
};
pub use result::{DeprecatedRuleUse, DeprecationSource, Fix, LintMessage, LintResult, Severity};
pub use signature::FileSignature;
pub use task::{IndexedResult, Task, tasks_from_paths};
