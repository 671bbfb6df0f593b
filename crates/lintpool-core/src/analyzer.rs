//! The seam to the external per-file analysis engine.

use std::path::Path;

use crate::config::ResolvedConfig;
use crate::error::LintError;
use crate::options::FixMode;
use crate::result::LintResult;

/// Rule metadata lookups.
pub trait RuleCatalog: Send + Sync {
    /// Rules replacing `rule_id`, if `rule_id` is deprecated.
    fn deprecation(&self, _rule_id: &str) -> Option<Vec<String>> {
        None
    }
}

/// Everything the analyzer needs to lint one file.
#[derive(Debug, Clone, Copy)]
pub struct AnalyzeRequest<'a> {
    pub path: &'a Path,
    pub source: &'a str,
    pub config: &'a ResolvedConfig,
    pub fix: &'a FixMode,
}

/// Lints a single file.
///
/// Implementations report problems with the file itself (syntax errors and
/// the like) as fatal messages in the returned result. Returning `Err` means
/// the whole run is invalid and aborts every worker.
pub trait FileAnalyzer: RuleCatalog {
    /// Analyzer name, used in logs.
    fn name(&self) -> &'static str;

    /// Lint `request.source`. When fixes are applied, the fixed text goes in
    /// `LintResult::output` and `messages` holds only what remains.
    fn analyze(&self, request: &AnalyzeRequest<'_>) -> Result<LintResult, LintError>;
}
