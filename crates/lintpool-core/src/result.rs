//! Per-file lint results and diagnostic messages.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::analyzer::RuleCatalog;
use crate::config::{ResolvedConfig, RuleLevel};

/// Severity of a reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Reported but does not fail the run.
    Warning,
    /// Fails the run.
    Error,
}

/// A text replacement that resolves a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    /// Byte range `[start, end)` in the original source.
    pub range: (usize, usize),
    /// Replacement text.
    pub text: String,
}

impl Fix {
    /// Create a new fix.
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            range: (start, end),
            text: text.into(),
        }
    }
}

/// A single diagnostic reported for a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintMessage {
    /// Rule that produced the message (none for fatal/pseudo messages).
    pub rule_id: Option<CompactString>,
    /// Message severity.
    pub severity: Severity,
    /// Whether this message represents a failure to lint the file at all.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fatal: bool,
    /// Human-readable message.
    pub message: String,
    /// 1-based line (0 when the message is not tied to a location).
    pub line: usize,
    /// 1-based column (0 when the message is not tied to a location).
    pub column: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_column: Option<usize>,
    /// Automatic fix, if the rule offers one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
}

impl LintMessage {
    /// Create a rule message at a location.
    pub fn new(
        rule_id: impl Into<CompactString>,
        severity: Severity,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            rule_id: Some(rule_id.into()),
            severity,
            fatal: false,
            message: message.into(),
            line,
            column,
            end_line: None,
            end_column: None,
            fix: None,
        }
    }

    /// Create a fatal message not tied to any rule.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            rule_id: None,
            severity: Severity::Error,
            fatal: true,
            message: message.into(),
            line: 0,
            column: 0,
            end_line: None,
            end_column: None,
            fix: None,
        }
    }

    /// Create a warning not tied to any rule or location.
    pub fn notice(message: impl Into<String>) -> Self {
        Self {
            rule_id: None,
            severity: Severity::Warning,
            fatal: false,
            message: message.into(),
            line: 0,
            column: 0,
            end_line: None,
            end_column: None,
            fix: None,
        }
    }

    /// Set the end position.
    pub fn with_end(mut self, end_line: usize, end_column: usize) -> Self {
        self.end_line = Some(end_line);
        self.end_column = Some(end_column);
        self
    }

    /// Attach a fix.
    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self
    }

    /// Whether this message counts as an error.
    pub fn is_error(&self) -> bool {
        self.fatal || self.severity == Severity::Error
    }
}

/// A deprecated rule that was enabled for a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecatedRuleUse {
    pub rule_id: String,
    pub replaced_by: Vec<String>,
}

/// Where a result's deprecated-rule list is computed from.
#[derive(Clone)]
pub struct DeprecationSource {
    config: Arc<ResolvedConfig>,
    catalog: Arc<dyn RuleCatalog>,
}

impl DeprecationSource {
    /// Create a new deprecation source.
    pub fn new(config: Arc<ResolvedConfig>, catalog: Arc<dyn RuleCatalog>) -> Self {
        Self { config, catalog }
    }

    fn compute(&self) -> Vec<DeprecatedRuleUse> {
        self.config
            .config
            .rules
            .iter()
            .filter(|(_, entry)| entry.level() != RuleLevel::Off)
            .filter_map(|(rule_id, _)| {
                self.catalog
                    .deprecation(rule_id)
                    .map(|replaced_by| DeprecatedRuleUse {
                        rule_id: rule_id.clone(),
                        replaced_by,
                    })
            })
            .collect()
    }
}

/// Lazily computed list of deprecated rules.
///
/// The list is never persisted; cache-hydrated results rebind a source and
/// recompute it on first access.
#[derive(Clone, Default)]
struct DeprecatedRules {
    cell: OnceLock<Vec<DeprecatedRuleUse>>,
    source: Option<DeprecationSource>,
}

impl DeprecatedRules {
    fn get(&self) -> &[DeprecatedRuleUse] {
        self.cell.get_or_init(|| {
            self.source
                .as_ref()
                .map(DeprecationSource::compute)
                .unwrap_or_default()
        })
    }
}

impl fmt::Debug for DeprecatedRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeprecatedRules")
            .field("computed", &self.cell.get())
            .field("bound", &self.source.is_some())
            .finish()
    }
}

// Derived data; two results are equal regardless of whether it was computed.
impl PartialEq for DeprecatedRules {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Result of linting a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintResult {
    /// Path of the linted file.
    pub file_path: PathBuf,
    /// Reported messages, in the order the analyzer produced them.
    pub messages: Vec<LintMessage>,
    /// Messages silenced by inline directives.
    #[serde(default)]
    pub suppressed_messages: Vec<LintMessage>,
    pub error_count: usize,
    pub fatal_error_count: usize,
    pub warning_count: usize,
    pub fixable_error_count: usize,
    pub fixable_warning_count: usize,
    /// Fixed source text, present only when fixes were applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Original source text, kept for formatters when there are messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip)]
    deprecated: DeprecatedRules,
}

impl LintResult {
    /// Create a result from messages, computing all counts.
    pub fn new(file_path: impl Into<PathBuf>, messages: Vec<LintMessage>) -> Self {
        let mut result = Self {
            file_path: file_path.into(),
            messages,
            suppressed_messages: Vec::new(),
            error_count: 0,
            fatal_error_count: 0,
            warning_count: 0,
            fixable_error_count: 0,
            fixable_warning_count: 0,
            output: None,
            source: None,
            deprecated: DeprecatedRules::default(),
        };
        result.recount();
        result
    }

    /// Pseudo-result for a file that matched an ignore pattern.
    pub fn ignored(file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        let in_node_modules = file_path
            .components()
            .any(|c| c.as_os_str() == "node_modules");

        let message = if in_node_modules {
            "File ignored by default because it is located under the node_modules directory. \
             Use ignore pattern \"!**/node_modules/\" to disable file ignore settings or use \
             \"--no-warn-ignored\" to suppress this warning."
        } else {
            "File ignored because of a matching ignore pattern. Use \"--no-ignore\" to disable \
             file ignore settings or use \"--no-warn-ignored\" to suppress this warning."
        };

        Self::new(file_path, vec![LintMessage::notice(message)])
    }

    /// Pseudo-result for a file with no applicable configuration.
    pub fn unconfigured(file_path: impl Into<PathBuf>) -> Self {
        Self::new(
            file_path,
            vec![LintMessage::notice(
                "File ignored because no matching configuration was supplied.",
            )],
        )
    }

    /// Result for a file whose source could not be read.
    pub fn read_failure(file_path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let file_path = file_path.into();
        let message = format!("Could not read {}: {error}", file_path.display());
        Self::new(file_path, vec![LintMessage::fatal(message)])
    }

    /// Recompute all counters from `messages`.
    pub fn recount(&mut self) {
        self.error_count = 0;
        self.fatal_error_count = 0;
        self.warning_count = 0;
        self.fixable_error_count = 0;
        self.fixable_warning_count = 0;

        for message in &self.messages {
            if message.is_error() {
                self.error_count += 1;
                if message.fatal {
                    self.fatal_error_count += 1;
                }
                if message.fix.is_some() {
                    self.fixable_error_count += 1;
                }
            } else {
                self.warning_count += 1;
                if message.fix.is_some() {
                    self.fixable_warning_count += 1;
                }
            }
        }
    }

    /// Path of the linted file.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Whether any message (of any severity) was reported.
    pub fn has_messages(&self) -> bool {
        !self.messages.is_empty()
    }

    /// Bind the source used to compute the deprecated-rule list.
    ///
    /// Resets any previously computed list.
    pub fn bind_deprecations(&mut self, source: DeprecationSource) {
        self.deprecated = DeprecatedRules {
            cell: OnceLock::new(),
            source: Some(source),
        };
    }

    /// Deprecated rules enabled for this file, computed on first access.
    pub fn used_deprecated_rules(&self) -> &[DeprecatedRuleUse] {
        self.deprecated.get()
    }
}
