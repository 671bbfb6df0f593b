//! Built-in text rules used by the command line tool.

use lintpool_core::{
    AnalyzeRequest, FileAnalyzer, Fix, LintConfig, LintError, LintMessage, LintResult, RuleCatalog,
    RuleEntry, RuleLevel, Severity,
};

pub const NO_TRAILING_SPACES: &str = "no-trailing-spaces";
pub const MAX_LINE_LENGTH: &str = "max-line-length";
pub const NO_TABS: &str = "no-tabs";

/// Old name of `no-trailing-spaces`, still accepted.
pub const NO_TRAILING_WHITESPACE: &str = "no-trailing-whitespace";

const DEFAULT_MAX_LINE_LENGTH: u64 = 100;

/// Configuration used when no `.lintpool.toml` applies.
pub fn default_config() -> LintConfig {
    LintConfig::default()
        .with_rule(NO_TRAILING_SPACES, RuleEntry::Level(RuleLevel::Error))
        .with_rule(MAX_LINE_LENGTH, RuleEntry::Level(RuleLevel::Warn))
}

/// Line-oriented checks for plain text files.
#[derive(Debug, Default)]
pub struct TextRules;

impl RuleCatalog for TextRules {
    fn deprecation(&self, rule_id: &str) -> Option<Vec<String>> {
        (rule_id == NO_TRAILING_WHITESPACE).then(|| vec![NO_TRAILING_SPACES.to_string()])
    }
}

impl FileAnalyzer for TextRules {
    fn name(&self) -> &'static str {
        "text-rules"
    }

    fn analyze(&self, request: &AnalyzeRequest<'_>) -> Result<LintResult, LintError> {
        let config = &request.config.config;
        let trailing = config
            .enabled_rule(NO_TRAILING_SPACES)
            .or_else(|| config.enabled_rule(NO_TRAILING_WHITESPACE))
            .map(|entry| (severity(entry), rule_name(config)));
        let max_length = config.enabled_rule(MAX_LINE_LENGTH).map(|entry| {
            let max = entry
                .options()
                .get("max")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(DEFAULT_MAX_LINE_LENGTH);
            (severity(entry), max)
        });
        let tabs = config.enabled_rule(NO_TABS).map(severity);

        let mut messages = Vec::new();
        let mut offset = 0;

        for (index, raw) in request.source.split_inclusive('\n').enumerate() {
            let line_no = index + 1;
            let line = raw.trim_end_matches(['\n', '\r']);

            if let Some((level, rule)) = trailing {
                let content = line.trim_end_matches([' ', '\t']);
                if content.len() < line.len() {
                    let start = content.chars().count() + 1;
                    messages.push(
                        LintMessage::new(rule, level, "Trailing spaces not allowed.", line_no, start)
                            .with_end(line_no, line.chars().count() + 1)
                            .with_fix(Fix::new(offset + content.len(), offset + line.len(), "")),
                    );
                }
            }

            if let Some((level, max)) = max_length {
                let length = line.chars().count() as u64;
                if length > max {
                    messages.push(LintMessage::new(
                        MAX_LINE_LENGTH,
                        level,
                        format!("This line has a length of {length}. Maximum allowed is {max}."),
                        line_no,
                        1,
                    ));
                }
            }

            if let Some(level) = tabs {
                if let Some(col) = line.find('\t') {
                    messages.push(LintMessage::new(
                        NO_TABS,
                        level,
                        "Unexpected tab character.",
                        line_no,
                        line[..col].chars().count() + 1,
                    ));
                }
            }

            offset += raw.len();
        }

        let mut result = LintResult::new(request.path, Vec::new());
        let (output, remaining) = apply_fixes(request, messages);
        result.output = output;
        result.messages = remaining;
        result.recount();
        Ok(result)
    }
}

fn severity(entry: &RuleEntry) -> Severity {
    match entry.level() {
        RuleLevel::Error => Severity::Error,
        _ => Severity::Warning,
    }
}

/// The trailing-space rule reports under whichever name the config enables.
fn rule_name(config: &LintConfig) -> &'static str {
    if config.enabled_rule(NO_TRAILING_SPACES).is_some() {
        NO_TRAILING_SPACES
    } else {
        NO_TRAILING_WHITESPACE
    }
}

/// Apply the fixes the fix mode allows, returning fixed text when it changed
/// and the messages that were not fixed.
fn apply_fixes(
    request: &AnalyzeRequest<'_>,
    messages: Vec<LintMessage>,
) -> (Option<String>, Vec<LintMessage>) {
    if !request.fix.is_requested() {
        return (None, messages);
    }

    let (mut fixable, mut remaining): (Vec<_>, Vec<_>) =
        messages.into_iter().partition(|m| request.fix.allows(m));
    fixable.sort_by_key(|m| m.fix.as_ref().map(|f| f.range));

    let mut output = String::with_capacity(request.source.len());
    let mut cursor = 0;
    for message in fixable {
        let Some(fix) = message.fix.as_ref() else {
            continue;
        };
        let (start, end) = fix.range;
        if start < cursor || end > request.source.len() {
            remaining.push(message);
            continue;
        }
        output.push_str(&request.source[cursor..start]);
        output.push_str(&fix.text);
        cursor = end;
    }
    output.push_str(&request.source[cursor..]);

    remaining.sort_by_key(|m| (m.line, m.column));
    if output == request.source {
        (None, remaining)
    } else {
        (Some(output), remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lintpool_core::{FixMode, ResolvedConfig};
    use std::path::Path;

    fn analyze(source: &str, config: LintConfig, fix: FixMode) -> LintResult {
        let resolved = ResolvedConfig::new(config, None).unwrap();
        let request = AnalyzeRequest {
            path: Path::new("test.txt"),
            source,
            config: &resolved,
            fix: &fix,
        };
        TextRules.analyze(&request).unwrap()
    }

    #[test]
    fn test_trailing_spaces_reported() {
        let result = analyze("ok\nbad  \nfine\n", default_config(), FixMode::Off);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.fixable_error_count, 1);
        assert_eq!(result.messages[0].line, 2);
        assert_eq!(result.messages[0].column, 4);
        assert!(result.output.is_none());
    }

    #[test]
    fn test_trailing_spaces_fixed() {
        let result = analyze("a \r\nb\t\nc\n", default_config(), FixMode::All);
        assert!(result.messages.is_empty());
        assert_eq!(result.output.as_deref(), Some("a\r\nb\nc\n"));
    }

    #[test]
    fn test_max_line_length_option() {
        let config = LintConfig::default().with_rule(
            MAX_LINE_LENGTH,
            RuleEntry::Detailed {
                level: RuleLevel::Error,
                options: serde_json::json!({ "max": 5 }),
            },
        );
        let result = analyze("short\ntoo long\n", config, FixMode::All);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.messages[0].line, 2);
        assert!(result.output.is_none());
    }

    #[test]
    fn test_deprecated_alias_still_reports() {
        let config = LintConfig::default()
            .with_rule(NO_TRAILING_WHITESPACE, RuleEntry::Level(RuleLevel::Warn));
        let result = analyze("x \n", config, FixMode::Off);
        assert_eq!(result.warning_count, 1);
        assert_eq!(result.messages[0].rule_id.as_deref(), Some(NO_TRAILING_WHITESPACE));
        assert_eq!(
            TextRules.deprecation(NO_TRAILING_WHITESPACE),
            Some(vec![NO_TRAILING_SPACES.to_string()])
        );
    }

    #[test]
    fn test_tabs_disabled_by_default() {
        let result = analyze("\tindented\n", default_config(), FixMode::Off);
        assert!(result.messages.is_empty());

        let config = LintConfig::default().with_rule(NO_TABS, RuleEntry::Level(RuleLevel::Warn));
        let result = analyze("a\tb\n", config, FixMode::Off);
        assert_eq!(result.messages[0].column, 2);
    }
}
