//! Trigger rule configuration and compilation.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// One trigger rule as configured. Rules are ordered; the first match per
/// content item wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum TriggerRuleConfig {
    /// Match tool-result content.
    ToolResult {
        name: String,
        /// Only results produced by this tool.
        #[serde(default)]
        tool_name: Option<String>,
        /// Only results flagged as errors.
        #[serde(default)]
        requires_error: bool,
        /// Regex the result text must match.
        #[serde(default)]
        pattern: Option<String>,
        /// Regexes that suppress a match.
        #[serde(default)]
        ignore: Vec<String>,
        #[serde(default)]
        category: Option<String>,
    },
    /// Match a named tool-call input field.
    ToolCall {
        name: String,
        field: String,
        pattern: String,
        #[serde(default)]
        category: Option<String>,
    },
}

impl TriggerRuleConfig {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            TriggerRuleConfig::ToolResult { name, .. } | TriggerRuleConfig::ToolCall { name, .. } => {
                name
            }
        }
    }
}

/// Errors that can occur while compiling trigger rules.
#[derive(thiserror::Error, Debug)]
pub enum TriggerError {
    #[error("Invalid pattern in trigger rule '{rule}': {source}")]
    BadPattern {
        rule: String,
        source: regex::Error,
    },
}

/// A compiled trigger rule. All patterns match case-insensitively.
#[derive(Debug, Clone)]
pub enum TriggerRule {
    ToolResult {
        name: String,
        tool_name: Option<String>,
        requires_error: bool,
        pattern: Option<Regex>,
        ignore: Vec<Regex>,
        category: Option<String>,
    },
    ToolCall {
        name: String,
        field: String,
        pattern: Regex,
        category: Option<String>,
    },
}

impl TriggerRule {
    /// Compile one configured rule.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex in the rule fails to compile.
    pub fn compile(config: &TriggerRuleConfig) -> Result<Self, TriggerError> {
        match config {
            TriggerRuleConfig::ToolResult {
                name,
                tool_name,
                requires_error,
                pattern,
                ignore,
                category,
            } => Ok(TriggerRule::ToolResult {
                name: name.clone(),
                tool_name: tool_name.clone(),
                requires_error: *requires_error,
                pattern: pattern
                    .as_deref()
                    .map(|p| compile_pattern(name, p))
                    .transpose()?,
                ignore: ignore
                    .iter()
                    .map(|p| compile_pattern(name, p))
                    .collect::<Result<Vec<_>, _>>()?,
                category: category.clone(),
            }),
            TriggerRuleConfig::ToolCall {
                name,
                field,
                pattern,
                category,
            } => Ok(TriggerRule::ToolCall {
                name: name.clone(),
                field: field.clone(),
                pattern: compile_pattern(name, pattern)?,
                category: category.clone(),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            TriggerRule::ToolResult { name, .. } | TriggerRule::ToolCall { name, .. } => name,
        }
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        match self {
            TriggerRule::ToolResult { category, .. } | TriggerRule::ToolCall { category, .. } => {
                category.as_deref()
            }
        }
    }

    /// Whether this rule matches a tool result.
    #[must_use]
    pub fn matches_tool_result(
        &self,
        resolved_tool: Option<&str>,
        text: &str,
        is_error: bool,
    ) -> bool {
        let TriggerRule::ToolResult {
            tool_name,
            requires_error,
            pattern,
            ignore,
            ..
        } = self
        else {
            return false;
        };

        if *requires_error && !is_error {
            return false;
        }
        if let Some(wanted) = tool_name {
            // Unknown tool never satisfies an explicit tool filter.
            if resolved_tool != Some(wanted.as_str()) {
                return false;
            }
        }
        if let Some(pattern) = pattern {
            if !pattern.is_match(text) {
                return false;
            }
        }
        !ignore.iter().any(|re| re.is_match(text))
    }

    /// Whether this rule matches a tool call, returning the matched field
    /// text.
    #[must_use]
    pub fn matches_tool_call(&self, input: &serde_json::Value) -> Option<String> {
        let TriggerRule::ToolCall { field, pattern, .. } = self else {
            return None;
        };
        let value = input.get(field)?;
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        pattern.is_match(&text).then_some(text)
    }
}

fn compile_pattern(rule: &str, pattern: &str) -> Result<Regex, TriggerError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| TriggerError::BadPattern {
            rule: rule.to_string(),
            source,
        })
}

/// The default rule set: error-flagged tool results segmented into the
/// standard categories, most specific first, with a catch-all last.
#[must_use]
pub fn default_rules() -> Vec<TriggerRuleConfig> {
    let categories: &[(&str, &str)] = &[
        (r"Exit code \d+", "Exit Code Error"),
        ("ENOENT", "File Not Found"),
        ("EISDIR", "Directory Operation Error"),
        ("EACCES", "Permission Denied"),
        ("EEXIST", "File Already Exists"),
        ("File does not exist", "File Not Found"),
        ("command not found", "Command Not Found"),
        ("No such file or directory", "File Not Found"),
        ("syntax error", "Syntax Error"),
        ("type.*Error", "Type Error"),
        ("Cannot find", "Not Found Error"),
        ("timeout", "Timeout Error"),
        ("connection", "Connection Error"),
    ];

    let mut rules: Vec<TriggerRuleConfig> = categories
        .iter()
        .map(|(pattern, category)| TriggerRuleConfig::ToolResult {
            name: format!("error:{category}"),
            tool_name: None,
            requires_error: true,
            pattern: Some((*pattern).to_string()),
            ignore: Vec::new(),
            category: Some((*category).to_string()),
        })
        .collect();

    rules.push(TriggerRuleConfig::ToolResult {
        name: "error:other".to_string(),
        tool_name: None,
        requires_error: true,
        pattern: None,
        ignore: Vec::new(),
        category: Some("Other Error".to_string()),
    });

    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_all(configs: &[TriggerRuleConfig]) -> Vec<TriggerRule> {
        configs.iter().map(|c| TriggerRule::compile(c).unwrap()).collect()
    }

    #[test]
    fn test_default_rules_compile() {
        let rules = compile_all(&default_rules());
        assert_eq!(rules.len(), 14);
        assert_eq!(rules.last().unwrap().category(), Some("Other Error"));
    }

    #[test]
    fn test_tool_result_rule_requires_error() {
        let rule = TriggerRule::compile(&TriggerRuleConfig::ToolResult {
            name: "r".to_string(),
            tool_name: None,
            requires_error: true,
            pattern: None,
            ignore: Vec::new(),
            category: None,
        })
        .unwrap();

        assert!(rule.matches_tool_result(None, "anything", true));
        assert!(!rule.matches_tool_result(None, "anything", false));
    }

    #[test]
    fn test_tool_result_rule_pattern_case_insensitive() {
        let rule = TriggerRule::compile(&TriggerRuleConfig::ToolResult {
            name: "r".to_string(),
            tool_name: None,
            requires_error: false,
            pattern: Some("enoent".to_string()),
            ignore: Vec::new(),
            category: None,
        })
        .unwrap();

        assert!(rule.matches_tool_result(None, "ENOENT: no such file", false));
        assert!(!rule.matches_tool_result(None, "all good", false));
    }

    #[test]
    fn test_tool_result_rule_tool_filter() {
        let rule = TriggerRule::compile(&TriggerRuleConfig::ToolResult {
            name: "r".to_string(),
            tool_name: Some("Bash".to_string()),
            requires_error: false,
            pattern: None,
            ignore: Vec::new(),
            category: None,
        })
        .unwrap();

        assert!(rule.matches_tool_result(Some("Bash"), "x", false));
        assert!(!rule.matches_tool_result(Some("Read"), "x", false));
        assert!(!rule.matches_tool_result(None, "x", false));
    }

    #[test]
    fn test_tool_result_rule_ignore_list() {
        let rule = TriggerRule::compile(&TriggerRuleConfig::ToolResult {
            name: "r".to_string(),
            tool_name: None,
            requires_error: false,
            pattern: Some("error".to_string()),
            ignore: vec!["expected error".to_string()],
            category: None,
        })
        .unwrap();

        assert!(rule.matches_tool_result(None, "error: boom", false));
        assert!(!rule.matches_tool_result(None, "Expected error, continuing", false));
    }

    #[test]
    fn test_tool_call_rule_matches_field() {
        let rule = TriggerRule::compile(&TriggerRuleConfig::ToolCall {
            name: "dangerous-rm".to_string(),
            field: "command".to_string(),
            pattern: r"rm\s+-rf".to_string(),
            category: None,
        })
        .unwrap();

        let input = serde_json::json!({"command": "rm -rf /tmp/scratch"});
        assert_eq!(
            rule.matches_tool_call(&input),
            Some("rm -rf /tmp/scratch".to_string())
        );

        let input = serde_json::json!({"command": "ls"});
        assert!(rule.matches_tool_call(&input).is_none());

        let input = serde_json::json!({"other_field": "rm -rf /"});
        assert!(rule.matches_tool_call(&input).is_none());
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let result = TriggerRule::compile(&TriggerRuleConfig::ToolCall {
            name: "broken".to_string(),
            field: "command".to_string(),
            pattern: "(unclosed".to_string(),
            category: None,
        });
        assert!(matches!(result, Err(TriggerError::BadPattern { rule, .. }) if rule == "broken"));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let toml_str = r#"
            [[rules]]
            match = "tool_result"
            name = "bash-failures"
            tool_name = "Bash"
            requires_error = true
            pattern = "Exit code"

            [[rules]]
            match = "tool_call"
            name = "force-push"
            field = "command"
            pattern = "push --force"
        "#;

        #[derive(Deserialize)]
        struct Wrapper {
            rules: Vec<TriggerRuleConfig>,
        }

        let wrapper: Wrapper = toml::from_str(toml_str).unwrap();
        assert_eq!(wrapper.rules.len(), 2);
        assert_eq!(wrapper.rules[0].name(), "bash-failures");
        assert!(matches!(
            wrapper.rules[1],
            TriggerRuleConfig::ToolCall { .. }
        ));
    }
}
