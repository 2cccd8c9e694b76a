use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{RegexSet, RegexSetBuilder};
use serde::Deserialize;

use crate::error::GateError;

const MAX_RULES_FILE_SIZE: u64 = 64 * 1024; // 64 KiB

const DEFAULT_RULES: &str = include_str!("../../rules/default.toml");

static DEFAULT_RULE_SET: LazyLock<RuleSet> = LazyLock::new(|| {
    DEFAULT_RULES
        .parse()
        .unwrap_or_else(|e| panic!("built-in rules/default.toml is invalid: {e}"))
});

// --- TOML deserialization structs (private, map 1:1 to TOML schema) ---

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RulesFile {
    shell_tools: Vec<String>,
    #[serde(default)]
    rules: Vec<RuleConfig>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleConfig {
    id: String,
    pattern: String,
    message: String,
}

// --- Compiled rule table ---

/// A single (pattern, message) entry, kept for listing and logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub id: String,
    pub pattern: String,
    pub message: String,
}

/// Ordered, compiled rule table. Immutable once built.
#[derive(Clone)]
pub struct RuleSet {
    shell_tools: Vec<String>,
    rules: Vec<Rule>,
    patterns: RegexSet,
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("shell_tools", &self.shell_tools)
            .field("rule_count", &self.rules.len())
            .finish()
    }
}

impl FromStr for RuleSet {
    type Err = GateError;

    /// Parse and compile a rule table from a TOML string.
    fn from_str(content: &str) -> Result<Self, GateError> {
        let file: RulesFile =
            toml::from_str(content).map_err(|e| GateError::RulesLoad(e.to_string()))?;
        compile(file)
    }
}

impl Default for RuleSet {
    /// The built-in rule table, compiled once per process.
    fn default() -> Self {
        DEFAULT_RULE_SET.clone()
    }
}

impl RuleSet {
    /// Load a rule table from a TOML file. Checks file size before reading.
    pub fn load(path: &Path) -> Result<Self, GateError> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| GateError::RulesLoad(format!("cannot read {}: {e}", path.display())))?;

        let size = metadata.len();
        if size > MAX_RULES_FILE_SIZE {
            return Err(GateError::RulesLoad(format!(
                "{} is {size} bytes, rule files are limited to {MAX_RULES_FILE_SIZE}",
                path.display()
            )));
        }
        if !metadata.is_file() {
            return Err(GateError::RulesLoad(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| GateError::RulesLoad(format!("cannot read {}: {e}", path.display())))?;

        content.parse()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn shell_tools(&self) -> &[String] {
        &self.shell_tools
    }

    pub fn is_shell_tool(&self, tool_name: &str) -> bool {
        self.shell_tools.iter().any(|t| t == tool_name)
    }

    /// Every rule whose pattern occurs somewhere in `command`, in table order.
    pub fn matching(&self, command: &str) -> impl Iterator<Item = &Rule> {
        // SetMatches iterates indices in ascending order.
        self.patterns
            .matches(command)
            .into_iter()
            .map(|i| &self.rules[i])
    }
}

fn compile(file: RulesFile) -> Result<RuleSet, GateError> {
    if file.shell_tools.is_empty() {
        return Err(GateError::RulesValidation(
            "shell_tools must not be empty".to_owned(),
        ));
    }
    if let Some(blank) = file.shell_tools.iter().find(|t| t.trim().is_empty()) {
        return Err(GateError::RulesValidation(format!(
            "shell_tools contains a blank tool name: {blank:?}"
        )));
    }

    let mut seen = HashSet::new();
    let mut rules = Vec::with_capacity(file.rules.len());
    for (index, rule) in file.rules.into_iter().enumerate() {
        if rule.id.trim().is_empty() {
            return Err(GateError::RulesValidation(format!(
                "rule #{index}: id must not be empty"
            )));
        }
        if !seen.insert(rule.id.clone()) {
            return Err(GateError::RulesValidation(format!(
                "rule '{}': duplicate id",
                rule.id
            )));
        }
        if rule.message.trim().is_empty() {
            return Err(GateError::RulesValidation(format!(
                "rule '{}': message must not be empty",
                rule.id
            )));
        }
        rules.push(Rule {
            id: rule.id,
            pattern: rule.pattern,
            message: rule.message,
        });
    }

    // Compile each pattern on its own first so a bad one is reported by id.
    for rule in &rules {
        bounded_builder([rule.pattern.as_str()])
            .build()
            .map_err(|e| GateError::RulesValidation(format!("rule '{}': {e}", rule.id)))?;
    }

    let patterns = bounded_builder(rules.iter().map(|r| r.pattern.as_str()))
        .build()
        .map_err(|e| GateError::RulesValidation(e.to_string()))?;

    Ok(RuleSet {
        shell_tools: file.shell_tools,
        rules,
        patterns,
    })
}

fn bounded_builder<'a, I>(patterns: I) -> RegexSetBuilder
where
    I: IntoIterator<Item = &'a str>,
{
    let mut builder = RegexSetBuilder::new(patterns);
    builder.size_limit(1 << 20).nest_limit(50);
    builder
}
