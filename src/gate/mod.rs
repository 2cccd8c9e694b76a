pub mod rules;

use rules::RuleSet;
use tracing::{debug, info};

use crate::tools::ToolInvocation;

/// Outcome of evaluating one invocation. Empty `issues` means approved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub issues: Vec<String>,
}

/// What the caller must do with the proposed command.
///
/// The gate never rewrites a command: it is either run unmodified or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Blocked { issues: Vec<String> },
}

impl ValidationResult {
    pub fn is_approved(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn decision(self) -> Decision {
        if self.issues.is_empty() {
            Decision::Approved
        } else {
            Decision::Blocked {
                issues: self.issues,
            }
        }
    }
}

/// Evaluate a proposed tool invocation against the rule table.
///
/// Non-shell tools get an empty result. For shell tools every rule is
/// searched for anywhere in the literal command (nested `-exec` clauses and
/// quoted sub-shells included) and each firing rule contributes its message,
/// in table order. Pure: no I/O, no state, same input gives same output.
pub fn validate(invocation: &ToolInvocation, rules: &RuleSet) -> ValidationResult {
    if !rules.is_shell_tool(invocation.tool_name()) {
        return ValidationResult::default();
    }

    let command = invocation.command();
    let fired: Vec<_> = rules.matching(command).collect();

    debug!(
        tool = invocation.tool_name(),
        issues = fired.len(),
        "evaluated command"
    );
    if !fired.is_empty() {
        let ids: Vec<&str> = fired.iter().map(|r| r.id.as_str()).collect();
        info!(tool = invocation.tool_name(), rules = ?ids, "command blocked");
    }

    ValidationResult {
        issues: fired.into_iter().map(|r| r.message.clone()).collect(),
    }
}
