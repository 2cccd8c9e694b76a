//! Pre-tool-use hook protocol.
//!
//! The runtime writes one JSON tool invocation to the hook's stdin before
//! running a tool. Exit code 0 lets the tool run. Exit code 2 blocks it and
//! hands stderr back to the agent as the reason. Any other exit code is a
//! non-blocking error: the tool still runs and stderr is shown to the user.

use std::io::{Read, Write};

use tracing::warn;

use crate::error::GateError;
use crate::gate::{self, Decision, rules::RuleSet};
use crate::tools::ToolInvocation;

pub const EXIT_APPROVED: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_BLOCKED: i32 = 2;

#[derive(Debug)]
pub enum HookOutcome {
    Decided(Decision),
    Error(GateError),
}

impl HookOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            HookOutcome::Decided(Decision::Approved) => EXIT_APPROVED,
            HookOutcome::Decided(Decision::Blocked { .. }) => EXIT_BLOCKED,
            HookOutcome::Error(_) => EXIT_ERROR,
        }
    }

    /// Report to `out` and return the exit code to terminate with.
    ///
    /// The exit code does not depend on the write succeeding: a broken
    /// stderr must not turn a block into an allow.
    pub fn finish<W: Write>(&self, out: &mut W) -> i32 {
        let code = self.exit_code();
        if let Err(e) = self.report(out) {
            warn!(error = %e, code, "failed to write hook report");
        }
        code
    }

    /// Write the caller-visible text. Approval writes nothing.
    pub fn report<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        match self {
            HookOutcome::Decided(Decision::Approved) => Ok(()),
            HookOutcome::Decided(Decision::Blocked { issues }) => {
                for issue in issues {
                    writeln!(out, "• {issue}")?;
                }
                Ok(())
            }
            HookOutcome::Error(e) => writeln!(out, "cmdgate: {e}"),
        }
    }
}

/// Read one invocation from `input` and evaluate it.
pub fn run<R: Read>(input: R, rules: &RuleSet) -> HookOutcome {
    match read_invocation(input) {
        Ok(invocation) => HookOutcome::Decided(gate::validate(&invocation, rules).decision()),
        Err(e) => {
            warn!(error = %e, "unreadable hook input");
            HookOutcome::Error(e)
        }
    }
}

fn read_invocation<R: Read>(input: R) -> Result<ToolInvocation, GateError> {
    serde_json::from_reader(input).map_err(|e| GateError::InvalidInvocation(e.to_string()))
}
