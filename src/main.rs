use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmdgate::gate::{self, Decision, rules::RuleSet};
use cmdgate::hook::{self, EXIT_APPROVED, EXIT_BLOCKED, EXIT_ERROR};
use cmdgate::tools::ToolInvocation;

#[derive(Parser)]
#[command(
    name = "cmdgate",
    about = "Validate agent shell commands against pattern rules before they run",
    version
)]
struct Cli {
    /// Rule file (TOML). Defaults to the built-in rules.
    #[arg(long, global = true, env = "CMDGATE_RULES")]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a tool invocation from stdin and exit 0 (allow) or 2 (block)
    Hook,

    /// Evaluate a literal command and print any issues
    Check {
        /// Command text to evaluate
        command: String,

        /// Tool name to evaluate as (default: first configured shell tool)
        #[arg(long)]
        tool: Option<String>,
    },

    /// List the loaded rules in evaluation order
    Rules,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CMDGATE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    match dispatch(cli) {
        Ok(code) => exit_code(code),
        Err(e) => {
            // Configuration failures must not block the tool; exit 1 is non-blocking.
            let _ = writeln!(std::io::stderr(), "cmdgate: {e:#}");
            exit_code(EXIT_ERROR)
        }
    }
}

fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let rules = load_rules(cli.rules.as_deref())?;

    match cli.command.unwrap_or(Commands::Hook) {
        Commands::Hook => {
            let outcome = hook::run(std::io::stdin().lock(), &rules);
            Ok(outcome.finish(&mut std::io::stderr().lock()))
        }
        Commands::Check { command, tool } => {
            let tool = match tool {
                Some(t) => t,
                None => rules.shell_tools()[0].clone(),
            };
            let invocation = ToolInvocation::new(&tool, serde_json::json!({ "command": command }));
            let mut out = std::io::stdout().lock();
            match gate::validate(&invocation, &rules).decision() {
                Decision::Approved => {
                    writeln!(out, "approved")?;
                    Ok(EXIT_APPROVED)
                }
                Decision::Blocked { issues } => {
                    for issue in &issues {
                        writeln!(out, "• {issue}")?;
                    }
                    Ok(EXIT_BLOCKED)
                }
            }
        }
        Commands::Rules => {
            let mut out = std::io::stdout().lock();
            writeln!(out, "shell tools: {}", rules.shell_tools().join(", "))?;
            for rule in rules.rules() {
                writeln!(out, "{}\t{}\t{}", rule.id, rule.pattern, rule.message)?;
            }
            Ok(EXIT_APPROVED)
        }
    }
}

fn load_rules(path: Option<&Path>) -> anyhow::Result<RuleSet> {
    match path {
        Some(p) => {
            RuleSet::load(p).with_context(|| format!("loading rules from {}", p.display()))
        }
        None => Ok(RuleSet::default()),
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
