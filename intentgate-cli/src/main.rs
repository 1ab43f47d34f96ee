use anyhow::Context;
use clap::{Parser, Subcommand};
use intentgate_core::tool::SELECT_ACTIVE_INTENT;
use intentgate_core::{ChannelApprover, GateBuilder, PreHookOutcome};
use intentgate_cli::{gate_builder, handle_pre_tool, logging, serve, TerminalApprover};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// Exit status for a blocked call.
const BLOCKED: u8 = 2;

#[derive(Parser, Debug)]
#[clap(
    name = "intentgate",
    version = env!("CARGO_PKG_VERSION"),
    about = "Intent-scoped authorization hooks for AI coding agents"
)]
struct Cli {
    /// Workspace root (defaults to the current directory)
    #[clap(long, global = true)]
    workspace: Option<PathBuf>,

    /// JSON config file overriding default paths and limits
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON-lines hook protocol on stdin/stdout
    Serve {
        /// Reject approvals not answered within this many seconds
        #[clap(long)]
        approval_timeout: Option<u64>,
    },
    /// Evaluate one tool call, asking for approval on the terminal
    Check {
        /// Tool name, e.g. write_to_file
        #[clap(long)]
        tool: String,
        /// Tool parameters as a JSON object
        #[clap(long, default_value = "{}")]
        params: String,
        /// Session id
        #[clap(long)]
        session: Option<String>,
        /// Select this intent before evaluating the call
        #[clap(long)]
        intent: Option<String>,
    },
}

async fn builder(cli: &Cli) -> anyhow::Result<GateBuilder> {
    Ok(gate_builder(cli.workspace.as_deref(), cli.config.as_deref()).await?)
}

async fn run_serve(cli: &Cli, approval_timeout: Option<u64>) -> anyhow::Result<ExitCode> {
    let (approver, approvals) = ChannelApprover::new();
    let approver = match approval_timeout {
        Some(secs) => approver.with_timeout(Duration::from_secs(secs)),
        None => approver,
    };
    let approver = Arc::new(approver);
    let gate = builder(cli).await?.with_approval_arc(approver.clone()).build();

    tracing::info!("serving hook protocol on stdio");
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    serve(Arc::new(gate), approver, approvals, stdin, tokio::io::stdout()).await?;
    Ok(ExitCode::SUCCESS)
}

async fn run_check(
    cli: &Cli,
    tool: &str,
    params: &str,
    session: Option<&str>,
    intent: Option<&str>,
) -> anyhow::Result<ExitCode> {
    let params: serde_json::Value =
        serde_json::from_str(params).context("--params must be valid JSON")?;
    let gate = builder(cli).await?.with_approval(TerminalApprover).build();
    let session = session.map(String::from);

    if let Some(intent) = intent {
        let outcome = handle_pre_tool(
            &gate,
            SELECT_ACTIVE_INTENT.into(),
            serde_json::json!({ "intent_id": intent }),
            session.clone(),
            None,
        )
        .await;
        if !outcome.is_allow() {
            return report(&outcome);
        }
    }

    let outcome = handle_pre_tool(&gate, tool.to_string(), params, session, None).await;
    report(&outcome)
}

fn report(outcome: &PreHookOutcome) -> anyhow::Result<ExitCode> {
    match outcome {
        PreHookOutcome::Block { error } => {
            println!("{}", serde_json::to_string_pretty(&error.to_document())?);
            Ok(ExitCode::from(BLOCKED))
        }
        other => {
            println!("{}", serde_json::to_string_pretty(other)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    logging::init();
    let cli = Cli::parse();

    match &cli.command {
        Command::Serve { approval_timeout } => run_serve(&cli, *approval_timeout).await,
        Command::Check {
            tool,
            params,
            session,
            intent,
        } => {
            run_check(
                &cli,
                tool,
                params,
                session.as_deref(),
                intent.as_deref(),
            )
            .await
        }
    }
}
