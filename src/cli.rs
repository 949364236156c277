//! CLI module: stream a single completion to the terminal.

use crate::config::Config;
use crate::observer::{Observer, events};
use crate::provider::{FailureReason, StreamingDecoder, TerminalOutcome};
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Streaming chat-completion client
#[derive(Parser, Debug)]
#[command(name = "chatstream", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream a completion for one prompt
    Run(RunArgs),
    /// Inspect configuration
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show config file path
    Path,
    /// Print the effective configuration (secrets redacted)
    Show,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// The prompt to send (use "-" to read from stdin)
    #[arg(required = true)]
    pub prompt: String,

    /// Model to use (e.g., "anthropic/claude-sonnet-4")
    #[arg(short, long)]
    pub model: Option<String>,

    /// Output format
    #[arg(short = 'o', long, default_value = "text", value_enum)]
    pub output_format: OutputFormat,

    /// Total time budget in seconds (overrides config)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Quiet mode (final response only, no progress)
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    StreamJson,
}

/// Final JSON object for `--output-format json`.
#[derive(Serialize)]
#[serde(tag = "type")]
enum JsonResult<'a> {
    #[serde(rename = "done")]
    Done {
        response: &'a str,
        token_count: usize,
    },
    #[serde(rename = "error")]
    Error {
        kind: &'static str,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        partial: Option<&'a str>,
    },
}

/// Writes notifications to the terminal according to the output format.
struct ConsoleObserver {
    format: OutputFormat,
    quiet: bool,
}

impl ConsoleObserver {
    fn line_for(event: &str, payload: &Value) -> Value {
        let mut line = serde_json::json!({ "type": event });
        if let (Some(line), Some(payload)) = (line.as_object_mut(), payload.as_object()) {
            line.extend(payload.clone());
        }
        line
    }
}

impl Observer for ConsoleObserver {
    fn notify(&self, event: &str, payload: Value) {
        match self.format {
            OutputFormat::StreamJson => {
                let mut stdout = io::stdout().lock();
                let _ = writeln!(stdout, "{}", Self::line_for(event, &payload));
            }
            OutputFormat::Text if !self.quiet => match event {
                events::TOKEN => {
                    if let Some(token) = payload["token"].as_str() {
                        let mut stdout = io::stdout().lock();
                        let _ = write!(stdout, "{token}");
                        let _ = stdout.flush();
                    }
                }
                events::STREAM_ERROR => {
                    eprintln!("\n[stream error] {}", payload["message"].as_str().unwrap_or(""));
                }
                _ => {}
            },
            _ => {}
        }
    }
}

/// Read the prompt argument, handling "-" for stdin.
fn read_prompt(arg: &str) -> Result<String> {
    if arg == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer.trim().to_string())
    } else {
        Ok(arg.to_string())
    }
}

/// Run a one-shot streaming completion.
pub async fn run(args: RunArgs) -> ExitCode {
    match run_inner(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_inner(args: RunArgs) -> Result<ExitCode> {
    let config = Config::load()?;
    let prompt = read_prompt(&args.prompt)?;
    if prompt.is_empty() {
        anyhow::bail!("Empty prompt");
    }

    let model = args
        .model
        .clone()
        .unwrap_or_else(|| config.model_or_default().to_string());
    let budget = args
        .timeout
        .map_or(config.timeouts().total, Duration::from_secs);
    config.check_budget(budget)?;

    let request = config.request_builder().build(model, prompt);
    if !request.has_credential() {
        tracing::debug!(env = %config.api_key_env, "No API key configured, sending empty credential");
    }

    let decoder = StreamingDecoder::new(&config.base_url, config.timeouts());
    let observer = ConsoleObserver {
        format: args.output_format,
        quiet: args.quiet,
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let outcome = decoder.stream(&request, &observer, budget, &cancel).await;
    output_result(&outcome, args.output_format, args.quiet)
}

/// Output the terminal outcome based on format.
fn output_result(outcome: &TerminalOutcome, format: OutputFormat, quiet: bool) -> Result<ExitCode> {
    match outcome {
        TerminalOutcome::Completed {
            full_text,
            token_count,
        } => {
            match format {
                OutputFormat::Text if quiet => println!("{full_text}"),
                // Tokens were already printed as they arrived
                OutputFormat::Text => println!(),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string(&JsonResult::Done {
                        response: full_text,
                        token_count: *token_count,
                    })?
                ),
                OutputFormat::StreamJson => {}
            }
            Ok(ExitCode::SUCCESS)
        }
        TerminalOutcome::Failed { reason } => {
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string(&JsonResult::Error {
                        kind: reason.kind(),
                        message: reason.to_string(),
                        partial: reason.partial_text(),
                    })?
                ),
                OutputFormat::StreamJson => {}
                OutputFormat::Text => {
                    if !quiet {
                        println!();
                    }
                    eprintln!("Error: {reason}");
                    if matches!(reason, FailureReason::Http { status: 401 | 403, .. }) {
                        eprintln!("Hint: set OPENROUTER_API_KEY or api_key in {}", Config::path().display());
                    }
                }
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Handle `chatstream config ...`.
pub fn config_command(args: &ConfigArgs) -> Result<ExitCode> {
    match args.action {
        ConfigAction::Path => println!("{}", Config::path().display()),
        ConfigAction::Show => {
            let mut config = Config::load()?;
            if config.api_key.is_some() {
                config.api_key = Some("[REDACTED]".into());
            }
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}
