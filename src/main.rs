use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use ui_pilot::client::{ToolClient, ToolClientConfig};
use ui_pilot::orchestrator::Orchestrator;
use ui_pilot::output::OutputLayout;
use ui_pilot::runlog::RunLog;
use ui_pilot::translator::{OllamaTranslator, substitute_env};

/// ui-pilot - AI-assisted browser UI testing
#[derive(Parser, Debug)]
#[command(
    name = "ui-pilot",
    about = "AI-assisted browser UI testing over a JSON-RPC automation tool server",
    after_help = "ENVIRONMENT VARIABLES:\n\
        UI_PILOT_TOOL_ENDPOINT      Tool server URL\n\
        UI_PILOT_MODEL_ENDPOINT     Model API base URL\n\
        UI_PILOT_MODEL              Model name for translation\n\
        UI_PILOT_OUTPUT_DIR         Run artifact directory\n\
        UI_PILOT_STEP_TIMEOUT_MS    Per-step retry budget (ms)\n\
        UI_PILOT_RETRY_INTERVAL_MS  Wait between retries (ms)"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a test document and execute it against the tool server
    Run {
        /// Path to the test scenario document
        #[arg(default_value = "scenarios/sample.txt")]
        document: PathBuf,

        /// Tool server endpoint URL
        #[arg(
            long,
            env = "UI_PILOT_TOOL_ENDPOINT",
            default_value = "http://localhost:3031"
        )]
        tool_endpoint: String,

        /// Model API base URL
        #[arg(
            long,
            env = "UI_PILOT_MODEL_ENDPOINT",
            default_value = "http://localhost:11434"
        )]
        model_endpoint: String,

        /// Model name used for translation
        #[arg(long, env = "UI_PILOT_MODEL", default_value = "mistral:latest")]
        model: String,

        /// Output directory for logs and screenshots
        #[arg(short, long, env = "UI_PILOT_OUTPUT_DIR", default_value = "test-output")]
        output: PathBuf,

        /// Per-step retry budget in milliseconds
        #[arg(long, env = "UI_PILOT_STEP_TIMEOUT_MS", default_value = "10000")]
        step_timeout_ms: u64,

        /// Wait between retry attempts in milliseconds
        #[arg(long, env = "UI_PILOT_RETRY_INTERVAL_MS", default_value = "500")]
        retry_interval_ms: u64,

        /// Print the run outcome as JSON
        #[arg(long)]
        json: bool,

        /// Do not echo log entries to stdout
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Check that the model API and the tool server are reachable
    Check {
        /// Tool server endpoint URL
        #[arg(
            long,
            env = "UI_PILOT_TOOL_ENDPOINT",
            default_value = "http://localhost:3031"
        )]
        tool_endpoint: String,

        /// Model API base URL
        #[arg(
            long,
            env = "UI_PILOT_MODEL_ENDPOINT",
            default_value = "http://localhost:11434"
        )]
        model_endpoint: String,

        /// Model name used for translation
        #[arg(long, env = "UI_PILOT_MODEL", default_value = "mistral:latest")]
        model: String,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    match args.command {
        Some(Commands::Run {
            document,
            tool_endpoint,
            model_endpoint,
            model,
            output,
            step_timeout_ms,
            retry_interval_ms,
            json,
            quiet,
        }) => run_command(RunOptions {
            document,
            tool_endpoint,
            model_endpoint,
            model,
            output,
            step_timeout_ms,
            retry_interval_ms,
            json,
            quiet,
        }),

        Some(Commands::Check {
            tool_endpoint,
            model_endpoint,
            model,
        }) => check_command(&tool_endpoint, &model_endpoint, &model),

        None => {
            println!("ui-pilot - AI-assisted browser UI testing");
            println!();
            println!("Usage: ui-pilot <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run    Translate a test document and execute it");
            println!("  check  Verify the model API and tool server are reachable");
            println!();
            println!("Run with --help for more information.");
            ExitCode::SUCCESS
        }
    }
}

struct RunOptions {
    document: PathBuf,
    tool_endpoint: String,
    model_endpoint: String,
    model: String,
    output: PathBuf,
    step_timeout_ms: u64,
    retry_interval_ms: u64,
    json: bool,
    quiet: bool,
}

fn run_command(opts: RunOptions) -> ExitCode {
    let raw = match std::fs::read_to_string(&opts.document) {
        Ok(text) => text,
        Err(e) => {
            eprintln!(
                "Test document not found: {}: {}",
                opts.document.display(),
                e
            );
            eprintln!("Usage: ui-pilot run [path-to-document.txt]");
            return ExitCode::FAILURE;
        }
    };
    let document = substitute_env(&raw);

    let client = match ToolClient::new(ToolClientConfig::new(&opts.tool_endpoint)) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Could not build tool client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let translator = match OllamaTranslator::new(&opts.model_endpoint, &opts.model) {
        Ok(translator) => translator,
        Err(e) => {
            eprintln!("Could not build translator: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut orchestrator = Orchestrator::new(
        client,
        OutputLayout::new(&opts.output),
        RunLog::new(!opts.quiet && !opts.json),
        Duration::from_millis(opts.step_timeout_ms),
        Duration::from_millis(opts.retry_interval_ms),
    );

    match orchestrator.run(&translator, &document) {
        Ok(outcome) => {
            if opts.json {
                match serde_json::to_string_pretty(&outcome) {
                    Ok(s) => println!("{}", s),
                    Err(e) => eprintln!("Could not serialize outcome: {}", e),
                }
            }
            if outcome.test_failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn check_command(tool_endpoint: &str, model_endpoint: &str, model: &str) -> ExitCode {
    println!("Checking setup...\n");
    let mut all_ok = true;

    println!("1. Model API at {}", model_endpoint);
    match OllamaTranslator::new(model_endpoint, model).and_then(|t| t.list_models()) {
        Ok(models) => {
            println!("   ok: reachable ({} models)", models.len());
            if models.is_empty() {
                println!("   warning: no models installed; pull one first: {}", model);
            } else {
                println!("   models: {}", models.join(", "));
            }
        }
        Err(e) => {
            println!("   unreachable: {}", e);
            all_ok = false;
        }
    }

    println!("\n2. Tool server at {}", tool_endpoint);
    let tools = ToolClient::new(ToolClientConfig::new(tool_endpoint)).and_then(|c| c.list_tools());
    match tools {
        Ok(result) => {
            let names: Vec<String> = result["tools"]
                .as_array()
                .map(|tools| {
                    tools
                        .iter()
                        .filter_map(|t| t["name"].as_str().map(ToString::to_string))
                        .collect()
                })
                .unwrap_or_default();
            println!("   ok: reachable ({} tools)", names.len());
            if !names.is_empty() {
                println!("   tools: {}", names.join(", "));
            }
        }
        Err(e) => {
            println!("   unreachable: {}", e);
            all_ok = false;
        }
    }

    println!("\n{}", "=".repeat(50));
    if all_ok {
        println!("Setup OK. Run a scenario with: ui-pilot run");
        ExitCode::SUCCESS
    } else {
        println!("Some components need attention.");
        ExitCode::FAILURE
    }
}
