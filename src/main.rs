//! script-runner binary entry point.

use std::process::ExitCode;

use script_runner::cli::{self, Args};
use script_runner::config::Config;
use script_runner::execution::{ExecutionResult, OutputSource, ScriptExecutor};
use script_runner::source::{BundledScripts, ScriptsDir};
use script_runner::{logging, ScriptRunnerError};
use tracing::{debug, error};

/// Exit status used when the deadline elapsed, as `timeout(1)` does.
const EXIT_TIMEOUT: u8 = 124;
/// Exit status for usage and validation errors.
const EXIT_USAGE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'script-runner --help' for more information.");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }

    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let _ = logging::init_with_filter(config.log_filter());
    debug!(?config, "configuration loaded");

    let bundled = BundledScripts::builtin();
    let scripts_dir = ScriptsDir::new(&config.scripts.dir);

    if args.list {
        print_scripts(&bundled, &scripts_dir);
        return ExitCode::SUCCESS;
    }

    let descriptor = match args.descriptor(&scripts_dir) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let executor = ScriptExecutor::new(config.to_executor_config()).with_bundled(bundled);

    let result = match run(&executor, descriptor, &args).await {
        Ok(result) => result,
        Err(ScriptRunnerError::Validation(e)) => {
            eprintln!("error: {}", e);
            return ExitCode::from(EXIT_USAGE);
        }
        Err(e) => {
            error!("execution failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    report(&result, &args);
    exit_status(&result)
}

async fn run(
    executor: &ScriptExecutor,
    descriptor: script_runner::ScriptDescriptor,
    args: &Args,
) -> script_runner::Result<ExecutionResult> {
    if args.quiet {
        return executor.execute(&descriptor).await;
    }

    let mut handle = executor.spawn(descriptor);
    while let Some(line) = handle.next_line().await {
        match line.source {
            OutputSource::Stdout => println!("{}", line.text),
            OutputSource::Stderr => eprintln!("{}", line.text),
        }
    }
    handle.wait().await
}

fn report(result: &ExecutionResult, args: &Args) {
    if args.json {
        match serde_json::to_string_pretty(result) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("failed to serialize result: {}", e),
        }
        return;
    }

    if let Some(message) = result.error_message() {
        eprintln!("error: {}", message);
    }
}

fn exit_status(result: &ExecutionResult) -> ExitCode {
    if result.success() {
        return ExitCode::SUCCESS;
    }
    if result.timed_out() {
        return ExitCode::from(EXIT_TIMEOUT);
    }
    match result.exit_code() {
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None => ExitCode::FAILURE,
    }
}

fn print_scripts(bundled: &BundledScripts, scripts_dir: &ScriptsDir) {
    println!("bundled:");
    for key in bundled.keys() {
        println!("  {}", key);
    }

    println!("{}:", scripts_dir.root().display());
    match scripts_dir.list() {
        Ok(names) => {
            for name in names {
                println!("  {}", name);
            }
        }
        Err(e) => println!("  (unavailable: {})", e),
    }
}
