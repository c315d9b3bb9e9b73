use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use gcodeflow::{
    init_logging, load_settings, read_program, CancelToken, ChainManager, ProcessorRegistry,
    WriterTransport,
};

#[derive(Parser, Debug)]
#[command(
    name = "gcodeflow",
    version,
    about = "Runs G-code programs through a configurable stage pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream a program to stdout, stopping at the first failing line
    Run(JobArgs),
    /// Process a whole program and report every failing line
    Check(JobArgs),
    /// List the stages that can appear in a configuration
    Stages {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct JobArgs {
    /// Pipeline configuration (.json or .toml); defaults to the user configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// G-code program, or "-" for standard input
    input: PathBuf,
}

fn main() -> anyhow::Result<ExitCode> {
    init_logging()?;

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(&args),
        Command::Check(args) => check(&args),
        Command::Stages { json } => stages(json),
    }
}

fn session_manager(args: &JobArgs) -> anyhow::Result<ChainManager> {
    let settings = load_settings(args.config.as_deref())?;
    let manager = ChainManager::with_settings(ProcessorRegistry::builtin(), &settings)?;
    Ok(manager)
}

fn run(args: &JobArgs) -> anyhow::Result<ExitCode> {
    let manager = session_manager(args)?;
    let program = read_program(&args.input)?;

    let mut driver = manager.start_session();
    let mut transport = WriterTransport::new(std::io::stdout().lock());

    match driver.stream(&program, &mut transport, &CancelToken::new()) {
        Ok(summary) => {
            tracing::info!(
                "Sent {} commands for {} lines",
                summary.commands_sent,
                summary.lines_read
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn check(args: &JobArgs) -> anyhow::Result<ExitCode> {
    let manager = session_manager(args)?;
    let program = read_program(&args.input)?;

    let report = manager.start_session().validate(&program);
    for error in &report.errors {
        println!("{}", error);
    }
    println!(
        "{} lines checked, {} commands, {} errors",
        report.lines_checked,
        report.commands_emitted,
        report.errors.len()
    );

    Ok(if report.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn stages(json: bool) -> anyhow::Result<ExitCode> {
    let catalog = ProcessorRegistry::builtin().catalog();

    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("Available stages:\n");
    for stage in &catalog {
        println!("  {}", stage.name);
        println!("    {}", stage.description);
        for argument in stage.arguments {
            let requirement = match argument.default {
                _ if argument.required => "required".to_string(),
                Some(default) => format!("default {}", default),
                None => "optional".to_string(),
            };
            println!("    - {} ({}): {}", argument.name, requirement, argument.help);
        }
        println!();
    }

    Ok(ExitCode::SUCCESS)
}
