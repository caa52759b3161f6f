use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;

use simppl::{read_program, run, EnumerationConfig, Error, InferenceMethod, Strategy};

/// Exact inference for SimPPL programs.
#[derive(Parser)]
#[command(name = "simppl", version, about)]
struct Cli {
    /// Inference method; only `enumerate` is available
    #[arg(value_name = "METHOD", value_parser = clap::value_parser!(InferenceMethod))]
    method: InferenceMethod,

    /// Program to run
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// How the execution paths are walked
    #[arg(long, value_enum, default_value_t = Strategy::Recursive)]
    strategy: Strategy,

    /// Fail once enumeration reaches more than N execution paths
    #[arg(long, value_name = "N")]
    max_paths: Option<usize>,

    /// Print every trace before the probability
    #[arg(long)]
    traces: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match run_file(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Inference(e)) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run_file(cli: &Cli) -> Result<(), Error> {
    let program = read_program(&cli.file)?;
    let config = EnumerationConfig {
        strategy: cli.strategy,
        max_paths: cli.max_paths,
    };
    let inference = run(cli.method, &program, &config)?;
    if cli.traces {
        for trace in &inference.traces {
            println!("{trace}");
        }
    }
    println!("{}", inference.probability()?);
    Ok(())
}
