use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tapevm::{BfInterpreter, DEFAULT_TAPE_LENGTH, InterpreterConfig, JumpTable, Program};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs a tape machine program read from a source file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the program source
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Number of cells in the memory tape
    #[arg(short, long, default_value_t = DEFAULT_TAPE_LENGTH)]
    tape_length: usize,

    /// Print the filtered program and its jump pairs instead of running it
    #[arg(short, long)]
    dump: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let source = std::fs::read_to_string(&args.file)
        .with_context(|| format!("source read failed: {}", args.file.display()))?;
    info!(file = %args.file.display(), "loaded source");

    let program = Program::load(&source);
    let jumps = JumpTable::resolve(&program).context("jump resolution failed")?;
    if args.dump {
        println!("{program} {jumps}");
        return Ok(());
    }

    let config = InterpreterConfig {
        tape_length: args.tape_length,
    };
    let stdin = std::io::stdin();
    let stdin = stdin.lock();
    let stdout = std::io::stdout();
    let interpreter = BfInterpreter::from_parts(program, jumps, config, stdin, stdout)?;
    interpreter.execute().context("execution failure")?;
    Ok(())
}
