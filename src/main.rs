use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cellforth::{Severity, StreamConsole, Vm, VmConfig};

#[derive(Parser, Debug)]
#[command(name = "cellforth")]
#[command(about = "Run a cellforth script, or read one from standard input")]
struct Cli {
    /// Script to run instead of standard input
    script: Option<PathBuf>,

    /// Operand stack capacity, in cells
    #[arg(long, default_value_t = VmConfig::DEFAULT_REGION_CELLS)]
    operand_cells: usize,

    /// Return stack capacity, in cells
    #[arg(long, default_value_t = VmConfig::DEFAULT_REGION_CELLS)]
    return_cells: usize,

    /// Dictionary arena capacity, in cells
    #[arg(long, default_value_t = VmConfig::DEFAULT_REGION_CELLS)]
    arena_cells: usize,

    /// Deepest nesting of control constructs in one definition
    #[arg(long, default_value_t = VmConfig::DEFAULT_MAX_NESTING)]
    max_nesting: usize,
}

impl Cli {
    fn config(&self) -> VmConfig {
        VmConfig{
            operand_cells: self.operand_cells,
            return_cells:  self.return_cells,
            arena_cells:   self.arena_cells,
            max_nesting:   self.max_nesting,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let input : Box<dyn Read> = match &cli.script {
        Some(path) => {
            info!(script = %path.display(), "reading script");
            let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            Box::new(file)
        },
        None => Box::new(std::io::stdin()),
    };

    let console = StreamConsole::new(BufReader::new(input), BufWriter::new(std::io::stdout()));
    let mut vm = Vm::new(console, &cli.config());
    vm.run();

    let fatal = vm.last_error()
        .filter(|err| err.severity() == Severity::Fatal)
        .cloned();

    let (_, mut output) = vm.into_console().into_inner();
    output.flush().context("failed to flush output")?;

    if let Some(err) = fatal {
        bail!(err);
    }

    Ok(())
}
