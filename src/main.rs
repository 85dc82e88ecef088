//! VM Manager - Main Entry Point
//!
//! Runs an access trace against one address space of an emulated machine and
//! writes one result per access: the value read, `ok` for a write, or the
//! exception the translation raised.
//!
//! Usage: vm-manager [OPTIONS] <trace_file> <output_file>

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use vm_manager::config::ConfigFile;
use vm_manager::io::{parse_trace, run_trace, write_results};
use vm_manager::{SpaceConfig, VmManager};

#[derive(Parser)]
#[command(name = "vm-manager")]
#[command(about = "Demand-paged virtual memory for an emulated machine")]
struct Cli {
    /// Machine and address-space configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print detailed translation information
    #[arg(short, long)]
    verbose: bool,

    /// Access trace, one `R <addr> <size>` or `W <addr> <size> <value>` per line
    trace_file: PathBuf,

    /// Output file for access results
    output_file: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigFile::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ConfigFile::default(),
    };

    let content = std::fs::read_to_string(&cli.trace_file)
        .with_context(|| format!("Failed to read trace {}", cli.trace_file.display()))?;
    let accesses = parse_trace(&content).context("Failed to parse trace")?;

    let mut vm = VmManager::new(config.machine).context("Invalid machine configuration")?;
    let space = vm
        .create_space(config.space)
        .context("Invalid address-space configuration")?;
    vm.switch_to(space);

    if cli.verbose {
        eprintln!("=== VM Manager ===");
        eprintln!("Trace file:  {}", cli.trace_file.display());
        eprintln!("Output file: {}", cli.output_file.display());
        eprintln!(
            "Machine:     {} frames x {} bytes, {} swap sectors, {:?} eviction",
            config.machine.num_phys_pages,
            config.machine.page_size,
            config.machine.num_sectors,
            config.machine.swap_policy
        );
        match config.space {
            SpaceConfig::PageTable { pages } => eprintln!("Mode:        page table, {pages} pages"),
            SpaceConfig::Lookaside { size } => eprintln!("Mode:        lookaside, {size} slots"),
        }
        eprintln!("Accesses:    {}", accesses.len());
        eprintln!();
    }

    let results = run_trace(&mut vm, &accesses);

    if cli.verbose {
        let stats = vm.stats();
        let failures = results.iter().filter(|r| r.is_fault()).count();
        eprintln!();
        eprintln!("=== Summary ===");
        eprintln!("Successful accesses: {}", results.len() - failures);
        eprintln!("Failed accesses:     {failures}");
        eprintln!("Page faults:         {}", stats.page_faults);
        eprintln!("Lookaside misses:    {}", stats.lookaside_misses);
        eprintln!("Evictions:           {}", stats.evictions);
        eprintln!("Swap ins / outs:     {} / {}", stats.swap_ins, stats.swap_outs);
        eprintln!();
    }

    write_results(&cli.output_file, &results)
        .with_context(|| format!("Failed to write {}", cli.output_file.display()))?;

    if cli.verbose {
        eprintln!("Results written to: {}", cli.output_file.display());
    }

    Ok(())
}
