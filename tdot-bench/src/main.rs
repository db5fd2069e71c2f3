use std::error::Error;
use std::fmt::Display;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use tdot_bench::{check, parse_config, perf, ContractionConfig, KernelKind, PerfOptions};

/// Correctness and throughput of tdot contractions read from a JSON config
#[derive(Parser, Debug)]
#[command(name = "tdot-bench", version)]
struct Cli {
    /// Path to the JSON config holding the contraction settings
    config: PathBuf,
    /// Targeted duration of every timed run, in seconds
    #[arg(long, default_value_t = 10.0)]
    time_target: f64,
    /// Repetitions used to calibrate the timed run
    #[arg(long, default_value_t = 10)]
    initial_repetitions: u64,
    /// Seed of the operand generator
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Skip timing the reference tensordot
    #[arg(long)]
    no_reference: bool,
}

fn join<T: Display>(values: &[T]) -> String {
    values.iter().map(|v| format!(" {v}")).collect()
}

fn print_config(out: &mut impl Write, config: &ContractionConfig) -> io::Result<()> {
    writeln!(out, "config:")?;
    writeln!(out, "  sizes_s:{}", join(&config.sizes_s))?;
    writeln!(out, "  sizes_t:{}", join(&config.sizes_t))?;
    writeln!(out, "  sizes_u:{}", join(&config.sizes_u))?;
    writeln!(out, "  types_s:{}", join(&config.types_s))?;
    writeln!(out, "  types_t:{}", join(&config.types_t))?;
    writeln!(out, "  types_u:{}", join(&config.types_u))
}

fn kernels(cli: &Cli) -> Vec<KernelKind> {
    let mut kinds = vec![KernelKind::Tdot];
    #[cfg(feature = "parallel")]
    kinds.push(KernelKind::TdotParallel);
    if !cli.no_reference {
        kinds.push(KernelKind::Reference);
    }
    kinds
}

fn run(cli: &Cli, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    let configs = parse_config(&cli.config)?;
    let options = PerfOptions {
        time_target: cli.time_target,
        initial_repetitions: cli.initial_repetitions,
    };
    let mut rng = StdRng::seed_from_u64(cli.seed);

    writeln!(out, "*** Running tensordot benchmarking interface ***")?;
    for (index, config) in configs.iter().enumerate() {
        writeln!(out, "*** setting {} of {} ***", index + 1, configs.len())?;
        print_config(out, config)?;

        for kind in kernels(cli) {
            writeln!(out, "{kind}:")?;
            if kind == KernelKind::Tdot {
                let correct = check(config, &mut rng)?;
                writeln!(out, "  correctness: {}", u8::from(correct))?;
            }
            let result = perf(kind, config, &options, &mut rng)?;
            writeln!(out, "  repetitions: {}", result.repetitions)?;
            writeln!(out, "  duration: {} seconds", result.seconds)?;
            writeln!(out, "  GFLOPS: {}", result.gflops)?;
        }
        writeln!(out)?;
    }
    writeln!(out, "****************")?;
    writeln!(out, "*** finished ***")?;
    writeln!(out, "****************")?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli, &mut io::stdout().lock()) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
