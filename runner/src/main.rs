//! Host Noise Runner
//!
//! Runs the instrumented noise pipeline on your laptop with a simulated
//! trigger pin and prints one report per run to stdout. Useful for checking
//! the report format, replaying a seed captured from the device, and getting
//! rough host timings.
//!
//! Usage:
//!   cargo run --release -p noise-runner -- --runs 3
//!   cargo run --release -p noise-runner -- --seed <64 hex chars> --step-clock 5

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use kyber_noise::cbd::CbdSampler;
use kyber_noise::params::{HarnessConfig, KyberVariant, TermLayout, DEFAULT_ROW_WIDTH};
use kyber_noise::pipeline::{NoisePipeline, NoiseRun};
use kyber_noise::prf::Shake256Prf;
use kyber_noise::report::{IoWriter, ReportEmitter};
use kyber_noise::seed::{EntropySource, FixedEntropy, RngEntropy, Seed};
use kyber_noise::timing::{MonotonicClock, StdClock, StepClock};
use kyber_noise::trigger::{RecordingPin, TriggerController};
use rand::rngs::OsRng;
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use std::io::Write;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Variant {
    #[value(name = "512")]
    Kyber512,
    #[value(name = "768")]
    Kyber768,
    #[value(name = "1024")]
    Kyber1024,
}

impl From<Variant> for KyberVariant {
    fn from(v: Variant) -> Self {
        match v {
            Variant::Kyber512 => KyberVariant::Kyber512,
            Variant::Kyber768 => KyberVariant::Kyber768,
            Variant::Kyber1024 => KyberVariant::Kyber1024,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Layout {
    /// s, e at eta1; r, e1, e2 at eta2
    Split,
    /// every term at eta1
    Uniform,
}

impl From<Layout> for TermLayout {
    fn from(l: Layout) -> Self {
        match l {
            Layout::Split => TermLayout::Split,
            Layout::Uniform => TermLayout::Uniform,
        }
    }
}

/// Run the Kyber noise pipeline on the host
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Kyber parameter set
    #[arg(short, long, value_enum, default_value = "512")]
    variant: Variant,

    /// Assignment of distribution widths to terms
    #[arg(short, long, value_enum, default_value = "split")]
    layout: Layout,

    /// Number of runs, each with a fresh seed
    #[arg(short, long, default_value = "1")]
    runs: u32,

    /// Replay this seed (64 hex chars) instead of drawing one; single run only
    #[arg(short, long, conflicts_with = "rng_seed")]
    seed: Option<String>,

    /// Draw seeds from ChaCha20 seeded with this value (reproducible)
    #[arg(long)]
    rng_seed: Option<u64>,

    /// Coefficients per report row
    #[arg(long, default_value_t = DEFAULT_ROW_WIDTH)]
    row_width: usize,

    /// Replace the wall clock with one that advances this many microseconds
    /// per reading, for byte-identical reports
    #[arg(long)]
    step_clock: Option<u64>,

    /// Skip the |c| <= eta check after each term
    #[arg(long)]
    no_coefficient_check: bool,

    /// Print a timing summary to stderr after the last run
    #[arg(long)]
    summary: bool,
}

enum HostClock {
    Wall(StdClock),
    Step(StepClock),
}

impl MonotonicClock for HostClock {
    fn now_us(&mut self) -> u64 {
        match self {
            HostClock::Wall(clock) => clock.now_us(),
            HostClock::Step(clock) => clock.now_us(),
        }
    }
}

/// Every run of a batch must get its own seed, so a fixed seed allows one run.
fn check_args(args: &Args) -> Result<()> {
    if args.seed.is_some() && args.runs > 1 {
        bail!("--seed replays a single run; use --rng-seed for reproducible batches");
    }
    Ok(())
}

fn entropy_source(args: &Args) -> Result<Box<dyn EntropySource>> {
    if let Some(hex) = &args.seed {
        let seed = Seed::from_hex(hex).context("Invalid --seed")?;
        return Ok(Box::new(FixedEntropy::new(seed)));
    }
    if let Some(value) = args.rng_seed {
        return Ok(Box::new(RngEntropy::new(ChaCha20Rng::seed_from_u64(value))));
    }
    Ok(Box::new(RngEntropy::new(OsRng)))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    check_args(&args)?;

    let config = HarnessConfig {
        variant: args.variant.into(),
        layout: args.layout.into(),
        row_width: args.row_width,
        check_coefficients: !args.no_coefficient_check,
    };
    config.validate().context("Invalid configuration")?;
    let terms = config.terms();
    log::info!(
        "{} {:?} layout, {} terms, {} run(s)",
        config.variant.name(),
        config.layout,
        terms.len(),
        args.runs
    );

    let mut entropy = entropy_source(&args)?;
    let clock = match args.step_clock {
        Some(step) => HostClock::Step(StepClock::new(step)),
        None => HostClock::Wall(StdClock::new()),
    };

    let mut trigger = TriggerController::new(RecordingPin::new());
    trigger.configure().context("Failed to configure trigger")?;
    let mut pipeline = NoisePipeline::new(trigger, clock, Shake256Prf, CbdSampler)
        .with_coefficient_check(config.check_coefficients);

    let stdout = std::io::stdout();
    let mut emitter = ReportEmitter::new(IoWriter::new(stdout.lock()), config.row_width)?;
    let mut completed: Vec<NoiseRun> = Vec::new();

    for run_index in 0..args.runs {
        let seed = Seed::acquire(entropy.as_mut()).context("Failed to draw seed")?;
        let outcome = pipeline.run(&seed, &terms);

        if emitter.emit_outcome(&seed, &outcome).is_err() {
            let mut out = emitter.into_inner();
            return Err(out
                .take_error()
                .map(anyhow::Error::from)
                .unwrap_or_else(|| anyhow::anyhow!("report formatting failed")))
            .context("Failed to write report");
        }

        match outcome {
            Ok(run) => completed.push(run),
            Err(failure) => {
                let term = failure.failed.map(|t| t.name).unwrap_or("-");
                bail!(
                    "Run {} failed at term {}: {}",
                    run_index + 1,
                    term,
                    failure.error
                );
            }
        }
    }

    let mut out = emitter.into_inner();
    out.flush().context("Failed to flush stdout")?;

    if args.summary {
        print_summary(&completed);
    }

    let pin = pipeline.into_trigger().into_pin();
    log::debug!("trigger pulses issued: {}", pin.rising_edges());
    Ok(())
}

fn print_summary(runs: &[NoiseRun]) {
    let Some(first) = runs.first() else {
        return;
    };
    let stderr = std::io::stderr();
    let mut err = stderr.lock();
    let _ = writeln!(err, "\n=== Timing Summary ({} runs) ===", runs.len());

    for (i, result) in first.results.iter().enumerate() {
        let samples: Vec<u64> = runs.iter().map(|r| r.results[i].timing.elapsed_us).collect();
        let min = samples.iter().min().copied().unwrap_or(0);
        let max = samples.iter().max().copied().unwrap_or(0);
        let mean = samples.iter().sum::<u64>() / samples.len() as u64;
        let _ = writeln!(
            err,
            "  {:<3} eta={}  min={}us  mean={}us  max={}us",
            result.spec.name, result.spec.distribution_width, min, mean, max
        );
    }
    let mean_total = runs.iter().map(|r| r.total.elapsed_us).sum::<u64>() / runs.len() as u64;
    let _ = writeln!(err, "  total mean={}us", mean_total);
}
