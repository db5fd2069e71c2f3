//! Throughput measurement.
//!
//! A kernel is warmed up once, timed for an initial number of repetitions,
//! and timed again with the repetition count rescaled to the time target.

use std::fmt;
use std::hint::black_box;
use std::time::Instant;

use rand::Rng;
use tdot_core::ContractOptions;

use crate::check::plan_contraction;
use crate::config::ContractionConfig;
use crate::error::Result;
use crate::reference::DenseTensor;

/// Implementation being measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelKind {
    /// Loop nest around one GEMM microkernel.
    Tdot,
    /// [`Tdot`](KernelKind::Tdot) with output blocks spread over rayon.
    #[cfg(feature = "parallel")]
    TdotParallel,
    /// Permute-and-multiply [`DenseTensor::tensordot`].
    Reference,
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KernelKind::Tdot => "tdot",
            #[cfg(feature = "parallel")]
            KernelKind::TdotParallel => "tdot (parallel)",
            KernelKind::Reference => "reference tensordot",
        };
        f.write_str(name)
    }
}

/// Timing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerfOptions {
    /// Targeted duration of the measured run, in seconds.
    pub time_target: f64,
    /// Repetitions of the calibration run.
    pub initial_repetitions: u64,
}

impl Default for PerfOptions {
    fn default() -> Self {
        Self {
            time_target: 10.0,
            initial_repetitions: 10,
        }
    }
}

/// Outcome of one measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerfResult {
    pub repetitions: u64,
    pub seconds: f64,
    pub gflops: f64,
}

/// Repetitions needed to fill `target` seconds, given that `initial`
/// repetitions took `elapsed` seconds. Never less than one.
pub fn repetitions_for(initial: u64, elapsed: f64, target: f64) -> u64 {
    if !(elapsed > 0.0) {
        return initial.max(1);
    }
    ((initial as f64 * target / elapsed) as u64).max(1)
}

fn time_reps(reps: u64, run: &mut impl FnMut() -> Result<()>) -> Result<f64> {
    let t0 = Instant::now();
    for _ in 0..reps {
        run()?;
    }
    Ok(t0.elapsed().as_secs_f64())
}

fn measure(
    options: &PerfOptions,
    flops: u64,
    mut run: impl FnMut() -> Result<()>,
) -> Result<PerfResult> {
    run()?;
    let initial = options.initial_repetitions.max(1);
    let elapsed = time_reps(initial, &mut run)?;
    let repetitions = repetitions_for(initial, elapsed, options.time_target);
    let seconds = time_reps(repetitions, &mut run)?;
    let gflops = repetitions as f64 * flops as f64 / seconds * 1e-9;
    Ok(PerfResult {
        repetitions,
        seconds,
        gflops,
    })
}

/// Measure `kind` on random operands shaped by `config`.
///
/// The FLOP count per repetition is [`ContractionConfig::flops`].
pub fn perf<R: Rng>(
    kind: KernelKind,
    config: &ContractionConfig,
    options: &PerfOptions,
    rng: &mut R,
) -> Result<PerfResult> {
    let s = DenseTensor::random(&config.sizes_s, rng);
    let t = DenseTensor::random(&config.sizes_t, rng);
    let flops = config.flops();

    match kind {
        KernelKind::Tdot => {
            let plan = plan_contraction(config, &ContractOptions::default())?;
            let mut u = DenseTensor::zeros(&config.sizes_u);
            measure(options, flops, || {
                plan.execute(s.data(), t.data(), u.data_mut())?;
                black_box(u.data());
                Ok(())
            })
        }
        #[cfg(feature = "parallel")]
        KernelKind::TdotParallel => {
            let plan = plan_contraction(config, &ContractOptions::default())?;
            let mut u = DenseTensor::zeros(&config.sizes_u);
            measure(options, flops, || {
                plan.par_execute(s.data(), t.data(), u.data_mut())?;
                black_box(u.data());
                Ok(())
            })
        }
        KernelKind::Reference => {
            let (axes_s, axes_t) = config.reduction_dims();
            measure(options, flops, || {
                black_box(s.tensordot(&t, &axes_s, &axes_t)?);
                Ok(())
            })
        }
    }
}
