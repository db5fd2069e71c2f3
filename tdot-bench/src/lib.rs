//! Benchmark harness for `tdot_core` contractions.
//!
//! Settings are read from a JSON file ([`config`]). Each one is checked
//! against a dense reference tensordot ([`check`]) and timed for tdot and
//! for the reference ([`perf`]).

pub mod check;
pub mod config;
pub mod error;
pub mod perf;
pub mod reference;

pub use check::{check, plan_contraction, ActivePlan};
pub use config::{parse_config, parse_config_str, ConfigAxes, ContractionConfig};
pub use error::{BenchError, Result};
pub use perf::{perf, repetitions_for, KernelKind, PerfOptions, PerfResult};
pub use reference::DenseTensor;
