//! Correctness check of a configured contraction against the reference
//! tensordot.

use rand::Rng;
use tdot_core::{
    row_major_strides, ActiveBackend, ContractOptions, Contraction, GemmBackend, TensorDesc,
};

use crate::config::ContractionConfig;
use crate::error::Result;
use crate::reference::DenseTensor;

/// Relative tolerance of [`check`].
pub const RTOL: f32 = 1e-5;
/// Absolute tolerance of [`check`].
pub const ATOL: f32 = 1e-6;

/// Contraction plan on the active backend.
pub type ActivePlan = Contraction<<ActiveBackend as GemmBackend>::Kernel>;

/// Plan the configured contraction over dense row-major buffers.
pub fn plan_contraction(config: &ContractionConfig, options: &ContractOptions) -> Result<ActivePlan> {
    let axes = config.axes()?;
    let strides_s = row_major_strides(&config.sizes_s);
    let strides_t = row_major_strides(&config.sizes_t);
    let strides_u = row_major_strides(&config.sizes_u);
    let s = TensorDesc::new(&config.sizes_s, &strides_s, &axes.s)?;
    let t = TensorDesc::new(&config.sizes_t, &strides_t, &axes.t)?;
    let u = TensorDesc::new(&config.sizes_u, &strides_u, &axes.u)?;
    Ok(Contraction::new(&ActiveBackend::default(), &s, &t, &u, options)?)
}

/// Contract random operands with tdot and with the reference tensordot, and
/// compare after bringing U into `[M..., N...]` order.
pub fn check<R: Rng>(config: &ContractionConfig, rng: &mut R) -> Result<bool> {
    let s = DenseTensor::random(&config.sizes_s, rng);
    let t = DenseTensor::random(&config.sizes_t, rng);
    let mut u = DenseTensor::zeros(&config.sizes_u);

    let plan = plan_contraction(config, &ContractOptions::default())?;
    plan.execute(s.data(), t.data(), u.data_mut())?;

    let (axes_s, axes_t) = config.reduction_dims();
    let reference = s.tensordot(&t, &axes_s, &axes_t)?;
    let permuted = u.permute(&config.output_permutation())?;
    Ok(permuted.allclose(&reference, RTOL, ATOL))
}
