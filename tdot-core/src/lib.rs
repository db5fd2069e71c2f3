//! Binary tensor contraction driving a single GEMM microkernel.
//!
//! `U = contract(S, T)` sums over the K dimensions shared by S and T and keeps
//! the free M dimensions of S and N dimensions of T in U. The two innermost
//! dimensions of every operand form one matrix block handled by a
//! [`tdot_gemm::GemmKernel`]; all remaining dimensions become an explicit loop
//! nest (M outermost, then N, then K) driving that kernel at shifted offsets.
//!
//! # Example
//!
//! ```
//! use tdot_core::{contract, Axis, TensorDesc};
//!
//! // U[n, m] = sum_k S[k, m] * T[k, n]
//! let s_axes = [Axis::K, Axis::M];
//! let t_axes = [Axis::K, Axis::N];
//! let u_axes = [Axis::N, Axis::M];
//! let s = TensorDesc::new(&[3, 2], &[2, 1], &s_axes).unwrap();
//! let t = TensorDesc::new(&[3, 2], &[2, 1], &t_axes).unwrap();
//! let u = TensorDesc::new(&[2, 2], &[2, 1], &u_axes).unwrap();
//!
//! let s_data = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
//! let t_data = [1.0f32, 0.0, 0.0, 1.0, 0.0, 0.0];
//! let mut u_data = [0.0f32; 4];
//! contract(&s, &t, &u, &s_data, &t_data, &mut u_data).unwrap();
//! assert_eq!(u_data, [1.0, 2.0, 3.0, 4.0]);
//! ```

/// Contraction plan and loop-nest execution.
pub mod driver;
/// Error types.
pub mod error;
/// Selection of per-dimension attributes by axis class.
pub mod filter;
/// Mapping of the innermost operand blocks onto a GEMM shape.
pub mod layout;
/// Matched loop descriptors per dimension class.
pub mod loops;
/// Mixed-radix loop counters.
pub mod odometer;
/// Axis tags and tensor descriptors.
pub mod tensor;

pub use driver::{ContractOptions, Contraction, OutputMode, DEFAULT_MAX_LOOPS};
pub use error::{ContractError, Result};
pub use filter::filter_attributes;
pub use layout::resolve_layout;
pub use loops::{LoopClass, LoopSet};
pub use odometer::{advance_loop, loop_offset, Odometer};
pub use tensor::{decode_tags, row_major_strides, Axis, Operand, TensorDesc};

pub use tdot_gemm::{ActiveBackend, GemmBackend, GemmShape};

#[inline]
pub(crate) fn trace_enabled() -> bool {
    matches!(std::env::var("TDOT_TRACE"), Ok(ref v) if v == "1")
}

/// Contract with the active backend and default options (`U = S·T`).
pub fn contract(
    s: &TensorDesc<'_>,
    t: &TensorDesc<'_>,
    u: &TensorDesc<'_>,
    s_data: &[f32],
    t_data: &[f32],
    u_data: &mut [f32],
) -> Result<()> {
    contract_with_options(s, t, u, s_data, t_data, u_data, &ContractOptions::default())
}

/// Contract with the active backend.
#[allow(clippy::too_many_arguments)]
pub fn contract_with_options(
    s: &TensorDesc<'_>,
    t: &TensorDesc<'_>,
    u: &TensorDesc<'_>,
    s_data: &[f32],
    t_data: &[f32],
    u_data: &mut [f32],
    options: &ContractOptions,
) -> Result<()> {
    contract_with_backend(&ActiveBackend::default(), s, t, u, s_data, t_data, u_data, options)
}

/// Contract using an explicit GEMM backend.
#[allow(clippy::too_many_arguments)]
pub fn contract_with_backend<B: GemmBackend>(
    backend: &B,
    s: &TensorDesc<'_>,
    t: &TensorDesc<'_>,
    u: &TensorDesc<'_>,
    s_data: &[f32],
    t_data: &[f32],
    u_data: &mut [f32],
    options: &ContractOptions,
) -> Result<()> {
    Contraction::new(backend, s, t, u, options)?.execute(s_data, t_data, u_data)
}

/// Parallel [`contract_with_options`] over the rayon pool.
#[cfg(feature = "parallel")]
#[allow(clippy::too_many_arguments)]
pub fn par_contract(
    s: &TensorDesc<'_>,
    t: &TensorDesc<'_>,
    u: &TensorDesc<'_>,
    s_data: &[f32],
    t_data: &[f32],
    u_data: &mut [f32],
    options: &ContractOptions,
) -> Result<()> {
    Contraction::new(&ActiveBackend::default(), s, t, u, options)?.par_execute(
        s_data, t_data, u_data,
    )
}

/// Sizes of U implied by its axes: M extents are taken from S and N extents
/// from T, each in order of appearance.
pub fn output_sizes(s: &TensorDesc<'_>, t: &TensorDesc<'_>, u_axes: &[Axis]) -> Result<Vec<usize>> {
    let m_sizes = filter_attributes(Axis::M, s.axes(), s.sizes());
    let n_sizes = filter_attributes(Axis::N, t.axes(), t.sizes());

    let count = |axis: Axis| u_axes.iter().filter(|&&a| a == axis).count();
    for (class, operand, expected) in [
        (LoopClass::M, Operand::S, m_sizes.len()),
        (LoopClass::N, Operand::T, n_sizes.len()),
    ] {
        let found = count(class.axis());
        if found != expected {
            return Err(ContractError::TagCountMismatch {
                class,
                left_operand: operand,
                left: expected,
                right_operand: Operand::U,
                right: found,
            });
        }
    }

    let (mut m_iter, mut n_iter) = (m_sizes.into_iter(), n_sizes.into_iter());
    u_axes
        .iter()
        .enumerate()
        .map(|(dim, &axis)| {
            let size = match axis {
                Axis::M => m_iter.next(),
                Axis::N => n_iter.next(),
                Axis::Batch => {
                    return Err(ContractError::BatchUnsupported {
                        operand: Operand::U,
                        dim,
                    })
                }
                Axis::K => None,
            };
            size.ok_or(ContractError::ForeignAxis {
                operand: Operand::U,
                dim,
                axis,
            })
        })
        .collect()
}

/// Contract operands described by raw per-operand integer tags.
///
/// Tags are decoded with [`Axis::from_tag`]; the sizes of U are derived with
/// [`output_sizes`]. `U = S·T` with the active backend.
#[allow(clippy::too_many_arguments)]
pub fn contract_tags(
    sizes_s: &[usize],
    strides_s: &[isize],
    tags_s: &[i8],
    sizes_t: &[usize],
    strides_t: &[isize],
    tags_t: &[i8],
    strides_u: &[isize],
    tags_u: &[i8],
    s_data: &[f32],
    t_data: &[f32],
    u_data: &mut [f32],
) -> Result<()> {
    let s_axes = decode_tags(Operand::S, tags_s)?;
    let t_axes = decode_tags(Operand::T, tags_t)?;
    let u_axes = decode_tags(Operand::U, tags_u)?;

    let s = TensorDesc::new(sizes_s, strides_s, &s_axes)?;
    let t = TensorDesc::new(sizes_t, strides_t, &t_axes)?;
    let sizes_u = output_sizes(&s, &t, &u_axes)?;
    let u = TensorDesc::new(&sizes_u, strides_u, &u_axes)?;

    contract(&s, &t, &u, s_data, t_data, u_data)
}
