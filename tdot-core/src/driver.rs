//! Contraction driver: one dispatched GEMM kernel invoked over the M, N and K
//! loop nests.

use tdot_gemm::{Accum, GemmBackend, GemmKernel, GemmShape};

use crate::layout::resolve_layout;
use crate::loops::{LoopClass, LoopSet};
use crate::odometer::Odometer;
use crate::tensor::{Operand, TensorDesc};
use crate::{trace_enabled, ContractError, Result};

/// Default bound on the number of dimensions per loop class.
pub const DEFAULT_MAX_LOOPS: usize = 25;

/// How the contraction treats the prior contents of U.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputMode {
    /// `U = S·T`: the first K block of every output block replaces U.
    #[default]
    Overwrite,
    /// `U += S·T`: every kernel call accumulates.
    Accumulate,
}

/// Tunables for building a [`Contraction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractOptions {
    /// Maximum number of dimensions of one class (M, N or K).
    pub max_loops: usize,
    pub output: OutputMode,
}

impl Default for ContractOptions {
    fn default() -> Self {
        Self {
            max_loops: DEFAULT_MAX_LOOPS,
            output: OutputMode::Overwrite,
        }
    }
}

impl ContractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_loops(mut self, max_loops: usize) -> Self {
        self.max_loops = max_loops;
        self
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }
}

/// A planned contraction `U = contract(S, T)`.
///
/// Construction validates the three layouts, resolves the GEMM block and
/// dispatches exactly one kernel. The plan can be executed any number of
/// times on buffers matching the layouts.
#[derive(Debug)]
pub struct Contraction<K> {
    kernel: K,
    shape: GemmShape,
    m_loops: LoopSet,
    n_loops: LoopSet,
    k_loops: LoopSet,
    spans: [usize; 3],
    output: OutputMode,
}

impl<K: GemmKernel> Contraction<K> {
    /// Plan the contraction of `s` and `t` into `u`.
    ///
    /// Fails before any buffer is touched if a tag, extent, stride or layout
    /// precondition does not hold.
    pub fn new<B>(
        backend: &B,
        s: &TensorDesc<'_>,
        t: &TensorDesc<'_>,
        u: &TensorDesc<'_>,
        options: &ContractOptions,
    ) -> Result<Self>
    where
        B: GemmBackend<Kernel = K>,
    {
        s.validate(Operand::S)?;
        t.validate(Operand::T)?;
        u.validate(Operand::U)?;
        let spans = [
            checked_span(s, Operand::S)?,
            checked_span(t, Operand::T)?,
            checked_span(u, Operand::U)?,
        ];

        let shape = resolve_layout(s, t, u)?;

        let m_loops = LoopSet::build(LoopClass::M, s, u, options.max_loops)?;
        let n_loops = LoopSet::build(LoopClass::N, t, u, options.max_loops)?;
        let k_loops = LoopSet::build(LoopClass::K, s, t, options.max_loops)?;

        if !u.is_non_overlapping() {
            return Err(ContractError::OverlappingOutput);
        }

        let kernel = backend.dispatch(&shape)?;

        let plan = Self {
            kernel,
            shape,
            m_loops,
            n_loops,
            k_loops,
            spans,
            output: options.output,
        };
        if trace_enabled() {
            eprintln!(
                "tdot: gemm {} | loops M={:?} N={:?} K={:?} | kernel calls={} | {:?}",
                plan.shape,
                plan.m_loops.outer_sizes(),
                plan.n_loops.outer_sizes(),
                plan.k_loops.outer_sizes(),
                plan.kernel_calls(),
                plan.output,
            );
        }
        Ok(plan)
    }

    pub fn shape(&self) -> &GemmShape {
        &self.shape
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn m_loops(&self) -> &LoopSet {
        &self.m_loops
    }

    pub fn n_loops(&self) -> &LoopSet {
        &self.n_loops
    }

    pub fn k_loops(&self) -> &LoopSet {
        &self.k_loops
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output
    }

    /// Number of `(M, N)` output blocks.
    pub fn output_blocks(&self) -> usize {
        self.m_loops.iterations() * self.n_loops.iterations()
    }

    /// Number of kernel invocations per execution.
    pub fn kernel_calls(&self) -> usize {
        self.output_blocks() * self.k_loops.iterations()
    }

    /// Floating point operations per execution.
    pub fn flops(&self) -> u64 {
        self.shape.flops() * self.kernel_calls() as u64
    }

    /// Minimum buffer lengths of S, T and U.
    pub fn required_lengths(&self) -> [usize; 3] {
        self.spans
    }

    fn check_buffers(&self, s: usize, t: usize, u: usize) -> Result<()> {
        for ((operand, actual), required) in [(Operand::S, s), (Operand::T, t), (Operand::U, u)]
            .into_iter()
            .zip(self.spans)
        {
            if actual < required {
                return Err(ContractError::BufferTooSmall {
                    operand,
                    required,
                    actual,
                });
            }
        }
        Ok(())
    }

    fn first_accum(&self) -> Accum {
        match self.output {
            OutputMode::Overwrite => Accum::Replace,
            OutputMode::Accumulate => Accum::Add,
        }
    }

    /// Offsets of the `(M, N)` block into S, T and U.
    fn block_offsets(&self, m_odo: &Odometer, n_odo: &Odometer) -> (isize, isize, isize) {
        let s = m_odo.offset(self.m_loops.strides_a());
        let t = n_odo.offset(self.n_loops.strides_a());
        let u = m_odo.offset(self.m_loops.strides_b()) + n_odo.offset(self.n_loops.strides_b());
        (s, t, u)
    }

    /// Run the K nest for one output block.
    ///
    /// # Safety
    /// The pointers must address the block origin inside buffers that cover
    /// the planned spans, and no other thread may write the same U block.
    unsafe fn run_block(&self, s: *const f32, t: *const f32, u: *mut f32) {
        let mut k_odo = Odometer::new(self.k_loops.outer_sizes());
        let mut accum = self.first_accum();
        loop {
            let a = s.offset(k_odo.offset(self.k_loops.strides_a()));
            let b = t.offset(k_odo.offset(self.k_loops.strides_b()));
            self.kernel.execute(a, b, u, accum);
            accum = Accum::Add;
            if k_odo.advance() {
                break;
            }
        }
    }

    /// Contract `s` and `t` into `u`.
    ///
    /// The M nest is outermost, N in the middle and K innermost.
    pub fn execute(&self, s: &[f32], t: &[f32], u: &mut [f32]) -> Result<()> {
        self.check_buffers(s.len(), t.len(), u.len())?;
        let (s_ptr, t_ptr, u_ptr) = (s.as_ptr(), t.as_ptr(), u.as_mut_ptr());

        let mut m_odo = Odometer::new(self.m_loops.outer_sizes());
        loop {
            let mut n_odo = Odometer::new(self.n_loops.outer_sizes());
            loop {
                let (s_off, t_off, u_off) = self.block_offsets(&m_odo, &n_odo);
                // SAFETY: offsets stay within the spans checked above.
                unsafe {
                    self.run_block(s_ptr.offset(s_off), t_ptr.offset(t_off), u_ptr.offset(u_off));
                }
                if n_odo.advance() {
                    break;
                }
            }
            if m_odo.advance() {
                break;
            }
        }
        Ok(())
    }

    /// Parallel [`Contraction::execute`]: output blocks are distributed over
    /// the rayon pool, each running its full K nest.
    ///
    /// Every block performs the same kernel calls in the same order as the
    /// sequential path, so results are identical.
    #[cfg(feature = "parallel")]
    pub fn par_execute(&self, s: &[f32], t: &[f32], u: &mut [f32]) -> Result<()> {
        use rayon::prelude::*;

        self.check_buffers(s.len(), t.len(), u.len())?;
        let s_ptr = SendPtr(s.as_ptr() as *mut f32);
        let t_ptr = SendPtr(t.as_ptr() as *mut f32);
        let u_ptr = SendPtr(u.as_mut_ptr());
        let n_blocks = self.n_loops.iterations();

        (0..self.output_blocks()).into_par_iter().for_each(|block| {
            let m_odo = Odometer::from_linear(self.m_loops.outer_sizes(), block / n_blocks);
            let n_odo = Odometer::from_linear(self.n_loops.outer_sizes(), block % n_blocks);
            let (s_off, t_off, u_off) = self.block_offsets(&m_odo, &n_odo);
            // SAFETY: U does not self-overlap, so distinct (M, N) blocks write
            // disjoint elements.
            unsafe {
                self.run_block(
                    s_ptr.as_const().offset(s_off),
                    t_ptr.as_const().offset(t_off),
                    u_ptr.as_ptr().offset(u_off),
                );
            }
        });
        Ok(())
    }
}

fn checked_span(desc: &TensorDesc<'_>, operand: Operand) -> Result<usize> {
    desc.span().ok_or(ContractError::LayoutOverflow { operand })
}

/// A raw pointer wrapper that is `Send` + `Sync`.
///
/// # Safety
/// Threads sharing it must write disjoint regions.
#[cfg(feature = "parallel")]
struct SendPtr<T>(*mut T);

#[cfg(feature = "parallel")]
impl<T> Clone for SendPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

#[cfg(feature = "parallel")]
impl<T> Copy for SendPtr<T> {}

#[cfg(feature = "parallel")]
unsafe impl<T> Send for SendPtr<T> {}
#[cfg(feature = "parallel")]
unsafe impl<T> Sync for SendPtr<T> {}

#[cfg(feature = "parallel")]
impl<T> SendPtr<T> {
    fn as_ptr(self) -> *mut T {
        self.0
    }

    fn as_const(self) -> *const T {
        self.0 as *const T
    }
}
