//! Dimension classifier.

use crate::tensor::Axis;

/// Attributes of every dimension tagged `filter`, in original order.
///
/// `types` and `attributes` are parallel arrays (one entry per dimension);
/// `attributes` is either the sizes or the strides of the operand. The
/// number of copied attributes is the length of the result. Calls with the
/// same `filter` and `types` select the same positions, so sizes and strides
/// extracted separately stay aligned.
pub fn filter_attributes<A: Copy>(filter: Axis, types: &[Axis], attributes: &[A]) -> Vec<A> {
    debug_assert_eq!(types.len(), attributes.len());
    types
        .iter()
        .zip(attributes)
        .filter(|(&axis, _)| axis == filter)
        .map(|(_, &attr)| attr)
        .collect()
}
