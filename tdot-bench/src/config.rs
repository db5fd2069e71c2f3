//! JSON batch configuration.
//!
//! A config file is an array of settings:
//!
//! ```json
//! [
//!   {
//!     "sizes_s": [17, 5, 22, 13], "types_s": [1, 0, 1, 0],
//!     "sizes_t": [17, 8, 22, 7],  "types_t": [1, 0, 1, 0],
//!     "sizes_u": [8, 5, 7, 13],   "types_u": [1, 0, 1, 0]
//!   }
//! ]
//! ```
//!
//! Types are the raw per-operand tags decoded by [`tdot_core::Axis::from_tag`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tdot_core::{decode_tags, output_sizes, row_major_strides, Axis, Operand, TensorDesc};

use crate::error::{BenchError, Result};

/// Shapes and dimension tags of one contraction setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractionConfig {
    pub sizes_s: Vec<usize>,
    pub sizes_t: Vec<usize>,
    pub sizes_u: Vec<usize>,
    pub types_s: Vec<i8>,
    pub types_t: Vec<i8>,
    pub types_u: Vec<i8>,
}

/// Decoded axes of S, T and U.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigAxes {
    pub s: Vec<Axis>,
    pub t: Vec<Axis>,
    pub u: Vec<Axis>,
}

impl ContractionConfig {
    /// Decode the tags of all three operands.
    pub fn axes(&self) -> Result<ConfigAxes> {
        Ok(ConfigAxes {
            s: decode_tags(Operand::S, &self.types_s)?,
            t: decode_tags(Operand::T, &self.types_t)?,
            u: decode_tags(Operand::U, &self.types_u)?,
        })
    }

    /// Check that the setting describes a consistent contraction.
    ///
    /// Sizes and types must have equal lengths per operand, the tags must
    /// decode, and `sizes_u` must agree with the extents implied by S and T.
    pub fn validate(&self, index: usize) -> Result<()> {
        let invalid = |reason: String| BenchError::InvalidConfig { index, reason };
        for (name, sizes, types) in [
            ("s", self.sizes_s.len(), self.types_s.len()),
            ("t", self.sizes_t.len(), self.types_t.len()),
            ("u", self.sizes_u.len(), self.types_u.len()),
        ] {
            if sizes != types {
                return Err(invalid(format!(
                    "sizes_{name} has {sizes} entries but types_{name} has {types}"
                )));
            }
        }

        let axes = self.axes().map_err(|e| invalid(e.to_string()))?;
        let (ss, ts) = (row_major_strides(&self.sizes_s), row_major_strides(&self.sizes_t));
        let s = TensorDesc::new(&self.sizes_s, &ss, &axes.s)?;
        let t = TensorDesc::new(&self.sizes_t, &ts, &axes.t)?;
        let implied = output_sizes(&s, &t, &axes.u).map_err(|e| invalid(e.to_string()))?;
        if implied != self.sizes_u {
            return Err(invalid(format!(
                "sizes_u {:?} disagree with the extents {:?} taken from S and T",
                self.sizes_u, implied
            )));
        }
        Ok(())
    }

    /// Floating point operations of one contraction: `2 * Π(sizes_s) * Π(N extents of T)`.
    pub fn flops(&self) -> u64 {
        let n: u64 = self
            .sizes_t
            .iter()
            .zip(&self.types_t)
            .filter(|(_, &tag)| tag == 0)
            .map(|(&size, _)| size as u64)
            .product();
        2 * self.sizes_s.iter().map(|&s| s as u64).product::<u64>() * n
    }

    /// Positions of the reduction dimensions in S and in T.
    pub fn reduction_dims(&self) -> (Vec<usize>, Vec<usize>) {
        (tag_positions(&self.types_s, 1), tag_positions(&self.types_t, 1))
    }

    /// Permutation bringing U into `[M dims..., N dims...]` order, the output
    /// order of a reference tensordot.
    pub fn output_permutation(&self) -> Vec<usize> {
        let mut perm = tag_positions(&self.types_u, 0);
        perm.extend(tag_positions(&self.types_u, 1));
        perm
    }
}

fn tag_positions(types: &[i8], tag: i8) -> Vec<usize> {
    types
        .iter()
        .enumerate()
        .filter(|(_, &t)| t == tag)
        .map(|(i, _)| i)
        .collect()
}

/// Read and validate a JSON config file.
pub fn parse_config(path: &Path) -> Result<Vec<ContractionConfig>> {
    let content = std::fs::read_to_string(path).map_err(|source| BenchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_str(&content)
}

/// Parse and validate a JSON config from a string.
pub fn parse_config_str(json: &str) -> Result<Vec<ContractionConfig>> {
    let configs: Vec<ContractionConfig> = serde_json::from_str(json)?;
    for (index, config) in configs.iter().enumerate() {
        config.validate(index)?;
    }
    Ok(configs)
}
