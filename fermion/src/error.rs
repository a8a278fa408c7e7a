// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for lattice Dirac operators.
//!
//! Every public operator entry point validates its inputs before touching
//! field data, so callers can pattern-match on the failed check (layout,
//! configuration, unsupported direction) instead of parsing strings.

use thiserror::Error;

/// Errors raised by grid construction, coefficient generation and
/// operator application.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FermionError {
    /// Two fields or grids combined in one operation have incompatible layouts.
    #[error("shape mismatch in {operation}: expected {expected}, found {found}")]
    ShapeMismatch {
        operation: &'static str,
        expected: String,
        found: String,
    },

    /// Approximation order (number of flavour slices) is not usable.
    #[error("invalid approximation order {order}: {reason}")]
    InvalidOrder { order: usize, reason: &'static str },

    /// A scale or spectral bound that must be strictly positive is not.
    #[error("invalid scale {name} = {value}: must be strictly positive")]
    InvalidScale { name: &'static str, value: f64 },

    /// Any other configuration value outside its domain.
    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// Direction index or displacement not in `0..N_DIM` × `{+1, -1}`.
    #[error("invalid hopping direction mu={mu}, disp={disp}")]
    InvalidDirection { mu: usize, disp: isize },

    /// The discretisation has no meaning for the requested operation.
    #[error("unsupported operation: {operation}")]
    UnsupportedOperation { operation: &'static str },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FermionError>;
