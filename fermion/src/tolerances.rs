// SPDX-License-Identifier: AGPL-3.0-only

//! Centralized validation tolerances with numerical justification.
//!
//! Every threshold used by the validation binary and the integration tests
//! is defined here with its origin. No ad-hoc magic numbers.
//!
//! | Category | Basis | Example |
//! |----------|-------|---------|
//! | Machine precision | IEEE 754 f64, O(V·Ls) summation | adjointness |
//! | Algebraic recipe | closed form vs recursion | β, Schur complement |
//! | Finite difference | O(ε²) truncation | force check |

// ═══════════════════════════════════════════════════════════════════
// Operator identities
// ═══════════════════════════════════════════════════════════════════

/// `<M† x, y> − <x, M y>` relative to `|<x, M y>|`.
///
/// Both sides sum O(V·Ls·12) products of O(1) numbers; on a 4⁴×9 lattice
/// rounding accumulates to ~1e-13 relative. 1e-10 leaves headroom for
/// hot configurations without masking a wrong sign (which gives O(1)).
pub const ADJOINT_REL: f64 = 1e-10;

/// `|M ψ − (Mooee − Meooe) ψ|² / |ψ|²` after checkerboard reassembly.
///
/// Same arithmetic in a different order; differences are pure rounding.
pub const CHECKERBOARD_REL: f64 = 1e-24;

/// `|Mooee MooeeInv ψ − ψ|² / |ψ|²`.
///
/// The flavour sweep divides by `See` pivots; for Ls ≤ 17 and M5 ∈ (0, 2)
/// the pivots stay O(1) so the squared residual sits near 1e-30.
pub const MOOEE_INVERSE_REL: f64 = 1e-22;

/// `|Σ Mdir ψ − (M − Mooee) ψ|² / |ψ|²`.
pub const DIRECTION_SUM_REL: f64 = 1e-24;

// ═══════════════════════════════════════════════════════════════════
// Coefficients
// ═══════════════════════════════════════════════════════════════════

/// Closed-form tanh β against the Euclid conversion of its partial fractions.
///
/// Euclid subtracts polynomials of growing degree; for Ls ≤ 15 the
/// cancellation costs at most ~6 digits.
pub const BETA_EUCLID_REL: f64 = 1e-9;

/// Continued fraction `ε(x)` against `tanh(Ls·artanh x)`.
pub const CONTINUED_FRACTION_REL: f64 = 1e-12;

/// Schur complement of the flavour block against `R + ε(x)`.
pub const SCHUR_COMPLEMENT_REL: f64 = 1e-10;

// ═══════════════════════════════════════════════════════════════════
// Forces
// ═══════════════════════════════════════════════════════════════════

/// Step size of the central finite difference used to check `MDeriv`.
///
/// The bilinear is affine in `ε` under `U → (1 + εX) U`, so the central
/// difference has no truncation error and a large step keeps the rounding
/// of the O(V·Ls) sum well below the single-link signal.
pub const FORCE_FD_STEP: f64 = 0.1;

/// Finite-difference force against `Tr[X F]`, relative.
///
/// Rounding of `<u, M v>` is ~1e-13 absolute on small lattices; divided
/// by `2ε` and compared with an O(1) trace this sits near 1e-12.
pub const FORCE_FD_REL: f64 = 1e-8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerances_are_ordered() {
        assert!(CHECKERBOARD_REL < MOOEE_INVERSE_REL);
        assert!(CONTINUED_FRACTION_REL < BETA_EUCLID_REL);
        assert!(FORCE_FD_STEP > 0.0 && FORCE_FD_STEP < 1.0);
        assert!(FORCE_FD_REL < ADJOINT_REL.sqrt());
    }
}
