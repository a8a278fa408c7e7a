// SPDX-License-Identifier: AGPL-3.0-only

//! Lattice Dirac operators.
//!
//! Every discretisation exposes the same capability set through
//! [`FermionOperator`]: the full operator and its adjoint, the red-black
//! pieces used for Schur-complement solves (`Mooee`, `Meooe`, `MooeeInv` and
//! adjoints), direction-resolved hops for coarsening, and gauge-force
//! derivatives. `Mooee` is site-local (block diagonal per checkerboard) and
//! `Meooe` maps one checkerboard to the other. The 5D operators split as
//!
//!   M = Mooee − Meooe
//!
//! while the staggered operator, whose hop enters with a plus sign, splits as
//! `M = Mooee + Meooe`.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `params` | Boundary phases and twists |
//! | `double_store` | Forward/backward link caches (Wilson, staggered, Naik) |
//! | `stencil` | Neighbour tables and the Wilson/staggered hopping kernels |
//! | `approx` | Rational approximations and continued-fraction coefficients |
//! | `wilson5d` | Five-dimensional Wilson kernel |
//! | `continued_fraction` | Continued-fraction overlap operator (tanh, Zolotarev) |
//! | `staggered` | Improved staggered operator (fat + Naik links) |
//!
//! # References
//!
//! - Neuberger, PRL 81, 4060 (1998) (overlap operator)
//! - Borici, Edwards & Kennedy, hep-lat/0405002 (continued-fraction 5D forms)

use crate::error::{FermionError, Result};
use crate::lattice::constants::N_DIM;
use crate::lattice::field::{Lattice, SiteObject};
use crate::lattice::gauge::GaugeField;

/// Rational approximations and continued-fraction coefficients.
pub mod approx;
/// Continued-fraction 5D overlap operator.
pub mod continued_fraction;
/// Gauge double-store for Wilson and staggered fermions.
pub mod double_store;
/// Boundary phases and twists.
pub mod params;
/// Improved staggered Dirac operator.
pub mod staggered;
/// Neighbour tables and hopping kernels.
pub mod stencil;
/// Five-dimensional Wilson operator.
pub mod wilson5d;

pub use approx::{
    ApproximationConfig, ContinuedFractionCoefficients, ContinuedFractionParams,
    ContinuedFractionScheme, PartialFractionPole, RationalApproximation, TanhScheme,
    ZolotarevScheme,
};
pub use continued_fraction::{ContinuedFractionFermion5D, TanhFermion5D, ZolotarevFermion5D};
pub use double_store::{staggered_phase, FermionImpl, StaggeredImpl, WilsonImpl};
pub use params::ImplParams;
pub use staggered::{ImprovedStaggeredFermion, StaggeredLinks};
pub use stencil::{HopTerms, Stencil};
pub use wilson5d::WilsonFermion5D;

/// Apply an operator or its Hermitian adjoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dagger {
    No,
    Yes,
}

impl Dagger {
    /// `+1` for the operator, `−1` for its adjoint (sign of γμ in the hop projector).
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::No => 1.0,
            Self::Yes => -1.0,
        }
    }
}

/// Index of a direction-resolved hop in [`FermionOperator::mdir_all`]:
/// forward hops `0..4`, backward hops `4..8`.
pub fn direction_index(mu: usize, disp: isize) -> Result<usize> {
    match (mu < N_DIM, disp) {
        (true, 1) => Ok(mu),
        (true, -1) => Ok(mu + N_DIM),
        _ => Err(FermionError::InvalidDirection { mu, disp }),
    }
}

/// Capability set of a lattice Dirac operator.
///
/// Full-lattice methods (`m`, `mdag`, `mdir`, `mderiv`) take fields on the
/// full grid; the checkerboard methods take half-checkerboard fields, with
/// `meooe` mapping parity `p` to `p.opposite()` and the `mooee` family
/// preserving parity (they also accept full fields).
pub trait FermionOperator: Send + Sync {
    /// Per-site fermion object.
    type Site: SiteObject;

    fn m(&self, psi: &Lattice<Self::Site>) -> Result<Lattice<Self::Site>>;
    fn mdag(&self, psi: &Lattice<Self::Site>) -> Result<Lattice<Self::Site>>;

    fn meooe(&self, psi: &Lattice<Self::Site>) -> Result<Lattice<Self::Site>>;
    fn meooe_dag(&self, psi: &Lattice<Self::Site>) -> Result<Lattice<Self::Site>>;

    fn mooee(&self, psi: &Lattice<Self::Site>) -> Result<Lattice<Self::Site>>;
    fn mooee_dag(&self, psi: &Lattice<Self::Site>) -> Result<Lattice<Self::Site>>;
    fn mooee_inv(&self, psi: &Lattice<Self::Site>) -> Result<Lattice<Self::Site>>;
    fn mooee_inv_dag(&self, psi: &Lattice<Self::Site>) -> Result<Lattice<Self::Site>>;

    /// Single hopping term of `M` along `mu` with displacement `disp = ±1`.
    /// Summed over all eight, these give `M − Mooee`.
    fn mdir(&self, psi: &Lattice<Self::Site>, mu: usize, disp: isize) -> Result<Lattice<Self::Site>>;

    /// All eight direction-resolved hops, ordered by [`direction_index`].
    fn mdir_all(&self, psi: &Lattice<Self::Site>) -> Result<Vec<Lattice<Self::Site>>> {
        let mut out = Vec::with_capacity(2 * N_DIM);
        for disp in [1, -1] {
            for mu in 0..N_DIM {
                out.push(self.mdir(psi, mu, disp)?);
            }
        }
        Ok(out)
    }

    /// Force `F_μ(x)` with `δ(u† M v) = Σ Tr[X_μ(x) F_μ(x)]` under the forward-link
    /// perturbation `U_μ(x) → (1 + X_μ(x)) U_μ(x)` (`M†` when `dag` is `Yes`).
    fn mderiv(&self, u: &Lattice<Self::Site>, v: &Lattice<Self::Site>, dag: Dagger) -> Result<GaugeField>;

    /// [`mderiv`](Self::mderiv) restricted to `u` on even and `v` on odd sites.
    fn meo_deriv(&self, u: &Lattice<Self::Site>, v: &Lattice<Self::Site>, dag: Dagger) -> Result<GaugeField>;

    /// [`mderiv`](Self::mderiv) restricted to `u` on odd and `v` on even sites.
    fn moe_deriv(&self, u: &Lattice<Self::Site>, v: &Lattice<Self::Site>, dag: Dagger) -> Result<GaugeField>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dagger_sign() {
        assert_eq!(Dagger::No.sign(), 1.0);
        assert_eq!(Dagger::Yes.sign(), -1.0);
    }

    #[test]
    fn direction_index_layout() {
        assert_eq!(direction_index(0, 1).unwrap(), 0);
        assert_eq!(direction_index(3, 1).unwrap(), 3);
        assert_eq!(direction_index(0, -1).unwrap(), 4);
        assert_eq!(direction_index(3, -1).unwrap(), 7);
        assert!(direction_index(4, 1).is_err());
        assert!(direction_index(1, 2).is_err());
        assert!(direction_index(1, 0).is_err());
    }
}
