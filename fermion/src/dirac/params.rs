// SPDX-License-Identifier: AGPL-3.0-only

//! Boundary conditions shared by every discretisation.
//!
//! A link crossing the global boundary along μ picks up the complex factor
//! `boundary_phases[μ] · exp(iθ_μ)` with `θ_μ = twist_n_2pi_l[μ] · 2π / L_μ`,
//! i.e. a twist of `twist_n_2pi_l[μ]` units of `2π/L_μ`. Forward links take
//! the factor on the last site of the axis, backward links its conjugate on
//! the first site. The rule ignores the hop length, so Naik links starting
//! one or two sites short of the edge carry no factor.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{FermionError, Result};
use crate::lattice::constants::{C_ONE, N_DIM};

/// Boundary phases and twists per direction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImplParams {
    /// Complex factor for links crossing the boundary, per direction.
    pub boundary_phases: [Complex64; N_DIM],
    /// Twist in units of `2π/L_μ`; zero means untwisted.
    pub twist_n_2pi_l: [f64; N_DIM],
}

impl Default for ImplParams {
    fn default() -> Self {
        Self::periodic()
    }
}

impl ImplParams {
    /// Periodic in every direction, no twist.
    #[must_use]
    pub fn periodic() -> Self {
        Self {
            boundary_phases: [C_ONE; N_DIM],
            twist_n_2pi_l: [0.0; N_DIM],
        }
    }

    /// Antiperiodic in time, periodic in space.
    #[must_use]
    pub fn antiperiodic_time() -> Self {
        let mut p = Self::periodic();
        p.boundary_phases[N_DIM - 1] = -C_ONE;
        p
    }

    /// Reject non-finite phases or twists.
    pub fn validate(&self) -> Result<()> {
        for (mu, (phase, twist)) in self
            .boundary_phases
            .iter()
            .zip(self.twist_n_2pi_l.iter())
            .enumerate()
        {
            if !phase.is_finite() {
                return Err(FermionError::InvalidParameter {
                    name: "boundary_phases",
                    value: mu as f64,
                    reason: "boundary phase must be finite",
                });
            }
            if !twist.is_finite() {
                return Err(FermionError::InvalidParameter {
                    name: "twist_n_2pi_l",
                    value: *twist,
                    reason: "twist must be finite",
                });
            }
        }
        Ok(())
    }

    /// Boundary factor along `mu` on an axis of extent `extent`, twist included.
    #[must_use]
    pub fn boundary_phase(&self, mu: usize, extent: usize) -> Complex64 {
        let mut phase = self.boundary_phases[mu];
        let twist = self.twist_n_2pi_l[mu];
        let theta = twist * 2.0 * std::f64::consts::PI / extent as f64;
        if theta != 0.0 {
            phase *= Complex64::cis(theta);
        }
        phase
    }

    /// Directions with a non-zero twist, with the twist in units of `2π/L_μ`.
    pub fn twisted(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.twist_n_2pi_l
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, t)| t != 0.0)
    }

    /// Report the boundary conditions once, when a discretisation adopts them.
    pub fn log(&self) {
        for (mu, twist) in self.twisted() {
            let b = self.boundary_phases[mu];
            info!(mu, twist, re = b.re, im = b.im, "boundary twist");
        }
    }
}

/// Factor for a forward link starting at coordinate `coor`.
#[must_use]
pub fn forward_boundary_factor(bphase: Complex64, coor: usize, extent: usize) -> Complex64 {
    if coor + 1 == extent {
        bphase
    } else {
        C_ONE
    }
}

/// Factor for a backward link ending at coordinate `coor`.
#[must_use]
pub fn backward_boundary_factor(bphase: Complex64, coor: usize) -> Complex64 {
    if coor == 0 {
        bphase.conj()
    } else {
        C_ONE
    }
}
