// SPDX-License-Identifier: AGPL-3.0-only

//! Lattice layer consumed by the Dirac operators.
//!
//! Single-process fields on a periodic 4D grid, optionally extended by a
//! fifth (flavour) dimension. The operators only need a narrow interface
//! from here: site-parallel linear algebra, checkerboard pick/set, shifts
//! with a boundary rule, and coordinate queries.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `constants` | Color/spin/dimension counts, LCG PRNG, numerical guards |
//! | `su3` | SU(3) 3×3 complex matrices and matrix×vector products |
//! | `spin` | Gamma matrices, Wilson spinors, half-spinor projection |
//! | `grid` | Cartesian grid, red-black checkerboards, field layouts |
//! | `field` | Generic `Lattice<T>` container |
//! | `gauge` | Gauge fields, link fields, doubled gauge fields |
//!
//! # References
//!
//! - Gattringer & Lang, "Quantum Chromodynamics on the Lattice" (2010)
//! - DeGrand & DeTar, "Lattice Methods for Quantum Chromodynamics" (2006)

/// LCG PRNG, lattice constants, and shared numerical guards.
pub mod constants;
/// Generic lattice field container.
pub mod field;
/// Gauge fields and their doubled (forward + backward) forms.
pub mod gauge;
/// 4D grid geometry, parity and checkerboard layouts.
pub mod grid;
/// Euclidean gamma matrices and spinor types.
pub mod spin;
/// SU(3) 3x3 complex matrix operations.
pub mod su3;

pub use field::{Lattice, SiteObject};
pub use gauge::{cov_shift_forward, DoubledGaugeField, GaugeField, GaugeLinkField};
pub use grid::{Checkerboard, FieldLayout, Grid4, Parity};
pub use spin::{ColorVector, HalfSpinor, WilsonSpinor};
pub use su3::Su3Matrix;
