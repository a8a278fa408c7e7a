// SPDX-License-Identifier: AGPL-3.0-only

//! hotSpring fermion — lattice Dirac operators.
//!
//! Continued-fraction 5D overlap operators (tanh and Zolotarev), the
//! s-diagonal 5D Wilson kernel they are built on, and the improved
//! (fat + Naik) staggered operator, all behind one capability trait,
//! [`dirac::FermionOperator`].
//!
//! ## Modules
//!   - `lattice` — grid, checkerboards, fields, SU(3) links, spinors
//!   - `dirac` — double-store, stencil, coefficients, operators
//!   - `error` — typed failures of every public entry point
//!   - `tolerances` — named validation thresholds
//!   - `validation` — pass/fail harness for the validation binary
//!
//! ## Validation binaries
//!   - `validate_continued_fraction` — adjointness, checkerboard, inverse
//!     and coefficient identities on a hot lattice
//!
//! Diagnostics go through `tracing` at configuration time (operator
//! construction, coefficient tables, boundary twists, gauge import); the
//! operator kernels themselves never log.

pub mod dirac;
pub mod error;
pub mod lattice;
pub mod tolerances;
pub mod validation;

pub use dirac::{
    ContinuedFractionFermion5D, Dagger, FermionOperator, ImplParams, ImprovedStaggeredFermion, StaggeredLinks,
    TanhFermion5D, WilsonFermion5D, ZolotarevFermion5D,
};
pub use error::{FermionError, Result};
pub use lattice::{FieldLayout, GaugeField, Grid4, Lattice, Parity};
