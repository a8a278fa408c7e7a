// SPDX-License-Identifier: AGPL-3.0-only

//! Five-dimensional Wilson operator, s-diagonal.
//!
//! Every flavour slice sees the same 4D Wilson matrix with negative mass
//! `−M5`:
//!
//!   Dw = (4 − M5) − K,
//!
//! where `K` is the hopping term of [`stencil::wilson_dhop`]. Domain-wall
//! and continued-fraction operators are built on this kernel; its own
//! [`FermionOperator`] implementation is the plain slice-wise `Dw`.
//!
//! [`stencil::wilson_dhop`]: super::stencil::wilson_dhop

use num_complex::Complex64;
use tracing::{debug, info};

use super::double_store::{FermionImpl, WilsonImpl};
use super::params::ImplParams;
use super::stencil::{wilson_dhop, HopTerms, Stencil};
use super::{direction_index, Dagger, FermionOperator};
use crate::error::{FermionError, Result};
use crate::lattice::constants::{C_ONE, N_DIM};
use crate::lattice::field::Lattice;
use crate::lattice::gauge::{DoubledGaugeField, GaugeField};
use crate::lattice::grid::{FieldLayout, Grid4, Parity};
use crate::lattice::spin::WilsonSpinor;

/// Wilson kernel on `Ls` flavour slices.
#[derive(Clone, Debug)]
pub struct WilsonFermion5D {
    imp: WilsonImpl,
    stencil: Stencil,
    umu: DoubledGaugeField,
    ls: usize,
    m5: f64,
}

impl WilsonFermion5D {
    /// Build the kernel for gauge field `u` (its grid fixes the 4D lattice).
    pub fn new(u: &GaugeField, ls: usize, m5: f64, params: ImplParams) -> Result<Self> {
        if ls == 0 {
            return Err(FermionError::InvalidOrder {
                order: ls,
                reason: "at least one flavour slice is required",
            });
        }
        if !m5.is_finite() {
            return Err(FermionError::InvalidParameter {
                name: "M5",
                value: m5,
                reason: "must be finite",
            });
        }
        u.layout().require_full("WilsonFermion5D::new")?;
        let grid = *u.grid();
        let imp = WilsonImpl::new(params)?;
        let umu = imp.double_store(&grid, u)?;
        info!(dims = ?grid.dims(), ls, m5, "Wilson 5D kernel ready");
        Ok(Self {
            imp,
            stencil: Stencil::new(grid, 1),
            umu,
            ls,
            m5,
        })
    }

    /// Rebuild the doubled links from a new configuration on the same grid.
    pub fn import_gauge(&mut self, u: &GaugeField) -> Result<()> {
        self.umu = self.imp.double_store(self.stencil.grid(), u)?;
        debug!("Wilson 5D kernel gauge field imported");
        Ok(())
    }

    #[must_use]
    pub fn grid(&self) -> &Grid4 {
        self.stencil.grid()
    }

    #[must_use]
    pub fn ls(&self) -> usize {
        self.ls
    }

    #[must_use]
    pub fn m5(&self) -> f64 {
        self.m5
    }

    #[must_use]
    pub fn impl_params(&self) -> &ImplParams {
        self.imp.params()
    }

    #[must_use]
    pub fn doubled_gauge(&self) -> &DoubledGaugeField {
        &self.umu
    }

    /// Layout of a full 5D fermion field.
    #[must_use]
    pub fn full_layout(&self) -> FieldLayout {
        FieldLayout::full(*self.grid(), self.ls)
    }

    /// Layout of a 5D fermion field on one 4D checkerboard.
    #[must_use]
    pub fn half_layout(&self, parity: Parity) -> FieldLayout {
        FieldLayout::half(*self.grid(), self.ls, parity)
    }

    /// Fail unless `psi` is a 5D field of this operator, on any checkerboard.
    pub fn check_fermion(&self, psi: &Lattice<WilsonSpinor>, operation: &'static str) -> Result<()> {
        let layout = psi.layout();
        let expected = self.full_layout().with_checkerboard(layout.checkerboard);
        expected.conformable(layout, operation)
    }

    fn check_full(&self, psi: &Lattice<WilsonSpinor>, operation: &'static str) -> Result<()> {
        self.full_layout().conformable(psi.layout(), operation)
    }

    fn check_half(&self, psi: &Lattice<WilsonSpinor>, operation: &'static str) -> Result<Parity> {
        let parity = psi.layout().require_half(operation)?;
        self.half_layout(parity).conformable(psi.layout(), operation)?;
        Ok(parity)
    }

    /// Hopping term `K` (`K†` for `Dagger::Yes`); full field or one checkerboard.
    pub fn dhop(&self, psi: &Lattice<WilsonSpinor>, dag: Dagger) -> Result<Lattice<WilsonSpinor>> {
        self.check_fermion(psi, "WilsonFermion5D::dhop")?;
        wilson_dhop(&self.stencil, &self.umu, psi, dag, HopTerms::All)
    }

    /// Single slot of the hopping term.
    pub fn dhop_dir(
        &self,
        psi: &Lattice<WilsonSpinor>,
        mu: usize,
        disp: isize,
        dag: Dagger,
    ) -> Result<Lattice<WilsonSpinor>> {
        direction_index(mu, disp)?;
        self.check_fermion(psi, "WilsonFermion5D::dhop_dir")?;
        wilson_dhop(&self.stencil, &self.umu, psi, dag, HopTerms::Direction { mu, disp })
    }

    /// `Dw ψ = (4 − M5) ψ − K ψ` on a full field (`Dw†` for `Dagger::Yes`).
    pub fn dw(&self, psi: &Lattice<WilsonSpinor>, dag: Dagger) -> Result<Lattice<WilsonSpinor>> {
        self.check_full(psi, "WilsonFermion5D::dw")?;
        let mut out = psi.scale(self.diagonal());
        out.axpy(-C_ONE, &self.dhop(psi, dag)?)?;
        Ok(out)
    }

    fn diagonal(&self) -> Complex64 {
        Complex64::new(4.0 - self.m5, 0.0)
    }

    /// Force of the bilinear `a† K b` (`a† K† b` for `Dagger::Yes`):
    /// `F_μ(x) = Σ_{s,spin} (K_{μ,+} b)(x,s) ⊗ a(x,s)†`.
    ///
    /// `a` and `b` are both full, or on opposite checkerboards; the result is
    /// zero on sites `a` does not hold.
    pub fn dhop_deriv(
        &self,
        a: &Lattice<WilsonSpinor>,
        b: &Lattice<WilsonSpinor>,
        dag: Dagger,
    ) -> Result<GaugeField> {
        self.check_fermion(a, "WilsonFermion5D::dhop_deriv")?;
        self.check_fermion(b, "WilsonFermion5D::dhop_deriv")?;
        let target = self.stencil.output_layout(b.layout());
        target.conformable(a.layout(), "WilsonFermion5D::dhop_deriv")?;

        let mut mat = GaugeField::zeros(FieldLayout::full(*self.grid(), 1));
        for mu in 0..N_DIM {
            let btilde = wilson_dhop(&self.stencil, &self.umu, b, dag, HopTerms::Direction { mu, disp: 1 })?;
            self.imp.insert_force_5d(&mut mat, &btilde, a, mu)?;
        }
        Ok(mat)
    }

    fn deriv_on(
        &self,
        u: &Lattice<WilsonSpinor>,
        v: &Lattice<WilsonSpinor>,
        dag: Dagger,
        parities: (Parity, Parity),
        operation: &'static str,
    ) -> Result<GaugeField> {
        self.half_layout(parities.0).conformable(u.layout(), operation)?;
        self.half_layout(parities.1).conformable(v.layout(), operation)?;
        Ok(self.dhop_deriv(u, v, dag)?.scale(-C_ONE))
    }
}

impl FermionOperator for WilsonFermion5D {
    type Site = WilsonSpinor;

    fn m(&self, psi: &Lattice<WilsonSpinor>) -> Result<Lattice<WilsonSpinor>> {
        self.dw(psi, Dagger::No)
    }

    fn mdag(&self, psi: &Lattice<WilsonSpinor>) -> Result<Lattice<WilsonSpinor>> {
        self.dw(psi, Dagger::Yes)
    }

    fn meooe(&self, psi: &Lattice<WilsonSpinor>) -> Result<Lattice<WilsonSpinor>> {
        self.check_half(psi, "WilsonFermion5D::meooe")?;
        self.dhop(psi, Dagger::No)
    }

    fn meooe_dag(&self, psi: &Lattice<WilsonSpinor>) -> Result<Lattice<WilsonSpinor>> {
        self.check_half(psi, "WilsonFermion5D::meooe_dag")?;
        self.dhop(psi, Dagger::Yes)
    }

    fn mooee(&self, psi: &Lattice<WilsonSpinor>) -> Result<Lattice<WilsonSpinor>> {
        self.check_fermion(psi, "WilsonFermion5D::mooee")?;
        Ok(psi.scale(self.diagonal()))
    }

    fn mooee_dag(&self, psi: &Lattice<WilsonSpinor>) -> Result<Lattice<WilsonSpinor>> {
        self.mooee(psi)
    }

    fn mooee_inv(&self, psi: &Lattice<WilsonSpinor>) -> Result<Lattice<WilsonSpinor>> {
        self.check_fermion(psi, "WilsonFermion5D::mooee_inv")?;
        let d = 4.0 - self.m5;
        if d == 0.0 {
            return Err(FermionError::InvalidParameter {
                name: "M5",
                value: self.m5,
                reason: "site-diagonal term 4 − M5 vanishes",
            });
        }
        Ok(psi.scale(Complex64::new(1.0 / d, 0.0)))
    }

    fn mooee_inv_dag(&self, psi: &Lattice<WilsonSpinor>) -> Result<Lattice<WilsonSpinor>> {
        self.mooee_inv(psi)
    }

    fn mdir(&self, psi: &Lattice<WilsonSpinor>, mu: usize, disp: isize) -> Result<Lattice<WilsonSpinor>> {
        self.check_full(psi, "WilsonFermion5D::mdir")?;
        Ok(self.dhop_dir(psi, mu, disp, Dagger::No)?.scale(-C_ONE))
    }

    fn mderiv(&self, u: &Lattice<WilsonSpinor>, v: &Lattice<WilsonSpinor>, dag: Dagger) -> Result<GaugeField> {
        self.check_full(u, "WilsonFermion5D::mderiv")?;
        self.check_full(v, "WilsonFermion5D::mderiv")?;
        Ok(self.dhop_deriv(u, v, dag)?.scale(-C_ONE))
    }

    fn meo_deriv(&self, u: &Lattice<WilsonSpinor>, v: &Lattice<WilsonSpinor>, dag: Dagger) -> Result<GaugeField> {
        self.deriv_on(u, v, dag, (Parity::Even, Parity::Odd), "WilsonFermion5D::meo_deriv")
    }

    fn moe_deriv(&self, u: &Lattice<WilsonSpinor>, v: &Lattice<WilsonSpinor>, dag: Dagger) -> Result<GaugeField> {
        self.deriv_on(u, v, dag, (Parity::Odd, Parity::Even), "WilsonFermion5D::moe_deriv")
    }
}
