// SPDX-License-Identifier: AGPL-3.0-only

//! Improved staggered Dirac operator.
//!
//! The staggered (Kogut-Susskind) operator acts on a single color vector per
//! site. With one-hop (usually smeared, "fat") links and a three-hop Naik
//! term,
//!
//!   (D ψ)(x) = m ψ(x) + ½ Σ_μ [ c1 (U_μ(x) ψ(x+μ) − U_{μ+4}(x) ψ(x−μ))
//!                            + c2 (W_μ(x) ψ(x+3μ) − W_{μ+4}(x) ψ(x−3μ)) ]
//!
//! where the staggered phases η_μ(x) and boundary factors are folded into
//! the doubled links by [`StaggeredImpl`]. `D†` is applied as `m − hop`. The
//! one-hop term is always anti-Hermitian. The Naik term is anti-Hermitian
//! only when every boundary factor is 1, because its edge factors sit on the
//! first and last sites rather than on mutually adjoint pairs of three-hop
//! links. On a checkerboard `D = Mooee + Meooe` with `Mooee = m`.
//!
//! # References
//!
//! - Kogut & Susskind, PRD 11, 395 (1975)
//! - Orginos, Toussaint & Sugar, PRD 60, 054503 (1999)
//! - Gattringer & Lang, "QCD on the Lattice" (2010), Ch. 5

use num_complex::Complex64;
use tracing::{debug, info};

use super::double_store::{FermionImpl, StaggeredImpl};
use super::params::ImplParams;
use super::stencil::{staggered_dhop, HopTerms, Stencil};
use super::{direction_index, Dagger, FermionOperator};
use crate::error::{FermionError, Result};
use crate::lattice::constants::{C_ONE, N_DIM};
use crate::lattice::field::Lattice;
use crate::lattice::gauge::{DoubledGaugeField, GaugeField};
use crate::lattice::grid::{FieldLayout, Grid4, Parity};
use crate::lattice::spin::ColorVector;

/// Gauge input for the staggered double-store.
#[derive(Clone, Copy, Debug)]
pub enum StaggeredLinks<'a> {
    /// Naive staggered: thin links only, no Naik term.
    Thin(&'a GaugeField),
    /// Fat one-hop links, Naik links built from the thin field.
    ThinFat {
        thin: &'a GaugeField,
        fat: &'a GaugeField,
    },
    /// Fat one-hop links, precomputed long (three-hop) links.
    FatLong {
        fat: &'a GaugeField,
        long: &'a GaugeField,
    },
}

impl StaggeredLinks<'_> {
    fn grid(&self) -> Grid4 {
        match self {
            Self::Thin(u) => *u.grid(),
            Self::ThinFat { fat, .. } | Self::FatLong { fat, .. } => *fat.grid(),
        }
    }

    fn has_naik(&self) -> bool {
        !matches!(self, Self::Thin(_))
    }
}

/// Staggered operator with fat one-hop and Naik three-hop links.
#[derive(Clone, Debug)]
pub struct ImprovedStaggeredFermion {
    imp: StaggeredImpl,
    one_hop: Stencil,
    three_hop: Stencil,
    umu: DoubledGaugeField,
    uuu: DoubledGaugeField,
    mass: f64,
    c1: f64,
    c2: f64,
    naik: bool,
}

impl ImprovedStaggeredFermion {
    /// Build from any link variant with coefficients `c1` (one-hop) and
    /// `c2` (Naik). Thin links admit no Naik term, so `c2` must be zero there.
    pub fn new(
        links: StaggeredLinks<'_>,
        mass: f64,
        c1: f64,
        c2: f64,
        params: ImplParams,
    ) -> Result<Self> {
        for (name, value) in [("mass", mass), ("c1", c1), ("c2", c2)] {
            if !value.is_finite() {
                return Err(FermionError::InvalidParameter {
                    name,
                    value,
                    reason: "must be finite",
                });
            }
        }
        if !links.has_naik() && c2 != 0.0 {
            return Err(FermionError::InvalidParameter {
                name: "c2",
                value: c2,
                reason: "thin links carry no Naik term",
            });
        }
        let grid = links.grid();
        let imp = StaggeredImpl::new(params)?;
        let (umu, uuu) = Self::double_store(&imp, &grid, links)?;
        info!(dims = ?grid.dims(), mass, c1, c2, naik = links.has_naik(), "improved staggered operator ready");
        Ok(Self {
            imp,
            one_hop: Stencil::new(grid, 1),
            three_hop: Stencil::new(grid, 3),
            umu,
            uuu,
            mass,
            c1,
            c2,
            naik: links.has_naik(),
        })
    }

    /// Naive staggered operator `m + ½ Σ η (U ψ(x+μ) − U† ψ(x−μ))`.
    pub fn naive(u: &GaugeField, mass: f64, params: ImplParams) -> Result<Self> {
        Self::new(StaggeredLinks::Thin(u), mass, 1.0, 0.0, params)
    }

    fn double_store(
        imp: &StaggeredImpl,
        grid: &Grid4,
        links: StaggeredLinks<'_>,
    ) -> Result<(DoubledGaugeField, DoubledGaugeField)> {
        match links {
            StaggeredLinks::Thin(u) => Ok((
                imp.double_store(grid, u)?,
                DoubledGaugeField::zeros(FieldLayout::full(*grid, 1)),
            )),
            StaggeredLinks::ThinFat { thin, fat } => imp.double_store_naik(grid, thin, fat),
            StaggeredLinks::FatLong { fat, long } => imp.double_store_fat_long(grid, fat, long),
        }
    }

    /// Rebuild both doubled fields. The link variant must match construction.
    pub fn import_gauge(&mut self, links: StaggeredLinks<'_>) -> Result<()> {
        if links.has_naik() != self.naik {
            return Err(FermionError::UnsupportedOperation {
                operation: "switching between naive and Naik-improved links",
            });
        }
        let grid = *self.grid();
        let (umu, uuu) = Self::double_store(&self.imp, &grid, links)?;
        self.umu = umu;
        self.uuu = uuu;
        debug!("staggered gauge fields imported");
        Ok(())
    }

    #[must_use]
    pub fn grid(&self) -> &Grid4 {
        self.one_hop.grid()
    }

    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    #[must_use]
    pub fn c1(&self) -> f64 {
        self.c1
    }

    #[must_use]
    pub fn c2(&self) -> f64 {
        self.c2
    }

    #[must_use]
    pub fn impl_params(&self) -> &ImplParams {
        self.imp.params()
    }

    /// `(one_hop, three_hop)` doubled links.
    #[must_use]
    pub fn doubled_gauge(&self) -> (&DoubledGaugeField, &DoubledGaugeField) {
        (&self.umu, &self.uuu)
    }

    #[must_use]
    pub fn full_layout(&self) -> FieldLayout {
        FieldLayout::full(*self.grid(), 1)
    }

    #[must_use]
    pub fn half_layout(&self, parity: Parity) -> FieldLayout {
        FieldLayout::half(*self.grid(), 1, parity)
    }

    fn check_any(&self, psi: &Lattice<ColorVector>, operation: &'static str) -> Result<()> {
        self.full_layout()
            .with_checkerboard(psi.checkerboard())
            .conformable(psi.layout(), operation)
    }

    fn check_full(&self, psi: &Lattice<ColorVector>, operation: &'static str) -> Result<()> {
        self.full_layout().conformable(psi.layout(), operation)
    }

    fn check_half(&self, psi: &Lattice<ColorVector>, operation: &'static str) -> Result<()> {
        psi.layout().require_half(operation)?;
        self.check_any(psi, operation)
    }

    /// Full hopping term (`−hop` for `Dagger::Yes`) on a full field or a checkerboard.
    pub fn dhop(&self, psi: &Lattice<ColorVector>, dag: Dagger) -> Result<Lattice<ColorVector>> {
        self.check_any(psi, "ImprovedStaggeredFermion::dhop")?;
        self.hop_terms(psi, dag, HopTerms::All)
    }

    fn hop_terms(&self, psi: &Lattice<ColorVector>, dag: Dagger, terms: HopTerms) -> Result<Lattice<ColorVector>> {
        let mut out = staggered_dhop(&self.one_hop, &self.umu, psi, self.c1, dag, terms)?;
        if self.naik && self.c2 != 0.0 {
            let naik = staggered_dhop(&self.three_hop, &self.uuu, psi, self.c2, dag, terms)?;
            out.axpy(C_ONE, &naik)?;
        }
        Ok(out)
    }

    fn mass_term(&self, psi: &Lattice<ColorVector>) -> Lattice<ColorVector> {
        psi.scale(Complex64::new(self.mass, 0.0))
    }

    /// Force with respect to the one-hop links:
    /// `F_μ(x) = Σ (c1·hop_{μ,+} v)(x) ⊗ u(x)†`, zero off `u`'s sites.
    fn deriv(&self, u: &Lattice<ColorVector>, v: &Lattice<ColorVector>, dag: Dagger) -> Result<GaugeField> {
        self.one_hop
            .output_layout(v.layout())
            .conformable(u.layout(), "ImprovedStaggeredFermion::mderiv")?;
        let mut mat = GaugeField::zeros(self.full_layout());
        for mu in 0..N_DIM {
            let btilde = staggered_dhop(
                &self.one_hop,
                &self.umu,
                v,
                self.c1,
                dag,
                HopTerms::Direction { mu, disp: 1 },
            )?;
            self.imp.insert_force_4d(&mut mat, &btilde, u, mu)?;
        }
        Ok(mat)
    }
}

impl FermionOperator for ImprovedStaggeredFermion {
    type Site = ColorVector;

    fn m(&self, psi: &Lattice<ColorVector>) -> Result<Lattice<ColorVector>> {
        self.check_full(psi, "ImprovedStaggeredFermion::m")?;
        let mut out = self.mass_term(psi);
        out.axpy(C_ONE, &self.hop_terms(psi, Dagger::No, HopTerms::All)?)?;
        Ok(out)
    }

    fn mdag(&self, psi: &Lattice<ColorVector>) -> Result<Lattice<ColorVector>> {
        self.check_full(psi, "ImprovedStaggeredFermion::mdag")?;
        let mut out = self.mass_term(psi);
        out.axpy(C_ONE, &self.hop_terms(psi, Dagger::Yes, HopTerms::All)?)?;
        Ok(out)
    }

    fn meooe(&self, psi: &Lattice<ColorVector>) -> Result<Lattice<ColorVector>> {
        self.check_half(psi, "ImprovedStaggeredFermion::meooe")?;
        self.hop_terms(psi, Dagger::No, HopTerms::All)
    }

    fn meooe_dag(&self, psi: &Lattice<ColorVector>) -> Result<Lattice<ColorVector>> {
        self.check_half(psi, "ImprovedStaggeredFermion::meooe_dag")?;
        self.hop_terms(psi, Dagger::Yes, HopTerms::All)
    }

    fn mooee(&self, psi: &Lattice<ColorVector>) -> Result<Lattice<ColorVector>> {
        self.check_any(psi, "ImprovedStaggeredFermion::mooee")?;
        Ok(self.mass_term(psi))
    }

    fn mooee_dag(&self, psi: &Lattice<ColorVector>) -> Result<Lattice<ColorVector>> {
        self.mooee(psi)
    }

    fn mooee_inv(&self, psi: &Lattice<ColorVector>) -> Result<Lattice<ColorVector>> {
        self.check_any(psi, "ImprovedStaggeredFermion::mooee_inv")?;
        if self.mass == 0.0 {
            return Err(FermionError::InvalidParameter {
                name: "mass",
                value: self.mass,
                reason: "site-diagonal block is singular at zero mass",
            });
        }
        Ok(psi.scale(Complex64::new(1.0 / self.mass, 0.0)))
    }

    fn mooee_inv_dag(&self, psi: &Lattice<ColorVector>) -> Result<Lattice<ColorVector>> {
        self.mooee_inv(psi)
    }

    fn mdir(&self, psi: &Lattice<ColorVector>, mu: usize, disp: isize) -> Result<Lattice<ColorVector>> {
        direction_index(mu, disp)?;
        self.check_full(psi, "ImprovedStaggeredFermion::mdir")?;
        self.hop_terms(psi, Dagger::No, HopTerms::Direction { mu, disp })
    }

    fn mderiv(&self, u: &Lattice<ColorVector>, v: &Lattice<ColorVector>, dag: Dagger) -> Result<GaugeField> {
        self.check_full(u, "ImprovedStaggeredFermion::mderiv")?;
        self.check_full(v, "ImprovedStaggeredFermion::mderiv")?;
        self.deriv(u, v, dag)
    }

    fn meo_deriv(&self, u: &Lattice<ColorVector>, v: &Lattice<ColorVector>, dag: Dagger) -> Result<GaugeField> {
        self.half_layout(Parity::Even)
            .conformable(u.layout(), "ImprovedStaggeredFermion::meo_deriv")?;
        self.half_layout(Parity::Odd)
            .conformable(v.layout(), "ImprovedStaggeredFermion::meo_deriv")?;
        self.deriv(u, v, dag)
    }

    fn moe_deriv(&self, u: &Lattice<ColorVector>, v: &Lattice<ColorVector>, dag: Dagger) -> Result<GaugeField> {
        self.half_layout(Parity::Odd)
            .conformable(u.layout(), "ImprovedStaggeredFermion::moe_deriv")?;
        self.half_layout(Parity::Even)
            .conformable(v.layout(), "ImprovedStaggeredFermion::moe_deriv")?;
        self.deriv(u, v, dag)
    }
}
