// SPDX-License-Identifier: AGPL-3.0-only

//! Continued-fraction 5D overlap operator.
//!
//! The fifth dimension carries the continued fraction of `ε(H)` with
//! `H = γ5 Dw / zolo_hi`. Per 4D site the operator is a real tridiagonal
//! block in the flavour index, with `γ5 Dw` on the diagonal:
//!
//!   (M ψ)_s = hop_s γ5 (Dw ψ)_s + √cc_s·ψ_{s+1} + √cc_{s−1}·ψ_{s−1}
//!           + δ_{s,Ls−1} R γ5 ψ_s
//!
//! Eliminating slices `0..Ls−1` leaves `R γ5 + ε(H)` on the last slice, i.e.
//! `γ5` times the overlap operator with mass `(1 − R)/(1 + R)` rescaled.
//! The physical 4D field lives on slice `Ls−1`.
//!
//! Because `hop_s` and `√cc` are real, the flavour block is symmetric and
//! commutes with `γ5`; with `γ5`-hermiticity of `Dw` this makes `M`
//! Hermitian. `Mooee` keeps the site-local part `(4 − M5)` of `Dw`, so its
//! inverse is the `See`-pivoted LDLᵀ sweep along the flavour index.

use num_complex::Complex64;
use rayon::prelude::*;
use tracing::{debug, info};

use super::approx::{
    ApproximationConfig, ContinuedFractionCoefficients, ContinuedFractionParams,
    ContinuedFractionScheme, TanhScheme, ZolotarevScheme,
};
use super::params::ImplParams;
use super::wilson5d::WilsonFermion5D;
use super::{Dagger, FermionOperator};
use crate::error::Result;
use crate::lattice::constants::C_ONE;
use crate::lattice::field::{Lattice, SiteObject};
use crate::lattice::gauge::GaugeField;
use crate::lattice::grid::{FieldLayout, Parity};
use crate::lattice::spin::{gamma5, WilsonSpinor};

/// Continued-fraction operator over a pluggable coefficient scheme.
#[derive(Clone, Debug)]
pub struct ContinuedFractionFermion5D<S> {
    kernel: WilsonFermion5D,
    scheme: S,
    coeffs: ContinuedFractionCoefficients,
}

/// `ε(x) = tanh(Ls · artanh(scale · x))`.
pub type TanhFermion5D = ContinuedFractionFermion5D<TanhScheme>;

/// Zolotarev optimal approximation from a supplied table.
pub type ZolotarevFermion5D = ContinuedFractionFermion5D<ZolotarevScheme>;

fn re(x: f64) -> Complex64 {
    Complex64::new(x, 0.0)
}

/// Run `f(in_block, out_block)` over every site's flavour block.
fn blockwise<F>(psi: &Lattice<WilsonSpinor>, f: F) -> Lattice<WilsonSpinor>
where
    F: Fn(&[WilsonSpinor], &mut [WilsonSpinor]) + Sync + Send,
{
    let ls = psi.ls().max(1);
    let mut out = Lattice::zeros(*psi.layout());
    out.data_mut()
        .par_chunks_mut(ls)
        .zip(psi.data().par_chunks(ls))
        .for_each(|(o, p)| f(p, o));
    out
}

impl<S: ContinuedFractionScheme> ContinuedFractionFermion5D<S> {
    /// Build the operator: coefficients from `scheme`, doubled links from `u`.
    pub fn new(
        u: &GaugeField,
        ls: usize,
        mass: f64,
        m5: f64,
        scheme: S,
        params: ImplParams,
    ) -> Result<Self> {
        let coeffs = scheme.coefficients(ls, mass, m5)?;
        let kernel = WilsonFermion5D::new(u, ls, m5, params)?;
        info!(
            scheme = scheme.name(),
            ls,
            mass,
            m5,
            zolo_hi = scheme.zolo_hi(),
            r = coeffs.r,
            "continued-fraction operator ready"
        );
        Ok(Self {
            kernel,
            scheme,
            coeffs,
        })
    }

    /// Rebuild the doubled links; coefficients are unchanged.
    pub fn import_gauge(&mut self, u: &GaugeField) -> Result<()> {
        self.kernel.import_gauge(u)
    }

    #[must_use]
    pub fn coefficients(&self) -> &ContinuedFractionCoefficients {
        &self.coeffs
    }

    #[must_use]
    pub fn scheme(&self) -> &S {
        &self.scheme
    }

    /// Underlying s-diagonal Wilson kernel.
    #[must_use]
    pub fn kernel(&self) -> &WilsonFermion5D {
        &self.kernel
    }

    #[must_use]
    pub fn ls(&self) -> usize {
        self.kernel.ls()
    }

    #[must_use]
    pub fn mass(&self) -> f64 {
        self.coeffs.mass
    }

    #[must_use]
    pub fn full_layout(&self) -> FieldLayout {
        self.kernel.full_layout()
    }

    #[must_use]
    pub fn half_layout(&self, parity: Parity) -> FieldLayout {
        self.kernel.half_layout(parity)
    }

    /// Physical 4D solution: slice `Ls−1` of the 5D field.
    pub fn export_physical_fermion_solution(
        &self,
        solution: &Lattice<WilsonSpinor>,
    ) -> Result<Lattice<WilsonSpinor>> {
        self.kernel
            .check_fermion(solution, "export_physical_fermion_solution")?;
        solution.extract_slice(self.ls() - 1)
    }

    /// 5D source holding the 4D field on slice `Ls−1` and zero elsewhere.
    pub fn import_physical_fermion_source(
        &self,
        source: &Lattice<WilsonSpinor>,
    ) -> Result<Lattice<WilsonSpinor>> {
        let cb = source.checkerboard();
        FieldLayout::full(*self.kernel.grid(), 1)
            .with_checkerboard(cb)
            .conformable(source.layout(), "import_physical_fermion_source")?;
        let mut out = Lattice::zeros(self.full_layout().with_checkerboard(cb));
        out.insert_slice(source, self.ls() - 1)?;
        Ok(out)
    }

    fn check_full(&self, psi: &Lattice<WilsonSpinor>, operation: &'static str) -> Result<()> {
        self.full_layout().conformable(psi.layout(), operation)
    }

    fn check_half(&self, psi: &Lattice<WilsonSpinor>, operation: &'static str) -> Result<()> {
        let parity = psi.layout().require_half(operation)?;
        self.half_layout(parity).conformable(psi.layout(), operation)
    }

    /// `w_s γ5 ψ_s` on every slice.
    fn weighted_gamma5(&self, weights: &[f64], psi: &Lattice<WilsonSpinor>) -> Lattice<WilsonSpinor> {
        blockwise(psi, |p, o| {
            for ((out, v), w) in o.iter_mut().zip(p).zip(weights) {
                *out = gamma5(v).scaled(re(*w));
            }
        })
    }

    /// Add the flavour couplings `√cc` and the `R γ5` term on the last slice.
    fn add_flavour_coupling(&self, psi: &Lattice<WilsonSpinor>, out: &mut Lattice<WilsonSpinor>) {
        let c = &self.coeffs;
        let ls = psi.ls();
        out.data_mut()
            .par_chunks_mut(ls)
            .zip(psi.data().par_chunks(ls))
            .for_each(|(o, p)| {
                for s in 0..ls {
                    if s + 1 < ls {
                        o[s].add_scaled(re(c.sqrt_cc[s]), &p[s + 1]);
                    }
                    if s > 0 {
                        o[s].add_scaled(re(c.sqrt_cc[s - 1]), &p[s - 1]);
                    }
                }
                o[ls - 1].add_scaled(re(c.r), &gamma5(&p[ls - 1]));
            });
    }

    fn mooee_inv_block(&self, psi: &[WilsonSpinor], chi: &mut [WilsonSpinor]) {
        let c = &self.coeffs;
        let ls = psi.len();

        chi[0] = psi[0].scaled(re(1.0 / c.cc_d[0]));
        for s in 1..ls {
            let mut v = psi[s].scaled(re(1.0 / c.cc_d[s]));
            v.add_scaled(re(-1.0 / c.see[s - 1]), &gamma5(&chi[s - 1]));
            chi[s] = v;
        }
        for (v, see) in chi.iter_mut().zip(&c.see) {
            *v = gamma5(v).scaled(re(1.0 / see));
        }
        chi[ls - 1] = chi[ls - 1].scaled(re(1.0 / c.cc_d[ls - 1]));
        for s in (0..ls - 1).rev() {
            let mut v = chi[s].scaled(re(1.0 / c.cc_d[s]));
            let w = c.cc_d[s + 1] / (c.see[s] * c.cc_d[s]);
            v.add_scaled(re(-w), &gamma5(&chi[s + 1]));
            chi[s] = v;
        }
    }

    fn deriv_on(
        &self,
        u: &Lattice<WilsonSpinor>,
        v: &Lattice<WilsonSpinor>,
        dag: Dagger,
    ) -> Result<GaugeField> {
        let hop = &self.coeffs.hop;
        let force = match dag {
            Dagger::No => self
                .kernel
                .dhop_deriv(&self.weighted_gamma5(hop, u), v, Dagger::No)?,
            Dagger::Yes => self
                .kernel
                .dhop_deriv(u, &self.weighted_gamma5(hop, v), Dagger::Yes)?,
        };
        Ok(force.scale(-C_ONE))
    }

    fn check_parities(
        &self,
        u: &Lattice<WilsonSpinor>,
        v: &Lattice<WilsonSpinor>,
        parities: (Parity, Parity),
        operation: &'static str,
    ) -> Result<()> {
        self.half_layout(parities.0).conformable(u.layout(), operation)?;
        self.half_layout(parities.1).conformable(v.layout(), operation)
    }
}

impl ContinuedFractionFermion5D<ApproximationConfig> {
    /// Build from a deserialised parameter bundle.
    pub fn from_params(u: &GaugeField, params: &ContinuedFractionParams) -> Result<Self> {
        debug!(?params, "continued-fraction parameters");
        Self::new(
            u,
            params.ls,
            params.mass,
            params.m5,
            params.approximation.clone(),
            params.boundary.clone(),
        )
    }
}

impl<S: ContinuedFractionScheme> FermionOperator for ContinuedFractionFermion5D<S> {
    type Site = WilsonSpinor;

    fn m(&self, psi: &Lattice<WilsonSpinor>) -> Result<Lattice<WilsonSpinor>> {
        self.check_full(psi, "ContinuedFractionFermion5D::m")?;
        let dw = self.kernel.dw(psi, Dagger::No)?;
        let mut out = self.weighted_gamma5(&self.coeffs.hop, &dw);
        self.add_flavour_coupling(psi, &mut out);
        Ok(out)
    }

    fn mdag(&self, psi: &Lattice<WilsonSpinor>) -> Result<Lattice<WilsonSpinor>> {
        self.check_full(psi, "ContinuedFractionFermion5D::mdag")?;
        let tmp = self.weighted_gamma5(&self.coeffs.hop, psi);
        let mut out = self.kernel.dw(&tmp, Dagger::Yes)?;
        self.add_flavour_coupling(psi, &mut out);
        Ok(out)
    }

    fn meooe(&self, psi: &Lattice<WilsonSpinor>) -> Result<Lattice<WilsonSpinor>> {
        self.check_half(psi, "ContinuedFractionFermion5D::meooe")?;
        let k = self.kernel.dhop(psi, Dagger::No)?;
        Ok(self.weighted_gamma5(&self.coeffs.hop, &k))
    }

    fn meooe_dag(&self, psi: &Lattice<WilsonSpinor>) -> Result<Lattice<WilsonSpinor>> {
        self.check_half(psi, "ContinuedFractionFermion5D::meooe_dag")?;
        let tmp = self.weighted_gamma5(&self.coeffs.hop, psi);
        self.kernel.dhop(&tmp, Dagger::Yes)
    }

    fn mooee(&self, psi: &Lattice<WilsonSpinor>) -> Result<Lattice<WilsonSpinor>> {
        self.kernel.check_fermion(psi, "ContinuedFractionFermion5D::mooee")?;
        let mut out = self.weighted_gamma5(&self.coeffs.diag, psi);
        self.add_flavour_coupling(psi, &mut out);
        Ok(out)
    }

    fn mooee_dag(&self, psi: &Lattice<WilsonSpinor>) -> Result<Lattice<WilsonSpinor>> {
        self.mooee(psi)
    }

    fn mooee_inv(&self, psi: &Lattice<WilsonSpinor>) -> Result<Lattice<WilsonSpinor>> {
        self.kernel
            .check_fermion(psi, "ContinuedFractionFermion5D::mooee_inv")?;
        Ok(blockwise(psi, |p, chi| self.mooee_inv_block(p, chi)))
    }

    fn mooee_inv_dag(&self, psi: &Lattice<WilsonSpinor>) -> Result<Lattice<WilsonSpinor>> {
        self.mooee_inv(psi)
    }

    fn mdir(&self, psi: &Lattice<WilsonSpinor>, mu: usize, disp: isize) -> Result<Lattice<WilsonSpinor>> {
        self.check_full(psi, "ContinuedFractionFermion5D::mdir")?;
        let k = self.kernel.dhop_dir(psi, mu, disp, Dagger::No)?;
        let minus_hop: Vec<f64> = self.coeffs.hop.iter().map(|h| -h).collect();
        Ok(self.weighted_gamma5(&minus_hop, &k))
    }

    fn mderiv(&self, u: &Lattice<WilsonSpinor>, v: &Lattice<WilsonSpinor>, dag: Dagger) -> Result<GaugeField> {
        self.check_full(u, "ContinuedFractionFermion5D::mderiv")?;
        self.check_full(v, "ContinuedFractionFermion5D::mderiv")?;
        self.deriv_on(u, v, dag)
    }

    fn meo_deriv(&self, u: &Lattice<WilsonSpinor>, v: &Lattice<WilsonSpinor>, dag: Dagger) -> Result<GaugeField> {
        self.check_parities(u, v, (Parity::Even, Parity::Odd), "ContinuedFractionFermion5D::meo_deriv")?;
        self.deriv_on(u, v, dag)
    }

    fn moe_deriv(&self, u: &Lattice<WilsonSpinor>, v: &Lattice<WilsonSpinor>, dag: Dagger) -> Result<GaugeField> {
        self.check_parities(u, v, (Parity::Odd, Parity::Even), "ContinuedFractionFermion5D::moe_deriv")?;
        self.deriv_on(u, v, dag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirac::approx::RationalApproximation;
    use crate::error::FermionError;
    use crate::lattice::grid::Grid4;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn grid() -> Grid4 {
        Grid4::new([4, 2, 2, 4]).unwrap()
    }

    fn tanh_op(ls: usize) -> TanhFermion5D {
        let u = GaugeField::hot_start(grid(), 101);
        TanhFermion5D::new(&u, ls, 0.1, 1.8, TanhScheme::new(0.6).unwrap(), ImplParams::default()).unwrap()
    }

    #[test]
    fn rejects_bad_order_and_scale() {
        let u = GaugeField::cold_start(grid());
        let scheme = TanhScheme { scale: 1.0 };
        for ls in [0, 4] {
            let err = TanhFermion5D::new(&u, ls, 0.1, 1.8, scheme, ImplParams::default()).unwrap_err();
            assert!(matches!(err, FermionError::InvalidOrder { .. }));
        }
        let err = TanhFermion5D::new(&u, 3, 0.1, 1.8, TanhScheme { scale: -1.0 }, ImplParams::default())
            .unwrap_err();
        assert!(matches!(err, FermionError::InvalidScale { .. }));
    }

    #[test]
    fn flavour_block_schur_complement_is_tanh() {
        // Scalar Dw = w, γ5 = 1: eliminating slices 0..Ls−1 from the flavour
        // block leaves R + tanh(Ls artanh(w / zolo_hi)) on the last slice.
        for ls in [1, 3, 5, 7] {
            let scheme = TanhScheme::new(0.8).unwrap();
            let c = scheme.coefficients(ls, 0.2, 1.8).unwrap();
            let w = 0.45;
            let x = w * c.zolo_hi_inv;
            let a: Vec<f64> = c.hop.iter().map(|h| h * w).collect();
            let mut pivot = a[0] + if ls == 1 { c.r } else { 0.0 };
            for s in 1..ls {
                let extra = if s == ls - 1 { c.r } else { 0.0 };
                pivot = a[s] + extra - c.sqrt_cc[s - 1].powi(2) / pivot;
            }
            let expected = c.r + (ls as f64 * x.atanh()).tanh();
            assert_relative_eq!(pivot, expected, max_relative = 1e-10);
        }
    }

    #[test]
    fn mooee_inverse_both_ways() {
        let op = tanh_op(5);
        let mut seed = 12u64;
        for psi in [
            Lattice::<WilsonSpinor>::gaussian(op.full_layout(), &mut seed),
            Lattice::<WilsonSpinor>::gaussian(op.half_layout(Parity::Even), &mut seed),
        ] {
            let a = op.mooee(&op.mooee_inv(&psi).unwrap()).unwrap();
            let b = op.mooee_inv(&op.mooee(&psi).unwrap()).unwrap();
            let n = psi.norm2();
            assert_abs_diff_eq!(a.sub(&psi).unwrap().norm2() / n, 0.0, epsilon = 1e-24);
            assert_abs_diff_eq!(b.sub(&psi).unwrap().norm2() / n, 0.0, epsilon = 1e-24);
        }
    }

    #[test]
    fn single_slice_operator() {
        let op = tanh_op(1);
        let mut seed = 13u64;
        let psi = Lattice::<WilsonSpinor>::gaussian(op.full_layout(), &mut seed);
        let back = op.mooee_inv(&op.mooee(&psi).unwrap()).unwrap();
        assert_abs_diff_eq!(back.sub(&psi).unwrap().norm2(), 0.0, epsilon = 1e-20);
        let mdag = op.mdag(&psi).unwrap();
        let m = op.m(&psi).unwrap();
        assert_abs_diff_eq!(mdag.sub(&m).unwrap().norm2(), 0.0, epsilon = 1e-18);
    }

    #[test]
    fn operator_is_hermitian() {
        let op = tanh_op(3);
        let mut seed = 14u64;
        let psi = Lattice::<WilsonSpinor>::gaussian(op.full_layout(), &mut seed);
        let diff = op.m(&psi).unwrap().sub(&op.mdag(&psi).unwrap()).unwrap();
        assert_abs_diff_eq!(diff.norm2() / psi.norm2(), 0.0, epsilon = 1e-24);
    }

    #[test]
    fn zolotarev_with_tanh_table_matches_tanh() {
        let u = GaugeField::hot_start(grid(), 102);
        let scale = 0.6;
        let tanh = TanhFermion5D::new(&u, 5, 0.1, 1.8, TanhScheme::new(scale).unwrap(), ImplParams::default())
            .unwrap();
        let table = RationalApproximation::tanh(5).unwrap();
        let zolo = ZolotarevFermion5D::new(
            &u,
            5,
            0.1,
            1.8,
            ZolotarevScheme::new(1.0 / scale, table).unwrap(),
            ImplParams::default(),
        )
        .unwrap();
        let mut seed = 15u64;
        let psi = Lattice::<WilsonSpinor>::gaussian(tanh.full_layout(), &mut seed);
        let diff = tanh.m(&psi).unwrap().sub(&zolo.m(&psi).unwrap()).unwrap();
        assert_abs_diff_eq!(diff.norm2() / psi.norm2(), 0.0, epsilon = 1e-16);
    }

    #[test]
    fn aee_is_beta_weighted_diagonal() {
        let op = tanh_op(5);
        let c = op.coefficients();
        for s in 0..4 {
            assert_relative_eq!(c.aee[s], c.beta[s] * c.diag[s], max_relative = 1e-13);
        }
        assert_relative_eq!(c.aee[4], c.diag[4] + c.r, max_relative = 1e-13);
    }

    #[test]
    fn from_params_builds_configured_scheme() {
        let u = GaugeField::cold_start(grid());
        let params = ContinuedFractionParams {
            ls: 3,
            mass: 0.05,
            m5: 1.4,
            approximation: ApproximationConfig::Tanh(TanhScheme { scale: 1.0 }),
            boundary: ImplParams::antiperiodic_time(),
        };
        let op = ContinuedFractionFermion5D::from_params(&u, &params).unwrap();
        assert_eq!(op.ls(), 3);
        assert_eq!(op.scheme().name(), "tanh");
        assert_eq!(op.kernel().impl_params(), &ImplParams::antiperiodic_time());
        assert_relative_eq!(op.mass(), 0.05);
    }

    #[test]
    fn import_export_slice() {
        let op = tanh_op(3);
        let mut seed = 16u64;
        let src = Lattice::<WilsonSpinor>::gaussian(FieldLayout::full(grid(), 1), &mut seed);
        let five = op.import_physical_fermion_source(&src).unwrap();
        assert_eq!(five.extract_slice(0).unwrap().norm2(), 0.0);
        assert_eq!(op.export_physical_fermion_solution(&five).unwrap(), src);

        let half = src.pick_checkerboard(Parity::Odd).unwrap();
        let five = op.import_physical_fermion_source(&half).unwrap();
        assert_eq!(five.layout(), &op.half_layout(Parity::Odd));
        assert_eq!(op.export_physical_fermion_solution(&five).unwrap(), half);

        assert!(matches!(
            op.import_physical_fermion_source(&five),
            Err(FermionError::ShapeMismatch { .. })
        ));
        assert!(op.export_physical_fermion_solution(&src).is_err());
    }
}
