// SPDX-License-Identifier: AGPL-3.0-only

//! Gauge double-store: per-site forward and backward hopping links.
//!
//! For each direction μ the doubled field holds, at site `x`,
//!
//!   slot μ:     `η_μ(x) · U_μ(x)                 · (boundary factor)`
//!   slot μ+4:   `η_μ(x) · U_μ(x − h·μ)†          · (conjugate boundary factor)`
//!
//! where `h` is the hop length (1, or 3 for the Naik term, whose "link" is the
//! product of three thin links). The boundary factor sits on forward links
//! leaving the last site along μ and on backward links arriving at the first
//! site, for either hop length. Wilson fermions use `η = 1`; staggered
//! fermions use the Kogut-Susskind phases
//!
//!   η_0 = 1,  η_1 = (−1)^x,  η_2 = (−1)^(x+y),  η_3 = (−1)^(x+y+z).
//!
//! # References
//!
//! - Kogut & Susskind, PRD 11, 395 (1975)
//! - Orginos, Toussaint & Sugar, PRD 60, 054503 (1999) (asqtad Naik term)

use num_complex::Complex64;
use rayon::prelude::*;

use super::params::{backward_boundary_factor, forward_boundary_factor, ImplParams};
use crate::error::{FermionError, Result};
use crate::lattice::constants::{N_DIM, N_DOUBLED};
use crate::lattice::field::{Lattice, SiteObject};
use crate::lattice::gauge::{cov_shift_forward, DoubledGaugeField, GaugeField, GaugeLinkField};
use crate::lattice::grid::{FieldLayout, Grid4};
use crate::lattice::spin::{ColorVector, WilsonSpinor};
use crate::lattice::su3::Su3Matrix;

/// Kogut-Susskind phase `η_μ(x) = (−1)^(x_0 + … + x_{μ−1})`.
#[must_use]
pub fn staggered_phase(x: &[usize; N_DIM], mu: usize) -> f64 {
    let sum: usize = x[..mu].iter().sum();
    if sum % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

/// How a discretisation folds links into a doubled field and turns fermion
/// bilinears back into gauge forces.
pub trait FermionImpl: Send + Sync {
    /// Per-site fermion object.
    type Site: SiteObject;

    fn params(&self) -> &ImplParams;

    /// Spin-traced color outer product `Σ_spin b ⊗ a†`.
    fn outer(b: &Self::Site, a: &Self::Site) -> Su3Matrix;

    /// Store `Σ_spin Btilde(x) ⊗ A(x)†` into link slot `mu` of `mat`, at every
    /// site the 4D fields hold.
    fn insert_force_4d(
        &self,
        mat: &mut GaugeField,
        btilde: &Lattice<Self::Site>,
        a: &Lattice<Self::Site>,
        mu: usize,
    ) -> Result<()> {
        if btilde.ls() != 1 {
            return Err(FermionError::ShapeMismatch {
                operation: "insert_force_4d",
                expected: "Ls=1".into(),
                found: format!("Ls={}", btilde.ls()),
            });
        }
        insert_force::<Self>(mat, btilde, a, mu, "insert_force_4d")
    }

    /// As [`insert_force_4d`](Self::insert_force_4d), summed over flavour slices.
    fn insert_force_5d(
        &self,
        mat: &mut GaugeField,
        btilde: &Lattice<Self::Site>,
        a: &Lattice<Self::Site>,
        mu: usize,
    ) -> Result<()> {
        insert_force::<Self>(mat, btilde, a, mu, "insert_force_5d")
    }
}

fn insert_force<I: FermionImpl + ?Sized>(
    mat: &mut GaugeField,
    btilde: &Lattice<I::Site>,
    a: &Lattice<I::Site>,
    mu: usize,
    operation: &'static str,
) -> Result<()> {
    if mu >= N_DIM {
        return Err(FermionError::InvalidDirection { mu, disp: 0 });
    }
    btilde.conformable(a, operation)?;
    FieldLayout::full(*btilde.grid(), 1).conformable(mat.layout(), operation)?;

    let layout = *btilde.layout();
    let grid = layout.grid;
    let forces: Vec<(usize, Su3Matrix)> = (0..layout.sites())
        .into_par_iter()
        .map(|site| {
            let f = btilde
                .site_block(site)
                .iter()
                .zip(a.site_block(site))
                .fold(Su3Matrix::ZERO, |acc, (x, y)| acc + I::outer(x, y));
            (grid.site_index(&layout.site_coords(site)), f)
        })
        .collect();
    for (full, f) in forces {
        mat.get_mut(full, 0)[mu] = f;
    }
    Ok(())
}

/// Assemble a doubled field from per-direction `h`-hop links.
///
/// `links[mu](x)` is the product of links from `x` to `x + h·μ`. The backward
/// slot is obtained by shifting and daggering, then signs and edge factors
/// are applied.
fn assemble<P>(
    grid: Grid4,
    links: &[GaugeLinkField],
    hops: usize,
    params: &ImplParams,
    eta: P,
) -> Result<DoubledGaugeField>
where
    P: Fn(&[usize; N_DIM], usize) -> f64 + Sync + Send,
{
    let dims = grid.dims();
    let mut backward = Vec::with_capacity(N_DIM);
    let mut bphase = [Complex64::new(1.0, 0.0); N_DIM];
    for (mu, link) in links.iter().enumerate() {
        backward.push(link.cshift(mu, -(hops as isize))?.adjoint());
        bphase[mu] = params.boundary_phase(mu, dims[mu]);
    }

    Ok(DoubledGaugeField::from_fn(FieldLayout::full(grid, 1), |c, _| {
        let site = grid.site_index(c);
        let mut out = [Su3Matrix::ZERO; N_DOUBLED];
        for mu in 0..N_DIM {
            let sign = eta(c, mu);
            let fwd = forward_boundary_factor(bphase[mu], c[mu], dims[mu]) * sign;
            let bwd = backward_boundary_factor(bphase[mu], c[mu]) * sign;
            out[mu] = links[mu].get(site, 0).scale_complex(fwd);
            out[mu + N_DIM] = backward[mu].get(site, 0).scale_complex(bwd);
        }
        out
    }))
}

fn one_hop_links(u: &GaugeField) -> Result<Vec<GaugeLinkField>> {
    (0..N_DIM).map(|mu| u.peek_lorentz(mu)).collect()
}

fn three_hop_links(u: &GaugeField) -> Result<Vec<GaugeLinkField>> {
    (0..N_DIM)
        .map(|mu| {
            let link = u.peek_lorentz(mu)?;
            let uu = cov_shift_forward(&link, mu, &link)?;
            cov_shift_forward(&link, mu, &uu)
        })
        .collect()
}

fn check_gauge(grid: &Grid4, u: &GaugeField, operation: &'static str) -> Result<()> {
    FieldLayout::full(*grid, 1).conformable(u.layout(), operation)
}

/// Wilson-type fermions: 4-spinor sites, no staggered sign.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WilsonImpl {
    pub params: ImplParams,
}

impl WilsonImpl {
    pub fn new(params: ImplParams) -> Result<Self> {
        params.validate()?;
        params.log();
        Ok(Self { params })
    }

    /// Doubled field for the Wilson hopping term.
    pub fn double_store(&self, grid: &Grid4, u: &GaugeField) -> Result<DoubledGaugeField> {
        check_gauge(grid, u, "WilsonImpl::double_store")?;
        assemble(*grid, &one_hop_links(u)?, 1, &self.params, |_, _| 1.0)
    }
}

impl FermionImpl for WilsonImpl {
    type Site = WilsonSpinor;

    fn params(&self) -> &ImplParams {
        &self.params
    }

    fn outer(b: &WilsonSpinor, a: &WilsonSpinor) -> Su3Matrix {
        b.iter()
            .zip(a.iter())
            .fold(Su3Matrix::ZERO, |acc, (bs, as_)| acc + Su3Matrix::outer(bs, as_))
    }
}

/// Staggered fermions: color-vector sites, Kogut-Susskind signs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaggeredImpl {
    pub params: ImplParams,
}

impl StaggeredImpl {
    pub fn new(params: ImplParams) -> Result<Self> {
        params.validate()?;
        params.log();
        Ok(Self { params })
    }

    /// Naive staggered: one-hop links from the thin field.
    pub fn double_store(&self, grid: &Grid4, thin: &GaugeField) -> Result<DoubledGaugeField> {
        check_gauge(grid, thin, "StaggeredImpl::double_store")?;
        assemble(*grid, &one_hop_links(thin)?, 1, &self.params, staggered_phase)
    }

    /// One-hop links from the fat field, Naik links from products of three
    /// thin links. Returns `(one_hop, three_hop)`.
    pub fn double_store_naik(
        &self,
        grid: &Grid4,
        thin: &GaugeField,
        fat: &GaugeField,
    ) -> Result<(DoubledGaugeField, DoubledGaugeField)> {
        check_gauge(grid, thin, "StaggeredImpl::double_store_naik")?;
        check_gauge(grid, fat, "StaggeredImpl::double_store_naik")?;
        let one = assemble(*grid, &one_hop_links(fat)?, 1, &self.params, staggered_phase)?;
        let three = assemble(*grid, &three_hop_links(thin)?, 3, &self.params, staggered_phase)?;
        Ok((one, three))
    }

    /// One-hop links from the fat field, three-hop links taken directly from
    /// a precomputed long field. Returns `(one_hop, three_hop)`.
    pub fn double_store_fat_long(
        &self,
        grid: &Grid4,
        fat: &GaugeField,
        long: &GaugeField,
    ) -> Result<(DoubledGaugeField, DoubledGaugeField)> {
        check_gauge(grid, fat, "StaggeredImpl::double_store_fat_long")?;
        check_gauge(grid, long, "StaggeredImpl::double_store_fat_long")?;
        let one = assemble(*grid, &one_hop_links(fat)?, 1, &self.params, staggered_phase)?;
        let three = assemble(*grid, &one_hop_links(long)?, 3, &self.params, staggered_phase)?;
        Ok((one, three))
    }
}

impl FermionImpl for StaggeredImpl {
    type Site = ColorVector;

    fn params(&self) -> &ImplParams {
        &self.params
    }

    fn outer(b: &ColorVector, a: &ColorVector) -> Su3Matrix {
        Su3Matrix::outer(b, a)
    }

    /// Staggered fermions have no fifth dimension to sum over.
    fn insert_force_5d(
        &self,
        _mat: &mut GaugeField,
        _btilde: &Lattice<ColorVector>,
        _a: &Lattice<ColorVector>,
        _mu: usize,
    ) -> Result<()> {
        Err(FermionError::UnsupportedOperation {
            operation: "staggered 5D force insertion",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::constants::C_ONE;
    use crate::lattice::grid::Parity;
    use approx::assert_abs_diff_eq;

    fn grid() -> Grid4 {
        Grid4::hypercubic(4).unwrap()
    }

    #[test]
    fn staggered_phase_pattern() {
        assert_eq!(staggered_phase(&[0, 0, 0, 0], 0), 1.0);
        assert_eq!(staggered_phase(&[1, 0, 0, 0], 1), -1.0);
        assert_eq!(staggered_phase(&[1, 1, 0, 0], 2), 1.0);
        assert_eq!(staggered_phase(&[1, 1, 1, 0], 3), -1.0);
        assert_eq!(staggered_phase(&[5, 3, 2, 7], 0), 1.0);
    }

    #[test]
    fn wilson_backward_is_shifted_adjoint() {
        let g = grid();
        let u = GaugeField::hot_start(g, 3);
        let ds = WilsonImpl::default().double_store(&g, &u).unwrap();
        for site in [0, 17, 200] {
            for mu in 0..N_DIM {
                let back = g.neighbor(site, mu, -1);
                let expected = u.get(back, 0)[mu].adjoint();
                assert_abs_diff_eq!(
                    (ds.get(site, 0)[mu + N_DIM] - expected).norm_sq(),
                    0.0,
                    epsilon = 1e-28
                );
                assert_eq!(ds.get(site, 0)[mu], u.get(site, 0)[mu]);
            }
        }
    }

    #[test]
    fn antiperiodic_time_flips_boundary_links() {
        let g = grid();
        let u = GaugeField::cold_start(g);
        let ds = WilsonImpl::new(ImplParams::antiperiodic_time())
            .unwrap()
            .double_store(&g, &u)
            .unwrap();
        let last = g.site_index(&[0, 0, 0, 3]);
        let first = g.site_index(&[0, 0, 0, 0]);
        let mid = g.site_index(&[0, 0, 0, 1]);
        assert_eq!(ds.get(last, 0)[3].m[0][0], -C_ONE);
        assert_eq!(ds.get(first, 0)[7].m[0][0], -C_ONE);
        assert_eq!(ds.get(mid, 0)[3].m[0][0], C_ONE);
        assert_eq!(ds.get(mid, 0)[7].m[0][0], C_ONE);
    }

    #[test]
    fn staggered_cold_links_carry_phases() {
        let g = grid();
        let u = GaugeField::cold_start(g);
        let ds = StaggeredImpl::default().double_store(&g, &u).unwrap();
        for idx in 0..g.volume() {
            let c = g.site_coords(idx);
            for mu in 0..N_DIM {
                let eta = staggered_phase(&c, mu);
                assert_eq!(ds.get(idx, 0)[mu].m[1][1].re, eta);
                assert_eq!(ds.get(idx, 0)[mu + N_DIM].m[2][2].re, eta);
            }
        }
    }

    #[test]
    fn naik_links_are_three_link_products() {
        let g = grid();
        let thin = GaugeField::hot_start(g, 5);
        let fat = GaugeField::hot_start(g, 6);
        let (one, three) = StaggeredImpl::default()
            .double_store_naik(&g, &thin, &fat)
            .unwrap();
        let c = [1, 2, 0, 1];
        let site = g.site_index(&c);
        for mu in 0..N_DIM {
            let eta = staggered_phase(&c, mu);
            let x1 = g.neighbor(site, mu, 1);
            let x2 = g.neighbor(site, mu, 2);
            let uuu = thin.get(site, 0)[mu] * thin.get(x1, 0)[mu] * thin.get(x2, 0)[mu];
            let diff = three.get(site, 0)[mu] - uuu.scale(eta);
            assert_abs_diff_eq!(diff.norm_sq(), 0.0, epsilon = 1e-24);
            let diff = one.get(site, 0)[mu] - fat.get(site, 0)[mu].scale(eta);
            assert_abs_diff_eq!(diff.norm_sq(), 0.0, epsilon = 1e-24);
        }
    }

    #[test]
    fn fat_long_uses_long_directly() {
        let g = grid();
        let fat = GaugeField::hot_start(g, 8);
        let long = GaugeField::hot_start(g, 9);
        let (_, three) = StaggeredImpl::default()
            .double_store_fat_long(&g, &fat, &long)
            .unwrap();
        let c = [0, 0, 3, 2];
        let site = g.site_index(&c);
        let back = g.site_index(&g.shift_coords(&c, 2, -3));
        let eta = staggered_phase(&c, 2);
        let diff = three.get(site, 0)[6] - long.get(back, 0)[2].adjoint().scale(eta);
        assert_abs_diff_eq!(diff.norm_sq(), 0.0, epsilon = 1e-24);
    }

    #[test]
    fn naik_boundary_phase_only_on_edge_sites() {
        let g = grid();
        let u = GaugeField::cold_start(g);
        let imp = StaggeredImpl::new(ImplParams::antiperiodic_time()).unwrap();
        for (one, three) in [
            imp.double_store_naik(&g, &u, &u).unwrap(),
            imp.double_store_fat_long(&g, &u, &u).unwrap(),
        ] {
            for t in 0..4 {
                let c = [0, 0, 0, t];
                let site = g.site_index(&c);
                let eta = staggered_phase(&c, 3);
                let fwd = if t == 3 { -eta } else { eta };
                let bwd = if t == 0 { -eta } else { eta };
                assert_eq!(three.get(site, 0)[3].m[0][0].re, fwd, "forward t={t}");
                assert_eq!(three.get(site, 0)[7].m[0][0].re, bwd, "backward t={t}");
                assert_eq!(one.get(site, 0)[3].m[0][0].re, fwd, "one-hop forward t={t}");
                assert_eq!(one.get(site, 0)[7].m[0][0].re, bwd, "one-hop backward t={t}");
            }
        }
    }

    #[test]
    fn double_store_is_idempotent() {
        let g = grid();
        let thin = GaugeField::hot_start(g, 10);
        let fat = GaugeField::hot_start(g, 11);
        let mut params = ImplParams::antiperiodic_time();
        params.twist_n_2pi_l = [0.5, 0.0, 0.25, 0.0];
        let imp = StaggeredImpl::new(params).unwrap();
        let a = imp.double_store_naik(&g, &thin, &fat).unwrap();
        let b = imp.double_store_naik(&g, &thin, &fat).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn mismatched_gauge_grid_rejected() {
        let g = grid();
        let other = Grid4::new([4, 4, 4, 8]).unwrap();
        let thin = GaugeField::cold_start(g);
        let long = GaugeField::cold_start(other);
        let imp = StaggeredImpl::default();
        assert!(matches!(
            imp.double_store_fat_long(&g, &thin, &long),
            Err(FermionError::ShapeMismatch { .. })
        ));
        assert!(WilsonImpl::default().double_store(&other, &thin).is_err());
    }

    #[test]
    fn wilson_force_insertion_traces_spin() {
        let g = grid();
        let mut seed = 21u64;
        let layout = FieldLayout::half(g, 1, Parity::Even);
        let b = Lattice::<WilsonSpinor>::gaussian(layout, &mut seed);
        let a = Lattice::<WilsonSpinor>::gaussian(layout, &mut seed);
        let mut mat = GaugeField::zeros(FieldLayout::full(g, 1));
        WilsonImpl::default().insert_force_4d(&mut mat, &b, &a, 2).unwrap();

        // Tr over color of the inserted matrix is <a|b> at that site
        let c = g.cb_coords(Parity::Even, 5);
        let full = g.site_index(&c);
        let tr = mat.get(full, 0)[2].trace();
        let expected = a.get(5, 0).inner(b.get(5, 0));
        assert_abs_diff_eq!((tr - expected).norm(), 0.0, epsilon = 1e-12);
        // odd sites untouched
        let odd = g.site_index(&g.cb_coords(Parity::Odd, 5));
        assert_eq!(mat.get(odd, 0)[2], Su3Matrix::ZERO);
    }

    #[test]
    fn wilson_force_5d_sums_slices() {
        let g = Grid4::hypercubic(2).unwrap();
        let mut seed = 4u64;
        let layout = FieldLayout::full(g, 3);
        let b = Lattice::<WilsonSpinor>::gaussian(layout, &mut seed);
        let a = Lattice::<WilsonSpinor>::gaussian(layout, &mut seed);
        let imp = WilsonImpl::default();
        let mut mat5 = GaugeField::zeros(FieldLayout::full(g, 1));
        imp.insert_force_5d(&mut mat5, &b, &a, 0).unwrap();

        let mut sum = Su3Matrix::ZERO;
        for s in 0..3 {
            let mut mat4 = GaugeField::zeros(FieldLayout::full(g, 1));
            imp.insert_force_4d(&mut mat4, &b.extract_slice(s).unwrap(), &a.extract_slice(s).unwrap(), 0)
                .unwrap();
            sum = sum + mat4.get(7, 0)[0];
        }
        assert_abs_diff_eq!((mat5.get(7, 0)[0] - sum).norm_sq(), 0.0, epsilon = 1e-20);
        assert!(imp.insert_force_4d(&mut mat5, &b, &a, 0).is_err());
    }

    #[test]
    fn staggered_force_5d_unsupported() {
        let g = Grid4::hypercubic(2).unwrap();
        let layout = FieldLayout::full(g, 1);
        let v = Lattice::<ColorVector>::zeros(layout);
        let mut mat = GaugeField::zeros(layout);
        let err = StaggeredImpl::default()
            .insert_force_5d(&mut mat, &v, &v, 0)
            .unwrap_err();
        assert!(matches!(err, FermionError::UnsupportedOperation { .. }));
        assert!(StaggeredImpl::default().insert_force_4d(&mut mat, &v, &v, 1).is_ok());
    }
}
