// SPDX-License-Identifier: AGPL-3.0-only

//! Gauge fields: four SU(3) links per site, and their doubled forms.
//!
//! `U_μ(x)` lives on the link from `x` to `x+μ`. A [`DoubledGaugeField`]
//! stores `2·Nd` matrices per site, forward links in slots `0..4` and
//! backward links `U_μ(x−μ)†` in slots `4..8`, with phases folded in.
//!
//! # References
//!
//! - Gattringer & Lang, "QCD on the Lattice" (2010), Ch. 3

use rayon::prelude::*;

use super::constants::{HOT_START_EPSILON, N_DIM, N_DOUBLED};
use super::field::Lattice;
use super::grid::{FieldLayout, Grid4};
use super::su3::Su3Matrix;
use crate::error::{FermionError, Result};

/// `U_μ(x)` for all four directions.
pub type GaugeField = Lattice<[Su3Matrix; N_DIM]>;

/// One link matrix per site (a single Lorentz component, or a product of links).
pub type GaugeLinkField = Lattice<Su3Matrix>;

/// Forward and backward hopping links per site.
pub type DoubledGaugeField = Lattice<[Su3Matrix; N_DOUBLED]>;

impl Lattice<[Su3Matrix; N_DIM]> {
    /// All links = identity (ordered configuration).
    #[must_use]
    pub fn cold_start(grid: Grid4) -> Self {
        Self::from_fn(FieldLayout::full(grid, 1), |_, _| [Su3Matrix::IDENTITY; N_DIM])
    }

    /// Random SU(3) links (disordered configuration), reproducible from `seed`.
    #[must_use]
    pub fn hot_start(grid: Grid4, seed: u64) -> Self {
        Self::hot_start_with(grid, seed, HOT_START_EPSILON)
    }

    /// Random SU(3) links at distance `epsilon` from the identity.
    #[must_use]
    pub fn hot_start_with(grid: Grid4, seed: u64, epsilon: f64) -> Self {
        let mut rng = seed;
        let layout = FieldLayout::full(grid, 1);
        let mut u = Self::zeros(layout);
        for links in u.data_mut() {
            for l in links.iter_mut() {
                *l = Su3Matrix::random_near_identity(&mut rng, epsilon);
            }
        }
        u
    }

    /// Extract `U_μ`.
    pub fn peek_lorentz(&self, mu: usize) -> Result<GaugeLinkField> {
        check_mu(mu)?;
        let data = self.data().par_iter().map(|links| links[mu]).collect();
        GaugeLinkField::from_vec(*self.layout(), data)
    }

    /// Overwrite `U_μ`.
    pub fn poke_lorentz(&mut self, link: &GaugeLinkField, mu: usize) -> Result<()> {
        check_mu(mu)?;
        self.layout().conformable(link.layout(), "poke_lorentz")?;
        self.data_mut()
            .par_iter_mut()
            .zip(link.data().par_iter())
            .for_each(|(links, u)| links[mu] = *u);
        Ok(())
    }

    /// Plaquette `U_μ(x) U_ν(x+μ) U_μ(x+ν)† U_ν(x)†`.
    #[must_use]
    pub fn plaquette(&self, site: usize, mu: usize, nu: usize) -> Su3Matrix {
        let grid = self.grid();
        let x_mu = grid.neighbor(site, mu, 1);
        let x_nu = grid.neighbor(site, nu, 1);
        let u1 = self.get(site, 0)[mu];
        let u2 = self.get(x_mu, 0)[nu];
        let u3 = self.get(x_nu, 0)[mu].adjoint();
        let u4 = self.get(site, 0)[nu].adjoint();
        u1 * u2 * u3 * u4
    }

    /// `<Re Tr P / 3>` over all plaquettes; 1 on a cold start.
    #[must_use]
    pub fn average_plaquette(&self) -> f64 {
        let vol = self.grid().volume();
        let sum: f64 = (0..vol)
            .into_par_iter()
            .map(|site| {
                let mut s = 0.0;
                for mu in 0..N_DIM {
                    for nu in (mu + 1)..N_DIM {
                        s += self.plaquette(site, mu, nu).trace().re / 3.0;
                    }
                }
                s
            })
            .sum();
        sum / (vol * 6) as f64
    }

    /// Gauge rotation `U_μ(x) → g(x) U_μ(x) g(x+μ)†`.
    pub fn gauge_transform(&self, g: &GaugeLinkField) -> Result<Self> {
        self.layout().conformable(g.layout(), "gauge_transform")?;
        let grid = *self.grid();
        Ok(Self::from_fn(*self.layout(), |c, _| {
            let site = grid.site_index(c);
            let links = self.get(site, 0);
            let mut out = [Su3Matrix::ZERO; N_DIM];
            for (mu, o) in out.iter_mut().enumerate() {
                let fwd = grid.neighbor(site, mu, 1);
                *o = *g.get(site, 0) * links[mu] * g.get(fwd, 0).adjoint();
            }
            out
        }))
    }
}

impl Lattice<Su3Matrix> {
    /// Independent random SU(3) matrix per site, reproducible from `seed`.
    #[must_use]
    pub fn random(grid: Grid4, seed: u64) -> Self {
        let mut rng = seed;
        let mut g = Self::zeros(FieldLayout::full(grid, 1));
        for u in g.data_mut() {
            *u = Su3Matrix::random_near_identity(&mut rng, HOT_START_EPSILON);
        }
        g
    }

    /// Site-wise conjugate transpose.
    #[must_use]
    pub fn adjoint(&self) -> Self {
        self.map(|u| u.adjoint())
    }

    /// Site-wise product `self(x) · rhs(x)`.
    pub fn mul_sitewise(&self, rhs: &Self) -> Result<Self> {
        self.conformable(rhs, "mul_sitewise")?;
        let data = self
            .data()
            .par_iter()
            .zip(rhs.data().par_iter())
            .map(|(a, b)| *a * *b)
            .collect();
        Self::from_vec(*self.layout(), data)
    }
}

/// Covariant forward shift: `link(x) · field(x+μ)`.
pub fn cov_shift_forward(
    link: &GaugeLinkField,
    mu: usize,
    field: &GaugeLinkField,
) -> Result<GaugeLinkField> {
    check_mu(mu)?;
    link.mul_sitewise(&field.cshift(mu, 1)?)
}

fn check_mu(mu: usize) -> Result<()> {
    if mu < N_DIM {
        Ok(())
    } else {
        Err(FermionError::InvalidDirection { mu, disp: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn grid() -> Grid4 {
        Grid4::hypercubic(4).unwrap()
    }

    #[test]
    fn cold_start_plaquette_is_one() {
        let u = GaugeField::cold_start(grid());
        assert_abs_diff_eq!(u.average_plaquette(), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn hot_start_plaquette_below_one() {
        let u = GaugeField::hot_start(grid(), 42);
        let p = u.average_plaquette();
        assert!(p < 1.0, "hot start plaquette should be < 1.0, got {p}");
        assert!(p > -1.0, "plaquette should be > -1.0, got {p}");
        assert_eq!(u, GaugeField::hot_start(grid(), 42));
    }

    #[test]
    fn peek_poke_roundtrip() {
        let u = GaugeField::hot_start(grid(), 7);
        let mut v = GaugeField::cold_start(grid());
        for mu in 0..N_DIM {
            v.poke_lorentz(&u.peek_lorentz(mu).unwrap(), mu).unwrap();
        }
        assert_eq!(u, v);
        assert!(u.peek_lorentz(4).is_err());
    }

    #[test]
    fn cov_shift_forward_builds_two_link_product() {
        let g = grid();
        let u = GaugeField::hot_start(g, 9);
        let u1 = u.peek_lorentz(2).unwrap();
        let uu = cov_shift_forward(&u1, 2, &u1).unwrap();
        let site = g.site_index(&[1, 2, 3, 0]);
        let next = g.neighbor(site, 2, 1);
        let expected = *u1.get(site, 0) * *u1.get(next, 0);
        assert_abs_diff_eq!((*uu.get(site, 0) - expected).norm_sq(), 0.0, epsilon = 1e-24);
    }

    #[test]
    fn gauge_transform_preserves_plaquette() {
        let g = grid();
        let u = GaugeField::hot_start(g, 11);
        let rot = GaugeLinkField::random(g, 77);
        let v = u.gauge_transform(&rot).unwrap();
        assert_abs_diff_eq!(v.average_plaquette(), u.average_plaquette(), epsilon = 1e-12);
        assert!(v.inner_product(&u).unwrap().re < u.norm2());
    }
}
