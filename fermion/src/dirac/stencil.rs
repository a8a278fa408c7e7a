// SPDX-License-Identifier: AGPL-3.0-only

//! Nearest-neighbour (and Naik-distance) gathers, and the Wilson hop.
//!
//! A [`Stencil`] is built once per grid and hop length. For every target
//! site it records where each of the `2·Nd` neighbours lives in the input
//! field, for full-lattice fields and for both half checkerboards. Hops of
//! odd length always land on the other parity, so a half-checkerboard input
//! of parity `p` produces output of parity `p.opposite()`.
//!
//! The Wilson hopping term on a 5D field (s-diagonal) is
//!
//!   (K ψ)(x, s) = ½ Σ_μ [ (1 − σγμ) U_μ(x) ψ(x+μ, s) + (1 + σγμ) U_μ(x−μ)† ψ(x−μ, s) ]
//!
//! with `σ = +1` for `K` and `σ = −1` for `K† = γ5 K γ5`. Each term is
//! computed on a half spinor: project, multiply by the link, reconstruct.
//!
//! The staggered hop of length `h` carries no spin structure; the phases
//! live in the doubled links. The kernel is anti-Hermitian whenever the
//! backward slots are the adjoints of the forward ones:
//!
//!   (H ψ)(x) = ½ c Σ_μ [ U_μ(x) ψ(x+hμ) − U_{μ+4}(x) ψ(x−hμ) ]

use num_complex::Complex64;
use rayon::prelude::*;

use super::Dagger;
use crate::error::{FermionError, Result};
use crate::lattice::constants::{N_DIM, N_DOUBLED};
use crate::lattice::field::{Lattice, SiteObject};
use crate::lattice::gauge::DoubledGaugeField;
use crate::lattice::grid::{Checkerboard, FieldLayout, Grid4, Parity};
use crate::lattice::spin::{spin_project, spin_reconstruct_accumulate, ColorVector, WilsonSpinor};

const HALF: Complex64 = Complex64::new(0.5, 0.0);

/// Which hopping terms a kernel accumulates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HopTerms {
    All,
    /// One doubled-link slot: `mu` forward (`disp = +1`) or backward.
    Direction { mu: usize, disp: isize },
}

impl HopTerms {
    fn includes(self, slot: usize) -> bool {
        match self {
            Self::All => true,
            Self::Direction { mu, disp } => {
                let forward = slot < N_DIM;
                slot % N_DIM == mu && forward == (disp > 0)
            }
        }
    }

    fn validate(self) -> Result<()> {
        match self {
            Self::All => Ok(()),
            Self::Direction { mu, disp } if mu < N_DIM && (disp == 1 || disp == -1) => Ok(()),
            Self::Direction { mu, disp } => Err(FermionError::InvalidDirection { mu, disp }),
        }
    }
}

/// Neighbour tables for hops of a fixed length.
#[derive(Clone, Debug)]
pub struct Stencil {
    grid: Grid4,
    full: Vec<[usize; N_DOUBLED]>,
    even: Vec<[usize; N_DOUBLED]>,
    odd: Vec<[usize; N_DOUBLED]>,
}

impl Stencil {
    /// Tables for hops of `hops` sites; slot `d` is direction `d % 4`,
    /// forward for `d < 4`.
    #[must_use]
    pub fn new(grid: Grid4, hops: usize) -> Self {
        let h = hops as isize;
        let table = |coords: &(dyn Fn(usize) -> [usize; N_DIM] + Sync), n: usize, cb: bool| {
            (0..n)
                .into_par_iter()
                .map(|i| {
                    let c = coords(i);
                    let mut nb = [0; N_DOUBLED];
                    for (slot, out) in nb.iter_mut().enumerate() {
                        let disp = if slot < N_DIM { h } else { -h };
                        let nc = grid.shift_coords(&c, slot % N_DIM, disp);
                        *out = if cb { grid.cb_index(&nc) } else { grid.site_index(&nc) };
                    }
                    nb
                })
                .collect::<Vec<_>>()
        };
        let full = table(&|i| grid.site_coords(i), grid.volume(), false);
        let even = table(&|i| grid.cb_coords(Parity::Even, i), grid.half_volume(), true);
        let odd = table(&|i| grid.cb_coords(Parity::Odd, i), grid.half_volume(), true);
        Self {
            grid,
            full,
            even,
            odd,
        }
    }

    #[must_use]
    pub fn grid(&self) -> &Grid4 {
        &self.grid
    }

    /// Output layout for a hop applied to `input`.
    #[must_use]
    pub fn output_layout(&self, input: &FieldLayout) -> FieldLayout {
        match input.checkerboard {
            Checkerboard::Full => *input,
            Checkerboard::Half(p) => input.with_checkerboard(Checkerboard::Half(p.opposite())),
        }
    }

    /// Neighbour table indexed by output site.
    fn table(&self, output: &FieldLayout) -> &[[usize; N_DOUBLED]] {
        match output.checkerboard {
            Checkerboard::Full => &self.full,
            Checkerboard::Half(Parity::Even) => &self.even,
            Checkerboard::Half(Parity::Odd) => &self.odd,
        }
    }

    /// Fail unless `input` lives on this stencil's grid.
    pub fn check_grid(&self, input: &FieldLayout, operation: &'static str) -> Result<()> {
        if input.grid == self.grid {
            Ok(())
        } else {
            Err(FermionError::ShapeMismatch {
                operation,
                expected: format!("{:?}", self.grid.dims()),
                found: input.to_string(),
            })
        }
    }

    /// Drive a gather: for every output site, `kernel(full_site, neighbours, out_block)`
    /// where `neighbours[slot]` indexes the input field's storage and
    /// `full_site` indexes full-lattice fields such as link caches.
    pub fn gather<T, K>(&self, input: &Lattice<T>, kernel: K) -> Lattice<T>
    where
        T: SiteObject,
        K: Fn(usize, &[usize; N_DOUBLED], &mut [T]) + Sync + Send,
    {
        let layout = self.output_layout(input.layout());
        let table = self.table(&layout);
        let ls = layout.ls;
        let grid = self.grid;
        let mut out = Lattice::zeros(layout);
        out.data_mut()
            .par_chunks_mut(ls.max(1))
            .enumerate()
            .for_each(|(site, block)| {
                let full = match layout.checkerboard {
                    Checkerboard::Full => site,
                    Checkerboard::Half(_) => grid.site_index(&layout.site_coords(site)),
                };
                kernel(full, &table[site], block);
            });
        out
    }
}

fn check_links(stencil: &Stencil, links: &DoubledGaugeField, operation: &'static str) -> Result<()> {
    FieldLayout::full(stencil.grid, 1).conformable(links.layout(), operation)
}

/// Wilson hop `K` (or `K†`) restricted to `terms`, s-diagonal on any `Ls`.
pub fn wilson_dhop(
    stencil: &Stencil,
    links: &DoubledGaugeField,
    psi: &Lattice<WilsonSpinor>,
    dag: Dagger,
    terms: HopTerms,
) -> Result<Lattice<WilsonSpinor>> {
    terms.validate()?;
    stencil.check_grid(psi.layout(), "wilson_dhop")?;
    check_links(stencil, links, "wilson_dhop")?;
    let sigma = dag.sign();
    let ls = psi.ls();

    Ok(stencil.gather(psi, |full, nb, block| {
        let u = links.get(full, 0);
        for slot in (0..N_DOUBLED).filter(|&d| terms.includes(d)) {
            let mu = slot % N_DIM;
            let proj = if slot < N_DIM { -sigma } else { sigma };
            let src = psi.site_block(nb[slot]);
            for s in 0..ls {
                let h = spin_project(&src[s], mu, proj);
                let uh = [u[slot].mul_vec(&h[0]), u[slot].mul_vec(&h[1])];
                spin_reconstruct_accumulate(&mut block[s], &uh, mu, proj);
            }
        }
        for v in block.iter_mut() {
            *v = v.scaled(HALF);
        }
    }))
}

/// Staggered hop `c·H` (`c·H† = −c·H` for `Dagger::Yes`) restricted to `terms`.
pub fn staggered_dhop(
    stencil: &Stencil,
    links: &DoubledGaugeField,
    psi: &Lattice<ColorVector>,
    coefficient: f64,
    dag: Dagger,
    terms: HopTerms,
) -> Result<Lattice<ColorVector>> {
    terms.validate()?;
    stencil.check_grid(psi.layout(), "staggered_dhop")?;
    check_links(stencil, links, "staggered_dhop")?;
    let w = 0.5 * coefficient * dag.sign();
    let ls = psi.ls();

    Ok(stencil.gather(psi, |full, nb, block| {
        let u = links.get(full, 0);
        for slot in (0..N_DOUBLED).filter(|&d| terms.includes(d)) {
            let a = Complex64::new(if slot < N_DIM { w } else { -w }, 0.0);
            let src = psi.site_block(nb[slot]);
            for s in 0..ls {
                block[s].add_scaled(a, &u[slot].mul_vec(&src[s]));
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirac::double_store::WilsonImpl;
    use crate::lattice::constants::C_ONE;
    use crate::lattice::gauge::GaugeField;
    use approx::assert_abs_diff_eq;

    fn setup() -> (Stencil, DoubledGaugeField) {
        let g = Grid4::new([4, 2, 2, 4]).unwrap();
        let u = GaugeField::hot_start(g, 31);
        let ds = WilsonImpl::default().double_store(&g, &u).unwrap();
        (Stencil::new(g, 1), ds)
    }

    #[test]
    fn neighbour_tables_match_grid() {
        let g = Grid4::hypercubic(4).unwrap();
        let st = Stencil::new(g, 3);
        let site = g.site_index(&[1, 0, 2, 3]);
        assert_eq!(st.full[site][0], g.neighbor(site, 0, 3));
        assert_eq!(st.full[site][7], g.neighbor(site, 3, -3));
        let c = g.cb_coords(Parity::Odd, 9);
        let n = g.shift_coords(&c, 2, 3);
        assert_eq!(Parity::of(&n), Parity::Even);
        assert_eq!(st.odd[9][2], g.cb_index(&n));
    }

    #[test]
    fn dhop_adjoint_kernel() {
        let (st, ds) = setup();
        let mut seed = 8u64;
        let layout = FieldLayout::full(*st.grid(), 2);
        let x = Lattice::<WilsonSpinor>::gaussian(layout, &mut seed);
        let y = Lattice::<WilsonSpinor>::gaussian(layout, &mut seed);
        let ky = wilson_dhop(&st, &ds, &y, Dagger::No, HopTerms::All).unwrap();
        let kdx = wilson_dhop(&st, &ds, &x, Dagger::Yes, HopTerms::All).unwrap();
        let lhs = kdx.inner_product(&y).unwrap();
        let rhs = x.inner_product(&ky).unwrap();
        assert_abs_diff_eq!((lhs - rhs).norm(), 0.0, epsilon = 1e-10 * lhs.norm().max(1.0));
    }

    #[test]
    fn checkerboarded_dhop_matches_full() {
        let (st, ds) = setup();
        let mut seed = 9u64;
        let layout = FieldLayout::full(*st.grid(), 1);
        let psi = Lattice::<WilsonSpinor>::gaussian(layout, &mut seed);
        let full = wilson_dhop(&st, &ds, &psi, Dagger::No, HopTerms::All).unwrap();
        let odd = psi.pick_checkerboard(Parity::Odd).unwrap();
        let even_out = wilson_dhop(&st, &ds, &odd, Dagger::No, HopTerms::All).unwrap();
        assert_eq!(even_out.checkerboard(), Checkerboard::Half(Parity::Even));
        let even_psi = psi.pick_checkerboard(Parity::Even).unwrap();
        let odd_out = wilson_dhop(&st, &ds, &even_psi, Dagger::No, HopTerms::All).unwrap();

        let mut rebuilt = Lattice::zeros(layout);
        rebuilt.set_checkerboard(&even_out).unwrap();
        rebuilt.set_checkerboard(&odd_out).unwrap();
        let diff = rebuilt.sub(&full).unwrap();
        assert_abs_diff_eq!(diff.norm2(), 0.0, epsilon = 1e-24);
    }

    #[test]
    fn directions_sum_to_full_hop() {
        let (st, ds) = setup();
        let mut seed = 10u64;
        let psi = Lattice::<WilsonSpinor>::gaussian(FieldLayout::full(*st.grid(), 1), &mut seed);
        let full = wilson_dhop(&st, &ds, &psi, Dagger::Yes, HopTerms::All).unwrap();
        let mut sum = Lattice::zeros(*psi.layout());
        for mu in 0..N_DIM {
            for disp in [1, -1] {
                let part =
                    wilson_dhop(&st, &ds, &psi, Dagger::Yes, HopTerms::Direction { mu, disp }).unwrap();
                sum.axpy(C_ONE, &part).unwrap();
            }
        }
        assert_abs_diff_eq!(sum.sub(&full).unwrap().norm2(), 0.0, epsilon = 1e-22);
    }

    #[test]
    fn staggered_hop_is_antihermitian() {
        let g = Grid4::hypercubic(4).unwrap();
        let u = GaugeField::hot_start(g, 32);
        let ds = crate::dirac::double_store::StaggeredImpl::default()
            .double_store(&g, &u)
            .unwrap();
        let st = Stencil::new(g, 1);
        let mut seed = 11u64;
        let layout = FieldLayout::full(g, 1);
        let x = Lattice::<ColorVector>::gaussian(layout, &mut seed);
        let y = Lattice::<ColorVector>::gaussian(layout, &mut seed);
        let hy = staggered_dhop(&st, &ds, &y, 1.0, Dagger::No, HopTerms::All).unwrap();
        let hx = staggered_dhop(&st, &ds, &x, 1.0, Dagger::No, HopTerms::All).unwrap();
        let lhs = x.inner_product(&hy).unwrap();
        let rhs = hx.inner_product(&y).unwrap();
        assert_abs_diff_eq!((lhs + rhs).norm(), 0.0, epsilon = 1e-10 * lhs.norm().max(1.0));

        let hdag = staggered_dhop(&st, &ds, &y, 1.0, Dagger::Yes, HopTerms::All).unwrap();
        assert_abs_diff_eq!(hdag.add(&hy).unwrap().norm2(), 0.0, epsilon = 1e-24);
    }

    #[test]
    fn rejects_foreign_grid_and_bad_direction() {
        let (st, ds) = setup();
        let other = Grid4::hypercubic(2).unwrap();
        let psi = Lattice::<WilsonSpinor>::zeros(FieldLayout::full(other, 1));
        assert!(wilson_dhop(&st, &ds, &psi, Dagger::No, HopTerms::All).is_err());
        let psi = Lattice::<WilsonSpinor>::zeros(FieldLayout::full(*st.grid(), 1));
        let bad = HopTerms::Direction { mu: 0, disp: 2 };
        assert!(matches!(
            wilson_dhop(&st, &ds, &psi, Dagger::No, bad),
            Err(FermionError::InvalidDirection { mu: 0, disp: 2 })
        ));
    }
}
