// SPDX-License-Identifier: AGPL-3.0-only

//! Lattice fields: one small algebraic object per site (and flavour slice).
//!
//! `Lattice<T>` is the minimal single-process field container the operators
//! need: conformable linear algebra, checkerboard pick/set, periodic shifts
//! and fifth-dimension slicing. Site loops run on the rayon pool.

use std::fmt::Debug;

use num_complex::Complex64;
use rayon::prelude::*;

use super::constants::{C_ONE, C_ZERO, N_DIM};
use super::grid::{Checkerboard, FieldLayout, Grid4, Parity};
use crate::error::{FermionError, Result};

/// Per-site payload: a fixed-size vector space over ℂ with an inner product.
pub trait SiteObject: Copy + Send + Sync + Debug + 'static {
    const ZERO: Self;

    /// `self += a x`.
    fn add_scaled(&mut self, a: Complex64, x: &Self);

    /// `a self`.
    fn scaled(&self, a: Complex64) -> Self;

    /// `<self|rhs>`, conjugate-linear in `self`.
    fn inner(&self, rhs: &Self) -> Complex64;

    /// Independent complex Gaussian components.
    fn gaussian(seed: &mut u64) -> Self;
}

/// A field over the sites selected by its [`FieldLayout`].
///
/// Storage is site-major with the flavour index fastest:
/// `data[site * ls + s]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Lattice<T> {
    layout: FieldLayout,
    data: Vec<T>,
}

impl<T: SiteObject> Lattice<T> {
    /// Zero field.
    #[must_use]
    pub fn zeros(layout: FieldLayout) -> Self {
        Self {
            layout,
            data: vec![T::ZERO; layout.len()],
        }
    }

    /// Gaussian random field, reproducible from `seed`.
    #[must_use]
    pub fn gaussian(layout: FieldLayout, seed: &mut u64) -> Self {
        let data = (0..layout.len()).map(|_| T::gaussian(seed)).collect();
        Self { layout, data }
    }

    /// Build a field from `f(coords, s)`, evaluated in parallel.
    pub fn from_fn<F>(layout: FieldLayout, f: F) -> Self
    where
        F: Fn(&[usize; N_DIM], usize) -> T + Sync + Send,
    {
        let ls = layout.ls;
        let mut data = vec![T::ZERO; layout.len()];
        data.par_chunks_mut(ls.max(1))
            .enumerate()
            .for_each(|(site, block)| {
                let c = layout.site_coords(site);
                for (s, v) in block.iter_mut().enumerate() {
                    *v = f(&c, s);
                }
            });
        Self { layout, data }
    }

    /// Wrap existing storage; the length must match the layout.
    pub fn from_vec(layout: FieldLayout, data: Vec<T>) -> Result<Self> {
        if data.len() != layout.len() {
            return Err(FermionError::ShapeMismatch {
                operation: "Lattice::from_vec",
                expected: format!("{} site objects", layout.len()),
                found: format!("{} site objects", data.len()),
            });
        }
        Ok(Self { layout, data })
    }

    #[must_use]
    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    #[must_use]
    pub fn grid(&self) -> &Grid4 {
        &self.layout.grid
    }

    #[must_use]
    pub fn ls(&self) -> usize {
        self.layout.ls
    }

    #[must_use]
    pub fn checkerboard(&self) -> Checkerboard {
        self.layout.checkerboard
    }

    #[must_use]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Flavour block of a stored site.
    #[must_use]
    pub fn site_block(&self, site: usize) -> &[T] {
        let ls = self.layout.ls;
        &self.data[site * ls..(site + 1) * ls]
    }

    /// Object at a stored site and flavour slice.
    #[must_use]
    pub fn get(&self, site: usize, s: usize) -> &T {
        &self.data[site * self.layout.ls + s]
    }

    pub fn get_mut(&mut self, site: usize, s: usize) -> &mut T {
        let ls = self.layout.ls;
        &mut self.data[site * ls + s]
    }

    /// Object at the given coordinates, if this layout stores that site.
    #[must_use]
    pub fn at(&self, c: &[usize; N_DIM], s: usize) -> Option<&T> {
        self.layout.site_of(c).map(|site| self.get(site, s))
    }

    /// Fail with `ShapeMismatch` unless both fields share a layout.
    pub fn conformable(&self, other: &Self, operation: &'static str) -> Result<()> {
        self.layout.conformable(&other.layout, operation)
    }

    /// `<self|other>` summed over all sites and slices.
    pub fn inner_product(&self, other: &Self) -> Result<Complex64> {
        self.conformable(other, "inner_product")?;
        Ok(self
            .data
            .par_iter()
            .zip(other.data.par_iter())
            .map(|(a, b)| a.inner(b))
            .reduce(|| C_ZERO, |a, b| a + b))
    }

    /// `<self|self>`.
    #[must_use]
    pub fn norm2(&self) -> f64 {
        self.data.par_iter().map(|a| a.inner(a).re).sum()
    }

    /// `self += a x`.
    pub fn axpy(&mut self, a: Complex64, x: &Self) -> Result<()> {
        self.conformable(x, "axpy")?;
        self.data
            .par_iter_mut()
            .zip(x.data.par_iter())
            .for_each(|(y, x)| y.add_scaled(a, x));
        Ok(())
    }

    /// `self + other`.
    pub fn add(&self, other: &Self) -> Result<Self> {
        let mut r = self.clone();
        r.axpy(C_ONE, other)?;
        Ok(r)
    }

    /// `self - other`.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        let mut r = self.clone();
        r.axpy(-C_ONE, other)?;
        Ok(r)
    }

    /// `a self`.
    #[must_use]
    pub fn scale(&self, a: Complex64) -> Self {
        Self {
            layout: self.layout,
            data: self.data.par_iter().map(|v| v.scaled(a)).collect(),
        }
    }

    /// Apply `f` to every site object, in parallel.
    #[must_use]
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(&T) -> T + Sync + Send,
    {
        Self {
            layout: self.layout,
            data: self.data.par_iter().map(f).collect(),
        }
    }

    /// Sites of one parity from a full field.
    pub fn pick_checkerboard(&self, parity: Parity) -> Result<Self> {
        self.layout.require_full("pick_checkerboard")?;
        let half = self.layout.with_checkerboard(Checkerboard::Half(parity));
        let grid = self.layout.grid;
        let ls = self.layout.ls;
        let mut data = vec![T::ZERO; half.len()];
        data.par_chunks_mut(ls.max(1))
            .enumerate()
            .for_each(|(i, block)| {
                let full = grid.site_index(&grid.cb_coords(parity, i));
                block.copy_from_slice(&self.data[full * ls..(full + 1) * ls]);
            });
        Ok(Self { layout: half, data })
    }

    /// Overwrite the sites of `half`'s parity in this full field.
    pub fn set_checkerboard(&mut self, half: &Self) -> Result<()> {
        self.layout.require_full("set_checkerboard")?;
        let parity = half.layout.require_half("set_checkerboard")?;
        let expected = self.layout.with_checkerboard(Checkerboard::Half(parity));
        expected.conformable(&half.layout, "set_checkerboard")?;
        let grid = self.layout.grid;
        let ls = self.layout.ls;
        for i in 0..grid.half_volume() {
            let full = grid.site_index(&grid.cb_coords(parity, i));
            self.data[full * ls..(full + 1) * ls].copy_from_slice(half.site_block(i));
        }
        Ok(())
    }

    /// Periodic shift: `out(x) = self(x + disp·μ̂)`.
    pub fn cshift(&self, mu: usize, disp: isize) -> Result<Self> {
        self.layout.require_full("cshift")?;
        if mu >= N_DIM {
            return Err(FermionError::InvalidDirection { mu, disp });
        }
        let grid = self.layout.grid;
        let ls = self.layout.ls;
        let mut data = vec![T::ZERO; self.layout.len()];
        data.par_chunks_mut(ls.max(1))
            .enumerate()
            .for_each(|(site, block)| {
                let src = grid.neighbor(site, mu, disp);
                block.copy_from_slice(&self.data[src * ls..(src + 1) * ls]);
            });
        Ok(Self {
            layout: self.layout,
            data,
        })
    }

    /// Flavour slice `s` as an `Ls = 1` field on the same checkerboard.
    pub fn extract_slice(&self, s: usize) -> Result<Self> {
        self.check_slice(s, "extract_slice")?;
        let ls = self.layout.ls;
        let layout = FieldLayout { ls: 1, ..self.layout };
        let data = self.data.iter().skip(s).step_by(ls).copied().collect();
        Ok(Self { layout, data })
    }

    /// Overwrite flavour slice `s` with an `Ls = 1` field on the same checkerboard.
    pub fn insert_slice(&mut self, slice: &Self, s: usize) -> Result<()> {
        self.check_slice(s, "insert_slice")?;
        let expected = FieldLayout { ls: 1, ..self.layout };
        expected.conformable(&slice.layout, "insert_slice")?;
        let ls = self.layout.ls;
        for (block, v) in self.data.chunks_mut(ls).zip(slice.data.iter()) {
            block[s] = *v;
        }
        Ok(())
    }

    fn check_slice(&self, s: usize, operation: &'static str) -> Result<()> {
        if s < self.layout.ls {
            Ok(())
        } else {
            Err(FermionError::ShapeMismatch {
                operation,
                expected: format!("slice index < {}", self.layout.ls),
                found: format!("slice index {s}"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::spin::{ColorVector, WilsonSpinor};
    use approx::assert_abs_diff_eq;

    fn grid() -> Grid4 {
        Grid4::new([4, 2, 2, 4]).unwrap()
    }

    #[test]
    fn inner_product_is_hermitian() {
        let mut seed = 1u64;
        let layout = FieldLayout::full(grid(), 3);
        let a = Lattice::<WilsonSpinor>::gaussian(layout, &mut seed);
        let b = Lattice::<WilsonSpinor>::gaussian(layout, &mut seed);
        let ab = a.inner_product(&b).unwrap();
        let ba = b.inner_product(&a).unwrap();
        assert_abs_diff_eq!((ab - ba.conj()).norm(), 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(a.inner_product(&a).unwrap().re, a.norm2(), epsilon = 1e-9);
    }

    #[test]
    fn mismatched_layouts_rejected() {
        let mut seed = 2u64;
        let a = Lattice::<ColorVector>::gaussian(FieldLayout::full(grid(), 1), &mut seed);
        let b = Lattice::<ColorVector>::zeros(FieldLayout::full(grid(), 2));
        assert!(matches!(
            a.inner_product(&b),
            Err(FermionError::ShapeMismatch { operation: "inner_product", .. })
        ));
        let mut c = a.clone();
        assert!(c.axpy(C_ONE, &b).is_err());
    }

    #[test]
    fn checkerboard_pick_set_roundtrip() {
        let mut seed = 3u64;
        let layout = FieldLayout::full(grid(), 2);
        let a = Lattice::<ColorVector>::gaussian(layout, &mut seed);
        let even = a.pick_checkerboard(Parity::Even).unwrap();
        let odd = a.pick_checkerboard(Parity::Odd).unwrap();
        let mut b = Lattice::<ColorVector>::zeros(layout);
        b.set_checkerboard(&even).unwrap();
        b.set_checkerboard(&odd).unwrap();
        assert_eq!(a, b);
        assert_abs_diff_eq!(even.norm2() + odd.norm2(), a.norm2(), epsilon = 1e-9);
    }

    #[test]
    fn set_checkerboard_rejects_full_source() {
        let layout = FieldLayout::full(grid(), 1);
        let mut a = Lattice::<ColorVector>::zeros(layout);
        let b = a.clone();
        assert!(a.set_checkerboard(&b).is_err());
    }

    #[test]
    fn cshift_moves_values() {
        let g = grid();
        let layout = FieldLayout::full(g, 1);
        let a = Lattice::<ColorVector>::from_fn(layout, |c, _| {
            [Complex64::new(c[0] as f64, c[3] as f64), C_ZERO, C_ZERO]
        });
        let fwd = a.cshift(0, 1).unwrap();
        let back = a.cshift(3, -1).unwrap();
        let origin = g.site_index(&[0, 0, 0, 0]);
        assert_eq!(fwd.get(origin, 0)[0], Complex64::new(1.0, 0.0));
        assert_eq!(back.get(origin, 0)[0], Complex64::new(0.0, 3.0));
        assert_eq!(a.cshift(1, 2).unwrap(), a);
    }

    #[test]
    fn cshift_rejects_bad_direction() {
        let a = Lattice::<ColorVector>::zeros(FieldLayout::full(grid(), 1));
        assert!(matches!(
            a.cshift(4, 1),
            Err(FermionError::InvalidDirection { mu: 4, disp: 1 })
        ));
    }

    #[test]
    fn slice_insert_extract() {
        let mut seed = 5u64;
        let g = grid();
        let four = Lattice::<WilsonSpinor>::gaussian(FieldLayout::half(g, 1, Parity::Odd), &mut seed);
        let mut five = Lattice::<WilsonSpinor>::zeros(FieldLayout::half(g, 5, Parity::Odd));
        five.insert_slice(&four, 4).unwrap();
        assert_eq!(five.extract_slice(4).unwrap(), four);
        assert_abs_diff_eq!(five.extract_slice(0).unwrap().norm2(), 0.0);
        assert!(five.extract_slice(5).is_err());
    }
}
