// SPDX-License-Identifier: AGPL-3.0-only

//! Cartesian 4D grid, red-black checkerboarding and field layouts.
//!
//! Site ordering is x fastest: `idx = x + Lx*(y + Ly*(z + Lz*t))`.
//! A half-checkerboard field stores only the sites of one parity, indexed by
//! `x/2 + (Lx/2)*(y + Ly*(z + Lz*t))`; every extent is even, so each
//! (y, z, t) row holds exactly `Lx/2` sites of either parity.
//!
//! Five-dimensional fermion fields add an `Ls` extent that runs fastest
//! (`index = site*Ls + s`). Their checkerboard is the 4D parity, since the
//! continued-fraction operator couples flavour slices only on-site.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::constants::N_DIM;
use crate::error::{FermionError, Result};

/// Sublattice of a site: parity of its coordinate sum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    /// Parity of `x + y + z + t`.
    #[must_use]
    pub fn of(coords: &[usize; N_DIM]) -> Self {
        if coords.iter().sum::<usize>() % 2 == 0 {
            Self::Even
        } else {
            Self::Odd
        }
    }

    /// The other sublattice.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Even => Self::Odd,
            Self::Odd => Self::Even,
        }
    }

    fn bit(self) -> usize {
        match self {
            Self::Even => 0,
            Self::Odd => 1,
        }
    }
}

/// Which sites a field stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Checkerboard {
    Full,
    Half(Parity),
}

/// Periodic 4D lattice with even extents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Grid4 {
    dims: [usize; N_DIM],
    volume: usize,
}

impl Grid4 {
    /// Create a grid; every extent must be even and at least 2 so the
    /// checkerboard is consistent with periodic boundaries.
    pub fn new(dims: [usize; N_DIM]) -> Result<Self> {
        for &l in &dims {
            if l < 2 || l % 2 != 0 {
                return Err(FermionError::InvalidParameter {
                    name: "grid extent",
                    value: l as f64,
                    reason: "extents must be even and at least 2",
                });
            }
        }
        Ok(Self {
            dims,
            volume: dims.iter().product(),
        })
    }

    /// `L⁴` hypercube.
    pub fn hypercubic(l: usize) -> Result<Self> {
        Self::new([l; N_DIM])
    }

    /// Global extents per axis.
    #[must_use]
    pub fn dims(&self) -> [usize; N_DIM] {
        self.dims
    }

    #[must_use]
    pub fn volume(&self) -> usize {
        self.volume
    }

    #[must_use]
    pub fn half_volume(&self) -> usize {
        self.volume / 2
    }

    #[must_use]
    pub fn site_index(&self, c: &[usize; N_DIM]) -> usize {
        let d = &self.dims;
        c[0] + d[0] * (c[1] + d[1] * (c[2] + d[2] * c[3]))
    }

    #[must_use]
    pub fn site_coords(&self, idx: usize) -> [usize; N_DIM] {
        let d = &self.dims;
        let x = idx % d[0];
        let rest = idx / d[0];
        let y = rest % d[1];
        let rest = rest / d[1];
        let z = rest % d[2];
        let t = rest / d[2];
        [x, y, z, t]
    }

    /// Coordinates displaced by `disp` along `mu`, periodic.
    #[must_use]
    pub fn shift_coords(&self, c: &[usize; N_DIM], mu: usize, disp: isize) -> [usize; N_DIM] {
        let mut r = *c;
        let l = self.dims[mu] as isize;
        r[mu] = (c[mu] as isize + disp).rem_euclid(l) as usize;
        r
    }

    /// Full-lattice index of the neighbour `disp` steps along `mu`.
    #[must_use]
    pub fn neighbor(&self, idx: usize, mu: usize, disp: isize) -> usize {
        let c = self.site_coords(idx);
        self.site_index(&self.shift_coords(&c, mu, disp))
    }

    /// Index of a site within its own checkerboard.
    #[must_use]
    pub fn cb_index(&self, c: &[usize; N_DIM]) -> usize {
        let d = &self.dims;
        c[0] / 2 + (d[0] / 2) * (c[1] + d[1] * (c[2] + d[2] * c[3]))
    }

    /// Inverse of [`cb_index`](Self::cb_index) for a given parity.
    #[must_use]
    pub fn cb_coords(&self, parity: Parity, idx: usize) -> [usize; N_DIM] {
        let d = &self.dims;
        let hx = d[0] / 2;
        let xh = idx % hx;
        let rest = idx / hx;
        let y = rest % d[1];
        let rest = rest / d[1];
        let z = rest % d[2];
        let t = rest / d[2];
        let x = 2 * xh + (parity.bit() + y + z + t) % 2;
        [x, y, z, t]
    }
}

/// Shape of a field: grid, fifth extent and stored checkerboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldLayout {
    pub grid: Grid4,
    pub ls: usize,
    pub checkerboard: Checkerboard,
}

impl FieldLayout {
    #[must_use]
    pub fn full(grid: Grid4, ls: usize) -> Self {
        Self {
            grid,
            ls,
            checkerboard: Checkerboard::Full,
        }
    }

    #[must_use]
    pub fn half(grid: Grid4, ls: usize, parity: Parity) -> Self {
        Self {
            grid,
            ls,
            checkerboard: Checkerboard::Half(parity),
        }
    }

    /// Same grid and `Ls`, different checkerboard.
    #[must_use]
    pub fn with_checkerboard(self, checkerboard: Checkerboard) -> Self {
        Self {
            checkerboard,
            ..self
        }
    }

    /// Number of 4D sites stored.
    #[must_use]
    pub fn sites(&self) -> usize {
        match self.checkerboard {
            Checkerboard::Full => self.grid.volume(),
            Checkerboard::Half(_) => self.grid.half_volume(),
        }
    }

    /// Total number of site objects (`sites * Ls`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.sites() * self.ls
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinates of the `i`-th stored site.
    #[must_use]
    pub fn site_coords(&self, i: usize) -> [usize; N_DIM] {
        match self.checkerboard {
            Checkerboard::Full => self.grid.site_coords(i),
            Checkerboard::Half(p) => self.grid.cb_coords(p, i),
        }
    }

    /// Storage index of a site, or `None` if this layout does not hold it.
    #[must_use]
    pub fn site_of(&self, c: &[usize; N_DIM]) -> Option<usize> {
        match self.checkerboard {
            Checkerboard::Full => Some(self.grid.site_index(c)),
            Checkerboard::Half(p) if Parity::of(c) == p => Some(self.grid.cb_index(c)),
            Checkerboard::Half(_) => None,
        }
    }

    /// Fail with `ShapeMismatch` unless `other` has exactly this layout.
    pub fn conformable(&self, other: &Self, operation: &'static str) -> Result<()> {
        if self == other {
            Ok(())
        } else {
            Err(FermionError::ShapeMismatch {
                operation,
                expected: self.to_string(),
                found: other.to_string(),
            })
        }
    }

    /// Fail unless this layout stores one checkerboard; return its parity.
    pub fn require_half(&self, operation: &'static str) -> Result<Parity> {
        match self.checkerboard {
            Checkerboard::Half(p) => Ok(p),
            Checkerboard::Full => Err(FermionError::ShapeMismatch {
                operation,
                expected: "half-checkerboard field".into(),
                found: self.to_string(),
            }),
        }
    }

    /// Fail unless this layout stores the full lattice.
    pub fn require_full(&self, operation: &'static str) -> Result<()> {
        match self.checkerboard {
            Checkerboard::Full => Ok(()),
            Checkerboard::Half(_) => Err(FermionError::ShapeMismatch {
                operation,
                expected: "full-lattice field".into(),
                found: self.to_string(),
            }),
        }
    }
}

impl fmt::Display for FieldLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cb = match self.checkerboard {
            Checkerboard::Full => "full",
            Checkerboard::Half(Parity::Even) => "even",
            Checkerboard::Half(Parity::Odd) => "odd",
        };
        write!(f, "{:?} Ls={} cb={cb}", self.grid.dims(), self.ls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_odd_extent() {
        assert!(Grid4::new([4, 4, 3, 4]).is_err());
        assert!(Grid4::new([0, 4, 4, 4]).is_err());
        assert!(Grid4::new([2, 4, 6, 8]).is_ok());
    }

    #[test]
    fn site_index_roundtrip() {
        let g = Grid4::new([4, 2, 6, 4]).unwrap();
        for idx in 0..g.volume() {
            assert_eq!(g.site_index(&g.site_coords(idx)), idx);
        }
    }

    #[test]
    fn neighbor_periodic() {
        let g = Grid4::hypercubic(4).unwrap();
        let origin = g.site_index(&[0, 0, 0, 0]);
        assert_eq!(g.site_coords(g.neighbor(origin, 0, -1)), [3, 0, 0, 0]);
        assert_eq!(g.site_coords(g.neighbor(origin, 3, 1)), [0, 0, 0, 1]);
        assert_eq!(g.site_coords(g.neighbor(origin, 2, 3)), [0, 0, 3, 0]);
        assert_eq!(g.site_coords(g.neighbor(origin, 1, -3)), [0, 1, 0, 0]);
    }

    #[test]
    fn checkerboard_indexing_is_bijective() {
        let g = Grid4::new([4, 2, 2, 6]).unwrap();
        for parity in [Parity::Even, Parity::Odd] {
            let mut seen = vec![false; g.half_volume()];
            for i in 0..g.half_volume() {
                let c = g.cb_coords(parity, i);
                assert_eq!(Parity::of(&c), parity);
                assert_eq!(g.cb_index(&c), i);
                assert!(!seen[i]);
                seen[i] = true;
            }
        }
    }

    #[test]
    fn half_layout_site_lookup() {
        let g = Grid4::hypercubic(4).unwrap();
        let even = FieldLayout::half(g, 3, Parity::Even);
        assert_eq!(even.len(), 128 * 3);
        assert!(even.site_of(&[1, 0, 0, 0]).is_none());
        assert_eq!(even.site_of(&[0, 0, 0, 0]), Some(0));
    }

    #[test]
    fn conformable_reports_both_layouts() {
        let g4 = Grid4::hypercubic(4).unwrap();
        let g8 = Grid4::new([4, 4, 4, 8]).unwrap();
        let a = FieldLayout::full(g4, 1);
        let b = FieldLayout::full(g8, 1);
        let err = a.conformable(&b, "axpy").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("axpy"));
        assert!(msg.contains("[4, 4, 4, 8] Ls=1 cb=full"));
    }

    #[test]
    fn require_half_and_full() {
        let g = Grid4::hypercubic(2).unwrap();
        assert!(FieldLayout::full(g, 1).require_half("meooe").is_err());
        assert_eq!(
            FieldLayout::half(g, 1, Parity::Odd).require_half("meooe").unwrap(),
            Parity::Odd
        );
        assert!(FieldLayout::half(g, 1, Parity::Odd).require_full("m").is_err());
    }
}
