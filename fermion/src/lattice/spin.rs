// SPDX-License-Identifier: AGPL-3.0-only

//! Spin structure of Wilson-type fermions.
//!
//! Euclidean gamma matrices in the chiral basis, with `γ5 = diag(1, 1, −1, −1)`.
//! Every γμ has exactly one non-zero entry per row, so a matrix is stored as
//! a column permutation plus a phase per row. The permutation is an
//! involution pairing an upper spin row (0, 1) with a lower one (2, 3), which
//! is what makes the half-spinor trick work: `(1 ± γμ)ψ` has rank two and is
//! fully determined by its upper two components.

use num_complex::Complex64;

use super::constants::{lcg_complex_gaussian, C_I, C_ONE, C_ZERO, N_COLORS, N_DIM, N_SPIN};
use super::field::SiteObject;

/// Color triplet carried by a staggered fermion (one per site).
pub type ColorVector = [Complex64; N_COLORS];

/// Four-component Wilson spinor, spin-major: `psi[spin][color]`.
pub type WilsonSpinor = [ColorVector; N_SPIN];

/// Upper two spin components of a projected spinor.
pub type HalfSpinor = [ColorVector; 2];

const M_ONE: Complex64 = Complex64::new(-1.0, 0.0);
const M_I: Complex64 = Complex64::new(0.0, -1.0);

/// Gamma matrix with one non-zero entry per row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gamma {
    /// Column of the non-zero entry in each row.
    pub col: [usize; N_SPIN],
    /// Value of that entry.
    pub phase: [Complex64; N_SPIN],
}

impl Gamma {
    pub const X: Self = Self {
        col: [3, 2, 1, 0],
        phase: [C_I, C_I, M_I, M_I],
    };
    pub const Y: Self = Self {
        col: [3, 2, 1, 0],
        phase: [M_ONE, C_ONE, C_ONE, M_ONE],
    };
    pub const Z: Self = Self {
        col: [2, 3, 0, 1],
        phase: [C_I, M_I, M_I, C_I],
    };
    pub const T: Self = Self {
        col: [2, 3, 0, 1],
        phase: [C_ONE, C_ONE, C_ONE, C_ONE],
    };
    pub const FIVE: Self = Self {
        col: [0, 1, 2, 3],
        phase: [C_ONE, C_ONE, M_ONE, M_ONE],
    };

    /// Dense matrix element `γ[row][col]`.
    #[must_use]
    pub fn element(&self, row: usize, col: usize) -> Complex64 {
        if self.col[row] == col {
            self.phase[row]
        } else {
            C_ZERO
        }
    }

    /// `γ ψ`.
    #[must_use]
    pub fn apply(&self, psi: &WilsonSpinor) -> WilsonSpinor {
        let mut out = [[C_ZERO; N_COLORS]; N_SPIN];
        for (r, row) in out.iter_mut().enumerate() {
            let src = &psi[self.col[r]];
            for c in 0..N_COLORS {
                row[c] = self.phase[r] * src[c];
            }
        }
        out
    }
}

/// γ0..γ3 indexed by lattice direction (x, y, z, t).
pub const GAMMA_MU: [Gamma; N_DIM] = [Gamma::X, Gamma::Y, Gamma::Z, Gamma::T];

/// `γ5 ψ`: flip the sign of the lower two spin components.
#[inline]
#[must_use]
pub fn gamma5(psi: &WilsonSpinor) -> WilsonSpinor {
    let mut out = *psi;
    for row in &mut out[2..] {
        for c in row.iter_mut() {
            *c = -*c;
        }
    }
    out
}

/// Upper half of `(1 + sign·γμ) ψ`.
#[inline]
#[must_use]
pub fn spin_project(psi: &WilsonSpinor, mu: usize, sign: f64) -> HalfSpinor {
    let g = &GAMMA_MU[mu];
    let mut h = [[C_ZERO; N_COLORS]; 2];
    for (r, hr) in h.iter_mut().enumerate() {
        let ph = g.phase[r] * sign;
        let src = &psi[g.col[r]];
        for c in 0..N_COLORS {
            hr[c] = psi[r][c] + ph * src[c];
        }
    }
    h
}

/// Add the full spinor `(1 + sign·γμ)ψ`, given its projected upper half, to `out`.
#[inline]
pub fn spin_reconstruct_accumulate(out: &mut WilsonSpinor, h: &HalfSpinor, mu: usize, sign: f64) {
    let g = &GAMMA_MU[mu];
    for r in 0..2 {
        for c in 0..N_COLORS {
            out[r][c] += h[r][c];
        }
    }
    for r in 2..N_SPIN {
        let ph = g.phase[r] * sign;
        let src = &h[g.col[r]];
        for c in 0..N_COLORS {
            out[r][c] += ph * src[c];
        }
    }
}

impl SiteObject for ColorVector {
    const ZERO: Self = [C_ZERO; N_COLORS];

    fn add_scaled(&mut self, a: Complex64, x: &Self) {
        for (c, xc) in self.iter_mut().zip(x.iter()) {
            *c += a * xc;
        }
    }

    fn scaled(&self, a: Complex64) -> Self {
        let mut r = *self;
        for c in &mut r {
            *c *= a;
        }
        r
    }

    fn inner(&self, rhs: &Self) -> Complex64 {
        self.iter()
            .zip(rhs.iter())
            .fold(C_ZERO, |acc, (a, b)| acc + a.conj() * b)
    }

    fn gaussian(seed: &mut u64) -> Self {
        [
            lcg_complex_gaussian(seed),
            lcg_complex_gaussian(seed),
            lcg_complex_gaussian(seed),
        ]
    }
}

impl SiteObject for WilsonSpinor {
    const ZERO: Self = [[C_ZERO; N_COLORS]; N_SPIN];

    fn add_scaled(&mut self, a: Complex64, x: &Self) {
        for (row, xrow) in self.iter_mut().zip(x.iter()) {
            row.add_scaled(a, xrow);
        }
    }

    fn scaled(&self, a: Complex64) -> Self {
        let mut r = *self;
        for row in &mut r {
            *row = row.scaled(a);
        }
        r
    }

    fn inner(&self, rhs: &Self) -> Complex64 {
        self.iter()
            .zip(rhs.iter())
            .fold(C_ZERO, |acc, (a, b)| acc + a.inner(b))
    }

    fn gaussian(seed: &mut u64) -> Self {
        let mut r = Self::ZERO;
        for row in &mut r {
            *row = ColorVector::gaussian(seed);
        }
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn dense_mul(a: &Gamma, b: &Gamma, i: usize, j: usize) -> Complex64 {
        (0..N_SPIN).fold(C_ZERO, |acc, k| acc + a.element(i, k) * b.element(k, j))
    }

    #[test]
    fn clifford_algebra() {
        for mu in 0..N_DIM {
            for nu in 0..N_DIM {
                for i in 0..N_SPIN {
                    for j in 0..N_SPIN {
                        let anti = dense_mul(&GAMMA_MU[mu], &GAMMA_MU[nu], i, j)
                            + dense_mul(&GAMMA_MU[nu], &GAMMA_MU[mu], i, j);
                        let expected = if mu == nu && i == j { 2.0 } else { 0.0 };
                        assert_abs_diff_eq!(anti.re, expected, epsilon = 1e-15);
                        assert_abs_diff_eq!(anti.im, 0.0, epsilon = 1e-15);
                    }
                }
            }
        }
    }

    #[test]
    fn gammas_hermitian() {
        for g in GAMMA_MU.iter().chain(std::iter::once(&Gamma::FIVE)) {
            for i in 0..N_SPIN {
                for j in 0..N_SPIN {
                    let d = g.element(i, j) - g.element(j, i).conj();
                    assert_abs_diff_eq!(d.norm(), 0.0, epsilon = 1e-15);
                }
            }
        }
    }

    #[test]
    fn gamma5_is_product_of_four() {
        // γ5 = γx γy γz γt in this basis
        for i in 0..N_SPIN {
            for j in 0..N_SPIN {
                let mut acc = C_ZERO;
                for a in 0..N_SPIN {
                    for b in 0..N_SPIN {
                        for c in 0..N_SPIN {
                            acc += Gamma::X.element(i, a)
                                * Gamma::Y.element(a, b)
                                * Gamma::Z.element(b, c)
                                * Gamma::T.element(c, j);
                        }
                    }
                }
                let d = acc - Gamma::FIVE.element(i, j);
                assert_abs_diff_eq!(d.norm(), 0.0, epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn gamma5_anticommutes() {
        let mut seed = 17u64;
        let psi = WilsonSpinor::gaussian(&mut seed);
        for g in &GAMMA_MU {
            let a = gamma5(&g.apply(&psi));
            let b = g.apply(&gamma5(&psi));
            for s in 0..N_SPIN {
                for c in 0..N_COLORS {
                    assert_abs_diff_eq!((a[s][c] + b[s][c]).norm(), 0.0, epsilon = 1e-14);
                }
            }
        }
    }

    #[test]
    fn projection_matches_dense_projector() {
        let mut seed = 99u64;
        let psi = WilsonSpinor::gaussian(&mut seed);
        for mu in 0..N_DIM {
            for sign in [1.0, -1.0] {
                let h = spin_project(&psi, mu, sign);
                let mut full = WilsonSpinor::ZERO;
                spin_reconstruct_accumulate(&mut full, &h, mu, sign);

                let gpsi = GAMMA_MU[mu].apply(&psi);
                for s in 0..N_SPIN {
                    for c in 0..N_COLORS {
                        let expected = psi[s][c] + gpsi[s][c] * sign;
                        assert_abs_diff_eq!((full[s][c] - expected).norm(), 0.0, epsilon = 1e-14);
                    }
                }
            }
        }
    }

    #[test]
    fn spinor_inner_is_conjugate_linear() {
        let mut seed = 4u64;
        let a = WilsonSpinor::gaussian(&mut seed);
        let b = WilsonSpinor::gaussian(&mut seed);
        let z = Complex64::new(0.3, -1.2);
        let lhs = a.scaled(z).inner(&b);
        let rhs = z.conj() * a.inner(&b);
        assert_abs_diff_eq!((lhs - rhs).norm(), 0.0, epsilon = 1e-12);
    }
}
