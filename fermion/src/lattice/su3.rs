// SPDX-License-Identifier: AGPL-3.0-only

//! SU(3) link matrices and their action on color vectors.
//!
//! Each link variable `U_μ(x)` is a 3×3 unitary matrix with unit determinant
//! transporting color from `x+μ` to `x`. Doubled gauge fields store products
//! of links with boundary phases folded in, so the arithmetic here is for
//! general complex 3×3 matrices; only `reunitarize` and the random
//! generators assume SU(3).
//!
//! Storage: row-major, `m[row][col]`.
//!
//! # References
//!
//! - Gattringer & Lang, "QCD on the Lattice" (2010), Ch. 2

use std::ops::{Add, Mul, Sub};

use num_complex::Complex64;

use super::constants::{lcg_complex_gaussian, lcg_gaussian, C_I, C_ONE, C_ZERO, LATTICE_DIVISION_GUARD};
use super::field::SiteObject;
use super::spin::ColorVector;

/// 3×3 complex matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
#[must_use]
pub struct Su3Matrix {
    /// Matrix elements m[row][col].
    pub m: [[Complex64; 3]; 3],
}

impl Default for Su3Matrix {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Mul for Su3Matrix {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                let mut s = C_ZERO;
                for k in 0..3 {
                    s += self.m[i][k] * rhs.m[k][j];
                }
                r.m[i][j] = s;
            }
        }
        r
    }
}

impl Add for Su3Matrix {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        let mut r = self;
        for (row, rrow) in r.m.iter_mut().zip(rhs.m.iter()) {
            for (a, b) in row.iter_mut().zip(rrow.iter()) {
                *a += b;
            }
        }
        r
    }
}

impl Sub for Su3Matrix {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        let mut r = self;
        for (row, rrow) in r.m.iter_mut().zip(rhs.m.iter()) {
            for (a, b) in row.iter_mut().zip(rrow.iter()) {
                *a -= b;
            }
        }
        r
    }
}

impl Su3Matrix {
    /// 3×3 identity matrix.
    pub const IDENTITY: Self = Self {
        m: [
            [C_ONE, C_ZERO, C_ZERO],
            [C_ZERO, C_ONE, C_ZERO],
            [C_ZERO, C_ZERO, C_ONE],
        ],
    };

    /// Zero matrix.
    pub const ZERO: Self = Self {
        m: [[C_ZERO; 3]; 3],
    };

    /// Conjugate transpose.
    pub fn adjoint(self) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = self.m[j][i].conj();
            }
        }
        r
    }

    /// Tr(U).
    pub fn trace(self) -> Complex64 {
        self.m[0][0] + self.m[1][1] + self.m[2][2]
    }

    /// Scale by a real number.
    pub fn scale(self, s: f64) -> Self {
        self.scale_complex(Complex64::new(s, 0.0))
    }

    /// Scale by a complex number (boundary phases, twists).
    pub fn scale_complex(self, s: Complex64) -> Self {
        let mut r = self;
        for row in &mut r.m {
            for c in row.iter_mut() {
                *c *= s;
            }
        }
        r
    }

    /// Frobenius norm squared.
    #[must_use]
    pub fn norm_sq(self) -> f64 {
        self.m.iter().flatten().map(|c| c.norm_sqr()).sum()
    }

    /// `U v`.
    #[inline]
    #[must_use]
    pub fn mul_vec(&self, v: &ColorVector) -> ColorVector {
        let mut r = [C_ZERO; 3];
        for (c, out) in r.iter_mut().enumerate() {
            *out = self.m[c][0] * v[0] + self.m[c][1] * v[1] + self.m[c][2] * v[2];
        }
        r
    }

    /// Color outer product `a ⊗ b†`: `r[i][j] = a[i] conj(b[j])`.
    pub fn outer(a: &ColorVector, b: &ColorVector) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = a[i] * b[j].conj();
            }
        }
        r
    }

    /// Project back onto SU(3) via modified Gram-Schmidt.
    pub fn reunitarize(self) -> Self {
        let mut u = self;

        let n0 = row_norm(&u, 0);
        if n0 > LATTICE_DIVISION_GUARD {
            let inv = 1.0 / n0;
            for j in 0..3 {
                u.m[0][j] *= inv;
            }
        }

        let dot01 = row_dot(&u, 0, 1);
        for j in 0..3 {
            let d = u.m[0][j] * dot01;
            u.m[1][j] -= d;
        }
        let n1 = row_norm(&u, 1);
        if n1 > LATTICE_DIVISION_GUARD {
            let inv = 1.0 / n1;
            for j in 0..3 {
                u.m[1][j] *= inv;
            }
        }

        // Row 2 = conj(row 0 × row 1) so det = 1
        u.m[2][0] = (u.m[0][1] * u.m[1][2] - u.m[0][2] * u.m[1][1]).conj();
        u.m[2][1] = (u.m[0][2] * u.m[1][0] - u.m[0][0] * u.m[1][2]).conj();
        u.m[2][2] = (u.m[0][0] * u.m[1][1] - u.m[0][1] * u.m[1][0]).conj();

        u
    }

    /// Random SU(3) matrix near the identity: `exp(i ε H)` to second order,
    /// H traceless Hermitian with Gaussian components, then reunitarized.
    pub fn random_near_identity(seed: &mut u64, epsilon: f64) -> Self {
        let mut h = [[C_ZERO; 3]; 3];
        let mut rand_gauss = || -> f64 { lcg_gaussian(seed) };

        let a3 = rand_gauss() * epsilon;
        let a8 = rand_gauss() * epsilon;
        let s3 = 3.0_f64.sqrt();
        h[0][0] = Complex64::new(a3 + a8 / s3, 0.0);
        h[1][1] = Complex64::new(-a3 + a8 / s3, 0.0);
        h[2][2] = Complex64::new(-2.0 * a8 / s3, 0.0);

        for (i, j) in [(0, 1), (0, 2), (1, 2)] {
            let re = rand_gauss() * epsilon;
            let im = rand_gauss() * epsilon;
            h[i][j] = Complex64::new(re, im);
            h[j][i] = Complex64::new(re, -im);
        }

        let mut result = Self::IDENTITY;
        for (i, row) in result.m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell += C_I * h[i][j];
                let h2_ij = (0..3).fold(C_ZERO, |acc, k| acc + h[i][k] * h[k][j]);
                *cell -= h2_ij * 0.5;
            }
        }

        result.reunitarize()
    }
}

fn row_norm(u: &Su3Matrix, row: usize) -> f64 {
    u.m[row].iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt()
}

fn row_dot(u: &Su3Matrix, r1: usize, r2: usize) -> Complex64 {
    (0..3).fold(C_ZERO, |acc, j| acc + u.m[r1][j].conj() * u.m[r2][j])
}

impl SiteObject for Su3Matrix {
    const ZERO: Self = Self::ZERO;

    fn add_scaled(&mut self, a: Complex64, x: &Self) {
        for (row, xrow) in self.m.iter_mut().zip(x.m.iter()) {
            for (c, xc) in row.iter_mut().zip(xrow.iter()) {
                *c += a * xc;
            }
        }
    }

    fn scaled(&self, a: Complex64) -> Self {
        self.scale_complex(a)
    }

    fn inner(&self, rhs: &Self) -> Complex64 {
        self.m
            .iter()
            .flatten()
            .zip(rhs.m.iter().flatten())
            .fold(C_ZERO, |acc, (a, b)| acc + a.conj() * b)
    }

    fn gaussian(seed: &mut u64) -> Self {
        let mut r = Self::ZERO;
        for c in r.m.iter_mut().flatten() {
            *c = lcg_complex_gaussian(seed);
        }
        r
    }
}

/// Link arrays (gauge fields, doubled gauge fields) are site objects too.
impl<const N: usize> SiteObject for [Su3Matrix; N] {
    const ZERO: Self = [Su3Matrix::ZERO; N];

    fn add_scaled(&mut self, a: Complex64, x: &Self) {
        for (u, v) in self.iter_mut().zip(x.iter()) {
            u.add_scaled(a, v);
        }
    }

    fn scaled(&self, a: Complex64) -> Self {
        let mut r = *self;
        for u in &mut r {
            *u = u.scale_complex(a);
        }
        r
    }

    fn inner(&self, rhs: &Self) -> Complex64 {
        self.iter()
            .zip(rhs.iter())
            .fold(C_ZERO, |acc, (a, b)| acc + a.inner(b))
    }

    fn gaussian(seed: &mut u64) -> Self {
        let mut r = [Su3Matrix::ZERO; N];
        for u in &mut r {
            *u = Su3Matrix::gaussian(seed);
        }
        r
    }
}
