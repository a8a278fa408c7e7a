// SPDX-License-Identifier: AGPL-3.0-only

//! Centralized constants for the lattice layer and the Dirac operators.
//!
//! Collects color/spin/dimension counts, the LCG PRNG used for reproducible
//! random fields, and numerical guards shared by `su3.rs`, `field.rs` and
//! the `dirac` kernels.

use num_complex::Complex64;

/// Number of colors in QCD (SU(3)).
pub const N_COLORS: usize = 3;

/// Number of spacetime dimensions.
pub const N_DIM: usize = 4;

/// Number of Dirac spin components of a Wilson fermion.
pub const N_SPIN: usize = 4;

/// Number of stored hopping links per site: forward and backward per direction.
pub const N_DOUBLED: usize = 2 * N_DIM;

/// Complex zero, usable in `const` contexts.
pub const C_ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Complex one, usable in `const` contexts.
pub const C_ONE: Complex64 = Complex64::new(1.0, 0.0);

/// Imaginary unit, usable in `const` contexts.
pub const C_I: Complex64 = Complex64::new(0.0, 1.0);

/// LCG multiplier (Knuth MMIX).
pub const LCG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;

/// LCG increment (Knuth MMIX).
pub const LCG_INCREMENT: u64 = 1_442_695_040_888_963_407;

/// `(seed >> 11) as f64 / LCG_53_DIVISOR` gives a uniform deviate with 53 bits.
pub const LCG_53_DIVISOR: f64 = (1u64 << 53) as f64;

/// Division guard for reunitarization and Box-Muller.
///
/// Well below any physical lattice scale.
pub const LATTICE_DIVISION_GUARD: f64 = 1e-30;

/// Hot-start perturbation scale for SU(3) link matrices.
pub const HOT_START_EPSILON: f64 = 1.5;

/// Advance the LCG state by one step.
#[inline]
pub fn lcg_step(seed: &mut u64) {
    *seed = seed.wrapping_mul(LCG_MULTIPLIER).wrapping_add(LCG_INCREMENT);
}

/// Generate a uniform f64 in [0, 1) from 53 bits of LCG state.
#[inline]
pub fn lcg_uniform_f64(seed: &mut u64) -> f64 {
    lcg_step(seed);
    (*seed >> 11) as f64 / LCG_53_DIVISOR
}

/// Box-Muller Gaussian deviate N(0, 1) from two LCG draws.
#[inline]
pub fn lcg_gaussian(seed: &mut u64) -> f64 {
    let u1 = lcg_uniform_f64(seed);
    let u2 = lcg_uniform_f64(seed);
    (-2.0 * u1.max(LATTICE_DIVISION_GUARD).ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Complex Gaussian deviate with independent N(0, 1) real and imaginary parts.
#[inline]
pub fn lcg_complex_gaussian(seed: &mut u64) -> Complex64 {
    let re = lcg_gaussian(seed);
    let im = lcg_gaussian(seed);
    Complex64::new(re, im)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lcg_step_deterministic() {
        let mut a = 42u64;
        let mut b = 42u64;
        lcg_step(&mut a);
        lcg_step(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn lcg_uniform_in_range() {
        let mut seed = 12345u64;
        for _ in 0..1000 {
            let v = lcg_uniform_f64(&mut seed);
            assert!((0.0..1.0).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    #[allow(clippy::assertions_on_constants)]
    fn doubled_link_count() {
        assert_eq!(N_DOUBLED, 8);
        assert_eq!(N_SPIN, 4);
        assert_eq!(N_COLORS, 3);
    }

    #[test]
    fn complex_gaussian_is_finite_and_centered() {
        let mut seed = 7u64;
        let n = 10_000;
        let mut sum = C_ZERO;
        for _ in 0..n {
            let z = lcg_complex_gaussian(&mut seed);
            assert!(z.re.is_finite() && z.im.is_finite());
            sum += z;
        }
        let mean = sum / n as f64;
        assert!(mean.norm() < 0.1, "mean should be near 0, got {mean}");
    }
}
