// SPDX-License-Identifier: AGPL-3.0-only

//! Continued-fraction coefficients for the 5D overlap operator.
//!
//! The target is an odd rational approximation `ε(x) ≈ sign(x)` written as
//! the continued fraction
//!
//!   ε(x) = β_{L−1} x + 1 / (β_{L−2} x + 1 / ( … + 1 / (β_0 x)))
//!
//! with `L = Ls` odd. Two sources of `β` are supported:
//!
//! - **tanh**: `ε(x) = tanh(L · artanh x)`, whose continued fraction is known
//!   in closed form (Lambert).
//! - **Zolotarev**: a supplied partial-fraction table
//!   `ε(x) = a x + Σ_k r_k x / (x² + p_k)` (optimal minimax coefficients from
//!   elliptic functions), converted to `β` by the polynomial Euclid algorithm.
//!
//! From `β`, the operator mass and `M5`, [`ContinuedFractionCoefficients`]
//! derives the per-slice weights of the flavour-tridiagonal block and the
//! `See`/`Aee` recursion used by its analytic inverse.
//!
//! # References
//!
//! - Kennedy, "Algorithms for dynamical fermions", hep-lat/0607038
//! - van den Eshof et al., Comput. Phys. Commun. 146, 203 (2002)

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::params::ImplParams;
use crate::error::{FermionError, Result};

/// One term `residue · x / (x² + pole)` of a partial-fraction expansion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartialFractionPole {
    pub pole: f64,
    pub residue: f64,
}

/// Odd rational function `ε(x) = leading·x + Σ residue·x / (x² + pole)`.
///
/// Its degree (numerator degree) is `2·poles.len() + 1`, which is the number
/// of flavour slices of the continued fraction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RationalApproximation {
    pub leading: f64,
    pub poles: Vec<PartialFractionPole>,
    /// Maximum deviation `|1 − ε(x)|` on the approximation interval; zero when unknown.
    #[serde(default)]
    pub delta: f64,
}

impl RationalApproximation {
    /// Partial fractions of `tanh(n · artanh x)` for odd `n`:
    /// leading `1/n`, poles `cot²(πk/n)`, residues `2 / (n sin²(πk/n))`.
    pub fn tanh(order: usize) -> Result<Self> {
        check_order(order)?;
        let n = order as f64;
        let poles = (1..=(order - 1) / 2)
            .map(|k| {
                let theta = std::f64::consts::PI * k as f64 / n;
                let (s, c) = theta.sin_cos();
                PartialFractionPole {
                    pole: (c / s).powi(2),
                    residue: 2.0 / (n * s * s),
                }
            })
            .collect();
        Ok(Self {
            leading: 1.0 / n,
            poles,
            delta: 0.0,
        })
    }

    /// Numerator degree, i.e. the number of continued-fraction terms.
    #[must_use]
    pub fn degree(&self) -> usize {
        2 * self.poles.len() + 1
    }

    #[must_use]
    pub fn eval(&self, x: f64) -> f64 {
        self.leading * x
            + self
                .poles
                .iter()
                .map(|p| p.residue * x / (x * x + p.pole))
                .sum::<f64>()
    }

    /// Leading coefficient, poles and residues must all be positive and finite.
    pub fn validate(&self) -> Result<()> {
        positive("leading", self.leading)?;
        for p in &self.poles {
            positive("pole", p.pole)?;
            positive("residue", p.residue)?;
        }
        Ok(())
    }

    /// `β_0 … β_{L−1}` by polynomial Euclid on `ε = N(x)/D(x)`.
    pub fn continued_fraction(&self) -> Result<Vec<f64>> {
        self.validate()?;

        let mut den = vec![1.0];
        for p in &self.poles {
            den = mul_quadratic(&den, p.pole);
        }
        let mut num = vec![0.0; den.len() + 1];
        for (i, d) in den.iter().enumerate() {
            num[i + 1] += self.leading * d;
        }
        for (k, pk) in self.poles.iter().enumerate() {
            let mut q = vec![1.0];
            for (j, pj) in self.poles.iter().enumerate() {
                if j != k {
                    q = mul_quadratic(&q, pj.pole);
                }
            }
            for (i, qi) in q.iter().enumerate() {
                num[i + 1] += pk.residue * qi;
            }
        }

        // X/Y = b x + R/Y, continue with Y/R; parity drops deg R to deg Y − 1.
        let mut beta = Vec::with_capacity(self.degree());
        let (mut x, mut y) = (num, den);
        loop {
            let b = leading_coeff(&x) / leading_coeff(&y);
            beta.push(b);
            if y.len() == 1 {
                break;
            }
            let mut r = x.clone();
            for (i, yi) in y.iter().enumerate() {
                r[i + 1] -= b * yi;
            }
            r.truncate(x.len() - 2);
            let lead = leading_coeff(&r);
            if !lead.is_finite() || lead.abs() <= f64::EPSILON * leading_coeff(&x).abs() {
                return Err(FermionError::InvalidParameter {
                    name: "rational approximation",
                    value: lead,
                    reason: "table has no continued-fraction form",
                });
            }
            x = y;
            y = r;
        }
        beta.reverse();
        Ok(beta)
    }
}

fn mul_quadratic(p: &[f64], c: f64) -> Vec<f64> {
    let mut r = vec![0.0; p.len() + 2];
    for (i, a) in p.iter().enumerate() {
        r[i] += c * a;
        r[i + 2] += a;
    }
    r
}

fn leading_coeff(p: &[f64]) -> f64 {
    p.last().copied().unwrap_or(0.0)
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FermionError::InvalidParameter {
            name,
            value,
            reason: "must be positive and finite",
        })
    }
}

fn check_order(order: usize) -> Result<()> {
    if order == 0 {
        Err(FermionError::InvalidOrder {
            order,
            reason: "at least one flavour slice is required",
        })
    } else if order % 2 == 0 {
        Err(FermionError::InvalidOrder {
            order,
            reason: "continued fraction needs an odd number of slices",
        })
    } else {
        Ok(())
    }
}

/// Closed-form `β` for `tanh(n · artanh x)`, `n = order` odd.
///
/// With `c_0 = 1/n`, `b_k = (2k+1) c_k`, `c_{k+1} = 1 / (c_k (n² − (k+1)²))`,
/// the outermost term is `b_0` and `β_{n−1−k} = b_k`.
pub fn tanh_betas(order: usize) -> Result<Vec<f64>> {
    check_order(order)?;
    let n = order as f64;
    let mut beta = vec![0.0; order];
    let mut c = 1.0 / n;
    for k in 0..order {
        beta[order - 1 - k] = c * (2 * k + 1) as f64;
        if k + 1 < order {
            let a = n * n - ((k + 1) * (k + 1)) as f64;
            c = 1.0 / (c * a);
        }
    }
    Ok(beta)
}

/// Evaluate `β_{L−1} x + 1/(β_{L−2} x + … + 1/(β_0 x))`.
#[must_use]
pub fn eval_continued_fraction(beta: &[f64], x: f64) -> f64 {
    beta.iter()
        .skip(1)
        .fold(beta.first().map_or(0.0, |b| b * x), |acc, b| b * x + 1.0 / acc)
}

/// `Aee[s] = (−1)^s β[s] dw_diag`, plus `R` on the last slice.
#[must_use]
pub fn aee_coefficients(beta: &[f64], dw_diag: f64, r: f64) -> Vec<f64> {
    let mut aee: Vec<f64> = beta
        .iter()
        .enumerate()
        .map(|(s, b)| alternating(s) * b * dw_diag)
        .collect();
    if let Some(last) = aee.last_mut() {
        *last += r;
    }
    aee
}

/// Pivots of the flavour block: `See[0] = Aee[0]`, `See[s] = Aee[s] − 1/See[s−1]`.
#[must_use]
pub fn see_coefficients(aee: &[f64]) -> Vec<f64> {
    let mut see: Vec<f64> = Vec::with_capacity(aee.len());
    for (s, a) in aee.iter().enumerate() {
        let v = if s == 0 { *a } else { a - 1.0 / see[s - 1] };
        see.push(v);
    }
    see
}

fn alternating(s: usize) -> f64 {
    if s % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

/// Per-slice coefficients of the continued-fraction operator.
#[derive(Clone, Debug, PartialEq)]
pub struct ContinuedFractionCoefficients {
    pub beta: Vec<f64>,
    /// `1/β`.
    pub cc: Vec<f64>,
    /// `√cc`, with the last slice fixed to 1.
    pub cc_d: Vec<f64>,
    /// Off-diagonal flavour couplings; zero past the last slice.
    pub sqrt_cc: Vec<f64>,
    pub aee: Vec<f64>,
    pub see: Vec<f64>,
    /// Weight of `γ5 Dw` on each slice.
    pub hop: Vec<f64>,
    /// Weight of `γ5` on each slice of the site-diagonal block.
    pub diag: Vec<f64>,
    /// `(1 + mass)/(1 − mass)`.
    pub r: f64,
    pub zolo_hi_inv: f64,
    /// `(4 − M5) / zolo_hi`.
    pub dw_diag: f64,
    pub mass: f64,
}

impl ContinuedFractionCoefficients {
    pub fn from_betas(beta: Vec<f64>, mass: f64, m5: f64, zolo_hi: f64) -> Result<Self> {
        let ls = beta.len();
        check_order(ls)?;
        if !zolo_hi.is_finite() || zolo_hi <= 0.0 {
            return Err(FermionError::InvalidScale {
                name: "zolo_hi",
                value: zolo_hi,
            });
        }
        if !mass.is_finite() || mass == 1.0 {
            return Err(FermionError::InvalidParameter {
                name: "mass",
                value: mass,
                reason: "(1 + mass)/(1 − mass) must be finite",
            });
        }
        if !m5.is_finite() {
            return Err(FermionError::InvalidParameter {
                name: "M5",
                value: m5,
                reason: "must be finite",
            });
        }
        for &b in &beta {
            positive("beta", b)?;
        }

        let r = (1.0 + mass) / (1.0 - mass);
        let zolo_hi_inv = 1.0 / zolo_hi;
        let dw_diag = (4.0 - m5) * zolo_hi_inv;

        let cc: Vec<f64> = beta.iter().map(|b| 1.0 / b).collect();
        let mut cc_d: Vec<f64> = cc.iter().map(|c| c.sqrt()).collect();
        cc_d[ls - 1] = 1.0;

        let mut sqrt_cc = vec![0.0; ls];
        for i in 0..ls.saturating_sub(2) {
            sqrt_cc[i] = (cc[i] * cc[i + 1]).sqrt();
        }
        if ls >= 2 {
            sqrt_cc[ls - 2] = cc[ls - 2].sqrt();
        }

        let aee = aee_coefficients(&beta, dw_diag, r);
        let see = see_coefficients(&aee);
        if let Some((s, &v)) = see
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v == 0.0)
        {
            return Err(FermionError::InvalidParameter {
                name: "See",
                value: v,
                reason: if s == 0 {
                    "flavour block is singular on the first slice"
                } else {
                    "flavour block is singular"
                },
            });
        }

        let weight = |s: usize, scale: f64| {
            if s + 1 < ls {
                cc[s] * beta[s] * alternating(s) * scale
            } else {
                beta[s] * scale
            }
        };
        let hop = (0..ls).map(|s| weight(s, zolo_hi_inv)).collect();
        let diag = (0..ls).map(|s| weight(s, dw_diag)).collect();

        for s in 0..ls {
            debug!(s, beta = beta[s], aee = aee[s], see = see[s], "continued fraction slice");
        }

        Ok(Self {
            beta,
            cc,
            cc_d,
            sqrt_cc,
            aee,
            see,
            hop,
            diag,
            r,
            zolo_hi_inv,
            dw_diag,
            mass,
        })
    }

    /// Number of flavour slices.
    #[must_use]
    pub fn ls(&self) -> usize {
        self.beta.len()
    }
}

/// Source of continued-fraction `β` for a given number of slices.
///
/// This is the hook a concrete continued-fraction operator must supply;
/// the operator cannot be built without one.
pub trait ContinuedFractionScheme: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Upper spectral bound; the kernel is rescaled by its inverse.
    fn zolo_hi(&self) -> f64;

    fn betas(&self, ls: usize) -> Result<Vec<f64>>;

    /// Full coefficient set for `ls` slices.
    fn coefficients(&self, ls: usize, mass: f64, m5: f64) -> Result<ContinuedFractionCoefficients> {
        check_order(ls)?;
        let beta = self.betas(ls)?;
        ContinuedFractionCoefficients::from_betas(beta, mass, m5, self.zolo_hi())
    }
}

/// `ε(x) = tanh(Ls · artanh(scale · x))`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TanhScheme {
    pub scale: f64,
}

impl TanhScheme {
    pub fn new(scale: f64) -> Result<Self> {
        let s = Self { scale };
        s.validate()?;
        Ok(s)
    }

    fn validate(&self) -> Result<()> {
        if self.scale.is_finite() && self.scale > 0.0 {
            Ok(())
        } else {
            Err(FermionError::InvalidScale {
                name: "scale",
                value: self.scale,
            })
        }
    }
}

impl ContinuedFractionScheme for TanhScheme {
    fn name(&self) -> &'static str {
        "tanh"
    }

    fn zolo_hi(&self) -> f64 {
        1.0 / self.scale
    }

    fn betas(&self, ls: usize) -> Result<Vec<f64>> {
        self.validate()?;
        tanh_betas(ls)
    }
}

/// Zolotarev optimal rational approximation on `[lo, zolo_hi]`, supplied as
/// a partial-fraction table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZolotarevScheme {
    pub zolo_hi: f64,
    pub approximation: RationalApproximation,
}

impl ZolotarevScheme {
    pub fn new(zolo_hi: f64, approximation: RationalApproximation) -> Result<Self> {
        let s = Self {
            zolo_hi,
            approximation,
        };
        s.validate()?;
        Ok(s)
    }

    fn validate(&self) -> Result<()> {
        if !self.zolo_hi.is_finite() || self.zolo_hi <= 0.0 {
            return Err(FermionError::InvalidScale {
                name: "zolo_hi",
                value: self.zolo_hi,
            });
        }
        self.approximation.validate()
    }
}

impl ContinuedFractionScheme for ZolotarevScheme {
    fn name(&self) -> &'static str {
        "zolotarev"
    }

    fn zolo_hi(&self) -> f64 {
        self.zolo_hi
    }

    fn betas(&self, ls: usize) -> Result<Vec<f64>> {
        self.validate()?;
        if self.approximation.degree() != ls {
            return Err(FermionError::InvalidOrder {
                order: ls,
                reason: "rational approximation degree does not match Ls",
            });
        }
        debug!(
            degree = self.approximation.degree(),
            delta = self.approximation.delta,
            "converting Zolotarev table"
        );
        self.approximation.continued_fraction()
    }
}

/// Serializable choice of scheme.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApproximationConfig {
    Tanh(TanhScheme),
    Zolotarev(ZolotarevScheme),
}

impl ContinuedFractionScheme for ApproximationConfig {
    fn name(&self) -> &'static str {
        match self {
            Self::Tanh(s) => s.name(),
            Self::Zolotarev(s) => s.name(),
        }
    }

    fn zolo_hi(&self) -> f64 {
        match self {
            Self::Tanh(s) => s.zolo_hi(),
            Self::Zolotarev(s) => s.zolo_hi(),
        }
    }

    fn betas(&self, ls: usize) -> Result<Vec<f64>> {
        match self {
            Self::Tanh(s) => s.betas(ls),
            Self::Zolotarev(s) => s.betas(ls),
        }
    }
}

/// Everything needed to build a continued-fraction operator besides the gauge field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContinuedFractionParams {
    pub ls: usize,
    pub mass: f64,
    pub m5: f64,
    pub approximation: ApproximationConfig,
    #[serde(default)]
    pub boundary: ImplParams,
}
