// SPDX-License-Identifier: AGPL-3.0-only

//! Continued-fraction overlap and improved staggered operator validation.
//!
//! Checks the algebraic identities every solver built on these operators
//! relies on, on a hot 4⁴ configuration with antiperiodic time boundary.
//!
//! # Validation targets
//!
//! | Identity | Expected | Basis |
//! |----------|----------|-------|
//! | Closed-form tanh β vs Euclid of partial fractions | equal | Same rational function |
//! | Continued fraction vs tanh(Ls artanh x) | equal | Definition |
//! | Flavour-block Schur complement | R + ε(x) | Eliminating slices 0..Ls−1 |
//! | `<M† x, y> = <x, M y>` | 0 | Adjoint |
//! | `M = Mooee − Meooe` per checkerboard | 0 | Red-black split |
//! | `Mooee MooeeInv = 1` | 0 | LDLᵀ sweep |
//! | `Σ Mdir = M − Mooee` | 0 | Direction decomposition |
//! | Staggered `M = Mooee + Meooe` | 0 | Red-black split |
//!
//! Set `RUST_LOG=hotspring_fermion=debug` to see per-slice coefficients.

use hotspring_fermion::dirac::approx::{eval_continued_fraction, tanh_betas};
use hotspring_fermion::dirac::{
    ContinuedFractionScheme, FermionOperator, ImplParams, ImprovedStaggeredFermion,
    RationalApproximation, StaggeredLinks, TanhFermion5D, TanhScheme, ZolotarevFermion5D,
    ZolotarevScheme,
};
use hotspring_fermion::lattice::{GaugeField, Grid4, Lattice, Parity};
use hotspring_fermion::tolerances;
use hotspring_fermion::validation::ValidationHarness;
use hotspring_fermion::Result;
use num_complex::Complex64;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LS: usize = 7;
const MASS: f64 = 0.05;
const M5: f64 = 1.8;
const SCALE: f64 = 0.5;

fn adjoint_defect<O: FermionOperator>(op: &O, x: &Lattice<O::Site>, y: &Lattice<O::Site>) -> Result<f64> {
    let lhs = op.mdag(x)?.inner_product(y)?;
    let rhs = x.inner_product(&op.m(y)?)?;
    Ok((lhs - rhs).norm() / rhs.norm())
}

/// `|M ψ − (Mooee + sign·Meooe) ψ|² / |ψ|²`, reassembled from both parities.
fn checkerboard_defect<O: FermionOperator>(op: &O, psi: &Lattice<O::Site>, sign: f64) -> Result<f64> {
    let full = op.m(psi)?;
    let mut worst: f64 = 0.0;
    for parity in [Parity::Even, Parity::Odd] {
        let same = psi.pick_checkerboard(parity)?;
        let other = psi.pick_checkerboard(parity.opposite())?;
        let mut split = op.mooee(&same)?;
        split.axpy(Complex64::new(sign, 0.0), &op.meooe(&other)?)?;
        let diff = full.pick_checkerboard(parity)?.sub(&split)?;
        worst = worst.max(diff.norm2() / psi.norm2());
    }
    Ok(worst)
}

fn hermiticity_defect<O: FermionOperator>(op: &O, psi: &Lattice<O::Site>) -> Result<f64> {
    Ok(op.m(psi)?.sub(&op.mdag(psi)?)?.norm2() / psi.norm2())
}

fn mooee_inverse_defect<O: FermionOperator>(op: &O, psi: &Lattice<O::Site>) -> Result<f64> {
    let a = op.mooee(&op.mooee_inv(psi)?)?.sub(psi)?.norm2();
    let b = op.mooee_dag(&op.mooee_inv_dag(psi)?)?.sub(psi)?.norm2();
    Ok(a.max(b) / psi.norm2())
}

fn direction_sum_defect<O: FermionOperator>(op: &O, psi: &Lattice<O::Site>) -> Result<f64> {
    let mut sum = Lattice::zeros(*psi.layout());
    for hop in op.mdir_all(psi)? {
        sum.axpy(Complex64::new(1.0, 0.0), &hop)?;
    }
    let expected = op.m(psi)?.sub(&op.mooee(psi)?)?;
    Ok(sum.sub(&expected)?.norm2() / psi.norm2())
}

fn operator_checks<O: FermionOperator>(
    harness: &mut ValidationHarness,
    name: &str,
    op: &O,
    psi: &Lattice<O::Site>,
    chi: &Lattice<O::Site>,
    cb_sign: f64,
) {
    harness.check_upper_result(
        &format!("{name} adjoint"),
        adjoint_defect(op, psi, chi),
        tolerances::ADJOINT_REL,
    );
    harness.check_upper_result(
        &format!("{name} checkerboard split"),
        checkerboard_defect(op, psi, cb_sign),
        tolerances::CHECKERBOARD_REL,
    );
    harness.check_upper_result(
        &format!("{name} Mooee inverse"),
        mooee_inverse_defect(op, psi),
        tolerances::MOOEE_INVERSE_REL,
    );
    harness.check_upper_result(
        &format!("{name} direction sum"),
        direction_sum_defect(op, psi),
        tolerances::DIRECTION_SUM_REL,
    );
}

fn max_rel(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| ((x - y) / y).abs())
        .fold(0.0, f64::max)
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hotspring_fermion=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  Continued-Fraction Overlap + Improved Staggered Validation  ║");
    println!("║  Neuberger PRL 81 (1998); Borici-Edwards-Kennedy (2004)     ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let mut harness = ValidationHarness::new("continued_fraction");
    let t_start = Instant::now();

    // ═══ Coefficients ═══
    println!("═══ Continued-Fraction Coefficients ═══");
    for ls in [3, 5, 7, 9] {
        let closed = match tanh_betas(ls) {
            Ok(b) => b,
            Err(e) => {
                harness.check_upper_result(&format!("tanh β Ls={ls}"), Err(e), 0.0);
                continue;
            }
        };
        let euclid = RationalApproximation::tanh(ls).and_then(|r| r.continued_fraction());
        harness.check_upper_result(
            &format!("β closed form vs Euclid Ls={ls}"),
            euclid.map(|e| max_rel(&e, &closed)),
            tolerances::BETA_EUCLID_REL,
        );
        for x in [0.2, 0.6, 0.9] {
            let exact = (ls as f64 * f64::atanh(x)).tanh();
            harness.check_rel(
                &format!("ε({x}) Ls={ls}"),
                eval_continued_fraction(&closed, x),
                exact,
                tolerances::CONTINUED_FRACTION_REL,
            );
        }
        println!("  Ls={ls}: β = {closed:.6?}");
    }

    // Scalar kernel w: eliminating slices 0..Ls−1 leaves R + tanh(Ls artanh(w/zolo_hi)).
    let scheme = TanhScheme { scale: SCALE };
    for w in [0.3, 1.1] {
        let schur = scheme.coefficients(LS, MASS, M5).map(|c| {
            let a: Vec<f64> = c.hop.iter().map(|h| h * w).collect();
            let mut pivot = a[0];
            for s in 1..LS {
                let extra = if s == LS - 1 { c.r } else { 0.0 };
                pivot = a[s] + extra - c.sqrt_cc[s - 1].powi(2) / pivot;
            }
            let expected = c.r + (LS as f64 * (w * c.zolo_hi_inv).atanh()).tanh();
            ((pivot - expected) / expected).abs()
        });
        harness.check_upper_result(&format!("Schur complement w={w}"), schur, tolerances::SCHUR_COMPLEMENT_REL);
    }
    println!();

    // ═══ Operators on a hot configuration ═══
    let grid = match Grid4::hypercubic(4) {
        Ok(g) => g,
        Err(e) => {
            harness.check_upper_result("grid", Err(e), 0.0);
            harness.finish();
        }
    };
    let u = GaugeField::hot_start(grid, 42);
    println!("═══ Hot 4⁴ configuration, ⟨P⟩ = {:.6} ═══", u.average_plaquette());
    let params = ImplParams::antiperiodic_time();
    let mut seed = 2024u64;

    match TanhFermion5D::new(&u, LS, MASS, M5, scheme, params.clone()) {
        Ok(op) => {
            let psi = Lattice::gaussian(op.full_layout(), &mut seed);
            let chi = Lattice::gaussian(op.full_layout(), &mut seed);
            operator_checks(&mut harness, "tanh", &op, &psi, &chi, -1.0);
            harness.check_upper_result(
                "tanh hermiticity",
                hermiticity_defect(&op, &psi),
                tolerances::CHECKERBOARD_REL,
            );
        }
        Err(e) => harness.check_upper_result("tanh construction", Err(e), 0.0),
    }

    let zolo = RationalApproximation::tanh(LS)
        .and_then(|table| ZolotarevScheme::new(1.0 / SCALE, table))
        .and_then(|scheme| ZolotarevFermion5D::new(&u, LS, MASS, M5, scheme, params.clone()));
    match zolo {
        Ok(op) => {
            let psi = Lattice::gaussian(op.full_layout(), &mut seed);
            let chi = Lattice::gaussian(op.full_layout(), &mut seed);
            operator_checks(&mut harness, "zolotarev", &op, &psi, &chi, -1.0);
        }
        Err(e) => harness.check_upper_result("zolotarev construction", Err(e), 0.0),
    }

    match ImprovedStaggeredFermion::naive(&u, MASS, params) {
        Ok(op) => {
            let psi = Lattice::gaussian(op.full_layout(), &mut seed);
            let chi = Lattice::gaussian(op.full_layout(), &mut seed);
            operator_checks(&mut harness, "naive staggered", &op, &psi, &chi, 1.0);
        }
        Err(e) => harness.check_upper_result("naive staggered construction", Err(e), 0.0),
    }

    // Naik edge factors break anti-hermiticity unless every boundary factor is 1.
    let fat = GaugeField::hot_start(grid, 43);
    let links = StaggeredLinks::ThinFat { thin: &u, fat: &fat };
    match ImprovedStaggeredFermion::new(links, MASS, 9.0 / 8.0, -1.0 / 24.0, ImplParams::periodic()) {
        Ok(op) => {
            let psi = Lattice::gaussian(op.full_layout(), &mut seed);
            let chi = Lattice::gaussian(op.full_layout(), &mut seed);
            operator_checks(&mut harness, "staggered", &op, &psi, &chi, 1.0);
            let gap = op.m(&psi).map(|m| m.norm2() / psi.norm2());
            harness.check_upper_result(
                "staggered |Mψ|²/|ψ|² ≥ m²",
                gap.map(|g| MASS * MASS - g),
                0.0,
            );
        }
        Err(e) => harness.check_upper_result("staggered construction", Err(e), 0.0),
    }
    println!();

    println!("  Wall time: {:.2}s", t_start.elapsed().as_secs_f64());
    harness.finish();
}
