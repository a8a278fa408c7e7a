// SPDX-License-Identifier: AGPL-3.0-only

//! Validation harness for the operator validation binary.
//!
//! Each check records an observed value against an expected value or bound
//! with a named tolerance from [`crate::tolerances`]. The binary exits 0 when
//! every check passes and 1 otherwise, after printing a summary on stdout.
//! Operator calls that return an error are recorded as failed checks rather
//! than aborting the run, so one broken identity does not hide the others.

use std::fmt::{self, Write};
use std::process;

use crate::error::FermionError;

/// A single validation check with result tracking.
#[derive(Debug, Clone)]
pub struct Check {
    pub label: String,
    pub passed: bool,
    pub observed: f64,
    pub expected: f64,
    pub tolerance: f64,
    pub mode: ToleranceMode,
    /// Set when the checked computation failed before producing a value.
    pub error: Option<String>,
}

/// How a tolerance threshold is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToleranceMode {
    /// |observed - expected| < tolerance
    Absolute,
    /// |observed - expected| / |expected| < tolerance
    Relative,
    /// observed < threshold
    UpperBound,
}

impl fmt::Display for ToleranceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute => write!(f, "abs"),
            Self::Relative => write!(f, "rel"),
            Self::UpperBound => write!(f, "<"),
        }
    }
}

/// Accumulates validation checks and produces a summary with exit code.
#[derive(Debug, Default)]
#[must_use]
pub struct ValidationHarness {
    pub name: String,
    pub checks: Vec<Check>,
}

impl ValidationHarness {
    #[must_use = "validation harness must be used to run checks"]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            checks: Vec::new(),
        }
    }

    fn push(&mut self, label: &str, passed: bool, observed: f64, expected: f64, tolerance: f64, mode: ToleranceMode) {
        self.checks.push(Check {
            label: label.to_string(),
            passed,
            observed,
            expected,
            tolerance,
            mode,
            error: None,
        });
    }

    pub fn check_abs(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = (observed - expected).abs() < tolerance;
        self.push(label, passed, observed, expected, tolerance, ToleranceMode::Absolute);
    }

    /// Relative check; falls back to absolute when `expected` is zero.
    pub fn check_rel(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = if expected.abs() > f64::EPSILON {
            ((observed - expected) / expected).abs() < tolerance
        } else {
            observed.abs() < tolerance
        };
        self.push(label, passed, observed, expected, tolerance, ToleranceMode::Relative);
    }

    pub fn check_upper(&mut self, label: &str, observed: f64, threshold: f64) {
        self.push(label, observed < threshold, observed, threshold, threshold, ToleranceMode::UpperBound);
    }

    /// Upper-bound check on a fallible computation; an `Err` fails the check.
    pub fn check_upper_result(&mut self, label: &str, observed: Result<f64, FermionError>, threshold: f64) {
        match observed {
            Ok(v) => self.check_upper(label, v, threshold),
            Err(e) => self.checks.push(Check {
                label: label.to_string(),
                passed: false,
                observed: f64::NAN,
                expected: threshold,
                tolerance: threshold,
                mode: ToleranceMode::UpperBound,
                error: Some(e.to_string()),
            }),
        }
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    #[must_use]
    pub const fn total_count(&self) -> usize {
        self.checks.len()
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Summary as printed by [`finish`](Self::finish).
    #[must_use]
    pub fn format_summary(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(
            s,
            "═══ {} validation: {}/{} checks passed ═══",
            self.name,
            self.passed_count(),
            self.total_count()
        );
        for check in &self.checks {
            let icon = if check.passed { "✓" } else { "✗" };
            match &check.error {
                Some(e) => {
                    let _ = writeln!(s, "  {icon} {}: error: {e}", check.label);
                }
                None => {
                    let _ = writeln!(
                        s,
                        "  {icon} {}: observed={:.6e}, expected={:.6e}, tol={:.2e} ({})",
                        check.label, check.observed, check.expected, check.tolerance, check.mode
                    );
                }
            }
        }
        s
    }

    /// Print summary and exit 0 if all checks pass, 1 otherwise.
    pub fn finish(&self) -> ! {
        println!();
        print!("{}", self.format_summary());
        if self.all_passed() {
            println!("ALL CHECKS PASSED");
            process::exit(0);
        }
        let failed: Vec<&str> = self
            .checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.label.as_str())
            .collect();
        println!("FAILED CHECKS: {}", failed.join(", "));
        process::exit(1);
    }
}
