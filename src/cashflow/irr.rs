//! Internal Rate of Return (IRR) calculation
//!
//! The NPV of a yearly cash-flow vector is a polynomial in the discount factor
//! `x = 1 / (1 + r)`: `NPV = sum(cf[t] * x^t)`. Every positive real root `x`
//! gives a candidate rate `1/x - 1`. When several non-negative rates exist,
//! the one closest to zero is returned.

use std::ops::{Add, Div, Mul, Sub};

/// Value reported in flat exports when no IRR exists
pub const IRR_SENTINEL: f64 = -99999.0;

/// A root counts as real when its imaginary part is below this fraction of
/// `max(1, |z|)`
const REAL_TOLERANCE: f64 = 1e-9;

/// Multiple roots come back as a cluster slightly off the real axis. Such a
/// root is still real when its polished real part zeroes the polynomial up
/// to this fraction of `sum(|c[t]| * |x|^t)`.
const RESIDUAL_TOLERANCE: f64 = 1e-12;

/// Rates in `[-RATE_TOLERANCE, 0)` are rounding noise around a zero IRR
const RATE_TOLERANCE: f64 = 1e-6;

const MAX_ITERATIONS: usize = 500;
const ROOT_TOLERANCE: f64 = 1e-14;
const POLISH_ITERATIONS: usize = 20;

/// Calculate the IRR of a yearly cash-flow series.
///
/// # Returns
/// * `Option<f64>` - smallest non-negative rate as a decimal, or None when the
///   series is all zero or has no non-negative IRR
pub fn compute_irr(cash_flow: &[f64]) -> Option<f64> {
    let coeffs = significant_coefficients(cash_flow);
    if coeffs.len() < 2 {
        return None;
    }

    polynomial_roots(coeffs)
        .into_iter()
        .filter_map(|z| {
            let x = polish(coeffs, z.re);
            let real = z.im.abs() <= REAL_TOLERANCE * z.norm().max(1.0) || is_root(coeffs, x);
            real.then_some(x)
        })
        .filter(|&x| x > 0.0)
        .map(|x| 1.0 / x - 1.0)
        .filter_map(|rate| {
            if rate >= 0.0 {
                Some(rate)
            } else if rate >= -RATE_TOLERANCE {
                Some(0.0)
            } else {
                None
            }
        })
        .min_by(|a, b| a.total_cmp(b))
}

/// IRR with absence mapped to [`IRR_SENTINEL`]
pub fn irr_or_sentinel(irr: Option<f64>) -> f64 {
    irr.unwrap_or(IRR_SENTINEL)
}

/// Present value of `cash_flow` at a yearly `rate`, first value undiscounted
pub fn npv_at_rate(cash_flow: &[f64], rate: f64) -> f64 {
    let discount = 1.0 / (1.0 + rate);
    cash_flow
        .iter()
        .enumerate()
        .map(|(t, cf)| cf * discount.powi(t as i32))
        .sum()
}

/// Drop leading zeros (roots at `x = 0`) and trailing zeros (lower degree)
fn significant_coefficients(cash_flow: &[f64]) -> &[f64] {
    let first = cash_flow.iter().position(|&v| v != 0.0);
    let last = cash_flow.iter().rposition(|&v| v != 0.0);
    match (first, last) {
        (Some(first), Some(last)) => &cash_flow[first..=last],
        _ => &[],
    }
}

/// Value and derivative of `sum(coeffs[t] * x^t)` (Horner)
fn eval_real(coeffs: &[f64], x: f64) -> (f64, f64) {
    let mut p = 0.0;
    let mut dp = 0.0;
    for &c in coeffs.iter().rev() {
        dp = dp * x + p;
        p = p * x + c;
    }
    (p, dp)
}

fn eval_complex(coeffs: &[f64], z: Complex) -> (Complex, Complex) {
    let mut p = Complex::ZERO;
    let mut dp = Complex::ZERO;
    for &c in coeffs.iter().rev() {
        dp = dp * z + p;
        p = p * z + Complex::real(c);
    }
    (p, dp)
}

/// All complex roots of `sum(coeffs[t] * x^t)` by Aberth-Ehrlich iteration.
/// `coeffs` must have a non-zero first and last entry.
fn polynomial_roots(coeffs: &[f64]) -> Vec<Complex> {
    let degree = coeffs.len() - 1;
    let lead = coeffs[degree];
    let monic: Vec<f64> = coeffs.iter().map(|c| c / lead).collect();

    // Start on a circle whose radius is the geometric mean of the root moduli
    let radius = monic[0].abs().powf(1.0 / degree as f64);
    let mut roots: Vec<Complex> = (0..degree)
        .map(|k| {
            let angle = 2.0 * std::f64::consts::PI * k as f64 / degree as f64 + 0.4;
            Complex::from_polar(radius, angle)
        })
        .collect();

    for _ in 0..MAX_ITERATIONS {
        let mut converged = true;
        for i in 0..degree {
            let (p, dp) = eval_complex(&monic, roots[i]);
            if p.norm() == 0.0 {
                continue;
            }
            let ratio = p / dp;
            let repulsion = (0..degree)
                .filter(|&j| j != i)
                .fold(Complex::ZERO, |acc, j| {
                    acc + Complex::real(1.0) / (roots[i] - roots[j])
                });
            let step = ratio / (Complex::real(1.0) - ratio * repulsion);
            if !step.re.is_finite() || !step.im.is_finite() {
                continue;
            }
            roots[i] = roots[i] - step;
            if step.norm() > ROOT_TOLERANCE * roots[i].norm().max(1.0) {
                converged = false;
            }
        }
        if converged {
            break;
        }
    }
    roots
}

/// Whether `x` zeroes the polynomial within rounding
fn is_root(coeffs: &[f64], x: f64) -> bool {
    let (p, _) = eval_real(coeffs, x);
    let scale = coeffs.iter().rev().fold(0.0, |acc, c| acc * x.abs() + c.abs());
    p.abs() <= RESIDUAL_TOLERANCE * scale
}

/// Newton refinement of a real root on the real polynomial
fn polish(coeffs: &[f64], mut x: f64) -> f64 {
    let (mut p, mut dp) = eval_real(coeffs, x);
    for _ in 0..POLISH_ITERATIONS {
        if p == 0.0 || dp == 0.0 {
            break;
        }
        let candidate = x - p / dp;
        let (cp, cdp) = eval_real(coeffs, candidate);
        if cp.abs() >= p.abs() {
            break;
        }
        x = candidate;
        p = cp;
        dp = cdp;
    }
    x
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Complex {
    re: f64,
    im: f64,
}

impl Complex {
    const ZERO: Complex = Complex { re: 0.0, im: 0.0 };

    fn real(re: f64) -> Self {
        Self { re, im: 0.0 }
    }

    fn from_polar(r: f64, theta: f64) -> Self {
        Self {
            re: r * theta.cos(),
            im: r * theta.sin(),
        }
    }

    fn norm(&self) -> f64 {
        self.re.hypot(self.im)
    }
}

impl Add for Complex {
    type Output = Complex;
    fn add(self, rhs: Complex) -> Complex {
        Complex {
            re: self.re + rhs.re,
            im: self.im + rhs.im,
        }
    }
}

impl Sub for Complex {
    type Output = Complex;
    fn sub(self, rhs: Complex) -> Complex {
        Complex {
            re: self.re - rhs.re,
            im: self.im - rhs.im,
        }
    }
}

impl Mul for Complex {
    type Output = Complex;
    fn mul(self, rhs: Complex) -> Complex {
        Complex {
            re: self.re * rhs.re - self.im * rhs.im,
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }
}

impl Div for Complex {
    type Output = Complex;
    fn div(self, rhs: Complex) -> Complex {
        let denom = rhs.re * rhs.re + rhs.im * rhs.im;
        Complex {
            re: (self.re * rhs.re + self.im * rhs.im) / denom,
            im: (self.im * rhs.re - self.re * rhs.im) / denom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_simple_irr() {
        let irr = compute_irr(&[-100.0, 110.0]).unwrap();
        assert_relative_eq!(irr, 0.10, max_relative = 1e-10);
    }

    #[test]
    fn test_two_period_irr() {
        let irr = compute_irr(&[-100.0, 0.0, 121.0]).unwrap();
        assert_relative_eq!(irr, 0.10, max_relative = 1e-10);
    }

    #[test]
    fn test_project_irr() {
        let cash_flow = [-1000.0, 300.0, 400.0, 500.0];
        let irr = compute_irr(&cash_flow).unwrap();
        assert_relative_eq!(irr, 0.08896339469335, max_relative = 1e-9);
        assert_abs_diff_eq!(npv_at_rate(&cash_flow, irr), 0.0, epsilon = 1e-8);
    }

    #[test]
    fn test_smallest_rate_wins() {
        // Roots at 10% and 20%
        let irr = compute_irr(&[-100.0, 230.0, -132.0]).unwrap();
        assert_relative_eq!(irr, 0.10, max_relative = 1e-9);
    }

    #[test]
    fn test_leading_zero_years() {
        let irr = compute_irr(&[0.0, 0.0, -100.0, 110.0, 0.0]).unwrap();
        assert_relative_eq!(irr, 0.10, max_relative = 1e-10);
    }

    #[test]
    fn test_long_project() {
        let mut cash_flow = vec![-500.0; 5];
        cash_flow.extend(vec![150.0; 25]);
        let irr = compute_irr(&cash_flow).unwrap();
        assert!(irr > 0.0 && irr < 0.2);
        assert_abs_diff_eq!(npv_at_rate(&cash_flow, irr), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_tangent_root_at_zero() {
        // NPV touches zero at r = 0 without crossing
        assert_abs_diff_eq!(compute_irr(&[1.0, -2.0, 1.0]).unwrap(), 0.0, epsilon = 1e-7);
        assert_abs_diff_eq!(compute_irr(&[-100.0, 200.0, -100.0]).unwrap(), 0.0, epsilon = 1e-7);
        // Triple root at r = 0
        assert_abs_diff_eq!(compute_irr(&[1.0, -3.0, 3.0, -1.0]).unwrap(), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_tangent_root_at_ten_percent() {
        let irr = compute_irr(&[1.0, -2.2, 1.21]).unwrap();
        assert_abs_diff_eq!(irr, 0.10, epsilon = 1e-6);
    }

    #[test]
    fn test_no_irr() {
        assert_eq!(compute_irr(&[]), None);
        assert_eq!(compute_irr(&[0.0, 0.0, 0.0]), None);
        assert_eq!(compute_irr(&[5.0]), None);
        // Only positive flows
        assert_eq!(compute_irr(&[1.0, 1.0, 1.0]), None);
        // Money lost: the only root is a negative rate
        assert_eq!(compute_irr(&[-100.0, 90.0]), None);
        assert_eq!(irr_or_sentinel(None), IRR_SENTINEL);
    }
}
