//! Finding every root of a univariate [`Polynomial`].
//!
//! Repeated factors are divided out first, so every root is simple. Roots
//! are then found exactly where we can (rational roots of polynomials with
//! integer coefficients, and quadratics via the quadratic formula) before
//! falling back to numeric root-finding for whatever is left over.

use crate::{polynomial::Polynomial, solution::Value};
use arrayvec::ArrayVec;
use num_complex::Complex64;
use num_rational::Rational64;
use std::{cmp::Ordering, convert::TryFrom};

/// Candidates for the rational root theorem come from the divisors of the
/// first and last coefficients, so don't bother when they get too big.
const MAX_DIVISOR_SEARCH: i128 = 1_000_000;
/// Factoring out squares is done by trial division.
const MAX_EXACT_DISCRIMINANT: i128 = 1_000_000_000_000;
const MAX_ITERATIONS: usize = 500;
const TOLERANCE: f64 = 1e-12;

/// Find the distinct roots of a non-constant polynomial.
///
/// Real roots come first in ascending order, followed by complex roots
/// ordered by their real then imaginary parts.
pub(crate) fn find_roots(polynomial: &Polynomial) -> Vec<Value> {
    debug_assert!(polynomial.degree() > 0);

    let mut found = Vec::new();
    let square_free = polynomial.square_free();

    if square_free.zero_root_multiplicity() > 0 {
        found.push(Value::rational(Rational64::from_integer(0)));
    }
    let mut remaining = square_free.without_zero_roots();

    if let Some(coefficients) = remaining.integer_coefficients() {
        let (rational_roots, left_over) =
            deflate_rational_roots(coefficients);
        log::debug!(
            "Found {} rational root(s) of {:?}",
            rational_roots.len(),
            polynomial.coefficients()
        );

        found.extend(rational_roots.into_iter().map(Value::rational));
        remaining =
            Polynomial::new(left_over.iter().map(|&c| c as f64).collect());

        if remaining.degree() == 2 {
            if let Some(roots) = exact_quadratic(&left_over) {
                found.extend(roots);
                return sorted_and_distinct(found);
            }
        }
    }

    match remaining.degree() {
        0 => {},
        1 => {
            let c = remaining.coefficients();
            found.push(Value::real(-c[0] / c[1]));
        },
        2 => found.extend(numeric_quadratic(remaining.coefficients())),
        _ => found.extend(
            durand_kerner(&remaining)
                .into_iter()
                .map(|z| snap_to_real(z, &remaining)),
        ),
    }

    sorted_and_distinct(found)
}

/// Repeatedly look for rational roots, `p/q`, dividing each one out as it is
/// found.
fn deflate_rational_roots(
    mut coefficients: Vec<i64>,
) -> (Vec<Rational64>, Vec<i64>) {
    let mut roots = Vec::new();

    while coefficients.len() > 1 {
        let root = match find_rational_root(&coefficients) {
            Some(root) => root,
            None => break,
        };

        match divide_by_linear_factor(&coefficients, root) {
            Some(quotient) => {
                roots.push(root);
                coefficients = quotient;
            },
            None => break,
        }
    }

    (roots, coefficients)
}

fn find_rational_root(coefficients: &[i64]) -> Option<Rational64> {
    let constant = i128::from(coefficients[0]);
    let leading = i128::from(*coefficients.last()?);

    if constant == 0 {
        return Some(Rational64::from_integer(0));
    }

    if constant.abs() > MAX_DIVISOR_SEARCH || leading.abs() > MAX_DIVISOR_SEARCH
    {
        return None;
    }

    for q in divisors(leading) {
        for p in divisors(constant) {
            for &numerator in &[p, -p] {
                if is_rational_root(coefficients, numerator, q) {
                    let numerator = i64::try_from(numerator).ok()?;
                    let denominator = i64::try_from(q).ok()?;
                    return Some(Rational64::new(numerator, denominator));
                }
            }
        }
    }

    None
}

fn divisors(n: i128) -> impl Iterator<Item = i128> {
    let n = n.abs();
    (1..=n)
        .take_while(move |d| d * d <= n)
        .filter(move |d| n % d == 0)
        .flat_map(move |d| {
            let pair = n / d;
            let mut both: ArrayVec<[i128; 2]> = ArrayVec::new();
            both.push(d);
            if pair != d {
                both.push(pair);
            }
            both
        })
}

/// Check `q^n * P(p/q) == 0` using exact integer arithmetic.
fn is_rational_root(coefficients: &[i64], p: i128, q: i128) -> bool {
    let degree = coefficients.len() as u32 - 1;
    let mut sum: i128 = 0;

    for (power, &c) in coefficients.iter().enumerate() {
        let power = power as u32;
        let term = p
            .checked_pow(power)
            .and_then(|p_i| Some((p_i, q.checked_pow(degree - power)?)))
            .and_then(|(p_i, q_i)| p_i.checked_mul(q_i))
            .and_then(|t| t.checked_mul(i128::from(c)));

        match term.and_then(|t| sum.checked_add(t)) {
            Some(s) => sum = s,
            None => return false,
        }
    }

    sum == 0
}

/// Divide `P(x)` by `(q*x - p)` where `p/q` is a known root, giving a
/// polynomial that still has integer coefficients.
fn divide_by_linear_factor(
    coefficients: &[i64],
    root: Rational64,
) -> Option<Vec<i64>> {
    let p = i128::from(*root.numer());
    let q = i128::from(*root.denom());
    let degree = coefficients.len() - 1;

    // P(x) = (q*x - p) * B(x)
    //   => b[n-1] = c[n] / q
    //      b[k-1] = (c[k] + p*b[k]) / q
    let mut quotient = vec![0_i128; degree];
    let leading = i128::from(coefficients[degree]);
    if leading % q != 0 {
        return None;
    }
    quotient[degree - 1] = leading / q;

    for k in (1..degree).rev() {
        let numerator = i128::from(coefficients[k])
            .checked_add(p.checked_mul(quotient[k])?)?;
        if numerator % q != 0 {
            return None;
        }
        quotient[k - 1] = numerator / q;
    }

    // the remainder should be zero
    if -p.checked_mul(quotient[0])? != i128::from(coefficients[0]) {
        return None;
    }

    quotient.into_iter().map(|b| i64::try_from(b).ok()).collect()
}

/// Solve `a*x^2 + b*x + c = 0` exactly, giving results in the form
/// `-b/2a ± k/2a * sqrt(m)` where `m` is square-free.
///
/// Returns `None` when the roots are complex or the arithmetic would
/// overflow, leaving them to the numeric solver.
fn exact_quadratic(coefficients: &[i64]) -> Option<ArrayVec<[Value; 2]>> {
    let c = i128::from(coefficients[0]);
    let b = i128::from(coefficients[1]);
    let a = i128::from(coefficients[2]);

    let four_ac = a.checked_mul(c)?.checked_mul(4)?;
    let discriminant = b.checked_mul(b)?.checked_sub(four_ac)?;
    if discriminant < 0 || discriminant > MAX_EXACT_DISCRIMINANT {
        return None;
    }

    let (k, m) = split_square_factor(i64::try_from(discriminant).ok()?);
    let two_a = i64::try_from(2 * a).ok()?;
    let rational = Rational64::new(i64::try_from(-b).ok()?, two_a);
    let coefficient = Rational64::new(k, two_a);

    let mut roots = ArrayVec::new();

    if m == 1 {
        roots.push(Value::rational(rational - coefficient));
        roots.push(Value::rational(rational + coefficient));
    } else {
        roots.push(Value::surd(rational, -coefficient, m));
        roots.push(Value::surd(rational, coefficient, m));
    }

    Some(roots)
}

/// Split `n` into `k^2 * m`, where `m` is square-free.
fn split_square_factor(n: i64) -> (i64, i64) {
    debug_assert!(n >= 0);

    if n == 0 {
        return (0, 1);
    }

    let mut k = 1;
    let mut m = n;
    let mut factor = 2;

    while factor * factor <= m {
        while m % (factor * factor) == 0 {
            m /= factor * factor;
            k *= factor;
        }
        factor += 1;
    }

    (k, m)
}

fn numeric_quadratic(coefficients: &[f64]) -> ArrayVec<[Value; 2]> {
    let (c, b, a) = (coefficients[0], coefficients[1], coefficients[2]);
    let discriminant = b * b - 4.0 * a * c;
    let two_a = 2.0 * a;

    let mut roots = ArrayVec::new();

    if discriminant >= 0.0 {
        let root = discriminant.sqrt();
        roots.push(Value::real((-b - root) / two_a));
        roots.push(Value::real((-b + root) / two_a));
    } else {
        let re = -b / two_a;
        let im = (-discriminant).sqrt() / two_a.abs();
        roots.push(Value::complex(Complex64::new(re, -im)));
        roots.push(Value::complex(Complex64::new(re, im)));
    }

    roots
}

/// Find all the roots of a polynomial simultaneously using the
/// [Durand-Kerner method][dk].
///
/// [dk]: https://en.wikipedia.org/wiki/Durand%E2%80%93Kerner_method
fn durand_kerner(polynomial: &Polynomial) -> Vec<Complex64> {
    let degree = polynomial.degree();
    let leading = polynomial.leading_coefficient();
    let monic = Polynomial::new(
        polynomial.coefficients().iter().map(|c| c / leading).collect(),
    );

    // the usual starting points are powers of a complex number which is
    // neither real nor a root of unity
    let seed = Complex64::new(0.4, 0.9);
    let mut roots: Vec<Complex64> =
        (0..degree).map(|i| seed.powu(i as u32)).collect();

    for iteration in 0..MAX_ITERATIONS {
        let mut biggest_step: f64 = 0.0;

        for i in 0..degree {
            let numerator = monic.evaluate_complex(roots[i]);
            let denominator = (0..degree)
                .filter(|&j| j != i)
                .fold(Complex64::new(1.0, 0.0), |acc, j| {
                    acc * (roots[i] - roots[j])
                });

            let step = numerator / denominator;
            if step.is_finite() {
                roots[i] -= step;
                biggest_step = biggest_step.max(step.norm());
            }
        }

        if biggest_step < TOLERANCE {
            log::trace!(
                "Durand-Kerner converged after {} iterations",
                iteration + 1
            );
            break;
        }
    }

    roots.into_iter().map(|z| polish(polynomial, z)).collect()
}

/// Refine a root with a couple of Newton-Raphson steps on the original
/// polynomial.
fn polish(polynomial: &Polynomial, mut z: Complex64) -> Complex64 {
    let derivative = polynomial.derivative();

    for _ in 0..3 {
        let slope = derivative.evaluate_complex(z);
        if slope.norm() == 0.0 {
            break;
        }

        let step = polynomial.evaluate_complex(z) / slope;
        if !step.is_finite() {
            break;
        }
        z -= step;
    }

    z
}

/// Roots with a negligible imaginary part are treated as real, provided the
/// real part is also (numerically) a root.
fn snap_to_real(z: Complex64, polynomial: &Polynomial) -> Value {
    let scale = z.norm().max(1.0);

    if z.im.abs() <= 1e-9 * scale {
        let re = polish(polynomial, Complex64::new(z.re, 0.0)).re;
        Value::real(re)
    } else {
        Value::complex(z)
    }
}

fn sorted_and_distinct(mut roots: Vec<Value>) -> Vec<Value> {
    roots.sort_by(compare_roots);

    let mut distinct: Vec<Value> = Vec::with_capacity(roots.len());

    for root in roots {
        match distinct.last_mut() {
            Some(previous) if same_root(previous, &root) => {
                // prefer whichever one is known exactly
                if previous.exact().is_none() && root.exact().is_some() {
                    *previous = root;
                }
            },
            _ => distinct.push(root),
        }
    }

    distinct
}

fn compare_roots(left: &Value, right: &Value) -> Ordering {
    let key = |v: &Value| {
        let z = v.approximate();
        (!v.is_real(), z.re, z.im)
    };
    let (l_complex, l_re, l_im) = key(left);
    let (r_complex, r_re, r_im) = key(right);

    l_complex
        .cmp(&r_complex)
        .then(l_re.partial_cmp(&r_re).unwrap_or(Ordering::Equal))
        .then(l_im.partial_cmp(&r_im).unwrap_or(Ordering::Equal))
}

fn same_root(left: &Value, right: &Value) -> bool {
    let difference = (left.approximate() - right.approximate()).norm();
    let scale = left.approximate().norm().max(1.0);

    difference <= 1e-9 * scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ops::Builtins, Expression, Parameter};

    fn roots_of(src: &str) -> Vec<Value> {
        let expr: Expression = src.parse().unwrap();
        let x = Parameter::named("x");
        let polynomial =
            Polynomial::from_expression(&expr, &x, &Builtins).unwrap();

        find_roots(&polynomial)
    }

    fn exact_roots(src: &str) -> Vec<String> {
        roots_of(src)
            .iter()
            .map(|root| {
                assert!(root.exact().is_some(), "{} isn't exact", root);
                root.to_string()
            })
            .collect()
    }

    #[test]
    fn difference_of_squares() {
        assert_eq!(exact_roots("x^2 - 16"), vec!["-4", "4"]);
    }

    #[test]
    fn quadratic_with_irrational_roots() {
        assert_eq!(
            exact_roots("x^2 + 10*x - 5"),
            vec!["-5 - sqrt(30)", "-5 + sqrt(30)"]
        );

        let roots = roots_of("x^2 + 10*x - 5");
        approx::assert_relative_eq!(
            roots[0].as_real().unwrap(),
            -5.0 - 30_f64.sqrt()
        );
        approx::assert_relative_eq!(
            roots[1].as_real().unwrap(),
            -5.0 + 30_f64.sqrt()
        );
    }

    #[test]
    fn repeated_roots_are_only_reported_once() {
        assert_eq!(exact_roots("(x - 3)^2"), vec!["3"]);
        assert_eq!(exact_roots("x^3"), vec!["0"]);
    }

    #[test]
    fn rational_roots_of_a_cubic() {
        assert_eq!(
            exact_roots("(2*x - 1)*(x + 2)*(x - 5)"),
            vec!["-2", "1/2", "5"]
        );
    }

    #[test]
    fn cubic_with_one_real_root() {
        let roots = roots_of("x^3 + 10*x + 5");

        assert_eq!(roots.len(), 3);
        let real = roots[0].as_real().unwrap();
        let residual = real.powi(3) + 10.0 * real + 5.0;
        approx::assert_abs_diff_eq!(residual, 0.0, epsilon = 1e-9);

        for root in &roots[1..] {
            assert!(!root.is_real());
            let z = root.approximate();
            let residual = z * z * z + z * 10.0 + 5.0;
            assert!(residual.norm() < 1e-9, "{} gave {}", root, residual);
        }
        // complex roots come in conjugate pairs
        let mismatch = roots[1].approximate().conj() - roots[2].approximate();
        assert!(mismatch.norm() < 1e-9);
    }

    #[test]
    fn complex_quadratic() {
        let roots = roots_of("x^2 + 1");

        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].approximate(), Complex64::new(0.0, -1.0));
        assert_eq!(roots[1].approximate(), Complex64::new(0.0, 1.0));
    }

    #[test]
    fn seventh_degree() {
        // x^7 - 5x = x(x^6 - 5)
        let roots = roots_of("x^7 - 5*x");
        let sixth_root_of_five = 5_f64.powf(1.0 / 6.0);

        let real: Vec<f64> = roots.iter().filter_map(Value::as_real).collect();
        assert_eq!(real.len(), 3);
        approx::assert_relative_eq!(
            real[0],
            -sixth_root_of_five,
            epsilon = 1e-9
        );
        assert_eq!(real[1], 0.0);
        approx::assert_relative_eq!(
            real[2],
            sixth_root_of_five,
            epsilon = 1e-9
        );
        assert_eq!(roots.len(), 7);
    }

    #[test]
    fn decimal_coefficients_are_exact() {
        assert_eq!(exact_roots("x/2 - 0.25"), vec!["1/2"]);
    }

    #[test]
    fn irrational_coefficients() {
        let roots = roots_of("x - sqrt(2)");

        assert_eq!(roots, vec![Value::real(2_f64.sqrt())]);
    }

    #[test]
    fn repeated_surds() {
        assert_eq!(exact_roots("(x^2 - 2)^2"), vec!["-sqrt(2)", "sqrt(2)"]);
    }

    #[test]
    fn repeated_decimal_root() {
        assert_eq!(exact_roots("(x - 0.1)^3"), vec!["1/10"]);
    }

    #[test]
    fn repeated_root_with_huge_coefficients() {
        assert_eq!(exact_roots("(x + 1)^200"), vec!["-1"]);
    }

    #[test]
    fn repeated_roots_without_rational_roots() {
        // the cube roots of 2, each twice
        let roots = roots_of("(x^3 - 2)^2");

        assert_eq!(roots.len(), 3);
        let real = roots[0].as_real().unwrap();
        approx::assert_relative_eq!(real, 2_f64.cbrt(), epsilon = 1e-9);

        for root in &roots[1..] {
            assert!(!root.is_real());
            let z = root.approximate();
            let residual = z * z * z - 2.0;
            assert!(residual.norm() < 1e-9, "{} gave {}", root, residual);
        }
    }

    #[test]
    fn repeated_irrational_root() {
        let roots = roots_of("(x - sqrt(2))^2 * (x + 1)");

        assert_eq!(roots.len(), 2);
        approx::assert_relative_eq!(
            roots[0].as_real().unwrap(),
            -1.0,
            epsilon = 1e-9
        );
        approx::assert_relative_eq!(
            roots[1].as_real().unwrap(),
            2_f64.sqrt(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn split_out_square_factors() {
        assert_eq!(split_square_factor(120), (2, 30));
        assert_eq!(split_square_factor(64), (8, 1));
        assert_eq!(split_square_factor(7), (1, 7));
        assert_eq!(split_square_factor(72), (6, 2));
    }

    #[test]
    fn synthetic_division() {
        // x^2 - 16 = (x - 4)(x + 4)
        let got =
            divide_by_linear_factor(&[-16, 0, 1], Rational64::from_integer(4));

        assert_eq!(got, Some(vec![4, 1]));
    }
}
