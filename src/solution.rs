use crate::{Expression, Parameter};
use num_complex::Complex64;
use num_rational::Rational64;
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

/// One simultaneous assignment of values to unknowns.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Solution {
    pub known_values: BTreeMap<Parameter, Value>,
}

impl Solution {
    pub fn new() -> Self { Solution::default() }

    pub fn with(mut self, param: Parameter, value: Value) -> Self {
        self.known_values.insert(param, value);
        self
    }

    /// Look up a value by the name of its [`Parameter`].
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.known_values.get(&Parameter::named(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Parameter, &Value)> + '_ {
        self.known_values.iter()
    }

    pub fn len(&self) -> usize { self.known_values.len() }

    pub fn is_empty(&self) -> bool { self.known_values.is_empty() }
}

impl Display for Solution {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;

        for (i, (param, value)) in self.known_values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", param, value)?;
        }

        write!(f, "}}")
    }
}

/// A value assigned to an unknown.
///
/// Every value has a numeric approximation, and values which could be
/// determined exactly (integers, fractions, and quadratic surds like
/// `-5 + sqrt(30)`) also carry that closed form.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    approximate: Complex64,
    exact: Option<Expression>,
}

impl Value {
    pub fn real(value: f64) -> Self {
        Value {
            approximate: Complex64::new(value, 0.0),
            exact: None,
        }
    }

    pub fn complex(value: Complex64) -> Self {
        Value {
            approximate: value,
            exact: None,
        }
    }

    pub fn rational(value: Rational64) -> Self {
        Value {
            approximate: Complex64::new(ratio_to_f64(value), 0.0),
            exact: Some(rational_expression(value)),
        }
    }

    /// The number `rational + coefficient * sqrt(radicand)`, where the
    /// radicand is a positive square-free integer.
    pub fn surd(
        rational: Rational64,
        coefficient: Rational64,
        radicand: i64,
    ) -> Self {
        debug_assert!(radicand > 1);

        let root = (radicand as f64).sqrt();
        let approximate =
            ratio_to_f64(rational) + ratio_to_f64(coefficient) * root;

        let sqrt = Expression::Constant(radicand as f64).call("sqrt");
        let negative = coefficient < Rational64::from_integer(0);
        let magnitude = if negative { -coefficient } else { coefficient };
        let irrational = if *magnitude.numer() == 1 {
            sqrt
        } else {
            Expression::Constant(*magnitude.numer() as f64) * sqrt
        };
        let irrational = if *magnitude.denom() == 1 {
            irrational
        } else {
            irrational / Expression::Constant(*magnitude.denom() as f64)
        };

        let exact = match (*rational.numer() == 0, negative) {
            (true, false) => irrational,
            (true, true) => -irrational,
            (false, false) => rational_expression(rational) + irrational,
            (false, true) => rational_expression(rational) - irrational,
        };

        Value {
            approximate: Complex64::new(approximate, 0.0),
            exact: Some(exact),
        }
    }

    /// A real value which will also be given an exact form if it is
    /// (numerically) a fraction with a small denominator.
    pub fn real_with_exact_fraction(value: f64) -> Self {
        const MAX_DENOMINATOR: i64 = 10_000;

        match nearest_fraction(value, MAX_DENOMINATOR) {
            Some(fraction) => Value::rational(fraction),
            None => Value::real(value),
        }
    }

    pub fn approximate(&self) -> Complex64 { self.approximate }

    pub fn exact(&self) -> Option<&Expression> { self.exact.as_ref() }

    pub fn is_real(&self) -> bool { self.approximate.im == 0.0 }

    pub fn as_real(&self) -> Option<f64> {
        if self.is_real() {
            Some(self.approximate.re)
        } else {
            None
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(exact) = &self.exact {
            return write!(f, "{}", exact);
        }

        let Complex64 { re, im } = self.approximate;

        if im == 0.0 {
            write!(f, "{}", re)
        } else if re == 0.0 {
            write!(f, "{}*I", im)
        } else if im < 0.0 {
            write!(f, "{} - {}*I", re, -im)
        } else {
            write!(f, "{} + {}*I", re, im)
        }
    }
}

fn ratio_to_f64(value: Rational64) -> f64 {
    *value.numer() as f64 / *value.denom() as f64
}

fn rational_expression(value: Rational64) -> Expression {
    let numerator = Expression::Constant(*value.numer() as f64);

    if *value.denom() == 1 {
        numerator
    } else {
        numerator / Expression::Constant(*value.denom() as f64)
    }
}

/// Find the closest fraction to `value` with a denominator no larger than
/// `max_denominator`, using continued fractions. Only accepted if it agrees
/// with `value` to within floating point noise.
fn nearest_fraction(value: f64, max_denominator: i64) -> Option<Rational64> {
    const TOLERANCE: f64 = 1e-9;

    if !value.is_finite() || value.abs() > 1e12 {
        return None;
    }

    // convergents h/k
    let (mut h_prev, mut h) = (0_i64, 1_i64);
    let (mut k_prev, mut k) = (1_i64, 0_i64);
    let mut remainder = value;

    for _ in 0..64 {
        let a = remainder.floor();
        let a_int = a as i64;

        let h_next = a_int.checked_mul(h)?.checked_add(h_prev)?;
        let k_next = a_int.checked_mul(k)?.checked_add(k_prev)?;

        if k_next > max_denominator {
            break;
        }

        h_prev = h;
        h = h_next;
        k_prev = k;
        k = k_next;

        let candidate = h as f64 / k as f64;
        if (candidate - value).abs() <= TOLERANCE * value.abs().max(1.0) {
            return Some(Rational64::new(h, k));
        }

        let fractional = remainder - a;
        if fractional.abs() < f64::EPSILON {
            break;
        }
        remainder = 1.0 / fractional;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_and_fractions() {
        let inputs = vec![
            (Rational64::from_integer(4), "4"),
            (Rational64::new(-4, 1), "-4"),
            (Rational64::new(90, 59), "90/59"),
            (Rational64::new(-3, 6), "-1/2"),
        ];

        for (value, should_be) in inputs {
            assert_eq!(Value::rational(value).to_string(), should_be);
        }
    }

    #[test]
    fn surds() {
        let inputs = vec![
            ((-5, 1), (1, 1), 30, "-5 + sqrt(30)"),
            ((-5, 1), (-1, 1), 30, "-5 - sqrt(30)"),
            ((0, 1), (1, 1), 2, "sqrt(2)"),
            ((0, 1), (-1, 1), 2, "-sqrt(2)"),
            ((1, 2), (3, 2), 5, "1/2 + 3*sqrt(5)/2"),
        ];

        for ((rn, rd), (cn, cd), radicand, should_be) in inputs {
            let value = Value::surd(
                Rational64::new(rn, rd),
                Rational64::new(cn, cd),
                radicand,
            );

            assert_eq!(value.to_string(), should_be);
            let approximate = rn as f64 / rd as f64
                + cn as f64 / cd as f64 * (radicand as f64).sqrt();
            approx::assert_relative_eq!(value.as_real().unwrap(), approximate);
        }
    }

    #[test]
    fn recover_simple_fractions() {
        let inputs = vec![
            (90.0 / 59.0, Rational64::new(90, 59)),
            (5.0 / 59.0, Rational64::new(5, 59)),
            (1101.0 / 590.0, Rational64::new(1101, 590)),
            (-0.25, Rational64::new(-1, 4)),
            (3.0, Rational64::from_integer(3)),
            (0.0, Rational64::from_integer(0)),
        ];

        for (value, should_be) in inputs {
            let got = nearest_fraction(value, 10_000);

            assert_eq!(got, Some(should_be), "{}", value);
        }
    }

    #[test]
    fn irrationals_have_no_small_fraction() {
        assert_eq!(nearest_fraction(2_f64.sqrt(), 10_000), None);
        assert_eq!(nearest_fraction(std::f64::consts::PI, 10_000), None);
    }

    #[test]
    fn display_complex_values() {
        let inputs = vec![
            (Complex64::new(1.0, -2.0), "1 - 2*I"),
            (Complex64::new(1.0, 2.0), "1 + 2*I"),
            (Complex64::new(0.0, 3.0), "3*I"),
        ];

        for (value, should_be) in inputs {
            assert_eq!(Value::complex(value).to_string(), should_be);
        }
    }

    #[test]
    fn display_a_solution() {
        let solution = Solution::new()
            .with(Parameter::named("y"), Value::real(2.0))
            .with(Parameter::named("x"), Value::real(1.5));

        assert_eq!(solution.to_string(), "{x: 1.5, y: 2}");
        assert_eq!(solution.get("y"), Some(&Value::real(2.0)));
    }
}
