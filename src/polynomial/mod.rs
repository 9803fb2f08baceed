//! Dense univariate polynomials, extracted from an [`Expression`].

mod exact;

use self::exact::ExactPolynomial;
use crate::{
    ops::{self, Context},
    Expression, Parameter,
};
use num_complex::Complex64;
use num_traits::ToPrimitive;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    ops::{Add, Mul, Neg, Sub},
};

/// The largest exponent we are willing to expand.
const MAX_DEGREE: u32 = 256;
/// Remainders smaller than this (relative to the dividend) are treated as
/// zero when looking for repeated factors without exact coefficients.
const GCD_TOLERANCE: f64 = 1e-9;

/// A polynomial in a single variable, stored as coefficients in ascending
/// order (`c_0 + c_1*x + ... + c_n*x^n`).
///
/// Trailing zero coefficients are always trimmed, so the last coefficient is
/// the leading one (except for the zero polynomial, which is `[0]`).
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coefficients: Vec<f64>,
    /// The same polynomial with rational coefficients, when every constant
    /// in the original expression could be represented exactly.
    exact: Option<ExactPolynomial>,
}

impl Polynomial {
    pub fn new(mut coefficients: Vec<f64>) -> Self {
        while coefficients.len() > 1 && coefficients.last() == Some(&0.0) {
            coefficients.pop();
        }

        if coefficients.is_empty() {
            coefficients.push(0.0);
        }

        Polynomial {
            coefficients,
            exact: None,
        }
    }

    fn from_exact(exact: ExactPolynomial) -> Self {
        let coefficients = Polynomial::new(exact.to_f64()).coefficients;

        Polynomial {
            coefficients,
            exact: Some(exact),
        }
    }

    pub fn constant(value: f64) -> Self { Polynomial::new(vec![value]) }

    /// The polynomial `x`.
    pub fn identity() -> Self { Polynomial::new(vec![0.0, 1.0]) }

    /// Try to interpret an [`Expression`] as a polynomial in `param`.
    ///
    /// Other parameters are not allowed, exponents must be non-negative
    /// integers, and we can only divide by constants.
    pub fn from_expression<C>(
        expr: &Expression,
        param: &Parameter,
        ctx: &C,
    ) -> Result<Self, NotAPolynomial>
    where
        C: Context,
    {
        let not_a_polynomial = || NotAPolynomial {
            expression: expr.clone(),
            variable: param.clone(),
        };

        if let Some(exact) = ExactPolynomial::from_expression(expr, param, ctx)
        {
            return Ok(Polynomial::from_exact(exact));
        }

        convert(expr, param, ctx).ok_or_else(not_a_polynomial)
    }

    pub fn coefficients(&self) -> &[f64] { &self.coefficients }

    pub fn degree(&self) -> usize { self.coefficients.len() - 1 }

    pub fn is_zero(&self) -> bool { self.coefficients == [0.0] }

    pub fn leading_coefficient(&self) -> f64 {
        self.coefficients[self.degree()]
    }

    /// Evaluate the polynomial using Horner's method.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * x + c)
    }

    pub fn evaluate_complex(&self, z: Complex64) -> Complex64 {
        self.coefficients
            .iter()
            .rev()
            .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z + c)
    }

    pub fn derivative(&self) -> Polynomial {
        let coefficients = self
            .coefficients
            .iter()
            .enumerate()
            .skip(1)
            .map(|(power, c)| power as f64 * c)
            .collect();

        Polynomial::new(coefficients)
    }

    /// The number of times `x = 0` is a root.
    pub fn zero_root_multiplicity(&self) -> usize {
        if let Some(exact) = &self.exact {
            return exact.zero_root_multiplicity();
        }
        if self.is_zero() {
            return 0;
        }

        self.coefficients.iter().take_while(|&&c| c == 0.0).count()
    }

    /// Divide out every `x = 0` root.
    pub fn without_zero_roots(&self) -> Polynomial {
        if let Some(exact) = &self.exact {
            return Polynomial::from_exact(exact.without_zero_roots());
        }

        let zeroes = self.zero_root_multiplicity();
        Polynomial::new(self.coefficients[zeroes..].to_vec())
    }

    /// Integer coefficients for a polynomial with the same roots, if they
    /// are known exactly and fit in an `i64`.
    ///
    /// Rational coefficients are scaled up to coprime integers.
    pub fn integer_coefficients(&self) -> Option<Vec<i64>> {
        const LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53

        if let Some(exact) = &self.exact {
            return exact
                .primitive_integer_coefficients()
                .iter()
                .map(ToPrimitive::to_i64)
                .collect();
        }

        self.coefficients
            .iter()
            .map(|&c| {
                if c.is_finite() && c.fract() == 0.0 && c.abs() < LIMIT {
                    Some(c as i64)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Divide out repeated factors, so every root has a multiplicity of one.
    ///
    /// This is exact when the coefficients are known exactly. Otherwise a
    /// floating point version of Euclid's algorithm is used, where a
    /// remainder counts as zero once it is negligible.
    pub fn square_free(&self) -> Polynomial {
        if let Some(exact) = &self.exact {
            return Polynomial::from_exact(exact.square_free());
        }
        if self.degree() < 2 {
            return self.clone();
        }

        let repeated = approximate_gcd(self, &self.derivative());

        if repeated.degree() == 0 {
            self.clone()
        } else {
            log::debug!(
                "Dividing {:?} by the repeated factor {:?}",
                self.coefficients,
                repeated.coefficients
            );
            self.div_rem(&repeated).0
        }
    }

    pub fn pow(&self, exponent: u32) -> Polynomial {
        let mut result = Polynomial::constant(1.0);

        for _ in 0..exponent {
            result = &result * self;
        }

        result
    }

    fn scale(&self, factor: f64) -> Polynomial {
        Polynomial::new(self.coefficients.iter().map(|c| c * factor).collect())
    }

    fn monic(&self) -> Polynomial {
        let leading = self.leading_coefficient();

        if leading == 0.0 {
            self.clone()
        } else {
            self.scale(1.0 / leading)
        }
    }

    /// Polynomial long division, giving `(quotient, remainder)`.
    fn div_rem(&self, divisor: &Polynomial) -> (Polynomial, Polynomial) {
        let divisor_degree = divisor.degree();

        if divisor.is_zero() || self.degree() < divisor_degree {
            return (Polynomial::constant(0.0), self.clone());
        }

        let leading = divisor.leading_coefficient();
        let mut remainder = self.coefficients.clone();
        let mut quotient = vec![0.0; self.degree() - divisor_degree + 1];

        for shift in (0..quotient.len()).rev() {
            let factor = remainder[shift + divisor_degree] / leading;

            for (i, d) in divisor.coefficients.iter().enumerate() {
                remainder[shift + i] -= factor * d;
            }
            quotient[shift] = factor;
        }

        // everything from the divisor's degree upwards has been cancelled
        remainder.truncate(divisor_degree);

        (Polynomial::new(quotient), Polynomial::new(remainder))
    }

    /// Drop leading coefficients which are no bigger than `threshold`.
    fn without_negligible_terms(&self, threshold: f64) -> Polynomial {
        let mut coefficients = self.coefficients.clone();

        while coefficients.last().map_or(false, |c| c.abs() <= threshold) {
            coefficients.pop();
        }

        Polynomial::new(coefficients)
    }

    fn as_constant(&self) -> Option<f64> {
        if self.degree() == 0 {
            Some(self.coefficients[0])
        } else {
            None
        }
    }
}

fn approximate_gcd(a: &Polynomial, b: &Polynomial) -> Polynomial {
    let mut a = a.monic();
    let mut b = b.monic();

    while !b.is_zero() {
        let scale = a.coefficients.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
        let (_, remainder) = a.div_rem(&b);

        a = b;
        b = remainder
            .without_negligible_terms(GCD_TOLERANCE * scale)
            .monic();
    }

    a
}

fn convert<C>(
    expr: &Expression,
    param: &Parameter,
    ctx: &C,
) -> Option<Polynomial>
where
    C: Context,
{
    use crate::BinaryOperation::*;

    match expr {
        Expression::Parameter(p) if p == param => Some(Polynomial::identity()),
        Expression::Parameter(_) => None,
        Expression::Constant(value) => Some(Polynomial::constant(*value)),
        Expression::Negate(inner) => convert(inner, param, ctx).map(|p| -p),
        Expression::Binary { left, right, op } => {
            let left = convert(left, param, ctx)?;
            let right = convert(right, param, ctx)?;

            match op {
                Plus => Some(&left + &right),
                Minus => Some(&left - &right),
                Times => Some(&left * &right),
                Divide => {
                    let divisor = right.as_constant()?;
                    if divisor == 0.0 {
                        None
                    } else {
                        Some(left.scale(1.0 / divisor))
                    }
                },
                Power => {
                    let exponent = right.as_constant()?;
                    let is_natural = exponent >= 0.0
                        && exponent.fract() == 0.0
                        && exponent <= MAX_DEGREE as f64;

                    if is_natural {
                        Some(left.pow(exponent as u32))
                    } else {
                        None
                    }
                },
            }
        },
        Expression::FunctionCall { .. } if !expr.depends_on(param) => {
            match ops::fold_constants(expr, ctx) {
                Expression::Constant(value) => {
                    Some(Polynomial::constant(value))
                },
                _ => None,
            }
        },
        Expression::FunctionCall { .. } => None,
    }
}

impl<'a> Add for &'a Polynomial {
    type Output = Polynomial;

    fn add(self, other: &'a Polynomial) -> Polynomial {
        let len = self.coefficients.len().max(other.coefficients.len());
        let coefficient = |p: &Polynomial, i: usize| {
            p.coefficients.get(i).copied().unwrap_or(0.0)
        };

        Polynomial::new(
            (0..len)
                .map(|i| coefficient(self, i) + coefficient(other, i))
                .collect(),
        )
    }
}

impl<'a> Sub for &'a Polynomial {
    type Output = Polynomial;

    fn sub(self, other: &'a Polynomial) -> Polynomial { self + &(-other) }
}

impl<'a> Mul for &'a Polynomial {
    type Output = Polynomial;

    fn mul(self, other: &'a Polynomial) -> Polynomial {
        let mut coefficients =
            vec![0.0; self.coefficients.len() + other.coefficients.len() - 1];

        for (i, a) in self.coefficients.iter().enumerate() {
            for (j, b) in other.coefficients.iter().enumerate() {
                coefficients[i + j] += a * b;
            }
        }

        Polynomial::new(coefficients)
    }
}

impl<'a> Neg for &'a Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial { self.scale(-1.0) }
}

impl Neg for Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial { -&self }
}

/// The error returned when an [`Expression`] can't be interpreted as a
/// [`Polynomial`].
#[derive(Debug, Clone, PartialEq)]
pub struct NotAPolynomial {
    pub expression: Expression,
    pub variable: Parameter,
}

impl Display for NotAPolynomial {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" isn't a polynomial in {}",
            self.expression, self.variable
        )
    }
}

impl Error for NotAPolynomial {}
