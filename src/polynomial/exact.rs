//! Polynomials with exact rational coefficients, used to strip repeated
//! factors before any root finding happens.

use super::MAX_DEGREE;
use crate::{
    ops::{self, Context},
    Expression, Parameter,
};
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

/// Constants are only treated as exact when they are whole numbers or short
/// decimals like `0.1` or `2.75`.
const MAX_DECIMAL_PLACES: usize = 9;

/// Integers beyond this can't be told apart from their neighbours as `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0; // 2^53

/// A polynomial in ascending order (`c_0 + c_1*x + ... + c_n*x^n`).
///
/// Trailing zero coefficients are trimmed, so the zero polynomial has no
/// coefficients at all.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExactPolynomial {
    coefficients: Vec<BigRational>,
}

impl ExactPolynomial {
    pub(crate) fn new(mut coefficients: Vec<BigRational>) -> Self {
        while coefficients.last().map_or(false, |c| c.is_zero()) {
            coefficients.pop();
        }

        ExactPolynomial { coefficients }
    }

    fn constant(value: BigRational) -> Self {
        ExactPolynomial::new(vec![value])
    }

    fn identity() -> Self {
        ExactPolynomial::new(vec![BigRational::zero(), BigRational::one()])
    }

    /// Try to interpret an [`Expression`] as a polynomial in `param` without
    /// losing precision.
    pub(crate) fn from_expression<C>(
        expr: &Expression,
        param: &Parameter,
        ctx: &C,
    ) -> Option<Self>
    where
        C: Context,
    {
        use crate::BinaryOperation::*;

        match expr {
            Expression::Parameter(p) if p == param => {
                Some(ExactPolynomial::identity())
            },
            Expression::Parameter(_) => None,
            Expression::Constant(value) => {
                exact_constant(*value).map(ExactPolynomial::constant)
            },
            Expression::Negate(inner) => {
                ExactPolynomial::from_expression(inner, param, ctx)
                    .map(|p| p.neg())
            },
            Expression::Binary { left, right, op } => {
                let left = ExactPolynomial::from_expression(left, param, ctx)?;
                let right =
                    ExactPolynomial::from_expression(right, param, ctx)?;

                match op {
                    Plus => Some(left.add(&right)),
                    Minus => Some(left.add(&right.neg())),
                    Times => Some(left.mul(&right)),
                    Divide => {
                        let divisor = right.as_constant()?;
                        if divisor.is_zero() {
                            None
                        } else {
                            Some(left.scale(&divisor.recip()))
                        }
                    },
                    Power => {
                        let exponent = right.as_constant()?;
                        if !exponent.is_integer() || exponent.is_negative() {
                            return None;
                        }

                        let exponent = exponent.to_integer().to_u32()?;
                        let degree =
                            left.degree() as u64 * u64::from(exponent);
                        if exponent > MAX_DEGREE
                            || degree > u64::from(MAX_DEGREE)
                        {
                            return None;
                        }

                        Some(left.pow(exponent))
                    },
                }
            },
            Expression::FunctionCall { .. } if !expr.depends_on(param) => {
                match ops::fold_constants(expr, ctx) {
                    Expression::Constant(value) => {
                        exact_constant(value).map(ExactPolynomial::constant)
                    },
                    _ => None,
                }
            },
            Expression::FunctionCall { .. } => None,
        }
    }

    pub(crate) fn coefficients(&self) -> &[BigRational] { &self.coefficients }

    pub(crate) fn is_zero(&self) -> bool { self.coefficients.is_empty() }

    pub(crate) fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub(crate) fn to_f64(&self) -> Vec<f64> {
        self.coefficients
            .iter()
            .map(|c| c.to_f64().unwrap_or(std::f64::NAN))
            .collect()
    }

    pub(crate) fn zero_root_multiplicity(&self) -> usize {
        self.coefficients.iter().take_while(|c| c.is_zero()).count()
    }

    pub(crate) fn without_zero_roots(&self) -> Self {
        let zeroes = self.zero_root_multiplicity();
        ExactPolynomial::new(self.coefficients[zeroes..].to_vec())
    }

    /// Divide out repeated factors, so every root has a multiplicity of one.
    ///
    /// Uses `p / gcd(p, p')`.
    pub(crate) fn square_free(&self) -> Self {
        if self.degree() < 2 {
            return self.clone();
        }

        let repeated = self.gcd(&self.derivative());

        if repeated.degree() == 0 {
            self.clone()
        } else {
            self.div_rem(&repeated).0
        }
    }

    /// The same polynomial scaled so its coefficients are integers with no
    /// common factor.
    pub(crate) fn primitive_integer_coefficients(&self) -> Vec<BigInt> {
        let lcm = self
            .coefficients
            .iter()
            .fold(BigInt::one(), |acc, c| acc.lcm(c.denom()));

        let scaled: Vec<BigInt> = self
            .coefficients
            .iter()
            .map(|c| c.numer() * (&lcm / c.denom()))
            .collect();

        let common = scaled.iter().fold(BigInt::zero(), |acc, c| acc.gcd(c));
        if common.is_zero() || common.is_one() {
            return scaled;
        }

        scaled.into_iter().map(|c| c / &common).collect()
    }

    fn leading_coefficient(&self) -> Option<&BigRational> {
        self.coefficients.last()
    }

    fn as_constant(&self) -> Option<BigRational> {
        match self.coefficients.as_slice() {
            [] => Some(BigRational::zero()),
            [c] => Some(c.clone()),
            _ => None,
        }
    }

    fn derivative(&self) -> Self {
        let coefficients = self
            .coefficients
            .iter()
            .enumerate()
            .skip(1)
            .map(|(power, c)| {
                c * BigRational::from_integer(BigInt::from(power))
            })
            .collect();

        ExactPolynomial::new(coefficients)
    }

    fn add(&self, other: &Self) -> Self {
        let len = self.coefficients.len().max(other.coefficients.len());
        let coefficient = |p: &ExactPolynomial, i: usize| {
            p.coefficients.get(i).cloned().unwrap_or_else(BigRational::zero)
        };

        ExactPolynomial::new(
            (0..len)
                .map(|i| coefficient(self, i) + coefficient(other, i))
                .collect(),
        )
    }

    fn neg(&self) -> Self {
        ExactPolynomial::new(self.coefficients.iter().map(|c| -c).collect())
    }

    fn mul(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_zero() {
            return ExactPolynomial::new(Vec::new());
        }

        let mut coefficients = vec![
            BigRational::zero();
            self.coefficients.len() + other.coefficients.len() - 1
        ];

        for (i, a) in self.coefficients.iter().enumerate() {
            for (j, b) in other.coefficients.iter().enumerate() {
                coefficients[i + j] += a * b;
            }
        }

        ExactPolynomial::new(coefficients)
    }

    fn scale(&self, factor: &BigRational) -> Self {
        ExactPolynomial::new(
            self.coefficients.iter().map(|c| c * factor).collect(),
        )
    }

    fn monic(&self) -> Self {
        match self.leading_coefficient() {
            Some(leading) => self.scale(&leading.recip()),
            None => self.clone(),
        }
    }

    /// Exponentiation by squaring.
    fn pow(&self, mut exponent: u32) -> Self {
        let mut result = ExactPolynomial::constant(BigRational::one());
        let mut base = self.clone();

        while exponent > 0 {
            if exponent & 1 == 1 {
                result = result.mul(&base);
            }
            exponent >>= 1;
            if exponent > 0 {
                base = base.mul(&base);
            }
        }

        result
    }

    /// Polynomial long division, giving `(quotient, remainder)`.
    fn div_rem(&self, divisor: &Self) -> (Self, Self) {
        let leading = match divisor.leading_coefficient() {
            Some(leading) => leading,
            None => return (ExactPolynomial::new(Vec::new()), self.clone()),
        };
        if self.coefficients.len() < divisor.coefficients.len() {
            return (ExactPolynomial::new(Vec::new()), self.clone());
        }

        let divisor_degree = divisor.degree();
        let mut remainder = self.coefficients.clone();
        let mut quotient = vec![
            BigRational::zero();
            remainder.len() - divisor.coefficients.len() + 1
        ];

        for shift in (0..quotient.len()).rev() {
            let factor = &remainder[shift + divisor_degree] / leading;

            for (i, d) in divisor.coefficients.iter().enumerate() {
                remainder[shift + i] -= &factor * d;
            }
            quotient[shift] = factor;
        }

        (ExactPolynomial::new(quotient), ExactPolynomial::new(remainder))
    }

    /// The monic greatest common divisor, via Euclid's algorithm.
    fn gcd(&self, other: &Self) -> Self {
        let mut a = self.monic();
        let mut b = other.monic();

        while !b.is_zero() {
            let (_, remainder) = a.div_rem(&b);
            a = b;
            b = remainder.monic();
        }

        a
    }
}

fn exact_constant(value: f64) -> Option<BigRational> {
    if !value.is_finite() {
        return None;
    }
    if value.fract() == 0.0 {
        return BigRational::from_float(value);
    }

    let mut scale = 1.0;

    for _ in 0..MAX_DECIMAL_PLACES {
        scale *= 10.0;
        let scaled = value * scale;

        if scaled.fract() == 0.0
            && scaled.abs() < MAX_SAFE_INTEGER
            && scaled / scale == value
        {
            return Some(BigRational::new(
                BigInt::from(scaled as i64),
                BigInt::from(scale as i64),
            ));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Builtins;

    fn exact(src: &str) -> Option<ExactPolynomial> {
        let expr: Expression = src.parse().unwrap();
        let x = Parameter::named("x");
        ExactPolynomial::from_expression(&expr, &x, &Builtins)
    }

    fn integers(values: &[i64]) -> Vec<BigInt> {
        values.iter().map(|&v| BigInt::from(v)).collect()
    }

    #[test]
    fn decimals_are_exact() {
        assert_eq!(
            exact_constant(0.1),
            Some(BigRational::new(BigInt::from(1), BigInt::from(10)))
        );
        assert_eq!(
            exact_constant(-2.75),
            Some(BigRational::new(BigInt::from(-11), BigInt::from(4)))
        );
        assert_eq!(
            exact_constant(1e20),
            Some(BigRational::from_integer(BigInt::from(10).pow(20)))
        );
        assert_eq!(exact_constant(2_f64.sqrt()), None);
        assert_eq!(exact_constant(std::f64::INFINITY), None);
    }

    #[test]
    fn irrational_constants_are_not_exact() {
        assert!(exact("x - sqrt(2)").is_none());
        assert!(exact("x - sqrt(4)").is_some());
    }

    #[test]
    fn strip_repeated_factors() {
        let inputs = vec![
            ("(x^2 - 2)^2", vec![-2, 0, 1]),
            ("(x - 0.1)^3", vec![-1, 10]),
            ("(x - 3)^2 * (x + 1)", vec![-3, -2, 1]),
            ("x^3", vec![0, 1]),
            ("x^2 + 10*x - 5", vec![-5, 10, 1]),
        ];

        for (src, should_be) in inputs {
            let got = exact(src)
                .unwrap()
                .square_free()
                .primitive_integer_coefficients();

            assert_eq!(got, integers(&should_be), "{}", src);
        }
    }

    #[test]
    fn huge_powers_stay_exact() {
        let p = exact("(x + 1)^200").unwrap();

        assert_eq!(p.degree(), 200);
        // the middle coefficient is 200 choose 100, about 9e58
        assert!(p.coefficients()[100].to_integer().bits() > 190);
        assert_eq!(
            p.square_free().primitive_integer_coefficients(),
            integers(&[1, 1])
        );
    }

    #[test]
    fn long_division() {
        let dividend = exact("x^3 - 2*x^2 - 4").unwrap();
        let divisor = exact("x - 3").unwrap();

        let (quotient, remainder) = dividend.div_rem(&divisor);

        assert_eq!(quotient, exact("x^2 + x + 3").unwrap());
        assert_eq!(remainder, exact("5").unwrap());
    }

    #[test]
    fn fractional_coefficients_become_integers() {
        let p = exact("x/2 + 1/3").unwrap();

        assert_eq!(p.primitive_integer_coefficients(), integers(&[2, 3]));
    }
}
