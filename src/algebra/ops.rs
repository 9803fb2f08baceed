//! [`Expression`] operations.

use crate::algebra::{BinaryOperation, Expression, Parameter};
use euclid::approxeq::ApproxEq;
use smol_str::SmolStr;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Contextual information used when evaluating an [`Expression`].
pub trait Context {
    fn evaluate_function(
        &self,
        name: &str,
        argument: f64,
    ) -> Result<f64, EvaluationError>;

    /// For some [`Parameter`], `x`, and function, `f`, get `f'(x)`.
    fn differentiate_function(
        &self,
        name: &str,
        param: &Parameter,
    ) -> Result<Expression, EvaluationError>;
}

impl<'a, C: Context + ?Sized> Context for &'a C {
    fn evaluate_function(
        &self,
        name: &str,
        argument: f64,
    ) -> Result<f64, EvaluationError> {
        (**self).evaluate_function(name, argument)
    }

    fn differentiate_function(
        &self,
        name: &str,
        param: &Parameter,
    ) -> Result<Expression, EvaluationError> {
        (**self).differentiate_function(name, param)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationError {
    UnknownFunction { name: SmolStr },
    UnableToDifferentiate { name: SmolStr },
    UnknownParameter { name: SmolStr },
}

impl Display for EvaluationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationError::UnknownFunction { name } => {
                write!(f, "Unknown function, \"{}\"", name)
            },
            EvaluationError::UnableToDifferentiate { name } => {
                write!(f, "Unable to differentiate \"{}\"", name)
            },
            EvaluationError::UnknownParameter { name } => {
                write!(f, "No value was provided for \"{}\"", name)
            },
        }
    }
}

impl Error for EvaluationError {}

/// The set of builtin functions.
///
/// Trigonometric functions work in radians.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Builtins;

impl Context for Builtins {
    fn evaluate_function(
        &self,
        name: &str,
        argument: f64,
    ) -> Result<f64, EvaluationError> {
        match name {
            "sin" => Ok(argument.sin()),
            "cos" => Ok(argument.cos()),
            "tan" => Ok(argument.tan()),
            "asin" => Ok(argument.asin()),
            "acos" => Ok(argument.acos()),
            "atan" => Ok(argument.atan()),
            "sqrt" => Ok(argument.sqrt()),
            "exp" => Ok(argument.exp()),
            "ln" => Ok(argument.ln()),
            "abs" => Ok(argument.abs()),
            _ => Err(EvaluationError::UnknownFunction { name: name.into() }),
        }
    }

    fn differentiate_function(
        &self,
        name: &str,
        param: &Parameter,
    ) -> Result<Expression, EvaluationError> {
        let x = Expression::Parameter(param.clone());

        match name {
            "sin" => Ok(x.call("cos")),
            "cos" => Ok(-x.call("sin")),
            "tan" => Ok(1.0 / x.call("cos").pow(2.0)),
            "asin" => Ok(1.0 / (1.0 - x.pow(2.0)).call("sqrt")),
            "acos" => Ok(-1.0 / (1.0 - x.pow(2.0)).call("sqrt")),
            "atan" => Ok(1.0 / (1.0 + x.pow(2.0))),
            "sqrt" => Ok(Expression::Constant(0.5) / x.call("sqrt")),
            "exp" => Ok(x.call("exp")),
            "ln" => Ok(1.0 / x),
            _ => Err(EvaluationError::UnableToDifferentiate {
                name: name.into(),
            }),
        }
    }
}

/// Evaluate an [`Expression`], using `lookup_parameter_value` to find the
/// value of each [`Parameter`].
pub fn evaluate<F, C>(
    expr: &Expression,
    lookup_parameter_value: F,
    ctx: &C,
) -> Result<f64, EvaluationError>
where
    F: Fn(&Parameter) -> Option<f64>,
    C: Context,
{
    evaluate_with(expr, &lookup_parameter_value, ctx)
}

fn evaluate_with<F, C>(
    expr: &Expression,
    lookup: &F,
    ctx: &C,
) -> Result<f64, EvaluationError>
where
    F: Fn(&Parameter) -> Option<f64>,
    C: Context,
{
    match expr {
        Expression::Parameter(p) => {
            lookup(p).ok_or_else(|| EvaluationError::UnknownParameter {
                name: p.name().into(),
            })
        },
        Expression::Constant(value) => Ok(*value),
        Expression::Binary { left, right, op } => {
            let left = evaluate_with(left, lookup, ctx)?;
            let right = evaluate_with(right, lookup, ctx)?;
            Ok(apply(*op, left, right))
        },
        Expression::Negate(inner) => Ok(-evaluate_with(inner, lookup, ctx)?),
        Expression::FunctionCall { function, argument } => {
            let argument = evaluate_with(argument, lookup, ctx)?;
            ctx.evaluate_function(function, argument)
        },
    }
}

fn apply(op: BinaryOperation, left: f64, right: f64) -> f64 {
    match op {
        BinaryOperation::Plus => left + right,
        BinaryOperation::Minus => left - right,
        BinaryOperation::Times => left * right,
        BinaryOperation::Divide => left / right,
        BinaryOperation::Power => power(left, right),
    }
}

fn power(base: f64, exponent: f64) -> f64 {
    let is_small_integer =
        exponent.fract() == 0.0 && exponent.abs() <= i32::MAX as f64;

    if is_small_integer {
        base.powi(exponent as i32)
    } else {
        base.powf(exponent)
    }
}

/// Simplify an expression by evaluating all constant operations.
pub fn fold_constants<C>(expr: &Expression, ctx: &C) -> Expression
where
    C: Context,
{
    match expr {
        Expression::Binary { left, right, op } => {
            fold_binary_op(left, right, *op, ctx)
        },
        Expression::Negate(expr) => match fold_constants(expr, ctx) {
            Expression::Constant(value) => Expression::Constant(-value),
            // double negative
            Expression::Negate(inner) => *inner,
            other => Expression::Negate(Box::new(other)),
        },
        Expression::FunctionCall { function, argument } => {
            let argument = fold_constants(argument, ctx);

            if let Expression::Constant(argument) = argument {
                if let Ok(result) = ctx.evaluate_function(function, argument) {
                    return Expression::Constant(result);
                }
            }

            Expression::FunctionCall {
                function: function.clone(),
                argument: Box::new(argument),
            }
        },
        _ => expr.clone(),
    }
}

fn fold_binary_op<C>(
    left: &Expression,
    right: &Expression,
    op: BinaryOperation,
    ctx: &C,
) -> Expression
where
    C: Context,
{
    let left = fold_constants(left, ctx);
    let right = fold_constants(right, ctx);

    // If our operands contain constants, we can use arithmetic's identity laws
    // to simplify things
    match (left, right, op) {
        // x + x = 2*x
        (left, right, BinaryOperation::Plus)
            if left == right && !left.is_constant() =>
        {
            fold_constants(&(Expression::Constant(2.0) * left), ctx)
        },
        (left, right, BinaryOperation::Minus)
            if left == right && !left.is_constant() =>
        {
            Expression::Constant(0.0)
        },
        (left, right, BinaryOperation::Divide)
            if left == right && !left.is_constant() =>
        {
            Expression::Constant(1.0)
        },

        // x + 0 = x
        (Expression::Constant(l), right, BinaryOperation::Plus)
            if l.approx_eq(&0.0) =>
        {
            right
        },
        (left, Expression::Constant(r), BinaryOperation::Plus)
            if r.approx_eq(&0.0) =>
        {
            left
        },

        // 0 * x = 0
        (Expression::Constant(l), _, BinaryOperation::Times)
            if l.approx_eq(&0.0) =>
        {
            Expression::Constant(0.0)
        },
        (_, Expression::Constant(r), BinaryOperation::Times)
            if r.approx_eq(&0.0) =>
        {
            Expression::Constant(0.0)
        },

        // 1 * x = x
        (Expression::Constant(l), right, BinaryOperation::Times)
            if l.approx_eq(&1.0) =>
        {
            right
        },
        (left, Expression::Constant(r), BinaryOperation::Times)
            if r.approx_eq(&1.0) =>
        {
            left
        },

        // 0 / x = 0
        (Expression::Constant(l), right, BinaryOperation::Divide)
            if l.approx_eq(&0.0) && !right.is_constant() =>
        {
            Expression::Constant(0.0)
        },

        // x / 1 = x
        (left, Expression::Constant(r), BinaryOperation::Divide)
            if r.approx_eq(&1.0) =>
        {
            left
        },

        // 0 - x = -x
        (Expression::Constant(l), right, BinaryOperation::Minus)
            if l.approx_eq(&0.0) && !right.is_constant() =>
        {
            -right
        },

        // x - 0 = x
        (left, Expression::Constant(r), BinaryOperation::Minus)
            if r.approx_eq(&0.0) =>
        {
            left
        },

        // x^0 = 1
        (_, Expression::Constant(r), BinaryOperation::Power)
            if r.approx_eq(&0.0) =>
        {
            Expression::Constant(1.0)
        },

        // x^1 = x
        (left, Expression::Constant(r), BinaryOperation::Power)
            if r.approx_eq(&1.0) =>
        {
            left
        },

        // 1^x = 1
        (Expression::Constant(l), _, BinaryOperation::Power)
            if l.approx_eq(&1.0) =>
        {
            Expression::Constant(1.0)
        },

        // (x * y) * z
        (
            Expression::Constant(constant_a),
            Expression::Binary {
                left,
                right,
                op: BinaryOperation::Times,
            },
            BinaryOperation::Times,
        ) if left.is_constant() || right.is_constant() => {
            let (constant_b, expr) = split_constant_factor(&left, &right);
            Expression::Constant(constant_a * constant_b)
                * Expression::clone(expr)
        },
        (
            Expression::Binary {
                left,
                right,
                op: BinaryOperation::Times,
            },
            Expression::Constant(constant_a),
            BinaryOperation::Times,
        ) if left.is_constant() || right.is_constant() => {
            let (constant_b, expr) = split_constant_factor(&left, &right);
            Expression::Constant(constant_a * constant_b)
                * Expression::clone(expr)
        },

        // Evaluate in-place
        (Expression::Constant(l), Expression::Constant(r), op) => {
            Expression::Constant(apply(op, l, r))
        },

        // Oh well, we tried
        (left, right, op) => Expression::Binary {
            left: Box::new(left),
            right: Box::new(right),
            op,
        },
    }
}

/// Given the operands of a product where at least one side is a constant,
/// pull out that constant and the remaining factor.
fn split_constant_factor<'e>(
    left: &'e Expression,
    right: &'e Expression,
) -> (f64, &'e Expression) {
    match (left, right) {
        (Expression::Constant(left), right) => (*left, right),
        (left, Expression::Constant(right)) => (*right, left),
        _ => unreachable!("One of the operands should be a constant"),
    }
}

/// Replace all references to a [`Parameter`] with an [`Expression`].
pub fn substitute(
    expression: &Expression,
    param: &Parameter,
    value: &Expression,
) -> Expression {
    match expression {
        Expression::Parameter(p) => {
            if p == param {
                value.clone()
            } else {
                Expression::Parameter(p.clone())
            }
        },
        Expression::Constant(value) => Expression::Constant(*value),
        Expression::Binary { left, right, op } => {
            let left = substitute(left, param, value);
            let right = substitute(right, param, value);
            Expression::Binary {
                left: Box::new(left),
                right: Box::new(right),
                op: *op,
            }
        },
        Expression::Negate(inner) => -substitute(inner, param, value),
        Expression::FunctionCall { function, argument } => {
            Expression::FunctionCall {
                function: function.clone(),
                argument: Box::new(substitute(argument, param, value)),
            }
        },
    }
}

/// Calculate an [`Expression`]'s partial derivative with respect to a
/// particular [`Parameter`].
pub fn partial_derivative<C>(
    expr: &Expression,
    param: &Parameter,
    ctx: &C,
) -> Result<Expression, EvaluationError>
where
    C: Context,
{
    let got = match expr {
        Expression::Parameter(p) => {
            if p == param {
                Expression::Constant(1.0)
            } else {
                Expression::Constant(0.0)
            }
        },
        Expression::Constant(_) => Expression::Constant(0.0),
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Plus,
        } => {
            partial_derivative(left, param, ctx)?
                + partial_derivative(right, param, ctx)?
        },
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Minus,
        } => {
            partial_derivative(left, param, ctx)?
                - partial_derivative(right, param, ctx)?
        },
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Times,
        } => {
            // The product rule
            let d_left = partial_derivative(left, param, ctx)?;
            let d_right = partial_derivative(right, param, ctx)?;
            let left = Expression::clone(left);
            let right = Expression::clone(right);

            d_left * right + d_right * left
        },
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Divide,
        } => {
            // The quotient rule
            let d_left = partial_derivative(left, param, ctx)?;
            let d_right = partial_derivative(right, param, ctx)?;
            let right = Expression::clone(right);
            let left = Expression::clone(left);

            (d_left * right.clone() - left * d_right) / (right.clone() * right)
        },
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Power,
        } if !right.depends_on(param) => {
            // The power rule: (u^n)' = n * u^(n - 1) * u'
            let d_left = partial_derivative(left, param, ctx)?;
            let n = Expression::clone(right);
            let base = Expression::clone(left);

            n.clone() * base.pow(n - 1.0) * d_left
        },
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Power,
        } => {
            // (u^v)' = u^v * (v' * ln(u) + v * u' / u)
            let d_left = partial_derivative(left, param, ctx)?;
            let d_right = partial_derivative(right, param, ctx)?;
            let u = Expression::clone(left);
            let v = Expression::clone(right);

            expr.clone()
                * (d_right * u.clone().call("ln") + v * d_left / u)
        },

        Expression::Negate(inner) => -partial_derivative(inner, param, ctx)?,
        Expression::FunctionCall { function, argument } => {
            // implement the chain rule: (f o g)' = (f' o g) * g'
            let g = Parameter::named("__temp__");
            let f_dash_of_g = ctx.differentiate_function(function, &g)?;
            let g_dash = partial_derivative(argument, param, ctx)?;

            substitute(&f_dash_of_g, &g, argument) * g_dash
        },
    };

    Ok(got)
}
