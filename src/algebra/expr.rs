use smol_str::SmolStr;
use std::{
    fmt::{self, Display, Formatter},
    ops::{Add, Div, Mul, Neg, Sub},
};

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A free variable.
    Parameter(Parameter),
    Constant(f64),
    /// An expression involving two operands.
    Binary {
        left: Box<Expression>,
        right: Box<Expression>,
        op: BinaryOperation,
    },
    /// Negate the expression.
    Negate(Box<Expression>),
    /// Invoke a function by name (e.g. `sqrt(x)`).
    FunctionCall {
        function: SmolStr,
        argument: Box<Expression>,
    },
}

impl Expression {
    /// Create an [`Expression`] referring to a named [`Parameter`].
    pub fn symbol<S: Into<SmolStr>>(name: S) -> Self {
        Expression::Parameter(Parameter::named(name))
    }

    /// Raise this expression to some power.
    pub fn pow<E: Into<Expression>>(self, exponent: E) -> Self {
        Expression::Binary {
            left: Box::new(self),
            right: Box::new(exponent.into()),
            op: BinaryOperation::Power,
        }
    }

    /// Call a function (e.g. `sqrt`) with this expression as its argument.
    pub fn call<S: Into<SmolStr>>(self, function: S) -> Self {
        Expression::FunctionCall {
            function: function.into(),
            argument: Box::new(self),
        }
    }

    pub fn is_constant(&self) -> bool {
        match self {
            Expression::Constant(_) => true,
            _ => false,
        }
    }

    /// Iterate over every [`Parameter`] mentioned by this expression, in
    /// the order they appear (duplicates included).
    pub fn params(&self) -> impl Iterator<Item = &Parameter> + '_ {
        let mut params = Vec::new();
        collect_params(self, &mut params);
        params.into_iter()
    }

    /// The sorted, de-duplicated set of [`Parameter`]s in this expression.
    pub fn free_symbols(&self) -> Vec<Parameter> {
        let mut symbols: Vec<_> = self.params().cloned().collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }

    /// Does this expression mention a particular [`Parameter`]?
    pub fn depends_on(&self, param: &Parameter) -> bool {
        self.params().any(|p| p == param)
    }

    fn precedence(&self) -> u8 {
        match self {
            Expression::Parameter(_) | Expression::FunctionCall { .. } => {
                ATOM
            },
            Expression::Constant(value) if value.is_sign_negative() => NEGATE,
            Expression::Constant(_) => ATOM,
            Expression::Negate(_) => NEGATE,
            Expression::Binary { op, .. } => op.precedence(),
        }
    }
}

fn collect_params<'e>(expr: &'e Expression, params: &mut Vec<&'e Parameter>) {
    match expr {
        Expression::Parameter(p) => params.push(p),
        Expression::Constant(_) => {},
        Expression::Binary { left, right, .. } => {
            collect_params(left, params);
            collect_params(right, params);
        },
        Expression::Negate(inner) => collect_params(inner, params),
        Expression::FunctionCall { argument, .. } => {
            collect_params(argument, params)
        },
    }
}

/// A named placeholder variable (e.g. `x`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Parameter {
    name: SmolStr,
}

impl Parameter {
    pub fn named<S: Into<SmolStr>>(name: S) -> Self {
        Parameter { name: name.into() }
    }

    pub fn name(&self) -> &str { &self.name }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An operation that can be applied to two arguments.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BinaryOperation {
    Plus,
    Minus,
    Times,
    Divide,
    Power,
}

const SUM: u8 = 1;
const PRODUCT: u8 = 2;
const NEGATE: u8 = 3;
const POWER: u8 = 4;
const ATOM: u8 = 5;

impl BinaryOperation {
    fn precedence(self) -> u8 {
        match self {
            BinaryOperation::Plus | BinaryOperation::Minus => SUM,
            BinaryOperation::Times | BinaryOperation::Divide => PRODUCT,
            BinaryOperation::Power => POWER,
        }
    }

    fn is_right_associative(self) -> bool { self == BinaryOperation::Power }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOperation::Plus => " + ",
            BinaryOperation::Minus => " - ",
            BinaryOperation::Times => "*",
            BinaryOperation::Divide => "/",
            BinaryOperation::Power => "^",
        }
    }
}

impl From<Parameter> for Expression {
    fn from(p: Parameter) -> Expression { Expression::Parameter(p) }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Expression { Expression::Constant(value) }
}

// define some operator overloads to make constructing an expression easier.

macro_rules! binary_op_impls {
    ($($trait:ident :: $method:ident => $op:ident),* $(,)?) => {
        $(
            impl $trait for Expression {
                type Output = Expression;

                fn $method(self, rhs: Expression) -> Expression {
                    Expression::Binary {
                        left: Box::new(self),
                        right: Box::new(rhs),
                        op: BinaryOperation::$op,
                    }
                }
            }

            impl $trait<f64> for Expression {
                type Output = Expression;

                fn $method(self, rhs: f64) -> Expression {
                    self.$method(Expression::Constant(rhs))
                }
            }

            impl $trait<Expression> for f64 {
                type Output = Expression;

                fn $method(self, rhs: Expression) -> Expression {
                    Expression::Constant(self).$method(rhs)
                }
            }
        )*
    };
}

binary_op_impls! {
    Add::add => Plus,
    Sub::sub => Minus,
    Mul::mul => Times,
    Div::div => Divide,
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Self::Output { Expression::Negate(Box::new(self)) }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Parameter(p) => write!(f, "{}", p),
            Expression::Constant(value) => write!(f, "{}", value),
            Expression::Binary { left, right, op } => {
                let precedence = op.precedence();
                let (left_min, right_min) = if op.is_right_associative() {
                    (precedence + 1, precedence)
                } else {
                    (precedence, precedence + 1)
                };

                write_operand(left, left_min, f)?;
                write!(f, "{}", op.symbol())?;
                write_operand(right, right_min, f)
            },
            Expression::Negate(inner) => {
                write!(f, "-")?;
                write_operand(inner, NEGATE, f)
            },
            Expression::FunctionCall { function, argument } => {
                write!(f, "{}({})", function, argument)
            },
        }
    }
}

/// Write an operand, wrapping it in parentheses when it binds more loosely
/// than `min_precedence`.
fn write_operand(
    expr: &Expression,
    min_precedence: u8,
    f: &mut Formatter<'_>,
) -> fmt::Result {
    if expr.precedence() < min_precedence {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}
