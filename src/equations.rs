use crate::{
    ops::{self, Context, EvaluationError},
    solve::SolveError,
    Expression, Parameter, ParseError, Solution,
};
use nalgebra::DVector as Vector;
use std::{
    fmt::{self, Display, Formatter},
    iter::{Extend, FromIterator},
    str::FromStr,
};

/// An equation, stored as a single expression which is implicitly equal to
/// zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub(crate) body: Expression,
}

impl Equation {
    pub fn new(left: Expression, right: Expression) -> Self {
        Equation { body: left - right }
    }

    /// The expression which should equal zero.
    pub fn body(&self) -> &Expression { &self.body }

    pub fn unknowns(&self) -> Vec<Parameter> { self.body.free_symbols() }

    /// Find every value of this equation's only unknown which makes it true.
    pub fn solve<C>(&self, ctx: &C) -> Result<Vec<Solution>, SolveError>
    where
        C: Context,
    {
        crate::solve::solve_single(self, ctx)
    }

    /// How far this equation is from being satisfied (i.e. `left - right`)
    /// for the given parameter values.
    pub fn residual<F, C>(
        &self,
        lookup_parameter_value: F,
        ctx: &C,
    ) -> Result<f64, EvaluationError>
    where
        F: Fn(&Parameter) -> Option<f64>,
        C: Context,
    {
        ops::evaluate(&self.body, lookup_parameter_value, ctx)
    }
}

impl From<Expression> for Equation {
    fn from(body: Expression) -> Self { Equation { body } }
}

impl FromStr for Equation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.find('=') {
            Some(index) => {
                let (left, right) = s.split_at(index);
                let right = &right[1..];
                Ok(Equation::new(left.parse()?, right.parse()?))
            },
            None => Ok(Equation { body: s.parse()? }),
        }
    }
}

impl Display for Equation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} = 0", self.body)
    }
}

/// A builder for constructing a system of equations and solving them.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SystemOfEquations {
    pub(crate) equations: Vec<Equation>,
}

impl SystemOfEquations {
    pub fn new() -> Self { SystemOfEquations::default() }

    pub fn with<E: Into<Equation>>(mut self, equation: E) -> Self {
        self.push(equation);
        self
    }

    pub fn push<E: Into<Equation>>(&mut self, equation: E) {
        self.equations.push(equation.into());
    }

    pub fn solve<C>(&self, ctx: &C) -> Result<Vec<Solution>, SolveError>
    where
        C: Context,
    {
        crate::solve::solve(self, ctx)
    }

    pub fn equations(&self) -> &[Equation] { &self.equations }

    pub fn unknowns(&self) -> Vec<Parameter> {
        let mut unknowns: Vec<_> = self
            .equations
            .iter()
            .flat_map(|eq| eq.body.params())
            .cloned()
            .collect();
        unknowns.sort();
        unknowns.dedup();

        unknowns
    }

    pub fn num_unknowns(&self) -> usize { self.unknowns().len() }

    pub fn from_equations<E, S>(equations: E) -> Result<Self, ParseError>
    where
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut system = SystemOfEquations::new();

        for equation in equations {
            system.push(equation.as_ref().parse::<Equation>()?);
        }

        Ok(system)
    }

    /// Evaluate every equation, giving how far each one is from being
    /// satisfied.
    pub fn residuals<F, C>(
        &self,
        lookup_parameter_value: F,
        ctx: &C,
    ) -> Result<Vector<f64>, EvaluationError>
    where
        F: Fn(&Parameter) -> Option<f64>,
        C: Context,
    {
        residuals(&self.equations, lookup_parameter_value, ctx)
    }
}

pub(crate) fn residuals<F, C>(
    equations: &[Equation],
    lookup_parameter_value: F,
    ctx: &C,
) -> Result<Vector<f64>, EvaluationError>
where
    F: Fn(&Parameter) -> Option<f64>,
    C: Context,
{
    let mut values = Vec::with_capacity(equations.len());

    for equation in equations {
        values.push(equation.residual(&lookup_parameter_value, ctx)?);
    }

    Ok(Vector::from_vec(values))
}

impl Extend<Equation> for SystemOfEquations {
    fn extend<T: IntoIterator<Item = Equation>>(&mut self, iter: T) {
        self.equations.extend(iter);
    }
}

impl FromIterator<Equation> for SystemOfEquations {
    fn from_iter<T: IntoIterator<Item = Equation>>(iter: T) -> Self {
        SystemOfEquations {
            equations: Vec::from_iter(iter),
        }
    }
}

impl<'a> IntoIterator for &'a SystemOfEquations {
    type IntoIter = <&'a [Equation] as IntoIterator>::IntoIter;
    type Item = &'a Equation;

    fn into_iter(self) -> Self::IntoIter { self.equations.iter() }
}

impl IntoIterator for SystemOfEquations {
    type IntoIter = <Vec<Equation> as IntoIterator>::IntoIter;
    type Item = Equation;

    fn into_iter(self) -> Self::IntoIter { self.equations.into_iter() }
}
