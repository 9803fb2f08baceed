use crate::{
    equations,
    ops::{self, Context, EvaluationError},
    polynomial::Polynomial,
    roots, Equation, Expression, Parameter, ParseError, Solution,
    SystemOfEquations, Value,
};
use nalgebra::{DMatrix as Matrix, DVector as Vector};
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Starting points for Newton's method, tried in order until one of them
/// converges.
const INITIAL_GUESSES: [f64; 4] = [0.0, 1.0, -1.0, 2.5];

/// A singular matrix is treated as rank deficient below this tolerance.
const RANK_TOLERANCE: f64 = 1e-9;

pub(crate) fn solve<C>(
    system: &SystemOfEquations,
    ctx: &C,
) -> Result<Vec<Solution>, SolveError>
where
    C: Context,
{
    let unknowns = system.unknowns();

    match (system.equations.as_slice(), unknowns.len()) {
        ([], _) => Ok(Vec::new()),
        ([equation], _) => solve_single(equation, ctx),
        (equations, num_unknowns) if equations.len() != num_unknowns => {
            Err(SolveError::NotSquare {
                equations: equations.len(),
                unknowns: num_unknowns,
            })
        },
        (equations, _) => {
            log::debug!(
                "Solving {} equations in {} unknowns with Newton's method",
                equations.len(),
                unknowns.len()
            );
            solve_with_jacobian(equations, &unknowns, ctx)
        },
    }
}

pub(crate) fn solve_single<C>(
    equation: &Equation,
    ctx: &C,
) -> Result<Vec<Solution>, SolveError>
where
    C: Context,
{
    let unknowns = equation.unknowns();

    match unknowns.as_slice() {
        [] => {
            let value = ops::evaluate(&equation.body, |_| None, ctx)?;

            if value == 0.0 {
                Err(SolveError::InfiniteSolutions)
            } else {
                Ok(Vec::new())
            }
        },
        [unknown] => {
            match Polynomial::from_expression(&equation.body, unknown, ctx) {
                Ok(polynomial) => {
                    log::debug!(
                        "Finding the roots of a degree {} polynomial in {}",
                        polynomial.degree(),
                        unknown
                    );
                    solve_polynomial(&polynomial, unknown)
                },
                Err(e) => {
                    log::debug!("{}, falling back to Newton's method", e);
                    solve_with_jacobian(
                        std::slice::from_ref(equation),
                        &unknowns,
                        ctx,
                    )
                },
            }
        },
        _ => Err(SolveError::Underdetermined { unknowns }),
    }
}

fn solve_polynomial(
    polynomial: &Polynomial,
    unknown: &Parameter,
) -> Result<Vec<Solution>, SolveError> {
    if polynomial.is_zero() {
        return Err(SolveError::InfiniteSolutions);
    }
    if polynomial.degree() == 0 {
        return Ok(Vec::new());
    }

    Ok(roots::find_roots(polynomial)
        .into_iter()
        .map(|root| Solution::new().with(unknown.clone(), root))
        .collect())
}

fn solve_with_jacobian<C>(
    equations: &[Equation],
    unknowns: &[Parameter],
    ctx: &C,
) -> Result<Vec<Solution>, SolveError>
where
    C: Context,
{
    let jacobian = Jacobian::for_equations(equations, unknowns, ctx)?;

    if jacobian.is_constant() {
        return solve_linear(&jacobian, ctx);
    }

    let mut last_error = SolveError::NoSolution;

    for &guess in INITIAL_GUESSES.iter() {
        let x_0 = Vector::from_element(unknowns.len(), guess);

        match solve_with_newtons_method(&jacobian, x_0, ctx) {
            Ok(got) => {
                let values = got.iter().map(|&v| Value::real(v));
                return Ok(vec![jacobian.collate_unknowns(values)]);
            },
            Err(e @ SolveError::Eval(_)) => return Err(e),
            Err(e) => {
                log::debug!("Starting from {} failed: {}", guess, e);
                last_error = e;
            },
        }
    }

    Err(last_error)
}

/// When every partial derivative is a constant the system is linear, so a
/// single Newton step from the origin lands on the answer.
fn solve_linear<C>(
    jacobian: &Jacobian,
    ctx: &C,
) -> Result<Vec<Solution>, SolveError>
where
    C: Context,
{
    let x_0 = jacobian.initial_values();
    let a = jacobian.evaluate(x_0.as_slice(), ctx)?;
    let lookup = jacobian.lookup_value_by_name(x_0.as_slice());
    let f_of_x = equations::residuals(jacobian.equations, &lookup, ctx)?;

    match step_newtons_method(a.clone(), &x_0, f_of_x.clone()) {
        Ok(got) => {
            let values =
                got.iter().map(|&v| Value::real_with_exact_fraction(v));
            Ok(vec![jacobian.collate_unknowns(values)])
        },
        Err(SolveError::NoSolution) => {
            let augmented = Matrix::from_fn(a.nrows(), a.ncols() + 1, |r, c| {
                if c < a.ncols() {
                    a[(r, c)]
                } else {
                    -f_of_x[r]
                }
            });

            if a.rank(RANK_TOLERANCE) == augmented.rank(RANK_TOLERANCE) {
                Err(SolveError::InfiniteSolutions)
            } else {
                log::debug!("The linear system is inconsistent");
                Ok(Vec::new())
            }
        },
        Err(e) => Err(e),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    Parse(ParseError),
    Eval(EvaluationError),
    DidntConverge,
    NoSolution,
    /// Every value of the unknowns satisfies the equations.
    InfiniteSolutions,
    /// A single equation mentions more than one unknown.
    Underdetermined {
        unknowns: Vec<Parameter>,
    },
    /// Newton's method needs one equation per unknown.
    NotSquare {
        equations: usize,
        unknowns: usize,
    },
}

impl From<EvaluationError> for SolveError {
    fn from(e: EvaluationError) -> Self { SolveError::Eval(e) }
}

impl From<ParseError> for SolveError {
    fn from(e: ParseError) -> Self { SolveError::Parse(e) }
}

impl Display for SolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::Parse(_) => write!(f, "Unable to parse the equations"),
            SolveError::Eval(_) => write!(f, "Evaluation failed"),
            SolveError::DidntConverge => {
                write!(f, "The solution didn't converge")
            },
            SolveError::NoSolution => write!(f, "No solution found"),
            SolveError::InfiniteSolutions => {
                write!(f, "There are infinitely many solutions")
            },
            SolveError::Underdetermined { unknowns } => {
                write!(f, "Unable to solve one equation for ")?;

                for (i, unknown) in unknowns.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", unknown)?;
                }

                Ok(())
            },
            SolveError::NotSquare {
                equations,
                unknowns,
            } => write!(
                f,
                "Expected one equation per unknown, found {} equations and {} unknowns",
                equations, unknowns
            ),
        }
    }
}

impl Error for SolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SolveError::Parse(inner) => Some(inner),
            SolveError::Eval(inner) => Some(inner),
            _ => None,
        }
    }
}

/// Solve a set of non-linear equations iteratively using Newton's method.
///
/// The iterative equation for Newton's method when applied to a set of
/// equations, `F`, is:
///
/// ```text
///  x_next = x_current - jacobian(F).inverse() * F(x_current)
/// ```
///
/// This is the multi-variable equivalent of Newton-Raphson, where the jacobian
/// is the slope of our equations, and we pre-multiply by the inverse because
/// that's the matrix equivalent of division.
///
/// Calculating the inverse of a matrix is expensive though, so we rearrange
/// it to look like this:
///
/// ```text
/// jacobian(F) * (x_next - x_current) = -F(x_current)
/// ```
///
/// ... Which is in the form `A.δx = b`.
///
/// We can then solve for `δx` using gaussian elimination, then get the refined
/// solution by solving `δx = x_next - x_current`.
///
/// See also:
///
/// - https://en.wikipedia.org/wiki/Newton%27s_method#Nonlinear_systems_of_equations
/// - https://www.youtube.com/watch?v=zPDp_ewoyhM
fn solve_with_newtons_method<C>(
    jacobian: &Jacobian,
    initial_values: Vector<f64>,
    ctx: &C,
) -> Result<Vector<f64>, SolveError>
where
    C: Context,
{
    const MAX_ITERATIONS: usize = 50;
    const TOLERANCE: f64 = 1e-12;

    let mut solution = initial_values;

    for iteration in 0..MAX_ITERATIONS {
        let x_next = {
            let evaluated_jacobian =
                jacobian.evaluate(solution.as_slice(), ctx)?;

            let lookup = jacobian.lookup_value_by_name(solution.as_slice());
            let f_of_x =
                equations::residuals(jacobian.equations, &lookup, ctx)?;
            step_newtons_method(evaluated_jacobian, &solution, f_of_x)?
        };
        log::trace!("Iteration {}: {}", iteration, x_next.transpose());

        if x_next.iter().any(|v| !v.is_finite()) {
            return Err(SolveError::DidntConverge);
        }

        if approx::relative_eq!(
            x_next,
            solution,
            epsilon = TOLERANCE,
            max_relative = TOLERANCE
        ) {
            return Ok(x_next);
        }
        solution = x_next;
    }

    Err(SolveError::DidntConverge)
}

fn step_newtons_method(
    jacobian: Matrix<f64>,
    x: &Vector<f64>,
    f_of_x: Vector<f64>,
) -> Result<Vector<f64>, SolveError> {
    // We're trying to solve:
    //   x_next = x_current - jacobian(F).inverse() * F(x_current)
    //
    // Which gets rearranged as:
    //   jacobian(F) * (x_next - x_current) = -F(x_current)
    //
    // Note that we use LU decomposition to solve equations of the form `Ax = b`

    let negative_f_of_x = -f_of_x;
    let delta_x = jacobian
        .lu()
        .solve(&negative_f_of_x)
        .ok_or(SolveError::NoSolution)?;

    Ok(delta_x + x)
}

/// A matrix of [`Expression`]s representing the partial derivatives for each
/// parameter in each equation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Jacobian<'a> {
    cells: Box<[Expression]>,
    equations: &'a [Equation],
    unknowns: &'a [Parameter],
}

impl<'a> Jacobian<'a> {
    fn for_equations<C>(
        equations: &'a [Equation],
        unknowns: &'a [Parameter],
        ctx: &C,
    ) -> Result<Self, EvaluationError>
    where
        C: Context,
    {
        let mut cells = Vec::new();

        for equation in equations {
            for unknown in unknowns {
                let value = if equation.body.depends_on(unknown) {
                    let derivative =
                        ops::partial_derivative(&equation.body, unknown, ctx)?;
                    ops::fold_constants(&derivative, ctx)
                } else {
                    Expression::Constant(0.0)
                };
                cells.push(value);
            }
        }

        Ok(Jacobian {
            cells: cells.into_boxed_slice(),
            equations,
            unknowns,
        })
    }

    fn rows(&self) -> usize { self.equations.len() }

    fn columns(&self) -> usize { self.unknowns.len() }

    fn is_constant(&self) -> bool {
        self.cells.iter().all(|cell| match cell {
            Expression::Constant(_) => true,
            _ => false,
        })
    }

    fn evaluate<C>(
        &self,
        parameter_values: &[f64],
        ctx: &C,
    ) -> Result<Matrix<f64>, EvaluationError>
    where
        C: Context,
    {
        debug_assert_eq!(parameter_values.len(), self.unknowns.len());

        let mut values = Vec::with_capacity(self.cells.len());
        let lookup = self.lookup_value_by_name(parameter_values);

        for row in self.iter_rows() {
            for expression in row {
                values.push(ops::evaluate(&expression, &lookup, ctx)?);
            }
        }

        Ok(Matrix::from_row_slice(self.rows(), self.columns(), &values))
    }

    fn lookup_value_by_name<'p>(
        &'p self,
        parameter_values: &'p [f64],
    ) -> impl Fn(&Parameter) -> Option<f64> + 'p {
        move |parameter| {
            self.unknowns
                .iter()
                .position(|p| p == parameter)
                .map(|ix| parameter_values[ix])
        }
    }

    fn collate_unknowns<V>(&self, values: V) -> Solution
    where
        V: IntoIterator<Item = Value>,
    {
        Solution {
            known_values: self.unknowns.iter().cloned().zip(values).collect(),
        }
    }

    fn initial_values(&self) -> Vector<f64> {
        Vector::zeros(self.unknowns.len())
    }

    fn iter_rows(&self) -> impl Iterator<Item = &[Expression]> + '_ {
        self.cells.chunks_exact(self.columns())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Builtins;

    fn real(solution: &Solution, name: &str) -> f64 {
        solution.get(name).and_then(Value::as_real).unwrap()
    }

    #[test]
    fn single_equality() {
        let equation: Equation = "x = 5".parse().unwrap();
        let builtins = Builtins::default();

        let got = SystemOfEquations::new()
            .with(equation)
            .solve(&builtins)
            .unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].known_values.len(), 1);
        assert_eq!(real(&got[0], "x"), 5.0);
        assert_eq!(got[0].get("x").unwrap().to_string(), "5");
    }

    #[test]
    fn calculate_jacobian_of_known_system_of_equations() {
        // See https://en.wikipedia.org/wiki/Jacobian_matrix_and_determinant#Example_5
        let system = SystemOfEquations::from_equations(&[
            "5 * b",
            "4*a*a - 2*sin(b*c)",
            "b*c",
        ])
        .unwrap();
        let ctx = Builtins::default();

        let unknowns = system.unknowns();
        let got = Jacobian::for_equations(&system.equations, &unknowns, &ctx)
            .unwrap();

        assert_eq!(
            got.columns(),
            system.num_unknowns(),
            "There are 3 unknowns"
        );
        assert_eq!(got.rows(), system.equations.len(), "There are 3 equations");

        // The symbolic derivatives can come out in a different (but
        // equivalent) form, so compare them numerically instead
        let (a, b, c) = (0.5_f64, 1.5_f64, -2.0_f64);
        let should_be = Matrix::from_row_slice(
            3,
            3,
            &[
                0.0,
                5.0,
                0.0,
                8.0 * a,
                -2.0 * c * (b * c).cos(),
                -2.0 * b * (b * c).cos(),
                0.0,
                c,
                b,
            ],
        );
        let evaluated = got.evaluate(&[a, b, c], &ctx).unwrap();
        approx::assert_relative_eq!(evaluated, should_be, epsilon = 1e-12);
    }

    #[test]
    fn jacobian_rows_follow_the_equations() {
        let system =
            SystemOfEquations::from_equations(&["3*x + 5*y", "10*x - 3*y"])
                .unwrap();
        let ctx = Builtins::default();
        let unknowns = system.unknowns();

        let jacobian =
            Jacobian::for_equations(&system.equations, &unknowns, &ctx)
                .unwrap();

        assert!(jacobian.is_constant());
        assert_eq!(
            jacobian.evaluate(&[0.0, 0.0], &ctx).unwrap(),
            Matrix::from_row_slice(2, 2, &[3.0, 5.0, 10.0, -3.0])
        );
    }

    #[test]
    fn solve_simple_equations() {
        let system =
            SystemOfEquations::from_equations(&["x-1", "y-2", "z-3"]).unwrap();
        let ctx = Builtins::default();
        let unknowns = system.unknowns();
        let jacobian =
            Jacobian::for_equations(&system.equations, &unknowns, &ctx)
                .unwrap();

        let got = solve_with_newtons_method(
            &jacobian,
            jacobian.initial_values(),
            &ctx,
        )
        .unwrap();

        assert_eq!(got.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn work_through_youtube_example() {
        // From https://www.youtube.com/watch?v=zPDp_ewoyhM
        let system = SystemOfEquations::from_equations(&[
            "a + 2*b - 2",
            "a*a + 4*b*b - 4",
        ])
        .unwrap();
        let ctx = Builtins::default();

        // first we need to calculate the jacobian
        let unknowns = system.unknowns();
        let jacobian =
            Jacobian::for_equations(&system.equations, &unknowns, &ctx)
                .unwrap();
        assert!(!jacobian.is_constant());

        // make an initial guess
        let x_0 = Vector::from_vec(vec![1.0, 2.0]);

        // evaluate the components we need
        let jacobian_of_x_0 = jacobian.evaluate(x_0.as_slice(), &ctx).unwrap();
        let lookup_parameter_value =
            jacobian.lookup_value_by_name(x_0.as_slice());
        let f_of_x_0 =
            system.residuals(lookup_parameter_value, &ctx).unwrap();

        // and double-check them
        assert_eq!(
            jacobian_of_x_0,
            Matrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 16.0])
        );
        assert_eq!(f_of_x_0.as_slice(), &[3.0, 13.0]);

        // one iteration of newton's method
        let x_1 = step_newtons_method(jacobian_of_x_0, &x_0, f_of_x_0).unwrap();
        let should_be = Vector::from_vec(vec![-10.0 / 12.0, 17.0 / 12.0]);
        approx::assert_relative_eq!(x_1, should_be, epsilon = 1e-12);
    }

    #[test]
    fn linear_system_gets_exact_fractions() {
        let system = SystemOfEquations::from_equations(&[
            "3*x + 5*y = 5",
            "10*x - 3*y = 15",
            "4*y + 10*z = 19",
        ])
        .unwrap();

        let got = system.solve(&Builtins).unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].to_string(), "{x: 90/59, y: 5/59, z: 1101/590}");
    }

    #[test]
    fn nonlinear_system_converges() {
        let system = SystemOfEquations::from_equations(&[
            "a + 2*b - 2",
            "a*a + 4*b*b - 4",
        ])
        .unwrap();

        let got = system.solve(&Builtins).unwrap();

        assert_eq!(got.len(), 1);
        let (a, b) = (real(&got[0], "a"), real(&got[0], "b"));
        approx::assert_abs_diff_eq!(a + 2.0 * b, 2.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(a * a + 4.0 * b * b, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn transcendental_equation_falls_back_to_newton() {
        let equation: Equation = "sin(x) = 0.5".parse().unwrap();

        let got = equation.solve(&Builtins).unwrap();

        assert_eq!(got.len(), 1);
        approx::assert_relative_eq!(
            real(&got[0], "x"),
            std::f64::consts::FRAC_PI_6,
            epsilon = 1e-9
        );
    }

    #[test]
    fn a_flat_starting_point_tries_another_guess() {
        // the derivative of cos(x) is zero at the origin
        let equation: Equation = "cos(x)".parse().unwrap();

        let got = equation.solve(&Builtins).unwrap();

        let x = real(&got[0], "x");
        approx::assert_abs_diff_eq!(x.cos(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_equations() {
        let no_solution: Equation = "1 = 2".parse().unwrap();
        assert_eq!(no_solution.solve(&Builtins), Ok(Vec::new()));

        let always_true: Equation = "x^2 - x^2".parse().unwrap();
        assert_eq!(
            always_true.solve(&Builtins),
            Err(SolveError::InfiniteSolutions)
        );

        let constant: Equation = "3 = 3".parse().unwrap();
        assert_eq!(
            constant.solve(&Builtins),
            Err(SolveError::InfiniteSolutions)
        );
    }

    #[test]
    fn one_equation_with_two_unknowns() {
        let equation: Equation = "x + y = 1".parse().unwrap();

        let got = equation.solve(&Builtins).unwrap_err();

        assert_eq!(
            got,
            SolveError::Underdetermined {
                unknowns: vec![Parameter::named("x"), Parameter::named("y")]
            }
        );
    }

    #[test]
    fn systems_must_be_square() {
        let system =
            SystemOfEquations::from_equations(&["x + y + z", "x - y"]).unwrap();

        let got = system.solve(&Builtins).unwrap_err();

        assert_eq!(
            got,
            SolveError::NotSquare {
                equations: 2,
                unknowns: 3
            }
        );
    }

    #[test]
    fn singular_linear_systems() {
        let dependent =
            SystemOfEquations::from_equations(&["x + y = 1", "2*x + 2*y = 2"])
                .unwrap();
        assert_eq!(
            dependent.solve(&Builtins),
            Err(SolveError::InfiniteSolutions)
        );

        let inconsistent =
            SystemOfEquations::from_equations(&["x + y = 1", "x + y = 2"])
                .unwrap();
        assert_eq!(inconsistent.solve(&Builtins), Ok(Vec::new()));
    }

    #[test]
    fn polynomials_give_every_root() {
        let equation: Equation = "x^2 = 16".parse().unwrap();

        let got = equation.solve(&Builtins).unwrap();

        let roots: Vec<_> = got
            .iter()
            .map(|s| s.get("x").unwrap().to_string())
            .collect();
        assert_eq!(roots, vec!["-4", "4"]);
    }
}
