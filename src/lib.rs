//! A small computer algebra system for declaring symbols, building
//! expressions, solving equations (or systems of them), and plotting.
//!
//! # Examples
//!
//! ```rust
//! use symsolve::{ops::Builtins, Equation, SystemOfEquations};
//!
//! let roots = "x^2 - 16".parse::<Equation>()?.solve(&Builtins)?;
//! let roots: Vec<String> = roots
//!     .iter()
//!     .map(|solution| solution.get("x").unwrap().to_string())
//!     .collect();
//! assert_eq!(roots, vec!["-4", "4"]);
//!
//! let equations = ["x + y = 3", "x - y = 1"];
//! let system = SystemOfEquations::from_equations(&equations)?;
//! let solutions = system.solve(&Builtins)?;
//! assert_eq!(solutions[0].to_string(), "{x: 2, y: 1}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod algebra;
mod equations;
pub mod plot;
mod polynomial;
mod roots;
mod solution;
mod solve;

pub use algebra::{
    ops, parse, BinaryOperation, Expression, Parameter, ParseError, TokenKind,
};
pub use equations::{Equation, SystemOfEquations};
pub use plot::{plot, plot_with, Plot, PlotConfig, PlotError};
pub use polynomial::{NotAPolynomial, Polynomial};
pub use solution::{Solution, Value};
pub use solve::SolveError;

/// Parse each line as an equation and solve them all together, using the
/// [`ops::Builtins`] functions.
pub fn solve_equations<E, S>(equations: E) -> Result<Vec<Solution>, SolveError>
where
    E: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let system = SystemOfEquations::from_equations(equations)?;
    system.solve(&ops::Builtins)
}
