//! Solve three simultaneous linear equations and check the answer.

use symsolve::{ops::Builtins, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let equations = ["3*x + 5*y = 5", "10*x - 3*y = 15", "4*y + 10*z = 19"];
    let solutions = symsolve::solve_equations(&equations)?;

    for solution in &solutions {
        println!("{}", solution);
    }

    let system = symsolve::SystemOfEquations::from_equations(&equations)?;
    let residuals = system.residuals(
        |p| solutions[0].get(p.name()).and_then(Value::as_real),
        &Builtins,
    )?;
    println!("Residuals: {:?}", residuals.as_slice());

    Ok(())
}
