use symsolve::{ops::Builtins, Equation, Expression};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let x = Expression::symbol("x");
    let equation = Equation::from(x.clone().pow(2.0) - 16.0);
    println!("{}", equation);

    for solution in equation.solve(&Builtins)? {
        println!("  {}", solution);
    }

    Ok(())
}
