use symsolve::{ops::Builtins, Equation};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let equation: Equation = "x**2 + 10*x - 5".parse()?;
    println!("{}", equation);

    for solution in equation.solve(&Builtins)? {
        for (name, value) in solution.iter() {
            let approximate = value.approximate().re;
            println!("  {} = {} (about {})", name, value, approximate);
        }
    }

    Ok(())
}
