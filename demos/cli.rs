use symsolve::{ops::Builtins, Equation, SystemOfEquations};
use std::io::{BufRead, BufReader};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut system = SystemOfEquations::new();
    let stdin = std::io::stdin();

    for line in BufReader::new(stdin.lock()).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Equation>() {
            Ok(equation) => system.push(equation),
            Err(e) => eprintln!("Unable to parse \"{}\": {}", line, e),
        }
    }

    let unknowns: Vec<_> =
        system.unknowns().iter().map(ToString::to_string).collect();
    println!("Solving for {}", unknowns.join(", "));

    let ctx = Builtins::default();
    let solutions = system.solve(&ctx)?;

    if solutions.is_empty() {
        println!("No solutions");
    }

    for (i, solution) in solutions.iter().enumerate() {
        println!("Solution {}:", i + 1);

        for (name, value) in solution.iter() {
            println!("  {} = {}", name, value);
        }
    }

    Ok(())
}
