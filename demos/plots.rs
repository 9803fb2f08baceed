//! Plot a few polynomials, writing each one to an SVG file in the current
//! directory and showing a rough sketch in the terminal.

use symsolve::{ops::Builtins, Expression};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let x = Expression::symbol("x");
    let a = Expression::symbol("a");

    let curves = vec![
        ("parabola", x.clone().pow(2.0) + 5.0),
        ("cubic", x.clone().pow(3.0) + 10.0 * x.clone() + 5.0),
        ("seventh", a.clone().pow(7.0) - 5.0 * a),
    ];

    for (name, expr) in curves {
        let plot = symsolve::plot(&expr, &Builtins)?;
        let filename = format!("{}.svg", name);
        plot.save(&filename)?;

        println!("{} (saved to {})", expr, filename);
        println!("{}", plot.to_text(60, 20));
        println!();
    }

    Ok(())
}
