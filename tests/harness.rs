use approx::assert_abs_diff_eq;
use symsolve::{
    ops::Builtins, Equation, Expression, PlotConfig, Solution,
    SystemOfEquations, Value,
};

fn roots_of(src: &str) -> Vec<Solution> {
    let equation: Equation = src.parse().unwrap();
    equation.solve(&Builtins).unwrap()
}

fn values(solutions: &[Solution], name: &str) -> Vec<Value> {
    solutions
        .iter()
        .map(|solution| solution.get(name).unwrap().clone())
        .collect()
}

#[test]
fn linear_system_has_a_unique_solution() {
    let equations = ["3*x + 5*y = 5", "10*x - 3*y = 15", "4*y + 10*z = 19"];

    let solutions = symsolve::solve_equations(&equations).unwrap();

    assert_eq!(solutions.len(), 1);
    let solution = &solutions[0];
    assert_eq!(solution.len(), 3);

    let system = SystemOfEquations::from_equations(&equations).unwrap();
    let residuals = system
        .residuals(
            |p| solution.get(p.name()).and_then(Value::as_real),
            &Builtins,
        )
        .unwrap();
    for residual in residuals.iter() {
        assert_abs_diff_eq!(*residual, 0.0, epsilon = 1e-9);
    }

    assert_eq!(solution.get("x").unwrap().to_string(), "90/59");
    assert_eq!(solution.get("y").unwrap().to_string(), "5/59");
    assert_eq!(solution.get("z").unwrap().to_string(), "1101/590");
}

#[test]
fn difference_of_squares() {
    let solutions = roots_of("x^2 - 16");

    let got: Vec<_> = values(&solutions, "x")
        .iter()
        .map(|v| v.as_real().unwrap())
        .collect();

    assert_eq!(got, vec![-4.0, 4.0]);
}

#[test]
fn quadratic_with_irrational_roots() {
    let solutions = roots_of("x**2 + 10*x - 5");

    let got = values(&solutions, "x");

    let exact: Vec<_> = got.iter().map(ToString::to_string).collect();
    assert_eq!(exact, vec!["-5 - sqrt(30)", "-5 + sqrt(30)"]);
    assert_abs_diff_eq!(
        got[0].as_real().unwrap(),
        -5.0 - 30_f64.sqrt(),
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(
        got[1].as_real().unwrap(),
        -5.0 + 30_f64.sqrt(),
        epsilon = 1e-12
    );
}

#[test]
fn expressions_built_from_symbols_solve_the_same_as_parsed_ones() {
    let x = Expression::symbol("x");
    let built = Equation::from(x.clone().pow(2.0) + 10.0 * x - 5.0);

    let got = built.solve(&Builtins).unwrap();

    assert_eq!(got, roots_of("x^2 + 10*x - 5"));
}

const CURVES: [&str; 3] = ["x^2 + 5", "x^3 + 10*x + 5", "a^7 - 5*a"];

#[test]
fn plots_produce_an_svg() {
    let config = PlotConfig::default();
    let dir = tempfile::tempdir().unwrap();

    for (i, src) in CURVES.iter().enumerate() {
        let expr: Expression = src.parse().unwrap();
        let plot = symsolve::plot_with(&expr, &config, &Builtins).unwrap();

        assert_eq!(plot.num_points(), config.samples);
        let svg = plot.to_svg().unwrap();
        assert!(!svg.is_empty());

        let path = dir.path().join(format!("plot_{}.svg", i));
        plot.save(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, svg);

        assert!(!plot.to_text(40, 12).trim().is_empty());
    }
}

#[test]
fn plots_work_for_any_finite_domain() {
    let domains = [
        (-1e50, 1e50),
        (-1e300, 1e300),
        (-1e-300, 1e-300),
        (0.0, 1e-3),
        (5.0, 5.000001),
        (-3.0, 0.0),
    ];

    for src in CURVES.iter() {
        let expr: Expression = src.parse().unwrap();

        for &(x_min, x_max) in &domains {
            let config = PlotConfig::default().with_domain(x_min, x_max);

            let plot = symsolve::plot_with(&expr, &config, &Builtins)
                .unwrap_or_else(|e| {
                    panic!("{} on [{}, {}]: {}", src, x_min, x_max, e)
                });

            let context = format!("{} on [{}, {}]", src, x_min, x_max);
            let (low, high) = plot.y_range();
            assert!(low < high, "{}", context);
            let svg = plot.to_svg().unwrap();
            assert!(svg.contains("</svg>"), "{}", context);
        }
    }
}

#[test]
fn solving_twice_gives_the_same_answer() {
    let inputs: Vec<&[&str]> = vec![
        &["3*x + 5*y = 5", "10*x - 3*y = 15", "4*y + 10*z = 19"],
        &["x^2 - 16"],
        &["x^2 + 10*x - 5"],
        &["x^3 + 10*x + 5"],
        &["sin(x) = 0.5"],
    ];

    for equations in inputs {
        let first = symsolve::solve_equations(equations).unwrap();
        let second = symsolve::solve_equations(equations).unwrap();

        assert_eq!(first, second, "{:?}", equations);
    }
}

#[test]
fn parse_errors_are_reported() {
    let got = symsolve::solve_equations(&["x +"]);

    assert!(matches!(got, Err(symsolve::SolveError::Parse(_))));
}
