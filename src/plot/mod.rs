//! Sampling an expression over a domain and rendering the resulting curve.

mod config;

pub use config::{load_config, PlotConfig, CONFIG_ENV};

use crate::{
    ops::{self, Context, EvaluationError},
    Expression, Parameter,
};
use plotters::prelude::*;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    fs, io,
    path::Path,
};

/// The y range used when there are no finite samples at all.
const EMPTY_Y_RANGE: (f64, f64) = (-1.0, 1.0);

/// Plot an expression using the configuration from [`load_config()`].
pub fn plot<C>(expr: &Expression, ctx: &C) -> Result<Plot, PlotError>
where
    C: Context,
{
    plot_with(expr, &load_config(), ctx)
}

/// Sample an expression with at most one unknown across the configured
/// domain.
pub fn plot_with<C>(
    expr: &Expression,
    config: &PlotConfig,
    ctx: &C,
) -> Result<Plot, PlotError>
where
    C: Context,
{
    let mut unknowns = expr.free_symbols();
    if unknowns.len() > 1 {
        return Err(PlotError::TooManyVariables(unknowns));
    }
    let variable = unknowns.pop();

    let (x_min, x_max) = (config.x_min, config.x_max);
    if !(x_min.is_finite() && x_max.is_finite() && x_min < x_max) {
        return Err(PlotError::InvalidDomain { x_min, x_max });
    }

    let samples = config.samples.max(2);
    let last = (samples - 1) as f64;

    let mut segments = Vec::new();
    let mut current = Vec::new();
    let mut skipped = 0;

    for i in 0..samples {
        // interpolate instead of stepping so huge domains can't overflow
        let t = i as f64 / last;
        let x = x_min * (1.0 - t) + x_max * t;
        let lookup = |p: &Parameter| {
            if Some(p) == variable.as_ref() {
                Some(x)
            } else {
                None
            }
        };
        let y = ops::evaluate(expr, lookup, ctx)?;

        if y.is_finite() {
            current.push((x, y));
        } else {
            skipped += 1;
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }

    if skipped > 0 {
        log::debug!("Skipped {} non-finite samples of {}", skipped, expr);
    }

    let y_range = y_range(&segments).unwrap_or_else(|| {
        log::debug!("{} has no finite samples, the plot will be empty", expr);
        EMPTY_Y_RANGE
    });

    Ok(Plot {
        expression: expr.clone(),
        variable,
        x_range: (x_min, x_max),
        y_range,
        segments,
        config: config.clone(),
    })
}

/// The smallest and largest y values, padded out when the curve is flat.
fn y_range(segments: &[Vec<(f64, f64)>]) -> Option<(f64, f64)> {
    let mut points = segments.iter().flatten().map(|&(_, y)| y);
    let first = points.next()?;
    let (low, high) =
        points.fold((first, first), |(low, high), y| (low.min(y), high.max(y)));

    if high - low <= f64::EPSILON * high.abs().max(low.abs()) {
        let padding = if low == 0.0 { 1.0 } else { low.abs() * 0.1 };
        Some((low - padding, high + padding))
    } else {
        Some((low, high))
    }
}

/// A curve which has been sampled and is ready to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Plot {
    expression: Expression,
    variable: Option<Parameter>,
    x_range: (f64, f64),
    y_range: (f64, f64),
    segments: Vec<Vec<(f64, f64)>>,
    config: PlotConfig,
}

impl Plot {
    pub fn expression(&self) -> &Expression { &self.expression }

    /// The parameter along the x axis (`None` for a constant expression).
    pub fn variable(&self) -> Option<&Parameter> { self.variable.as_ref() }

    pub fn x_range(&self) -> (f64, f64) { self.x_range }

    pub fn y_range(&self) -> (f64, f64) { self.y_range }

    /// Runs of consecutive finite samples.
    pub fn segments(&self) -> &[Vec<(f64, f64)>] { &self.segments }

    pub fn num_points(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    /// Render the plot as an SVG document.
    pub fn to_svg(&self) -> Result<String, PlotError> {
        let line_color = color(&self.config.line_color)?;
        let axis_color = color(&self.config.axis_color)?;
        let background = color(&self.config.background)?;
        let (x_min, x_max) = self.x_range;
        let (y_min, y_max) = self.y_range;

        let mut svg = String::new();

        {
            let root = SVGBackend::with_string(
                &mut svg,
                (self.config.width, self.config.height),
            )
            .into_drawing_area();
            root.fill(&background).map_err(render_error)?;

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .build_cartesian_2d(x_min..x_max, y_min..y_max)
                .map_err(render_error)?;

            // no labels, the text renderer needs system fonts
            if y_min <= 0.0 && 0.0 <= y_max {
                chart
                    .draw_series(std::iter::once(PathElement::new(
                        vec![(x_min, 0.0), (x_max, 0.0)],
                        axis_color.stroke_width(1),
                    )))
                    .map_err(render_error)?;
            }
            if x_min <= 0.0 && 0.0 <= x_max {
                chart
                    .draw_series(std::iter::once(PathElement::new(
                        vec![(0.0, y_min), (0.0, y_max)],
                        axis_color.stroke_width(1),
                    )))
                    .map_err(render_error)?;
            }

            for segment in &self.segments {
                chart
                    .draw_series(LineSeries::new(
                        segment.iter().copied(),
                        line_color.stroke_width(self.config.line_width),
                    ))
                    .map_err(render_error)?;
            }

            root.present().map_err(render_error)?;
        }

        Ok(svg)
    }

    /// Render the plot and write it to an SVG file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PlotError> {
        let svg = self.to_svg()?;
        fs::write(path, svg)?;

        Ok(())
    }

    /// Draw the plot on a grid of characters, for showing in a terminal.
    pub fn to_text(&self, columns: usize, rows: usize) -> String {
        if columns < 2 || rows < 2 {
            return String::new();
        }

        let (x_min, x_max) = self.x_range;
        let (y_min, y_max) = self.y_range;
        let column_of = |x: f64| {
            let t = (x - x_min) / (x_max - x_min);
            (t * (columns - 1) as f64).round() as usize
        };
        let row_of = |y: f64| {
            let t = (y_max - y) / (y_max - y_min);
            (t * (rows - 1) as f64).round() as usize
        };

        let mut grid = vec![vec![' '; columns]; rows];

        if y_min <= 0.0 && 0.0 <= y_max {
            let row = row_of(0.0);
            for cell in grid[row].iter_mut() {
                *cell = '-';
            }
        }
        if x_min <= 0.0 && 0.0 <= x_max {
            let column = column_of(0.0);
            for row in grid.iter_mut() {
                row[column] = if row[column] == '-' { '+' } else { '|' };
            }
        }

        for &(x, y) in self.segments.iter().flatten() {
            grid[row_of(y).min(rows - 1)][column_of(x).min(columns - 1)] = '*';
        }

        let lines: Vec<String> = grid
            .into_iter()
            .map(|row| {
                let line: String = row.into_iter().collect();
                line.trim_end().to_string()
            })
            .collect();

        lines.join("\n")
    }
}

fn color(hex: &str) -> Result<RGBColor, PlotError> {
    config::parse_color(hex)
        .map(|(r, g, b)| RGBColor(r, g, b))
        .ok_or_else(|| PlotError::Render(format!("Invalid color, \"{}\"", hex)))
}

fn render_error<E: Display>(e: E) -> PlotError {
    PlotError::Render(e.to_string())
}

#[derive(Debug)]
pub enum PlotError {
    /// Only expressions in a single variable can be plotted.
    TooManyVariables(Vec<Parameter>),
    InvalidDomain {
        x_min: f64,
        x_max: f64,
    },
    Eval(EvaluationError),
    Render(String),
    Io(io::Error),
}

impl From<EvaluationError> for PlotError {
    fn from(e: EvaluationError) -> Self { PlotError::Eval(e) }
}

impl From<io::Error> for PlotError {
    fn from(e: io::Error) -> Self { PlotError::Io(e) }
}

impl Display for PlotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PlotError::TooManyVariables(unknowns) => {
                write!(f, "Unable to plot an expression in")?;

                for (i, unknown) in unknowns.iter().enumerate() {
                    let separator = if i == 0 { " " } else { ", " };
                    write!(f, "{}{}", separator, unknown)?;
                }

                Ok(())
            },
            PlotError::InvalidDomain { x_min, x_max } => {
                write!(f, "Invalid domain, [{}, {}]", x_min, x_max)
            },
            PlotError::Eval(_) => write!(f, "Evaluation failed"),
            PlotError::Render(msg) => write!(f, "Rendering failed: {}", msg),
            PlotError::Io(_) => write!(f, "Unable to save the plot"),
        }
    }
}

impl Error for PlotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PlotError::Eval(inner) => Some(inner),
            PlotError::Io(inner) => Some(inner),
            _ => None,
        }
    }
}
