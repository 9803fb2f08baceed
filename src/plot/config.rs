use serde::Deserialize;
use std::{env, fs, ops::Range, path::Path};

/// Environment variable pointing at a YAML file which overrides
/// [`PlotConfig`]'s defaults.
pub const CONFIG_ENV: &str = "SYMSOLVE_PLOT_CONFIG";

/// How an expression gets sampled and drawn.
///
/// Every field is optional when loading from YAML, missing fields fall back
/// to their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlotConfig {
    /// The left edge of the domain.
    #[serde(default = "default_x_min")]
    pub x_min: f64,
    /// The right edge of the domain.
    #[serde(default = "default_x_max")]
    pub x_max: f64,
    /// How many evenly spaced points to evaluate.
    #[serde(default = "default_samples")]
    pub samples: usize,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Color of the curve in hex form (`#rrggbb`).
    #[serde(default = "default_line_color")]
    pub line_color: String,
    /// Line width in pixels.
    #[serde(default = "default_line_width")]
    pub line_width: u32,
    #[serde(default = "default_axis_color")]
    pub axis_color: String,
    #[serde(default = "default_background")]
    pub background: String,
}

fn default_x_min() -> f64 { -10.0 }
fn default_x_max() -> f64 { 10.0 }
fn default_samples() -> usize { 300 }
fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_line_color() -> String { "#1f77b4".to_string() }
fn default_line_width() -> u32 { 2 }
fn default_axis_color() -> String { "#000000".to_string() }
fn default_background() -> String { "#ffffff".to_string() }

impl Default for PlotConfig {
    fn default() -> Self {
        PlotConfig {
            x_min: default_x_min(),
            x_max: default_x_max(),
            samples: default_samples(),
            width: default_width(),
            height: default_height(),
            line_color: default_line_color(),
            line_width: default_line_width(),
            axis_color: default_axis_color(),
            background: default_background(),
        }
    }
}

impl PlotConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn from_file<P: AsRef<Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml = fs::read_to_string(path)?;
        Ok(PlotConfig::from_yaml(&yaml)?)
    }

    /// A copy of this config which samples a different domain.
    pub fn with_domain(mut self, x_min: f64, x_max: f64) -> Self {
        self.x_min = x_min;
        self.x_max = x_max;
        self
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }
}

/// Load the configuration file named by [`CONFIG_ENV`], falling back to
/// [`PlotConfig::default()`] when it isn't set or can't be used.
pub fn load_config() -> PlotConfig {
    if let Ok(config_path) = env::var(CONFIG_ENV) {
        match PlotConfig::from_file(&config_path) {
            Ok(config) => return config,
            Err(e) => log::warn!(
                "Unable to load the plot config from \"{}\": {}",
                config_path,
                e
            ),
        }
    }

    PlotConfig::default()
}

/// Parse a `#rrggbb` color.
pub(crate) fn parse_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let channel =
        |range: Range<usize>| u8::from_str_radix(&hex[range], 16).ok();

    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
