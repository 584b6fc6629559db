//! Renderer configuration.
//!
//! Every option is enumerated here with its default. Options files are JSON;
//! unknown keys are rejected and values are validated before rendering.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::BandMethod;
use crate::error::{AppError, Result};

/// Number of stacked panels (original, pointwise, cumulative).
pub const PANEL_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Three stacked panels drawn as text.
    #[default]
    Ascii,
    /// Faceted Vega-Lite chart specification.
    VegaLite,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Ascii, Backend::VegaLite];

    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Ascii => "ascii",
            Backend::VegaLite => "vega-lite",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Backend::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| {
                AppError::InvalidArgument(format!(
                    "backend must be one of {{ascii, vega-lite}}. Got '{s}'."
                ))
            })
    }
}

/// Y-axis tick scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum YFormatter {
    #[default]
    Millions,
    Thousands,
    Plain,
}

impl YFormatter {
    /// Format one tick value with `unit` appended.
    pub fn format(self, value: f64, unit: &str) -> String {
        match self {
            YFormatter::Millions => format!("{:.1}{unit}", value * 1e-6),
            YFormatter::Thousands => format!("{:.1}{unit}", value * 1e-3),
            YFormatter::Plain => format!("{value}{unit}"),
        }
    }

    /// Multiplier applied before formatting.
    pub fn factor(self) -> f64 {
        match self {
            YFormatter::Millions => 1e-6,
            YFormatter::Thousands => 1e-3,
            YFormatter::Plain => 1.0,
        }
    }
}

/// Unit suffix for y ticks: one for all panels, or one per panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnitSpec {
    Single(String),
    PerPanel(Vec<String>),
}

impl Default for UnitSpec {
    fn default() -> Self {
        UnitSpec::Single(String::new())
    }
}

impl UnitSpec {
    pub fn for_panel(&self, panel: usize) -> &str {
        match self {
            UnitSpec::Single(unit) => unit,
            UnitSpec::PerPanel(units) => units.get(panel).map(String::as_str).unwrap_or(""),
        }
    }
}

/// Legend entries for series and period markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default, rename_all = "kebab-case")]
pub struct LegendLabels {
    pub mean: String,
    pub observed: String,
    pub pointwise: String,
    pub cumulative: String,
    pub pre_period_start: String,
    pub pre_period_end: String,
    pub post_period_start: String,
    pub post_period_end: String,
}

impl Default for LegendLabels {
    fn default() -> Self {
        Self {
            mean: "Mean".into(),
            observed: "Observed".into(),
            pointwise: "Pointwise".into(),
            cumulative: "Cumulative".into(),
            pre_period_start: "Pre-Period Start".into(),
            pre_period_end: "Pre-Period End".into(),
            post_period_start: "Post-Period Start".into(),
            post_period_end: "Post-Period End".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RenderOptions {
    pub backend: Backend,
    /// Vega-Lite only: add the legend toggle and x-axis zoom.
    pub interactive: bool,
    /// Significance level for std-derived bands.
    pub alpha: f64,
    pub show_median: bool,
    pub band_method: BandMethod,
    pub chart_width: u32,
    pub chart_height: u32,
    pub axis_label_font_size: u32,
    pub axis_title_font_size: u32,
    pub strip_title_font_size: u32,
    pub title: String,
    pub title_font_size: u32,
    pub x_label: String,
    pub y_labels: Vec<String>,
    pub y_formatter: YFormatter,
    pub y_formatter_unit: UnitSpec,
    pub legend_labels: LegendLabels,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            backend: Backend::Ascii,
            interactive: true,
            alpha: 0.05,
            show_median: false,
            band_method: BandMethod::Quantiles,
            chart_width: 600,
            chart_height: 200,
            axis_label_font_size: 16,
            axis_title_font_size: 12,
            strip_title_font_size: 20,
            title: "Interrupted Time Series Analysis Over Time".into(),
            title_font_size: 16,
            x_label: "Date".into(),
            y_labels: vec![
                "Observed".into(),
                "Pointwise Effect".into(),
                "Cumulative Effect".into(),
            ],
            y_formatter: YFormatter::Millions,
            y_formatter_unit: UnitSpec::default(),
            legend_labels: LegendLabels::default(),
        }
    }
}

impl RenderOptions {
    /// Parse and validate a JSON options document.
    ///
    /// A backend name is checked before the rest of the document, so an
    /// unknown one is an invalid argument on this path as on the CLI.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(s)
            .map_err(|e| AppError::Config(format!("Invalid render options: {e}")))?;
        if let Some(name) = value.get("backend").and_then(serde_json::Value::as_str) {
            Backend::from_str(name)?;
        }
        let options: RenderOptions = serde_json::from_value(value)
            .map_err(|e| AppError::Config(format!("Invalid render options: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| AppError::Io(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_json_str(&s)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.alpha.is_finite() && self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(AppError::Config(format!(
                "alpha must be in (0, 1). Got {}.",
                self.alpha
            )));
        }
        let sizes = [
            ("chart_width", self.chart_width),
            ("chart_height", self.chart_height),
            ("axis_label_font_size", self.axis_label_font_size),
            ("axis_title_font_size", self.axis_title_font_size),
            ("strip_title_font_size", self.strip_title_font_size),
            ("title_font_size", self.title_font_size),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(AppError::Config(format!("{name} must be positive.")));
        }
        if self.y_labels.len() != PANEL_COUNT {
            return Err(AppError::Config(format!(
                "y_labels must have exactly {PANEL_COUNT} entries. Got {}.",
                self.y_labels.len()
            )));
        }
        if let UnitSpec::PerPanel(units) = &self.y_formatter_unit {
            if units.len() != PANEL_COUNT {
                return Err(AppError::Config(format!(
                    "Length of y_formatter_unit list must match number of y_labels ({PANEL_COUNT}). Got {}.",
                    units.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let options = RenderOptions::from_json_str("{}").unwrap();
        assert_eq!(options, RenderOptions::default());
        assert_eq!(options.chart_width, 600);
        assert_eq!(options.legend_labels.post_period_end, "Post-Period End");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = RenderOptions::from_json_str(r#"{"chart_widht": 800}"#).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        let err = RenderOptions::from_json_str(r#"{"legend_labels": {"median": "M"}}"#).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn partial_documents_merge_with_defaults() {
        let options = RenderOptions::from_json_str(
            r##"{"backend": "vega-lite", "band_method": "std", "y_formatter_unit": ["$", "$", "#"],
                "legend_labels": {"pre-period-start": "Start"}}"##,
        )
        .unwrap();
        assert_eq!(options.backend, Backend::VegaLite);
        assert_eq!(options.band_method, BandMethod::Std);
        assert_eq!(options.y_formatter_unit.for_panel(2), "#");
        assert_eq!(options.legend_labels.pre_period_start, "Start");
        assert_eq!(options.legend_labels.mean, "Mean");
        assert_eq!(options.chart_height, 200);
    }

    #[test]
    fn values_are_validated() {
        assert!(RenderOptions::from_json_str(r#"{"alpha": 1.0}"#).is_err());
        assert!(RenderOptions::from_json_str(r#"{"chart_width": 0}"#).is_err());
        assert!(RenderOptions::from_json_str(r#"{"y_labels": ["a", "b"]}"#).is_err());
        assert!(RenderOptions::from_json_str(r#"{"y_formatter_unit": ["$"]}"#).is_err());
    }

    #[test]
    fn unknown_backend_names_the_allowed_set() {
        let err = "matplotlib".parse::<Backend>().unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert!(err.to_string().contains("{ascii, vega-lite}"));
        assert_eq!("vega-lite".parse::<Backend>().unwrap(), Backend::VegaLite);
    }

    #[test]
    fn unknown_backend_in_options_file_is_invalid_argument() {
        let err = RenderOptions::from_json_str(r#"{"backend": "matplotlib"}"#).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)), "{err}");
        assert!(err.to_string().contains("{ascii, vega-lite}"));
        let err = RenderOptions::from_json_str(r#"{"backend": 3}"#).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn tick_formatting() {
        assert_eq!(YFormatter::Millions.format(2_500_000.0, "$"), "2.5$");
        assert_eq!(YFormatter::Thousands.format(1234.0, "k"), "1.2k");
        assert_eq!(YFormatter::Plain.format(3.5, ""), "3.5");
    }
}
