//! Vega-Lite chart specification.
//!
//! One row facet per scale (`Original`, `Pointwise`, `Cumulative`) with
//! independent y scales. Each facet layers the statistic lines, the
//! uncertainty band, the zero reference rule and the period markers. With
//! `interactive`, clicking a legend entry toggles that statistic and dragging
//! on the x axis zooms.

use serde_json::{Value, json};

use crate::domain::{IndexKind, Scale};
use crate::error::{AppError, BoundName, Result};
use crate::plotdata::PlotFrame;

use super::options::{RenderOptions, UnitSpec};
use super::{frame_times, period_markers};

const SCHEMA_URL: &str = "https://vega.github.io/schema/vega-lite/v5.json";

pub fn render(frame: &PlotFrame, options: &RenderOptions) -> Result<String> {
    let spec = chart_spec(frame, options)?;
    serde_json::to_string_pretty(&spec)
        .map_err(|e| AppError::Io(format!("Failed to serialise chart: {e}")))
}

/// Build the chart specification as JSON.
pub fn chart_spec(frame: &PlotFrame, options: &RenderOptions) -> Result<Value> {
    let records = serde_json::to_value(frame.records())
        .map_err(|e| AppError::Io(format!("Failed to serialise plot rows: {e}")))?;

    let times = frame_times(frame);
    let kind = times.first().map(|t| t.kind()).unwrap_or(IndexKind::Integer);
    let (time_type, parse_as) = match kind {
        IndexKind::Integer => ("quantitative", "number"),
        IndexKind::Date | IndexKind::Timestamp => ("temporal", "date"),
    };
    let time_fields = [
        "time",
        "pre_period_start",
        "pre_period_end",
        "post_period_start",
        "post_period_end",
    ];
    let parse: serde_json::Map<String, Value> = time_fields
        .iter()
        .map(|f| (f.to_string(), json!(parse_as)))
        .collect();

    let font = options.axis_label_font_size;
    let facet_order: Vec<&str> = Scale::ALL.iter().map(|s| s.pretty()).collect();
    let unit = shared_unit(&options.y_formatter_unit)?;
    let factor = options.y_formatter.factor();
    let label_expr = match options.y_formatter {
        super::YFormatter::Plain => format!("datum.value + '{unit}'"),
        _ => format!("format(datum.value * {factor}, '.1f') + '{unit}'"),
    };

    let mut color = json!({
        "field": "stat_pretty",
        "type": "nominal",
        "sort": ["Observed", "Mean", "Median"],
        "legend": {"title": "", "labelFontSize": font, "symbolSize": 10 * font},
    });
    let mut lines = json!({
        "mark": {"type": "line"},
        "encoding": {
            "x": {"field": "time", "type": time_type, "title": options.x_label},
            "y": {
                "field": "value",
                "type": "quantitative",
                "scale": {"zero": false},
                "title": "",
                "axis": {"labelExpr": label_expr},
            },
        },
    });
    let mut band = json!({
        "mark": {"type": "area", "opacity": 0.3},
        "encoding": {
            "x": {"field": "time", "type": time_type},
            "y": {"field": "upper", "type": "quantitative"},
            "y2": {"field": "lower"},
        },
    });
    if options.interactive {
        lines["params"] = json!([{
            "name": "stat_toggle",
            "select": {"type": "point", "fields": ["stat_pretty"]},
            "bind": "legend",
        }]);
        lines["encoding"]["opacity"] = json!({
            "condition": {"param": "stat_toggle", "value": 1},
            "value": 0.1,
        });
        band["params"] = json!([{
            "name": "zoom",
            "select": {"type": "interval", "encodings": ["x"]},
            "bind": "scales",
        }]);
    } else {
        color["legend"]["symbolType"] = json!("stroke");
    }
    lines["encoding"]["color"] = color;

    let zero = json!({
        "mark": {"type": "rule", "color": "red"},
        "encoding": {"y": {"field": "zero", "type": "quantitative"}},
    });

    let mut layers = vec![lines, band, zero];
    for marker in period_markers(&times, frame.periods(), &options.legend_labels) {
        let field = match marker.bound {
            BoundName::PreStart => "pre_period_start",
            BoundName::PreEnd => "pre_period_end",
            BoundName::PostStart => "post_period_start",
            BoundName::PostEnd => "post_period_end",
        };
        layers.push(json!({
            "mark": {"type": "rule", "strokeDash": [5, 5], "color": "grey"},
            "encoding": {
                "x": {"field": field, "type": time_type},
                "tooltip": {"value": marker.label},
            },
        }));
    }

    Ok(json!({
        "$schema": SCHEMA_URL,
        "title": {"text": options.title, "fontSize": options.title_font_size},
        "background": "white",
        "data": {"values": records, "format": {"parse": parse}},
        "facet": {
            "row": {
                "field": "scale_pretty",
                "type": "nominal",
                "sort": facet_order,
                "title": "",
            },
        },
        "spec": {
            "width": options.chart_width,
            "height": options.chart_height,
            "layer": layers,
        },
        "resolve": {"scale": {"y": "independent"}},
        "config": {
            "axis": {
                "titleFontSize": options.axis_title_font_size,
                "labelFontSize": options.axis_label_font_size,
            },
            "header": {"labelFontSize": options.strip_title_font_size},
        },
    }))
}

/// The facets share one `labelExpr`, so per-panel units must agree.
fn shared_unit(units: &UnitSpec) -> Result<&str> {
    match units {
        UnitSpec::Single(unit) => Ok(unit),
        UnitSpec::PerPanel(units) => match units.split_first() {
            None => Ok(""),
            Some((first, rest)) if rest.iter().all(|u| u == first) => Ok(first),
            Some(_) => Err(AppError::Config(format!(
                "vega-lite uses one y tick unit for all panels; got {units:?}. Use a single y_formatter_unit."
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{BandMethod, IndexKey, LineStat, Period, Periods};
    use crate::plotdata::PlotRow;

    fn day(d: u32) -> IndexKey {
        IndexKey::Date(NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
    }

    fn frame() -> PlotFrame {
        let periods = Periods {
            pre: Period {
                start: day(1),
                end: day(3),
            },
            post: Period {
                start: day(5),
                end: day(6),
            },
        };
        let rows = (1..=7)
            .map(|d| PlotRow {
                time: day(d),
                scale: Scale::CumulativeEffects,
                stat: LineStat::Mean,
                value: Some(d as f64),
                lower: (d >= 5).then_some(0.0),
                upper: (d >= 5).then_some(10.0),
                band_method: (d >= 5).then_some(BandMethod::Quantiles),
                zero: Some(0.0),
            })
            .collect();
        PlotFrame::new(periods, rows)
    }

    #[test]
    fn spec_is_faceted_by_scale_with_date_axis() {
        let spec = chart_spec(&frame(), &RenderOptions::default()).unwrap();
        assert_eq!(spec["facet"]["row"]["field"], "scale_pretty");
        assert_eq!(spec["facet"]["row"]["sort"], json!(["Original", "Pointwise", "Cumulative"]));
        assert_eq!(spec["resolve"]["scale"]["y"], "independent");
        assert_eq!(spec["spec"]["width"], 600);
        assert_eq!(spec["data"]["values"].as_array().unwrap().len(), 7);
        assert_eq!(spec["data"]["values"][0]["time"], "2024-01-01");
        assert_eq!(spec["spec"]["layer"][0]["encoding"]["x"]["type"], "temporal");
    }

    #[test]
    fn period_rules_follow_marker_rules() {
        let spec = chart_spec(&frame(), &RenderOptions::default()).unwrap();
        let layers = spec["spec"]["layer"].as_array().unwrap();
        let rule_fields: Vec<&str> = layers[3..]
            .iter()
            .map(|l| l["encoding"]["x"]["field"].as_str().unwrap())
            .collect();
        // day 4 lies between the periods, day 7 follows the post-period
        assert_eq!(rule_fields, ["pre_period_end", "post_period_start", "post_period_end"]);
    }

    #[test]
    fn per_panel_units_must_agree() {
        let same = RenderOptions {
            y_formatter_unit: UnitSpec::PerPanel(vec!["$".into(); 3]),
            ..RenderOptions::default()
        };
        let spec = chart_spec(&frame(), &same).unwrap();
        let expr = spec["spec"]["layer"][0]["encoding"]["y"]["axis"]["labelExpr"].as_str().unwrap();
        assert!(expr.ends_with("+ '$'"), "{expr}");

        let mixed = RenderOptions {
            y_formatter_unit: UnitSpec::PerPanel(vec!["$".into(), "$".into(), "%".into()]),
            ..RenderOptions::default()
        };
        assert!(matches!(chart_spec(&frame(), &mixed), Err(AppError::Config(_))));
    }

    #[test]
    fn interactivity_is_optional() {
        let spec = chart_spec(&frame(), &RenderOptions::default()).unwrap();
        assert_eq!(spec["spec"]["layer"][0]["params"][0]["bind"], "legend");
        assert_eq!(spec["spec"]["layer"][1]["params"][0]["bind"], "scales");

        let options = RenderOptions {
            interactive: false,
            ..RenderOptions::default()
        };
        let spec = chart_spec(&frame(), &options).unwrap();
        assert!(spec["spec"]["layer"][0].get("params").is_none());
        assert!(render(&frame(), &options).unwrap().contains("\"$schema\""));
    }
}
