use serde_json::{Map, Value, json};

use super::labels::BucketMode;
use super::palette::ColorGenerator;
use super::types::{ChartData, ChartSpec, ChartType, Dataset, Paint, TemplateIntent};
use crate::error::{ChartError, ChartResult};

pub const TEMPLATES: &[&str] = &["pie", "doughnut", "line", "bar"];

/// Build a chart from one of the named templates.
///
/// When the intent brings no colors, one color per value is drawn from a
/// fresh palette walk.
pub fn assemble(intent: TemplateIntent) -> ChartResult<ChartSpec> {
    if !TEMPLATES.contains(&intent.template.as_str()) {
        return Err(ChartError::invalid_spec(format!(
            "unknown template '{}' (expected one of: {})",
            intent.template,
            TEMPLATES.join(", ")
        )));
    }

    let colors = match intent.colors {
        Some(colors) => colors,
        None => ColorGenerator::new().take_colors(intent.values.len()),
    };

    let (chart_type, dataset, options) = match intent.template.as_str() {
        "bar" => {
            let mut dataset = Dataset::with_values(intent.values);
            dataset.label = Some(String::new());
            dataset.background_color = Some(Paint::PerPoint(colors));
            (ChartType::Bar, dataset, bar_options())
        }
        "line" => (
            ChartType::Line,
            Dataset::with_values(intent.values),
            line_options(intent.label_mode),
        ),
        // pie is drawn as a doughnut
        _ => {
            let mut dataset = Dataset::with_values(intent.values);
            dataset.background_color = Some(Paint::PerPoint(colors));
            (ChartType::Doughnut, dataset, circular_options())
        }
    };

    Ok(ChartSpec {
        chart_type,
        data: ChartData {
            labels: intent.labels,
            datasets: vec![dataset],
        },
        options,
        plugins: Vec::new(),
    })
}

fn bar_options() -> Map<String, Value> {
    let axis = json!([{
        "ticks": {"fontSize": 8},
        "gridLines": {"display": false}
    }]);
    as_map(json!({
        "legend": {"display": false},
        "scales": {"xAxes": axis.clone(), "yAxes": axis}
    }))
}

fn line_options(label_mode: Option<BucketMode>) -> Map<String, Value> {
    let mut options = as_map(json!({"legend": {"display": false}}));
    if label_mode == Some(BucketMode::Weeks9) {
        options.insert(
            "scales".into(),
            json!({
                "xAxes": [{"scaleLabel": {"labelString": "Time Period", "display": true}}],
                "yAxes": [{"scaleLabel": {"labelString": "Visits", "display": true}}]
            }),
        );
    }
    options
}

fn circular_options() -> Map<String, Value> {
    as_map(json!({
        "legend": {
            "display": false,
            "labels": {"fontSize": 6, "boxWidth": 10, "padding": 8}
        },
        "plugins": {"datalabels": {"display": false}}
    }))
}

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::types::DataPoint;

    fn intent(template: &str, colors: Option<Vec<&str>>) -> TemplateIntent {
        TemplateIntent {
            template: template.into(),
            labels: vec!["a".into(), "b".into()],
            values: vec![DataPoint::Number(1.0), DataPoint::Number(2.0)],
            colors: colors.map(|c| c.into_iter().map(String::from).collect()),
            label_mode: None,
        }
    }

    #[test]
    fn bar_keeps_supplied_colors() {
        let spec = assemble(intent("bar", Some(vec!["#111", "#222"]))).unwrap();
        assert_eq!(spec.chart_type, ChartType::Bar);
        assert_eq!(
            spec.data.datasets[0].background_color,
            Some(Paint::PerPoint(vec!["#111".into(), "#222".into()]))
        );
        assert_eq!(spec.options["scales"]["yAxes"][0]["ticks"]["fontSize"], 8);
    }

    #[test]
    fn missing_colors_walk_the_palette() {
        let spec = assemble(intent("doughnut", None)).unwrap();
        assert_eq!(
            spec.data.datasets[0].background_color,
            Some(Paint::PerPoint(vec!["#e5c495".into(), "#c1a8e0".into()]))
        );
    }

    #[test]
    fn pie_renders_as_doughnut_without_datalabels() {
        let spec = assemble(intent("pie", None)).unwrap();
        assert_eq!(spec.chart_type, ChartType::Doughnut);
        assert_eq!(spec.options["plugins"]["datalabels"]["display"], false);
        assert_eq!(spec.options["legend"]["labels"]["boxWidth"], 10);
    }

    #[test]
    fn line_titles_axes_for_weekly_buckets() {
        let mut weekly = intent("line", None);
        weekly.label_mode = Some(BucketMode::Weeks9);
        let spec = assemble(weekly).unwrap();
        assert!(spec.data.datasets[0].background_color.is_none());
        assert_eq!(
            spec.options["scales"]["xAxes"][0]["scaleLabel"]["labelString"],
            "Time Period"
        );

        let plain = assemble(intent("line", None)).unwrap();
        assert!(!plain.options.contains_key("scales"));
    }

    #[test]
    fn unknown_template_is_invalid_spec() {
        let err = assemble(intent("radar", None)).unwrap_err();
        assert!(matches!(err, ChartError::InvalidChartSpec(_)));
    }
}
