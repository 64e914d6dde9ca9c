//! Turns a raw intent into the canonical chart.
//!
//! Defaults are applied by an ordered list of named rules. Each rule takes
//! the chart by value and returns it, filling gaps only; the one exception
//! is the pixel ratio, which is always forced.

use serde_json::{Map, Value, json};

use super::palette::ColorGenerator;
use super::template;
use super::types::{ChartSpec, ChartType, InputMode, Paint, Plugin, RawIntent, json_kind};
use crate::error::{ChartError, ChartResult};

pub struct Rule {
    pub name: &'static str,
    pub apply: fn(ChartSpec) -> ChartResult<ChartSpec>,
}

pub const RULES: &[Rule] = &[
    Rule { name: "donut-alias", apply: donut_alias },
    Rule { name: "device-pixel-ratio", apply: device_pixel_ratio },
    Rule { name: "default-scales", apply: default_scales },
    Rule { name: "background-colors", apply: background_colors },
    Rule { name: "straight-lines", apply: straight_lines },
    Rule { name: "datalabels-defaults", apply: datalabels_defaults },
    Rule { name: "attach-plugins", apply: attach_plugins },
];

pub fn normalize(intent: RawIntent, mode: InputMode) -> ChartResult<ChartSpec> {
    tracing::debug!(mode = mode.as_str(), "normalizing chart");
    let spec = match intent {
        RawIntent::Document(document) => read_document(document)?,
        RawIntent::Template(intent) => template::assemble(intent)?,
    };
    apply_rules(spec)
}

pub fn apply_rules(mut spec: ChartSpec) -> ChartResult<ChartSpec> {
    for rule in RULES {
        spec = (rule.apply)(spec).map_err(|err| {
            tracing::debug!(rule = rule.name, error = %err, "normalization rule failed");
            err
        })?;
    }
    Ok(spec)
}

fn read_document(document: Value) -> ChartResult<ChartSpec> {
    if !document.is_object() {
        return Err(ChartError::invalid_spec(format!(
            "expected a chart object, got {}",
            json_kind(&document)
        )));
    }
    serde_json::from_value(document).map_err(|err| ChartError::invalid_spec(err.to_string()))
}

fn donut_alias(mut spec: ChartSpec) -> ChartResult<ChartSpec> {
    if spec.chart_type == ChartType::Donut {
        spec.chart_type = ChartType::Doughnut;
    }
    Ok(spec)
}

fn device_pixel_ratio(mut spec: ChartSpec) -> ChartResult<ChartSpec> {
    spec.options.insert("devicePixelRatio".into(), json!(1.0));
    Ok(spec)
}

fn default_scales(mut spec: ChartSpec) -> ChartResult<ChartSpec> {
    if spec.chart_type.has_default_axes() && is_unset(spec.options.get("scales")) {
        spec.options.insert(
            "scales".into(),
            json!({"yAxes": [{"ticks": {"beginAtZero": true}}]}),
        );
    }
    Ok(spec)
}

fn background_colors(mut spec: ChartSpec) -> ChartResult<ChartSpec> {
    if !spec.chart_type.takes_generated_colors() {
        return Ok(spec);
    }

    let per_point = spec.chart_type.colors_per_point();
    let mut colors = ColorGenerator::new();
    for dataset in spec
        .data
        .datasets
        .iter_mut()
        .filter(|d| d.background_color.is_none())
    {
        dataset.background_color = Some(if per_point {
            Paint::PerPoint(colors.take_colors(dataset.data.len()))
        } else {
            Paint::Solid(colors.next_color())
        });
    }
    Ok(spec)
}

fn straight_lines(mut spec: ChartSpec) -> ChartResult<ChartSpec> {
    if spec.chart_type == ChartType::Line {
        for dataset in &mut spec.data.datasets {
            dataset.line_tension.get_or_insert(0.0);
        }
    }
    Ok(spec)
}

fn datalabels_defaults(mut spec: ChartSpec) -> ChartResult<ChartSpec> {
    let show = matches!(spec.chart_type, ChartType::Pie | ChartType::Doughnut);

    let plugins = spec
        .options
        .entry("plugins")
        .or_insert_with(|| Value::Object(Map::new()));
    if plugins.is_null() {
        *plugins = Value::Object(Map::new());
    }
    let kind = json_kind(plugins);
    let Value::Object(plugins) = plugins else {
        return Err(ChartError::invalid_spec(format!(
            "options.plugins must be an object, got {}",
            kind
        )));
    };

    if is_unset(plugins.get("datalabels")) {
        plugins.insert("datalabels".into(), json!({"display": show}));
    }
    Ok(spec)
}

fn attach_plugins(mut spec: ChartSpec) -> ChartResult<ChartSpec> {
    spec.plugins = vec![Plugin::DataLabels];
    if spec.chart_type == ChartType::RadialGauge {
        spec.plugins.push(Plugin::RadialGauge);
    }
    Ok(spec)
}

fn is_unset(value: Option<&Value>) -> bool {
    value.is_none_or(Value::is_null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::types::{DataPoint, TemplateIntent};

    fn document(value: Value) -> ChartSpec {
        normalize(RawIntent::Document(value), InputMode::Inline).unwrap()
    }

    #[test]
    fn rule_order_is_fixed() {
        let names: Vec<_> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "donut-alias",
                "device-pixel-ratio",
                "default-scales",
                "background-colors",
                "straight-lines",
                "datalabels-defaults",
                "attach-plugins"
            ]
        );
    }

    #[test]
    fn donut_becomes_doughnut_with_same_data() {
        let spec = document(json!({
            "type": "donut",
            "data": {"labels": ["a", "b"], "datasets": [{"data": [3, 4]}]}
        }));
        assert_eq!(spec.chart_type, ChartType::Doughnut);
        assert_eq!(
            spec.data.datasets[0].data,
            vec![DataPoint::Number(3.0), DataPoint::Number(4.0)]
        );
        assert_eq!(spec.options["plugins"]["datalabels"]["display"], true);
    }

    #[test]
    fn pixel_ratio_is_always_one() {
        let spec = document(json!({
            "type": "bar",
            "data": {"datasets": []},
            "options": {"devicePixelRatio": 3}
        }));
        assert_eq!(spec.options["devicePixelRatio"], 1.0);
    }

    #[test]
    fn caller_scales_are_kept() {
        let scales = json!({"xAxes": [{"stacked": true}]});
        let spec = document(json!({
            "type": "bar",
            "data": {"datasets": [{"data": [1]}]},
            "options": {"scales": scales.clone()}
        }));
        assert_eq!(spec.options["scales"], scales);
    }

    #[test]
    fn axis_types_get_zero_based_y() {
        let spec = document(json!({"type": "scatter", "data": {"datasets": []}}));
        assert_eq!(spec.options["scales"]["yAxes"][0]["ticks"]["beginAtZero"], true);

        let radar = document(json!({"type": "radar", "data": {"datasets": []}}));
        assert!(!radar.options.contains_key("scales"));
    }

    #[test]
    fn bar_datasets_get_one_color_each() {
        let spec = document(json!({
            "type": "bar",
            "data": {"datasets": [
                {"data": [1, 2, 3]},
                {"data": [4, 5, 6], "backgroundColor": "red"},
                {"data": [7, 8, 9]}
            ]}
        }));
        let colors: Vec<_> = spec
            .data
            .datasets
            .iter()
            .map(|d| d.background_color.clone().unwrap())
            .collect();
        assert_eq!(
            colors,
            vec![
                Paint::Solid("#e5c495".into()),
                Paint::Solid("red".into()),
                Paint::Solid("#c1a8e0".into()),
            ]
        );
    }

    #[test]
    fn loosely_typed_datasets_are_accepted() {
        let spec = document(json!({
            "type": "line",
            "data": {"datasets": [{
                "label": 2020,
                "data": [{"x": "2020-01-01", "y": 3}, {"t": "2020-01-02", "y": 4}],
                "backgroundColor": ["red", null]
            }]}
        }));
        let dataset = &spec.data.datasets[0];
        assert_eq!(dataset.label.as_deref(), Some("2020"));
        let values: Vec<_> = dataset.data.iter().map(DataPoint::value).collect();
        assert_eq!(values, vec![Some(3.0), Some(4.0)]);
        assert_eq!(
            dataset.background_color,
            Some(Paint::Other(json!(["red", null])))
        );
    }

    #[test]
    fn pie_datasets_get_one_color_per_point() {
        let spec = document(json!({
            "type": "pie",
            "data": {"datasets": [{"data": [1, 2, 3]}]}
        }));
        match &spec.data.datasets[0].background_color {
            Some(Paint::PerPoint(colors)) => assert_eq!(colors.len(), 3),
            other => panic!("expected per-point colors, got {:?}", other),
        }
    }

    #[test]
    fn each_pass_starts_the_palette_over() {
        let chart = json!({"type": "bar", "data": {"datasets": [{"data": [1]}]}});
        let first = document(chart.clone());
        let second = document(chart);
        assert_eq!(
            first.data.datasets[0].background_color,
            second.data.datasets[0].background_color
        );
    }

    #[test]
    fn unknown_types_are_left_uncolored() {
        let spec = document(json!({
            "type": "polarArea",
            "data": {"datasets": [{"data": [1]}]}
        }));
        assert!(spec.data.datasets[0].background_color.is_none());
    }

    #[test]
    fn line_tension_defaults_to_straight() {
        let spec = document(json!({
            "type": "line",
            "data": {"datasets": [{"data": [1]}, {"data": [2], "lineTension": 0.4}]}
        }));
        assert_eq!(spec.data.datasets[0].line_tension, Some(0.0));
        assert_eq!(spec.data.datasets[1].line_tension, Some(0.4));
    }

    #[test]
    fn caller_datalabels_are_kept() {
        let spec = document(json!({
            "type": "pie",
            "data": {"datasets": []},
            "options": {"plugins": {"datalabels": {"color": "#fff"}}}
        }));
        assert_eq!(spec.options["plugins"]["datalabels"], json!({"color": "#fff"}));
    }

    #[test]
    fn non_object_plugins_are_rejected() {
        let result = normalize(
            RawIntent::Document(json!({
                "type": "bar", "data": {}, "options": {"plugins": true}
            })),
            InputMode::Inline,
        );
        assert!(matches!(result, Err(ChartError::InvalidChartSpec(_))));
    }

    #[test]
    fn plugins_follow_type() {
        let gauge = document(json!({"type": "radialGauge", "data": {"datasets": [{"data": [70]}]}}));
        assert_eq!(gauge.plugins, vec![Plugin::DataLabels, Plugin::RadialGauge]);
        assert_eq!(gauge.options["plugins"]["datalabels"]["display"], false);

        let bar = document(json!({"type": "bar", "data": {}}));
        assert_eq!(bar.plugins, vec![Plugin::DataLabels]);
    }

    #[test]
    fn non_objects_are_invalid_specs() {
        for value in [json!(false), json!("bar"), json!([1, 2])] {
            let err = normalize(RawIntent::Document(value), InputMode::Remote).unwrap_err();
            assert!(matches!(err, ChartError::InvalidChartSpec(_)));
        }
        let err = normalize(RawIntent::Document(json!({"data": {}})), InputMode::Inline)
            .unwrap_err();
        assert!(err.to_string().contains("type"));
    }

    #[test]
    fn template_colors_survive_normalization() {
        let spec = normalize(
            RawIntent::Template(TemplateIntent {
                template: "bar".into(),
                labels: vec!["a".into(), "b".into()],
                values: vec![DataPoint::Number(1.0), DataPoint::Number(2.0)],
                colors: Some(vec!["#111".into(), "#222".into()]),
                label_mode: None,
            }),
            InputMode::Template,
        )
        .unwrap();
        assert_eq!(
            spec.data.datasets[0].background_color,
            Some(Paint::PerPoint(vec!["#111".into(), "#222".into()]))
        );
        // template scales win over the zero-based default
        assert!(spec.options["scales"]["xAxes"].is_array());
        assert_eq!(spec.data.labels, vec!["a", "b"]);
    }
}
