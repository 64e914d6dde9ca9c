use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::labels::BucketMode;

/// Chart kinds the rasterizer knows, plus the `donut` spelling callers use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChartType {
    Bar,
    HorizontalBar,
    Line,
    Pie,
    Doughnut,
    /// Accepted on input, rewritten to [`ChartType::Doughnut`] by normalization.
    Donut,
    PolarArea,
    Radar,
    Scatter,
    Bubble,
    RadialGauge,
    Other(String),
}

impl ChartType {
    pub fn as_str(&self) -> &str {
        match self {
            ChartType::Bar => "bar",
            ChartType::HorizontalBar => "horizontalBar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Doughnut => "doughnut",
            ChartType::Donut => "donut",
            ChartType::PolarArea => "polarArea",
            ChartType::Radar => "radar",
            ChartType::Scatter => "scatter",
            ChartType::Bubble => "bubble",
            ChartType::RadialGauge => "radialGauge",
            ChartType::Other(name) => name,
        }
    }

    /// Types drawn on x/y axes that get a zero-based y axis by default.
    pub fn has_default_axes(&self) -> bool {
        matches!(
            self,
            ChartType::Bar | ChartType::Line | ChartType::Scatter | ChartType::Bubble
        )
    }

    /// Types whose datasets receive generated background colors.
    pub fn takes_generated_colors(&self) -> bool {
        self.has_default_axes()
            || matches!(self, ChartType::Radar | ChartType::Pie | ChartType::Doughnut)
    }

    /// Types that color every data point instead of every dataset.
    pub fn colors_per_point(&self) -> bool {
        matches!(self, ChartType::Radar | ChartType::Pie | ChartType::Doughnut)
    }

    pub fn is_circular(&self) -> bool {
        matches!(self, ChartType::Pie | ChartType::Doughnut | ChartType::Donut)
    }
}

impl From<String> for ChartType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "bar" => ChartType::Bar,
            "horizontalBar" => ChartType::HorizontalBar,
            "line" => ChartType::Line,
            "pie" => ChartType::Pie,
            "doughnut" => ChartType::Doughnut,
            "donut" => ChartType::Donut,
            "polarArea" => ChartType::PolarArea,
            "radar" => ChartType::Radar,
            "scatter" => ChartType::Scatter,
            "bubble" => ChartType::Bubble,
            "radialGauge" => ChartType::RadialGauge,
            _ => ChartType::Other(name),
        }
    }
}

impl From<ChartType> for String {
    fn from(chart_type: ChartType) -> Self {
        chart_type.as_str().to_string()
    }
}

/// Plugins the rasterizer attaches while drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Plugin {
    #[serde(rename = "datalabels")]
    DataLabels,
    #[serde(rename = "radialGauge")]
    RadialGauge,
}

/// The canonical, fully defaulted chart handed to the rasterizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub data: ChartData,
    #[serde(default, deserialize_with = "object_or_null")]
    pub options: Map<String, Value>,
    /// Filled by normalization; anything a caller sends here is discarded.
    #[serde(default, skip_deserializing)]
    pub plugins: Vec<Plugin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(default, deserialize_with = "labels_as_strings")]
    pub labels: Vec<String>,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(
        default,
        deserialize_with = "label_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub label: Option<String>,
    #[serde(default)]
    pub data: Vec<DataPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Paint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Paint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_tension: Option<f64>,
    /// Keys the pipeline does not interpret, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Dataset {
    pub fn with_values(data: Vec<DataPoint>) -> Self {
        Self {
            label: None,
            data,
            background_color: None,
            border_color: None,
            line_tension: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataPoint {
    Number(f64),
    Text(String),
    Point {
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        r: Option<f64>,
    },
    Gap,
    /// Any other shape, such as `{t: "2020-01-01", y: 3}`; kept as sent.
    Other(Value),
}

impl DataPoint {
    /// The value drawn on the primary axis.
    pub fn value(&self) -> Option<f64> {
        match self {
            DataPoint::Number(v) => Some(*v).filter(|v| v.is_finite()),
            DataPoint::Text(s) => finite(s),
            DataPoint::Point { y, .. } => Some(*y),
            DataPoint::Gap => None,
            DataPoint::Other(value) => value.get("y").and_then(numeric),
        }
    }

    /// An explicit numeric x coordinate, if the point carries one.
    pub fn x(&self) -> Option<f64> {
        match self {
            DataPoint::Point { x, .. } => Some(*x),
            DataPoint::Other(value) => value.get("x").or(value.get("t")).and_then(numeric),
            _ => None,
        }
    }
}

fn finite(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => finite(s),
        _ => None,
    }
}

/// A color, or one color per data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Paint {
    Solid(String),
    PerPoint(Vec<String>),
    /// Arrays with non-string entries and other shapes, kept as sent.
    Other(Value),
}

impl Paint {
    pub fn at(&self, index: usize) -> Option<&str> {
        match self {
            Paint::Solid(color) => Some(color.as_str()),
            Paint::PerPoint(colors) if colors.is_empty() => None,
            Paint::PerPoint(colors) => Some(colors[index % colors.len()].as_str()),
            Paint::Other(Value::Array(items)) if !items.is_empty() => {
                items[index % items.len()].as_str()
            }
            Paint::Other(_) => None,
        }
    }
}

/// Which request encoding a chart came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Inline,
    Template,
    Simplified,
    Remote,
}

impl InputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            InputMode::Inline => "inline",
            InputMode::Template => "template",
            InputMode::Simplified => "simplified",
            InputMode::Remote => "remote",
        }
    }
}

/// A chart before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawIntent {
    /// A free-form chart document (inline or remote).
    Document(Value),
    /// A named template filled with labels and values.
    Template(TemplateIntent),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateIntent {
    pub template: String,
    pub labels: Vec<String>,
    pub values: Vec<DataPoint>,
    /// Caller-supplied colors; `None` means walk the palette.
    pub colors: Option<Vec<String>>,
    pub label_mode: Option<BucketMode>,
}

fn object_or_null<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(serde::de::Error::custom(format!(
            "options must be an object, got {}",
            json_kind(&other)
        ))),
    }
}

fn labels_as_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw.iter().map(label_text).collect())
}

fn label_or_null<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        other => Some(label_text(&other)),
    })
}

pub(crate) fn label_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts.iter().map(label_text).collect::<Vec<_>>().join(" "),
        other => other.to_string(),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chart_type_round_trips_names() {
        let spec: ChartSpec = serde_json::from_value(json!({
            "type": "radialGauge",
            "data": {"datasets": [{"data": [70]}]}
        }))
        .unwrap();
        assert_eq!(spec.chart_type, ChartType::RadialGauge);
        assert_eq!(serde_json::to_value(&spec).unwrap()["type"], "radialGauge");

        let other: ChartType = "sankey".to_string().into();
        assert_eq!(other, ChartType::Other("sankey".into()));
    }

    #[test]
    fn labels_are_stringified() {
        let data: ChartData = serde_json::from_value(json!({
            "labels": ["a", 2, null, ["multi", "line"]]
        }))
        .unwrap();
        assert_eq!(data.labels, vec!["a", "2", "", "multi line"]);
    }

    #[test]
    fn data_points_accept_numbers_points_and_gaps() {
        let ds: Dataset = serde_json::from_value(json!({
            "data": [1, "2.5", {"x": 1, "y": 3, "r": 4}, null],
            "fill": false
        }))
        .unwrap();
        let values: Vec<_> = ds.data.iter().map(DataPoint::value).collect();
        assert_eq!(values, vec![Some(1.0), Some(2.5), Some(3.0), None]);
        assert_eq!(ds.extra.get("fill"), Some(&json!(false)));
    }

    #[test]
    fn null_options_become_empty() {
        let spec: ChartSpec = serde_json::from_value(json!({
            "type": "bar", "data": {}, "options": null
        }))
        .unwrap();
        assert!(spec.options.is_empty());
    }

    #[test]
    fn scalar_options_are_rejected() {
        let result = serde_json::from_value::<ChartSpec>(json!({
            "type": "bar", "data": {}, "options": 3
        }));
        assert!(result.is_err());
    }

    #[test]
    fn caller_plugins_are_ignored() {
        let spec: ChartSpec = serde_json::from_value(json!({
            "type": "bar", "data": {}, "plugins": ["anything"]
        }))
        .unwrap();
        assert!(spec.plugins.is_empty());
    }

    #[test]
    fn per_point_paint_cycles() {
        let paint = Paint::PerPoint(vec!["#111".into(), "#222".into()]);
        assert_eq!(paint.at(3), Some("#222"));
        assert_eq!(Paint::Solid("red".into()).at(9), Some("red"));
    }

    #[test]
    fn time_series_points_are_kept() {
        let ds: Dataset = serde_json::from_value(json!({
            "data": [{"x": "2020-01-01", "y": 3}, {"t": 1577836800000u64, "y": "4"}]
        }))
        .unwrap();
        let values: Vec<_> = ds.data.iter().map(DataPoint::value).collect();
        assert_eq!(values, vec![Some(3.0), Some(4.0)]);
        assert_eq!(ds.data[0].x(), None);
        assert_eq!(ds.data[1].x(), Some(1577836800000.0));
        assert_eq!(
            serde_json::to_value(&ds.data[0]).unwrap(),
            json!({"x": "2020-01-01", "y": 3})
        );
    }

    #[test]
    fn non_finite_text_is_not_a_value() {
        for text in ["NaN", "inf", "-infinity", "1e999"] {
            assert_eq!(DataPoint::Text(text.into()).value(), None, "{text}");
        }
        let other = DataPoint::Other(json!({"x": 1, "y": "NaN"}));
        assert_eq!(other.value(), None);
    }

    #[test]
    fn dataset_labels_are_stringified() {
        let ds: Dataset = serde_json::from_value(json!({"label": 2020, "data": []})).unwrap();
        assert_eq!(ds.label.as_deref(), Some("2020"));
        let ds: Dataset = serde_json::from_value(json!({"label": null})).unwrap();
        assert_eq!(ds.label, None);
    }

    #[test]
    fn colors_with_gaps_are_kept() {
        let ds: Dataset = serde_json::from_value(json!({
            "data": [1, 2],
            "backgroundColor": ["red", null]
        }))
        .unwrap();
        let paint = ds.background_color.unwrap();
        assert_eq!(paint.at(0), Some("red"));
        assert_eq!(paint.at(1), None);
        assert_eq!(paint.at(2), Some("red"));
    }
}
