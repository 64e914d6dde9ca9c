//! Chart rasterization: a normalized [`ChartSpec`] becomes an SVG document,
//! which [`raster::Rasterizer`] turns into PNG bytes.

mod cartesian;
mod radial;
pub mod raster;
pub mod scale;
pub mod svg;

use serde_json::{Map, Value};

use crate::chart::types::label_text;
use crate::chart::{ChartSpec, ChartType, Plugin};
use crate::config::ChartStyle;
use crate::error::{ChartError, ChartResult};
use crate::fonts::TextMeasure;

use self::svg::{Anchor, SvgCanvas, TextStyle};

pub use self::raster::Rasterizer;

const FALLBACK_COLOR: &str = "rgba(0,0,0,0.1)";
const OUTER_PADDING: f32 = 10.0;
const LEGEND_BOX_WIDTH: f32 = 40.0;
const LEGEND_PADDING: f32 = 10.0;

/// Output canvas for one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub background: Option<String>,
}

impl Frame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: None,
        }
    }

    pub fn with_background(mut self, color: Option<String>) -> Self {
        self.background = color;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Area {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Area {
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// Shared drawing state handed to the per-type painters.
pub(crate) struct Scene<'a> {
    pub canvas: SvgCanvas,
    pub style: &'a ChartStyle,
    pub measure: &'a mut dyn TextMeasure,
    pub options: &'a Map<String, Value>,
    pub data_labels: Option<DataLabels>,
}

impl Scene<'_> {
    pub fn text(&mut self, x: f32, y: f32, content: &str, size: f32, anchor: Anchor) {
        let style = TextStyle {
            family: &self.style.font_family,
            size,
            color: &self.style.text_color,
            bold: false,
            anchor,
        };
        self.canvas.text(x, y, content, &style);
    }

    pub fn text_width(&mut self, content: &str, size: f32) -> f32 {
        self.measure.measure_text(content, size, false).0
    }

    /// Draw a data label centred on `(x, y)` when data labels are on.
    pub fn data_label(&mut self, x: f32, y: f32, value: f64) {
        let Some(labels) = self.data_labels.clone() else {
            return;
        };
        let style = TextStyle {
            family: &self.style.font_family,
            size: labels.font_size,
            color: &labels.color,
            bold: labels.bold,
            anchor: Anchor::Middle,
        };
        self.canvas
            .text(x, y + labels.font_size * 0.35, &scale::format_tick(value), &style);
    }
}

/// Resolved `options.plugins.datalabels`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DataLabels {
    pub color: String,
    pub font_size: f32,
    pub bold: bool,
}

impl DataLabels {
    fn from_options(spec: &ChartSpec, default_size: f32) -> Option<Self> {
        if !spec.plugins.contains(&Plugin::DataLabels) {
            return None;
        }
        let config = lookup(&spec.options, &["plugins", "datalabels"])?;
        if config.get("display").and_then(Value::as_bool) != Some(true) {
            return None;
        }
        Some(Self {
            color: str_at(config, &["color"]).unwrap_or("#666666").to_string(),
            font_size: num_at(config, &["font", "size"]).unwrap_or(default_size as f64) as f32,
            bold: str_at(config, &["font", "weight"]) == Some("bold"),
        })
    }
}

/// Draws normalized charts and error images as SVG.
pub struct ChartRenderer<M: TextMeasure> {
    style: ChartStyle,
    measure: M,
}

impl<M: TextMeasure> ChartRenderer<M> {
    pub fn new(style: ChartStyle, measure: M) -> Self {
        Self { style, measure }
    }

    pub fn style(&self) -> &ChartStyle {
        &self.style
    }

    pub fn render_svg(&mut self, spec: &ChartSpec, frame: &Frame) -> ChartResult<String> {
        if frame.width == 0 || frame.height == 0 {
            return Err(ChartError::render("Chart dimensions must be positive"));
        }

        let data_labels = DataLabels::from_options(spec, self.style.font_size);
        let mut scene = Scene {
            canvas: SvgCanvas::new(frame.width as f32, frame.height as f32),
            style: &self.style,
            measure: &mut self.measure,
            options: &spec.options,
            data_labels,
        };

        if let Some(background) = &frame.background {
            scene
                .canvas
                .rect(0.0, 0.0, frame.width as f32, frame.height as f32, background);
        }

        let mut area = Area {
            x: OUTER_PADDING,
            y: OUTER_PADDING,
            w: frame.width as f32 - OUTER_PADDING * 2.0,
            h: frame.height as f32 - OUTER_PADDING * 2.0,
        };
        draw_title(&mut scene, &mut area);
        draw_legend(&mut scene, spec, &mut area);

        if area.w <= 1.0 || area.h <= 1.0 {
            return Err(ChartError::render("Chart is too small to draw"));
        }

        match spec.chart_type {
            ChartType::Bar
            | ChartType::HorizontalBar
            | ChartType::Line
            | ChartType::Scatter
            | ChartType::Bubble => cartesian::draw(&mut scene, spec, area)?,
            ChartType::Pie | ChartType::Doughnut | ChartType::Donut => {
                radial::draw_arcs(&mut scene, spec, area)?
            }
            ChartType::PolarArea => radial::draw_polar_area(&mut scene, spec, area)?,
            ChartType::Radar => radial::draw_radar(&mut scene, spec, area)?,
            ChartType::RadialGauge => radial::draw_gauge(&mut scene, spec, area)?,
            ChartType::Other(ref name) => {
                return Err(ChartError::render(format!("Unsupported chart type: {}", name)));
            }
        }

        Ok(scene.canvas.finish())
    }

    /// An image that shows `Chart Error: <message>`, one row per line.
    pub fn error_svg(&mut self, message: &str) -> String {
        let text = format!("Chart Error: {}", message);
        let size = self.style.error_font_size;
        let padding = self.style.error_padding;
        let line_height = size * 1.2;

        let lines: Vec<&str> = text.lines().collect();
        let widest = lines
            .iter()
            .map(|line| self.measure.measure_text(line, size, false).0)
            .fold(0.0f32, f32::max);

        let width = (widest + padding * 2.0).ceil().max(1.0);
        let height = (line_height * lines.len().max(1) as f32 + padding * 2.0).ceil();
        let mut canvas = SvgCanvas::new(width, height);
        canvas.rect(0.0, 0.0, width, height, &self.style.error_background);

        let style = TextStyle {
            family: &self.style.font_family,
            size,
            color: &self.style.error_text_color,
            bold: false,
            anchor: Anchor::Start,
        };
        for (row, line) in lines.iter().enumerate() {
            let baseline = padding + line_height * row as f32 + size;
            canvas.text(padding, baseline, line, &style);
        }
        canvas.finish()
    }
}

fn draw_title(scene: &mut Scene<'_>, area: &mut Area) {
    if lookup(scene.options, &["title", "display"]).and_then(Value::as_bool) != Some(true) {
        return;
    }
    let lines: Vec<String> = match lookup(scene.options, &["title", "text"]) {
        Some(Value::Array(parts)) => parts.iter().map(label_text).collect(),
        Some(value) => vec![label_text(value)],
        None => Vec::new(),
    };
    if lines.iter().all(|line| line.is_empty()) {
        return;
    }

    let size = num_at_map(scene.options, &["title", "fontSize"])
        .map(|v| v as f32)
        .unwrap_or(scene.style.font_size);
    let (cx, _) = area.center();
    let chart_style = scene.style;
    let style = TextStyle {
        family: &chart_style.font_family,
        size,
        color: &chart_style.text_color,
        bold: true,
        anchor: Anchor::Middle,
    };
    for line in &lines {
        let baseline = area.y + size;
        scene.canvas.text(cx, baseline, line, &style);
        area.y += size * 1.2;
        area.h -= size * 1.2;
    }
    area.y += LEGEND_PADDING;
    area.h -= LEGEND_PADDING;
}

struct LegendItem {
    text: String,
    color: String,
}

fn legend_items(spec: &ChartSpec) -> Vec<LegendItem> {
    let per_label = matches!(
        spec.chart_type,
        ChartType::Pie | ChartType::Doughnut | ChartType::Donut | ChartType::PolarArea
    );
    if per_label {
        let first = spec.data.datasets.first();
        return spec
            .data
            .labels
            .iter()
            .enumerate()
            .map(|(i, label)| LegendItem {
                text: label.clone(),
                color: first
                    .and_then(|ds| ds.background_color.as_ref())
                    .and_then(|paint| paint.at(i))
                    .unwrap_or(FALLBACK_COLOR)
                    .to_string(),
            })
            .collect();
    }
    spec.data
        .datasets
        .iter()
        .map(|ds| LegendItem {
            text: ds.label.clone().unwrap_or_default(),
            color: ds
                .background_color
                .as_ref()
                .or(ds.border_color.as_ref())
                .and_then(|paint| paint.at(0))
                .unwrap_or(FALLBACK_COLOR)
                .to_string(),
        })
        .collect()
}

fn draw_legend(scene: &mut Scene<'_>, spec: &ChartSpec, area: &mut Area) {
    let default_display = spec.chart_type != ChartType::RadialGauge;
    let display = lookup(scene.options, &["legend", "display"])
        .and_then(Value::as_bool)
        .unwrap_or(default_display);
    if !display {
        return;
    }
    let items = legend_items(spec);
    if items.is_empty() {
        return;
    }

    let size = num_at_map(scene.options, &["legend", "labels", "fontSize"])
        .map(|v| v as f32)
        .unwrap_or(scene.style.font_size);
    let box_width = num_at_map(scene.options, &["legend", "labels", "boxWidth"])
        .map(|v| v as f32)
        .unwrap_or(LEGEND_BOX_WIDTH);
    let padding = num_at_map(scene.options, &["legend", "labels", "padding"])
        .map(|v| v as f32)
        .unwrap_or(LEGEND_PADDING);

    // Lay items out in centred rows.
    let mut rows: Vec<Vec<(usize, f32)>> = vec![Vec::new()];
    let mut row_width = 0.0;
    for (i, item) in items.iter().enumerate() {
        let width = box_width + size / 2.0 + scene.text_width(&item.text, size) + padding;
        if row_width + width > area.w && !rows.last().is_none_or(Vec::is_empty) {
            rows.push(Vec::new());
            row_width = 0.0;
        }
        row_width += width;
        if let Some(row) = rows.last_mut() {
            row.push((i, width));
        }
    }

    let row_height = size + padding;
    for row in &rows {
        let total: f32 = row.iter().map(|(_, w)| w).sum();
        let mut x = area.x + (area.w - total + padding) / 2.0;
        for &(i, width) in row {
            let item = &items[i];
            scene.canvas.rect(x, area.y, box_width, size, &item.color);
            scene.text(
                x + box_width + size / 2.0,
                area.y + size * 0.85,
                &item.text,
                size,
                Anchor::Start,
            );
            x += width;
        }
        area.y += row_height;
        area.h -= row_height;
    }
}

/// Follow `path` through nested objects.
pub(crate) fn lookup<'a>(map: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = map.get(*first)?;
    for key in rest {
        current = current.get(*key)?;
    }
    Some(current)
}

pub(crate) fn num_at(value: &Value, path: &[&str]) -> Option<f64> {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))
        .and_then(Value::as_f64)
}

pub(crate) fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))
        .and_then(Value::as_str)
}

pub(crate) fn bool_at(value: &Value, path: &[&str]) -> Option<bool> {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))
        .and_then(Value::as_bool)
}

pub(crate) fn num_at_map(map: &Map<String, Value>, path: &[&str]) -> Option<f64> {
    lookup(map, path).and_then(Value::as_f64)
}

/// Fill color for dataset `index`, point `point`.
pub(crate) fn fill_color(spec: &ChartSpec, dataset: usize, point: usize) -> &str {
    spec.data
        .datasets
        .get(dataset)
        .and_then(|ds| ds.background_color.as_ref())
        .and_then(|paint| paint.at(point))
        .unwrap_or(FALLBACK_COLOR)
}

/// Stroke color, falling back to the fill.
pub(crate) fn stroke_color(spec: &ChartSpec, dataset: usize, point: usize) -> &str {
    spec.data
        .datasets
        .get(dataset)
        .and_then(|ds| ds.border_color.as_ref())
        .and_then(|paint| paint.at(point))
        .unwrap_or_else(|| fill_color(spec, dataset, point))
}

/// A dataset's numeric passthrough key, such as `borderWidth`.
pub(crate) fn dataset_number(spec: &ChartSpec, dataset: usize, key: &str) -> Option<f64> {
    spec.data
        .datasets
        .get(dataset)
        .and_then(|ds| ds.extra.get(key))
        .and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{InputMode, RawIntent, normalize};
    use crate::fonts::CharCountMeasure;
    use serde_json::json;

    fn renderer() -> ChartRenderer<CharCountMeasure> {
        ChartRenderer::new(ChartStyle::default(), CharCountMeasure)
    }

    fn chart(value: Value) -> ChartSpec {
        normalize(RawIntent::Document(value), InputMode::Inline).unwrap()
    }

    #[test]
    fn every_known_type_draws() {
        let types = [
            "bar",
            "horizontalBar",
            "line",
            "scatter",
            "bubble",
            "pie",
            "doughnut",
            "donut",
            "polarArea",
            "radar",
            "radialGauge",
        ];
        for chart_type in types {
            let spec = chart(json!({
                "type": chart_type,
                "data": {
                    "labels": ["a", "b", "c"],
                    "datasets": [{"label": "one", "data": [3, 7, 5]}]
                }
            }));
            let svg = renderer()
                .render_svg(&spec, &Frame::new(500, 300))
                .unwrap_or_else(|e| panic!("{} failed: {}", chart_type, e));
            assert!(svg.starts_with("<svg"), "{}", chart_type);
            assert!(svg.contains(r#"width="500""#), "{}", chart_type);
        }
    }

    #[test]
    fn unknown_type_is_a_render_error() {
        let spec = chart(json!({"type": "sankey", "data": {}}));
        let err = renderer().render_svg(&spec, &Frame::new(500, 300)).unwrap_err();
        assert!(matches!(err, ChartError::Render(_)));
        assert_eq!(err.to_string(), "Invalid chart options\nUnsupported chart type: sankey");
    }

    #[test]
    fn background_is_painted_first() {
        let spec = chart(json!({"type": "bar", "data": {"datasets": [{"data": [1]}]}}));
        let frame = Frame::new(200, 100).with_background(Some("#abcdef".into()));
        let svg = renderer().render_svg(&spec, &frame).unwrap();
        let body = svg.split_once('>').unwrap().1;
        assert!(body.starts_with(r##"<rect x="0.00" y="0.00" width="200.00" height="100.00" fill="#abcdef"/>"##));
    }

    #[test]
    fn title_and_legend_text_are_escaped() {
        let spec = chart(json!({
            "type": "bar",
            "data": {"datasets": [{"label": "<a & b>", "data": [1]}]},
            "options": {"title": {"display": true, "text": "Sales \"Q1\""}}
        }));
        let svg = renderer().render_svg(&spec, &Frame::new(500, 300)).unwrap();
        assert!(svg.contains("&lt;a &amp; b&gt;"));
        assert!(svg.contains("Sales &quot;Q1&quot;"));
    }

    #[test]
    fn pie_draws_value_labels_by_default() {
        let spec = chart(json!({
            "type": "pie",
            "data": {"labels": ["x", "y"], "datasets": [{"data": [40, 60]}]}
        }));
        let svg = renderer().render_svg(&spec, &Frame::new(500, 300)).unwrap();
        assert!(svg.contains(">40</text>"));
        assert!(svg.contains(">60</text>"));

        let quiet = chart(json!({
            "type": "pie",
            "data": {"labels": ["x", "y"], "datasets": [{"data": [40, 60]}]},
            "options": {"plugins": {"datalabels": {"display": false}}}
        }));
        let svg = renderer().render_svg(&quiet, &Frame::new(500, 300)).unwrap();
        assert!(!svg.contains(">40</text>"));
    }

    #[test]
    fn error_image_has_one_row_per_line() {
        let svg = renderer().error_svg("Invalid input\nUnexpected token at offset 3");
        assert!(svg.contains(">Chart Error: Invalid input</text>"));
        assert!(svg.contains(">Unexpected token at offset 3</text>"));
        // 2 lines * 36px + 2 * 10px padding
        assert!(svg.contains(r#"height="92""#));
    }

    #[test]
    fn lookup_walks_nested_objects() {
        let options = json!({"a": {"b": {"c": 4}}});
        let map = options.as_object().unwrap();
        assert_eq!(num_at_map(map, &["a", "b", "c"]), Some(4.0));
        assert_eq!(lookup(map, &["a", "x"]), None);
    }
}
