use serde_json::Value;

use super::scale::{LinearScale, ScaleBounds, format_tick};
use super::svg::{Anchor, PathData, TextStyle};
use super::{
    Area, Scene, bool_at, dataset_number, fill_color, lookup, num_at, str_at, stroke_color,
};
use crate::chart::{ChartSpec, ChartType, DataPoint};
use crate::error::{ChartError, ChartResult};

const TICK_GAP: f32 = 6.0;
const TICK_SPACING: f32 = 40.0;
const RIGHT_PADDING: f32 = 10.0;
const CATEGORY_PERCENTAGE: f32 = 0.8;
const BAR_PERCENTAGE: f32 = 0.9;
const LINE_WIDTH: f32 = 3.0;
const POINT_RADIUS: f32 = 3.0;

/// One entry of `options.scales.xAxes` / `yAxes`.
struct AxisOptions {
    display: bool,
    bounds: ScaleBounds,
    grid: bool,
    title: Option<String>,
    font_size: f32,
}

impl AxisOptions {
    fn read(scene: &Scene<'_>, key: &str) -> Self {
        let axis = lookup(scene.options, &["scales", key]).and_then(|axes| axes.get(0));
        let flag = |path: &[&str]| axis.and_then(|a| bool_at(a, path));
        let number = |path: &[&str]| axis.and_then(|a| num_at(a, path));

        let title = match flag(&["scaleLabel", "display"]) {
            Some(true) => axis
                .and_then(|a| str_at(a, &["scaleLabel", "labelString"]))
                .filter(|text| !text.is_empty())
                .map(str::to_string),
            _ => None,
        };

        Self {
            display: flag(&["display"]).unwrap_or(true),
            bounds: ScaleBounds {
                begin_at_zero: flag(&["ticks", "beginAtZero"]).unwrap_or(false),
                min: number(&["ticks", "min"]),
                max: number(&["ticks", "max"]),
            },
            grid: flag(&["gridLines", "display"]).unwrap_or(true),
            title,
            font_size: number(&["ticks", "fontSize"])
                .map(|v| v as f32)
                .unwrap_or(scene.style.font_size),
        }
    }

    fn title_space(&self) -> f32 {
        self.title.as_ref().map_or(0.0, |_| self.font_size * 1.2 + 4.0)
    }
}

/// Evenly spaced category positions along one axis.
#[derive(Debug, Clone, Copy)]
struct Band {
    start: f32,
    len: f32,
    count: usize,
    /// Centre items in slots (bars) instead of spanning edge to edge (lines).
    offset: bool,
}

impl Band {
    fn slot(&self) -> f32 {
        if self.offset {
            self.len / self.count.max(1) as f32
        } else {
            self.len / self.count.saturating_sub(1).max(1) as f32
        }
    }

    fn pos(&self, index: usize) -> f32 {
        if self.offset {
            self.start + self.slot() * (index as f32 + 0.5)
        } else if self.count <= 1 {
            self.start + self.len / 2.0
        } else {
            self.start + self.slot() * index as f32
        }
    }
}

/// The axis running along the bottom edge.
enum BottomAxis {
    Category(Vec<String>),
    Linear(LinearScale),
}

pub(super) fn draw(scene: &mut Scene<'_>, spec: &ChartSpec, area: Area) -> ChartResult<()> {
    let horizontal = spec.chart_type == ChartType::HorizontalBar;
    let xy = matches!(spec.chart_type, ChartType::Scatter | ChartType::Bubble);
    let x_axis = AxisOptions::read(scene, "xAxes");
    let y_axis = AxisOptions::read(scene, "yAxes");

    let category_count = spec
        .data
        .datasets
        .iter()
        .map(|ds| ds.data.len())
        .chain(std::iter::once(spec.data.labels.len()))
        .max()
        .unwrap_or(0);
    let mut categories = spec.data.labels.clone();
    categories.resize(category_count, String::new());

    let values: Vec<f64> = spec
        .data
        .datasets
        .iter()
        .flat_map(|ds| ds.data.iter().filter_map(DataPoint::value))
        .collect();
    let (value_axis, value_extent) = if horizontal {
        (&x_axis, area.w)
    } else {
        (&y_axis, area.h)
    };
    let value_scale = LinearScale::fit(values, value_axis.bounds, tick_budget(value_extent));

    let bottom = if horizontal {
        BottomAxis::Linear(value_scale.clone())
    } else if xy {
        let xs = spec.data.datasets.iter().flat_map(|ds| {
            ds.data.iter().enumerate().filter_map(|(i, point)| x_of(point, i))
        });
        BottomAxis::Linear(LinearScale::fit(xs, x_axis.bounds, tick_budget(area.w)))
    } else {
        BottomAxis::Category(categories.clone())
    };

    let left_labels: Vec<String> = if horizontal {
        categories.clone()
    } else {
        value_scale.ticks().into_iter().map(format_tick).collect()
    };

    // Plot area after tick labels and titles.
    let left_width = if y_axis.display {
        left_labels
            .iter()
            .map(|label| scene.text_width(label, y_axis.font_size))
            .fold(0.0f32, f32::max)
            + TICK_GAP
    } else {
        0.0
    } + y_axis.title_space();
    let bottom_height = if x_axis.display {
        x_axis.font_size * 1.2 + TICK_GAP
    } else {
        0.0
    } + x_axis.title_space();
    let top = y_axis.font_size / 2.0;

    let plot = Area {
        x: area.x + left_width,
        y: area.y + top,
        w: area.w - left_width - RIGHT_PADDING,
        h: area.h - top - bottom_height,
    };
    if plot.w <= 1.0 || plot.h <= 1.0 {
        return Err(ChartError::render("Chart is too small to draw its axes"));
    }

    let grid_color = scene.style.grid_color.clone();

    // Left axis.
    if y_axis.display {
        if horizontal {
            let band = Band {
                start: plot.y,
                len: plot.h,
                count: categories.len(),
                offset: true,
            };
            for (i, label) in categories.iter().enumerate() {
                let y = band.pos(i);
                scene.text(
                    plot.x - TICK_GAP,
                    y + y_axis.font_size * 0.35,
                    label,
                    y_axis.font_size,
                    Anchor::End,
                );
            }
            if y_axis.grid {
                for i in 0..=categories.len() {
                    let y = band.start + band.slot() * i as f32;
                    scene.canvas.line(plot.x, y, plot.right(), y, &grid_color, 1.0);
                }
            }
        } else {
            for tick in value_scale.ticks() {
                let y = plot.bottom() - value_scale.fraction(tick) as f32 * plot.h;
                scene.text(
                    plot.x - TICK_GAP,
                    y + y_axis.font_size * 0.35,
                    &format_tick(tick),
                    y_axis.font_size,
                    Anchor::End,
                );
                if y_axis.grid {
                    scene.canvas.line(plot.x, y, plot.right(), y, &grid_color, 1.0);
                }
            }
        }
    }

    // Bottom axis.
    if x_axis.display {
        let baseline = plot.bottom() + TICK_GAP + x_axis.font_size;
        match &bottom {
            BottomAxis::Linear(scale) => {
                for tick in scale.ticks() {
                    let x = plot.x + scale.fraction(tick) as f32 * plot.w;
                    scene.text(x, baseline, &format_tick(tick), x_axis.font_size, Anchor::Middle);
                    if x_axis.grid {
                        scene.canvas.line(x, plot.y, x, plot.bottom(), &grid_color, 1.0);
                    }
                }
            }
            BottomAxis::Category(labels) => {
                let band = category_band(spec, plot, labels.len());
                let widest = labels
                    .iter()
                    .map(|label| scene.text_width(label, x_axis.font_size))
                    .fold(0.0f32, f32::max);
                let every = ((widest + 4.0) / band.slot().max(1.0)).ceil().max(1.0) as usize;
                for (i, label) in labels.iter().enumerate().step_by(every) {
                    scene.text(band.pos(i), baseline, label, x_axis.font_size, Anchor::Middle);
                }
                if x_axis.grid {
                    let lines = if band.offset { labels.len() + 1 } else { labels.len() };
                    for i in 0..lines {
                        let x = if band.offset {
                            band.start + band.slot() * i as f32
                        } else {
                            band.pos(i)
                        };
                        scene.canvas.line(x, plot.y, x, plot.bottom(), &grid_color, 1.0);
                    }
                }
            }
        }
    }

    draw_axis_titles(scene, area, plot, &x_axis, &y_axis);

    match spec.chart_type {
        ChartType::Bar => draw_bars(scene, spec, plot, &value_scale, false),
        ChartType::HorizontalBar => draw_bars(scene, spec, plot, &value_scale, true),
        ChartType::Line => draw_lines(scene, spec, plot, &value_scale),
        _ => {
            if let BottomAxis::Linear(x_scale) = &bottom {
                draw_points(scene, spec, plot, x_scale, &value_scale);
            }
        }
    }
    Ok(())
}

fn tick_budget(extent: f32) -> usize {
    ((extent / TICK_SPACING) as usize).clamp(2, 11)
}

fn x_of(point: &DataPoint, index: usize) -> Option<f64> {
    match point {
        DataPoint::Gap => None,
        _ => point.x().or(Some(index as f64)),
    }
}

fn category_band(spec: &ChartSpec, plot: Area, count: usize) -> Band {
    Band {
        start: plot.x,
        len: plot.w,
        count,
        offset: spec.chart_type != ChartType::Line,
    }
}

fn draw_axis_titles(
    scene: &mut Scene<'_>,
    area: Area,
    plot: Area,
    x_axis: &AxisOptions,
    y_axis: &AxisOptions,
) {
    let chart_style = scene.style;
    if let Some(title) = &y_axis.title {
        let style = TextStyle {
            family: &chart_style.font_family,
            size: y_axis.font_size,
            color: &chart_style.text_color,
            bold: false,
            anchor: Anchor::Middle,
        };
        let (_, cy) = plot.center();
        scene
            .canvas
            .text_rotated(area.x + y_axis.font_size, cy, title, &style, -90.0);
    }
    if let Some(title) = &x_axis.title {
        let (cx, _) = plot.center();
        scene.text(cx, area.bottom() - 2.0, title, x_axis.font_size, Anchor::Middle);
    }
}

fn draw_bars(
    scene: &mut Scene<'_>,
    spec: &ChartSpec,
    plot: Area,
    scale: &LinearScale,
    horizontal: bool,
) {
    let count = spec
        .data
        .datasets
        .iter()
        .map(|ds| ds.data.len())
        .chain(std::iter::once(spec.data.labels.len()))
        .max()
        .unwrap_or(0);
    let band = if horizontal {
        Band {
            start: plot.y,
            len: plot.h,
            count,
            offset: true,
        }
    } else {
        category_band(spec, plot, count)
    };
    let datasets = spec.data.datasets.len().max(1);
    let group = band.slot() * CATEGORY_PERCENTAGE;
    let sub = group / datasets as f32;
    let thickness = sub * BAR_PERCENTAGE;

    let to_px = |value: f64| {
        let fraction = scale.fraction(value).clamp(0.0, 1.0) as f32;
        if horizontal {
            plot.x + fraction * plot.w
        } else {
            plot.bottom() - fraction * plot.h
        }
    };
    let base = to_px(0.0f64.max(scale.min).min(scale.max));

    for (j, dataset) in spec.data.datasets.iter().enumerate() {
        let border_width = dataset_number(spec, j, "borderWidth").unwrap_or(0.0) as f32;
        for (i, point) in dataset.data.iter().enumerate() {
            let Some(value) = point.value() else {
                continue;
            };
            let across = band.pos(i) - group / 2.0 + sub * j as f32 + (sub - thickness) / 2.0;
            let tip = to_px(value);

            let mut d = PathData::new();
            if horizontal {
                d.move_to(base, across)
                    .line_to(tip, across)
                    .line_to(tip, across + thickness)
                    .line_to(base, across + thickness)
                    .close();
            } else {
                d.move_to(across, base)
                    .line_to(across, tip)
                    .line_to(across + thickness, tip)
                    .line_to(across + thickness, base)
                    .close();
            }
            let stroke = (border_width > 0.0).then(|| (stroke_color(spec, j, i), border_width));
            scene.canvas.path(d.as_str(), fill_color(spec, j, i), stroke);

            let (cx, cy) = if horizontal {
                ((base + tip) / 2.0, across + thickness / 2.0)
            } else {
                (across + thickness / 2.0, (base + tip) / 2.0)
            };
            scene.data_label(cx, cy, value);
        }
    }
}

fn draw_lines(scene: &mut Scene<'_>, spec: &ChartSpec, plot: Area, scale: &LinearScale) {
    let count = spec
        .data
        .datasets
        .iter()
        .map(|ds| ds.data.len())
        .chain(std::iter::once(spec.data.labels.len()))
        .max()
        .unwrap_or(0);
    let band = category_band(spec, plot, count);
    let base_value = 0.0f64.max(scale.min).min(scale.max);
    let base = plot.bottom() - scale.fraction(base_value) as f32 * plot.h;

    for (j, dataset) in spec.data.datasets.iter().enumerate() {
        let points: Vec<Option<(f32, f32)>> = dataset
            .data
            .iter()
            .enumerate()
            .map(|(i, point)| {
                point.value().map(|v| {
                    let fraction = scale.fraction(v).clamp(0.0, 1.0) as f32;
                    (band.pos(i), plot.bottom() - fraction * plot.h)
                })
            })
            .collect();
        let tension = dataset.line_tension.unwrap_or(0.0) as f32;
        let filled = !matches!(dataset.extra.get("fill"), Some(Value::Bool(false)));
        let border_width = dataset_number(spec, j, "borderWidth")
            .map(|v| v as f32)
            .unwrap_or(LINE_WIDTH);
        let radius = dataset_number(spec, j, "pointRadius")
            .map(|v| v as f32)
            .unwrap_or(POINT_RADIUS);

        for segment in points.split(Option::is_none) {
            let segment: Vec<(f32, f32)> = segment.iter().flatten().copied().collect();
            let (Some(first), Some(last)) = (segment.first(), segment.last()) else {
                continue;
            };
            let stroke = curve(&segment, tension);

            if filled {
                let mut area_path = curve(&segment, tension);
                area_path.line_to(last.0, base).line_to(first.0, base).close();
                scene.canvas.path(area_path.as_str(), fill_color(spec, j, 0), None);
            }
            scene.canvas.path(
                stroke.as_str(),
                "none",
                Some((stroke_color(spec, j, 0), border_width)),
            );
        }

        for (i, point) in points.iter().enumerate() {
            let Some((x, y)) = *point else {
                continue;
            };
            if radius > 0.0 {
                scene.canvas.circle(
                    x,
                    y,
                    radius,
                    fill_color(spec, j, i),
                    Some((stroke_color(spec, j, i), 1.0)),
                );
            }
            if let Some(value) = dataset.data[i].value() {
                scene.data_label(x, y, value);
            }
        }
    }
}

fn draw_points(
    scene: &mut Scene<'_>,
    spec: &ChartSpec,
    plot: Area,
    x_scale: &LinearScale,
    y_scale: &LinearScale,
) {
    let bubble = spec.chart_type == ChartType::Bubble;
    for (j, dataset) in spec.data.datasets.iter().enumerate() {
        let default_radius = dataset_number(spec, j, "pointRadius")
            .map(|v| v as f32)
            .unwrap_or(POINT_RADIUS);
        let mut placed = Vec::new();
        for (i, point) in dataset.data.iter().enumerate() {
            let (Some(x), Some(y)) = (x_of(point, i), point.value()) else {
                continue;
            };
            let px = plot.x + x_scale.fraction(x).clamp(0.0, 1.0) as f32 * plot.w;
            let py = plot.bottom() - y_scale.fraction(y).clamp(0.0, 1.0) as f32 * plot.h;
            let radius = match point {
                DataPoint::Point { r: Some(r), .. } if bubble => *r as f32,
                _ => default_radius,
            };
            placed.push((px, py, radius, i, y));
        }

        if dataset.extra.get("showLine").and_then(Value::as_bool) == Some(true) {
            let line: Vec<(f32, f32)> = placed.iter().map(|p| (p.0, p.1)).collect();
            let path = curve(&line, dataset.line_tension.unwrap_or(0.0) as f32);
            if !path.is_empty() {
                scene
                    .canvas
                    .path(path.as_str(), "none", Some((stroke_color(spec, j, 0), LINE_WIDTH)));
            }
        }

        for (px, py, radius, i, y) in placed {
            scene.canvas.circle(
                px,
                py,
                radius,
                fill_color(spec, j, i),
                Some((stroke_color(spec, j, i), 1.0)),
            );
            scene.data_label(px, py, y);
        }
    }
}

/// Path through `points`, smoothed with cubic splines when `tension > 0`.
fn curve(points: &[(f32, f32)], tension: f32) -> PathData {
    let mut d = PathData::new();
    let Some(&(x0, y0)) = points.first() else {
        return d;
    };
    d.move_to(x0, y0);
    if tension <= 0.0 || points.len() < 3 {
        for &(x, y) in &points[1..] {
            d.line_to(x, y);
        }
        return d;
    }

    let controls: Vec<((f32, f32), (f32, f32))> = (0..points.len())
        .map(|i| {
            let prev = points[i.saturating_sub(1)];
            let current = points[i];
            let next = points[(i + 1).min(points.len() - 1)];
            spline_controls(prev, current, next, tension)
        })
        .collect();
    for i in 1..points.len() {
        d.cubic_to(controls[i - 1].1, controls[i].0, points[i]);
    }
    d
}

fn spline_controls(
    prev: (f32, f32),
    current: (f32, f32),
    next: (f32, f32),
    tension: f32,
) -> ((f32, f32), (f32, f32)) {
    let d01 = ((current.0 - prev.0).powi(2) + (current.1 - prev.1).powi(2)).sqrt();
    let d12 = ((next.0 - current.0).powi(2) + (next.1 - current.1).powi(2)).sqrt();
    let total = d01 + d12;
    let (s01, s12) = if total > 0.0 {
        (d01 / total, d12 / total)
    } else {
        (0.0, 0.0)
    };
    let (dx, dy) = (next.0 - prev.0, next.1 - prev.1);
    let fa = tension * s01;
    let fb = tension * s12;
    (
        (current.0 - fa * dx, current.1 - fa * dy),
        (current.0 + fb * dx, current.1 + fb * dy),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_band_centres_items() {
        let band = Band {
            start: 0.0,
            len: 100.0,
            count: 4,
            offset: true,
        };
        assert_eq!(band.pos(0), 12.5);
        assert_eq!(band.pos(3), 87.5);
    }

    #[test]
    fn edge_band_spans_the_axis() {
        let band = Band {
            start: 10.0,
            len: 90.0,
            count: 4,
            offset: false,
        };
        assert_eq!(band.pos(0), 10.0);
        assert_eq!(band.pos(3), 100.0);
        let single = Band { count: 1, ..band };
        assert_eq!(single.pos(0), 55.0);
    }

    #[test]
    fn straight_curve_uses_line_segments() {
        let d = curve(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)], 0.0);
        assert_eq!(d.as_str(), "M0.00,0.00 L1.00,1.00 L2.00,0.00");
    }

    #[test]
    fn tension_bends_the_curve() {
        let d = curve(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)], 0.4);
        assert!(d.as_str().contains('C'));
        assert!(!d.as_str().contains('L'));
    }

    #[test]
    fn collinear_points_keep_controls_on_the_line() {
        let (before, after) = spline_controls((0.0, 0.0), (1.0, 0.0), (2.0, 0.0), 0.5);
        assert_eq!(before.1, 0.0);
        assert_eq!(after.1, 0.0);
        assert!(before.0 < 1.0 && after.0 > 1.0);
    }
}
