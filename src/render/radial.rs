use std::f32::consts::{FRAC_PI_2, PI, TAU};

use serde_json::Value;

use super::scale::{LinearScale, ScaleBounds, format_tick};
use super::svg::{Anchor, PathData, TextStyle};
use super::{
    Area, Scene, bool_at, dataset_number, fill_color, lookup, num_at, num_at_map, str_at,
    stroke_color,
};
use crate::chart::{ChartSpec, ChartType, DataPoint};
use crate::error::ChartResult;

const SLICE_BORDER: &str = "#ffffff";
const SLICE_BORDER_WIDTH: f32 = 2.0;
const DOUGHNUT_CUTOUT: f32 = 50.0;
const GAUGE_CENTER_PERCENTAGE: f32 = 80.0;
const GAUGE_TRACK_COLOR: &str = "#e6e6e6";
const RADAR_LINE_WIDTH: f32 = 3.0;
const POINT_RADIUS: f32 = 3.0;

fn polar(cx: f32, cy: f32, radius: f32, angle: f32) -> (f32, f32) {
    (cx + radius * angle.cos(), cy + radius * angle.sin())
}

/// Annular sector between `start` and `end` (radians, clockwise from +x).
fn ring_slice(center: (f32, f32), outer: f32, inner: f32, start: f32, end: f32) -> PathData {
    let (cx, cy) = center;
    let mut d = PathData::new();
    let sweep = end - start;

    if sweep >= TAU - 1e-4 {
        // A full turn needs two half arcs per circle.
        let (sx, sy) = polar(cx, cy, outer, start);
        let (mx, my) = polar(cx, cy, outer, start + PI);
        d.move_to(sx, sy)
            .arc_to(outer, false, true, mx, my)
            .arc_to(outer, false, true, sx, sy)
            .close();
        if inner > 0.0 {
            let (sx, sy) = polar(cx, cy, inner, start);
            let (mx, my) = polar(cx, cy, inner, start + PI);
            d.move_to(sx, sy)
                .arc_to(inner, false, false, mx, my)
                .arc_to(inner, false, false, sx, sy)
                .close();
        }
        return d;
    }

    let large = sweep > PI;
    let (ox1, oy1) = polar(cx, cy, outer, start);
    let (ox2, oy2) = polar(cx, cy, outer, end);
    d.move_to(ox1, oy1).arc_to(outer, large, true, ox2, oy2);
    if inner > 0.0 {
        let (ix2, iy2) = polar(cx, cy, inner, end);
        let (ix1, iy1) = polar(cx, cy, inner, start);
        d.line_to(ix2, iy2).arc_to(inner, large, false, ix1, iy1);
    } else {
        d.line_to(cx, cy);
    }
    d.close();
    d
}

fn slice_border<'a>(spec: &'a ChartSpec, dataset: usize, point: usize) -> (&'a str, f32) {
    let color = spec
        .data
        .datasets
        .get(dataset)
        .and_then(|ds| ds.border_color.as_ref())
        .and_then(|paint| paint.at(point))
        .unwrap_or(SLICE_BORDER);
    let width = dataset_number(spec, dataset, "borderWidth")
        .map(|v| v as f32)
        .unwrap_or(SLICE_BORDER_WIDTH);
    (color, width)
}

/// Pie and doughnut: one ring per dataset, first dataset outermost.
pub(super) fn draw_arcs(scene: &mut Scene<'_>, spec: &ChartSpec, area: Area) -> ChartResult<()> {
    let center = area.center();
    let radius = (area.w.min(area.h) / 2.0 - SLICE_BORDER_WIDTH).max(1.0);
    let default_cutout = if spec.chart_type == ChartType::Pie {
        0.0
    } else {
        DOUGHNUT_CUTOUT
    };
    let cutout = num_at_map(scene.options, &["cutoutPercentage"])
        .map(|v| v as f32)
        .unwrap_or(default_cutout)
        .clamp(0.0, 100.0);
    let rotation = num_at_map(scene.options, &["rotation"])
        .map(|v| v as f32)
        .unwrap_or(-FRAC_PI_2);
    let circumference = num_at_map(scene.options, &["circumference"])
        .map(|v| v as f32)
        .unwrap_or(TAU);

    let inner_radius = radius * cutout / 100.0;
    let rings = spec.data.datasets.len().max(1);
    let ring_width = (radius - inner_radius) / rings as f32;

    for (j, dataset) in spec.data.datasets.iter().enumerate() {
        let outer = radius - ring_width * j as f32;
        let inner = outer - ring_width;
        let values: Vec<f64> = dataset
            .data
            .iter()
            .map(|point| point.value().filter(|v| v.is_finite()).unwrap_or(0.0).max(0.0))
            .collect();
        let total: f64 = values.iter().sum();
        if total <= 0.0 {
            continue;
        }

        let mut angle = rotation;
        let mut label_spots = Vec::new();
        for (i, value) in values.iter().enumerate() {
            if *value <= 0.0 {
                continue;
            }
            let sweep = circumference * (*value / total) as f32;
            let d = ring_slice(center, outer, inner, angle, angle + sweep);
            scene
                .canvas
                .path(d.as_str(), fill_color(spec, j, i), Some(slice_border(spec, j, i)));
            let middle = angle + sweep / 2.0;
            label_spots.push((polar(center.0, center.1, (outer + inner) / 2.0, middle), *value));
            angle += sweep;
        }
        for ((x, y), value) in label_spots {
            scene.data_label(x, y, value);
        }
    }
    Ok(())
}

fn radial_bounds(scene: &Scene<'_>, begin_at_zero_default: bool) -> ScaleBounds {
    let ticks = lookup(scene.options, &["scale", "ticks"]);
    ScaleBounds {
        begin_at_zero: ticks
            .and_then(|t| bool_at(t, &["beginAtZero"]))
            .unwrap_or(begin_at_zero_default),
        min: ticks.and_then(|t| num_at(t, &["min"])),
        max: ticks.and_then(|t| num_at(t, &["max"])),
    }
}

fn scale_display(scene: &Scene<'_>) -> bool {
    lookup(scene.options, &["scale", "display"])
        .and_then(Value::as_bool)
        .unwrap_or(true)
}

/// Equal-angle wedges whose radius follows the value.
pub(super) fn draw_polar_area(
    scene: &mut Scene<'_>,
    spec: &ChartSpec,
    area: Area,
) -> ChartResult<()> {
    let center = area.center();
    let radius = (area.w.min(area.h) / 2.0 - SLICE_BORDER_WIDTH).max(1.0);
    let values = spec
        .data
        .datasets
        .iter()
        .flat_map(|ds| ds.data.iter().filter_map(DataPoint::value));
    let scale = LinearScale::fit(values, radial_bounds(scene, true), 5);

    let Some(dataset) = spec.data.datasets.first() else {
        return Ok(());
    };
    let count = dataset.data.len().max(1);
    let sweep = TAU / count as f32;

    let mut label_spots = Vec::new();
    for (i, point) in dataset.data.iter().enumerate() {
        let Some(value) = point.value() else {
            continue;
        };
        let r = radius * scale.fraction(value).clamp(0.0, 1.0) as f32;
        if r <= 0.0 {
            continue;
        }
        let start = -FRAC_PI_2 + sweep * i as f32;
        let d = ring_slice(center, r, 0.0, start, start + sweep);
        scene
            .canvas
            .path(d.as_str(), fill_color(spec, 0, i), Some(slice_border(spec, 0, i)));
        label_spots.push((polar(center.0, center.1, r / 2.0, start + sweep / 2.0), value));
    }

    if scale_display(scene) {
        draw_rings(scene, center, radius, &scale);
    }
    for ((x, y), value) in label_spots {
        scene.data_label(x, y, value);
    }
    Ok(())
}

fn draw_rings(scene: &mut Scene<'_>, center: (f32, f32), radius: f32, scale: &LinearScale) {
    let grid = scene.style.grid_color.clone();
    let size = scene.style.font_size * 0.85;
    for tick in scale.ticks() {
        let r = radius * scale.fraction(tick) as f32;
        if r <= 0.0 {
            continue;
        }
        scene.canvas.circle(center.0, center.1, r, "none", Some((grid.as_str(), 1.0)));
        scene.text(center.0, center.1 - r + size, &format_tick(tick), size, Anchor::Middle);
    }
}

/// Spider chart: one spoke per label, one polygon per dataset.
pub(super) fn draw_radar(scene: &mut Scene<'_>, spec: &ChartSpec, area: Area) -> ChartResult<()> {
    let spokes = spec
        .data
        .datasets
        .iter()
        .map(|ds| ds.data.len())
        .chain(std::iter::once(spec.data.labels.len()))
        .max()
        .unwrap_or(0);
    if spokes == 0 {
        return Ok(());
    }

    let font_size = lookup(scene.options, &["scale", "pointLabels", "fontSize"])
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .unwrap_or(scene.style.font_size);
    let widest = spec
        .data
        .labels
        .iter()
        .map(|label| scene.text_width(label, font_size))
        .fold(0.0f32, f32::max);
    let center = area.center();
    let radius = (area.w / 2.0 - widest - 8.0)
        .min(area.h / 2.0 - font_size * 1.5)
        .max(10.0);

    let values = spec
        .data
        .datasets
        .iter()
        .flat_map(|ds| ds.data.iter().filter_map(DataPoint::value));
    let scale = LinearScale::fit(values, radial_bounds(scene, false), 5);
    let angle_of = |i: usize| -FRAC_PI_2 + TAU * i as f32 / spokes as f32;

    if scale_display(scene) {
        let grid = scene.style.grid_color.clone();
        for tick in scale.ticks() {
            let r = radius * scale.fraction(tick) as f32;
            if r <= 0.0 {
                continue;
            }
            let mut ring = PathData::new();
            for i in 0..spokes {
                let (x, y) = polar(center.0, center.1, r, angle_of(i));
                if i == 0 {
                    ring.move_to(x, y);
                } else {
                    ring.line_to(x, y);
                }
            }
            ring.close();
            scene.canvas.path(ring.as_str(), "none", Some((grid.as_str(), 1.0)));
        }
        for i in 0..spokes {
            let (x, y) = polar(center.0, center.1, radius, angle_of(i));
            scene.canvas.line(center.0, center.1, x, y, &grid, 1.0);
        }
        for (i, label) in spec.data.labels.iter().enumerate().take(spokes) {
            let angle = angle_of(i);
            let (x, y) = polar(center.0, center.1, radius + 6.0, angle);
            let anchor = match angle.cos() {
                c if c > 0.1 => Anchor::Start,
                c if c < -0.1 => Anchor::End,
                _ => Anchor::Middle,
            };
            let y = y + font_size * 0.35 + angle.sin() * font_size * 0.5;
            scene.text(x, y, label, font_size, anchor);
        }
    }

    for (j, dataset) in spec.data.datasets.iter().enumerate() {
        let vertices: Vec<(f32, f32, Option<f64>)> = (0..spokes)
            .map(|i| {
                let value = dataset.data.get(i).and_then(DataPoint::value);
                let fraction = value.map_or(0.0, |v| scale.fraction(v).clamp(0.0, 1.0)) as f32;
                let (x, y) = polar(center.0, center.1, radius * fraction, angle_of(i));
                (x, y, value)
            })
            .collect();

        let mut outline = PathData::new();
        for (i, (x, y, _)) in vertices.iter().enumerate() {
            if i == 0 {
                outline.move_to(*x, *y);
            } else {
                outline.line_to(*x, *y);
            }
        }
        outline.close();
        let width = dataset_number(spec, j, "borderWidth")
            .map(|v| v as f32)
            .unwrap_or(RADAR_LINE_WIDTH);
        scene.canvas.path(
            outline.as_str(),
            fill_color(spec, j, 0),
            Some((stroke_color(spec, j, 0), width)),
        );

        for (i, (x, y, value)) in vertices.into_iter().enumerate() {
            let Some(value) = value else {
                continue;
            };
            scene.canvas.circle(
                x,
                y,
                POINT_RADIUS,
                fill_color(spec, j, i),
                Some((stroke_color(spec, j, i), 1.0)),
            );
            scene.data_label(x, y, value);
        }
    }
    Ok(())
}

/// Single-value ring gauge over `options.domain`.
pub(super) fn draw_gauge(scene: &mut Scene<'_>, spec: &ChartSpec, area: Area) -> ChartResult<()> {
    let value = spec
        .data
        .datasets
        .first()
        .and_then(|ds| ds.data.first())
        .and_then(DataPoint::value)
        .unwrap_or(0.0);
    let domain = lookup(scene.options, &["domain"]).and_then(Value::as_array);
    let low = domain.and_then(|d| d.first()).and_then(Value::as_f64).unwrap_or(0.0);
    let high = domain.and_then(|d| d.get(1)).and_then(Value::as_f64).unwrap_or(100.0);
    let fraction = if high > low {
        ((value - low) / (high - low)).clamp(0.0, 1.0) as f32
    } else {
        0.0
    };

    let center = area.center();
    let outer = (area.w.min(area.h) / 2.0).max(1.0);
    let center_percentage = num_at_map(scene.options, &["centerPercentage"])
        .map(|v| v as f32)
        .unwrap_or(GAUGE_CENTER_PERCENTAGE)
        .clamp(0.0, 100.0);
    let inner = outer * center_percentage / 100.0;

    let track = lookup(scene.options, &["trackColor"])
        .and_then(Value::as_str)
        .unwrap_or(GAUGE_TRACK_COLOR);
    let full = ring_slice(center, outer, inner, -FRAC_PI_2, -FRAC_PI_2 + TAU);
    scene.canvas.path(full.as_str(), track, None);

    if fraction > 0.0 {
        let arc = ring_slice(center, outer, inner, -FRAC_PI_2, -FRAC_PI_2 + TAU * fraction);
        scene.canvas.path(arc.as_str(), fill_color(spec, 0, 0), None);
    }

    let center_area = lookup(scene.options, &["centerArea"]);
    if center_area.and_then(|c| bool_at(c, &["displayText"])) != Some(false) {
        let text = center_area
            .and_then(|c| str_at(c, &["text"]))
            .map(str::to_string)
            .unwrap_or_else(|| format_tick(value));
        let size = center_area
            .and_then(|c| num_at(c, &["fontSize"]))
            .map(|v| v as f32)
            .unwrap_or((inner * 0.5).max(scene.style.font_size));
        let chart_style = scene.style;
        let color = center_area
            .and_then(|c| str_at(c, &["fontColor"]))
            .unwrap_or(chart_style.text_color.as_str());
        let style = TextStyle {
            family: &chart_style.font_family,
            size,
            color,
            bold: false,
            anchor: Anchor::Middle,
        };
        scene.canvas.text(center.0, center.1 + size * 0.35, &text, &style);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_pie_slice_goes_through_centre() {
        let d = ring_slice((50.0, 50.0), 10.0, 0.0, -FRAC_PI_2, 0.0);
        assert_eq!(
            d.as_str(),
            "M50.00,40.00 A10.00,10.00 0 0 1 60.00,50.00 L50.00,50.00 Z"
        );
    }

    #[test]
    fn large_sweep_sets_the_arc_flag() {
        let d = ring_slice((0.0, 0.0), 10.0, 5.0, 0.0, PI * 1.5);
        assert!(d.as_str().contains(" 0 1 1 "));
        assert!(d.as_str().contains(" 0 1 0 "));
    }

    #[test]
    fn full_ring_uses_two_closed_circles() {
        let d = ring_slice((0.0, 0.0), 10.0, 5.0, 0.0, TAU);
        assert_eq!(d.as_str().matches('M').count(), 2);
        assert_eq!(d.as_str().matches('A').count(), 4);
    }
}
