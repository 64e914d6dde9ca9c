/// Linear value axis with "nice" tick steps.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearScale {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScaleBounds {
    pub begin_at_zero: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl LinearScale {
    /// Fit a scale around `values`, aiming for at most `max_ticks` steps.
    pub fn fit(values: impl IntoIterator<Item = f64>, bounds: ScaleBounds, max_ticks: usize) -> Self {
        let (mut lo, mut hi) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

        if !lo.is_finite() {
            lo = 0.0;
            hi = 1.0;
        }
        if bounds.begin_at_zero {
            lo = lo.min(0.0);
            hi = hi.max(0.0);
        }
        if let Some(min) = bounds.min.filter(|v| v.is_finite()) {
            lo = min;
        }
        if let Some(max) = bounds.max.filter(|v| v.is_finite()) {
            hi = max;
        }
        if hi < lo {
            std::mem::swap(&mut lo, &mut hi);
        }
        if hi == lo {
            if lo == 0.0 {
                hi = 1.0;
            } else {
                let pad = lo.abs() * 0.05;
                lo -= pad;
                hi += pad;
            }
        }

        let step = nice_step((hi - lo) / max_ticks.max(1) as f64);
        let min = if bounds.min.is_some() { lo } else { (lo / step).floor() * step };
        let max = if bounds.max.is_some() { hi } else { (hi / step).ceil() * step };
        Self { min, max, step }
    }

    /// Tick values from `min` to `max` inclusive.
    pub fn ticks(&self) -> Vec<f64> {
        let mut ticks = Vec::new();
        let mut value = self.min;
        let limit = self.max + self.step * 1e-6;
        while value <= limit && ticks.len() < 1000 {
            ticks.push(value);
            value = (value + self.step).max(value + f64::EPSILON);
            // snap away accumulated float noise
            value = (value / self.step).round() * self.step;
        }
        ticks
    }

    /// Position of `value` in `0.0..=1.0` (unclamped).
    pub fn fraction(&self, value: f64) -> f64 {
        if self.max == self.min {
            0.0
        } else {
            (value - self.min) / (self.max - self.min)
        }
    }
}

fn nice_step(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 1.0;
    }
    let exponent = raw.log10().floor();
    let magnitude = 10f64.powf(exponent);
    let fraction = raw / magnitude;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Tick label without trailing float noise.
pub fn format_tick(value: f64) -> String {
    let rounded = (value * 1e6).round() / 1e6;
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_based_scale_covers_values() {
        let scale = LinearScale::fit(
            [3.0, 47.0],
            ScaleBounds {
                begin_at_zero: true,
                ..Default::default()
            },
            5,
        );
        assert_eq!(scale.min, 0.0);
        assert_eq!(scale.max, 50.0);
        assert_eq!(scale.ticks(), vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0]);
    }

    #[test]
    fn explicit_bounds_win() {
        let scale = LinearScale::fit(
            [3.0, 47.0],
            ScaleBounds {
                begin_at_zero: true,
                min: Some(-10.0),
                max: Some(100.0),
            },
            5,
        );
        assert_eq!((scale.min, scale.max), (-10.0, 100.0));
    }

    #[test]
    fn flat_data_still_has_range() {
        let scale = LinearScale::fit([5.0, 5.0], ScaleBounds::default(), 5);
        assert!(scale.max > scale.min);
        let empty = LinearScale::fit(std::iter::empty(), ScaleBounds::default(), 5);
        assert!(empty.max > empty.min);
    }

    #[test]
    fn ticks_format_cleanly() {
        assert_eq!(format_tick(0.30000000000000004), "0.3");
        assert_eq!(format_tick(20.0), "20");
        assert_eq!(format_tick(-2.5), "-2.5");
    }
}
