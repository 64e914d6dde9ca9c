/// One base color plus the order its channels darken in.
#[derive(Debug, Clone, Copy)]
struct BaseColor {
    rgb: [i32; 3],
    priority: [usize; 3],
}

const BASE_PALETTE: [BaseColor; 6] = [
    BaseColor { rgb: [244, 196, 149], priority: [0, 1, 2] },
    BaseColor { rgb: [193, 168, 239], priority: [2, 0, 1] },
    BaseColor { rgb: [235, 166, 183], priority: [0, 2, 1] },
    BaseColor { rgb: [255, 205, 86], priority: [0, 1, 2] },
    BaseColor { rgb: [231, 219, 160], priority: [1, 0, 2] },
    BaseColor { rgb: [154, 194, 212], priority: [2, 1, 0] },
];

/// Per-loop subtraction for the first, second and third priority channel.
const DARKEN_STEPS: [i32; 3] = [43, 31, 17];

const LOW_CUTOFF: i32 = 50;
const LOW_LIFT: i32 = 205;
const HIGH_CUTOFF: i32 = 235;
const HIGH_DROP: i32 = 15;

/// Cycles the base palette, darkening each full pass.
///
/// A generator is a plain value: build one per chart and drop it with the
/// chart, so two charts never see each other's position in the cycle.
#[derive(Debug, Clone, Default)]
pub struct ColorGenerator {
    counter: usize,
}

impl ColorGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator positioned at `counter`, as if that many colors were drawn.
    pub fn starting_at(counter: usize) -> Self {
        Self { counter }
    }

    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn next_color(&mut self) -> String {
        let rgb = color_channels(self.counter);
        self.counter += 1;
        format!(
            "#{:02x}{:02x}{:02x}",
            to_byte(rgb[0]),
            to_byte(rgb[1]),
            to_byte(rgb[2])
        )
    }

    pub fn take_colors(&mut self, count: usize) -> Vec<String> {
        (0..count).map(|_| self.next_color()).collect()
    }
}

impl Iterator for ColorGenerator {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        Some(self.next_color())
    }
}

/// Channel values for position `counter`, after darkening and the two-step clamp.
pub fn color_channels(counter: usize) -> [i32; 3] {
    let loop_count = (counter / BASE_PALETTE.len()) as i32;
    let base = BASE_PALETTE[counter % BASE_PALETTE.len()];

    let mut rgb = base.rgb;
    for (channel, step) in base.priority.iter().zip(DARKEN_STEPS) {
        rgb[*channel] -= loop_count.saturating_mul(step);
    }

    // Lift first, then drop: a lifted channel can land above the high cutoff.
    for value in &mut rgb {
        if *value < LOW_CUTOFF {
            *value += LOW_LIFT;
        }
    }
    for value in &mut rgb {
        if *value > HIGH_CUTOFF {
            *value -= HIGH_DROP;
        }
    }
    rgb
}

fn to_byte(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}
