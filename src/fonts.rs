use std::num::NonZeroUsize;
use std::sync::Arc;

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, Weight};
use lru::LruCache;
use parking_lot::Mutex;

#[derive(Hash, PartialEq, Eq, Clone)]
struct MeasureKey {
    text: String,
    font_size_bits: u32,
    is_bold: bool,
}

pub trait TextMeasure {
    /// Width and height of `text` laid out on one line.
    fn measure_text(&mut self, text: &str, font_size: f32, is_bold: bool) -> (f32, f32);
}

pub struct CosmicTextMeasure {
    font_system: FontSystem,
    cache: LruCache<MeasureKey, (f32, f32)>,
}

impl CosmicTextMeasure {
    pub fn new(cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            font_system: FontSystem::new(),
            cache: LruCache::new(capacity),
        }
    }

    /// A measure that can sit in shared server state.
    pub fn shared(cache_capacity: usize) -> SharedMeasure {
        SharedMeasure(Arc::new(Mutex::new(Self::new(cache_capacity))))
    }
}

impl TextMeasure for CosmicTextMeasure {
    fn measure_text(&mut self, text: &str, font_size: f32, is_bold: bool) -> (f32, f32) {
        let key = MeasureKey {
            text: text.to_string(),
            font_size_bits: font_size.to_bits(),
            is_bold,
        };

        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }

        let line_height = font_size * 1.2;
        let mut buffer = Buffer::new(
            &mut self.font_system,
            Metrics {
                font_size,
                line_height,
            },
        );
        buffer.set_size(&mut self.font_system, None, None);

        let attrs = Attrs::new().family(Family::SansSerif).weight(if is_bold {
            Weight::BOLD
        } else {
            Weight::NORMAL
        });
        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);

        let mut total_width: f32 = 0.0;
        let mut total_height: f32 = 0.0;
        for run in buffer.layout_runs() {
            total_width = total_width.max(run.line_w);
            total_height += run.line_height;
        }
        if total_height == 0.0 {
            total_height = line_height;
        }

        let measured = (total_width, total_height);
        self.cache.put(key, measured);
        measured
    }
}

/// Font system shared between requests. Only the measurement memo lives
/// behind the lock, so results never depend on what ran before.
#[derive(Clone)]
pub struct SharedMeasure(Arc<Mutex<CosmicTextMeasure>>);

impl TextMeasure for SharedMeasure {
    fn measure_text(&mut self, text: &str, font_size: f32, is_bold: bool) -> (f32, f32) {
        self.0.lock().measure_text(text, font_size, is_bold)
    }
}

/// Width estimate from character count. Needs no fonts.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharCountMeasure;

impl TextMeasure for CharCountMeasure {
    fn measure_text(&mut self, text: &str, font_size: f32, is_bold: bool) -> (f32, f32) {
        let advance = if is_bold { 0.62 } else { 0.55 };
        let width = text.chars().count() as f32 * font_size * advance;
        (width, font_size * 1.2)
    }
}
