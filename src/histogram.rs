//! Frequency counts rendered as a one-line block-glyph sparkline.

const GLYPHS: [char; 9] = ['_', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Bucketed frequency counts of a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub low: f64,
    pub width: f64,
    pub counts: Vec<usize>,
}

/// Sorts `values` into `slots` equally wide buckets spanning
/// `floor(min)..ceil(max)`. The maximum lands in the last bucket.
pub fn histogram(values: &[f64], slots: usize) -> Histogram {
    let slots = slots.max(1);
    let mut counts = vec![0; slots];

    if values.is_empty() {
        return Histogram {
            low: 0.0,
            width: 1.0 / slots as f64,
            counts,
        };
    }

    let low = values.iter().copied().fold(f64::INFINITY, f64::min).floor();
    let high = values
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max)
        .ceil();
    let width = match (high - low) / slots as f64 {
        w if w > 0.0 => w,
        _ => 1.0 / slots as f64,
    };

    for value in values {
        let slot = ((value - low) / width) as usize;
        counts[slot.min(slots - 1)] += 1;
    }

    Histogram { low, width, counts }
}

impl Histogram {
    /// One glyph per bucket, scaled against the fullest bucket.
    pub fn plot(&self) -> String {
        let max = self.counts.iter().copied().max().unwrap_or(0);
        let top = (GLYPHS.len() - 1) as f64;

        self.counts
            .iter()
            .map(|&count| match max {
                0 => GLYPHS[0],
                _ => GLYPHS[(top * count as f64 / max as f64).round() as usize],
            })
            .collect()
    }

    pub fn high(&self) -> f64 {
        self.low + self.width * self.counts.len() as f64
    }
}
