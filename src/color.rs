use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Categorical palette (cluster ids, trend lines)
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| hsl_to_color32((i as f32 / n as f32) * 360.0, 0.75, 0.55))
        .collect()
}

// ---------------------------------------------------------------------------
// Continuous scale (heatmap cells, choropleth fill)
// ---------------------------------------------------------------------------

/// Maps a value range onto a dark-purple → yellow ramp.
#[derive(Debug, Clone, Copy)]
pub struct ColorScale {
    lo: f64,
    hi: f64,
}

impl ColorScale {
    pub fn new(lo: f64, hi: f64) -> Self {
        if lo <= hi {
            Self { lo, hi }
        } else {
            Self { lo: hi, hi: lo }
        }
    }

    /// Scale spanning every finite value yielded by `values`.
    pub fn spanning(values: impl IntoIterator<Item = f64>) -> Self {
        let (lo, hi) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if lo.is_finite() {
            Self::new(lo, hi)
        } else {
            Self::new(0.0, 0.0)
        }
    }

    pub fn color_for(&self, value: f64) -> Color32 {
        let range = self.hi - self.lo;
        let t = if range.abs() < f64::EPSILON {
            0.5
        } else {
            ((value - self.lo) / range).clamp(0.0, 1.0)
        } as f32;
        // 270° (violet) through red to 60° (yellow), brightening as it goes.
        let hue = 270.0 + t * 150.0;
        hsl_to_color32(hue % 360.0, 0.85, 0.25 + 0.4 * t)
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.lo, self.hi)
    }
}

/// Fill for cells and regions with no value.
pub const MISSING: Color32 = Color32::from_gray(60);
