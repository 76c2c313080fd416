//! Hex color parsing and the two perceptual measures the encoder relies on.

/// An sRGB color parsed from `#RRGGBB` or `#RGB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn parse(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.is_ascii() {
            return None;
        }
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return None,
        };

        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    /// Relative luminance (0.299R + 0.587G + 0.114B) scaled to [0, 1].
    pub fn luminance(&self) -> f64 {
        (0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64) / 255.0
    }

    pub fn is_light(&self) -> bool {
        self.luminance() > 0.5
    }

    /// (max - min) / max over the channels; black has zero saturation.
    pub fn saturation(&self) -> f64 {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        if max == 0 {
            return 0.0;
        }
        (max - min) as f64 / max as f64
    }

    pub fn is_highly_saturated(&self) -> bool {
        self.saturation() > 0.8
    }

    pub fn is_white(&self) -> bool {
        self.r == 0xFF && self.g == 0xFF && self.b == 0xFF
    }

    pub fn is_black(&self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Canonical uppercase `#RRGGBB` form; unparseable values are upper-cased
/// and trimmed so comparisons stay deterministic.
pub fn normalize_hex(hex: &str) -> String {
    match Rgb::parse(hex) {
        Some(rgb) => rgb.to_hex(),
        None => hex.trim().to_uppercase(),
    }
}
