use std::fmt;

use crate::emotion::{ColorSample, EmotionConfig, RankedEmotions};

/// Last level of the first biome; it is painted black.
const FINAL_SPECTRUM_LEVEL: u32 = 30;

/// An sRGB color with channels in `0.0..=255.0`.
///
/// Channels are floating point so that averaged swatches keep their precision until
/// they are converted to HSL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// HSL with hue in degrees and saturation/lightness in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` (the leading `#` is optional). Anything else yields black,
    /// which is what a color input reports before the user picks a value.
    pub fn from_hex(hex: &str) -> Self {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return Self::BLACK;
        }

        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16);

        match (channel(0..2), channel(2..4), channel(4..6)) {
            (Ok(r), Ok(g), Ok(b)) => Self::new(f64::from(r), f64::from(g), f64::from(b)),
            _ => Self::BLACK,
        }
    }

    pub fn to_hex(&self) -> String {
        let component = |value: f64| value.round().clamp(0.0, 255.0) as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            component(self.r),
            component(self.g),
            component(self.b)
        )
    }

    /// Channel-wise average of two swatches.
    pub fn mix(&self, other: &Rgb) -> Rgb {
        Rgb::new(
            (self.r + other.r) / 2.0,
            (self.g + other.g) / 2.0,
            (self.b + other.b) / 2.0,
        )
    }

    pub fn to_hsl(&self) -> Hsl {
        let r = self.r / 255.0;
        let g = self.g / 255.0;
        let b = self.b / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;

        if max == min {
            return Hsl {
                h: 0.0,
                s: 0.0,
                l: l * 100.0,
            };
        }

        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };

        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };

        Hsl {
            h: h / 6.0 * 360.0,
            s: s * 100.0,
            l: l * 100.0,
        }
    }

    pub fn to_sample(&self) -> ColorSample {
        let hsl = self.to_hsl();
        ColorSample::new(hsl.h, hsl.l)
    }
}

/// The color a level node is painted with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelColor {
    Hex(Rgb),
    Hsl(Hsl),
}

impl LevelColor {
    /// Hue and lightness used to pick the level's emotion.
    pub fn sample(&self) -> ColorSample {
        match self {
            Self::Hex(rgb) => rgb.to_sample(),
            Self::Hsl(hsl) => ColorSample::new(hsl.h, hsl.l),
        }
    }
}

impl fmt::Display for LevelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hex(rgb) => write!(f, "{}", rgb.to_hex()),
            Self::Hsl(hsl) => write!(f, "hsl({}, {}%, {}%)", hsl.h, hsl.s, hsl.l),
        }
    }
}

fn spectrum_step(level_id: u32) -> f64 {
    f64::from(level_id - 2) / f64::from(FINAL_SPECTRUM_LEVEL - 1 - 2)
}

/// Color for a level: white for the first, black for the thirtieth, and a rainbow that
/// darkens from 90% to 20% lightness in between. Later levels use a neutral grey.
pub fn level_color(level_id: u32) -> LevelColor {
    match level_id {
        1 => LevelColor::Hex(Rgb::new(255.0, 255.0, 255.0)),
        FINAL_SPECTRUM_LEVEL => LevelColor::Hex(Rgb::BLACK),
        2..FINAL_SPECTRUM_LEVEL => {
            let step = spectrum_step(level_id);
            LevelColor::Hsl(Hsl {
                h: (step * 360.0).floor(),
                s: 90.0,
                l: 90.0 - step * 70.0,
            })
        }
        _ => LevelColor::Hex(Rgb::new(204.0, 204.0, 204.0)),
    }
}

/// Hue shown in the level intro. Spans red to magenta so the ends do not repeat.
pub fn level_hue(level_id: u32) -> f64 {
    match level_id {
        2..FINAL_SPECTRUM_LEVEL => (spectrum_step(level_id) * 300.0).floor(),
        _ => 0.0,
    }
}

/// The emotion a level trains, derived from its color.
pub fn level_emotion<'a>(
    level_id: u32,
    ranked: &'a RankedEmotions,
    config: &EmotionConfig,
) -> &'a str {
    ranked.lookup_with(level_color(level_id).sample(), config)
}
