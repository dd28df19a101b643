use std::fs;
use std::path::Path;

use crate::error::ConfigurationError;

const BUNDLED_RANKED_LIST: &str = include_str!("../data/emotions.json");

/// How hue values outside `[0, 360)` are folded back onto the color wheel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HueWrap {
    /// Absolute value of the truncated remainder. `-10` becomes `10`, not `350`.
    #[default]
    Mirror,
    /// True modulo. `-10` becomes `350`.
    Euclidean,
}

impl HueWrap {
    pub fn apply(self, hue: f64) -> f64 {
        if !hue.is_finite() {
            return 0.0;
        }

        match self {
            Self::Mirror => (hue % 360.0).abs(),
            Self::Euclidean => hue.rem_euclid(360.0),
        }
    }
}

/// Tuning for the color to emotion lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// Maximum distance, in list positions, that hue can move the lookup away from the
    /// lightness-derived base index.
    pub window: u32,
    pub hue_wrap: HueWrap,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            window: 15,
            hue_wrap: HueWrap::Mirror,
        }
    }
}

/// A color picked by the user, in HSL terms.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ColorSample {
    /// Degrees. Any value is accepted and wrapped.
    pub hue: f64,
    /// Percent. Any value is accepted and clamped into `[0, 100]`.
    pub lightness: f64,
}

impl ColorSample {
    pub fn new(hue: f64, lightness: f64) -> Self {
        Self { hue, lightness }
    }
}

/// Emotion labels ordered from most calm (index 0) to most distressed (last index).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RankedEmotions {
    labels: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
struct RankedFile {
    ranked: Vec<String>,
}

impl RankedEmotions {
    pub fn new(labels: Vec<String>) -> Result<Self, ConfigurationError> {
        if labels.is_empty() {
            return Err(ConfigurationError::EmptyRankedList);
        }

        Ok(Self { labels })
    }

    /// The list shipped with the crate.
    pub fn bundled() -> Result<Self, ConfigurationError> {
        Self::from_json("bundled emotions.json", BUNDLED_RANKED_LIST)
    }

    /// Parses a `{"ranked": [...]}` document. `source` is only used in error messages.
    pub fn from_json(source: &str, json: &str) -> Result<Self, ConfigurationError> {
        let parsed: RankedFile =
            serde_json::from_str(json).map_err(|error| ConfigurationError::ParseError {
                path: source.to_string(),
                source: error,
            })?;

        let ranked = Self::new(parsed.ranked)?;
        log::debug!("loaded {} ranked emotions from {}", ranked.len(), source);
        Ok(ranked)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigurationError::ReadError {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json(&path.display().to_string(), &data)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false for a constructed list.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|candidate| candidate == label)
    }

    /// Looks up a label with the default configuration.
    pub fn lookup(&self, sample: ColorSample) -> &str {
        self.lookup_with(sample, &EmotionConfig::default())
    }

    pub fn lookup_with(&self, sample: ColorSample, config: &EmotionConfig) -> &str {
        &self.labels[self.lookup_index(sample, config)]
    }

    pub fn lookup_index(&self, sample: ColorSample, config: &EmotionConfig) -> usize {
        emotion_index(sample, self.labels.len(), config)
    }

    /// Thins a longer list down to `target` labels.
    ///
    /// The first and last labels always survive; the middle is sampled at evenly spaced
    /// positions. Lists that already fit, or targets below 2, are returned unchanged.
    pub fn resample(&self, target: usize) -> Self {
        let len = self.labels.len();
        if len <= target || target < 2 {
            return self.clone();
        }

        let available_middle = len - 2;
        let needed_middle = target - 2;
        let mut labels = Vec::with_capacity(target);
        labels.push(self.labels[0].clone());

        for i in 0..needed_middle {
            let percent = if needed_middle > 1 {
                i as f64 / (needed_middle - 1) as f64
            } else {
                0.0
            };
            let original = 1 + (percent * (available_middle - 1) as f64).floor() as usize;
            labels.push(self.labels[original].clone());
        }

        labels.push(self.labels[len - 1].clone());

        Self { labels }
    }
}

/// Maps a color sample onto a position in a ranked list of `len` labels.
///
/// Lightness picks the base position (white is the top of the list, black the bottom) and
/// hue nudges it by up to `config.window` positions along a sine wave. The result is always
/// a valid index for a non-empty list.
pub fn emotion_index(sample: ColorSample, len: usize, config: &EmotionConfig) -> usize {
    if len == 0 {
        return 0;
    }

    let hue = config.hue_wrap.apply(sample.hue);
    let lightness = if sample.lightness.is_nan() {
        0.0
    } else {
        sample.lightness.clamp(0.0, 100.0)
    };

    let inverted = 100.0 - lightness;
    let base = ((inverted / 100.0) * len as f64).floor() as i64;
    let jitter = (hue.to_radians().sin() * f64::from(config.window)).floor() as i64;

    (base + jitter).clamp(0, len as i64 - 1) as usize
}
