//! Journey map layout: biome sections and the level nodes that wind through them.

use std::fmt;

/// Themed section of the journey map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiomeKind {
    Beach,
    Grass,
    Swamp,
    Mushroom,
    Desert,
    City,
    Mountain,
    Ice,
    Cave,
    Fire,
    Moon,
    Mars,
    Space,
}

impl BiomeKind {
    /// Order in which biomes appear from the top of the map to the bottom.
    pub const SEQUENCE: [BiomeKind; 13] = [
        BiomeKind::Beach,
        BiomeKind::Grass,
        BiomeKind::Swamp,
        BiomeKind::Mushroom,
        BiomeKind::Desert,
        BiomeKind::City,
        BiomeKind::Mountain,
        BiomeKind::Ice,
        BiomeKind::Cave,
        BiomeKind::Fire,
        BiomeKind::Moon,
        BiomeKind::Mars,
        BiomeKind::Space,
    ];

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Beach => "beach",
            Self::Grass => "grass",
            Self::Swamp => "swamp",
            Self::Mushroom => "mushroom",
            Self::Desert => "desert",
            Self::City => "city",
            Self::Mountain => "mountain",
            Self::Ice => "ice",
            Self::Cave => "cave",
            Self::Fire => "fire",
            Self::Moon => "moon",
            Self::Mars => "mars",
            Self::Space => "space",
        }
    }
}

impl fmt::Display for BiomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_class())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelStatus {
    Locked,
    Active,
    Completed,
}

/// One node on the map.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Level {
    /// Unique across the whole world, starting at 1.
    pub id: u32,
    /// Horizontal position in percent of the map width.
    pub x: f64,
    /// Vertical position in percent of the biome height.
    pub y: f64,
    pub status: LevelStatus,
}

impl Level {
    /// Locked nodes cannot be launched.
    pub fn is_playable(&self) -> bool {
        self.status != LevelStatus::Locked
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BiomeConfig {
    #[serde(rename = "type")]
    pub kind: BiomeKind,
    /// Pixels.
    pub height: f64,
    pub css_class: String,
    pub levels: Vec<Level>,
}

/// Default status handed out by the generator before any progress is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockPolicy {
    /// Level 1 is active, everything else is locked.
    #[default]
    FirstActive,
    /// Every level is active. Used for previews.
    AllActive,
}

impl UnlockPolicy {
    fn status_for(self, level_id: u32) -> LevelStatus {
        match self {
            Self::AllActive => LevelStatus::Active,
            Self::FirstActive if level_id == 1 => LevelStatus::Active,
            Self::FirstActive => LevelStatus::Locked,
        }
    }
}

/// Layout parameters for [`generate_world`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// How many times the biome sequence repeats.
    pub cycles: u32,

    // --- Level counts ---
    /// Levels in the first biome of each cycle.
    pub first_biome_levels: u32,
    /// Levels shared by the remaining biomes of each cycle. Leftovers go to the earliest biomes.
    pub remaining_levels: u32,

    // --- Vertical layout (px) ---
    pub level_spacing_px: f64,
    pub top_padding_px: f64,
    pub bottom_padding_px: f64,

    // --- Winding path ---
    /// Radians advanced per level along the sine path.
    pub wave_frequency: f64,
    /// Swing in percent either side of the center line.
    pub wave_amplitude: f64,
    pub min_x: f64,
    pub max_x: f64,

    pub unlock_policy: UnlockPolicy,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cycles: 1,

            first_biome_levels: 30,
            remaining_levels: 365,

            level_spacing_px: 120.0,
            top_padding_px: 100.0,
            bottom_padding_px: 100.0,

            wave_frequency: 0.5,
            wave_amplitude: 25.0,
            min_x: 10.0,
            max_x: 90.0,

            unlock_policy: UnlockPolicy::FirstActive,
        }
    }
}

impl WorldConfig {
    /// Number of levels the biome at `position` (within one cycle) receives.
    pub fn levels_for(&self, position: usize) -> u32 {
        if position == 0 {
            return self.first_biome_levels;
        }

        let shared = (BiomeKind::SEQUENCE.len() - 1) as u32;
        let base = self.remaining_levels / shared;
        let extra = self.remaining_levels % shared;

        if (position as u32) <= extra {
            base + 1
        } else {
            base
        }
    }

    /// Pixel height that fits `level_count` nodes plus padding.
    pub fn biome_height(&self, level_count: u32) -> f64 {
        f64::from(level_count) * self.level_spacing_px + self.top_padding_px + self.bottom_padding_px
    }

    /// Horizontal band in ascending order. A NaN bound falls back to the default band.
    fn x_band(&self) -> (f64, f64) {
        if self.min_x.is_nan() || self.max_x.is_nan() {
            let defaults = Self::default();
            return (defaults.min_x, defaults.max_x);
        }

        (self.min_x.min(self.max_x), self.min_x.max(self.max_x))
    }

    fn path_x(&self, index: u32) -> f64 {
        let (min_x, max_x) = self.x_band();
        let x = 50.0 + (f64::from(index) * self.wave_frequency).sin() * self.wave_amplitude;
        x.clamp(min_x, max_x)
    }
}

/// Lays out the full journey map.
///
/// Pure and cheap; call it again to rebuild the world from scratch.
pub fn generate_world(config: &WorldConfig) -> Vec<BiomeConfig> {
    let mut world = Vec::with_capacity(BiomeKind::SEQUENCE.len() * config.cycles as usize);
    let mut next_id = 1u32;

    for _ in 0..config.cycles {
        for (position, kind) in BiomeKind::SEQUENCE.iter().copied().enumerate() {
            let count = config.levels_for(position);
            let height = config.biome_height(count);

            let levels = (0..count)
                .map(|index| {
                    let y_px = config.top_padding_px + f64::from(index) * config.level_spacing_px;
                    let id = next_id;
                    next_id += 1;

                    Level {
                        id,
                        x: config.path_x(index),
                        y: y_px / height * 100.0,
                        status: config.unlock_policy.status_for(id),
                    }
                })
                .collect();

            world.push(BiomeConfig {
                kind,
                height,
                css_class: kind.css_class().to_string(),
                levels,
            });
        }
    }

    log::debug!(
        "generated world with {} biomes and {} levels",
        world.len(),
        next_id - 1
    );

    world
}

pub fn level_count(world: &[BiomeConfig]) -> usize {
    world.iter().map(|biome| biome.levels.len()).sum()
}

pub fn levels(world: &[BiomeConfig]) -> impl Iterator<Item = &Level> {
    world.iter().flat_map(|biome| biome.levels.iter())
}

/// The lowest-numbered level that is unlocked but not yet completed.
pub fn frontier(world: &[BiomeConfig]) -> Option<&Level> {
    levels(world).find(|level| level.status == LevelStatus::Active)
}

pub fn find_level(world: &[BiomeConfig], id: u32) -> Option<&Level> {
    levels(world).find(|level| level.id == id)
}

pub fn find_level_mut(world: &mut [BiomeConfig], id: u32) -> Option<&mut Level> {
    world
        .iter_mut()
        .flat_map(|biome| biome.levels.iter_mut())
        .find(|level| level.id == id)
}
