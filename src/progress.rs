use std::collections::HashMap;

use crate::world::{BiomeConfig, LevelStatus, find_level_mut, levels};

/// Where per-level unlock state lives between sessions.
pub trait ProgressStore {
    fn load_progress(&self, level_id: u32) -> Option<LevelStatus>;
    fn save_progress(&mut self, level_id: u32, status: LevelStatus);
}

/// Local-only progress, used for samples and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryProgress {
    statuses: HashMap<u32, LevelStatus>,
}

impl MemoryProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryProgress {
    fn load_progress(&self, level_id: u32) -> Option<LevelStatus> {
        self.statuses.get(&level_id).copied()
    }

    fn save_progress(&mut self, level_id: u32, status: LevelStatus) {
        self.statuses.insert(level_id, status);
    }
}

/// Overwrites generated statuses with anything the store remembers.
pub fn apply_progress<S: ProgressStore + ?Sized>(world: &mut [BiomeConfig], store: &S) {
    for biome in world.iter_mut() {
        for level in biome.levels.iter_mut() {
            if let Some(status) = store.load_progress(level.id) {
                level.status = status;
            }
        }
    }
}

/// Marks `level_id` completed and unlocks the level after it.
///
/// Returns `false` when the id is not on the map.
pub fn complete_level<S: ProgressStore + ?Sized>(
    world: &mut [BiomeConfig],
    store: &mut S,
    level_id: u32,
) -> bool {
    let Some(level) = find_level_mut(world, level_id) else {
        log::warn!("ignoring completion for unknown level {}", level_id);
        return false;
    };
    level.status = LevelStatus::Completed;
    store.save_progress(level_id, LevelStatus::Completed);

    let next_id = levels(world)
        .map(|level| level.id)
        .find(|id| *id > level_id);

    if let Some(next_id) = next_id {
        if let Some(next) = find_level_mut(world, next_id) {
            if next.status == LevelStatus::Locked {
                next.status = LevelStatus::Active;
                store.save_progress(next_id, LevelStatus::Active);
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{WorldConfig, find_level, generate_world};

    fn status(world: &[BiomeConfig], id: u32) -> Option<LevelStatus> {
        find_level(world, id).map(|level| level.status)
    }

    #[test]
    fn completing_unlocks_the_next_level() {
        let mut world = generate_world(&WorldConfig::default());
        let mut store = MemoryProgress::new();

        assert!(complete_level(&mut world, &mut store, 1));

        assert_eq!(status(&world, 1), Some(LevelStatus::Completed));
        assert_eq!(status(&world, 2), Some(LevelStatus::Active));
        assert_eq!(status(&world, 3), Some(LevelStatus::Locked));
        assert_eq!(store.load_progress(2), Some(LevelStatus::Active));
    }

    #[test]
    fn completing_across_a_biome_boundary() {
        let mut world = generate_world(&WorldConfig::default());
        let mut store = MemoryProgress::new();

        complete_level(&mut world, &mut store, 30);
        assert_eq!(status(&world, 31), Some(LevelStatus::Active));
    }

    #[test]
    fn completing_does_not_relock_finished_levels() {
        let mut world = generate_world(&WorldConfig::default());
        let mut store = MemoryProgress::new();

        complete_level(&mut world, &mut store, 2);
        complete_level(&mut world, &mut store, 1);

        assert_eq!(status(&world, 2), Some(LevelStatus::Completed));
    }

    #[test]
    fn unknown_level_is_ignored() {
        let mut world = generate_world(&WorldConfig::default());
        let mut store = MemoryProgress::new();

        assert!(!complete_level(&mut world, &mut store, 10_000));
        assert_eq!(store, MemoryProgress::new());
    }

    #[test]
    fn stored_progress_is_reapplied_to_a_fresh_world() {
        let mut store = MemoryProgress::new();
        store.save_progress(1, LevelStatus::Completed);
        store.save_progress(2, LevelStatus::Active);

        let mut world = generate_world(&WorldConfig::default());
        apply_progress(&mut world, &store);

        assert_eq!(status(&world, 1), Some(LevelStatus::Completed));
        assert_eq!(status(&world, 2), Some(LevelStatus::Active));
        assert_eq!(status(&world, 3), Some(LevelStatus::Locked));
    }
}
