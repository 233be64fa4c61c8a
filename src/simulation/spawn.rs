//! Random placement and per-tick spawn rolls

use rand::Rng;

use crate::core::config::SimulationConfig;
use crate::core::types::{SpeciesId, Vec2};
use crate::rules::SpeciesTable;

/// Uniform position at least `padding` away from every map edge
pub fn random_position<R: Rng + ?Sized>(rng: &mut R, config: &SimulationConfig, padding: f32) -> Vec2 {
    let axis = |rng: &mut R, extent: f32| {
        let hi = extent - padding;
        if hi > padding {
            rng.gen_range(padding..hi)
        } else {
            extent / 2.0
        }
    };
    let x = axis(rng, config.map_width);
    let y = axis(rng, config.map_height);
    Vec2::new(x, y)
}

/// Roll each living species' spawn chance
///
/// `alive[i]` is the current member count of species `i`; extinct species
/// never respawn. Returns the species that spawn this tick with their count.
pub fn roll_spawns<R: Rng + ?Sized>(
    species: &SpeciesTable,
    alive: &[u32],
    config: &SimulationConfig,
    rng: &mut R,
) -> Vec<(SpeciesId, u32)> {
    let mut spawns = Vec::new();
    for (id, kind) in species.iter() {
        if alive.get(id.0).copied().unwrap_or(0) == 0 || config.spawn_count == 0 {
            continue;
        }
        if rng.gen::<f32>() < kind.spawn_chance {
            spawns.push((id, config.spawn_count));
        }
    }
    spawns
}
