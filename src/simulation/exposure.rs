//! Temperature and starvation damage
//!
//! Individuals take exposure damage straight to hp and die of starvation
//! past the threshold. Clans roll a half-cycle immunity and otherwise take
//! exposure damage through the same accumulator as combat.

use rand::Rng;

use crate::core::config::SimulationConfig;
use crate::core::types::{ClanId, SpeciesId};
use crate::entity::Individual;
use crate::rules::SpeciesTable;
use crate::simulation::events::{Chronicle, LogEvent};
use crate::simulation::population::SpeciesPopulation;
use crate::simulation::stats::DeathCause;

fn stepped_damage(excess: f32, base: f32, per_step: f32, range: (f32, f32), step: f32) -> f32 {
    if excess <= 0.0 {
        return 0.0;
    }
    let steps = (excess / step.max(f32::EPSILON)).floor();
    (base + steps * per_step).clamp(range.0, range.1)
}

/// Exposure damage for an individual `excess` degrees outside its range
pub fn individual_temperature_damage(excess: f32, config: &SimulationConfig) -> f32 {
    stepped_damage(
        excess,
        config.individual_temp_damage_base,
        config.individual_temp_damage_per_step,
        config.individual_temp_damage_range,
        config.temperature_degree_step,
    )
}

/// Exposure damage for a clan `excess` degrees outside its range
pub fn clan_temperature_damage(excess: f32, config: &SimulationConfig) -> f32 {
    stepped_damage(
        excess,
        config.clan_temp_damage_base,
        config.clan_temp_damage_per_step,
        config.clan_temp_damage_range,
        config.temperature_degree_step,
    )
}

/// Apply exposure and starvation to individuals, removing the dead
///
/// A death is counted once, as exposure when the temperature killed it and
/// as starvation otherwise. Returns how many individuals died.
pub fn apply_to_individuals(
    individuals: &mut Vec<Individual>,
    species: &SpeciesTable,
    temperature: f32,
    config: &SimulationConfig,
    chronicle: &mut Chronicle,
) -> usize {
    let before = individuals.len();
    individuals.retain_mut(|ind| {
        let Some(kind) = species.get(ind.species) else {
            return true;
        };
        let damage = individual_temperature_damage(kind.temperature_excess(temperature), config);
        if damage > 0.0 {
            ind.hp -= damage;
            if !ind.is_alive() {
                chronicle.record_deaths(DeathCause::Temperature, &kind.name, 1);
                chronicle.record(LogEvent::Exposure {
                    species: kind.name.clone(),
                    clan: None,
                    deaths: 1,
                    temperature,
                });
                return false;
            }
        }
        if ind.hunger_timer >= config.starvation_threshold {
            chronicle.record_deaths(DeathCause::Starvation, &kind.name, 1);
            chronicle.record(LogEvent::Starvation { species: kind.name.clone(), clan: None, deaths: 1 });
            return false;
        }
        true
    });
    before - individuals.len()
}

/// Apply exposure to every clan, returns clans left with a single member
pub fn apply_to_clans<R: Rng + ?Sized>(
    populations: &mut [SpeciesPopulation],
    species: &SpeciesTable,
    temperature: f32,
    is_day: bool,
    config: &SimulationConfig,
    chronicle: &mut Chronicle,
    rng: &mut R,
) -> Vec<(SpeciesId, ClanId)> {
    let mut singletons = Vec::new();
    for population in populations.iter_mut() {
        let Some(kind) = species.get(population.id) else {
            continue;
        };
        let damage = clan_temperature_damage(kind.temperature_excess(temperature), config);
        if damage <= 0.0 {
            continue;
        }
        for clan in population.clans.iter_mut().filter(|c| !c.is_empty()) {
            clan.refresh_immunity(is_day, config.clan_temp_immunity_chance, rng);
            if clan.temperature_immune {
                continue;
            }
            let deaths = clan.take_damage(damage);
            if deaths == 0 {
                continue;
            }
            chronicle.record_deaths(DeathCause::Temperature, &kind.name, deaths);
            chronicle.record(LogEvent::Exposure {
                species: kind.name.clone(),
                clan: Some(clan.id),
                deaths,
                temperature,
            });
            if clan.population == 1 {
                singletons.push((population.id, clan.id));
            }
        }
    }
    singletons
}
