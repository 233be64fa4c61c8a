//! Scenario tests for the population rules
//!
//! Each test sets up a tiny, quiet world (no spawns, no emigration, no
//! food, comfortable temperature) and checks one rule end to end:
//! - Mandatory splitting of an oversized clan
//! - Starvation of a loner
//! - Exposure deaths outside the survival range
//! - Loners banding together into a clan
//! - A one-member clan turning into a loner

use astras::core::types::{SpeciesId, Vec2};
use astras::simulation::DeathCause;
use astras::{SetupParams, Simulation, SimulationConfig, SpeciesConfig, SpeciesTable};

fn species(name: &str, max_clan_members: u32, hp: f32) -> SpeciesConfig {
    let mut config = SpeciesConfig::new(name, max_clan_members, hp);
    config.spawn_chance = 0.0;
    config.feeding_growth_chance = 0.0;
    config.friendly_growth_chance = 0.0;
    config.min_survival_temp = -10.0;
    config.max_survival_temp = 20.0;
    config
}

fn quiet_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.emigration_chance = 0.0;
    config.initial_individuals = (0, 0);
    config.formation_probability = 0.0;
    config
}

fn params(name: &str, count: u32, temperature: f32) -> SetupParams {
    let mut params = SetupParams {
        food_places: 0,
        start_temperature: Some(temperature),
        seed: Some(1234),
        ..SetupParams::default()
    };
    params.population.insert(name.to_string(), count);
    params
}

fn members(sim: &Simulation, species: usize) -> u32 {
    let in_clans = sim.populations()[species].total_members();
    let loners = sim.individuals().iter().filter(|i| i.species == SpeciesId(species)).count() as u32;
    in_clans + loners
}

#[test]
fn test_oversized_clan_splits_in_first_tick() {
    let table = SpeciesTable::new(vec![species("Moss", 6, 20.0)]).unwrap();
    let mut sim = Simulation::with_setup(quiet_config(), &table, &params("Moss", 20, 10.0)).unwrap();
    assert_eq!(sim.clan_count(), 1);
    assert_eq!(sim.populations()[0].clans[0].population, 20);

    sim.step();

    let clans = &sim.populations()[0].clans;
    assert!(clans.len() >= 2, "expected a split, got {} clan(s)", clans.len());
    assert!(clans.iter().all(|c| c.population <= 6));
    assert_eq!(members(&sim, 0), 20);
}

#[test]
fn test_loner_starves_at_threshold() {
    let table = SpeciesTable::new(vec![species("Moss", 6, 20.0)]).unwrap();
    let config = quiet_config();
    let threshold = config.starvation_threshold;
    let mut sim = Simulation::with_setup(config, &table, &params("Moss", 1, 10.0)).unwrap();
    sim.individuals_mut()[0].hunger_timer = threshold - 1;

    let snapshot = sim.step();

    assert!(sim.individuals().is_empty());
    assert_eq!(snapshot.stats.deaths.get(DeathCause::Starvation, "Moss"), 1);
    assert_eq!(snapshot.stats.deaths.get(DeathCause::Temperature, "Moss"), 0);
}

#[test]
fn test_loners_die_of_exposure() {
    let table = SpeciesTable::new(vec![species("Moss", 6, 20.0)]).unwrap();
    // 50 degrees above the survival range
    let mut sim = Simulation::with_setup(quiet_config(), &table, &params("Moss", 5, 70.0)).unwrap();
    assert_eq!(sim.individuals().len(), 5);

    for _ in 0..3 {
        sim.step();
    }

    assert!(sim.individuals().is_empty());
    let stats = sim.final_stats();
    assert_eq!(stats.deaths.get(DeathCause::Temperature, "Moss"), 5);
    assert_eq!(stats.species_counts["Moss"], 0);
}

#[test]
fn test_clan_dies_of_exposure_without_immunity() {
    let table = SpeciesTable::new(vec![species("Moss", 12, 20.0)]).unwrap();
    let mut config = quiet_config();
    config.clan_temp_immunity_chance = 0.0;
    let mut sim = Simulation::with_setup(config, &table, &params("Moss", 12, 70.0)).unwrap();
    assert_eq!(sim.clan_count(), 1);

    for _ in 0..60 {
        sim.step();
    }

    assert_eq!(members(&sim, 0), 0);
    assert_eq!(sim.stats().deaths.get(DeathCause::Temperature, "Moss"), 12);
}

#[test]
fn test_nearby_loners_form_a_clan() {
    let table = SpeciesTable::new(vec![species("Moss", 6, 20.0)]).unwrap();
    let mut config = quiet_config();
    config.formation_probability = 1.0;
    config.individual_heading_change_chance = 0.0;
    let mut sim = Simulation::with_setup(config, &table, &params("Moss", 2, 10.0)).unwrap();
    for (i, ind) in sim.individuals_mut().iter_mut().enumerate() {
        ind.position = Vec2::new(600.0 + 10.0 * i as f32, 300.0);
        ind.velocity = Vec2::default();
    }

    let snapshot = sim.step();

    assert!(snapshot.individuals.is_empty());
    assert_eq!(snapshot.clan_count(), 1);
    assert_eq!(snapshot.species[0].clans[0].population, 2);
    let (x, y, _) = snapshot.clan_positions()[0];
    assert!((x - 605.0).abs() < 1e-3 && (y - 300.0).abs() < 1e-3);
}

#[test]
fn test_last_clan_member_becomes_a_loner() {
    let table = SpeciesTable::new(vec![species("Moss", 6, 20.0)]).unwrap();
    let mut config = quiet_config();
    config.start_population_threshold = 1;
    config.clan_temp_immunity_chance = 0.0;
    let mut sim = Simulation::with_setup(config, &table, &params("Moss", 2, 70.0)).unwrap();
    assert_eq!(sim.clan_count(), 1);

    // 12 damage per tick against 20 hp members: one dies on the second tick
    sim.step();
    assert_eq!(sim.populations()[0].clans[0].population, 2);
    sim.step();

    assert_eq!(sim.clan_count(), 0);
    assert_eq!(sim.individuals().len(), 1);
    let loner = &sim.individuals()[0];
    assert_eq!(loner.species, SpeciesId(0));
    assert_eq!(loner.hp, 20.0);
    assert_eq!(sim.stats().deaths.get(DeathCause::Temperature, "Moss"), 1);
}
