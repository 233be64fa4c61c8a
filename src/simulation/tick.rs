//! Simulation engine: one `step()` per tick
//!
//! A tick runs: spawn rolls, movement, clan lifecycle, environment and
//! exposure, interactions, then bookkeeping (conversions, cleanup, mandatory
//! splits, statistics). Everything is single-threaded and driven by one
//! seedable generator.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::random::gaussian;
use crate::core::types::{ClanId, ClanKey, Color, IndividualId, SpeciesId, Tick, Vec2};
use crate::entity::{Clan, FoodSource, Individual, MoveContext};
use crate::rules::{NativeBoost, SpeciesTable};
use crate::simulation::environment::EnvironmentController;
use crate::simulation::events::{Chronicle, LogEvent};
use crate::simulation::exposure;
use crate::simulation::interaction::InteractionPass;
use crate::simulation::population::{DepartureKind, SpeciesPopulation, SplitRecord};
use crate::simulation::snapshot::{ClanView, FoodView, IndividualView, SpeciesView, WorldSnapshot};
use crate::simulation::spawn::{random_position, roll_spawns};
use crate::simulation::stats::{DeathCause, SimulationStats};
use crate::spatial::SpatialIndex;

/// A food source pinned at setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodPlacement {
    pub x: f32,
    pub y: f32,
    /// Defaults to `SetupParams::food_amount`
    #[serde(default)]
    pub amount: Option<f32>,
}

/// Everything `Simulation::setup` needs besides the species table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupParams {
    /// Requested start population per species name
    pub population: BTreeMap<String, u32>,
    pub food_places: usize,
    pub food_amount: f32,
    /// Fixed base temperature; drawn at random when absent
    pub start_temperature: Option<f32>,
    pub start_is_day: bool,
    /// Name of a region in the species table
    pub region: Option<String>,
    pub food_positions: Vec<FoodPlacement>,
    pub seed: Option<u64>,
}

impl Default for SetupParams {
    fn default() -> Self {
        Self {
            population: BTreeMap::new(),
            food_places: 20,
            food_amount: 100.0,
            start_temperature: None,
            start_is_day: true,
            region: None,
            food_positions: Vec::new(),
            seed: None,
        }
    }
}

impl SetupParams {
    /// Same start population for every species in `table`
    pub fn uniform(table: &SpeciesTable, count: u32) -> Self {
        Self {
            population: table.iter().map(|(_, s)| (s.name.clone(), count)).collect(),
            ..Self::default()
        }
    }
}

/// Speed multipliers set at runtime
#[derive(Debug, Clone)]
struct SpeedSettings {
    individual: f32,
    clan: f32,
    individual_by_species: BTreeMap<SpeciesId, f32>,
    clan_by_species: BTreeMap<SpeciesId, f32>,
}

impl Default for SpeedSettings {
    fn default() -> Self {
        Self {
            individual: 1.0,
            clan: 1.0,
            individual_by_species: BTreeMap::new(),
            clan_by_species: BTreeMap::new(),
        }
    }
}

impl SpeedSettings {
    fn individual(&self, species: SpeciesId) -> f32 {
        self.individual * self.individual_by_species.get(&species).copied().unwrap_or(1.0)
    }

    fn clan(&self, species: SpeciesId) -> f32 {
        self.clan * self.clan_by_species.get(&species).copied().unwrap_or(1.0)
    }
}

pub struct Simulation {
    config: SimulationConfig,
    species: SpeciesTable,
    populations: Vec<SpeciesPopulation>,
    individuals: Vec<Individual>,
    food: Vec<FoodSource>,
    environment: EnvironmentController,
    index: SpatialIndex,
    chronicle: Chronicle,
    rng: ChaCha8Rng,
    next_individual_id: u64,
    speed: SpeedSettings,
    /// Clans reduced to one member, converted after the interaction pass
    pending_conversions: Vec<(SpeciesId, ClanId)>,
}

impl Simulation {
    /// Empty world; call `setup` before stepping
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let chronicle = Chronicle::new(
            config.max_log_entries,
            config.population_history_capacity,
            config.sample_history_capacity,
            config.hunt_log_cooldown,
        );
        Ok(Self {
            environment: EnvironmentController::new(0.0, true, &config),
            index: SpatialIndex::new(config.cell_size()),
            species: SpeciesTable::default(),
            populations: Vec::new(),
            individuals: Vec::new(),
            food: Vec::new(),
            chronicle,
            rng: ChaCha8Rng::seed_from_u64(0),
            next_individual_id: 0,
            speed: SpeedSettings::default(),
            pending_conversions: Vec::new(),
            config,
        })
    }

    /// Build and set up in one call
    pub fn with_setup(config: SimulationConfig, species: &SpeciesTable, params: &SetupParams) -> Result<Self> {
        let mut sim = Self::new(config)?;
        sim.setup(species, params)?;
        Ok(sim)
    }

    /// (Re)initialize the world
    ///
    /// Fails without touching the current world when a population override
    /// or the region names an unknown entry.
    pub fn setup(&mut self, species: &SpeciesTable, params: &SetupParams) -> Result<()> {
        self.config.validate()?;
        if species.is_empty() {
            return Err(SimError::EmptySpeciesTable);
        }
        for name in params.population.keys() {
            species.require(name)?;
        }
        let region = match &params.region {
            Some(name) => Some(
                species
                    .region(name)
                    .cloned()
                    .ok_or_else(|| SimError::InvalidConfig(format!("unknown region '{}'", name)))?,
            ),
            None => None,
        };
        if !(params.food_amount >= 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "food_amount must be non-negative, got {}",
                params.food_amount
            )));
        }

        self.rng = match params.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        self.species = species.clone();
        self.populations = species
            .iter()
            .map(|(id, s)| SpeciesPopulation::new(s.name.clone(), s.traits(id)))
            .collect();
        self.individuals.clear();
        self.pending_conversions.clear();
        self.next_individual_id = 0;
        self.speed.individual_by_species.clear();
        self.speed.clan_by_species.clear();
        self.index = SpatialIndex::new(self.config.cell_size());
        self.chronicle = Chronicle::new(
            self.config.max_log_entries,
            self.config.population_history_capacity,
            self.config.sample_history_capacity,
            self.config.hunt_log_cooldown,
        );

        let requests: Vec<(SpeciesId, String, u32)> = species
            .iter()
            .map(|(id, s)| (id, s.name.clone(), params.population.get(&s.name).copied().unwrap_or(0)))
            .collect();
        let total: u32 = requests.iter().map(|(_, _, n)| n).sum();
        let with_clans = total >= self.config.start_population_threshold;

        for (id, name, count) in requests {
            if count == 0 {
                continue;
            }
            let boost = region.as_ref().and_then(|r| r.boost_for(&name));
            if with_clans {
                let pos = random_position(&mut self.rng, &self.config, self.config.map_edge_padding);
                let idx = self.populations[id.0].spawn_clan(pos, count, &self.config, &mut self.rng);
                if let Some(boost) = boost {
                    if self.rng.gen::<f32>() < boost.chance {
                        apply_clan_boost(&mut self.populations[id.0].clans[idx], boost);
                    }
                }
                let (lo, hi) = self.config.initial_individuals;
                let extra = self.rng.gen_range(lo..=hi);
                for _ in 0..extra {
                    self.spawn_setup_individual(id, boost);
                }
            } else {
                for _ in 0..count {
                    self.spawn_setup_individual(id, boost);
                }
            }
        }

        let places = params.food_places.max(params.food_positions.len());
        self.food = (0..places)
            .map(|i| match params.food_positions.get(i) {
                Some(p) => FoodSource::new(Vec2::new(p.x, p.y), p.amount.unwrap_or(params.food_amount)),
                None => {
                    let pos = random_position(&mut self.rng, &self.config, self.config.map_edge_padding);
                    FoodSource::new(pos, params.food_amount)
                }
            })
            .collect();

        let base = match params.start_temperature {
            Some(t) => t,
            None => {
                let limit = self.config.fallback_temperature_limit;
                gaussian(&mut self.rng, 0.0, self.config.fallback_temperature_std_dev).clamp(-limit, limit)
            }
        };
        self.environment = EnvironmentController::new(base, params.start_is_day, &self.config);
        self.refresh_stats();

        tracing::info!(
            species = self.populations.len(),
            clans = self.clan_count(),
            individuals = self.individuals.len(),
            food = self.food.len(),
            temperature = self.environment.temperature(),
            "setup complete"
        );
        Ok(())
    }

    fn spawn_setup_individual(&mut self, species: SpeciesId, boost: Option<&NativeBoost>) {
        let pos = random_position(&mut self.rng, &self.config, self.config.spawn_padding);
        let idx = self.add_individual(species, pos, None, None);
        if let Some(boost) = boost {
            if self.rng.gen::<f32>() < boost.chance {
                let ind = &mut self.individuals[idx];
                ind.hp *= boost.hp_mult;
                ind.max_hp *= boost.hp_mult;
                ind.combat_strength *= boost.combat_mult;
                ind.hunger_threshold = offset_threshold(ind.hunger_threshold, boost.hunger_delta);
            }
        }
    }

    /// Create an individual, returns its index
    ///
    /// `hp` defaults to the species hp; the individual can always heal up
    /// to at least that.
    fn add_individual(&mut self, species: SpeciesId, position: Vec2, hp: Option<f32>, color: Option<Color>) -> usize {
        let traits = &self.populations[species.0].traits;
        let id = IndividualId(self.next_individual_id);
        self.next_individual_id += 1;
        let mut ind = Individual::new(id, traits, position, hp.unwrap_or(traits.hp), &self.config, &mut self.rng);
        ind.max_hp = ind.max_hp.max(traits.hp);
        if let Some(color) = color {
            ind.color = color;
        }
        self.individuals.push(ind);
        self.individuals.len() - 1
    }

    /// Advance one tick and return the resulting snapshot
    pub fn step(&mut self) -> WorldSnapshot {
        self.chronicle.tick += 1;

        self.roll_spawns();
        self.move_entities();
        self.run_lifecycles();
        self.update_environment();

        let clans = self.populations.iter().enumerate().flat_map(|(s, p)| {
            p.clans
                .iter()
                .enumerate()
                .map(move |(index, c)| (ClanKey { species: SpeciesId(s), index }, c.position))
        });
        self.index.rebuild(clans, &self.individuals, &self.food);

        let is_day = self.environment.is_day();
        let report = InteractionPass::new(
            &self.config,
            &self.species,
            &mut self.populations,
            &mut self.individuals,
            &mut self.food,
            &self.index,
            &mut self.chronicle,
            &mut self.pending_conversions,
            is_day,
            &mut self.rng,
        )
        .run();
        tracing::debug!(
            tick = self.chronicle.tick,
            kills = report.kills,
            joins = report.joins,
            formations = report.formations,
            growth = report.growth,
            "interactions"
        );

        self.apply_conversions();
        for population in &mut self.populations {
            population.remove_empty();
        }
        let (w, h) = (self.config.map_width, self.config.map_height);
        for s in 0..self.populations.len() {
            let splits = self.populations[s].split_clans(&self.config, w, h, true, &mut self.rng);
            self.log_splits(SpeciesId(s), &splits);
        }

        self.refresh_stats();
        let tick = self.chronicle.tick;
        if tick % self.config.population_history_interval == 0 {
            self.chronicle.stats.record_population(tick);
        }
        self.chronicle.prune_hunt_log();

        self.snapshot()
    }

    fn roll_spawns(&mut self) {
        let alive = self.alive_counts();
        let spawns = roll_spawns(&self.species, &alive, &self.config, &mut self.rng);
        for (species, count) in spawns {
            for _ in 0..count {
                let pos = random_position(&mut self.rng, &self.config, self.config.spawn_padding);
                self.add_individual(species, pos, None, None);
            }
            let name = self.populations[species.0].name.clone();
            tracing::debug!(species = %name, count, "spawn");
            self.chronicle.stats.samples.record_spawn(count);
            self.chronicle.record(LogEvent::Spawned { species: name, count });
        }
    }

    fn move_entities(&mut self) {
        let day_factor = self.environment.day_factor(&self.config);
        let (width, height) = (self.config.map_width, self.config.map_height);

        for ind in &mut self.individuals {
            let ctx = MoveContext { width, height, day_factor, speed_multiplier: self.speed.individual(ind.species) };
            if let Err(err) = ind.update(&ctx, &self.config, &mut self.rng) {
                tracing::warn!(%err, "skipping individual update");
            }
        }
        for population in &mut self.populations {
            let ctx = MoveContext { width, height, day_factor, speed_multiplier: self.speed.clan(population.id) };
            for clan in &mut population.clans {
                if let Err(err) = clan.update(&ctx, &self.config, &mut self.rng) {
                    tracing::warn!(%err, "skipping clan update");
                }
            }
        }
    }

    fn run_lifecycles(&mut self) {
        let (w, h) = (self.config.map_width, self.config.map_height);
        for s in 0..self.populations.len() {
            let species = SpeciesId(s);
            let report = self.populations[s].lifecycle(&self.config, w, h, &mut self.rng);
            let name = self.populations[s].name.clone();

            for (clan, deaths) in report.starved {
                self.chronicle.record_deaths(DeathCause::Starvation, &name, deaths);
                self.chronicle.record(LogEvent::Starvation { species: name.clone(), clan: Some(clan), deaths });
            }
            for departure in report.departures {
                self.add_individual(species, departure.position, Some(departure.hp), Some(departure.color));
                let event = match departure.kind {
                    DepartureKind::Converted => LogEvent::Converted { species: name.clone(), clan: departure.clan },
                    DepartureKind::Emigrated => LogEvent::Emigrated { species: name.clone(), clan: departure.clan },
                };
                self.chronicle.record(event);
            }
            self.log_splits(species, &report.splits);
        }
    }

    fn log_splits(&mut self, species: SpeciesId, splits: &[SplitRecord]) {
        if splits.is_empty() {
            return;
        }
        let name = self.populations[species.0].name.clone();
        for split in splits {
            self.chronicle.record(LogEvent::Split {
                species: name.clone(),
                parent: split.parent,
                child: split.child,
                parent_population: split.parent_population,
                child_population: split.child_population,
            });
        }
    }

    fn update_environment(&mut self) {
        let change = self.environment.update(&self.config, &mut self.rng);
        match change.day_changed {
            Some(true) => self.chronicle.record(LogEvent::DayBegins),
            Some(false) => self.chronicle.record(LogEvent::NightBegins),
            None => {}
        }
        if change.temperature_drifted {
            tracing::debug!(base = self.environment.base_temperature(), "temperature drift");
        }
        self.environment
            .regenerate_food(&mut self.food, &self.config, &mut self.chronicle.stats.samples, &mut self.rng);

        let temperature = self.environment.temperature();
        exposure::apply_to_individuals(&mut self.individuals, &self.species, temperature, &self.config, &mut self.chronicle);
        let singletons = exposure::apply_to_clans(
            &mut self.populations,
            &self.species,
            temperature,
            self.environment.is_day(),
            &self.config,
            &mut self.chronicle,
            &mut self.rng,
        );
        self.pending_conversions.extend(singletons);
    }

    /// Turn queued one-member clans into individuals
    fn apply_conversions(&mut self) {
        let pending = std::mem::take(&mut self.pending_conversions);
        for (species, clan_id) in pending {
            let Some(population) = self.populations.get_mut(species.0) else {
                continue;
            };
            // Already converted, regrown or wiped out since it was queued
            if population.find(clan_id).map_or(true, |c| c.population != 1) {
                continue;
            }
            let Some(clan) = population.take(clan_id) else {
                continue;
            };
            let name = population.name.clone();
            self.convert_clan(species, &clan);
            self.chronicle.record(LogEvent::Converted { species: name, clan: clan_id });
        }
    }

    fn convert_clan(&mut self, species: SpeciesId, clan: &Clan) {
        let idx = self.add_individual(species, clan.position, Some(clan.hp_per_member), Some(clan.color));
        let ind = &mut self.individuals[idx];
        ind.can_cannibalize = clan.can_cannibalize;
        ind.combat_strength = clan.combat_strength;
    }

    fn alive_counts(&self) -> Vec<u32> {
        let mut alive: Vec<u32> = self.populations.iter().map(|p| p.total_members()).collect();
        for ind in &self.individuals {
            if let Some(count) = alive.get_mut(ind.species.0) {
                *count += 1;
            }
        }
        alive
    }

    fn refresh_stats(&mut self) {
        let alive = self.alive_counts();
        let stats = &mut self.chronicle.stats;
        for (population, count) in self.populations.iter().zip(alive) {
            stats.species_counts.insert(population.name.clone(), count);
            stats.observe_clan_count(&population.name, population.clan_count());
        }
        stats.food_places = self.food.len();
    }

    /// Pure read of the current world state
    pub fn snapshot(&self) -> WorldSnapshot {
        let name = |id: SpeciesId| self.populations.get(id.0).map(|p| p.name.clone()).unwrap_or_default();
        WorldSnapshot {
            tick: self.chronicle.tick,
            species: self
                .populations
                .iter()
                .map(|p| SpeciesView {
                    name: p.name.clone(),
                    color: p.traits.color,
                    clans: p
                        .clans
                        .iter()
                        .map(|c| ClanView {
                            id: c.id,
                            x: c.position.x,
                            y: c.position.y,
                            population: c.population,
                            color: c.color,
                        })
                        .collect(),
                })
                .collect(),
            individuals: self
                .individuals
                .iter()
                .map(|i| IndividualView {
                    id: i.id,
                    species: name(i.species),
                    x: i.position.x,
                    y: i.position.y,
                    color: i.color,
                    hp: i.hp,
                })
                .collect(),
            food: self
                .food
                .iter()
                .map(|f| FoodView { x: f.position.x, y: f.position.y, amount: f.amount(), max_amount: f.max_amount() })
                .collect(),
            is_day: self.environment.is_day(),
            transition_progress: self.environment.transition_progress(&self.config),
            temperature: self.environment.temperature(),
            logs: self.chronicle.log.to_vec(),
            stats: self.chronicle.stats.clone(),
        }
    }

    // === RUNTIME TUNING ===

    /// Global individual speed multiplier, returns the clamped value
    pub fn set_individual_speed(&mut self, multiplier: f32) -> f32 {
        self.speed.individual = self.config.clamp_speed_multiplier(multiplier);
        self.speed.individual
    }

    /// Global clan speed multiplier, returns the clamped value
    pub fn set_clan_speed(&mut self, multiplier: f32) -> f32 {
        self.speed.clan = self.config.clamp_speed_multiplier(multiplier);
        self.speed.clan
    }

    pub fn set_species_individual_speed(&mut self, species: &str, multiplier: f32) -> Result<f32> {
        let id = self.species.require(species)?;
        let value = self.config.clamp_speed_multiplier(multiplier);
        self.speed.individual_by_species.insert(id, value);
        Ok(value)
    }

    pub fn set_species_clan_speed(&mut self, species: &str, multiplier: f32) -> Result<f32> {
        let id = self.species.require(species)?;
        let value = self.config.clamp_speed_multiplier(multiplier);
        self.speed.clan_by_species.insert(id, value);
        Ok(value)
    }

    /// Move the base temperature (clamped to the configured range)
    pub fn set_temperature(&mut self, temperature: f32) {
        self.environment.set_base_temperature(temperature, &self.config);
        let temperature = self.environment.base_temperature();
        tracing::info!(temperature, "temperature set");
        self.chronicle.record(LogEvent::TemperatureSet { temperature });
    }

    /// Reseed the generator and send every individual off in a new direction
    pub fn inject_chaos(&mut self, seed: Option<u64>) {
        self.rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        for ind in &mut self.individuals {
            ind.randomize_heading(&self.config, &mut self.rng);
        }
        self.chronicle.record(LogEvent::Chaos);
    }

    /// Statistics with counts refreshed for end-of-run reporting
    pub fn final_stats(&mut self) -> &SimulationStats {
        self.refresh_stats();
        &self.chronicle.stats
    }

    // === ACCESSORS ===

    pub fn tick(&self) -> Tick {
        self.chronicle.tick
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn species(&self) -> &SpeciesTable {
        &self.species
    }

    pub fn populations(&self) -> &[SpeciesPopulation] {
        &self.populations
    }

    pub fn populations_mut(&mut self) -> &mut [SpeciesPopulation] {
        &mut self.populations
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn individuals_mut(&mut self) -> &mut [Individual] {
        &mut self.individuals
    }

    /// Place an extra individual of `species` at `position`
    pub fn insert_individual(&mut self, species: &str, position: Vec2) -> Result<IndividualId> {
        let id = self.species.require(species)?;
        let idx = self.add_individual(id, position, None, None);
        Ok(self.individuals[idx].id)
    }

    pub fn food_sources(&self) -> &[FoodSource] {
        &self.food
    }

    pub fn environment(&self) -> &EnvironmentController {
        &self.environment
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.chronicle.stats
    }

    pub fn clan_count(&self) -> usize {
        self.populations.iter().map(|p| p.clan_count()).sum()
    }
}

fn offset_threshold(threshold: u32, delta: i32) -> u32 {
    (threshold as i64 + delta as i64).clamp(0, u32::MAX as i64) as u32
}

fn apply_clan_boost(clan: &mut Clan, boost: &NativeBoost) {
    clan.hp_per_member *= boost.hp_mult;
    clan.max_hp_per_member *= boost.hp_mult;
    clan.combat_strength *= boost.combat_mult;
    clan.hunger_threshold = offset_threshold(clan.hunger_threshold, boost.hunger_delta);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RegionConfig, SpeciesConfig};

    fn quiet_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.emigration_chance = 0.0;
        config.initial_individuals = (0, 0);
        config
    }

    fn table() -> SpeciesTable {
        let mut a = SpeciesConfig::new("Moss", 6, 20.0);
        a.spawn_chance = 0.0;
        let mut b = SpeciesConfig::new("Beetle", 8, 25.0);
        b.spawn_chance = 0.0;
        SpeciesTable::new(vec![a, b]).unwrap()
    }

    fn params(population: &[(&str, u32)]) -> SetupParams {
        SetupParams {
            population: population.iter().map(|(n, c)| (n.to_string(), *c)).collect(),
            food_places: 0,
            start_temperature: Some(10.0),
            seed: Some(7),
            ..SetupParams::default()
        }
    }

    #[test]
    fn test_small_population_starts_as_individuals() {
        let sim = Simulation::with_setup(quiet_config(), &table(), &params(&[("Moss", 3), ("Beetle", 2)])).unwrap();
        assert_eq!(sim.clan_count(), 0);
        assert_eq!(sim.individuals().len(), 5);
        assert_eq!(sim.stats().species_counts["Moss"], 3);
    }

    #[test]
    fn test_large_population_gets_seed_clan() {
        let mut config = quiet_config();
        config.initial_individuals = (2, 2);
        let sim = Simulation::with_setup(config, &table(), &params(&[("Moss", 12), ("Beetle", 0)])).unwrap();
        assert_eq!(sim.populations()[0].clans.len(), 1);
        assert_eq!(sim.populations()[0].clans[0].population, 12);
        assert!(sim.populations()[1].clans.is_empty());
        assert_eq!(sim.individuals().len(), 2);
    }

    #[test]
    fn test_food_placements_come_first() {
        let mut p = params(&[("Moss", 1)]);
        p.food_places = 3;
        p.food_positions = vec![FoodPlacement { x: 10.0, y: 20.0, amount: Some(5.0) }];
        let sim = Simulation::with_setup(quiet_config(), &table(), &p).unwrap();
        let food = sim.food_sources();
        assert_eq!(food.len(), 3);
        assert_eq!(food[0].position, Vec2::new(10.0, 20.0));
        assert_eq!(food[0].amount(), 5.0);
        assert_eq!(food[1].amount(), 100.0);
    }

    #[test]
    fn test_region_boost_applies_to_natives() {
        let region = RegionConfig {
            name: "Bog".into(),
            natives: vec![NativeBoost {
                species: "Moss".into(),
                chance: 1.0,
                hp_mult: 2.0,
                combat_mult: 1.0,
                hunger_delta: -1000,
            }],
        };
        let table = table().with_regions(vec![region]).unwrap();
        let mut p = params(&[("Moss", 1), ("Beetle", 1)]);
        p.region = Some("Bog".into());
        let sim = Simulation::with_setup(quiet_config(), &table, &p).unwrap();

        let moss = sim.individuals().iter().find(|i| i.species == SpeciesId(0)).unwrap();
        assert_eq!(moss.hp, 40.0);
        assert_eq!(moss.hunger_threshold, 0);
        let beetle = sim.individuals().iter().find(|i| i.species == SpeciesId(1)).unwrap();
        assert_eq!(beetle.hp, 25.0);
    }

    #[test]
    fn test_speed_setters_clamp() {
        let mut sim = Simulation::with_setup(quiet_config(), &table(), &params(&[("Moss", 1)])).unwrap();
        assert_eq!(sim.set_individual_speed(50.0), 5.0);
        assert_eq!(sim.set_clan_speed(0.0), 0.1);
        assert_eq!(sim.set_species_clan_speed("Beetle", 2.0).unwrap(), 2.0);
        assert!(sim.set_species_individual_speed("Nobody", 2.0).is_err());
        assert!((sim.speed.clan(SpeciesId(1)) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_frozen_individuals_stand_still() {
        let mut config = quiet_config();
        config.individual_heading_change_chance = 0.0;
        let mut sim = Simulation::with_setup(config, &table(), &params(&[("Moss", 1)])).unwrap();
        sim.individuals_mut()[0].velocity = Vec2::new(2.0, 0.0);
        let start = sim.individuals()[0].position;
        sim.set_individual_speed(0.1);
        sim.step();
        let moved = sim.individuals()[0].position.x - start.x;
        assert!((moved - 0.2).abs() < 1e-3, "moved {}", moved);
    }

    #[test]
    fn test_set_temperature_is_logged_and_clamped() {
        let mut sim = Simulation::with_setup(quiet_config(), &table(), &params(&[("Moss", 1)])).unwrap();
        sim.set_temperature(500.0);
        assert_eq!(sim.environment().base_temperature(), 50.0);
        let last = sim.snapshot().logs.pop().unwrap();
        assert_eq!(last.event, LogEvent::TemperatureSet { temperature: 50.0 });
    }

    #[test]
    fn test_chaos_changes_headings() {
        let mut sim = Simulation::with_setup(quiet_config(), &table(), &params(&[("Moss", 4)])).unwrap();
        let before: Vec<Vec2> = sim.individuals().iter().map(|i| i.velocity).collect();
        sim.inject_chaos(Some(99));
        let after: Vec<Vec2> = sim.individuals().iter().map(|i| i.velocity).collect();
        assert_ne!(before, after);
        assert!(matches!(sim.snapshot().logs.last().map(|e| &e.event), Some(LogEvent::Chaos)));
    }

    #[test]
    fn test_single_member_clan_converted_same_tick() {
        let mut sim = Simulation::with_setup(quiet_config(), &table(), &params(&[("Moss", 12)])).unwrap();
        let clan = &mut sim.populations_mut()[0].clans[0];
        clan.population = 2;
        let id = clan.id;
        sim.pending_conversions.push((SpeciesId(0), id));
        // Population 2 is not a singleton any more: the stale entry is ignored
        sim.apply_conversions();
        assert_eq!(sim.populations()[0].clans.len(), 1);

        sim.populations_mut()[0].clans[0].population = 1;
        sim.populations_mut()[0].clans[0].hp_per_member = 13.0;
        let position = sim.populations()[0].clans[0].position;
        sim.pending_conversions.push((SpeciesId(0), id));
        sim.pending_conversions.push((SpeciesId(0), id));
        sim.apply_conversions();
        assert!(sim.populations()[0].clans.is_empty());
        assert_eq!(sim.individuals().len(), 1);
        assert_eq!(sim.individuals()[0].hp, 13.0);
        assert_eq!(sim.individuals()[0].position, position);
    }

    #[test]
    fn test_population_history_sampled_on_interval() {
        let mut config = quiet_config();
        config.population_history_interval = 5;
        let mut sim = Simulation::with_setup(config, &table(), &params(&[("Moss", 2)])).unwrap();
        for _ in 0..12 {
            sim.step();
        }
        let ticks: Vec<Tick> = sim.stats().population_history.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![5, 10]);
    }
}
