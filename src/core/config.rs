//! Simulation configuration with documented constants
//!
//! All tunables are collected here. Species-specific values live in the
//! species table instead (see `rules::species`).

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

/// Configuration for the simulation systems
///
/// These values have been tuned to keep populations oscillating for a few
/// thousand ticks with the default species table. Any subset can be
/// overridden from TOML; missing fields keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === WORLD & SPATIAL ===
    pub map_width: f32,
    pub map_height: f32,

    /// Edge length of spatial index cells
    ///
    /// Close to the interaction radius so a hunt query touches about 9-25 cells.
    pub grid_cell_size: f32,

    /// Floor applied to `grid_cell_size`
    pub grid_cell_min: f32,

    /// Margin kept free when placing new individuals and split clans
    pub spawn_padding: f32,

    /// Margin kept free when placing food and seed clans
    pub map_edge_padding: f32,

    // === RADII ===
    pub food_search_radius: f32,
    /// Distance at which an entity can eat from a food source
    pub eat_radius: f32,
    /// Combat, joining and bonding distance
    pub interaction_radius: f32,
    /// Distance at which aggressive clans start steering toward a target
    pub hunt_radius: f32,
    /// Distance at which individuals of one species can coalesce
    pub formation_radius: f32,
    /// Same-species clans closer than this push each other apart
    pub repel_radius: f32,
    /// Individuals search this much further than clans
    pub individual_search_boost: f32,

    // === HUNGER ===
    /// Ticks without food before starvation kicks in
    pub starvation_threshold: u32,
    /// Clan per-instance food-seeking threshold range (inclusive)
    pub clan_hunger_threshold_range: (u32, u32),
    /// Individual per-instance food-seeking threshold range (inclusive)
    pub individual_hunger_threshold_range: (u32, u32),
    /// Clans chase prey once hunger passes this value
    pub chase_hunger_threshold: u32,
    /// Hunger ticks removed per unit of food eaten
    pub hunger_per_food: f32,
    /// HP restored per unit of food eaten
    pub hp_per_food: f32,
    /// Food units gained per kill by cannibalizing species
    pub food_per_kill: f32,
    /// Fraction of a starving clan that dies each tick (at least one member)
    pub starvation_death_fraction: f32,

    // === COMBAT ===
    pub attack_damage: f32,
    /// Lower bound on the defender's combat strength in the damage formula
    pub min_defense: f32,
    pub combat_strength_range: (f32, f32),
    pub attack_chance_day: f32,
    pub attack_chance_night: f32,
    /// Attack chances used against a species listed in `boosted_attack_targets`
    pub boosted_attack_chance_day: f32,
    pub boosted_attack_chance_night: f32,
    /// Attack chances for a clan attacking an individual
    pub individual_attack_chance_day: f32,
    pub individual_attack_chance_night: f32,
    /// Minimum ticks between two hunt log lines for the same hunter/target pair
    pub hunt_log_cooldown: u64,

    // === SOCIAL ===
    pub growth_mean: f32,
    pub growth_std_dev: f32,
    pub join_chance: f32,
    pub join_chance_hungry: f32,
    /// Individuals this hungry join friendly clans more readily
    pub join_hunger_threshold: u32,
    pub formation_probability: f32,
    pub friendly_stick_chance: f32,

    // === STEERING ===
    pub food_steer_strength: f32,
    pub chase_steer_strength: f32,
    pub hunt_steer_strength: f32,
    /// Push away from clans of a feared species, as gentle as the friendly stick
    pub fear_steer_strength: f32,
    pub friendly_stick_strength: f32,
    pub repel_strength: f32,
    /// Speed cap applied after every steering nudge
    pub max_steer_speed: f32,
    /// Distance floor used when normalizing repulsion
    pub min_repel_distance: f32,

    // === MOVEMENT ===
    pub clan_initial_velocity: f32,
    pub individual_initial_velocity: f32,
    pub clan_heading_change_chance: f32,
    pub individual_heading_change_chance: f32,
    pub clan_speed_range: (f32, f32),
    pub individual_speed_range: (f32, f32),
    /// Velocity multiplier applied to clans after each move
    pub clan_damping: f32,
    /// Clans bounce this far inside the map edge
    pub clan_edge_margin: f32,
    pub night_speed_modifier: f32,
    pub speed_multiplier_min: f32,
    pub speed_multiplier_max: f32,

    // === POPULATION ===
    pub max_clans_per_species: usize,
    /// Population fraction of max_members where voluntary splits begin
    pub split_onset_fraction: f32,
    /// Width of the gaussian split curve
    pub split_curve_width: f32,
    /// Split chance right at max_members
    pub split_max_chance: f32,
    /// Offset range of a split-off clan from its parent
    pub split_offset: f32,
    pub emigration_chance: f32,
    pub emigration_min_population: u32,
    /// Below this total requested population, setup creates loners only
    pub start_population_threshold: u32,
    /// Extra individuals per species when setup creates clans
    pub initial_individuals: (u32, u32),
    pub spawn_count: u32,

    // === ENVIRONMENT ===
    pub day_night_cycle: u32,
    pub transition_duration: u32,
    pub night_temperature_delta: f32,
    pub temperature_change_interval: u32,
    pub temperature_drift_std_dev: f32,
    pub temperature_min: f32,
    pub temperature_max: f32,
    /// Base temperature is drawn from gaussian(0, sigma) clamped to +-limit when not given
    pub fallback_temperature_std_dev: f32,
    pub fallback_temperature_limit: f32,
    pub food_regen_chance: f32,
    pub food_regen_amounts: Vec<f32>,

    // === EXPOSURE DAMAGE ===
    pub temperature_degree_step: f32,
    pub individual_temp_damage_base: f32,
    pub individual_temp_damage_per_step: f32,
    pub individual_temp_damage_range: (f32, f32),
    pub clan_temp_damage_base: f32,
    pub clan_temp_damage_per_step: f32,
    pub clan_temp_damage_range: (f32, f32),
    /// Chance a clan ignores temperature for a whole day or night
    pub clan_temp_immunity_chance: f32,

    // === BOOKKEEPING ===
    pub population_history_interval: u64,
    pub population_history_capacity: usize,
    pub max_log_entries: usize,
    pub sample_history_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            map_width: 1200.0,
            map_height: 600.0,
            grid_cell_size: 150.0,
            grid_cell_min: 10.0,
            spawn_padding: 50.0,
            map_edge_padding: 100.0,

            food_search_radius: 400.0,
            eat_radius: 20.0,
            interaction_radius: 100.0,
            hunt_radius: 400.0,
            formation_radius: 50.0,
            repel_radius: 60.0,
            individual_search_boost: 1.5,

            starvation_threshold: 300,
            clan_hunger_threshold_range: (40, 90),
            individual_hunger_threshold_range: (150, 260),
            chase_hunger_threshold: 100,
            hunger_per_food: 10.0,
            hp_per_food: 5.0,
            food_per_kill: 5.0,
            starvation_death_fraction: 0.1,

            attack_damage: 6.0,
            min_defense: 0.5,
            combat_strength_range: (0.85, 1.25),
            attack_chance_day: 0.30,
            attack_chance_night: 0.15,
            boosted_attack_chance_day: 0.45,
            boosted_attack_chance_night: 0.25,
            individual_attack_chance_day: 0.35,
            individual_attack_chance_night: 0.20,
            hunt_log_cooldown: 100,

            growth_mean: 1.0,
            growth_std_dev: 0.8,
            join_chance: 0.03,
            join_chance_hungry: 0.15,
            join_hunger_threshold: 150,
            formation_probability: 0.01,
            friendly_stick_chance: 0.10,

            food_steer_strength: 0.4,
            chase_steer_strength: 0.5,
            hunt_steer_strength: 0.3,
            fear_steer_strength: 0.1,
            friendly_stick_strength: 0.1,
            repel_strength: 0.2,
            max_steer_speed: 4.0,
            min_repel_distance: 1.0,

            clan_initial_velocity: 2.0,
            individual_initial_velocity: 2.5,
            clan_heading_change_chance: 0.01,
            individual_heading_change_chance: 0.02,
            clan_speed_range: (0.7, 1.2),
            individual_speed_range: (0.8, 1.5),
            clan_damping: 0.98,
            clan_edge_margin: 30.0,
            night_speed_modifier: 0.7,
            speed_multiplier_min: 0.1,
            speed_multiplier_max: 5.0,

            max_clans_per_species: 15,
            split_onset_fraction: 0.5,
            split_curve_width: 0.5,
            split_max_chance: 0.15,
            split_offset: 50.0,
            emigration_chance: 0.02,
            emigration_min_population: 3,
            start_population_threshold: 10,
            initial_individuals: (2, 5),
            spawn_count: 1,

            day_night_cycle: 300,
            transition_duration: 50,
            night_temperature_delta: 3.0,
            temperature_change_interval: 600,
            temperature_drift_std_dev: 0.5,
            temperature_min: -50.0,
            temperature_max: 50.0,
            fallback_temperature_std_dev: 8.0,
            fallback_temperature_limit: 20.0,
            food_regen_chance: 0.02,
            food_regen_amounts: vec![1.0, 1.0, 1.0, 2.0, 2.0, 3.0],

            temperature_degree_step: 5.0,
            individual_temp_damage_base: 6.0,
            individual_temp_damage_per_step: 3.0,
            individual_temp_damage_range: (1.0, 40.0),
            clan_temp_damage_base: 2.0,
            clan_temp_damage_per_step: 1.0,
            clan_temp_damage_range: (1.0, 12.0),
            clan_temp_immunity_chance: 0.2,

            population_history_interval: 10,
            population_history_capacity: 500,
            max_log_entries: 300,
            sample_history_capacity: 100,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective spatial cell size
    pub fn cell_size(&self) -> f32 {
        self.grid_cell_size.max(self.grid_cell_min).max(1.0)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(SimError::InvalidConfig(msg));

        if !(self.map_width > 0.0 && self.map_height > 0.0)
            || !self.map_width.is_finite()
            || !self.map_height.is_finite()
        {
            return fail(format!(
                "map size must be positive, got {}x{}",
                self.map_width, self.map_height
            ));
        }
        for (name, value) in [
            ("spawn_padding", self.spawn_padding),
            ("map_edge_padding", self.map_edge_padding),
            ("split_offset", self.split_offset),
            ("fallback_temperature_limit", self.fallback_temperature_limit),
        ] {
            if !(value >= 0.0) || !value.is_finite() {
                return fail(format!("{} must be finite and >= 0, got {}", name, value));
            }
        }
        if 2.0 * self.spawn_padding >= self.map_width.min(self.map_height)
            || 2.0 * self.map_edge_padding >= self.map_width.min(self.map_height)
        {
            return fail("padding leaves no room on the map".into());
        }
        if self.eat_radius > self.food_search_radius {
            return fail(format!(
                "eat_radius ({}) should be <= food_search_radius ({})",
                self.eat_radius, self.food_search_radius
            ));
        }
        if self.interaction_radius > self.hunt_radius {
            return fail(format!(
                "interaction_radius ({}) should be <= hunt_radius ({})",
                self.interaction_radius, self.hunt_radius
            ));
        }
        for (name, (lo, hi)) in [
            ("clan_hunger_threshold_range", self.clan_hunger_threshold_range),
            ("individual_hunger_threshold_range", self.individual_hunger_threshold_range),
            ("initial_individuals", self.initial_individuals),
        ] {
            if lo > hi {
                return fail(format!("{} is empty ({}..={})", name, lo, hi));
            }
        }
        for (name, (lo, hi)) in [
            ("combat_strength_range", self.combat_strength_range),
            ("clan_speed_range", self.clan_speed_range),
            ("individual_speed_range", self.individual_speed_range),
            ("individual_temp_damage_range", self.individual_temp_damage_range),
            ("clan_temp_damage_range", self.clan_temp_damage_range),
            ("speed_multiplier_min..speed_multiplier_max", (self.speed_multiplier_min, self.speed_multiplier_max)),
            ("temperature_min..temperature_max", (self.temperature_min, self.temperature_max)),
        ] {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return fail(format!("{} must be finite with min <= max, got {}..{}", name, lo, hi));
            }
        }
        if self.transition_duration == 0 || self.day_night_cycle == 0 {
            return fail("day/night durations must be positive".into());
        }
        if self.temperature_degree_step <= 0.0 {
            return fail("temperature_degree_step must be positive".into());
        }
        if self.population_history_interval == 0 {
            return fail("population_history_interval must be positive".into());
        }
        if self.food_regen_amounts.is_empty() {
            return fail("food_regen_amounts must not be empty".into());
        }
        if self.min_defense <= 0.0 {
            return fail("min_defense must be positive".into());
        }

        Ok(())
    }

    /// Clamp a speed multiplier into the configured range
    pub fn clamp_speed_multiplier(&self, value: f32) -> f32 {
        value.clamp(self.speed_multiplier_min, self.speed_multiplier_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SimulationConfig =
            toml::from_str("formation_probability = 1.0\nmap_width = 800.0").unwrap();
        assert_eq!(config.formation_probability, 1.0);
        assert_eq!(config.map_width, 800.0);
        assert_eq!(config.starvation_threshold, 300);
    }

    #[test]
    fn test_invalid_ranges_are_rejected() {
        let mut config = SimulationConfig::default();
        config.clan_hunger_threshold_range = (90, 40);
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let mut config = SimulationConfig::default();
        config.interaction_radius = 1000.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.food_regen_amounts.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reversed_bounds_are_rejected() {
        let mut config = SimulationConfig::default();
        config.speed_multiplier_min = 3.0;
        config.speed_multiplier_max = 1.0;
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let mut config = SimulationConfig::default();
        config.temperature_min = 40.0;
        config.temperature_max = -40.0;
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_non_finite_bounds_are_rejected() {
        let mut config = SimulationConfig::default();
        config.speed_multiplier_max = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.speed_multiplier_min = f32::NEG_INFINITY;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.temperature_min = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.temperature_max = f32::INFINITY;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.clan_speed_range = (0.7, f32::INFINITY);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_offsets_are_rejected() {
        let mut config = SimulationConfig::default();
        config.split_offset = -1.0;
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let mut config = SimulationConfig::default();
        config.split_offset = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.fallback_temperature_limit = -5.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.spawn_padding = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cell_size_has_floor() {
        let mut config = SimulationConfig::default();
        config.grid_cell_size = 0.0;
        assert_eq!(config.cell_size(), config.grid_cell_min);
    }

    #[test]
    fn test_speed_multiplier_clamp() {
        let config = SimulationConfig::default();
        assert_eq!(config.clamp_speed_multiplier(100.0), 5.0);
        assert_eq!(config.clamp_speed_multiplier(0.0), 0.1);
        assert_eq!(config.clamp_speed_multiplier(1.5), 1.5);
    }
}
