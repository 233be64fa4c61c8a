//! Day/night cycle, ambient temperature and food regeneration

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::random::gaussian;
use crate::entity::FoodSource;
use crate::simulation::stats::SampleHistory;

/// What changed during one environment update
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnvironmentChange {
    /// New day state when a transition completed this tick
    pub day_changed: Option<bool>,
    pub temperature_drifted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentController {
    is_day: bool,
    /// Ticks since the last transition finished
    day_timer: u32,
    transition: Option<Transition>,
    base_temperature: f32,
    diurnal_offset: f32,
    temperature_timer: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Transition {
    to_day: bool,
    elapsed: u32,
}

impl EnvironmentController {
    pub fn new(base_temperature: f32, is_day: bool, config: &SimulationConfig) -> Self {
        let mut env = Self {
            is_day,
            day_timer: 0,
            transition: None,
            base_temperature: base_temperature.clamp(config.temperature_min, config.temperature_max),
            diurnal_offset: 0.0,
            temperature_timer: 0,
        };
        env.diurnal_offset = env.offset_for(config);
        env
    }

    pub fn is_day(&self) -> bool {
        self.is_day
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    pub fn base_temperature(&self) -> f32 {
        self.base_temperature
    }

    pub fn temperature(&self) -> f32 {
        self.base_temperature + self.diurnal_offset
    }

    /// 0.0 is full night, 1.0 full day
    pub fn transition_progress(&self, config: &SimulationConfig) -> f32 {
        match self.transition {
            None => {
                if self.is_day {
                    1.0
                } else {
                    0.0
                }
            }
            Some(t) => {
                let ramp = (t.elapsed as f32 / config.transition_duration.max(1) as f32).clamp(0.0, 1.0);
                if t.to_day {
                    ramp
                } else {
                    1.0 - ramp
                }
            }
        }
    }

    /// Movement factor: 1.0 by day, the night modifier by night
    pub fn day_factor(&self, config: &SimulationConfig) -> f32 {
        if self.is_day {
            1.0
        } else {
            config.night_speed_modifier
        }
    }

    fn offset_for(&self, config: &SimulationConfig) -> f32 {
        -config.night_temperature_delta * (1.0 - self.transition_progress(config))
    }

    /// Move the base temperature, clamped to the configured range
    pub fn set_base_temperature(&mut self, temperature: f32, config: &SimulationConfig) {
        self.base_temperature = temperature.clamp(config.temperature_min, config.temperature_max);
    }

    /// Advance the cycle and the temperature model by one tick
    pub fn update<R: Rng + ?Sized>(&mut self, config: &SimulationConfig, rng: &mut R) -> EnvironmentChange {
        let mut change = EnvironmentChange::default();

        match self.transition.as_mut() {
            Some(t) => {
                t.elapsed += 1;
                if t.elapsed >= config.transition_duration {
                    self.is_day = t.to_day;
                    self.transition = None;
                    self.day_timer = 0;
                    change.day_changed = Some(self.is_day);
                    tracing::info!(is_day = self.is_day, "day/night changed");
                }
            }
            None => {
                self.day_timer += 1;
                if self.day_timer >= config.day_night_cycle {
                    self.transition = Some(Transition { to_day: !self.is_day, elapsed: 0 });
                }
            }
        }
        self.diurnal_offset = self.offset_for(config);

        self.temperature_timer += 1;
        if self.temperature_timer >= config.temperature_change_interval {
            self.temperature_timer = 0;
            let step = gaussian(rng, 0.0, config.temperature_drift_std_dev);
            self.set_base_temperature(self.base_temperature + step, config);
            change.temperature_drifted = true;
        }

        change
    }

    /// Roll regeneration for every food source, returns the total added
    pub fn regenerate_food<R: Rng + ?Sized>(
        &self,
        food: &mut [FoodSource],
        config: &SimulationConfig,
        samples: &mut SampleHistory,
        rng: &mut R,
    ) -> f32 {
        let mut total = 0.0;
        for source in food.iter_mut() {
            let added = source.regenerate(rng, config.food_regen_chance, &config.food_regen_amounts);
            if added > 0.0 {
                samples.record_food_regeneration(added);
                total += added;
            }
        }
        total
    }
}
