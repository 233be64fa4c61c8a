//! Solitary individuals ("loners")
//!
//! Individuals are faster than clans and never damp their velocity. They
//! redirect their heading toward food or prey without changing speed.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::random::symmetric;
use crate::core::types::{Color, IndividualId, SpeciesId, Vec2};
use crate::entity::{bounce, MoveContext, SpeciesTraits};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    pub id: IndividualId,
    pub species: SpeciesId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: Color,
    pub hp: f32,
    pub max_hp: f32,
    pub food_intake: f32,
    /// Ticks since the last meal
    pub hunger_timer: u32,
    pub can_cannibalize: bool,
    pub combat_strength: f32,
    /// Hunger level at which this individual starts seeking food and prey
    pub hunger_threshold: u32,
}

impl Individual {
    /// Create an individual with randomized velocity, strength and threshold
    pub fn new<R: Rng + ?Sized>(
        id: IndividualId,
        traits: &SpeciesTraits,
        position: Vec2,
        hp: f32,
        config: &SimulationConfig,
        rng: &mut R,
    ) -> Self {
        let (s_lo, s_hi) = config.combat_strength_range;
        let (h_lo, h_hi) = config.individual_hunger_threshold_range;
        Self {
            id,
            species: traits.species,
            position,
            velocity: Vec2::new(
                symmetric(rng, config.individual_initial_velocity),
                symmetric(rng, config.individual_initial_velocity),
            ),
            color: traits.color,
            hp,
            max_hp: hp,
            food_intake: traits.food_intake,
            hunger_timer: 0,
            can_cannibalize: traits.can_cannibalize,
            combat_strength: rng.gen_range(s_lo..=s_hi),
            hunger_threshold: rng.gen_range(h_lo..=h_hi),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    pub fn is_hungry(&self) -> bool {
        self.hunger_timer >= self.hunger_threshold
    }

    /// Reject state that would poison the rest of the tick
    pub fn validate(&self) -> Result<()> {
        let reason = if !self.position.is_finite() {
            "non-finite position"
        } else if !self.velocity.is_finite() {
            "non-finite velocity"
        } else if !self.hp.is_finite() || !(self.max_hp > 0.0) {
            "invalid hp"
        } else {
            return Ok(());
        };
        Err(SimError::InvalidEntityState {
            kind: "individual",
            reason: format!("{:?}: {}", self.id, reason),
        })
    }

    /// Advance one tick: hunger, translation, edge bounce, random heading changes
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        ctx: &MoveContext,
        config: &SimulationConfig,
        rng: &mut R,
    ) -> Result<()> {
        self.validate()?;

        self.hunger_timer = self.hunger_timer.saturating_add(1);

        let factor = ctx.speed_factor();
        self.position += self.velocity * factor;

        bounce(&mut self.position.x, &mut self.velocity.x, 0.0, ctx.width);
        bounce(&mut self.position.y, &mut self.velocity.y, 0.0, ctx.height);

        if rng.gen::<f32>() < config.individual_heading_change_chance {
            self.randomize_heading(config, rng);
        }
        Ok(())
    }

    /// Pick a new random heading and speed
    pub fn randomize_heading<R: Rng + ?Sized>(&mut self, config: &SimulationConfig, rng: &mut R) {
        let (lo, hi) = config.individual_speed_range;
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let speed = rng.gen_range(lo..=hi);
        self.velocity = Vec2::from_angle(angle, speed);
    }

    /// Turn toward `target`, keeping the current speed
    pub fn head_towards<R: Rng + ?Sized>(
        &mut self,
        target: Vec2,
        config: &SimulationConfig,
        rng: &mut R,
    ) {
        let offset = target - self.position;
        if offset.length_sq() <= 0.0 {
            return;
        }
        let mut speed = self.velocity.length();
        if speed <= 0.0 {
            let (lo, hi) = config.individual_speed_range;
            speed = rng.gen_range(lo..=hi);
        }
        self.velocity = offset.normalize() * speed;
    }

    /// Eat `consumed` food units: hunger drops, hp heals up to max
    pub fn feed(&mut self, consumed: f32, config: &SimulationConfig) {
        let relief = (consumed * config.hunger_per_food).round().max(0.0) as u32;
        self.hunger_timer = self.hunger_timer.saturating_sub(relief);
        self.hp = (self.hp + consumed * config.hp_per_food).min(self.max_hp);
    }
}
