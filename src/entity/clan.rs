//! Clans: groups of one species that move and fight as a unit
//!
//! A clan tracks its members as a plain count. Damage is accumulated in a
//! fractional counter and converted into whole-member deaths, so repeated
//! partial hits add up exactly across ticks.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::random::symmetric;
use crate::core::types::{ClanId, Color, SpeciesId, Vec2};
use crate::entity::{bounce, MoveContext, SpeciesTraits};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clan {
    pub id: ClanId,
    pub species: SpeciesId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub population: u32,
    pub color: Color,
    pub max_members: u32,
    pub hp_per_member: f32,
    /// Healing cap for `hp_per_member`
    pub max_hp_per_member: f32,
    pub food_intake: f32,
    pub hunger_timer: u32,
    pub can_cannibalize: bool,
    pub seeking_food: bool,
    pub combat_strength: f32,
    pub hunger_threshold: u32,
    /// Damage taken that has not yet added up to a whole member
    pub accumulated_damage: f32,
    /// Immune to temperature for the current day or night
    pub temperature_immune: bool,
    /// Day state the immunity roll belongs to; `None` until first rolled
    pub immunity_day_state: Option<bool>,
}

impl Clan {
    pub fn new<R: Rng + ?Sized>(
        id: ClanId,
        traits: &SpeciesTraits,
        position: Vec2,
        population: u32,
        config: &SimulationConfig,
        rng: &mut R,
    ) -> Self {
        let (s_lo, s_hi) = config.combat_strength_range;
        let (h_lo, h_hi) = config.clan_hunger_threshold_range;
        Self {
            id,
            species: traits.species,
            position,
            velocity: Vec2::new(
                symmetric(rng, config.clan_initial_velocity),
                symmetric(rng, config.clan_initial_velocity),
            ),
            population,
            color: traits.color,
            max_members: traits.max_members,
            hp_per_member: traits.hp,
            max_hp_per_member: traits.hp,
            food_intake: traits.food_intake,
            hunger_timer: 0,
            can_cannibalize: traits.can_cannibalize,
            seeking_food: false,
            combat_strength: rng.gen_range(s_lo..=s_hi),
            hunger_threshold: rng.gen_range(h_lo..=h_hi),
            accumulated_damage: 0.0,
            temperature_immune: false,
            immunity_day_state: None,
        }
    }

    pub fn total_hp(&self) -> f32 {
        self.population as f32 * self.hp_per_member
    }

    pub fn is_empty(&self) -> bool {
        self.population == 0
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.max_members.saturating_sub(self.population)
    }

    pub fn validate(&self) -> Result<()> {
        let reason = if !self.position.is_finite() {
            "non-finite position"
        } else if !self.velocity.is_finite() {
            "non-finite velocity"
        } else if !(self.hp_per_member > 0.0) || !self.hp_per_member.is_finite() {
            "hp_per_member must be positive"
        } else if !self.accumulated_damage.is_finite() {
            "non-finite accumulated damage"
        } else {
            return Ok(());
        };
        Err(SimError::InvalidEntityState {
            kind: "clan",
            reason: format!("{:?} of {:?}: {}", self.id, self.species, reason),
        })
    }

    /// Apply damage, returns the number of members that died
    ///
    /// Deaths never exceed the population. Leftover damage below one
    /// member's hp stays in the counter; an emptied clan drops it.
    pub fn take_damage(&mut self, damage: f32) -> u32 {
        if !(damage > 0.0) || self.population == 0 || !(self.hp_per_member > 0.0) {
            return 0;
        }
        self.accumulated_damage += damage;
        let whole = (self.accumulated_damage / self.hp_per_member).floor();
        let deaths = if whole >= self.population as f32 {
            self.population
        } else {
            whole as u32
        };
        self.population -= deaths;
        self.accumulated_damage -= deaths as f32 * self.hp_per_member;
        if self.population == 0 {
            self.accumulated_damage = 0.0;
        }
        deaths
    }

    /// Kill members outright (starvation), bypassing the damage counter
    pub fn kill(&mut self, count: u32) -> u32 {
        let removed = count.min(self.population);
        self.population -= removed;
        removed
    }

    /// Add members up to `max_members`, returns how many were added
    pub fn grow(&mut self, increment: u32) -> u32 {
        let added = increment.min(self.remaining_capacity());
        self.population += added;
        added
    }

    /// Blend a unit vector toward `target` into the velocity, then cap speed
    pub fn move_towards(&mut self, target: Vec2, strength: f32, max_speed: f32) {
        let offset = target - self.position;
        if offset.length_sq() <= 0.0 {
            return;
        }
        self.velocity += offset.normalize() * strength;
        let speed_sq = self.velocity.length_sq();
        if speed_sq > max_speed * max_speed {
            self.velocity = self.velocity * (max_speed / speed_sq.sqrt());
        }
    }

    /// Push away from `from`
    ///
    /// The offset is divided by at least `min_distance`, so near-coincident
    /// clans get a damped push instead of a huge one.
    pub fn move_away(&mut self, from: Vec2, strength: f32, max_speed: f32, min_distance: f32) {
        let offset = self.position - from;
        if offset.length_sq() <= 0.0 {
            return;
        }
        let dist = offset.length().max(min_distance);
        self.velocity += offset * (strength / dist);
        let speed_sq = self.velocity.length_sq();
        if speed_sq > max_speed * max_speed {
            self.velocity = self.velocity * (max_speed / speed_sq.sqrt());
        }
    }

    /// Eat `consumed` food units
    pub fn feed(&mut self, consumed: f32, config: &SimulationConfig) {
        let relief = (consumed * config.hunger_per_food).round().max(0.0) as u32;
        self.hunger_timer = self.hunger_timer.saturating_sub(relief);
        self.seeking_food = false;
        self.hp_per_member =
            (self.hp_per_member + consumed * config.hp_per_food).min(self.max_hp_per_member);
    }

    /// Advance one tick: hunger, translation, edge bounce, random heading, damping
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        ctx: &MoveContext,
        config: &SimulationConfig,
        rng: &mut R,
    ) -> Result<()> {
        self.validate()?;

        self.hunger_timer = self.hunger_timer.saturating_add(1);

        self.position += self.velocity * ctx.speed_factor();

        let margin = config
            .clan_edge_margin
            .min(ctx.width / 2.0)
            .min(ctx.height / 2.0)
            .max(0.0);
        bounce(&mut self.position.x, &mut self.velocity.x, margin, ctx.width - margin);
        bounce(&mut self.position.y, &mut self.velocity.y, margin, ctx.height - margin);

        if rng.gen::<f32>() < config.clan_heading_change_chance {
            let (lo, hi) = config.clan_speed_range;
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            self.velocity = Vec2::from_angle(angle, rng.gen_range(lo..=hi));
        }

        self.velocity = self.velocity * config.clan_damping;

        if self.hunger_timer >= self.hunger_threshold {
            self.seeking_food = true;
        }
        Ok(())
    }

    /// Re-roll temperature immunity when the day/night state has flipped
    pub fn refresh_immunity<R: Rng + ?Sized>(&mut self, is_day: bool, chance: f32, rng: &mut R) {
        if self.immunity_day_state != Some(is_day) {
            self.immunity_day_state = Some(is_day);
            self.temperature_immune = rng.gen::<f32>() < chance;
        }
    }
}
