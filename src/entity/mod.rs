//! Entity models: food sources, solitary individuals and clans
//!
//! Entities own their per-tick physics (movement, edge bounce, hunger);
//! everything that involves more than one entity lives in `simulation`.

pub mod clan;
pub mod food_source;
pub mod individual;

pub use clan::Clan;
pub use food_source::FoodSource;
pub use individual::Individual;

use serde::{Deserialize, Serialize};

use crate::core::types::{Color, SpeciesId};

/// Species-level stats every member of a species starts from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTraits {
    pub species: SpeciesId,
    pub color: Color,
    pub max_members: u32,
    pub hp: f32,
    pub food_intake: f32,
    pub can_cannibalize: bool,
}

/// Per-tick movement parameters shared by every entity of one kind
#[derive(Debug, Clone, Copy)]
pub struct MoveContext {
    pub width: f32,
    pub height: f32,
    /// 1.0 by day, the night modifier by night
    pub day_factor: f32,
    /// Global multiplier times the species multiplier
    pub speed_multiplier: f32,
}

impl MoveContext {
    pub fn speed_factor(&self) -> f32 {
        self.day_factor * self.speed_multiplier
    }
}

/// Reflect a coordinate into `[min, max]`, flipping its velocity component
pub(crate) fn bounce(pos: &mut f32, vel: &mut f32, min: f32, max: f32) {
    if *pos < min {
        *pos = min;
        *vel = vel.abs();
    } else if *pos > max {
        *pos = max;
        *vel = -vel.abs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounce_reflects_outward_velocity() {
        let (mut p, mut v) = (-3.0, -1.5);
        bounce(&mut p, &mut v, 0.0, 10.0);
        assert_eq!((p, v), (0.0, 1.5));

        let (mut p, mut v) = (12.0, 2.0);
        bounce(&mut p, &mut v, 0.0, 10.0);
        assert_eq!((p, v), (10.0, -2.0));

        let (mut p, mut v) = (5.0, -2.0);
        bounce(&mut p, &mut v, 0.0, 10.0);
        assert_eq!((p, v), (5.0, -2.0));
    }
}
