//! Serializable per-tick view of the world

use serde::{Deserialize, Serialize};

use crate::core::types::{ClanId, Color, IndividualId, Tick};
use crate::simulation::events::LogEntry;
use crate::simulation::stats::SimulationStats;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClanView {
    pub id: ClanId,
    pub x: f32,
    pub y: f32,
    pub population: u32,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesView {
    pub name: String,
    pub color: Color,
    pub clans: Vec<ClanView>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndividualView {
    pub id: IndividualId,
    pub species: String,
    pub x: f32,
    pub y: f32,
    pub color: Color,
    pub hp: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoodView {
    pub x: f32,
    pub y: f32,
    pub amount: f32,
    pub max_amount: f32,
}

/// Everything a renderer needs for one frame
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: Tick,
    pub species: Vec<SpeciesView>,
    pub individuals: Vec<IndividualView>,
    pub food: Vec<FoodView>,
    pub is_day: bool,
    /// 0.0 is full night, 1.0 full day
    pub transition_progress: f32,
    pub temperature: f32,
    pub logs: Vec<LogEntry>,
    pub stats: SimulationStats,
}

impl WorldSnapshot {
    /// `(x, y, population)` for every clan, in species order
    pub fn clan_positions(&self) -> Vec<(f32, f32, u32)> {
        self.species
            .iter()
            .flat_map(|s| s.clans.iter().map(|c| (c.x, c.y, c.population)))
            .collect()
    }

    pub fn clan_count(&self) -> usize {
        self.species.iter().map(|s| s.clans.len()).sum()
    }

    pub fn total_clan_members(&self) -> u32 {
        self.species.iter().flat_map(|s| &s.clans).map(|c| c.population).sum()
    }

    pub fn to_json(&self) -> crate::core::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> crate::core::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
