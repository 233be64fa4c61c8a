//! Astras - agent-based ecosystem simulation
//!
//! Species live as clans (groups moving as one) and solitary individuals on
//! a 2D map. They forage, hunt, cannibalize, band together and split under a
//! day/night cycle and drifting temperature.

pub mod core;
pub mod entity;
pub mod rules;
pub mod simulation;
pub mod spatial;

pub use crate::core::config::SimulationConfig;
pub use crate::core::error::{Result, SimError};
pub use crate::rules::{default_species_table, SpeciesConfig, SpeciesTable};
pub use crate::simulation::{SetupParams, Simulation, WorldSnapshot};
