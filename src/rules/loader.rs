//! Load the species table and simulation config from TOML files

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::rules::species::{RegionConfig, SpeciesConfig, SpeciesTable};

/// The species table shipped with the crate
const DEFAULT_SPECIES_TOML: &str = include_str!("../../data/species.toml");

#[derive(Debug, Deserialize)]
struct SpeciesFile {
    #[serde(default)]
    species: Vec<SpeciesConfig>,
    #[serde(default)]
    regions: Vec<RegionConfig>,
}

/// Parse a `[[species]]` / `[[regions]]` document
pub fn parse_species_table(content: &str) -> Result<SpeciesTable> {
    let file: SpeciesFile = toml::from_str(content)?;
    debug!(species = file.species.len(), regions = file.regions.len(), "parsed species table");
    SpeciesTable::new(file.species)?.with_regions(file.regions)
}

/// Load a species table from disk
pub fn load_species_table(path: &Path) -> Result<SpeciesTable> {
    let content = fs::read_to_string(path)?;
    let table = parse_species_table(&content)?;
    info!(path = %path.display(), species = table.len(), "loaded species table");
    Ok(table)
}

/// The built-in four-species table
pub fn default_species_table() -> Result<SpeciesTable> {
    parse_species_table(DEFAULT_SPECIES_TOML)
}

/// Parse a partial config; unspecified fields keep their defaults
pub fn parse_config(content: &str) -> Result<SimulationConfig> {
    let config: SimulationConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<SimulationConfig> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    info!(path = %path.display(), "loaded simulation config");
    Ok(config)
}
