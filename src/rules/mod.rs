//! Species rules loaded from TOML

pub mod species;
mod loader;

pub use loader::{
    default_species_table, load_config, load_species_table, parse_config, parse_species_table,
};
pub use species::{ColorValue, NativeBoost, RegionConfig, SpeciesConfig, SpeciesTable};
