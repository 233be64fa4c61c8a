use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Species table is empty")]
    EmptySpeciesTable,

    #[error("Species defined twice: {0}")]
    DuplicateSpecies(String),

    #[error("Unknown species: {0}")]
    UnknownSpecies(String),

    #[error("Invalid species {species}: {reason}")]
    InvalidSpecies { species: String, reason: String },

    #[error("Invalid {kind} state: {reason}")]
    InvalidEntityState { kind: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
