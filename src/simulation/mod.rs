//! Per-tick systems and the engine that drives them

pub mod environment;
pub mod events;
pub mod exposure;
pub mod interaction;
pub mod population;
pub mod snapshot;
pub mod spawn;
pub mod stats;
pub mod tick;

pub use environment::EnvironmentController;
pub use events::{EventLog, LogEntry, LogEvent};
pub use interaction::InteractionReport;
pub use population::SpeciesPopulation;
pub use snapshot::WorldSnapshot;
pub use stats::{DeathCause, SimulationStats};
pub use tick::{FoodPlacement, SetupParams, Simulation};
