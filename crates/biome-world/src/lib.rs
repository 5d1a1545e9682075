//! Ecosystem simulation engine.
//!
//! This crate implements the bounded grid where plants, prey and predators
//! live, feed, breed and die under a day/night cycle, rotating seasons and
//! optional disease outbreaks.

pub mod animal;
pub mod context;
pub mod disease;
pub mod field;
pub mod organism;
pub mod plant;
pub mod registry;
pub mod report;
pub mod simulation;
pub mod weather;

pub use animal::AnimalState;
pub use context::{Environment, Population, StepContext};
pub use disease::Disease;
pub use field::Field;
pub use organism::{Body, DeathCause, Organism};
pub use plant::PlantState;
pub use registry::SpeciesRegistry;
pub use report::{SpeciesCount, StepReport};
pub use simulation::{CellView, Clock, Simulator};
pub use weather::{Season, SeasonProfile, SeasonTable, Weather, WeatherReading};
