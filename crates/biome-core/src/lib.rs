//! Core types and utilities for the biome ecosystem simulation.

pub mod types;
pub mod config;
pub mod error;
pub mod rng;
pub mod species;

pub use error::{Error, Result};
pub use types::*;
pub use config::*;
pub use rng::{Randomizer, DEFAULT_SEED};
pub use species::*;
