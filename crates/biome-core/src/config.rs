//! Configuration types for the simulation.

use crate::rng::DEFAULT_SEED;
use crate::species::SpeciesDraft;
use crate::types::{Color, EntityType};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_DEPTH: i32 = 80;
pub const DEFAULT_WIDTH: i32 = 120;

/// Upper bound on the number of registered species
pub const MAX_SPECIES: usize = 12;

/// Engine parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of rows in the field
    pub depth: i32,
    /// Number of columns in the field
    pub width: i32,
    /// Seed of the shared random source
    pub seed: u64,
    /// Steps between day/night flips
    pub day_length: u64,
    /// Steps between population snapshots in the log
    pub report_interval: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            width: DEFAULT_WIDTH,
            seed: DEFAULT_SEED,
            day_length: 12,
            report_interval: 100,
        }
    }
}

impl SimulationConfig {
    /// Replace non-positive dimensions with the defaults, returning whether
    /// anything was substituted.
    pub fn sanitize(&mut self) -> bool {
        let mut substituted = false;
        if self.depth <= 0 {
            self.depth = DEFAULT_DEPTH;
            substituted = true;
        }
        if self.width <= 0 {
            self.width = DEFAULT_WIDTH;
            substituted = true;
        }
        if self.depth.checked_mul(self.width).is_none() {
            self.depth = DEFAULT_DEPTH;
            self.width = DEFAULT_WIDTH;
            substituted = true;
        }
        if self.day_length == 0 {
            self.day_length = SimulationConfig::default().day_length;
            substituted = true;
        }
        substituted
    }
}

/// Parameters of a disease outbreak
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseConfig {
    /// Chance to infect each susceptible neighbor (0.0 to 1.0)
    pub spread_rate: f64,
    /// Chance that an infection kills its new host (0.0 to 1.0)
    pub deadliness: f64,
    /// Activations during which the disease can still spread
    pub infection_period: u32,
    /// Name of the species the outbreak starts in
    pub main_host: String,
}

impl Default for DiseaseConfig {
    fn default() -> Self {
        Self {
            spread_rate: 0.3,
            deadliness: 0.2,
            infection_period: 200,
            main_host: "Rabbit".to_string(),
        }
    }
}

/// Everything needed to set up a run: engine parameters, species and
/// optional outbreaks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub simulation: SimulationConfig,
    pub species: Vec<SpeciesDraft>,
    pub diseases: Vec<DiseaseConfig>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            species: default_species(),
            diseases: Vec::new(),
        }
    }
}

impl ScenarioConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let scenario = Self::from_json(&contents)?;
        debug!(
            path = %path.display(),
            species = scenario.species.len(),
            diseases = scenario.diseases.len(),
            "Scenario loaded"
        );
        Ok(scenario)
    }
}

/// The built-in food web: two plants, two grazers and two hunters, one of
/// each animal pair active at night.
pub fn default_species() -> Vec<SpeciesDraft> {
    vec![
        SpeciesDraft::plant("Grass", Color::rgb(86, 170, 58), 0.08, 0.05, 6, 5),
        SpeciesDraft::plant("Berry Bush", Color::rgb(150, 40, 120), 0.04, 0.03, 9, 7),
        SpeciesDraft::animal(
            "Rabbit",
            EntityType::Prey,
            Color::rgb(180, 150, 110),
            0.06,
            0.35,
            2,
            20,
            4,
            12,
            false,
            &["Grass"],
        ),
        SpeciesDraft::animal(
            "Mouse",
            EntityType::Prey,
            Color::rgb(120, 120, 130),
            0.05,
            0.4,
            1,
            12,
            5,
            10,
            true,
            &["Berry Bush", "Grass"],
        ),
        SpeciesDraft::animal(
            "Fox",
            EntityType::Predator,
            Color::rgb(220, 110, 30),
            0.02,
            0.2,
            5,
            40,
            2,
            20,
            false,
            &["Rabbit", "Mouse"],
        ),
        SpeciesDraft::animal(
            "Owl",
            EntityType::Predator,
            Color::rgb(90, 60, 40),
            0.015,
            0.15,
            4,
            35,
            2,
            18,
            true,
            &["Mouse"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let config = SimulationConfig::default();
        assert_eq!(config.depth, 80);
        assert_eq!(config.width, 120);
        assert_eq!(config.seed, DEFAULT_SEED);

        let scenario = ScenarioConfig::default();
        assert_eq!(scenario.species.len(), 6);
        assert!(scenario.species.len() <= MAX_SPECIES);
        assert!(scenario.diseases.is_empty());
    }

    #[test]
    fn test_sanitize_substitutes_defaults() {
        let mut config = SimulationConfig {
            depth: 0,
            width: -4,
            ..Default::default()
        };
        assert!(config.sanitize());
        assert_eq!(config.depth, DEFAULT_DEPTH);
        assert_eq!(config.width, DEFAULT_WIDTH);

        let mut fine = SimulationConfig::default();
        assert!(!fine.sanitize());
    }

    #[test]
    fn test_sanitize_rejects_overflowing_area() {
        let mut config = SimulationConfig {
            depth: 50_000,
            width: 50_000,
            ..Default::default()
        };
        assert!(config.sanitize());
        assert_eq!(config.depth, DEFAULT_DEPTH);
        assert_eq!(config.width, DEFAULT_WIDTH);
    }

    #[test]
    fn test_scenario_from_partial_json() {
        let scenario = ScenarioConfig::from_json(
            r#"{"simulation": {"depth": 10, "width": 12}, "diseases": [
                {"spread_rate": 0.5, "deadliness": 0.1, "infection_period": 20, "main_host": "Mouse"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(scenario.simulation.depth, 10);
        assert_eq!(scenario.simulation.day_length, 12);
        assert_eq!(scenario.species.len(), 6);
        assert_eq!(scenario.diseases[0].main_host, "Mouse");
    }

    #[test]
    fn test_invalid_json_is_serialization_error() {
        let err = ScenarioConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, crate::Error::Serialization(_)));
    }
}
