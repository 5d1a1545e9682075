//! Per-step scalar reports for observers.

use crate::weather::WeatherReading;
use biome_core::{DayPhase, EntityType, SpeciesId};
use serde::Serialize;

/// Live individuals of one species
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesCount {
    pub species: SpeciesId,
    pub name: String,
    pub entity_type: EntityType,
    pub count: usize,
}

/// Snapshot taken at the end of a step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub step: u64,
    pub phase: DayPhase,
    pub day: u64,
    pub weather: WeatherReading,
    /// Counts in registry order, including species with no individuals
    pub populations: Vec<SpeciesCount>,
    pub total: usize,
    pub infected: usize,
    /// Every trophic level that has registered species still has at least
    /// one live individual
    pub viable: bool,
}

impl StepReport {
    pub fn phase_label(&self) -> &'static str {
        self.phase.label()
    }

    pub fn count_for(&self, species: SpeciesId) -> usize {
        self.populations
            .iter()
            .find(|entry| entry.species == species)
            .map_or(0, |entry| entry.count)
    }

    pub fn count_of(&self, name: &str) -> usize {
        self.populations
            .iter()
            .find(|entry| entry.name == name)
            .map_or(0, |entry| entry.count)
    }

    /// Total live individuals of one trophic level
    pub fn level_total(&self, entity_type: EntityType) -> usize {
        self.populations
            .iter()
            .filter(|entry| entry.entity_type == entity_type)
            .map(|entry| entry.count)
            .sum()
    }
}

/// A trophic level counts as extinct only if it has registered species and
/// none of them has a live individual.
pub(crate) fn is_viable(populations: &[SpeciesCount]) -> bool {
    EntityType::all().into_iter().all(|level| {
        let mut members = populations.iter().filter(|entry| entry.entity_type == level).peekable();
        members.peek().is_none() || members.any(|entry| entry.count > 0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(id: u32, entity_type: EntityType, count: usize) -> SpeciesCount {
        SpeciesCount {
            species: SpeciesId(id),
            name: format!("s{id}"),
            entity_type,
            count,
        }
    }

    #[test]
    fn test_viability() {
        let populations = vec![
            count(0, EntityType::Plant, 5),
            count(1, EntityType::Prey, 0),
            count(2, EntityType::Prey, 2),
        ];
        assert!(is_viable(&populations));

        let populations = vec![count(0, EntityType::Plant, 5), count(1, EntityType::Predator, 0)];
        assert!(!is_viable(&populations));

        assert!(is_viable(&[]));
    }
}
