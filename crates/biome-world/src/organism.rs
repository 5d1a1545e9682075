//! Organism state shared by animals and plants.

use crate::animal::{self, AnimalState};
use crate::context::StepContext;
use crate::field::Field;
use crate::plant::{self, PlantState};
use biome_core::{age_in_days, AnimalStats, DiseaseId, Location, OrganismId, Randomizer, SpeciesId};
use serde::Serialize;
use std::fmt;

/// Why an organism was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeathCause {
    Starvation,
    Dehydration,
    OldAge,
    Overcrowding,
    Predation,
    Disease,
    Withered,
    Removed,
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Body {
    Animal(AnimalState),
    Plant(PlantState),
}

/// An individual in the simulation
#[derive(Debug, Clone, Serialize)]
pub struct Organism {
    pub id: OrganismId,
    pub species: SpeciesId,
    pub age_steps: u64,
    pub(crate) alive: bool,
    pub(crate) location: Option<Location>,
    pub infection: Option<DiseaseId>,
    pub body: Body,
}

impl Organism {
    pub fn new_animal(
        id: OrganismId,
        species: SpeciesId,
        stats: &AnimalStats,
        is_male: bool,
        age_steps: u64,
    ) -> Self {
        Self {
            id,
            species,
            age_steps,
            alive: true,
            location: None,
            infection: None,
            body: Body::Animal(AnimalState::new(stats, is_male)),
        }
    }

    pub fn new_plant(id: OrganismId, species: SpeciesId, level: u32) -> Self {
        Self {
            id,
            species,
            age_steps: 0,
            alive: true,
            location: None,
            infection: None,
            body: Body::Plant(PlantState::new(level)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }

    pub fn age_in_days(&self) -> f64 {
        age_in_days(self.age_steps)
    }

    pub fn is_infected(&self) -> bool {
        self.infection.is_some()
    }

    pub fn as_animal(&self) -> Option<&AnimalState> {
        match &self.body {
            Body::Animal(state) => Some(state),
            Body::Plant(_) => None,
        }
    }

    pub fn as_animal_mut(&mut self) -> Option<&mut AnimalState> {
        match &mut self.body {
            Body::Animal(state) => Some(state),
            Body::Plant(_) => None,
        }
    }

    pub fn as_plant(&self) -> Option<&PlantState> {
        match &self.body {
            Body::Plant(state) => Some(state),
            Body::Animal(_) => None,
        }
    }

    pub fn as_plant_mut(&mut self) -> Option<&mut PlantState> {
        match &mut self.body {
            Body::Plant(state) => Some(state),
            Body::Animal(_) => None,
        }
    }

    /// Run one step of this organism's behavior.
    pub fn act(&mut self, ctx: &mut StepContext<'_>) {
        if !self.alive {
            return;
        }
        if matches!(self.body, Body::Animal(_)) {
            animal::act(self, ctx);
        } else {
            plant::act(self, ctx);
        }
    }

    /// Mark the organism dead and free its cell.
    pub fn set_dead(&mut self, field: &mut Field) {
        self.alive = false;
        if let Some(location) = self.location.take() {
            if field.object_at(location) == Some(self.id) {
                field.clear(location);
            }
        }
    }

    /// Apply a lethal event. Animals die outright; plants lose one growth
    /// level and are only removed once the level reaches zero. Returns
    /// whether the organism is now dead.
    pub fn lethal_event(&mut self, field: &mut Field) -> bool {
        if let Body::Plant(state) = &mut self.body {
            state.current_level = state.current_level.saturating_sub(1);
            if state.current_level > 0 {
                return false;
            }
        }
        self.set_dead(field);
        true
    }
}

/// Litter size for one reproduction attempt: zero with probability
/// `1 - breeding_probability`, otherwise uniform in `[1, max_litter]`.
pub(crate) fn litter_size(rng: &mut Randomizer, breeding_probability: f64, max_litter: u32) -> usize {
    if !rng.chance(breeding_probability) {
        return 0;
    }
    rng.range_inclusive(1, max_litter.max(1)) as usize
}
