//! Live organism collection and the per-step context handed to behaviors.

use crate::field::Field;
use crate::organism::{DeathCause, Organism};
use crate::registry::SpeciesRegistry;
use crate::weather::WeatherReading;
use biome_core::{DayPhase, Location, OrganismId, Randomizer, SpeciesId};
use std::collections::BTreeMap;
use tracing::trace;

/// Every organism in the run together with the field they occupy.
///
/// Organisms are keyed by id, and ids grow monotonically, so iterating the
/// map visits organisms oldest first. Offspring born during a step wait in a
/// separate nursery (already on the field) until the step's sweep is over.
#[derive(Debug, Clone)]
pub struct Population {
    field: Field,
    organisms: BTreeMap<OrganismId, Organism>,
    nursery: BTreeMap<OrganismId, Organism>,
    next_id: u64,
}

impl Population {
    pub fn new(depth: i32, width: i32) -> Self {
        Self {
            field: Field::new(depth, width),
            organisms: BTreeMap::new(),
            nursery: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut Field {
        &mut self.field
    }

    /// Hand out the next organism id
    pub fn next_id(&mut self) -> OrganismId {
        let id = OrganismId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Look up an organism, including offspring born this step
    pub fn get(&self, id: OrganismId) -> Option<&Organism> {
        self.organisms.get(&id).or_else(|| self.nursery.get(&id))
    }

    pub fn get_mut(&mut self, id: OrganismId) -> Option<&mut Organism> {
        match self.organisms.get_mut(&id) {
            Some(organism) => Some(organism),
            None => self.nursery.get_mut(&id),
        }
    }

    /// Occupant of a cell, if it is a known organism
    pub fn at(&self, location: Location) -> Option<&Organism> {
        self.field.object_at(location).and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.organisms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.organisms.is_empty()
    }

    /// Organisms in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Organism> + '_ {
        self.organisms.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Organism> + '_ {
        self.organisms.values_mut()
    }

    pub(crate) fn ids(&self) -> Vec<OrganismId> {
        self.organisms.keys().copied().collect()
    }

    /// Take an organism out of the collection while it acts. Its cell stays
    /// occupied.
    pub(crate) fn take(&mut self, id: OrganismId) -> Option<Organism> {
        self.organisms.remove(&id)
    }

    pub(crate) fn restore(&mut self, organism: Organism) {
        self.organisms.insert(organism.id, organism);
    }

    /// Add an organism at `location`. Anything already there is removed from
    /// the run and returned.
    pub fn insert(&mut self, mut organism: Organism, location: Location) -> Option<Organism> {
        let evicted = self.field.place(&mut organism, location);
        self.organisms.insert(organism.id, organism);

        let mut evicted = evicted.and_then(|id| {
            self.organisms
                .remove(&id)
                .or_else(|| self.nursery.remove(&id))
        })?;
        evicted.alive = false;
        evicted.location = None;
        Some(evicted)
    }

    /// Place a newborn on the field; it joins the collection at the next sweep.
    pub(crate) fn add_newborn(&mut self, mut organism: Organism, location: Location) {
        self.field.place(&mut organism, location);
        self.nursery.insert(organism.id, organism);
    }

    /// Apply a lethal event to another organism. Returns whether it died.
    pub fn strike(&mut self, id: OrganismId, cause: DeathCause) -> bool {
        let field = &mut self.field;
        let organism = match self.organisms.get_mut(&id) {
            Some(organism) => Some(organism),
            None => self.nursery.get_mut(&id),
        };
        let Some(organism) = organism else {
            return false;
        };
        let died = organism.lethal_event(field);
        if died {
            trace!(
                event = "organism_death",
                organism_id = %id,
                species = %organism.species,
                cause = %cause,
                "Organism died"
            );
        }
        died
    }

    /// Remove an organism from the field and the collection
    pub fn remove(&mut self, id: OrganismId) -> Option<Organism> {
        let mut organism = self
            .organisms
            .remove(&id)
            .or_else(|| self.nursery.remove(&id))?;
        organism.set_dead(&mut self.field);
        Some(organism)
    }

    pub fn remove_at(&mut self, location: Location) -> Option<Organism> {
        let id = self.field.object_at(location)?;
        self.remove(id)
    }

    /// Remove every individual of `species`, returning how many were removed
    pub fn purge_species(&mut self, species: SpeciesId) -> usize {
        let doomed: Vec<OrganismId> = self
            .organisms
            .values()
            .chain(self.nursery.values())
            .filter(|organism| organism.species == species)
            .map(|organism| organism.id)
            .collect();
        for id in &doomed {
            self.remove(*id);
        }
        doomed.len()
    }

    /// Drop dead organisms and admit the nursery. Returns how many dead
    /// organisms were dropped.
    pub(crate) fn sweep(&mut self) -> usize {
        let before = self.organisms.len();
        self.organisms.retain(|_, organism| organism.alive);
        let dropped = before - self.organisms.len();

        let newborns = std::mem::take(&mut self.nursery);
        self.organisms
            .extend(newborns.into_iter().filter(|(_, organism)| organism.alive));
        dropped
    }

    pub fn clear(&mut self) {
        self.organisms.clear();
        self.nursery.clear();
        self.field.clear_all();
    }
}

/// Environmental inputs for one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    pub weather: WeatherReading,
    pub phase: DayPhase,
}

/// Everything an organism may read or change while it acts
pub struct StepContext<'a> {
    pub population: &'a mut Population,
    pub registry: &'a SpeciesRegistry,
    pub rng: &'a mut Randomizer,
    pub environment: Environment,
}
