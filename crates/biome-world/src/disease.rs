//! Contagious disease carried by infected organisms.
//!
//! A `Disease` is one outbreak shared by all of its hosts. Every time a live
//! host acts, the outbreak records contacts with the species around it and,
//! while its infection period lasts, may jump to susceptible neighbors. A
//! species only becomes susceptible after [`EXPOSURE_THRESHOLD`] recorded
//! contacts; the counters never decay.

use crate::context::StepContext;
use crate::organism::{DeathCause, Organism};
use biome_core::{DiseaseConfig, DiseaseId, OrganismId, SpeciesId};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::trace;

/// Contacts a species needs before it can catch the disease
pub const EXPOSURE_THRESHOLD: u32 = 10;

/// Reduction of the outbreak chance per unit of downfall
pub const DOWNFALL_DAMPING: f64 = 0.04;

#[derive(Debug, Clone, Serialize)]
pub struct Disease {
    id: DiseaseId,
    pub spread_rate: f64,
    pub deadliness: f64,
    pub infection_period: u32,
    main_host: SpeciesId,
    contacts: BTreeMap<SpeciesId, u32>,
}

impl Disease {
    pub fn new(id: DiseaseId, config: &DiseaseConfig, main_host: SpeciesId) -> Self {
        Self {
            id,
            spread_rate: config.spread_rate,
            deadliness: config.deadliness,
            infection_period: config.infection_period,
            main_host,
            contacts: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> DiseaseId {
        self.id
    }

    pub fn main_host(&self) -> SpeciesId {
        self.main_host
    }

    /// Whether new infections can still originate from this outbreak
    pub fn is_spreading(&self) -> bool {
        self.infection_period > 0
    }

    pub fn record_contact(&mut self, species: SpeciesId) {
        *self.contacts.entry(species).or_insert(0) += 1;
    }

    pub fn contacts(&self, species: SpeciesId) -> u32 {
        self.contacts.get(&species).copied().unwrap_or(0)
    }

    pub fn is_susceptible(&self, species: SpeciesId) -> bool {
        self.contacts(species) >= EXPOSURE_THRESHOLD
    }

    /// Forget a species entirely, e.g. after it was unregistered
    pub(crate) fn forget(&mut self, species: SpeciesId) {
        self.contacts.remove(&species);
    }

    /// Run one activation for `host`. Returns the number of new infections.
    pub fn activate(&mut self, host: &Organism, ctx: &mut StepContext<'_>) -> usize {
        let mut infected = 0;
        if let Some(location) = host.location() {
            let neighbors: Vec<OrganismId> = ctx
                .population
                .field()
                .occupied_adjacent_locations(location, ctx.rng)
                .into_iter()
                .filter_map(|neighbor| ctx.population.field().object_at(neighbor))
                .collect();

            for id in &neighbors {
                if let Some(species) = ctx.population.get(*id).map(|organism| organism.species) {
                    self.record_contact(species);
                }
            }

            let downfall = ctx.environment.weather.downfall as f64;
            if self.is_spreading() && ctx.rng.chance(self.spread_rate - DOWNFALL_DAMPING * downfall) {
                for id in neighbors {
                    if self.infect(id, ctx) {
                        infected += 1;
                    }
                }
            }
        }

        self.infection_period = self.infection_period.saturating_sub(1);
        infected
    }

    fn infect(&self, id: OrganismId, ctx: &mut StepContext<'_>) -> bool {
        let Some(target) = ctx.population.get_mut(id) else {
            return false;
        };
        if !target.is_alive() || target.is_infected() || !self.is_susceptible(target.species) {
            return false;
        }
        if !ctx.rng.chance(self.spread_rate) {
            return false;
        }

        target.infection = Some(self.id);
        trace!(
            event = "infection",
            organism_id = %id,
            species = %target.species,
            disease = self.id.0,
            "Organism infected"
        );
        if ctx.rng.chance(self.deadliness) {
            ctx.population.strike(id, DeathCause::Disease);
        }
        true
    }
}
