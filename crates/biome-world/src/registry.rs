//! Registry of species descriptors for a run.

use biome_core::{
    default_species, DraftKind, Error, Result, SpeciesDescriptor, SpeciesDraft, SpeciesId,
    StatField, MAX_SPECIES,
};
use std::collections::BTreeSet;
use tracing::debug;

/// Registered species in registration order
#[derive(Debug, Clone, Default)]
pub struct SpeciesRegistry {
    species: Vec<SpeciesDescriptor>,
    next_id: u32,
}

impl SpeciesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in food web
    pub fn with_defaults() -> Result<Self> {
        Self::from_drafts(default_species())
    }

    /// Register drafts in order. Diets may only name species registered
    /// earlier in the list, or the species itself.
    pub fn from_drafts(drafts: impl IntoIterator<Item = SpeciesDraft>) -> Result<Self> {
        let mut registry = Self::new();
        for draft in drafts {
            registry.add(draft)?;
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn get(&self, id: SpeciesId) -> Option<&SpeciesDescriptor> {
        self.species.iter().find(|descriptor| descriptor.id() == id)
    }

    pub fn get_mut(&mut self, id: SpeciesId) -> Option<&mut SpeciesDescriptor> {
        self.species.iter_mut().find(|descriptor| descriptor.id() == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&SpeciesDescriptor> {
        self.species.iter().find(|descriptor| descriptor.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpeciesDescriptor> + '_ {
        self.species.iter()
    }

    /// Validate and register a new species.
    pub fn add(&mut self, draft: SpeciesDraft) -> Result<SpeciesId> {
        if self.species.len() >= MAX_SPECIES {
            return Err(Error::ResourceExhausted(format!(
                "at most {MAX_SPECIES} species can be registered"
            )));
        }
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::Validation("species name must not be empty".to_string()));
        }
        if self.by_name(&name).is_some() {
            return Err(Error::AlreadyExists(format!("species {name}")));
        }

        let id = SpeciesId(self.next_id);
        let diet = match &draft.kind {
            DraftKind::Animal { diet, .. } => self.resolve_diet(&name, id, diet)?,
            DraftKind::Plant { .. } => BTreeSet::new(),
        };

        let descriptor = SpeciesDraft { name, ..draft }.into_descriptor(id, diet)?;
        debug!(
            event = "species_registered",
            species = descriptor.name(),
            id = %id,
            entity_type = %descriptor.entity_type(),
            "Species registered"
        );
        self.species.push(descriptor);
        self.next_id += 1;
        Ok(id)
    }

    fn resolve_diet(&self, name: &str, id: SpeciesId, diet: &[String]) -> Result<BTreeSet<SpeciesId>> {
        diet.iter()
            .map(|prey| {
                if prey == name {
                    return Ok(id);
                }
                self.by_name(prey)
                    .map(SpeciesDescriptor::id)
                    .ok_or_else(|| Error::NotFound(format!("prey species {prey} of {name}")))
            })
            .collect()
    }

    /// Unregister a species and drop it from every diet. The last remaining
    /// species cannot be removed.
    pub fn remove(&mut self, id: SpeciesId) -> Result<SpeciesDescriptor> {
        let index = self
            .species
            .iter()
            .position(|descriptor| descriptor.id() == id)
            .ok_or_else(|| Error::NotFound(format!("{id}")))?;
        if self.species.len() == 1 {
            return Err(Error::Validation(
                "cannot remove the last remaining species".to_string(),
            ));
        }

        let removed = self.species.remove(index);
        for descriptor in &mut self.species {
            descriptor.remove_prey(id);
        }
        debug!(event = "species_removed", species = removed.name(), "Species removed");
        Ok(removed)
    }

    pub fn set_enabled(&mut self, id: SpeciesId, enabled: bool) -> Result<()> {
        self.require_mut(id)?.set_enabled(enabled);
        Ok(())
    }

    pub fn reset(&mut self, id: SpeciesId) -> Result<()> {
        self.require_mut(id)?.reset();
        Ok(())
    }

    pub fn reset_field(&mut self, id: SpeciesId, field: StatField) -> Result<()> {
        self.require_mut(id)?.reset_field(field)
    }

    pub fn require_mut(&mut self, id: SpeciesId) -> Result<&mut SpeciesDescriptor> {
        self.get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("{id}")))
    }
}
