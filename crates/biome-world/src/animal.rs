//! Animal state and per-step behavior.
//!
//! One behavior serves every animal species; the differences between a fox
//! and a mouse live entirely in their [`AnimalStats`] descriptors.
//!
//! Step order for an animal:
//! 1. when active, thirst and hunger tick down (either reaching zero kills);
//! 2. age advances on every step, active or not;
//! 3. the breed cooldown ticks down on every step;
//! 4. drink from the current downfall, active or not;
//! 5. when active and rested, try to mate with a neighbor;
//! 6. when active, eat an adjacent prey or move, or die of overcrowding
//!    when boxed in.

use crate::context::StepContext;
use crate::organism::{litter_size, Body, DeathCause, Organism};
use biome_core::{AnimalStats, DayPhase, Location, OrganismId, SpeciesDescriptor, SpeciesId};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::trace;

/// Steps a pair must wait after mating before breeding again
pub const BREEDING_COOLDOWN: i32 = 10;

/// Upper bound on an animal's water reserve
pub const MAX_WATER_LEVEL: i32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimalState {
    pub is_male: bool,
    /// Set on mating, cleared once the breed counter runs out
    pub is_pregnant: bool,
    pub breed_counter: i32,
    pub food_level: i32,
    pub water_level: i32,
    /// Species this individual may eat
    pub prey: BTreeSet<SpeciesId>,
}

impl AnimalState {
    pub fn new(stats: &AnimalStats, is_male: bool) -> Self {
        Self {
            is_male,
            is_pregnant: false,
            breed_counter: 0,
            food_level: stats.hunger_value as i32,
            water_level: MAX_WATER_LEVEL,
            prey: stats.diet.clone(),
        }
    }
}

/// Whether a species is awake in the given phase
pub fn is_active(is_nocturnal: bool, phase: DayPhase) -> bool {
    let is_day = phase.is_day();
    (is_day && !is_nocturnal) || (!is_day && is_nocturnal)
}

fn state(actor: &mut Organism) -> &mut AnimalState {
    match &mut actor.body {
        Body::Animal(state) => state,
        Body::Plant(_) => unreachable!("animal behavior invoked on a plant"),
    }
}

fn die(actor: &mut Organism, ctx: &mut StepContext<'_>, cause: DeathCause) {
    trace!(
        event = "organism_death",
        organism_id = %actor.id,
        species = %actor.species,
        age_steps = actor.age_steps,
        cause = %cause,
        "Animal died"
    );
    actor.set_dead(ctx.population.field_mut());
}

pub(crate) fn act(actor: &mut Organism, ctx: &mut StepContext<'_>) {
    let registry = ctx.registry;
    let Some(descriptor) = registry.get(actor.species) else {
        return;
    };
    let Some(stats) = descriptor.animal() else {
        return;
    };
    let active = is_active(stats.is_nocturnal, ctx.environment.phase);

    if active {
        let state = state(actor);
        state.water_level = (state.water_level - 1).max(0);
        state.food_level = (state.food_level - 1).max(0);
        if state.water_level == 0 {
            return die(actor, ctx, DeathCause::Dehydration);
        }
        if state.food_level == 0 {
            return die(actor, ctx, DeathCause::Starvation);
        }
    }

    actor.age_steps += 1;
    if stats.is_too_old(actor.age_steps) {
        return die(actor, ctx, DeathCause::OldAge);
    }

    let rested = {
        let state = state(actor);
        state.breed_counter = (state.breed_counter - 1).max(0);
        if state.breed_counter == 0 {
            state.is_pregnant = false;
        }
        state.breed_counter <= 0
    };

    let downfall = ctx.environment.weather.downfall;
    {
        let state = state(actor);
        state.water_level = (state.water_level + downfall).clamp(0, MAX_WATER_LEVEL);
    }

    if !active {
        return;
    }

    if rested && stats.can_breed_at(actor.age_steps) {
        breed(actor, descriptor, stats, ctx);
    }
    forage(actor, descriptor, ctx);
}

/// Look for a mate among the neighbors and, on success, produce a litter in
/// the free cells around the actor.
fn breed(actor: &mut Organism, descriptor: &SpeciesDescriptor, stats: &AnimalStats, ctx: &mut StepContext<'_>) {
    let Some(location) = actor.location() else {
        return;
    };
    let is_male = state(actor).is_male;

    let neighbors = ctx.population.field().adjacent_locations(location, ctx.rng);
    let mate_id = neighbors
        .iter()
        .filter_map(|neighbor| ctx.population.field().object_at(*neighbor))
        .find(|id| {
            ctx.population.get(*id).is_some_and(|candidate| {
                candidate.is_alive()
                    && candidate.species == actor.species
                    && stats.can_breed_at(candidate.age_steps)
                    && candidate.as_animal().is_some_and(|mate| mate.is_male != is_male)
            })
        });
    let Some(mate_id) = mate_id else {
        return;
    };
    let Some(mate) = ctx.population.get_mut(mate_id).and_then(Organism::as_animal_mut) else {
        return;
    };

    // The female carries the litter; when she is still recovering from the
    // last one the actor takes the flag instead.
    let own = match &mut actor.body {
        Body::Animal(state) => state,
        Body::Plant(_) => return,
    };
    let female_pregnant = if is_male { mate.is_pregnant } else { own.is_pregnant };
    if !female_pregnant {
        if is_male {
            mate.is_pregnant = true;
        } else {
            own.is_pregnant = true;
        }
    } else if !own.is_pregnant {
        own.is_pregnant = true;
    } else {
        return;
    }
    own.breed_counter = BREEDING_COOLDOWN;
    mate.breed_counter = BREEDING_COOLDOWN;

    let litter = litter_size(ctx.rng, descriptor.entity().breeding_probability, stats.max_litter_size);
    if litter == 0 {
        return;
    }
    let free = ctx.population.field().free_adjacent_locations(location, ctx.rng);
    let born = free.len().min(litter);
    for cell in free.into_iter().take(litter) {
        let id = ctx.population.next_id();
        let newborn = Organism::new_animal(id, actor.species, stats, ctx.rng.coin_flip(), 0);
        ctx.population.add_newborn(newborn, cell);
    }
    trace!(
        event = "litter_born",
        parent_id = %actor.id,
        mate_id = %mate_id,
        species = descriptor.name(),
        litter,
        born,
        "Animals bred"
    );
}

/// Eat an adjacent prey or move to a free cell. An animal with neither food
/// nor room around it dies.
fn forage(actor: &mut Organism, descriptor: &SpeciesDescriptor, ctx: &mut StepContext<'_>) {
    let Some(location) = actor.location() else {
        return;
    };

    if let Some((prey_location, food)) = hunt(actor, location, ctx) {
        state(actor).food_level = food;
        if let Some(prey_location) = prey_location {
            ctx.population.field_mut().place(actor, prey_location);
        }
        return;
    }

    match ctx.population.field().free_adjacent_location(location, ctx.rng) {
        Some(free) => {
            ctx.population.field_mut().place(actor, free);
        }
        None => {
            trace!(
                event = "overcrowded",
                organism_id = %actor.id,
                species = descriptor.name(),
                "No free cell to move to"
            );
            die(actor, ctx, DeathCause::Overcrowding);
        }
    }
}

/// Eat the first edible neighbor. Returns the cell the actor may move into
/// (if the prey left it) and the food gained.
fn hunt(actor: &Organism, location: Location, ctx: &mut StepContext<'_>) -> Option<(Option<Location>, i32)> {
    let prey_set = &actor.as_animal()?.prey;
    if prey_set.is_empty() {
        return None;
    }

    let neighbors = ctx.population.field().adjacent_locations(location, ctx.rng);
    for neighbor in neighbors {
        let Some(target) = ctx.population.at(neighbor) else {
            continue;
        };
        if !target.is_alive() || !prey_set.contains(&target.species) {
            continue;
        }
        let target_id: OrganismId = target.id;

        let food = match &target.body {
            Body::Plant(_) => ctx
                .registry
                .get(target.species)
                .and_then(SpeciesDescriptor::plant)
                .map(|plant| plant.food_value as i32)
                .unwrap_or(0),
            Body::Animal(prey) => prey.food_level,
        };

        let removed = ctx.population.strike(target_id, DeathCause::Predation);
        let vacated = removed.then_some(neighbor);
        return Some((vacated, food));
    }
    None
}
