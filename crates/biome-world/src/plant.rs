//! Plant state and per-step behavior.
//!
//! Plants only act in daylight. They lose or gain water and sunlight
//! depending on the weather, grow a level when both reserves are high, and
//! seed the free cells around them once mature. A lethal event costs a
//! plant one growth level; only a plant at level zero is removed.

use crate::context::StepContext;
use crate::organism::{litter_size, Body, DeathCause, Organism};
use serde::Serialize;
use tracing::trace;

/// Reserves of a freshly seeded plant
pub const SEEDLING_WATER: i32 = 8;
pub const SEEDLING_SUNLIGHT: i32 = 8;

/// Downfall and visibility below this drain a plant, at or above it feed it
pub const WEATHER_THRESHOLD: i32 = 10;

pub const GROWTH_SUNLIGHT_THRESHOLD: i32 = 10;
pub const GROWTH_WATER_THRESHOLD: i32 = 12;

/// Reserves left after spending the rest on a new level
pub const GROWTH_WATER_RESERVE: i32 = 3;
pub const GROWTH_SUNLIGHT_RESERVE: i32 = 2;

/// Plants above this level produce seedlings
pub const REPRODUCTION_LEVEL: u32 = 2;
pub const MAX_SEEDLINGS: u32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantState {
    pub current_level: u32,
    pub water_level: i32,
    pub sunlight_level: i32,
}

impl PlantState {
    pub fn new(level: u32) -> Self {
        Self {
            current_level: level,
            water_level: SEEDLING_WATER,
            sunlight_level: SEEDLING_SUNLIGHT,
        }
    }
}

pub(crate) fn act(actor: &mut Organism, ctx: &mut StepContext<'_>) {
    let registry = ctx.registry;
    let Some(descriptor) = registry.get(actor.species) else {
        return;
    };
    let Some(stats) = descriptor.plant() else {
        return;
    };

    actor.age_steps += 1;
    if !ctx.environment.phase.is_day() {
        return;
    }

    let weather = ctx.environment.weather;
    let starving = {
        let Body::Plant(state) = &mut actor.body else {
            return;
        };
        // A live edit may have lowered the ceiling below the current level.
        state.current_level = state.current_level.min(stats.max_level);

        let water_delta = if weather.downfall < WEATHER_THRESHOLD { -1 } else { 1 };
        let sunlight_delta = if weather.visibility < WEATHER_THRESHOLD { -1 } else { 1 };
        state.water_level = (state.water_level + water_delta).max(0);
        state.sunlight_level = (state.sunlight_level + sunlight_delta).max(0);
        state.water_level == 0 || state.sunlight_level == 0
    };

    if starving && actor.lethal_event(ctx.population.field_mut()) {
        trace!(
            event = "organism_death",
            organism_id = %actor.id,
            species = descriptor.name(),
            cause = %DeathCause::Withered,
            "Plant withered away"
        );
        return;
    }

    let Body::Plant(state) = &mut actor.body else {
        return;
    };
    if state.sunlight_level > GROWTH_SUNLIGHT_THRESHOLD
        && state.water_level > GROWTH_WATER_THRESHOLD
        && state.current_level < stats.max_level
    {
        state.current_level += 1;
        state.water_level = GROWTH_WATER_RESERVE;
        state.sunlight_level = GROWTH_SUNLIGHT_RESERVE;
    }

    if state.current_level > REPRODUCTION_LEVEL {
        seed(actor, descriptor.entity().breeding_probability, ctx);
    }
}

fn seed(actor: &Organism, breeding_probability: f64, ctx: &mut StepContext<'_>) {
    let Some(location) = actor.location() else {
        return;
    };
    let seedlings = litter_size(ctx.rng, breeding_probability, MAX_SEEDLINGS);
    if seedlings == 0 {
        return;
    }

    let free = ctx.population.field().free_adjacent_locations(location, ctx.rng);
    for cell in free.into_iter().take(seedlings) {
        let id = ctx.population.next_id();
        ctx.population
            .add_newborn(Organism::new_plant(id, actor.species, 1), cell);
    }
}
