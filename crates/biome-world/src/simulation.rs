//! Simulation driver: owns the field, organisms, species and environment and
//! advances them one step at a time.

use crate::context::{Environment, Population, StepContext};
use crate::disease::Disease;
use crate::organism::Organism;
use crate::registry::SpeciesRegistry;
use crate::report::{is_viable, SpeciesCount, StepReport};
use crate::weather::{SeasonTable, Weather};
use biome_core::{
    DayPhase, DiseaseConfig, DiseaseId, Error, Location, OrganismId, Randomizer, Result, RunId,
    ScenarioConfig, SimulationConfig, SpeciesDescriptor, SpeciesDraft, SpeciesId, StatField,
};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Step counter and day/night cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    step: u64,
    phase: DayPhase,
    day: u64,
    day_length: u64,
}

impl Clock {
    pub fn new(day_length: u64) -> Self {
        Self {
            step: 0,
            phase: DayPhase::Day,
            day: 1,
            day_length: day_length.max(1),
        }
    }

    /// Advance one step. Returns whether the phase flipped.
    pub fn tick(&mut self) -> bool {
        self.step += 1;
        if self.step % self.day_length != 0 {
            return false;
        }
        self.phase = self.phase.flip();
        if self.phase.is_day() {
            self.day += 1;
        }
        true
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn phase(&self) -> DayPhase {
        self.phase
    }

    pub fn day(&self) -> u64 {
        self.day
    }
}

/// Read-only view of one occupied cell
#[derive(Debug, Clone, Copy)]
pub struct CellView<'a> {
    pub organism: &'a Organism,
    pub descriptor: &'a SpeciesDescriptor,
    pub alive: bool,
    pub infected: bool,
}

pub struct Simulator {
    config: SimulationConfig,
    run_id: RunId,
    population: Population,
    registry: SpeciesRegistry,
    diseases: Vec<Disease>,
    /// Outbreaks to seed again on reset
    outbreaks: Vec<DiseaseConfig>,
    weather: Weather,
    rng: Randomizer,
    clock: Clock,
    running: bool,
    last_report: StepReport,
}

impl Simulator {
    /// Build an empty simulator. Call [`Simulator::populate`] to fill the
    /// field.
    pub fn new(mut config: SimulationConfig, registry: SpeciesRegistry) -> Self {
        if config.sanitize() {
            warn!(
                event = "config_fallback",
                depth = config.depth,
                width = config.width,
                day_length = config.day_length,
                "Invalid simulation parameters replaced with defaults"
            );
        }

        let mut sim = Self {
            population: Population::new(config.depth, config.width),
            rng: Randomizer::new(config.seed),
            clock: Clock::new(config.day_length),
            weather: Weather::default(),
            run_id: RunId::new(),
            registry,
            diseases: Vec::new(),
            outbreaks: Vec::new(),
            running: false,
            last_report: StepReport {
                step: 0,
                phase: DayPhase::Day,
                day: 1,
                weather: Weather::default().reading(),
                populations: Vec::new(),
                total: 0,
                infected: 0,
                viable: true,
            },
            config,
        };
        sim.last_report = sim.report();
        sim
    }

    /// Replace the season table. Only meaningful before the first step.
    pub fn with_weather(mut self, table: SeasonTable) -> Self {
        self.weather = Weather::new(table);
        self.last_report = self.report();
        self
    }

    /// Register the scenario's species, populate the field and seed its
    /// outbreaks.
    pub fn from_scenario(scenario: ScenarioConfig) -> Result<Self> {
        let registry = SpeciesRegistry::from_drafts(scenario.species)?;
        let mut sim = Self::new(scenario.simulation, registry);
        sim.populate();
        for disease in scenario.diseases {
            sim.introduce_disease(disease)?;
        }
        Ok(sim)
    }

    pub fn depth(&self) -> i32 {
        self.population.field().depth()
    }

    pub fn width(&self) -> i32 {
        self.population.field().width()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    pub fn step_count(&self) -> u64 {
        self.clock.step()
    }

    pub fn phase(&self) -> DayPhase {
        self.clock.phase()
    }

    pub fn day(&self) -> u64 {
        self.clock.day()
    }

    pub fn weather(&self) -> &Weather {
        &self.weather
    }

    pub fn last_report(&self) -> &StepReport {
        &self.last_report
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn registry(&self) -> &SpeciesRegistry {
        &self.registry
    }

    /// Live descriptor for tuning. Changes apply to existing individuals
    /// immediately, except diets which are copied at birth.
    pub fn species_mut(&mut self, id: SpeciesId) -> Option<&mut SpeciesDescriptor> {
        self.registry.get_mut(id)
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn organisms(&self) -> impl Iterator<Item = &Organism> + '_ {
        self.population.iter()
    }

    pub fn organism(&self, id: OrganismId) -> Option<&Organism> {
        self.population.get(id)
    }

    pub fn organism_mut(&mut self, id: OrganismId) -> Option<&mut Organism> {
        self.population.get_mut(id)
    }

    pub fn cell(&self, location: Location) -> Option<CellView<'_>> {
        let organism = self.population.at(location)?;
        let descriptor = self.registry.get(organism.species)?;
        Some(CellView {
            organism,
            descriptor,
            alive: organism.is_alive(),
            infected: organism.is_infected(),
        })
    }

    pub fn diseases(&self) -> &[Disease] {
        &self.diseases
    }

    pub fn disease(&self, id: DiseaseId) -> Option<&Disease> {
        self.diseases.iter().find(|disease| disease.id() == id)
    }

    pub fn disease_mut(&mut self, id: DiseaseId) -> Option<&mut Disease> {
        self.diseases.iter_mut().find(|disease| disease.id() == id)
    }

    fn ensure_paused(&self, action: &str) -> Result<()> {
        if self.running {
            return Err(Error::InvalidState(format!(
                "cannot {action} while the simulation is running"
            )));
        }
        Ok(())
    }

    /// Fill the field from scratch. Each cell gets at most one individual:
    /// enabled species are tried in registry order and the first successful
    /// roll on its creation probability takes the cell.
    pub fn populate(&mut self) {
        self.population.clear();
        self.run_id = RunId::new();

        let candidates: Vec<&SpeciesDescriptor> =
            self.registry.iter().filter(|descriptor| descriptor.is_enabled()).collect();
        let locations: Vec<Location> = self.population.field().locations().collect();
        for location in locations {
            for descriptor in &candidates {
                if self.rng.chance(descriptor.entity().creation_probability) {
                    let organism = spawn(&mut self.population, descriptor, &mut self.rng, true);
                    self.population.insert(organism, location);
                    break;
                }
            }
        }

        self.last_report = self.report();
        info!(
            event = "field_populated",
            run_id = %self.run_id,
            seed = self.rng.seed(),
            depth = self.depth(),
            width = self.width(),
            total = self.last_report.total,
            "Field populated"
        );
    }

    /// Restart the run: rewind the random stream, reset clock and weather,
    /// repopulate and seed the configured outbreaks again.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_paused("reset")?;
        self.rng.rewind();
        self.clock = Clock::new(self.config.day_length);
        self.weather.reset();
        self.diseases.clear();
        self.populate();

        let outbreaks = self.outbreaks.clone();
        for config in &outbreaks {
            if let Err(err) = self.seed_outbreak(config) {
                warn!(
                    event = "outbreak_skipped",
                    main_host = %config.main_host,
                    error = %err,
                    "Could not seed outbreak after reset"
                );
            }
        }
        self.last_report = self.report();
        Ok(())
    }

    /// Restart the random stream from `seed`, or the default seed. A
    /// following reset reproduces the run exactly.
    pub fn reseed(&mut self, seed: Option<u64>) -> Result<()> {
        self.ensure_paused("reseed")?;
        self.rng.reseed(seed);
        self.config.seed = self.rng.seed();
        debug!(event = "reseeded", seed = self.config.seed, "Random source reseeded");
        Ok(())
    }

    /// Drive `steps` steps and return the last report. The running flag is
    /// held for the duration and restored to its previous value afterwards.
    #[instrument(skip(self), fields(run_id = %self.run_id))]
    pub fn run(&mut self, steps: u64) -> StepReport {
        let was_running = self.running;
        self.running = true;
        for _ in 0..steps {
            self.step();
        }
        self.running = was_running;
        self.last_report.clone()
    }

    /// Advance the clock and the weather, then let every live organism act
    /// once in creation order.
    pub fn step(&mut self) -> StepReport {
        if self.clock.tick() {
            debug!(
                event = "phase_change",
                step = self.clock.step(),
                phase = self.clock.phase().label(),
                day = self.clock.day(),
                "Day/night flipped"
            );
        }
        let weather = self.weather.advance(&mut self.rng);

        let mut ctx = StepContext {
            population: &mut self.population,
            registry: &self.registry,
            rng: &mut self.rng,
            environment: Environment {
                weather,
                phase: self.clock.phase(),
            },
        };

        let mut infections = 0;
        for id in ctx.population.ids() {
            let Some(mut organism) = ctx.population.take(id) else {
                continue;
            };
            organism.act(&mut ctx);

            if organism.is_alive() {
                if let Some(disease_id) = organism.infection {
                    if let Some(disease) = self.diseases.iter_mut().find(|d| d.id() == disease_id) {
                        infections += disease.activate(&organism, &mut ctx);
                    }
                }
            }
            ctx.population.restore(organism);
        }

        let dropped = self.population.sweep();
        let report = self.report();
        debug!(
            event = "step_complete",
            step = report.step,
            total = report.total,
            dropped,
            infections,
            "Step complete"
        );

        let interval = self.config.report_interval;
        if interval > 0 && report.step % interval == 0 {
            self.log_snapshot(&report);
        }
        if self.last_report.viable && !report.viable {
            warn!(
                event = "viability_lost",
                run_id = %self.run_id,
                step = report.step,
                "A trophic level has gone extinct"
            );
        }

        self.last_report = report.clone();
        report
    }

    fn log_snapshot(&self, report: &StepReport) {
        let counts: Vec<String> = report
            .populations
            .iter()
            .map(|entry| format!("{}={}", entry.name, entry.count))
            .collect();
        info!(
            event = "population_snapshot",
            run_id = %self.run_id,
            step = report.step,
            day = report.day,
            phase = report.phase_label(),
            season = %report.weather.season,
            visibility = report.weather.visibility,
            downfall = report.weather.downfall,
            total = report.total,
            infected = report.infected,
            viable = report.viable,
            populations = %counts.join(","),
            "Population snapshot"
        );
    }

    fn report(&self) -> StepReport {
        let mut counts: BTreeMap<SpeciesId, usize> = BTreeMap::new();
        let mut total = 0;
        let mut infected = 0;
        for organism in self.population.iter().filter(|organism| organism.is_alive()) {
            *counts.entry(organism.species).or_insert(0) += 1;
            total += 1;
            if organism.is_infected() {
                infected += 1;
            }
        }

        let populations: Vec<SpeciesCount> = self
            .registry
            .iter()
            .map(|descriptor| SpeciesCount {
                species: descriptor.id(),
                name: descriptor.name().to_string(),
                entity_type: descriptor.entity_type(),
                count: counts.get(&descriptor.id()).copied().unwrap_or(0),
            })
            .collect();

        StepReport {
            step: self.clock.step(),
            phase: self.clock.phase(),
            day: self.clock.day(),
            weather: self.weather.reading(),
            viable: is_viable(&populations),
            populations,
            total,
            infected,
        }
    }

    pub fn add_species(&mut self, draft: SpeciesDraft) -> Result<SpeciesId> {
        self.ensure_paused("add a species")?;
        let id = self.registry.add(draft)?;
        self.last_report = self.report();
        Ok(id)
    }

    /// Unregister a species, removing its individuals from the field and
    /// from every diet.
    pub fn remove_species(&mut self, id: SpeciesId) -> Result<SpeciesDescriptor> {
        self.ensure_paused("remove a species")?;
        let removed = self.registry.remove(id)?;
        let purged = self.population.purge_species(id);
        for organism in self.population.iter_mut() {
            if let Some(state) = organism.as_animal_mut() {
                state.prey.remove(&id);
            }
        }
        for disease in &mut self.diseases {
            disease.forget(id);
        }
        info!(
            event = "species_removed",
            species = removed.name(),
            purged,
            "Species removed from the run"
        );
        self.last_report = self.report();
        Ok(removed)
    }

    pub fn set_species_enabled(&mut self, id: SpeciesId, enabled: bool) -> Result<()> {
        self.registry.set_enabled(id, enabled)
    }

    pub fn reset_species(&mut self, id: SpeciesId) -> Result<()> {
        self.registry.reset(id)
    }

    pub fn reset_species_field(&mut self, id: SpeciesId, field: StatField) -> Result<()> {
        self.registry.reset_field(id, field)
    }

    /// Put a fresh individual of `species` at `location`. Whatever occupied
    /// the cell is removed from the run.
    pub fn place_individual(&mut self, species: SpeciesId, location: Location) -> Result<OrganismId> {
        self.ensure_paused("place an individual")?;
        if !self.population.field().contains(location) {
            return Err(Error::OutOfBounds(location));
        }
        let descriptor = self
            .registry
            .get(species)
            .ok_or_else(|| Error::NotFound(format!("{species}")))?;

        let organism = spawn(&mut self.population, descriptor, &mut self.rng, false);
        let id = organism.id;
        if let Some(evicted) = self.population.insert(organism, location) {
            debug!(event = "organism_replaced", organism_id = %evicted.id, %location, "Occupant replaced");
        }
        self.last_report = self.report();
        Ok(id)
    }

    pub fn remove_at(&mut self, location: Location) -> Result<Option<Organism>> {
        self.ensure_paused("remove an individual")?;
        if !self.population.field().contains(location) {
            return Err(Error::OutOfBounds(location));
        }
        let removed = self.population.remove_at(location);
        self.last_report = self.report();
        Ok(removed)
    }

    pub fn clear_field(&mut self) -> Result<()> {
        self.ensure_paused("clear the field")?;
        self.population.clear();
        self.last_report = self.report();
        Ok(())
    }

    /// Start an outbreak on a random live individual of the configured main
    /// host. The outbreak is seeded again on every reset.
    pub fn introduce_disease(&mut self, config: DiseaseConfig) -> Result<DiseaseId> {
        let id = self.seed_outbreak(&config)?;
        self.outbreaks.push(config);
        Ok(id)
    }

    fn seed_outbreak(&mut self, config: &DiseaseConfig) -> Result<DiseaseId> {
        let host_species = self
            .registry
            .by_name(&config.main_host)
            .map(SpeciesDescriptor::id)
            .ok_or_else(|| Error::NotFound(format!("host species {}", config.main_host)))?;

        let hosts: Vec<OrganismId> = self
            .population
            .iter()
            .filter(|organism| organism.is_alive() && organism.species == host_species)
            .map(|organism| organism.id)
            .collect();
        let host = *self.rng.choose(&hosts).ok_or_else(|| {
            Error::NotFound(format!("no live individual of {}", config.main_host))
        })?;

        let id = DiseaseId(self.diseases.len() as u32);
        if let Some(organism) = self.population.get_mut(host) {
            organism.infection = Some(id);
        }
        self.diseases.push(Disease::new(id, config, host_species));
        info!(
            event = "outbreak_started",
            run_id = %self.run_id,
            disease = id.0,
            host = %host,
            main_host = %config.main_host,
            "Disease introduced"
        );
        self.last_report = self.report();
        Ok(id)
    }
}

/// Create an individual of `descriptor`'s species. Mature individuals get a
/// random age (animals) or level (plants); fresh ones start at age 0 and
/// level 1.
fn spawn(
    population: &mut Population,
    descriptor: &SpeciesDescriptor,
    rng: &mut Randomizer,
    mature: bool,
) -> Organism {
    let id = population.next_id();
    match descriptor.animal() {
        Some(stats) => {
            let age = if mature {
                rng.range_inclusive(0, stats.max_age_steps() / 2)
            } else {
                0
            };
            Organism::new_animal(id, descriptor.id(), stats, rng.coin_flip(), age)
        }
        None => {
            let max_level = descriptor.plant().map_or(1, |plant| plant.max_level);
            let level = if mature { rng.range_inclusive(1, max_level) } else { 1 };
            Organism::new_plant(id, descriptor.id(), level)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biome_core::EntityType;

    fn small_config(seed: u64) -> SimulationConfig {
        SimulationConfig {
            depth: 20,
            width: 20,
            seed,
            ..Default::default()
        }
    }

    fn populated(seed: u64) -> Simulator {
        let registry = SpeciesRegistry::with_defaults().unwrap();
        let mut sim = Simulator::new(small_config(seed), registry);
        sim.populate();
        sim
    }

    #[test]
    fn test_clock_cycle() {
        let mut clock = Clock::new(2);
        assert!(!clock.tick());
        assert!(clock.tick());
        assert_eq!(clock.phase(), DayPhase::Night);
        assert_eq!(clock.day(), 1);
        clock.tick();
        assert!(clock.tick());
        assert_eq!(clock.phase(), DayPhase::Day);
        assert_eq!(clock.day(), 2);
        assert_eq!(clock.step(), 4);
    }

    #[test]
    fn test_invalid_dimensions_fall_back() {
        let config = SimulationConfig {
            depth: 0,
            width: -3,
            ..Default::default()
        };
        let sim = Simulator::new(config, SpeciesRegistry::with_defaults().unwrap());
        assert_eq!(sim.depth(), biome_core::DEFAULT_DEPTH);
        assert_eq!(sim.width(), biome_core::DEFAULT_WIDTH);
    }

    #[test]
    fn test_populate_respects_occupancy() {
        let sim = populated(7);
        assert!(sim.last_report().total > 0);
        assert_eq!(sim.last_report().total, sim.population().field().occupied_count());
        for organism in sim.organisms() {
            let location = organism.location().unwrap();
            assert_eq!(sim.population().field().object_at(location), Some(organism.id));
        }
    }

    #[test]
    fn test_disabled_species_not_populated() {
        let mut registry = SpeciesRegistry::with_defaults().unwrap();
        let fox = registry.by_name("Fox").unwrap().id();
        registry.set_enabled(fox, false).unwrap();
        let mut sim = Simulator::new(small_config(3), registry);
        sim.populate();
        assert_eq!(sim.last_report().count_for(fox), 0);
    }

    #[test]
    fn test_step_advances_clock_and_weather() {
        let mut sim = populated(11);
        let report = sim.step();
        assert_eq!(report.step, 1);
        assert_eq!(report.day, 1);
        assert_eq!(report.weather.season, crate::weather::Season::Winter);
        assert_eq!(sim.last_report(), &report);
    }

    #[test]
    fn test_structural_edits_rejected_while_running() {
        let mut sim = populated(5);
        sim.start();
        let grass = sim.registry().by_name("Grass").unwrap().id();
        assert!(matches!(sim.remove_species(grass), Err(Error::InvalidState(_))));
        assert!(matches!(sim.clear_field(), Err(Error::InvalidState(_))));
        assert!(matches!(
            sim.place_individual(grass, Location::new(0, 0)),
            Err(Error::InvalidState(_))
        ));
        sim.pause();
        assert!(sim.remove_species(grass).is_ok());
    }

    #[test]
    fn test_remove_species_purges_individuals() {
        let mut sim = populated(9);
        let rabbit = sim.registry().by_name("Rabbit").unwrap().id();
        assert!(sim.last_report().count_for(rabbit) > 0);

        sim.remove_species(rabbit).unwrap();
        assert_eq!(sim.organisms().filter(|o| o.species == rabbit).count(), 0);
        assert!(sim
            .organisms()
            .filter_map(Organism::as_animal)
            .all(|state| !state.prey.contains(&rabbit)));
        assert_eq!(sim.last_report().total, sim.population().field().occupied_count());
    }

    #[test]
    fn test_place_and_remove_individual() {
        let mut sim = Simulator::new(small_config(1), SpeciesRegistry::with_defaults().unwrap());
        let fox = sim.registry().by_name("Fox").unwrap().id();
        let grass = sim.registry().by_name("Grass").unwrap().id();

        let first = sim.place_individual(grass, Location::new(2, 2)).unwrap();
        let second = sim.place_individual(fox, Location::new(2, 2)).unwrap();
        assert!(sim.organism(first).is_none());

        let cell = sim.cell(Location::new(2, 2)).unwrap();
        assert_eq!(cell.organism.id, second);
        assert_eq!(cell.descriptor.entity_type(), EntityType::Predator);
        assert!(cell.alive);

        assert!(matches!(
            sim.place_individual(fox, Location::new(20, 0)),
            Err(Error::OutOfBounds(_))
        ));
        assert!(matches!(
            sim.place_individual(SpeciesId(77), Location::new(0, 0)),
            Err(Error::NotFound(_))
        ));

        let removed = sim.remove_at(Location::new(2, 2)).unwrap().unwrap();
        assert_eq!(removed.id, second);
        assert!(sim.cell(Location::new(2, 2)).is_none());
        assert_eq!(sim.last_report().total, 0);
    }

    #[test]
    fn test_reset_reproduces_run() {
        let mut sim = populated(21);
        let first: Vec<StepReport> = (0..30).map(|_| sim.step()).collect();
        sim.reset().unwrap();
        assert_eq!(sim.step_count(), 0);
        let second: Vec<StepReport> = (0..30).map(|_| sim.step()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reseed_defaults() {
        let mut sim = populated(21);
        sim.reseed(None).unwrap();
        assert_eq!(sim.seed(), biome_core::DEFAULT_SEED);
        sim.reseed(Some(99)).unwrap();
        assert_eq!(sim.seed(), 99);
    }

    #[test]
    fn test_introduce_disease() {
        let mut sim = populated(13);
        let id = sim.introduce_disease(DiseaseConfig::default()).unwrap();
        assert_eq!(sim.last_report().infected, 1);
        let host = sim.organisms().find(|o| o.is_infected()).unwrap();
        assert_eq!(sim.registry().get(host.species).unwrap().name(), "Rabbit");
        assert!(sim.disease(id).unwrap().is_spreading());

        let missing = DiseaseConfig {
            main_host: "Unicorn".to_string(),
            ..Default::default()
        };
        assert!(matches!(sim.introduce_disease(missing), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_run_clears_running_flag() {
        let mut sim = populated(4);
        let report = sim.run(5);
        assert_eq!(report.step, 5);
        assert!(!sim.is_running());
    }

    #[test]
    fn test_run_keeps_a_started_simulation_running() {
        let mut sim = populated(4);
        sim.start();
        let report = sim.run(3);
        assert_eq!(report.step, 3);
        assert!(sim.is_running());
        assert!(matches!(sim.clear_field(), Err(Error::InvalidState(_))));

        sim.pause();
        assert!(sim.clear_field().is_ok());
    }
}
