//! Species descriptors.
//!
//! A descriptor is the configuration shared by every individual of a
//! species. The live values are mutable at runtime (a UI can tweak them
//! mid-run and every individual picks the change up on its next action),
//! while the values captured at construction are kept as a separate,
//! immutable default record that the reset operations copy back from.

use crate::error::{Error, Result};
use crate::types::{Color, EntityType, SpeciesId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub const MAX_BREEDING_AGE: u32 = 100;
pub const MAX_AGE: u32 = 365;
pub const MAX_LITTER_SIZE: u32 = 12;
pub const MAX_HUNGER_VALUE: u32 = 200;
pub const MAX_FOOD_VALUE: u32 = 100;
pub const MAX_PLANT_LEVEL: u32 = 20;

/// Steps in one simulated day, used to convert ages between steps and days
pub const STEPS_PER_DAY: u64 = 24;

fn clamp_probability(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Age in days, truncated to two decimals.
pub fn age_in_days(age_steps: u64) -> f64 {
    (age_steps as f64 / STEPS_PER_DAY as f64 * 100.0).floor() / 100.0
}

/// Parameters common to every species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityStats {
    pub color: Color,
    /// Chance per cell that an individual is created at populate time
    pub creation_probability: f64,
    /// Chance that a reproduction attempt produces a litter at all
    pub breeding_probability: f64,
    pub enabled: bool,
}

impl EntityStats {
    pub fn new(color: Color, creation_probability: f64, breeding_probability: f64) -> Self {
        Self {
            color,
            creation_probability: clamp_probability(creation_probability),
            breeding_probability: clamp_probability(breeding_probability),
            enabled: true,
        }
    }

    fn clamped(self) -> Self {
        Self {
            creation_probability: clamp_probability(self.creation_probability),
            breeding_probability: clamp_probability(self.breeding_probability),
            ..self
        }
    }
}

/// Parameters specific to animal species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalStats {
    /// Age in days from which an individual may breed
    pub breeding_age: u32,
    /// Age in days past which an individual dies
    pub max_age: u32,
    pub max_litter_size: u32,
    /// Steps a full stomach lasts
    pub hunger_value: u32,
    pub is_nocturnal: bool,
    /// Species an individual born with these stats may eat
    pub diet: BTreeSet<SpeciesId>,
}

impl AnimalStats {
    fn clamped(self) -> Self {
        Self {
            breeding_age: self.breeding_age.min(MAX_BREEDING_AGE),
            max_age: self.max_age.clamp(1, MAX_AGE),
            max_litter_size: self.max_litter_size.clamp(1, MAX_LITTER_SIZE),
            hunger_value: self.hunger_value.clamp(1, MAX_HUNGER_VALUE),
            ..self
        }
    }

    pub fn max_age_steps(&self) -> u64 {
        self.max_age as u64 * STEPS_PER_DAY
    }

    /// Whether an individual of `age_steps` is old enough to breed
    pub fn can_breed_at(&self, age_steps: u64) -> bool {
        age_in_days(age_steps) >= self.breeding_age as f64
    }

    /// Whether an individual of `age_steps` has outlived its species
    pub fn is_too_old(&self, age_steps: u64) -> bool {
        age_in_days(age_steps) > self.max_age as f64
    }
}

/// Parameters specific to plant species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantStats {
    /// Food an animal gains from eating one of these plants
    pub food_value: u32,
    pub max_level: u32,
}

impl PlantStats {
    fn clamped(self) -> Self {
        Self {
            food_value: self.food_value.min(MAX_FOOD_VALUE),
            max_level: self.max_level.clamp(1, MAX_PLANT_LEVEL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KindStats {
    Animal(AnimalStats),
    Plant(PlantStats),
}

/// One complete set of species values, either live or default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub entity: EntityStats,
    pub kind: KindStats,
}

impl SpeciesConfig {
    fn clamped(self) -> Self {
        let kind = match self.kind {
            KindStats::Animal(stats) => KindStats::Animal(stats.clamped()),
            KindStats::Plant(stats) => KindStats::Plant(stats.clamped()),
        };
        Self {
            entity: self.entity.clamped(),
            kind,
        }
    }
}

/// Individually resettable descriptor fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatField {
    Color,
    CreationProbability,
    BreedingProbability,
    Enabled,
    BreedingAge,
    MaxAge,
    MaxLitterSize,
    HungerValue,
    Nocturnal,
    Diet,
    FoodValue,
    MaxLevel,
}

impl fmt::Display for StatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Shared, runtime-mutable configuration of one species
#[derive(Debug, Clone, Serialize)]
pub struct SpeciesDescriptor {
    id: SpeciesId,
    name: String,
    entity_type: EntityType,
    live: SpeciesConfig,
    defaults: SpeciesConfig,
}

impl SpeciesDescriptor {
    /// Build a descriptor, clamping every numeric field and capturing the
    /// result as the default snapshot.
    pub fn new(
        id: SpeciesId,
        name: impl Into<String>,
        entity_type: EntityType,
        config: SpeciesConfig,
    ) -> Result<Self> {
        let name = name.into();
        let kind_matches = match config.kind {
            KindStats::Animal(_) => entity_type.is_animal(),
            KindStats::Plant(_) => !entity_type.is_animal(),
        };
        if !kind_matches {
            return Err(Error::Validation(format!(
                "species {name} is declared {entity_type} but carries the wrong kind of stats"
            )));
        }

        let live = config.clamped();
        Ok(Self {
            id,
            name,
            entity_type,
            defaults: live.clone(),
            live,
        })
    }

    pub fn id(&self) -> SpeciesId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn entity(&self) -> &EntityStats {
        &self.live.entity
    }

    pub fn config(&self) -> &SpeciesConfig {
        &self.live
    }

    pub fn defaults(&self) -> &SpeciesConfig {
        &self.defaults
    }

    pub fn animal(&self) -> Option<&AnimalStats> {
        match &self.live.kind {
            KindStats::Animal(stats) => Some(stats),
            KindStats::Plant(_) => None,
        }
    }

    pub fn plant(&self) -> Option<&PlantStats> {
        match &self.live.kind {
            KindStats::Plant(stats) => Some(stats),
            KindStats::Animal(_) => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.live.entity.enabled
    }

    pub fn color(&self) -> Color {
        self.live.entity.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.live.entity.color = color;
    }

    pub fn set_creation_probability(&mut self, value: f64) {
        self.live.entity.creation_probability = clamp_probability(value);
    }

    pub fn set_breeding_probability(&mut self, value: f64) {
        self.live.entity.breeding_probability = clamp_probability(value);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.live.entity.enabled = enabled;
    }

    pub fn set_breeding_age(&mut self, days: u32) -> Result<()> {
        self.animal_mut(StatField::BreedingAge)?.breeding_age = days.min(MAX_BREEDING_AGE);
        Ok(())
    }

    pub fn set_max_age(&mut self, days: u32) -> Result<()> {
        self.animal_mut(StatField::MaxAge)?.max_age = days.clamp(1, MAX_AGE);
        Ok(())
    }

    pub fn set_max_litter_size(&mut self, size: u32) -> Result<()> {
        self.animal_mut(StatField::MaxLitterSize)?.max_litter_size = size.clamp(1, MAX_LITTER_SIZE);
        Ok(())
    }

    pub fn set_hunger_value(&mut self, steps: u32) -> Result<()> {
        self.animal_mut(StatField::HungerValue)?.hunger_value = steps.clamp(1, MAX_HUNGER_VALUE);
        Ok(())
    }

    pub fn set_nocturnal(&mut self, nocturnal: bool) -> Result<()> {
        self.animal_mut(StatField::Nocturnal)?.is_nocturnal = nocturnal;
        Ok(())
    }

    pub fn add_prey(&mut self, prey: SpeciesId) -> Result<()> {
        self.animal_mut(StatField::Diet)?.diet.insert(prey);
        Ok(())
    }

    /// Drop `prey` from the diet. Returns whether it was present; plants have
    /// no diet and always return false.
    pub fn remove_prey(&mut self, prey: SpeciesId) -> bool {
        let removed_live = match &mut self.live.kind {
            KindStats::Animal(stats) => stats.diet.remove(&prey),
            KindStats::Plant(_) => false,
        };
        // A removed species must not come back through a reset.
        if let KindStats::Animal(stats) = &mut self.defaults.kind {
            stats.diet.remove(&prey);
        }
        removed_live
    }

    pub fn set_food_value(&mut self, value: u32) -> Result<()> {
        self.plant_mut(StatField::FoodValue)?.food_value = value.min(MAX_FOOD_VALUE);
        Ok(())
    }

    pub fn set_max_level(&mut self, level: u32) -> Result<()> {
        self.plant_mut(StatField::MaxLevel)?.max_level = level.clamp(1, MAX_PLANT_LEVEL);
        Ok(())
    }

    /// Copy every default value back into the live configuration.
    pub fn reset(&mut self) {
        self.live = self.defaults.clone();
    }

    /// Copy a single default value back into the live configuration.
    pub fn reset_field(&mut self, field: StatField) -> Result<()> {
        let defaults = self.defaults.clone();
        match field {
            StatField::Color => self.live.entity.color = defaults.entity.color,
            StatField::CreationProbability => {
                self.live.entity.creation_probability = defaults.entity.creation_probability
            }
            StatField::BreedingProbability => {
                self.live.entity.breeding_probability = defaults.entity.breeding_probability
            }
            StatField::Enabled => self.live.entity.enabled = defaults.entity.enabled,
            StatField::BreedingAge
            | StatField::MaxAge
            | StatField::MaxLitterSize
            | StatField::HungerValue
            | StatField::Nocturnal
            | StatField::Diet => {
                let KindStats::Animal(default) = defaults.kind else {
                    return Err(invalid_field(field, &self.name));
                };
                let live = self.animal_mut(field)?;
                match field {
                    StatField::BreedingAge => live.breeding_age = default.breeding_age,
                    StatField::MaxAge => live.max_age = default.max_age,
                    StatField::MaxLitterSize => live.max_litter_size = default.max_litter_size,
                    StatField::HungerValue => live.hunger_value = default.hunger_value,
                    StatField::Nocturnal => live.is_nocturnal = default.is_nocturnal,
                    _ => live.diet = default.diet,
                }
            }
            StatField::FoodValue | StatField::MaxLevel => {
                let KindStats::Plant(default) = defaults.kind else {
                    return Err(invalid_field(field, &self.name));
                };
                let live = self.plant_mut(field)?;
                if field == StatField::FoodValue {
                    live.food_value = default.food_value;
                } else {
                    live.max_level = default.max_level;
                }
            }
        }
        Ok(())
    }

    fn animal_mut(&mut self, field: StatField) -> Result<&mut AnimalStats> {
        match &mut self.live.kind {
            KindStats::Animal(stats) => Ok(stats),
            KindStats::Plant(_) => Err(invalid_field(field, &self.name)),
        }
    }

    fn plant_mut(&mut self, field: StatField) -> Result<&mut PlantStats> {
        match &mut self.live.kind {
            KindStats::Plant(stats) => Ok(stats),
            KindStats::Animal(_) => Err(invalid_field(field, &self.name)),
        }
    }
}

fn invalid_field(field: StatField, species: &str) -> Error {
    Error::InvalidField {
        field: field.to_string(),
        species: species.to_string(),
    }
}

/// Kind-specific part of a [`SpeciesDraft`]. Diet entries are species names,
/// resolved to ids when the draft is registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DraftKind {
    Animal {
        breeding_age: u32,
        max_age: u32,
        max_litter_size: u32,
        hunger_value: u32,
        #[serde(default)]
        is_nocturnal: bool,
        #[serde(default)]
        diet: Vec<String>,
    },
    Plant {
        food_value: u32,
        max_level: u32,
    },
}

fn enabled_by_default() -> bool {
    true
}

/// Unregistered species definition, as supplied by a user or a scenario file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDraft {
    pub name: String,
    pub entity_type: EntityType,
    pub color: Option<Color>,
    pub creation_probability: f64,
    pub breeding_probability: f64,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(flatten)]
    pub kind: DraftKind,
}

impl SpeciesDraft {
    #[allow(clippy::too_many_arguments)]
    pub fn animal(
        name: &str,
        entity_type: EntityType,
        color: Color,
        creation_probability: f64,
        breeding_probability: f64,
        breeding_age: u32,
        max_age: u32,
        max_litter_size: u32,
        hunger_value: u32,
        is_nocturnal: bool,
        diet: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            entity_type,
            color: Some(color),
            creation_probability,
            breeding_probability,
            enabled: true,
            kind: DraftKind::Animal {
                breeding_age,
                max_age,
                max_litter_size,
                hunger_value,
                is_nocturnal,
                diet: diet.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    pub fn plant(
        name: &str,
        color: Color,
        creation_probability: f64,
        breeding_probability: f64,
        food_value: u32,
        max_level: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            entity_type: EntityType::Plant,
            color: Some(color),
            creation_probability,
            breeding_probability,
            enabled: true,
            kind: DraftKind::Plant {
                food_value,
                max_level,
            },
        }
    }

    /// Build the descriptor for this draft with an already resolved diet.
    pub fn into_descriptor(self, id: SpeciesId, diet: BTreeSet<SpeciesId>) -> Result<SpeciesDescriptor> {
        let color = self.color.ok_or_else(|| {
            Error::Validation(format!("species {} has no color assigned", self.name))
        })?;
        let mut entity = EntityStats::new(color, self.creation_probability, self.breeding_probability);
        entity.enabled = self.enabled;

        let kind = match self.kind {
            DraftKind::Animal {
                breeding_age,
                max_age,
                max_litter_size,
                hunger_value,
                is_nocturnal,
                ..
            } => KindStats::Animal(AnimalStats {
                breeding_age,
                max_age,
                max_litter_size,
                hunger_value,
                is_nocturnal,
                diet,
            }),
            DraftKind::Plant {
                food_value,
                max_level,
            } => KindStats::Plant(PlantStats {
                food_value,
                max_level,
            }),
        };

        SpeciesDescriptor::new(id, self.name, self.entity_type, SpeciesConfig { entity, kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fox() -> SpeciesDescriptor {
        SpeciesDraft::animal(
            "Fox",
            EntityType::Predator,
            Color::rgb(200, 100, 0),
            0.02,
            0.2,
            5,
            40,
            2,
            20,
            false,
            &[],
        )
        .into_descriptor(SpeciesId(0), BTreeSet::from([SpeciesId(1)]))
        .unwrap()
    }

    fn grass() -> SpeciesDescriptor {
        SpeciesDraft::plant("Grass", Color::rgb(0, 160, 0), 0.1, 0.05, 6, 5)
            .into_descriptor(SpeciesId(1), BTreeSet::new())
            .unwrap()
    }

    #[test]
    fn test_age_in_days_truncates() {
        assert_eq!(age_in_days(0), 0.0);
        assert_eq!(age_in_days(24), 1.0);
        assert_eq!(age_in_days(25), 1.04);
        assert_eq!(age_in_days(36), 1.5);
    }

    #[test]
    fn test_construction_clamps() {
        let draft = SpeciesDraft::animal(
            "Giant",
            EntityType::Prey,
            Color::rgb(1, 2, 3),
            3.0,
            -1.0,
            500,
            0,
            99,
            0,
            false,
            &[],
        );
        let giant = draft.into_descriptor(SpeciesId(3), BTreeSet::new()).unwrap();
        let stats = giant.animal().unwrap();
        assert_eq!(giant.entity().creation_probability, 1.0);
        assert_eq!(giant.entity().breeding_probability, 0.0);
        assert_eq!(stats.breeding_age, MAX_BREEDING_AGE);
        assert_eq!(stats.max_age, 1);
        assert_eq!(stats.max_litter_size, MAX_LITTER_SIZE);
        assert_eq!(stats.hunger_value, 1);
        // Defaults are the clamped values
        assert_eq!(giant.defaults(), giant.config());
    }

    #[test]
    fn test_setters_clamp() {
        let mut fox = fox();
        fox.set_breeding_probability(7.0);
        fox.set_max_litter_size(40).unwrap();
        fox.set_creation_probability(f64::NAN);
        assert_eq!(fox.entity().breeding_probability, 1.0);
        assert_eq!(fox.animal().unwrap().max_litter_size, MAX_LITTER_SIZE);
        assert_eq!(fox.entity().creation_probability, 0.0);

        let mut grass = grass();
        grass.set_max_level(0).unwrap();
        assert_eq!(grass.plant().unwrap().max_level, 1);
    }

    #[test]
    fn test_wrong_kind_setter_is_an_error() {
        let mut grass = grass();
        assert!(matches!(
            grass.set_hunger_value(10),
            Err(Error::InvalidField { .. })
        ));
        let mut fox = fox();
        match fox.set_food_value(3) {
            Err(Error::InvalidField { field, species }) => {
                assert_eq!(field, StatField::FoodValue.to_string());
                assert_eq!(species, "Fox");
            }
            other => panic!("expected InvalidField, got {other:?}"),
        }
        assert!(matches!(
            fox.set_max_level(2),
            Err(Error::InvalidField { .. })
        ));
        assert_eq!(fox.animal().unwrap().max_age, 40);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut fox = fox();
        fox.set_breeding_age(1).unwrap();
        fox.set_enabled(false);
        fox.set_color(Color::rgb(0, 0, 0));
        fox.reset();
        assert_eq!(fox.animal().unwrap().breeding_age, 5);
        assert!(fox.is_enabled());
        assert_eq!(fox.color(), Color::rgb(200, 100, 0));
    }

    #[test]
    fn test_reset_single_field() {
        let mut fox = fox();
        fox.set_max_age(2).unwrap();
        fox.set_hunger_value(3).unwrap();
        fox.reset_field(StatField::MaxAge).unwrap();
        assert_eq!(fox.animal().unwrap().max_age, 40);
        assert_eq!(fox.animal().unwrap().hunger_value, 3);

        let mut grass = grass();
        grass.set_food_value(1).unwrap();
        grass.reset_field(StatField::FoodValue).unwrap();
        assert_eq!(grass.plant().unwrap().food_value, 6);
        assert!(grass.reset_field(StatField::Nocturnal).is_err());
    }

    #[test]
    fn test_removed_prey_stays_removed_after_reset() {
        let mut fox = fox();
        assert!(fox.remove_prey(SpeciesId(1)));
        fox.reset();
        assert!(fox.animal().unwrap().diet.is_empty());
    }

    #[test]
    fn test_missing_color_rejected() {
        let mut draft = SpeciesDraft::plant("Moss", Color::rgb(0, 90, 0), 0.1, 0.1, 2, 3);
        draft.color = None;
        assert!(matches!(
            draft.into_descriptor(SpeciesId(9), BTreeSet::new()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_kind_must_match_entity_type() {
        let mut draft = SpeciesDraft::plant("Moss", Color::rgb(0, 90, 0), 0.1, 0.1, 2, 3);
        draft.entity_type = EntityType::Prey;
        assert!(draft.into_descriptor(SpeciesId(9), BTreeSet::new()).is_err());
    }

    #[test]
    fn test_age_thresholds() {
        let fox = fox();
        let stats = fox.animal().unwrap();
        assert!(!stats.can_breed_at(4 * STEPS_PER_DAY));
        assert!(stats.can_breed_at(5 * STEPS_PER_DAY));
        assert!(!stats.is_too_old(40 * STEPS_PER_DAY));
        assert!(stats.is_too_old(40 * STEPS_PER_DAY + 1));
    }

    #[test]
    fn test_draft_deserializes_from_json() {
        let json = r#"{
            "name": "Rabbit",
            "entity_type": "Prey",
            "color": {"r": 150, "g": 120, "b": 90},
            "creation_probability": 0.06,
            "breeding_probability": 0.35,
            "kind": "animal",
            "breeding_age": 2,
            "max_age": 20,
            "max_litter_size": 4,
            "hunger_value": 12,
            "diet": ["Grass"]
        }"#;
        let draft: SpeciesDraft = serde_json::from_str(json).unwrap();
        assert!(draft.enabled);
        assert!(matches!(draft.kind, DraftKind::Animal { ref diet, is_nocturnal: false, .. } if diet == &["Grass"]));
    }
}
