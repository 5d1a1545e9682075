//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for one populated run, used to correlate logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an individual organism.
///
/// Ids are handed out from a monotonically increasing counter, so ordering
/// by id is ordering by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrganismId(pub u64);

impl fmt::Display for OrganismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a registered species
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesId(pub u32);

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "species-{}", self.0)
    }
}

/// Identifier of a disease outbreak
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DiseaseId(pub u32);

/// Grid coordinate in the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub row: i32,
    pub col: i32,
}

impl Location {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn offset(&self, d_row: i32, d_col: i32) -> Self {
        Self {
            row: self.row + d_row,
            col: self.col + d_col,
        }
    }

    /// True iff `0 <= row <= row_max` and `0 <= col <= col_max`
    pub fn within_bounds(&self, row_max: i32, col_max: i32) -> bool {
        (0..=row_max).contains(&self.row) && (0..=col_max).contains(&self.col)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Trophic role of a species
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Prey,
    Predator,
    Plant,
}

impl EntityType {
    pub fn all() -> [EntityType; 3] {
        [EntityType::Prey, EntityType::Predator, EntityType::Plant]
    }

    pub fn is_animal(&self) -> bool {
        !matches!(self, EntityType::Plant)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityType::Prey => "prey",
            EntityType::Predator => "predator",
            EntityType::Plant => "plant",
        };
        f.write_str(label)
    }
}

/// RGB display color of a species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Half of the day/night cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayPhase {
    Day,
    Night,
}

impl DayPhase {
    pub fn is_day(&self) -> bool {
        matches!(self, DayPhase::Day)
    }

    pub fn flip(&self) -> DayPhase {
        match self {
            DayPhase::Day => DayPhase::Night,
            DayPhase::Night => DayPhase::Day,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DayPhase::Day => "Day",
            DayPhase::Night => "Night",
        }
    }
}
