//! Seasonal weather generator.
//!
//! The season advances by one on every step, wrapping Winter → Spring →
//! Summer → Autumn → Winter, and each step draws a fresh visibility and
//! downfall reading from the new season's ranges.

use biome_core::Randomizer;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// Seasons in cycle order
    pub fn all() -> [Season; 4] {
        [Season::Winter, Season::Spring, Season::Summer, Season::Autumn]
    }

    pub fn next(&self) -> Season {
        match self {
            Season::Winter => Season::Spring,
            Season::Spring => Season::Summer,
            Season::Summer => Season::Autumn,
            Season::Autumn => Season::Winter,
        }
    }

    fn index(&self) -> usize {
        match self {
            Season::Winter => 0,
            Season::Spring => 1,
            Season::Summer => 2,
            Season::Autumn => 3,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Inclusive ranges a season draws its readings from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonProfile {
    pub low_visibility: i32,
    pub high_visibility: i32,
    pub low_downfall: i32,
    pub high_downfall: i32,
}

impl SeasonProfile {
    pub const fn new(visibility: (i32, i32), downfall: (i32, i32)) -> Self {
        Self {
            low_visibility: visibility.0,
            high_visibility: visibility.1,
            low_downfall: downfall.0,
            high_downfall: downfall.1,
        }
    }
}

/// One profile per season, indexed in cycle order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonTable {
    profiles: [SeasonProfile; 4],
}

impl SeasonTable {
    pub fn new(winter: SeasonProfile, spring: SeasonProfile, summer: SeasonProfile, autumn: SeasonProfile) -> Self {
        Self {
            profiles: [winter, spring, summer, autumn],
        }
    }

    /// The same profile for every season
    pub fn uniform(profile: SeasonProfile) -> Self {
        Self {
            profiles: [profile; 4],
        }
    }

    pub fn profile(&self, season: Season) -> &SeasonProfile {
        &self.profiles[season.index()]
    }
}

impl Default for SeasonTable {
    fn default() -> Self {
        Self::new(
            SeasonProfile::new((2, 10), (6, 16)),
            SeasonProfile::new((8, 16), (8, 18)),
            SeasonProfile::new((12, 20), (0, 8)),
            SeasonProfile::new((6, 14), (4, 14)),
        )
    }
}

/// Environmental readings for one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub season: Season,
    pub visibility: i32,
    pub downfall: i32,
}

#[derive(Debug, Clone)]
pub struct Weather {
    table: SeasonTable,
    reading: WeatherReading,
}

impl Weather {
    /// A fresh generator rests on Autumn, so the first `advance` yields
    /// Winter.
    pub fn new(table: SeasonTable) -> Self {
        let reading = Self::resting_reading(&table);
        Self { table, reading }
    }

    fn resting_reading(table: &SeasonTable) -> WeatherReading {
        let profile = table.profile(Season::Autumn);
        WeatherReading {
            season: Season::Autumn,
            visibility: profile.low_visibility,
            downfall: profile.low_downfall,
        }
    }

    /// Move to the next season and redraw visibility and downfall.
    pub fn advance(&mut self, rng: &mut Randomizer) -> WeatherReading {
        let season = self.reading.season.next();
        let profile = *self.table.profile(season);
        self.reading = WeatherReading {
            season,
            visibility: rng.range_inclusive(profile.low_visibility, profile.high_visibility),
            downfall: rng.range_inclusive(profile.low_downfall, profile.high_downfall),
        };
        self.reading
    }

    pub fn reading(&self) -> WeatherReading {
        self.reading
    }

    pub fn season(&self) -> Season {
        self.reading.season
    }

    pub fn table(&self) -> &SeasonTable {
        &self.table
    }

    pub fn reset(&mut self) {
        self.reading = Self::resting_reading(&self.table);
    }
}

impl Default for Weather {
    fn default() -> Self {
        Self::new(SeasonTable::default())
    }
}
