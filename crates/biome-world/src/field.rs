//! Rectangular grid of cells, each holding at most one organism.

use crate::organism::Organism;
use biome_core::{Location, OrganismId, Randomizer, DEFAULT_DEPTH, DEFAULT_WIDTH};
use tracing::warn;

/// A bounded (non-wrapping) grid of organism ids
#[derive(Debug, Clone)]
pub struct Field {
    depth: i32,
    width: i32,
    cells: Vec<Option<OrganismId>>,
}

impl Field {
    /// Create an empty field. Non-positive dimensions, or a cell count that
    /// does not fit an `i32`, fall back to the defaults.
    pub fn new(depth: i32, width: i32) -> Self {
        let cells = match depth.checked_mul(width) {
            Some(cells) if depth > 0 && width > 0 => Some(cells),
            _ => None,
        };
        let (depth, width, cells) = match cells {
            Some(cells) => (depth, width, cells),
            None => {
                warn!(
                    event = "invalid_field_dimensions",
                    depth,
                    width,
                    "Field dimensions must be positive and bounded, using defaults"
                );
                (DEFAULT_DEPTH, DEFAULT_WIDTH, DEFAULT_DEPTH * DEFAULT_WIDTH)
            }
        };

        Self {
            depth,
            width,
            cells: vec![None; cells as usize],
        }
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn contains(&self, location: Location) -> bool {
        location.within_bounds(self.depth - 1, self.width - 1)
    }

    /// Occupant of a cell, `None` when empty or out of bounds
    pub fn object_at(&self, location: Location) -> Option<OrganismId> {
        self.index(location).and_then(|index| self.cells[index])
    }

    /// Move `organism` to `location`.
    ///
    /// The organism's previous cell is cleared first, then the target cell is
    /// taken over. Whatever occupied the target is evicted and returned; the
    /// caller decides what happens to it. Out-of-bounds targets leave the
    /// field and the organism untouched.
    pub fn place(&mut self, organism: &mut Organism, location: Location) -> Option<OrganismId> {
        let Some(target) = self.index(location) else {
            warn!(
                event = "place_out_of_bounds",
                organism_id = %organism.id,
                row = location.row,
                col = location.col,
                "Ignoring placement outside the field"
            );
            return None;
        };

        if let Some(previous) = organism.location {
            if self.object_at(previous) == Some(organism.id) {
                self.clear(previous);
            }
        }

        let evicted = self.cells[target].replace(organism.id);
        organism.location = Some(location);
        evicted.filter(|id| *id != organism.id)
    }

    /// Empty a cell, returning its former occupant
    pub fn clear(&mut self, location: Location) -> Option<OrganismId> {
        let index = self.index(location)?;
        self.cells[index].take()
    }

    pub fn clear_all(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = None);
    }

    /// In-bounds 8-neighborhood of `location`, freshly shuffled on every call
    /// so that movement and foraging carry no directional bias.
    pub fn adjacent_locations(&self, location: Location, rng: &mut Randomizer) -> Vec<Location> {
        let mut neighbors = Vec::with_capacity(8);
        for d_row in -1..=1 {
            for d_col in -1..=1 {
                if d_row == 0 && d_col == 0 {
                    continue;
                }
                let neighbor = location.offset(d_row, d_col);
                if self.contains(neighbor) {
                    neighbors.push(neighbor);
                }
            }
        }
        rng.shuffle(&mut neighbors);
        neighbors
    }

    pub fn free_adjacent_locations(&self, location: Location, rng: &mut Randomizer) -> Vec<Location> {
        self.adjacent_locations(location, rng)
            .into_iter()
            .filter(|neighbor| self.object_at(*neighbor).is_none())
            .collect()
    }

    /// A random free neighbor, if there is one
    pub fn free_adjacent_location(&self, location: Location, rng: &mut Randomizer) -> Option<Location> {
        self.free_adjacent_locations(location, rng).into_iter().next()
    }

    pub fn occupied_adjacent_locations(&self, location: Location, rng: &mut Randomizer) -> Vec<Location> {
        self.adjacent_locations(location, rng)
            .into_iter()
            .filter(|neighbor| self.object_at(*neighbor).is_some())
            .collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Iterator over occupied cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (Location, OrganismId)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(index, cell)| cell.map(|id| (self.index_to_location(index), id)))
    }

    /// Iterator over all locations in row-major order
    pub fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        (0..self.cells.len()).map(move |index| self.index_to_location(index))
    }

    fn index(&self, location: Location) -> Option<usize> {
        self.contains(location)
            .then(|| (location.row * self.width + location.col) as usize)
    }

    fn index_to_location(&self, index: usize) -> Location {
        let row = index as i32 / self.width;
        let col = index as i32 % self.width;
        Location::new(row, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organism::Organism;
    use biome_core::SpeciesId;

    fn plant(id: u64) -> Organism {
        Organism::new_plant(OrganismId(id), SpeciesId(0), 1)
    }

    #[test]
    fn test_field_creation() {
        let field = Field::new(10, 12);
        assert_eq!(field.depth(), 10);
        assert_eq!(field.width(), 12);
        assert_eq!(field.cells.len(), 120);
        assert_eq!(field.occupied_count(), 0);
    }

    #[test]
    fn test_invalid_dimensions_use_defaults() {
        let field = Field::new(0, -3);
        assert_eq!(field.depth(), DEFAULT_DEPTH);
        assert_eq!(field.width(), DEFAULT_WIDTH);
    }

    #[test]
    fn test_overflowing_dimensions_use_defaults() {
        let field = Field::new(i32::MAX, 2);
        assert_eq!(field.depth(), DEFAULT_DEPTH);
        assert_eq!(field.width(), DEFAULT_WIDTH);
        assert_eq!(field.cells.len(), (DEFAULT_DEPTH * DEFAULT_WIDTH) as usize);

        let field = Field::new(50_000, 50_000);
        assert_eq!(field.depth(), DEFAULT_DEPTH);
        assert!(field.contains(Location::new(DEFAULT_DEPTH - 1, DEFAULT_WIDTH - 1)));
    }

    #[test]
    fn test_place_moves_and_clears_previous_cell() {
        let mut field = Field::new(5, 5);
        let mut organism = plant(1);

        assert_eq!(field.place(&mut organism, Location::new(1, 1)), None);
        assert_eq!(field.object_at(Location::new(1, 1)), Some(OrganismId(1)));

        field.place(&mut organism, Location::new(2, 3));
        assert_eq!(field.object_at(Location::new(1, 1)), None);
        assert_eq!(field.object_at(Location::new(2, 3)), Some(OrganismId(1)));
        assert_eq!(organism.location(), Some(Location::new(2, 3)));
        assert_eq!(field.occupied_count(), 1);
    }

    #[test]
    fn test_place_evicts_occupant() {
        let mut field = Field::new(3, 3);
        let mut first = plant(1);
        let mut second = plant(2);
        field.place(&mut first, Location::new(0, 0));

        let evicted = field.place(&mut second, Location::new(0, 0));
        assert_eq!(evicted, Some(OrganismId(1)));
        assert_eq!(field.object_at(Location::new(0, 0)), Some(OrganismId(2)));
    }

    #[test]
    fn test_place_out_of_bounds_is_ignored() {
        let mut field = Field::new(3, 3);
        let mut organism = plant(1);
        assert_eq!(field.place(&mut organism, Location::new(3, 0)), None);
        assert_eq!(organism.location(), None);
        assert_eq!(field.occupied_count(), 0);
    }

    #[test]
    fn test_adjacent_locations_clip_to_bounds() {
        let field = Field::new(10, 10);
        let mut rng = Randomizer::new(42);

        assert_eq!(field.adjacent_locations(Location::new(5, 5), &mut rng).len(), 8);
        assert_eq!(field.adjacent_locations(Location::new(0, 0), &mut rng).len(), 3);
        assert_eq!(field.adjacent_locations(Location::new(0, 5), &mut rng).len(), 5);

        let single = Field::new(1, 1);
        assert!(single.adjacent_locations(Location::new(0, 0), &mut rng).is_empty());
    }

    #[test]
    fn test_adjacent_locations_are_shuffled() {
        let field = Field::new(10, 10);
        let mut rng = Randomizer::new(3);
        let center = Location::new(5, 5);
        let first = field.adjacent_locations(center, &mut rng);
        let differs = (0..20).any(|_| field.adjacent_locations(center, &mut rng) != first);
        assert!(differs);
    }

    #[test]
    fn test_free_and_occupied_neighbors() {
        let mut field = Field::new(3, 3);
        let mut rng = Randomizer::new(1);
        let mut neighbor = plant(1);
        field.place(&mut neighbor, Location::new(0, 1));

        let center = Location::new(1, 1);
        let free = field.free_adjacent_locations(center, &mut rng);
        let occupied = field.occupied_adjacent_locations(center, &mut rng);
        assert_eq!(free.len(), 7);
        assert_eq!(occupied, vec![Location::new(0, 1)]);
        assert!(!free.contains(&Location::new(0, 1)));
        assert!(field.free_adjacent_location(center, &mut rng).is_some());
    }

    #[test]
    fn test_iter_reports_occupants() {
        let mut field = Field::new(4, 4);
        let mut a = plant(1);
        let mut b = plant(2);
        field.place(&mut a, Location::new(3, 2));
        field.place(&mut b, Location::new(0, 1));

        let occupants: Vec<_> = field.iter().collect();
        assert_eq!(
            occupants,
            vec![
                (Location::new(0, 1), OrganismId(2)),
                (Location::new(3, 2), OrganismId(1)),
            ]
        );
        assert_eq!(field.locations().count(), 16);

        field.clear_all();
        assert_eq!(field.occupied_count(), 0);
    }
}
