//! Sparse hash grid for proximity queries
//!
//! The grid is rebuilt from scratch every tick. Queries return every entity
//! in the cells overlapping the query square, so callers must still check
//! the exact squared distance.

use ahash::AHashMap;

use crate::core::types::{ClanKey, Vec2};
use crate::entity::{FoodSource, Individual};

/// Handle to an entity stored in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Clan(ClanKey),
    /// Index into the engine's individual list
    Individual(usize),
    /// Index into the engine's food source list
    Food(usize),
}

/// Which entity kinds a query should return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityKinds {
    pub clans: bool,
    pub individuals: bool,
    pub food: bool,
}

impl EntityKinds {
    pub const CLANS: Self = Self { clans: true, individuals: false, food: false };
    pub const INDIVIDUALS: Self = Self { clans: false, individuals: true, food: false };
    pub const FOOD: Self = Self { clans: false, individuals: false, food: true };
    pub const AGENTS: Self = Self { clans: true, individuals: true, food: false };
    pub const ALL: Self = Self { clans: true, individuals: true, food: true };

    #[inline]
    pub fn accepts(&self, entity: &EntityRef) -> bool {
        match entity {
            EntityRef::Clan(_) => self.clans,
            EntityRef::Individual(_) => self.individuals,
            EntityRef::Food(_) => self.food,
        }
    }
}

/// Uniform grid keyed by integer cell coordinates
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f32,
    cells: AHashMap<(i32, i32), Vec<EntityRef>>,
    /// Occupied cell bounds, used to clip oversized queries
    min_cell: (i32, i32),
    max_cell: (i32, i32),
    len: usize,
}

impl SpatialIndex {
    /// Create an empty index; non-positive or NaN sizes fall back to 1.0
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: if cell_size > 0.0 { cell_size } else { 1.0 },
            cells: AHashMap::new(),
            min_cell: (i32::MAX, i32::MAX),
            max_cell: (i32::MIN, i32::MIN),
            len: 0,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn cell_coord(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.min_cell = (i32::MAX, i32::MAX);
        self.max_cell = (i32::MIN, i32::MIN);
        self.len = 0;
    }

    pub fn insert(&mut self, entity: EntityRef, pos: Vec2) {
        if !pos.is_finite() {
            return;
        }
        let coord = self.cell_coord(pos.x, pos.y);
        self.min_cell = (self.min_cell.0.min(coord.0), self.min_cell.1.min(coord.1));
        self.max_cell = (self.max_cell.0.max(coord.0), self.max_cell.1.max(coord.1));
        self.cells.entry(coord).or_default().push(entity);
        self.len += 1;
    }

    /// Rebuild the grid from the current world state
    pub fn rebuild(
        &mut self,
        clans: impl IntoIterator<Item = (ClanKey, Vec2)>,
        individuals: &[Individual],
        food: &[FoodSource],
    ) {
        self.clear();
        for (key, pos) in clans {
            self.insert(EntityRef::Clan(key), pos);
        }
        for (i, ind) in individuals.iter().enumerate() {
            self.insert(EntityRef::Individual(i), ind.position);
        }
        for (i, source) in food.iter().enumerate() {
            self.insert(EntityRef::Food(i), source.position);
        }
    }

    /// Entities of `kinds` in every cell touched by the square around `center`
    ///
    /// Results come in cell order (x-major), then insertion order inside a
    /// cell, so nearest-first selection is deterministic.
    pub fn query(&self, center: Vec2, radius: f32, kinds: EntityKinds) -> Vec<EntityRef> {
        let mut out = Vec::new();
        self.query_into(center, radius, kinds, &mut out);
        out
    }

    /// Like `query`, reusing the caller's buffer
    pub fn query_into(&self, center: Vec2, radius: f32, kinds: EntityKinds, out: &mut Vec<EntityRef>) {
        out.clear();
        if self.len == 0 || !center.is_finite() || !(radius >= 0.0) {
            return;
        }
        let (lo_x, lo_y) = self.cell_coord(center.x - radius, center.y - radius);
        let (hi_x, hi_y) = self.cell_coord(center.x + radius, center.y + radius);
        let (lo_x, lo_y) = (lo_x.max(self.min_cell.0), lo_y.max(self.min_cell.1));
        let (hi_x, hi_y) = (hi_x.min(self.max_cell.0), hi_y.min(self.max_cell.1));

        for cx in lo_x..=hi_x {
            for cy in lo_y..=hi_y {
                if let Some(cell) = self.cells.get(&(cx, cy)) {
                    out.extend(cell.iter().filter(|e| kinds.accepts(e)).copied());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SpeciesId;

    fn key(i: usize) -> ClanKey {
        ClanKey { species: SpeciesId(0), index: i }
    }

    #[test]
    fn test_query_returns_superset_of_radius() {
        let mut grid = SpatialIndex::new(10.0);
        grid.insert(EntityRef::Clan(key(0)), Vec2::new(5.0, 5.0));
        grid.insert(EntityRef::Clan(key(1)), Vec2::new(19.0, 19.0));
        grid.insert(EntityRef::Clan(key(2)), Vec2::new(55.0, 55.0));

        let found = grid.query(Vec2::new(5.0, 5.0), 6.0, EntityKinds::ALL);
        // (19, 19) is ~19.8 away but shares a touched cell
        assert!(found.contains(&EntityRef::Clan(key(0))));
        assert!(found.contains(&EntityRef::Clan(key(1))));
        assert!(!found.contains(&EntityRef::Clan(key(2))));
    }

    #[test]
    fn test_query_filters_kinds() {
        let mut grid = SpatialIndex::new(10.0);
        grid.insert(EntityRef::Clan(key(0)), Vec2::new(1.0, 1.0));
        grid.insert(EntityRef::Individual(0), Vec2::new(2.0, 2.0));
        grid.insert(EntityRef::Food(0), Vec2::new(3.0, 3.0));

        let food = grid.query(Vec2::new(0.0, 0.0), 5.0, EntityKinds::FOOD);
        assert_eq!(food, vec![EntityRef::Food(0)]);
        let agents = grid.query(Vec2::new(0.0, 0.0), 5.0, EntityKinds::AGENTS);
        assert_eq!(agents.len(), 2);
    }

    #[test]
    fn test_negative_coordinates() {
        let mut grid = SpatialIndex::new(10.0);
        grid.insert(EntityRef::Individual(3), Vec2::new(-0.5, -0.5));
        let found = grid.query(Vec2::new(0.5, 0.5), 1.0, EntityKinds::INDIVIDUALS);
        assert_eq!(found, vec![EntityRef::Individual(3)]);
    }

    #[test]
    fn test_empty_grid_and_degenerate_size() {
        let grid = SpatialIndex::new(0.0);
        assert_eq!(grid.cell_size(), 1.0);
        assert!(grid.query(Vec2::default(), 100.0, EntityKinds::ALL).is_empty());
    }

    #[test]
    fn test_huge_radius_is_clipped() {
        let mut grid = SpatialIndex::new(1.0);
        grid.insert(EntityRef::Food(0), Vec2::new(0.0, 0.0));
        grid.insert(EntityRef::Food(1), Vec2::new(3.0, 4.0));
        let found = grid.query(Vec2::default(), 1.0e7, EntityKinds::FOOD);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let food = vec![FoodSource::new(Vec2::new(5.0, 5.0), 10.0)];
        let mut grid = SpatialIndex::new(10.0);
        grid.insert(EntityRef::Individual(9), Vec2::new(5.0, 5.0));
        grid.rebuild([(key(0), Vec2::new(6.0, 6.0))], &[], &food);
        assert_eq!(grid.len(), 2);
        let found = grid.query(Vec2::new(5.0, 5.0), 1.0, EntityKinds::ALL);
        assert_eq!(found, vec![EntityRef::Clan(key(0)), EntityRef::Food(0)]);
    }
}
