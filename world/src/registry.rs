//! Authoritative index of live units.

use std::collections::BTreeMap;

use skirmish_core::{Location, Team, UnitId, UnitKind};
use thiserror::Error;

use crate::unit::Unit;

/// Failures raised by registry mutations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The cell already holds a unit.
    #[error("cell {0} is occupied")]
    Occupied(Location),
    /// No live unit carries the identifier.
    #[error("unit {0} is not registered")]
    UnknownUnit(UnitId),
    /// The cell lies outside the map.
    #[error("cell {0} is off the map")]
    OffMap(Location),
    /// A live unit already carries the identifier.
    #[error("unit {0} is already registered")]
    DuplicateId(UnitId),
}

/// Live units indexed by id, by cell, and by team and kind, plus the order in
/// which they take their turns.
///
/// A unit is registered exactly when it occupies one grid cell.
#[derive(Clone, Debug)]
pub struct Registry {
    units: BTreeMap<UnitId, Unit>,
    grid: Vec<Option<UnitId>>,
    width: u32,
    height: u32,
    origin: Location,
    order: Vec<UnitId>,
    counts: [[usize; UnitKind::ALL.len()]; 2],
}

impl Registry {
    /// Creates an empty registry for a `width` x `height` map at `origin`.
    #[must_use]
    pub fn new(width: u32, height: u32, origin: Location) -> Self {
        let cells = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            units: BTreeMap::new(),
            grid: vec![None; cells],
            width,
            height,
            origin,
            order: Vec::new(),
            counts: [[0; UnitKind::ALL.len()]; 2],
        }
    }

    fn index(&self, location: Location) -> Option<usize> {
        let x = u32::try_from(i64::from(location.x()) - i64::from(self.origin.x())).ok()?;
        let y = u32::try_from(i64::from(location.y()) - i64::from(self.origin.y())).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        usize::try_from(u64::from(y) * u64::from(self.width) + u64::from(x)).ok()
    }

    /// Registers `unit` on its cell and appends it to the execution order.
    pub fn spawn(&mut self, unit: Unit) -> Result<(), RegistryError> {
        let location = unit.location();
        let index = self
            .index(location)
            .ok_or(RegistryError::OffMap(location))?;
        if self.grid[index].is_some() {
            return Err(RegistryError::Occupied(location));
        }
        if self.units.contains_key(&unit.id()) {
            return Err(RegistryError::DuplicateId(unit.id()));
        }
        self.grid[index] = Some(unit.id());
        self.order.push(unit.id());
        self.counts[unit.team().index()][unit.kind().index()] += 1;
        let _ = self.units.insert(unit.id(), unit);
        Ok(())
    }

    /// Removes the unit from every index and hands it back.
    pub fn destroy(&mut self, id: UnitId) -> Result<Unit, RegistryError> {
        let unit = self
            .units
            .remove(&id)
            .ok_or(RegistryError::UnknownUnit(id))?;
        if let Some(index) = self.index(unit.location()) {
            self.grid[index] = None;
        }
        self.order.retain(|entry| *entry != id);
        let count = &mut self.counts[unit.team().index()][unit.kind().index()];
        *count = count.saturating_sub(1);
        Ok(unit)
    }

    /// Moves the unit to `location`.
    pub fn move_to(&mut self, id: UnitId, location: Location) -> Result<(), RegistryError> {
        let target = self
            .index(location)
            .ok_or(RegistryError::OffMap(location))?;
        if self.grid[target].is_some() {
            return Err(RegistryError::Occupied(location));
        }
        let from = self
            .units
            .get(&id)
            .map(Unit::location)
            .ok_or(RegistryError::UnknownUnit(id))?;
        if let Some(source) = self.index(from) {
            self.grid[source] = None;
        }
        self.grid[target] = Some(id);
        if let Some(unit) = self.units.get_mut(&id) {
            unit.set_location(location);
        }
        Ok(())
    }

    /// Looks up a live unit by id.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Identifier of the unit standing on `location`, if any.
    #[must_use]
    pub fn id_at(&self, location: Location) -> Option<UnitId> {
        self.index(location)
            .and_then(|index| self.grid.get(index).copied().flatten())
    }

    /// Unit standing on `location`, if any.
    #[must_use]
    pub fn at(&self, location: Location) -> Option<&Unit> {
        self.id_at(location).and_then(|id| self.units.get(&id))
    }

    /// Number of live units of `kind` on `team`.
    #[must_use]
    pub fn count(&self, team: Team, kind: UnitKind) -> usize {
        self.counts[team.index()][kind.index()]
    }

    /// Number of live units on `team`.
    #[must_use]
    pub fn team_count(&self, team: Team) -> usize {
        self.counts[team.index()].iter().sum()
    }

    /// Every live unit in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Live units within `radius_squared` of `center`, scanned column by
    /// column from the lowest coordinates.
    #[must_use]
    pub fn within(&self, center: Location, radius_squared: i32) -> Vec<&Unit> {
        let mut found = Vec::new();
        if radius_squared < 0 {
            return found;
        }
        let reach = integer_sqrt(radius_squared);
        for x in center.x().saturating_sub(reach)..=center.x().saturating_add(reach) {
            for y in center.y().saturating_sub(reach)..=center.y().saturating_add(reach) {
                let location = Location::new(x, y);
                if !center.is_within_distance_squared(location, radius_squared) {
                    continue;
                }
                if let Some(unit) = self.at(location) {
                    found.push(unit);
                }
            }
        }
        found
    }

    /// Turn order frozen for the current pass.
    ///
    /// Callers iterate the returned ids and skip any that are no longer
    /// registered; units spawned during the pass are appended to the live
    /// order and first take a turn in the next pass.
    #[must_use]
    pub fn execution_order(&self) -> Vec<UnitId> {
        self.order.clone()
    }
}

fn integer_sqrt(value: i32) -> i32 {
    let mut root = 0;
    while (root + 1) * (root + 1) <= value {
        root += 1;
    }
    root
}

#[cfg(test)]
mod tests {
    use skirmish_core::Rules;

    use super::*;

    fn soldier(id: u32, team: Team, x: i32, y: i32) -> Unit {
        Unit::spawn(
            UnitId::new(id),
            team,
            UnitKind::Soldier,
            Location::new(x, y),
            false,
            &Rules::default(),
        )
    }

    #[test]
    fn spawn_rejects_occupied_and_off_map_cells() {
        let mut registry = Registry::new(10, 10, Location::new(100, 200));
        assert_eq!(registry.spawn(soldier(1, Team::A, 100, 200)), Ok(()));
        assert_eq!(
            registry.spawn(soldier(2, Team::B, 100, 200)),
            Err(RegistryError::Occupied(Location::new(100, 200)))
        );
        assert_eq!(
            registry.spawn(soldier(3, Team::B, 0, 0)),
            Err(RegistryError::OffMap(Location::new(0, 0)))
        );
        assert_eq!(
            registry.spawn(soldier(1, Team::B, 101, 200)),
            Err(RegistryError::DuplicateId(UnitId::new(1)))
        );
        assert_eq!(registry.team_count(Team::A), 1);
        assert_eq!(registry.team_count(Team::B), 0);
    }

    #[test]
    fn destroy_clears_every_index() {
        let mut registry = Registry::new(10, 10, Location::new(0, 0));
        registry.spawn(soldier(4, Team::A, 3, 3)).expect("spawn");
        let removed = registry.destroy(UnitId::new(4)).expect("destroy");
        assert_eq!(removed.id(), UnitId::new(4));
        assert!(registry.at(Location::new(3, 3)).is_none());
        assert_eq!(registry.count(Team::A, UnitKind::Soldier), 0);
        assert!(registry.execution_order().is_empty());
        assert_eq!(
            registry.destroy(UnitId::new(4)),
            Err(RegistryError::UnknownUnit(UnitId::new(4)))
        );
    }

    #[test]
    fn move_to_keeps_grid_and_unit_in_sync() {
        let mut registry = Registry::new(10, 10, Location::new(0, 0));
        registry.spawn(soldier(1, Team::A, 1, 1)).expect("spawn");
        registry.spawn(soldier(2, Team::A, 2, 2)).expect("spawn");
        assert_eq!(
            registry.move_to(UnitId::new(1), Location::new(2, 2)),
            Err(RegistryError::Occupied(Location::new(2, 2)))
        );
        registry
            .move_to(UnitId::new(1), Location::new(1, 2))
            .expect("move");
        assert_eq!(registry.id_at(Location::new(1, 2)), Some(UnitId::new(1)));
        assert!(registry.at(Location::new(1, 1)).is_none());
        assert_eq!(
            registry.get(UnitId::new(1)).map(Unit::location),
            Some(Location::new(1, 2))
        );
    }

    #[test]
    fn execution_order_is_frozen_for_a_pass() {
        let mut registry = Registry::new(10, 10, Location::new(0, 0));
        for (offset, id) in [30_u32, 10, 20].into_iter().enumerate() {
            registry
                .spawn(soldier(id, Team::A, offset as i32, 0))
                .expect("spawn");
        }
        let snapshot = registry.execution_order();
        assert_eq!(
            snapshot,
            vec![UnitId::new(30), UnitId::new(10), UnitId::new(20)]
        );

        let mut visited = Vec::new();
        for id in snapshot {
            if registry.get(id).is_none() {
                continue;
            }
            visited.push(id);
            if id == UnitId::new(30) {
                let _ = registry.destroy(UnitId::new(10)).expect("destroy");
                registry.spawn(soldier(40, Team::A, 5, 5)).expect("spawn");
            }
        }
        assert_eq!(visited, vec![UnitId::new(30), UnitId::new(20)]);
        assert_eq!(
            registry.execution_order(),
            vec![UnitId::new(30), UnitId::new(20), UnitId::new(40)]
        );
    }

    #[test]
    fn within_scans_the_radius() {
        let mut registry = Registry::new(10, 10, Location::new(0, 0));
        registry.spawn(soldier(1, Team::A, 5, 5)).expect("spawn");
        registry.spawn(soldier(2, Team::B, 6, 7)).expect("spawn");
        registry.spawn(soldier(3, Team::B, 9, 9)).expect("spawn");
        let ids: Vec<UnitId> = registry
            .within(Location::new(5, 5), 5)
            .into_iter()
            .map(Unit::id)
            .collect();
        assert_eq!(ids, vec![UnitId::new(1), UnitId::new(2)]);
    }
}
