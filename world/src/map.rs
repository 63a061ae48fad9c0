//! Static map model, authoring builder, and validation.

use serde::{Deserialize, Serialize};
use skirmish_core::{
    AnomalyKind, Location, Rules, ScheduleEntry, Symmetry, Team, UnitKind,
};
use thiserror::Error;

/// Reasons a map is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MapError {
    /// The map is smaller or larger than the configured bounds.
    #[error(
        "map size {width}x{height} must lie between {min_width}x{min_height} and {max_width}x{max_height}"
    )]
    Dimensions {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Smallest accepted width.
        min_width: u32,
        /// Smallest accepted height.
        min_height: u32,
        /// Largest accepted width.
        max_width: u32,
        /// Largest accepted height.
        max_height: u32,
    },
    /// Team A starts with too few or too many core units.
    #[error("team A starts with {count} core units; expected between {min} and {max}")]
    CoreCount {
        /// Core units placed for team A.
        count: usize,
        /// Fewest accepted.
        min: usize,
        /// Most accepted.
        max: usize,
    },
    /// A terrain value lies outside the configured bounds.
    #[error("terrain {value} at ({x}, {y}) must lie between {min} and {max}")]
    Terrain {
        /// Column of the offending cell.
        x: u32,
        /// Row of the offending cell.
        y: u32,
        /// Offending value.
        value: u32,
        /// Smallest accepted value.
        min: u32,
        /// Largest accepted value.
        max: u32,
    },
    /// The declared symmetry does not hold for terrain, deposits, and units.
    #[error("declared {declared:?} symmetry does not hold; map is symmetric under {possible:?}")]
    Asymmetric {
        /// Symmetry the map claims.
        declared: Symmetry,
        /// Symmetries that actually hold.
        possible: Vec<Symmetry>,
    },
    /// A team has no lead deposit within starting vision of any core unit.
    #[error("{0:?} has no lead deposit visible to a core unit")]
    NoVisibleLead(Team),
    /// Two placements share a cell.
    #[error("two units placed on ({x}, {y})")]
    Collision {
        /// Column of the shared cell.
        x: u32,
        /// Row of the shared cell.
        y: u32,
    },
    /// A coordinate lies outside the map.
    #[error("({x}, {y}) lies outside the map")]
    OutOfBounds {
        /// Column of the coordinate.
        x: u32,
        /// Row of the coordinate.
        y: u32,
    },
    /// The schedule is not strictly ascending by round.
    #[error("anomaly scheduled for round {round} does not follow round {previous}")]
    ScheduleOrder {
        /// Round of the misplaced entry.
        round: u32,
        /// Round of the entry before it.
        previous: u32,
    },
    /// A per-cell array has the wrong length.
    #[error("{field} holds {actual} cells; expected {expected}")]
    CellCount {
        /// Name of the array.
        field: &'static str,
        /// Cells the map declares.
        expected: usize,
        /// Cells the array holds.
        actual: usize,
    },
}

/// Unit placed on the map before the match starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Ordinal fixing the order in which placements spawn.
    pub id: u32,
    /// Owning team.
    pub team: Team,
    /// Kind of the unit.
    pub kind: UnitKind,
    /// Column relative to the map origin.
    pub x: u32,
    /// Row relative to the map origin.
    pub y: u32,
}

/// Immutable description of a match's starting condition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMap {
    name: String,
    width: u32,
    height: u32,
    origin: Location,
    seed: u64,
    #[serde(default)]
    rounds: Option<u32>,
    symmetry: Symmetry,
    placements: Vec<Placement>,
    terrain: Vec<u32>,
    lead: Vec<u32>,
    #[serde(default)]
    schedule: Vec<ScheduleEntry>,
}

impl GameMap {
    /// Name the map is loaded by.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width in cells.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in cells.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Absolute location of the lower-left cell.
    #[must_use]
    pub fn origin(&self) -> Location {
        self.origin
    }

    /// Seed driving every random choice of a match on this map.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Round limit declared by the map, if any.
    #[must_use]
    pub fn rounds(&self) -> Option<u32> {
        self.rounds
    }

    /// Returns the map with its round limit replaced.
    #[must_use]
    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = Some(rounds);
        self
    }

    /// Declared symmetry class.
    #[must_use]
    pub fn symmetry(&self) -> Symmetry {
        self.symmetry
    }

    /// Initial units sorted by ascending ordinal.
    #[must_use]
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Terrain values in row-major order.
    #[must_use]
    pub fn terrain(&self) -> &[u32] {
        &self.terrain
    }

    /// Initial lead deposits in row-major order.
    #[must_use]
    pub fn lead(&self) -> &[u32] {
        &self.lead
    }

    /// Scheduled anomalies in strictly ascending round order.
    #[must_use]
    pub fn schedule(&self) -> &[ScheduleEntry] {
        &self.schedule
    }

    /// First scheduled anomaly firing on or after `round`.
    #[must_use]
    pub fn next_event_on_or_after(&self, round: u32) -> Option<ScheduleEntry> {
        self.schedule
            .iter()
            .copied()
            .find(|entry| entry.round >= round)
    }

    /// Whether the absolute `location` lies on the map.
    #[must_use]
    pub fn on_the_map(&self, location: Location) -> bool {
        self.location_to_index(location).is_some()
    }

    /// Row-major index of an absolute location, or `None` when off the map.
    #[must_use]
    pub fn location_to_index(&self, location: Location) -> Option<usize> {
        let x = u32::try_from(i64::from(location.x()) - i64::from(self.origin.x())).ok()?;
        let y = u32::try_from(i64::from(location.y()) - i64::from(self.origin.y())).ok()?;
        self.relative_index(x, y)
    }

    /// Absolute location of a row-major index.
    #[must_use]
    pub fn index_to_location(&self, index: usize) -> Location {
        let width = usize::try_from(self.width).unwrap_or(usize::MAX).max(1);
        let x = i32::try_from(index % width).unwrap_or(i32::MAX);
        let y = i32::try_from(index / width).unwrap_or(i32::MAX);
        self.origin.translate(x, y)
    }

    /// Absolute location of relative coordinates.
    #[must_use]
    pub fn absolute(&self, x: u32, y: u32) -> Location {
        self.origin.translate(
            i32::try_from(x).unwrap_or(i32::MAX),
            i32::try_from(y).unwrap_or(i32::MAX),
        )
    }

    fn relative_index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        usize::try_from(u64::from(y) * u64::from(self.width) + u64::from(x)).ok()
    }

    fn cell_count(&self) -> usize {
        usize::try_from(u64::from(self.width) * u64::from(self.height)).unwrap_or(0)
    }

    fn check_cells(&self) -> Result<(), MapError> {
        let expected = self.cell_count();
        for (field, actual) in [("terrain", self.terrain.len()), ("lead", self.lead.len())] {
            if actual != expected {
                return Err(MapError::CellCount {
                    field,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    fn occupants(&self) -> Result<Vec<Option<(Team, UnitKind)>>, MapError> {
        let mut occupants = vec![None; self.cell_count()];
        for placement in &self.placements {
            let index = self
                .relative_index(placement.x, placement.y)
                .ok_or(MapError::OutOfBounds {
                    x: placement.x,
                    y: placement.y,
                })?;
            if occupants[index].is_some() {
                return Err(MapError::Collision {
                    x: placement.x,
                    y: placement.y,
                });
            }
            occupants[index] = Some((placement.team, placement.kind));
        }
        Ok(occupants)
    }

    /// Symmetry classes under which terrain, deposits, and units all mirror.
    ///
    /// A mirrored occupant must have the same kind and belong to the opposite
    /// team.
    pub fn possible_symmetries(&self) -> Result<Vec<Symmetry>, MapError> {
        self.check_cells()?;
        let occupants = self.occupants()?;
        Ok(Symmetry::ALL
            .into_iter()
            .filter(|symmetry| self.holds_under(*symmetry, &occupants))
            .collect())
    }

    fn holds_under(&self, symmetry: Symmetry, occupants: &[Option<(Team, UnitKind)>]) -> bool {
        let transform = symmetry.mirror();
        for y in 0..self.height {
            for x in 0..self.width {
                let (mx, my) = transform.apply(x, y, self.width, self.height);
                let (Some(here), Some(there)) =
                    (self.relative_index(x, y), self.relative_index(mx, my))
                else {
                    return false;
                };
                if self.terrain[here] != self.terrain[there] || self.lead[here] != self.lead[there]
                {
                    return false;
                }
                match (occupants[here], occupants[there]) {
                    (None, None) => {}
                    (Some((team, kind)), Some((other_team, other_kind))) => {
                        if kind != other_kind || team == other_team {
                            return false;
                        }
                    }
                    _ => return false,
                }
            }
        }
        true
    }

    /// Checks every structural rule a playable map must satisfy.
    pub fn validate(&self, rules: &Rules) -> Result<(), MapError> {
        if self.width < rules.min_map_width
            || self.width > rules.max_map_width
            || self.height < rules.min_map_height
            || self.height > rules.max_map_height
        {
            return Err(MapError::Dimensions {
                width: self.width,
                height: self.height,
                min_width: rules.min_map_width,
                min_height: rules.min_map_height,
                max_width: rules.max_map_width,
                max_height: rules.max_map_height,
            });
        }

        self.check_cells()?;

        // Symmetry is checked below, so counting one team suffices.
        let cores = self
            .placements
            .iter()
            .filter(|placement| placement.team == Team::A && placement.kind.is_core())
            .count();
        if cores < rules.min_starting_cores || cores > rules.max_starting_cores {
            return Err(MapError::CoreCount {
                count: cores,
                min: rules.min_starting_cores,
                max: rules.max_starting_cores,
            });
        }

        for (index, value) in self.terrain.iter().copied().enumerate() {
            if value < rules.min_terrain || value > rules.max_terrain {
                let location = self.index_to_location(index);
                return Err(MapError::Terrain {
                    x: location.x().abs_diff(self.origin.x()),
                    y: location.y().abs_diff(self.origin.y()),
                    value,
                    min: rules.min_terrain,
                    max: rules.max_terrain,
                });
            }
        }

        let possible = self.possible_symmetries()?;
        if !possible.contains(&self.symmetry) {
            return Err(MapError::Asymmetric {
                declared: self.symmetry,
                possible,
            });
        }

        for team in Team::ALL {
            if !self.has_visible_lead(team) {
                return Err(MapError::NoVisibleLead(team));
            }
        }

        let mut previous: Option<u32> = None;
        for entry in &self.schedule {
            if let Some(previous) = previous {
                if entry.round <= previous {
                    return Err(MapError::ScheduleOrder {
                        round: entry.round,
                        previous,
                    });
                }
            }
            previous = Some(entry.round);
        }

        Ok(())
    }

    fn has_visible_lead(&self, team: Team) -> bool {
        self.placements
            .iter()
            .filter(|placement| placement.team == team && placement.kind.is_core())
            .any(|placement| {
                let centre = self.absolute(placement.x, placement.y);
                let radius = placement.kind.vision_radius_squared(1);
                self.lead.iter().enumerate().any(|(index, amount)| {
                    *amount > 0
                        && centre.is_within_distance_squared(self.index_to_location(index), radius)
                })
            })
    }
}

/// Accumulates a map description before it is frozen into a [`GameMap`].
#[derive(Clone, Debug)]
pub struct MapBuilder {
    map: GameMap,
    next_ordinal: u32,
}

impl MapBuilder {
    /// Starts an empty map with flat terrain, no deposits, and rotational symmetry.
    #[must_use]
    pub fn new(name: impl Into<String>, width: u32, height: u32, origin: Location, seed: u64) -> Self {
        let cells = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            map: GameMap {
                name: name.into(),
                width,
                height,
                origin,
                seed,
                rounds: None,
                symmetry: Symmetry::Rotational,
                placements: Vec::new(),
                terrain: vec![0; cells],
                lead: vec![0; cells],
                schedule: Vec::new(),
            },
            next_ordinal: 0,
        }
    }

    /// Declares the round limit.
    pub fn rounds(&mut self, rounds: u32) -> &mut Self {
        self.map.rounds = Some(rounds);
        self
    }

    /// Declares the symmetry class used by the symmetric setters.
    pub fn symmetry(&mut self, symmetry: Symmetry) -> &mut Self {
        self.map.symmetry = symmetry;
        self
    }

    /// Mirror of relative coordinates under the declared symmetry.
    #[must_use]
    pub fn mirror(&self, x: u32, y: u32) -> (u32, u32) {
        self.map
            .symmetry
            .mirror()
            .apply(x, y, self.map.width, self.map.height)
    }

    fn index(&self, x: u32, y: u32) -> Result<usize, MapError> {
        self.map
            .relative_index(x, y)
            .ok_or(MapError::OutOfBounds { x, y })
    }

    /// Places a unit, rejecting cells outside the map or already taken.
    pub fn add_unit(&mut self, team: Team, kind: UnitKind, x: u32, y: u32) -> Result<(), MapError> {
        let _ = self.index(x, y)?;
        if self
            .map
            .placements
            .iter()
            .any(|placement| placement.x == x && placement.y == y)
        {
            return Err(MapError::Collision { x, y });
        }
        self.map.placements.push(Placement {
            id: self.next_ordinal,
            team,
            kind,
            x,
            y,
        });
        self.next_ordinal += 1;
        Ok(())
    }

    /// Places a team A unit and its team B mirror.
    pub fn add_symmetric_unit(&mut self, kind: UnitKind, x: u32, y: u32) -> Result<(), MapError> {
        let (mx, my) = self.mirror(x, y);
        self.add_unit(Team::A, kind, x, y)?;
        self.add_unit(Team::B, kind, mx, my)
    }

    /// Removes the unit placed on a cell, reporting whether one was there.
    pub fn remove_unit(&mut self, x: u32, y: u32) -> bool {
        let before = self.map.placements.len();
        self.map
            .placements
            .retain(|placement| placement.x != x || placement.y != y);
        self.map.placements.len() != before
    }

    /// Sets the terrain of one cell.
    pub fn set_terrain(&mut self, x: u32, y: u32, value: u32) -> Result<(), MapError> {
        let index = self.index(x, y)?;
        self.map.terrain[index] = value;
        Ok(())
    }

    /// Sets the terrain of a cell and its mirror.
    pub fn set_symmetric_terrain(&mut self, x: u32, y: u32, value: u32) -> Result<(), MapError> {
        let (mx, my) = self.mirror(x, y);
        self.set_terrain(x, y, value)?;
        self.set_terrain(mx, my, value)
    }

    /// Sets the lead deposit of one cell.
    pub fn set_lead(&mut self, x: u32, y: u32, value: u32) -> Result<(), MapError> {
        let index = self.index(x, y)?;
        self.map.lead[index] = value;
        Ok(())
    }

    /// Sets the lead deposit of a cell and its mirror.
    pub fn set_symmetric_lead(&mut self, x: u32, y: u32, value: u32) -> Result<(), MapError> {
        let (mx, my) = self.mirror(x, y);
        self.set_lead(x, y, value)?;
        self.set_lead(mx, my, value)
    }

    /// Appends an anomaly to the schedule.
    pub fn add_anomaly(&mut self, round: u32, kind: AnomalyKind) -> &mut Self {
        self.map.schedule.push(ScheduleEntry::new(round, kind));
        self
    }

    /// Validates the map that `build` would produce.
    pub fn validate(&self, rules: &Rules) -> Result<(), MapError> {
        self.map.validate(rules)
    }

    /// Freezes the accumulated description.
    #[must_use]
    pub fn build(&self) -> GameMap {
        let mut map = self.map.clone();
        map.placements.sort_by_key(|placement| placement.id);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadrants() -> MapBuilder {
        let mut builder = MapBuilder::new("quadrants", 20, 20, Location::new(0, 0), 1);
        builder
            .add_symmetric_unit(UnitKind::Headquarters, 3, 4)
            .expect("place");
        builder.set_symmetric_lead(5, 5, 30).expect("lead");
        builder.set_symmetric_terrain(10, 2, 40).expect("terrain");
        builder
    }

    #[test]
    fn rotational_map_validates() {
        let builder = quadrants();
        assert_eq!(builder.validate(&Rules::default()), Ok(()));
        let map = builder.build();
        assert_eq!(map.possible_symmetries(), Ok(vec![Symmetry::Rotational]));
    }

    #[test]
    fn far_locations_on_an_offset_map_have_no_index() {
        let mut builder = MapBuilder::new("offset", 20, 20, Location::new(10_000, 10_000), 1);
        builder
            .add_symmetric_unit(UnitKind::Headquarters, 3, 4)
            .expect("place");
        let map = builder.build();
        assert_eq!(map.location_to_index(Location::new(i32::MIN, 10_000)), None);
        assert_eq!(map.location_to_index(Location::new(10_000, i32::MAX)), None);
        assert!(!map.on_the_map(Location::new(i32::MIN, i32::MIN)));
        assert_eq!(map.location_to_index(Location::new(10_001, 10_002)), Some(41));
    }

    #[test]
    fn colliding_placements_are_rejected() {
        let mut builder = quadrants();
        assert_eq!(
            builder.add_unit(Team::B, UnitKind::Soldier, 3, 4),
            Err(MapError::Collision { x: 3, y: 4 })
        );
        assert_eq!(
            builder.add_unit(Team::B, UnitKind::Soldier, 20, 4),
            Err(MapError::OutOfBounds { x: 20, y: 4 })
        );
    }

    #[test]
    fn missing_counterpart_breaks_symmetry() {
        let mut builder = quadrants();
        builder
            .add_unit(Team::A, UnitKind::Headquarters, 8, 8)
            .expect("place");
        assert!(matches!(
            builder.validate(&Rules::default()),
            Err(MapError::Asymmetric {
                declared: Symmetry::Rotational,
                ..
            })
        ));
    }

    #[test]
    fn same_team_mirror_is_not_symmetric() {
        let mut builder = MapBuilder::new("mirror", 20, 20, Location::new(0, 0), 1);
        builder
            .add_unit(Team::A, UnitKind::Headquarters, 3, 4)
            .expect("place");
        builder
            .add_unit(Team::A, UnitKind::Headquarters, 16, 15)
            .expect("place");
        builder.set_symmetric_lead(5, 5, 30).expect("lead");
        let possible = builder.build().possible_symmetries().expect("symmetries");
        assert!(!possible.contains(&Symmetry::Rotational));
    }

    #[test]
    fn dimensions_and_terrain_are_bounded() {
        let mut builder = MapBuilder::new("tiny", 10, 20, Location::new(0, 0), 1);
        builder
            .add_symmetric_unit(UnitKind::Headquarters, 1, 1)
            .expect("place");
        assert!(matches!(
            builder.validate(&Rules::default()),
            Err(MapError::Dimensions { width: 10, .. })
        ));

        let mut builder = quadrants();
        builder.set_symmetric_terrain(0, 0, 101).expect("terrain");
        assert!(matches!(
            builder.validate(&Rules::default()),
            Err(MapError::Terrain { value: 101, .. })
        ));
    }

    #[test]
    fn core_count_is_bounded() {
        let mut builder = MapBuilder::new("empty", 20, 20, Location::new(0, 0), 1);
        builder.set_symmetric_lead(5, 5, 30).expect("lead");
        assert_eq!(
            builder.validate(&Rules::default()),
            Err(MapError::CoreCount {
                count: 0,
                min: 1,
                max: 4
            })
        );
    }

    #[test]
    fn lead_must_be_visible_to_each_team() {
        let mut builder = MapBuilder::new("barren", 20, 20, Location::new(0, 0), 1);
        builder
            .add_symmetric_unit(UnitKind::Headquarters, 0, 0)
            .expect("place");
        builder.set_symmetric_lead(10, 0, 30).expect("lead");
        assert_eq!(
            builder.validate(&Rules::default()),
            Err(MapError::NoVisibleLead(Team::A))
        );
    }

    #[test]
    fn schedule_must_strictly_ascend() {
        let mut builder = quadrants();
        let _ = builder
            .add_anomaly(5, AnomalyKind::ResourceDrain)
            .add_anomaly(5, AnomalyKind::UnitCulling);
        assert_eq!(
            builder.validate(&Rules::default()),
            Err(MapError::ScheduleOrder {
                round: 5,
                previous: 5
            })
        );
    }

    #[test]
    fn next_event_looks_forward_only() {
        let mut builder = quadrants();
        let _ = builder
            .add_anomaly(5, AnomalyKind::ResourceDrain)
            .add_anomaly(9, AnomalyKind::TerrainMutation);
        let map = builder.build();
        assert_eq!(
            map.next_event_on_or_after(5),
            Some(ScheduleEntry::new(5, AnomalyKind::ResourceDrain))
        );
        assert_eq!(
            map.next_event_on_or_after(6),
            Some(ScheduleEntry::new(9, AnomalyKind::TerrainMutation))
        );
        assert_eq!(map.next_event_on_or_after(10), None);
    }

    #[test]
    fn indices_respect_the_origin() {
        let map = MapBuilder::new("offset", 20, 30, Location::new(100, -50), 1).build();
        assert_eq!(map.location_to_index(Location::new(100, -50)), Some(0));
        assert_eq!(map.location_to_index(Location::new(101, -49)), Some(21));
        assert_eq!(map.location_to_index(Location::new(99, -50)), None);
        assert_eq!(map.location_to_index(Location::new(120, -50)), None);
        assert_eq!(map.index_to_location(21), Location::new(101, -49));
    }
}
