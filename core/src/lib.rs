#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the skirmish engine.
//!
//! This crate defines the message surface that connects decision logic, the
//! authoritative world, and the match recorder. Decision logic submits
//! [`Command`] values on behalf of a single unit, the world validates and
//! executes those commands through its controller, and then appends [`Event`]
//! records to a [`MatchRecorder`]. Every type here is plain data so that a
//! recorded match can be replayed bit-for-bit by a third party.

use std::fmt;

use serde::{Deserialize, Serialize};

mod error;
mod event;
mod kind;
mod rules;

pub use error::{ActionError, Capability};
pub use event::{
    ActionKind, ActionTarget, Annotation, DominationFactor, Event, MatchRecorder, Outcome,
    TeamSummary,
};
pub use kind::{KindProfile, UnitKind, MAX_LEVEL};
pub use rules::{AnomalyRates, Rules, RulesError};

/// One of the two competing teams.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    /// The first team listed in the match header.
    A,
    /// The second team listed in the match header.
    B,
}

impl Team {
    /// Both teams in canonical order.
    pub const ALL: [Team; 2] = [Team::A, Team::B];

    /// Returns the competing team.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Dense index used for per-team arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

/// One of the two team-held currencies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Common currency mined from map deposits.
    Lead,
    /// Premium currency produced by transmutation and unit drops.
    Gold,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lead => write!(f, "lead"),
            Self::Gold => write!(f, "gold"),
        }
    }
}

/// Unique identifier assigned to a unit by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Absolute map location. Maps may be offset from the origin, so coordinates
/// are signed and only meaningful together with the map's origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    x: i32,
    y: i32,
}

impl Location {
    /// Creates a location from absolute coordinates.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical coordinate.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Squared euclidean distance between two locations, saturating at
    /// `i32::MAX` for locations too far apart to represent.
    #[must_use]
    pub const fn distance_squared_to(self, other: Location) -> i32 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        let squared = dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy));
        if squared > i32::MAX as i64 {
            i32::MAX
        } else {
            squared as i32
        }
    }

    /// Reports whether `other` lies within the provided squared radius.
    #[must_use]
    pub const fn is_within_distance_squared(self, other: Location, radius_squared: i32) -> bool {
        self.distance_squared_to(other) <= radius_squared
    }

    /// Shifts the location by the provided offsets, saturating at the edges
    /// of the coordinate range.
    #[must_use]
    pub const fn translate(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    /// Location one step away in the provided direction.
    #[must_use]
    pub const fn add(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.translate(dx, dy)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The eight compass directions a unit may move or build toward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Increasing `y`.
    North,
    /// Increasing `x` and `y`.
    NorthEast,
    /// Increasing `x`.
    East,
    /// Increasing `x`, decreasing `y`.
    SouthEast,
    /// Decreasing `y`.
    South,
    /// Decreasing `x` and `y`.
    SouthWest,
    /// Decreasing `x`.
    West,
    /// Decreasing `x`, increasing `y`.
    NorthWest,
}

impl Direction {
    /// Every direction in clockwise order starting at north.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Coordinate offset applied by a single step.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::NorthEast => (1, 1),
            Self::East => (1, 0),
            Self::SouthEast => (1, -1),
            Self::South => (0, -1),
            Self::SouthWest => (-1, -1),
            Self::West => (-1, 0),
            Self::NorthWest => (-1, 1),
        }
    }
}

/// Capability state of a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitMode {
    /// Ordinary mobile unit: acts and moves, never transforms.
    Active,
    /// Freshly built structure below full health; inert until repaired.
    UnderConstruction,
    /// Structure that acts but cannot move.
    Stationary,
    /// Structure packed up for travel: moves but cannot act.
    MobileStructure,
}

impl UnitMode {
    /// Whether units in this mode may perform cooldown-gated actions.
    #[must_use]
    pub const fn can_act(self) -> bool {
        matches!(self, Self::Active | Self::Stationary)
    }

    /// Whether units in this mode may move.
    #[must_use]
    pub const fn can_move(self) -> bool {
        matches!(self, Self::Active | Self::MobileStructure)
    }

    /// Whether units in this mode may switch between stationary and mobile.
    #[must_use]
    pub const fn can_transform(self) -> bool {
        matches!(self, Self::Stationary | Self::MobileStructure)
    }
}

/// Kinds of world events ("anomalies").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnomalyKind {
    /// Removes a percentage of every resource deposit and team balance.
    ResourceDrain,
    /// Destroys the least supported fraction of mobile units.
    UnitCulling,
    /// Damages every stationary structure by a fraction of its max health.
    StructureDamage,
    /// Rearranges the terrain by a symmetry-preserving transform.
    TerrainMutation,
}

impl AnomalyKind {
    /// Whether a unit may trigger a localized variant of this anomaly.
    #[must_use]
    pub const fn is_localizable(self) -> bool {
        !matches!(self, Self::TerrainMutation)
    }
}

/// Single entry of a map's world-event schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Round at whose end the event fires.
    pub round: u32,
    /// Kind of event that fires.
    pub kind: AnomalyKind,
}

impl ScheduleEntry {
    /// Creates a schedule entry.
    #[must_use]
    pub const fn new(round: u32, kind: AnomalyKind) -> Self {
        Self { round, kind }
    }
}

/// Symmetry class a map declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symmetry {
    /// Invariant under a half turn about the map centre.
    Rotational,
    /// Invariant under reflection across the horizontal axis.
    Horizontal,
    /// Invariant under reflection across the vertical axis.
    Vertical,
}

impl Symmetry {
    /// Every symmetry class.
    pub const ALL: [Symmetry; 3] = [
        Symmetry::Rotational,
        Symmetry::Horizontal,
        Symmetry::Vertical,
    ];

    /// Transform that maps each cell onto its symmetric counterpart.
    #[must_use]
    pub const fn mirror(self) -> MapTransform {
        match self {
            Self::Rotational => MapTransform::Rotate180,
            Self::Horizontal => MapTransform::MirrorHorizontal,
            Self::Vertical => MapTransform::MirrorVertical,
        }
    }
}

/// Cell rearrangements applied to relative map coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapTransform {
    /// Half turn about the map centre.
    Rotate180,
    /// Reflection across the horizontal axis (rows are reversed).
    MirrorHorizontal,
    /// Reflection across the vertical axis (columns are reversed).
    MirrorVertical,
}

impl MapTransform {
    /// Maps relative coordinates `(x, y)` on a `width` x `height` grid.
    #[must_use]
    pub const fn apply(self, x: u32, y: u32, width: u32, height: u32) -> (u32, u32) {
        match self {
            Self::Rotate180 => (width - 1 - x, height - 1 - y),
            Self::MirrorHorizontal => (x, height - 1 - y),
            Self::MirrorVertical => (width - 1 - x, y),
        }
    }
}

/// Mutations a unit may request during its turn.
///
/// Every command is validated by exactly one legality routine that both the
/// boolean check and the mutating call share.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Step one cell in the provided direction.
    Move {
        /// Direction of travel.
        direction: Direction,
    },
    /// Construct a new unit on the adjacent cell.
    Build {
        /// Kind of unit to construct.
        kind: UnitKind,
        /// Direction of the adjacent cell that receives the unit.
        direction: Direction,
    },
    /// Damage the enemy unit standing on the target cell.
    Attack {
        /// Cell holding the primary target.
        target: Location,
    },
    /// Heal the friendly unit standing on the target cell.
    Repair {
        /// Cell holding the unit to heal.
        target: Location,
    },
    /// Extract one unit of lead from the target cell.
    MineLead {
        /// Cell holding the deposit.
        target: Location,
    },
    /// Extract one unit of gold from the target cell.
    MineGold {
        /// Cell holding the deposit.
        target: Location,
    },
    /// Raise the level of the friendly structure on the target cell.
    Upgrade {
        /// Cell holding the structure.
        target: Location,
    },
    /// Convert team lead into a single unit of gold.
    Transmute,
    /// Switch between stationary and mobile structure modes.
    Transform,
    /// Trigger a localized anomaly scoped to the acting unit's action radius.
    Envision {
        /// Anomaly to trigger.
        anomaly: AnomalyKind,
    },
    /// Store a value in the team's shared channel.
    WriteChannel {
        /// Slot to overwrite.
        index: usize,
        /// Value to store.
        value: u32,
    },
    /// Destroy the acting unit.
    Disintegrate,
    /// Destroy every unit of the acting unit's team.
    Resign,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_squared_matches_expectation() {
        let origin = Location::new(1, 1);
        let destination = Location::new(4, 3);
        assert_eq!(origin.distance_squared_to(destination), 13);
        assert_eq!(destination.distance_squared_to(origin), 13);
        assert!(origin.is_within_distance_squared(destination, 13));
        assert!(!origin.is_within_distance_squared(destination, 12));
    }

    #[test]
    fn extreme_coordinates_saturate_instead_of_overflowing() {
        let low = Location::new(i32::MIN, i32::MIN);
        let high = Location::new(i32::MAX, i32::MAX);
        assert_eq!(low.distance_squared_to(high), i32::MAX);
        assert!(!low.is_within_distance_squared(high, 34));
        assert_eq!(high.add(Direction::NorthEast), high);
        assert_eq!(low.add(Direction::SouthWest), low);
    }

    #[test]
    fn directions_cover_the_king_neighbourhood() {
        let centre = Location::new(10, 10);
        let mut neighbours: Vec<Location> =
            Direction::ALL.iter().map(|dir| centre.add(*dir)).collect();
        neighbours.sort();
        neighbours.dedup();
        assert_eq!(neighbours.len(), 8);
        assert!(neighbours
            .iter()
            .all(|loc| centre.distance_squared_to(*loc) <= 2));
    }

    #[test]
    fn modes_expose_expected_capabilities() {
        assert!(UnitMode::Active.can_act() && UnitMode::Active.can_move());
        assert!(!UnitMode::Active.can_transform());
        assert!(!UnitMode::UnderConstruction.can_act());
        assert!(!UnitMode::UnderConstruction.can_move());
        assert!(UnitMode::Stationary.can_act() && !UnitMode::Stationary.can_move());
        assert!(!UnitMode::MobileStructure.can_act() && UnitMode::MobileStructure.can_move());
        assert!(UnitMode::Stationary.can_transform() && UnitMode::MobileStructure.can_transform());
    }

    #[test]
    fn mirrors_are_involutions() {
        for transform in [
            MapTransform::Rotate180,
            MapTransform::MirrorHorizontal,
            MapTransform::MirrorVertical,
        ] {
            let (x, y) = transform.apply(3, 7, 20, 30);
            assert_eq!(transform.apply(x, y, 20, 30), (3, 7), "{transform:?}");
        }
    }

    #[test]
    fn symmetry_mirror_matches_declared_axis() {
        assert_eq!(Symmetry::Horizontal.mirror().apply(2, 0, 10, 10), (2, 9));
        assert_eq!(Symmetry::Vertical.mirror().apply(2, 0, 10, 10), (7, 0));
        assert_eq!(Symmetry::Rotational.mirror().apply(2, 0, 10, 10), (7, 9));
    }

    #[test]
    fn terrain_mutation_cannot_be_localized() {
        assert!(AnomalyKind::ResourceDrain.is_localizable());
        assert!(AnomalyKind::UnitCulling.is_localizable());
        assert!(AnomalyKind::StructureDamage.is_localizable());
        assert!(!AnomalyKind::TerrainMutation.is_localizable());
    }
}
