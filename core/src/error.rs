use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Currency, Location, UnitId, UnitKind, UnitMode};

/// Capability an action requires from the acting unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Any cooldown-gated action.
    Act,
    /// Stepping to a neighbouring cell.
    Move,
    /// Switching between stationary and mobile structure modes.
    Transform,
    /// Damaging an enemy.
    Attack,
    /// Constructing a unit.
    Build,
    /// Healing a friendly unit.
    Repair,
    /// Extracting resources.
    Mine,
    /// Raising a structure's level.
    Upgrade,
    /// Converting lead into gold.
    Transmute,
    /// Triggering a localized anomaly.
    Envision,
}

/// Reasons an action request is rejected.
///
/// Every variant names the single precondition that failed. A rejected
/// request never mutates the world.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The referenced unit does not exist.
    #[error("unit {0} does not exist")]
    UnknownUnit(UnitId),
    /// The referenced location lies outside the map.
    #[error("location {0} is off the map")]
    OffMap(Location),
    /// The referenced location lies outside the acting unit's vision radius.
    #[error("location {0} is outside vision range")]
    OutOfVision(Location),
    /// The referenced location lies outside the acting unit's action radius.
    #[error("location {0} is outside action range")]
    OutOfRange(Location),
    /// The target cell already holds a unit.
    #[error("location {0} is occupied")]
    Occupied(Location),
    /// The target cell holds no unit.
    #[error("no unit at {0}")]
    NoUnitAt(Location),
    /// The team cannot afford the action.
    #[error("insufficient {currency}: {required} required, {available} available")]
    InsufficientFunds {
        /// Currency that is short.
        currency: Currency,
        /// Amount the action needs.
        required: u32,
        /// Amount the team holds.
        available: u32,
    },
    /// The action clock is not below the readiness threshold.
    #[error("action cooldown not ready")]
    ActionNotReady,
    /// The movement clock is not below the readiness threshold.
    #[error("movement cooldown not ready")]
    MovementNotReady,
    /// The clock charged by a mode switch is not below the readiness threshold.
    #[error("transform cooldown not ready")]
    TransformNotReady,
    /// The unit's current mode forbids the capability.
    #[error("mode {mode:?} cannot {capability:?}")]
    ModeForbids {
        /// Mode of the acting unit.
        mode: UnitMode,
        /// Capability that was requested.
        capability: Capability,
    },
    /// The unit's kind forbids the capability (against this target, if any).
    #[error("{kind:?} cannot {capability:?}")]
    KindForbids {
        /// Kind of the acting unit.
        kind: UnitKind,
        /// Capability that was requested.
        capability: Capability,
    },
    /// The target belongs to the wrong team for the action.
    #[error("unit {0} belongs to the wrong team")]
    WrongTeam(UnitId),
    /// The target cell holds no deposit of the requested currency.
    #[error("no {currency} to mine at {location}")]
    NothingToMine {
        /// Cell that was mined.
        location: Location,
        /// Currency that was requested.
        currency: Currency,
    },
    /// The target is already at the highest level.
    #[error("unit {0} cannot be upgraded further")]
    NotUpgradable(UnitId),
    /// The anomaly has no localized variant.
    #[error("anomaly cannot be localized")]
    NotLocalizable,
    /// The channel index is outside the channel.
    #[error("channel index {0} out of range")]
    ChannelIndex(usize),
    /// The channel value is outside the configured bounds.
    #[error("channel value {0} out of range")]
    ChannelValue(u32),
    /// An internal invariant broke while applying the action; the match ends.
    #[error("simulation fault: {0}")]
    Fault(String),
}
