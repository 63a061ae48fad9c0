use serde::{Deserialize, Serialize};

use crate::{
    AnomalyKind, Currency, KindProfile, Location, MapTransform, Rules, Team, UnitId, UnitKind,
};

/// Kind tag attached to every action record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Damage dealt to a unit, by the primary strike or a ricochet hop.
    Attack,
    /// A unit was constructed.
    Build,
    /// Lead extracted from a cell.
    MineLead,
    /// Gold extracted from a cell.
    MineGold,
    /// Lead converted into gold.
    Transmute,
    /// A structure switched modes.
    Transform,
    /// A structure gained a level.
    Upgrade,
    /// A unit was healed.
    Repair,
    /// Secondary record carrying a unit's new health after a delta.
    HealthChanged,
    /// A structure finished construction.
    FullyRepaired,
    /// A unit triggered a localized anomaly.
    Envision(AnomalyKind),
    /// A unit was destroyed because its decision logic faulted.
    FaultDeath,
    /// A unit destroyed itself.
    Disintegrate,
    /// A team gave up.
    Resign,
    /// A value was written to the team's channel.
    ChannelWrite,
}

/// Target slot of an action record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionTarget {
    /// The action has no target.
    None,
    /// The action targeted a unit.
    Unit(UnitId),
    /// The action targeted a cell.
    Location(Location),
    /// The action carries a signed quantity.
    Amount(i64),
}

/// Debug annotation recorded for a unit. Annotations never affect state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Annotation {
    /// Free-form text, truncated to the configured limit.
    Text(String),
    /// Coloured dot drawn on a cell.
    Dot {
        /// Annotated cell.
        location: Location,
        /// RGB colour.
        color: [u8; 3],
    },
    /// Coloured line drawn between two cells.
    Line {
        /// Start cell.
        from: Location,
        /// End cell.
        to: Location,
        /// RGB colour.
        color: [u8; 3],
    },
}

/// Category explaining why a match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DominationFactor {
    /// The losing team has no units left, or resigned.
    Annihilated,
    /// The winner has more core units alive at the round limit.
    MoreCoreUnits,
    /// The winner has more gold net worth at the round limit.
    MoreGoldNetWorth,
    /// The winner has more lead net worth at the round limit.
    MoreLeadNetWorth,
    /// Every tiebreak was equal; the seeded RNG picked the winner.
    Arbitrated,
}

/// Terminal result of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Team that won.
    pub winner: Team,
    /// Reason the match was decided.
    pub factor: DominationFactor,
}

/// Per-team balances reported at the end of every round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSummary {
    /// Team described by the summary.
    pub team: Team,
    /// Lead balance at the end of the round.
    pub lead: u32,
    /// Gold balance at the end of the round.
    pub gold: u32,
    /// Change in lead since the previous summary.
    pub lead_delta: i64,
    /// Change in gold since the previous summary.
    pub gold_delta: i64,
}

/// Record appended to the match recorder.
///
/// Events are produced in the exact order their effects occur; that order is
/// part of the replay contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// First record of every match.
    MatchHeader {
        /// Name of the map being played.
        map_name: String,
        /// Map width in cells.
        width: u32,
        /// Map height in cells.
        height: u32,
        /// Absolute location of the map's lower-left cell.
        origin: Location,
        /// Seed that drives every random choice.
        seed: u64,
        /// Rounds played before tiebreaks decide the match.
        round_limit: u32,
        /// Stat table of every unit kind.
        kinds: Vec<KindProfile>,
        /// Constants the match runs with.
        rules: Rules,
    },
    /// A unit entered the registry.
    UnitSpawned {
        /// Identifier assigned to the unit.
        unit: UnitId,
        /// Owning team.
        team: Team,
        /// Kind of the unit.
        kind: UnitKind,
        /// Cell the unit occupies.
        location: Location,
        /// Starting level.
        level: u8,
        /// Starting health.
        health: u32,
    },
    /// A unit stepped to a new cell.
    UnitMoved {
        /// Unit that moved.
        unit: UnitId,
        /// Destination cell.
        to: Location,
    },
    /// A unit left the registry.
    UnitDied {
        /// Unit that died.
        unit: UnitId,
    },
    /// A unit performed an action, or an action had a secondary effect.
    Action {
        /// Unit the record is about.
        unit: UnitId,
        /// Kind tag.
        action: ActionKind,
        /// Target of the action.
        target: ActionTarget,
    },
    /// Resources landed on a cell.
    ResourceDropped {
        /// Cell receiving the drop.
        location: Location,
        /// Currency dropped.
        currency: Currency,
        /// Amount dropped.
        amount: u32,
    },
    /// A scheduled anomaly fired.
    AnomalyTriggered {
        /// Anomaly kind.
        kind: AnomalyKind,
        /// Transform chosen by a terrain mutation.
        transform: Option<MapTransform>,
    },
    /// Debug annotation for a unit.
    Indicator {
        /// Unit that set the annotation.
        unit: UnitId,
        /// Annotation content.
        annotation: Annotation,
    },
    /// Budget consumed by a unit's turn.
    BudgetUsed {
        /// Unit whose turn ended.
        unit: UnitId,
        /// Budget the decision logic reported.
        used: u32,
    },
    /// Closing record of every round.
    RoundSummary {
        /// Round that ended.
        round: u32,
        /// Balances for both teams in canonical order.
        teams: [TeamSummary; 2],
    },
    /// Final record of every match.
    MatchFooter {
        /// Result, unset only when a fault aborted the match.
        outcome: Option<Outcome>,
        /// Rounds that were played.
        total_rounds: u32,
        /// Total budget consumed by each team.
        budget: [u64; 2],
    },
}

/// Sink that receives match events in order.
pub trait MatchRecorder {
    /// Appends a single event.
    fn record(&mut self, event: &Event);
}

impl MatchRecorder for Vec<Event> {
    fn record(&mut self, event: &Event) {
        self.push(event.clone());
    }
}
