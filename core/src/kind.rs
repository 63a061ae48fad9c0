//! Static stat table for every unit kind.
//!
//! All per-kind behaviour is data: each kind maps to one [`KindProfile`] and
//! every derived quantity is a pure function of `(kind, level)`.

use serde::{Deserialize, Serialize};

/// Highest level a unit can reach through upgrades.
pub const MAX_LEVEL: u8 = 3;

/// Closed set of unit kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// Core structure. Builds mobile units and repairs them; losing every
    /// headquarters decides the round-limit tiebreak.
    Headquarters,
    /// Structure that transmutes lead into gold.
    Laboratory,
    /// Defensive structure whose shots ricochet at higher levels.
    Watchtower,
    /// Mobile unit that extracts lead and gold.
    Miner,
    /// Mobile unit that builds, repairs, and upgrades structures.
    Builder,
    /// Mobile combat unit.
    Soldier,
    /// Gold-funded mobile unit with ricocheting attacks and localized anomalies.
    Sage,
}

/// Plain data describing a unit kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindProfile {
    /// Kind described by this profile.
    pub kind: UnitKind,
    /// Lead spent to build one unit.
    pub lead_cost: u32,
    /// Gold spent to build one unit.
    pub gold_cost: u32,
    /// Base action cooldown added per cooldown-gated action.
    pub action_cooldown: u32,
    /// Base movement cooldown added per step.
    pub movement_cooldown: u32,
    /// Max health indexed by `level - 1`.
    pub max_health: [u32; MAX_LEVEL as usize],
    /// Attack damage indexed by `level - 1`.
    pub damage: [u32; MAX_LEVEL as usize],
    /// Repair amount indexed by `level - 1`.
    pub healing: [u32; MAX_LEVEL as usize],
    /// Ricochet hop count indexed by `level - 1`.
    pub ricochet: [u32; MAX_LEVEL as usize],
    /// Squared radius gating effectful actions.
    pub action_radius_squared: i32,
    /// Squared radius gating sensing.
    pub vision_radius_squared: i32,
    /// Per-turn computation budget granted to decision logic.
    pub budget: u32,
    /// Whether the kind is a structure (transforms, spawns under construction).
    pub structure: bool,
}

const HEADQUARTERS: KindProfile = KindProfile {
    kind: UnitKind::Headquarters,
    lead_cost: 0,
    gold_cost: 100,
    action_cooldown: 10,
    movement_cooldown: 24,
    max_health: [1000, 1100, 1200],
    damage: [0, 0, 0],
    healing: [2, 3, 4],
    ricochet: [0, 0, 0],
    action_radius_squared: 20,
    vision_radius_squared: 34,
    budget: 20_000,
    structure: true,
};

const LABORATORY: KindProfile = KindProfile {
    kind: UnitKind::Laboratory,
    lead_cost: 180,
    gold_cost: 0,
    action_cooldown: 10,
    movement_cooldown: 24,
    max_health: [100, 110, 120],
    damage: [0, 0, 0],
    healing: [0, 0, 0],
    ricochet: [0, 0, 0],
    action_radius_squared: 0,
    vision_radius_squared: 53,
    budget: 5_000,
    structure: true,
};

const WATCHTOWER: KindProfile = KindProfile {
    kind: UnitKind::Watchtower,
    lead_cost: 150,
    gold_cost: 0,
    action_cooldown: 10,
    movement_cooldown: 24,
    max_health: [150, 165, 180],
    damage: [4, 5, 6],
    healing: [0, 0, 0],
    ricochet: [0, 1, 2],
    action_radius_squared: 20,
    vision_radius_squared: 34,
    budget: 10_000,
    structure: true,
};

const MINER: KindProfile = KindProfile {
    kind: UnitKind::Miner,
    lead_cost: 50,
    gold_cost: 0,
    action_cooldown: 2,
    movement_cooldown: 20,
    max_health: [40, 40, 40],
    damage: [0, 0, 0],
    healing: [0, 0, 0],
    ricochet: [0, 0, 0],
    action_radius_squared: 2,
    vision_radius_squared: 20,
    budget: 7_500,
    structure: false,
};

const BUILDER: KindProfile = KindProfile {
    kind: UnitKind::Builder,
    lead_cost: 40,
    gold_cost: 0,
    action_cooldown: 10,
    movement_cooldown: 20,
    max_health: [30, 30, 30],
    damage: [0, 0, 0],
    healing: [2, 2, 2],
    ricochet: [0, 0, 0],
    action_radius_squared: 5,
    vision_radius_squared: 20,
    budget: 7_500,
    structure: false,
};

const SOLDIER: KindProfile = KindProfile {
    kind: UnitKind::Soldier,
    lead_cost: 75,
    gold_cost: 0,
    action_cooldown: 10,
    movement_cooldown: 16,
    max_health: [50, 50, 50],
    damage: [3, 3, 3],
    healing: [0, 0, 0],
    ricochet: [0, 0, 0],
    action_radius_squared: 13,
    vision_radius_squared: 20,
    budget: 10_000,
    structure: false,
};

const SAGE: KindProfile = KindProfile {
    kind: UnitKind::Sage,
    lead_cost: 0,
    gold_cost: 20,
    action_cooldown: 200,
    movement_cooldown: 25,
    max_health: [100, 100, 100],
    damage: [45, 45, 45],
    healing: [0, 0, 0],
    ricochet: [2, 2, 2],
    action_radius_squared: 25,
    vision_radius_squared: 34,
    budget: 10_000,
    structure: false,
};

impl UnitKind {
    /// Every unit kind in canonical order.
    pub const ALL: [UnitKind; 7] = [
        UnitKind::Headquarters,
        UnitKind::Laboratory,
        UnitKind::Watchtower,
        UnitKind::Miner,
        UnitKind::Builder,
        UnitKind::Soldier,
        UnitKind::Sage,
    ];

    /// Dense index used for per-kind arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stat table row for this kind.
    #[must_use]
    pub const fn profile(self) -> &'static KindProfile {
        match self {
            Self::Headquarters => &HEADQUARTERS,
            Self::Laboratory => &LABORATORY,
            Self::Watchtower => &WATCHTOWER,
            Self::Miner => &MINER,
            Self::Builder => &BUILDER,
            Self::Soldier => &SOLDIER,
            Self::Sage => &SAGE,
        }
    }

    /// Whether this kind counts toward the core-unit tiebreak.
    #[must_use]
    pub const fn is_core(self) -> bool {
        matches!(self, Self::Headquarters)
    }

    /// Whether this kind is a structure.
    #[must_use]
    pub const fn is_structure(self) -> bool {
        self.profile().structure
    }

    /// Max health at the provided level.
    #[must_use]
    pub const fn max_health(self, level: u8) -> u32 {
        self.profile().max_health[level_index(level)]
    }

    /// Attack damage at the provided level.
    #[must_use]
    pub const fn damage(self, level: u8) -> u32 {
        self.profile().damage[level_index(level)]
    }

    /// Repair amount at the provided level.
    #[must_use]
    pub const fn healing(self, level: u8) -> u32 {
        self.profile().healing[level_index(level)]
    }

    /// Number of extra targets an attack bounces to at the provided level.
    #[must_use]
    pub const fn ricochet_count(self, level: u8) -> u32 {
        self.profile().ricochet[level_index(level)]
    }

    /// Squared action radius at the provided level.
    #[must_use]
    pub const fn action_radius_squared(self, _level: u8) -> i32 {
        self.profile().action_radius_squared
    }

    /// Squared vision radius at the provided level.
    #[must_use]
    pub const fn vision_radius_squared(self, _level: u8) -> i32 {
        self.profile().vision_radius_squared
    }

    /// Lead required to upgrade to `level`.
    #[must_use]
    pub const fn lead_upgrade_cost(self, level: u8) -> u32 {
        if level == 2 {
            600
        } else {
            0
        }
    }

    /// Gold required to upgrade to `level`.
    #[must_use]
    pub const fn gold_upgrade_cost(self, level: u8) -> u32 {
        if level == 3 {
            100
        } else {
            0
        }
    }

    /// Lead invested in a unit of this kind at `level`: build cost plus every
    /// upgrade it received.
    #[must_use]
    pub fn lead_worth(self, level: u8) -> u32 {
        (2..=level).fold(self.profile().lead_cost, |total, step| {
            total + self.lead_upgrade_cost(step)
        })
    }

    /// Gold invested in a unit of this kind at `level`.
    #[must_use]
    pub fn gold_worth(self, level: u8) -> u32 {
        (2..=level).fold(self.profile().gold_cost, |total, step| {
            total + self.gold_upgrade_cost(step)
        })
    }

    /// Whether this kind may attack.
    #[must_use]
    pub fn can_attack(self) -> bool {
        self.damage(1) > 0
    }

    /// Whether this kind may construct units of kind `other`.
    #[must_use]
    pub const fn can_build(self, other: UnitKind) -> bool {
        match self {
            Self::Headquarters => matches!(
                other,
                Self::Miner | Self::Builder | Self::Soldier | Self::Sage
            ),
            Self::Builder => matches!(other, Self::Laboratory | Self::Watchtower),
            _ => false,
        }
    }

    /// Whether this kind may repair units of kind `other`.
    #[must_use]
    pub const fn can_repair(self, other: UnitKind) -> bool {
        match self {
            Self::Headquarters => !other.is_structure(),
            Self::Builder => other.is_structure(),
            _ => false,
        }
    }

    /// Whether this kind may upgrade units of kind `other`.
    #[must_use]
    pub const fn can_upgrade(self, other: UnitKind) -> bool {
        matches!(self, Self::Builder) && other.is_structure()
    }

    /// Whether this kind may extract resources.
    #[must_use]
    pub const fn can_mine(self) -> bool {
        matches!(self, Self::Miner)
    }

    /// Whether this kind may convert lead into gold.
    #[must_use]
    pub const fn can_transmute(self) -> bool {
        matches!(self, Self::Laboratory)
    }

    /// Whether this kind may trigger localized anomalies.
    #[must_use]
    pub const fn can_envision(self) -> bool {
        matches!(self, Self::Sage)
    }
}

const fn level_index(level: u8) -> usize {
    let clamped = if level == 0 {
        1
    } else if level > MAX_LEVEL {
        MAX_LEVEL
    } else {
        level
    };
    clamped as usize - 1
}
