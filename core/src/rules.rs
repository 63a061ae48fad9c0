//! Tunable constants governing a match.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::AnomalyKind;

/// Parts per million used by the transmutation curve.
const PPM: u64 = 1_000_000;

/// A rule set that cannot drive a match.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RulesError {
    /// A per-mille share lies above one whole.
    #[error("{name} is {value} per mille, above 1000")]
    PermilleOutOfRange {
        /// Name of the offending rule.
        name: &'static str,
        /// Configured value.
        value: u32,
    },
    /// A bound pair is inverted.
    #[error("{name} has its minimum above its maximum")]
    InvertedBounds {
        /// Name of the offending bound pair.
        name: &'static str,
    },
    /// The transmutation curve would start above its ceiling.
    #[error("transmutation span {span} exceeds its ceiling {ceiling}")]
    TransmuteSpan {
        /// Configured ceiling.
        ceiling: u32,
        /// Configured span.
        span: u32,
    },
}

/// Per-mille rates applied by an anomaly in its global and localized form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyRates {
    /// Rate applied when the anomaly fires from the schedule.
    pub global_permille: u32,
    /// Rate applied when a unit triggers the anomaly around itself.
    pub local_permille: u32,
}

impl AnomalyRates {
    /// Creates a pair of per-mille rates.
    #[must_use]
    pub const fn new(global_permille: u32, local_permille: u32) -> Self {
        Self {
            global_permille,
            local_permille,
        }
    }
}

/// Every tunable constant consumed by the world.
///
/// Fractions are stored as per-mille integers so that all arithmetic stays
/// integral. Deserialising a partial document keeps the defaults for keys it
/// does not name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Smallest accepted map width.
    pub min_map_width: u32,
    /// Largest accepted map width.
    pub max_map_width: u32,
    /// Smallest accepted map height.
    pub min_map_height: u32,
    /// Largest accepted map height.
    pub max_map_height: u32,
    /// Fewest core units a team may start with.
    pub min_starting_cores: usize,
    /// Most core units a team may start with.
    pub max_starting_cores: usize,
    /// Smallest accepted terrain value.
    pub min_terrain: u32,
    /// Largest accepted terrain value.
    pub max_terrain: u32,
    /// Amount subtracted from each cooldown clock at the start of a turn.
    pub cooldown_decay: u32,
    /// A clock must be strictly below this value for its action to be legal.
    pub cooldown_threshold: u32,
    /// Divisor scaling terrain into the cooldown multiplier.
    pub terrain_divisor: u32,
    /// Base cooldown charged for switching structure modes.
    pub transform_cooldown: u32,
    /// Base cooldown charged to both clocks by an upgrade.
    pub upgrade_cooldown: u32,
    /// Health of a freshly built structure, per mille of its max.
    pub construction_health_permille: u32,
    /// Share of a unit's worth dropped on its cell when it dies, per mille.
    pub reclaim_permille: u32,
    /// Deposits regenerate every this many rounds.
    pub regeneration_interval: u32,
    /// Lead added to each positive deposit on regeneration.
    pub regeneration_amount: u32,
    /// Lead granted to each team at the end of every round.
    pub passive_lead_income: u32,
    /// Lead balance each team starts with.
    pub starting_lead: u32,
    /// Gold balance each team starts with.
    pub starting_gold: u32,
    /// Number of slots in each team's shared channel.
    pub channel_length: usize,
    /// Smallest value a channel slot may hold.
    pub channel_min: u32,
    /// Largest value a channel slot may hold.
    pub channel_max: u32,
    /// Damage carried from one ricochet hop to the next, per mille.
    pub ricochet_permille: u32,
    /// Rates for resource drains.
    pub drain: AnomalyRates,
    /// Rates for unit culling.
    pub culling: AnomalyRates,
    /// Rates for structure damage.
    pub structure_damage: AnomalyRates,
    /// Lead per gold that a laboratory approaches as friends crowd it.
    pub transmute_rate_ceiling: u32,
    /// Gap between the ceiling and the rate of a lone laboratory.
    pub transmute_rate_span: u32,
    /// Decay of the loneliness bonus per visible friend, in parts per million.
    pub transmute_decay_ppm: u32,
    /// Longest indicator string kept by the recorder.
    pub indicator_max_len: usize,
    /// Round limit applied to maps that do not declare one.
    pub default_round_limit: u32,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            min_map_width: 20,
            max_map_width: 60,
            min_map_height: 20,
            max_map_height: 60,
            min_starting_cores: 1,
            max_starting_cores: 4,
            min_terrain: 0,
            max_terrain: 100,
            cooldown_decay: 10,
            cooldown_threshold: 10,
            terrain_divisor: 10,
            transform_cooldown: 10,
            upgrade_cooldown: 10,
            construction_health_permille: 800,
            reclaim_permille: 200,
            regeneration_interval: 20,
            regeneration_amount: 5,
            passive_lead_income: 2,
            starting_lead: 200,
            starting_gold: 0,
            channel_length: 64,
            channel_min: 0,
            channel_max: 65_535,
            ricochet_permille: 800,
            drain: AnomalyRates::new(100, 50),
            culling: AnomalyRates::new(200, 100),
            structure_damage: AnomalyRates::new(100, 50),
            transmute_rate_ceiling: 20,
            transmute_rate_span: 18,
            transmute_decay_ppm: 980_199,
            indicator_max_len: 64,
            default_round_limit: 2000,
        }
    }
}

impl Rules {
    /// Rates for the provided anomaly, or `None` for anomalies without a rate.
    #[must_use]
    pub const fn anomaly_rates(&self, kind: AnomalyKind) -> Option<AnomalyRates> {
        match kind {
            AnomalyKind::ResourceDrain => Some(self.drain),
            AnomalyKind::UnitCulling => Some(self.culling),
            AnomalyKind::StructureDamage => Some(self.structure_damage),
            AnomalyKind::TerrainMutation => None,
        }
    }

    /// Cooldown charged for an action with `base` cost on a cell with `terrain`.
    #[must_use]
    pub const fn cooldown_cost(&self, base: u32, terrain: u32) -> u32 {
        let divisor = if self.terrain_divisor == 0 {
            1
        } else {
            self.terrain_divisor
        };
        base * (divisor + terrain) / divisor
    }

    /// Applies a per-mille rate to `value`, truncating toward zero.
    #[must_use]
    pub const fn scale_permille(value: u32, permille: u32) -> u32 {
        ((value as u64 * permille as u64) / 1000) as u32
    }

    /// Lead consumed per gold by a laboratory that sees `friends` friendly
    /// units: `ceiling - span * decay^friends`, truncated. Lonely
    /// laboratories convert cheaply and crowded ones approach the ceiling.
    #[must_use]
    pub fn transmutation_rate(&self, friends: u32) -> u32 {
        let decay = u64::from(self.transmute_decay_ppm).min(PPM);
        let mut factor = PPM;
        for _ in 0..friends {
            factor = factor * decay / PPM;
            if factor == 0 {
                break;
            }
        }
        let ceiling = u64::from(self.transmute_rate_ceiling) * PPM;
        let bonus = u64::from(self.transmute_rate_span) * factor;
        u32::try_from(ceiling.saturating_sub(bonus) / PPM).unwrap_or(u32::MAX)
    }

    /// Rejects rule sets whose shares or bounds cannot drive a match.
    pub fn validate(&self) -> Result<(), RulesError> {
        let shares = [
            ("construction_health_permille", self.construction_health_permille),
            ("reclaim_permille", self.reclaim_permille),
            ("ricochet_permille", self.ricochet_permille),
            ("drain.global_permille", self.drain.global_permille),
            ("drain.local_permille", self.drain.local_permille),
            ("culling.global_permille", self.culling.global_permille),
            ("culling.local_permille", self.culling.local_permille),
            ("structure_damage.global_permille", self.structure_damage.global_permille),
            ("structure_damage.local_permille", self.structure_damage.local_permille),
        ];
        if let Some((name, value)) = shares.into_iter().find(|(_, value)| *value > 1000) {
            return Err(RulesError::PermilleOutOfRange { name, value });
        }

        let bounds = [
            ("map width", self.min_map_width <= self.max_map_width),
            ("map height", self.min_map_height <= self.max_map_height),
            ("starting cores", self.min_starting_cores <= self.max_starting_cores),
            ("terrain", self.min_terrain <= self.max_terrain),
            ("channel", self.channel_min <= self.channel_max),
        ];
        if let Some((name, _)) = bounds.into_iter().find(|(_, ordered)| !ordered) {
            return Err(RulesError::InvertedBounds { name });
        }

        if self.transmute_rate_span > self.transmute_rate_ceiling {
            return Err(RulesError::TransmuteSpan {
                ceiling: self.transmute_rate_ceiling,
                span: self.transmute_rate_span,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_cost_scales_with_terrain() {
        let rules = Rules::default();
        assert_eq!(rules.cooldown_cost(10, 0), 10);
        assert_eq!(rules.cooldown_cost(10, 10), 20);
        assert_eq!(rules.cooldown_cost(10, 25), 35);
        assert_eq!(rules.cooldown_cost(2, 5), 3);
    }

    #[test]
    fn permille_truncates_toward_zero() {
        assert_eq!(Rules::scale_permille(100, 100), 10);
        assert_eq!(Rules::scale_permille(9, 100), 0);
        assert_eq!(Rules::scale_permille(45, 800), 36);
    }

    #[test]
    fn transmutation_follows_the_loneliness_curve() {
        let rules = Rules::default();
        assert_eq!(rules.transmutation_rate(0), 2);
        assert_eq!(rules.transmutation_rate(1), 2);
        assert_eq!(rules.transmutation_rate(35), 11);
        assert_eq!(rules.transmutation_rate(200), 19);
        assert_eq!(rules.transmutation_rate(u32::MAX), 20);
        let rates: Vec<u32> = (0..100).map(|friends| rules.transmutation_rate(friends)).collect();
        assert!(rates.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn default_rules_validate() {
        assert_eq!(Rules::default().validate(), Ok(()));
    }

    #[test]
    fn shares_above_one_whole_are_rejected() {
        let rules = Rules {
            drain: AnomalyRates::new(1500, 50),
            ..Rules::default()
        };
        assert_eq!(
            rules.validate(),
            Err(RulesError::PermilleOutOfRange {
                name: "drain.global_permille",
                value: 1500
            })
        );
        let rules = Rules {
            channel_min: 10,
            channel_max: 5,
            ..Rules::default()
        };
        assert_eq!(
            rules.validate(),
            Err(RulesError::InvertedBounds { name: "channel" })
        );
    }

    #[test]
    fn local_rates_are_smaller_than_global_rates() {
        let rules = Rules::default();
        for kind in [
            AnomalyKind::ResourceDrain,
            AnomalyKind::UnitCulling,
            AnomalyKind::StructureDamage,
        ] {
            let rates = rules.anomaly_rates(kind).expect("rated anomaly");
            assert!(rates.local_permille < rates.global_permille, "{kind:?}");
        }
        assert!(rules.anomaly_rates(AnomalyKind::TerrainMutation).is_none());
    }
}
