//! Per-unit mutable state and the rules local to a single unit.

use skirmish_core::{Location, Rules, Team, UnitId, UnitKind, UnitMode, MAX_LEVEL};

/// Result of applying a health delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HealthOutcome {
    /// Health changed (possibly by zero) and the unit survives.
    Changed,
    /// The unit reached full health while under construction and is now stationary.
    Promoted,
    /// Health reached zero; the caller must destroy the unit.
    Destroyed,
}

/// Live unit tracked by the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unit {
    id: UnitId,
    team: Team,
    kind: UnitKind,
    level: u8,
    mode: UnitMode,
    health: u32,
    location: Location,
    action_cooldown: u32,
    movement_cooldown: u32,
    rounds_alive: u32,
    budget_used: u32,
}

impl Unit {
    /// Creates a level-one unit. Map-placed structures start stationary, built
    /// structures start under construction, and droids start active.
    pub(crate) fn spawn(
        id: UnitId,
        team: Team,
        kind: UnitKind,
        location: Location,
        built: bool,
        rules: &Rules,
    ) -> Self {
        let max_health = kind.max_health(1);
        let (mode, health) = if !kind.is_structure() {
            (UnitMode::Active, max_health)
        } else if built {
            let health = Rules::scale_permille(max_health, rules.construction_health_permille);
            (UnitMode::UnderConstruction, health.max(1))
        } else {
            (UnitMode::Stationary, max_health)
        };
        Self {
            id,
            team,
            kind,
            level: 1,
            mode,
            health,
            location,
            action_cooldown: 0,
            movement_cooldown: 0,
            rounds_alive: 0,
            budget_used: 0,
        }
    }

    /// Unique identifier.
    #[must_use]
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Owning team.
    #[must_use]
    pub fn team(&self) -> Team {
        self.team
    }

    /// Kind of the unit.
    #[must_use]
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Current level, starting at one.
    #[must_use]
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Current capability state.
    #[must_use]
    pub fn mode(&self) -> UnitMode {
        self.mode
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> u32 {
        self.health
    }

    /// Max health at the current level.
    #[must_use]
    pub fn max_health(&self) -> u32 {
        self.kind.max_health(self.level)
    }

    /// Cell the unit occupies.
    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }

    /// Value of the action clock.
    #[must_use]
    pub fn action_cooldown(&self) -> u32 {
        self.action_cooldown
    }

    /// Value of the movement clock.
    #[must_use]
    pub fn movement_cooldown(&self) -> u32 {
        self.movement_cooldown
    }

    /// Number of turns the unit has completed.
    #[must_use]
    pub fn rounds_alive(&self) -> u32 {
        self.rounds_alive
    }

    /// Budget the decision logic reported for the unit's last turn.
    #[must_use]
    pub fn budget_used(&self) -> u32 {
        self.budget_used
    }

    /// Squared action radius at the current level.
    #[must_use]
    pub fn action_radius_squared(&self) -> i32 {
        self.kind.action_radius_squared(self.level)
    }

    /// Squared vision radius at the current level.
    #[must_use]
    pub fn vision_radius_squared(&self) -> i32 {
        self.kind.vision_radius_squared(self.level)
    }

    /// Whether `location` lies within the unit's action radius.
    #[must_use]
    pub fn can_reach(&self, location: Location) -> bool {
        self.location
            .is_within_distance_squared(location, self.action_radius_squared())
    }

    /// Whether `location` lies within the unit's vision radius.
    #[must_use]
    pub fn can_see(&self, location: Location) -> bool {
        self.location
            .is_within_distance_squared(location, self.vision_radius_squared())
    }

    /// Lead the unit drops on death.
    #[must_use]
    pub(crate) fn lead_drop(&self, rules: &Rules) -> u32 {
        Rules::scale_permille(self.kind.lead_worth(self.level), rules.reclaim_permille)
    }

    /// Gold the unit drops on death.
    #[must_use]
    pub(crate) fn gold_drop(&self, rules: &Rules) -> u32 {
        Rules::scale_permille(self.kind.gold_worth(self.level), rules.reclaim_permille)
    }

    pub(crate) fn is_action_ready(&self, rules: &Rules) -> bool {
        self.action_cooldown < rules.cooldown_threshold
    }

    pub(crate) fn is_movement_ready(&self, rules: &Rules) -> bool {
        self.movement_cooldown < rules.cooldown_threshold
    }

    /// Readiness of the clock a mode switch would charge.
    pub(crate) fn is_transform_ready(&self, rules: &Rules) -> bool {
        match self.mode {
            UnitMode::Stationary => self.is_action_ready(rules),
            UnitMode::MobileStructure => self.is_movement_ready(rules),
            UnitMode::Active | UnitMode::UnderConstruction => false,
        }
    }

    /// Start-of-turn cooldown decay, floored at zero.
    pub(crate) fn decay_cooldowns(&mut self, rules: &Rules) {
        self.action_cooldown = self.action_cooldown.saturating_sub(rules.cooldown_decay);
        self.movement_cooldown = self.movement_cooldown.saturating_sub(rules.cooldown_decay);
    }

    pub(crate) fn add_action_cooldown(&mut self, base: u32, terrain: u32, rules: &Rules) {
        self.action_cooldown = self
            .action_cooldown
            .saturating_add(rules.cooldown_cost(base, terrain));
    }

    pub(crate) fn add_movement_cooldown(&mut self, base: u32, terrain: u32, rules: &Rules) {
        self.movement_cooldown = self
            .movement_cooldown
            .saturating_add(rules.cooldown_cost(base, terrain));
    }

    pub(crate) fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    pub(crate) fn set_budget_used(&mut self, used: u32) {
        self.budget_used = used;
    }

    pub(crate) fn finish_turn(&mut self) {
        self.rounds_alive = self.rounds_alive.saturating_add(1);
    }

    /// Runs for every live unit before the first turn of a round. Nothing
    /// changes at this point yet.
    pub(crate) fn begin_round(&mut self) {}

    /// Runs for every unit still alive once all turns of a round are over,
    /// before the scheduled world event fires.
    pub(crate) fn end_round(&mut self) {}

    /// Clamps health into `[0, max]`, promotes a completed construction, and
    /// only then checks for death, so a fatal delta always wins.
    pub(crate) fn apply_health(&mut self, delta: i64) -> HealthOutcome {
        let max = i64::from(self.max_health());
        let next = (i64::from(self.health) + delta).clamp(0, max);
        self.health = u32::try_from(next).unwrap_or(0);

        let mut outcome = HealthOutcome::Changed;
        if self.mode == UnitMode::UnderConstruction && next == max {
            self.mode = UnitMode::Stationary;
            outcome = HealthOutcome::Promoted;
        }
        if self.health == 0 {
            return HealthOutcome::Destroyed;
        }
        outcome
    }

    /// Whether `upgrade` would change the unit.
    pub(crate) fn is_upgradable(&self) -> bool {
        matches!(self.mode, UnitMode::Stationary | UnitMode::MobileStructure)
            && self.level < MAX_LEVEL
    }

    /// Raises the level by one, carrying the max-health increase into current
    /// health and charging both clocks. Returns `false` without changes when
    /// the unit is not upgradable.
    pub(crate) fn upgrade(&mut self, terrain: u32, rules: &Rules) -> bool {
        if !self.is_upgradable() {
            return false;
        }
        let before = self.kind.max_health(self.level);
        self.level += 1;
        let after = self.kind.max_health(self.level);
        self.health = self.health.saturating_add(after.saturating_sub(before));
        self.add_action_cooldown(rules.upgrade_cooldown, terrain, rules);
        self.add_movement_cooldown(rules.upgrade_cooldown, terrain, rules);
        true
    }

    /// Switches between stationary and mobile structure modes. Packing up is
    /// charged to the action clock, unpacking to the movement clock.
    pub(crate) fn transform(&mut self, terrain: u32, rules: &Rules) -> bool {
        match self.mode {
            UnitMode::Stationary => {
                self.mode = UnitMode::MobileStructure;
                self.add_action_cooldown(rules.transform_cooldown, terrain, rules);
                true
            }
            UnitMode::MobileStructure => {
                self.mode = UnitMode::Stationary;
                self.add_movement_cooldown(rules.transform_cooldown, terrain, rules);
                true
            }
            UnitMode::Active | UnitMode::UnderConstruction => false,
        }
    }
}
