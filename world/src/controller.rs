//! Action contract exposed to decision logic during a unit's turn.
//!
//! A [`Controller`] wraps the world for exactly one unit. Every command runs
//! through a single legality check that backs both the boolean `can_*`
//! checks and the mutating calls, so a check that answers `true` guarantees
//! the matching call succeeds in the same state.

use skirmish_core::{
    ActionError, ActionKind, ActionTarget, AnomalyKind, Annotation, Capability, Command, Currency,
    Direction, Event, Location, ScheduleEntry, Team, UnitId, UnitKind, UnitMode,
};
use tracing::trace;

use crate::{anomaly, unit::Unit, Clock, SimulationFault, World};

/// Snapshot of a sensed unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitInfo {
    /// Unit identifier.
    pub id: UnitId,
    /// Owning team.
    pub team: Team,
    /// Kind of the unit.
    pub kind: UnitKind,
    /// Current level.
    pub level: u8,
    /// Current mode.
    pub mode: UnitMode,
    /// Current health.
    pub health: u32,
    /// Occupied cell.
    pub location: Location,
}

impl From<&Unit> for UnitInfo {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id(),
            team: unit.team(),
            kind: unit.kind(),
            level: unit.level(),
            mode: unit.mode(),
            health: unit.health(),
            location: unit.location(),
        }
    }
}

/// Validated effect of a command, ready to apply.
#[derive(Clone, Copy, Debug)]
enum Plan {
    Move {
        to: Location,
        base: u32,
    },
    Build {
        kind: UnitKind,
        at: Location,
        lead: u32,
        gold: u32,
    },
    Attack {
        target: UnitId,
    },
    Repair {
        target: UnitId,
        amount: u32,
    },
    Mine {
        location: Location,
        currency: Currency,
    },
    Upgrade {
        target: UnitId,
        lead: u32,
        gold: u32,
    },
    Transmute {
        lead: u32,
    },
    Transform,
    Envision {
        anomaly: AnomalyKind,
    },
    WriteChannel {
        index: usize,
        value: u32,
    },
    Disintegrate,
    Resign,
}

/// Mutation and sensing surface for one unit's turn.
#[derive(Debug)]
pub struct Controller<'w> {
    world: &'w mut World,
    unit: UnitId,
    team: Team,
    kind: UnitKind,
}

impl<'w> Controller<'w> {
    /// Wraps `world` for `unit`, or `None` if the unit is not live.
    pub(crate) fn new(world: &'w mut World, unit: UnitId) -> Option<Self> {
        let (team, kind) = world
            .registry
            .get(unit)
            .map(|live| (live.team(), live.kind()))?;
        Some(Self {
            world,
            unit,
            team,
            kind,
        })
    }

    fn actor(&self) -> Result<&Unit, ActionError> {
        self.world
            .registry
            .get(self.unit)
            .ok_or(ActionError::UnknownUnit(self.unit))
    }

    // Identity and state of the controlled unit.

    /// Identifier of the controlled unit.
    #[must_use]
    pub fn id(&self) -> UnitId {
        self.unit
    }

    /// Team of the controlled unit.
    #[must_use]
    pub fn team(&self) -> Team {
        self.team
    }

    /// Kind of the controlled unit.
    #[must_use]
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Snapshot of the controlled unit.
    pub fn info(&self) -> Result<UnitInfo, ActionError> {
        self.actor().map(UnitInfo::from)
    }

    /// Cell the controlled unit occupies.
    pub fn location(&self) -> Result<Location, ActionError> {
        self.actor().map(Unit::location)
    }

    /// Current value of the action clock.
    pub fn action_cooldown(&self) -> Result<u32, ActionError> {
        self.actor().map(Unit::action_cooldown)
    }

    /// Current value of the movement clock.
    pub fn movement_cooldown(&self) -> Result<u32, ActionError> {
        self.actor().map(Unit::movement_cooldown)
    }

    /// Whether the action clock is below the readiness threshold.
    #[must_use]
    pub fn is_action_ready(&self) -> bool {
        self.actor()
            .map(|unit| unit.is_action_ready(&self.world.rules))
            .unwrap_or(false)
    }

    /// Whether the movement clock is below the readiness threshold.
    #[must_use]
    pub fn is_movement_ready(&self) -> bool {
        self.actor()
            .map(|unit| unit.is_movement_ready(&self.world.rules))
            .unwrap_or(false)
    }

    /// Whether the clock a mode switch would charge is ready.
    #[must_use]
    pub fn is_transform_ready(&self) -> bool {
        self.actor()
            .map(|unit| unit.is_transform_ready(&self.world.rules))
            .unwrap_or(false)
    }

    // Match-wide facts every unit may read.

    /// Current round number.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.world.round
    }

    /// Round at which tiebreaks decide the match.
    #[must_use]
    pub fn round_limit(&self) -> u32 {
        self.world.round_limit
    }

    /// Map width in cells.
    #[must_use]
    pub fn map_width(&self) -> u32 {
        self.world.map.width()
    }

    /// Map height in cells.
    #[must_use]
    pub fn map_height(&self) -> u32 {
        self.world.map.height()
    }

    /// Absolute location of the map's lower-left cell.
    #[must_use]
    pub fn origin(&self) -> Location {
        self.world.map.origin()
    }

    /// Balance of `currency` held by the unit's team.
    #[must_use]
    pub fn balance(&self, currency: Currency) -> u32 {
        self.world.ledger.balance(self.team, currency)
    }

    /// Number of live units on the unit's team.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.world.registry.team_count(self.team)
    }

    /// Number of live core units on the unit's team.
    #[must_use]
    pub fn core_count(&self) -> usize {
        self.world.core_count(self.team)
    }

    /// Scheduled world events, in firing order.
    #[must_use]
    pub fn anomaly_schedule(&self) -> &[ScheduleEntry] {
        self.world.map.schedule()
    }

    /// Reads a slot of the team's shared channel.
    pub fn read_channel(&self, index: usize) -> Result<u32, ActionError> {
        self.world
            .ledger
            .read_channel(self.team, index)
            .map_err(|_| ActionError::ChannelIndex(index))
    }

    // Sensing, bounded by the unit's vision radius.

    /// Whether `location` is on the map.
    #[must_use]
    pub fn on_the_map(&self, location: Location) -> bool {
        self.world.map.on_the_map(location)
    }

    fn sensed(&self, location: Location) -> Result<&Unit, ActionError> {
        let actor = self.actor()?;
        if !self.on_the_map(location) {
            return Err(ActionError::OffMap(location));
        }
        if !actor.can_see(location) {
            return Err(ActionError::OutOfVision(location));
        }
        Ok(actor)
    }

    /// Whether `location` is on the map and within vision.
    #[must_use]
    pub fn can_sense_location(&self, location: Location) -> bool {
        self.sensed(location).is_ok()
    }

    /// Whether the unit `id` is alive and within vision.
    #[must_use]
    pub fn can_sense_unit(&self, id: UnitId) -> bool {
        self.sense_unit(id).is_ok()
    }

    /// Snapshot of a visible unit.
    pub fn sense_unit(&self, id: UnitId) -> Result<UnitInfo, ActionError> {
        let other = self
            .world
            .registry
            .get(id)
            .ok_or(ActionError::UnknownUnit(id))?;
        let _ = self.sensed(other.location())?;
        Ok(UnitInfo::from(other))
    }

    /// Snapshot of the unit on a visible cell, if any.
    pub fn sense_unit_at(&self, location: Location) -> Result<Option<UnitInfo>, ActionError> {
        let _ = self.sensed(location)?;
        Ok(self.world.registry.at(location).map(UnitInfo::from))
    }

    /// Visible units within `radius_squared`, excluding the unit itself.
    ///
    /// The radius is clamped to the vision radius; `None` means the full
    /// vision radius. `team` filters by owner when set.
    pub fn sense_nearby_units(
        &self,
        radius_squared: Option<i32>,
        team: Option<Team>,
    ) -> Result<Vec<UnitInfo>, ActionError> {
        let actor = self.actor()?;
        let vision = actor.vision_radius_squared();
        let radius = radius_squared.map_or(vision, |radius| radius.min(vision));
        Ok(self
            .world
            .registry
            .within(actor.location(), radius)
            .into_iter()
            .filter(|other| other.id() != self.unit)
            .filter(|other| team.map_or(true, |team| other.team() == team))
            .map(UnitInfo::from)
            .collect())
    }

    /// Terrain of a visible cell.
    pub fn sense_terrain(&self, location: Location) -> Result<u32, ActionError> {
        let _ = self.sensed(location)?;
        self.world
            .terrain_at(location)
            .ok_or(ActionError::OffMap(location))
    }

    /// Lead deposit of a visible cell.
    pub fn sense_lead(&self, location: Location) -> Result<u32, ActionError> {
        let _ = self.sensed(location)?;
        self.world
            .resource_at(Currency::Lead, location)
            .ok_or(ActionError::OffMap(location))
    }

    /// Gold deposit of a visible cell.
    pub fn sense_gold(&self, location: Location) -> Result<u32, ActionError> {
        let _ = self.sensed(location)?;
        self.world
            .resource_at(Currency::Gold, location)
            .ok_or(ActionError::OffMap(location))
    }

    // Commands.

    /// Whether `command` would succeed right now.
    #[must_use]
    pub fn can(&self, command: &Command) -> bool {
        self.check(command).is_ok()
    }

    /// Validates and applies `command`.
    ///
    /// A failed check leaves the world untouched. A world fault during the
    /// apply is reported as [`ActionError::Fault`] and aborts the match at
    /// the end of the turn.
    pub fn execute(&mut self, command: Command) -> Result<(), ActionError> {
        let plan = self.check(&command)?;
        trace!(unit = %self.unit, ?command, round = self.world.round, "executing");
        if let Err(fault) = self.apply(plan) {
            let message = fault.to_string();
            self.world.record_fault(fault);
            return Err(ActionError::Fault(message));
        }
        Ok(())
    }

    fn check(&self, command: &Command) -> Result<Plan, ActionError> {
        if let Some(fault) = &self.world.fault {
            return Err(ActionError::Fault(fault.to_string()));
        }
        let actor = self.actor()?;
        let kind = actor.kind();

        match *command {
            Command::Move { direction } => {
                if !actor.mode().can_move() {
                    return Err(ActionError::ModeForbids {
                        mode: actor.mode(),
                        capability: Capability::Move,
                    });
                }
                if !actor.is_movement_ready(&self.world.rules) {
                    return Err(ActionError::MovementNotReady);
                }
                let to = actor.location().add(direction);
                self.require_vacant(to)?;
                Ok(Plan::Move {
                    to,
                    base: kind.profile().movement_cooldown,
                })
            }
            Command::Build {
                kind: product,
                direction,
            } => {
                require_kind(kind, kind.can_build(product), Capability::Build)?;
                self.require_act(actor)?;
                let at = actor.location().add(direction);
                self.require_vacant(at)?;
                let profile = product.profile();
                self.require_funds(Currency::Lead, profile.lead_cost)?;
                self.require_funds(Currency::Gold, profile.gold_cost)?;
                Ok(Plan::Build {
                    kind: product,
                    at,
                    lead: profile.lead_cost,
                    gold: profile.gold_cost,
                })
            }
            Command::Attack { target } => {
                require_kind(kind, kind.can_attack(), Capability::Attack)?;
                self.require_act(actor)?;
                let victim = self.require_unit_in_range(actor, target)?;
                if victim.team() == self.team {
                    return Err(ActionError::WrongTeam(victim.id()));
                }
                Ok(Plan::Attack { target: victim.id() })
            }
            Command::Repair { target } => {
                let repairs_anything = UnitKind::ALL.iter().any(|other| kind.can_repair(*other));
                require_kind(kind, repairs_anything, Capability::Repair)?;
                self.require_act(actor)?;
                let patient = self.require_unit_in_range(actor, target)?;
                if patient.team() != self.team {
                    return Err(ActionError::WrongTeam(patient.id()));
                }
                require_kind(kind, kind.can_repair(patient.kind()), Capability::Repair)?;
                Ok(Plan::Repair {
                    target: patient.id(),
                    amount: kind.healing(actor.level()),
                })
            }
            Command::MineLead { target } => self.check_mine(actor, target, Currency::Lead),
            Command::MineGold { target } => self.check_mine(actor, target, Currency::Gold),
            Command::Upgrade { target } => {
                let upgrades_anything = UnitKind::ALL.iter().any(|other| kind.can_upgrade(*other));
                require_kind(kind, upgrades_anything, Capability::Upgrade)?;
                self.require_act(actor)?;
                let structure = self.require_unit_in_range(actor, target)?;
                if structure.team() != self.team {
                    return Err(ActionError::WrongTeam(structure.id()));
                }
                require_kind(kind, kind.can_upgrade(structure.kind()), Capability::Upgrade)?;
                if !structure.is_upgradable() {
                    return Err(ActionError::NotUpgradable(structure.id()));
                }
                let next = structure.level() + 1;
                let lead = structure.kind().lead_upgrade_cost(next);
                let gold = structure.kind().gold_upgrade_cost(next);
                self.require_funds(Currency::Lead, lead)?;
                self.require_funds(Currency::Gold, gold)?;
                Ok(Plan::Upgrade {
                    target: structure.id(),
                    lead,
                    gold,
                })
            }
            Command::Transmute => {
                require_kind(kind, kind.can_transmute(), Capability::Transmute)?;
                self.require_act(actor)?;
                let lead = self.transmutation_rate(actor);
                self.require_funds(Currency::Lead, lead)?;
                Ok(Plan::Transmute { lead })
            }
            Command::Transform => {
                require_kind(kind, kind.is_structure(), Capability::Transform)?;
                if !actor.mode().can_transform() {
                    return Err(ActionError::ModeForbids {
                        mode: actor.mode(),
                        capability: Capability::Transform,
                    });
                }
                if !actor.is_transform_ready(&self.world.rules) {
                    return Err(ActionError::TransformNotReady);
                }
                Ok(Plan::Transform)
            }
            Command::Envision { anomaly } => {
                require_kind(kind, kind.can_envision(), Capability::Envision)?;
                if !anomaly.is_localizable() {
                    return Err(ActionError::NotLocalizable);
                }
                self.require_act(actor)?;
                Ok(Plan::Envision { anomaly })
            }
            Command::WriteChannel { index, value } => {
                let rules = &self.world.rules;
                if index >= rules.channel_length {
                    return Err(ActionError::ChannelIndex(index));
                }
                if value < rules.channel_min || value > rules.channel_max {
                    return Err(ActionError::ChannelValue(value));
                }
                Ok(Plan::WriteChannel { index, value })
            }
            Command::Disintegrate => Ok(Plan::Disintegrate),
            Command::Resign => Ok(Plan::Resign),
        }
    }

    fn check_mine(
        &self,
        actor: &Unit,
        target: Location,
        currency: Currency,
    ) -> Result<Plan, ActionError> {
        require_kind(actor.kind(), actor.kind().can_mine(), Capability::Mine)?;
        self.require_act(actor)?;
        self.require_in_range(actor, target)?;
        if self.world.resource_at(currency, target).unwrap_or(0) == 0 {
            return Err(ActionError::NothingToMine {
                location: target,
                currency,
            });
        }
        Ok(Plan::Mine {
            location: target,
            currency,
        })
    }

    fn require_act(&self, actor: &Unit) -> Result<(), ActionError> {
        if !actor.mode().can_act() {
            return Err(ActionError::ModeForbids {
                mode: actor.mode(),
                capability: Capability::Act,
            });
        }
        if !actor.is_action_ready(&self.world.rules) {
            return Err(ActionError::ActionNotReady);
        }
        Ok(())
    }

    fn require_vacant(&self, location: Location) -> Result<(), ActionError> {
        if !self.on_the_map(location) {
            return Err(ActionError::OffMap(location));
        }
        if self.world.registry.at(location).is_some() {
            return Err(ActionError::Occupied(location));
        }
        Ok(())
    }

    fn require_in_range(&self, actor: &Unit, location: Location) -> Result<(), ActionError> {
        if !self.on_the_map(location) {
            return Err(ActionError::OffMap(location));
        }
        if !actor.can_reach(location) {
            return Err(ActionError::OutOfRange(location));
        }
        Ok(())
    }

    fn require_unit_in_range(&self, actor: &Unit, location: Location) -> Result<&Unit, ActionError> {
        self.require_in_range(actor, location)?;
        self.world
            .registry
            .at(location)
            .ok_or(ActionError::NoUnitAt(location))
    }

    fn require_funds(&self, currency: Currency, required: u32) -> Result<(), ActionError> {
        let available = self.balance(currency);
        if available < required {
            return Err(ActionError::InsufficientFunds {
                currency,
                required,
                available,
            });
        }
        Ok(())
    }

    fn transmutation_rate(&self, actor: &Unit) -> u32 {
        let friends = u32::try_from(self.world.visible_friends(actor)).unwrap_or(u32::MAX);
        self.world.rules.transmutation_rate(friends)
    }

    fn apply(&mut self, plan: Plan) -> Result<(), SimulationFault> {
        let id = self.unit;
        let team = self.team;
        let world = &mut *self.world;

        let (action, target) = match plan {
            Plan::Move { to, base } => {
                world.charge(id, Clock::Movement, base)?;
                world.registry.move_to(id, to)?;
                world.journal.push(Event::UnitMoved { unit: id, to });
                return Ok(());
            }
            Plan::Build {
                kind,
                at,
                lead,
                gold,
            } => {
                world.charge(id, Clock::Action, self.kind.profile().action_cooldown)?;
                debit(world, team, lead, gold)?;
                let built = world.spawn_unit(team, kind, at, true)?;
                (ActionKind::Build, ActionTarget::Unit(built))
            }
            Plan::Attack { target } => {
                world.charge(id, Clock::Action, self.kind.profile().action_cooldown)?;
                world.resolve_attack(id, target)?;
                (ActionKind::Attack, ActionTarget::Unit(target))
            }
            Plan::Repair { target, amount } => {
                world.charge(id, Clock::Action, self.kind.profile().action_cooldown)?;
                let _ = world.change_health(target, i64::from(amount))?;
                (ActionKind::Repair, ActionTarget::Unit(target))
            }
            Plan::Mine { location, currency } => {
                world.charge(id, Clock::Action, self.kind.profile().action_cooldown)?;
                let _ = world.adjust_resource(currency, location, -1)?;
                let _ = world.ledger.add_currency(team, currency, 1)?;
                let action = match currency {
                    Currency::Lead => ActionKind::MineLead,
                    Currency::Gold => ActionKind::MineGold,
                };
                (action, ActionTarget::Location(location))
            }
            Plan::Upgrade { target, lead, gold } => {
                world.charge(id, Clock::Action, self.kind.profile().action_cooldown)?;
                debit(world, team, lead, gold)?;
                let location = world
                    .registry
                    .get(target)
                    .map(Unit::location)
                    .ok_or(SimulationFault::MissingUnit(target))?;
                let terrain = world
                    .terrain_at(location)
                    .ok_or(SimulationFault::OffMap(location))?;
                let rules = &world.rules;
                let upgraded = world
                    .registry
                    .get_mut(target)
                    .map(|unit| unit.upgrade(terrain, rules))
                    .ok_or(SimulationFault::MissingUnit(target))?;
                if !upgraded {
                    return Err(SimulationFault::Invariant(format!(
                        "unit {target} refused a validated upgrade"
                    )));
                }
                (ActionKind::Upgrade, ActionTarget::Unit(target))
            }
            Plan::Transmute { lead } => {
                world.charge(id, Clock::Action, self.kind.profile().action_cooldown)?;
                debit(world, team, lead, 0)?;
                let _ = world.ledger.add_currency(team, Currency::Gold, 1)?;
                (ActionKind::Transmute, ActionTarget::Amount(i64::from(lead)))
            }
            Plan::Transform => {
                let location = world
                    .registry
                    .get(id)
                    .map(Unit::location)
                    .ok_or(SimulationFault::MissingUnit(id))?;
                let terrain = world
                    .terrain_at(location)
                    .ok_or(SimulationFault::OffMap(location))?;
                let rules = &world.rules;
                let switched = world
                    .registry
                    .get_mut(id)
                    .map(|unit| unit.transform(terrain, rules))
                    .ok_or(SimulationFault::MissingUnit(id))?;
                if !switched {
                    return Err(SimulationFault::Invariant(format!(
                        "unit {id} refused a validated transform"
                    )));
                }
                (ActionKind::Transform, ActionTarget::None)
            }
            Plan::Envision { anomaly } => {
                world.charge(id, Clock::Action, self.kind.profile().action_cooldown)?;
                anomaly::dispatch_local(world, id, anomaly)?;
                (ActionKind::Envision(anomaly), ActionTarget::None)
            }
            Plan::WriteChannel { index, value } => {
                world.ledger.write_channel(team, index, value)?;
                (ActionKind::ChannelWrite, ActionTarget::Amount(i64::from(value)))
            }
            Plan::Disintegrate => {
                world.destroy_unit(id)?;
                (ActionKind::Disintegrate, ActionTarget::None)
            }
            Plan::Resign => {
                let doomed: Vec<UnitId> = world
                    .registry
                    .iter()
                    .filter(|unit| unit.team() == team)
                    .map(Unit::id)
                    .collect();
                for unit in doomed {
                    world.destroy_unit(unit)?;
                }
                (ActionKind::Resign, ActionTarget::None)
            }
        };

        world.journal.push(Event::Action {
            unit: id,
            action,
            target,
        });
        Ok(())
    }

    // Convenience wrappers over `can` and `execute`.

    /// Whether the unit can step in `direction`.
    #[must_use]
    pub fn can_move(&self, direction: Direction) -> bool {
        self.can(&Command::Move { direction })
    }

    /// Steps one cell in `direction`.
    pub fn move_unit(&mut self, direction: Direction) -> Result<(), ActionError> {
        self.execute(Command::Move { direction })
    }

    /// Whether the unit can build `kind` in `direction`.
    #[must_use]
    pub fn can_build(&self, kind: UnitKind, direction: Direction) -> bool {
        self.can(&Command::Build { kind, direction })
    }

    /// Builds `kind` on the adjacent cell in `direction`.
    pub fn build(&mut self, kind: UnitKind, direction: Direction) -> Result<(), ActionError> {
        self.execute(Command::Build { kind, direction })
    }

    /// Whether the unit can attack the unit on `target`.
    #[must_use]
    pub fn can_attack(&self, target: Location) -> bool {
        self.can(&Command::Attack { target })
    }

    /// Attacks the enemy on `target`.
    pub fn attack(&mut self, target: Location) -> Result<(), ActionError> {
        self.execute(Command::Attack { target })
    }

    /// Whether the unit can repair the unit on `target`.
    #[must_use]
    pub fn can_repair(&self, target: Location) -> bool {
        self.can(&Command::Repair { target })
    }

    /// Repairs the friendly unit on `target`.
    pub fn repair(&mut self, target: Location) -> Result<(), ActionError> {
        self.execute(Command::Repair { target })
    }

    /// Whether the unit can mine lead on `target`.
    #[must_use]
    pub fn can_mine_lead(&self, target: Location) -> bool {
        self.can(&Command::MineLead { target })
    }

    /// Mines one lead from `target`.
    pub fn mine_lead(&mut self, target: Location) -> Result<(), ActionError> {
        self.execute(Command::MineLead { target })
    }

    /// Whether the unit can mine gold on `target`.
    #[must_use]
    pub fn can_mine_gold(&self, target: Location) -> bool {
        self.can(&Command::MineGold { target })
    }

    /// Mines one gold from `target`.
    pub fn mine_gold(&mut self, target: Location) -> Result<(), ActionError> {
        self.execute(Command::MineGold { target })
    }

    /// Whether the unit can upgrade the structure on `target`.
    #[must_use]
    pub fn can_upgrade(&self, target: Location) -> bool {
        self.can(&Command::Upgrade { target })
    }

    /// Upgrades the structure on `target`.
    pub fn upgrade(&mut self, target: Location) -> Result<(), ActionError> {
        self.execute(Command::Upgrade { target })
    }

    /// Whether the unit can transmute lead into gold.
    #[must_use]
    pub fn can_transmute(&self) -> bool {
        self.can(&Command::Transmute)
    }

    /// Converts lead into one gold.
    pub fn transmute(&mut self) -> Result<(), ActionError> {
        self.execute(Command::Transmute)
    }

    /// Lead the next transmutation would consume.
    pub fn transmutation_cost(&self) -> Result<u32, ActionError> {
        let actor = self.actor()?;
        Ok(self.transmutation_rate(actor))
    }

    /// Whether the unit can switch structure modes.
    #[must_use]
    pub fn can_transform(&self) -> bool {
        self.can(&Command::Transform)
    }

    /// Switches between stationary and mobile structure modes.
    pub fn transform(&mut self) -> Result<(), ActionError> {
        self.execute(Command::Transform)
    }

    /// Whether the unit can trigger a localized `anomaly`.
    #[must_use]
    pub fn can_envision(&self, anomaly: AnomalyKind) -> bool {
        self.can(&Command::Envision { anomaly })
    }

    /// Triggers a localized `anomaly` around the unit.
    pub fn envision(&mut self, anomaly: AnomalyKind) -> Result<(), ActionError> {
        self.execute(Command::Envision { anomaly })
    }

    /// Whether `value` can be written to slot `index`.
    #[must_use]
    pub fn can_write_channel(&self, index: usize, value: u32) -> bool {
        self.can(&Command::WriteChannel { index, value })
    }

    /// Writes `value` to slot `index` of the team's channel.
    pub fn write_channel(&mut self, index: usize, value: u32) -> Result<(), ActionError> {
        self.execute(Command::WriteChannel { index, value })
    }

    /// Destroys the unit.
    pub fn disintegrate(&mut self) -> Result<(), ActionError> {
        self.execute(Command::Disintegrate)
    }

    /// Destroys every unit of the team.
    pub fn resign(&mut self) -> Result<(), ActionError> {
        self.execute(Command::Resign)
    }

    // Indicators are recorded for viewers and have no effect on the match.

    /// Attaches a text annotation, truncated to the configured length.
    pub fn set_indicator_string(&mut self, text: &str) {
        let text: String = text.chars().take(self.world.rules.indicator_max_len).collect();
        self.annotate(Annotation::Text(text));
    }

    /// Marks a cell.
    pub fn set_indicator_dot(&mut self, location: Location, color: [u8; 3]) {
        self.annotate(Annotation::Dot { location, color });
    }

    /// Draws a segment between two cells.
    pub fn set_indicator_line(&mut self, from: Location, to: Location, color: [u8; 3]) {
        self.annotate(Annotation::Line { from, to, color });
    }

    fn annotate(&mut self, annotation: Annotation) {
        self.world.journal.push(Event::Indicator {
            unit: self.unit,
            annotation,
        });
    }
}

fn require_kind(kind: UnitKind, allowed: bool, capability: Capability) -> Result<(), ActionError> {
    if allowed {
        Ok(())
    } else {
        Err(ActionError::KindForbids { kind, capability })
    }
}

fn debit(world: &mut World, team: Team, lead: u32, gold: u32) -> Result<(), SimulationFault> {
    let _ = world
        .ledger
        .add_currency(team, Currency::Lead, -i64::from(lead))?;
    let _ = world
        .ledger
        .add_currency(team, Currency::Gold, -i64::from(gold))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use skirmish_core::{Rules, Symmetry};

    use super::*;
    use crate::map::{GameMap, MapBuilder};

    fn arena() -> GameMap {
        let mut builder = MapBuilder::new("arena", 20, 20, Location::new(0, 0), 3);
        let _ = builder.symmetry(Symmetry::Rotational);
        builder
            .add_symmetric_unit(UnitKind::Headquarters, 3, 3)
            .expect("headquarters");
        builder.set_symmetric_terrain(3, 3, 2).expect("terrain");
        builder.set_symmetric_lead(4, 5, 40).expect("lead");
        builder.build()
    }

    fn world() -> (World, UnitId) {
        let world = World::new(arena(), Rules::default()).expect("world");
        let hq = world
            .registry
            .id_at(Location::new(3, 3))
            .expect("headquarters");
        (world, hq)
    }

    fn ready(world: &mut World, id: UnitId) {
        let rules = world.rules.clone();
        if let Some(unit) = world.registry.get_mut(id) {
            unit.decay_cooldowns(&rules);
            unit.decay_cooldowns(&rules);
        }
    }

    #[test]
    fn clock_above_threshold_blocks_until_decay() {
        let (mut world, hq) = world();
        assert_eq!(world.registry.get(hq).map(Unit::action_cooldown), Some(12));
        {
            let controller = Controller::new(&mut world, hq).expect("live");
            assert!(!controller.can_build(UnitKind::Miner, Direction::North));
        }
        let rules = world.rules.clone();
        if let Some(unit) = world.registry.get_mut(hq) {
            unit.decay_cooldowns(&rules);
        }
        let mut controller = Controller::new(&mut world, hq).expect("live");
        assert_eq!(controller.action_cooldown(), Ok(2));
        assert!(controller.can_build(UnitKind::Miner, Direction::North));
        assert_eq!(controller.build(UnitKind::Miner, Direction::North), Ok(()));
    }

    #[test]
    fn check_and_execute_agree_on_failure() {
        let (mut world, hq) = world();
        let mut controller = Controller::new(&mut world, hq).expect("live");
        assert!(!controller.can_build(UnitKind::Miner, Direction::North));
        assert_eq!(
            controller.build(UnitKind::Miner, Direction::North),
            Err(ActionError::ActionNotReady)
        );
        assert_eq!(
            controller.build(UnitKind::Watchtower, Direction::North),
            Err(ActionError::KindForbids {
                kind: UnitKind::Headquarters,
                capability: Capability::Build
            })
        );
        assert_eq!(
            controller.move_unit(Direction::East),
            Err(ActionError::ModeForbids {
                mode: UnitMode::Stationary,
                capability: Capability::Move
            })
        );
    }

    #[test]
    fn build_debits_and_spawns_under_the_builder() {
        let (mut world, hq) = world();
        ready(&mut world, hq);
        let mut controller = Controller::new(&mut world, hq).expect("live");
        controller
            .build(UnitKind::Soldier, Direction::NorthEast)
            .expect("build");
        assert_eq!(controller.balance(Currency::Lead), 125);
        assert!(!controller.is_action_ready());
        assert_eq!(
            controller.build(UnitKind::Soldier, Direction::North),
            Err(ActionError::ActionNotReady)
        );
        let soldier = world
            .registry
            .at(Location::new(4, 4))
            .expect("soldier");
        assert_eq!(soldier.mode(), UnitMode::Active);
        assert!(world.journal.iter().any(|event| matches!(
            event,
            Event::Action {
                action: ActionKind::Build,
                ..
            }
        )));
    }

    #[test]
    fn builds_on_occupied_or_off_map_cells_fail() {
        let (mut world, hq) = world();
        ready(&mut world, hq);
        {
            let mut controller = Controller::new(&mut world, hq).expect("live");
            controller
                .build(UnitKind::Miner, Direction::South)
                .expect("build");
        }
        ready(&mut world, hq);
        let controller = Controller::new(&mut world, hq).expect("live");
        assert_eq!(
            controller.check(&Command::Build {
                kind: UnitKind::Miner,
                direction: Direction::South
            })
            .map(|_| ()),
            Err(ActionError::Occupied(Location::new(3, 2)))
        );
    }

    #[test]
    fn insufficient_funds_are_reported() {
        let (mut world, hq) = world();
        ready(&mut world, hq);
        let mut controller = Controller::new(&mut world, hq).expect("live");
        assert_eq!(
            controller.build(UnitKind::Sage, Direction::North),
            Err(ActionError::InsufficientFunds {
                currency: Currency::Gold,
                required: 20,
                available: 0
            })
        );
    }

    #[test]
    fn sensing_is_bounded_by_vision() {
        let (mut world, hq) = world();
        let controller = Controller::new(&mut world, hq).expect("live");
        assert_eq!(controller.sense_lead(Location::new(4, 5)), Ok(40));
        assert_eq!(
            controller.sense_lead(Location::new(15, 14)),
            Err(ActionError::OutOfVision(Location::new(15, 14)))
        );
        assert_eq!(
            controller.sense_terrain(Location::new(-1, 0)),
            Err(ActionError::OffMap(Location::new(-1, 0)))
        );
        assert!(controller
            .sense_nearby_units(None, None)
            .expect("sense")
            .is_empty());
    }

    #[test]
    fn channel_writes_are_bounded() {
        let (mut world, hq) = world();
        let mut controller = Controller::new(&mut world, hq).expect("live");
        assert_eq!(controller.write_channel(5, 9), Ok(()));
        assert_eq!(controller.read_channel(5), Ok(9));
        assert_eq!(
            controller.write_channel(64, 1),
            Err(ActionError::ChannelIndex(64))
        );
        assert_eq!(
            controller.write_channel(0, 70_000),
            Err(ActionError::ChannelValue(70_000))
        );
    }

    #[test]
    fn indicator_strings_are_truncated() {
        let (mut world, hq) = world();
        let mut controller = Controller::new(&mut world, hq).expect("live");
        controller.set_indicator_string(&"x".repeat(100));
        let stored = world.journal.iter().find_map(|event| match event {
            Event::Indicator {
                annotation: Annotation::Text(text),
                ..
            } => Some(text.len()),
            _ => None,
        });
        assert_eq!(stored, Some(64));
    }

    #[test]
    fn resign_destroys_the_whole_team() {
        let (mut world, hq) = world();
        let mut controller = Controller::new(&mut world, hq).expect("live");
        assert_eq!(controller.resign(), Ok(()));
        assert_eq!(world.registry.team_count(Team::A), 0);
        assert_eq!(world.registry.team_count(Team::B), 1);
    }
}
