#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for skirmish matches.
//!
//! The [`World`] owns every piece of mutable match state: the cell grids, the
//! unit registry, the team ledger, and the seeded RNG. Rounds are driven by
//! [`World::run_round`], which hands each live unit to a [`DecisionProvider`]
//! through a [`Controller`], the only mutation path available to decision
//! logic. Effects are journaled as [`Event`] records and flushed to a
//! [`MatchRecorder`] in the order they occurred.

mod anomaly;
mod combat;
pub mod controller;
mod ids;
pub mod ledger;
pub mod map;
pub mod registry;
pub mod unit;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skirmish_core::{
    ActionKind, ActionTarget, Currency, DominationFactor, Event, Location, MatchRecorder, Outcome,
    Rules, RulesError, ScheduleEntry, Team, UnitId, UnitKind,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub use controller::{Controller, UnitInfo};
use ids::IdGenerator;
use ledger::{Ledger, LedgerError};
use map::{GameMap, MapError};
use registry::{Registry, RegistryError};
use unit::{HealthOutcome, Unit};

/// Failures that abort a match. A round that faults is never retried.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SimulationFault {
    /// The rules failed validation.
    #[error(transparent)]
    Rules(#[from] RulesError),
    /// The map failed validation.
    #[error(transparent)]
    Map(#[from] MapError),
    /// A ledger mutation broke an invariant.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// A registry mutation broke an invariant.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A unit expected to be live was missing.
    #[error("unit {0} vanished mid-update")]
    MissingUnit(UnitId),
    /// A location expected to be on the map was not.
    #[error("location {0} is not on the map")]
    OffMap(Location),
    /// Any other broken invariant.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Lifecycle phase of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Units are placed but no round has run.
    Init,
    /// Rounds are being played.
    InMatch,
    /// The footer has been written; the world is read-only.
    Done,
}

/// Status reported by [`World::run_round`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundStatus {
    /// Another call will play another round.
    Running,
    /// The match is over.
    Done,
}

/// External decision logic consulted by the world.
///
/// Every call is synchronous. Only [`DecisionProvider::run_unit`] is
/// required; the lifecycle notices default to no-ops.
pub trait DecisionProvider {
    /// Called once before the first round.
    fn match_started(&mut self, _world: &World) {}

    /// Called after a unit enters the registry.
    fn unit_spawned(&mut self, _unit: &Unit) {}

    /// Called after a unit leaves the registry.
    fn unit_killed(&mut self, _unit: &Unit) {}

    /// Called at the start of every round, after the round counter advances.
    fn round_started(&mut self) {}

    /// Runs one unit's turn.
    fn run_unit(&mut self, controller: &mut Controller<'_>);

    /// Budget consumed by the unit's last turn.
    fn used_budget(&self, _unit: UnitId) -> u32 {
        0
    }

    /// Whether the unit's decision logic faulted and the unit must die.
    fn terminated(&self, _unit: UnitId) -> bool {
        false
    }

    /// Called after every unit has taken its turn.
    fn round_ended(&mut self) {}

    /// Called once when the match is over.
    fn match_ended(&mut self) {}
}

#[derive(Clone, Debug)]
enum Notice {
    Spawned(Unit),
    Killed(Unit),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Clock {
    Action,
    Movement,
}

/// Represents the authoritative state of one match.
#[derive(Debug)]
pub struct World {
    rules: Rules,
    map: GameMap,
    round_limit: u32,
    round: u32,
    phase: Phase,
    running: bool,
    terrain: Vec<u32>,
    lead: Vec<u32>,
    gold: Vec<u32>,
    registry: Registry,
    ledger: Ledger,
    outcome: Option<Outcome>,
    rng: ChaCha8Rng,
    ids: IdGenerator,
    schedule_cursor: usize,
    journal: Vec<Event>,
    notices: Vec<Notice>,
    budget: [u64; 2],
    fault: Option<SimulationFault>,
}

impl World {
    /// Validates `rules` and `map`, writes the match header, and spawns the
    /// initial units.
    pub fn new(map: GameMap, rules: Rules) -> Result<Self, SimulationFault> {
        rules.validate()?;
        map.validate(&rules)?;
        let round_limit = map.rounds().unwrap_or(rules.default_round_limit);
        let cells = map.lead().len();
        let mut world = Self {
            round_limit,
            round: 0,
            phase: Phase::Init,
            running: true,
            terrain: map.terrain().to_vec(),
            lead: map.lead().to_vec(),
            gold: vec![0; cells],
            registry: Registry::new(map.width(), map.height(), map.origin()),
            ledger: Ledger::new(&rules),
            outcome: None,
            rng: ChaCha8Rng::seed_from_u64(map.seed()),
            ids: IdGenerator::new(map.seed()),
            schedule_cursor: 0,
            journal: Vec::new(),
            notices: Vec::new(),
            budget: [0; 2],
            fault: None,
            rules,
            map,
        };

        world.journal.push(Event::MatchHeader {
            map_name: world.map.name().to_owned(),
            width: world.map.width(),
            height: world.map.height(),
            origin: world.map.origin(),
            seed: world.map.seed(),
            round_limit,
            kinds: UnitKind::ALL.iter().map(|kind| *kind.profile()).collect(),
            rules: world.rules.clone(),
        });

        let placements = world.map.placements().to_vec();
        for placement in placements {
            let location = world.map.absolute(placement.x, placement.y);
            let _ = world.spawn_unit(placement.team, placement.kind, location, false)?;
        }
        Ok(world)
    }

    /// Plays one round and flushes its events to `recorder`.
    ///
    /// Once the match is decided the next call writes the footer and reports
    /// [`RoundStatus::Done`]; later calls do nothing.
    pub fn run_round(
        &mut self,
        provider: &mut dyn DecisionProvider,
        recorder: &mut dyn MatchRecorder,
    ) -> RoundStatus {
        if self.phase == Phase::Done {
            return RoundStatus::Done;
        }
        if self.phase == Phase::Init {
            self.phase = Phase::InMatch;
            info!(
                map = self.map.name(),
                seed = self.map.seed(),
                round_limit = self.round_limit,
                "match started"
            );
            provider.match_started(self);
            self.deliver_notices(provider);
            self.flush(recorder);
        }
        if !self.running {
            return self.finish(provider, recorder);
        }

        if let Err(fault) = self.play_round(provider) {
            error!(round = self.round, %fault, "simulation fault, match aborted");
            self.running = false;
            return self.finish(provider, recorder);
        }

        self.journal.push(Event::RoundSummary {
            round: self.round,
            teams: self.ledger.summaries(),
        });
        self.ledger.snapshot_round();
        debug!(
            round = self.round,
            units_a = self.registry.team_count(Team::A),
            units_b = self.registry.team_count(Team::B),
            lead_a = self.ledger.balance(Team::A, Currency::Lead),
            lead_b = self.ledger.balance(Team::B, Currency::Lead),
            "round complete"
        );
        self.flush(recorder);
        RoundStatus::Running
    }

    fn finish(
        &mut self,
        provider: &mut dyn DecisionProvider,
        recorder: &mut dyn MatchRecorder,
    ) -> RoundStatus {
        self.journal.push(Event::MatchFooter {
            outcome: self.outcome,
            total_rounds: self.round,
            budget: self.budget,
        });
        self.flush(recorder);
        self.phase = Phase::Done;
        provider.match_ended();
        match self.outcome {
            Some(outcome) => info!(
                winner = ?outcome.winner,
                factor = ?outcome.factor,
                rounds = self.round,
                "match finished"
            ),
            None => info!(rounds = self.round, "match finished without a winner"),
        }
        RoundStatus::Done
    }

    fn play_round(&mut self, provider: &mut dyn DecisionProvider) -> Result<(), SimulationFault> {
        self.round += 1;
        self.begin_round_hooks();
        provider.round_started();

        for id in self.registry.execution_order() {
            self.take_turn(id, provider)?;
        }

        provider.round_ended();
        self.end_of_round()?;
        self.deliver_notices(provider);
        Ok(())
    }

    fn begin_round_hooks(&mut self) {
        for id in self.registry.execution_order() {
            if let Some(unit) = self.registry.get_mut(id) {
                unit.begin_round();
            }
        }
    }

    fn end_round_hooks(&mut self) {
        for id in self.registry.execution_order() {
            if let Some(unit) = self.registry.get_mut(id) {
                unit.end_round();
            }
        }
    }

    fn take_turn(
        &mut self,
        id: UnitId,
        provider: &mut dyn DecisionProvider,
    ) -> Result<(), SimulationFault> {
        let Some(unit) = self.registry.get_mut(id) else {
            return Ok(());
        };
        unit.decay_cooldowns(&self.rules);
        let team = unit.team();

        if let Some(mut controller) = Controller::new(self, id) {
            provider.run_unit(&mut controller);
        }
        if let Some(fault) = self.fault.take() {
            return Err(fault);
        }

        let used = provider.used_budget(id);
        self.budget[team.index()] = self.budget[team.index()].saturating_add(u64::from(used));
        if let Some(unit) = self.registry.get_mut(id) {
            unit.set_budget_used(used);
            unit.finish_turn();
        }
        self.journal.push(Event::BudgetUsed { unit: id, used });

        if provider.terminated(id) && self.registry.get(id).is_some() {
            warn!(unit = %id, round = self.round, "destroying unit after decision fault");
            self.journal.push(Event::Action {
                unit: id,
                action: ActionKind::FaultDeath,
                target: ActionTarget::None,
            });
            self.destroy_unit(id)?;
        }
        self.deliver_notices(provider);
        Ok(())
    }

    fn end_of_round(&mut self) -> Result<(), SimulationFault> {
        let interval = self.rules.regeneration_interval;
        if interval > 0 && self.round % interval == 0 {
            let amount = self.rules.regeneration_amount;
            for cell in self.lead.iter_mut().filter(|cell| **cell > 0) {
                *cell = cell.saturating_add(amount);
            }
        }

        let income = i64::from(self.rules.passive_lead_income);
        for team in Team::ALL {
            let _ = self.ledger.add_currency(team, Currency::Lead, income)?;
        }

        self.end_round_hooks();

        if let Some(entry) = self.take_scheduled_event() {
            anomaly::dispatch_global(self, entry.kind)?;
        }

        self.check_annihilation();
        if self.round >= self.round_limit && self.outcome.is_none() {
            self.apply_tiebreaks();
        }
        if self.outcome.is_some() {
            self.running = false;
        }
        Ok(())
    }

    fn take_scheduled_event(&mut self) -> Option<ScheduleEntry> {
        let schedule = self.map.schedule();
        while let Some(entry) = schedule.get(self.schedule_cursor).copied() {
            if entry.round > self.round {
                return None;
            }
            self.schedule_cursor += 1;
            if entry.round == self.round {
                return Some(entry);
            }
        }
        None
    }

    fn check_annihilation(&mut self) {
        if self.registry.team_count(Team::A) == 0 {
            self.set_outcome(Team::B, DominationFactor::Annihilated);
        } else if self.registry.team_count(Team::B) == 0 {
            self.set_outcome(Team::A, DominationFactor::Annihilated);
        }
    }

    fn apply_tiebreaks(&mut self) {
        let cores = Team::ALL.map(|team| self.core_count(team) as u64);
        if let Some(winner) = leader(cores) {
            self.set_outcome(winner, DominationFactor::MoreCoreUnits);
            return;
        }
        let gold = Team::ALL.map(|team| self.net_worth(team, Currency::Gold));
        if let Some(winner) = leader(gold) {
            self.set_outcome(winner, DominationFactor::MoreGoldNetWorth);
            return;
        }
        let lead = Team::ALL.map(|team| self.net_worth(team, Currency::Lead));
        if let Some(winner) = leader(lead) {
            self.set_outcome(winner, DominationFactor::MoreLeadNetWorth);
            return;
        }
        let winner = if self.rng.gen_range(0..2_u8) == 0 {
            Team::A
        } else {
            Team::B
        };
        self.set_outcome(winner, DominationFactor::Arbitrated);
    }

    /// Records the outcome unless one is already set.
    fn set_outcome(&mut self, winner: Team, factor: DominationFactor) {
        if self.outcome.is_none() {
            info!(?winner, ?factor, round = self.round, "match decided");
            self.outcome = Some(Outcome { winner, factor });
        }
    }

    fn core_count(&self, team: Team) -> usize {
        UnitKind::ALL
            .into_iter()
            .filter(|kind| kind.is_core())
            .map(|kind| self.registry.count(team, kind))
            .sum()
    }

    /// Team balance plus the invested worth of every live unit.
    fn net_worth(&self, team: Team, currency: Currency) -> u64 {
        let units: u64 = self
            .registry
            .iter()
            .filter(|unit| unit.team() == team)
            .map(|unit| match currency {
                Currency::Lead => u64::from(unit.kind().lead_worth(unit.level())),
                Currency::Gold => u64::from(unit.kind().gold_worth(unit.level())),
            })
            .sum();
        u64::from(self.ledger.balance(team, currency)) + units
    }

    fn flush(&mut self, recorder: &mut dyn MatchRecorder) {
        for event in self.journal.drain(..) {
            recorder.record(&event);
        }
    }

    fn deliver_notices(&mut self, provider: &mut dyn DecisionProvider) {
        for notice in std::mem::take(&mut self.notices) {
            match notice {
                Notice::Spawned(unit) => provider.unit_spawned(&unit),
                Notice::Killed(unit) => provider.unit_killed(&unit),
            }
        }
    }

    fn record_fault(&mut self, fault: SimulationFault) {
        if self.fault.is_none() {
            self.fault = Some(fault);
        }
    }

    fn cells(&self, currency: Currency) -> &[u32] {
        match currency {
            Currency::Lead => &self.lead,
            Currency::Gold => &self.gold,
        }
    }

    fn cells_mut(&mut self, currency: Currency) -> &mut [u32] {
        match currency {
            Currency::Lead => &mut self.lead,
            Currency::Gold => &mut self.gold,
        }
    }

    fn terrain_at(&self, location: Location) -> Option<u32> {
        let index = self.map.location_to_index(location)?;
        self.terrain.get(index).copied()
    }

    fn resource_at(&self, currency: Currency, location: Location) -> Option<u32> {
        let index = self.map.location_to_index(location)?;
        self.cells(currency).get(index).copied()
    }

    /// Adds `delta` to a cell deposit, saturating at both ends.
    fn adjust_resource(
        &mut self,
        currency: Currency,
        location: Location,
        delta: i64,
    ) -> Result<u32, SimulationFault> {
        let index = self
            .map
            .location_to_index(location)
            .ok_or(SimulationFault::OffMap(location))?;
        let cell = self
            .cells_mut(currency)
            .get_mut(index)
            .ok_or(SimulationFault::OffMap(location))?;
        let next = (i64::from(*cell) + delta).clamp(0, i64::from(u32::MAX));
        *cell = u32::try_from(next).unwrap_or(u32::MAX);
        Ok(*cell)
    }

    /// Number of same-team units within `unit`'s vision, excluding itself.
    fn visible_friends(&self, unit: &Unit) -> usize {
        self.registry
            .within(unit.location(), unit.vision_radius_squared())
            .into_iter()
            .filter(|other| other.team() == unit.team() && other.id() != unit.id())
            .count()
    }

    /// Charges a unit's clock for an action taken on its current cell.
    fn charge(&mut self, id: UnitId, clock: Clock, base: u32) -> Result<(), SimulationFault> {
        let location = self
            .registry
            .get(id)
            .map(Unit::location)
            .ok_or(SimulationFault::MissingUnit(id))?;
        let terrain = self
            .terrain_at(location)
            .ok_or(SimulationFault::OffMap(location))?;
        let rules = &self.rules;
        let unit = self
            .registry
            .get_mut(id)
            .ok_or(SimulationFault::MissingUnit(id))?;
        match clock {
            Clock::Action => unit.add_action_cooldown(base, terrain, rules),
            Clock::Movement => unit.add_movement_cooldown(base, terrain, rules),
        }
        Ok(())
    }

    /// Registers a new level-one unit. Every unit starts with one decay's
    /// worth of both clocks so it cannot act before its first turn.
    fn spawn_unit(
        &mut self,
        team: Team,
        kind: UnitKind,
        location: Location,
        built: bool,
    ) -> Result<UnitId, SimulationFault> {
        let terrain = self
            .terrain_at(location)
            .ok_or(SimulationFault::OffMap(location))?;
        let id = self.ids.next_id();
        let mut unit = Unit::spawn(id, team, kind, location, built, &self.rules);
        unit.add_action_cooldown(self.rules.cooldown_decay, terrain, &self.rules);
        unit.add_movement_cooldown(self.rules.cooldown_decay, terrain, &self.rules);

        let spawned = Event::UnitSpawned {
            unit: id,
            team,
            kind,
            location,
            level: unit.level(),
            health: unit.health(),
        };
        self.registry.spawn(unit.clone())?;
        self.journal.push(spawned);
        self.notices.push(Notice::Spawned(unit));
        Ok(id)
    }

    /// Removes a unit and drops its reclaimable worth on its cell. Destroying
    /// a unit that is already gone does nothing.
    fn destroy_unit(&mut self, id: UnitId) -> Result<(), SimulationFault> {
        if self.registry.get(id).is_none() {
            return Ok(());
        }
        let unit = self.registry.destroy(id)?;
        let location = unit.location();
        for (currency, amount) in [
            (Currency::Lead, unit.lead_drop(&self.rules)),
            (Currency::Gold, unit.gold_drop(&self.rules)),
        ] {
            if amount == 0 {
                continue;
            }
            let _ = self.adjust_resource(currency, location, i64::from(amount))?;
            self.journal.push(Event::ResourceDropped {
                location,
                currency,
                amount,
            });
        }
        self.journal.push(Event::UnitDied { unit: id });
        self.notices.push(Notice::Killed(unit));
        Ok(())
    }

    /// Applies a health delta, journaling the change, a completed
    /// construction, or the resulting death.
    fn change_health(&mut self, id: UnitId, delta: i64) -> Result<HealthOutcome, SimulationFault> {
        let unit = self
            .registry
            .get_mut(id)
            .ok_or(SimulationFault::MissingUnit(id))?;
        let before = unit.health();
        let outcome = unit.apply_health(delta);
        let after = unit.health();

        match outcome {
            HealthOutcome::Destroyed => self.destroy_unit(id)?,
            HealthOutcome::Changed | HealthOutcome::Promoted => {
                if after != before {
                    self.journal.push(Event::Action {
                        unit: id,
                        action: ActionKind::HealthChanged,
                        target: ActionTarget::Amount(i64::from(after) - i64::from(before)),
                    });
                }
                if outcome == HealthOutcome::Promoted {
                    self.journal.push(Event::Action {
                        unit: id,
                        action: ActionKind::FullyRepaired,
                        target: ActionTarget::None,
                    });
                }
            }
        }
        Ok(outcome)
    }
}

fn leader(values: [u64; 2]) -> Option<Team> {
    match values[0].cmp(&values[1]) {
        std::cmp::Ordering::Greater => Some(Team::A),
        std::cmp::Ordering::Less => Some(Team::B),
        std::cmp::Ordering::Equal => None,
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use skirmish_core::{Currency, Location, Outcome, Rules, Team, UnitId};

    use super::{Phase, World};
    use crate::{map::GameMap, unit::Unit};

    /// Rounds played so far.
    #[must_use]
    pub fn round(world: &World) -> u32 {
        world.round
    }

    /// Round at which tiebreaks decide the match.
    #[must_use]
    pub fn round_limit(world: &World) -> u32 {
        world.round_limit
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(world: &World) -> Phase {
        world.phase
    }

    /// Whether further rounds will be played.
    #[must_use]
    pub fn is_running(world: &World) -> bool {
        world.running
    }

    /// Result of the match, once decided.
    #[must_use]
    pub fn outcome(world: &World) -> Option<Outcome> {
        world.outcome
    }

    /// Map the match is played on.
    #[must_use]
    pub fn map(world: &World) -> &GameMap {
        &world.map
    }

    /// Constants the match runs with.
    #[must_use]
    pub fn rules(world: &World) -> &Rules {
        &world.rules
    }

    /// Live unit with the provided identifier.
    #[must_use]
    pub fn unit(world: &World, id: UnitId) -> Option<&Unit> {
        world.registry.get(id)
    }

    /// Live unit standing on `location`.
    #[must_use]
    pub fn unit_at(world: &World, location: Location) -> Option<&Unit> {
        world.registry.at(location)
    }

    /// Every live unit in ascending id order.
    pub fn units(world: &World) -> impl Iterator<Item = &Unit> {
        world.registry.iter()
    }

    /// Turn order of the next pass.
    #[must_use]
    pub fn execution_order(world: &World) -> Vec<UnitId> {
        world.registry.execution_order()
    }

    /// Number of live units on `team`.
    #[must_use]
    pub fn team_unit_count(world: &World, team: Team) -> usize {
        world.registry.team_count(team)
    }

    /// Number of live core units on `team`.
    #[must_use]
    pub fn core_count(world: &World, team: Team) -> usize {
        world.core_count(team)
    }

    /// Current terrain of a cell.
    #[must_use]
    pub fn terrain_at(world: &World, location: Location) -> Option<u32> {
        world.terrain_at(location)
    }

    /// Current deposit of `currency` on a cell.
    #[must_use]
    pub fn resource_at(world: &World, currency: Currency, location: Location) -> Option<u32> {
        world.resource_at(currency, location)
    }

    /// Balance of `currency` held by `team`.
    #[must_use]
    pub fn balance(world: &World, team: Team, currency: Currency) -> u32 {
        world.ledger.balance(team, currency)
    }

    /// Balance plus invested worth of every live unit on `team`.
    #[must_use]
    pub fn net_worth(world: &World, team: Team, currency: Currency) -> u64 {
        world.net_worth(team, currency)
    }

    /// Total budget consumed by each team.
    #[must_use]
    pub fn budget(world: &World) -> [u64; 2] {
        world.budget
    }
}
