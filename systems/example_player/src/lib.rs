#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Seeded reference decision logic that drives every unit kind.
//!
//! Each unit owns a random stream derived from the map seed and its id, so a
//! match played twice with this player produces the same event log.

use std::collections::{BTreeMap, BTreeSet};

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skirmish_core::{
    AnomalyKind, Command, Currency, Direction, Location, Team, UnitId, UnitKind, UnitMode,
};
use skirmish_world::{query, unit::Unit, Controller, DecisionProvider, UnitInfo, World};
use tracing::warn;

/// Budget charged for each query or command the player issues.
const OPERATION_COST: u32 = 10;

/// Channel slot where each headquarters advertises its position.
const HOME_SLOT: usize = 0;

/// Reference player used by the command line runner and the replay tests.
#[derive(Debug, Default)]
pub struct ExamplePlayer {
    seed: u64,
    streams: BTreeMap<UnitId, ChaCha8Rng>,
    spent: BTreeMap<UnitId, u32>,
    terminated: BTreeSet<UnitId>,
}

impl ExamplePlayer {
    /// Creates a player with no live units.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&mut self, unit: UnitId) -> ChaCha8Rng {
        self.streams
            .remove(&unit)
            .unwrap_or_else(|| ChaCha8Rng::seed_from_u64(self.seed ^ u64::from(unit.get())))
    }

    /// Runs `command` if the legality check allows it. A failure after a
    /// successful check marks the unit as faulted.
    fn attempt(&mut self, controller: &mut Controller<'_>, command: Command) -> bool {
        self.charge(controller.id());
        if !controller.can(&command) {
            return false;
        }
        match controller.execute(command.clone()) {
            Ok(()) => true,
            Err(error) => {
                warn!(unit = %controller.id(), ?command, %error, "check and execute disagreed");
                let _ = self.terminated.insert(controller.id());
                false
            }
        }
    }

    fn charge(&mut self, unit: UnitId) {
        let spent = self.spent.entry(unit).or_insert(0);
        *spent = spent.saturating_add(OPERATION_COST);
    }

    fn nearby(&mut self, controller: &Controller<'_>, team: Option<Team>) -> Vec<UnitInfo> {
        self.charge(controller.id());
        controller
            .sense_nearby_units(None, team)
            .unwrap_or_default()
    }

    fn headquarters(&mut self, controller: &mut Controller<'_>, rng: &mut ChaCha8Rng) {
        if let Ok(location) = controller.location() {
            let packed = pack(location, controller.origin());
            let _ = self.attempt(
                controller,
                Command::WriteChannel {
                    index: HOME_SLOT,
                    value: packed,
                },
            );
        }

        let wounded = self
            .nearby(controller, Some(controller.team()))
            .into_iter()
            .filter(|unit| !unit.kind.is_structure() && unit.health < unit.kind.max_health(unit.level))
            .min_by_key(|unit| (unit.health, unit.id));
        if let Some(patient) = wounded {
            if self.attempt(controller, Command::Repair { target: patient.location }) {
                return;
            }
        }

        let kind = if controller.round() < 30 || rng.gen_bool(0.4) {
            UnitKind::Miner
        } else if controller.balance(Currency::Gold) >= UnitKind::Sage.profile().gold_cost {
            UnitKind::Sage
        } else if rng.gen_bool(0.3) {
            UnitKind::Builder
        } else {
            UnitKind::Soldier
        };
        for direction in shuffled(rng) {
            if self.attempt(controller, Command::Build { kind, direction }) {
                return;
            }
        }
    }

    fn miner(&mut self, controller: &mut Controller<'_>, rng: &mut ChaCha8Rng) {
        let Ok(here) = controller.location() else {
            return;
        };
        for currency in [Currency::Gold, Currency::Lead] {
            // Leave one lead behind so the cell keeps regenerating.
            let floor = u32::from(currency == Currency::Lead);
            let command = |target| match currency {
                Currency::Lead => Command::MineLead { target },
                Currency::Gold => Command::MineGold { target },
            };
            for target in neighbourhood(here) {
                loop {
                    self.charge(controller.id());
                    let deposit = match currency {
                        Currency::Lead => controller.sense_lead(target),
                        Currency::Gold => controller.sense_gold(target),
                    };
                    if deposit.map_or(true, |amount| amount <= floor)
                        || !self.attempt(controller, command(target))
                    {
                        break;
                    }
                }
            }
        }
        self.wander(controller, rng, None);
    }

    fn fighter(&mut self, controller: &mut Controller<'_>, rng: &mut ChaCha8Rng) {
        let enemies = self.nearby(controller, Some(controller.team().opponent()));
        let weakest = enemies.iter().min_by_key(|unit| (unit.health, unit.id)).copied();

        if controller.kind() == UnitKind::Sage && enemies.len() >= 4 {
            if self.attempt(
                controller,
                Command::Envision {
                    anomaly: AnomalyKind::UnitCulling,
                },
            ) {
                return;
            }
        }
        if let Some(target) = weakest {
            if self.attempt(controller, Command::Attack { target: target.location }) {
                return;
            }
        }
        let goal = enemies
            .first()
            .map(|unit| unit.location)
            .or_else(|| enemy_home(controller));
        self.wander(controller, rng, goal);
    }

    fn builder(&mut self, controller: &mut Controller<'_>, rng: &mut ChaCha8Rng) {
        let friends = self.nearby(controller, Some(controller.team()));
        let damaged = friends
            .iter()
            .filter(|unit| unit.kind.is_structure() && unit.health < unit.kind.max_health(unit.level))
            .min_by_key(|unit| (unit.health, unit.id))
            .copied();
        if let Some(structure) = damaged {
            if self.attempt(controller, Command::Repair { target: structure.location }) {
                return;
            }
        }
        for structure in friends.iter().filter(|unit| unit.kind.is_structure()) {
            if self.attempt(controller, Command::Upgrade { target: structure.location }) {
                return;
            }
        }

        let laboratories = friends
            .iter()
            .filter(|unit| unit.kind == UnitKind::Laboratory)
            .count();
        let kind = if laboratories == 0 && controller.balance(Currency::Lead) > 400 {
            Some(UnitKind::Laboratory)
        } else if controller.balance(Currency::Lead) > 300 && rng.gen_bool(0.2) {
            Some(UnitKind::Watchtower)
        } else {
            None
        };
        if let Some(kind) = kind {
            for direction in shuffled(rng) {
                if self.attempt(controller, Command::Build { kind, direction }) {
                    return;
                }
            }
        }
        self.wander(controller, rng, None);
    }

    fn laboratory(&mut self, controller: &mut Controller<'_>) {
        self.charge(controller.id());
        let reserve = controller.transmutation_cost().unwrap_or(u32::MAX);
        if controller.balance(Currency::Lead) > reserve.saturating_add(200) {
            let _ = self.attempt(controller, Command::Transmute);
        }
    }

    fn watchtower(&mut self, controller: &mut Controller<'_>, rng: &mut ChaCha8Rng) {
        let mode = controller.info().map(|unit| unit.mode);
        let enemies = self.nearby(controller, Some(controller.team().opponent()));
        match mode {
            Ok(UnitMode::Stationary) => {
                if let Some(target) = enemies.iter().min_by_key(|unit| (unit.health, unit.id)) {
                    let _ = self.attempt(controller, Command::Attack { target: target.location });
                } else if rng.gen_bool(0.05) {
                    let _ = self.attempt(controller, Command::Transform);
                }
            }
            Ok(UnitMode::MobileStructure) => {
                if !enemies.is_empty() || rng.gen_bool(0.2) {
                    let _ = self.attempt(controller, Command::Transform);
                } else {
                    let goal = enemy_home(controller);
                    self.wander(controller, rng, goal);
                }
            }
            _ => {}
        }
    }

    /// Steps toward `goal` when set, otherwise in a random direction.
    fn wander(&mut self, controller: &mut Controller<'_>, rng: &mut ChaCha8Rng, goal: Option<Location>) {
        let Ok(here) = controller.location() else {
            return;
        };
        let mut directions = shuffled(rng);
        if let Some(goal) = goal {
            directions.sort_by_key(|direction| here.add(*direction).distance_squared_to(goal));
        }
        for direction in directions {
            if self.attempt(controller, Command::Move { direction }) {
                return;
            }
        }
    }
}

impl DecisionProvider for ExamplePlayer {
    fn match_started(&mut self, world: &World) {
        self.seed = query::map(world).seed();
    }

    fn unit_spawned(&mut self, unit: &Unit) {
        let stream = ChaCha8Rng::seed_from_u64(self.seed ^ u64::from(unit.id().get()));
        let _ = self.streams.insert(unit.id(), stream);
    }

    fn unit_killed(&mut self, unit: &Unit) {
        let _ = self.streams.remove(&unit.id());
        let _ = self.spent.remove(&unit.id());
        let _ = self.terminated.remove(&unit.id());
    }

    fn run_unit(&mut self, controller: &mut Controller<'_>) {
        let id = controller.id();
        let _ = self.spent.insert(id, 0);
        let mut rng = self.stream(id);
        match controller.kind() {
            UnitKind::Headquarters => self.headquarters(controller, &mut rng),
            UnitKind::Miner => self.miner(controller, &mut rng),
            UnitKind::Soldier | UnitKind::Sage => self.fighter(controller, &mut rng),
            UnitKind::Builder => self.builder(controller, &mut rng),
            UnitKind::Laboratory => self.laboratory(controller),
            UnitKind::Watchtower => self.watchtower(controller, &mut rng),
        }
        let _ = self.streams.insert(id, rng);
    }

    fn used_budget(&self, unit: UnitId) -> u32 {
        self.spent.get(&unit).copied().unwrap_or(0)
    }

    fn terminated(&self, unit: UnitId) -> bool {
        self.terminated.contains(&unit)
    }
}

fn shuffled(rng: &mut ChaCha8Rng) -> Vec<Direction> {
    let mut directions = Direction::ALL.to_vec();
    directions.shuffle(rng);
    directions
}

fn neighbourhood(center: Location) -> Vec<Location> {
    let mut cells = vec![center];
    cells.extend(Direction::ALL.iter().map(|direction| center.add(*direction)));
    cells
}

/// Packs a location relative to the map origin into one channel value.
fn pack(location: Location, origin: Location) -> u32 {
    let x = u32::try_from(i64::from(location.x()) - i64::from(origin.x())).unwrap_or(0);
    let y = u32::try_from(i64::from(location.y()) - i64::from(origin.y())).unwrap_or(0);
    x * 128 + y
}

/// Rotational guess at the enemy base, taken from the team's own home.
fn enemy_home(controller: &Controller<'_>) -> Option<Location> {
    let packed = controller.read_channel(HOME_SLOT).ok()?;
    if packed == 0 {
        return None;
    }
    let origin = controller.origin();
    let (x, y) = (packed / 128, packed % 128);
    let mirrored_x = controller.map_width().checked_sub(1 + x)?;
    let mirrored_y = controller.map_height().checked_sub(1 + y)?;
    Some(origin.translate(
        i32::try_from(mirrored_x).ok()?,
        i32::try_from(mirrored_y).ok()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_homes_round_trip_through_the_mirror() {
        let origin = Location::new(100, 200);
        let packed = pack(Location::new(103, 205), origin);
        assert_eq!(packed, 3 * 128 + 5);
        assert_eq!((packed / 128, packed % 128), (3, 5));
    }

    #[test]
    fn neighbourhood_includes_the_centre() {
        let cells = neighbourhood(Location::new(0, 0));
        assert_eq!(cells.len(), 9);
        assert_eq!(cells[0], Location::new(0, 0));
    }

    #[test]
    fn shuffles_are_reproducible() {
        let mut first = ChaCha8Rng::seed_from_u64(9);
        let mut second = ChaCha8Rng::seed_from_u64(9);
        assert_eq!(shuffled(&mut first), shuffled(&mut second));
    }
}
