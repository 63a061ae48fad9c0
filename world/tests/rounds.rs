use skirmish_core::{
    ActionKind, AnomalyKind, Currency, Direction, DominationFactor, Event, Location, Outcome, Rules,
    Team, UnitId, UnitKind,
};
use skirmish_world::{
    map::{GameMap, MapBuilder, MapError},
    query,
    unit::Unit,
    Controller, DecisionProvider, RoundStatus, SimulationFault, World,
};

struct Idle;

impl DecisionProvider for Idle {
    fn run_unit(&mut self, _controller: &mut Controller<'_>) {}
}

/// Headquarters build one miner each as soon as they can and every turn is
/// logged.
#[derive(Default)]
struct Expanding {
    turns: Vec<(u32, UnitId)>,
    spawned: Vec<UnitId>,
    killed: Vec<UnitId>,
    doomed: Option<Team>,
    doomed_ids: Vec<UnitId>,
}

impl DecisionProvider for Expanding {
    fn unit_spawned(&mut self, unit: &Unit) {
        self.spawned.push(unit.id());
        if Some(unit.team()) == self.doomed {
            self.doomed_ids.push(unit.id());
        }
    }

    fn unit_killed(&mut self, unit: &Unit) {
        self.killed.push(unit.id());
    }

    fn run_unit(&mut self, controller: &mut Controller<'_>) {
        self.turns.push((controller.round(), controller.id()));
        if controller.kind() == UnitKind::Headquarters && controller.unit_count() == 1 {
            let direction = match controller.team() {
                Team::A => Direction::North,
                Team::B => Direction::South,
            };
            if controller.can_build(UnitKind::Miner, direction) {
                controller
                    .build(UnitKind::Miner, direction)
                    .expect("check promised success");
            }
        }
    }

    fn terminated(&self, unit: UnitId) -> bool {
        self.doomed_ids.contains(&unit)
    }
}

fn arena(width: u32, height: u32) -> MapBuilder {
    let mut builder = MapBuilder::new("arena", width, height, Location::new(0, 0), 42);
    builder
        .add_symmetric_unit(UnitKind::Headquarters, 2, 2)
        .expect("headquarters");
    builder.set_symmetric_lead(4, 4, 10).expect("visible lead");
    builder
}

fn play(map: GameMap, provider: &mut dyn DecisionProvider, rounds: usize) -> (World, Vec<Event>) {
    let mut world = World::new(map, Rules::default()).expect("valid map");
    let mut events = Vec::new();
    for _ in 0..rounds {
        if world.run_round(provider, &mut events) == RoundStatus::Done {
            break;
        }
    }
    (world, events)
}

#[test]
fn scheduled_drain_removes_a_tenth_of_each_deposit() {
    let mut builder = arena(40, 40);
    builder.set_symmetric_lead(20, 10, 100).expect("deposit");
    let _ = builder.add_anomaly(5, AnomalyKind::ResourceDrain);

    let (world, events) = play(builder.build(), &mut Idle, 5);

    assert_eq!(query::round(&world), 5);
    assert_eq!(
        query::resource_at(&world, Currency::Lead, Location::new(20, 10)),
        Some(90)
    );
    assert_eq!(
        query::resource_at(&world, Currency::Lead, Location::new(19, 29)),
        Some(90)
    );
    assert_eq!(query::balance(&world, Team::A, Currency::Lead), 189);
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, Event::AnomalyTriggered { .. }))
            .count(),
        1
    );
}

#[test]
fn asymmetric_maps_are_rejected() {
    let mut builder = arena(40, 40);
    assert!(builder.validate(&Rules::default()).is_ok());
    assert!(builder.remove_unit(37, 37));
    let error = World::new(builder.build(), Rules::default()).expect_err("asymmetric");
    assert!(matches!(
        error,
        SimulationFault::Map(MapError::Asymmetric { .. })
    ));
}

#[test]
fn units_built_mid_round_first_act_next_round() {
    let mut provider = Expanding::default();
    let (world, _) = play(arena(20, 20).build(), &mut provider, 2);

    let first: Vec<UnitId> = provider
        .turns
        .iter()
        .filter(|(round, _)| *round == 1)
        .map(|(_, id)| *id)
        .collect();
    let second: Vec<UnitId> = provider
        .turns
        .iter()
        .filter(|(round, _)| *round == 2)
        .map(|(_, id)| *id)
        .collect();

    assert_eq!(first.len(), 2);
    assert_eq!(provider.spawned.len(), 4);
    let miners = &provider.spawned[2..];
    assert!(miners.iter().all(|id| !first.contains(id)));
    assert_eq!(second.len(), 4);
    assert_eq!(&second[..2], first.as_slice());
    assert_eq!(&second[2..], miners);
    assert_eq!(query::team_unit_count(&world, Team::A), 2);
    assert_eq!(query::balance(&world, Team::A, Currency::Lead), 154);
}

#[test]
fn decision_faults_kill_the_unit_and_can_end_the_match() {
    let mut provider = Expanding {
        doomed: Some(Team::B),
        ..Expanding::default()
    };
    let (world, events) = play(arena(20, 20).build(), &mut provider, 10);

    assert_eq!(
        query::outcome(&world),
        Some(Outcome {
            winner: Team::A,
            factor: DominationFactor::Annihilated
        })
    );
    assert_eq!(query::round(&world), 2);
    assert!(events.iter().any(|event| matches!(
        event,
        Event::Action {
            action: ActionKind::FaultDeath,
            ..
        }
    )));
    assert!(matches!(
        events.last(),
        Some(Event::MatchFooter {
            total_rounds: 2,
            ..
        })
    ));
    assert_eq!(provider.killed.len(), 2);
}

#[test]
fn identical_inputs_produce_identical_logs() {
    let build = || {
        let mut builder = arena(30, 30);
        builder.set_symmetric_terrain(10, 12, 30).expect("terrain");
        let _ = builder
            .rounds(40)
            .add_anomaly(7, AnomalyKind::TerrainMutation)
            .add_anomaly(9, AnomalyKind::UnitCulling);
        builder.build()
    };
    let (_, first) = play(build(), &mut Expanding::default(), 100);
    let (_, second) = play(build(), &mut Expanding::default(), 100);
    assert_eq!(first, second);
    assert!(matches!(first.first(), Some(Event::MatchHeader { .. })));
    assert!(matches!(first.last(), Some(Event::MatchFooter { .. })));
}

/// Asks every legality check about cells far outside an offset map.
#[derive(Default)]
struct FarSighted {
    answers: Vec<bool>,
}

impl DecisionProvider for FarSighted {
    fn run_unit(&mut self, controller: &mut Controller<'_>) {
        for far in [
            Location::new(i32::MIN, 0),
            Location::new(0, i32::MAX),
            Location::new(i32::MAX, i32::MIN),
        ] {
            self.answers.push(controller.on_the_map(far));
            self.answers.push(controller.can_sense_location(far));
            self.answers.push(controller.can_attack(far));
            self.answers.push(controller.can_mine_lead(far));
        }
    }
}

#[test]
fn checks_on_extreme_coordinates_answer_false() {
    let mut builder = MapBuilder::new("offset", 20, 20, Location::new(10_000, 10_000), 3);
    builder
        .add_symmetric_unit(UnitKind::Headquarters, 2, 2)
        .expect("headquarters");
    builder.set_symmetric_lead(4, 4, 10).expect("visible lead");
    let mut provider = FarSighted::default();
    let (world, _) = play(builder.build(), &mut provider, 1);

    assert_eq!(query::round(&world), 1);
    assert_eq!(provider.answers.len(), 24);
    assert!(provider.answers.iter().all(|answer| !answer));
}
