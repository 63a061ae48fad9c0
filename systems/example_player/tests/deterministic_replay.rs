use skirmish_core::{ActionKind, AnomalyKind, Event, Location, Rules, Symmetry, UnitKind};
use skirmish_system_example_player::ExamplePlayer;
use skirmish_system_match_log::MatchLog;
use skirmish_world::{
    map::{GameMap, MapBuilder},
    RoundStatus, World,
};

fn contested_map(seed: u64) -> GameMap {
    let mut builder = MapBuilder::new("contested", 32, 32, Location::new(1_000, 2_000), seed);
    let _ = builder.symmetry(Symmetry::Rotational).rounds(150);
    builder
        .add_symmetric_unit(UnitKind::Headquarters, 4, 4)
        .expect("headquarters");
    for (x, y, lead) in [(6, 6, 40), (3, 7, 25), (10, 12, 60), (15, 9, 30)] {
        builder.set_symmetric_lead(x, y, lead).expect("lead");
    }
    for (x, y, terrain) in [(8, 8, 20), (12, 3, 60), (16, 16, 5)] {
        builder.set_symmetric_terrain(x, y, terrain).expect("terrain");
    }
    let _ = builder
        .add_anomaly(40, AnomalyKind::ResourceDrain)
        .add_anomaly(80, AnomalyKind::TerrainMutation)
        .add_anomaly(120, AnomalyKind::UnitCulling);
    builder.build()
}

fn replay(seed: u64) -> MatchLog {
    let mut world = World::new(contested_map(seed), Rules::default()).expect("valid map");
    let mut player = ExamplePlayer::new();
    let mut log = MatchLog::new();
    while world.run_round(&mut player, &mut log) == RoundStatus::Running {}
    log
}

#[test]
fn deterministic_replay_produces_identical_fingerprints() {
    let first = replay(2022);
    let second = replay(2022);

    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.len(), second.len());
    assert_eq!(first.outcome(), second.outcome());
    assert!(first.outcome().is_some(), "a finished match has a winner");
    assert!(matches!(first.header(), Some(Event::MatchHeader { .. })));
    assert!(matches!(
        first.footer(),
        Some(Event::MatchFooter { total_rounds, .. }) if *total_rounds <= 150
    ));
}

#[test]
fn seeds_change_the_match() {
    assert_ne!(replay(1).fingerprint(), replay(2).fingerprint());
}

#[test]
fn every_round_closes_with_a_summary() {
    let log = replay(7);
    assert!(!log.rounds().is_empty());
    for (index, round) in log.rounds().iter().enumerate() {
        let expected = u32::try_from(index + 1).expect("round index");
        assert!(matches!(
            round.last(),
            Some(Event::RoundSummary { round, .. }) if *round == expected
        ));
    }
    let mined = log.events().any(|event| {
        matches!(
            event,
            Event::Action {
                action: ActionKind::MineLead,
                ..
            }
        )
    });
    assert!(mined, "miners should harvest the starting deposits");
}
