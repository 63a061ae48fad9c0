use proptest::prelude::*;
use skirmish_core::{Currency, Location, Rules, Team, UnitKind};
use skirmish_world::{ledger::Ledger, map::MapBuilder};

fn arb_team() -> impl Strategy<Value = Team> {
    prop_oneof![Just(Team::A), Just(Team::B)]
}

fn arb_currency() -> impl Strategy<Value = Currency> {
    prop_oneof![Just(Currency::Lead), Just(Currency::Gold)]
}

proptest! {
    #[test]
    fn cell_indices_map_back_to_their_location(
        width in 20u32..=60,
        height in 20u32..=60,
        origin_x in -20_000i32..20_000,
        origin_y in -20_000i32..20_000,
        fraction in 0.0f64..1.0,
    ) {
        let mut builder = MapBuilder::new("grid", width, height, Location::new(origin_x, origin_y), 1);
        builder.add_symmetric_unit(UnitKind::Headquarters, 0, 0).expect("corner");
        let map = builder.build();

        let cells = (width * height) as usize;
        let index = ((cells as f64) * fraction) as usize % cells;
        let location = map.index_to_location(index);
        prop_assert!(map.on_the_map(location));
        prop_assert_eq!(map.location_to_index(location), Some(index));
        prop_assert_eq!(
            map.location_to_index(Location::new(origin_x - 1, origin_y)),
            None
        );
    }

    #[test]
    fn balances_never_go_negative(
        deltas in proptest::collection::vec((arb_team(), arb_currency(), -300i64..300), 0..64),
    ) {
        let rules = Rules::default();
        let mut ledger = Ledger::new(&rules);
        let mut expected = [[i64::from(rules.starting_lead), i64::from(rules.starting_gold)]; 2];

        for (team, currency, delta) in deltas {
            let slot = &mut expected[team.index()][match currency {
                Currency::Lead => 0,
                Currency::Gold => 1,
            }];
            match ledger.add_currency(team, currency, delta) {
                Ok(balance) => {
                    *slot += delta;
                    prop_assert_eq!(i64::from(balance), *slot);
                }
                Err(_) => prop_assert!(*slot + delta < 0),
            }
            prop_assert_eq!(i64::from(ledger.balance(team, currency)), *slot);
        }
    }
}
