//! Attack resolution and ricochet target selection.

use std::cmp::Reverse;

use skirmish_core::{Location, Rules, Team, UnitId};

use crate::{unit::Unit, SimulationFault, World};

/// Orders ricochet candidates: nearest to the primary target first, then
/// nearest to the attacker, then the longest-lived, then the lowest id.
///
/// Friendly units and the primary target itself are never candidates.
pub(crate) fn ricochet_order(
    attacker: Location,
    team: Team,
    primary: Location,
    primary_id: UnitId,
    candidates: Vec<&Unit>,
) -> Vec<UnitId> {
    let mut ranked: Vec<&Unit> = candidates
        .into_iter()
        .filter(|unit| unit.team() != team && unit.id() != primary_id)
        .collect();
    ranked.sort_by_key(|unit| {
        (
            unit.location().distance_squared_to(primary),
            unit.location().distance_squared_to(attacker),
            Reverse(unit.rounds_alive()),
            unit.id(),
        )
    });
    ranked.into_iter().map(Unit::id).collect()
}

impl World {
    /// Damages `target`, then bounces to up to the attacker's ricochet count
    /// of further enemies, each hop scaling the previous hop's damage.
    pub(crate) fn resolve_attack(
        &mut self,
        attacker: UnitId,
        target: UnitId,
    ) -> Result<(), SimulationFault> {
        let (team, origin, kind, level, radius) = {
            let unit = self
                .registry
                .get(attacker)
                .ok_or(SimulationFault::MissingUnit(attacker))?;
            (
                unit.team(),
                unit.location(),
                unit.kind(),
                unit.level(),
                unit.action_radius_squared(),
            )
        };
        let primary = self
            .registry
            .get(target)
            .map(Unit::location)
            .ok_or(SimulationFault::MissingUnit(target))?;

        let mut damage = kind.damage(level);
        let hops = kind.ricochet_count(level) as usize;
        let bounces = if hops == 0 {
            Vec::new()
        } else {
            ricochet_order(
                origin,
                team,
                primary,
                target,
                self.registry.within(origin, radius),
            )
        };

        let _ = self.change_health(target, -i64::from(damage))?;
        for victim in bounces.into_iter().take(hops) {
            damage = Rules::scale_permille(damage, self.rules.ricochet_permille);
            if self.registry.get(victim).is_some() {
                let _ = self.change_health(victim, -i64::from(damage))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use skirmish_core::{Event, Symmetry, UnitKind};

    use super::*;
    use crate::map::MapBuilder;

    fn soldier(id: u32, team: Team, x: i32, y: i32, rounds: u32) -> Unit {
        let mut unit = Unit::spawn(
            UnitId::new(id),
            team,
            UnitKind::Soldier,
            Location::new(x, y),
            false,
            &Rules::default(),
        );
        for _ in 0..rounds {
            unit.finish_turn();
        }
        unit
    }

    #[test]
    fn ordering_prefers_proximity_to_primary_then_attacker() {
        let attacker = Location::new(0, 0);
        let primary = Location::new(4, 0);
        let units = vec![
            soldier(1, Team::B, 4, 0, 0),
            soldier(2, Team::B, 6, 0, 0),
            soldier(3, Team::B, 4, 2, 0),
            soldier(4, Team::B, 5, 0, 0),
            soldier(5, Team::A, 4, 1, 0),
        ];
        let order = ricochet_order(
            attacker,
            Team::A,
            primary,
            UnitId::new(1),
            units.iter().collect(),
        );
        assert_eq!(
            order,
            vec![UnitId::new(4), UnitId::new(3), UnitId::new(2)]
        );
    }

    #[test]
    fn ties_fall_back_to_age_then_id() {
        let attacker = Location::new(0, 0);
        let primary = Location::new(5, 5);
        let units = vec![
            soldier(9, Team::B, 5, 6, 1),
            soldier(7, Team::B, 6, 5, 1),
            soldier(8, Team::B, 5, 4, 5),
            soldier(6, Team::B, 4, 5, 3),
        ];
        let order = ricochet_order(
            attacker,
            Team::A,
            primary,
            UnitId::new(99),
            units.iter().collect(),
        );
        assert_eq!(
            order,
            vec![UnitId::new(8), UnitId::new(6), UnitId::new(7), UnitId::new(9)]
        );
    }

    fn battlefield() -> World {
        let mut builder = MapBuilder::new("battlefield", 20, 20, Location::new(0, 0), 8);
        let _ = builder.symmetry(Symmetry::Rotational);
        builder
            .add_symmetric_unit(UnitKind::Headquarters, 2, 2)
            .expect("headquarters");
        builder.set_symmetric_lead(4, 4, 50).expect("lead");
        World::new(builder.build(), Rules::default()).expect("world")
    }

    fn place(world: &mut World, team: Team, kind: UnitKind, x: i32, y: i32) -> UnitId {
        world
            .spawn_unit(team, kind, Location::new(x, y), false)
            .expect("spawn")
    }

    fn health(world: &World, id: UnitId) -> Option<u32> {
        world.registry.get(id).map(Unit::health)
    }

    #[test]
    fn sage_damage_compounds_across_hops() {
        let mut world = battlefield();
        let sage = place(&mut world, Team::A, UnitKind::Sage, 10, 10);
        let ally = place(&mut world, Team::A, UnitKind::Soldier, 11, 10);
        let primary = place(&mut world, Team::B, UnitKind::Soldier, 12, 10);
        let first = place(&mut world, Team::B, UnitKind::Soldier, 12, 11);
        let second = place(&mut world, Team::B, UnitKind::Soldier, 13, 10);
        let spared = place(&mut world, Team::B, UnitKind::Soldier, 10, 13);

        world.resolve_attack(sage, primary).expect("attack");

        assert_eq!(health(&world, primary), Some(50 - 45));
        assert_eq!(health(&world, first), Some(50 - 36));
        assert_eq!(health(&world, second), Some(50 - 28));
        assert_eq!(health(&world, spared), Some(50));
        assert_eq!(health(&world, ally), Some(50));
        assert_eq!(health(&world, sage), Some(100));
    }

    #[test]
    fn chain_continues_past_a_victim_that_dies() {
        let mut world = battlefield();
        let sage = place(&mut world, Team::A, UnitKind::Sage, 10, 10);
        let primary = place(&mut world, Team::B, UnitKind::Soldier, 12, 10);
        let fragile = place(&mut world, Team::B, UnitKind::Builder, 12, 11);
        let second = place(&mut world, Team::B, UnitKind::Soldier, 13, 10);

        world.resolve_attack(sage, primary).expect("attack");

        assert_eq!(health(&world, primary), Some(5));
        assert_eq!(health(&world, fragile), None);
        assert_eq!(health(&world, second), Some(22));
        assert!(world
            .journal
            .iter()
            .any(|event| *event == Event::UnitDied { unit: fragile }));
    }

    #[test]
    fn single_target_attackers_never_bounce() {
        let mut world = battlefield();
        let soldier = place(&mut world, Team::A, UnitKind::Soldier, 10, 10);
        let primary = place(&mut world, Team::B, UnitKind::Soldier, 12, 10);
        let neighbour = place(&mut world, Team::B, UnitKind::Soldier, 12, 11);

        world.resolve_attack(soldier, primary).expect("attack");

        assert_eq!(health(&world, primary), Some(47));
        assert_eq!(health(&world, neighbour), Some(50));
    }
}
