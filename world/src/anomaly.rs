//! Global and localized anomaly effects.

use rand::Rng;
use skirmish_core::{
    AnomalyKind, AnomalyRates, Currency, Event, Location, MapTransform, Rules, Symmetry, Team,
    UnitId, UnitMode,
};
use tracing::debug;

use crate::{unit::Unit, SimulationFault, World};

/// Area an anomaly affects.
#[derive(Clone, Copy, Debug)]
enum Scope {
    Global,
    Local {
        actor: UnitId,
        center: Location,
        radius_squared: i32,
    },
}

impl Scope {
    fn covers(self, location: Location) -> bool {
        match self {
            Self::Global => true,
            Self::Local {
                center,
                radius_squared,
                ..
            } => center.is_within_distance_squared(location, radius_squared),
        }
    }

    fn includes(self, unit: &Unit) -> bool {
        match self {
            Self::Global => true,
            Self::Local { actor, .. } => unit.id() != actor && self.covers(unit.location()),
        }
    }
}

/// Fires a scheduled anomaly across the whole map.
pub(crate) fn dispatch_global(world: &mut World, kind: AnomalyKind) -> Result<(), SimulationFault> {
    debug!(?kind, round = world.round, "anomaly fired");
    if kind == AnomalyKind::TerrainMutation {
        return mutate_terrain(world);
    }
    world.journal.push(Event::AnomalyTriggered {
        kind,
        transform: None,
    });
    let permille = rates(&world.rules, kind)?.global_permille;
    apply(world, kind, Scope::Global, permille)
}

/// Fires an anomaly within `actor`'s action radius, sparing the actor.
pub(crate) fn dispatch_local(
    world: &mut World,
    actor: UnitId,
    kind: AnomalyKind,
) -> Result<(), SimulationFault> {
    let unit = world
        .registry
        .get(actor)
        .ok_or(SimulationFault::MissingUnit(actor))?;
    let scope = Scope::Local {
        actor,
        center: unit.location(),
        radius_squared: unit.action_radius_squared(),
    };
    let permille = rates(&world.rules, kind)?.local_permille;
    apply(world, kind, scope, permille)
}

fn rates(rules: &Rules, kind: AnomalyKind) -> Result<AnomalyRates, SimulationFault> {
    rules
        .anomaly_rates(kind)
        .ok_or_else(|| SimulationFault::Invariant(format!("{kind:?} has no rate")))
}

fn apply(
    world: &mut World,
    kind: AnomalyKind,
    scope: Scope,
    permille: u32,
) -> Result<(), SimulationFault> {
    match kind {
        AnomalyKind::ResourceDrain => drain(world, scope, permille),
        AnomalyKind::UnitCulling => cull(world, scope, permille),
        AnomalyKind::StructureDamage => damage_structures(world, scope, permille),
        AnomalyKind::TerrainMutation => Err(SimulationFault::Invariant(
            "terrain mutation cannot be localized".to_owned(),
        )),
    }
}

/// Removes a fraction of every covered deposit. Global drains also shrink
/// both team balances.
fn drain(world: &mut World, scope: Scope, permille: u32) -> Result<(), SimulationFault> {
    for index in 0..world.lead.len() {
        if !scope.covers(world.map.index_to_location(index)) {
            continue;
        }
        for cells in [&mut world.lead, &mut world.gold] {
            if let Some(cell) = cells.get_mut(index) {
                *cell = cell.saturating_sub(Rules::scale_permille(*cell, permille));
            }
        }
    }

    if matches!(scope, Scope::Global) {
        for team in Team::ALL {
            for currency in [Currency::Lead, Currency::Gold] {
                let loss = Rules::scale_permille(world.ledger.balance(team, currency), permille);
                let _ = world
                    .ledger
                    .add_currency(team, currency, -i64::from(loss))?;
            }
        }
    }
    Ok(())
}

/// Destroys the given fraction of covered droids, least supported first.
fn cull(world: &mut World, scope: Scope, permille: u32) -> Result<(), SimulationFault> {
    let mut ranked: Vec<(usize, UnitId)> = world
        .registry
        .iter()
        .filter(|unit| !unit.kind().is_structure() && scope.includes(unit))
        .map(|unit| (world.visible_friends(unit), unit.id()))
        .collect();
    ranked.sort_unstable();

    let count = u64::try_from(ranked.len()).unwrap_or(u64::MAX) * u64::from(permille) / 1000;
    let count = usize::try_from(count).unwrap_or(ranked.len());
    for (_, id) in ranked.into_iter().take(count) {
        world.destroy_unit(id)?;
    }
    Ok(())
}

/// Damages every covered stationary structure by a fraction of its max health.
fn damage_structures(world: &mut World, scope: Scope, permille: u32) -> Result<(), SimulationFault> {
    let targets: Vec<(UnitId, u32)> = world
        .registry
        .iter()
        .filter(|unit| unit.mode() == UnitMode::Stationary && scope.includes(unit))
        .map(|unit| (unit.id(), Rules::scale_permille(unit.max_health(), permille)))
        .collect();
    for (id, loss) in targets {
        let _ = world.change_health(id, -i64::from(loss))?;
    }
    Ok(())
}

/// Transforms that keep a map of the declared symmetry symmetric.
fn mutation_options(symmetry: Symmetry, width: u32, height: u32) -> Vec<MapTransform> {
    match symmetry {
        Symmetry::Horizontal => vec![MapTransform::MirrorVertical],
        Symmetry::Vertical => vec![MapTransform::MirrorHorizontal],
        Symmetry::Rotational if width == height => vec![
            MapTransform::Rotate180,
            MapTransform::MirrorHorizontal,
            MapTransform::MirrorVertical,
        ],
        Symmetry::Rotational => vec![MapTransform::MirrorHorizontal, MapTransform::MirrorVertical],
    }
}

fn mutate_terrain(world: &mut World) -> Result<(), SimulationFault> {
    let (width, height) = (world.map.width(), world.map.height());
    let options = mutation_options(world.map.symmetry(), width, height);
    let transform = match options.as_slice() {
        [only] => *only,
        _ => options[world.rng.gen_range(0..options.len())],
    };
    world.journal.push(Event::AnomalyTriggered {
        kind: AnomalyKind::TerrainMutation,
        transform: Some(transform),
    });

    let previous = world.terrain.clone();
    for y in 0..height {
        for x in 0..width {
            let (tx, ty) = transform.apply(x, y, width, height);
            let from = world.map.location_to_index(world.map.absolute(x, y));
            let to = world.map.location_to_index(world.map.absolute(tx, ty));
            let value = from.and_then(|from| previous.get(from).copied());
            let cell = to.and_then(|to| world.terrain.get_mut(to));
            match (value, cell) {
                (Some(value), Some(cell)) => *cell = value,
                _ => {
                    return Err(SimulationFault::Invariant(format!(
                        "{transform:?} moved ({x}, {y}) off the map"
                    )))
                }
            }
        }
    }
    Ok(())
}
