//! Loading and saving maps by name, with built-in fallbacks.

use std::{
    error::Error,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use skirmish_core::{AnomalyKind, Location, Rules, Symmetry, UnitKind};
use skirmish_world::map::{GameMap, MapBuilder, MapError};

/// Suffix appended to a map name to form its file name.
const MAP_SUFFIX: &str = ".map.json";

/// Maps available without a file on disk.
pub(crate) const BUILTIN_MAPS: [&str; 2] = ["quadrants", "corridor"];

/// Errors raised while loading or saving maps.
#[derive(Debug)]
pub(crate) enum MapIoError {
    /// Neither a file nor a built-in map carries the name.
    NotFound {
        /// Requested map name.
        name: String,
        /// Directory that was searched.
        dir: PathBuf,
    },
    /// The file declares a different name than the one it was loaded by.
    NameMismatch {
        /// Requested map name.
        requested: String,
        /// Name stored in the map.
        found: String,
    },
    /// The map file could not be read or written.
    Io {
        /// File that was accessed.
        path: PathBuf,
        /// Underlying failure.
        source: io::Error,
    },
    /// The map file is not a valid map document.
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying failure.
        source: serde_json::Error,
    },
    /// The map failed validation.
    Invalid {
        /// Map name.
        name: String,
        /// Validation failure.
        source: MapError,
    },
}

impl fmt::Display for MapIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { name, dir } => write!(
                f,
                "no map named '{name}' in {} and no built-in map by that name",
                dir.display()
            ),
            Self::NameMismatch { requested, found } => {
                write!(f, "map file for '{requested}' declares the name '{found}'")
            }
            Self::Io { path, source } => write!(f, "could not access {}: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "could not parse {}: {source}", path.display())
            }
            Self::Invalid { name, source } => write!(f, "map '{name}' is invalid: {source}"),
        }
    }
}

impl Error for MapIoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid { source, .. } => Some(source),
            Self::NotFound { .. } | Self::NameMismatch { .. } => None,
        }
    }
}

fn map_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}{MAP_SUFFIX}"))
}

/// Loads `<dir>/<name>.map.json`, falling back to the built-in map of the
/// same name. The loaded map must carry the requested name.
pub(crate) fn load_map(name: &str, dir: &Path) -> Result<GameMap, MapIoError> {
    let path = map_path(dir, name);
    let map = if path.is_file() {
        let text = fs::read_to_string(&path).map_err(|source| MapIoError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str::<GameMap>(&text).map_err(|source| MapIoError::Parse {
            path: path.clone(),
            source,
        })?
    } else {
        builtin(name)
            .map_err(|source| MapIoError::Invalid {
                name: name.to_owned(),
                source,
            })?
            .ok_or_else(|| MapIoError::NotFound {
                name: name.to_owned(),
                dir: dir.to_path_buf(),
            })?
    };

    if map.name() != name {
        return Err(MapIoError::NameMismatch {
            requested: name.to_owned(),
            found: map.name().to_owned(),
        });
    }
    Ok(map)
}

/// Validates `map` and writes it to `<dir>/<name>.map.json`.
pub(crate) fn save_map(map: &GameMap, dir: &Path, rules: &Rules) -> Result<PathBuf, MapIoError> {
    map.validate(rules).map_err(|source| MapIoError::Invalid {
        name: map.name().to_owned(),
        source,
    })?;
    fs::create_dir_all(dir).map_err(|source| MapIoError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = map_path(dir, map.name());
    let json = serde_json::to_string_pretty(map).map_err(|source| MapIoError::Parse {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, json).map_err(|source| MapIoError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn builtin(name: &str) -> Result<Option<GameMap>, MapError> {
    match name {
        "quadrants" => quadrants().map(Some),
        "corridor" => corridor().map(Some),
        _ => Ok(None),
    }
}

/// Open square map with two headquarters per team and scattered deposits.
fn quadrants() -> Result<GameMap, MapError> {
    let mut builder = MapBuilder::new("quadrants", 30, 30, Location::new(0, 0), 0x5eed_0001);
    let _ = builder.symmetry(Symmetry::Rotational).rounds(600);
    builder.add_symmetric_unit(UnitKind::Headquarters, 4, 4)?;
    builder.add_symmetric_unit(UnitKind::Headquarters, 4, 25)?;
    for (x, y, lead) in [(6, 6, 45), (2, 8, 20), (7, 22, 30), (13, 14, 80), (10, 3, 25)] {
        builder.set_symmetric_lead(x, y, lead)?;
    }
    for x in 11..19 {
        builder.set_symmetric_terrain(x, 10, 40)?;
    }
    let _ = builder
        .add_anomaly(150, AnomalyKind::ResourceDrain)
        .add_anomaly(300, AnomalyKind::UnitCulling)
        .add_anomaly(450, AnomalyKind::StructureDamage)
        .add_anomaly(550, AnomalyKind::TerrainMutation);
    builder.validate(&Rules::default())?;
    Ok(builder.build())
}

/// Wide map split by rough terrain with a single gap, mirrored top to bottom.
fn corridor() -> Result<GameMap, MapError> {
    let mut builder = MapBuilder::new("corridor", 40, 24, Location::new(10_000, 10_000), 0x5eed_0002);
    let _ = builder.symmetry(Symmetry::Horizontal).rounds(800);
    builder.add_symmetric_unit(UnitKind::Headquarters, 20, 3)?;
    for (x, y, lead) in [(22, 5, 40), (5, 8, 60), (34, 8, 60), (19, 10, 15)] {
        builder.set_symmetric_lead(x, y, lead)?;
    }
    for x in (0..18).chain(22..40) {
        builder.set_symmetric_terrain(x, 11, 90)?;
    }
    let _ = builder
        .add_anomaly(200, AnomalyKind::TerrainMutation)
        .add_anomaly(400, AnomalyKind::ResourceDrain);
    builder.validate(&Rules::default())?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("skirmish-maps-{label}-{}", std::process::id()))
    }

    #[test]
    fn builtin_maps_are_valid() {
        for name in BUILTIN_MAPS {
            let map = load_map(name, Path::new("/nonexistent")).expect("builtin map");
            assert_eq!(map.name(), name);
            assert!(map.validate(&Rules::default()).is_ok());
        }
    }

    #[test]
    fn unknown_names_are_not_found() {
        let error = load_map("atlantis", Path::new("/nonexistent")).expect_err("missing");
        assert!(matches!(error, MapIoError::NotFound { .. }));
    }

    #[test]
    fn saved_maps_load_back_by_name() {
        let dir = scratch_dir("save");
        let map = load_map("corridor", &dir).expect("builtin");
        let path = save_map(&map, &dir, &Rules::default()).expect("save");
        assert!(path.ends_with("corridor.map.json"));
        let loaded = load_map("corridor", &dir).expect("load");
        assert_eq!(loaded, map);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn files_must_carry_the_requested_name() {
        let dir = scratch_dir("mismatch");
        fs::create_dir_all(&dir).expect("dir");
        let map = load_map("quadrants", &dir).expect("builtin");
        let json = serde_json::to_string(&map).expect("encode");
        fs::write(map_path(&dir, "renamed"), json).expect("write");
        let error = load_map("renamed", &dir).expect_err("mismatch");
        assert!(matches!(
            error,
            MapIoError::NameMismatch { ref found, .. } if found == "quadrants"
        ));
        let _ = fs::remove_dir_all(&dir);
    }
}
