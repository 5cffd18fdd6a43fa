//! Tunables for the horde simulation: monster types, map-data placeholders,
//! movement and signal propagation.
//!
//! Loaded from `horde_config.json` with support for environment variable overrides.

use std::{
    collections::HashMap,
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use bevy::prelude::Resource;
use serde::Deserialize;
use thiserror::Error;

use crate::horde_entity::{MonsterTypeId, MonsterTypeLookup};
use crate::map_data::{
    MapDataError, MapDataPlaceholders, MapDataSummaryId, PassableBits, EMPTY_OMT, FULL_OMT,
    SCATTERED_OBSTACLES_OMT,
};

pub const BUILTIN_HORDE_CONFIG: &str = include_str!("data/horde_config.json");

/// Speed assumed for monster types missing from the table.
pub const DEFAULT_MONSTER_SPEED: i32 = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HordeConfig {
    pub monster_types: HashMap<String, MonsterTypeConfig>,
    pub map_data_placeholders: Vec<PlaceholderDefinition>,
    /// Placeholder assigned to OMTs that have no summary of their own.
    pub default_placeholder: String,
    pub movement: MovementConfig,
    pub signal: SignalConfig,
}

impl Default for HordeConfig {
    fn default() -> Self {
        Self {
            monster_types: HashMap::new(),
            map_data_placeholders: default_placeholders(),
            default_placeholder: EMPTY_OMT.to_string(),
            movement: MovementConfig::default(),
            signal: SignalConfig::default(),
        }
    }
}

fn default_placeholders() -> Vec<PlaceholderDefinition> {
    vec![
        PlaceholderDefinition::filled(EMPTY_OMT, true),
        PlaceholderDefinition::filled(FULL_OMT, false),
        PlaceholderDefinition::filled(SCATTERED_OBSTACLES_OMT, true),
    ]
}

impl HordeConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            Self::from_json_str(BUILTIN_HORDE_CONFIG).expect("builtin horde config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, HordeConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| HordeConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = HordeConfig::from_json_str(&contents)?;
        Ok(config)
    }

    /// Builds the shared placeholder summaries. The default placeholder must be among them.
    pub fn placeholders(&self) -> Result<MapDataPlaceholders, HordeConfigError> {
        let mut placeholders = MapDataPlaceholders::default();
        for definition in &self.map_data_placeholders {
            let bits = definition
                .bits()
                .map_err(|source| HordeConfigError::Placeholder {
                    id: definition.id.clone(),
                    source,
                })?;
            placeholders.insert(MapDataSummaryId::new(definition.id.as_str()), bits);
        }
        if placeholders.get(&self.default_placeholder).is_err() {
            return Err(HordeConfigError::MissingDefaultPlaceholder(
                self.default_placeholder.clone(),
            ));
        }
        Ok(placeholders)
    }

    pub fn monster_type_table(&self) -> MonsterTypeTable {
        MonsterTypeTable::new(
            self.monster_types
                .iter()
                .map(|(id, config)| (MonsterTypeId::new(id.as_str()), config.clone())),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonsterTypeConfig {
    pub speed: i32,
    pub dormant: bool,
}

impl Default for MonsterTypeConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_MONSTER_SPEED,
            dormant: false,
        }
    }
}

/// One named placeholder summary. `fill` wins over `passable`, which wins over `rows`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaceholderDefinition {
    pub id: String,
    pub fill: Option<bool>,
    /// Base64 of the packed bitset.
    pub passable: Option<String>,
    /// 24 rows of `.` (passable) and `#` (blocked).
    pub rows: Vec<String>,
}

impl PlaceholderDefinition {
    pub fn filled(id: &str, passable: bool) -> Self {
        Self {
            id: id.to_string(),
            fill: Some(passable),
            ..Self::default()
        }
    }

    pub fn bits(&self) -> Result<PassableBits, MapDataError> {
        match (self.fill, self.passable.as_deref()) {
            (Some(fill), _) => Ok(PassableBits::filled(fill)),
            (None, Some(encoded)) => PassableBits::from_base64(encoded),
            (None, None) => PassableBits::from_rows(&self.rows),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Moves spent per tile stepped.
    pub move_cost: i32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self { move_cost: 100 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Radius in tiles covered by one unit of signal power.
    pub tiles_per_power: i32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            tiles_per_power: 12,
        }
    }
}

#[derive(Debug, Error)]
pub enum HordeConfigError {
    #[error("failed to parse horde config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read horde config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid map data placeholder `{id}`: {source}")]
    Placeholder {
        id: String,
        #[source]
        source: MapDataError,
    },
    #[error("default placeholder `{0}` is not defined")]
    MissingDefaultPlaceholder(String),
}

/// Monster type data keyed by id.
#[derive(Resource, Debug, Clone, Default)]
pub struct MonsterTypeTable {
    types: HashMap<MonsterTypeId, MonsterTypeConfig>,
}

impl MonsterTypeTable {
    pub fn new(types: impl IntoIterator<Item = (MonsterTypeId, MonsterTypeConfig)>) -> Self {
        Self {
            types: types.into_iter().collect(),
        }
    }

    pub fn get(&self, id: &MonsterTypeId) -> Option<&MonsterTypeConfig> {
        self.types.get(id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl MonsterTypeLookup for MonsterTypeTable {
    fn is_dormant(&self, id: &MonsterTypeId) -> bool {
        self.get(id).is_some_and(|config| config.dormant)
    }

    fn speed(&self, id: &MonsterTypeId) -> i32 {
        self.get(id)
            .map_or(DEFAULT_MONSTER_SPEED, |config| config.speed)
    }
}

/// Handle for accessing the horde configuration.
#[derive(Resource, Debug, Clone)]
pub struct HordeConfigHandle(pub Arc<HordeConfig>);

impl HordeConfigHandle {
    pub fn new(config: Arc<HordeConfig>) -> Self {
        Self(config)
    }

    pub fn get(&self) -> Arc<HordeConfig> {
        Arc::clone(&self.0)
    }

    pub fn replace(&mut self, config: Arc<HordeConfig>) {
        self.0 = config;
    }
}

/// Where the active horde configuration came from.
#[derive(Resource, Debug, Clone)]
pub struct HordeConfigMetadata {
    path: Option<PathBuf>,
}

impl HordeConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

/// Load the horde configuration from `HORDE_CONFIG_PATH`, the crate data file, or the builtin copy.
pub fn load_horde_config_from_env() -> (Arc<HordeConfig>, HordeConfigMetadata) {
    let override_path = env::var("HORDE_CONFIG_PATH").ok().map(PathBuf::from);
    let path = override_path.unwrap_or_else(|| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/data/horde_config.json")
    });

    match HordeConfig::from_file(&path) {
        Ok(config) => {
            tracing::info!(
                target: "horde_sim::config",
                path = %path.display(),
                "horde_config.loaded=file"
            );
            return (Arc::new(config), HordeConfigMetadata::new(Some(path)));
        }
        Err(err) => {
            tracing::warn!(
                target: "horde_sim::config",
                path = %path.display(),
                error = %err,
                "horde_config.load_failed"
            );
        }
    }

    let config = HordeConfig::builtin();
    tracing::info!(target: "horde_sim::config", "horde_config.loaded=builtin");
    (config, HordeConfigMetadata::new(None))
}
