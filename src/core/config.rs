//! Configuration loading and validation
//!
//! Level layout, navigation settings and agent tuning, stored as RON or JSON.

use std::f32::consts::PI;
use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::nav::{LevelError, TileMap, ZoneId};

/// How a chasing agent's search timer reacts when the target is seen again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchRefresh {
    /// Keep the time already spent searching
    #[default]
    Resume,
    /// Start the full search duration over
    Restart,
}

/// Tuning for one agent's behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Speed while wandering, and the speed restored after a hunt
    pub base_speed: f32,
    /// Hunt speed as a multiple of `base_speed`
    pub hunt_speed_multiplier: f32,
    /// Factor applied to the current speed when heading home
    pub return_speed_factor: f32,
    /// Seconds a hunt lasts, including time spent chasing
    pub hunt_duration: f32,
    /// Seconds after a hunt during which `start_hunt` is ignored
    pub cooldown_duration: f32,
    /// Seconds a chaser keeps searching after losing sight
    pub search_duration: f32,
    pub search_refresh: SearchRefresh,
    /// Bounds of the pause between wander legs, in seconds
    pub wait_min: f32,
    pub wait_max: f32,
    /// Field-of-view half-angle in radians
    pub fov_half_angle: f32,
    pub vision_range: f32,
    /// Distance at which a path node counts as reached
    pub arrival_tolerance: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_speed: 2.0,
            hunt_speed_multiplier: 2.0,
            return_speed_factor: 0.5,
            hunt_duration: 60.0,
            cooldown_duration: 120.0,
            search_duration: 5.0,
            search_refresh: SearchRefresh::Resume,
            wait_min: 1.0,
            wait_max: 3.0,
            fov_half_angle: PI / 3.0,
            vision_range: 5.0,
            arrival_tolerance: 0.1,
        }
    }
}

impl AgentConfig {
    pub fn with_base_speed(mut self, speed: f32) -> Self {
        self.base_speed = speed;
        self
    }

    pub fn with_hunt_speed_multiplier(mut self, multiplier: f32) -> Self {
        self.hunt_speed_multiplier = multiplier;
        self
    }

    pub fn with_return_speed_factor(mut self, factor: f32) -> Self {
        self.return_speed_factor = factor;
        self
    }

    /// Set hunt, cooldown and search durations
    pub fn with_timers(mut self, hunt: f32, cooldown: f32, search: f32) -> Self {
        self.hunt_duration = hunt;
        self.cooldown_duration = cooldown;
        self.search_duration = search;
        self
    }

    pub fn with_search_refresh(mut self, refresh: SearchRefresh) -> Self {
        self.search_refresh = refresh;
        self
    }

    /// Set the wander pause interval
    pub fn with_wait(mut self, min: f32, max: f32) -> Self {
        self.wait_min = min;
        self.wait_max = max;
        self
    }

    /// Set field of view (half-angle, radians) and sight range
    pub fn with_vision(mut self, half_angle: f32, range: f32) -> Self {
        self.fov_half_angle = half_angle;
        self.vision_range = range;
        self
    }

    pub fn with_arrival_tolerance(mut self, tolerance: f32) -> Self {
        self.arrival_tolerance = tolerance;
        self
    }

    /// Speed while hunting or chasing
    #[must_use]
    pub fn hunt_speed(&self) -> f32 {
        self.base_speed * self.hunt_speed_multiplier
    }

    /// Check that every value is usable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("base_speed", self.base_speed),
            ("hunt_speed_multiplier", self.hunt_speed_multiplier),
            ("return_speed_factor", self.return_speed_factor),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }

        let non_negative = [
            ("hunt_duration", self.hunt_duration),
            ("cooldown_duration", self.cooldown_duration),
            ("search_duration", self.search_duration),
            ("wait_min", self.wait_min),
            ("wait_max", self.wait_max),
            ("vision_range", self.vision_range),
            ("arrival_tolerance", self.arrival_tolerance),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        if self.wait_min > self.wait_max {
            return Err(ConfigError::Invalid(format!(
                "wait_min ({}) exceeds wait_max ({})",
                self.wait_min, self.wait_max
            )));
        }
        if !(0.0..=PI).contains(&self.fov_half_angle) {
            return Err(ConfigError::Invalid(format!(
                "fov_half_angle must lie in [0, PI], got {}",
                self.fov_half_angle
            )));
        }
        Ok(())
    }
}

/// Navigation graph construction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Maximum edge length in world units
    pub connection_radius: f32,
    /// Nodes per cell along each axis
    pub subdivisions: u32,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            connection_radius: 3.0,
            subdivisions: 1,
        }
    }
}

impl NavConfig {
    pub fn with_connection_radius(mut self, radius: f32) -> Self {
        self.connection_radius = radius;
        self
    }

    pub fn with_subdivisions(mut self, subdivisions: u32) -> Self {
        self.subdivisions = subdivisions;
        self
    }
}

/// Which obstruction test agents and the graph builder use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OracleKind {
    /// Cell traversal over the tile map
    Grid,
    /// Ray casts against wall colliders
    #[default]
    Physics,
}

/// ASCII level description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDesc {
    /// One string per row; `#` wall, space void, `.` floor, letters are zones
    pub rows: Vec<String>,
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
    #[serde(default)]
    pub origin: Vec2,
}

fn default_cell_size() -> f32 {
    1.0
}

impl LevelDesc {
    #[must_use]
    pub fn new<S: Into<String>>(rows: impl IntoIterator<Item = S>) -> Self {
        Self {
            rows: rows.into_iter().map(Into::into).collect(),
            cell_size: default_cell_size(),
            origin: Vec2::ZERO,
        }
    }

    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    /// Parse the rows into a tile map
    ///
    /// # Errors
    ///
    /// Returns a [`LevelError`] for empty levels, unknown characters or a bad cell size
    pub fn to_tile_map(&self) -> Result<TileMap, LevelError> {
        TileMap::from_rows(&self.rows, self.cell_size, self.origin)
    }
}

impl Default for LevelDesc {
    fn default() -> Self {
        Self::new([
            "###########",
            "#aaaa#bbbb#",
            "#aaaa.bbbb#",
            "#aaaa#bbbb#",
            "###.###.###",
            "  #ccccc#  ",
            "  #ccccc#  ",
            "  #######  ",
        ])
    }
}

/// One agent to place when the level starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpawn {
    pub name: String,
    /// Zone the agent wanders in and returns to after a hunt
    pub home_zone: ZoneId,
    /// Spawn position; a random node of the home zone when absent
    #[serde(default)]
    pub position: Option<Vec2>,
    #[serde(default)]
    pub config: AgentConfig,
}

impl AgentSpawn {
    #[must_use]
    pub fn new(name: impl Into<String>, home_zone: ZoneId) -> Self {
        Self {
            name: name.into(),
            home_zone,
            position: None,
            config: AgentConfig::default(),
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }
}

/// Everything needed to start a simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HauntConfig {
    pub level: LevelDesc,
    pub nav: NavConfig,
    pub oracle: OracleKind,
    pub agents: Vec<AgentSpawn>,
    /// Seed for spawn placement and per-agent random streams
    pub seed: u64,
    /// Distance at which an agent catches the target
    pub catch_radius: f32,
}

impl Default for HauntConfig {
    fn default() -> Self {
        Self {
            level: LevelDesc::default(),
            nav: NavConfig::default(),
            oracle: OracleKind::default(),
            agents: vec![
                AgentSpawn::new("Blinky", ZoneId('a')),
                AgentSpawn::new("Clyde", ZoneId('b')),
            ],
            seed: 0,
            catch_radius: 0.5,
        }
    }
}

impl HauntConfig {
    pub fn with_level(mut self, level: LevelDesc) -> Self {
        self.level = level;
        self
    }

    pub fn with_nav(mut self, nav: NavConfig) -> Self {
        self.nav = nav;
        self
    }

    pub fn with_oracle(mut self, oracle: OracleKind) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn with_agents(mut self, agents: Vec<AgentSpawn>) -> Self {
        self.agents = agents;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_catch_radius(mut self, radius: f32) -> Self {
        self.catch_radius = radius;
        self
    }

    /// Check settings, the level layout and every agent's home zone
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.nav.connection_radius.is_finite() || self.nav.connection_radius <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "connection_radius must be positive, got {}",
                self.nav.connection_radius
            )));
        }
        if !self.catch_radius.is_finite() || self.catch_radius < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "catch_radius must be non-negative, got {}",
                self.catch_radius
            )));
        }

        let map = self
            .level
            .to_tile_map()
            .map_err(|e| ConfigError::Invalid(format!("level: {e}")))?;
        let zones = map.zones();

        for spawn in &self.agents {
            spawn
                .config
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("agent '{}': {e}", spawn.name)))?;
            if !zones.contains(&spawn.home_zone) {
                return Err(ConfigError::Invalid(format!(
                    "agent '{}': home {} does not exist in the level",
                    spawn.name, spawn.home_zone
                )));
            }
        }
        Ok(())
    }

    /// Load from a `.ron` or `.json` file and validate it
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, has an unknown extension,
    /// fails to parse or fails validation
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = match extension(path) {
            Some("ron") => Self::load_ron(path)?,
            Some("json") => Self::load_json(path)?,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unsupported config extension {other:?} for {}",
                    path.display()
                )));
            }
        };
        config.validate()?;
        log::info!(
            "Loaded config from {} ({} agents)",
            path.display(),
            config.agents.len()
        );
        Ok(config)
    }

    /// Save as RON or JSON depending on the file extension
    ///
    /// # Errors
    ///
    /// Returns an error for unknown extensions or when serialization or the write fails
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        match extension(path) {
            Some("ron") => self.save_ron(path),
            Some("json") => self.save_json(path),
            other => Err(ConfigError::Invalid(format!(
                "unsupported config extension {other:?} for {}",
                path.display()
            ))),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, self.to_ron_string()?).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path, json).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed RON
    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if serialization fails
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// Errors that can occur while loading or checking configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// IO error
    Io(String),
    /// Serialization error
    Serialize(String),
    /// Malformed RON or JSON
    Parse(String),
    /// Values that parse but cannot be used
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Serialize(e) => write!(f, "Serialization error: {e}"),
            Self::Parse(e) => write!(f, "Parse error: {e}"),
            Self::Invalid(e) => write!(f, "Invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = HauntConfig::default();
        assert!(config.validate().is_ok());
        let map = config.level.to_tile_map().unwrap();
        assert_eq!(map.zones(), vec![ZoneId('a'), ZoneId('b'), ZoneId('c')]);
    }

    #[test]
    fn test_ron_partial_config_uses_defaults() {
        let ron_str = r##"(
            level: (rows: ["#aa#", "#bb#"]),
            agents: [(name: "Inky", home_zone: ('b'))],
            seed: 9,
        )"##;
        let config = HauntConfig::from_ron_str(ron_str).unwrap();

        assert_eq!(config.seed, 9);
        assert_eq!(config.level.cell_size, 1.0);
        assert_eq!(config.nav, NavConfig::default());
        assert_eq!(config.agents[0].home_zone, ZoneId('b'));
        assert_eq!(config.agents[0].config, AgentConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_serialization() {
        let config = HauntConfig::default().with_seed(42).with_oracle(OracleKind::Grid);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("Blinky"));

        let loaded: HauntConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_ron_file_save_load() {
        let path = std::env::temp_dir().join(format!("haunt_config_{}.ron", std::process::id()));
        let config = HauntConfig::default().with_catch_radius(0.75);

        config.save(&path).unwrap();
        let loaded = HauntConfig::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            HauntConfig::load("does/not/exist.ron"),
            Err(ConfigError::Io(_))
        ));
        assert!(matches!(
            HauntConfig::load("config.toml"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            HauntConfig::from_ron_str("(seed: \"nope\")"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_agent_validation() {
        assert!(AgentConfig::default().with_wait(3.0, 1.0).validate().is_err());
        assert!(AgentConfig::default().with_base_speed(0.0).validate().is_err());
        assert!(AgentConfig::default().with_timers(-1.0, 0.0, 0.0).validate().is_err());
        assert!(AgentConfig::default().with_vision(4.0, 5.0).validate().is_err());
        assert!(AgentConfig::default().with_base_speed(f32::NAN).validate().is_err());
        assert!(AgentConfig::default().with_timers(0.0, 0.0, 0.0).validate().is_ok());
    }

    #[test]
    fn test_unknown_home_zone_rejected() {
        let config = HauntConfig::default().with_agents(vec![AgentSpawn::new("Pinky", ZoneId('z'))]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("home zone 'z'"));
    }

    #[test]
    fn test_hunt_speed() {
        let config = AgentConfig::default().with_base_speed(1.5).with_hunt_speed_multiplier(2.0);
        assert!((config.hunt_speed() - 3.0).abs() < 1e-6);
    }
}
