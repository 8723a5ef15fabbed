//! Configuration file support for brewplan.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/brewplan/config.toml`.

use crate::{Error, Result, Stage, Tank, TankFunction, MAX_TANK_LITRES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Longest forecast the engine will project
pub const MAX_HORIZON_DAYS: u32 = 365;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub production: ProductionConfig,

    #[serde(default)]
    pub forecast: ForecastConfig,

    /// Tank roster used when no saved state exists yet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tanks: Vec<TankSpec>,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Stage durations and packaging parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductionConfig {
    #[serde(default = "default_brew_hours")]
    pub brew_hours: u32,

    #[serde(default = "default_ferment_days")]
    pub ferment_days: u32,

    #[serde(default = "default_condition_days")]
    pub condition_days: u32,

    #[serde(default = "default_bottling_minutes_per_litre")]
    pub bottling_minutes_per_litre: u32,

    #[serde(default = "default_bottle_ml")]
    pub bottle_ml: u32,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            brew_hours: default_brew_hours(),
            ferment_days: default_ferment_days(),
            condition_days: default_condition_days(),
            bottling_minutes_per_litre: default_bottling_minutes_per_litre(),
            bottle_ml: default_bottle_ml(),
        }
    }
}

impl ProductionConfig {
    /// Longest a batch of `volume` litres should stay in `stage`
    ///
    /// `None` for stages that end on an external event (waiting, bottled).
    pub fn max_duration(&self, stage: Stage, volume: u32) -> Option<chrono::Duration> {
        match stage {
            Stage::Brewing => Some(chrono::Duration::hours(self.brew_hours.into())),
            Stage::Fermenting => Some(chrono::Duration::days(self.ferment_days.into())),
            Stage::Conditioning => Some(chrono::Duration::days(self.condition_days.into())),
            Stage::Bottling => Some(chrono::Duration::minutes(
                i64::from(self.bottling_minutes_per_litre) * i64::from(volume),
            )),
            Stage::Waiting | Stage::Bottled => None,
        }
    }

    /// Bottles filled from `litres` of beer
    pub fn bottles_for(&self, litres: u32) -> u32 {
        (u64::from(litres) * 1000 / u64::from(self.bottle_ml.max(1))) as u32
    }

    /// Litres needed to fill `bottles`
    pub fn litres_for(&self, bottles: f64) -> f64 {
        bottles * f64::from(self.bottle_ml) / 1000.0
    }
}

/// Forecast and start-brew advisor parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,

    /// How far ahead the start-brew rule looks for demand
    #[serde(default = "default_lookahead_weeks")]
    pub lookahead_weeks: u32,

    /// Length of the demand window summed at the lookahead point
    #[serde(default = "default_demand_window_days")]
    pub demand_window_days: u32,

    /// Trailing days averaged into the anchor sales figure; 1 anchors on the
    /// last day of sales
    #[serde(default = "default_anchor_window_days")]
    pub anchor_window_days: u32,

    /// Trailing days of history used to derive the growth rate
    #[serde(default = "default_growth_window_days")]
    pub growth_window_days: u32,

    /// Suggested volumes round up to a multiple of this many litres
    #[serde(default = "default_volume_step_litres")]
    pub volume_step_litres: u32,

    /// Suggestions at or below this volume are suppressed
    #[serde(default = "default_min_batch_litres")]
    pub min_batch_litres: u32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            lookahead_weeks: default_lookahead_weeks(),
            demand_window_days: default_demand_window_days(),
            anchor_window_days: default_anchor_window_days(),
            growth_window_days: default_growth_window_days(),
            volume_step_litres: default_volume_step_litres(),
            min_batch_litres: default_min_batch_litres(),
        }
    }
}

/// Tank definition in the configuration file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TankSpec {
    pub name: String,
    pub capacity: u32,
    pub function: TankFunction,
}

impl From<&TankSpec> for Tank {
    fn from(spec: &TankSpec) -> Self {
        Tank::new(spec.name.clone(), spec.capacity, spec.function)
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    base.join("brewplan")
}

fn default_brew_hours() -> u32 {
    3
}

fn default_ferment_days() -> u32 {
    28
}

fn default_condition_days() -> u32 {
    14
}

fn default_bottling_minutes_per_litre() -> u32 {
    60
}

fn default_bottle_ml() -> u32 {
    500
}

fn default_horizon_days() -> u32 {
    MAX_HORIZON_DAYS
}

fn default_lookahead_weeks() -> u32 {
    10
}

fn default_demand_window_days() -> u32 {
    42
}

fn default_anchor_window_days() -> u32 {
    1
}

fn default_growth_window_days() -> u32 {
    364
}

fn default_volume_step_litres() -> u32 {
    10
}

fn default_min_batch_litres() -> u32 {
    10
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        base.join("brewplan").join("config.toml")
    }

    /// Reject values the planner cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.production.bottle_ml == 0 {
            return Err(Error::Config("bottle_ml must be positive".into()));
        }
        if self.forecast.horizon_days == 0 || self.forecast.horizon_days > MAX_HORIZON_DAYS {
            return Err(Error::Config(format!(
                "horizon_days must be within 1..={}",
                MAX_HORIZON_DAYS
            )));
        }
        if self.forecast.anchor_window_days == 0 {
            return Err(Error::Config("anchor_window_days must be positive".into()));
        }
        if self.forecast.demand_window_days == 0 {
            return Err(Error::Config("demand_window_days must be positive".into()));
        }
        let window_end = u64::from(self.forecast.lookahead_weeks) * 7
            + u64::from(self.forecast.demand_window_days);
        if window_end > u64::from(self.forecast.horizon_days) {
            return Err(Error::Config(format!(
                "lookahead_weeks and demand_window_days reach {} days out, past the {}-day horizon",
                window_end, self.forecast.horizon_days
            )));
        }
        if self.forecast.volume_step_litres == 0 {
            return Err(Error::Config("volume_step_litres must be positive".into()));
        }
        for tank in &self.tanks {
            if tank.capacity == 0 || tank.capacity > MAX_TANK_LITRES {
                return Err(Error::Config(format!(
                    "tank {} capacity must be within 1..={}",
                    tank.name, MAX_TANK_LITRES
                )));
            }
        }
        Ok(())
    }

    /// Tanks to seed a new store with: the configured roster, or the
    /// default catalog when none is configured
    pub fn initial_tanks(&self) -> Vec<Tank> {
        if self.tanks.is_empty() {
            crate::get_default_catalog().tanks.clone()
        } else {
            self.tanks.iter().map(Tank::from).collect()
        }
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.production.bottle_ml, 500);
        assert_eq!(config.forecast.lookahead_weeks, 10);
        assert_eq!(config.forecast.horizon_days, 365);
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_tanks().len(), 9);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[production]
ferment_days = 21

[[tanks]]
name = "Solo"
capacity = 500
function = "both"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.production.ferment_days, 21);
        assert_eq!(config.production.condition_days, 14); // default
        let tanks = config.initial_tanks();
        assert_eq!(tanks.len(), 1);
        assert_eq!(tanks[0].function, TankFunction::Both);
    }

    #[test]
    fn test_invalid_horizon_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[forecast]\nhorizon_days = 400\n").unwrap();

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_demand_window_must_fit_horizon() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        std::fs::write(&path, "[forecast]\nlookahead_weeks = 20000000\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));

        std::fs::write(&path, "[forecast]\ndemand_window_days = 0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));

        std::fs::write(&path, "[forecast]\nlookahead_weeks = 46\ndemand_window_days = 44\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));

        // 46 weeks plus 43 days ends exactly on the horizon
        std::fs::write(&path, "[forecast]\nlookahead_weeks = 46\ndemand_window_days = 43\n").unwrap();
        assert!(Config::load_from(&path).is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.production.brew_hours = 5;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.production.brew_hours, 5);
    }

    #[test]
    fn test_stage_durations() {
        let production = ProductionConfig::default();
        assert_eq!(
            production.max_duration(Stage::Fermenting, 500),
            Some(chrono::Duration::weeks(4))
        );
        assert_eq!(
            production.max_duration(Stage::Bottling, 500),
            Some(chrono::Duration::hours(500))
        );
        assert_eq!(
            production.max_duration(Stage::Brewing, 500),
            Some(chrono::Duration::hours(3))
        );
        assert_eq!(production.max_duration(Stage::Waiting, 500), None);
        assert_eq!(production.bottles_for(500), 1000);
    }
}
