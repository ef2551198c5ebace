//! ---
//! plc_section: "01-core-functionality"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Shared primitives and utilities for the core runtime."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_level_sensor_id() -> String {
    "water_level_sensor_01".to_owned()
}

fn default_temperature_sensor_id() -> String {
    "water_temp_sensor_01".to_owned()
}

fn default_inlet_valve_id() -> String {
    "inlet_valve_01".to_owned()
}

fn default_outlet_valve_id() -> String {
    "outlet_valve_01".to_owned()
}

fn default_heater_id() -> String {
    "heater_actuator_01".to_owned()
}

fn default_initial_temperature() -> f64 {
    25.0
}

fn default_min_level() -> f64 {
    30.0
}

fn default_max_level() -> f64 {
    70.0
}

fn default_target_temperature() -> f64 {
    80.0
}

fn default_inlet_fill() -> [f64; 2] {
    [0.2, 0.3]
}

fn default_inlet_cooling() -> [f64; 2] {
    [0.1, 0.2]
}

fn default_outlet_drain() -> [f64; 2] {
    [0.2, 0.3]
}

fn default_heater_gain() -> [f64; 2] {
    [0.7, 1.0]
}

fn default_ambient_loss() -> [f64; 2] {
    [0.04, 0.05]
}

fn default_sink_enabled() -> bool {
    true
}

fn default_sink_scheme() -> String {
    "http".to_owned()
}

fn default_sink_host() -> String {
    "influxdb".to_owned()
}

fn default_sink_port() -> u16 {
    8086
}

fn default_sink_org() -> String {
    "infm".to_owned()
}

fn default_sink_bucket() -> String {
    "timeseries".to_owned()
}

fn default_sink_token() -> String {
    "password".to_owned()
}

fn default_site() -> String {
    "site1".to_owned()
}

fn default_measurement() -> String {
    "boiler".to_owned()
}

fn default_sink_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_logging_file() -> bool {
    true
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9899))
}

/// Primary configuration object for the R-PLC runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub plant: PlantConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "R_PLC_CONFIG";
    pub const ENV_SINK_TOKEN: &str = "R_PLC_INFLUX_TOKEN";

    /// Load configuration from disk, respecting the `R_PLC_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Read, parse, and validate a single configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let mut config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.apply_env_overrides();
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Replace the sink credential with `R_PLC_INFLUX_TOKEN` when it is set.
    pub fn apply_env_overrides(&mut self) {
        let token = std::env::var(Self::ENV_SINK_TOKEN).ok();
        self.apply_token_override(token.as_deref());
    }

    /// Blank or missing values leave the configured token alone.
    pub fn apply_token_override(&mut self, token: Option<&str>) {
        if let Some(token) = token.filter(|token| !token.trim().is_empty()) {
            self.sink.token = token.to_owned();
        }
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.plant.validate()?;
        self.control.validate()?;
        self.physics.validate()?;
        self.sink.validate()?;
        self.simulation.validate()?;
        Ok(())
    }

    /// Render the effective configuration back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialise configuration")
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Initial position of a valve when the plant is created.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValveInitial {
    Open,
    #[default]
    Closed,
}

/// Component identifiers and initial physical state of the tank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantConfig {
    #[serde(default = "default_level_sensor_id")]
    pub level_sensor_id: String,
    #[serde(default = "default_temperature_sensor_id")]
    pub temperature_sensor_id: String,
    #[serde(default = "default_inlet_valve_id")]
    pub inlet_valve_id: String,
    #[serde(default = "default_outlet_valve_id")]
    pub outlet_valve_id: String,
    #[serde(default = "default_heater_id")]
    pub heater_id: String,
    #[serde(default)]
    pub initial_level: f64,
    #[serde(default = "default_initial_temperature")]
    pub initial_temperature: f64,
    #[serde(default)]
    pub inlet_initial: ValveInitial,
    #[serde(default)]
    pub outlet_initial: ValveInitial,
    #[serde(default)]
    pub heater_initially_on: bool,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            level_sensor_id: default_level_sensor_id(),
            temperature_sensor_id: default_temperature_sensor_id(),
            inlet_valve_id: default_inlet_valve_id(),
            outlet_valve_id: default_outlet_valve_id(),
            heater_id: default_heater_id(),
            initial_level: 0.0,
            initial_temperature: default_initial_temperature(),
            inlet_initial: ValveInitial::Closed,
            outlet_initial: ValveInitial::Closed,
            heater_initially_on: false,
        }
    }
}

impl PlantConfig {
    pub fn validate(&self) -> Result<()> {
        for (field, id) in [
            ("level_sensor_id", &self.level_sensor_id),
            ("temperature_sensor_id", &self.temperature_sensor_id),
            ("inlet_valve_id", &self.inlet_valve_id),
            ("outlet_valve_id", &self.outlet_valve_id),
            ("heater_id", &self.heater_id),
        ] {
            if id.trim().is_empty() {
                return Err(anyhow!("plant.{} must not be empty", field));
            }
        }
        if !self.initial_level.is_finite() || !self.initial_temperature.is_finite() {
            return Err(anyhow!("plant initial values must be finite"));
        }
        Ok(())
    }
}

/// Set points used by the PLC rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    #[serde(default = "default_min_level")]
    pub min_level: f64,
    #[serde(default = "default_max_level")]
    pub max_level: f64,
    #[serde(default = "default_target_temperature")]
    pub target_temperature: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            min_level: default_min_level(),
            max_level: default_max_level(),
            target_temperature: default_target_temperature(),
        }
    }
}

impl ControlConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_level.is_finite()
            && self.max_level.is_finite()
            && self.target_temperature.is_finite())
        {
            return Err(anyhow!("control set points must be finite"));
        }
        if self.min_level >= self.max_level {
            return Err(anyhow!(
                "control.min_level ({}) must be below control.max_level ({})",
                self.min_level,
                self.max_level
            ));
        }
        Ok(())
    }
}

/// Uniform ranges (`[low, high]`) sampled by the physics step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    #[serde(default = "default_inlet_fill")]
    pub inlet_fill: [f64; 2],
    #[serde(default = "default_inlet_cooling")]
    pub inlet_cooling: [f64; 2],
    #[serde(default = "default_outlet_drain")]
    pub outlet_drain: [f64; 2],
    #[serde(default = "default_heater_gain")]
    pub heater_gain: [f64; 2],
    #[serde(default = "default_ambient_loss")]
    pub ambient_loss: [f64; 2],
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            inlet_fill: default_inlet_fill(),
            inlet_cooling: default_inlet_cooling(),
            outlet_drain: default_outlet_drain(),
            heater_gain: default_heater_gain(),
            ambient_loss: default_ambient_loss(),
        }
    }
}

impl PhysicsConfig {
    pub fn validate(&self) -> Result<()> {
        for (field, [low, high]) in [
            ("inlet_fill", self.inlet_fill),
            ("inlet_cooling", self.inlet_cooling),
            ("outlet_drain", self.outlet_drain),
            ("heater_gain", self.heater_gain),
            ("ambient_loss", self.ambient_loss),
        ] {
            if !(low.is_finite() && high.is_finite()) || low < 0.0 || low > high {
                return Err(anyhow!(
                    "physics.{} must satisfy 0 <= low <= high (got [{}, {}])",
                    field,
                    low,
                    high
                ));
            }
        }
        Ok(())
    }
}

/// Connection details for the InfluxDB v2 write endpoint.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default = "default_sink_enabled")]
    pub enabled: bool,
    #[serde(default = "default_sink_scheme")]
    pub scheme: String,
    #[serde(default = "default_sink_host")]
    pub host: String,
    #[serde(default = "default_sink_port")]
    pub port: u16,
    #[serde(default = "default_sink_org")]
    pub org: String,
    #[serde(default = "default_sink_bucket")]
    pub bucket: String,
    #[serde(default = "default_sink_token")]
    pub token: String,
    #[serde(default = "default_site")]
    pub site: String,
    #[serde(default = "default_measurement")]
    pub measurement: String,
    #[serde(default = "default_sink_timeout", rename = "timeout_secs")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            enabled: default_sink_enabled(),
            scheme: default_sink_scheme(),
            host: default_sink_host(),
            port: default_sink_port(),
            org: default_sink_org(),
            bucket: default_sink_bucket(),
            token: default_sink_token(),
            site: default_site(),
            measurement: default_measurement(),
            timeout: default_sink_timeout(),
        }
    }
}

impl SinkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.site.trim().is_empty() {
            return Err(anyhow!("sink.site must not be empty"));
        }
        if self.measurement.trim().is_empty() {
            return Err(anyhow!("sink.measurement must not be empty"));
        }
        if !self.enabled {
            return Ok(());
        }
        if !matches!(self.scheme.as_str(), "http" | "https") {
            return Err(anyhow!(
                "sink.scheme must be http or https (got {})",
                self.scheme
            ));
        }
        for (field, value) in [
            ("host", &self.host),
            ("org", &self.org),
            ("bucket", &self.bucket),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("sink.{} must not be empty", field));
            }
        }
        if self.port == 0 {
            return Err(anyhow!("sink.port must be non-zero"));
        }
        if self.timeout.is_zero() {
            return Err(anyhow!("sink.timeout_secs must be greater than zero"));
        }
        Ok(())
    }
}

/// Loop cadence and randomness settings.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_tick_interval", rename = "tick_interval_secs")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub tick_interval: Duration,
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default)]
    pub max_ticks: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            random_seed: None,
            max_ticks: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(anyhow!(
                "simulation.tick_interval_secs must be greater than zero"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Also write a daily rolling JSON file under `directory`.
    #[serde(default = "default_logging_file")]
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            file: default_logging_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            listen: default_metrics_listen(),
        }
    }
}
