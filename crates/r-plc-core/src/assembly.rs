//! ---
//! plc_section: "01-core-functionality"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Builds the plant, control logic, and sink from configuration."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
use std::sync::Arc;

use anyhow::{Context, Result};
use r_plc_common::config::{
    AppConfig, ControlConfig, PhysicsConfig, PlantConfig, SinkConfig, ValveInitial,
};
use r_plc_plant::{
    ControlParameters, HeaterState, PhysicsRates, Plant, PlcLogic, SeededNoise, UniformRange,
    ValveState,
};
use r_plc_telemetry::{InfluxWriter, MeasurementSink, StdoutSink};
use tracing::info;

fn valve_state(initial: ValveInitial) -> ValveState {
    match initial {
        ValveInitial::Open => ValveState::Open,
        ValveInitial::Closed => ValveState::Closed,
    }
}

pub fn plant_from_config(config: &PlantConfig) -> Plant {
    Plant::builder()
        .level_sensor_id(config.level_sensor_id.clone())
        .temperature_sensor_id(config.temperature_sensor_id.clone())
        .inlet_valve_id(config.inlet_valve_id.clone())
        .outlet_valve_id(config.outlet_valve_id.clone())
        .heater_id(config.heater_id.clone())
        .initial_level(config.initial_level)
        .initial_temperature(config.initial_temperature)
        .inlet(valve_state(config.inlet_initial))
        .outlet(valve_state(config.outlet_initial))
        .heater(if config.heater_initially_on {
            HeaterState::On
        } else {
            HeaterState::Off
        })
        .build()
}

pub fn parameters_from_config(config: &ControlConfig) -> Result<ControlParameters> {
    ControlParameters::new(
        config.min_level,
        config.max_level,
        config.target_temperature,
    )
    .context("invalid control parameters")
}

pub fn rates_from_config(config: &PhysicsConfig) -> Result<PhysicsRates> {
    let range = |name: &'static str, [low, high]: [f64; 2]| {
        UniformRange::new(name, low, high).context("invalid physics rate")
    };
    Ok(PhysicsRates {
        inlet_fill: range("inlet_fill", config.inlet_fill)?,
        inlet_cooling: range("inlet_cooling", config.inlet_cooling)?,
        outlet_drain: range("outlet_drain", config.outlet_drain)?,
        heater_gain: range("heater_gain", config.heater_gain)?,
        ambient_loss: range("ambient_loss", config.ambient_loss)?,
    })
}

/// Assemble the control logic. The seed comes from `seed_override`, then
/// `simulation.random_seed`, then the OS; it is logged either way so a run can
/// be replayed.
pub fn build_plc(config: &AppConfig, seed_override: Option<u64>) -> Result<PlcLogic<SeededNoise>> {
    let parameters = parameters_from_config(&config.control)?;
    let rates = rates_from_config(&config.physics)?;
    let seed = seed_override
        .or(config.simulation.random_seed)
        .unwrap_or_else(rand::random);
    info!(seed, "noise source seeded");
    Ok(PlcLogic::new(
        plant_from_config(&config.plant),
        parameters,
        SeededNoise::from_seed(seed),
    )
    .with_rates(rates))
}

/// Pick the reporting sink: stdout for dry runs or a disabled sink section,
/// InfluxDB otherwise.
pub fn build_sink(config: &SinkConfig, dry_run: bool) -> Result<Arc<dyn MeasurementSink>> {
    if dry_run || !config.enabled {
        return Ok(Arc::new(StdoutSink));
    }
    let writer = InfluxWriter::from_config(config).context("failed to construct influxdb writer")?;
    info!(endpoint = %writer.endpoint(), "reporting to influxdb");
    Ok(Arc::new(writer))
}
