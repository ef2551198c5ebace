//! ---
//! plc_section: "11-simulation"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "PLC control rules for the boiler tank."
//! plc_version: "v0.1.0"
//! plc_owner: "tbd"
//! ---
use tracing::trace;

use crate::actuator::{HeaterActuator, HeaterState, ValveActuator, ValveState};
use crate::error::PlantError;
use crate::noise::NoiseSource;
use crate::physics::{self, PhysicsRates};
use crate::reading::PlantReading;
use crate::sensor::{Sensor, WaterLevelSensor, WaterTemperatureSensor};

/// Immutable set points for the control rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlParameters {
    min_level: f64,
    max_level: f64,
    target_temperature: f64,
}

impl ControlParameters {
    pub fn new(min_level: f64, max_level: f64, target_temperature: f64) -> Result<Self, PlantError> {
        if !(min_level.is_finite() && max_level.is_finite() && target_temperature.is_finite()) {
            return Err(PlantError::NonFiniteSetPoint);
        }
        if min_level >= max_level {
            return Err(PlantError::InvertedBand {
                min: min_level,
                max: max_level,
            });
        }
        Ok(Self {
            min_level,
            max_level,
            target_temperature,
        })
    }

    pub fn min_level(&self) -> f64 {
        self.min_level
    }

    pub fn max_level(&self) -> f64 {
        self.max_level
    }

    pub fn target_temperature(&self) -> f64 {
        self.target_temperature
    }
}

impl Default for ControlParameters {
    fn default() -> Self {
        Self {
            min_level: 30.0,
            max_level: 70.0,
            target_temperature: 80.0,
        }
    }
}

/// The fixed set of field devices attached to the tank.
#[derive(Debug, Clone, PartialEq)]
pub struct Plant {
    pub(crate) level_sensor: WaterLevelSensor,
    pub(crate) temperature_sensor: WaterTemperatureSensor,
    pub(crate) inlet_valve: ValveActuator,
    pub(crate) outlet_valve: ValveActuator,
    pub(crate) heater: HeaterActuator,
}

impl Plant {
    pub fn new(
        level_sensor: WaterLevelSensor,
        temperature_sensor: WaterTemperatureSensor,
        inlet_valve: ValveActuator,
        outlet_valve: ValveActuator,
        heater: HeaterActuator,
    ) -> Self {
        Self {
            level_sensor,
            temperature_sensor,
            inlet_valve,
            outlet_valve,
            heater,
        }
    }

    pub fn builder() -> PlantBuilder {
        PlantBuilder::default()
    }

    pub fn level_sensor(&self) -> &WaterLevelSensor {
        &self.level_sensor
    }

    pub fn temperature_sensor(&self) -> &WaterTemperatureSensor {
        &self.temperature_sensor
    }

    pub fn inlet_valve(&self) -> &ValveActuator {
        &self.inlet_valve
    }

    pub fn outlet_valve(&self) -> &ValveActuator {
        &self.outlet_valve
    }

    pub fn heater(&self) -> &HeaterActuator {
        &self.heater
    }
}

/// Builder for [`Plant`] pre-populated with the reference component ids and
/// an empty tank at 25 °C with every actuator idle.
#[derive(Debug, Clone)]
pub struct PlantBuilder {
    level_sensor_id: String,
    temperature_sensor_id: String,
    inlet_valve_id: String,
    outlet_valve_id: String,
    heater_id: String,
    initial_level: f64,
    initial_temperature: f64,
    inlet: ValveState,
    outlet: ValveState,
    heater: HeaterState,
}

impl Default for PlantBuilder {
    fn default() -> Self {
        Self {
            level_sensor_id: "water_level_sensor_01".to_owned(),
            temperature_sensor_id: "water_temp_sensor_01".to_owned(),
            inlet_valve_id: "inlet_valve_01".to_owned(),
            outlet_valve_id: "outlet_valve_01".to_owned(),
            heater_id: "heater_actuator_01".to_owned(),
            initial_level: 0.0,
            initial_temperature: 25.0,
            inlet: ValveState::Closed,
            outlet: ValveState::Closed,
            heater: HeaterState::Off,
        }
    }
}

impl PlantBuilder {
    pub fn level_sensor_id(mut self, id: impl Into<String>) -> Self {
        self.level_sensor_id = id.into();
        self
    }

    pub fn temperature_sensor_id(mut self, id: impl Into<String>) -> Self {
        self.temperature_sensor_id = id.into();
        self
    }

    pub fn inlet_valve_id(mut self, id: impl Into<String>) -> Self {
        self.inlet_valve_id = id.into();
        self
    }

    pub fn outlet_valve_id(mut self, id: impl Into<String>) -> Self {
        self.outlet_valve_id = id.into();
        self
    }

    pub fn heater_id(mut self, id: impl Into<String>) -> Self {
        self.heater_id = id.into();
        self
    }

    pub fn initial_level(mut self, level: f64) -> Self {
        self.initial_level = level;
        self
    }

    pub fn initial_temperature(mut self, temperature: f64) -> Self {
        self.initial_temperature = temperature;
        self
    }

    pub fn inlet(mut self, state: ValveState) -> Self {
        self.inlet = state;
        self
    }

    pub fn outlet(mut self, state: ValveState) -> Self {
        self.outlet = state;
        self
    }

    pub fn heater(mut self, state: HeaterState) -> Self {
        self.heater = state;
        self
    }

    pub fn build(self) -> Plant {
        Plant::new(
            WaterLevelSensor::new(self.level_sensor_id, self.initial_level),
            WaterTemperatureSensor::new(self.temperature_sensor_id, self.initial_temperature),
            ValveActuator::new(self.inlet_valve_id, self.inlet),
            ValveActuator::new(self.outlet_valve_id, self.outlet),
            HeaterActuator::new(self.heater_id, self.heater),
        )
    }
}

/// Outcome of one [`PlcLogic::process`] call: the samples the decisions were
/// based on and the actuator states that resulted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlCycle {
    pub measured_level: f64,
    pub measured_temperature: f64,
    pub inlet_valve: ValveState,
    pub outlet_valve: ValveState,
    pub heater: HeaterState,
}

/// Control logic for the tank. Owns the plant and the noise source; every
/// mutation of sensor truth or actuator state goes through here.
#[derive(Debug)]
pub struct PlcLogic<N> {
    plant: Plant,
    parameters: ControlParameters,
    rates: PhysicsRates,
    noise: N,
}

impl<N: NoiseSource> PlcLogic<N> {
    pub fn new(plant: Plant, parameters: ControlParameters, noise: N) -> Self {
        Self {
            plant,
            parameters,
            rates: PhysicsRates::default(),
            noise,
        }
    }

    pub fn with_rates(mut self, rates: PhysicsRates) -> Self {
        self.rates = rates;
        self
    }

    pub fn plant(&self) -> &Plant {
        &self.plant
    }

    pub fn parameters(&self) -> &ControlParameters {
        &self.parameters
    }

    pub fn rates(&self) -> &PhysicsRates {
        &self.rates
    }

    /// Run one read-decide-act cycle followed by the physics step.
    pub fn process(&mut self) -> ControlCycle {
        let params = self.parameters;
        let plant = &mut self.plant;

        // Inlet: hysteresis between min and max keeps the previous state.
        let level = plant.level_sensor.measure(&mut self.noise);
        if level <= params.min_level {
            plant.inlet_valve.open();
        } else if level >= params.max_level {
            plant.inlet_valve.close();
        }

        // Heater: only while nothing flows. The outlet state is still the
        // one from the previous tick at this point.
        let temperature = plant.temperature_sensor.measure(&mut self.noise);
        if temperature < params.target_temperature
            && !plant.inlet_valve.is_open()
            && !plant.outlet_valve.is_open()
        {
            plant.heater.turn_on();
        } else {
            plant.heater.turn_off();
        }

        // Outlet: the low-level close must run last and win.
        if temperature >= params.target_temperature {
            plant.outlet_valve.open();
        }
        if level <= params.min_level {
            plant.outlet_valve.close();
        }

        let cycle = ControlCycle {
            measured_level: level,
            measured_temperature: temperature,
            inlet_valve: plant.inlet_valve.state(),
            outlet_valve: plant.outlet_valve.state(),
            heater: plant.heater.state(),
        };

        physics::advance(plant, &self.rates, &mut self.noise);

        trace!(
            measured_level = level,
            measured_temperature = temperature,
            true_level = plant.level_sensor.true_value(),
            true_temperature = plant.temperature_sensor.true_value(),
            inlet = ?cycle.inlet_valve,
            outlet = ?cycle.outlet_valve,
            heater = ?cycle.heater,
            "control cycle complete"
        );
        cycle
    }

    /// Take fresh measurements for reporting. These are new samples and may
    /// differ from the ones `process` decided on.
    pub fn reading(&mut self) -> PlantReading {
        PlantReading::capture(&self.plant, &mut self.noise)
    }
}
