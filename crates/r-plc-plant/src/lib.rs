//! ---
//! plc_section: "11-simulation"
//! plc_subsection: "01-bootstrap"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Plant model module exports and shared types."
//! plc_version: "v0.1.0"
//! plc_owner: "tbd"
//! ---
//! Boiler plant model for the R-PLC simulator.
//!
//! Sensors hold a clamped true value and return noisy observations, actuators
//! are two-state devices, and [`PlcLogic`] couples them: it samples the
//! sensors, drives the actuators, then advances the tank physics once per
//! call. All randomness flows through an injected [`NoiseSource`].

pub mod actuator;
pub mod error;
pub mod logic;
pub mod noise;
pub mod physics;
pub mod reading;
pub mod sensor;

pub use actuator::{HeaterActuator, HeaterState, ValveActuator, ValveState};
pub use error::PlantError;
pub use logic::{ControlCycle, ControlParameters, Plant, PlcLogic};
pub use noise::{FixedNoise, NoiseSource, SeededNoise};
pub use physics::{PhysicsRates, UniformRange};
pub use reading::PlantReading;
pub use sensor::{Sensor, WaterLevelSensor, WaterTemperatureSensor, SENSOR_MAX, SENSOR_MIN};
