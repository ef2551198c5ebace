//! ---
//! plc_section: "11-simulation"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Simulated water level and temperature sensors."
//! plc_version: "v0.1.0"
//! plc_owner: "tbd"
//! ---

use crate::noise::NoiseSource;

/// Lower bound of every sensor's true value and observation.
pub const SENSOR_MIN: f64 = 0.0;
/// Upper bound of every sensor's true value and observation.
pub const SENSOR_MAX: f64 = 100.0;
/// Half-width of the uniform measurement noise.
pub const MEASUREMENT_NOISE: f64 = 0.5;

fn clamp_reading(value: f64) -> f64 {
    value.clamp(SENSOR_MIN, SENSOR_MAX)
}

/// Analog sensor with a clamped ground-truth value.
pub trait Sensor {
    fn id(&self) -> &str;

    /// Internal ground truth, always within `[SENSOR_MIN, SENSOR_MAX]`.
    fn true_value(&self) -> f64;

    /// Add `delta` to the true value and clamp the result.
    fn update(&mut self, delta: f64);

    /// Noisy observation of the true value. Every call samples fresh noise;
    /// the true value is left untouched.
    fn measure(&self, noise: &mut dyn NoiseSource) -> f64 {
        let offset = noise.uniform(-MEASUREMENT_NOISE, MEASUREMENT_NOISE);
        clamp_reading(self.true_value() + offset)
    }
}

fn apply_delta(value: &mut f64, delta: f64) {
    // NaN would poison the clamp
    if delta.is_nan() {
        return;
    }
    *value = clamp_reading(*value + delta);
}

/// Tank fill level in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterLevelSensor {
    sensor_id: String,
    water_level: f64,
}

impl WaterLevelSensor {
    pub fn new(sensor_id: impl Into<String>, initial_level: f64) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            water_level: clamp_reading(initial_level),
        }
    }

    pub fn level(&self) -> f64 {
        self.water_level
    }
}

impl Sensor for WaterLevelSensor {
    fn id(&self) -> &str {
        &self.sensor_id
    }

    fn true_value(&self) -> f64 {
        self.water_level
    }

    fn update(&mut self, delta: f64) {
        apply_delta(&mut self.water_level, delta);
    }
}

/// Water temperature in degrees Celsius.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterTemperatureSensor {
    sensor_id: String,
    temperature: f64,
}

impl WaterTemperatureSensor {
    pub fn new(sensor_id: impl Into<String>, initial_temperature: f64) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            temperature: clamp_reading(initial_temperature),
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

impl Sensor for WaterTemperatureSensor {
    fn id(&self) -> &str {
        &self.sensor_id
    }

    fn true_value(&self) -> f64 {
        self.temperature
    }

    fn update(&mut self, delta: f64) {
        apply_delta(&mut self.temperature, delta);
    }
}
