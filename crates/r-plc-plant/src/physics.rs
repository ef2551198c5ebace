//! ---
//! plc_section: "11-simulation"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Per-tick tank physics coupling actuators back into sensors."
//! plc_version: "v0.1.0"
//! plc_owner: "tbd"
//! ---

use crate::error::PlantError;
use crate::logic::Plant;
use crate::noise::NoiseSource;
use crate::sensor::Sensor;

/// Non-negative magnitude range sampled uniformly each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformRange {
    low: f64,
    high: f64,
}

impl UniformRange {
    pub fn new(name: &'static str, low: f64, high: f64) -> Result<Self, PlantError> {
        if !(low.is_finite() && high.is_finite()) || low < 0.0 || low > high {
            return Err(PlantError::InvalidRange { name, low, high });
        }
        Ok(Self { low, high })
    }

    const fn fixed(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.low..=self.high).contains(&value)
    }

    fn sample(&self, noise: &mut dyn NoiseSource) -> f64 {
        noise.uniform(self.low, self.high)
    }
}

/// Magnitudes of every physical effect the actuators have on the tank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsRates {
    /// Level gained per tick while the inlet is open.
    pub inlet_fill: UniformRange,
    /// Temperature lost per tick to cold inflow while the inlet is open.
    pub inlet_cooling: UniformRange,
    /// Level lost per tick while the outlet is open.
    pub outlet_drain: UniformRange,
    /// Temperature gained per tick while the heater is on.
    pub heater_gain: UniformRange,
    /// Temperature lost per tick while the heater is off.
    pub ambient_loss: UniformRange,
}

impl Default for PhysicsRates {
    fn default() -> Self {
        Self {
            inlet_fill: UniformRange::fixed(0.2, 0.3),
            inlet_cooling: UniformRange::fixed(0.1, 0.2),
            outlet_drain: UniformRange::fixed(0.2, 0.3),
            heater_gain: UniformRange::fixed(0.7, 1.0),
            ambient_loss: UniformRange::fixed(0.04, 0.05),
        }
    }
}

/// Advance the plant by one tick.
///
/// Each effect goes through the sensor's clamped `update`, one at a time, so a
/// tank at a bound can absorb one delta and still feel the next one.
pub(crate) fn advance(plant: &mut Plant, rates: &PhysicsRates, noise: &mut dyn NoiseSource) {
    if plant.inlet_valve.is_open() {
        plant.level_sensor.update(rates.inlet_fill.sample(noise));
        plant
            .temperature_sensor
            .update(-rates.inlet_cooling.sample(noise));
    }

    if plant.outlet_valve.is_open() {
        plant.level_sensor.update(-rates.outlet_drain.sample(noise));
    }

    if plant.heater.is_on() {
        plant.temperature_sensor.update(rates.heater_gain.sample(noise));
    } else {
        plant
            .temperature_sensor
            .update(-rates.ambient_loss.sample(noise));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::{HeaterState, ValveState};
    use crate::noise::FixedNoise;

    fn plant(
        level: f64,
        temperature: f64,
        inlet: ValveState,
        outlet: ValveState,
        heater: HeaterState,
    ) -> Plant {
        Plant::builder()
            .initial_level(level)
            .initial_temperature(temperature)
            .inlet(inlet)
            .outlet(outlet)
            .heater(heater)
            .build()
    }

    #[test]
    fn range_validation() {
        assert!(UniformRange::new("gain", 0.7, 1.0).is_ok());
        assert_eq!(
            UniformRange::new("gain", 1.0, 0.7),
            Err(PlantError::InvalidRange {
                name: "gain",
                low: 1.0,
                high: 0.7
            })
        );
        assert!(UniformRange::new("gain", -0.1, 0.2).is_err());
        assert!(UniformRange::new("gain", 0.1, f64::INFINITY).is_err());
    }

    #[test]
    fn idle_tank_only_cools() {
        let mut tank = plant(
            40.0,
            50.0,
            ValveState::Closed,
            ValveState::Closed,
            HeaterState::Off,
        );
        advance(&mut tank, &PhysicsRates::default(), &mut FixedNoise::new(1.0));
        assert_eq!(tank.level_sensor.level(), 40.0);
        assert!((tank.temperature_sensor.temperature() - 49.95).abs() < 1e-9);
    }

    #[test]
    fn open_inlet_fills_and_cools() {
        let mut tank = plant(
            40.0,
            50.0,
            ValveState::Open,
            ValveState::Closed,
            HeaterState::Off,
        );
        advance(&mut tank, &PhysicsRates::default(), &mut FixedNoise::new(0.0));
        assert!((tank.level_sensor.level() - 40.2).abs() < 1e-9);
        assert!((tank.temperature_sensor.temperature() - (50.0 - 0.1 - 0.04)).abs() < 1e-9);
    }

    #[test]
    fn both_valves_net_out() {
        let mut tank = plant(
            40.0,
            50.0,
            ValveState::Open,
            ValveState::Open,
            HeaterState::Off,
        );
        advance(&mut tank, &PhysicsRates::default(), &mut FixedNoise::midpoint());
        assert!((tank.level_sensor.level() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn deltas_clamp_individually() {
        // Full tank: the fill is clamped away before the drain applies.
        let mut tank = plant(
            100.0,
            50.0,
            ValveState::Open,
            ValveState::Open,
            HeaterState::Off,
        );
        advance(&mut tank, &PhysicsRates::default(), &mut FixedNoise::new(0.0));
        assert!((tank.level_sensor.level() - 99.8).abs() < 1e-9);
    }

    #[test]
    fn heater_warms_within_gain_range() {
        let mut tank = plant(
            50.0,
            70.0,
            ValveState::Closed,
            ValveState::Closed,
            HeaterState::On,
        );
        let rates = PhysicsRates::default();
        advance(&mut tank, &rates, &mut FixedNoise::new(0.3));
        let gained = tank.temperature_sensor.temperature() - 70.0;
        assert!((gained - 0.79).abs() < 1e-9);
        assert!(rates.heater_gain.contains(0.79));
    }
}
