//! ---
//! plc_section: "11-simulation"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Owned plant snapshots handed to reporting."
//! plc_version: "v0.1.0"
//! plc_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::actuator::{HeaterState, ValveState};
use crate::logic::Plant;
use crate::noise::NoiseSource;
use crate::sensor::Sensor;

/// Report-time view of the plant: a fresh noisy measurement per sensor plus
/// the current actuator states. Owns all of its data so it can outlive the
/// tick that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantReading {
    pub level_sensor_id: String,
    pub water_level: f64,
    pub temperature_sensor_id: String,
    pub water_temperature: f64,
    pub inlet_valve_id: String,
    pub inlet_valve: ValveState,
    pub outlet_valve_id: String,
    pub outlet_valve: ValveState,
    pub heater_id: String,
    pub heater: HeaterState,
}

impl PlantReading {
    pub(crate) fn capture(plant: &Plant, noise: &mut dyn NoiseSource) -> Self {
        let level = plant.level_sensor();
        let temperature = plant.temperature_sensor();
        Self {
            level_sensor_id: level.id().to_owned(),
            water_level: level.measure(noise),
            temperature_sensor_id: temperature.id().to_owned(),
            water_temperature: temperature.measure(noise),
            inlet_valve_id: plant.inlet_valve().id().to_owned(),
            inlet_valve: plant.inlet_valve().state(),
            outlet_valve_id: plant.outlet_valve().id().to_owned(),
            outlet_valve: plant.outlet_valve().state(),
            heater_id: plant.heater().id().to_owned(),
            heater: plant.heater().state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{ControlParameters, PlcLogic};
    use crate::noise::FixedNoise;

    #[test]
    fn reading_serialises_with_lowercase_states() {
        let plant = Plant::builder()
            .initial_level(20.0)
            .initial_temperature(50.0)
            .build();
        let mut plc = PlcLogic::new(plant, ControlParameters::default(), FixedNoise::midpoint());
        plc.process();
        let reading = plc.reading();

        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["level_sensor_id"], "water_level_sensor_01");
        assert_eq!(json["inlet_valve"], "open");
        assert_eq!(json["outlet_valve"], "closed");
        assert_eq!(json["heater"], "off");

        let back: PlantReading = serde_json::from_value(json).unwrap();
        assert_eq!(back.heater_id, reading.heater_id);
        assert_eq!(back.inlet_valve, reading.inlet_valve);
        assert!((back.water_level - reading.water_level).abs() < 1e-9);
    }
}
