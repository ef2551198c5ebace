//! ---
//! plc_section: "05-networking-external-interfaces"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "InfluxDB line-protocol encoding of plant readings."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
use std::fmt::Write as _;

use r_plc_plant::PlantReading;

/// Newline-terminated batch of line-protocol records for one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBatch {
    body: String,
    records: usize,
}

impl LineBatch {
    pub fn as_str(&self) -> &str {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.body.lines()
    }

    pub fn into_string(self) -> String {
        self.body
    }
}

/// Encodes [`PlantReading`]s under a fixed measurement name and site tag.
#[derive(Debug, Clone)]
pub struct BatchEncoder {
    measurement: String,
    site: String,
}

impl BatchEncoder {
    pub fn new(measurement: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            site: site.into(),
        }
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    /// Five records: level, temperature, inlet, outlet, heater.
    pub fn encode(&self, reading: &PlantReading) -> LineBatch {
        let mut batch = BatchBuilder::new(&self.measurement, &self.site);
        batch.record(
            "sensor_id",
            &reading.level_sensor_id,
            "water_level",
            &format_float(reading.water_level),
        );
        batch.record(
            "sensor_id",
            &reading.temperature_sensor_id,
            "water_temperature",
            &format_float(reading.water_temperature),
        );
        batch.record(
            "actuator_id",
            &reading.inlet_valve_id,
            "inlet_valve_state",
            &reading.inlet_valve.as_flag().to_string(),
        );
        batch.record(
            "actuator_id",
            &reading.outlet_valve_id,
            "outlet_valve_state",
            &reading.outlet_valve.as_flag().to_string(),
        );
        batch.record(
            "actuator_id",
            &reading.heater_id,
            "heater_state",
            &reading.heater.as_flag().to_string(),
        );
        batch.finish()
    }
}

struct BatchBuilder {
    measurement: String,
    site: String,
    body: String,
    records: usize,
}

impl BatchBuilder {
    fn new(measurement: &str, site: &str) -> Self {
        Self {
            measurement: escape_measurement(measurement),
            site: escape_tag(site),
            body: String::new(),
            records: 0,
        }
    }

    fn record(&mut self, id_key: &str, id: &str, field: &str, value: &str) {
        // Writing into a String cannot fail.
        let _ = writeln!(
            self.body,
            "{},{}={},site={} {}={}",
            self.measurement,
            id_key,
            escape_tag(id),
            self.site,
            escape_tag(field),
            value
        );
        self.records += 1;
    }

    fn finish(self) -> LineBatch {
        LineBatch {
            body: self.body,
            records: self.records,
        }
    }
}

/// Floats always carry a decimal point so the sink never infers another type.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

fn escape_measurement(raw: &str) -> String {
    escape(raw, &[',', ' '])
}

fn escape_tag(raw: &str) -> String {
    escape(raw, &[',', '=', ' '])
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if special.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
