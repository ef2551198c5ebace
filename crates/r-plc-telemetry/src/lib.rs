//! ---
//! plc_section: "05-networking-external-interfaces"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Time-series reporting adapters."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
//! Reporting surface of the simulator: plant readings are encoded as
//! InfluxDB line protocol and handed to a [`MeasurementSink`].

pub mod influx;
pub mod line_protocol;
pub mod sink;

pub use influx::InfluxWriter;
pub use line_protocol::{BatchEncoder, LineBatch};
pub use sink::{MeasurementSink, SinkError, StdoutSink};
