//! ---
//! plc_section: "01-core-functionality"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Simulation driver and runtime lifecycle."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
//! Simulation driver for R-PLC: assembles the plant from configuration and
//! runs the control loop at a fixed period, reporting every tick.

pub mod assembly;
pub mod driver;
pub mod schedule;

pub use assembly::{build_plc, build_sink, parameters_from_config, plant_from_config, rates_from_config};
pub use driver::{DriverStats, SimulationDriver, TickOutcome};
pub use schedule::RateLimiter;
