//! ---
//! plc_section: "01-core-functionality"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Shared primitives and utilities for the core runtime."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
//! Core shared primitives for the R-PLC workspace.
//! This crate exposes configuration loading, tracing setup, and loop timing
//! utilities consumed across the workspace.

pub mod config;
pub mod logging;
pub mod time;
pub mod timing;

pub use config::{
    AppConfig, ControlConfig, LoadedAppConfig, LoggingConfig, MetricsConfig, PhysicsConfig,
    PlantConfig, SimulationConfig, SinkConfig, ValveInitial,
};
pub use logging::{init_tracing, resolve_directive, ConsoleTarget, LogFormat};
pub use timing::{LoopTimingReporter, TimingStats, TimingSummary};
