//! ---
//! plc_section: "11-simulation"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Plant construction errors."
//! plc_version: "v0.1.0"
//! plc_owner: "tbd"
//! ---
use thiserror::Error;

/// Errors raised while assembling a plant. Once built, the plant has no
/// failure modes.
#[derive(Debug, Error, PartialEq)]
pub enum PlantError {
    #[error("set points must be finite")]
    NonFiniteSetPoint,
    #[error("min_level ({min}) must be below max_level ({max})")]
    InvertedBand { min: f64, max: f64 },
    #[error("range {name} must satisfy 0 <= low <= high (got [{low}, {high}])")]
    InvalidRange {
        name: &'static str,
        low: f64,
        high: f64,
    },
}
