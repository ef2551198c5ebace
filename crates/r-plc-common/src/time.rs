//! ---
//! plc_section: "01-core-functionality"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Shared primitives and utilities for the core runtime."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
use std::time::Duration;

/// Convert a duration into microseconds, saturating at `u64::MAX`.
pub fn duration_to_micros(duration: Duration) -> u64 {
    duration
        .as_secs()
        .saturating_mul(1_000_000)
        .saturating_add(u64::from(duration.subsec_micros()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_durations_to_micros() {
        assert_eq!(duration_to_micros(Duration::from_millis(1500)), 1_500_000);
        assert_eq!(duration_to_micros(Duration::from_secs(u64::MAX)), u64::MAX);
    }
}
