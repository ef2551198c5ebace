//! ---
//! plc_section: "03-logging"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Plant-aware structured log events."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Structured log events carrying the site, component and tick they concern.
//!
//! Every event emitted here has the same `site`, `component` and `tick`
//! fields, so log pipelines can filter a single device or tick range.

use std::fmt::Display;

use tracing::Level;

pub mod macros;

#[doc(hidden)]
pub use tracing as __tracing;

/// Where in the plant an event happened.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogContext<'a> {
    /// Site tag the plant reports under.
    pub site: Option<&'a str>,
    /// Sensor, actuator or sink the event concerns.
    pub component: Option<&'a str>,
    /// Control loop tick.
    pub tick: Option<u64>,
}

impl<'a> LogContext<'a> {
    /// Context with no fields set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for one component of one site.
    pub fn for_component(site: &'a str, component: &'a str) -> Self {
        Self {
            site: Some(site),
            component: Some(component),
            tick: None,
        }
    }

    /// Same context, pinned to `tick`.
    pub fn at_tick(self, tick: u64) -> Self {
        Self {
            tick: Some(tick),
            ..self
        }
    }

    /// Absent fields are rendered as empty strings and tick zero.
    pub(crate) fn fields(&self) -> (&'a str, &'a str, u64) {
        (
            self.site.unwrap_or_default(),
            self.component.unwrap_or_default(),
            self.tick.unwrap_or_default(),
        )
    }
}

/// Result of a lifecycle step, which also fixes the log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// Completed (INFO).
    Success,
    /// Failed, loop keeps running (WARN).
    Degraded,
    /// Failed or aborted (ERROR).
    Fault,
}

impl SystemEventOutcome {
    /// Value of the `outcome` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Degraded => "degraded",
            Self::Fault => "fault",
        }
    }

    /// Level the event is emitted at.
    pub fn level(self) -> Level {
        match self {
            Self::Success => Level::INFO,
            Self::Degraded => Level::WARN,
            Self::Fault => Level::ERROR,
        }
    }
}

/// Emit a named lifecycle event such as `driver_started` or `report_failed`.
pub fn log_system_event(
    context: &LogContext<'_>,
    event: &str,
    message: impl Display,
    outcome: SystemEventOutcome,
) {
    let (site, component, tick) = context.fields();
    let outcome_label = outcome.as_str();
    // The level passed to `event!` must be a constant.
    macro_rules! emit {
        ($level:expr) => {
            tracing::event!(
                $level,
                event,
                outcome = outcome_label,
                site,
                component,
                tick,
                message = %message
            )
        };
    }
    let level = outcome.level();
    if level == Level::ERROR {
        emit!(Level::ERROR);
    } else if level == Level::WARN {
        emit!(Level::WARN);
    } else {
        emit!(Level::INFO);
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn captured(f: impl FnOnce()) -> Vec<String> {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(Level::DEBUG)
            .with_writer(capture.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        capture.lines()
    }

    #[test]
    fn context_builders() {
        let ctx = LogContext::for_component("site1", "influxdb").at_tick(9);
        assert_eq!(ctx.site, Some("site1"));
        assert_eq!(ctx.component, Some("influxdb"));
        assert_eq!(ctx.tick, Some(9));
        assert_eq!(LogContext::new().fields(), ("", "", 0));
    }

    #[test]
    fn outcome_selects_level() {
        assert_eq!(SystemEventOutcome::Success.level(), Level::INFO);
        assert_eq!(SystemEventOutcome::Degraded.level(), Level::WARN);
        assert_eq!(SystemEventOutcome::Fault.level(), Level::ERROR);
    }

    #[test]
    fn system_event_carries_plant_fields() {
        let lines = captured(|| {
            let ctx = LogContext::for_component("site1", "influxdb").at_tick(3);
            log_system_event(
                &ctx,
                "report_failed",
                format_args!("status {}", 503),
                SystemEventOutcome::Degraded,
            );
        });
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert!(line.contains("\"level\":\"WARN\""), "{line}");
        assert!(line.contains("\"event\":\"report_failed\""), "{line}");
        assert!(line.contains("\"outcome\":\"degraded\""), "{line}");
        assert!(line.contains("\"site\":\"site1\""), "{line}");
        assert!(line.contains("\"tick\":3"), "{line}");
        assert!(line.contains("status 503"), "{line}");
    }

    #[test]
    fn fault_events_are_errors() {
        let lines = captured(|| {
            log_system_event(
                &LogContext::for_component("site1", "r-plcd"),
                "driver_failed",
                "control loop task panicked",
                SystemEventOutcome::Fault,
            );
        });
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\"level\":\"ERROR\""), "{}", lines[0]);
        assert!(lines[0].contains("\"outcome\":\"fault\""), "{}", lines[0]);
    }

    #[test]
    fn macros_fill_missing_context() {
        let lines = captured(|| {
            plc_debug!("debug without context");
            plc_info!(
                context = LogContext::for_component("site1", "inlet_valve_01"),
                "valve {}",
                "opened"
            );
            plc_warn!(context = LogContext::new().at_tick(4), "late tick");
        });
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"component\":\"\""));
        assert!(lines[1].contains("\"component\":\"inlet_valve_01\""));
        assert!(lines[1].contains("valve opened"));
        assert!(lines[2].contains("\"tick\":4"));
    }
}
