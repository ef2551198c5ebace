//! ---
//! plc_section: "01-core-functionality"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Fixed-period control loop with per-tick reporting."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use r_plc_common::config::AppConfig;
use r_plc_common::timing::LoopTimingReporter;
use r_plc_common::time::duration_to_micros;
use r_plc_logging::{log_system_event, plc_debug, plc_info, LogContext, SystemEventOutcome};
use r_plc_metrics::TelemetryMetrics;
use r_plc_plant::{ControlCycle, NoiseSource, PlantReading, PlcLogic, SeededNoise};
use r_plc_telemetry::{BatchEncoder, LineBatch, MeasurementSink};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::assembly::build_plc;
use crate::schedule::RateLimiter;

const COMPONENT: &str = "driver";

/// Counters kept by the driver over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub ticks: u64,
    pub reports_sent: u64,
    pub reports_failed: u64,
}

/// What happened during one [`SimulationDriver::tick`].
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub tick: u64,
    pub cycle: ControlCycle,
    pub reading: PlantReading,
    pub batch: LineBatch,
    pub delivered: bool,
}

/// Owns the control logic and drives it at a fixed period, reporting every
/// tick to a [`MeasurementSink`].
pub struct SimulationDriver<N> {
    plc: PlcLogic<N>,
    sink: Arc<dyn MeasurementSink>,
    encoder: BatchEncoder,
    tick_interval: Duration,
    max_ticks: Option<u64>,
    stats: DriverStats,
    metrics: Option<TelemetryMetrics>,
}

impl SimulationDriver<SeededNoise> {
    pub fn from_config(
        config: &AppConfig,
        seed: Option<u64>,
        sink: Arc<dyn MeasurementSink>,
    ) -> Result<Self> {
        let plc = build_plc(config, seed)?;
        let encoder = BatchEncoder::new(config.sink.measurement.clone(), config.sink.site.clone());
        Ok(Self::new(plc, sink, encoder, config.simulation.tick_interval)
            .with_max_ticks(config.simulation.max_ticks))
    }
}

impl<N: NoiseSource + Send> SimulationDriver<N> {
    pub fn new(
        plc: PlcLogic<N>,
        sink: Arc<dyn MeasurementSink>,
        encoder: BatchEncoder,
        tick_interval: Duration,
    ) -> Self {
        Self {
            plc,
            sink,
            encoder,
            tick_interval,
            max_ticks: None,
            stats: DriverStats::default(),
            metrics: None,
        }
    }

    /// Stop after this many ticks. `None` runs until shutdown.
    pub fn with_max_ticks(mut self, max_ticks: Option<u64>) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    pub fn with_metrics(mut self, metrics: TelemetryMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn plc(&self) -> &PlcLogic<N> {
        &self.plc
    }

    pub fn stats(&self) -> DriverStats {
        self.stats
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// One control cycle followed by one report. A failed report is logged
    /// and counted; it never fails the tick.
    pub async fn tick(&mut self) -> TickOutcome {
        self.stats.ticks += 1;
        let tick = self.stats.ticks;

        let cycle = self.plc.process();
        let reading = self.plc.reading();
        let batch = self.encoder.encode(&reading);

        if let Some(metrics) = &self.metrics {
            metrics.inc_tick();
            metrics.observe_plant(reading.water_level, reading.water_temperature);
            metrics.set_actuator(&reading.inlet_valve_id, reading.inlet_valve.as_flag() == 1);
            metrics.set_actuator(&reading.outlet_valve_id, reading.outlet_valve.as_flag() == 1);
            metrics.set_actuator(&reading.heater_id, reading.heater.as_flag() == 1);
        }

        let started = Instant::now();
        let result = self.sink.write(&batch).await;
        let elapsed = started.elapsed();

        let ctx = LogContext::for_component(self.encoder.site(), COMPONENT).at_tick(tick);
        let delivered = match result {
            Ok(()) => {
                self.stats.reports_sent += 1;
                if let Some(metrics) = &self.metrics {
                    metrics.record_report("sent", elapsed.as_secs_f64());
                }
                plc_debug!(
                    context = ctx,
                    "tick {}: level {:.2} temperature {:.2} reported to {} in {}us",
                    tick,
                    reading.water_level,
                    reading.water_temperature,
                    self.sink.name(),
                    duration_to_micros(elapsed)
                );
                true
            }
            Err(err) => {
                self.stats.reports_failed += 1;
                if let Some(metrics) = &self.metrics {
                    metrics.record_report(err.kind(), elapsed.as_secs_f64());
                }
                log_system_event(
                    &ctx,
                    "report_failed",
                    format_args!("{} sink write failed ({}): {}", self.sink.name(), err.kind(), err),
                    SystemEventOutcome::Degraded,
                );
                false
            }
        };

        TickOutcome {
            tick,
            cycle,
            reading,
            batch,
            delivered,
        }
    }

    /// Tick at the configured period until `shutdown` fires (or its sender is
    /// dropped) or `max_ticks` is reached. Returns the final counters.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> DriverStats {
        let mut limiter = RateLimiter::new(self.tick_interval);
        let reporter = LoopTimingReporter::new(self.tick_interval);
        let site = self.encoder.site().to_owned();
        let ctx = LogContext::for_component(&site, COMPONENT);

        log_system_event(
            &ctx,
            "driver_started",
            format_args!(
                "control loop running every {}ms, reporting to {}",
                self.tick_interval.as_millis(),
                self.sink.name()
            ),
            SystemEventOutcome::Success,
        );

        if self.max_ticks == Some(0) {
            debug!("max_ticks is zero; not ticking");
        } else {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        debug!("driver shutdown signal received");
                        break;
                    }
                    scheduled = limiter.tick() => {
                        reporter.record_tick();
                        let late = scheduled.elapsed();
                        if late > self.tick_interval {
                            debug!(late_us = duration_to_micros(late), "tick started late");
                        }
                        self.tick().await;
                        if let Some(limit) = self.max_ticks {
                            if self.stats.ticks >= limit {
                                plc_info!(context = ctx, "max_ticks {} reached", limit);
                                break;
                            }
                        }
                    }
                }
            }
        }

        if let Some(summary) = reporter.summary() {
            info!(
                samples = summary.samples,
                mean_us = summary.mean_us,
                std_dev_us = summary.std_dev_us,
                min_us = summary.min_us,
                max_us = summary.max_us,
                "control loop jitter summary"
            );
        }
        let stats = self.stats;
        log_system_event(
            &ctx,
            "driver_stopped",
            format_args!(
                "{} ticks, {} reports sent, {} failed",
                stats.ticks, stats.reports_sent, stats.reports_failed
            ),
            SystemEventOutcome::Success,
        );
        stats
    }
}
