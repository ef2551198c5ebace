//! ---
//! plc_section: "03-persistence-logging"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Prometheus collectors and the /metrics exporter."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::core::Collector;
use prometheus::{
    exponential_buckets, Gauge, GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec,
    IntGaugeVec, Opts, Registry, TextEncoder,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub use prometheus;

pub type SharedRegistry = Arc<Registry>;

pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Register `collector` and hand back a clone for recording.
fn register<C>(registry: &Registry, collector: C) -> Result<C>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .context("metric registration failed")?;
    Ok(collector)
}

fn histogram(name: &str, help: &str, start: f64, count: usize) -> Result<Histogram> {
    let buckets = exponential_buckets(start, 2.0, count).context("invalid histogram buckets")?;
    Ok(Histogram::with_opts(HistogramOpts::new(name, help).buckets(buckets))?)
}

async fn render(State(registry): State<SharedRegistry>) -> Response {
    match TextEncoder::new().encode_to_string(&registry.gather()) {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding error").into_response()
        }
    }
}

/// Serve `registry` in the Prometheus text format at `GET /metrics`.
pub async fn spawn_http_server(registry: SharedRegistry, addr: SocketAddr) -> Result<MetricsServer> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind metrics listener {addr}"))?;
    let bound = listener.local_addr().context("metrics listener has no local address")?;
    let app = Router::new().route("/metrics", get(render)).with_state(registry);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .context("metrics server failed")
    });
    info!(address = %bound, "metrics exporter listening");

    Ok(MetricsServer {
        addr: bound,
        shutdown: shutdown_tx,
        task,
    })
}

#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Result<()>>,
}

impl MetricsServer {
    /// Address actually bound, which matters when port 0 was requested.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.task.await.context("metrics server task panicked")?
    }
}

/// Process-level metrics for `r-plcd`.
#[derive(Clone)]
pub struct DaemonMetrics {
    starts_total: IntCounter,
    config_load_seconds: Histogram,
    build_info: GaugeVec,
}

impl DaemonMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        Ok(Self {
            starts_total: register(
                &registry,
                IntCounter::new("r_plcd_starts_total", "Daemon starts")?,
            )?,
            config_load_seconds: register(
                &registry,
                histogram(
                    "r_plcd_config_load_seconds",
                    "Time to read and validate the configuration file",
                    0.001,
                    16,
                )?,
            )?,
            build_info: register(
                &registry,
                GaugeVec::new(
                    Opts::new("r_plcd_build_info", "Constant 1, labelled with build metadata"),
                    &["version", "profile"],
                )?,
            )?,
        })
    }

    pub fn inc_start(&self) {
        self.starts_total.inc();
    }

    pub fn observe_config_load(&self, seconds: f64) {
        self.config_load_seconds.observe(seconds);
    }

    pub fn set_build_info(&self, version: &str, profile: &str) {
        self.build_info.with_label_values(&[version, profile]).set(1.0);
    }
}

/// Control loop and reporting metrics, updated once per tick.
#[derive(Clone, Debug)]
pub struct TelemetryMetrics {
    ticks_total: IntCounter,
    reports_total: IntCounterVec,
    report_seconds: Histogram,
    water_level: Gauge,
    water_temperature: Gauge,
    actuator_state: IntGaugeVec,
}

impl TelemetryMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        Ok(Self {
            ticks_total: register(
                &registry,
                IntCounter::new("r_plc_ticks_total", "Control cycles executed")?,
            )?,
            reports_total: register(
                &registry,
                IntCounterVec::new(
                    Opts::new("r_plc_reports_total", "Telemetry batches by delivery outcome"),
                    &["outcome"],
                )?,
            )?,
            report_seconds: register(
                &registry,
                histogram(
                    "r_plc_report_seconds",
                    "Time spent delivering one telemetry batch",
                    0.0005,
                    14,
                )?,
            )?,
            water_level: register(
                &registry,
                Gauge::new("r_plc_water_level", "Last reported water level")?,
            )?,
            water_temperature: register(
                &registry,
                Gauge::new("r_plc_water_temperature", "Last reported water temperature")?,
            )?,
            actuator_state: register(
                &registry,
                IntGaugeVec::new(
                    Opts::new("r_plc_actuator_state", "1 when the actuator is open or on"),
                    &["actuator"],
                )?,
            )?,
        })
    }

    pub fn inc_tick(&self) {
        self.ticks_total.inc();
    }

    /// `outcome` is `"sent"` or a sink error kind.
    pub fn record_report(&self, outcome: &str, seconds: f64) {
        self.reports_total.with_label_values(&[outcome]).inc();
        self.report_seconds.observe(seconds);
    }

    pub fn observe_plant(&self, water_level: f64, water_temperature: f64) {
        self.water_level.set(water_level);
        self.water_temperature.set(water_temperature);
    }

    pub fn set_actuator(&self, actuator: &str, active: bool) {
        self.actuator_state
            .with_label_values(&[actuator])
            .set(i64::from(active));
    }

    pub fn reports(&self, outcome: &str) -> u64 {
        self.reports_total.with_label_values(&[outcome]).get()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks_total.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_registration_of_same_family_fails() {
        let registry = new_registry();
        TelemetryMetrics::new(registry.clone()).unwrap();
        let err = TelemetryMetrics::new(registry).unwrap_err();
        assert!(format!("{err:#}").contains("registration"));
    }

    #[test]
    fn reports_are_counted_per_outcome() {
        let metrics = TelemetryMetrics::new(new_registry()).unwrap();
        metrics.inc_tick();
        metrics.inc_tick();
        metrics.record_report("sent", 0.01);
        metrics.record_report("timeout", 5.0);
        metrics.record_report("sent", 0.02);
        assert_eq!(metrics.ticks(), 2);
        assert_eq!(metrics.reports("sent"), 2);
        assert_eq!(metrics.reports("timeout"), 1);
        assert_eq!(metrics.reports("rejected"), 0);
    }

    #[tokio::test]
    async fn exporter_serves_registered_families() {
        let registry = new_registry();
        let daemon = DaemonMetrics::new(registry.clone()).unwrap();
        daemon.inc_start();
        daemon.set_build_info("0.1.0", "debug");
        let telemetry = TelemetryMetrics::new(registry.clone()).unwrap();
        telemetry.observe_plant(42.5, 80.0);
        telemetry.set_actuator("heater_actuator_01", true);

        let server = spawn_http_server(registry, "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let response = reqwest::get(format!("http://{}/metrics", server.addr()))
            .await
            .unwrap();
        assert_eq!(
            response.headers()[reqwest::header::CONTENT_TYPE],
            prometheus::TEXT_FORMAT
        );
        let body = response.text().await.unwrap();

        assert!(body.contains("r_plcd_starts_total 1"));
        assert!(body.contains("r_plc_water_level 42.5"));
        assert!(body.contains("r_plc_actuator_state{actuator=\"heater_actuator_01\"} 1"));
        assert!(body.contains("profile=\"debug\""));

        server.shutdown().await.unwrap();
    }
}
