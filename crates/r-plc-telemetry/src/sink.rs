//! ---
//! plc_section: "05-networking-external-interfaces"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Measurement sink abstraction and local sinks."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;

use crate::line_protocol::LineBatch;

/// Errors surfaced by a [`MeasurementSink`]. All of them are recoverable from
/// the control loop's point of view.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Connection failure, timeout, or malformed response.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// The sink answered with a status code of 300 or above.
    #[error("sink rejected write with status {status}: {body}")]
    Rejected { status: u16, body: String },
    /// The configured endpoint could not be turned into a URL.
    #[error("invalid sink endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("local write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl SinkError {
    /// Short label for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SinkError::Transport(err) if err.is_timeout() => "timeout",
            SinkError::Transport(_) => "transport",
            SinkError::Rejected { .. } => "rejected",
            SinkError::InvalidEndpoint(_) => "endpoint",
            SinkError::Io(_) => "io",
        }
    }
}

/// Destination for per-tick line-protocol batches.
#[async_trait]
pub trait MeasurementSink: Send + Sync {
    /// Human-readable identifier used in logs.
    fn name(&self) -> &str;

    /// Deliver one batch. Implementations must not retry; the caller decides
    /// what a failure means.
    async fn write(&self, batch: &LineBatch) -> Result<(), SinkError>;
}

#[async_trait]
impl<S: MeasurementSink + ?Sized> MeasurementSink for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn write(&self, batch: &LineBatch) -> Result<(), SinkError> {
        (**self).write(batch).await
    }
}

/// Prints every batch to stdout; used for dry runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

#[async_trait]
impl MeasurementSink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn write(&self, batch: &LineBatch) -> Result<(), SinkError> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(batch.as_str().as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_stable() {
        let rejected = SinkError::Rejected {
            status: 401,
            body: "unauthorized".into(),
        };
        assert_eq!(rejected.kind(), "rejected");
        assert!(rejected.to_string().contains("401"));
        assert_eq!(SinkError::InvalidEndpoint("x".into()).kind(), "endpoint");
    }
}
