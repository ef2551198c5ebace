//! ---
//! plc_section: "05-networking-external-interfaces"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "InfluxDB v2 HTTP write client."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
use std::time::Duration;

use async_trait::async_trait;
use r_plc_common::config::SinkConfig;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{redirect, Client};
use tracing::debug;
use url::Url;

use crate::line_protocol::LineBatch;
use crate::sink::{MeasurementSink, SinkError};

const WRITE_PATH: &str = "/api/v2/write";
const MAX_ERROR_BODY: usize = 512;

/// Posts line-protocol batches to an InfluxDB v2 `/api/v2/write` endpoint.
#[derive(Debug, Clone)]
pub struct InfluxWriter {
    client: Client,
    endpoint: Url,
    authorization: String,
}

impl InfluxWriter {
    /// Build a writer from the sink section of the configuration. The request
    /// timeout bounds both connect and the full exchange.
    pub fn from_config(config: &SinkConfig) -> Result<Self, SinkError> {
        let endpoint = write_endpoint(config)?;
        Self::new(endpoint, &config.token, config.timeout)
    }

    pub fn new(endpoint: Url, token: &str, timeout: Duration) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            endpoint,
            authorization: format!("Token {}", token),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// `{scheme}://{host}:{port}/api/v2/write?org=..&bucket=..`
pub fn write_endpoint(config: &SinkConfig) -> Result<Url, SinkError> {
    let base = format!(
        "{}://{}:{}{}",
        config.scheme, config.host, config.port, WRITE_PATH
    );
    let mut url = Url::parse(&base).map_err(|err| SinkError::InvalidEndpoint(format!("{base}: {err}")))?;
    url.query_pairs_mut()
        .append_pair("org", &config.org)
        .append_pair("bucket", &config.bucket);
    Ok(url)
}

#[async_trait]
impl MeasurementSink for InfluxWriter {
    fn name(&self) -> &str {
        "influxdb"
    }

    async fn write(&self, batch: &LineBatch) -> Result<(), SinkError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "text/plain")
            .header(AUTHORIZATION, &self.authorization)
            .body(batch.as_str().to_owned())
            .send()
            .await?;
        let status = response.status();
        // Drain the body either way so the connection can be reused.
        let mut body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                debug!(status = status.as_u16(), error = %err, "failed to read influxdb response body");
                String::new()
            }
        };
        if status.as_u16() >= 300 {
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(status = status.as_u16(), records = batch.len(), "batch written to influxdb");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::extract::{RawQuery, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use parking_lot::Mutex;
    use r_plc_plant::{ControlParameters, FixedNoise, Plant, PlcLogic};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::line_protocol::BatchEncoder;

    #[derive(Debug, Clone)]
    struct Captured {
        query: Option<String>,
        content_type: Option<String>,
        authorization: Option<String>,
        body: String,
    }

    #[derive(Clone)]
    struct FakeInflux {
        status: StatusCode,
        captured: Arc<Mutex<Vec<Captured>>>,
    }

    async fn write_handler(
        State(state): State<FakeInflux>,
        RawQuery(query): RawQuery,
        headers: HeaderMap,
        body: String,
    ) -> (StatusCode, &'static str) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        };
        state.captured.lock().push(Captured {
            query,
            content_type: header("content-type"),
            authorization: header("authorization"),
            body,
        });
        (state.status, "bucket not found")
    }

    async fn spawn_fake(status: StatusCode) -> (SocketAddr, Arc<Mutex<Vec<Captured>>>) {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let state = FakeInflux {
            status,
            captured: captured.clone(),
        };
        let app = Router::new()
            .route(WRITE_PATH, post(write_handler))
            .with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (addr, captured)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(split) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..split]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        request.len() >= split + 4 + length
    }

    /// Answers one request with `status_line`, promising 64 body bytes but
    /// closing the connection after seven.
    async fn spawn_truncating(status_line: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&request) {
                let read = socket.read(&mut buf).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..read]);
            }
            let response = format!("{status_line}\r\nContent-Length: 64\r\n\r\npartial");
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        addr
    }

    fn config_for(addr: SocketAddr) -> SinkConfig {
        SinkConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            token: "s3cret".into(),
            timeout: Duration::from_secs(2),
            ..SinkConfig::default()
        }
    }

    fn sample_batch() -> LineBatch {
        let mut plc = PlcLogic::new(
            Plant::builder().initial_level(50.0).build(),
            ControlParameters::default(),
            FixedNoise::midpoint(),
        );
        BatchEncoder::new("boiler", "site1").encode(&plc.reading())
    }

    #[test]
    fn builds_write_endpoint_with_query() {
        let url = write_endpoint(&SinkConfig::default()).unwrap();
        assert_eq!(
            url.as_str(),
            "http://influxdb:8086/api/v2/write?org=infm&bucket=timeseries"
        );
    }

    #[test]
    fn query_values_are_encoded() {
        let config = SinkConfig {
            org: "my org".into(),
            bucket: "a&b".into(),
            ..SinkConfig::default()
        };
        let url = write_endpoint(&config).unwrap();
        assert_eq!(url.query(), Some("org=my+org&bucket=a%26b"));
    }

    #[test]
    fn rejects_unparseable_host() {
        let config = SinkConfig {
            host: "bad host".into(),
            ..SinkConfig::default()
        };
        assert!(matches!(
            write_endpoint(&config),
            Err(SinkError::InvalidEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn posts_batch_with_token_and_plain_text() {
        let (addr, captured) = spawn_fake(StatusCode::NO_CONTENT).await;
        let writer = InfluxWriter::from_config(&config_for(addr)).unwrap();
        let batch = sample_batch();

        writer.write(&batch).await.unwrap();

        let requests = captured.lock().clone();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.query.as_deref(), Some("org=infm&bucket=timeseries"));
        assert_eq!(request.content_type.as_deref(), Some("text/plain"));
        assert_eq!(request.authorization.as_deref(), Some("Token s3cret"));
        assert_eq!(request.body, batch.as_str());
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let (addr, _) = spawn_fake(StatusCode::NOT_FOUND).await;
        let writer = InfluxWriter::from_config(&config_for(addr)).unwrap();
        match writer.write(&sample_batch()).await {
            Err(SinkError::Rejected { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "bucket not found");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn redirects_count_as_failures() {
        let (addr, _) = spawn_fake(StatusCode::TEMPORARY_REDIRECT).await;
        let writer = InfluxWriter::from_config(&config_for(addr)).unwrap();
        let err = writer.write(&sample_batch()).await.unwrap_err();
        assert_eq!(err.kind(), "rejected");
    }

    #[tokio::test]
    async fn unreadable_body_on_success_still_delivers() {
        let addr = spawn_truncating("HTTP/1.1 200 OK").await;
        let writer = InfluxWriter::from_config(&config_for(addr)).unwrap();
        writer.write(&sample_batch()).await.unwrap();
    }

    #[tokio::test]
    async fn unreadable_body_on_error_is_rejected_with_empty_body() {
        let addr = spawn_truncating("HTTP/1.1 500 Internal Server Error").await;
        let writer = InfluxWriter::from_config(&config_for(addr)).unwrap();
        match writer.write(&sample_batch()).await {
            Err(SinkError::Rejected { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.is_empty());
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_sink_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let writer = InfluxWriter::from_config(&config_for(addr)).unwrap();
        let err = writer.write(&sample_batch()).await.unwrap_err();
        assert!(matches!(err, SinkError::Transport(_)));
    }
}
