//! One HTTP GET per target, normalized into a status code and a latency.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error};

use crate::monitor::targets::Target;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(8);

/// Result of one probe. `http_status` is `None` when no response arrived
/// (timeout, refused connection, DNS failure or any other transport error).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    pub http_status: Option<u16>,
    pub response_time_ms: f64,
    pub completed_at: DateTime<Utc>,
}

/// Performs probes. Implementations never fail: every outcome is a `ProbeOutcome`.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &Target) -> ProbeOutcome;
}

/// Probes over a shared `reqwest` client with a total request timeout.
#[derive(Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("healthwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, target: &Target) -> ProbeOutcome {
        let start_time = Instant::now();

        // A response only counts once its body has fully arrived; a stalled or
        // truncated body is a transport failure like any other.
        let result = match self.client.get(&target.url).send().await {
            Ok(response) => {
                let status = response.status();
                response.bytes().await.map(|_| status)
            }
            Err(e) => Err(e),
        };
        let response_time_ms = round_ms(start_time.elapsed());

        let http_status = match result {
            Ok(status) => Some(status.as_u16()),
            Err(e) if e.is_timeout() => {
                debug!(service = %target.name, url = %target.url, "Probe timed out.");
                None
            }
            Err(e) if e.is_connect() => {
                debug!(service = %target.name, url = %target.url, error = %e, "Probe connection failed.");
                None
            }
            Err(e) if e.is_body() => {
                debug!(service = %target.name, url = %target.url, error = %e, "Probe response body incomplete.");
                None
            }
            Err(e) => {
                error!(service = %target.name, url = %target.url, error = %e, "Unexpected error checking service.");
                None
            }
        };

        ProbeOutcome {
            http_status,
            response_time_ms,
            completed_at: Utc::now(),
        }
    }
}

/// Milliseconds rounded to two decimals.
pub fn round_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100_000.0).round() / 100.0
}
