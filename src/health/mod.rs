// ABOUTME: Health gate that polls containers or HTTP endpoints until healthy or timed out.
// ABOUTME: Never errors; a false result means the caller must not cut traffic over.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::Empty;
use hyper::{Request, Uri};
use hyper_util::rt::TokioIo;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::HealthConfig;
use crate::runtime::{ContainerOps, HealthState};

/// Bounds for a single health wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheckOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl HealthCheckOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: Duration::from_secs(2),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl From<&HealthConfig> for HealthCheckOptions {
    fn from(config: &HealthConfig) -> Self {
        HealthCheckOptions::new(config.timeout).with_interval(config.interval)
    }
}

/// Result of a single HTTP probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The endpoint returned 2xx.
    Healthy,
    /// The endpoint answered with a non-2xx status.
    Unhealthy,
    /// The probe could not be executed (bad URL, connection error, timeout).
    Failed,
}

/// Poll a container until it is running and its healthcheck reports healthy.
///
/// A container without a healthcheck counts as healthy as soon as it runs.
/// Inspection errors count as "not yet healthy". Returns `false` on timeout
/// or cancellation.
pub async fn wait_for_healthy<R: ContainerOps + ?Sized>(
    runtime: &R,
    container: &str,
    options: HealthCheckOptions,
    cancel: &CancellationToken,
) -> bool {
    wait_for_service(runtime, container, None, options, cancel).await
}

/// Poll an HTTP endpoint until it answers 2xx.
pub async fn wait_for_http(url: &str, options: HealthCheckOptions, cancel: &CancellationToken) -> bool {
    debug!(url, timeout = ?options.timeout, "waiting for http health");
    // A single probe never outlives the poll interval by much.
    let probe_timeout = options.interval.max(Duration::from_secs(1));
    poll(options, cancel, || async move {
        http_probe(url, probe_timeout).await == ProbeResult::Healthy
    })
    .await
}

/// Poll until the container is running and healthy and, when `url` is given,
/// the endpoint answers 2xx. Both must hold in the same round.
pub async fn wait_for_service<R: ContainerOps + ?Sized>(
    runtime: &R,
    container: &str,
    url: Option<&str>,
    options: HealthCheckOptions,
    cancel: &CancellationToken,
) -> bool {
    debug!(container, url, timeout = ?options.timeout, "waiting for service health");
    let probe_timeout = options.interval.max(Duration::from_secs(1));
    poll(options, cancel, || async move {
        if !container_healthy(runtime, container).await {
            return false;
        }
        match url {
            Some(url) => http_probe(url, probe_timeout).await == ProbeResult::Healthy,
            None => true,
        }
    })
    .await
}

async fn container_healthy<R: ContainerOps + ?Sized>(runtime: &R, container: &str) -> bool {
    match runtime.inspect_running(container).await {
        Ok(true) => {}
        Ok(false) => {
            debug!(container, "container not running yet");
            return false;
        }
        Err(e) => {
            debug!(container, error = %e, "inspect failed");
            return false;
        }
    }

    match runtime.inspect_health(container).await {
        Ok(HealthState::Healthy | HealthState::None) => true,
        Ok(state) => {
            debug!(container, ?state, "container not healthy yet");
            false
        }
        Err(e) => {
            debug!(container, error = %e, "health inspect failed");
            false
        }
    }
}

/// Fixed-interval polling loop bounded by a deadline and a cancellation token.
async fn poll<F, Fut>(options: HealthCheckOptions, cancel: &CancellationToken, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = Instant::now() + options.timeout;

    loop {
        if cancel.is_cancelled() {
            return false;
        }
        if check().await {
            return true;
        }

        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        let wait = options.interval.min(deadline - now);

        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(wait) => {}
        }
    }
}

/// Perform a single `GET` against a plain-HTTP URL.
pub async fn http_probe(url: &str, timeout: Duration) -> ProbeResult {
    let uri: Uri = match url.parse() {
        Ok(uri) => uri,
        Err(e) => {
            debug!(error = %e, url, "invalid health url");
            return ProbeResult::Failed;
        }
    };
    if uri.scheme_str().is_some_and(|s| s != "http") {
        debug!(url, "only http:// health urls are supported");
        return ProbeResult::Failed;
    }
    let Some(host) = uri.host() else {
        debug!(url, "health url has no host");
        return ProbeResult::Failed;
    };
    let address = format!("{}:{}", host, uri.port_u16().unwrap_or(80));
    let path = uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let result = tokio::time::timeout(timeout, async {
        let stream = match tokio::net::TcpStream::connect(&address).await {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, url, "health probe connection failed");
                return ProbeResult::Failed;
            }
        };

        let io = TokioIo::new(stream);
        let (mut sender, conn) = match hyper::client::conn::http1::handshake(io).await {
            Ok(pair) => pair,
            Err(e) => {
                debug!(error = %e, url, "health probe handshake failed");
                return ProbeResult::Failed;
            }
        };

        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = match Request::builder()
            .method("GET")
            .uri(path.as_str())
            .header("host", address.as_str())
            .header("user-agent", concat!("cutover/", env!("CARGO_PKG_VERSION")))
            .body(Empty::<Bytes>::new())
        {
            Ok(req) => req,
            Err(e) => {
                debug!(error = %e, url, "failed to build health request");
                return ProbeResult::Failed;
            }
        };

        match sender.send_request(req).await {
            Ok(resp) if resp.status().is_success() => ProbeResult::Healthy,
            Ok(resp) => {
                debug!(status = %resp.status(), url, "health probe non-2xx");
                ProbeResult::Unhealthy
            }
            Err(e) => {
                debug!(error = %e, url, "health probe request failed");
                ProbeResult::Failed
            }
        }
    })
    .await;

    match result {
        Ok(probe) => probe,
        Err(_) => {
            debug!(url, "health probe timed out");
            ProbeResult::Failed
        }
    }
}
