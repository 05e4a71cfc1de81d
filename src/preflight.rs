//! Startup readiness check against an external HTTP endpoint
//!
//! On GCE the provider credentials come from the metadata server, so the
//! operator refuses to start reconciling until the token endpoint answers.
//! The probe runs once, before any controller starts, with bounded retries.

use std::time::Duration;

use tracing::info;

use crate::retry::{retry_with_backoff, RetryConfig};
use crate::Error;

/// GCE metadata endpoint serving the default service account token
pub const DEFAULT_METADATA_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Endpoint probe settings
#[derive(Clone, Debug)]
pub struct PreflightConfig {
    /// URL to GET
    pub url: String,
    /// Request headers
    pub headers: Vec<(String, String)>,
    /// Status code that counts as ready
    pub expected_status: u16,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retry schedule
    pub retry: RetryConfig,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_METADATA_URL.to_string(),
            headers: vec![("Metadata-Flavor".to_string(), "Google".to_string())],
            expected_status: 200,
            timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }
}

impl PreflightConfig {
    /// Probe `url` with the default headers and schedule
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Probe the endpoint until it answers with the expected status
pub async fn run(config: &PreflightConfig) -> Result<(), Error> {
    // The metadata server is link-local and never reachable through a proxy
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(config.timeout)
        .build()
        .map_err(|e| Error::preflight(format!("failed to build HTTP client: {e}")))?;

    retry_with_backoff(&config.retry, "preflight", || probe(&client, config)).await?;
    info!(url = %config.url, "preflight check passed");
    Ok(())
}

async fn probe(client: &reqwest::Client, config: &PreflightConfig) -> Result<(), Error> {
    let mut request = client.get(&config.url);
    for (name, value) in &config.headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let response = request
        .send()
        .await
        .map_err(|e| Error::preflight(format!("{}: {e}", config.url)))?;

    let status = response.status().as_u16();
    if status != config.expected_status {
        return Err(Error::preflight(format!(
            "{} answered {status}, expected {}",
            config.url, config.expected_status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve plain HTTP, answering 503 for the first `unready` requests and
    /// 200 afterwards. Requests without the metadata header get 403.
    async fn serve(unready: u32) -> (String, Arc<AtomicU32>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&buf).to_lowercase();
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let status = if !request.contains("metadata-flavor: google") {
                    "403 Forbidden"
                } else if n < unready {
                    "503 Service Unavailable"
                } else {
                    "200 OK"
                };
                let response =
                    format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}/token"), hits)
    }

    fn quick(url: String, attempts: u32) -> PreflightConfig {
        PreflightConfig {
            retry: RetryConfig {
                max_attempts: attempts,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                backoff_multiplier: 2.0,
            },
            ..PreflightConfig::new(url)
        }
    }

    #[test]
    fn default_targets_gce_metadata_with_flavor_header() {
        let config = PreflightConfig::default();
        assert_eq!(config.url, DEFAULT_METADATA_URL);
        assert_eq!(
            config.headers,
            vec![("Metadata-Flavor".to_string(), "Google".to_string())]
        );
        assert_eq!(config.expected_status, 200);
    }

    #[tokio::test]
    async fn ready_endpoint_passes_on_first_attempt() {
        let (url, hits) = serve(0).await;
        run(&quick(url, 3)).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    /// Story: the metadata server comes up a little after the pod starts;
    /// the probe keeps trying until it answers
    #[tokio::test]
    async fn story_probe_waits_for_endpoint_to_become_ready() {
        let (url, hits) = serve(2).await;
        run(&quick(url, 5)).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn probe_gives_up_after_bounded_attempts() {
        let (url, hits) = serve(u32::MAX).await;
        let err = run(&quick(url, 3)).await.unwrap_err();
        assert!(matches!(err, Error::Preflight(_)));
        assert!(err.to_string().contains("answered 503"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn missing_header_is_not_ready() {
        let (url, _) = serve(0).await;
        let config = PreflightConfig {
            headers: vec![],
            ..quick(url, 1)
        };
        let err = run(&config).await.unwrap_err();
        assert!(err.to_string().contains("answered 403"));
    }
}
