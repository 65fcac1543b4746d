//! HTTP access to the target service.
//!
//! One connection-reusing [`reqwest::Client`] is shared across all
//! workers; its pool is internally synchronized, so no locking happens at
//! this level.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::workload::{Request, Response};

/// Identifying user agent sent with every request.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Timeout for the one-shot index provisioning call.
const PROVISION_TIMEOUT: Duration = Duration::from_millis(1500);

/// Shared HTTP access to the target index.
#[derive(Debug)]
pub struct HttpRemote {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
}

impl HttpRemote {
    /// Creates a remote for the given base URL with a default client.
    pub fn new(base_url: &str) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Makes sure the target index exists before any load is generated.
    ///
    /// A transport-level failure here is fatal to the whole run. The HTTP
    /// status is deliberately not inspected: provisioning an index that
    /// already exists answers with an error status, and the run must
    /// still proceed.
    pub async fn ensure_index(&self) -> Result<()> {
        self.client
            .put(self.base_url.as_str())
            .timeout(PROVISION_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("failed to provision target index at {}", self.base_url))?;

        Ok(())
    }

    /// Executes one request and turns the outcome into a [`Response`].
    ///
    /// Transport failures become data, never errors: the worker loop
    /// keeps going regardless. The response body is consumed and dropped
    /// so the connection can go back into the pool.
    pub(crate) async fn execute(&self, request: Request) -> Response {
        let Request { kind, descriptor } = request;

        let started_at = Instant::now();
        let result = self.client.execute(descriptor).await;
        let elapsed = started_at.elapsed();

        let error = match result {
            Ok(response) => response.bytes().await.err().map(|err| err.to_string()),
            Err(err) => Some(err.to_string()),
        };

        Response {
            kind,
            started_at,
            elapsed,
            error,
        }
    }
}
