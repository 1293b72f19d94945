//! Remote canonical baseline
//!
//! Design records are fetched by relative path from a fixed canonical
//! source. A 404 means "no baseline yet" and surfaces as `Ok(None)` - that
//! is the novelty signal, not a failure. Every other transport or decode
//! problem is a hard [`Error::RemoteFetchError`], fatal for that record
//! only. Requests always carry a timeout so no check can wait indefinitely.

use std::future::Future;
use std::time::Duration;

use crate::design::DesignRecord;
use crate::{Error, Result};

/// Canonical corpus the regression engine compares against by default.
pub const DEFAULT_BASE_URL: &str =
    "https://raw.githubusercontent.com/jeffrey-hokanson/ExperimentDesigns/master";

/// Default remote fetch timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch-by-relative-path access to the canonical baseline corpus.
pub trait BaselineSource: Send + Sync {
    /// Fetch the baseline record at `relative_path`.
    ///
    /// Returns `Ok(None)` when no baseline exists at the path.
    fn fetch(
        &self,
        relative_path: &str,
    ) -> impl Future<Output = Result<Option<DesignRecord>>> + Send;

    /// Fetch a baseline that is expected to exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BaselineNotFound`] when no record exists at the
    /// path, in addition to the transport errors of [`fetch`](Self::fetch).
    fn fetch_required(
        &self,
        relative_path: &str,
    ) -> impl Future<Output = Result<DesignRecord>> + Send {
        async move {
            self.fetch(relative_path).await?.ok_or_else(|| {
                Error::BaselineNotFound(relative_path.to_string())
            })
        }
    }
}

/// HTTP(S) baseline source over a fixed base URL.
pub struct HttpBaseline {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBaseline {
    /// Create a source for `base_url` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteFetchError`] when the HTTP client cannot be
    /// constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a source with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteFetchError`] when the HTTP client cannot be
    /// constructed.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("minimax-db/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::RemoteFetchError(format!("HTTP client construction: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Source pointed at the canonical upstream corpus.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteFetchError`] when the HTTP client cannot be
    /// constructed.
    pub fn canonical() -> Result<Self> {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl BaselineSource for HttpBaseline {
    async fn fetch(&self, relative_path: &str) -> Result<Option<DesignRecord>> {
        let url = format!(
            "{}/{}",
            self.base_url,
            relative_path.trim_start_matches('/')
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::RemoteFetchError(format!("GET {url}: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::RemoteFetchError(format!(
                "GET {url}: status {}",
                response.status()
            )));
        }

        let record = response
            .json::<DesignRecord>()
            .await
            .map_err(|e| Error::RemoteFetchError(format!("malformed baseline at {url}: {e}")))?;
        Ok(Some(record))
    }
}
