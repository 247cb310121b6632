//! Authorization resolution
//!
//! Implements the cache -> platform (with retry) -> cache write pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, warn};

use crate::cache::CacheStore;
use crate::config::AuthParams;
use crate::error::AuthError;
use crate::retry::RetryPolicy;
use crate::types::AuthResponse;

/// One authorization request to the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub koru_url: String,
    pub website_id: String,
    pub app_id: String,
    pub custom_data: Option<String>,
    /// Per-attempt timeout
    pub timeout: Option<Duration>,
}

impl AuthRequest {
    pub fn from_params(params: &AuthParams) -> Self {
        Self {
            koru_url: params.koru_url.clone(),
            website_id: params.website_id.clone(),
            app_id: params.app_id.clone(),
            custom_data: params.custom_data.clone(),
            timeout: params.options.request_timeout(),
        }
    }

    /// Endpoint URL without the query string
    pub fn endpoint(&self) -> String {
        format!("{}/api/auth/widget", self.koru_url.trim_end_matches('/'))
    }

    /// Full request URL. Values are percent-encoded (space is `%20`);
    /// `custom_data` is sent only when non-empty.
    pub fn url(&self) -> String {
        let mut url = format!(
            "{}?website_id={}&app_id={}",
            self.endpoint(),
            urlencoding::encode(&self.website_id),
            urlencoding::encode(&self.app_id)
        );
        if let Some(custom_data) = self.custom_data.as_deref().filter(|c| !c.is_empty()) {
            url.push_str("&custom_data=");
            url.push_str(&urlencoding::encode(custom_data));
        }
        url
    }
}

/// Remote authority answering authorization requests.
///
/// One call is one attempt; retrying is the resolver's job.
#[async_trait]
pub trait Authority: Send + Sync {
    async fn authorize(&self, request: &AuthRequest) -> Result<AuthResponse, AuthError>;
}

/// Authority reached over HTTP
#[derive(Debug, Clone, Default)]
pub struct HttpAuthority {
    http: Client,
}

impl HttpAuthority {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Authority for HttpAuthority {
    async fn authorize(&self, request: &AuthRequest) -> Result<AuthResponse, AuthError> {
        let mut req = self
            .http
            .get(request.url())
            .header(CONTENT_TYPE, "application/json");
        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AuthError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Metrics callback trait for recording resolutions
///
/// Implement this to integrate with your metrics system (Prometheus, etc.)
pub trait AuthMetrics: Send + Sync {
    /// Record a resolution outcome: "cache_hit", "network" or "error"
    fn record_resolution(&self, outcome: &str);
    /// Record a failed attempt that will be retried
    fn record_attempt_failure(&self, attempt: u32);
    /// Record end-to-end resolution latency
    fn record_latency(&self, seconds: f64);
}

/// No-op metrics implementation
pub struct NoopMetrics;

impl AuthMetrics for NoopMetrics {
    fn record_resolution(&self, _outcome: &str) {}
    fn record_attempt_failure(&self, _attempt: u32) {}
    fn record_latency(&self, _seconds: f64) {}
}

/// Resolves authorizations through the cache and the platform.
///
/// Cheap to clone; clones share the cache, authority and metrics.
#[derive(Clone)]
pub struct Resolver {
    cache: CacheStore,
    authority: Arc<dyn Authority>,
    metrics: Arc<dyn AuthMetrics>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Resolver talking HTTP with a default client
    pub fn new(cache: CacheStore) -> Self {
        Self::with_authority(cache, HttpAuthority::default())
    }

    pub fn with_authority(cache: CacheStore, authority: impl Authority + 'static) -> Self {
        Self {
            cache,
            authority: Arc::new(authority),
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn AuthMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Resolve the authorization for `params`.
    ///
    /// 1. Return a fresh cached response if caching is enabled
    /// 2. Otherwise call the platform, retrying with exponential backoff
    /// 3. Cache a successful response if caching is enabled
    ///
    /// A denial (`authorized: false`) is a successful resolution. Errors are
    /// returned only once every attempt has failed; no default response is
    /// ever synthesized.
    pub async fn resolve(&self, params: &AuthParams) -> Result<AuthResponse, AuthError> {
        let start = Instant::now();
        let opts = &params.options;
        let website_id = params.website_id.as_str();
        let app_id = params.app_id.as_str();

        if opts.cache {
            if let Some(cached) = self.cache.get(website_id, app_id, opts.cache_duration) {
                if opts.debug {
                    debug!(website_id, app_id, "Using cached authorization");
                }
                self.metrics.record_resolution("cache_hit");
                self.metrics.record_latency(start.elapsed().as_secs_f64());
                return Ok(cached);
            }
            if opts.debug {
                debug!(website_id, app_id, "No usable cached authorization");
            }
        }

        let request = AuthRequest::from_params(params);
        let policy = RetryPolicy::new(opts.retry_attempts, opts.retry_delay());
        let max_attempts = policy.max_attempts.max(1);

        let result = policy
            .run(
                || {
                    if opts.debug {
                        debug!(website_id, app_id, url = %request.endpoint(), "Authorizing with Koru");
                    }
                    self.authority.authorize(&request)
                },
                |attempt, err| {
                    self.metrics.record_attempt_failure(attempt);
                    if opts.debug {
                        debug!(
                            website_id,
                            app_id,
                            attempt,
                            max_attempts,
                            delay_ms = policy.delay_for(attempt).as_millis() as u64,
                            error = %err,
                            "Authorization attempt failed; retrying"
                        );
                    }
                },
            )
            .await;

        match result {
            Ok(data) => {
                if opts.debug {
                    debug!(website_id, app_id, authorized = data.authorized, "Authorization successful");
                }
                if opts.cache {
                    self.cache.put(website_id, app_id, &data);
                }
                self.metrics.record_resolution("network");
                self.metrics.record_latency(start.elapsed().as_secs_f64());
                Ok(data)
            }
            Err(e) => {
                warn!(website_id, app_id, max_attempts, error = %e, "Authorization failed after all retries");
                self.metrics.record_resolution("error");
                self.metrics.record_latency(start.elapsed().as_secs_f64());
                Err(e)
            }
        }
    }

    /// Drop the cached authorization for the pair. Does not re-resolve.
    pub fn invalidate(&self, website_id: &str, app_id: &str) {
        self.cache.purge(website_id, app_id);
    }
}
