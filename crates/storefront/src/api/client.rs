//! Request pipeline shared by every endpoint.
//!
//! Builds endpoint URLs, attaches session cookies, CSRF and request-ID
//! headers, maps HTTP statuses onto [`ApiError`], and owns the catalog cache.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Span, debug, instrument};
use url::Url;
use uuid::Uuid;

use crate::config::ApiConfig;

use super::cache::{CacheKey, CacheValue};
use super::{ApiError, error_message};

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Django's CSRF cookie and the header it must be echoed in.
const CSRF_COOKIE: &str = "csrftoken";
const CSRF_HEADER: &str = "x-csrftoken";

const USER_AGENT: &str = concat!("loopstore/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the shop REST API.
///
/// Cheap to clone; clones share the connection pool, cookie jar and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    cookies: Arc<Jar>,
    cache: Option<Cache<CacheKey, CacheValue>>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let cookies = Arc::new(Jar::default());

        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let cache = config.cache_ttl.map(|ttl| {
            Cache::builder()
                .max_capacity(1000)
                .time_to_live(ttl)
                .build()
        });

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                cookies,
                cache,
            }),
        })
    }

    /// The API base URL (always ends in `/`).
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve an endpoint path such as `products/12/` against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Resolve an endpoint with query parameters. Empty values are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined.
    pub fn endpoint_with_query(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Url, ApiError> {
        let mut url = self.endpoint(path)?;
        let present: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
        if !present.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in present {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Resolve an image reference from the API to an absolute URL.
    ///
    /// Absolute `http(s)` URLs (e.g. object storage) pass through; media
    /// paths like `/media/products/a.jpg` resolve against the API origin.
    #[must_use]
    pub fn media_url(&self, image: &str) -> Option<String> {
        let image = image.trim();
        if image.is_empty() {
            return None;
        }
        if image.starts_with("http://") || image.starts_with("https://") {
            return Some(image.to_string());
        }
        let path = format!("/{}", image.trim_start_matches('/'));
        self.inner.base_url.join(&path).ok().map(String::from)
    }

    // =========================================================================
    // Session Cookies
    // =========================================================================

    /// Current session cookies as a `Cookie` header value (`a=1; b=2`).
    #[must_use]
    pub fn session_cookies(&self) -> Option<String> {
        self.inner
            .cookies
            .cookies(&self.inner.base_url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
            .filter(|value| !value.is_empty())
    }

    /// Restore cookies captured earlier with [`session_cookies`](Self::session_cookies).
    pub fn restore_session_cookies(&self, header: &str) {
        for pair in cookie_pairs(header) {
            self.inner
                .cookies
                .add_cookie_str(&format!("{pair}; Path=/"), &self.inner.base_url);
        }
    }

    /// Expire every session cookie held for the API origin.
    pub fn clear_session_cookies(&self) {
        let Some(header) = self.session_cookies() else {
            return;
        };
        for pair in cookie_pairs(&header) {
            let name = pair.split('=').next().unwrap_or_default();
            self.inner
                .cookies
                .add_cookie_str(&format!("{name}=; Max-Age=0; Path=/"), &self.inner.base_url);
        }
    }

    fn csrf_token(&self) -> Option<String> {
        let header = self.session_cookies()?;
        cookie_pairs(&header)
            .filter_map(|pair| pair.split_once('='))
            .find(|(name, _)| *name == CSRF_COOKIE)
            .map(|(_, value)| value.to_string())
    }

    // =========================================================================
    // Catalog Cache
    // =========================================================================

    pub(super) async fn cached(&self, key: &CacheKey) -> Option<CacheValue> {
        let cache = self.inner.cache.as_ref()?;
        let value = cache.get(key).await;
        if value.is_some() {
            debug!(?key, "Cache hit");
        }
        value
    }

    pub(super) async fn cache_insert(&self, key: CacheKey, value: CacheValue) {
        if let Some(cache) = &self.inner.cache {
            cache.insert(key, value).await;
        }
    }

    /// Drop every cached catalog response (e.g. after an order changed stock).
    pub fn invalidate_catalog(&self) {
        if let Some(cache) = &self.inner.cache {
            cache.invalidate_all();
        }
    }

    // =========================================================================
    // Request Pipeline
    // =========================================================================

    /// GET a JSON document.
    pub(super) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let body = self.execute(Method::GET, url, None).await?;
        decode(&body)
    }

    /// Send a JSON body and decode the JSON answer.
    pub(super) async fn send_json<B, T>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_value(body)?;
        let text = self.execute(method, url, Some(payload)).await?;
        decode(&text)
    }

    /// Send a request whose answer body is irrelevant.
    pub(super) async fn send_ignoring_body<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let payload = body.map(serde_json::to_value).transpose()?;
        self.execute(method, url, payload).await.map(|_| ())
    }

    /// Execute one request and return the body of a successful answer.
    #[instrument(
        name = "api_request",
        skip(self, body),
        fields(method = %method, path = %url.path(), request_id = tracing::field::Empty, status)
    )]
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<String, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", request_id.as_str());

        let unsafe_method = !matches!(method, Method::GET | Method::HEAD | Method::OPTIONS);
        let path = url.path().to_string();

        let mut builder = self.inner.client.request(method, url);
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            builder = builder.header(REQUEST_ID_HEADER, value);
        }
        if unsafe_method && let Some(token) = self.csrf_token() {
            builder = builder.header(CSRF_HEADER, token);
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        Span::current().record("status", status.as_u16());

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        let text = response.text().await?;

        if status.is_success() {
            debug!("API request succeeded");
            return Ok(text);
        }

        let message = error_message(&text);
        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden(message)),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(path)),
            _ => {
                if status.is_server_error() {
                    tracing::error!(status = %status, body = %message, "API returned server error");
                } else {
                    tracing::warn!(status = %status, body = %message, "API rejected request");
                }
                Err(ApiError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

/// Decode a JSON body, logging the payload prefix on failure.
fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse API response"
        );
        ApiError::Parse(e)
    })
}

/// Split a `Cookie` header into `name=value` pairs.
fn cookie_pairs(header: &str) -> impl Iterator<Item = &str> {
    header
        .split(';')
        .map(str::trim)
        .filter(|pair| pair.contains('='))
}
