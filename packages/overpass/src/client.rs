//! HTTP client with a per-filter result cache.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use osm_geojson_geometry_models::CoordinateSet;
use tokio::sync::Mutex;

use crate::progress::ProgressCallback;
use crate::query::{OverpassQuery, TagFilter};
use crate::response::{OverpassResponse, extract};
use crate::{DEFAULT_ENDPOINT, FetchError};

/// Maximum length of the response body kept in [`FetchError::Status`].
const BODY_PREVIEW_LEN: usize = 500;

/// Fetches coordinates for tag filters from an Overpass interpreter.
///
/// Results are cached per rendered filter for the lifetime of the client,
/// so asking for the same tag twice issues one request.
pub struct OverpassClient {
    client: reqwest::Client,
    endpoint: String,
    area: Option<String>,
    cache: Mutex<BTreeMap<String, CoordinateSet>>,
}

impl OverpassClient {
    /// Creates a client for `endpoint` (or [`DEFAULT_ENDPOINT`]).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying HTTP client cannot be
    /// built.
    pub fn new(
        endpoint: Option<String>,
        area: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            area,
            cache: Mutex::new(BTreeMap::new()),
        })
    }

    /// The interpreter URL requests are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetches every node, way, and relation matching `filter`.
    ///
    /// # Errors
    ///
    /// * [`FetchError::Http`] if the request fails
    /// * [`FetchError::Status`] if the interpreter answers with a
    ///   non-success status
    /// * [`FetchError::Json`] if the body is not an Overpass JSON response
    pub async fn fetch(&self, filter: &TagFilter) -> Result<CoordinateSet, FetchError> {
        let key = filter.to_string();
        if let Some(cached) = self.cache.lock().await.get(&key) {
            log::debug!("Using cached coordinates for {key}");
            return Ok(cached.clone());
        }

        let query = OverpassQuery::new(filter.clone(), self.area.clone());
        log::info!("Receiving coordinates for {key}");
        log::debug!("Overpass query:\n{query}");

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("(no body)"));
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body.chars().take(BODY_PREVIEW_LEN).collect(),
            });
        }

        let body = response.text().await?;
        let parsed: OverpassResponse = serde_json::from_str(&body)?;
        let set = extract(parsed)?;
        log::info!("Received {} elements for {key}", set.len());

        self.cache.lock().await.insert(key, set.clone());
        Ok(set)
    }

    /// Fetches several filters one after another.
    ///
    /// Requests are sequential to stay polite to public instances. The
    /// first failure aborts the batch.
    ///
    /// # Errors
    ///
    /// Returns the first [`FetchError`] encountered.
    pub async fn fetch_batch(
        &self,
        filters: &[TagFilter],
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<Vec<(TagFilter, CoordinateSet)>, FetchError> {
        progress.set_total(filters.len() as u64);

        let mut results = Vec::with_capacity(filters.len());
        for filter in filters {
            progress.set_message(format!("Receiving coordinates for {filter}"));
            let set = self.fetch(filter).await?;
            results.push((filter.clone(), set));
            progress.inc(1);
        }

        let total: usize = results.iter().map(|(_, set)| set.len()).sum();
        progress.finish(format!("Fetched {total} elements for {} filters", filters.len()));
        Ok(results)
    }

    /// Number of cached filters.
    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }
}
