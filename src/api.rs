//! Transport-agnostic request and response types.
//!
//! These mirror the JSON bodies a web front end exchanges with the index.
//! Any HTTP layer can deserialize a request, call
//! [`ProviderIndex::handle_search`] or [`ProviderIndex::handle_insert`], and
//! serialize whichever of the response or [`ErrorResponse`] comes back.
//!
//! ```rust,ignore
//! let request: SearchRequest = serde_json::from_slice(body)?;
//! match index.handle_search(request) {
//!     Ok(response) => (200, serde_json::to_vec(&response)?),
//!     Err(err) => {
//!         let status = if err.is_client_error() { 400 } else { 500 };
//!         (status, serde_json::to_vec(&ErrorResponse::from(&err))?)
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::db::ProviderIndex;
use crate::error::{ProviderIndexError, Result, ValidationError};
use crate::search::SearchResult;
use crate::types::ProviderRecord;

/// Value of [`InsertResponse::status`] on success.
pub const STATUS_SUCCESS: &str = "success";

/// Body of a search request.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SearchRequest {
    /// Free-text query. Required.
    #[serde(default)]
    pub query: Option<String>,

    /// Number of results. Defaults to `Config::default_top_n`.
    #[serde(default)]
    pub top_n: Option<i64>,
}

/// One entry of [`SearchResponse::results`].
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SearchResultPayload {
    /// Provider name.
    pub provider: String,
    /// Provider services.
    pub services: String,
    /// Cosine similarity to the query.
    pub similarity_score: f32,
}

impl From<SearchResult> for SearchResultPayload {
    fn from(result: SearchResult) -> Self {
        Self {
            provider: result.provider.name().to_string(),
            services: result.provider.services().to_string(),
            similarity_score: result.similarity,
        }
    }
}

/// Body of a successful search response.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SearchResponse {
    /// The query as received.
    pub query: String,
    /// Hits ordered by non-increasing `similarity_score`.
    pub results: Vec<SearchResultPayload>,
}

/// Wire form of a provider record.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProviderPayload {
    /// Provider name.
    pub provider: String,
    /// Provider services.
    pub services: String,
}

impl From<&ProviderRecord> for ProviderPayload {
    fn from(record: &ProviderRecord) -> Self {
        Self {
            provider: record.name().to_string(),
            services: record.services().to_string(),
        }
    }
}

/// Body of an insert request.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InsertRequest {
    /// Provider name. Required, non-blank.
    #[serde(default)]
    pub provider: String,
    /// Provider services. Required, non-blank.
    #[serde(default)]
    pub services: String,
}

/// Body of a successful insert response.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct InsertResponse {
    /// Always [`STATUS_SUCCESS`].
    pub status: String,
    /// The record as stored.
    pub new_provider: ProviderPayload,
}

/// Body returned for any failed request.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorResponse {
    /// Human-readable description of the failure.
    pub error: String,
}

impl From<&ProviderIndexError> for ErrorResponse {
    fn from(err: &ProviderIndexError) -> Self {
        let error = match err {
            // Client errors read better without the category prefix.
            ProviderIndexError::InvalidArgument(inner) => inner.to_string(),
            other => other.to_string(),
        };
        Self { error }
    }
}

impl ProviderIndex {
    /// Runs a [`SearchRequest`].
    ///
    /// # Errors
    ///
    /// `InvalidArgument` with "Missing query parameter" if `query` is
    /// absent; otherwise as [`ProviderIndex::search`].
    pub fn handle_search(&self, request: SearchRequest) -> Result<SearchResponse> {
        let query = request
            .query
            .ok_or_else(|| ValidationError::missing_parameter("query"))?;
        let top_n = match request.top_n {
            Some(n) => n,
            None => i64::try_from(self.config().default_top_n).unwrap_or(i64::MAX),
        };

        let results = self.search(&query, top_n)?;
        Ok(SearchResponse {
            query,
            results: results.into_iter().map(SearchResultPayload::from).collect(),
        })
    }

    /// Runs an [`InsertRequest`].
    ///
    /// # Errors
    ///
    /// As [`ProviderIndex::insert`].
    pub fn handle_insert(&self, request: InsertRequest) -> Result<InsertResponse> {
        let record = self.insert(&request.provider, &request.services)?;
        Ok(InsertResponse {
            status: STATUS_SUCCESS.to_string(),
            new_provider: ProviderPayload::from(&record),
        })
    }
}
