//! Request builder for the feature service REST API.
//!
//! # Design
//! `FeatureServiceClient` holds the base URL, token and format derived once
//! from a `ClientConfig`. Each operation is a `build_*` method that turns a
//! caller's `Parameters` into an `HttpRequest` without touching the network;
//! executing the request and normalizing the `Exchange` is left to the
//! caller (see `FeatureService` for the async runner).
//!
//! The only mutable state is `last_query`, the most recent mapping passed to
//! a query-style operation. It is diagnostic only and last-write-wins.

use std::sync::Mutex;

use tracing::debug;

use crate::config::{ClientConfig, DEFAULT_FORMAT};
use crate::error::ServiceError;
use crate::http::{HttpMethod, HttpRequest, FORM_CONTENT_TYPE};
use crate::params::Parameters;

pub const QUERY: &str = "query";
pub const ADD_FEATURES: &str = "addFeatures";
pub const UPDATE_FEATURES: &str = "updateFeatures";
pub const DELETE_FEATURES: &str = "deleteFeatures";
pub const APPLY_EDITS: &str = "applyEdits";
pub const QUERY_RELATED_RECORDS: &str = "queryRelatedRecords";

/// Client for one feature service or feature layer.
#[derive(Debug)]
pub struct FeatureServiceClient {
    base_url: String,
    token: Option<String>,
    format: String,
    last_query: Mutex<Option<Parameters>>,
}

impl FeatureServiceClient {
    /// Validate `config` and derive the base URL.
    pub fn new(config: &ClientConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        let base_url = config.build_url();
        debug!(%base_url, "feature service client configured");
        Ok(Self {
            base_url,
            token: config.token().map(str::to_string),
            format: config.format().to_string(),
            last_query: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// The mapping most recently passed to `query`, `count`, `ids` or
    /// `query_related_records`, as the caller supplied it.
    pub fn last_query(&self) -> Option<Parameters> {
        self.last_query
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// GET on the base URL itself, describing the service or layer. The only
    /// request that asks for the configured format.
    pub fn build_info(&self) -> HttpRequest {
        let params = Parameters::new().with("f", self.format.as_str());
        self.build_request(None, params, HttpMethod::Get)
    }

    /// Query features. A `method` entry selects GET (default) or POST and is
    /// not sent.
    pub fn build_query(&self, params: &Parameters) -> HttpRequest {
        self.build_query_style(QUERY, params)
    }

    /// Query for the number of matching features only.
    pub fn build_count(&self, params: &Parameters) -> HttpRequest {
        let params = params
            .clone()
            .with("returnCountOnly", true)
            .with("returnIdsOnly", false);
        self.build_query(&params)
    }

    /// Query for the object ids of matching features only.
    pub fn build_ids(&self, params: &Parameters) -> HttpRequest {
        let params = params
            .clone()
            .with("returnIdsOnly", true)
            .with("returnCountOnly", false);
        self.build_query(&params)
    }

    pub fn build_add(&self, params: &Parameters) -> HttpRequest {
        let mut params = params.clone();
        params.ensure_stringified(&["features"]);
        self.build_request(Some(ADD_FEATURES), params, HttpMethod::Post)
    }

    pub fn build_update(&self, params: &Parameters) -> HttpRequest {
        let mut params = params.clone();
        params.ensure_stringified(&["features"]);
        self.build_request(Some(UPDATE_FEATURES), params, HttpMethod::Post)
    }

    pub fn build_remove(&self, params: &Parameters) -> HttpRequest {
        self.build_request(Some(DELETE_FEATURES), params.clone(), HttpMethod::Post)
    }

    /// Apply adds, updates and deletes in one request.
    pub fn build_edit(&self, params: &Parameters) -> HttpRequest {
        let mut params = params.clone();
        params.ensure_stringified(&["adds", "updates"]);
        self.build_request(Some(APPLY_EDITS), params, HttpMethod::Post)
    }

    pub fn build_query_related_records(&self, params: &Parameters) -> HttpRequest {
        self.build_query_style(QUERY_RELATED_RECORDS, params)
    }

    fn build_query_style(&self, endpoint: &str, params: &Parameters) -> HttpRequest {
        self.record_query(params);
        let mut params = params.clone();
        let method = params.take_method();
        self.build_request(Some(endpoint), params, method)
    }

    fn record_query(&self, params: &Parameters) {
        *self
            .last_query
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(params.clone());
    }

    /// Fill defaults (`f=json`, `outFields=*`, the instance token) and encode
    /// `params` for `<base_url>[/<endpoint>]`.
    pub fn build_request(
        &self,
        endpoint: Option<&str>,
        mut params: Parameters,
        method: HttpMethod,
    ) -> HttpRequest {
        params.fill_defaults(DEFAULT_FORMAT, self.token.as_deref());

        let mut url = self.base_url.clone();
        if let Some(endpoint) = endpoint {
            url.push('/');
            url.push_str(endpoint);
        }

        let encoded = params.encode();
        let request = match method {
            HttpMethod::Get => HttpRequest {
                method,
                url: format!("{url}?{encoded}"),
                headers: Vec::new(),
                body: None,
            },
            HttpMethod::Post => HttpRequest {
                method,
                url,
                headers: vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())],
                body: Some(encoded),
            },
        };
        debug!(method = request.method.as_str(), url = %request.url, "built feature service request");
        request
    }
}
