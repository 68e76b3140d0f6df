//! Client core for ArcGIS-style feature service REST APIs.
//!
//! # Overview
//! Builds `HttpRequest` values for the feature service operations (`query`,
//! `count`, `ids`, `add`, `update`, `remove`, `edit`,
//! `queryRelatedRecords`) and normalizes whatever comes back into one
//! `(error, data)` `Completion` per call.
//!
//! # Design
//! - `FeatureServiceClient` never touches the network; its `build_*`
//!   methods return plain-data requests (host-does-IO pattern).
//! - `normalize` applies a fixed priority: unparseable body, then an `error`
//!   field in the body, then the transport error.
//! - `FeatureService` runs the builders through a `Transport`; the default
//!   `UreqTransport` executes on tokio's blocking pool.
//! - Caller-supplied `Parameters` are never mutated.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod params;
pub mod response;
pub mod service;
pub mod transport;

pub use client::FeatureServiceClient;
pub use config::ClientConfig;
pub use error::ServiceError;
pub use http::{Exchange, HttpMethod, HttpRequest, HttpResponse};
pub use params::Parameters;
pub use response::{normalize, normalize_parts, Completion, ResponseData};
pub use service::FeatureService;
pub use transport::{Transport, UreqTransport};
