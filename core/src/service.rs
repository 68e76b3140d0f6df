//! Async runner pairing a `FeatureServiceClient` with a `Transport`.
//!
//! Each operation builds its request, executes it once, and normalizes the
//! result into a `Completion`. Nothing is retried and nothing is cached.

use tracing::debug;

use crate::client::FeatureServiceClient;
use crate::config::ClientConfig;
use crate::error::ServiceError;
use crate::http::HttpRequest;
use crate::params::Parameters;
use crate::response::{normalize, Completion};
use crate::transport::{Transport, UreqTransport};

/// A feature service reachable through `T`.
#[derive(Debug)]
pub struct FeatureService<T = UreqTransport> {
    client: FeatureServiceClient,
    transport: T,
}

impl FeatureService<UreqTransport> {
    /// `connect_with` over a default `UreqTransport`.
    pub async fn connect(config: &ClientConfig) -> Result<(Self, Completion), ServiceError> {
        Self::connect_with(config, UreqTransport::new()).await
    }
}

impl<T: Transport> FeatureService<T> {
    /// Validate `config` without any network activity.
    pub fn new(config: &ClientConfig, transport: T) -> Result<Self, ServiceError> {
        Ok(Self {
            client: FeatureServiceClient::new(config)?,
            transport,
        })
    }

    /// Validate `config`, then fetch the service description. A config error
    /// returns before any request is issued.
    pub async fn connect_with(
        config: &ClientConfig,
        transport: T,
    ) -> Result<(Self, Completion), ServiceError> {
        let service = Self::new(config, transport)?;
        let info = service.info().await;
        Ok((service, info))
    }

    pub fn client(&self) -> &FeatureServiceClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn last_query(&self) -> Option<Parameters> {
        self.client.last_query()
    }

    pub async fn info(&self) -> Completion {
        self.dispatch(self.client.build_info()).await
    }

    pub async fn query(&self, params: &Parameters) -> Completion {
        self.dispatch(self.client.build_query(params)).await
    }

    pub async fn count(&self, params: &Parameters) -> Completion {
        self.dispatch(self.client.build_count(params)).await
    }

    pub async fn ids(&self, params: &Parameters) -> Completion {
        self.dispatch(self.client.build_ids(params)).await
    }

    pub async fn add(&self, params: &Parameters) -> Completion {
        self.dispatch(self.client.build_add(params)).await
    }

    pub async fn update(&self, params: &Parameters) -> Completion {
        self.dispatch(self.client.build_update(params)).await
    }

    pub async fn remove(&self, params: &Parameters) -> Completion {
        self.dispatch(self.client.build_remove(params)).await
    }

    pub async fn edit(&self, params: &Parameters) -> Completion {
        self.dispatch(self.client.build_edit(params)).await
    }

    pub async fn query_related_records(&self, params: &Parameters) -> Completion {
        self.dispatch(self.client.build_query_related_records(params))
            .await
    }

    async fn dispatch(&self, request: HttpRequest) -> Completion {
        let url = request.url.clone();
        let exchange = self.transport.execute(request).await;
        let completion = normalize(&exchange);
        debug!(%url, ok = completion.is_ok(), "feature service call completed");
        completion
    }
}
