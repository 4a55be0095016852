//! Routing adapter - Implements RoutingPort using integration_routing

use std::sync::Arc;

use application::{ProviderError, RouteRequest, RoutingPort};
use async_trait::async_trait;
use domain::{ProviderId, RouteMetrics};
use integration_routing::{
    DirectionsClient, FailureClass, HafasClient, NormalizedRoute, RouteQuery, RoutingClient,
    RoutingError,
};
use tracing::{debug, instrument};

use crate::config::{ProviderAppConfig, ProviderKind};

/// Counter of provider requests, labelled by `provider` and `outcome`
pub const PROVIDER_REQUESTS_METRIC: &str = "rendezvous_provider_requests_total";

/// Adapter exposing a routing client as a `RoutingPort`
pub struct RoutingAdapter {
    provider_id: ProviderId,
    client: Arc<dyn RoutingClient>,
}

impl std::fmt::Debug for RoutingAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingAdapter")
            .field("provider_id", &self.provider_id)
            .field("client", &self.client.provider_name())
            .finish()
    }
}

impl RoutingAdapter {
    /// Wrap an existing client
    pub fn new(provider_id: ProviderId, client: Arc<dyn RoutingClient>) -> Self {
        Self {
            provider_id,
            client,
        }
    }

    /// Build the client described by a provider configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the id is invalid or the client cannot be created.
    pub fn from_config(config: &ProviderAppConfig) -> Result<Self, RoutingError> {
        let provider_id = config
            .provider_id()
            .map_err(RoutingError::ConfigurationError)?;
        Ok(Self::new(provider_id, client_for(config)?))
    }

    /// Provider this adapter routes for
    pub const fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    fn record(&self, outcome: &'static str) {
        metrics::counter!(
            PROVIDER_REQUESTS_METRIC,
            "provider" => self.provider_id.to_string(),
            "outcome" => outcome
        )
        .increment(1);
    }
}

/// HTTP client for the provider's wire format
///
/// # Errors
///
/// Returns an error if the client configuration is invalid.
pub fn client_for(config: &ProviderAppConfig) -> Result<Arc<dyn RoutingClient>, RoutingError> {
    let client_config = config.to_client_config();
    Ok(match config.kind {
        ProviderKind::Directions => Arc::new(DirectionsClient::new(&client_config)?),
        ProviderKind::Hafas => Arc::new(HafasClient::new(&client_config)?),
    })
}

/// Map an integration error onto the provider failure taxonomy
pub(crate) fn map_routing_error(error: RoutingError) -> ProviderError {
    match error.class() {
        FailureClass::Transient => ProviderError::Network(error.to_string()),
        FailureClass::Throttled => ProviderError::RateLimited {
            retry_after_secs: error.retry_after_secs(),
        },
        FailureClass::Credential => ProviderError::Auth(error.to_string()),
        FailureClass::NoItinerary => ProviderError::NoRoute(error.to_string()),
        FailureClass::Malformed => ProviderError::Parse(error.to_string()),
    }
}

#[async_trait]
impl RoutingPort for RoutingAdapter {
    #[instrument(skip(self, request), fields(provider = %self.provider_id, mode = %request.mode))]
    async fn get_route(&self, request: &RouteRequest) -> Result<RouteMetrics, ProviderError> {
        let mut query = RouteQuery::new(request.origin, request.destination, request.mode);
        if let Some(departure) = request.departure {
            query = query.with_departure(departure);
        }

        let result = self
            .client
            .route(&query)
            .await
            .map_err(map_routing_error)
            .and_then(|response| {
                response
                    .primary()
                    .map(NormalizedRoute::metrics)
                    .ok_or_else(|| ProviderError::NoRoute("empty route list".to_string()))
            });

        match &result {
            Ok(metrics) => {
                debug!(
                    duration_secs = metrics.duration_seconds(),
                    transfers = metrics.transfer_count(),
                    "Route obtained"
                );
                self.record("ok");
            },
            Err(e) => self.record(e.kind()),
        }

        result
    }
}
