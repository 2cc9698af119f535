use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tripweave_itinerary::{
    GeneratedPlan, ItineraryGenerator, OptimizeRequest, OptimizedOrder, RouteOptimizer,
    TripMetadata, Waypoint, WaypointList,
};
use tripweave_shared::ServiceError;
use url::Url;

use super::{error_for_status, http_client, map_reqwest_error};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    waypoints: &'a [Waypoint],
    trip: &'a TripMetadata,
}

/// Client for the hosted LLM gateway that proposes stop orders and full day plans.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl GatewayClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ServiceError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            http: http_client(timeout)?,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ServiceError::InvalidRequest("gateway url cannot hold a path".to_owned()))?
            .pop_if_empty()
            .push(path);

        Ok(url)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let mut request = self.http.post(self.endpoint(path)?).json(body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let res = request.send().await.map_err(map_reqwest_error)?;
        if !res.status().is_success() {
            let err = error_for_status(res).await;
            tracing::warn!(path, error = %err, "gateway request failed");
            return Err(err);
        }

        let bytes = res.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&bytes).map_err(|e| ServiceError::Malformed(e.to_string()))
    }
}

#[async_trait::async_trait]
impl RouteOptimizer for GatewayClient {
    #[tracing::instrument(skip_all, fields(stops = request.intermediates.len()))]
    async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizedOrder, ServiceError> {
        self.post("optimize-route", request).await
    }
}

#[async_trait::async_trait]
impl ItineraryGenerator for GatewayClient {
    #[tracing::instrument(skip_all, fields(stops = waypoints.len()))]
    async fn generate(
        &self,
        waypoints: &WaypointList,
        trip: &TripMetadata,
    ) -> Result<GeneratedPlan, ServiceError> {
        let plan: GeneratedPlan = self
            .post(
                "generate-itinerary",
                &GenerateRequest {
                    waypoints: waypoints.as_slice(),
                    trip,
                },
            )
            .await?;

        if plan.days.is_empty() {
            return Err(ServiceError::Malformed("generated plan has no days".to_owned()));
        }

        Ok(plan)
    }
}
