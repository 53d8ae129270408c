//! REST client for the battery-swap pillar and slot endpoints.
//!
//! Requests are serialized camelCase and renamed to snake_case on the way
//! out; responses are renamed back before being parsed against the single
//! [`Envelope`] shape. Nothing is retried.

use std::sync::Arc;

use reqwest::{RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use swap_core::casing::{keys_to_camel, keys_to_snake};
use swap_core::wire::{
    AssignBatteryRequest, Envelope, MutationAck, PillarDetail, PillarGridPayload,
    RemoveBatteryRequest, StationPillars,
};
use swap_core::Pillar;

use crate::auth::TokenStore;
use crate::config::ClientConfig;
use crate::error::{ApiError, ErrorPayload};

/// HTTP client for one battery-swap backend.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url).map_err(|error| ApiError::Setup {
            message: format!("invalid base URL '{}': {}", config.base_url, error),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ApiError::Setup {
                message: format!("base URL '{}' is not an http(s) URL", config.base_url),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| ApiError::Setup {
                message: error.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    /// `GET /battery-swap/pillars/{pillarId}/grid?rows=&columns=`
    pub async fn get_pillar_grid(
        &self,
        pillar_id: &str,
        rows: u32,
        columns: u32,
    ) -> Result<PillarGridPayload, ApiError> {
        let url = self.endpoint(&["battery-swap", "pillars", pillar_id, "grid"]);
        let request = self
            .client
            .get(url)
            .query(&[("rows", rows), ("columns", columns)]);
        self.fetch(request).await
    }

    /// `GET /battery-swap/pillars/station/{stationId}`
    pub async fn get_station_pillars(&self, station_id: &str) -> Result<Vec<Pillar>, ApiError> {
        let url = self.endpoint(&["battery-swap", "pillars", "station", station_id]);
        let payload: StationPillars = self.fetch(self.client.get(url)).await?;
        Ok(payload.pillars)
    }

    /// `GET /battery-swap/pillars/{pillarId}`
    pub async fn get_pillar(&self, pillar_id: &str) -> Result<PillarDetail, ApiError> {
        let url = self.endpoint(&["battery-swap", "pillars", pillar_id]);
        self.fetch(self.client.get(url)).await
    }

    /// `POST /battery-swap/slots/assign-battery`
    pub async fn assign_battery(
        &self,
        battery_id: &str,
        slot_id: &str,
    ) -> Result<MutationAck, ApiError> {
        let url = self.endpoint(&["battery-swap", "slots", "assign-battery"]);
        let body = AssignBatteryRequest {
            battery_id: battery_id.to_string(),
            slot_id: slot_id.to_string(),
        };
        self.mutate(url, &body).await
    }

    /// `POST /battery-swap/slots/remove-battery`
    pub async fn remove_battery(&self, slot_id: &str) -> Result<MutationAck, ApiError> {
        let url = self.endpoint(&["battery-swap", "slots", "remove-battery"]);
        let body = RemoveBatteryRequest {
            slot_id: slot_id.to_string(),
        };
        self.mutate(url, &body).await
    }

    // ---- private helpers ----

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// GET-style call whose envelope must carry `data`.
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let envelope: Envelope<T> = parse_envelope(self.execute(request).await?)?;
        if !envelope.success {
            return Err(rejected(envelope));
        }
        envelope
            .data
            .ok_or_else(|| ApiError::malformed("response envelope carries no data"))
    }

    async fn mutate<B: Serialize>(&self, url: Url, body: &B) -> Result<MutationAck, ApiError> {
        let body = serde_json::to_value(body).map_err(|error| ApiError::Setup {
            message: error.to_string(),
        })?;
        let request = self.client.post(url).json(&keys_to_snake(body));

        let envelope: Envelope<Value> = parse_envelope(self.execute(request).await?)?;
        if !envelope.success {
            return Err(rejected(envelope));
        }
        Ok(MutationAck {
            message: envelope.message.unwrap_or_default(),
        })
    }

    /// Send the request and return its camelCased JSON body on 2xx.
    async fn execute(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let mut request = request.header("x-request-id", request_id.as_str());
        if let Some(token) = self.tokens.token() {
            request = request.bearer_auth(token);
        }
        let request = request.build().map_err(|error| ApiError::Setup {
            message: error.to_string(),
        })?;

        tracing::debug!(
            request_id = %request_id,
            method = %request.method(),
            url = %request.url(),
            "Sending request"
        );

        let response = self.client.execute(request).await.map_err(|error| {
            tracing::warn!(request_id = %request_id, error = %error, "Request failed");
            ApiError::network()
        })?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|error| {
            tracing::warn!(request_id = %request_id, error = %error, "Reading response failed");
            ApiError::network()
        })?;
        let body = serde_json::from_slice::<Value>(&bytes)
            .ok()
            .map(keys_to_camel);

        tracing::debug!(request_id = %request_id, status = status.as_u16(), "Received response");

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(request_id = %request_id, "Backend rejected the session");
            self.tokens.invalidate();
        }

        if !status.is_success() {
            let payload = body
                .and_then(|body| serde_json::from_value::<ErrorPayload>(body).ok())
                .unwrap_or_default();
            return Err(ApiError::from_status(status, payload));
        }

        body.ok_or_else(|| ApiError::malformed("response body is not JSON"))
    }
}

fn parse_envelope<T: DeserializeOwned>(body: Value) -> Result<Envelope<T>, ApiError> {
    serde_json::from_value(body).map_err(|error| {
        tracing::warn!(error = %error, "Response does not match the expected envelope");
        ApiError::malformed(error.to_string())
    })
}

fn rejected<T>(envelope: Envelope<T>) -> ApiError {
    ApiError::BadRequest {
        status: StatusCode::OK.as_u16(),
        message: envelope
            .message
            .unwrap_or_else(|| "The request was rejected".to_string()),
        errors: envelope.errors,
    }
}
