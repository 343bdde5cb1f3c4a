use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::{Result, SchoolMatchError};
use crate::models::{ChatReply, ChatRequest, LatLng, RankingResponse, ReportResponse};
use crate::transport::{Endpoint, Transport};

/// Typed client for the report, ranking and chat endpoints
#[derive(Clone)]
pub struct BackendClient {
    tx: Arc<dyn Transport>,
}

impl BackendClient {
    pub fn new(tx: Arc<dyn Transport>) -> Self {
        Self { tx }
    }

    pub async fn report(&self, payload: Map<String, Value>) -> Result<LatLng> {
        let value = self.tx.post(Endpoint::Report, &Value::Object(payload)).await?;
        let resp: ReportResponse = decode(Endpoint::Report, value)?;
        Ok(resp.location)
    }

    pub async fn get_ranking(&self, payload: Map<String, Value>) -> Result<RankingResponse> {
        let value = self
            .tx
            .post(Endpoint::Ranking, &Value::Object(payload))
            .await?;
        decode(Endpoint::Ranking, value)
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let body = serde_json::to_value(request)?;
        let value = self.tx.post(Endpoint::Chat, &body).await?;
        let reply: ChatReply = decode(Endpoint::Chat, value)?;
        Ok(reply.message)
    }
}

fn decode<T: serde::de::DeserializeOwned>(endpoint: Endpoint, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        SchoolMatchError::Internal(format!(
            "Unexpected {} response shape: {e}",
            endpoint.path()
        ))
    })
}
