//! HTTP status provider
//!
//! Talks to the REST backend through its success/failure envelope. Any
//! non-success envelope, missing payload, or transport error becomes a
//! [`ProviderError`], which the fetch adapter renders as "no data".

use crate::providers::{ProviderError, StatusProvider};
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use rt_board_types::{Aggregate, DataPoint, EntityId, EntityStatus, TimeRange};
use serde::Deserialize;

/// Backend response envelope: `{ code, message, data }`, code 0 is success
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the payload, mapping non-success envelopes to errors
    pub fn into_result(self, id: &EntityId) -> Result<T, ProviderError> {
        if self.code != 0 {
            return Err(ProviderError::Rejected {
                code: self.code,
                message: self.message,
            });
        }
        self.data.ok_or_else(|| ProviderError::UnknownEntity(id.clone()))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        ProviderError::Transport(error.to_string())
    }
}

/// REST-backed status provider
pub struct HttpProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl StatusProvider for HttpProvider {
    async fn entity_status(&self, id: &EntityId) -> Result<EntityStatus, ProviderError> {
        let url = format!("{}/entity/status/{}", self.base_url, id);
        debug!("fetching entity status from {}", url);

        let envelope: ApiEnvelope<EntityStatus> = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await?;
        envelope.into_result(id)
    }

    async fn aggregate_history(
        &self,
        id: &EntityId,
        range: &TimeRange,
        aggregate: Aggregate,
    ) -> Result<Vec<DataPoint>, ProviderError> {
        let (start, end) = range.bounds(Utc::now());
        let url = format!("{}/entity/history/{}", self.base_url, id);
        debug!("fetching entity history from {}", url);

        let envelope: ApiEnvelope<Vec<DataPoint>> = self
            .client
            .get(&url)
            .query(&[
                ("start", start.to_rfc3339()),
                ("end", end.to_rfc3339()),
                ("aggregate", aggregate.as_str().to_string()),
            ])
            .send()
            .await?
            .json()
            .await?;
        envelope.into_result(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_unwraps_payload() {
        let envelope: ApiEnvelope<EntityStatus> = serde_json::from_value(json!({
            "code": 0,
            "message": "ok",
            "data": { "value": 21.5 }
        }))
        .unwrap();

        let status = envelope.into_result(&EntityId::from("e-1")).unwrap();
        assert_eq!(status.as_f64(), Some(21.5));
    }

    #[test]
    fn test_failure_envelope_is_rejected() {
        let envelope: ApiEnvelope<EntityStatus> = serde_json::from_value(json!({
            "code": 500,
            "message": "backend unavailable"
        }))
        .unwrap();

        match envelope.into_result(&EntityId::from("e-1")) {
            Err(ProviderError::Rejected { code, message }) => {
                assert_eq!(code, 500);
                assert_eq!(message, "backend unavailable");
            }
            other => panic!("expected rejection, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_success_without_payload_is_unknown_entity() {
        let envelope: ApiEnvelope<EntityStatus> =
            serde_json::from_value(json!({ "code": 0 })).unwrap();
        assert!(matches!(
            envelope.into_result(&EntityId::from("ghost")),
            Err(ProviderError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_base_url_trailing_slashes_are_trimmed() {
        let provider = HttpProvider::new("http://iot.example/api//");
        assert_eq!(provider.base_url(), "http://iot.example/api");
    }
}
