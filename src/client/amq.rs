//! Anypoint MQ admin API: queue destinations of one org/env/region.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{ApiError, HttpClient};
use crate::auth::AuthContext;

/// Coordinates of a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRef<'a> {
    pub org_id: &'a str,
    pub env_id: &'a str,
    pub region_id: &'a str,
    pub queue_id: &'a str,
}

/// A destination as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Queue {
    pub queue_id: Option<String>,
    pub default_ttl: Option<i64>,
    pub default_lock_ttl: Option<i64>,
    #[serde(rename = "type")]
    pub queue_type: Option<String>,
    pub encrypted: Option<bool>,
    pub fifo: Option<bool>,
    pub dead_letter_queue_id: Option<String>,
    pub max_deliveries: Option<i64>,
}

/// Payload of the idempotent queue PUT.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueBody {
    pub default_ttl: i64,
    pub default_lock_ttl: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fifo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_letter_queue_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_deliveries: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct AmqClient {
    http: HttpClient,
}

fn destinations(org_id: &str, env_id: &str, region_id: &str) -> String {
    format!(
        "/mq/admin/api/v1/organizations/{}/environments/{}/regions/{}/destinations",
        org_id, env_id, region_id
    )
}

fn queue_path(queue: &QueueRef<'_>) -> String {
    format!(
        "{}/queues/{}",
        destinations(queue.org_id, queue.env_id, queue.region_id),
        queue.queue_id
    )
}

impl AmqClient {
    pub(crate) fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// List every destination of a region.
    pub async fn list(
        &self,
        auth: &AuthContext,
        org_id: &str,
        env_id: &str,
        region_id: &str,
    ) -> Result<Vec<Queue>, ApiError> {
        let queues: Option<Vec<Queue>> = self
            .http
            .get(auth, &destinations(org_id, env_id, region_id), &[])
            .await?;
        Ok(queues.unwrap_or_default())
    }

    /// Create or replace a queue.
    pub async fn put(
        &self,
        auth: &AuthContext,
        queue: &QueueRef<'_>,
        body: &QueueBody,
    ) -> Result<Option<Queue>, ApiError> {
        self.http
            .send(Method::PUT, auth, &queue_path(queue), body)
            .await
    }

    pub async fn get(&self, auth: &AuthContext, queue: &QueueRef<'_>) -> Result<Queue, ApiError> {
        self.http.get(auth, &queue_path(queue), &[]).await
    }

    pub async fn delete(&self, auth: &AuthContext, queue: &QueueRef<'_>) -> Result<(), ApiError> {
        self.http.delete(auth, &queue_path(queue)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_queue_path() {
        let queue = QueueRef {
            org_id: "o",
            env_id: "e",
            region_id: "us-east-1",
            queue_id: "orders",
        };
        assert_eq!(
            queue_path(&queue),
            "/mq/admin/api/v1/organizations/o/environments/e/regions/us-east-1/destinations/queues/orders"
        );
    }

    #[test]
    fn test_queue_body_uses_api_field_names() {
        let body = QueueBody {
            default_ttl: 1000,
            default_lock_ttl: 200,
            dead_letter_queue_id: Some("dlq".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"defaultTtl": 1000, "defaultLockTtl": 200, "deadLetterQueueId": "dlq"})
        );
    }
}
