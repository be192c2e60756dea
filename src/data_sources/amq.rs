//! `anypoint_amq`: the queues of one org/env/region.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{timestamp_id, DataSource};
use crate::client::amq::Queue;
use crate::error::ProviderError;
use crate::provider::ProviderContext;
use crate::resources::put;
use crate::schema::{Attribute, Block, NestedBlock, Schema};

#[derive(Debug, Clone, Deserialize)]
pub struct QueuesConfig {
    pub org_id: String,
    pub env_id: String,
    pub region_id: String,
}

/// Flatten a list of queues, keeping the API order.
pub fn flatten_queues(queues: &[Queue]) -> Vec<Value> {
    queues
        .iter()
        .map(|queue| {
            let mut item = Map::new();
            put(&mut item, "queue_id", queue.queue_id.clone());
            put(&mut item, "default_ttl", queue.default_ttl);
            put(&mut item, "default_lock_ttl", queue.default_lock_ttl);
            put(&mut item, "type", queue.queue_type.clone());
            put(&mut item, "encrypted", queue.encrypted);
            put(&mut item, "fifo", queue.fifo);
            Value::Object(item)
        })
        .collect()
}

pub struct QueuesDataSource;

#[async_trait]
impl DataSource for QueuesDataSource {
    type Config = QueuesConfig;

    const TYPE_NAME: &'static str = "anypoint_amq";

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Reads the Anypoint MQ queues of a region of an environment.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("org_id", Attribute::required_string())
            .with_attribute("env_id", Attribute::required_string())
            .with_attribute("region_id", Attribute::required_string())
            .with_block(
                "queues",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("queue_id", Attribute::computed_string())
                        .with_attribute("default_ttl", Attribute::computed_int64())
                        .with_attribute("default_lock_ttl", Attribute::computed_int64())
                        .with_attribute("type", Attribute::computed_string())
                        .with_attribute("encrypted", Attribute::computed_bool())
                        .with_attribute("fifo", Attribute::computed_bool()),
                ),
            )
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        config: &QueuesConfig,
    ) -> Result<Map<String, Value>, ProviderError> {
        let queues = ctx
            .clients
            .amq
            .list(&ctx.token_auth(), &config.org_id, &config.env_id, &config.region_id)
            .await
            .map_err(|e| ProviderError::api("Unable to get queues", &e))?;

        let mut state = Map::new();
        state.insert("queues".to_string(), Value::Array(flatten_queues(&queues)));
        state.insert("id".to_string(), Value::String(timestamp_id()));
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_keeps_order() {
        let queues: Vec<Queue> = serde_json::from_value(json!([
            {"queueId": "b", "defaultTtl": 1},
            {"queueId": "a", "fifo": true}
        ]))
        .unwrap();
        let flat = flatten_queues(&queues);
        assert_eq!(flat[0], json!({"queue_id": "b", "default_ttl": 1}));
        assert_eq!(flat[1], json!({"queue_id": "a", "fifo": true}));
    }

    #[test]
    fn test_flatten_empty() {
        assert!(flatten_queues(&[]).is_empty());
    }
}
