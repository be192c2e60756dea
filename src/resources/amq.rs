//! `anypoint_amq`: a message queue of one org/env/region.
//!
//! Queues are written with an idempotent PUT, so create and update share the
//! same call. The id is the composite `org_id/env_id/region_id/queue_id`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{found, put, split_import_id, Resource};
use crate::client::amq::{Queue, QueueBody, QueueRef};
use crate::error::ProviderError;
use crate::provider::ProviderContext;
use crate::schema::{Attribute, Schema};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueueAttrs {
    pub org_id: String,
    pub env_id: String,
    pub region_id: String,
    pub queue_id: String,
    pub default_ttl: i64,
    pub default_lock_ttl: i64,
    #[serde(default)]
    pub encrypted: Option<bool>,
    #[serde(default)]
    pub fifo: Option<bool>,
    #[serde(default)]
    pub dead_letter_queue_id: Option<String>,
    #[serde(default)]
    pub max_deliveries: Option<i64>,
}

impl QueueAttrs {
    fn queue_ref(&self) -> QueueRef<'_> {
        QueueRef {
            org_id: &self.org_id,
            env_id: &self.env_id,
            region_id: &self.region_id,
            queue_id: &self.queue_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueKey {
    pub org_id: String,
    pub env_id: String,
    pub region_id: String,
    pub queue_id: String,
}

impl QueueKey {
    fn queue_ref(&self) -> QueueRef<'_> {
        QueueRef {
            org_id: &self.org_id,
            env_id: &self.env_id,
            region_id: &self.region_id,
            queue_id: &self.queue_id,
        }
    }
}

/// Build the PUT payload.
pub fn build_body(attrs: &QueueAttrs) -> QueueBody {
    QueueBody {
        default_ttl: attrs.default_ttl,
        default_lock_ttl: attrs.default_lock_ttl,
        encrypted: attrs.encrypted,
        fifo: attrs.fifo,
        dead_letter_queue_id: attrs
            .dead_letter_queue_id
            .clone()
            .filter(|id| !id.is_empty()),
        max_deliveries: attrs.max_deliveries,
    }
}

/// Flatten an API queue into state attributes.
pub fn flatten(queue: &Queue) -> Map<String, Value> {
    let mut attrs = Map::new();
    put(&mut attrs, "queue_id", queue.queue_id.clone());
    put(&mut attrs, "default_ttl", queue.default_ttl);
    put(&mut attrs, "default_lock_ttl", queue.default_lock_ttl);
    put(&mut attrs, "type", queue.queue_type.clone());
    put(&mut attrs, "encrypted", queue.encrypted);
    put(&mut attrs, "fifo", queue.fifo);
    put(&mut attrs, "dead_letter_queue_id", queue.dead_letter_queue_id.clone());
    put(&mut attrs, "max_deliveries", queue.max_deliveries);
    attrs
}

pub struct QueueResource;

impl QueueResource {
    async fn put_queue(&self, ctx: &ProviderContext, attrs: &QueueAttrs) -> Result<(), ProviderError> {
        ctx.clients
            .amq
            .put(&ctx.token_auth(), &attrs.queue_ref(), &build_body(attrs))
            .await
            .map_err(|e| ProviderError::api("Unable to make queue", &e))?;
        Ok(())
    }
}

#[async_trait]
impl Resource for QueueResource {
    type Attrs = QueueAttrs;
    type Key = QueueKey;

    const TYPE_NAME: &'static str = "anypoint_amq";
    const WATCHED: &'static [&'static str] = &[
        "default_ttl",
        "default_lock_ttl",
        "encrypted",
        "dead_letter_queue_id",
        "max_deliveries",
    ];

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Creates an Anypoint MQ queue in a region of an environment.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "org_id",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("The business group id"),
            )
            .with_attribute(
                "env_id",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("The environment id"),
            )
            .with_attribute(
                "region_id",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("The region of the queue"),
            )
            .with_attribute(
                "queue_id",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("The name of the queue"),
            )
            .with_attribute(
                "default_ttl",
                Attribute::required_int64().with_description("Message time to live, in milliseconds"),
            )
            .with_attribute(
                "default_lock_ttl",
                Attribute::required_int64().with_description("Message lock time to live, in milliseconds"),
            )
            .with_attribute("encrypted", Attribute::optional_bool())
            .with_attribute(
                "fifo",
                Attribute::optional_bool()
                    .with_force_new()
                    .with_description("Whether the queue guarantees ordering"),
            )
            .with_attribute("dead_letter_queue_id", Attribute::optional_string())
            .with_attribute("max_deliveries", Attribute::optional_int64())
            .with_attribute("type", Attribute::computed_string())
    }

    fn import_state(&self, id: &str) -> Result<Map<String, Value>, ProviderError> {
        let [org_id, env_id, region_id, queue_id] =
            split_import_id::<4>(id, "<org_id>/<env_id>/<region_id>/<queue_id>")?;
        let mut state = Map::new();
        state.insert("id".to_string(), Value::String(id.to_string()));
        state.insert("org_id".to_string(), Value::String(org_id));
        state.insert("env_id".to_string(), Value::String(env_id));
        state.insert("region_id".to_string(), Value::String(region_id));
        state.insert("queue_id".to_string(), Value::String(queue_id));
        Ok(state)
    }

    async fn create(&self, ctx: &ProviderContext, attrs: &QueueAttrs) -> Result<String, ProviderError> {
        self.put_queue(ctx, attrs).await?;
        Ok(format!(
            "{}/{}/{}/{}",
            attrs.org_id, attrs.env_id, attrs.region_id, attrs.queue_id
        ))
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        key: &QueueKey,
    ) -> Result<Option<Map<String, Value>>, ProviderError> {
        let result = ctx.clients.amq.get(&ctx.token_auth(), &key.queue_ref()).await;
        Ok(found(result, || "Unable to get queue".to_string())?.map(|queue| flatten(&queue)))
    }

    async fn update(
        &self,
        ctx: &ProviderContext,
        _key: &QueueKey,
        attrs: &QueueAttrs,
    ) -> Result<(), ProviderError> {
        self.put_queue(ctx, attrs).await
    }

    async fn delete(&self, ctx: &ProviderContext, key: &QueueKey) -> Result<(), ProviderError> {
        ctx.clients
            .amq
            .delete(&ctx.token_auth(), &key.queue_ref())
            .await
            .map_err(|e| ProviderError::api("Unable to Delete queue", &e))
    }
}
