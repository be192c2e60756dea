//! `anypoint_rolegroups`: every role-group of a business group.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{timestamp_id, DataSource};
use crate::client::rolegroup::Rolegroup;
use crate::error::ProviderError;
use crate::provider::ProviderContext;
use crate::resources::{put, rolegroup};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema};

#[derive(Debug, Clone, Deserialize)]
pub struct RolegroupsConfig {
    pub org_id: String,
}

/// Flatten a list of role-groups, keeping the API order.
pub fn flatten_rolegroups(rolegroups: &[Rolegroup]) -> Vec<Value> {
    rolegroups
        .iter()
        .map(|rg| {
            let mut item = rolegroup::flatten(rg);
            put(&mut item, "user_count", rg.user_count);
            Value::Object(item)
        })
        .collect()
}

pub struct RolegroupsDataSource;

#[async_trait]
impl DataSource for RolegroupsDataSource {
    type Config = RolegroupsConfig;

    const TYPE_NAME: &'static str = "anypoint_rolegroups";

    fn schema(&self) -> Schema {
        let item = Block::new()
            .with_attribute("role_group_id", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute(
                "external_names",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::computed(),
                ),
            )
            .with_attribute("description", Attribute::computed_string())
            .with_attribute("org_id", Attribute::computed_string())
            .with_attribute("editable", Attribute::computed_bool())
            .with_attribute("created_at", Attribute::computed_string())
            .with_attribute("updated_at", Attribute::computed_string())
            .with_attribute("user_count", Attribute::computed_int64());

        Schema::v0()
            .with_description("Reads all `rolegroups` available in your business group.")
            .with_deprecation("This data source is deprecated, please use `teams` instead.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("org_id", Attribute::required_string())
            .with_block("role_groups", NestedBlock::list(item))
            .with_attribute("total", Attribute::computed_int64())
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        config: &RolegroupsConfig,
    ) -> Result<Map<String, Value>, ProviderError> {
        let list = ctx
            .clients
            .rolegroup
            .list(&ctx.regional_auth(), &config.org_id)
            .await
            .map_err(|e| ProviderError::api("Unable to Get rolegroups", &e))?;

        let data = list.data.unwrap_or_default();
        let mut state = Map::new();
        state.insert("role_groups".to_string(), Value::Array(flatten_rolegroups(&data)));
        state.insert("total".to_string(), Value::from(list.total.unwrap_or(0)));
        state.insert("id".to_string(), Value::String(timestamp_id()));
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_includes_user_count() {
        let rolegroups: Vec<Rolegroup> = serde_json::from_value(json!([
            {"role_group_id": "rg-1", "name": "admins", "user_count": 3},
            {"role_group_id": "rg-2", "name": "ops"}
        ]))
        .unwrap();
        let flat = flatten_rolegroups(&rolegroups);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0]["user_count"], 3);
        assert_eq!(flat[1]["name"], "ops");
        assert!(flat[1].get("user_count").is_none());
    }
}
