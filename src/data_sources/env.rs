//! `anypoint_env`: one environment of a business group.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::DataSource;
use crate::client::env::Environment;
use crate::error::ProviderError;
use crate::provider::ProviderContext;
use crate::resources::put;
use crate::schema::{Attribute, Schema};

#[derive(Debug, Clone, Deserialize)]
pub struct EnvConfig {
    pub id: String,
    pub org_id: String,
}

/// Flatten an API environment into state attributes.
pub fn flatten(env: &Environment) -> Map<String, Value> {
    let mut attrs = Map::new();
    put(&mut attrs, "name", env.name.clone());
    put(&mut attrs, "organization_id", env.organization_id.clone());
    put(&mut attrs, "is_production", env.is_production);
    put(&mut attrs, "type", env.env_type.clone());
    put(&mut attrs, "client_id", env.client_id.clone());
    attrs
}

pub struct EnvDataSource;

#[async_trait]
impl DataSource for EnvDataSource {
    type Config = EnvConfig;

    const TYPE_NAME: &'static str = "anypoint_env";

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Reads an `environment` of your business group.")
            .with_attribute(
                "id",
                Attribute::required_string().with_description("The environment id"),
            )
            .with_attribute(
                "org_id",
                Attribute::required_string().with_description("The business group id"),
            )
            .with_attribute("organization_id", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("is_production", Attribute::computed_bool())
            .with_attribute("type", Attribute::computed_string())
            .with_attribute("client_id", Attribute::computed_string())
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        config: &EnvConfig,
    ) -> Result<Map<String, Value>, ProviderError> {
        let env = ctx
            .clients
            .env
            .get(&ctx.token_auth(), &config.org_id, &config.id)
            .await
            .map_err(|e| ProviderError::api("Unable to Get ENV", &e))?;
        Ok(flatten(&env))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten() {
        let env: Environment = serde_json::from_value(json!({
            "id": "e1",
            "name": "Sandbox",
            "organizationId": "o1",
            "isProduction": false,
            "type": "sandbox",
            "clientId": "abc"
        }))
        .unwrap();
        let flat = flatten(&env);
        assert_eq!(flat["name"], "Sandbox");
        assert_eq!(flat["organization_id"], "o1");
        assert_eq!(flat["is_production"], false);
        assert_eq!(flat["type"], "sandbox");
        assert!(flat.get("id").is_none());
    }
}
