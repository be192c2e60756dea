//! `anypoint_users`: a page of the users of a business group.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{timestamp_id, DataSource};
use crate::client::user::{User, UserQuery};
use crate::error::ProviderError;
use crate::provider::ProviderContext;
use crate::resources::put;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, Diagnostic, NestedBlock, Schema};

/// Largest page the users API serves.
pub const MAX_LIMIT: i64 = 500;

/// Accepted values of the `type` option.
pub const USER_TYPES: [&str; 3] = ["all", "host", "proxy"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsersConfig {
    pub org_id: String,
    #[serde(default)]
    pub params: Option<Vec<UsersParams>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UsersParams {
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default, rename = "type")]
    pub user_type: Option<String>,
}

impl UsersConfig {
    /// Query options from the first `params` element; unset options stay unset.
    pub fn query(&self) -> UserQuery {
        let Some(params) = self.params.as_ref().and_then(|p| p.first()) else {
            return UserQuery::default();
        };
        UserQuery {
            offset: params.offset,
            limit: params.limit,
            user_type: params.user_type.clone().filter(|t| !t.is_empty()),
        }
    }
}

/// Organisation documents become string maps; nested and null values are dropped.
fn flatten_org(org: &Map<String, Value>) -> Value {
    let flat: Map<String, Value> = org
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some((key.clone(), Value::String(text)))
        })
        .collect();
    Value::Object(flat)
}

fn flatten_orgs(orgs: &Option<Vec<Map<String, Value>>>) -> Option<Value> {
    orgs.as_ref()
        .map(|orgs| Value::Array(orgs.iter().map(flatten_org).collect()))
}

/// Flatten one user.
pub fn flatten_user(user: &User) -> Map<String, Value> {
    let mut item = Map::new();
    put(&mut item, "id", user.id.clone());
    put(&mut item, "first_name", user.first_name.clone());
    put(&mut item, "last_name", user.last_name.clone());
    put(&mut item, "email", user.email.clone());
    put(&mut item, "organization_id", user.organization_id.clone());
    put(&mut item, "enabled", user.enabled);
    put(&mut item, "idprovider_id", user.idprovider_id.clone());
    put(&mut item, "created_at", user.created_at.clone());
    put(&mut item, "updated_at", user.updated_at.clone());
    put(&mut item, "last_login", user.last_login.clone());
    put(&mut item, "mfa_verifiers_configured", user.mfa_verifiers_configured.clone());
    put(&mut item, "mfa_verification_excluded", user.mfa_verification_excluded);
    put(&mut item, "is_federated", user.is_federated);
    put(&mut item, "username", user.username.clone());
    put(&mut item, "type", user.user_type.clone());
    put(&mut item, "primary_organization", user.primary_organization.as_ref().map(flatten_org));
    put(&mut item, "member_of_organizations", flatten_orgs(&user.member_of_organizations));
    put(
        &mut item,
        "contributor_of_organizations",
        flatten_orgs(&user.contributor_of_organizations),
    );
    put(&mut item, "organization", user.organization.as_ref().map(flatten_org));
    item
}

/// Flatten a list of users, keeping the API order.
pub fn flatten_users(users: &[User]) -> Vec<Value> {
    users.iter().map(|u| Value::Object(flatten_user(u))).collect()
}

fn user_block() -> Block {
    let org_map = || Attribute::new(AttributeType::map(AttributeType::String), AttributeFlags::computed());
    let org_set = || {
        Attribute::new(
            AttributeType::set(AttributeType::map(AttributeType::String)),
            AttributeFlags::computed(),
        )
    };

    [
        "id",
        "first_name",
        "last_name",
        "email",
        "organization_id",
        "idprovider_id",
        "created_at",
        "updated_at",
        "last_login",
        "mfa_verifiers_configured",
        "username",
        "type",
    ]
    .into_iter()
    .fold(Block::new(), |block, name| {
        block.with_attribute(name, Attribute::computed_string())
    })
    .with_attribute("enabled", Attribute::computed_bool())
    .with_attribute("mfa_verification_excluded", Attribute::computed_bool())
    .with_attribute("is_federated", Attribute::computed_bool())
    .with_attribute("primary_organization", org_map())
    .with_attribute("member_of_organizations", org_set())
    .with_attribute("contributor_of_organizations", org_set())
    .with_attribute("organization", org_map())
}

pub struct UsersDataSource;

#[async_trait]
impl DataSource for UsersDataSource {
    type Config = UsersConfig;

    const TYPE_NAME: &'static str = "anypoint_users";

    fn schema(&self) -> Schema {
        let params = Block::new()
            .with_attribute(
                "offset",
                Attribute::optional_int64()
                    .with_description("The number of records to omit from the response. Defaults to 0."),
            )
            .with_attribute(
                "limit",
                Attribute::optional_int64()
                    .with_description("Maximum records to retrieve per request, between 0 and 500. Defaults to 200."),
            )
            .with_attribute(
                "type",
                Attribute::optional_string()
                    .with_description("The type of users to retrieve: all, host or proxy. Defaults to all."),
            );

        Schema::v0()
            .with_description("Reads the `users` available in the business group.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("org_id", Attribute::required_string())
            .with_block("params", NestedBlock::set(params).with_max_items(1))
            .with_block("users", NestedBlock::list(user_block()))
            .with_attribute(
                "len",
                Attribute::computed_int64().with_description("The number of loaded results"),
            )
            .with_attribute(
                "total",
                Attribute::computed_int64().with_description("The total number of available results"),
            )
    }

    fn validate(&self, config: &UsersConfig) -> Vec<Diagnostic> {
        let query = config.query();
        let mut diagnostics = Vec::new();

        if query.offset.is_some_and(|offset| offset < 0) {
            diagnostics.push(
                Diagnostic::error("offset must not be negative").with_attribute("params.offset"),
            );
        }
        if query.limit.is_some_and(|limit| !(0..=MAX_LIMIT).contains(&limit)) {
            diagnostics.push(
                Diagnostic::error(format!("limit must be between 0 and {}", MAX_LIMIT))
                    .with_attribute("params.limit"),
            );
        }
        if let Some(user_type) = &query.user_type {
            if !USER_TYPES.contains(&user_type.as_str()) {
                diagnostics.push(
                    Diagnostic::error(format!("Unknown user type '{}'", user_type))
                        .with_detail(format!("Expected one of: {}", USER_TYPES.join(", ")))
                        .with_attribute("params.type"),
                );
            }
        }

        diagnostics
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        config: &UsersConfig,
    ) -> Result<Map<String, Value>, ProviderError> {
        let list = ctx
            .clients
            .user
            .list(&ctx.regional_auth(), &config.org_id, &config.query())
            .await
            .map_err(|e| ProviderError::api("Unable to get users", &e))?;

        let users = flatten_users(&list.data.unwrap_or_default());
        let mut state = Map::new();
        state.insert("len".to_string(), Value::from(users.len()));
        state.insert("users".to_string(), Value::Array(users));
        state.insert("total".to_string(), Value::from(list.total.unwrap_or(0)));
        state.insert("id".to_string(), Value::String(timestamp_id()));
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(params: Value) -> UsersConfig {
        serde_json::from_value(json!({"org_id": "o1", "params": params})).unwrap()
    }

    #[test]
    fn test_query_from_first_params_element() {
        let query = config(json!([{"offset": 50, "limit": 100, "type": "host"}])).query();
        assert_eq!(query.to_params().len(), 3);

        let query = config(json!([{"limit": 10}])).query();
        assert_eq!(query.to_params(), vec![("limit", "10".to_string())]);
    }

    #[test]
    fn test_query_without_params() {
        assert!(config(Value::Null).query().to_params().is_empty());
        assert!(config(json!([])).query().to_params().is_empty());
    }

    #[test]
    fn test_validate_options() {
        let ds = UsersDataSource;
        assert!(ds.validate(&config(json!([{"offset": 0, "limit": 500, "type": "proxy"}]))).is_empty());
        assert_eq!(ds.validate(&config(json!([{"offset": -1}]))).len(), 1);
        assert_eq!(ds.validate(&config(json!([{"limit": 501}]))).len(), 1);
        assert_eq!(ds.validate(&config(json!([{"type": "robot"}]))).len(), 1);
    }

    #[test]
    fn test_flatten_user_org_maps() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "username": "ada",
            "enabled": true,
            "organization": {"id": "o1", "name": "Root", "isFederated": false, "parent": null, "entitlements": {"x": 1}},
            "memberOfOrganizations": [{"id": "o1", "name": "Root"}]
        }))
        .unwrap();

        let flat = flatten_user(&user);
        assert_eq!(flat["username"], "ada");
        assert_eq!(
            flat["organization"],
            json!({"id": "o1", "name": "Root", "isFederated": "false"})
        );
        assert_eq!(flat["member_of_organizations"], json!([{"id": "o1", "name": "Root"}]));
        assert!(flat.get("contributor_of_organizations").is_none());
    }

    #[test]
    fn test_flatten_users_empty() {
        assert!(flatten_users(&[]).is_empty());
    }
}
