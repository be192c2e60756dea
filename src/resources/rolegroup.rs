//! `anypoint_rolegroup`: a role-group of a business group.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{found, put, split_import_id, Resource};
use crate::client::rolegroup::{Rolegroup, RolegroupBody};
use crate::error::ProviderError;
use crate::provider::ProviderContext;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};

/// Configurable attributes of a role-group.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RolegroupAttrs {
    pub org_id: String,
    pub name: String,
    #[serde(default)]
    pub external_names: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RolegroupKey {
    pub id: String,
    pub org_id: String,
}

/// Build the create/update payload. Null entries of `external_names` are skipped.
pub fn build_body(attrs: &RolegroupAttrs) -> RolegroupBody {
    RolegroupBody {
        name: attrs.name.clone(),
        external_names: attrs
            .external_names
            .as_ref()
            .map(|names| names.iter().flatten().cloned().collect()),
        description: attrs.description.clone(),
    }
}

/// Flatten an API role-group into state attributes.
pub fn flatten(rolegroup: &Rolegroup) -> Map<String, Value> {
    let mut attrs = Map::new();
    put(&mut attrs, "role_group_id", rolegroup.role_group_id.clone());
    put(&mut attrs, "name", rolegroup.name.clone());
    put(&mut attrs, "external_names", rolegroup.external_names.clone());
    put(&mut attrs, "description", rolegroup.description.clone());
    put(&mut attrs, "org_id", rolegroup.org_id.clone());
    put(&mut attrs, "editable", rolegroup.editable);
    put(&mut attrs, "created_at", rolegroup.created_at.clone());
    put(&mut attrs, "updated_at", rolegroup.updated_at.clone());
    attrs
}

pub struct RolegroupResource;

#[async_trait]
impl Resource for RolegroupResource {
    type Attrs = RolegroupAttrs;
    type Key = RolegroupKey;

    const TYPE_NAME: &'static str = "anypoint_rolegroup";
    const WATCHED: &'static [&'static str] = &["name", "external_names", "description"];

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Creates a `rolegroup` component for your `org`.")
            .with_deprecation("This resource is deprecated, please use `teams`, `team_members` and `team_roles` instead.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("role_group_id", Attribute::computed_string())
            .with_attribute(
                "org_id",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("The business group id"),
            )
            .with_attribute("name", Attribute::required_string())
            .with_attribute(
                "external_names",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::optional(),
                ),
            )
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("editable", Attribute::computed_bool())
            .with_attribute("created_at", Attribute::computed_string())
            .with_attribute("updated_at", Attribute::computed_string())
            .with_attribute("last_updated", Attribute::computed_string())
    }

    fn import_state(&self, id: &str) -> Result<Map<String, Value>, ProviderError> {
        let [org_id, rolegroup_id] = split_import_id::<2>(id, "<org_id>/<role_group_id>")?;
        let mut state = Map::new();
        state.insert("id".to_string(), Value::String(rolegroup_id));
        state.insert("org_id".to_string(), Value::String(org_id));
        Ok(state)
    }

    async fn create(&self, ctx: &ProviderContext, attrs: &RolegroupAttrs) -> Result<String, ProviderError> {
        let created = ctx
            .clients
            .rolegroup
            .create(&ctx.regional_auth(), &attrs.org_id, &build_body(attrs))
            .await
            .map_err(|e| ProviderError::api("Unable to create rolegroups", &e))?;

        created.role_group_id.ok_or_else(|| {
            ProviderError::operation("Unable to create rolegroups", "Response carries no role_group_id")
        })
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        key: &RolegroupKey,
    ) -> Result<Option<Map<String, Value>>, ProviderError> {
        let result = ctx
            .clients
            .rolegroup
            .get(&ctx.regional_auth(), &key.org_id, &key.id)
            .await;
        Ok(found(result, || "Unable to get rolegroup".to_string())?.map(|rg| flatten(&rg)))
    }

    async fn update(
        &self,
        ctx: &ProviderContext,
        key: &RolegroupKey,
        attrs: &RolegroupAttrs,
    ) -> Result<(), ProviderError> {
        ctx.clients
            .rolegroup
            .update(&ctx.regional_auth(), &key.org_id, &key.id, &build_body(attrs))
            .await
            .map_err(|e| ProviderError::api("Unable to update rolegroup", &e))?;
        Ok(())
    }

    async fn delete(&self, ctx: &ProviderContext, key: &RolegroupKey) -> Result<(), ProviderError> {
        ctx.clients
            .rolegroup
            .delete(&ctx.regional_auth(), &key.org_id, &key.id)
            .await
            .map_err(|e| ProviderError::api("Unable to delete rolegroup", &e))
    }
}
