//! `anypoint_idp_oidc`: an OpenID Connect identity provider.
//!
//! The OIDC client is either registered dynamically through a registration
//! URL or manually with a client id and secret. Configuring both, or neither,
//! is rejected when the configuration is validated; the body builder still
//! prefers the registration URL when handed both.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{found, put, split_import_id, Resource};
use crate::client::idp::{
    ClientCredentials, ClientRegistration, IdentityProvider, IdpBody, IdpType, OidcProviderBody,
    OidcUrls,
};
use crate::error::ProviderError;
use crate::provider::ProviderContext;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, Diagnostic, NestedBlock, Schema};

const OIDC_TYPE_NAME: &str = "openid";
const OIDC_TYPE_DESCRIPTION: &str = "OpenID Connect";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OidcAttrs {
    pub org_id: String,
    pub name: String,
    #[serde(default)]
    pub oidc_provider: Option<Vec<OidcProviderAttrs>>,
}

impl OidcAttrs {
    /// The single `oidc_provider` block, if configured.
    pub fn provider(&self) -> Option<&OidcProviderAttrs> {
        self.oidc_provider.as_ref().and_then(|blocks| blocks.first())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OidcProviderAttrs {
    pub token_url: String,
    pub userinfo_url: String,
    pub authorize_url: String,
    pub issuer: String,
    #[serde(default)]
    pub client_registration_url: Option<String>,
    #[serde(default)]
    pub client_credentials_id: Option<String>,
    #[serde(default)]
    pub client_credentials_secret: Option<String>,
    #[serde(default)]
    pub group_scope: Option<String>,
    #[serde(default)]
    pub allow_untrusted_certificates: Option<bool>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

impl OidcProviderAttrs {
    /// Client registration, preferring the registration URL over credentials.
    pub fn registration(&self) -> ClientRegistration {
        match non_empty(&self.client_registration_url) {
            Some(register) => ClientRegistration::Registration { register },
            None => ClientRegistration::Credentials(ClientCredentials {
                id: non_empty(&self.client_credentials_id),
                secret: non_empty(&self.client_credentials_secret),
            }),
        }
    }

    fn has_credentials(&self) -> bool {
        non_empty(&self.client_credentials_id).is_some()
            || non_empty(&self.client_credentials_secret).is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OidcKey {
    pub id: String,
    pub org_id: String,
}

fn build_body(attrs: &OidcAttrs, idp_type: IdpType) -> IdpBody {
    let provider = attrs.provider();
    IdpBody {
        name: attrs.name.clone(),
        idp_type,
        oidc_provider: provider.map(|p| OidcProviderBody {
            client: p.registration(),
            urls: OidcUrls {
                token: Some(p.token_url.clone()),
                userinfo: Some(p.userinfo_url.clone()),
                authorize: Some(p.authorize_url.clone()),
            },
            issuer: Some(p.issuer.clone()),
            group_scope: p.group_scope.clone(),
        }),
        allow_untrusted_certificates: provider.and_then(|p| p.allow_untrusted_certificates),
    }
}

/// Payload of the create (POST) call.
pub fn create_body(attrs: &OidcAttrs) -> IdpBody {
    build_body(
        attrs,
        IdpType {
            name: Some(OIDC_TYPE_NAME.to_string()),
            description: Some(OIDC_TYPE_DESCRIPTION.to_string()),
        },
    )
}

/// Payload of the update (PATCH) call.
pub fn patch_body(attrs: &OidcAttrs) -> IdpBody {
    build_body(
        attrs,
        IdpType {
            name: None,
            description: Some(OIDC_TYPE_DESCRIPTION.to_string()),
        },
    )
}

/// Flatten an API identity provider into state attributes.
pub fn flatten(idp: &IdentityProvider) -> Map<String, Value> {
    let mut attrs = Map::new();
    put(&mut attrs, "provider_id", idp.provider_id.clone());
    put(&mut attrs, "org_id", idp.org_id.clone());
    put(&mut attrs, "name", idp.name.clone());

    if let Some(idp_type) = &idp.idp_type {
        let mut type_map = Map::new();
        put(&mut type_map, "name", idp_type.name.clone());
        put(&mut type_map, "description", idp_type.description.clone());
        attrs.insert("type".to_string(), Value::Object(type_map));
    }

    if let Some(urls) = idp.service_provider.as_ref().and_then(|sp| sp.urls.as_ref()) {
        put(&mut attrs, "sp_sign_on_url", urls.sign_on.clone());
        put(&mut attrs, "sp_sign_out_url", urls.sign_out.clone());
    }

    if let Some(oidc) = &idp.oidc_provider {
        let mut block = Map::new();
        if let Some(urls) = &oidc.urls {
            put(&mut block, "token_url", urls.token.clone());
            put(&mut block, "userinfo_url", urls.userinfo.clone());
            put(&mut block, "authorize_url", urls.authorize.clone());
        }
        put(&mut block, "issuer", oidc.issuer.clone());
        put(&mut block, "group_scope", oidc.group_scope.clone());
        if let Some(client) = &oidc.client {
            put(&mut block, "redirect_url", client.redirect_url.clone());
            put(
                &mut block,
                "client_registration_url",
                client.urls.as_ref().and_then(|u| u.register.clone()),
            );
            put(
                &mut block,
                "client_credentials_id",
                client.credentials.as_ref().and_then(|c| c.id.clone()),
            );
            put(
                &mut block,
                "client_token_endpoint_auth_methods_supported",
                client.token_endpoint_auth_methods_supported.clone(),
            );
        }
        put(&mut block, "allow_untrusted_certificates", idp.allow_untrusted_certificates);
        attrs.insert("oidc_provider".to_string(), Value::Array(vec![Value::Object(block)]));
    }

    attrs
}

fn oidc_provider_block() -> Block {
    Block::new()
        .with_attribute(
            "token_url",
            Attribute::required_string().with_description("The token url of the openid-connect provider"),
        )
        .with_attribute(
            "redirect_url",
            Attribute::computed_string()
                .with_description("The redirect url of the openid-connect provider"),
        )
        .with_attribute(
            "userinfo_url",
            Attribute::required_string()
                .with_description("The userinfo url of the openid-connect provider"),
        )
        .with_attribute(
            "authorize_url",
            Attribute::required_string()
                .with_description("The authorization url of the openid-connect provider"),
        )
        .with_attribute(
            "client_registration_url",
            Attribute::optional_string().with_description(
                "The registration url, for dynamic client registration. Mutually exclusive with the client credentials.",
            ),
        )
        .with_attribute(
            "client_credentials_id",
            Attribute::optional_string().with_description(
                "The client's credentials id, for manual registration. Mutually exclusive with the registration url.",
            ),
        )
        .with_attribute(
            "client_credentials_secret",
            Attribute::optional_string().sensitive().with_description(
                "The client's credentials secret, for manual registration. Mutually exclusive with the registration url.",
            ),
        )
        .with_attribute(
            "client_token_endpoint_auth_methods_supported",
            Attribute::new(
                AttributeType::list(AttributeType::String),
                AttributeFlags::computed(),
            )
            .with_description("The list of authentication methods supported"),
        )
        .with_attribute(
            "issuer",
            Attribute::required_string().with_description("The provider token issuer url"),
        )
        .with_attribute(
            "group_scope",
            Attribute::optional_string().with_description("The provider group scopes"),
        )
        .with_attribute(
            "allow_untrusted_certificates",
            Attribute::optional_bool()
                .with_default(Value::Bool(true))
                .with_description("The certification validation trigger"),
        )
}

pub struct OidcResource;

#[async_trait]
impl Resource for OidcResource {
    type Attrs = OidcAttrs;
    type Key = OidcKey;

    const TYPE_NAME: &'static str = "anypoint_idp_oidc";
    const WATCHED: &'static [&'static str] = &["name", "oidc_provider"];

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Creates an `identity provider` OIDC type configuration in your account.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("last_updated", Attribute::computed_string())
            .with_attribute(
                "org_id",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("The business group id"),
            )
            .with_attribute(
                "provider_id",
                Attribute::computed_string().with_description("The provider id"),
            )
            .with_attribute(
                "name",
                Attribute::required_string().with_description("The name of the provider"),
            )
            .with_attribute(
                "type",
                Attribute::new(
                    AttributeType::map(AttributeType::String),
                    AttributeFlags::computed(),
                )
                .with_description("The type of the provider: its name and description"),
            )
            .with_attribute(
                "sp_sign_on_url",
                Attribute::computed_string().with_description("The provider's sign on url"),
            )
            .with_attribute(
                "sp_sign_out_url",
                Attribute::computed_string()
                    .with_description("The provider's sign out url, only available for SAML"),
            )
            .with_block(
                "oidc_provider",
                NestedBlock::set(oidc_provider_block())
                    .with_min_items(1)
                    .with_max_items(1),
            )
    }

    fn validate(&self, attrs: &OidcAttrs) -> Vec<Diagnostic> {
        let Some(provider) = attrs.provider() else {
            return Vec::new();
        };
        let registration = non_empty(&provider.client_registration_url).is_some();
        let summary = match (registration, provider.has_credentials()) {
            (true, true) => "Client registration url and client credentials are mutually exclusive",
            (false, false) => "Either a client registration url or client credentials must be set",
            _ => return Vec::new(),
        };
        vec![Diagnostic::error(summary).with_attribute("oidc_provider")]
    }

    fn import_state(&self, id: &str) -> Result<Map<String, Value>, ProviderError> {
        let [org_id, provider_id] = split_import_id::<2>(id, "<org_id>/<provider_id>")?;
        let mut state = Map::new();
        state.insert("id".to_string(), Value::String(provider_id));
        state.insert("org_id".to_string(), Value::String(org_id));
        Ok(state)
    }

    async fn create(&self, ctx: &ProviderContext, attrs: &OidcAttrs) -> Result<String, ProviderError> {
        let summary = || format!("Unable to create OIDC provider for org {}", attrs.org_id);
        let created = ctx
            .clients
            .idp
            .create(&ctx.regional_auth(), &attrs.org_id, &create_body(attrs))
            .await
            .map_err(|e| ProviderError::api(summary(), &e))?;

        created
            .provider_id
            .ok_or_else(|| ProviderError::operation(summary(), "Response carries no provider_id"))
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        key: &OidcKey,
    ) -> Result<Option<Map<String, Value>>, ProviderError> {
        let result = ctx
            .clients
            .idp
            .get(&ctx.regional_auth(), &key.org_id, &key.id)
            .await;
        let idp = found(result, || {
            format!("Unable to Get IDP {} in org {}", key.id, key.org_id)
        })?;
        Ok(idp.map(|idp| flatten(&idp)))
    }

    async fn update(
        &self,
        ctx: &ProviderContext,
        key: &OidcKey,
        attrs: &OidcAttrs,
    ) -> Result<(), ProviderError> {
        ctx.clients
            .idp
            .patch(&ctx.regional_auth(), &key.org_id, &key.id, &patch_body(attrs))
            .await
            .map_err(|e| {
                ProviderError::api(
                    format!("Unable to Update IDP {} in org {}", key.id, key.org_id),
                    &e,
                )
            })?;
        Ok(())
    }

    async fn delete(&self, ctx: &ProviderContext, key: &OidcKey) -> Result<(), ProviderError> {
        ctx.clients
            .idp
            .delete(&ctx.regional_auth(), &key.org_id, &key.id)
            .await
            .map_err(|e| ProviderError::api(format!("Unable to Delete OIDC provider {}", key.id), &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(provider: Value) -> OidcAttrs {
        serde_json::from_value(json!({
            "org_id": "o1",
            "name": "okta",
            "oidc_provider": [provider]
        }))
        .unwrap()
    }

    fn provider_with(extra: Value) -> Value {
        let mut base = json!({
            "token_url": "https://idp/token",
            "userinfo_url": "https://idp/userinfo",
            "authorize_url": "https://idp/authorize",
            "issuer": "https://idp"
        });
        if let (Value::Object(base), Value::Object(extra)) = (&mut base, extra) {
            base.extend(extra);
        }
        base
    }

    #[test]
    fn test_registration_url_wins_over_credentials() {
        let attrs = attrs(provider_with(json!({
            "client_registration_url": "https://idp/register",
            "client_credentials_id": "client",
            "client_credentials_secret": "s3cret"
        })));
        let body = serde_json::to_value(create_body(&attrs)).unwrap();
        assert_eq!(
            body["oidc_provider"]["client"],
            json!({"urls": {"register": "https://idp/register"}})
        );
        assert!(!body.to_string().contains("s3cret"));
    }

    #[test]
    fn test_create_and_patch_types() {
        let attrs = attrs(provider_with(json!({"client_credentials_id": "client"})));
        let create = serde_json::to_value(create_body(&attrs)).unwrap();
        let patch = serde_json::to_value(patch_body(&attrs)).unwrap();
        assert_eq!(create["type"], json!({"name": "openid", "description": "OpenID Connect"}));
        assert_eq!(patch["type"], json!({"description": "OpenID Connect"}));
        assert_eq!(create["oidc_provider"]["client"], json!({"credentials": {"id": "client"}}));
    }

    #[test]
    fn test_body_omits_unset_fields() {
        let attrs = attrs(provider_with(json!({"client_credentials_id": "client"})));
        let body = serde_json::to_value(create_body(&attrs)).unwrap();
        assert!(body.get("allow_untrusted_certificates").is_none());
        assert!(body["oidc_provider"].get("group_scope").is_none());
        assert_eq!(body["oidc_provider"]["issuer"], "https://idp");
    }

    #[test]
    fn test_validate_client_configuration() {
        let both = attrs(provider_with(json!({
            "client_registration_url": "https://idp/register",
            "client_credentials_id": "client"
        })));
        let neither = attrs(provider_with(json!({})));
        let registration = attrs(provider_with(json!({
            "client_registration_url": "https://idp/register"
        })));
        let credentials = attrs(provider_with(json!({
            "client_credentials_id": "client",
            "client_credentials_secret": "s3cret"
        })));

        assert_eq!(OidcResource.validate(&both).len(), 1);
        assert_eq!(OidcResource.validate(&neither).len(), 1);
        assert!(OidcResource.validate(&registration).is_empty());
        assert!(OidcResource.validate(&credentials).is_empty());
    }

    #[test]
    fn test_flatten() {
        let idp: IdentityProvider = serde_json::from_value(json!({
            "provider_id": "p1",
            "org_id": "o1",
            "name": "okta",
            "type": {"name": "openid", "description": "OpenID Connect"},
            "oidc_provider": {
                "client": {
                    "redirect_url": "https://anypoint/redirect",
                    "credentials": {"id": "client"},
                    "token_endpoint_auth_methods_supported": ["client_secret_basic"]
                },
                "urls": {"token": "https://idp/token", "userinfo": "https://idp/userinfo", "authorize": "https://idp/authorize"},
                "issuer": "https://idp"
            },
            "service_provider": {"urls": {"sign_on": "https://anypoint/sso"}},
            "allow_untrusted_certificates": false
        }))
        .unwrap();

        let flat = flatten(&idp);
        assert_eq!(flat["provider_id"], "p1");
        assert_eq!(flat["type"]["name"], "openid");
        assert_eq!(flat["sp_sign_on_url"], "https://anypoint/sso");
        assert!(flat.get("sp_sign_out_url").is_none());

        let block = &flat["oidc_provider"][0];
        assert_eq!(block["token_url"], "https://idp/token");
        assert_eq!(block["redirect_url"], "https://anypoint/redirect");
        assert_eq!(block["client_credentials_id"], "client");
        assert_eq!(block["allow_untrusted_certificates"], false);
        assert!(block.get("client_credentials_secret").is_none());
    }

    #[test]
    fn test_flatten_empty_payload() {
        assert!(flatten(&IdentityProvider::default()).is_empty());
    }
}
