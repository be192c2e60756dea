//! Identity providers API (`/accounts/api/organizations/{org}/identityProviders`).

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{ApiError, HttpClient};
use crate::auth::AuthContext;

/// An identity provider as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IdentityProvider {
    pub provider_id: Option<String>,
    pub org_id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub idp_type: Option<IdpType>,
    pub oidc_provider: Option<OidcProvider>,
    pub service_provider: Option<ServiceProvider>,
    pub allow_untrusted_certificates: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdpType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OidcProvider {
    pub client: Option<OidcClient>,
    pub urls: Option<OidcUrls>,
    pub issuer: Option<String>,
    pub group_scope: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OidcClient {
    pub redirect_url: Option<String>,
    pub urls: Option<RegistrationUrls>,
    pub credentials: Option<ClientCredentials>,
    pub token_endpoint_auth_methods_supported: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationUrls {
    pub register: Option<String>,
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("id", &self.id)
            .field("secret", &self.secret.as_ref().map(|_| crate::schema::REDACTED))
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OidcUrls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userinfo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorize: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServiceProvider {
    pub urls: Option<ServiceProviderUrls>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServiceProviderUrls {
    pub sign_on: Option<String>,
    pub sign_out: Option<String>,
}

/// How the OIDC client is registered with the identity provider.
///
/// Serialized as the `client` object of the request body: either
/// `{"urls": {"register": ...}}` or `{"credentials": {"id": ..., "secret": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ClientRegistration {
    /// Dynamic client registration through the given URL.
    #[serde(rename = "urls")]
    Registration {
        /// Registration endpoint.
        register: String,
    },
    /// Manually registered client.
    #[serde(rename = "credentials")]
    Credentials(ClientCredentials),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OidcProviderBody {
    pub client: ClientRegistration,
    pub urls: OidcUrls,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_scope: Option<String>,
}

/// Payload of both create (POST) and update (PATCH); they differ only in `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdpBody {
    pub name: String,
    #[serde(rename = "type")]
    pub idp_type: IdpType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oidc_provider: Option<OidcProviderBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_untrusted_certificates: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct IdpClient {
    http: HttpClient,
}

fn collection(org_id: &str) -> String {
    format!("/accounts/api/organizations/{}/identityProviders", org_id)
}

fn item(org_id: &str, id: &str) -> String {
    format!("{}/{}", collection(org_id), id)
}

impl IdpClient {
    pub(crate) fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn create(
        &self,
        auth: &AuthContext,
        org_id: &str,
        body: &IdpBody,
    ) -> Result<IdentityProvider, ApiError> {
        self.http
            .send(Method::POST, auth, &collection(org_id), body)
            .await
    }

    pub async fn get(
        &self,
        auth: &AuthContext,
        org_id: &str,
        id: &str,
    ) -> Result<IdentityProvider, ApiError> {
        self.http.get(auth, &item(org_id, id), &[]).await
    }

    pub async fn patch(
        &self,
        auth: &AuthContext,
        org_id: &str,
        id: &str,
        body: &IdpBody,
    ) -> Result<serde_json::Value, ApiError> {
        self.http
            .send(Method::PATCH, auth, &item(org_id, id), body)
            .await
    }

    pub async fn delete(&self, auth: &AuthContext, org_id: &str, id: &str) -> Result<(), ApiError> {
        self.http.delete(auth, &item(org_id, id)).await
    }
}
