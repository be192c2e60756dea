//! Users API (`/accounts/api/organizations/{org}/users`).

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{ApiError, HttpClient};
use crate::auth::AuthContext;

/// A user as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub organization_id: Option<String>,
    pub enabled: Option<bool>,
    #[serde(rename = "idprovider_id")]
    pub idprovider_id: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub last_login: Option<String>,
    pub mfa_verifiers_configured: Option<String>,
    pub mfa_verification_excluded: Option<bool>,
    pub is_federated: Option<bool>,
    pub username: Option<String>,
    #[serde(rename = "type")]
    pub user_type: Option<String>,
    pub primary_organization: Option<Map<String, Value>>,
    pub member_of_organizations: Option<Vec<Map<String, Value>>>,
    pub contributor_of_organizations: Option<Vec<Map<String, Value>>>,
    pub organization: Option<Map<String, Value>>,
}

/// A page of users.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserList {
    #[serde(default)]
    pub data: Option<Vec<User>>,
    #[serde(default)]
    pub total: Option<i64>,
}

/// Paging and filtering options of the users listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub user_type: Option<String>,
}

impl UserQuery {
    /// Query parameters for the options that are set.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(offset) = self.offset {
            params.push(("offset", offset.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(user_type) = &self.user_type {
            params.push(("type", user_type.clone()));
        }
        params
    }
}

#[derive(Debug, Clone)]
pub struct UserClient {
    http: HttpClient,
}

impl UserClient {
    pub(crate) fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn list(
        &self,
        auth: &AuthContext,
        org_id: &str,
        query: &UserQuery,
    ) -> Result<UserList, ApiError> {
        let path = format!("/accounts/api/organizations/{}/users", org_id);
        self.http.get(auth, &path, &query.to_params()).await
    }
}
