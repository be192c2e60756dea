//! Environments API.

use serde::{Deserialize, Serialize};

use super::{ApiError, HttpClient};
use crate::auth::AuthContext;

/// An environment of a business group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: Option<String>,
    pub name: Option<String>,
    pub organization_id: Option<String>,
    pub is_production: Option<bool>,
    #[serde(rename = "type")]
    pub env_type: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EnvClient {
    http: HttpClient,
}

impl EnvClient {
    pub(crate) fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// `GET /accounts/api/organizations/{org}/environments/{env}`
    pub async fn get(
        &self,
        auth: &AuthContext,
        org_id: &str,
        env_id: &str,
    ) -> Result<Environment, ApiError> {
        let path = format!(
            "/accounts/api/organizations/{}/environments/{}",
            org_id, env_id
        );
        self.http.get(auth, &path, &[]).await
    }
}
