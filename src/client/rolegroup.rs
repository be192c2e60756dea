//! Role-groups API (`/accounts/api/organizations/{org}/rolegroups`).

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{ApiError, HttpClient};
use crate::auth::AuthContext;

/// A role-group as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rolegroup {
    pub role_group_id: Option<String>,
    pub name: Option<String>,
    pub external_names: Option<Vec<String>>,
    pub description: Option<String>,
    pub org_id: Option<String>,
    pub editable: Option<bool>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub user_count: Option<i64>,
}

/// Payload of both create (POST) and update (PUT).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RolegroupBody {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_names: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A page of role-groups.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RolegroupList {
    #[serde(default)]
    pub data: Option<Vec<Rolegroup>>,
    #[serde(default)]
    pub total: Option<i64>,
}

/// Client for the role-groups API.
#[derive(Debug, Clone)]
pub struct RolegroupClient {
    http: HttpClient,
}

fn collection(org_id: &str) -> String {
    format!("/accounts/api/organizations/{}/rolegroups", org_id)
}

fn item(org_id: &str, id: &str) -> String {
    format!("{}/{}", collection(org_id), id)
}

impl RolegroupClient {
    pub(crate) fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn list(&self, auth: &AuthContext, org_id: &str) -> Result<RolegroupList, ApiError> {
        self.http.get(auth, &collection(org_id), &[]).await
    }

    pub async fn create(
        &self,
        auth: &AuthContext,
        org_id: &str,
        body: &RolegroupBody,
    ) -> Result<Rolegroup, ApiError> {
        self.http
            .send(Method::POST, auth, &collection(org_id), body)
            .await
    }

    pub async fn get(
        &self,
        auth: &AuthContext,
        org_id: &str,
        id: &str,
    ) -> Result<Rolegroup, ApiError> {
        self.http.get(auth, &item(org_id, id), &[]).await
    }

    pub async fn update(
        &self,
        auth: &AuthContext,
        org_id: &str,
        id: &str,
        body: &RolegroupBody,
    ) -> Result<serde_json::Value, ApiError> {
        self.http
            .send(Method::PUT, auth, &item(org_id, id), body)
            .await
    }

    pub async fn delete(&self, auth: &AuthContext, org_id: &str, id: &str) -> Result<(), ApiError> {
        self.http.delete(auth, &item(org_id, id)).await
    }
}
