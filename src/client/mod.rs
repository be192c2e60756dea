//! HTTP clients for the Anypoint management APIs.
//!
//! [`HttpClient`] owns the connection pool and the server list; one typed
//! client per API family wraps a clone of it. All handles are immutable after
//! construction and safe to share across concurrent operations.

// Wire models mirror the API documents field for field.
#[allow(missing_docs)]
pub mod amq;
#[allow(missing_docs)]
pub mod env;
#[allow(missing_docs)]
pub mod idp;
#[allow(missing_docs)]
pub mod rolegroup;
#[allow(missing_docs)]
pub mod user;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use crate::auth::AuthContext;
use crate::config::ProviderConfig;
use crate::logging::log_safe_body;

pub use crate::error::ApiError;

/// Hosts of the US, EU and government control planes, by server index.
pub const DEFAULT_SERVERS: [&str; 3] = [
    "https://anypoint.mulesoft.com",
    "https://eu1.anypoint.mulesoft.com",
    "https://gov.anypoint.mulesoft.com",
];

/// Shared HTTP client wrapper.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    servers: Arc<Vec<String>>,
}

impl HttpClient {
    /// Create a client talking to the given servers.
    pub fn new(servers: Vec<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("anypoint-provider/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            servers: Arc::new(servers),
        })
    }

    /// Create a client for the servers selected by the provider configuration.
    ///
    /// A `base_url` replaces the host of every control plane.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ApiError> {
        let servers = match &config.base_url {
            Some(base) => vec![base.clone(); DEFAULT_SERVERS.len()],
            None => DEFAULT_SERVERS.iter().map(|s| s.to_string()).collect(),
        };
        Self::new(servers, config.timeout)
    }

    fn url(&self, auth: &AuthContext, path: &str) -> Result<String, ApiError> {
        let index = auth.server_index();
        let server = self.servers.get(index).ok_or(ApiError::InvalidServerIndex {
            index,
            available: self.servers.len(),
        })?;
        Ok(format!("{}{}", server, path))
    }

    fn request(
        &self,
        method: Method,
        auth: &AuthContext,
        path: &str,
    ) -> Result<(RequestBuilder, String), ApiError> {
        let url = self.url(auth, path)?;
        debug!(%method, %url, "API request");
        let builder = self
            .client
            .request(method, &url)
            .bearer_auth(auth.access_token());
        Ok((builder, url))
    }

    /// Send a request and return the raw body of a success response.
    async fn execute(&self, builder: RequestBuilder, url: &str) -> Result<String, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(
                status = status.as_u16(),
                %url,
                body = %log_safe_body(&body),
                "API error"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    /// GET a JSON document.
    pub async fn get<T: DeserializeOwned>(
        &self,
        auth: &AuthContext,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let (builder, url) = self.request(Method::GET, auth, path)?;
        let builder = if query.is_empty() {
            builder
        } else {
            builder.query(query)
        };
        let body = self.execute(builder, &url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Send a JSON body with the given method and decode the JSON answer.
    pub async fn send<B, T>(
        &self,
        method: Method,
        auth: &AuthContext,
        path: &str,
        payload: &B,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let (builder, url) = self.request(method, auth, path)?;
        let body = self.execute(builder.json(payload), &url).await?;
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        Ok(serde_json::from_str(body)?)
    }

    /// DELETE, discarding any response body.
    pub async fn delete(&self, auth: &AuthContext, path: &str) -> Result<(), ApiError> {
        let (builder, url) = self.request(Method::DELETE, auth, path)?;
        self.execute(builder, &url).await?;
        Ok(())
    }
}

/// One client handle per API family.
#[derive(Debug, Clone)]
pub struct ApiClients {
    /// Environments API.
    pub env: env::EnvClient,
    /// Message-queue admin API.
    pub amq: amq::AmqClient,
    /// Identity providers API.
    pub idp: idp::IdpClient,
    /// Role-groups API.
    pub rolegroup: rolegroup::RolegroupClient,
    /// Users API.
    pub user: user::UserClient,
}

impl ApiClients {
    /// Build every API client on top of one shared HTTP client.
    pub fn new(http: HttpClient) -> Self {
        Self {
            env: env::EnvClient::new(http.clone()),
            amq: amq::AmqClient::new(http.clone()),
            idp: idp::IdpClient::new(http.clone()),
            rolegroup: rolegroup::RolegroupClient::new(http.clone()),
            user: user::UserClient::new(http),
        }
    }
}
