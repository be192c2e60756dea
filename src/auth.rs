//! Per-request authentication contexts.
//!
//! Every call carries a bearer token. The accounts APIs (identity providers,
//! role-groups, users) are served per control plane and also carry a server
//! index; the environment and message-queue APIs always use the first server.
//! Contexts are rebuilt for each call and never cached or refreshed.

use std::fmt;

use crate::config::ProviderConfig;

/// Credentials and routing for one API call.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    access_token: String,
    server_index: Option<usize>,
}

impl AuthContext {
    /// Context carrying only a bearer token.
    pub fn token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            server_index: None,
        }
    }

    /// Context carrying a bearer token and a server index.
    pub fn regional(access_token: impl Into<String>, server_index: usize) -> Self {
        Self {
            access_token: access_token.into(),
            server_index: Some(server_index),
        }
    }

    /// The bearer token.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Server the request is routed to.
    pub fn server_index(&self) -> usize {
        self.server_index.unwrap_or(0)
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("access_token", &crate::schema::REDACTED)
            .field("server_index", &self.server_index)
            .finish()
    }
}

/// Context for the environment and message-queue APIs.
pub fn token_auth(config: &ProviderConfig) -> AuthContext {
    AuthContext::token(config.access_token.clone())
}

/// Context for the accounts APIs, routed to the configured control plane.
pub fn regional_auth(config: &ProviderConfig) -> AuthContext {
    AuthContext::regional(config.access_token.clone(), config.cplane.server_index())
}
