//! Anypoint Provider
//!
//! An infrastructure provider plugin that manages Anypoint Platform objects
//! through the platform's REST management APIs. The plugin is spawned by an
//! infrastructure-as-code host and talks to it over gRPC.
//!
//! # Overview
//!
//! Resources (full create/read/update/delete/import):
//!
//! - `anypoint_rolegroup`: access-management role-groups
//! - `anypoint_idp_oidc`: OpenID Connect identity providers
//! - `anypoint_amq`: Anypoint MQ queues
//!
//! Data sources (read only):
//!
//! - `anypoint_env`: a single environment
//! - `anypoint_amq`: the queues of a region of an environment
//! - `anypoint_rolegroups`: the role-groups of a business group
//! - `anypoint_users`: a page of the users of a business group
//!
//! # Layout
//!
//! - [`config`] and [`auth`]: provider configuration and per-call credentials
//! - [`client`]: one typed HTTP client per API family
//! - [`resources`] and [`data_sources`]: the object kinds, each a small typed
//!   trait implementation adapted into the JSON-level handler the provider dispatches to
//! - [`provider`]: the [`ProviderService`] implementation
//! - [`server`]: the gRPC service and the handshake
//!
//! # Quick Start
//!
//! ```ignore
//! use anypoint_provider::{init_logging, serve, AnypointProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), anypoint_provider::ProviderError> {
//!     init_logging();
//!     serve(AnypointProvider::new()).await
//! }
//! ```
//!
//! # Handshake Protocol
//!
//! When the plugin starts via [`serve`], it outputs a handshake string to stdout:
//!
//! ```text
//! ANYPOINT_PLUGIN|1|127.0.0.1:50051
//! ```
//!
//! Format: `ANYPOINT_PLUGIN|<protocol_version>|<address>`
//!
//! Logs go to stderr so stdout carries nothing but the handshake.
//!
//! # Provider Protocol
//!
//! - **GetMetadata**: Returns capabilities and resource/data source names
//! - **GetSchema**: Returns full schema for provider config, resources, and data sources
//! - **ValidateProviderConfig**: Validates provider configuration
//! - **Configure**: Builds the API clients from credentials
//! - **Stop**: Releases the configured clients
//! - **ValidateResourceConfig**: Validates resource configuration
//! - **Plan**: Calculates required changes
//! - **Create/Read/Update/Delete**: CRUD operations for resources
//! - **ImportResourceState**: Imports existing objects by id
//! - **ValidateDataSourceConfig**: Validates data source configuration
//! - **ReadDataSource**: Reads data sources

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod client;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

// Re-export main types at crate root
pub use config::{ControlPlane, ProviderConfig};
pub use error::{ApiError, ProviderError};
pub use logging::{init_logging, init_logging_with_default};
pub use provider::{AnypointProvider, ProviderContext};
pub use schema::ProviderSchema;
pub use server::{serve, serve_on, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tonic;
pub use tracing;
