//! The Anypoint provider: configuration plus the resource and data source registries.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::auth::{regional_auth, token_auth, AuthContext};
use crate::client::{ApiClients, HttpClient};
use crate::config::{self, ProviderConfig};
use crate::data_sources::{self, DataSourceHandler};
use crate::error::ProviderError;
use crate::resources::{self, ResourceHandler};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation;

/// Everything an operation needs: the configuration and the API clients built from it.
///
/// Immutable once built; shared by every concurrent operation.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    /// Provider configuration.
    pub config: ProviderConfig,
    /// One client per API family.
    pub clients: ApiClients,
}

impl ProviderContext {
    /// Build the HTTP clients for `config`.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let http = HttpClient::from_config(&config).map_err(|e| {
            ProviderError::Configuration(format!("Unable to build HTTP client: {}", e))
        })?;
        Ok(Self {
            clients: ApiClients::new(http),
            config,
        })
    }

    /// Bearer token only, for APIs served from a single host.
    pub fn token_auth(&self) -> AuthContext {
        token_auth(&self.config)
    }

    /// Bearer token plus the server index of the configured control plane.
    pub fn regional_auth(&self) -> AuthContext {
        regional_auth(&self.config)
    }
}

/// Provider serving the Anypoint resources and data sources.
pub struct AnypointProvider {
    resources: HashMap<&'static str, Box<dyn ResourceHandler>>,
    data_sources: HashMap<&'static str, Box<dyn DataSourceHandler>>,
    context: RwLock<Option<Arc<ProviderContext>>>,
}

impl Default for AnypointProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AnypointProvider {
    /// Create an unconfigured provider with every resource and data source registered.
    pub fn new() -> Self {
        Self {
            resources: resources::all()
                .into_iter()
                .map(|handler| (handler.type_name(), handler))
                .collect(),
            data_sources: data_sources::all()
                .into_iter()
                .map(|handler| (handler.type_name(), handler))
                .collect(),
            context: RwLock::new(None),
        }
    }

    /// Create a provider that is already configured.
    pub fn with_config(config: ProviderConfig) -> Result<Self, ProviderError> {
        let context = Arc::new(ProviderContext::new(config)?);
        Ok(Self {
            context: RwLock::new(Some(context)),
            ..Self::new()
        })
    }

    /// Problems with the schemas themselves; empty for a well-formed provider.
    pub fn check_schema(&self) -> Vec<Diagnostic> {
        validation::check_provider_schema(&self.schema())
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn ResourceHandler, ProviderError> {
        self.resources
            .get(resource_type)
            .map(|handler| handler.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&dyn DataSourceHandler, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .map(|handler| handler.as_ref())
            .ok_or_else(|| {
                ProviderError::UnknownResource(format!("data source {}", data_source_type))
            })
    }

    async fn context(&self) -> Result<Arc<ProviderContext>, ProviderError> {
        self.context.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration("Provider has not been configured".to_string())
        })
    }
}

#[async_trait::async_trait]
impl ProviderService for AnypointProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = self
            .resources
            .values()
            .fold(ProviderSchema::new().with_provider_config(config::schema()), |schema, r| {
                schema.with_resource(r.type_name(), r.schema())
            });
        self.data_sources
            .values()
            .fold(schema, |schema, d| schema.with_data_source(d.type_name(), d.schema()))
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(match ProviderConfig::from_value(&config) {
            Ok(_) => Vec::new(),
            Err(diagnostics) => diagnostics,
        })
    }

    #[instrument(skip(self, config))]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config = match ProviderConfig::from_value(&config) {
            Ok(config) => config,
            Err(diagnostics) => return Ok(diagnostics),
        };
        info!(cplane = ?config.cplane, custom_base_url = config.base_url.is_some(), "Configuring provider");

        let context = ProviderContext::new(config)?;
        *self.context.write().await = Some(Arc::new(context));
        Ok(Vec::new())
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.context.write().await.take();
        debug!("Provider context released");
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.resource(resource_type)?.validate(&config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let handler = self.resource(resource_type)?;
        Ok(handler.plan(prior_state.as_ref(), proposed_state))
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let handler = self.resource(resource_type)?;
        handler.create(&*self.context().await?, planned_state).await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Option<Value>, ProviderError> {
        let handler = self.resource(resource_type)?;
        handler.read(&*self.context().await?, current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let handler = self.resource(resource_type)?;
        handler
            .update(&*self.context().await?, prior_state, planned_state)
            .await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let handler = self.resource(resource_type)?;
        let cleared = handler.delete(&*self.context().await?, current_state).await?;
        if !cleared["id"].is_null() {
            warn!(resource_type, "Delete left an id behind");
        }
        Ok(())
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let handler = self.resource(resource_type)?;
        let state = handler.import(&*self.context().await?, id).await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.data_source(data_source_type)?.validate(&config))
    }

    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError> {
        let handler = self.data_source(data_source_type)?;
        handler.read(&*self.context().await?, config).await
    }
}
