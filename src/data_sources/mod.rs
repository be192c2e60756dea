//! Read-only data sources.

#[allow(missing_docs)]
pub mod amq;
#[allow(missing_docs)]
pub mod env;
#[allow(missing_docs)]
pub mod rolegroups;
#[allow(missing_docs)]
pub mod users;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::ProviderContext;
use crate::schema::{redact_sensitive, Diagnostic, Schema};
use crate::validation;

/// A data source type backed by one Anypoint API.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    /// Configured arguments.
    type Config: DeserializeOwned + Send + Sync;

    /// Name of the data source type.
    const TYPE_NAME: &'static str;

    /// Schema of the data source.
    fn schema(&self) -> Schema;

    /// Checks beyond what the schema can express.
    fn validate(&self, config: &Self::Config) -> Vec<Diagnostic> {
        let _ = config;
        Vec::new()
    }

    /// Fetch and flatten; the result is merged over the configuration.
    async fn read(
        &self,
        ctx: &ProviderContext,
        config: &Self::Config,
    ) -> Result<Map<String, Value>, ProviderError>;
}

/// Object-safe view of a data source, operating on JSON.
#[async_trait]
pub trait DataSourceHandler: Send + Sync {
    /// Name of the data source type.
    fn type_name(&self) -> &'static str;
    /// Schema of the data source.
    fn schema(&self) -> Schema;
    /// Validate a configuration.
    fn validate(&self, config: &Value) -> Vec<Diagnostic>;
    /// Read and return the full state.
    async fn read(&self, ctx: &ProviderContext, config: Value) -> Result<Value, ProviderError>;
}

/// Adapts a [`DataSource`] to a [`DataSourceHandler`].
pub struct DataSourceAdapter<D>(pub D);

#[async_trait]
impl<D: DataSource> DataSourceHandler for DataSourceAdapter<D> {
    fn type_name(&self) -> &'static str {
        D::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        self.0.schema()
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let diagnostics = validation::validate(&self.0.schema(), config);
        if !diagnostics.is_empty() {
            return diagnostics;
        }
        match serde_json::from_value::<D::Config>(config.clone()) {
            Ok(typed) => self.0.validate(&typed),
            Err(e) => vec![Diagnostic::error(format!("Invalid {} configuration", D::TYPE_NAME))
                .with_detail(e.to_string())],
        }
    }

    async fn read(&self, ctx: &ProviderContext, config: Value) -> Result<Value, ProviderError> {
        let typed: D::Config = serde_json::from_value(config.clone())?;
        let errors: Vec<Diagnostic> = self
            .0
            .validate(&typed)
            .into_iter()
            .filter(|d| d.is_error())
            .collect();
        if !errors.is_empty() {
            return Err(ProviderError::Diagnostics(errors));
        }

        let remote = self.0.read(ctx, &typed).await?;

        let mut state = match config {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        state.extend(remote);
        let state = Value::Object(state);

        debug!(
            data_source = D::TYPE_NAME,
            state = %redact_sensitive(&self.0.schema().block, &state),
            "Read completed"
        );
        Ok(state)
    }
}

/// Every data source type served by the provider.
pub fn all() -> Vec<Box<dyn DataSourceHandler>> {
    vec![
        Box::new(DataSourceAdapter(env::EnvDataSource)),
        Box::new(DataSourceAdapter(amq::QueuesDataSource)),
        Box::new(DataSourceAdapter(rolegroups::RolegroupsDataSource)),
        Box::new(DataSourceAdapter(users::UsersDataSource)),
    ]
}

/// Id of an aggregate read: the current unix time in seconds.
pub(crate) fn timestamp_id() -> String {
    chrono::Utc::now().timestamp().to_string()
}
