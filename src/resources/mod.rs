//! Managed resources.
//!
//! Each resource declares its schema, body builders, flatteners and endpoint
//! calls by implementing [`Resource`]. [`ResourceAdapter`] turns that into the
//! JSON-in/JSON-out [`ResourceHandler`] the provider dispatches to, and owns
//! the behaviour every resource shares:
//!
//! - create re-reads the object after the remote create and records its id
//! - read merges the flattened response into the current state, leaving
//!   attributes the response does not carry untouched, and reports a vanished
//!   object (404) as `None` so the host recreates it
//! - update only writes remotely when a watched attribute changed, stamps
//!   `last_updated` when it did, and always re-reads
//! - delete clears the id

#[allow(missing_docs)]
pub mod amq;
#[allow(missing_docs)]
pub mod idp_oidc;
#[allow(missing_docs)]
pub mod rolegroup;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{ApiError, ProviderError};
use crate::plan::{is_unset, plan_resource};
use crate::provider::ProviderContext;
use crate::schema::{redact_sensitive, Diagnostic, Schema};
use crate::types::PlanResult;
use crate::validation;

/// Attribute holding the time of the last remote write.
pub const LAST_UPDATED: &str = "last_updated";

/// A resource type backed by one Anypoint API.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// Configurable attributes, decoded from the planned state.
    type Attrs: DeserializeOwned + Send + Sync;
    /// Attributes identifying the remote object, decoded from the state.
    type Key: DeserializeOwned + Send + Sync;

    /// Name of the resource type.
    const TYPE_NAME: &'static str;
    /// Attributes whose change triggers a remote write on update.
    const WATCHED: &'static [&'static str];

    /// Schema of the resource.
    fn schema(&self) -> Schema;

    /// Checks beyond what the schema can express.
    fn validate(&self, attrs: &Self::Attrs) -> Vec<Diagnostic> {
        let _ = attrs;
        Vec::new()
    }

    /// Turn an import id into the identifying attributes of the state.
    fn import_state(&self, id: &str) -> Result<Map<String, Value>, ProviderError>;

    /// Create the remote object and return its id.
    async fn create(&self, ctx: &ProviderContext, attrs: &Self::Attrs) -> Result<String, ProviderError>;

    /// Fetch and flatten the remote object; `None` when it no longer exists.
    async fn read(
        &self,
        ctx: &ProviderContext,
        key: &Self::Key,
    ) -> Result<Option<Map<String, Value>>, ProviderError>;

    /// Write the planned attributes to the remote object.
    async fn update(
        &self,
        ctx: &ProviderContext,
        key: &Self::Key,
        attrs: &Self::Attrs,
    ) -> Result<(), ProviderError>;

    /// Delete the remote object.
    async fn delete(&self, ctx: &ProviderContext, key: &Self::Key) -> Result<(), ProviderError>;
}

/// Object-safe view of a resource, operating on JSON state.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Name of the resource type.
    fn type_name(&self) -> &'static str;
    /// Schema of the resource.
    fn schema(&self) -> Schema;
    /// Validate a configuration.
    fn validate(&self, config: &Value) -> Vec<Diagnostic>;
    /// Plan a create or update.
    fn plan(&self, prior: Option<&Value>, proposed: Value) -> PlanResult;
    /// Create and return the new state.
    async fn create(&self, ctx: &ProviderContext, planned: Value) -> Result<Value, ProviderError>;
    /// Refresh the state; `None` when the remote object is gone.
    async fn read(&self, ctx: &ProviderContext, current: Value) -> Result<Option<Value>, ProviderError>;
    /// Update and return the new state.
    async fn update(
        &self,
        ctx: &ProviderContext,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError>;
    /// Delete and return the state with its id cleared.
    async fn delete(&self, ctx: &ProviderContext, current: Value) -> Result<Value, ProviderError>;
    /// Build the state of an existing remote object from an import id.
    async fn import(&self, ctx: &ProviderContext, id: &str) -> Result<Value, ProviderError>;
}

/// Adapts a [`Resource`] to a [`ResourceHandler`].
pub struct ResourceAdapter<R>(pub R);

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn decode<T: DeserializeOwned>(state: &Map<String, Value>) -> Result<T, ProviderError> {
    Ok(serde_json::from_value(Value::Object(state.clone()))?)
}

fn state_id(state: &Map<String, Value>) -> Option<&str> {
    state
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

/// Sparse merge: remote values win, local values the response lacks survive.
///
/// Blocks (arrays of objects) of equal length are merged element by element so
/// write-only nested values, such as secrets, are kept.
fn merge(state: &mut Map<String, Value>, remote: Map<String, Value>) {
    for (name, value) in remote {
        match (state.get_mut(&name), value) {
            (Some(Value::Array(local)), Value::Array(incoming))
                if local.len() == incoming.len() && incoming.iter().all(Value::is_object) =>
            {
                for (item, update) in local.iter_mut().zip(incoming) {
                    match (item, update) {
                        (Value::Object(item), Value::Object(update)) => merge(item, update),
                        (item, update) => *item = update,
                    }
                }
            },
            (_, value) => {
                state.insert(name, value);
            },
        }
    }
}

fn watched_changed(watched: &[&str], prior: &Map<String, Value>, planned: &Map<String, Value>) -> bool {
    watched.iter().any(|name| {
        let before = prior.get(*name).filter(|v| !is_unset(v));
        let after = planned.get(*name).filter(|v| !is_unset(v));
        before != after
    })
}

impl<R: Resource> ResourceAdapter<R> {
    fn log_state(&self, message: &str, state: &Map<String, Value>) {
        let redacted = redact_sensitive(&self.0.schema().block, &Value::Object(state.clone()));
        debug!(resource_type = R::TYPE_NAME, state = %redacted, "{}", message);
    }

    async fn refresh(
        &self,
        ctx: &ProviderContext,
        state: &mut Map<String, Value>,
    ) -> Result<bool, ProviderError> {
        let key: R::Key = decode(state)?;
        match self.0.read(ctx, &key).await? {
            Some(remote) => {
                merge(state, remote);
                Ok(true)
            },
            None => Ok(false),
        }
    }
}

#[async_trait]
impl<R: Resource> ResourceHandler for ResourceAdapter<R> {
    fn type_name(&self) -> &'static str {
        R::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        self.0.schema()
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let diagnostics = validation::validate(&self.0.schema(), config);
        if !diagnostics.is_empty() {
            return diagnostics;
        }
        match serde_json::from_value::<R::Attrs>(config.clone()) {
            Ok(attrs) => self.0.validate(&attrs),
            Err(e) => vec![Diagnostic::error(format!("Invalid {} configuration", R::TYPE_NAME))
                .with_detail(e.to_string())],
        }
    }

    fn plan(&self, prior: Option<&Value>, proposed: Value) -> PlanResult {
        plan_resource(&self.0.schema(), prior, proposed)
    }

    async fn create(&self, ctx: &ProviderContext, planned: Value) -> Result<Value, ProviderError> {
        let mut state = into_map(planned);
        let attrs: R::Attrs = decode(&state)?;

        let id = self.0.create(ctx, &attrs).await?;
        info!(resource_type = R::TYPE_NAME, %id, "Created remote object");
        state.insert("id".to_string(), Value::String(id.clone()));

        // The object exists remotely from here on, so failures keep the id.
        let applied = state.clone();
        match self.refresh(ctx, &mut state).await {
            Ok(true) => {},
            Ok(false) => {
                return Err(ProviderError::partially_applied(
                    Value::Object(applied),
                    ProviderError::operation(
                        format!("Unable to read {} after create", R::TYPE_NAME),
                        format!("Object {} was not found", id),
                    ),
                ))
            },
            Err(e) => return Err(ProviderError::partially_applied(Value::Object(applied), e)),
        }

        self.log_state("Create completed", &state);
        Ok(Value::Object(state))
    }

    async fn read(&self, ctx: &ProviderContext, current: Value) -> Result<Option<Value>, ProviderError> {
        let mut state = into_map(current);
        let Some(id) = state_id(&state).map(str::to_string) else {
            return Ok(None);
        };

        if !self.refresh(ctx, &mut state).await? {
            warn!(resource_type = R::TYPE_NAME, %id, "Remote object is gone, clearing identity");
            return Ok(None);
        }

        self.log_state("Read completed", &state);
        Ok(Some(Value::Object(state)))
    }

    async fn update(
        &self,
        ctx: &ProviderContext,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let prior = into_map(prior);
        let mut state = into_map(planned);
        if state_id(&state).is_none() {
            if let Some(id) = prior.get("id") {
                state.insert("id".to_string(), id.clone());
            }
        }

        let written = watched_changed(R::WATCHED, &prior, &state);
        if written {
            let key: R::Key = decode(&state)?;
            let attrs: R::Attrs = decode(&state)?;
            self.0.update(ctx, &key, &attrs).await?;
            if self.0.schema().block.attributes.contains_key(LAST_UPDATED) {
                state.insert(LAST_UPDATED.to_string(), Value::String(rfc850_now()));
            }
        } else {
            debug!(resource_type = R::TYPE_NAME, "No watched attribute changed, skipping remote write");
        }

        let applied = state.clone();
        let failure = match self.refresh(ctx, &mut state).await {
            Ok(true) => None,
            Ok(false) => Some(ProviderError::operation(
                format!("Unable to read {} after update", R::TYPE_NAME),
                "Object was not found".to_string(),
            )),
            Err(e) => Some(e),
        };
        if let Some(e) = failure {
            return Err(if written {
                ProviderError::partially_applied(Value::Object(applied), e)
            } else {
                e
            });
        }

        self.log_state("Update completed", &state);
        Ok(Value::Object(state))
    }

    async fn delete(&self, ctx: &ProviderContext, current: Value) -> Result<Value, ProviderError> {
        let mut state = into_map(current);
        let key: R::Key = decode(&state)?;
        self.0.delete(ctx, &key).await?;
        state.insert("id".to_string(), Value::Null);
        info!(resource_type = R::TYPE_NAME, "Deleted remote object");
        Ok(Value::Object(state))
    }

    async fn import(&self, ctx: &ProviderContext, id: &str) -> Result<Value, ProviderError> {
        let mut state = self.0.import_state(id)?;
        if !self.refresh(ctx, &mut state).await? {
            return Err(ProviderError::operation(
                "Cannot import non-existent remote object",
                format!("No {} found for import id {}", R::TYPE_NAME, id),
            ));
        }
        self.log_state("Import completed", &state);
        Ok(Value::Object(state))
    }
}

/// Every resource type served by the provider.
pub fn all() -> Vec<Box<dyn ResourceHandler>> {
    vec![
        Box::new(ResourceAdapter(rolegroup::RolegroupResource)),
        Box::new(ResourceAdapter(idp_oidc::OidcResource)),
        Box::new(ResourceAdapter(amq::QueueResource)),
    ]
}

/// Current time in the RFC 850 layout used for `last_updated`.
pub fn rfc850_now() -> String {
    chrono::Utc::now()
        .format("%A, %d-%b-%y %H:%M:%S UTC")
        .to_string()
}

/// Map an API result to `None` on 404 and to an operation error otherwise.
pub(crate) fn found<T>(
    result: Result<T, ApiError>,
    summary: impl FnOnce() -> String,
) -> Result<Option<T>, ProviderError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(ProviderError::api(summary(), &e)),
    }
}

/// Insert `value` under `name` when it is set.
pub(crate) fn put<T: Into<Value>>(map: &mut Map<String, Value>, name: &str, value: Option<T>) {
    if let Some(value) = value {
        map.insert(name.to_string(), value.into());
    }
}

/// Split an import id of the form `a/b/...` into exactly `N` non-empty parts.
pub(crate) fn split_import_id<const N: usize>(
    id: &str,
    format: &str,
) -> Result<[String; N], ProviderError> {
    let parts: Vec<String> = id.split('/').map(str::to_string).collect();
    if parts.len() != N || parts.iter().any(String::is_empty) {
        return Err(ProviderError::InvalidRequest(format!(
            "Unexpected import id '{}', expected {}",
            id, format
        )));
    }
    parts.try_into().map_err(|_| {
        ProviderError::InvalidRequest(format!("Unexpected import id '{}', expected {}", id, format))
    })
}
