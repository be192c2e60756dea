//! Testing utilities for the provider.
//!
//! [`ProviderTester`] drives a `ProviderService` directly, without a gRPC
//! server, and the assertion helpers check plans and diagnostics.
//!
//! # Example
//!
//! ```ignore
//! use anypoint_provider::testing::ProviderTester;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_rolegroup() {
//!     let server = wiremock::MockServer::start().await;
//!     // mount mocks for the role-groups API ...
//!     let tester = ProviderTester::configured_for(&server.uri()).await.unwrap();
//!
//!     let state = tester
//!         .lifecycle_create("anypoint_rolegroup", json!({"org_id": "o1", "name": "admins"}))
//!         .await
//!         .unwrap();
//!     assert_eq!(state["name"], "admins");
//! }
//! ```

use serde_json::{json, Value};
use thiserror::Error;

use crate::error::ProviderError;
use crate::provider::AnypointProvider;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// Bearer token used by [`test_config`].
pub const TEST_TOKEN: &str = "test-token";

/// Provider configuration routing every API call to `base_url`.
pub fn test_config(base_url: &str) -> Value {
    json!({
        "access_token": TEST_TOKEN,
        "base_url": base_url,
        "timeout": 5,
    })
}

/// A test harness wrapping a provider.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl ProviderTester<AnypointProvider> {
    /// An Anypoint provider configured against a mock server.
    pub async fn configured_for(base_url: &str) -> Result<Self, TestError> {
        let tester = Self::new(AnypointProvider::new());
        tester.configure(test_config(base_url)).await?;
        Ok(tester)
    }
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Configure the provider; error diagnostics become [`TestError::Diagnostics`].
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a creation.
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan an update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Create a resource.
    pub async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Refresh a resource; `None` when it is gone.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update a resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import a resource by id.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Validate a data source configuration.
    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_data_source_config(data_source_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Read a data source.
    pub async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    /// Plan, create, then read back. Fails if the object vanished in between.
    pub async fn lifecycle_create(&self, resource_type: &str, config: Value) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created)
            .await?
            .ok_or_else(|| vanished(resource_type, "create"))
    }

    /// Plan, update, then read back.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read(resource_type, updated)
            .await?
            .ok_or_else(|| vanished(resource_type, "update"))
    }
}

fn vanished(resource_type: &str, operation: &str) -> ProviderError {
    ProviderError::operation(
        format!("Unable to read {} after {}", resource_type, operation),
        "Object was not found",
    )
}

fn render(diagnostics: &[Diagnostic]) -> String {
    let mut out = format!("Operation failed with {} diagnostic(s):", diagnostics.len());
    for diag in diagnostics {
        out.push_str(&format!("\n  [{:?}] {}", diag.severity, diag.summary));
        if let Some(detail) = &diag.detail {
            out.push_str(&format!(": {}", detail));
        }
        if let Some(attr) = &diag.attribute {
            out.push_str(&format!(" (at {})", attr));
        }
    }
    out
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug, Error)]
pub enum TestError {
    /// The operation returned error diagnostics.
    #[error("{}", render(.0))]
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

fn changed_paths(plan: &PlanResult) -> Vec<&str> {
    plan.changes.iter().map(|c| c.path.as_str()).collect()
}

/// Assert that a plan changes nothing.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        !plan.has_changes(),
        "Expected no changes, but got {:?}",
        changed_paths(plan)
    );
}

/// Assert that a plan requires replacing the object.
///
/// # Panics
///
/// Panics if the plan updates in place.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan updates the object in place.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that an error diagnostic's summary contains `substring`.
///
/// # Panics
///
/// Panics if no error diagnostic matches.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.is_error() && d.summary.contains(substring)),
        "Expected an error containing '{}', got {:?}",
        substring,
        diagnostics.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tester_exposes_schema() {
        let tester = ProviderTester::new(AnypointProvider::new());
        let schema = tester.schema();
        assert!(schema.resources.contains_key("anypoint_idp_oidc"));
        assert!(schema.data_sources.contains_key("anypoint_users"));
        assert!(tester.schema().provider.block.attributes.contains_key("access_token"));
    }

    #[tokio::test]
    async fn test_configure_reports_diagnostics() {
        let tester = ProviderTester::new(AnypointProvider::new());
        let err = tester
            .configure(json!({"access_token": "tok", "timeout": 0}))
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::Diagnostics(_)));
        assert!(err.to_string().contains("Timeout must be positive"));
    }

    #[tokio::test]
    async fn test_configured_for_accepts_mock_url() {
        let tester = ProviderTester::configured_for("http://127.0.0.1:9").await.unwrap();
        tester.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_plan_create_marks_id_computed() {
        let tester = ProviderTester::new(AnypointProvider::new());
        let plan = tester
            .plan_create("anypoint_rolegroup", json!({"org_id": "o1", "name": "admins"}))
            .await
            .unwrap();
        assert_plan_updates_in_place(&plan);
        assert!(plan.changes.iter().any(|c| c.path == "name"));
        assert_eq!(plan.planned_state["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_plan_force_new_attribute_replaces() {
        let tester = ProviderTester::new(AnypointProvider::new());
        let prior = json!({"id": "rg-1", "org_id": "o1", "name": "admins"});
        let plan = tester
            .plan_update("anypoint_rolegroup", prior.clone(), json!({"id": "rg-1", "org_id": "o2", "name": "admins"}))
            .await
            .unwrap();
        assert_plan_replaces(&plan);

        let plan = tester
            .plan_update("anypoint_rolegroup", prior.clone(), prior)
            .await
            .unwrap();
        assert_plan_no_changes(&plan);
    }

    #[test]
    #[should_panic(expected = "Expected an error containing")]
    fn test_assert_error_contains_ignores_warnings() {
        assert_error_contains(&[Diagnostic::warning("configuration is deprecated")], "configuration");
    }

    #[test]
    fn test_assert_error_contains() {
        let diagnostics = vec![Diagnostic::error("Invalid configuration value")];
        assert_error_contains(&diagnostics, "configuration");
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("field1"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = err.to_string();
        assert!(display.contains("First error"));
        assert!(display.contains("(at field1)"));
        assert!(display.contains("Second error: More info"));
    }
}
