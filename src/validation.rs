//! Schema validation helpers.
//!
//! [`validate`] checks a `serde_json::Value` against a [`Schema`] before it is
//! handed to a resource or data source, and [`check_schema`] checks that a
//! schema itself is well formed.
//!
//! # Example
//!
//! ```
//! use anypoint_provider::schema::{Attribute, Schema};
//! use anypoint_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("org_id", Attribute::required_string())
//!     .with_attribute("max_deliveries", Attribute::optional_int64());
//!
//! let diagnostics = validate(&schema, &json!({"org_id": "aa1f", "max_deliveries": 10}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"org_id": "aa1f", "max_deliveries": "ten"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("max_deliveries".to_string()));
//! ```

use crate::schema::{
    Attribute, AttributeType, Block, Diagnostic, DiagnosticSeverity, NestedBlock, ProviderSchema,
    Schema,
};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - Nested blocks are validated recursively with min/max item constraints
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check that a schema is well formed.
///
/// Every attribute, at any depth, must carry exactly one of `required`,
/// `optional` or `computed`, and only optional attributes may declare a
/// default.
pub fn check_schema(schema: &Schema) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    check_block(&schema.block, "", &mut diagnostics);
    diagnostics
}

/// Run [`check_schema`] over the provider configuration and every resource
/// and data source schema, prefixing attribute paths with the type name.
pub fn check_provider_schema(schema: &ProviderSchema) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    check_block(&schema.provider.block, "provider", &mut diagnostics);
    for (name, resource) in &schema.resources {
        check_block(&resource.block, name, &mut diagnostics);
    }
    for (name, data_source) in &schema.data_sources {
        check_block(&data_source.block, &format!("data.{}", name), &mut diagnostics);
    }
    diagnostics
}

fn check_block(block: &Block, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        let modes = attr.flags.mode_count();
        if modes != 1 {
            diagnostics.push(
                Diagnostic::error(format!("Invalid flags for attribute '{}'", attr_path))
                    .with_detail(format!(
                        "Exactly one of required, optional or computed must be set, found {}",
                        modes
                    ))
                    .with_attribute(&attr_path),
            );
        }
        if attr.default.is_some() && !attr.flags.optional {
            diagnostics.push(
                Diagnostic::error(format!("Invalid default for attribute '{}'", attr_path))
                    .with_detail("Only optional attributes may declare a default")
                    .with_attribute(&attr_path),
            );
        }
    }
    for (name, nested) in &block.blocks {
        check_block(&nested.block, &join_path(path, name), diagnostics);
    }
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => {
            return;
        },
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value)))
                    .with_attribute_if_not_empty(path),
            );
            return;
        },
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }

    for (name, nested_block) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested_block, obj.get(name), &block_path, diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
        },
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) => {
            if let Some(arr) = value.as_array() {
                validate_elements(element_type, arr, path, diagnostics);
            } else {
                diagnostics.push(type_error(path, "list", value));
            }
        },
        AttributeType::Set(element_type) => {
            if let Some(arr) = value.as_array() {
                validate_elements(element_type, arr, path, diagnostics);
                if let Some(dup) = first_duplicate(arr) {
                    diagnostics.push(
                        Diagnostic::error(format!("Duplicate set element in '{}'", path))
                            .with_detail(format!("{} appears more than once", dup))
                            .with_attribute(path),
                    );
                }
            } else {
                diagnostics.push(type_error(path, "set", value));
            }
        },
        AttributeType::Map(value_type) => {
            if let Some(obj) = value.as_object() {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "map", value));
            }
        },
    }
}

fn validate_elements(
    element_type: &AttributeType,
    elements: &[Value],
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (i, elem) in elements.iter().enumerate() {
        let elem_path = format!("{}.{}", path, i);
        validate_attribute_type(element_type, elem, &elem_path, diagnostics);
    }
}

fn first_duplicate(elements: &[Value]) -> Option<&Value> {
    elements
        .iter()
        .enumerate()
        .find(|(i, elem)| elements[..*i].contains(elem))
        .map(|(_, elem)| elem)
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    validate_list_block(nested, value, path, diagnostics)
}

fn validate_list_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s)",
                        path, nested.min_items
                    ))
                    .with_attribute(path),
                );
            }
        },
        Some(Value::Array(arr)) => {
            let len = arr.len() as u32;

            if len < nested.min_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s), got {}",
                        path, nested.min_items, len
                    ))
                    .with_attribute(path),
                );
            }

            // 0 means unlimited
            if nested.max_items > 0 && len > nested.max_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' allows at most {} item(s), got {}",
                        path, nested.max_items, len
                    ))
                    .with_attribute(path),
                );
            }

            for (i, item) in arr.iter().enumerate() {
                let item_path = format!("{}.{}", path, i);
                validate_block(&nested.block, item, &item_path, diagnostics);
            }
        },
        Some(v) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
        },
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.is_i64() {
                true
            } else if let Some(f) = n.as_f64() {
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        },
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic {
        severity: DiagnosticSeverity::Error,
        summary: format!("Invalid type for attribute '{}'", path),
        detail: Some(format!("Expected {}, got {}", expected, value_type_name(got))),
        attribute: Some(path.to_string()),
    }
}

trait DiagnosticExt {
    fn with_attribute_if_not_empty(self, path: &str) -> Self;
}

impl DiagnosticExt for Diagnostic {
    fn with_attribute_if_not_empty(self, path: &str) -> Self {
        if path.is_empty() {
            self
        } else {
            self.with_attribute(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeFlags, Block, NestedBlock, Schema};
    use serde_json::json;

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("org_id", Attribute::required_string());

        assert!(validate(&schema, &json!({"org_id": "aa1f"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("org_id".to_string()));

        assert_eq!(validate(&schema, &json!({"org_id": null})).len(), 1);

        let diagnostics = validate(&schema, &json!({"org_id": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_optional_attribute() {
        let schema = Schema::v0().with_attribute("max_deliveries", Attribute::optional_int64());

        assert!(validate(&schema, &json!({"max_deliveries": 10})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"max_deliveries": null})).is_empty());
        assert_eq!(validate(&schema, &json!({"max_deliveries": "ten"})).len(), 1);
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("id", Attribute::computed_string());

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"id": 123})).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute("default_ttl", Attribute::required_int64());

        assert!(validate(&schema, &json!({"default_ttl": 604800000})).is_empty());
        assert!(validate(&schema, &json!({"default_ttl": 42.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"default_ttl": 42.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"default_ttl": "42"})).len(), 1);
    }

    #[test]
    fn test_validate_bool() {
        let schema = Schema::v0().with_attribute("fifo", Attribute::optional_bool());

        assert!(validate(&schema, &json!({"fifo": true})).is_empty());
        assert_eq!(validate(&schema, &json!({"fifo": "true"})).len(), 1);
    }

    #[test]
    fn test_validate_list_elements() {
        let schema = Schema::v0().with_attribute(
            "scopes",
            Attribute::new(
                AttributeType::list(AttributeType::String),
                AttributeFlags::optional(),
            ),
        );

        assert!(validate(&schema, &json!({"scopes": ["openid", "email"]})).is_empty());

        let diagnostics = validate(&schema, &json!({"scopes": ["openid", 7]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("scopes.1".to_string()));

        assert_eq!(validate(&schema, &json!({"scopes": "openid"})).len(), 1);
    }

    #[test]
    fn test_validate_set_rejects_duplicates() {
        let schema = Schema::v0().with_attribute(
            "external_names",
            Attribute::new(
                AttributeType::set(AttributeType::String),
                AttributeFlags::optional(),
            ),
        );

        assert!(validate(&schema, &json!({"external_names": ["admins", "devs"]})).is_empty());

        let diagnostics = validate(&schema, &json!({"external_names": ["admins", "admins"]}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Duplicate"));
    }

    #[test]
    fn test_validate_map() {
        let schema = Schema::v0().with_attribute(
            "labels",
            Attribute::new(
                AttributeType::map(AttributeType::String),
                AttributeFlags::optional(),
            ),
        );

        assert!(validate(&schema, &json!({"labels": {"team": "core"}})).is_empty());
        let diagnostics = validate(&schema, &json!({"labels": {"team": 1}}));
        assert_eq!(diagnostics[0].attribute, Some("labels.team".to_string()));
    }

    #[test]
    fn test_validate_set_block_max_items() {
        let schema = Schema::v0().with_block(
            "params",
            NestedBlock::set(
                Block::new()
                    .with_attribute("offset", Attribute::optional_int64())
                    .with_attribute("limit", Attribute::optional_int64()),
            )
            .with_max_items(1),
        );

        assert!(validate(&schema, &json!({"params": [{"limit": 50}]})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());

        let diagnostics = validate(&schema, &json!({"params": [{"limit": 1}, {"limit": 2}]}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at most 1"));
    }

    #[test]
    fn test_validate_block_min_items_and_nested_paths() {
        let schema = Schema::v0().with_block(
            "oidc_provider",
            NestedBlock::set(Block::new().with_attribute("issuer", Attribute::required_string()))
                .with_min_items(1)
                .with_max_items(1),
        );

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at least 1"));

        let diagnostics = validate(&schema, &json!({"oidc_provider": [{}]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("oidc_provider.0.issuer".to_string())
        );

        let diagnostics = validate(&schema, &json!({"oidc_provider": {"issuer": "x"}}));
        assert!(diagnostics[0].summary.contains("Expected list"));
    }

    #[test]
    fn test_validate_non_object_root() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());
        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, None);
    }

    #[test]
    fn test_validate_result() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());
        assert!(validate_result(&schema, &json!({"name": "admins"})).is_ok());
        assert_eq!(validate_result(&schema, &json!({})).unwrap_err().len(), 1);
    }

    #[test]
    fn test_check_schema_accepts_single_modes() {
        let schema = Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute(
                "allow_untrusted_certificates",
                Attribute::optional_bool().with_default(json!(true)),
            );
        assert!(check_schema(&schema).is_empty());
    }

    #[test]
    fn test_check_schema_rejects_mixed_modes_in_nested_blocks() {
        let mut both = Attribute::optional_string();
        both.flags.computed = true;

        let schema = Schema::v0().with_block(
            "oidc_provider",
            NestedBlock::set(
                Block::new()
                    .with_attribute("issuer", both)
                    .with_attribute("scopes", Attribute::new(AttributeType::String, AttributeFlags::default())),
            ),
        );

        let mut paths: Vec<_> = check_schema(&schema)
            .into_iter()
            .filter_map(|d| d.attribute)
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["oidc_provider.issuer", "oidc_provider.scopes"]);
    }

    #[test]
    fn test_check_schema_rejects_default_on_required() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::required_string().with_default(json!("x")));
        let diagnostics = check_schema(&schema);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid default"));
    }

    #[test]
    fn test_check_provider_schema_prefixes_paths() {
        let schema = ProviderSchema::new().with_data_source(
            "anypoint_env",
            Schema::v0().with_attribute(
                "name",
                Attribute::new(AttributeType::String, AttributeFlags::default()),
            ),
        );
        let diagnostics = check_provider_schema(&schema);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("data.anypoint_env.name".to_string())
        );
    }
}
