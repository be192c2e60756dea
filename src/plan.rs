//! Provider-side planning.
//!
//! The host proposes a new state from configuration; [`plan_resource`] fills
//! schema defaults, carries computed values over from the prior state and
//! reports which attributes change and whether the change forces replacement.

use serde_json::{Map, Value};

use crate::schema::{Attribute, Block, Schema};
use crate::types::{AttributeChange, PlanResult};

fn is_computed_only(attr: &Attribute) -> bool {
    attr.flags.computed && !attr.flags.required && !attr.flags.optional
}

fn present(map: &Map<String, Value>, name: &str) -> Option<Value> {
    map.get(name).filter(|v| !v.is_null()).cloned()
}

fn sorted_keys<V>(map: &std::collections::HashMap<String, V>) -> Vec<&String> {
    let mut keys: Vec<_> = map.keys().collect();
    keys.sort();
    keys
}

/// Fill defaults of unset optional attributes, recursing into nested blocks.
pub fn apply_defaults(block: &Block, value: &mut Value) {
    if let Value::Object(map) = value {
        fill_defaults(block, map);
    }
}

fn fill_defaults(block: &Block, map: &mut Map<String, Value>) {
    for (name, attr) in &block.attributes {
        if let Some(default) = &attr.default {
            if present(map, name).is_none() {
                map.insert(name.clone(), default.clone());
            }
        }
    }

    for (name, nested) in &block.blocks {
        match map.get_mut(name) {
            Some(Value::Array(items)) => {
                for item in items {
                    apply_defaults(&nested.block, item);
                }
            },
            Some(item) => apply_defaults(&nested.block, item),
            None => {},
        }
    }
}

/// Copy computed-only values of `prior` into `planned` where `planned` has none.
fn carry_computed(block: &Block, prior: &Map<String, Value>, planned: &mut Map<String, Value>) {
    for (name, attr) in &block.attributes {
        if is_computed_only(attr) && present(planned, name).is_none() {
            if let Some(value) = present(prior, name) {
                planned.insert(name.clone(), value);
            }
        }
    }

    for (name, nested) in &block.blocks {
        match (prior.get(name), planned.get_mut(name)) {
            (Some(Value::Array(before)), Some(Value::Array(after)))
                if before.len() == after.len() =>
            {
                for (b, a) in before.iter().zip(after.iter_mut()) {
                    if let (Value::Object(b), Value::Object(a)) = (b, a) {
                        carry_computed(&nested.block, b, a);
                    }
                }
            },
            (Some(Value::Object(b)), Some(Value::Object(a))) => {
                carry_computed(&nested.block, b, a)
            },
            _ => {},
        }
    }
}

/// Set every computed-only attribute of `block` to null (unknown until applied).
fn clear_computed(block: &Block, planned: &mut Map<String, Value>) {
    for (name, attr) in &block.attributes {
        if is_computed_only(attr) {
            planned.insert(name.clone(), Value::Null);
        }
    }
}

/// Plan a create (no prior state) or an update of one resource.
pub fn plan_resource(schema: &Schema, prior: Option<&Value>, proposed: Value) -> PlanResult {
    let mut planned = match proposed {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    fill_defaults(&schema.block, &mut planned);

    let prior = match prior {
        Some(Value::Object(map)) => map,
        _ => {
            clear_computed(&schema.block, &mut planned);
            let changes = changed_paths(&schema.block, &Map::new(), &planned);
            return PlanResult::with_changes(Value::Object(planned), changes, false);
        },
    };

    carry_computed(&schema.block, prior, &mut planned);

    let changes = changed_paths(&schema.block, prior, &planned);
    let requires_replace = changes.iter().any(|change| {
        schema
            .block
            .attributes
            .get(&change.path)
            .is_some_and(|attr| attr.force_new)
    });
    if requires_replace {
        clear_computed(&schema.block, &mut planned);
    }

    if changes.is_empty() {
        PlanResult::no_change(Value::Object(planned))
    } else {
        PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
    }
}

fn changed_paths(
    block: &Block,
    prior: &Map<String, Value>,
    planned: &Map<String, Value>,
) -> Vec<AttributeChange> {
    let mut changes = Vec::new();

    for name in sorted_keys(&block.attributes) {
        if is_computed_only(&block.attributes[name]) {
            continue;
        }
        let before = present(prior, name).filter(|v| !is_unset(v));
        let after = present(planned, name).filter(|v| !is_unset(v));
        if before != after {
            changes.push(AttributeChange::new(name.clone(), before, after));
        }
    }

    for name in sorted_keys(&block.blocks) {
        let before = present(prior, name).filter(|v| !is_unset(v));
        let after = present(planned, name).filter(|v| !is_unset(v));
        if before != after {
            changes.push(AttributeChange::new(name.clone(), before, after));
        }
    }

    changes
}

/// Null, an empty string and an empty collection all count as "not set".
pub(crate) fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
