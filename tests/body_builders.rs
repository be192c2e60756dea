//! Request bodies never carry unset values.

use anypoint_provider::client::user::UserQuery;
use anypoint_provider::resources::amq::{self, QueueAttrs};
use anypoint_provider::resources::idp_oidc::{self, OidcAttrs, OidcProviderAttrs};
use anypoint_provider::resources::rolegroup::{self, RolegroupAttrs};
use proptest::prelude::*;
use serde_json::Value;

fn contains_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.iter().any(contains_null),
        Value::Object(map) => map.values().any(contains_null),
        _ => false,
    }
}

fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}"
}

proptest! {
    #[test]
    fn rolegroup_body_drops_null_names(
        names in prop::option::of(prop::collection::vec(prop::option::of(name()), 0..5)),
        description in prop::option::of(name()),
    ) {
        let attrs = RolegroupAttrs {
            org_id: "o1".to_string(),
            name: "admins".to_string(),
            external_names: names.clone(),
            description: description.clone(),
        };
        let body = serde_json::to_value(rolegroup::build_body(&attrs)).unwrap();

        prop_assert!(!contains_null(&body));
        prop_assert_eq!(body.get("description").is_some(), description.is_some());
        match names {
            Some(names) => {
                let kept = names.iter().flatten().count();
                prop_assert_eq!(body["external_names"].as_array().map(Vec::len), Some(kept));
            }
            None => prop_assert!(body.get("external_names").is_none()),
        }
    }

    #[test]
    fn queue_body_omits_unset_options(
        encrypted in prop::option::of(any::<bool>()),
        fifo in prop::option::of(any::<bool>()),
        dead_letter in prop::option::of(prop_oneof![Just(String::new()), name()]),
        max_deliveries in prop::option::of(1i64..1000),
    ) {
        let attrs = QueueAttrs {
            org_id: "o1".to_string(),
            env_id: "e1".to_string(),
            region_id: "us-east-1".to_string(),
            queue_id: "orders".to_string(),
            default_ttl: 604800000,
            default_lock_ttl: 120000,
            encrypted,
            fifo,
            dead_letter_queue_id: dead_letter.clone(),
            max_deliveries,
        };
        let body = serde_json::to_value(amq::build_body(&attrs)).unwrap();

        prop_assert!(!contains_null(&body));
        prop_assert_eq!(body.get("encrypted").is_some(), encrypted.is_some());
        prop_assert_eq!(body.get("fifo").is_some(), fifo.is_some());
        prop_assert_eq!(body.get("maxDeliveries").is_some(), max_deliveries.is_some());
        let dead_letter_set = dead_letter.is_some_and(|id| !id.is_empty());
        prop_assert_eq!(body.get("deadLetterQueueId").is_some(), dead_letter_set);
    }

    #[test]
    fn oidc_body_sends_exactly_one_registration_mode(
        register in prop::option::of(prop_oneof![Just(String::new()), name()]),
        client_id in prop::option::of(name()),
        secret in prop::option::of(name()),
    ) {
        let attrs = OidcAttrs {
            org_id: "o1".to_string(),
            name: "corp-sso".to_string(),
            oidc_provider: Some(vec![OidcProviderAttrs {
                token_url: "https://idp/token".to_string(),
                userinfo_url: "https://idp/userinfo".to_string(),
                authorize_url: "https://idp/authorize".to_string(),
                issuer: "https://idp".to_string(),
                client_registration_url: register.clone(),
                client_credentials_id: client_id,
                client_credentials_secret: secret,
                ..Default::default()
            }]),
        };
        let body = serde_json::to_value(idp_oidc::create_body(&attrs)).unwrap();
        let client = body["oidc_provider"]["client"].as_object().unwrap();

        prop_assert!(!contains_null(&body));
        prop_assert_eq!(client.len(), 1);
        let registered = register.is_some_and(|url| !url.is_empty());
        prop_assert_eq!(client.contains_key("urls"), registered);
        prop_assert_eq!(client.contains_key("credentials"), !registered);
    }

    #[test]
    fn user_query_sends_only_set_options(
        offset in prop::option::of(0i64..10_000),
        limit in prop::option::of(0i64..=500),
        user_type in prop::option::of(prop_oneof![Just("all"), Just("host"), Just("proxy")]),
    ) {
        let query = UserQuery {
            offset,
            limit,
            user_type: user_type.map(str::to_string),
        };
        let expected = [offset.is_some(), limit.is_some(), user_type.is_some()]
            .iter()
            .filter(|set| **set)
            .count();
        prop_assert_eq!(query.to_params().len(), expected);
    }
}
