//! Resource lifecycles against a mocked Anypoint API.

use anypoint_provider::config::ProviderConfig;
use anypoint_provider::resources::idp_oidc::OidcResource;
use anypoint_provider::resources::rolegroup::RolegroupResource;
use anypoint_provider::resources::{ResourceAdapter, ResourceHandler};
use anypoint_provider::testing::{
    assert_error_contains, assert_plan_no_changes, assert_plan_updates_in_place, test_config, ProviderTester, TestError, TEST_TOKEN,
};
use anypoint_provider::{ProviderContext, ProviderError};
use serde_json::{json, Value};
use wiremock::matchers::{bearer_token, body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ROLEGROUPS: &str = "/accounts/api/organizations/o1/rolegroups";
const ROLEGROUP: &str = "/accounts/api/organizations/o1/rolegroups/rg-1";
const IDPS: &str = "/accounts/api/organizations/o1/identityProviders";
const IDP: &str = "/accounts/api/organizations/o1/identityProviders/idp-1";
const QUEUE: &str =
    "/mq/admin/api/v1/organizations/o1/environments/e1/regions/us-east-1/destinations/queues/orders";

fn rolegroup_json(description: &str) -> Value {
    json!({
        "role_group_id": "rg-1",
        "name": "admins",
        "external_names": ["cn=admins"],
        "description": description,
        "org_id": "o1",
        "editable": true,
        "created_at": "2023-01-01T00:00:00.000Z",
        "updated_at": "2023-01-02T00:00:00.000Z",
        "user_count": 2
    })
}

fn rolegroup_state(description: &str) -> Value {
    json!({
        "id": "rg-1",
        "role_group_id": "rg-1",
        "org_id": "o1",
        "name": "admins",
        "external_names": ["cn=admins"],
        "description": description,
        "editable": true,
        "created_at": "2023-01-01T00:00:00.000Z",
        "updated_at": "2023-01-02T00:00:00.000Z"
    })
}

fn context(server: &MockServer) -> ProviderContext {
    let config = ProviderConfig::from_value(&test_config(&server.uri())).unwrap();
    ProviderContext::new(config).unwrap()
}

async fn mount_rolegroup_get(server: &MockServer, description: &str) {
    Mock::given(method("GET"))
        .and(path(ROLEGROUP))
        .and(bearer_token(TEST_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(rolegroup_json(description)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_rolegroup_create_reads_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ROLEGROUPS))
        .and(bearer_token(TEST_TOKEN))
        .and(body_json(json!({
            "name": "admins",
            "external_names": ["cn=admins"],
            "description": "Administrators"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"role_group_id": "rg-1"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_rolegroup_get(&server, "Administrators").await;

    let tester = ProviderTester::configured_for(&server.uri()).await.unwrap();
    let state = tester
        .lifecycle_create(
            "anypoint_rolegroup",
            json!({
                "org_id": "o1",
                "name": "admins",
                "external_names": ["cn=admins"],
                "description": "Administrators"
            }),
        )
        .await
        .unwrap();

    assert_eq!(state["id"], "rg-1");
    assert_eq!(state["role_group_id"], "rg-1");
    assert_eq!(state["editable"], true);
    assert_eq!(state["created_at"], "2023-01-01T00:00:00.000Z");
    assert!(state.get("user_count").is_none());
}

#[tokio::test]
async fn test_rolegroup_create_keeps_identity_when_read_back_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ROLEGROUPS))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"role_group_id": "rg-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ROLEGROUP))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let tester = ProviderTester::configured_for(&server.uri()).await.unwrap();
    let err = tester
        .create("anypoint_rolegroup", json!({"org_id": "o1", "name": "admins"}))
        .await
        .unwrap_err();

    let (state, err) = err.into_parts();
    let state = state.unwrap();
    assert_eq!(state["id"], "rg-1");
    assert_eq!(state["org_id"], "o1");
    let diagnostics = err.into_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].summary, "Unable to get rolegroup");
    assert_eq!(diagnostics[0].detail.as_deref(), Some("boom"));
}

#[tokio::test]
async fn test_rolegroup_update_writes_watched_change() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(ROLEGROUP))
        .and(body_partial_json(json!({"description": "Operators"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(rolegroup_json("Operators")))
        .expect(1)
        .mount(&server)
        .await;
    mount_rolegroup_get(&server, "Operators").await;

    let tester = ProviderTester::configured_for(&server.uri()).await.unwrap();
    let state = tester
        .lifecycle_update(
            "anypoint_rolegroup",
            rolegroup_state("Administrators"),
            json!({
                "org_id": "o1",
                "name": "admins",
                "external_names": ["cn=admins"],
                "description": "Operators"
            }),
        )
        .await
        .unwrap();

    assert_eq!(state["id"], "rg-1");
    assert_eq!(state["description"], "Operators");
    assert!(state["last_updated"].as_str().is_some_and(|s| s.ends_with(" UTC")));
}

#[tokio::test]
async fn test_rolegroup_update_without_changes_skips_write() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(ROLEGROUP))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_rolegroup_get(&server, "Administrators").await;

    let tester = ProviderTester::configured_for(&server.uri()).await.unwrap();
    let prior = rolegroup_state("Administrators");
    let plan = tester
        .plan_update("anypoint_rolegroup", prior.clone(), prior.clone())
        .await
        .unwrap();
    assert_plan_no_changes(&plan);

    let state = tester
        .update("anypoint_rolegroup", prior, plan.planned_state)
        .await
        .unwrap();
    assert!(state.get("last_updated").map_or(true, Value::is_null));
}

#[tokio::test]
async fn test_read_of_deleted_object_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ROLEGROUP))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .mount(&server)
        .await;

    let tester = ProviderTester::configured_for(&server.uri()).await.unwrap();
    let state = tester
        .read("anypoint_rolegroup", rolegroup_state("Administrators"))
        .await
        .unwrap();
    assert!(state.is_none());
}

#[tokio::test]
async fn test_read_failure_reports_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ROLEGROUP))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let tester = ProviderTester::configured_for(&server.uri()).await.unwrap();
    let err = tester
        .read("anypoint_rolegroup", rolegroup_state("Administrators"))
        .await
        .unwrap_err();
    match err {
        ProviderError::Operation { summary, detail } => {
            assert_eq!(summary, "Unable to get rolegroup");
            assert_eq!(detail, "upstream exploded");
        },
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_transport_failure_has_detail() {
    let tester = ProviderTester::configured_for("http://127.0.0.1:1").await.unwrap();
    let err = tester
        .read("anypoint_rolegroup", rolegroup_state("Administrators"))
        .await
        .unwrap_err();
    match err {
        ProviderError::Operation { summary, detail } => {
            assert_eq!(summary, "Unable to get rolegroup");
            assert!(detail.contains("127.0.0.1"), "detail: {detail}");
        },
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_clears_id() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(ROLEGROUP))
        .and(bearer_token(TEST_TOKEN))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let handler = ResourceAdapter(RolegroupResource);
    let cleared = handler
        .delete(&context(&server), rolegroup_state("Administrators"))
        .await
        .unwrap();
    assert!(cleared["id"].is_null());
    assert_eq!(cleared["name"], "admins");
}

#[tokio::test]
async fn test_delete_failure_keeps_summary() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(ROLEGROUP))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let tester = ProviderTester::configured_for(&server.uri()).await.unwrap();
    let err = tester
        .delete("anypoint_rolegroup", rolegroup_state("Administrators"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Unable to delete rolegroup: forbidden");
}

#[tokio::test]
async fn test_rolegroup_import() {
    let server = MockServer::start().await;
    mount_rolegroup_get(&server, "Administrators").await;

    let tester = ProviderTester::configured_for(&server.uri()).await.unwrap();
    let imported = tester
        .import_resource("anypoint_rolegroup", "o1/rg-1")
        .await
        .unwrap();
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].resource_type, "anypoint_rolegroup");
    assert_eq!(imported[0].state["id"], "rg-1");
    assert_eq!(imported[0].state["name"], "admins");

    let err = tester
        .import_resource("anypoint_rolegroup", "rg-1")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_import_of_missing_object_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ROLEGROUP))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tester = ProviderTester::configured_for(&server.uri()).await.unwrap();
    let err = tester
        .import_resource("anypoint_rolegroup", "o1/rg-1")
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("Cannot import non-existent remote object"));
}

fn oidc_config(provider: Value) -> Value {
    let mut block = json!({
        "token_url": "https://idp.example.com/token",
        "userinfo_url": "https://idp.example.com/userinfo",
        "authorize_url": "https://idp.example.com/authorize",
        "issuer": "https://idp.example.com"
    });
    if let (Some(block), Value::Object(extra)) = (block.as_object_mut(), provider) {
        block.extend(extra);
    }
    json!({"org_id": "o1", "name": "corp-sso", "oidc_provider": [block]})
}

fn idp_json(client: Value) -> Value {
    json!({
        "provider_id": "idp-1",
        "org_id": "o1",
        "name": "corp-sso",
        "type": {"name": "openid", "description": "OpenID Connect"},
        "oidc_provider": {
            "client": client,
            "urls": {
                "token": "https://idp.example.com/token",
                "userinfo": "https://idp.example.com/userinfo",
                "authorize": "https://idp.example.com/authorize"
            },
            "issuer": "https://idp.example.com"
        },
        "service_provider": {"urls": {"sign_on": "https://anypoint/sso"}},
        "allow_untrusted_certificates": true
    })
}

#[tokio::test]
async fn test_idp_validation_rejects_both_registration_modes() {
    let tester = ProviderTester::new(anypoint_provider::AnypointProvider::new());
    let config = oidc_config(json!({
        "client_registration_url": "https://idp.example.com/register",
        "client_credentials_id": "cid",
        "client_credentials_secret": "s3cret"
    }));

    match tester.validate_resource_config("anypoint_idp_oidc", config).await {
        Err(TestError::Diagnostics(diagnostics)) => {
            assert_error_contains(&diagnostics, "mutually exclusive");
        },
        other => panic!("expected diagnostics, got {other:?}"),
    }

    tester
        .validate_resource_config(
            "anypoint_idp_oidc",
            oidc_config(json!({"client_registration_url": "https://idp.example.com/register"})),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_idp_create_prefers_registration_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IDPS))
        .and(body_partial_json(json!({
            "type": {"name": "openid", "description": "OpenID Connect"},
            "oidc_provider": {"client": {"urls": {"register": "https://idp.example.com/register"}}}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"provider_id": "idp-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(IDP))
        .respond_with(ResponseTemplate::new(200).set_body_json(idp_json(json!({
            "redirect_url": "https://anypoint/redirect",
            "urls": {"register": "https://idp.example.com/register"}
        }))))
        .mount(&server)
        .await;

    let handler = ResourceAdapter(OidcResource);
    let config = oidc_config(json!({
        "client_registration_url": "https://idp.example.com/register",
        "client_credentials_id": "cid",
        "client_credentials_secret": "s3cret"
    }));
    let state = handler.create(&context(&server), config).await.unwrap();
    assert_eq!(state["id"], "idp-1");
    assert_eq!(state["sp_sign_on_url"], "https://anypoint/sso");

    let requests = server.received_requests().await.unwrap();
    let post = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .unwrap();
    let body: Value = serde_json::from_slice(&post.body).unwrap();
    assert!(body["oidc_provider"]["client"].get("credentials").is_none());
}

#[tokio::test]
async fn test_idp_read_keeps_write_only_secret() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IDPS))
        .and(body_partial_json(json!({
            "oidc_provider": {"client": {"credentials": {"id": "cid", "secret": "s3cret"}}}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"provider_id": "idp-1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(IDP))
        .respond_with(ResponseTemplate::new(200).set_body_json(idp_json(json!({
            "redirect_url": "https://anypoint/redirect",
            "credentials": {"id": "cid"}
        }))))
        .mount(&server)
        .await;

    let tester = ProviderTester::configured_for(&server.uri()).await.unwrap();
    let state = tester
        .lifecycle_create(
            "anypoint_idp_oidc",
            oidc_config(json!({"client_credentials_id": "cid", "client_credentials_secret": "s3cret"})),
        )
        .await
        .unwrap();

    let block = &state["oidc_provider"][0];
    assert_eq!(block["client_credentials_id"], "cid");
    assert_eq!(block["client_credentials_secret"], "s3cret");
    assert_eq!(block["redirect_url"], "https://anypoint/redirect");
}

#[tokio::test]
async fn test_idp_update_patches_without_type_name() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(IDP))
        .and(body_partial_json(json!({
            "name": "corp-sso-v2",
            "type": {"description": "OpenID Connect"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(IDP))
        .respond_with(ResponseTemplate::new(200).set_body_json(idp_json(json!({
            "urls": {"register": "https://idp.example.com/register"}
        }))))
        .mount(&server)
        .await;

    let handler = ResourceAdapter(OidcResource);
    let registration = json!({"client_registration_url": "https://idp.example.com/register"});
    let mut prior = oidc_config(registration.clone());
    prior["id"] = json!("idp-1");
    let mut planned = oidc_config(registration);
    planned["id"] = json!("idp-1");
    planned["name"] = json!("corp-sso-v2");

    handler.update(&context(&server), prior, planned).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let patch = requests
        .iter()
        .find(|r| r.method.as_str() == "PATCH")
        .unwrap();
    let body: Value = serde_json::from_slice(&patch.body).unwrap();
    assert!(body["type"].get("name").is_none());
}

#[tokio::test]
async fn test_queue_create_and_delete() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(QUEUE))
        .and(bearer_token(TEST_TOKEN))
        .and(body_json(json!({"defaultTtl": 604800000, "defaultLockTtl": 120000, "fifo": false})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(QUEUE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "queueId": "orders",
            "defaultTtl": 604800000,
            "defaultLockTtl": 120000,
            "type": "queue",
            "encrypted": false,
            "fifo": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(QUEUE))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let tester = ProviderTester::configured_for(&server.uri()).await.unwrap();
    let state = tester
        .lifecycle_create(
            "anypoint_amq",
            json!({
                "org_id": "o1",
                "env_id": "e1",
                "region_id": "us-east-1",
                "queue_id": "orders",
                "default_ttl": 604800000,
                "default_lock_ttl": 120000,
                "fifo": false,
                "dead_letter_queue_id": ""
            }),
        )
        .await
        .unwrap();
    assert_eq!(state["id"], "o1/e1/us-east-1/orders");
    assert_eq!(state["type"], "queue");

    tester.delete("anypoint_amq", state).await.unwrap();
}

fn queue_state(default_ttl: i64) -> Value {
    json!({
        "id": "o1/e1/us-east-1/orders",
        "org_id": "o1",
        "env_id": "e1",
        "region_id": "us-east-1",
        "queue_id": "orders",
        "default_ttl": default_ttl,
        "default_lock_ttl": 120000,
        "fifo": false,
        "type": "queue"
    })
}

async fn mount_queue_get(server: &MockServer, default_ttl: i64) {
    Mock::given(method("GET"))
        .and(path(QUEUE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "queueId": "orders",
            "defaultTtl": default_ttl,
            "defaultLockTtl": 120000,
            "type": "queue",
            "fifo": false
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_queue_update_puts_new_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(QUEUE))
        .and(bearer_token(TEST_TOKEN))
        .and(body_json(json!({"defaultTtl": 3600000, "defaultLockTtl": 120000, "fifo": false})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_queue_get(&server, 3600000).await;

    let tester = ProviderTester::configured_for(&server.uri()).await.unwrap();
    let prior = queue_state(604800000);
    let mut proposed = prior.clone();
    proposed["default_ttl"] = json!(3600000);
    let plan = tester
        .plan_update("anypoint_amq", prior.clone(), proposed.clone())
        .await
        .unwrap();
    assert_plan_updates_in_place(&plan);

    let state = tester
        .lifecycle_update("anypoint_amq", prior, proposed)
        .await
        .unwrap();
    assert_eq!(state["id"], "o1/e1/us-east-1/orders");
    assert_eq!(state["default_ttl"], 3600000);
}

#[tokio::test]
async fn test_queue_update_without_watched_change_skips_put() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(QUEUE))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_queue_get(&server, 604800000).await;

    let tester = ProviderTester::configured_for(&server.uri()).await.unwrap();
    let prior = queue_state(604800000);
    let state = tester
        .update("anypoint_amq", prior.clone(), prior)
        .await
        .unwrap();
    assert_eq!(state["default_ttl"], 604800000);
    assert_eq!(state["type"], "queue");
}
