use backend::{Backend, BackendSettings, Query};
use models::identity::{Identity, IdentityHandle, NewIdentity};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SERVICE_KEY: &str = "eyJservice";
const ANON_KEY: &str = "eyJanon";

fn backend_for(server: &MockServer) -> Backend {
    Backend::new(BackendSettings::new(server.uri(), ANON_KEY, SERVICE_KEY)).unwrap()
}

#[tokio::test]
async fn select_sends_service_key_and_filters() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/customers"))
        .and(header("apikey", SERVICE_KEY))
        .and(header("authorization", format!("Bearer {SERVICE_KEY}").as_str()))
        .and(query_param("phone", r#"in.("9876543210","+919876543210")"#))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": Uuid::nil(), "phone": "9876543210" }])))
        .expect(1)
        .mount(&server)
        .await;

    let rows: Option<Value> = backend_for(&server)
        .table("customers")
        .select_first(&Query::new().select("*").is_in("phone", ["9876543210", "+919876543210"]))
        .await?;
    assert_eq!(rows.unwrap()["phone"], "9876543210");
    Ok(())
}

#[tokio::test]
async fn insert_conflict_surfaces_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/customers"))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"customers_phone_key\"",
            "details": null,
            "hint": null
        })))
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .table("customers")
        .insert::<_, Value>(&json!({ "phone": "9876543210" }))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert!(err.to_string().contains("customers_phone_key"));
}

#[tokio::test]
async fn upsert_merges_on_conflict_column() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/phone_whitelist"))
        .and(query_param("on_conflict", "phone"))
        .and(|req: &wiremock::Request| {
            req.headers
                .get("prefer")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.contains("resolution=merge-duplicates"))
        })
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "phone": "+919876543210", "active": true })))
        .expect(1)
        .mount(&server)
        .await;

    let row: Value = backend_for(&server)
        .table("phone_whitelist")
        .upsert("phone", &json!({ "phone": "+919876543210", "active": true }))
        .await?;
    assert_eq!(row["active"], true);
    Ok(())
}

#[tokio::test]
async fn count_reads_content_range() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/withdrawals"))
        .and(header("prefer", "count=exact"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-range", "0-24/3573"))
        .mount(&server)
        .await;

    let n = backend_for(&server).table("withdrawals").count(&Query::new()).await?;
    assert_eq!(n, 3573);
    Ok(())
}

#[tokio::test]
async fn guarded_update_returns_no_rows_when_status_moved() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/withdrawals"))
        .and(query_param("id", format!("eq.{id}").as_str()))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let rows: Vec<Value> = backend_for(&server)
        .table("withdrawals")
        .update(&Query::new().eq("id", id).eq("status", "pending"), &json!({ "status": "approved" }))
        .await?;
    assert!(rows.is_empty());
    Ok(())
}

#[tokio::test]
async fn create_user_marks_identity_verified() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/auth/v1/admin/users"))
        .and(body_partial_json(json!({
            "phone": "+919876543210",
            "phone_confirm": true,
            "email_confirm": true,
            "user_metadata": { "full_name": "Asha" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id, "phone": "919876543210" })))
        .expect(1)
        .mount(&server)
        .await;

    let created: Identity = backend_for(&server)
        .auth_admin()
        .create_user(&NewIdentity {
            handle: IdentityHandle::Phone("+919876543210".into()),
            password: "secret1".into(),
            metadata: json!({ "full_name": "Asha" }),
        })
        .await?;
    assert_eq!(created.id, id);
    Ok(())
}

#[tokio::test]
async fn delete_user_targets_identity_id() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("DELETE"))
        .and(path(format!("/auth/v1/admin/users/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    backend_for(&server).auth_admin().delete_user(id).await?;
    Ok(())
}

#[tokio::test]
async fn missing_user_is_none() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/auth/v1/admin/users/[0-9a-f-]+$"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "code": 404, "msg": "User not found" })))
        .mount(&server)
        .await;

    let found = backend_for(&server).auth_admin().get_user(Uuid::new_v4()).await?;
    assert!(found.is_none());
    Ok(())
}

#[tokio::test]
async fn sign_in_uses_anon_key() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", ANON_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok", "expires_in": 3600, "user": { "id": id, "email": "admin@example.com" }
        })))
        .mount(&server)
        .await;

    let session = backend_for(&server)
        .auth_admin()
        .sign_in_with_password(&IdentityHandle::Email("admin@example.com".into()), "pw")
        .await?;
    assert_eq!(session.user.id, id);
    Ok(())
}

#[tokio::test]
async fn function_error_member_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/admin-action"))
        .and(body_partial_json(json!({ "action": "list-staff" })))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "permission denied for table staff" })))
        .mount(&server)
        .await;

    let err = backend_for(&server).functions().invoke("list-staff", &json!({})).await.unwrap_err();
    assert_eq!(err.to_string(), "permission denied for table staff");
}

#[tokio::test]
async fn function_data_is_unwrapped() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/admin-action"))
        .and(body_partial_json(json!({ "action": "list-customers", "payload": {} })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "id": 1 }] })))
        .mount(&server)
        .await;

    let data = backend_for(&server).functions().invoke_data("list-customers", &json!({})).await?;
    assert_eq!(data, json!([{ "id": 1 }]));
    Ok(())
}

#[tokio::test]
async fn rpc_posts_arguments() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_live_stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "collections_today": 12 })))
        .mount(&server)
        .await;

    let stats: Value = backend_for(&server).rpc("get_live_stats", &json!({})).await?;
    assert_eq!(stats["collections_today"], 12);
    Ok(())
}
