//! Integration tests for task CRUD over real HTTP.

use serde_json::{Value, json};
use tasklink_server::api;

/// Helper: start a server on an OS-assigned port and return the API base URL.
async fn spawn_server() -> (String, tokio::task::JoinHandle<()>) {
    let (addr, handle) = api::start_server("127.0.0.1:0")
        .await
        .expect("failed to start test server");
    (format!("http://{addr}/api"), handle)
}

/// Helper: POST a task payload, returning status and envelope body.
async fn post_task(client: &reqwest::Client, base: &str, payload: &Value) -> (u16, Value) {
    let resp = client
        .post(format!("{base}/tasks"))
        .json(payload)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn get_json(client: &reqwest::Client, url: &str) -> (u16, Value) {
    let resp = client.get(url).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn health_endpoint_answers() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, &base).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "OK");
}

#[tokio::test]
async fn create_task_returns_201_with_envelope() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let (status, body) = post_task(
        &client,
        &base,
        &json!({"name": "Write report", "deadline": 1_700_000_000_000u64}),
    )
    .await;

    assert_eq!(status, 201);
    assert_eq!(body["message"], "OK");
    let task = &body["data"];
    assert_eq!(task["name"], "Write report");
    assert_eq!(task["description"], "");
    assert_eq!(task["completed"], false);
    assert_eq!(task["assignedUser"], Value::Null);
    assert_eq!(task["assignedUserName"], "unassigned");
    assert!(task["id"].is_string());
    assert!(task["dateCreated"].is_u64());
}

#[tokio::test]
async fn create_task_requires_name() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let (status, body) = post_task(&client, &base, &json!({"deadline": 1000})).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "name is required");
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn create_task_requires_deadline() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let (status, body) = post_task(&client, &base, &json!({"name": "t"})).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "deadline (ms epoch) is required");
}

#[tokio::test]
async fn create_task_rejects_unknown_fields() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let (status, _body) = post_task(
        &client,
        &base,
        &json!({"name": "t", "deadline": 1, "priority": "high"}),
    )
    .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn create_task_with_unknown_assignee_is_rejected() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let (status, body) = post_task(
        &client,
        &base,
        &json!({
            "name": "t",
            "deadline": 1,
            "assignedUser": "00000000-0000-7000-8000-000000000000"
        }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "assignedUser does not exist");
}

#[tokio::test]
async fn get_task_round_trip_and_missing() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let (_, created) = post_task(&client, &base, &json!({"name": "t", "deadline": 5})).await;
    let id = created["data"]["id"].as_str().unwrap();

    let (status, body) = get_json(&client, &format!("{base}/tasks/{id}")).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"], created["data"]);

    // Unknown (but valid) id: 404 with the envelope.
    let (status, body) = get_json(
        &client,
        &format!("{base}/tasks/00000000-0000-7000-8000-000000000000"),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Not Found");

    // Malformed id: 400.
    let (status, _) = get_json(&client, &format!("{base}/tasks/not-an-id")).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn get_task_supports_select() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let (_, created) = post_task(&client, &base, &json!({"name": "t", "deadline": 5})).await;
    let id = created["data"]["id"].as_str().unwrap();

    let url = format!("{base}/tasks/{id}?select={}", urlencode(r#"{"name":1}"#));
    let (status, body) = get_json(&client, &url).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"], json!({"id": id, "name": "t"}));
}

#[tokio::test]
async fn replace_task_preserves_id_and_date_created() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let (_, created) = post_task(
        &client,
        &base,
        &json!({"name": "before", "description": "keep me", "deadline": 5}),
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap();
    let date_created = created["data"]["dateCreated"].clone();

    let resp = client
        .put(format!("{base}/tasks/{id}"))
        .json(&json!({"name": "after", "deadline": 9}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();

    let task = &body["data"];
    assert_eq!(task["id"], created["data"]["id"]);
    assert_eq!(task["name"], "after");
    assert_eq!(task["deadline"], 9);
    // Description falls back to the previous value when omitted.
    assert_eq!(task["description"], "keep me");
    assert_eq!(task["dateCreated"], date_created);
}

#[tokio::test]
async fn replace_task_requires_name_and_deadline() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let (_, created) = post_task(&client, &base, &json!({"name": "t", "deadline": 5})).await;
    let id = created["data"]["id"].as_str().unwrap();

    let resp = client
        .put(format!("{base}/tasks/{id}"))
        .json(&json!({"name": "only name"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "name and deadline are required");
}

#[tokio::test]
async fn replace_unknown_task_is_404() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!(
            "{base}/tasks/00000000-0000-7000-8000-000000000000"
        ))
        .json(&json!({"name": "t", "deadline": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn delete_task_returns_document_then_404() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let (_, created) = post_task(&client, &base, &json!({"name": "t", "deadline": 5})).await;
    let id = created["data"]["id"].as_str().unwrap();

    let resp = client
        .delete(format!("{base}/tasks/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], created["data"]["id"]);

    let resp = client
        .delete(format!("{base}/tasks/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

/// Minimal percent-encoding for JSON query parameter values.
fn urlencode(raw: &str) -> String {
    raw.replace('{', "%7B")
        .replace('}', "%7D")
        .replace('"', "%22")
        .replace(':', "%3A")
        .replace(',', "%2C")
}
