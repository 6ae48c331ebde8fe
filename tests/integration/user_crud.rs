//! Integration tests for user CRUD over real HTTP, including the
//! silent-filtering policy for requested pending tasks.

use serde_json::{Value, json};
use tasklink_server::api;

async fn spawn_server() -> (String, tokio::task::JoinHandle<()>) {
    let (addr, handle) = api::start_server("127.0.0.1:0")
        .await
        .expect("failed to start test server");
    (format!("http://{addr}/api"), handle)
}

async fn post_json(client: &reqwest::Client, url: &str, payload: &Value) -> (u16, Value) {
    let resp = client.post(url).json(payload).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn get_json(client: &reqwest::Client, url: &str) -> (u16, Value) {
    let resp = client.get(url).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn create_user_returns_201_with_envelope() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let (status, body) = post_json(
        &client,
        &format!("{base}/users"),
        &json!({"name": "Alice", "email": "alice@example.com"}),
    )
    .await;

    assert_eq!(status, 201);
    assert_eq!(body["message"], "OK");
    let user = &body["data"];
    assert_eq!(user["name"], "Alice");
    assert_eq!(user["email"], "alice@example.com");
    assert_eq!(user["pendingTasks"], json!([]));
    assert!(user["id"].is_string());
    assert!(user["dateCreated"].is_u64());
}

#[tokio::test]
async fn create_user_requires_name_and_email() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    for payload in [
        json!({"email": "a@example.com"}),
        json!({"name": "Alice"}),
        json!({"name": "", "email": "a@example.com"}),
    ] {
        let (status, body) = post_json(&client, &format!("{base}/users"), &payload).await;
        assert_eq!(status, 400);
        assert_eq!(body["message"], "name and email are required");
    }
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();
    let users_url = format!("{base}/users");

    let (status, _) = post_json(
        &client,
        &users_url,
        &json!({"name": "Alice", "email": "shared@example.com"}),
    )
    .await;
    assert_eq!(status, 201);

    let (status, body) = post_json(
        &client,
        &users_url,
        &json!({"name": "Bob", "email": "shared@example.com"}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "email already exists");
}

#[tokio::test]
async fn pending_tasks_are_filtered_on_create() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    // A completed task and a nonexistent id: both dropped silently, and the
    // completed task's assignment fields stay untouched.
    let (_, completed) = post_json(
        &client,
        &format!("{base}/tasks"),
        &json!({"name": "done", "deadline": 1, "completed": true}),
    )
    .await;
    let completed_id = completed["data"]["id"].as_str().unwrap();

    let (status, body) = post_json(
        &client,
        &format!("{base}/users"),
        &json!({
            "name": "Alice",
            "email": "alice@example.com",
            "pendingTasks": [completed_id, "00000000-0000-7000-8000-000000000000"]
        }),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(body["data"]["pendingTasks"], json!([]));

    let (_, task) = get_json(&client, &format!("{base}/tasks/{completed_id}")).await;
    assert_eq!(task["data"]["assignedUser"], Value::Null);
    assert_eq!(task["data"]["assignedUserName"], "unassigned");
}

#[tokio::test]
async fn valid_pending_task_is_claimed_on_create() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let (_, task) = post_json(
        &client,
        &format!("{base}/tasks"),
        &json!({"name": "open", "deadline": 1}),
    )
    .await;
    let task_id = task["data"]["id"].as_str().unwrap();

    let (status, body) = post_json(
        &client,
        &format!("{base}/users"),
        &json!({"name": "Alice", "email": "alice@example.com", "pendingTasks": [task_id]}),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(body["data"]["pendingTasks"], json!([task_id]));

    let (_, fetched) = get_json(&client, &format!("{base}/tasks/{task_id}")).await;
    assert_eq!(fetched["data"]["assignedUser"], body["data"]["id"]);
    assert_eq!(fetched["data"]["assignedUserName"], "Alice");
}

#[tokio::test]
async fn get_user_missing_is_404() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(
        &client,
        &format!("{base}/users/00000000-0000-7000-8000-000000000000"),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Not Found");
}

#[tokio::test]
async fn replace_user_updates_fields_and_checks_email() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();
    let users_url = format!("{base}/users");

    let (_, alice) = post_json(
        &client,
        &users_url,
        &json!({"name": "Alice", "email": "alice@example.com"}),
    )
    .await;
    let (_, _bob) = post_json(
        &client,
        &users_url,
        &json!({"name": "Bob", "email": "bob@example.com"}),
    )
    .await;
    let alice_id = alice["data"]["id"].as_str().unwrap();

    // Keeping her own email on replace is fine.
    let resp = client
        .put(format!("{users_url}/{alice_id}"))
        .json(&json!({"name": "Alicia", "email": "alice@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Alicia");
    assert_eq!(body["data"]["dateCreated"], alice["data"]["dateCreated"]);

    // Taking Bob's email is not.
    let resp = client
        .put(format!("{users_url}/{alice_id}"))
        .json(&json!({"name": "Alicia", "email": "bob@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "email already exists");
}

#[tokio::test]
async fn delete_user_returns_204_and_removes() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let (_, alice) = post_json(
        &client,
        &format!("{base}/users"),
        &json!({"name": "Alice", "email": "alice@example.com"}),
    )
    .await;
    let id = alice["data"]["id"].as_str().unwrap();

    let resp = client
        .delete(format!("{base}/users/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);
    assert!(resp.bytes().await.unwrap().is_empty());

    let (status, _) = get_json(&client, &format!("{base}/users/{id}")).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn create_user_rejects_unknown_fields() {
    let (base, _handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let (status, _) = post_json(
        &client,
        &format!("{base}/users"),
        &json!({"name": "Alice", "email": "a@example.com", "role": "admin"}),
    )
    .await;
    assert_eq!(status, 400);
}
