//! Integration tests for batch intake and batch status.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_json, post_multipart};
use serde_json::json;
use songbatch_pipeline::TrackStore;

fn prompt(lyrics: &str) -> serde_json::Value {
    json!({"lyrics": lyrics, "style": "lo-fi", "mood": "calm"})
}

// ---------------------------------------------------------------------------
// JSON intake
// ---------------------------------------------------------------------------

#[tokio::test]
async fn json_intake_creates_submitted_tracks() {
    let app = common::build_test_app();
    let response = post_json(
        &app,
        "/api/v1/batches/json",
        json!({
            "parameters": {"model": "v5", "extend_enabled": false, "target_duration_secs": 30},
            "initiator": "tester",
            "prompts": [prompt("One\nverse"), prompt("\nTwo\nverse"), prompt("Three")],
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["status"], "pending");
    assert_eq!(data["initiator"], "tester");
    assert_eq!(data["total_files"], 3);
    assert_eq!(data["parameters"]["model"], "v5");

    let tracks = data["tracks"].as_array().unwrap();
    assert_eq!(tracks.len(), 3);
    let titles: Vec<_> = tracks.iter().map(|t| t["title"].as_str().unwrap()).collect();
    assert_eq!(titles, ["One", "Two", "Three"]);
    for track in tracks {
        assert_eq!(track["status"], "submitted");
        assert_eq!(track["model"], "v5");
        assert_eq!(track["metadata"]["mood"], "calm");
    }
}

#[tokio::test]
async fn processed_batch_completes() {
    let app = common::build_test_app();
    let response = post_json(
        &app,
        "/api/v1/batches/json",
        json!({
            "parameters": {"concurrency": 2, "target_duration_secs": 120},
            "prompts": [prompt("A"), prompt("B")],
        }),
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    app.drain().await;

    let json = body_json(get(&app, &format!("/api/v1/batches/{id}")).await).await;
    assert_eq!(json["data"]["status"], "completed");
    for track in json["data"]["tracks"].as_array().unwrap() {
        assert_eq!(track["status"], "finalized");
        assert_eq!(track["attempts"], 1);
        assert!(track["final_duration_secs"].as_f64().unwrap() > 0.0);
        assert!(track["completed_at"].is_string());
    }
}

#[tokio::test]
async fn invalid_prompt_rejects_whole_request() {
    let app = common::build_test_app();
    let response = post_json(
        &app,
        "/api/v1/batches/json",
        json!({"prompts": [prompt("ok"), {"lyrics": "no style"}]}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"].as_str().unwrap().contains("prompts[1]"));

    // Nothing was persisted.
    assert_eq!(
        get(&app, "/api/v1/batches/1").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn out_of_range_parameters_are_rejected() {
    let app = common::build_test_app();
    let response = post_json(
        &app,
        "/api/v1/batches/json",
        json!({"parameters": {"concurrency": 9}, "prompts": [prompt("x")]}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn oversized_timeout_is_rejected() {
    let app = common::build_test_app();
    let response = post_json(
        &app,
        "/api/v1/batches/json",
        json!({"parameters": {"timeout_secs": 1e20}, "prompts": [prompt("x")]}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert_eq!(
        get(&app, "/api/v1/batches/1").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn empty_prompt_list_is_rejected() {
    let app = common::build_test_app();
    let response = post_json(&app, "/api/v1/batches/json", json!({"prompts": []})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn unknown_batch_returns_404() {
    let app = common::build_test_app();
    let response = get(&app, "/api/v1/batches/999").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Multipart intake
// ---------------------------------------------------------------------------

#[tokio::test]
async fn multipart_intake_reads_files_and_fields() {
    let app = common::build_test_app();
    let response = post_multipart(
        &app,
        "/api/v1/batches",
        &[
            ("files", Some("a.json"), r#"{"letra": "Primeira\nlinha", "estilo": "samba"}"#),
            ("files", Some("b.json"), r#"{"lyrics": "Second", "style": "rock"}"#),
            ("modelo", None, "v5"),
            ("concurrency", None, "1"),
            ("extend_enabled", None, "false"),
            ("initiator", None, "form"),
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["parameters"]["model"], "v5");
    assert_eq!(data["parameters"]["concurrency"], 1);
    assert_eq!(data["parameters"]["extend_enabled"], false);
    assert_eq!(data["initiator"], "form");

    let tracks = data["tracks"].as_array().unwrap();
    assert_eq!(tracks[0]["title"], "Primeira");
    assert_eq!(tracks[0]["style"], "samba");
    assert_eq!(tracks[1]["title"], "Second");

    let batch_id = data["id"].as_i64().unwrap();
    assert_eq!(app.store.list_tracks(batch_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn multipart_bad_file_names_the_file() {
    let app = common::build_test_app();
    let response = post_multipart(
        &app,
        "/api/v1/batches",
        &[
            ("files", Some("good.json"), r#"{"lyrics": "x", "style": "y"}"#),
            ("files", Some("broken.json"), "{not json"),
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("broken.json"));
}

#[tokio::test]
async fn multipart_parameters_field_is_merged() {
    let app = common::build_test_app();
    let response = post_multipart(
        &app,
        "/api/v1/batches",
        &[
            ("files", Some("a.json"), r#"{"lyrics": "x", "style": "y"}"#),
            ("parameters", None, r#"{"retries": 5, "timeout_secs": 60}"#),
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["parameters"]["retries"], 5);
    assert_eq!(json["data"]["parameters"]["timeout_secs"], 60.0);
}

#[tokio::test]
async fn multipart_without_files_is_rejected() {
    let app = common::build_test_app();
    let response = post_multipart(&app, "/api/v1/batches", &[("modelo", None, "v5")]).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let app = common::build_test_app_with(songbatch_api::config::ServerConfig {
        max_upload_bytes: 64,
        ..common::test_config()
    });
    let lyrics = "la ".repeat(100);
    let file = format!(r#"{{"lyrics": "{lyrics}", "style": "pop"}}"#);
    let response = post_multipart(&app, "/api/v1/batches", &[("files", Some("big.json"), &file)]).await;

    assert!(response.status().is_client_error());
}
