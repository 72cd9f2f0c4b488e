pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::board::handlers as board;
use crate::generation::handlers as toolkits;
use crate::render::handlers as sheets;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Toolkit API
        .route("/api/v1/toolkits", post(toolkits::handle_create_toolkit))
        .route("/api/v1/toolkits/status", get(toolkits::handle_get_status))
        .route("/api/v1/toolkits/current", get(toolkits::handle_get_current))
        .route(
            "/api/v1/toolkits/current/sheets",
            get(sheets::handle_sheets),
        )
        .route(
            "/api/v1/toolkits/current/print",
            post(sheets::handle_print),
        )
        // Sequencing board API
        .route("/api/v1/board", get(board::handle_get_board))
        .route("/api/v1/board/drag", post(board::handle_begin_drag))
        .route(
            "/api/v1/board/drop/slot/:index",
            post(board::handle_drop_on_slot),
        )
        .route("/api/v1/board/drop/pool", post(board::handle_drop_on_pool))
        .route("/api/v1/board/cancel", post(board::handle_cancel_drag))
        .route("/api/v1/board/reset", post(board::handle_reset))
        .route("/api/v1/board/check", get(board::handle_check))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::config::Config;
    use crate::generation::schema::tests::sample_answer;
    use crate::session::lock;
    use crate::testing::{ImageReply, ScriptedGenerator};

    fn state_with(generator: ScriptedGenerator) -> AppState {
        AppState::new(Config::for_tests(), Arc::new(generator))
    }

    fn working_state() -> AppState {
        state_with(
            ScriptedGenerator::new(Some(sample_answer().to_string()))
                .with_images(vec![ImageReply::Image; 5]),
        )
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = send(app, method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn wait_for_pipeline(state: &AppState) {
        for _ in 0..200 {
            if !lock(&state.session).status().phase.is_running() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("pipeline did not finish");
    }

    async fn generated_app() -> (AppState, Router) {
        let state = working_state();
        let app = build_router(state.clone());
        let (status, _) = send_json(
            &app,
            "POST",
            "/api/v1/toolkits",
            Some(json!({"topic": "kites", "child_name": "Mia", "difficulty": "Easy"})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        wait_for_pipeline(&state).await;
        (state, app)
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(working_state());
        let (status, body) = send_json(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_empty_topic_is_rejected() {
        let app = build_router(working_state());
        let (status, body) =
            send_json(&app, "POST", "/api/v1/toolkits", Some(json!({"topic": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_generation_publishes_toolkit_and_board() {
        let (_, app) = generated_app().await;

        let (status, body) = send_json(&app, "GET", "/api/v1/toolkits/current", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"]["phase"], "complete");
        assert_eq!(body["toolkit"]["title"], "Mia and the Lost Kite");
        assert_eq!(body["toolkit"]["events"].as_array().unwrap().len(), 4);
        assert_eq!(body["board"]["pool"].as_array().unwrap().len(), 4);
        assert!(body["board"]["slots"]
            .as_array()
            .unwrap()
            .iter()
            .all(Value::is_null));
    }

    #[tokio::test]
    async fn test_second_request_while_running_conflicts() {
        let state = working_state();
        lock(&state.session).begin_generation(Uuid::new_v4()).unwrap();
        let app = build_router(state);

        let (status, body) =
            send_json(&app, "POST", "/api/v1/toolkits", Some(json!({"topic": "bees"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_failed_generation_leaves_no_toolkit() {
        let state = state_with(ScriptedGenerator::new(None));
        let app = build_router(state.clone());

        let (status, _) =
            send_json(&app, "POST", "/api/v1/toolkits", Some(json!({"topic": "bees"}))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        wait_for_pipeline(&state).await;

        let (_, body) = send_json(&app, "GET", "/api/v1/toolkits/status", None).await;
        assert_eq!(body["phase"], "failed");
        assert!(body["error"].is_string());

        let (status, _) = send(&app, "GET", "/api/v1/toolkits/current/sheets", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_drag_and_drop_over_http() {
        let (_, app) = generated_app().await;

        let (_, board) = send_json(&app, "GET", "/api/v1/board", None).await;
        let card_id = board["pool"][1]["id"].as_str().unwrap().to_string();

        let (status, _) = send_json(
            &app,
            "POST",
            "/api/v1/board/drag",
            Some(json!({"card_id": card_id, "origin": {"kind": "pool", "index": 1}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send_json(&app, "POST", "/api/v1/board/drop/slot/2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"]["result"], "placed");
        assert_eq!(body["board"]["slots"][2]["id"], card_id.as_str());
        assert_eq!(body["board"]["pool"].as_array().unwrap().len(), 3);
        assert_eq!(body["board"]["drag"]["state"], "idle");

        let (_, body) = send_json(&app, "POST", "/api/v1/board/drop/pool", None).await;
        assert_eq!(body["outcome"]["result"], "no_drag");

        let (_, body) = send_json(&app, "GET", "/api/v1/board/check", None).await;
        assert_eq!(body["placed"], 1);
    }

    #[tokio::test]
    async fn test_drag_from_wrong_origin_conflicts() {
        let (_, app) = generated_app().await;
        let (_, board) = send_json(&app, "GET", "/api/v1/board", None).await;
        let card_id = board["pool"][0]["id"].as_str().unwrap().to_string();

        let (status, _) = send_json(
            &app,
            "POST",
            "/api/v1/board/drag",
            Some(json!({"card_id": card_id, "origin": {"kind": "slot", "index": 0}})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_print_requires_confirmation_and_resets_board() {
        let (state, app) = generated_app().await;

        let (_, board) = send_json(&app, "GET", "/api/v1/board", None).await;
        let card_id = board["pool"][0]["id"].as_str().unwrap().to_string();
        send_json(
            &app,
            "POST",
            "/api/v1/board/drag",
            Some(json!({"card_id": card_id, "origin": {"kind": "pool", "index": 0}})),
        )
        .await;
        send_json(&app, "POST", "/api/v1/board/drop/slot/0", None).await;

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/toolkits/current/print",
            Some(json!({"confirm": false})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(lock(&state.session).board().slot_card(0).is_some());

        let (status, html) = send(
            &app,
            "POST",
            "/api/v1/toolkits/current/print",
            Some(json!({"confirm": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let html = String::from_utf8(html).unwrap();
        assert_eq!(html.matches("card cutout").count(), 4);

        let session = lock(&state.session);
        assert!(session.board().slot_ids().iter().all(Option::is_none));
        assert_eq!(session.board().pool_ids().len(), 4);
    }

    #[tokio::test]
    async fn test_board_reset_without_toolkit_is_not_found() {
        let app = build_router(working_state());
        let (status, _) = send(&app, "POST", "/api/v1/board/reset", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
