use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{activity, auth, flows, logs, profiles};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(flows::router())
                .merge(logs::router())
                .merge(activity::router())
                .merge(profiles::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, ms, "response");
                        } else {
                            tracing::info!(%status, ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::jwt::JwtKeys;
    use crate::genai::testing::ScriptedClient;

    struct Harness {
        state: AppState,
        client: Arc<ScriptedClient>,
        token: String,
    }

    fn harness(client: ScriptedClient) -> Harness {
        let client = Arc::new(client);
        let state = AppState::fake(client.clone());
        let token = JwtKeys::from_ref(&state)
            .sign_access(Uuid::new_v4())
            .unwrap();
        Harness {
            state,
            client,
            token,
        }
    }

    impl Harness {
        async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let mut req = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.token));
            let body = match body {
                Some(v) => {
                    req = req.header(header::CONTENT_TYPE, "application/json");
                    Body::from(v.to_string())
                }
                None => Body::empty(),
            };
            let res = build_app(self.state.clone())
                .oneshot(req.body(body).unwrap())
                .await
                .unwrap();
            let status = res.status();
            let bytes = res.into_body().collect().await.unwrap().to_bytes();
            let value = serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
            (status, value)
        }
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake(Arc::new(ScriptedClient::new())));
        let res = app
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn flows_require_a_bearer_token() {
        let app = build_app(AppState::fake(Arc::new(ScriptedClient::new())));
        let res = app
            .oneshot(Request::get("/api/v1/flows").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn catalog_lists_every_flow_with_schemas() {
        let h = harness(ScriptedClient::new());
        let (status, body) = h.call(Method::GET, "/api/v1/flows", None).await;
        assert_eq!(status, StatusCode::OK);
        let flows = body.as_array().unwrap();
        assert_eq!(flows.len(), 18);
        let plan = flows.iter().find(|f| f["name"] == "workout-plan").unwrap();
        assert_eq!(plan["input"]["properties"]["experienceLevel"]["enum"][0], "beginner");
        assert_eq!(plan["model"], "gemini-2.5-pro");
    }

    #[tokio::test]
    async fn runs_a_flow_over_http() {
        let h = harness(
            ScriptedClient::new().reply_text(r#"{"workoutPlan": "Day 1: push-ups 3x12"}"#),
        );
        let (status, body) = h
            .call(
                Method::POST,
                "/api/v1/flows/workout-plan",
                Some(json!({
                    "fitnessGoals": "get stronger",
                    "experienceLevel": "intermediate",
                    "availableEquipment": "dumbbells"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["flow"], "workout-plan");
        assert_eq!(body["output"]["workoutPlan"], "Day 1: push-ups 3x12");
    }

    #[tokio::test]
    async fn flow_errors_map_to_statuses() {
        let h = harness(ScriptedClient::new().reply_text("not json").fail("503 unavailable"));

        let (status, _) = h.call(Method::POST, "/api/v1/flows/nope", Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = h
            .call(Method::POST, "/api/v1/flows/coach", Some(json!({"question": "?"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.as_str().unwrap().contains("$.query"));
        assert_eq!(h.client.calls(), 0);

        let (status, _) = h
            .call(Method::POST, "/api/v1/flows/post-workout-nutrition", Some(json!({"workoutType": "run"})))
            .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, _) = h
            .call(Method::POST, "/api/v1/flows/coach", Some(json!({"query": "?"})))
            .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn logs_merge_over_http() {
        let h = harness(ScriptedClient::new());
        let url = "/api/v1/logs/workout/2024-05-01";

        let (status, body) = h.call(Method::GET, url, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["record"].is_null());

        h.call(Method::PUT, url, Some(json!({"sessions": 1}))).await;
        let (status, body) = h.call(Method::PUT, url, Some(json!({"duration": 30}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["record"], json!({"sessions": 1, "duration": 30}));

        let (status, body) = h.call(Method::GET, "/api/v1/logs/workout?limit=5", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["date"], "2024-05-01");

        let (status, _) = h.call(Method::GET, "/api/v1/logs/sleep/today", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = h
            .call(Method::PUT, url, Some(json!({"sessions": "many"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = h
            .call(Method::PUT, url, Some(json!({"sessions": null})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.as_str().unwrap().contains("$.sessions"));
        let (status, _) = h
            .call(
                Method::POST,
                "/api/v1/workouts/sessions",
                Some(json!({"duration": 5, "calories": 10})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn advice_body_errors_are_bad_requests() {
        let h = harness(ScriptedClient::new());
        let (status, _) = h
            .call(
                Method::POST,
                "/api/v1/nutrition/advice",
                Some(json!({"requestType": "smoothie"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn sessions_and_summary_share_todays_log() {
        let h = harness(ScriptedClient::new());
        for _ in 0..2 {
            let (status, _) = h
                .call(
                    Method::POST,
                    "/api/v1/workouts/sessions",
                    Some(json!({"duration": 20, "calories": 150})),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, body) = h.call(Method::GET, "/api/v1/summary/today", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["workout"]["sessions"], json!(2.0));
        assert_eq!(body["workout"]["duration"], json!(40.0));
        assert_eq!(body["goals"], json!([]));
    }

    #[tokio::test]
    async fn profile_round_trip_and_missing_profile() {
        let h = harness(ScriptedClient::new());
        let (status, _) = h.call(Method::GET, "/api/v1/profile", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = h
            .call(Method::PUT, "/api/v1/profile", Some(json!({"age": 33, "gender": "female"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gender"], "female");

        let (status, body) = h
            .call(Method::PATCH, "/api/v1/profile", Some(json!({"weight": 61})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["age"], json!(33.0));
        assert_eq!(body["weight"], json!(61.0));
    }
}
