use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use concierge_api::middleware::AgentClaims;
use concierge_api::{app, AppState};
use concierge_store::app_config::{BusinessRules, Config};
use concierge_trip::TripContext;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

const JWT_SECRET: &str = "console-secret";

fn router_with(config: Config) -> Router {
    let trip = TripContext::in_memory(BusinessRules::default());
    app(AppState::new(trip, &config))
}

fn router() -> Router {
    router_with(Config::default())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn agent_token(role: &str) -> String {
    let claims = AgentClaims {
        sub: "Dana".to_string(),
        role: role.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).unwrap()
}

async fn start_session(app: &Router) -> String {
    let (status, body) = send(app, post("/api/conversation/start", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    body["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&router(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "AA Voice Concierge API");
}

#[tokio::test]
async fn test_conversation_flow() {
    let app = router();
    let session_id = start_session(&app).await;

    let (status, body) = send(
        &app,
        post("/api/conversation/message", json!({ "session_id": session_id, "transcript": "My code is DEMO123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_state"], "viewing");
    assert_eq!(body["reservation"]["confirmation_code"], "DEMO123");

    let (status, body) = send(&app, get(&format!("/api/conversation/{}", session_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_conversation_errors() {
    let app = router();

    let (status, body) = send(&app, post("/api/conversation/message", json!({ "transcript": "hello" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "session_id and transcript are required");

    let unknown = uuid::Uuid::new_v4();
    let (status, _) = send(
        &app,
        post("/api/conversation/message", json!({ "session_id": unknown, "transcript": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get(&format!("/api/conversation/{}", unknown))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reservation_lookup() {
    let app = router();

    let (status, body) = send(&app, get("/api/reservation/lookup?confirmation_code=demo123")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reservation"]["confirmation_code"], "DEMO123");
    assert_eq!(body["reservation"]["passenger"]["first_name"], "Margaret");

    let (status, _) = send(&app, get("/api/reservation/lookup?confirmation_code=ZZZ999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get("/api/reservation/lookup")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_helper_link_and_family_actions() {
    let app = router();
    let session_id = start_session(&app).await;
    send(
        &app,
        post("/api/conversation/message", json!({ "session_id": session_id, "transcript": "My code is DEMO123" })),
    )
    .await;

    let (status, link) = send(&app, post("/api/helper/create-link", json!({ "session_id": session_id }))).await;
    assert_eq!(status, StatusCode::OK);
    let token = link["helper_link"].as_str().unwrap().to_string();

    let (status, view) = send(&app, get(&format!("/api/helper/{}", token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["session"]["id"], json!(session_id));
    assert_eq!(view["reservation"]["confirmation_code"], "DEMO123");

    let (_, actions) = send(&app, get(&format!("/api/helper/{}/actions", token))).await;
    assert_eq!(actions["actions"].as_array().unwrap().len(), 5);

    let (status, outcome) = send(
        &app,
        post(
            &format!("/api/helper/{}/actions", token),
            json!({ "action_type": "select_seat", "action_data": { "seat": "14c" }, "notes": "aisle please" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["success"], true);
    assert_eq!(outcome["new_seat"], "14C");

    let (_, history) = send(&app, get(&format!("/api/helper/{}/actions/history", token))).await;
    assert_eq!(history["actions"][0]["action_type"], "select_seat");
    assert_eq!(history["actions"][0]["family_notes"], "aisle please");

    let (status, _) = send(&app, get("/api/helper/not-a-real-link")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_location_and_journey() {
    let app = router();
    let session_id = start_session(&app).await;

    let (status, body) = send(
        &app,
        post("/api/location/update", json!({ "session_id": session_id, "latitude": 123.0, "longitude": -97.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid coordinates");

    let (status, body) = send(&app, get("/api/journey/dfw?progress=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["next_waypoint"], Value::Null);
    assert_eq!(body["eta_minutes"], 0);

    let (_, waypoints) = send(&app, get("/api/journey/dfw/waypoints")).await;
    assert_eq!(waypoints["waypoints"].as_array().unwrap().len(), 6);
    assert!(waypoints["total_distance_m"].as_i64().unwrap() > 0);

    let (status, _) = send(&app, post(&format!("/api/location/alerts/{}/acknowledge", uuid::Uuid::new_v4()), json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_handoff_console_requires_agent_token() {
    let mut config = Config::default();
    config.auth.jwt_secret = Some(JWT_SECRET.to_string());
    let app = router_with(config);
    let session_id = start_session(&app).await;

    let (status, dossier) = send(
        &app,
        post("/api/handoff/request", json!({ "session_id": session_id, "reason": "Wants a person" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dossier["status"], "pending");
    let id = dossier["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, get("/api/handoff")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut request = get("/api/handoff");
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, format!("Bearer {}", agent_token("passenger")).parse().unwrap());
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut request = post(&format!("/api/handoff/{}/accept", id), json!({}));
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, format!("Bearer {}", agent_token("agent")).parse().unwrap());
    let (status, accepted) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["assigned_agent"], "Dana");
}

#[tokio::test]
async fn test_retell_webhook_signature() {
    let mut config = Config::default();
    config.retell.api_key = Some("key_123".to_string());
    let app = router_with(config);

    let (status, _) = send(&app, post("/api/webhooks/retell", json!({ "event": "call_started", "call": {} }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &router(),
        post("/api/webhooks/retell", json!({ "event": "call_started", "call": { "call_id": "call_1" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["call_id"], "call_1");
}

#[tokio::test]
async fn test_elevenlabs_tool() {
    let app = router();

    let (status, body) = send(
        &app,
        post(
            "/api/webhooks/elevenlabs/tools",
            json!({ "tool_name": "lookup_reservation", "parameters": { "confirmation_code": "DEMO123" } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["result"]["confirmation_code"], "DEMO123");

    let (_, body) = send(&app, post("/api/webhooks/elevenlabs/tools", json!({ "tool_name": "order_pizza" }))).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_voice_agent_prompt() {
    let (status, body) = send(&router(), get("/api/webhooks/elevenlabs/agent-prompt")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tools"].as_array().unwrap().len(), 5);
    let prompt = body["prompt"].as_str().unwrap();
    assert!(prompt.contains("KNOWLEDGE BASE"));
    assert!(prompt.contains("- lookup_reservation"));
}

#[tokio::test]
async fn test_rate_limit() {
    let mut config = Config::default();
    config.rate_limit.requests_per_window = 2;
    let app = router_with(config);

    assert_eq!(send(&app, get("/health")).await.0, StatusCode::OK);
    assert_eq!(send(&app, get("/health")).await.0, StatusCode::OK);
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded");
}

#[tokio::test]
async fn test_metrics_count_matched_routes() {
    let app = router();
    send(&app, get("/health")).await;

    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = String::from_utf8(to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap();
    assert!(text.contains("concierge_http_requests_total"));
    assert!(text.contains("route=\"/health\""));
}
