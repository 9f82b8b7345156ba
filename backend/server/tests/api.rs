use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, LOCATION},
    },
};
use ledger::{
    Ledger,
    notify::{Confirmation, Notifier},
    store::{Collection, memory::MemoryStore},
};
use serde_json::{Value, json};
use server::{build_router, config::Config, state::AppState};
use tower::ServiceExt;

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Confirmation>>,
}

impl Notifier for RecordingNotifier {
    fn registration_confirmed(&self, confirmation: Confirmation) {
        self.sent.lock().unwrap().push(confirmation);
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
}

fn config() -> Config {
    Config {
        port: 0,
        redis_url: "redis://unused".to_string(),
        redis_prefix: "test".to_string(),
        admin_email: "admin@example.com".to_string(),
        admin_password: "hunter22".to_string(),
        session_secret: "test-session-secret".to_string(),
        session_ttl_secs: 3600,
        notify_webhook_url: None,
    }
}

fn app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::with_parts(config(), Ledger::new(store.clone()), notifier.clone());

    TestApp {
        router: build_router(state),
        store,
        notifier,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn register_request(body: &str) -> Request<Body> {
    Request::post("/register")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"));

    match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn login(router: &Router) -> String {
    let request = Request::post("/admin/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "Admin@Example.com", "password": "hunter22" }).to_string(),
        ))
        .unwrap();

    let (status, body) = send(router, request).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_redirects_with_name() {
    let app = app();

    let response = app
        .router
        .clone()
        .oneshot(register_request("fullName=Ana+Reyes&email=ana%40example.com"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/success?name=Ana+Reyes");
    assert_eq!(app.notifier.sent.lock().unwrap().len(), 1);

    let response = app
        .router
        .clone()
        .oneshot(register_request("fullName=Other+Name&email=ana%40example.com"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[LOCATION],
        "/success?name=Ana+Reyes&existing=true"
    );
    assert_eq!(app.notifier.sent.lock().unwrap().len(), 1);
    assert_eq!(app.store.len(Collection::Registrations).await, 1);
}

#[tokio::test]
async fn register_reports_field_errors() {
    let app = app();

    let (status, body) = send(&app.router, register_request("fullName=A&email=nope")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Please review your entries and try again.");
    assert_eq!(
        body["errors"]["email"][0],
        "Please enter a valid email address."
    );
}

#[tokio::test]
async fn closed_registration_is_forbidden() {
    let app = app();
    let token = login(&app.router).await;

    let (status, body) = send(
        &app.router,
        admin(
            "PUT",
            "/admin/registration/status",
            &token,
            Some(json!({ "isOpen": false })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Registration is now closed.");

    let (status, body) = send(
        &app.router,
        Request::get("/registration/status").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isOpen"], false);

    let (status, body) = send(
        &app.router,
        register_request("fullName=Ana+Reyes&email=ana%40example.com"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Sorry, registration is currently closed.");
}

#[tokio::test]
async fn admin_routes_need_a_token() {
    let app = app();

    let (status, _) = send(
        &app.router,
        Request::get("/admin/stats").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app.router, admin("GET", "/admin/stats", "v1.bad.token", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let bad_login = Request::post("/admin/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "admin@example.com", "password": "wrong" }).to_string(),
        ))
        .unwrap();
    let (status, _) = send(&app.router, bad_login).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app.router).await;
    let (status, body) = send(&app.router, admin("GET", "/admin/stats", &token, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalRegistrations"], 0);
    assert_eq!(body["nextRound"], 1);
}

#[tokio::test]
async fn catalog_crud_and_import() {
    let app = app();
    let token = login(&app.router).await;

    let item = json!({ "id": "P1", "name": "Toy car", "description": "Red toy car", "prizeType": "minor" });
    let (status, body) = send(&app.router, admin("POST", "/admin/items", &token, Some(item.clone()))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Item saved successfully.");

    let (status, body) = send(&app.router, admin("POST", "/admin/items", &token, Some(item))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errors"]["id"][0], "This Item ID must be unique.");

    let (status, body) = send(
        &app.router,
        admin("PATCH", "/admin/items/P1", &token, Some(json!({ "prizeType": "grand" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["prizeType"], "grand");

    let (status, _) = send(
        &app.router,
        admin("PATCH", "/admin/items/P9", &token, Some(json!({ "name": "Robot" }))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let csv = "id,name,description,prizeType\nP1,Toy,A toy,minor\nP2,Bicycle,\"Red, fast\",major\n";
    let request = Request::post("/admin/import")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, "text/csv")
        .body(Body::from(csv))
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["insertedCount"], 1);
    assert_eq!(
        body["errors"][0],
        "Row 2: Item ID \"P1\" already exists in the database."
    );

    let (status, body) = send(&app.router, admin("GET", "/admin/items?type=major", &token, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["description"], "Red, fast");

    let (status, _) = send(&app.router, admin("DELETE", "/admin/items/P2", &token, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.len(Collection::RaffleItems).await, 1);
}

#[tokio::test]
async fn item_named_import_stays_editable() {
    let app = app();
    let token = login(&app.router).await;

    let item = json!({ "id": "import", "name": "Import crate", "description": "A crate", "prizeType": "minor" });
    let (status, _) = send(&app.router, admin("POST", "/admin/items", &token, Some(item))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app.router,
        admin("PATCH", "/admin/items/import", &token, Some(json!({ "name": "Imported crate" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["name"], "Imported crate");

    let (status, _) = send(&app.router, admin("DELETE", "/admin/items/import", &token, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.len(Collection::RaffleItems).await, 0);
}

#[tokio::test]
async fn bad_payloads_answer_in_json() {
    let app = app();
    let token = login(&app.router).await;

    let response = app
        .router
        .clone()
        .oneshot(admin("POST", "/admin/raffle/draft", &token, Some(json!({ "count": -1 }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["message"].as_str().unwrap().contains("count"));

    let request = Request::post("/admin/raffle/draft")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (status, body) = send(&app.router, admin("GET", "/admin/registrations?page=first", &token, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let request = Request::post("/register")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"fullName":"Ana Reyes"}"#))
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn participants_board_is_public() {
    let app = app();
    let token = login(&app.router).await;

    for (name, email) in [("carlo+santos", "c"), ("Ana+Reyes", "a")] {
        let body = format!("fullName={name}&email={email}%40example.com");
        app.router.clone().oneshot(register_request(&body)).await.unwrap();
    }
    let item = json!({ "id": "P1", "name": "Bicycle", "description": "A bike", "prizeType": "major" });
    send(&app.router, admin("POST", "/admin/items", &token, Some(item))).await;
    send(&app.router, admin("POST", "/admin/raffle/draft", &token, Some(json!({ "count": 2 })))).await;
    let assign = json!({ "registrationId": "c@example.com", "prizeId": "P1" });
    send(&app.router, admin("POST", "/admin/raffle/assign", &token, Some(assign))).await;
    let (status, _) = send(&app.router, admin("POST", "/admin/raffle/confirm", &token, None)).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::get("/participants").body(Body::empty()).unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "fullName": "Ana Reyes" },
            { "fullName": "carlo santos", "prizeType": "major", "prizeName": "Bicycle" },
        ])
    );
}

#[tokio::test]
async fn raffle_round_over_http() {
    let app = app();
    let token = login(&app.router).await;

    for (name, email) in [("Ana+Reyes", "a"), ("Bea+Cruz", "b"), ("Carlo+Santos", "c")] {
        let body = format!("fullName={name}&email={email}%40example.com");
        app.router.clone().oneshot(register_request(&body)).await.unwrap();
    }
    for (id, name) in [("P1", "Toy car"), ("P2", "Bicycle")] {
        let item = json!({ "id": id, "name": name, "description": "A prize", "prizeType": "minor" });
        send(&app.router, admin("POST", "/admin/items", &token, Some(item))).await;
    }

    let (status, body) = send(
        &app.router,
        admin("POST", "/admin/raffle/draft", &token, Some(json!({ "count": 4 }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Not enough participants"));

    let (status, draft) = send(
        &app.router,
        admin("POST", "/admin/raffle/draft", &token, Some(json!({ "count": 2 }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(draft["round"], 1);
    let drafted: Vec<String> = draft["participants"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();

    let (status, _) = send(&app.router, admin("POST", "/admin/raffle/confirm", &token, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for (registration_id, prize_id) in drafted.iter().zip(["P1", "P2"]) {
        let (status, _) = send(
            &app.router,
            admin(
                "POST",
                "/admin/raffle/assign",
                &token,
                Some(json!({ "registrationId": registration_id, "prizeId": prize_id })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, prizes) = send(&app.router, admin("GET", "/admin/raffle/prizes?type=all", &token, None)).await;
    assert!(prizes.as_array().unwrap().is_empty());

    let (status, body) = send(&app.router, admin("POST", "/admin/raffle/confirm", &token, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Round 1 winners have been saved.");

    let (_, overview) = send(&app.router, admin("GET", "/admin/raffle", &token, None)).await;
    assert_eq!(overview["phase"], "idle");
    assert_eq!(overview["remainingParticipants"], 1);
    assert_eq!(overview["nextRound"], 2);

    let (_, winners) = send(&app.router, admin("GET", "/admin/winners?sort=fullName&direction=asc", &token, None)).await;
    assert_eq!(winners["total"], 2);
    assert_eq!(winners["items"][0]["round"], 1);
}
