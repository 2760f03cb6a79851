use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use path_of_five::{AppState, router};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.expect("router is infallible")
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, cookie: &str, payload: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn post_form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn sign_in(app: &Router, name: &str) -> String {
    let response = send(app, post_form("/login", None, &format!("name={name}"))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/today");
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn root_redirects_to_today() {
    let app = router(AppState::in_memory());
    let response = send(&app, get("/", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/today");
}

#[tokio::test]
async fn guard_redirects_pages_and_rejects_api() {
    let app = router(AppState::in_memory());
    for page in ["/today", "/dashboard", "/cyourpath", "/yourpath", "/yourpath/ring"] {
        let response = send(&app, get(page, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{page}");
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    let response = send(&app, get("/api/habits", Some("pof_session=not-a-token"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_page_redirects_once_signed_in() {
    let app = router(AppState::in_memory());
    let anonymous = send(&app, get("/login", None)).await;
    assert_eq!(anonymous.status(), StatusCode::OK);
    assert!(body_text(anonymous).await.contains("Sign in"));

    let cookie = sign_in(&app, "Grace").await;
    let response = send(&app, get("/login", Some(&cookie))).await;
    assert_eq!(response.headers()[header::LOCATION], "/today");
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let app = router(AppState::in_memory());
    let response = send(&app, post_form("/login", None, "name=+++")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("a display name is required"));
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = router(AppState::in_memory());
    let cookie = sign_in(&app, "Linus").await;
    assert_eq!(send(&app, get("/api/today", Some(&cookie))).await.status(), StatusCode::OK);

    let response = send(&app, post_form("/logout", Some(&cookie), "")).await;
    assert_eq!(response.headers()[header::LOCATION], "/");
    assert!(
        response.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .contains("Max-Age=0")
    );
    assert_eq!(
        send(&app, get("/api/today", Some(&cookie))).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn today_page_lists_all_five_habits() {
    let app = router(AppState::in_memory());
    let cookie = sign_in(&app, "Ada").await;
    let html = body_text(send(&app, get("/today", Some(&cookie))).await).await;
    for habit in ["middle", "index", "thumb", "ring", "pinky"] {
        assert!(html.contains(&format!(r#"data-habit="{habit}""#)), "{habit}");
    }
    assert_eq!(html.matches("No tasks for today.").count(), 5);
}

#[tokio::test]
async fn task_toggles_follow_the_conjunction_rule() {
    let app = router(AppState::in_memory());
    let cookie = sign_in(&app, "Ada").await;
    let saved = send(
        &app,
        post_form("/cyourpath", Some(&cookie), "text=%7B%22index%22%3A%7B%22tasks%22%3A%5B%22a%22%2C%22b%22%5D%7D%7D"),
    )
    .await;
    assert_eq!(saved.status(), StatusCode::OK);

    let first = send(
        &app,
        post_json("/api/today/task", &cookie, json!({ "habit": "index", "index": 0, "value": true })),
    )
    .await;
    let card: Value = serde_json::from_str(&body_text(first).await).unwrap();
    assert_eq!(card["checklist"], json!({ "top": false, "tasks": [true, false] }));
    assert_eq!(card["shade"], "partial");

    let second = send(
        &app,
        post_json("/api/today/task", &cookie, json!({ "habit": "index", "index": 1, "value": true })),
    )
    .await;
    let card: Value = serde_json::from_str(&body_text(second).await).unwrap();
    assert_eq!(card["checklist"], json!({ "top": true, "tasks": [true, true] }));

    let out_of_range = send(
        &app,
        post_json("/api/today/task", &cookie, json!({ "habit": "index", "index": 5, "value": true })),
    )
    .await;
    assert_eq!(out_of_range.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn habit_pages_render_definitions() {
    let app = router(AppState::in_memory());
    let cookie = sign_in(&app, "Ada").await;

    let list = body_text(send(&app, get("/yourpath", Some(&cookie))).await).await;
    assert!(list.contains(r#"href="/yourpath/pinky""#));

    let detail = body_text(send(&app, get("/yourpath/thumb", Some(&cookie))).await).await;
    assert!(detail.contains("Daily Tasks"));
    assert_eq!(detail.matches("No items added").count(), 3);

    let unknown = send(&app, get("/yourpath/elbow", Some(&cookie))).await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_page_renders_month_navigation() {
    let app = router(AppState::in_memory());
    let cookie = sign_in(&app, "Ada").await;
    let html = body_text(send(&app, get("/dashboard?year=2025&month=11", Some(&cookie))).await).await;
    assert!(html.contains("December 2025"));
    assert!(html.contains("/dashboard?year=2026&amp;month=0"));
    assert!(html.contains("/dashboard?year=2025&amp;month=10"));
    assert!(html.contains("shade-none"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_task_toggles_are_not_lost() {
    let app = router(AppState::in_memory());
    let tasks = "text=%7B%22ring%22%3A%7B%22tasks%22%3A%5B%22a%22%2C%22b%22%5D%7D%7D";

    for user in 0..20 {
        let cookie = sign_in(&app, &format!("racer{user}")).await;
        let saved = send(&app, post_form("/cyourpath", Some(&cookie), tasks)).await;
        assert_eq!(saved.status(), StatusCode::OK);

        let toggles: Vec<_> = (0..2)
            .map(|index| {
                let app = app.clone();
                let cookie = cookie.clone();
                tokio::spawn(async move {
                    let request = post_json(
                        "/api/today/task",
                        &cookie,
                        json!({ "habit": "ring", "index": index, "value": true }),
                    );
                    send(&app, request).await.status()
                })
            })
            .collect();
        for toggle in toggles {
            assert_eq!(toggle.await.unwrap(), StatusCode::OK);
        }

        let today: Value = serde_json::from_str(&body_text(send(&app, get("/api/today", Some(&cookie))).await).await).unwrap();
        let ring = today["habits"]
            .as_array()
            .unwrap()
            .iter()
            .find(|card| card["habit"] == "ring")
            .unwrap();
        assert_eq!(ring["checklist"], json!({ "top": true, "tasks": [true, true] }), "racer{user}");
    }
}

#[tokio::test]
async fn dashboard_rejects_years_out_of_calendar_range() {
    let app = router(AppState::in_memory());
    let cookie = sign_in(&app, "Ada").await;
    for uri in [
        "/api/dashboard?year=2147483647&month=11",
        "/api/dashboard?year=-2147483648&month=0",
        "/dashboard?year=2147483647&month=11",
    ] {
        let response = send(&app, get(uri, Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}
