use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use role_gate::{AppConfig, AppState, create_router};
use tower::ServiceExt; // for `oneshot`

// --- Helper Functions ---

fn app() -> Router {
    create_router(AppState::new(AppConfig::default()))
}

/// Builds a GET request carrying the given cookie header (if any).
fn get(path: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn location(response: &axum::response::Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn assert_redirect(path: &str, cookie: Option<&str>, target: &str) {
    let response = app().oneshot(get(path, cookie)).await.unwrap();
    assert_eq!(
        response.status(),
        StatusCode::TEMPORARY_REDIRECT,
        "{path} with {cookie:?}"
    );
    assert_eq!(location(&response), Some(target), "{path} with {cookie:?}");
}

async fn assert_allowed(path: &str, cookie: Option<&str>) {
    let response = app().oneshot(get(path, cookie)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK, "{path} with {cookie:?}");
    assert!(location(&response).is_none());
}

// --- Scenarios ---

#[tokio::test]
async fn test_hr_can_open_hr_area() {
    assert_allowed("/hr/payroll", Some("token=t; role=hr")).await;
}

#[tokio::test]
async fn test_employee_cannot_open_hr_area() {
    assert_redirect("/hr/payroll", Some("token=t; role=employee"), "/unauthorized").await;
}

#[tokio::test]
async fn test_manager_cannot_open_ceo_area() {
    assert_redirect("/ceo/reports", Some("token=t; role=manager"), "/unauthorized").await;
}

#[tokio::test]
async fn test_missing_token_redirects_to_login() {
    assert_redirect("/manager/tasks", None, "/login").await;
    // A role claim alone is not an identity.
    assert_redirect("/manager/tasks", Some("role=ceo"), "/login").await;
}

#[tokio::test]
async fn test_login_page_is_public() {
    assert_allowed("/login", None).await;
}

#[tokio::test]
async fn test_ceo_can_open_admin_area() {
    assert_allowed("/admin/users", Some("token=t; role=ceo")).await;
}

// --- Edge Cases ---

#[tokio::test]
async fn test_token_without_role_is_unauthorized() {
    assert_redirect("/employee/attendance", Some("token=t"), "/unauthorized").await;
}

#[tokio::test]
async fn test_unrecognized_role_is_unauthorized() {
    assert_redirect("/employee", Some("token=t; role=superadmin"), "/unauthorized").await;
    assert_redirect("/employee", Some("token=t; role=CEO"), "/unauthorized").await;
}

#[tokio::test]
async fn test_quoted_cookie_values() {
    assert_allowed("/hr/payroll", Some(r#"token="t"; role="hr""#)).await;
    assert_redirect("/hr/payroll", Some(r#"token="t"; role="employee""#), "/unauthorized").await;
}

#[tokio::test]
async fn test_reports_belong_to_manager() {
    // "/reports" is declared for both manager and hr; manager is declared first.
    assert_allowed("/reports/q3", Some("token=t; role=manager")).await;
    assert_redirect("/reports/q3", Some("token=t; role=hr"), "/unauthorized").await;
}

#[tokio::test]
async fn test_area_root_is_gated() {
    assert_redirect("/ceo", None, "/login").await;
    assert_allowed("/ceo", Some("token=t; role=ceo")).await;
}

#[tokio::test]
async fn test_unprotected_paths_skip_the_gate() {
    // Not under any matcher pattern: the gate never runs, the fallback 404s.
    let response = app().oneshot(get("/about", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app().oneshot(get("/ceo-blog", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_allowed("/", None).await;
    assert_allowed("/signup", None).await;
    assert_allowed("/health", None).await;
}

#[tokio::test]
async fn test_unauthorized_page_is_reachable_without_credentials() {
    let response = app().oneshot(get("/unauthorized", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(location(&response).is_none());
}

#[tokio::test]
async fn test_allowed_request_sees_gate_outcome() {
    let response = app()
        .oneshot(get("/manager/tasks", Some("token=t; role=admin")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        "manager area: /manager/tasks (signed in as admin)"
    );
}

#[tokio::test]
async fn test_repeated_requests_get_the_same_answer() {
    let app = app();
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(get("/hr/payroll", Some("token=t; role=employee")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), Some("/unauthorized"));
    }
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let response = app().oneshot(get("/health", None)).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

// --- Decision API ---

#[tokio::test]
async fn test_decision_api_explains_redirect() {
    let response = app()
        .oneshot(get(
            "/api/gate/decision?path=/hr/payroll",
            Some("token=t; role=employee"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["gated"], true);
    assert_eq!(json["owner"], "hr");
    assert_eq!(json["token_present"], true);
    assert_eq!(json["claimed_role"], "employee");
    assert_eq!(json["decision"], "redirect_to_unauthorized");
    assert_eq!(json["redirect_to"], "/unauthorized");
}

#[tokio::test]
async fn test_decision_api_for_anonymous_caller() {
    let response = app()
        .oneshot(get("/api/gate/decision?path=/admin", None))
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["decision"], "redirect_to_login");
    assert_eq!(json["claimed_role"], serde_json::Value::Null);
}
