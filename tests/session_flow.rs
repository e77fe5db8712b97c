mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::util::ServiceExt;

use app_gate::auth::none::NoneStrategy;

use common::{bearer, get, json_body, scenario_apps, simple_strategy, start};

fn login_request(username: &str, password: &str) -> Result<Request<Body>> {
    let body = json!({ "username": username, "password": password });
    Ok(Request::builder()
        .method("POST")
        .uri("/login")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))?)
}

#[tokio::test]
async fn login_issues_session_cookie_usable_for_apps() -> Result<()> {
    let mut gw = start(scenario_apps(), simple_strategy()?).await?;
    let app = gw.gateway.router.clone();

    let resp = app.clone().oneshot(login_request("ann", "analyst-pass")?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp.headers()[header::SET_COOKIE].to_str()?.to_string();
    assert!(cookie.starts_with("gate_session="));
    let body = json_body(resp).await?;
    assert_eq!(body["roles"], json!(["ANALYST"]));

    let session = cookie.split(';').next().unwrap_or_default().to_string();
    let req = Request::builder()
        .method("GET")
        .uri("/app/calc")
        .header(header::COOKIE, session)
        .body(Body::empty())?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let event = gw.events.recv().await?;
    assert_eq!(event["name"], "auth.success");
    assert_eq!(event["actor"], "ann");

    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_rejected_and_reported() -> Result<()> {
    let mut gw = start(scenario_apps(), simple_strategy()?).await?;
    let app = gw.gateway.router.clone();

    let resp = app.clone().oneshot(login_request("ann", "wrong-password")?).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let event = gw.events.recv().await?;
    assert_eq!(event["name"], "auth.failure");
    assert_eq!(event["payload"]["reason"], "bad credentials");

    let resp = app.clone().oneshot(login_request("nobody", "whatever-pass")?).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let event = gw.events.recv().await?;
    assert_eq!(event["payload"]["reason"], "unknown user");

    Ok(())
}

#[tokio::test]
async fn logout_clears_session_and_publishes_event() -> Result<()> {
    let mut gw = start(scenario_apps(), simple_strategy()?).await?;
    let app = gw.gateway.router.clone();

    let req = Request::builder()
        .method("POST")
        .uri("/logout")
        .header(header::AUTHORIZATION, bearer("ann", &["analyst"]))
        .body(Body::empty())?;
    let resp = app.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/login");
    assert!(resp.headers()[header::SET_COOKIE].to_str()?.contains("Max-Age=0"));

    let event = gw.events.recv().await?;
    assert_eq!(event["name"], "auth.logout");

    Ok(())
}

#[tokio::test]
async fn disabled_authorization_lets_everything_through() -> Result<()> {
    let gw = start(scenario_apps(), Arc::new(NoneStrategy)).await?;
    let app = gw.gateway.router;

    for path in ["/app/calc", "/app/public-app", "/admin", "/"] {
        let resp = app.clone().oneshot(get(path, None)?).await?;
        assert_eq!(resp.status(), StatusCode::OK, "{path} should be open");
    }

    let resp = app.clone().oneshot(get("/api/health", None)?).await?;
    let body = json_body(resp).await?;
    assert_eq!(body["mode"], "disabled");
    assert_eq!(body["rule_count"], 0);

    Ok(())
}
