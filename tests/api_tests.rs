//! Surface tests: authentication, capability checks, events, invites and
//! analytics.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{DEFAULT_ADMIN_EMAIL, DEFAULT_API_KEY, body_json, spawn_app, wallet};
use std::sync::atomic::Ordering;
use tower::ServiceExt;

#[tokio::test]
async fn protected_routes_require_authentication() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/events")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/events")
                .header("X-Api-Key", "wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.get("/api/events").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_returns_the_account_and_api_key() {
    let app = spawn_app().await;

    let response = app
        .post_json_public(
            "/api/auth/login",
            serde_json::json!({ "email": DEFAULT_ADMIN_EMAIL, "password": "password" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["user"]["role"], "SuperAdmin");
    assert_eq!(body["data"]["api_key"], DEFAULT_API_KEY);

    let bad = app
        .post_json_public(
            "/api/auth/login",
            serde_json::json!({ "email": DEFAULT_ADMIN_EMAIL, "password": "nope" }),
        )
        .await;
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn event_creation_is_capability_gated() {
    let app = spawn_app().await;
    app.seed_student("Jane", "jane@x.com", None).await;

    let jane = app
        .state
        .store()
        .user_by_email("jane@x.com")
        .await
        .unwrap()
        .unwrap();

    let body = serde_json::json!({
        "name": "Forbidden Event",
        "date": "2026-06-01",
        "description": "",
    });

    let response = app
        .post_json_as("/api/events", body.clone(), &jane.api_key)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.post_json("/api/events", body).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn event_dates_are_validated() {
    let app = spawn_app().await;

    let response = app
        .post_json(
            "/api/events",
            serde_json::json!({
                "name": "Bad Date",
                "date": "01-06-2026",
                "description": "",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            "/api/events",
            serde_json::json!({
                "name": "",
                "date": "2026-06-01",
                "description": "",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn public_listing_and_registration_roundtrip() {
    let app = spawn_app().await;

    let event = body_json(
        app.post_json(
            "/api/events",
            serde_json::json!({
                "name": "Open Day",
                "date": "2026-06-01",
                "description": "Campus tour",
                "certificate_style": { "event_type": "Seminar" },
            }),
        )
        .await,
    )
    .await;
    let event_id = event["data"]["id"].as_i64().unwrap();

    let listing = body_json(app.get_public("/api/events/public").await).await;
    assert_eq!(listing["data"].as_array().unwrap().len(), 1);
    assert_eq!(listing["data"][0]["name"], "Open Day");
    assert_eq!(listing["data"][0]["created_by"], "Administrator");

    let response = app
        .post_json_public(
            &format!("/api/events/{event_id}/register"),
            serde_json::json!({ "name": "Visitor", "email": "visitor@x.com" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Same address again, case-shifted: still one registration.
    let duplicate = app
        .post_json_public(
            &format!("/api/events/{event_id}/register"),
            serde_json::json!({ "name": "Visitor", "email": "Visitor@X.com" }),
        )
        .await;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

    let participants = body_json(
        app.get(&format!("/api/events/{event_id}/participants"))
            .await,
    )
    .await;
    assert_eq!(participants["data"].as_array().unwrap().len(), 1);
    assert_eq!(participants["data"][0]["email"], "visitor@x.com");

    let missing = app
        .post_json_public(
            "/api/events/9999/register",
            serde_json::json!({ "name": "Visitor", "email": "visitor@x.com" }),
        )
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn logged_in_students_can_self_register() {
    let app = spawn_app().await;
    app.seed_student("Jane", "jane@x.com", None).await;

    let jane = app
        .state
        .store()
        .user_by_email("jane@x.com")
        .await
        .unwrap()
        .unwrap();

    let event = body_json(
        app.post_json(
            "/api/events",
            serde_json::json!({ "name": "Tech Talk", "date": "2026-07-01", "description": "" }),
        )
        .await,
    )
    .await;
    let event_id = event["data"]["id"].as_i64().unwrap();

    let response = app
        .post_json_as(
            &format!("/api/events/{event_id}/register-me"),
            serde_json::json!({}),
            &jane.api_key,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let again = app
        .post_json_as(
            &format!("/api/events/{event_id}/register-me"),
            serde_json::json!({}),
            &jane.api_key,
        )
        .await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn faculty_invites_roundtrip() {
    let app = spawn_app().await;

    // Inviting an existing account fails.
    let response = app
        .post_json(
            "/api/admin/invites",
            serde_json::json!({ "name": "Admin", "email": DEFAULT_ADMIN_EMAIL }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.mailer.invite_mails.load(Ordering::SeqCst), 0);

    let response = app
        .post_json(
            "/api/admin/invites",
            serde_json::json!({
                "name": "Prof. Xavier",
                "email": "prof@x.com",
                "department": "MCA",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.mailer.invite_mails.load(Ordering::SeqCst), 1);

    let token = app.mailer.invite_token().expect("invite token");

    // Claim it and log in as Faculty.
    let response = app
        .post_json_public(
            "/api/account/claim-invite",
            serde_json::json!({ "token": token, "password": "prof-pass-123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["role"], "Faculty");
    assert_eq!(body["data"]["department"], "MCA");

    // Faculty can create events but cannot administer users.
    let prof = app
        .state
        .store()
        .user_by_email("prof@x.com")
        .await
        .unwrap()
        .unwrap();

    let response = app
        .post_json_as(
            "/api/events",
            serde_json::json!({ "name": "Faculty Event", "date": "2026-08-01", "description": "" }),
            &prof.api_key,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_json_as(
            "/api/admin/invites",
            serde_json::json!({ "name": "X", "email": "x@x.com" }),
            &prof.api_key,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // A consumed token cannot be claimed again.
    let replay = app
        .post_json_public(
            "/api/account/claim-invite",
            serde_json::json!({ "token": app.mailer.invite_token().unwrap(), "password": "other-pass-123" }),
        )
        .await;
    assert_eq!(replay.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invite_mail_failure_fails_the_invite() {
    let app = spawn_app().await;
    app.mailer.fail_all.store(true, Ordering::SeqCst);

    let response = app
        .post_json(
            "/api/admin/invites",
            serde_json::json!({ "name": "Prof", "email": "prof@x.com" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn wallet_binding_validates_the_address() {
    let app = spawn_app().await;
    app.seed_student("Jane", "jane@x.com", None).await;

    let jane = app
        .state
        .store()
        .user_by_email("jane@x.com")
        .await
        .unwrap()
        .unwrap();

    let send = |address: &str| {
        let api_key = jane.api_key.clone();
        let router = app.router.clone();
        let body = serde_json::json!({ "wallet_address": address }).to_string();
        async move {
            router
                .oneshot(
                    Request::builder()
                        .method("PUT")
                        .uri("/api/account/wallet")
                        .header("X-Api-Key", api_key)
                        .header("Content-Type", "application/json")
                        .body(Body::from(body))
                        .unwrap(),
                )
                .await
                .unwrap()
        }
    };

    let bad = send("not-a-wallet").await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

    let good = send(&wallet(7)).await;
    assert_eq!(good.status(), StatusCode::OK);

    let jane = app
        .state
        .store()
        .user_by_email("jane@x.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(jane.wallet_address.unwrap(), wallet(7));
}

#[tokio::test]
async fn password_change_requires_the_current_password() {
    let app = spawn_app().await;

    let wrong = app
        .put_json(
            "/api/auth/password",
            serde_json::json!({ "current_password": "nope", "new_password": "next-pass-123" }),
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::BAD_REQUEST);

    let response = app
        .put_json(
            "/api/auth/password",
            serde_json::json!({ "current_password": "password", "new_password": "next-pass-123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let login = app
        .post_json_public(
            "/api/auth/login",
            serde_json::json!({ "email": DEFAULT_ADMIN_EMAIL, "password": "next-pass-123" }),
        )
        .await;
    assert_eq!(login.status(), StatusCode::OK);
}

#[tokio::test]
async fn student_management_lists_and_deletes() {
    let app = spawn_app().await;
    app.seed_student("Jane", "jane@x.com", None).await;
    let bob_id = app.seed_student("Bob", "bob@x.com", None).await;

    let students = body_json(app.get("/api/admin/students").await).await;
    assert_eq!(students["data"].as_array().unwrap().len(), 2);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/admin/students/{bob_id}"))
                .header("X-Api-Key", DEFAULT_API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let students = body_json(app.get("/api/admin/students").await).await;
    assert_eq!(students["data"].as_array().unwrap().len(), 1);

    // Deleting the admin through the student endpoint is a no-op 404.
    let admin = app
        .state
        .store()
        .user_by_email(DEFAULT_ADMIN_EMAIL)
        .await
        .unwrap()
        .unwrap();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/admin/students/{}", admin.id))
                .header("X-Api-Key", DEFAULT_API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn analytics_aggregates_counts_and_departments() {
    let app = spawn_app().await;
    app.seed_student("Jane", "jane@x.com", Some(&wallet(1))).await;
    app.seed_student("Bob", "bob@x.com", Some(&wallet(2))).await;

    app.post_json(
        "/api/events",
        serde_json::json!({ "name": "Analytics Event", "date": "2026-09-01", "description": "" }),
    )
    .await;

    app.post_json(
        "/api/certificates/issue",
        serde_json::json!({
            "eventName": "Analytics Event",
            "eventDate": "2026-09-01",
            "studentName": "Jane",
            "studentEmail": "jane@x.com",
        }),
    )
    .await;

    let analytics = body_json(app.get("/api/admin/analytics").await).await;
    assert_eq!(analytics["data"]["total_students"], 2);
    assert_eq!(analytics["data"]["total_events"], 1);
    assert_eq!(analytics["data"]["total_certificates"], 1);

    let by_dept = analytics["data"]["certificates_by_department"]
        .as_array()
        .unwrap();
    assert_eq!(by_dept.len(), 1);
    assert_eq!(by_dept[0]["name"], "MCA");
    assert_eq!(by_dept[0]["count"], 1);

    let students_by_dept = analytics["data"]["students_by_department"]
        .as_array()
        .unwrap();
    assert_eq!(students_by_dept[0]["count"], 2);
}

#[tokio::test]
async fn health_probes_are_public_and_respond() {
    let app = spawn_app().await;

    let live = app.get_public("/api/health/live").await;
    assert_eq!(live.status(), StatusCode::OK);

    let ready = app.get_public("/api/health/ready").await;
    assert_eq!(ready.status(), StatusCode::OK);
    let body = body_json(ready).await;
    assert_eq!(body["data"]["database"], true);
}

#[tokio::test]
async fn metrics_endpoint_is_protected_and_responds() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.get("/api/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
}
