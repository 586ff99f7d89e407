mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::School;
use driving_scheduler::config::EnvironmentConfig;
use driving_scheduler::routes::create_router;
use driving_scheduler::rules::RuleRegistry;
use driving_scheduler::state::AppState;
use driving_scheduler::utils::jwt::{generate_token, JwtConfig, Role};

struct TestApp {
    router: Router,
    school: School,
    jwt: JwtConfig,
}

impl TestApp {
    fn new() -> Self {
        let school = School::new(60, 10);
        school.work_monday(9, 12);

        let config = EnvironmentConfig::default();
        let jwt = JwtConfig::from(&config);
        let state = AppState::new(
            school.store.clone(),
            config,
            RuleRegistry::new(),
            school.notifier.clone(),
        );
        Self {
            router: create_router(state),
            school,
            jwt,
        }
    }

    fn teacher_token(&self) -> String {
        let teacher = &self.school.teacher;
        generate_token(teacher.user_id, Role::Teacher, teacher.id, &self.jwt).unwrap()
    }

    fn student_token(&self) -> String {
        let student = &self.school.student;
        generate_token(student.user_id, Role::Student, student.id, &self.jwt).unwrap()
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_api_requires_a_valid_token() {
    let app = TestApp::new();

    let (status, _) = app.call(Method::GET, "/api/appointments", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .call(Method::GET, "/api/appointments", Some("not.a.token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_student_sees_available_hours() {
    let app = TestApp::new();
    let uri = format!("/api/teacher/{}/available_hours", app.school.teacher.id);

    let (status, body) = app
        .call(Method::POST, &uri, Some(&app.student_token()), Some(json!({ "date": "2030-01-07" })))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([
            ["2030-01-07T09:00Z", "2030-01-07T10:00Z"],
            ["2030-01-07T10:00Z", "2030-01-07T11:00Z"],
            ["2030-01-07T11:00Z", "2030-01-07T12:00Z"],
        ])
    );

    let (status, body) = app
        .call(Method::POST, &uri, Some(&app.student_token()), Some(json!({ "date": "someday" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_out_of_range_duration_is_rejected() {
    let app = TestApp::new();
    let uri = format!("/api/teacher/{}/available_hours", app.school.teacher.id);

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            Some(&app.teacher_token()),
            Some(json!({ "date": "2030-01-07", "duration": 100_000_000_000_000i64 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            Some(&app.teacher_token()),
            Some(json!({ "date": "2030-01-07", "duration": 120 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([["2030-01-07T09:00Z", "2030-01-07T11:00Z"]])
    );
}

#[tokio::test]
async fn test_student_cannot_query_another_teacher() {
    let app = TestApp::new();
    let uri = format!("/api/teacher/{}/available_hours", Uuid::new_v4());

    let (status, _) = app
        .call(Method::POST, &uri, Some(&app.student_token()), Some(json!({ "date": "2030-01-07" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_request_approve_and_list() {
    let app = TestApp::new();

    let (status, created) = app
        .call(
            Method::POST,
            "/api/appointments",
            Some(&app.student_token()),
            Some(json!({ "date": "2030-01-07T10:00Z", "comments": "first lesson" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["data"]["is_approved"], false);
    assert_eq!(created["data"]["type"], "lesson");
    assert_eq!(created["data"]["lesson_number"], 11);
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, approved) = app
        .call(
            Method::POST,
            &format!("/api/appointments/{}/approve", id),
            Some(&app.teacher_token()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["data"]["is_approved"], true);

    let (status, listed) = app
        .call(
            Method::GET,
            "/api/appointments?show=history&order_by=date%20asc",
            Some(&app.teacher_token()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"], json!([]));

    // 2030 todavía es futuro: aparece en la vista por defecto
    let (status, listed) = app
        .call(Method::GET, "/api/appointments", Some(&app.student_token()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_student_cannot_approve() {
    let app = TestApp::new();
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/appointments/{}/approve", Uuid::new_v4()),
            Some(&app.student_token()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_booking_errors_map_to_status_codes() {
    let app = TestApp::new();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/appointments",
            Some(&app.student_token()),
            Some(json!({ "date": "2030-01-07T10:30Z" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "SLOT_UNAVAILABLE");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/appointments",
            Some(&app.teacher_token()),
            Some(json!({ "date": "2030-01-07T10:00Z", "type": "party" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/appointments",
            Some(&app.teacher_token()),
            Some(json!({ "date": "2030-01-07T10:00Z", "duration_mul": 0.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_list_filter_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .call(Method::GET, "/api/appointments?color=red", Some(&app.teacher_token()), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_work_days_are_replaced_and_deleted() {
    let app = TestApp::new();
    let token = app.teacher_token();

    let (status, replaced) = app
        .call(
            Method::POST,
            "/api/teacher/work_days",
            Some(&token),
            Some(json!({
                "day": 1,
                "hours": [
                    { "from_hour": 8, "from_minutes": 0, "to_hour": 10, "to_minutes": 0 },
                    { "from_hour": 14, "from_minutes": 30, "to_hour": 18, "to_minutes": 0 }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["data"].as_array().map(Vec::len), Some(2));

    let (status, listed) = app
        .call(Method::GET, "/api/teacher/work_days", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let entries = listed["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), 2);

    let id = entries[0]["id"].as_str().unwrap();
    let (status, _) = app
        .call(Method::DELETE, &format!("/api/teacher/work_days/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/teacher/work_days/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_work_hours_are_rejected() {
    let app = TestApp::new();
    let (status, _) = app
        .call(
            Method::POST,
            "/api/teacher/work_days",
            Some(&app.teacher_token()),
            Some(json!({
                "day": 1,
                "hours": [{ "from_hour": 12, "from_minutes": 0, "to_hour": 9, "to_minutes": 0 }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(Method::GET, "/api/teacher/work_days", Some(&app.student_token()), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_student_request_notifies_the_teacher() {
    let app = TestApp::new();
    let (status, _) = app
        .call(
            Method::POST,
            "/api/appointments",
            Some(&app.student_token()),
            Some(json!({ "date": "2030-01-07T09:00Z" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.school.notifier.titles_for(app.school.teacher.user_id),
        vec!["New Lesson!"]
    );
}
