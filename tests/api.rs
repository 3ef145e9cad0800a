#![cfg(feature = "web")]

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode, header},
    routing::post,
};
use prodlog::app::{AppState, router};
use prodlog::config::AppConfig;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

const LABEL: &str =
    "2.000*^2.020*^1.980*^2.030*^1.970*^0.040*^2.0*^1.5*^0.180*^0.220*^1.0*^1.2*^10*^450*^1.00*^3";

type Received = Arc<Mutex<Vec<Value>>>;

/// Local stand-in for the workflow endpoint: `/hook` records bodies, `/broken` fails.
async fn workflow_server() -> (String, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));

    async fn hook(State(received): State<Received>, Json(body): Json<Value>) -> StatusCode {
        received.lock().unwrap().push(body);
        StatusCode::ACCEPTED
    }

    async fn broken() -> (StatusCode, &'static str) {
        (StatusCode::INTERNAL_SERVER_ERROR, "flow disabled")
    }

    let app = Router::new()
        .route("/hook", post(hook))
        .route("/broken", post(broken))
        .with_state(received.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), received)
}

struct TestApp {
    app: Router,
    cookie: String,
    _drafts: TempDir,
}

impl TestApp {
    async fn new(submit_url: Option<String>) -> Self {
        let drafts = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default().with_draft_dir(drafts.path());
        if let Some(url) = submit_url {
            config = config.with_submit_url(url);
        }
        let app = router(Arc::new(AppState::new(config).unwrap()));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=WorkStation1&password=Letmein1"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();

        TestApp {
            app,
            cookie,
            _drafts: drafts,
        }
    }

    async fn raw(&self, method: Method, uri: &str, body: Option<Value>) -> axum::response::Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, &self.cookie);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.raw(method, uri, body).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn active_form(&self) -> String {
        let (_, forms) = self.call(Method::GET, "/api/forms", None).await;
        forms["forms"]
            .as_array()
            .unwrap()
            .iter()
            .find(|tab| tab["active"] == true)
            .unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn fill_header(&self, id: &str) {
        for (field, value) in [
            ("productionSite", "Plant 2"),
            ("shift", "A"),
            ("operatorName", "Lee"),
            ("productionLine", "7"),
        ] {
            let (status, _) = self
                .call(
                    Method::PUT,
                    &format!("/api/forms/{}/header", id),
                    Some(json!({ "field": field, "value": value })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    async fn fill_row(&self, id: &str, row: usize) {
        let values = [
            ("start", "06:00"),
            ("end", "07:00"),
            ("odAverage", "2.000"),
            ("odMaximum", "2.010"),
            ("odMinimum", "1.990"),
            ("odEnd", "1.995"),
            ("wallMinimum", "0.190"),
            ("wallMaximum", "0.210"),
            ("odAtSaw", "2.001"),
            ("odAtVacTank", "2.004"),
            ("meltPress", "3100"),
            ("unitStart", "1"),
            ("unitEnd", "40"),
            ("actualPPH", "440"),
            ("actualWtPerFt", "1.05"),
            ("acceptedFt", "1200"),
            ("acceptedLbs", "1224.5"),
            ("scrapFts", "20"),
            ("scrapLbs", "21.4"),
            ("scrapCode", "B"),
            ("regrindConsumed", "12.5"),
        ];
        for (field, value) in values {
            let (status, body) = self
                .call(
                    Method::PUT,
                    &format!("/api/forms/{}/entries/{}", id, row),
                    Some(json!({ "field": field, "value": value })),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "{} -> {}", field, body);
        }
    }
}

#[tokio::test]
async fn api_requires_a_session() {
    let app = router(Arc::new(AppState::new(AppConfig::default()).unwrap()));

    let response = app
        .clone()
        .oneshot(Request::get("/api/forms").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");

    let response = app
        .oneshot(
            Request::post("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=WorkStation1&password=wrong"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn row_lifecycle_over_http() {
    let (base, received) = workflow_server().await;
    let app = TestApp::new(Some(format!("{}/hook", base))).await;
    let id = app.active_form().await;

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/forms/{}/entries/0", id),
            Some(json!({ "field": "odAverage", "value": "2.0" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "error");

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/forms/{}/scan", id),
            Some(json!({ "payload": LABEL })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["specsComplete"], true);

    let (status, _) = app
        .call(Method::POST, &format!("/api/forms/{}/entries", id), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.fill_header(&id).await;
    app.fill_row(&id, 0).await;

    let (status, body) = app
        .call(Method::POST, &format!("/api/forms/{}/entries", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["locked"], true);
    assert_eq!(entries[0]["loss"], 5.0);
    assert_eq!(entries[1]["start"], "07:00");
    assert_eq!(entries[1]["unitStart"], 41.0);

    {
        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["formId"], id.as_str());
        assert_eq!(received[0]["entries"].as_array().unwrap().len(), 1);
    }

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/forms/{}/entries/0", id), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/forms/{}/entries/1", id),
            Some(json!({ "field": "visual", "value": "Pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/forms/{}/entries/1", id), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/forms/{}/entries/1?confirm=true", id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn submission_checks_header_and_upstream_status() {
    let (base, received) = workflow_server().await;
    let app = TestApp::new(Some(format!("{}/hook", base))).await;
    let id = app.active_form().await;

    let (status, body) = app
        .call(Method::POST, &format!("/api/forms/{}/submit", id), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("productionSite"));
    assert!(received.lock().unwrap().is_empty());

    app.fill_header(&id).await;
    let (status, _) = app
        .call(Method::POST, &format!("/api/forms/{}/submit", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(received.lock().unwrap().len(), 1);

    let broken = TestApp::new(Some(format!("{}/broken", base))).await;
    let id = broken.active_form().await;
    broken.fill_header(&id).await;
    let (status, body) = broken
        .call(Method::POST, &format!("/api/forms/{}/submit", id), None)
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["message"].as_str().unwrap().contains("500"));
}

#[tokio::test]
async fn failed_silent_submission_does_not_block_new_row() {
    let (base, _) = workflow_server().await;
    let app = TestApp::new(Some(format!("{}/broken", base))).await;
    let id = app.active_form().await;
    app.call(
        Method::POST,
        &format!("/api/forms/{}/scan", id),
        Some(json!({ "payload": LABEL })),
    )
    .await;
    app.fill_header(&id).await;
    app.fill_row(&id, 0).await;

    let (status, body) = app
        .call(Method::POST, &format!("/api/forms/{}/entries", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn exports_and_drafts() {
    let app = TestApp::new(None).await;
    let id = app.active_form().await;

    let response = app
        .raw(Method::GET, &format!("/api/forms/{}/export.csv", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains(&format!("production-form-{}", id)));
    assert!(disposition.ends_with(".csv"));

    let (status, body) = app
        .call(Method::GET, &format!("/api/forms/{}/export", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["formId"], id.as_str());
    assert!(body["exportDate"].as_str().unwrap().ends_with('Z'));

    let (status, _) = app
        .call(Method::POST, &format!("/api/forms/{}/submit", id), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.fill_header(&id).await;
    let (status, _) = app
        .call(Method::POST, &format!("/api/forms/{}/submit", id), None)
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = app
        .call(Method::POST, &format!("/api/forms/{}/draft", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let draft = body["draft"].as_str().unwrap().to_string();

    let (_, body) = app.call(Method::GET, "/api/drafts", None).await;
    assert_eq!(body["drafts"], json!([draft.clone()]));

    app.call(Method::POST, &format!("/api/forms/{}/reset", id), None)
        .await;
    let (status, body) = app
        .call(Method::POST, &format!("/api/drafts/{}/open", draft), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["productionSite"], "Plant 2");

    let (status, _) = app
        .call(Method::POST, "/api/drafts/missing/open", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn form_tabs() {
    let app = TestApp::new(None).await;
    let first = app.active_form().await;

    let (status, body) = app.call(Method::POST, "/api/forms", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let second = body["formId"].as_str().unwrap().to_string();
    assert_eq!(body["name"], "Form 2");
    assert_eq!(app.active_form().await, second);

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/forms/{}/header", second),
            Some(json!({ "field": "operatorName", "value": "Lee" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/forms/{}", second), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, body) = app
        .call(Method::DELETE, &format!("/api/forms/{}?confirm=true", second), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["forms"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/forms/{}", first), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn inspection_checklist() {
    let app = TestApp::new(None).await;

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/inspection/hours/8",
            Some(json!({ "checkpoint": 2, "status": "fail", "comments": "guard missing" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["failedChecks"], 1);
    assert_eq!(body["form"]["entries"][8]["comments"], "guard missing");

    let (status, _) = app
        .call(
            Method::PUT,
            "/api/inspection/hours/24",
            Some(json!({ "checkpoint": 1, "status": "pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.call(Method::POST, "/api/inspection/save", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/inspection/header",
            Some(json!({ "facility": "North", "date": "2024-05-01", "shift": "B", "inspector": "K. Ng" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exportFilename"], "inspection-form-North-2024-05-01.json");

    let (status, _) = app.call(Method::POST, "/api/inspection/save", None).await;
    assert_eq!(status, StatusCode::OK);
}
