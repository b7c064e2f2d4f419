//! Helper methods only available for tests
use crate::{Context, Settings};
use assert_json_diff::assert_json_include;
use http::{Method, Request, Response, StatusCode};
use kube::{Client, client::Body};
use serde_json::{Value, json};
use std::time::Duration;

type ApiServerHandle = tower_test::mock::Handle<Request<Body>, Response<Body>>;

/// Scripted stand-in for the Kubernetes API server
pub struct ApiServerVerifier(ApiServerHandle);

/// One request the code under test is expected to send, and the canned answer
pub struct Expect {
    method: Method,
    path: String,
    query: Vec<String>,
    body: Option<Value>,
    status: StatusCode,
    response: Value,
}

impl Expect {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: vec![],
            body: None,
            status: StatusCode::OK,
            response: json!({}),
        }
    }

    /// `key=value` pair that must be present in the query string
    pub fn query(mut self, pair: &str) -> Self {
        self.query.push(pair.to_string());
        self
    }

    /// The request body must contain at least this JSON
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn respond(mut self, status: StatusCode, response: Value) -> Self {
        self.status = status;
        self.response = response;
        self
    }

    pub fn not_found(self, name: &str) -> Self {
        self.respond(
            StatusCode::NOT_FOUND,
            json!({
                "kind": "Status",
                "apiVersion": "v1",
                "metadata": {},
                "status": "Failure",
                "message": format!("serviceaccounts \"{name}\" not found"),
                "reason": "NotFound",
                "details": {"name": name, "kind": "serviceaccounts"},
                "code": 404
            }),
        )
    }
}

impl ApiServerVerifier {
    /// Answer the expected requests in order, failing on the first mismatch
    pub fn run(mut self, expectations: Vec<Expect>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            for expect in expectations {
                self.handle(expect).await;
            }
        })
    }

    async fn handle(&mut self, expect: Expect) {
        let (request, send) = self.0.next_request().await.expect("service not called");
        assert_eq!(request.method(), &expect.method);
        assert_eq!(request.uri().path(), expect.path.as_str());

        let query = request.uri().query().unwrap_or_default().to_string();
        for pair in &expect.query {
            assert!(
                query.split('&').any(|p| p == pair.as_str()),
                "query {query:?} is missing {pair:?}"
            );
        }

        if let Some(expected) = expect.body {
            let body = request.into_body().collect_bytes().await.unwrap();
            let actual: Value = serde_json::from_slice(&body).expect("request body is json");
            assert_json_include!(actual: actual, expected: expected);
        }

        let response = serde_json::to_vec(&expect.response).unwrap();
        send.send_response(
            Response::builder()
                .status(expect.status)
                .body(Body::from(response))
                .unwrap(),
        );
    }
}

/// Settings tuned so polling finishes quickly under test
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.apply.poll_interval_millis = 1;
    settings.apply.wait_timeout_seconds = 1;
    settings.apply.delete_timeout_seconds = 1;
    settings
}

/// Create a context backed by a mocked API server
pub fn testcontext() -> (Context, ApiServerVerifier) {
    let (mock_service, handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
    let mock_client = Client::new(mock_service, "default");
    (Context::new(mock_client, test_settings()), ApiServerVerifier(handle))
}

/// Wait for the scripted API server to finish, failing if it panicked or stalled
pub async fn timeout_after_1s(handle: tokio::task::JoinHandle<()>) {
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("timeout on mock apiserver")
        .expect("scenario succeeded")
}

/// ServiceAccount as the API server would return it
pub fn service_account_object(namespace: &str, name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "ServiceAccount",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": "5f2d3c9e-8a41-4b7e-9f0c-2f1d6a7b8c90",
            "resourceVersion": "4821",
            "creationTimestamp": "2026-10-19T10:00:00Z",
            "labels": {"app.kubernetes.io/name": name},
        },
        "automountServiceAccountToken": false,
        "imagePullSecrets": [{"name": "registry"}],
    })
}
