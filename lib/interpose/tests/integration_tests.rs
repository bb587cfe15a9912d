//! Integration tests for `HyperBackend` using wiremock.

use std::time::Duration;

use assert2::{check, let_assert};
use futures_util::StreamExt;
use interpose::{
    AbortSignal, BackendConfig, Error, HttpBackend, HttpEvent, HttpEventType, HyperBackend,
    InterceptorHandler, Request, ResponseBody, ResponseType,
};
use serde::{Deserialize, Serialize};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

fn url(server: &MockServer, route: &str) -> url::Url {
    url::Url::parse(&format!("{}{route}", server.uri())).expect("url")
}

async fn collect(backend: &HyperBackend, request: Request) -> Vec<interpose::Result<HttpEvent>> {
    backend.handle(request).collect().await
}

#[tokio::test]
async fn test_get_request() {
    let mock_server = MockServer::start().await;

    let user = User {
        id: 1,
        name: "Alice".to_string(),
    };

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&user))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = Request::get(url(&mock_server, "/users/1"))
        .header("Accept", "application/json")
        .build();

    let events = collect(&HyperBackend::new(), request).await;

    let_assert!([Ok(HttpEvent::Sent), Ok(HttpEvent::Response(response))] = events.as_slice());
    check!(response.is_success());
    check!(response.status() == 200);
    check!(response.url() == Some(&url(&mock_server, "/users/1")));

    let body: User = response.clone().json().expect("json");
    check!(body == user);
}

#[tokio::test]
async fn test_post_request_with_json_body() {
    let mock_server = MockServer::start().await;

    let input = User {
        id: 0,
        name: "Bob".to_string(),
    };
    let output = User {
        id: 42,
        name: "Bob".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(&input))
        .respond_with(ResponseTemplate::new(201).set_body_json(&output))
        .expect(1)
        .mount(&mock_server)
        .await;

    let handler = InterceptorHandler::builder(HyperBackend::new()).build();
    let request = Request::post(url(&mock_server, "/users"))
        .json(&input)
        .expect("json body")
        .build();

    let response = handler.send(request).await.expect("response");

    check!(response.status() == 201);
    check!(response.json::<User>().expect("json") == output);
}

#[tokio::test]
async fn test_error_status_becomes_http_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("X-Request-Id", "abc")
                .set_body_json(serde_json::json!({"message": "no such user"})),
        )
        .mount(&mock_server)
        .await;

    let request = Request::get(url(&mock_server, "/missing")).build();
    let events = collect(&HyperBackend::new(), request).await;

    let_assert!([Ok(HttpEvent::Sent), Err(error)] = events.as_slice());
    check!(error.status() == Some(404));
    check!(error.is_client_error());
    check!(error.url() == Some(url(&mock_server, "/missing").as_str()));
    check!(error.headers().and_then(|headers| headers.get("x-request-id")) == Some("abc"));
    check!(error.body().is_some());
}

#[tokio::test]
async fn test_invalid_json_becomes_parse_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&mock_server)
        .await;

    let request = Request::get(url(&mock_server, "/broken")).build();
    let events = collect(&HyperBackend::new(), request).await;

    let_assert!(Some(Err(error)) = events.last());
    check!(error.is_parse());
    check!(error.status() == Some(200));
}

#[tokio::test]
async fn test_response_types() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&mock_server)
        .await;

    let backend = HyperBackend::new();

    let request = Request::get(url(&mock_server, "/plain"))
        .response_type(ResponseType::Text)
        .build();
    let events = collect(&backend, request).await;
    let_assert!(Some(Ok(HttpEvent::Response(response))) = events.last());
    check!(response.text() == Some("hello"));

    let request = Request::get(url(&mock_server, "/plain"))
        .response_type(ResponseType::Blob)
        .build();
    let events = collect(&backend, request).await;
    let_assert!(Some(Ok(HttpEvent::Response(response))) = events.last());
    check!(response.body() == &ResponseBody::Binary(bytes::Bytes::from_static(b"hello")));
}

#[tokio::test]
async fn test_progress_events() {
    let mock_server = MockServer::start().await;
    let body = "x".repeat(4096);

    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .mount(&mock_server)
        .await;

    let request = Request::get(url(&mock_server, "/download"))
        .response_type(ResponseType::Text)
        .report_progress(true)
        .build();
    let events = collect(&HyperBackend::new(), request).await;

    let kinds: Vec<_> = events
        .iter()
        .filter_map(|item| item.as_ref().ok().map(HttpEvent::event_type))
        .collect();
    check!(kinds.first() == Some(&HttpEventType::Sent));
    check!(kinds.get(1) == Some(&HttpEventType::ResponseHeader));
    check!(kinds.last() == Some(&HttpEventType::Response));

    let last_progress = events.iter().rev().find_map(|item| match item {
        Ok(HttpEvent::DownloadProgress { loaded, total }) => Some((*loaded, *total)),
        _ => None,
    });
    check!(last_progress == Some((4096, Some(4096))));
}

#[tokio::test]
async fn test_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let backend = HyperBackend::with_config(
        BackendConfig::builder()
            .timeout(Duration::from_millis(100))
            .build(),
    );
    let request = Request::get(url(&mock_server, "/slow")).build();
    let events = collect(&backend, request).await;

    let_assert!([Ok(HttpEvent::Sent), Err(Error::Timeout)] = events.as_slice());
}

#[tokio::test]
async fn test_abort_stops_without_further_events() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let signal = AbortSignal::new();
    let request = Request::get(url(&mock_server, "/slow"))
        .abort_signal(signal.clone())
        .build();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        signal.abort();
    });

    let events = tokio::time::timeout(Duration::from_secs(2), collect(&HyperBackend::new(), request))
        .await
        .expect("aborted before the delay elapsed");

    let_assert!([Ok(HttpEvent::Sent)] = events.as_slice());
}

#[tokio::test]
async fn test_connection_error() {
    let request = Request::get(url::Url::parse("http://127.0.0.1:1/").expect("url")).build();
    let events = collect(&HyperBackend::new(), request).await;

    let_assert!(Some(Err(error)) = events.last());
    check!(error.is_connection());
}
