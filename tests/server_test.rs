mod helpers;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use helpers::{
    raw_upstream, sse_body, sse_frame, test_settings, test_state, COMPLETIONS_PATH,
    PARTIAL_STREAM_HEAD,
};
use mockito::Matcher;
use timewarp::provider::Provider;
use timewarp::server::router;
use timewarp::settings::Settings;
use tower::ServiceExt;

async fn send(state: timewarp::server::SharedState, request: Request<Body>) -> Response {
    router(state).oneshot(request).await.unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn story_streams_plain_text() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", COMPLETIONS_PATH)
        .with_status(200)
        .with_body(sse_body(&["你", "站在", "西安"]))
        .create_async()
        .await;
    let state = test_state(&server.url(), test_settings(Provider::Qwen));

    let response = send(
        state,
        post_json("/api/history/story", serde_json::json!({"location": "西安", "era": "ancient"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(body_text(response).await, "你站在西安");
}

#[tokio::test]
async fn trailing_slash_routes_are_accepted() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", COMPLETIONS_PATH)
        .with_status(200)
        .with_body(sse_body(&["好"]))
        .create_async()
        .await;
    let state = test_state(&server.url(), test_settings(Provider::Qwen));

    let response = send(
        state,
        post_json("/api/history/story/", serde_json::json!({"location": "北京"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_location_is_a_bad_request() {
    let state = test_state("http://127.0.0.1:1", test_settings(Provider::Qwen));

    for body in [serde_json::json!({"era": "modern"}), serde_json::json!({"location": "  "})] {
        let response = send(state.clone(), post_json("/api/history/story", body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "location is required");
    }
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let state = test_state("http://127.0.0.1:1", test_settings(Provider::Qwen));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/history/story")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = send(state, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn missing_credential_is_a_server_error() {
    let state = test_state("http://127.0.0.1:1", Settings::default());

    let response = send(
        state,
        post_json("/api/history/story", serde_json::json!({"location": "上海"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = body_json(response).await["error"].as_str().unwrap().to_string();
    assert!(error.contains("settings set-key qwen"), "{error}");
}

#[tokio::test]
async fn upstream_failure_is_a_server_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", COMPLETIONS_PATH)
        .with_status(401)
        .with_body("invalid api key")
        .create_async()
        .await;
    let state = test_state(&server.url(), test_settings(Provider::Qwen));

    let response = send(
        state,
        post_json("/api/history/story", serde_json::json!({"location": "杭州"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = body_json(response).await["error"].as_str().unwrap().to_string();
    assert!(error.contains("401"), "{error}");
}

#[tokio::test]
async fn interrupted_upstream_aborts_the_body() {
    let upstream = raw_upstream(format!("{PARTIAL_STREAM_HEAD}{}", sse_frame("你站在")), false).await;
    let state = test_state(&upstream.url, test_settings(Provider::Qwen));

    let response = send(
        state,
        post_json("/api/history/story", serde_json::json!({"location": "西安"})),
    )
    .await;

    // headers went out before the upstream dropped, so only the body can fail
    assert_eq!(response.status(), StatusCode::OK);
    assert!(to_bytes(response.into_body(), usize::MAX).await.is_err());
}

#[tokio::test]
async fn story_follows_updated_settings() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", format!("/deepseek{COMPLETIONS_PATH}").as_str())
        .match_header("authorization", "Bearer sk-deep")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "model": "deepseek-reasoner",
            "max_tokens": 800,
            "stream": true
        })))
        .with_status(200)
        .with_body(sse_body(&["特区"]))
        .create_async()
        .await;
    let state = test_state(&server.url(), test_settings(Provider::Qwen));
    state
        .settings
        .update(|s| {
            s.set_provider(Provider::DeepSeek);
            s.selected_model = Some("deepseek-reasoner".into());
            s.set_max_tokens(800);
        })
        .unwrap();

    let response = send(
        state,
        post_json("/api/history/story", serde_json::json!({"location": "深圳", "era": "contemporary"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "特区");
    mock.assert_async().await;
}

#[tokio::test]
async fn ask_requires_a_question() {
    let state = test_state("http://127.0.0.1:1", test_settings(Provider::Qwen));

    let response = send(
        state,
        post_json("/api/history/ask", serde_json::json!({"location": "南京", "era": "modern"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid request: question is required");
}

#[tokio::test]
async fn ask_streams_the_answer() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", COMPLETIONS_PATH)
        .with_status(200)
        .with_body(sse_body(&["中山陵", "位于紫金山。"]))
        .create_async()
        .await;
    let state = test_state(&server.url(), test_settings(Provider::Qwen));

    let response = send(
        state,
        post_json(
            "/api/history/ask",
            serde_json::json!({"location": "南京", "era": "modern", "question": "中山陵在哪里？"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "中山陵位于紫金山。");
}

#[tokio::test]
async fn preflight_carries_cors_headers() {
    let state = test_state("http://127.0.0.1:1", Settings::default());
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/history/story")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = send(state, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("POST") && methods.contains("GET"), "{methods}");
    let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS].to_str().unwrap();
    assert!(allowed.eq_ignore_ascii_case("content-type"), "{allowed}");
}

#[tokio::test]
async fn edge_info_derives_geo_from_headers() {
    let state = test_state("http://127.0.0.1:1", Settings::default());
    let request = Request::builder()
        .uri("/api/edge/info/")
        .header("x-real-ip", "198.51.100.4")
        .header("x-geo-country", "CN")
        .header("x-geo-city", "北京")
        .header("x-geo-latitude", "39.90")
        .header("cf-ray", "7d1f00aa-PEK")
        .body(Body::empty())
        .unwrap();

    let response = send(state, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["geo"]["ip"], "198.51.100.4");
    assert_eq!(json["geo"]["city"], "北京");
    assert_eq!(json["geo"]["countryName"], "中国");
    assert_eq!(json["geo"]["latitude"], 39.9);
    assert!(json["geo"]["longitude"].is_null());
    assert_eq!(json["edgeNode"], "PEK");
    assert_eq!(json["recommendations"][0]["title"], "紫禁城的故事");
    assert!(json["timestamp"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn places_lists_recommendations() {
    let state = test_state("http://127.0.0.1:1", Settings::default());
    let request = Request::builder()
        // city=上海
        .uri("/api/places?city=%E4%B8%8A%E6%B5%B7")
        .body(Body::empty())
        .unwrap();

    let json = body_json(send(state, request).await).await;
    assert_eq!(json[0]["era"], "modern");
    assert_eq!(json[0]["title"], "十里洋场");
}

#[tokio::test]
async fn unknown_path_and_wrong_method() {
    let state = test_state("http://127.0.0.1:1", Settings::default());

    let response = send(
        state.clone(),
        Request::builder().uri("/nope").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Not found");

    let response = send(
        state,
        Request::builder()
            .uri("/api/history/story")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
