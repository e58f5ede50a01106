//! Integration tests for the Twitchy SDK

use futures::TryStreamExt;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use twitchy_sdk::rate_limit::RATE_LIMITED_BACKOFF;
use twitchy_sdk::{
    ApiError, AuthEndpoints, AuthError, ClientBuilder, HelixClient, HelixRequest, HelixResponse,
    HttpTokenGrant, Page, ProviderState, TokenGrant, TokenMode,
};
use wiremock::matchers::{
    body_string_contains, header, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_body(token: &str, expires_in: u64) -> Value {
    json!({
        "access_token": token,
        "expires_in": expires_in,
        "token_type": "bearer",
        "scope": [],
    })
}

fn users_body() -> Value {
    json!({
        "data": [{
            "id": "141981764",
            "login": "twitchdev",
            "display_name": "TwitchDev",
            "type": "",
            "broadcaster_type": "partner",
            "description": "Supporting third-party developers",
            "profile_image_url": "https://example.com/p.png",
            "offline_image_url": "https://example.com/o.png",
            "view_count": 5980557,
            "created_at": "2016-12-14T20:32:28Z"
        }]
    })
}

fn unauthorized_body() -> Value {
    json!({"error": "Unauthorized", "status": 401, "message": "Invalid OAuth token"})
}

fn builder(server: &MockServer) -> ClientBuilder {
    ClientBuilder::default()
        .client_id("test-client")
        .base_url(format!("{}/helix", server.uri()))
        .auth_endpoints(AuthEndpoints::with_base(&server.uri()))
        .expiry_margin(Duration::ZERO)
        .timeout(Duration::from_secs(5))
}

fn app_client(server: &MockServer) -> HelixClient {
    builder(server).client_secret("test-secret").build().unwrap()
}

async fn mount_token(server: &MockServer, token: &str, expires_in: u64, times: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=test-client"))
        .and(body_string_contains("client_secret=test-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(token, expires_in)))
        .up_to_n_times(times)
        .expect(times)
        .mount(server)
        .await;
}

/// Accept connections forever, answering each request with `status` and a
/// body shorter than its declared length
async fn truncated_body_server(status: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{{\"message\":"
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

/// Consume one HTTP request, headers and body
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                return;
            }
        }
    }
}

fn streams_page(ids: &[&str], cursor: Option<&str>) -> Value {
    let data: Vec<Value> = ids.iter().map(|id| json!({"id": id})).collect();
    let pagination = match cursor {
        Some(cursor) => json!({"cursor": cursor}),
        None => json!({}),
    };
    json!({"data": data, "pagination": pagination})
}

#[tokio::test]
async fn test_app_token_fetched_once_and_cached() {
    let server = MockServer::start().await;
    mount_token(&server, "app-token", 3600, 1).await;

    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .and(query_param("login", "twitchdev"))
        .and(header("Client-Id", "test-client"))
        .and(header("Authorization", "Bearer app-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(users_body()))
        .expect(2)
        .mount(&server)
        .await;

    let client = app_client(&server);
    assert_eq!(
        client.token_provider().state().await,
        ProviderState::Unauthenticated
    );

    let users = client.get_users(&[], &["twitchdev"]).await.unwrap();
    assert_eq!(users[0].display_name, "TwitchDev");

    let users = client.get_users(&[], &["twitchdev"]).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(
        client.token_provider().state().await,
        ProviderState::AppTokenValid
    );
}

#[tokio::test]
async fn test_expired_app_token_is_replaced() {
    let server = MockServer::start().await;
    mount_token(&server, "first", 0, 1).await;
    mount_token(&server, "second", 3600, 1).await;

    let client = app_client(&server);
    let provider = client.token_provider();

    let first = provider.get_token().await.unwrap();
    assert_eq!(first.value, "first");
    assert_eq!(provider.state().await, ProviderState::AppTokenExpired);

    let second = provider.get_token().await.unwrap();
    assert_eq!(second.value, "second");
    assert_eq!(provider.cached_token().await.unwrap().value, "second");
}

#[tokio::test]
async fn test_unauthorized_app_token_is_refetched_once() {
    let server = MockServer::start().await;
    mount_token(&server, "stale", 3600, 1).await;
    mount_token(&server, "fresh", 3600, 1).await;

    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(unauthorized_body()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(users_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = app_client(&server);
    let users = client.get_users(&["141981764"], &[]).await.unwrap();

    assert_eq!(users[0].id, "141981764");
    assert_eq!(
        client.token_provider().cached_token().await.unwrap().value,
        "fresh"
    );
}

#[tokio::test]
async fn test_second_unauthorized_surfaces_without_third_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("app-token", 3600)))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .respond_with(ResponseTemplate::new(401).set_body_json(unauthorized_body()))
        .expect(2)
        .mount(&server)
        .await;

    let client = app_client(&server);
    let err = client.get_users(&["1"], &[]).await.unwrap_err();

    match err {
        ApiError::Authentication { status, message } => {
            assert_eq!(status, Some(401));
            assert_eq!(message, "Invalid OAuth token");
        }
        other => panic!("expected authentication error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_user_token_is_not_refreshed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("app-token", 3600)))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .and(header("Authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(unauthorized_body()))
        .expect(1)
        .mount(&server)
        .await;

    // Secret present too: the user token still wins
    let client = builder(&server)
        .client_secret("test-secret")
        .oauth_token("user-token")
        .build()
        .unwrap();

    let err = client.get_users(&["1"], &[]).await.unwrap_err();
    assert!(err.is_authentication());
    assert_eq!(
        client.token_provider().state().await,
        ProviderState::UserToken
    );
    let token = client.token_provider().get_token().await.unwrap();
    assert!(client.token_provider().invalidate(&token).await.is_err());
}

#[tokio::test]
async fn test_failed_grant_leaves_provider_unauthenticated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"status": 403, "message": "invalid client secret"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(users_body()))
        .expect(0)
        .mount(&server)
        .await;

    let client = app_client(&server);
    let err = client.get_users(&["1"], &[]).await.unwrap_err();

    match err {
        ApiError::Authentication { status, message } => {
            assert_eq!(status, Some(403));
            assert_eq!(message, "invalid client secret");
        }
        other => panic!("expected authentication error, got {other:?}"),
    }
    assert_eq!(
        client.token_provider().state().await,
        ProviderState::Unauthenticated
    );
    assert!(client.token_provider().cached_token().await.is_none());
}

#[tokio::test]
async fn test_concurrent_callers_share_one_grant() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("shared-token", 3600))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = app_client(&server);
    let provider = client.token_provider();

    let results =
        futures::future::join_all((0..5).map(|_| provider.get_token())).await;

    for result in results {
        let token = result.unwrap();
        assert_eq!(token.value, "shared-token");
        assert_eq!(token.mode, TokenMode::AppGenerated);
    }
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let server = MockServer::start().await;
    mount_token(&server, "app-token", 3600, 1).await;

    // Reset already in the past, so no waiting
    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Ratelimit-Remaining", "0")
                .insert_header("Ratelimit-Reset", "1"),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Ratelimit-Remaining", "799")
                .set_body_json(users_body()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = app_client(&server);
    let users = client.get_users(&["1"], &[]).await.unwrap();

    assert_eq!(users.len(), 1);
    let snapshot = client.rate_limits().snapshot().await;
    assert_eq!(snapshot.remaining, Some(799));
    assert_eq!(snapshot.reset_at, Some(1));
}

#[tokio::test]
async fn test_rate_limit_retries_are_bounded() {
    let server = MockServer::start().await;
    mount_token(&server, "app-token", 3600, 1).await;

    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": "Too Many Requests",
            "status": 429,
            "message": "rate limit exceeded"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = builder(&server)
        .client_secret("test-secret")
        .max_rate_limit_retries(1)
        .build()
        .unwrap();

    let err = client.get_users(&["1"], &[]).await.unwrap_err();
    assert!(err.is_rate_limited());
    assert_eq!(err.status(), Some(429));
}

#[tokio::test]
async fn test_error_status_classes_are_not_retried() {
    let server = MockServer::start().await;
    mount_token(&server, "app-token", 3600, 1).await;

    Mock::given(method("GET"))
        .and(path("/helix/streams"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/helix/games"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "Bad Request",
            "status": 400,
            "message": "Missing required parameter \"id\""
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/helix/channels"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let client = app_client(&server);

    let err = client.get::<Value>("streams", &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 503, .. }));

    let err = client.get::<Value>("games", &[]).await.unwrap_err();
    match err {
        ApiError::ClientRequest { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Missing required parameter \"id\"");
        }
        other => panic!("expected client request error, got {other:?}"),
    }

    let err = client
        .get::<Value>("channels", &[("broadcaster_id", "1")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Authentication {
            status: Some(403),
            ..
        }
    ));
}

#[tokio::test]
async fn test_send_posts_json_body() {
    let server = MockServer::start().await;
    mount_token(&server, "app-token", 3600, 1).await;

    Mock::given(method("POST"))
        .and(path("/helix/eventsub/subscriptions"))
        .and(header("Authorization", "Bearer app-token"))
        .and(body_string_contains("stream.online"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"data": [], "total": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let client = app_client(&server);
    let request = HelixRequest::post("eventsub/subscriptions")
        .json(json!({"type": "stream.online", "version": "1"}));

    let response: Value = client.send_json(request).await.unwrap();
    assert_eq!(response["total"], 1);
}

#[tokio::test]
async fn test_validate_user_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/oauth2/validate"))
        .and(header("Authorization", "OAuth user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "client_id": "test-client",
            "login": "twitchdev",
            "scopes": ["channel:read:subscriptions"],
            "user_id": "141981764",
            "expires_in": 5520838
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = builder(&server).oauth_token("user-token").build().unwrap();
    let validation = client.validate_token().await.unwrap();

    assert_eq!(validation.client_id, "test-client");
    assert_eq!(validation.login.as_deref(), Some("twitchdev"));
    assert_eq!(validation.scopes, vec!["channel:read:subscriptions"]);
}

#[tokio::test]
async fn test_validate_rejected_app_token_clears_cache() {
    let server = MockServer::start().await;
    mount_token(&server, "app-token", 3600, 1).await;

    Mock::given(method("GET"))
        .and(path("/oauth2/validate"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": 401,
            "message": "invalid access token"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = app_client(&server);
    let err = client.validate_token().await.unwrap_err();

    assert!(matches!(
        err,
        ApiError::Authentication {
            status: Some(401),
            ..
        }
    ));
    assert_eq!(
        client.token_provider().state().await,
        ProviderState::Unauthenticated
    );
}

#[tokio::test]
async fn test_connect_fetches_app_token_eagerly() {
    let server = MockServer::start().await;
    mount_token(&server, "eager-token", 3600, 1).await;

    let client = builder(&server)
        .client_secret("test-secret")
        .connect()
        .await
        .unwrap();

    assert_eq!(
        client.token_provider().state().await,
        ProviderState::AppTokenValid
    );
}

#[tokio::test]
async fn test_revoke_app_token() {
    let server = MockServer::start().await;
    mount_token(&server, "app-token", 3600, 1).await;

    Mock::given(method("POST"))
        .and(path("/oauth2/revoke"))
        .and(body_string_contains("token=app-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = app_client(&server);
    client.token_provider().get_token().await.unwrap();
    client.token_provider().revoke().await.unwrap();

    assert_eq!(
        client.token_provider().state().await,
        ProviderState::Unauthenticated
    );
}

#[tokio::test]
async fn test_late_unauthorized_does_not_discard_refreshed_token() {
    let server = MockServer::start().await;
    mount_token(&server, "stale", 3600, 1).await;
    mount_token(&server, "fresh", 3600, 1).await;

    Mock::given(method("GET"))
        .and(path("/helix/a"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(unauthorized_body()))
        .expect(1)
        .mount(&server)
        .await;

    // Rejected only after the first request has already refreshed
    Mock::given(method("GET"))
        .and(path("/helix/b"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(unauthorized_body())
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(2)
        .mount(&server)
        .await;

    let client = app_client(&server);
    let (a, b) = tokio::join!(
        client.get::<Value>("a", &[]),
        client.get::<Value>("b", &[])
    );

    a.unwrap();
    b.unwrap();
    assert_eq!(
        client.token_provider().cached_token().await.unwrap().value,
        "fresh"
    );
}

#[tokio::test]
async fn test_pages_follow_cursors_to_last_page() {
    let server = MockServer::start().await;
    mount_token(&server, "app-token", 3600, 1).await;

    Mock::given(method("GET"))
        .and(path("/helix/streams"))
        .and(query_param("game_id", "33214"))
        .and(query_param("first", "2"))
        .and(query_param("after", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(streams_page(&["5"], None)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/helix/streams"))
        .and(query_param("game_id", "33214"))
        .and(query_param("first", "2"))
        .and(query_param("after", "c1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(streams_page(&["3", "4"], Some("c2"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/helix/streams"))
        .and(query_param("game_id", "33214"))
        .and(query_param("first", "2"))
        .and(query_param_is_missing("after"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(streams_page(&["1", "2"], Some("c1"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = app_client(&server);
    let request = HelixRequest::get("streams").query("game_id", "33214");

    let pages: Vec<HelixResponse<Value>> =
        client.pages(request, Some(2)).try_collect().await.unwrap();

    let ids: Vec<&str> = pages
        .iter()
        .flat_map(|page| page.data.iter())
        .filter_map(|stream| stream["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[2].next_cursor(), None);
}

#[tokio::test]
async fn test_get_page_before_cursor() {
    let server = MockServer::start().await;
    mount_token(&server, "app-token", 3600, 1).await;

    Mock::given(method("GET"))
        .and(path("/helix/streams"))
        .and(query_param("before", "c2"))
        .and(query_param_is_missing("after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "3"}],
            "pagination": {"cursor": "c1"},
            "total": 5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = app_client(&server);
    // A stale cursor on the request is replaced by the requested page
    let request = HelixRequest::get("streams").query("after", "c9");

    let page: HelixResponse<Value> = client
        .get_page(request, &Page::Before("c2".into()), None)
        .await
        .unwrap();

    assert_eq!(page.total, Some(5));
    assert_eq!(Page::previous(&page), Some(Page::Before("c1".into())));
}

#[tokio::test]
async fn test_undecodable_body_is_a_serialization_error() {
    let server = MockServer::start().await;
    mount_token(&server, "app-token", 3600, 1).await;

    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = app_client(&server);
    let err = client.get_users(&["1"], &[]).await.unwrap_err();

    assert!(matches!(err, ApiError::Serialization(_)));
    assert_eq!(err.error_code(), "TWITCHY_SERIALIZATION_ERROR");
}

#[tokio::test]
async fn test_rate_limit_without_headers_backs_off() {
    let server = MockServer::start().await;
    mount_token(&server, "app-token", 3600, 1).await;

    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(users_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = app_client(&server);
    let started = Instant::now();
    client.get_users(&["1"], &[]).await.unwrap();

    assert!(started.elapsed() >= RATE_LIMITED_BACKOFF);
}

#[tokio::test]
async fn test_truncated_helix_error_body_is_reported() {
    let uri = truncated_body_server("401 Unauthorized").await;

    let client = ClientBuilder::default()
        .client_id("test-client")
        .oauth_token("user-token")
        .base_url(format!("{uri}/helix"))
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let err = client.get_users(&["1"], &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::HttpClient(_)));
}

#[tokio::test]
async fn test_truncated_grant_error_body_is_reported() {
    let uri = truncated_body_server("403 Forbidden").await;

    let grant = HttpTokenGrant::new(AuthEndpoints::with_base(&uri), Duration::from_secs(5)).unwrap();
    let err = grant
        .client_credentials("test-client", "test-secret")
        .await
        .unwrap_err();

    match err {
        AuthError::Network(message) => assert!(message.contains("403")),
        other => panic!("expected network error, got {other:?}"),
    }
}
