use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use client::{AdminApi, GhostClient};
use ghostwatch_core::auth::Credential;
use ghostwatch_core::error::ClientError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "650b7a9f8e8c1234567890ab:1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";

fn client_for(server: &MockServer) -> GhostClient {
    GhostClient::new(&server.uri(), Credential::parse(KEY).unwrap())
}

fn issued_at(token: &str) -> i64 {
    let payload = token.split('.').nth(1).unwrap();
    let claims: serde_json::Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
    claims["iat"].as_i64().unwrap()
}

fn page_total(total: u64) -> serde_json::Value {
    json!({"meta": {"pagination": {"page": 1, "limit": 1, "pages": total, "total": total}}})
}

async fn mount_count(server: &MockServer, resource: &str, filter: Option<&str>, total: u64) {
    let mut mock = Mock::given(method("GET"))
        .and(path(format!("/ghost/api/admin/{}", resource)))
        .and(query_param("limit", "1"));
    if let Some(filter) = filter {
        mock = mock.and(query_param("filter", filter));
    }
    mock.respond_with(ResponseTemplate::new(200).set_body_json(page_total(total)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn site_info_sends_signed_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ghost/api/admin/site/"))
        .and(header("accept-version", "v5.0"))
        .and(header_regex("authorization", r"^Ghost [\w-]+\.[\w-]+\.[\w-]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "site": {"title": "Test Ghost", "url": "https://test.ghost.io", "version": "5.80"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let site = client_for(&server).site_info().await.expect("site ok");
    assert_eq!(site.title, "Test Ghost");
    assert_eq!(site.version.as_deref(), Some("5.80"));
}

#[tokio::test]
async fn each_request_gets_its_own_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ghost/api/admin/site/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"site": {"title": "T"}})))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let before = Utc::now().timestamp();
    client.site_info().await.unwrap();
    // iat has one-second resolution.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    client.site_info().await.unwrap();
    let after = Utc::now().timestamp();

    let requests = server.received_requests().await.unwrap();
    let tokens: Vec<&str> = requests
        .iter()
        .map(|r| {
            r.headers["authorization"]
                .to_str()
                .unwrap()
                .strip_prefix("Ghost ")
                .unwrap()
        })
        .collect();
    assert_eq!(tokens.len(), 2);
    assert_ne!(tokens[0], tokens[1]);

    let first = issued_at(tokens[0]);
    let second = issued_at(tokens[1]);
    assert!(first >= before);
    assert!(second > first);
    assert!(second <= after);
}

#[tokio::test]
async fn post_counts_read_pagination_totals() {
    let server = MockServer::start().await;
    mount_count(&server, "posts/", Some("status:published"), 42).await;
    mount_count(&server, "posts/", Some("status:draft"), 5).await;
    mount_count(&server, "posts/", Some("status:scheduled"), 2).await;

    let counts = client_for(&server).post_counts().await.unwrap();
    assert_eq!(counts.published, 42);
    assert_eq!(counts.drafts, 5);
    assert_eq!(counts.scheduled, 2);
}

#[tokio::test]
async fn member_counts_read_pagination_totals() {
    let server = MockServer::start().await;
    mount_count(&server, "members/", Some("status:paid"), 100).await;
    mount_count(&server, "members/", Some("status:free"), 850).await;
    mount_count(&server, "members/", Some("status:comped"), 50).await;
    // Unfiltered total; mounted last so the filtered mocks win.
    mount_count(&server, "members/", None, 1000).await;

    let counts = client_for(&server).member_counts().await.unwrap();
    assert_eq!(counts.total, 1000);
    assert_eq!(counts.paid, 100);
    assert_eq!(counts.free, 850);
    assert_eq!(counts.comped, 50);
}

#[tokio::test]
async fn latest_post_absent_when_no_posts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ghost/api/admin/posts/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"posts": []})))
        .mount(&server)
        .await;

    assert_eq!(client_for(&server).latest_post().await.unwrap(), None);
}

#[tokio::test]
async fn latest_post_maps_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ghost/api/admin/posts/"))
        .and(query_param("order", "published_at desc"))
        .and(query_param("filter", "status:published"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "posts": [{
                "title": "Latest Post",
                "slug": "latest-post",
                "url": "https://test.ghost.io/latest-post/",
                "published_at": "2026-01-15T10:00:00.000Z"
            }]
        })))
        .mount(&server)
        .await;

    let post = client_for(&server).latest_post().await.unwrap().unwrap();
    assert_eq!(post.title.as_deref(), Some("Latest Post"));
    assert_eq!(post.slug.as_deref(), Some("latest-post"));
    assert!(post.published_at.is_some());
}

#[tokio::test]
async fn latest_email_skips_posts_without_email() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ghost/api/admin/posts/"))
        .and(query_param("limit", "10"))
        .and(query_param("include", "email"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "posts": [
                {"title": "Web only", "email": null},
                {
                    "title": "Newsletter #1",
                    "email": {
                        "subject": "Newsletter #1",
                        "email_count": 500,
                        "delivered_count": 490,
                        "opened_count": 200,
                        "clicked_count": 50,
                        "failed_count": 10,
                        "submitted_at": "2026-01-15T10:00:00.000Z"
                    }
                }
            ]
        })))
        .mount(&server)
        .await;

    let campaign = client_for(&server).latest_email().await.unwrap().unwrap();
    assert_eq!(campaign.title.as_deref(), Some("Newsletter #1"));
    assert_eq!(campaign.email_count, 500);
    assert_eq!(campaign.opened_count, 200);
    assert_eq!(campaign.failed_count, 10);
}

#[tokio::test]
async fn social_web_uses_public_activity_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.ghost/activitypub/followers/index"))
        .and(header("accept", "application/activity+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalItems": 150})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/.ghost/activitypub/following/index"))
        .and(header("accept", "application/activity+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalItems": 25})))
        .mount(&server)
        .await;

    let stats = client_for(&server).social_web_stats().await.unwrap();
    assert_eq!(stats.followers, 150);
    assert_eq!(stats.following, 25);

    let requests = server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|r| r.headers.get("authorization").is_none()));
}

#[tokio::test]
async fn social_web_counts_fall_back_independently() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.ghost/activitypub/followers/index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalItems": 150})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/.ghost/activitypub/following/index"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let stats = client_for(&server).social_web_stats().await.unwrap();
    assert_eq!(stats.followers, 150);
    assert_eq!(stats.following, 0);
}

#[tokio::test]
async fn social_web_unavailable_reads_as_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let stats = client_for(&server).social_web_stats().await.unwrap();
    assert_eq!(stats.followers, 0);
    assert_eq!(stats.following, 0);
}

#[tokio::test]
async fn mrr_comments_and_newsletters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ghost/api/admin/stats/mrr/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stats": [],
            "meta": {"totals": [{"currency": "usd", "mrr": 500000}]}
        })))
        .mount(&server)
        .await;
    mount_count(&server, "comments/", None, 156).await;
    Mock::given(method("GET"))
        .and(path("/ghost/api/admin/newsletters/"))
        .and(query_param("include", "count.members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "newsletters": [
                {"id": "nl1", "name": "Weekly", "status": "active", "count": {"members": 800}},
                {"id": "nl2", "name": "Archive", "status": "archived", "count": {"members": 200}}
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mrr = client.mrr().await.unwrap();
    assert_eq!(mrr[0].amount, 500000);
    assert_eq!(client.comment_count().await.unwrap(), 156);

    let newsletters = client.newsletters().await.unwrap();
    assert_eq!(newsletters.len(), 2);
    assert_eq!(newsletters[1].subscribers, 200);
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{"message": "Invalid token", "type": "UnauthorizedError"}]
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).site_info().await.unwrap_err();
    assert!(err.is_auth(), "expected auth error, got {:?}", err);
}

#[tokio::test]
async fn forbidden_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    assert!(client_for(&server).comment_count().await.unwrap_err().is_auth());
}

#[tokio::test]
async fn server_error_maps_to_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = client_for(&server).site_info().await.unwrap_err();
    assert!(matches!(err, ClientError::Connection(_)));
}

#[tokio::test]
async fn malformed_body_maps_to_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>oops</html>", "text/html"))
        .mount(&server)
        .await;

    let err = client_for(&server).site_info().await.unwrap_err();
    assert!(matches!(err, ClientError::Connection(_)));
}

#[tokio::test]
async fn unreachable_host_maps_to_connection_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = GhostClient::new(&uri, Credential::parse(KEY).unwrap());
    let err = client.site_info().await.unwrap_err();
    assert!(matches!(err, ClientError::Connection(_)));
}

#[tokio::test]
async fn create_webhook_posts_event_and_target() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ghost/api/admin/webhooks/"))
        .and(body_partial_json(json!({
            "webhooks": [{"event": "member.added", "target_url": "https://home.example.com/api/webhook/ghost_x"}]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "webhooks": [{"id": "wh123", "event": "member.added", "target_url": "https://home.example.com/api/webhook/ghost_x"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let registration = client_for(&server)
        .create_webhook("member.added", "https://home.example.com/api/webhook/ghost_x")
        .await
        .unwrap();
    assert_eq!(registration.id, "wh123");
    assert_eq!(registration.event, "member.added");
}

#[tokio::test]
async fn delete_webhook_accepts_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/ghost/api/admin/webhooks/wh123/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).delete_webhook("wh123").await.unwrap();
}

#[tokio::test]
async fn requests_after_close_reopen_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ghost/api/admin/site/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"site": {"title": "T"}})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.site_info().await.unwrap();
    client.close().await;
    assert!(!client.is_open().await);

    client.site_info().await.unwrap();
    assert!(client.is_open().await);
    client.close().await;
}
