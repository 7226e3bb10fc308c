//! End-to-end filtering through a real listener and upstream.

use std::collections::HashSet;

use edge_gateway::http::X_CORRELATION_ID;
use reqwest::StatusCode;

mod common;

use common::{client, config_for, start_echo_backend, TestGateway};

#[tokio::test]
async fn test_public_route_forwarded_without_token() {
    let upstream = start_echo_backend().await;
    let gateway = TestGateway::start(config_for(upstream)).await;

    let res = client()
        .post(gateway.url("/api/users/login"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key(X_CORRELATION_ID.as_str()));
    let body = res.text().await.unwrap();
    assert!(body.starts_with("POST /api/users/login HTTP/1.1"));
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let upstream = start_echo_backend().await;
    let gateway = TestGateway::start(config_for(upstream)).await;

    let res = client().get(gateway.url("/api/books")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], 401);
    assert!(body["correlation_id"].as_str().is_some());

    let res = client()
        .get(gateway.url("/api/books"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_identity_headers_forwarded_and_spoofing_stripped() {
    let upstream = start_echo_backend().await;
    let gateway = TestGateway::start(config_for(upstream)).await;
    let token = gateway.token("alice@example.com", "USER");

    let res = client()
        .get(gateway.url("/api/books/7"))
        .bearer_auth(&token)
        .header("X-Auth-Role", "ADMIN")
        .header(X_CORRELATION_ID.as_str(), "trace-42")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[X_CORRELATION_ID.as_str()], "trace-42");

    let head = res.text().await.unwrap().to_ascii_lowercase();
    assert!(head.contains("x-auth-subject: alice@example.com"));
    assert!(head.contains("x-auth-role: user"));
    assert!(!head.contains("x-auth-role: admin"));
    assert!(head.contains("x-correlation-id: trace-42"));
    assert!(head.contains("x-forwarded-for: 127.0.0.1"));
}

#[tokio::test]
async fn test_role_enforced_on_mutations() {
    let upstream = start_echo_backend().await;
    let gateway = TestGateway::start(config_for(upstream)).await;

    let user = gateway.token("reader", "USER");
    let res = client()
        .delete(gateway.url("/api/users/3"))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client()
        .get(gateway.url("/api/users/3"))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let admin = gateway.token("root", "ROLE_ADMIN");
    let res = client()
        .delete(gateway.url("/api/users/3"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_per_identity() {
    let upstream = start_echo_backend().await;
    let gateway = TestGateway::start(config_for(upstream)).await;
    let token = gateway.token("burst", "USER");
    let client = client();

    for i in 0..10 {
        let res = client
            .get(gateway.url("/api/loans"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "request {}", i + 1);
    }

    let res = client
        .get(gateway.url("/api/loans"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers().contains_key(X_CORRELATION_ID.as_str()));

    let other = gateway.token("calm", "USER");
    let res = client
        .get(gateway.url("/api/loans"))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_generated_correlation_ids_are_distinct() {
    let upstream = start_echo_backend().await;
    let gateway = TestGateway::start(config_for(upstream)).await;
    let client = client();

    let mut ids = HashSet::new();
    for _ in 0..5 {
        let res = client
            .get(gateway.url("/actuator/health"))
            .send()
            .await
            .unwrap();
        let id = res.headers()[X_CORRELATION_ID.as_str()]
            .to_str()
            .unwrap()
            .to_string();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        ids.insert(id);
    }
    assert_eq!(ids.len(), 5);
}
