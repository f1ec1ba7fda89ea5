use futures_util::StreamExt;
use node_rpc::{NodeClient, NodeClientOptions, NodeError};
use reqwest::{Body, Url};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HASH: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

fn client_for(server: &MockServer) -> NodeClient {
    let base = Url::parse(&format!("{}/api/v0/", server.uri())).unwrap();
    NodeClient::new(base, NodeClientOptions::default()).unwrap()
}

#[tokio::test]
async fn refs_local_parses_ndjson_lines() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/refs/local"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "{{\"Ref\":\"{}\",\"Err\":\"\"}}\n{{\"Ref\":\"QmOther1234567\",\"Err\":\"\"}}\n",
            HASH
        )))
        .expect(1)
        .mount(&server)
        .await;

    let refs = client_for(&server).refs_local().await.unwrap();
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0].reference, HASH);
}

#[tokio::test]
async fn base_without_trailing_slash_still_targets_rpc_root() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/refs/local"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    let base = Url::parse(&format!("{}/api/v0", server.uri())).unwrap();
    let client = NodeClient::new(base, NodeClientOptions::default()).unwrap();
    assert!(client.base_url().path().ends_with("/api/v0/"));
    assert!(client.refs_local().await.unwrap().is_empty());
}

#[tokio::test]
async fn add_sends_file_part_and_returns_first_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .and(query_param("pin", "true"))
        .and(query_param("cid-version", "0"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("hello node"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "{{\"Name\":\"upload.tmp\",\"Hash\":\"{}\",\"Size\":\"18\"}}\n",
            HASH
        )))
        .expect(1)
        .mount(&server)
        .await;

    let added = client_for(&server)
        .add(Body::from("hello node"), "upload.tmp", Some(10))
        .await
        .unwrap();
    assert_eq!(added.hash, HASH);
    assert_eq!(added.name, "upload.tmp");
    assert_eq!(added.size, "18");
}

#[tokio::test]
async fn add_with_empty_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .respond_with(ResponseTemplate::new(200).set_body_string("\n"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .add(Body::from("x"), "x", None)
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::EmptyResponse));
}

#[tokio::test]
async fn error_status_carries_node_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/cat"))
        .respond_with(ResponseTemplate::new(500).set_body_string(
            "{\"Message\":\"merkledag: not found\",\"Code\":0,\"Type\":\"error\"}",
        ))
        .mount(&server)
        .await;

    let err = match client_for(&server).cat(HASH).await {
        Ok(_) => panic!("cat should fail"),
        Err(e) => e,
    };
    match err {
        NodeError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "merkledag: not found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn cat_streams_object_bytes() {
    let server = MockServer::start().await;
    let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    Mock::given(method("POST"))
        .and(path("/api/v0/cat"))
        .and(query_param("arg", HASH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let mut stream = client_for(&server).cat(HASH).await.unwrap();
    let mut received = Vec::new();
    while let Some(chunk) = stream.next().await {
        received.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(received, payload);
}

#[tokio::test]
async fn slow_node_hits_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/refs/local"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let base = Url::parse(&format!("{}/api/v0/", server.uri())).unwrap();
    let options = NodeClientOptions {
        request_timeout: Duration::from_millis(200),
        ..NodeClientOptions::default()
    };
    let err = NodeClient::new(base, options)
        .unwrap()
        .refs_local()
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {err}");
}
