// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end tests for the control-plane routes.
//!
//! Tests cover:
//! - Registration, heartbeat and unregistration of one and several nodes
//! - Password rejection
//! - Duplicate and unknown identities
//! - Decode failures and method mismatches
//! - Pool exhaustion and tunnel failures

use axum::{
	body::Body,
	http::{header::CONTENT_TYPE, Method, Request, StatusCode},
	response::Response,
	Router,
};
use meshgate_common_secret::SecretString;
use meshgate_server_api::{create_router, AppState};
use meshgate_server_registry::testing::{FakeTunnel, TunnelCall};
use meshgate_server_registry::{NodeRegistry, SubnetPool};
use meshgate_wg_common::{HeartbeatReply, RegistrationReply, WgKeyPair};
use serde_json::json;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use tower::ServiceExt;

const PASSWORD: &str = "correct horse";

struct TestApp {
	router: Router,
	registry: Arc<NodeRegistry>,
	tunnel: Arc<FakeTunnel>,
	server_key: String,
}

fn setup_test_app(cidr: &str) -> TestApp {
	let tunnel = Arc::new(FakeTunnel::new());
	let pool = SubnetPool::from_cidr(cidr).unwrap();
	let registry = Arc::new(NodeRegistry::new(Box::new(pool), tunnel.clone()));
	let keys = WgKeyPair::generate();
	let server_key = keys.public_key().to_base64();

	let state = AppState::new(
		registry.clone(),
		SocketAddrV4::new(Ipv4Addr::new(192, 168, 0, 10), 51820),
		*keys.public_key(),
		SecretString::from(PASSWORD),
	);

	TestApp {
		router: create_router(state),
		registry,
		tunnel,
		server_key,
	}
}

fn node_key() -> String {
	WgKeyPair::generate().public_key().to_base64()
}

async fn send(router: &Router, method: Method, uri: &str, body: impl Into<Body>) -> Response {
	router
		.clone()
		.oneshot(
			Request::builder()
				.method(method)
				.uri(uri)
				.header(CONTENT_TYPE, "application/json")
				.body(body.into())
				.unwrap(),
		)
		.await
		.unwrap()
}

async fn body_text(response: Response) -> String {
	let body = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	String::from_utf8(body.to_vec()).unwrap()
}

async fn register(router: &Router, key: &str, password: &str) -> Response {
	let body = json!({ "publicKey": key, "password": password }).to_string();
	send(router, Method::POST, "/register", body).await
}

async fn beat(router: &Router, key: &str) -> Response {
	let body = json!({ "publicKey": key }).to_string();
	send(router, Method::POST, "/beat", body).await
}

async fn unregister(router: &Router, key: &str) -> Response {
	let body = json!({ "publicKey": key }).to_string();
	send(router, Method::DELETE, "/unregister", body).await
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_register_beat_unregister_flow() {
	let app = setup_test_app("10.24.1.0/24");
	let alice = node_key();
	let bob = node_key();

	let response = register(&app.router, &alice, PASSWORD).await;
	assert_eq!(response.status(), StatusCode::OK);
	let reply: RegistrationReply = serde_json::from_str(&body_text(response).await).unwrap();
	assert_eq!(reply.node_ip, Ipv4Addr::new(10, 24, 1, 1));
	assert_eq!(reply.node_cidr, "24");
	assert_eq!(reply.endpoint_ip_port_pair, "192.168.0.10:51820");
	assert_eq!(reply.allowed_ips, vec![Ipv4Addr::new(10, 24, 1, 1)]);
	assert_eq!(reply.server_public_key, app.server_key);
	assert_eq!(reply.server_peer_ip, Ipv4Addr::new(10, 24, 1, 0));

	let response = register(&app.router, &bob, PASSWORD).await;
	assert_eq!(response.status(), StatusCode::OK);
	let reply: RegistrationReply = serde_json::from_str(&body_text(response).await).unwrap();
	assert_eq!(reply.node_ip, Ipv4Addr::new(10, 24, 1, 2));
	assert_eq!(
		reply.allowed_ips,
		vec![Ipv4Addr::new(10, 24, 1, 1), Ipv4Addr::new(10, 24, 1, 2)]
	);

	// Alice learns about Bob through her heartbeat.
	let response = beat(&app.router, &alice).await;
	assert_eq!(response.status(), StatusCode::OK);
	let reply: HeartbeatReply = serde_json::from_str(&body_text(response).await).unwrap();
	assert_eq!(
		reply.allowed_ips,
		vec![Ipv4Addr::new(10, 24, 1, 1), Ipv4Addr::new(10, 24, 1, 2)]
	);

	let response = unregister(&app.router, &alice).await;
	assert_eq!(response.status(), StatusCode::NO_CONTENT);
	assert!(body_text(response).await.is_empty());

	let response = beat(&app.router, &bob).await;
	let reply: HeartbeatReply = serde_json::from_str(&body_text(response).await).unwrap();
	assert_eq!(reply.allowed_ips, vec![Ipv4Addr::new(10, 24, 1, 2)]);

	assert_eq!(
		app.tunnel.calls(),
		vec![
			TunnelCall::Add(alice.clone(), Ipv4Addr::new(10, 24, 1, 1)),
			TunnelCall::Add(bob.clone(), Ipv4Addr::new(10, 24, 1, 2)),
			TunnelCall::Remove(alice),
		]
	);
}

#[tokio::test]
async fn test_single_node_lifecycle() {
	let app = setup_test_app("10.24.1.0/24");
	let key = node_key();

	let response = register(&app.router, &key, PASSWORD).await;
	assert_eq!(response.status(), StatusCode::OK);
	let reply: RegistrationReply = serde_json::from_str(&body_text(response).await).unwrap();
	let address = reply.node_ip;

	let response = register(&app.router, &key, PASSWORD).await;
	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(
		body_text(response).await,
		format!("Node with pubkey {key} already exists\n")
	);

	let response = beat(&app.router, &key).await;
	assert_eq!(response.status(), StatusCode::OK);
	let reply: HeartbeatReply = serde_json::from_str(&body_text(response).await).unwrap();
	assert!(reply.allowed_ips.contains(&address));

	let response = unregister(&app.router, &key).await;
	assert_eq!(response.status(), StatusCode::NO_CONTENT);

	let response = beat(&app.router, &key).await;
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	assert_eq!(body_text(response).await, "Node not found\n");

	assert!(app.registry.is_empty().await);
	assert!(!app.registry.is_leased(address).await);
}

#[tokio::test]
async fn test_register_accepts_capitalized_field_names() {
	let app = setup_test_app("10.24.1.0/24");
	let key = node_key();
	let body = json!({ "PublicKey": key, "Password": PASSWORD }).to_string();

	let response = send(&app.router, Method::POST, "/register", body).await;
	assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn test_register_with_wrong_password_returns_403() {
	let app = setup_test_app("10.24.1.0/24");

	let response = register(&app.router, &node_key(), "wrong").await;
	assert_eq!(response.status(), StatusCode::FORBIDDEN);
	assert_eq!(body_text(response).await, "Forbidden\n");
	assert!(app.registry.is_empty().await);
	assert!(app.tunnel.calls().is_empty());
}

#[tokio::test]
async fn test_register_duplicate_returns_500_with_message() {
	let app = setup_test_app("10.24.1.0/24");
	let key = node_key();

	assert_eq!(register(&app.router, &key, PASSWORD).await.status(), StatusCode::OK);

	let response = register(&app.router, &key, PASSWORD).await;
	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(
		body_text(response).await,
		format!("Node with pubkey {key} already exists\n")
	);
	assert_eq!(app.registry.len().await, 1);
}

#[tokio::test]
async fn test_unknown_node_returns_404() {
	let app = setup_test_app("10.24.1.0/24");
	let key = node_key();

	let response = beat(&app.router, &key).await;
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	assert_eq!(body_text(response).await, "Node not found\n");

	let response = unregister(&app.router, &key).await;
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	assert_eq!(body_text(response).await, "Node not found\n");
}

#[tokio::test]
async fn test_undecodable_bodies_return_500() {
	let app = setup_test_app("10.24.1.0/24");

	let response = send(&app.router, Method::POST, "/register", "").await;
	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	let text = body_text(response).await;
	assert!(text.starts_with("Error: "), "{text}");
	assert!(text.ends_with('\n'));

	let response = send(&app.router, Method::POST, "/beat", "{not json").await;
	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(body_text(response).await, "Error while decoding json\n");

	let response = send(&app.router, Method::DELETE, "/unregister", "[]").await;
	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(body_text(response).await, "Error while decoding json\n");
}

#[tokio::test]
async fn test_malformed_public_key_is_rejected() {
	let app = setup_test_app("10.24.1.0/24");

	let response = register(&app.router, "two tokens", PASSWORD).await;
	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert!(app.tunnel.calls().is_empty());

	let response = beat(&app.router, "").await;
	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(body_text(response).await, "Error while decoding json\n");
}

#[tokio::test]
async fn test_method_mismatch_returns_405() {
	let app = setup_test_app("10.24.1.0/24");

	for (method, uri) in [
		(Method::GET, "/register"),
		(Method::POST, "/unregister"),
		(Method::GET, "/beat"),
		(Method::DELETE, "/beat"),
	] {
		let response = send(&app.router, method.clone(), uri, "").await;
		assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
		assert_eq!(body_text(response).await, "Method Not Allowed\n");
	}
}

// ============================================================================
// Collaborator failures
// ============================================================================

#[tokio::test]
async fn test_exhausted_pool_returns_500() {
	let app = setup_test_app("192.168.7.0/30");

	for _ in 0..2 {
		assert_eq!(
			register(&app.router, &node_key(), PASSWORD).await.status(),
			StatusCode::OK
		);
	}

	let response = register(&app.router, &node_key(), PASSWORD).await;
	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(body_text(response).await, "no addresses left to lease\n");
	assert_eq!(app.registry.len().await, 2);
}

#[tokio::test]
async fn test_tunnel_failure_returns_500_and_frees_address() {
	let app = setup_test_app("10.24.1.0/24");
	app.tunnel.fail_next_add();

	let response = register(&app.router, &node_key(), PASSWORD).await;
	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert!(app.registry.is_empty().await);
	assert!(!app.registry.is_leased(Ipv4Addr::new(10, 24, 1, 1)).await);

	let response = register(&app.router, &node_key(), PASSWORD).await;
	let reply: RegistrationReply = serde_json::from_str(&body_text(response).await).unwrap();
	assert_eq!(reply.node_ip, Ipv4Addr::new(10, 24, 1, 1));
}

#[tokio::test]
async fn test_unregister_tunnel_failure_keeps_node() {
	let app = setup_test_app("10.24.1.0/24");
	let key = node_key();
	register(&app.router, &key, PASSWORD).await;
	app.tunnel.fail_next_remove();

	let response = unregister(&app.router, &key).await;
	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert!(app.registry.get(&key).await.is_ok());
	assert_eq!(beat(&app.router, &key).await.status(), StatusCode::OK);
}
