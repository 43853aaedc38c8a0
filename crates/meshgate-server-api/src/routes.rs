// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request handlers.
//!
//! Bodies are decoded by hand rather than through `Json<T>` so that decode
//! failures produce the plain-text 500 responses existing clients expect.

use crate::auth::password_matches;
use crate::error::{plain_text, ApiError, DECODE_ERROR_MESSAGE};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{delete, post};
use axum::{Json, Router};
use meshgate_wg_common::{
	DeregistrationRequest, HeartbeatReply, HeartbeatRequest, RegistrationReply, RegistrationRequest,
	HEARTBEAT_PATH, REGISTER_PATH, UNREGISTER_PATH,
};
use serde::de::DeserializeOwned;
use tracing::{info, instrument, warn};

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route(REGISTER_PATH, post(register).fallback(method_not_allowed))
		.route(UNREGISTER_PATH, delete(unregister).fallback(method_not_allowed))
		.route(HEARTBEAT_PATH, post(heartbeat).fallback(method_not_allowed))
		.with_state(state)
}

/// POST /register - admit a node and hand it an address.
#[instrument(skip(state, body))]
pub async fn register(
	State(state): State<AppState>,
	body: Bytes,
) -> Result<Json<RegistrationReply>, ApiError> {
	let request: RegistrationRequest = serde_json::from_slice(&body).map_err(|e| {
		warn!(error = %e, "failed to decode registration request");
		ApiError::MalformedRequest(format!("Error: {e}"))
	})?;

	if !password_matches(&state.password, &request.password) {
		warn!(public_key = %request.public_key, "registration rejected: bad password");
		return Err(ApiError::BadCredential);
	}

	if !is_single_token(&request.public_key) {
		warn!("registration rejected: malformed public key");
		return Err(ApiError::MalformedRequest(
			"Error: publicKey must be a single non-empty token".to_string(),
		));
	}

	let admission = state.registry.admit(&request.public_key).await?;

	info!(
		public_key = %request.public_key,
		address = %admission.node.address,
		"registered node"
	);

	Ok(Json(RegistrationReply {
		node_ip: admission.node.address,
		node_cidr: admission.node.prefix_len.to_string(),
		endpoint_ip_port_pair: state.endpoint.to_string(),
		allowed_ips: admission.allowed_ips,
		server_public_key: state.server_public_key.to_base64(),
		server_peer_ip: state.registry.server_address(),
	}))
}

/// DELETE /unregister - remove a node.
#[instrument(skip(state, body))]
pub async fn unregister(State(state): State<AppState>, body: Bytes) -> Result<StatusCode, ApiError> {
	let request: DeregistrationRequest = decode(&body)?;

	let node = state.registry.remove(&request.public_key).await?;
	info!(public_key = %node.public_key, address = %node.address, "unregistered node");

	Ok(StatusCode::NO_CONTENT)
}

/// POST /beat - refresh liveness and return the current member addresses.
#[instrument(skip(state, body))]
pub async fn heartbeat(
	State(state): State<AppState>,
	body: Bytes,
) -> Result<Json<HeartbeatReply>, ApiError> {
	let request: HeartbeatRequest = decode(&body)?;

	let allowed_ips = state.registry.touch(&request.public_key).await?;

	Ok(Json(HeartbeatReply { allowed_ips }))
}

async fn method_not_allowed() -> Response {
	plain_text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

fn decode<T: DeserializeOwned + HasPublicKey>(body: &[u8]) -> Result<T, ApiError> {
	let request: T = serde_json::from_slice(body).map_err(|e| {
		warn!(error = %e, "failed to decode request");
		ApiError::MalformedRequest(DECODE_ERROR_MESSAGE.to_string())
	})?;

	if !is_single_token(request.public_key()) {
		warn!("malformed public key");
		return Err(ApiError::MalformedRequest(DECODE_ERROR_MESSAGE.to_string()));
	}

	Ok(request)
}

trait HasPublicKey {
	fn public_key(&self) -> &str;
}

impl HasPublicKey for DeregistrationRequest {
	fn public_key(&self) -> &str {
		&self.public_key
	}
}

impl HasPublicKey for HeartbeatRequest {
	fn public_key(&self) -> &str {
		&self.public_key
	}
}

/// Public keys end up as a discrete argument to `wg`.
fn is_single_token(public_key: &str) -> bool {
	!public_key.is_empty() && !public_key.chars().any(char::is_whitespace)
}
