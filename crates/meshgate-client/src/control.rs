// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{ClientError, Result};
use meshgate_common_secret::SecretString;
use meshgate_wg_common::{
	HeartbeatReply, RegistrationReply, WgPublicKey, HEARTBEAT_PATH, REGISTER_PATH, UNREGISTER_PATH,
};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
	#[serde(rename = "publicKey")]
	public_key: &'a str,
	password: &'a str,
}

#[derive(Debug, Serialize)]
struct NodeRequest<'a> {
	#[serde(rename = "publicKey")]
	public_key: &'a str,
}

/// `meshgate/<version>`
pub fn user_agent() -> String {
	format!("meshgate/{}", env!("CARGO_PKG_VERSION"))
}

/// Client for one server's control plane.
pub struct ControlClient {
	http: Client,
	base_url: String,
}

impl ControlClient {
	/// Talks HTTPS to `endpoint` (`addr:port`).
	///
	/// Certificates are not verified: servers present a throwaway self-signed
	/// certificate, so the channel is encrypted but the server is not
	/// authenticated.
	pub fn new(endpoint: &str) -> Result<Self> {
		let http = Client::builder()
			.user_agent(user_agent())
			.timeout(REQUEST_TIMEOUT)
			.danger_accept_invalid_certs(true)
			.build()?;
		Ok(Self {
			http,
			base_url: format!("https://{endpoint}"),
		})
	}

	/// Client for an arbitrary base URL such as `http://127.0.0.1:8080`.
	pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
		let http = Client::builder()
			.user_agent(user_agent())
			.timeout(REQUEST_TIMEOUT)
			.build()?;
		Ok(Self {
			http,
			base_url: base_url.into().trim_end_matches('/').to_string(),
		})
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	#[instrument(skip(self, public_key, password), fields(public_key = %public_key))]
	pub async fn register(
		&self,
		public_key: &WgPublicKey,
		password: &SecretString,
	) -> Result<RegistrationReply> {
		let public_key = public_key.to_base64();
		let request = RegisterRequest {
			public_key: &public_key,
			password: password.expose(),
		};

		let response = self
			.http
			.post(self.url(REGISTER_PATH))
			.json(&request)
			.send()
			.await?;

		if response.status() == StatusCode::FORBIDDEN {
			return Err(ClientError::BadPassword);
		}
		let response = check(response).await?;

		let reply: RegistrationReply = response.json().await?;
		debug!(node_ip = %reply.node_ip, "registered");
		Ok(reply)
	}

	/// Refreshes liveness. A 404 means the server dropped this node.
	#[instrument(skip(self, public_key), fields(public_key = %public_key))]
	pub async fn heartbeat(&self, public_key: &WgPublicKey) -> Result<HeartbeatReply> {
		let public_key = public_key.to_base64();
		let response = self
			.http
			.post(self.url(HEARTBEAT_PATH))
			.json(&NodeRequest {
				public_key: &public_key,
			})
			.send()
			.await?;

		if response.status() == StatusCode::NOT_FOUND {
			return Err(ClientError::Evicted);
		}
		let response = check(response).await?;

		Ok(response.json().await?)
	}

	#[instrument(skip(self, public_key), fields(public_key = %public_key))]
	pub async fn unregister(&self, public_key: &WgPublicKey) -> Result<()> {
		let public_key = public_key.to_base64();
		let response = self
			.http
			.delete(self.url(UNREGISTER_PATH))
			.json(&NodeRequest {
				public_key: &public_key,
			})
			.send()
			.await?;

		if response.status() == StatusCode::NOT_FOUND {
			return Err(ClientError::Evicted);
		}
		check(response).await?;
		Ok(())
	}
}

async fn check(response: Response) -> Result<Response> {
	if response.status().is_success() {
		return Ok(response);
	}
	let status = response.status().as_u16();
	let message = response.text().await.unwrap_or_default().trim().to_string();
	Err(ClientError::Api { status, message })
}
