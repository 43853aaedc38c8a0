// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use meshgate_server_registry::RegistryError;
use thiserror::Error;

/// Body sent for any undecodable `/unregister` or `/beat` request.
pub const DECODE_ERROR_MESSAGE: &str = "Error while decoding json";

#[derive(Debug, Error)]
pub enum ApiError {
	#[error("Forbidden")]
	BadCredential,

	/// Carries the complete response body.
	#[error("{0}")]
	MalformedRequest(String),

	#[error(transparent)]
	Registry(#[from] RegistryError),
}

impl ApiError {
	pub fn status(&self) -> StatusCode {
		match self {
			ApiError::BadCredential => StatusCode::FORBIDDEN,
			ApiError::MalformedRequest(_) => StatusCode::INTERNAL_SERVER_ERROR,
			ApiError::Registry(RegistryError::UnknownIdentity(_)) => StatusCode::NOT_FOUND,
			ApiError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn body(&self) -> String {
		match self {
			ApiError::Registry(RegistryError::UnknownIdentity(_)) => "Node not found".to_string(),
			other => other.to_string(),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		plain_text(self.status(), &self.body())
	}
}

/// Plain-text error response, newline terminated.
pub fn plain_text(status: StatusCode, message: &str) -> Response {
	let mut response = (status, format!("{message}\n")).into_response();
	let headers = response.headers_mut();
	headers.insert(
		header::CONTENT_TYPE,
		HeaderValue::from_static("text/plain; charset=utf-8"),
	);
	headers.insert(
		header::X_CONTENT_TYPE_OPTIONS,
		HeaderValue::from_static("nosniff"),
	);
	response
}
