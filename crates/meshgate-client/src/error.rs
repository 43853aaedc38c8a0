// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("API error: {status} - {message}")]
	Api { status: u16, message: String },

	#[error("bad password")]
	BadPassword,

	#[error("server no longer knows this node; it was evicted or unregistered")]
	Evicted,

	#[error("discovery failed: {0}")]
	Discovery(#[from] meshgate_discovery::DiscoveryError),

	#[error("invalid choice: {0}")]
	InvalidChoice(String),

	#[error("tunnel error: {0}")]
	Tunnel(#[from] meshgate_server_registry::TunnelError),

	#[error("key file error: {0}")]
	KeyFile(#[from] meshgate_wg_common::KeyFileError),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
