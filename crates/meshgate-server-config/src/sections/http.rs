// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Control-plane listener and TLS sections.

use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 38490;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct HttpConfigLayer {
	pub host: Option<String>,
	pub port: Option<u16>,
}

impl HttpConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
	}

	pub fn finalize(self) -> HttpConfig {
		HttpConfig {
			host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
			port: self.port.unwrap_or(DEFAULT_PORT),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpConfig {
	pub host: String,
	pub port: u16,
}

impl Default for HttpConfig {
	fn default() -> Self {
		HttpConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TlsConfigLayer {
	pub cert_path: Option<PathBuf>,
	pub key_path: Option<PathBuf>,
}

impl TlsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.cert_path.is_some() {
			self.cert_path = other.cert_path;
		}
		if other.key_path.is_some() {
			self.key_path = other.key_path;
		}
	}

	pub fn finalize(self) -> TlsConfig {
		TlsConfig {
			cert_path: self.cert_path,
			key_path: self.key_path,
		}
	}
}

/// PEM certificate and key. When both are absent the server generates a
/// self-signed certificate at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TlsConfig {
	pub cert_path: Option<PathBuf>,
	pub key_path: Option<PathBuf>,
}

impl TlsConfig {
	pub fn pem_files(&self) -> Option<(&PathBuf, &PathBuf)> {
		self.cert_path.as_ref().zip(self.key_path.as_ref())
	}
}
