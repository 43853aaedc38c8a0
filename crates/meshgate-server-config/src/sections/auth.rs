// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use meshgate_common_secret::SecretString;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfigLayer {
	/// Shared password every node presents on registration.
	pub password: Option<SecretString>,
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.password.is_some() {
			self.password = other.password;
		}
	}

	pub fn finalize(self) -> AuthConfig {
		AuthConfig {
			password: self.password.unwrap_or_default(),
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
	pub password: SecretString,
}
