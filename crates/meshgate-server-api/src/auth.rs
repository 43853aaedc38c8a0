// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use meshgate_common_secret::SecretString;
use subtle::ConstantTimeEq;

/// Constant-time comparison of the shared VPN password.
pub fn password_matches(expected: &SecretString, supplied: &SecretString) -> bool {
	let expected_bytes = expected.expose().as_bytes();
	let supplied_bytes = supplied.expose().as_bytes();

	if expected_bytes.len() != supplied_bytes.len() {
		return false;
	}

	expected_bytes.ct_eq(supplied_bytes).into()
}
