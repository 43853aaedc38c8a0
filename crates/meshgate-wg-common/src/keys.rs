// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use base64::prelude::*;
use meshgate_common_secret::SecretString;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};

pub const KEY_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum KeyError {
	#[error("invalid base64: {0}")]
	Base64(#[from] base64::DecodeError),

	#[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
	Length(usize),
}

fn decode_key(s: &str) -> Result<[u8; KEY_LEN], KeyError> {
	let bytes = BASE64_STANDARD.decode(s.trim())?;
	let len = bytes.len();
	bytes.try_into().map_err(|_| KeyError::Length(len))
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WgPublicKey([u8; KEY_LEN]);

impl WgPublicKey {
	pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
		Self(bytes)
	}

	pub fn from_base64(s: &str) -> Result<Self, KeyError> {
		decode_key(s).map(Self)
	}

	pub fn to_base64(&self) -> String {
		BASE64_STANDARD.encode(self.0)
	}

	pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
		&self.0
	}
}

impl fmt::Display for WgPublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_base64())
	}
}

impl fmt::Debug for WgPublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "WgPublicKey({})", self.to_base64())
	}
}

impl std::str::FromStr for WgPublicKey {
	type Err = KeyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_base64(s)
	}
}

impl Serialize for WgPublicKey {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_base64())
	}
}

impl<'de> Deserialize<'de> for WgPublicKey {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		Self::from_base64(&s).map_err(serde::de::Error::custom)
	}
}

/// WireGuard private key. Zeroized on drop by `x25519_dalek`.
#[derive(Clone)]
pub struct WgPrivateKey(StaticSecret);

impl WgPrivateKey {
	pub fn generate() -> Self {
		Self(StaticSecret::random_from_rng(OsRng))
	}

	pub fn from_base64(s: &str) -> Result<Self, KeyError> {
		decode_key(s).map(|bytes| Self(StaticSecret::from(bytes)))
	}

	pub fn to_base64(&self) -> SecretString {
		SecretString::new(BASE64_STANDARD.encode(self.0.to_bytes()))
	}

	pub fn public_key(&self) -> WgPublicKey {
		WgPublicKey(PublicKey::from(&self.0).to_bytes())
	}
}

impl fmt::Debug for WgPrivateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("WgPrivateKey([REDACTED])")
	}
}

#[derive(Clone)]
pub struct WgKeyPair {
	private: WgPrivateKey,
	public: WgPublicKey,
}

impl WgKeyPair {
	pub fn generate() -> Self {
		Self::from_private_key(WgPrivateKey::generate())
	}

	pub fn from_private_key(private: WgPrivateKey) -> Self {
		let public = private.public_key();
		Self { private, public }
	}

	pub fn private_key(&self) -> &WgPrivateKey {
		&self.private
	}

	pub fn public_key(&self) -> &WgPublicKey {
		&self.public
	}
}

impl fmt::Debug for WgKeyPair {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WgKeyPair")
			.field("public", &self.public)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn public_key_base64_is_44_chars() {
		let keypair = WgKeyPair::generate();
		let encoded = keypair.public_key().to_base64();
		assert_eq!(encoded.len(), 44);
		assert_eq!(WgPublicKey::from_base64(&encoded).unwrap(), *keypair.public_key());
	}

	#[test]
	fn private_key_derives_same_public_key() {
		let keypair = WgKeyPair::generate();
		let encoded = keypair.private_key().to_base64();
		let restored = WgPrivateKey::from_base64(encoded.expose()).unwrap();
		assert_eq!(restored.public_key(), *keypair.public_key());
	}

	#[test]
	fn rejects_wrong_length() {
		let short = BASE64_STANDARD.encode([1u8; 16]);
		assert!(matches!(
			WgPublicKey::from_base64(&short),
			Err(KeyError::Length(16))
		));
	}

	#[test]
	fn rejects_invalid_base64() {
		assert!(matches!(
			WgPublicKey::from_base64("not base64!"),
			Err(KeyError::Base64(_))
		));
	}

	#[test]
	fn debug_does_not_leak_private_key() {
		let keypair = WgKeyPair::generate();
		let private_b64 = keypair.private_key().to_base64();
		let debug = format!("{:?}", keypair);
		assert!(!debug.contains(private_b64.expose().as_str()));
	}

	#[test]
	fn public_key_serde_as_string() {
		let keypair = WgKeyPair::generate();
		let json = serde_json::to_string(keypair.public_key()).unwrap();
		assert_eq!(json, format!("\"{}\"", keypair.public_key().to_base64()));
	}
}
