// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Types shared by the meshgate server and client: WireGuard key material and
//! the control-plane request/response bodies.

pub mod keys;
pub mod keys_file;
pub mod protocol;

pub use keys::{KeyError, WgKeyPair, WgPrivateKey, WgPublicKey};
pub use keys_file::{write_private_key, KeyFileError, PRIVATE_KEY_FILENAME};
pub use protocol::{
	format_allowed_ips, DeregistrationRequest, HeartbeatReply, HeartbeatRequest,
	RegistrationReply, RegistrationRequest, DEFAULT_HTTP_PORT, HEARTBEAT_PATH, REGISTER_PATH,
	UNREGISTER_PATH,
};
