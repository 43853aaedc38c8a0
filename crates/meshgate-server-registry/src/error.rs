// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
	#[error("no addresses left to lease")]
	Exhausted,

	#[error("address {0} is not part of the pool")]
	UnknownAddress(Ipv4Addr),

	#[error("invalid subnet: {0}")]
	InvalidSubnet(String),
}

/// Failure to apply a change to the live tunnel configuration.
///
/// Each controller call either fully applies or returns one of these; there is
/// no partial-success reporting.
#[derive(Debug, Error)]
pub enum TunnelError {
	#[error("{operation} failed: {message}")]
	Program { operation: String, message: String },

	#[error("required tool `{0}` not found on PATH")]
	MissingTool(String),
}

impl TunnelError {
	pub fn program(operation: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Program {
			operation: operation.into(),
			message: message.into(),
		}
	}
}

#[derive(Debug, Error)]
pub enum RegistryError {
	#[error("Node with pubkey {0} already exists")]
	DuplicateIdentity(String),

	#[error("Node with pubkey {0} not found")]
	UnknownIdentity(String),

	#[error(transparent)]
	Pool(#[from] PoolError),

	#[error(transparent)]
	Tunnel(#[from] TunnelError),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
