// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
	#[error("mDNS error: {0}")]
	Mdns(#[from] mdns_sd::Error),

	#[error("invalid service record: {0}")]
	InvalidRecord(String),

	#[error("browse task failed: {0}")]
	Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
