// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory tunnel controller for tests.

use crate::error::TunnelError;
use crate::tunnel::TunnelController;
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelCall {
	Add(String, Ipv4Addr),
	Remove(String),
}

/// Records every successful call. `fail_next_*` makes the next call of that
/// kind fail once without being recorded.
#[derive(Debug, Default)]
pub struct FakeTunnel {
	calls: Mutex<Vec<TunnelCall>>,
	fail_add: AtomicBool,
	fail_remove: AtomicBool,
}

impl FakeTunnel {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn fail_next_add(&self) {
		self.fail_add.store(true, Ordering::SeqCst);
	}

	pub fn fail_next_remove(&self) {
		self.fail_remove.store(true, Ordering::SeqCst);
	}

	pub fn calls(&self) -> Vec<TunnelCall> {
		self.calls.lock().unwrap().clone()
	}

	/// Peers that were added and not removed since.
	pub fn peers(&self) -> Vec<String> {
		let mut peers = Vec::new();
		for call in self.calls.lock().unwrap().iter() {
			match call {
				TunnelCall::Add(key, _) => peers.push(key.clone()),
				TunnelCall::Remove(key) => peers.retain(|p| p != key),
			}
		}
		peers
	}
}

#[async_trait]
impl TunnelController for FakeTunnel {
	async fn add_peer(&self, public_key: &str, address: Ipv4Addr) -> Result<(), TunnelError> {
		if self.fail_add.swap(false, Ordering::SeqCst) {
			return Err(TunnelError::program("add peer", "injected failure"));
		}
		self
			.calls
			.lock()
			.unwrap()
			.push(TunnelCall::Add(public_key.to_string(), address));
		Ok(())
	}

	async fn remove_peer(&self, public_key: &str) -> Result<(), TunnelError> {
		if self.fail_remove.swap(false, Ordering::SeqCst) {
			return Err(TunnelError::program("remove peer", "injected failure"));
		}
		self
			.calls
			.lock()
			.unwrap()
			.push(TunnelCall::Remove(public_key.to_string()));
		Ok(())
	}
}
