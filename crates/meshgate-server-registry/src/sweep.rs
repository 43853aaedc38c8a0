// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background eviction of silent nodes.

use crate::registry::NodeRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
	/// How long a node may stay silent before it is evicted.
	pub deadline: Duration,
	/// Time between sweep passes.
	pub interval: Duration,
}

impl Default for SweepConfig {
	fn default() -> Self {
		Self {
			deadline: DEFAULT_DEADLINE,
			interval: DEFAULT_SWEEP_INTERVAL,
		}
	}
}

/// Owns the background sweep task.
///
/// `stop` consumes the handle, so the loop can be stopped at most once.
/// Dropping the handle without calling `stop` also ends the loop at its next
/// wakeup.
pub struct SweepHandle {
	shutdown_tx: watch::Sender<bool>,
	task: JoinHandle<()>,
}

impl SweepHandle {
	/// Signals the loop and waits for it to exit. An in-flight pass finishes
	/// first; no pass starts afterwards.
	pub async fn stop(self) {
		let _ = self.shutdown_tx.send(true);
		if let Err(e) = self.task.await {
			warn!(error = %e, "sweep task ended abnormally");
		}
	}
}

impl NodeRegistry {
	/// Spawns the periodic sweep. The first pass runs one `interval` after
	/// the call.
	pub fn start_sweeping(self: &Arc<Self>, config: SweepConfig) -> SweepHandle {
		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let task = tokio::spawn(run_sweeper(Arc::clone(self), config, shutdown_rx));
		SweepHandle { shutdown_tx, task }
	}
}

async fn run_sweeper(
	registry: Arc<NodeRegistry>,
	config: SweepConfig,
	mut shutdown_rx: watch::Receiver<bool>,
) {
	info!(
		deadline_secs = config.deadline.as_secs(),
		interval_secs = config.interval.as_secs(),
		"node sweeper started"
	);

	let mut ticker = tokio::time::interval(config.interval);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
	// interval fires immediately; the first pass waits a full period.
	ticker.tick().await;

	loop {
		tokio::select! {
			biased;

			changed = shutdown_rx.changed() => {
				if changed.is_err() || *shutdown_rx.borrow() {
					break;
				}
			}

			_ = ticker.tick() => {
				let report = registry.sweep(config.deadline).await;
				if !report.failures.is_empty() {
					debug!(failed = report.failures.len(), "sweep left nodes behind");
				}
			}
		}
	}

	info!("node sweeper stopped");
}
