// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::control::ControlClient;
use crate::error::{ClientError, Result};
use crate::interface::ClientInterface;
use meshgate_wg_common::{RegistrationReply, WgPublicKey};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Beats every `interval` and re-applies the returned member list to the
/// server peer, until `shutdown` flips or the server forgets this node.
///
/// Transport and `wg` failures are logged and retried on the next tick. Returns
/// `Ok(())` on shutdown and [`ClientError::Evicted`] on a 404.
pub async fn run_heartbeat(
	control: &ControlClient,
	interface: &ClientInterface,
	public_key: &WgPublicKey,
	registration: &RegistrationReply,
	interval: Duration,
	mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
	let mut ticker = tokio::time::interval(interval);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
	ticker.tick().await;

	info!(interval_secs = interval.as_secs_f64(), "starting heartbeat");

	loop {
		tokio::select! {
			biased;

			changed = shutdown.changed() => {
				if changed.is_err() || *shutdown.borrow() {
					debug!("heartbeat stopped");
					return Ok(());
				}
			}

			_ = ticker.tick() => {
				match control.heartbeat(public_key).await {
					Ok(reply) => {
						if let Err(e) = interface
							.set_allowed_ips(
								&registration.server_public_key,
								&reply.allowed_ips,
								registration.server_peer_ip,
							)
							.await
						{
							warn!(error = %e, "failed to apply allowed addresses");
						}
					}
					Err(ClientError::Evicted) => {
						warn!("server evicted this node");
						return Err(ClientError::Evicted);
					}
					Err(e) => warn!(error = %e, "heartbeat failed"),
				}
			}
		}
	}
}
