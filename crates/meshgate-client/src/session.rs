// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One membership of a meshgate VPN, from registration to teardown.

use crate::control::ControlClient;
use crate::error::{ClientError, Result};
use crate::heartbeat::{run_heartbeat, DEFAULT_HEARTBEAT_INTERVAL};
use crate::interface::ClientInterface;
use crate::prompt;
use console::Term;
use meshgate_common_secret::SecretString;
use meshgate_discovery::browse;
use meshgate_server_tunnel::ProcessRunner;
use meshgate_wg_common::{write_private_key, RegistrationReply, WgKeyPair};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

pub const DEFAULT_SERVICE_TYPE: &str = "_meshgate._tcp.local.";
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct ClientOptions {
	pub wg_interface: String,
	pub service_type: String,
	pub discovery_timeout: Duration,
	pub heartbeat_interval: Duration,
	/// Prompted for when absent.
	pub password: Option<SecretString>,
}

impl Default for ClientOptions {
	fn default() -> Self {
		Self {
			wg_interface: "wg0".to_string(),
			service_type: DEFAULT_SERVICE_TYPE.to_string(),
			discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
			heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
			password: None,
		}
	}
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
	NoServers,
	Shutdown,
}

/// A registered node with its interface up.
pub struct Session {
	control: ControlClient,
	interface: ClientInterface,
	keys: WgKeyPair,
	registration: RegistrationReply,
	// Holds the private key file until the session is dropped.
	_key_dir: TempDir,
}

impl Session {
	/// Registers a fresh key pair and brings the interface up. If bring-up
	/// fails the interface is removed and the registration withdrawn before
	/// returning the error.
	#[instrument(skip_all, fields(server = %control.base_url(), interface = %interface.name()))]
	pub async fn establish(
		control: ControlClient,
		interface: ClientInterface,
		password: &SecretString,
	) -> Result<Self> {
		let keys = WgKeyPair::generate();
		let key_dir = tempfile::Builder::new().prefix("meshgate-").tempdir()?;
		let registration = control.register(keys.public_key(), password).await?;
		info!(
			node_ip = %registration.node_ip,
			prefix = %registration.node_cidr,
			"registered with server"
		);

		let brought_up = async {
			let key_path = write_private_key(key_dir.path(), &keys).await?;
			interface.bring_up(&registration, &key_path).await?;
			Ok::<_, ClientError>(())
		}
		.await;

		if let Err(e) = brought_up {
			if let Err(teardown_err) = interface.tear_down().await {
				warn!(error = %teardown_err, "failed to remove partially configured interface");
			}
			if let Err(unregister_err) = control.unregister(keys.public_key()).await {
				warn!(error = %unregister_err, "failed to withdraw registration");
			}
			return Err(e);
		}

		Ok(Self {
			control,
			interface,
			keys,
			registration,
			_key_dir: key_dir,
		})
	}

	pub fn registration(&self) -> &RegistrationReply {
		&self.registration
	}

	pub fn keys(&self) -> &WgKeyPair {
		&self.keys
	}

	/// Heartbeats until `shutdown` flips. Returns [`ClientError::Evicted`] if
	/// the server forgets this node first.
	pub async fn run(&self, interval: Duration, shutdown: watch::Receiver<bool>) -> Result<()> {
		run_heartbeat(
			&self.control,
			&self.interface,
			self.keys.public_key(),
			&self.registration,
			interval,
			shutdown,
		)
		.await
	}

	/// Unregisters (best effort) and removes the interface.
	#[instrument(skip_all, fields(interface = %self.interface.name()))]
	pub async fn close(self) -> Result<()> {
		match self.control.unregister(self.keys.public_key()).await {
			Ok(()) => info!("unregistered"),
			Err(e) => warn!(error = %e, "failed to unregister"),
		}
		self.interface.tear_down().await?;
		Ok(())
	}

	/// Removes the interface without contacting the server.
	pub async fn abandon(self) -> Result<()> {
		self.interface.tear_down().await?;
		Ok(())
	}
}

/// Discovers a server, joins it and stays joined until Ctrl-C.
pub async fn run(options: ClientOptions) -> Result<SessionEnd> {
	let term = Term::stdout();

	let services = browse(&options.service_type, options.discovery_timeout).await?;
	if services.is_empty() {
		info!(service_type = %options.service_type, "no meshgate servers found");
		return Ok(SessionEnd::NoServers);
	}

	let service = prompt::choose_service(&term, &services)?;
	let password = match options.password.clone() {
		Some(password) => password,
		None => prompt::read_password(&term)?,
	};

	let control = ControlClient::new(&service.control_endpoint())?;
	let interface = ClientInterface::new(options.wg_interface.clone(), Arc::new(ProcessRunner));
	let session = Session::establish(control, interface, &password).await?;

	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	tokio::spawn(async move {
		match tokio::signal::ctrl_c().await {
			Ok(()) => {
				info!("interrupt received, leaving the VPN");
				let _ = shutdown_tx.send(true);
			}
			Err(e) => {
				// A closed channel reads as shutdown, so the sender is held open.
				warn!(error = %e, "failed to listen for interrupt; continuing without it");
				std::future::pending::<()>().await;
				drop(shutdown_tx);
			}
		}
	});

	match session.run(options.heartbeat_interval, shutdown_rx).await {
		Ok(()) => {
			session.close().await?;
			Ok(SessionEnd::Shutdown)
		}
		Err(ClientError::Evicted) => {
			session.abandon().await?;
			Err(ClientError::Evicted)
		}
		Err(e) => {
			if let Err(close_err) = session.close().await {
				warn!(error = %close_err, "cleanup failed");
			}
			Err(e)
		}
	}
}
