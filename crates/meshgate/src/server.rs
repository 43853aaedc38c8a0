// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `meshgate server`: interface, registry, sweeper, advertisement and the
//! control plane, torn down in reverse order.

use crate::tls;
use anyhow::Context;
use meshgate_discovery::{Advertisement, ServiceAdvertiser, ServiceRecord};
use meshgate_server_api::{create_router, AppState};
use meshgate_server_config::ServerConfig;
use meshgate_server_registry::{AddressPool, NodeRegistry, SubnetPool, SweepConfig};
use meshgate_server_tunnel::{
	preflight, uplink_ipv4, CommandRunner, InterfaceSpec, ProcessRunner, ShellTunnelController,
};
use meshgate_wg_common::{write_private_key, WgKeyPair};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const GRACEFUL_SHUTDOWN: Duration = Duration::from_secs(5);
const HOSTNAME_PATH: &str = "/proc/sys/kernel/hostname";

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
	let pool = SubnetPool::from_cidr(&config.tunnel.cidr).context("invalid tunnel subnet")?;

	let keys = WgKeyPair::generate();
	let key_dir = tempfile::Builder::new()
		.prefix("meshgate-server-")
		.tempdir()
		.context("failed to create key directory")?;
	let key_path = write_private_key(key_dir.path(), &keys)
		.await
		.context("failed to write WireGuard private key")?;

	preflight()?;
	let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
	let uplink = uplink_ipv4(runner.as_ref(), &config.tunnel.interface)
		.await
		.with_context(|| format!("failed to resolve address of {}", config.tunnel.interface))?;

	let tunnel = Arc::new(ShellTunnelController::new(
		InterfaceSpec {
			name: config.tunnel.wg_interface.clone(),
			address: pool.server_address(),
			prefix_len: pool.prefix_len(),
			listen_port: config.tunnel.wg_port,
			private_key_path: key_path,
			post_up: Some(config.tunnel.post_up.clone()),
			post_down: Some(config.tunnel.post_down.clone()),
		},
		runner,
	));
	tunnel
		.create_interface()
		.await
		.context("failed to create WireGuard interface")?;

	let outcome = serve(&config, tunnel.clone(), pool, &keys, uplink).await;

	if let Err(e) = tunnel.destroy_interface().await {
		error!(error = %e, "failed to destroy WireGuard interface");
	}
	drop(key_dir);

	outcome
}

async fn serve(
	config: &ServerConfig,
	tunnel: Arc<ShellTunnelController>,
	pool: SubnetPool,
	keys: &WgKeyPair,
	uplink: Ipv4Addr,
) -> anyhow::Result<()> {
	let registry = Arc::new(NodeRegistry::new(Box::new(pool), tunnel));
	let sweeper = registry.start_sweeping(SweepConfig {
		deadline: config.registry.deadline(),
		interval: config.registry.sweep_interval(),
	});

	let advertisement = match advertise(config, uplink) {
		Ok(advertisement) => advertisement,
		Err(e) => {
			sweeper.stop().await;
			return Err(e);
		}
	};

	let state = AppState::new(
		registry,
		SocketAddrV4::new(uplink, config.tunnel.wg_port),
		*keys.public_key(),
		config.auth.password.clone(),
	);

	let outcome = serve_http(config, state, uplink).await;

	sweeper.stop().await;
	if let Some(advertisement) = advertisement {
		advertisement.stop();
	}
	info!("server stopped");

	outcome
}

fn advertise(config: &ServerConfig, uplink: Ipv4Addr) -> anyhow::Result<Option<Advertisement>> {
	if !config.discovery.enabled {
		info!("mDNS advertisement disabled");
		return Ok(None);
	}

	let record = ServiceRecord {
		instance: config
			.discovery
			.instance_name
			.clone()
			.unwrap_or_else(local_hostname),
		service_type: config.discovery.service_type.clone(),
		address: uplink,
		port: config.http.port,
		description: config.discovery.description.clone(),
	};

	let advertisement = ServiceAdvertiser::start(record).context("failed to start mDNS advertisement")?;
	Ok(Some(advertisement))
}

async fn serve_http(config: &ServerConfig, state: AppState, uplink: Ipv4Addr) -> anyhow::Result<()> {
	let addr: SocketAddr = config
		.socket_addr()
		.parse()
		.with_context(|| format!("invalid listen address {}", config.socket_addr()))?;
	let tls = tls::rustls_config(&config.tls, uplink).await?;
	let app = create_router(state).layer(TraceLayer::new_for_http());

	let handle = axum_server::Handle::new();
	let shutdown = handle.clone();
	tokio::spawn(async move {
		shutdown_signal().await;
		shutdown.graceful_shutdown(Some(GRACEFUL_SHUTDOWN));
	});

	info!(%addr, endpoint = %uplink, "control plane listening");
	axum_server::bind_rustls(addr, tls)
		.handle(handle)
		.serve(app.into_make_service())
		.await
		.context("control plane failed")
}

async fn shutdown_signal() {
	match tokio::signal::ctrl_c().await {
		Ok(()) => info!("interrupt received, shutting down"),
		Err(e) => warn!(error = %e, "failed to listen for interrupt, shutting down"),
	}
}

fn local_hostname() -> String {
	std::fs::read_to_string(HOSTNAME_PATH)
		.ok()
		.map(|name| name.trim().to_string())
		.filter(|name| !name.is_empty())
		.unwrap_or_else(|| "meshgate".to_string())
}
