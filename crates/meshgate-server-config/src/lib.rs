// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the meshgate server.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. Config file (`/etc/meshgate/server.toml` or `--config`)
//! 3. Environment variables (`MESHGATE_*`)
//! 4. Command-line flags
//!
//! ```ignore
//! use meshgate_server_config::{load_config, ServerConfigLayer};
//!
//! let config = load_config(None, ServerConfigLayer::default())?;
//! println!("control plane on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{
	load_secret_env, CommandLineSource, ConfigSource, DefaultsSource, EnvSource, Precedence,
	TomlSource, SYSTEM_CONFIG_PATH,
};

use std::path::PathBuf;
use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub tls: TlsConfig,
	pub tunnel: TunnelConfig,
	pub registry: RegistryConfig,
	pub auth: AuthConfig,
	pub discovery: DiscoveryConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Loads configuration from every source, with `command_line` on top.
pub fn load_config(
	config_path: Option<PathBuf>,
	command_line: ServerConfigLayer,
) -> Result<ServerConfig, ConfigError> {
	let toml = match config_path {
		Some(path) => TomlSource::new(path),
		None => TomlSource::system(),
	};

	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(CommandLineSource::new(command_line)),
		Box::new(EnvSource),
		Box::new(toml),
		Box::new(DefaultsSource),
	];

	load_from_sources(sources)
}

/// Merges `sources` in precedence order and finalizes the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		tls: layer.tls.unwrap_or_default().finalize(),
		tunnel: layer.tunnel.unwrap_or_default().finalize(),
		registry: layer.registry.unwrap_or_default().finalize(),
		auth: layer.auth.unwrap_or_default().finalize(),
		discovery: layer.discovery.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		listen = %config.socket_addr(),
		uplink = %config.tunnel.interface,
		wg_interface = %config.tunnel.wg_interface,
		wg_port = config.tunnel.wg_port,
		cidr = %config.tunnel.cidr,
		deadline_secs = config.registry.deadline_secs,
		sweep_interval_secs = config.registry.sweep_interval_secs,
		discovery_enabled = config.discovery.enabled,
		custom_tls = config.tls.pem_files().is_some(),
		"Server configuration loaded"
	);

	Ok(config)
}

/// Validate cross-field configuration rules.
fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	if config.tunnel.interface.trim().is_empty() {
		return Err(ConfigError::Validation(
			"tunnel.interface is required (MESHGATE_TUNNEL_INTERFACE or --interface)".to_string(),
		));
	}

	if config.auth.password.is_empty() {
		return Err(ConfigError::Validation(
			"auth.password is required (MESHGATE_VPN_PASSWORD or --vpn-password)".to_string(),
		));
	}

	if config.registry.deadline_secs == 0 {
		return Err(ConfigError::Validation(
			"registry.deadline_secs must be greater than zero".to_string(),
		));
	}

	if config.registry.sweep_interval_secs == 0 {
		return Err(ConfigError::Validation(
			"registry.sweep_interval_secs must be greater than zero".to_string(),
		));
	}

	if config.tls.cert_path.is_some() != config.tls.key_path.is_some() {
		return Err(ConfigError::Validation(
			"tls.cert_path and tls.key_path must be set together".to_string(),
		));
	}

	Ok(())
}
