// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! meshgate binary: `server`, `client` and `version`.

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use meshgate_client::SessionEnd;
use meshgate_server_config::{load_config, LogFormat};

mod cli;
mod logging;
mod server;
mod tls;
mod version;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	// reqwest and axum-server both pull in rustls; pin one provider.
	let _ = rustls::crypto::ring::default_provider().install_default();

	match cli.command {
		Command::Version => {
			println!("{}", version::format_version_info());
			Ok(())
		}
		Command::Server(args) => {
			let config = load_config(args.config.clone(), args.to_layer())
				.context("failed to load configuration")?;
			logging::init(&config.logging.level, config.logging.format);
			server::run(config).await
		}
		Command::Client(args) => {
			logging::init("info", LogFormat::Pretty);
			match meshgate_client::run(args.to_options()).await? {
				SessionEnd::NoServers => tracing::info!("nothing to join"),
				SessionEnd::Shutdown => tracing::info!("left the VPN"),
			}
			Ok(())
		}
	}
}
