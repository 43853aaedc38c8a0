// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Control-plane TLS material.

use anyhow::Context;
use axum_server::tls_rustls::RustlsConfig;
use meshgate_server_config::TlsConfig;
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, SanType, SerialNumber};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::info;

pub const SELF_SIGNED_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

pub struct SelfSignedPem {
	pub cert_pem: String,
	pub key_pem: String,
}

/// Throwaway certificate for `address`, valid from now for `validity`.
pub fn generate_self_signed(address: Ipv4Addr, validity: Duration) -> Result<SelfSignedPem, rcgen::Error> {
	let mut params = CertificateParams::default();

	let mut dn = DistinguishedName::new();
	dn.push(DnType::CommonName, "meshgate control plane");
	params.distinguished_name = dn;
	params.subject_alt_names = vec![SanType::IpAddress(IpAddr::V4(address))];

	let now = OffsetDateTime::now_utc();
	params.not_before = now;
	params.not_after = now + validity;
	params.serial_number = Some(SerialNumber::from(rand::random::<u64>()));

	let key_pair = KeyPair::generate()?;
	let cert = params.self_signed(&key_pair)?;

	Ok(SelfSignedPem {
		cert_pem: cert.pem(),
		key_pem: key_pair.serialize_pem(),
	})
}

/// Uses the configured PEM files, or a fresh self-signed certificate for the
/// uplink address when none are configured.
pub async fn rustls_config(tls: &TlsConfig, address: Ipv4Addr) -> anyhow::Result<RustlsConfig> {
	if let Some((cert_path, key_path)) = tls.pem_files() {
		info!(cert = %cert_path.display(), "using configured TLS certificate");
		return RustlsConfig::from_pem_file(cert_path, key_path)
			.await
			.with_context(|| format!("failed to load TLS certificate {}", cert_path.display()));
	}

	let pem = generate_self_signed(address, SELF_SIGNED_VALIDITY)
		.context("failed to generate self-signed certificate")?;
	info!(%address, "using self-signed TLS certificate");
	RustlsConfig::from_pem(pem.cert_pem.into_bytes(), pem.key_pem.into_bytes())
		.await
		.context("failed to build TLS configuration")
}
