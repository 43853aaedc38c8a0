// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::Result;
use crate::DESCRIPTION_PROPERTY;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// A resolved control-plane advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredService {
	pub fullname: String,
	pub host: String,
	pub address: Ipv4Addr,
	pub port: u16,
	pub description: String,
}

impl DiscoveredService {
	/// `<address>:<port>` of the control plane.
	pub fn control_endpoint(&self) -> String {
		format!("{}:{}", self.address, self.port)
	}

	fn from_info(info: &ServiceInfo) -> Option<Self> {
		let address = info.get_addresses().iter().find_map(|ip| match ip {
			IpAddr::V4(v4) => Some(*v4),
			IpAddr::V6(_) => None,
		})?;

		Some(Self {
			fullname: info.get_fullname().to_string(),
			host: info.get_hostname().to_string(),
			address,
			port: info.get_port(),
			description: info
				.get_property_val_str(DESCRIPTION_PROPERTY)
				.unwrap_or_default()
				.to_string(),
		})
	}
}

/// Collects services of `service_type` for `timeout`.
///
/// Results are de-duplicated by full name and sorted by it. Services without an
/// IPv4 address are skipped.
#[instrument]
pub async fn browse(service_type: &str, timeout: Duration) -> Result<Vec<DiscoveredService>> {
	let service_type = service_type.to_string();
	let services =
		tokio::task::spawn_blocking(move || browse_blocking(&service_type, timeout)).await??;

	info!(count = services.len(), "browse complete");
	Ok(services)
}

fn browse_blocking(service_type: &str, timeout: Duration) -> Result<Vec<DiscoveredService>> {
	let daemon = ServiceDaemon::new()?;
	let receiver = daemon.browse(service_type)?;
	let deadline = Instant::now() + timeout;
	let mut found: BTreeMap<String, DiscoveredService> = BTreeMap::new();

	loop {
		let remaining = deadline.saturating_duration_since(Instant::now());
		if remaining.is_zero() {
			break;
		}

		match receiver.recv_timeout(remaining) {
			Ok(ServiceEvent::ServiceResolved(info)) => match DiscoveredService::from_info(&info) {
				Some(service) => {
					debug!(fullname = %service.fullname, endpoint = %service.control_endpoint(), "resolved service");
					found.entry(service.fullname.clone()).or_insert(service);
				}
				None => debug!(fullname = %info.get_fullname(), "skipping service without IPv4 address"),
			},
			Ok(other) => debug!(event = ?other, "mDNS event"),
			Err(_) => break,
		}
	}

	if let Err(e) = daemon.stop_browse(service_type) {
		debug!(error = %e, "failed to stop browsing");
	}
	if let Err(e) = daemon.shutdown() {
		warn!(error = %e, "failed to shut down mDNS daemon");
	}

	Ok(found.into_values().collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn from_info_prefers_ipv4() {
		let info = ServiceInfo::new(
			"_meshgate._tcp.local.",
			"gateway",
			"gateway.local.",
			"192.168.0.10",
			38490,
			&[(DESCRIPTION_PROPERTY, "office")][..],
		)
		.unwrap();

		let service = DiscoveredService::from_info(&info).unwrap();
		assert_eq!(service.fullname, "gateway._meshgate._tcp.local.");
		assert_eq!(service.address, Ipv4Addr::new(192, 168, 0, 10));
		assert_eq!(service.description, "office");
		assert_eq!(service.control_endpoint(), "192.168.0.10:38490");
	}

	#[test]
	fn from_info_without_ipv4_is_skipped() {
		let info = ServiceInfo::new(
			"_meshgate._tcp.local.",
			"gateway",
			"gateway.local.",
			"fe80::1",
			38490,
			&[(DESCRIPTION_PROPERTY, "")][..],
		)
		.unwrap();
		assert!(DiscoveredService::from_info(&info).is_none());
	}
}
