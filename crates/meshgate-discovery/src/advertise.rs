// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{DiscoveryError, Result};
use crate::DESCRIPTION_PROPERTY;
use mdns_sd::{ServiceDaemon, ServiceInfo};
use std::net::Ipv4Addr;
use tracing::{info, instrument, warn};

/// What a server publishes about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
	/// Instance name, usually the host name.
	pub instance: String,
	/// Fully qualified service type, e.g. `_meshgate._tcp.local.`.
	pub service_type: String,
	pub address: Ipv4Addr,
	pub port: u16,
	pub description: String,
}

impl ServiceRecord {
	/// mDNS host name derived from the instance name.
	pub fn host_name(&self) -> String {
		let host = self.instance.trim_end_matches('.');
		if host.ends_with(".local") {
			format!("{host}.")
		} else {
			format!("{host}.local.")
		}
	}

	fn to_service_info(&self) -> Result<ServiceInfo> {
		if !self.service_type.ends_with(".local.") {
			return Err(DiscoveryError::InvalidRecord(format!(
				"service type {} must end with .local.",
				self.service_type
			)));
		}

		let properties = [(DESCRIPTION_PROPERTY, self.description.as_str())];
		let address = self.address.to_string();
		Ok(ServiceInfo::new(
			&self.service_type,
			&self.instance,
			&self.host_name(),
			address.as_str(),
			self.port,
			&properties[..],
		)?)
	}
}

pub struct ServiceAdvertiser;

impl ServiceAdvertiser {
	/// Publishes `record` until the returned [`Advertisement`] is stopped.
	#[instrument(skip(record), fields(instance = %record.instance, service_type = %record.service_type))]
	pub fn start(record: ServiceRecord) -> Result<Advertisement> {
		let info = record.to_service_info()?;
		let fullname = info.get_fullname().to_string();

		let daemon = ServiceDaemon::new()?;
		daemon.register(info)?;

		info!(%fullname, address = %record.address, port = record.port, "advertising control plane");

		Ok(Advertisement { daemon, fullname })
	}
}

/// A live mDNS registration.
pub struct Advertisement {
	daemon: ServiceDaemon,
	fullname: String,
}

impl Advertisement {
	pub fn fullname(&self) -> &str {
		&self.fullname
	}

	/// Withdraws the record and shuts the responder down. Failures are
	/// logged; there is nothing left to retry.
	pub fn stop(self) {
		if let Err(e) = self.daemon.unregister(&self.fullname) {
			warn!(error = %e, fullname = %self.fullname, "failed to unregister mDNS service");
		}
		if let Err(e) = self.daemon.shutdown() {
			warn!(error = %e, "failed to shut down mDNS daemon");
		}
		info!(fullname = %self.fullname, "stopped advertising control plane");
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record() -> ServiceRecord {
		ServiceRecord {
			instance: "gateway".into(),
			service_type: "_meshgate._tcp.local.".into(),
			address: Ipv4Addr::new(192, 168, 0, 10),
			port: 38490,
			description: "office".into(),
		}
	}

	#[test]
	fn host_name_gets_local_suffix() {
		assert_eq!(record().host_name(), "gateway.local.");
		let record = ServiceRecord {
			instance: "gateway.local.".into(),
			..record()
		};
		assert_eq!(record.host_name(), "gateway.local.");
	}

	#[test]
	fn service_info_carries_description() {
		let info = record().to_service_info().unwrap();
		assert_eq!(info.get_fullname(), "gateway._meshgate._tcp.local.");
		assert_eq!(info.get_port(), 38490);
		assert_eq!(info.get_property_val_str(DESCRIPTION_PROPERTY), Some("office"));
	}

	#[test]
	fn rejects_non_local_service_type() {
		let record = ServiceRecord {
			service_type: "_meshgate._tcp".into(),
			..record()
		};
		assert!(matches!(
			record.to_service_info(),
			Err(DiscoveryError::InvalidRecord(_))
		));
	}
}
