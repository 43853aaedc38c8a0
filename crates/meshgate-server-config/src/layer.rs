// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

use crate::sections::{
	AuthConfigLayer, DiscoveryConfigLayer, HttpConfigLayer, LoggingConfigLayer, RegistryConfigLayer,
	TlsConfigLayer, TunnelConfigLayer,
};

/// One source's view of the configuration. Every field is optional; later
/// layers override earlier ones field by field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfigLayer {
	pub http: Option<HttpConfigLayer>,
	pub tls: Option<TlsConfigLayer>,
	pub tunnel: Option<TunnelConfigLayer>,
	pub registry: Option<RegistryConfigLayer>,
	pub auth: Option<AuthConfigLayer>,
	pub discovery: Option<DiscoveryConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
}

macro_rules! merge_section {
	($self:ident, $other:ident, $field:ident) => {
		if let Some(overlay) = $other.$field {
			match &mut $self.$field {
				Some(base) => base.merge(overlay),
				None => $self.$field = Some(overlay),
			}
		}
	};
}

impl ServerConfigLayer {
	pub fn merge(&mut self, other: Self) {
		merge_section!(self, other, http);
		merge_section!(self, other, tls);
		merge_section!(self, other, tunnel);
		merge_section!(self, other, registry);
		merge_section!(self, other, auth);
		merge_section!(self, other, discovery);
		merge_section!(self, other, logging);
	}
}
