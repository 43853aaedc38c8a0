// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections. Each has a `*ConfigLayer` of optional fields and a
//! resolved `*Config`.

mod auth;
mod discovery;
mod http;
mod logging;
mod registry;
mod tunnel;

pub use auth::{AuthConfig, AuthConfigLayer};
pub use discovery::{DiscoveryConfig, DiscoveryConfigLayer, DEFAULT_SERVICE_TYPE};
pub use http::{HttpConfig, HttpConfigLayer, TlsConfig, TlsConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use registry::{RegistryConfig, RegistryConfigLayer};
pub use tunnel::{TunnelConfig, TunnelConfigLayer};
