// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Finds meshgate servers on the local network over mDNS.

pub mod advertise;
pub mod browse;
pub mod error;

pub use advertise::{Advertisement, ServiceAdvertiser, ServiceRecord};
pub use browse::{browse, DiscoveredService};
pub use error::{DiscoveryError, Result};

/// TXT property carrying the free-text server description.
pub const DESCRIPTION_PROPERTY: &str = "description";
