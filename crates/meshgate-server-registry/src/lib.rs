// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Membership state for the meshgate server.
//!
//! [`NodeRegistry`] ties together an [`AddressPool`] that hands out VPN
//! addresses and a [`TunnelController`] that programs peers on the server's
//! WireGuard interface. All three change together under one lock.

pub mod error;
pub mod node;
pub mod pool;
pub mod registry;
pub mod sweep;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tunnel;

pub use error::{PoolError, RegistryError, Result, TunnelError};
pub use node::Node;
pub use pool::{AddressPool, Lease, SubnetPool, MAX_PREFIX_LEN, MIN_PREFIX_LEN};
pub use registry::{Admission, NodeRegistry, SweepReport};
pub use sweep::{SweepConfig, SweepHandle, DEFAULT_DEADLINE, DEFAULT_SWEEP_INTERVAL};
pub use tunnel::TunnelController;
