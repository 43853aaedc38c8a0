// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! WireGuard programming through the `ip` and `wg` command line tools.

pub mod runner;
pub mod shell;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod uplink;

pub use runner::{run_checked, CommandOutput, CommandRunner, ProcessRunner};
pub use shell::{preflight, InterfaceSpec, ShellTunnelController, REQUIRED_TOOLS};
pub use uplink::{parse_ipv4_address, uplink_ipv4};
