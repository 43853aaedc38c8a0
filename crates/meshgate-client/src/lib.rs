// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client side of meshgate: finds a server, registers, brings up the local
//! WireGuard interface and keeps the membership alive with heartbeats.

pub mod control;
pub mod error;
pub mod heartbeat;
pub mod interface;
pub mod prompt;
pub mod session;

pub use control::{user_agent, ControlClient};
pub use error::{ClientError, Result};
pub use heartbeat::{run_heartbeat, DEFAULT_HEARTBEAT_INTERVAL};
pub use interface::{peer_allowed_ips, ClientInterface};
pub use session::{
	run, ClientOptions, Session, SessionEnd, DEFAULT_DISCOVERY_TIMEOUT, DEFAULT_SERVICE_TYPE,
};
