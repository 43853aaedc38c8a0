// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{ClientError, Result};
use console::{style, Term};
use meshgate_common_secret::SecretString;
use meshgate_discovery::DiscoveredService;

/// Lists `services` and reads a 1-based choice from the terminal.
pub fn choose_service<'a>(term: &Term, services: &'a [DiscoveredService]) -> Result<&'a DiscoveredService> {
	term.write_line("Found the following meshgate servers on the local network:")?;
	for (i, service) in services.iter().enumerate() {
		term.write_line(&format_entry(i + 1, service))?;
	}
	term.write_str(&format!(
		"Enter the number of the server to join (1-{}): ",
		services.len()
	))?;

	let input = term.read_line()?;
	let index = parse_choice(&input, services.len())?;
	Ok(&services[index])
}

pub fn read_password(term: &Term) -> Result<SecretString> {
	term.write_str("Enter password: ")?;
	let password = term.read_secure_line()?;
	Ok(SecretString::new(password))
}

fn format_entry(number: usize, service: &DiscoveredService) -> String {
	let description = if service.description.is_empty() {
		service.host.as_str()
	} else {
		service.description.as_str()
	};
	format!(
		"{}) {} ({})",
		style(number).bold(),
		description,
		service.control_endpoint()
	)
}

/// Parses a 1-based menu choice into an index below `count`.
pub fn parse_choice(input: &str, count: usize) -> Result<usize> {
	let trimmed = input.trim();
	let number: usize = trimmed
		.parse()
		.map_err(|_| ClientError::InvalidChoice(format!("'{trimmed}' is not a number")))?;

	if number == 0 || number > count {
		return Err(ClientError::InvalidChoice(format!(
			"{number} is outside the range 1-{count}"
		)));
	}
	Ok(number - 1)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::net::Ipv4Addr;

	#[test]
	fn parses_valid_choices() {
		assert_eq!(parse_choice("1\n", 3).unwrap(), 0);
		assert_eq!(parse_choice(" 3 ", 3).unwrap(), 2);
	}

	#[test]
	fn rejects_invalid_choices() {
		for input in ["0", "4", "-1", "abc", ""] {
			assert!(
				matches!(parse_choice(input, 3), Err(ClientError::InvalidChoice(_))),
				"{input:?} should be rejected"
			);
		}
	}

	#[test]
	fn entry_falls_back_to_host() {
		console::set_colors_enabled(false);
		let service = DiscoveredService {
			fullname: "gw._meshgate._tcp.local.".into(),
			host: "gw.local.".into(),
			address: Ipv4Addr::new(192, 168, 0, 10),
			port: 38490,
			description: String::new(),
		};
		assert_eq!(format_entry(1, &service), "1) gw.local. (192.168.0.10:38490)");
	}
}
