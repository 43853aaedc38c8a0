// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML file, environment and command line.

use std::path::PathBuf;

use meshgate_common_secret::SecretString;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AuthConfigLayer, DiscoveryConfigLayer, HttpConfigLayer, LoggingConfigLayer, RegistryConfigLayer,
	TlsConfigLayer, TunnelConfigLayer,
};

pub const SYSTEM_CONFIG_PATH: &str = "/etc/meshgate/server.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
	CommandLine = 60,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: MESHGATE_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(HttpConfigLayer {
				host: env_var("MESHGATE_HTTP_HOST"),
				port: env_parse("MESHGATE_HTTP_PORT")?,
			}),
			tls: Some(TlsConfigLayer {
				cert_path: env_var("MESHGATE_TLS_CERT_PATH").map(PathBuf::from),
				key_path: env_var("MESHGATE_TLS_KEY_PATH").map(PathBuf::from),
			}),
			tunnel: Some(TunnelConfigLayer {
				interface: env_var("MESHGATE_TUNNEL_INTERFACE"),
				wg_interface: env_var("MESHGATE_TUNNEL_WG_INTERFACE"),
				wg_port: env_parse("MESHGATE_TUNNEL_WG_PORT")?,
				cidr: env_var("MESHGATE_TUNNEL_CIDR"),
				post_up: env_var("MESHGATE_TUNNEL_POST_UP"),
				post_down: env_var("MESHGATE_TUNNEL_POST_DOWN"),
			}),
			registry: Some(RegistryConfigLayer {
				deadline_secs: env_parse("MESHGATE_REGISTRY_DEADLINE_SECS")?,
				sweep_interval_secs: env_parse("MESHGATE_REGISTRY_SWEEP_INTERVAL_SECS")?,
			}),
			auth: Some(AuthConfigLayer {
				password: load_secret_env("MESHGATE_VPN_PASSWORD")?,
			}),
			discovery: Some(DiscoveryConfigLayer {
				enabled: env_bool("MESHGATE_DISCOVERY_ENABLED"),
				service_type: env_var("MESHGATE_DISCOVERY_SERVICE_TYPE"),
				instance_name: env_var("MESHGATE_DISCOVERY_INSTANCE_NAME"),
				description: env_var("MESHGATE_DISCOVERY_DESCRIPTION"),
			}),
			logging: Some(LoggingConfigLayer {
				level: env_var("MESHGATE_LOG_LEVEL"),
				format: env_parse("MESHGATE_LOG_FORMAT")?,
			}),
		})
	}
}

/// A pre-built layer, typically from command-line flags.
pub struct CommandLineSource {
	layer: ServerConfigLayer,
}

impl CommandLineSource {
	pub fn new(layer: ServerConfigLayer) -> Self {
		Self { layer }
	}
}

impl ConfigSource for CommandLineSource {
	fn name(&self) -> &'static str {
		"command-line"
	}

	fn precedence(&self) -> Precedence {
		Precedence::CommandLine
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading command-line flags");
		Ok(self.layer.clone())
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T>(name: &str) -> Result<Option<T>, ConfigError>
where
	T: std::str::FromStr,
	T::Err: std::fmt::Display,
{
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|e: T::Err| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid value '{v}': {e}"),
		}),
		None => Ok(None),
	}
}

/// Reads a secret from `name`, or from the file named by `<name>_FILE`.
/// Setting both is an error.
pub fn load_secret_env(name: &str) -> Result<Option<SecretString>, ConfigError> {
	let file_var = format!("{name}_FILE");
	match (env_var(name), env_var(&file_var)) {
		(Some(_), Some(_)) => Err(ConfigError::Secret(format!(
			"both {name} and {file_var} are set"
		))),
		(Some(value), None) => Ok(Some(SecretString::new(value))),
		(None, Some(path)) => {
			let content = std::fs::read_to_string(&path)
				.map_err(|e| ConfigError::Secret(format!("failed to read {file_var} ({path}): {e}")))?;
			let value = content.trim_end_matches(['\r', '\n']).to_string();
			Ok(Some(SecretString::new(value)))
		}
		(None, None) => Ok(None),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_order() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
		assert!(Precedence::Environment < Precedence::CommandLine);
	}

	#[test]
	fn test_missing_toml_file_is_empty_layer() {
		let layer = TomlSource::new("/nonexistent/meshgate.toml").load().unwrap();
		assert!(layer.http.is_none());
		assert!(layer.tunnel.is_none());
	}

	#[test]
	fn test_invalid_toml_is_reported_with_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[http\nport = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { ref path, .. } if path == file.path()));
	}

	#[test]
	fn test_toml_file_is_loaded() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[auth]\npassword = \"from-file\"\n[logging]\nformat = \"json\"").unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(layer.auth.unwrap().password.unwrap().expose(), "from-file");
		assert_eq!(
			layer.logging.unwrap().format,
			Some(crate::sections::LogFormat::Json)
		);
	}

	// Each test below uses its own variable names so they can run in parallel.

	#[test]
	fn test_secret_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "s3cret").unwrap();
		std::env::set_var("MESHGATE_TEST_SECRET_A_FILE", file.path());

		let secret = load_secret_env("MESHGATE_TEST_SECRET_A").unwrap().unwrap();
		assert_eq!(secret.expose(), "s3cret");

		std::env::remove_var("MESHGATE_TEST_SECRET_A_FILE");
	}

	#[test]
	fn test_secret_both_set_is_error() {
		std::env::set_var("MESHGATE_TEST_SECRET_B", "x");
		std::env::set_var("MESHGATE_TEST_SECRET_B_FILE", "/tmp/x");

		assert!(matches!(
			load_secret_env("MESHGATE_TEST_SECRET_B"),
			Err(ConfigError::Secret(_))
		));

		std::env::remove_var("MESHGATE_TEST_SECRET_B");
		std::env::remove_var("MESHGATE_TEST_SECRET_B_FILE");
	}

	#[test]
	fn test_env_parse_rejects_garbage() {
		std::env::set_var("MESHGATE_TEST_PORT_C", "not-a-port");
		let result: Result<Option<u16>, _> = env_parse("MESHGATE_TEST_PORT_C");
		assert!(matches!(result, Err(ConfigError::InvalidValue { ref key, .. }) if key == "MESHGATE_TEST_PORT_C"));
		std::env::remove_var("MESHGATE_TEST_PORT_C");
	}

	#[test]
	fn test_command_line_layer_is_returned() {
		let source = CommandLineSource::new(ServerConfigLayer {
			http: Some(HttpConfigLayer {
				host: None,
				port: Some(9000),
			}),
			..Default::default()
		});
		assert_eq!(source.precedence(), Precedence::CommandLine);
		assert_eq!(source.load().unwrap().http.unwrap().port, Some(9000));
	}
}
