// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AdmissionConfigLayer, BuiltinConfigLayer, HttpConfigLayer, LoggingConfigLayer, PolicyConfigLayer,
	PolicySource,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
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

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/warden/server.toml")
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
/// Convention: WARDEN_SERVER_<SECTION>_<FIELD>
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
			http: Some(load_http_from_env()?),
			admission: Some(load_admission_from_env()),
			builtin: Some(load_builtin_from_env()?),
			policy: Some(load_policy_from_env()?),
			logging: Some(load_logging_from_env()),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_u16(name: &str) -> Result<Option<u16>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u16 value '{v}'"),
		}),
		None => Ok(None),
	}
}

/// Comma-separated list; blank entries are dropped.
fn env_list(name: &str) -> Option<Vec<String>> {
	env_var(name).map(|s| {
		s.split(',')
			.map(|s| s.trim().to_string())
			.filter(|s| !s.is_empty())
			.collect()
	})
}

fn env_json<T: DeserializeOwned>(name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => serde_json::from_str(&v)
			.map(Some)
			.map_err(|e| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid JSON: {e}"),
			}),
		None => Ok(None),
	}
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("WARDEN_SERVER_HTTP_HOST"),
		port: env_u16("WARDEN_SERVER_HTTP_PORT")?,
	})
}

fn load_admission_from_env() -> AdmissionConfigLayer {
	AdmissionConfigLayer {
		path: env_var("WARDEN_SERVER_ADMISSION_PATH"),
		except: env_list("WARDEN_SERVER_ADMISSION_EXCEPT"),
		trust_forwarded_headers: env_bool("WARDEN_SERVER_ADMISSION_TRUST_FORWARDED_HEADERS"),
		identity_headers: env_bool("WARDEN_SERVER_ADMISSION_IDENTITY_HEADERS"),
		user_header: env_var("WARDEN_SERVER_ADMISSION_USER_HEADER"),
		groups_header: env_var("WARDEN_SERVER_ADMISSION_GROUPS_HEADER"),
	}
}

fn load_builtin_from_env() -> Result<BuiltinConfigLayer, ConfigError> {
	Ok(BuiltinConfigLayer {
		enabled: env_bool("WARDEN_SERVER_BUILTIN_ENABLED"),
		paths: env_json("WARDEN_SERVER_BUILTIN_PATHS")?,
		resources: env_json("WARDEN_SERVER_BUILTIN_RESOURCES")?,
	})
}

fn load_policy_from_env() -> Result<PolicyConfigLayer, ConfigError> {
	let source = match env_var("WARDEN_SERVER_POLICY_SOURCE") {
		Some(v) => Some(v.parse::<PolicySource>().map_err(|message| ConfigError::InvalidValue {
			key: "WARDEN_SERVER_POLICY_SOURCE".to_string(),
			message,
		})?),
		None => None,
	};

	Ok(PolicyConfigLayer {
		source,
		file: env_var("WARDEN_SERVER_POLICY_FILE").map(PathBuf::from),
	})
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("WARDEN_SERVER_LOGGING_LEVEL"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn test_defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert!(layer.http.is_none());
		assert!(layer.policy.is_none());
	}

	#[test]
	fn test_toml_source_missing_file_returns_empty() {
		let source = TomlSource::new("/nonexistent/config.toml");
		let layer = source.load().unwrap();
		assert!(layer.http.is_none());
	}

	#[test]
	fn test_toml_source_reads_file() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "[http]\nport = 7070\n\n[builtin]\nenabled = false").unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(layer.http.unwrap().port, Some(7070));
		assert_eq!(layer.builtin.unwrap().enabled, Some(false));
	}

	#[test]
	fn test_toml_source_parse_error_names_path() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "[http\nport = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
		assert!(err
			.to_string()
			.contains(&file.path().display().to_string()));
	}
}
