// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for Warden server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`WARDEN_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use warden_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Server listening on {}:{}", config.http.host, config.http.port);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub admission: AdmissionConfig,
	pub builtin: BuiltinConfig,
	pub policy: PolicyConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`WARDEN_SERVER_*`)
/// 2. Config file (`/etc/warden/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		admission: layer.admission.unwrap_or_default().finalize(),
		builtin: layer.builtin.unwrap_or_default().finalize(),
		policy: layer.policy.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		host = %config.http.host,
		port = config.http.port,
		admission_path = %config.admission.path,
		except = config.admission.except.len(),
		builtin_enabled = config.builtin.enabled,
		policy_source = %config.policy.source,
		"Server configuration loaded"
	);

	Ok(config)
}

/// Validate cross-field configuration rules.
fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	if config.policy.source == PolicySource::File && config.policy.file.is_none() {
		return Err(ConfigError::Validation(
			"policy source is 'file' but no policy file is set. \
			 Set [policy] file or WARDEN_SERVER_POLICY_FILE."
				.to_string(),
		));
	}

	let admission = &config.admission;
	for prefix in std::iter::once(&admission.path).chain(&admission.except) {
		if !prefix.starts_with('/') {
			return Err(ConfigError::Validation(format!(
				"admission path prefix '{prefix}' must start with '/'"
			)));
		}
	}

	if admission.identity_headers
		&& (admission.user_header.trim().is_empty() || admission.groups_header.trim().is_empty())
	{
		return Err(ConfigError::Validation(
			"identity headers are enabled but the user or groups header name is empty".to_string(),
		));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use std::path::PathBuf;
	use tempfile::NamedTempFile;

	#[test]
	fn test_defaults_are_valid() {
		assert!(validate_config(&ServerConfig::default()).is_ok());
	}

	#[test]
	fn test_file_source_requires_path() {
		let config = ServerConfig {
			policy: PolicyConfig {
				source: PolicySource::File,
				file: None,
			},
			..Default::default()
		};
		let err = validate_config(&config).unwrap_err();
		assert!(err.to_string().contains("no policy file"));

		let config = ServerConfig {
			policy: PolicyConfig {
				source: PolicySource::File,
				file: Some(PathBuf::from("/etc/warden/policy.json")),
			},
			..Default::default()
		};
		assert!(validate_config(&config).is_ok());
	}

	#[test]
	fn test_relative_except_prefix_rejected() {
		let config = ServerConfig {
			admission: AdmissionConfig {
				except: vec!["healthz".to_string()],
				..Default::default()
			},
			..Default::default()
		};
		assert!(validate_config(&config).is_err());
	}

	#[test]
	fn test_empty_identity_header_rejected_only_when_enabled() {
		let mut config = ServerConfig {
			admission: AdmissionConfig {
				user_header: String::new(),
				..Default::default()
			},
			..Default::default()
		};
		assert!(validate_config(&config).is_err());

		config.admission.identity_headers = false;
		assert!(validate_config(&config).is_ok());
	}

	#[test]
	fn test_finalize_from_toml_file() {
		let mut file = NamedTempFile::new().unwrap();
		write!(
			file,
			r#"
[http]
host = "127.0.0.1"
port = 9000

[admission]
except = ["/healthz"]
trust_forwarded_headers = true

[policy]
source = "file"
file = "/srv/policy.json"
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		let config = finalize(layer).unwrap();
		assert_eq!(config.socket_addr(), "127.0.0.1:9000");
		assert_eq!(config.admission.path, "/");
		assert_eq!(config.admission.except, vec!["/healthz".to_string()]);
		assert!(config.admission.trust_forwarded_headers);
		assert_eq!(config.policy.source, PolicySource::File);
		assert!(config.builtin.enabled);
	}

	#[test]
	fn test_finalize_rejects_invalid_file() {
		let mut file = NamedTempFile::new().unwrap();
		write!(file, "[policy]\nsource = \"file\"\n").unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert!(matches!(finalize(layer), Err(ConfigError::Validation(_))));
	}
}
