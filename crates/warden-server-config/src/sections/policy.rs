// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy source configuration section.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where the policy graph comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicySource {
	/// Watch RBAC objects in the cluster.
	#[default]
	Kubernetes,
	/// Load a static JSON policy file once at startup.
	File,
}

impl fmt::Display for PolicySource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PolicySource::Kubernetes => f.write_str("kubernetes"),
			PolicySource::File => f.write_str("file"),
		}
	}
}

impl FromStr for PolicySource {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"kubernetes" | "k8s" => Ok(PolicySource::Kubernetes),
			"file" => Ok(PolicySource::File),
			other => Err(format!("unknown policy source '{other}'")),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PolicyConfigLayer {
	pub source: Option<PolicySource>,
	pub file: Option<PathBuf>,
}

impl PolicyConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.source.is_some() {
			self.source = other.source;
		}
		if other.file.is_some() {
			self.file = other.file;
		}
	}

	pub fn finalize(self) -> PolicyConfig {
		PolicyConfig {
			source: self.source.unwrap_or_default(),
			file: self.file,
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PolicyConfig {
	pub source: PolicySource,
	pub file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_to_kubernetes() {
		let config = PolicyConfigLayer::default().finalize();
		assert_eq!(config.source, PolicySource::Kubernetes);
		assert!(config.file.is_none());
	}

	#[test]
	fn test_source_parsing() {
		assert_eq!("File".parse::<PolicySource>(), Ok(PolicySource::File));
		assert_eq!("k8s".parse::<PolicySource>(), Ok(PolicySource::Kubernetes));
		assert!("ldap".parse::<PolicySource>().is_err());
	}

	#[test]
	fn test_deserialize_lowercase_source() {
		let layer: PolicyConfigLayer = toml::from_str(
			r#"
source = "file"
file = "policy.json"
"#,
		)
		.unwrap();
		assert_eq!(layer.source, Some(PolicySource::File));
		assert_eq!(layer.file, Some(PathBuf::from("policy.json")));
	}
}
