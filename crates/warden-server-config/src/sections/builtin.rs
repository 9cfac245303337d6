// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Built-in allow-list configuration section.

use serde::{Deserialize, Serialize};
use warden_rbac_core::{AllowList, PathGrant, ResourceGrant};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BuiltinConfigLayer {
	pub enabled: Option<bool>,
	pub paths: Option<Vec<PathGrant>>,
	pub resources: Option<Vec<ResourceGrant>>,
}

impl BuiltinConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.paths.is_some() {
			self.paths = other.paths;
		}
		if other.resources.is_some() {
			self.resources = other.resources;
		}
	}

	/// Lists left unset fall back to the default allow-list entries.
	pub fn finalize(self) -> BuiltinConfig {
		let defaults = BuiltinConfig::default();
		BuiltinConfig {
			enabled: self.enabled.unwrap_or(defaults.enabled),
			paths: self.paths.unwrap_or(defaults.paths),
			resources: self.resources.unwrap_or(defaults.resources),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuiltinConfig {
	pub enabled: bool,
	pub paths: Vec<PathGrant>,
	pub resources: Vec<ResourceGrant>,
}

impl BuiltinConfig {
	/// The allow-list the authorizer should use.
	pub fn allow_list(&self) -> AllowList {
		if !self.enabled {
			return AllowList::empty();
		}
		AllowList::new(self.paths.clone(), self.resources.clone())
	}
}

impl Default for BuiltinConfig {
	fn default() -> Self {
		let list = AllowList::default();
		Self {
			enabled: true,
			paths: list.paths().to_vec(),
			resources: list.resources().to_vec(),
		}
	}
}
